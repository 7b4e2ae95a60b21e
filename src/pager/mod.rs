//! Paged file store.
//!
//! Turns a [`RandomAccessFile`] into an array of fixed-size pages. Page `n`
//! lives at byte offset `n * page_size`. Reads go through a [`PageCache`]
//! that is filled on first read and refreshed by every write.
//!
//! The pager keeps the authoritative copy of the [`DatabaseHeader`] in memory
//! and writes page 0 back whenever a header field changes. Appending a page
//! writes the page first and the header second; the two writes are not atomic.
//!
//! The pager assumes it is the only writer of the file. Nothing checks this.

mod cache;

pub use cache::{CacheStats, PageCache};

use crate::error::{Error, Result};
use crate::file::RandomAccessFile;
use crate::page::{DatabaseHeader, EntryPage, NodePage, Page, PageNum, HEADER_SIZE};
use bytes::Bytes;
use parking_lot::Mutex;

/// Page-granular access to the database file.
pub struct Pager {
    file: Mutex<Box<dyn RandomAccessFile>>,
    header: DatabaseHeader,
    page_size: usize,
    cache: PageCache,
}

impl Pager {
    /// Initialise an empty file: header on page 0 and an empty leaf root on
    /// page 1.
    pub fn create(file: Box<dyn RandomAccessFile>, page_size: u32, order: u32) -> Result<Self> {
        let header = DatabaseHeader::new(page_size, order);
        let mut pager = Self {
            file: Mutex::new(file),
            header,
            page_size: page_size as usize,
            cache: PageCache::new(),
        };
        pager.write_header()?;

        let root = pager.append_page(&NodePage::empty_leaf())?;
        if root != pager.header.root_page {
            return Err(Error::corruption(format!(
                "Root allocated at page {}, header expects {}",
                root, pager.header.root_page
            )));
        }

        log::info!("Created database: page_size={}, order={}", page_size, order);
        Ok(pager)
    }

    /// Load the header of an existing file.
    pub fn open(mut file: Box<dyn RandomAccessFile>) -> Result<Self> {
        let data = file.read_at(0, HEADER_SIZE)?;
        let header = DatabaseHeader::decode(&data)?;

        let expected_len = header.page_count as u64 * header.page_size as u64;
        let actual_len = file.size()?;
        if actual_len < expected_len {
            log::warn!(
                "Database file is {} bytes, header accounts for {} pages ({} bytes)",
                actual_len,
                header.page_count,
                expected_len
            );
        }

        log::debug!("Opened database: {:?}", header);
        Ok(Self {
            file: Mutex::new(file),
            page_size: header.page_size as usize,
            header,
            cache: PageCache::new(),
        })
    }

    /// Returns the in-memory header.
    pub fn header(&self) -> &DatabaseHeader {
        &self.header
    }

    /// Returns the page size.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Returns the total number of pages in the file.
    pub fn page_count(&self) -> u32 {
        self.header.page_count
    }

    /// Read a full page, from the cache when possible.
    pub fn read_page(&self, page_num: PageNum) -> Result<Bytes> {
        if page_num >= self.header.page_count {
            return Err(Error::corruption(format!(
                "Dangling pointer to page {} (page_count={})",
                page_num, self.header.page_count
            )));
        }
        if let Some(data) = self.cache.get(page_num) {
            return Ok(data);
        }

        log::trace!("Read page {}", page_num);
        let offset = page_num as u64 * self.page_size as u64;
        let data = Bytes::from(self.file.lock().read_at(offset, self.page_size)?);
        self.cache.insert(page_num, data.clone());
        Ok(data)
    }

    /// Read and decode a node page.
    pub fn read_node(&self, page_num: PageNum) -> Result<NodePage> {
        NodePage::decode(&self.read_page(page_num)?)
    }

    /// Read and decode an entry page.
    pub fn read_entry(&self, page_num: PageNum) -> Result<EntryPage> {
        EntryPage::decode(&self.read_page(page_num)?)
    }

    /// Overwrite an existing page in place.
    pub fn write_page<P: Page>(&mut self, page: &P, page_num: PageNum) -> Result<()> {
        if page_num >= self.header.page_count {
            return Err(Error::corruption(format!(
                "Write to unallocated page {} (page_count={})",
                page_num, self.header.page_count
            )));
        }
        self.write_at(page, page_num)
    }

    /// Write `page` as a new page at the end of the file and return its number.
    pub fn append_page<P: Page>(&mut self, page: &P) -> Result<PageNum> {
        let page_num = self.header.page_count;
        self.write_at(page, page_num)?;

        self.header.page_count += 1;
        self.write_header()?;

        log::debug!("Appended page {}", page_num);
        Ok(page_num)
    }

    /// Persist the in-memory header to page 0.
    pub fn write_header(&mut self) -> Result<()> {
        let header = self.header;
        self.write_at(&header, 0)
    }

    /// Record a new tail page for the overflow log.
    pub fn set_last_entry_page(&mut self, page_num: PageNum) -> Result<()> {
        if self.header.last_entry_page == page_num {
            return Ok(());
        }
        self.header.last_entry_page = page_num;
        self.write_header()
    }

    /// Bump the header's key count.
    pub fn increment_key_count(&mut self) -> Result<()> {
        self.header.key_count += 1;
        self.write_header()
    }

    fn write_at<P: Page>(&mut self, page: &P, page_num: PageNum) -> Result<()> {
        let data = page.encode(self.page_size)?;
        let offset = page_num as u64 * self.page_size as u64;
        {
            let file = self.file.get_mut();
            file.seek(offset)?;
            file.write(&data)?;
        }
        log::trace!("Wrote page {}", page_num);
        self.cache.insert(page_num, data);
        Ok(())
    }

    /// Get page cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Flush the file to durable storage.
    pub fn sync(&mut self) -> Result<()> {
        self.file.get_mut().sync()
    }

    /// Release the file handle.
    pub fn close(&mut self) -> Result<()> {
        self.file.get_mut().close()
    }
}
