//! Appending values to the overflow log.

use super::{encode_value, EntryPointer};
use crate::error::{Error, Result};
use crate::page::{EntryPage, PageNum};
use crate::pager::Pager;

/// Appends values to the tail of the overflow log.
pub struct OverflowWriter<'a> {
    pager: &'a mut Pager,
}

impl<'a> OverflowWriter<'a> {
    /// Create a writer over the pager's overflow log.
    pub fn new(pager: &'a mut Pager) -> Self {
        Self { pager }
    }

    /// Append a value and return where it starts.
    ///
    /// The returned pointer is the tail page and its content length as they
    /// were before the append. Pages that fill up are linked to a freshly
    /// appended page and the remaining bytes continue there; the last page
    /// touched becomes the new tail.
    pub fn append(&mut self, value: &[u8]) -> Result<EntryPointer> {
        let blob = encode_value(value)?;
        let capacity = EntryPage::capacity(self.pager.page_size());

        let (mut page_num, mut page) = self.load_tail()?;
        let offset = u32::try_from(page.content.len())
            .map_err(|_| Error::corruption("Entry page content length overflows u32"))?;
        let start = EntryPointer::new(page_num, offset);

        let mut remaining: &[u8] = &blob;
        loop {
            let room = capacity.saturating_sub(page.content.len());
            if remaining.len() <= room {
                page.content.extend_from_slice(remaining);
                self.pager.write_page(&page, page_num)?;
                self.pager.set_last_entry_page(page_num)?;
                break;
            }

            let (head, tail) = remaining.split_at(room);
            page.content.extend_from_slice(head);
            remaining = tail;

            let next = self.pager.append_page(&EntryPage::new())?;
            page.next_page = next;
            self.pager.write_page(&page, page_num)?;
            log::debug!("Overflow log grew: page {} -> page {}", page_num, next);

            page_num = next;
            page = EntryPage::new();
        }

        log::trace!("Appended {} value bytes at {:?}", value.len(), start);
        Ok(start)
    }

    /// Load the current tail page, allocating the first one if the log is empty.
    fn load_tail(&mut self) -> Result<(PageNum, EntryPage)> {
        let tail = self.pager.header().last_entry_page;
        if tail == 0 {
            let page = EntryPage::new();
            let page_num = self.pager.append_page(&page)?;
            log::debug!("Started overflow log at page {}", page_num);
            Ok((page_num, page))
        } else {
            Ok((tail, self.pager.read_entry(tail)?))
        }
    }
}
