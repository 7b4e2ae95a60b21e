//! # SimpleDB - A Single-File Paged B-Tree Store
//!
//! SimpleDB keeps string keys and byte values in one file made of fixed-size
//! pages. Keys live in a B-tree of node pages; values are appended to a shared
//! overflow log and the tree only stores where each value starts.
//!
//! ## Architecture
//!
//! The storage engine consists of several key components:
//!
//! - **Buffer Codec**: Big-endian reads and writes over fixed-length buffers
//! - **Pager**: Page-granular file access with a page cache
//! - **Page Formats**: Header, node and entry page layouts
//! - **Overflow Log**: Append-only chain of entry pages holding values
//! - **B-Tree**: Case-insensitive ordered index over node pages
//!
//! ## File Layout
//!
//! ```text
//! page 0      database header
//! page 1      B-tree root (never moves)
//! page 2..    node pages and entry pages, in allocation order
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use simpledb::{Database, InsertOutcome};
//!
//! # fn main() -> Result<(), simpledb::Error> {
//! let mut db = Database::open("./encyclopedia.simpledb")?;
//!
//! // Insert takes the value first, then the key
//! let outcome = db.insert("Pale Blue Dot", "Earth")?;
//! assert_eq!(outcome, InsertOutcome::Inserted);
//!
//! // Keys compare case-insensitively
//! if let Some(value) = db.content("EARTH")? {
//!     println!("Found: {:?}", value);
//! }
//!
//! db.close()?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

// Module declarations
pub mod btree;
pub mod buffer;
pub mod config;
pub mod error;
pub mod file;
pub mod overflow;
pub mod page;
pub mod pager;

// Re-exports
pub use btree::{InsertOutcome, TreeStats};
pub use config::Options;
pub use error::{Error, Result};
pub use file::{FileHandle, MemoryFile, RandomAccessFile};
pub use page::DatabaseHeader;
pub use pager::CacheStats;

use btree::BTree;
use pager::Pager;
use std::path::Path;

/// The main database handle.
///
/// A `Database` owns its file exclusively. Reads take `&self`; inserts take
/// `&mut self`, so sharing across threads needs an outer lock.
pub struct Database {
    /// Page access and the in-memory header
    pager: Pager,

    /// Configuration options
    options: Options,
}

impl Database {
    /// Opens the database at `path`, creating it with default options if it
    /// doesn't exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_options(path, Options::default())
    }

    /// Opens the database at `path` with explicit options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPath`] if the file is missing and
    /// `create_if_missing` is off, or if it cannot be created or opened.
    pub fn open_with_options<P: AsRef<Path>>(path: P, options: Options) -> Result<Self> {
        let path = path.as_ref();
        options.validate()?;

        let exists = path.exists();
        if exists && options.error_if_exists {
            return Err(Error::invalid_argument(format!(
                "database {:?} already exists",
                path
            )));
        }
        if !exists && !options.create_if_missing {
            log::debug!("Database {:?} missing and create_if_missing is off", path);
            return Err(Error::InvalidPath(path.to_path_buf()));
        }

        log::info!("Opening database at {:?}", path);
        let file = FileHandle::open(path, options.create_if_missing)?;
        Self::with_file(file, options)
    }

    /// Builds a database over any [`RandomAccessFile`].
    ///
    /// An empty file is initialised with a header and an empty root. A
    /// non-empty file must start with a valid header; its page size and order
    /// override the ones in `options`.
    pub fn with_file<F: RandomAccessFile + 'static>(mut file: F, options: Options) -> Result<Self> {
        options.validate()?;

        let pager = if file.size()? == 0 {
            Pager::create(Box::new(file), options.page_size, options.order)?
        } else {
            let pager = Pager::open(Box::new(file))?;
            let header = pager.header();
            if header.page_size != options.page_size || header.order != options.order {
                log::warn!(
                    "Options ask for page_size={}, order={}; file has page_size={}, order={}",
                    options.page_size,
                    options.order,
                    header.page_size,
                    header.order
                );
            }
            pager
        };

        Ok(Self { pager, options })
    }

    /// Inserts `value` under `key`.
    ///
    /// Keys are ASCII, 1 to 1024 bytes, compared case-insensitively. Inserting
    /// a key that already exists leaves the stored value alone and returns
    /// [`InsertOutcome::DuplicateIgnored`].
    pub fn insert<V: AsRef<[u8]>>(&mut self, value: V, key: &str) -> Result<InsertOutcome> {
        let tree = self.tree();
        tree.insert(&mut self.pager, key, value.as_ref())
    }

    /// Gets the value stored under `key`.
    pub fn content(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.tree().search(&self.pager, key)
    }

    /// Gets the value stored under `key` as UTF-8 text.
    pub fn content_string(&self, key: &str) -> Result<Option<String>> {
        match self.content(key)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| Error::corruption(format!("Value of {:?} is not UTF-8", key))),
            None => Ok(None),
        }
    }

    /// Deletion is not supported; this does nothing.
    pub fn delete(&mut self, key: &str) -> Result<()> {
        log::warn!("Delete of {:?} ignored: deletion is not supported", key);
        Ok(())
    }

    /// Number of keys stored.
    pub fn len(&self) -> u64 {
        self.pager.header().key_count as u64
    }

    /// Returns true if no key has been stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the current header.
    pub fn header(&self) -> DatabaseHeader {
        *self.pager.header()
    }

    /// Get page cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.pager.cache_stats()
    }

    /// Walks the whole tree and checks its structure.
    pub fn verify(&self) -> Result<TreeStats> {
        self.tree().verify(&self.pager)
    }

    /// Closes the database, syncing first if `sync_on_close` is set.
    ///
    /// Dropping a database without calling `close` releases the file without
    /// syncing.
    pub fn close(mut self) -> Result<()> {
        if self.options.sync_on_close {
            self.pager.sync()?;
        }
        self.pager.close()?;
        log::info!("Closed database ({} keys, {} pages)", self.len(), self.pager.page_count());
        Ok(())
    }

    /// Tree handle built from the current header.
    fn tree(&self) -> BTree {
        let header = self.pager.header();
        BTree::new(header.order, header.root_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn small_options() -> Options {
        Options::new().page_size(4096).order(3)
    }

    #[test]
    fn test_db_open() {
        let temp_dir = TempDir::new().unwrap();
        let db = Database::open(temp_dir.path().join("test.simpledb")).unwrap();
        assert!(db.is_empty());
        assert_eq!(db.header().page_count, 2);
        assert_eq!(db.header().page_size, config::DEFAULT_PAGE_SIZE);
    }

    #[test]
    fn test_db_insert_and_content() {
        let mut db = Database::with_file(MemoryFile::new(), small_options()).unwrap();

        assert_eq!(db.insert(b"value1", "key1").unwrap(), InsertOutcome::Inserted);
        assert_eq!(db.content("key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(db.content("KEY1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(db.content("key2").unwrap(), None);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_db_duplicate_keeps_first_value() {
        let mut db = Database::with_file(MemoryFile::new(), small_options()).unwrap();

        db.insert("first", "Key").unwrap();
        assert_eq!(db.insert("second", "kEY").unwrap(), InsertOutcome::DuplicateIgnored);
        assert_eq!(db.content_string("key").unwrap(), Some("first".to_string()));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_db_delete_is_noop() {
        let mut db = Database::with_file(MemoryFile::new(), small_options()).unwrap();

        db.insert("value", "key").unwrap();
        db.delete("key").unwrap();
        db.delete("never-inserted").unwrap();
        assert_eq!(db.content_string("key").unwrap(), Some("value".to_string()));
    }

    #[test]
    fn test_content_string_rejects_binary() {
        let mut db = Database::with_file(MemoryFile::new(), small_options()).unwrap();

        db.insert([0xFFu8, 0xFE], "binary").unwrap();
        assert!(db.content_string("binary").unwrap_err().is_corruption());
        assert_eq!(db.content("binary").unwrap(), Some(vec![0xFF, 0xFE]));
    }

    #[test]
    fn test_header_wins_over_options() {
        let file = MemoryFile::new();
        {
            let mut db = Database::with_file(file.clone(), small_options()).unwrap();
            db.insert("v", "k").unwrap();
        }

        let db = Database::with_file(file, Options::default()).unwrap();
        assert_eq!(db.header().page_size, 4096);
        assert_eq!(db.header().order, 3);
        assert_eq!(db.content_string("k").unwrap(), Some("v".to_string()));
    }

    #[test]
    fn test_invalid_options() {
        let result = Database::with_file(MemoryFile::new(), Options::new().order(2));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));

        let result = Database::with_file(MemoryFile::new(), Options::new().page_size(1024));
        assert!(matches!(result, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_open_flags() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("flags.simpledb");

        let missing = Database::open_with_options(&path, Options::new().create_if_missing(false));
        assert!(matches!(missing, Err(Error::InvalidPath(_))));

        Database::open(&path).unwrap().close().unwrap();

        let exists = Database::open_with_options(&path, Options::new().error_if_exists(true));
        assert!(matches!(exists, Err(Error::InvalidArgument(_))));
    }

    #[test]
    fn test_close_and_reopen() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("reopen.simpledb");

        let mut db = Database::open_with_options(&path, small_options()).unwrap();
        for i in 0..20 {
            db.insert(format!("value{}", i), &format!("key{}", i)).unwrap();
        }
        db.close().unwrap();

        let db = Database::open(&path).unwrap();
        assert_eq!(db.len(), 20);
        for i in 0..20 {
            assert_eq!(
                db.content_string(&format!("KEY{}", i)).unwrap(),
                Some(format!("value{}", i))
            );
        }
        assert_eq!(db.verify().unwrap().key_count, 20);
    }
}
