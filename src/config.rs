//! Configuration options for the SimpleDB storage engine.

use crate::page::{CELL_SIZE, ENTRY_FOOTER_SIZE, HEADER_SIZE, NODE_HEADER_SIZE};

/// Default page size in bytes.
pub const DEFAULT_PAGE_SIZE: u32 = 16 * 1024;

/// Default B-tree order (maximum children per non-leaf node).
pub const DEFAULT_ORDER: u32 = 15;

/// Smallest order that still leaves a non-empty half on both sides of a split.
pub const MIN_ORDER: u32 = 3;

/// Configuration options for opening a database.
///
/// `page_size` and `order` only shape a newly created file. An existing file
/// always keeps the values recorded in its header.
#[derive(Debug, Clone)]
pub struct Options {
    /// Size of every page in the file, in bytes.
    /// Default: 16KB
    pub page_size: u32,

    /// B-tree order. A node holds at most `order - 1` keys.
    /// Default: 15
    pub order: u32,

    /// Create the database file if it doesn't exist.
    /// Default: true
    pub create_if_missing: bool,

    /// Error if the database file already exists.
    /// Default: false
    pub error_if_exists: bool,

    /// Sync the file to disk when the database is closed.
    /// Default: true
    pub sync_on_close: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            order: DEFAULT_ORDER,
            create_if_missing: true,
            error_if_exists: false,
            sync_on_close: true,
        }
    }
}

impl Options {
    /// Creates a new Options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page size used for a new file.
    pub fn page_size(mut self, size: u32) -> Self {
        self.page_size = size;
        self
    }

    /// Sets the B-tree order used for a new file.
    pub fn order(mut self, order: u32) -> Self {
        self.order = order;
        self
    }

    /// Sets whether to create the database if it doesn't exist.
    pub fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether opening an existing file is an error.
    pub fn error_if_exists(mut self, value: bool) -> Self {
        self.error_if_exists = value;
        self
    }

    /// Sets whether `close` syncs the file.
    pub fn sync_on_close(mut self, value: bool) -> Self {
        self.sync_on_close = value;
        self
    }

    /// Smallest page size able to hold a node of the given order.
    ///
    /// A node is written once with `order` keys before it splits.
    pub fn min_page_size(order: u32) -> usize {
        NODE_HEADER_SIZE + order as usize * CELL_SIZE
    }

    /// Validates the options and returns an error if any are invalid.
    pub fn validate(&self) -> crate::Result<()> {
        if self.order < MIN_ORDER {
            return Err(crate::Error::invalid_argument(format!(
                "order must be >= {}, got {}",
                MIN_ORDER, self.order
            )));
        }
        let page_size = self.page_size as usize;
        if page_size < HEADER_SIZE || page_size <= ENTRY_FOOTER_SIZE {
            return Err(crate::Error::invalid_argument(format!(
                "page_size {} cannot hold the database header",
                self.page_size
            )));
        }
        let needed = Self::min_page_size(self.order);
        if page_size < needed {
            return Err(crate::Error::invalid_argument(format!(
                "page_size {} too small for order {} (needs {} bytes)",
                self.page_size, self.order, needed
            )));
        }
        Ok(())
    }
}
