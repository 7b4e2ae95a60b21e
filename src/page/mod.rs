//! On-disk page formats.
//!
//! The file is an array of fixed-size pages:
//!
//! ```text
//! [Page 0: DatabaseHeader, zero padded]
//! [Page 1: root NodePage]
//! [Page 2..N: NodePage or EntryPage]
//! ```
//!
//! Pages carry no kind marker. Whoever follows a pointer knows whether it
//! leads to a node page or an entry page.

pub mod entry;
pub mod header;
pub mod node;

pub use entry::EntryPage;
pub use header::DatabaseHeader;
pub use node::{Cell, NodePage, NodeType, PageStatus};

use crate::error::Result;
use bytes::Bytes;

/// A page number. Page 0 holds the database header; 0 doubles as "no page".
pub type PageNum = u32;

/// Size of the database header at the start of page 0.
pub const HEADER_SIZE: usize = 36;

/// Size of the fixed node page header (type, status, key count, rightmost child).
pub const NODE_HEADER_SIZE: usize = 10;

/// Size of one cell in a node page.
pub const CELL_SIZE: usize = 12 + 4 + MAX_KEY_SIZE;

/// Largest key payload a cell can carry.
pub const MAX_KEY_SIZE: usize = 1024;

/// Size of the entry page footer (content length + next page pointer).
pub const ENTRY_FOOTER_SIZE: usize = 8;

/// Anything that serializes to exactly one page.
pub trait Page {
    /// Encode into a zero-filled buffer of `page_size` bytes.
    fn encode(&self, page_size: usize) -> Result<Bytes>;
}
