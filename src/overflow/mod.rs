//! Entry overflow log.
//!
//! Values live outside the B-tree in one shared, append-only chain of
//! [`EntryPage`]s. The header's `last_entry_page` names the chain's tail.
//!
//! ## Value format
//!
//! ```text
//! [value_len: u32][value: value_len bytes]
//! ```
//!
//! Encoded values are packed back to back into the chain, so one value may
//! straddle several pages. A cell records where its value starts as an
//! [`EntryPointer`]: the page and the offset inside that page's content.
//! Values are never rewritten; the chain only grows.
//!
//! [`EntryPage`]: crate::page::EntryPage

pub mod reader;
pub mod writer;

pub use reader::OverflowReader;
pub use writer::OverflowWriter;

use crate::buffer::{BufferReader, BufferWriter, LENGTH_PREFIX_SIZE};
use crate::error::{Error, Result};
use crate::page::PageNum;

/// Location of a value's first byte in the overflow log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPointer {
    /// Entry page holding the first byte.
    pub page: PageNum,
    /// Offset of that byte inside the page's content.
    pub offset: u32,
}

impl EntryPointer {
    /// Create a new pointer.
    pub fn new(page: PageNum, offset: u32) -> Self {
        Self { page, offset }
    }
}

/// Encode a value as a length-prefixed blob.
pub fn encode_value(value: &[u8]) -> Result<Vec<u8>> {
    let len = u32::try_from(value.len()).map_err(|_| {
        Error::invalid_argument(format!("value of {} bytes is too large", value.len()))
    })?;
    let mut writer = BufferWriter::new(LENGTH_PREFIX_SIZE + value.len());
    writer.write_u32(len)?;
    writer.write_bytes(value)?;
    Ok(writer.finish().to_vec())
}

/// Decode a length-prefixed blob, ignoring any bytes that follow it.
pub fn decode_value(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = BufferReader::new(data);
    let len = reader
        .read_u32()
        .map_err(|_| Error::corruption("Value length prefix cut short by end of chain"))?;
    let value = reader.read_bytes(len as usize).map_err(|_| {
        Error::corruption(format!("Value of {} bytes runs past end of chain", len))
    })?;
    Ok(value.to_vec())
}

/// Total encoded size of a blob whose first bytes are `prefix`, once the
/// length prefix is available.
fn encoded_len(prefix: &[u8]) -> Option<usize> {
    let bytes: [u8; LENGTH_PREFIX_SIZE] = prefix.get(..LENGTH_PREFIX_SIZE)?.try_into().ok()?;
    Some(LENGTH_PREFIX_SIZE + u32::from_be_bytes(bytes) as usize)
}
