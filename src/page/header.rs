//! Database header stored at the start of page 0.

use super::{Page, PageNum, HEADER_SIZE};
use crate::buffer::{BufferReader, BufferWriter};
use crate::config::{Options, MIN_ORDER};
use crate::error::{Error, Result};
use bytes::Bytes;

/// Label identifying a SimpleDB file.
pub const MAGIC_LABEL: &str = "SimpleDB";

/// Current file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Page number of the B-tree root in a newly created file.
pub const INITIAL_ROOT_PAGE: PageNum = 1;

/// The database header.
///
/// Format (36 bytes, big-endian):
/// ```text
/// [label: 8 bytes "SimpleDB"]
/// [format_version: u32]
/// [page_count: u32]
/// [key_count: u32]
/// [page_size: u32]
/// [order: u32]
/// [root_page: u32]
/// [last_entry_page: u32]   // tail of the overflow log, 0 = empty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DatabaseHeader {
    /// File format version.
    pub format_version: u32,
    /// Number of pages in the file, header page included.
    pub page_count: u32,
    /// Number of distinct keys inserted.
    pub key_count: u32,
    /// Size of every page in bytes.
    pub page_size: u32,
    /// B-tree order.
    pub order: u32,
    /// Page number of the B-tree root.
    pub root_page: PageNum,
    /// Tail page of the overflow log, 0 when the log is empty.
    pub last_entry_page: PageNum,
}

impl DatabaseHeader {
    /// Header for a new file. Only page 0 is accounted for; the root page
    /// still has to be appended.
    pub fn new(page_size: u32, order: u32) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            page_count: 1,
            key_count: 0,
            page_size,
            order,
            root_page: INITIAL_ROOT_PAGE,
            last_entry_page: 0,
        }
    }

    /// Decode a header from the first bytes of page 0.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::corruption(format!(
                "Header too short: expected {} bytes, got {}",
                HEADER_SIZE,
                data.len()
            )));
        }

        let mut reader = BufferReader::new(&data[..HEADER_SIZE]);
        let label = reader.read_ascii_string_sized(MAGIC_LABEL.len())?;
        if label != MAGIC_LABEL {
            return Err(Error::corruption(format!("Invalid header label: {:?}", label)));
        }

        let header = Self {
            format_version: reader.read_u32()?,
            page_count: reader.read_u32()?,
            key_count: reader.read_u32()?,
            page_size: reader.read_u32()?,
            order: reader.read_u32()?,
            root_page: reader.read_u32()?,
            last_entry_page: reader.read_u32()?,
        };

        if header.format_version != FORMAT_VERSION {
            return Err(Error::corruption(format!(
                "Unsupported format version {}",
                header.format_version
            )));
        }
        // A node is written with `order` cells once before it splits.
        let page_size = header.page_size as usize;
        if page_size < HEADER_SIZE
            || header.order < MIN_ORDER
            || page_size < Options::min_page_size(header.order)
        {
            return Err(Error::corruption(format!(
                "Header declares page_size={} order={}",
                header.page_size, header.order
            )));
        }
        if header.root_page == 0 || header.root_page >= header.page_count {
            return Err(Error::corruption(format!(
                "Root page {} outside file of {} pages",
                header.root_page, header.page_count
            )));
        }

        Ok(header)
    }
}

impl Page for DatabaseHeader {
    fn encode(&self, page_size: usize) -> Result<Bytes> {
        let mut writer = BufferWriter::new(page_size);
        writer.write_ascii_string_sized(MAGIC_LABEL, MAGIC_LABEL.len())?;
        writer.write_u32(self.format_version)?;
        writer.write_u32(self.page_count)?;
        writer.write_u32(self.key_count)?;
        writer.write_u32(self.page_size)?;
        writer.write_u32(self.order)?;
        writer.write_u32(self.root_page)?;
        writer.write_u32(self.last_entry_page)?;
        Ok(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DatabaseHeader {
        DatabaseHeader {
            format_version: FORMAT_VERSION,
            page_count: 42,
            key_count: 17,
            page_size: 16384,
            order: 15,
            root_page: 1,
            last_entry_page: 9,
        }
    }

    #[test]
    fn test_header_encode_decode() {
        let header = sample();
        let encoded = header.encode(16384).unwrap();
        assert_eq!(encoded.len(), 16384);
        assert_eq!(&encoded[..8], b"SimpleDB");
        assert!(encoded[HEADER_SIZE..].iter().all(|&b| b == 0));

        let decoded = DatabaseHeader::decode(&encoded).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_header_layout() {
        let encoded = sample().encode(HEADER_SIZE).unwrap();
        // page_count sits right after the label and version.
        assert_eq!(&encoded[12..16], &42u32.to_be_bytes());
        // last_entry_page is the final field.
        assert_eq!(&encoded[32..36], &9u32.to_be_bytes());
    }

    #[test]
    fn test_header_page_too_small() {
        assert!(sample().encode(HEADER_SIZE - 1).is_err());
    }

    #[test]
    fn test_header_invalid_label() {
        let mut data = sample().encode(64).unwrap().to_vec();
        data[0] = b'X';
        let err = DatabaseHeader::decode(&data).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_header_root_outside_file() {
        let mut header = sample();
        header.root_page = 42;
        let data = header.encode(64).unwrap();
        assert!(DatabaseHeader::decode(&data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_header_order_too_large_for_page() {
        let mut header = sample();
        header.page_size = 4096;
        header.order = 15;
        let data = header.encode(64).unwrap();
        assert!(DatabaseHeader::decode(&data).unwrap_err().is_corruption());

        header.order = 3;
        let data = header.encode(64).unwrap();
        assert_eq!(DatabaseHeader::decode(&data).unwrap(), header);

        header.order = 2;
        let data = header.encode(64).unwrap();
        assert!(DatabaseHeader::decode(&data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_new_header() {
        let header = DatabaseHeader::new(4096, 3);
        assert_eq!(header.page_count, 1);
        assert_eq!(header.root_page, INITIAL_ROOT_PAGE);
        assert_eq!(header.last_entry_page, 0);
    }
}
