//! Entry pages: the links of the overflow log.

use super::{Page, PageNum, ENTRY_FOOTER_SIZE};
use crate::buffer::{BufferReader, BufferWriter};
use crate::error::{Error, Result};
use bytes::Bytes;

/// A page of raw value bytes in a forward-linked chain.
///
/// Format:
/// ```text
/// [content_len: u32]
/// [content: content_len bytes]
/// [zero padding]
/// [next_page: u32]   // last 4 bytes of the page, 0 = end of chain
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryPage {
    /// Value bytes held by this page.
    pub content: Vec<u8>,
    /// Next page in the chain, 0 if this is the last one.
    pub next_page: PageNum,
}

impl EntryPage {
    /// An empty page at the end of a chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// Content bytes a page of `page_size` can hold.
    pub fn capacity(page_size: usize) -> usize {
        page_size.saturating_sub(ENTRY_FOOTER_SIZE)
    }

    /// Decode an entry page. The page size is the length of `data`.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let page_size = data.len();
        let mut reader = BufferReader::new(data);

        let content_len = reader.read_u32()? as usize;
        if content_len > Self::capacity(page_size) {
            return Err(Error::corruption(format!(
                "Entry content of {} bytes exceeds page capacity {}",
                content_len,
                Self::capacity(page_size)
            )));
        }
        let content = reader.read_bytes(content_len)?.to_vec();

        reader.seek(page_size - 4)?;
        let next_page = reader.read_u32()?;

        Ok(Self { content, next_page })
    }
}

impl Page for EntryPage {
    fn encode(&self, page_size: usize) -> Result<Bytes> {
        if self.content.len() > Self::capacity(page_size) {
            return Err(Error::overflow(self.content.len(), Self::capacity(page_size)));
        }

        let mut writer = BufferWriter::new(page_size);
        writer.write_u32(self.content.len() as u32)?;
        writer.write_bytes(&self.content)?;
        writer.seek(page_size - 4)?;
        writer.write_u32(self.next_page)?;
        Ok(writer.finish())
    }
}
