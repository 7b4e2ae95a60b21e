//! Reading values back from the overflow log.

use super::{decode_value, encoded_len, EntryPointer};
use crate::error::{Error, Result};
use crate::pager::Pager;

/// Reads values out of the overflow log.
pub struct OverflowReader<'a> {
    pager: &'a Pager,
}

impl<'a> OverflowReader<'a> {
    /// Create a reader over the pager's overflow log.
    pub fn new(pager: &'a Pager) -> Self {
        Self { pager }
    }

    /// Read the value starting at `ptr`.
    ///
    /// Follows `next_page` links from the starting page and stops once the
    /// whole length-prefixed blob has been collected.
    pub fn read(&self, ptr: EntryPointer) -> Result<Vec<u8>> {
        if ptr.page == 0 {
            return Err(Error::corruption("Cell has no entry page"));
        }

        let mut collected = Vec::new();
        let mut page_num = ptr.page;
        let mut offset = ptr.offset as usize;
        let mut hops = 0u32;

        while page_num != 0 {
            hops += 1;
            if hops > self.pager.page_count() {
                return Err(Error::corruption(format!(
                    "Overflow chain from page {} loops",
                    ptr.page
                )));
            }

            let page = self.pager.read_entry(page_num)?;
            let content = page.content.get(offset..).ok_or_else(|| {
                Error::corruption(format!(
                    "Entry offset {} past content of page {} ({} bytes)",
                    offset,
                    page_num,
                    page.content.len()
                ))
            })?;
            collected.extend_from_slice(content);
            offset = 0;

            if encoded_len(&collected).is_some_and(|len| collected.len() >= len) {
                break;
            }
            page_num = page.next_page;
        }

        decode_value(&collected)
    }
}
