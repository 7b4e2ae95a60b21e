//! B-tree node pages and their cells.

use super::{Page, PageNum, CELL_SIZE, MAX_KEY_SIZE, NODE_HEADER_SIZE};
use crate::buffer::{BufferReader, BufferWriter};
use crate::error::{Error, Result};
use bytes::Bytes;
use std::cmp::Ordering;

/// Whether a node has children.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeType {
    /// Interior node; every cell and the rightmost pointer lead to a child.
    NonLeaf = 0x02,
    /// Leaf node; cells carry no child pointer.
    Leaf = 0x05,
}

impl NodeType {
    /// Convert from the on-disk flag.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x02 => Ok(NodeType::NonLeaf),
            0x05 => Ok(NodeType::Leaf),
            _ => Err(Error::corruption(format!("Invalid node type flag: {:#04x}", value))),
        }
    }
}

/// Page status flag. Written on every node, not consulted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PageStatus {
    /// Page is live.
    Active = 0x01,
    /// Page is retired.
    Inactive = 0x00,
}

impl PageStatus {
    /// Convert from the on-disk flag.
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0x01 => Ok(PageStatus::Active),
            0x00 => Ok(PageStatus::Inactive),
            _ => Err(Error::corruption(format!("Invalid page status flag: {:#04x}", value))),
        }
    }
}

/// Compare two keys the way the tree orders them: ASCII, case-insensitive.
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// A fixed-size record pairing a key with a child pointer and the location of
/// its value in the overflow log.
///
/// Format (1040 bytes):
/// ```text
/// [child_page: u32]     // 0 in a leaf
/// [entry_page: u32]     // overflow page holding the value's first byte
/// [entry_offset: u32]   // offset of that byte in the page's content
/// [key_len: u32][key: key_len bytes, slot of 1024 bytes]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Child holding keys that sort before this cell's key.
    pub child_page: PageNum,
    /// Overflow page where the value starts.
    pub entry_page: PageNum,
    /// Byte offset of the value inside the entry page's content.
    pub entry_offset: u32,
    /// The key, stored with its original case.
    pub key: String,
}

impl Cell {
    /// Create a leaf cell pointing at a value in the overflow log.
    pub fn leaf(key: impl Into<String>, entry_page: PageNum, entry_offset: u32) -> Self {
        Self { child_page: 0, entry_page, entry_offset, key: key.into() }
    }

    fn encode_into(&self, writer: &mut BufferWriter) -> Result<()> {
        if self.key.len() > MAX_KEY_SIZE {
            return Err(Error::overflow(self.key.len(), MAX_KEY_SIZE));
        }
        writer.write_u32(self.child_page)?;
        writer.write_u32(self.entry_page)?;
        writer.write_u32(self.entry_offset)?;
        writer.write_ascii_string(&self.key)
    }

    fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = BufferReader::new(data);
        let child_page = reader.read_u32()?;
        let entry_page = reader.read_u32()?;
        let entry_offset = reader.read_u32()?;
        let key = reader.read_ascii_string()?;
        if key.len() > MAX_KEY_SIZE {
            return Err(Error::corruption(format!("Cell key of {} bytes", key.len())));
        }
        Ok(Self { child_page, entry_page, entry_offset, key })
    }
}

/// A B-tree node page.
///
/// Format:
/// ```text
/// [type: u8][status: u8][key_count: u32][rightmost_child: u32]
/// [Cell 0]
/// ...
/// [Cell key_count - 1]
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodePage {
    /// Leaf or non-leaf.
    pub node_type: NodeType,
    /// Status flag.
    pub status: PageStatus,
    /// Child holding keys greater than every cell key; 0 in a leaf.
    pub rightmost_child: PageNum,
    /// Cells sorted ascending by case-insensitive key.
    pub cells: Vec<Cell>,
}

impl NodePage {
    /// An empty, active leaf.
    pub fn empty_leaf() -> Self {
        Self::new(NodeType::Leaf, Vec::new(), 0)
    }

    /// An active node with the given cells.
    pub fn new(node_type: NodeType, cells: Vec<Cell>, rightmost_child: PageNum) -> Self {
        Self { node_type, status: PageStatus::Active, rightmost_child, cells }
    }

    /// Number of keys in the node.
    pub fn key_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns true for a leaf.
    pub fn is_leaf(&self) -> bool {
        self.node_type == NodeType::Leaf
    }

    /// Locate `key` among the cells.
    ///
    /// `Ok(i)` is an exact (case-insensitive) match at cell `i`; `Err(i)` is the
    /// index at which the key would be inserted.
    pub fn position(&self, key: &str) -> std::result::Result<usize, usize> {
        self.cells.binary_search_by(|cell| compare_keys(&cell.key, key))
    }

    /// Child pointer to follow for keys that land at `index`.
    pub fn child_at(&self, index: usize) -> PageNum {
        self.cells.get(index).map_or(self.rightmost_child, |cell| cell.child_page)
    }

    /// Point the slot at `index` to `page`. Past the last cell this is the
    /// rightmost child.
    pub fn set_child_at(&mut self, index: usize, page: PageNum) {
        match self.cells.get_mut(index) {
            Some(cell) => cell.child_page = page,
            None => self.rightmost_child = page,
        }
    }

    /// Decode a node page.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut reader = BufferReader::new(data);
        let node_type = NodeType::from_u8(reader.read_u8()?)?;
        let status = PageStatus::from_u8(reader.read_u8()?)?;
        let key_count = reader.read_u32()? as usize;
        let rightmost_child = reader.read_u32()?;

        let end = key_count
            .checked_mul(CELL_SIZE)
            .and_then(|size| size.checked_add(NODE_HEADER_SIZE));
        match end {
            Some(end) if end <= data.len() => {}
            _ => {
                return Err(Error::corruption(format!(
                    "Key count {} does not fit a page of {} bytes",
                    key_count,
                    data.len()
                )))
            }
        }

        let cells = data[NODE_HEADER_SIZE..]
            .chunks_exact(CELL_SIZE)
            .take(key_count)
            .map(Cell::decode)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { node_type, status, rightmost_child, cells })
    }
}

impl Page for NodePage {
    fn encode(&self, page_size: usize) -> Result<Bytes> {
        let mut writer = BufferWriter::new(page_size);
        writer.write_u8(self.node_type as u8)?;
        writer.write_u8(self.status as u8)?;
        writer.write_u32(self.cells.len() as u32)?;
        writer.write_u32(self.rightmost_child)?;

        for (i, cell) in self.cells.iter().enumerate() {
            let offset = NODE_HEADER_SIZE + i * CELL_SIZE;
            if offset + CELL_SIZE > page_size {
                return Err(Error::overflow(offset + CELL_SIZE, page_size));
            }
            writer.seek(offset)?;
            cell.encode_into(&mut writer)?;
        }

        Ok(writer.finish())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE_SIZE: usize = 4096;

    fn cell(key: &str, child: PageNum) -> Cell {
        Cell { child_page: child, entry_page: 7, entry_offset: 12, key: key.to_string() }
    }

    #[test]
    fn test_empty_leaf_encode_decode() {
        let node = NodePage::empty_leaf();
        let data = node.encode(PAGE_SIZE).unwrap();
        assert_eq!(data.len(), PAGE_SIZE);
        assert_eq!(&data[..NODE_HEADER_SIZE], &[0x05, 0x01, 0, 0, 0, 0, 0, 0, 0, 0]);

        let decoded = NodePage::decode(&data).unwrap();
        assert_eq!(decoded, node);
        assert!(decoded.is_leaf());
    }

    #[test]
    fn test_non_leaf_encode_decode() {
        let node = NodePage::new(NodeType::NonLeaf, vec![cell("apple", 3), cell("melon", 4)], 5);
        let data = node.encode(PAGE_SIZE).unwrap();

        // Second cell starts exactly one cell size after the first.
        let second = NODE_HEADER_SIZE + CELL_SIZE;
        assert_eq!(&data[second..second + 4], &4u32.to_be_bytes());

        let decoded = NodePage::decode(&data).unwrap();
        assert_eq!(decoded, node);
        assert_eq!(decoded.key_count(), 2);
    }

    #[test]
    fn test_full_node_encode_decode() {
        let cells: Vec<Cell> = (0..3).map(|i| cell(&format!("key{}", i), 0)).collect();
        let node = NodePage::new(NodeType::Leaf, cells, 0);
        let page_size = NODE_HEADER_SIZE + 3 * CELL_SIZE;

        let data = node.encode(page_size).unwrap();
        assert_eq!(NodePage::decode(&data).unwrap(), node);

        assert!(matches!(node.encode(page_size - 1), Err(Error::Overflow { .. })));
    }

    #[test]
    fn test_longest_key_fits_cell() {
        let key = "k".repeat(MAX_KEY_SIZE);
        let node = NodePage::new(NodeType::Leaf, vec![cell(&key, 0)], 0);
        let data = node.encode(PAGE_SIZE).unwrap();
        assert_eq!(NodePage::decode(&data).unwrap().cells[0].key, key);

        let too_long = NodePage::new(NodeType::Leaf, vec![cell(&format!("{}k", key), 0)], 0);
        assert!(too_long.encode(PAGE_SIZE).is_err());
    }

    #[test]
    fn test_key_count_mismatch() {
        let node = NodePage::new(NodeType::Leaf, vec![cell("a", 0)], 0);
        let mut data = node.encode(PAGE_SIZE).unwrap().to_vec();
        data[2..6].copy_from_slice(&1000u32.to_be_bytes());

        let err = NodePage::decode(&data).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_invalid_type_flag() {
        let mut data = NodePage::empty_leaf().encode(PAGE_SIZE).unwrap().to_vec();
        data[0] = 0x09;
        assert!(NodePage::decode(&data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_status_flag() {
        let mut node = NodePage::new(NodeType::Leaf, vec![cell("k", 0)], 0);
        node.status = PageStatus::Inactive;
        let mut data = node.encode(PAGE_SIZE).unwrap().to_vec();
        assert_eq!(data[1], 0x00);
        assert_eq!(NodePage::decode(&data).unwrap().status, PageStatus::Inactive);

        data[1] = 0x07;
        assert!(NodePage::decode(&data).unwrap_err().is_corruption());
    }

    #[test]
    fn test_position_is_case_insensitive() {
        let node = NodePage::new(
            NodeType::Leaf,
            vec![cell("Apple", 0), cell("banana", 0), cell("Cherry", 0)],
            0,
        );
        assert_eq!(node.position("apple"), Ok(0));
        assert_eq!(node.position("BANANA"), Ok(1));
        assert_eq!(node.position("blueberry"), Err(2));
        assert_eq!(node.position("aardvark"), Err(0));
        assert_eq!(node.position("zebra"), Err(3));
    }

    #[test]
    fn test_child_at() {
        let mut node = NodePage::new(NodeType::NonLeaf, vec![cell("m", 3)], 4);
        assert_eq!(node.child_at(0), 3);
        assert_eq!(node.child_at(1), 4);

        node.set_child_at(1, 9);
        assert_eq!(node.rightmost_child, 9);
        node.set_child_at(0, 8);
        assert_eq!(node.cells[0].child_page, 8);
    }

    #[test]
    fn test_compare_keys() {
        assert_eq!(compare_keys("ABC", "abc"), Ordering::Equal);
        assert_eq!(compare_keys("abc", "abd"), Ordering::Less);
        assert_eq!(compare_keys("ab", "abc"), Ordering::Less);
        assert_eq!(compare_keys("Z", "a"), Ordering::Greater);
    }
}
