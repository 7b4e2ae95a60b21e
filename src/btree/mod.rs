//! B-tree engine over node pages.
//!
//! Keys are ASCII strings compared case-insensitively; values live in the
//! overflow log and cells only point at them. A node holds at most
//! `order - 1` keys. Leaves and non-leaves are told apart by the type flag
//! stored in each page.
//!
//! No node is kept in memory between calls. Every operation starts by
//! reading the root page and descends by reading child pages through the
//! pager, whose cache makes repeated reads cheap.
//!
//! Inserts descend iteratively, remembering the path from the root. After the
//! new cell lands in its leaf, overflowing nodes are split bottom-up along
//! that path, and finally the root itself if it overflowed.

mod split;

use crate::error::{Error, Result};
use crate::overflow::{EntryPointer, OverflowReader, OverflowWriter};
use crate::page::node::compare_keys;
use crate::page::{Cell, NodePage, PageNum, MAX_KEY_SIZE};
use crate::pager::Pager;
use split::{split_child, split_root};
use std::cmp::Ordering;

/// Result of an insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The key was new and its value was stored.
    Inserted,
    /// The key already existed. Nothing was written and the old value stays.
    DuplicateIgnored,
}

/// Shape of the tree as found by [`BTree::verify`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeStats {
    /// Number of levels; 1 for a lone leaf root.
    pub height: usize,
    /// Number of node pages reachable from the root.
    pub node_count: usize,
    /// Number of keys across all nodes.
    pub key_count: usize,
}

/// A non-leaf node on the way down, with the slot the descent took.
struct PathStep {
    page_num: PageNum,
    node: NodePage,
    child_index: usize,
}

/// A B-tree rooted at a fixed page.
#[derive(Debug, Clone, Copy)]
pub struct BTree {
    order: usize,
    root_page: PageNum,
}

impl BTree {
    /// Create a tree handle. The root page must already hold a node.
    pub fn new(order: u32, root_page: PageNum) -> Self {
        Self { order: order as usize, root_page }
    }

    /// The tree's order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Maximum keys per node.
    pub fn max_keys(&self) -> usize {
        self.order - 1
    }

    /// Page number of the root.
    pub fn root_page(&self) -> PageNum {
        self.root_page
    }

    /// Look up the value stored under `key`.
    pub fn search(&self, pager: &Pager, key: &str) -> Result<Option<Vec<u8>>> {
        let mut page_num = self.root_page;
        let mut depth = 0;

        loop {
            let node = pager.read_node(page_num)?;
            let index = match node.position(key) {
                Ok(index) => {
                    let cell = &node.cells[index];
                    let ptr = EntryPointer::new(cell.entry_page, cell.entry_offset);
                    return OverflowReader::new(pager).read(ptr).map(Some);
                }
                Err(index) => index,
            };

            if node.is_leaf() {
                return Ok(None);
            }
            page_num = self.descend(pager, &node, index, page_num, &mut depth)?;
        }
    }

    /// Insert `value` under `key`.
    ///
    /// If the key already exists anywhere on the descent path the call does
    /// nothing and returns [`InsertOutcome::DuplicateIgnored`].
    pub fn insert(&self, pager: &mut Pager, key: &str, value: &[u8]) -> Result<InsertOutcome> {
        validate_key(key)?;

        let mut path: Vec<PathStep> = Vec::new();
        let mut page_num = self.root_page;
        let mut depth = 0;

        let (leaf_page, mut leaf, index) = loop {
            let node = pager.read_node(page_num)?;
            let index = match node.position(key) {
                Ok(_) => {
                    log::debug!("Key {:?} already present, insert ignored", key);
                    return Ok(InsertOutcome::DuplicateIgnored);
                }
                Err(index) => index,
            };

            if node.is_leaf() {
                break (page_num, node, index);
            }
            let child = self.descend(pager, &node, index, page_num, &mut depth)?;
            path.push(PathStep { page_num, node, child_index: index });
            page_num = child;
        };

        let ptr = OverflowWriter::new(pager).append(value)?;
        leaf.cells.insert(index, Cell::leaf(key, ptr.page, ptr.offset));
        pager.write_page(&leaf, leaf_page)?;
        pager.increment_key_count()?;
        log::trace!("Inserted key {:?} into page {}", key, leaf_page);

        let mut child_page = leaf_page;
        let mut child = leaf;
        while child.key_count() > self.max_keys() {
            let Some(mut parent) = path.pop() else {
                split_root(pager, child, self.root_page)?;
                break;
            };
            split_child(
                pager,
                &mut parent.node,
                parent.page_num,
                parent.child_index,
                child,
                child_page,
            )?;
            child_page = parent.page_num;
            child = parent.node;
        }

        Ok(InsertOutcome::Inserted)
    }

    /// Walk the whole tree and check its structural invariants.
    ///
    /// Checks that every node holds at most `order - 1` keys, keys are strictly
    /// ascending inside a node and within the bounds set by its ancestors,
    /// leaf cells carry no child pointer, non-leaf pointers are non-zero and
    /// all leaves sit at the same depth.
    pub fn verify(&self, pager: &Pager) -> Result<TreeStats> {
        let mut stats = TreeStats::default();
        let mut leaf_depth = None;
        self.verify_node(pager, self.root_page, None, None, 1, &mut leaf_depth, &mut stats)?;
        stats.height = leaf_depth.unwrap_or(1);
        Ok(stats)
    }

    #[allow(clippy::too_many_arguments)]
    fn verify_node(
        &self,
        pager: &Pager,
        page_num: PageNum,
        lower: Option<&str>,
        upper: Option<&str>,
        depth: usize,
        leaf_depth: &mut Option<usize>,
        stats: &mut TreeStats,
    ) -> Result<()> {
        if depth > pager.page_count() as usize {
            return Err(Error::corruption(format!("Tree loops through page {}", page_num)));
        }
        let node = pager.read_node(page_num)?;
        stats.node_count += 1;
        stats.key_count += node.key_count();

        let is_root = page_num == self.root_page;
        if node.key_count() > self.max_keys() {
            return Err(Error::corruption(format!(
                "Page {} holds {} keys, max is {}",
                page_num,
                node.key_count(),
                self.max_keys()
            )));
        }
        if !is_root && node.key_count() == 0 {
            return Err(Error::corruption(format!("Non-root page {} is empty", page_num)));
        }

        for pair in node.cells.windows(2) {
            if compare_keys(&pair[0].key, &pair[1].key) != Ordering::Less {
                return Err(Error::corruption(format!("Keys out of order in page {}", page_num)));
            }
        }
        if let (Some(lower), Some(first)) = (lower, node.cells.first()) {
            if compare_keys(&first.key, lower) != Ordering::Greater {
                return Err(Error::corruption(format!("Page {} breaks its lower bound", page_num)));
            }
        }
        if let (Some(upper), Some(last)) = (upper, node.cells.last()) {
            if compare_keys(&last.key, upper) != Ordering::Less {
                return Err(Error::corruption(format!("Page {} breaks its upper bound", page_num)));
            }
        }

        if node.is_leaf() {
            if node.rightmost_child != 0 || node.cells.iter().any(|c| c.child_page != 0) {
                return Err(Error::corruption(format!("Leaf page {} has children", page_num)));
            }
            match *leaf_depth {
                None => *leaf_depth = Some(depth),
                Some(expected) if expected != depth => {
                    return Err(Error::corruption(format!(
                        "Leaf page {} at depth {}, expected {}",
                        page_num, depth, expected
                    )))
                }
                Some(_) => {}
            }
            return Ok(());
        }

        for index in 0..=node.cells.len() {
            let child = node.child_at(index);
            if child == 0 {
                return Err(Error::corruption(format!(
                    "Non-leaf page {} has no child at slot {}",
                    page_num, index
                )));
            }
            let child_lower = if index == 0 { lower } else { Some(node.cells[index - 1].key.as_str()) };
            let child_upper = node.cells.get(index).map(|c| c.key.as_str()).or(upper);
            self.verify_node(pager, child, child_lower, child_upper, depth + 1, leaf_depth, stats)?;
        }
        Ok(())
    }

    /// Follow the child at `index` of a non-leaf node.
    fn descend(
        &self,
        pager: &Pager,
        node: &NodePage,
        index: usize,
        page_num: PageNum,
        depth: &mut usize,
    ) -> Result<PageNum> {
        let child = node.child_at(index);
        if child == 0 {
            return Err(Error::corruption(format!(
                "Non-leaf page {} has no child at slot {}",
                page_num, index
            )));
        }
        *depth += 1;
        if *depth > pager.page_count() as usize {
            return Err(Error::corruption(format!("Tree loops through page {}", child)));
        }
        Ok(child)
    }
}

/// Check that a key can be stored in a cell.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(Error::invalid_argument("key must not be empty"));
    }
    if !key.is_ascii() {
        return Err(Error::invalid_argument(format!("key {:?} is not ASCII", key)));
    }
    if key.len() > MAX_KEY_SIZE {
        return Err(Error::invalid_argument(format!(
            "key of {} bytes exceeds the {} byte limit",
            key.len(),
            MAX_KEY_SIZE
        )));
    }
    Ok(())
}
