//! Node splitting.
//!
//! An overflowing node is cut around its middle cell. The middle cell moves
//! up into the parent and points at the left half; the right half becomes the
//! child that follows it.
//!
//! When a non-root child splits, the left half is rewritten at the child's
//! own page number, so every pointer that already led to that page stays
//! valid and only one slot in the parent has to be redirected (to the freshly
//! appended right half). The root's page number never changes: both halves
//! are appended and the root page is rewritten as a one-key non-leaf.

use crate::error::{Error, Result};
use crate::page::{Cell, NodePage, NodeType, PageNum};
use crate::pager::Pager;

/// The pieces of a split node.
#[derive(Debug)]
pub(crate) struct Split {
    pub left: NodePage,
    pub middle: Cell,
    pub right: NodePage,
}

/// Cut `node` around `key_count / 2`.
///
/// The left half takes the middle cell's child as its rightmost child; the
/// right half keeps the node's rightmost child. Both halves are leaves exactly
/// when the middle cell has no child.
pub(crate) fn split_node(node: NodePage) -> Result<Split> {
    let middle_index = node.key_count() / 2;
    if middle_index >= node.cells.len() {
        return Err(Error::corruption(format!(
            "Cannot split node with {} keys at index {}",
            node.key_count(),
            middle_index
        )));
    }

    let mut left_cells = node.cells;
    let right_cells = left_cells.split_off(middle_index + 1);
    let middle = left_cells
        .pop()
        .ok_or_else(|| Error::corruption("Split lost its middle cell"))?;

    let node_type = if middle.child_page == 0 {
        NodeType::Leaf
    } else {
        NodeType::NonLeaf
    };

    let left = NodePage {
        node_type,
        status: node.status,
        rightmost_child: middle.child_page,
        cells: left_cells,
    };
    let right = NodePage {
        node_type,
        status: node.status,
        rightmost_child: node.rightmost_child,
        cells: right_cells,
    };

    Ok(Split { left, middle, right })
}

/// Split the overflowing child found at `child_index` of `parent`.
///
/// Writes the left half over `child_page`, appends the right half, inserts
/// the promoted cell into `parent` and persists `parent` at `parent_page`.
pub(crate) fn split_child(
    pager: &mut Pager,
    parent: &mut NodePage,
    parent_page: PageNum,
    child_index: usize,
    child: NodePage,
    child_page: PageNum,
) -> Result<()> {
    let Split { left, mut middle, right } = split_node(child)?;

    pager.write_page(&left, child_page)?;
    let right_page = pager.append_page(&right)?;

    middle.child_page = child_page;
    parent.cells.insert(child_index, middle);
    parent.set_child_at(child_index + 1, right_page);
    pager.write_page(parent, parent_page)?;

    log::debug!(
        "Split page {}, right half at page {}, parent {}",
        child_page,
        right_page,
        parent_page
    );
    Ok(())
}

/// Split an overflowing root in place.
///
/// Both halves go to new pages and the root page becomes a non-leaf holding
/// only the promoted cell.
pub(crate) fn split_root(pager: &mut Pager, root: NodePage, root_page: PageNum) -> Result<()> {
    let Split { left, mut middle, right } = split_node(root)?;

    let left_page = pager.append_page(&left)?;
    let right_page = pager.append_page(&right)?;

    middle.child_page = left_page;
    let new_root = NodePage::new(NodeType::NonLeaf, vec![middle], right_page);
    pager.write_page(&new_root, root_page)?;

    log::info!(
        "Split root page {} into {} + {}",
        root_page,
        left_page,
        right_page
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::MemoryFile;

    fn leaf_cell(key: &str) -> Cell {
        Cell::leaf(key, 2, 0)
    }

    fn child_cell(key: &str, child: PageNum) -> Cell {
        Cell { child_page: child, entry_page: 2, entry_offset: 0, key: key.to_string() }
    }

    fn keys(node: &NodePage) -> Vec<&str> {
        node.cells.iter().map(|c| c.key.as_str()).collect()
    }

    #[test]
    fn test_split_leaf() {
        let node = NodePage::new(
            NodeType::Leaf,
            vec![leaf_cell("a"), leaf_cell("b"), leaf_cell("c")],
            0,
        );
        let split = split_node(node).unwrap();

        assert_eq!(keys(&split.left), vec!["a"]);
        assert_eq!(split.middle.key, "b");
        assert_eq!(keys(&split.right), vec!["c"]);
        assert!(split.left.is_leaf());
        assert!(split.right.is_leaf());
        assert_eq!(split.left.rightmost_child, 0);
    }

    #[test]
    fn test_split_non_leaf_moves_children() {
        let node = NodePage::new(
            NodeType::NonLeaf,
            vec![child_cell("b", 10), child_cell("d", 11), child_cell("f", 12), child_cell("h", 13)],
            14,
        );
        let split = split_node(node).unwrap();

        // middle_index = 4 / 2 = 2
        assert_eq!(keys(&split.left), vec!["b", "d"]);
        assert_eq!(split.middle.key, "f");
        assert_eq!(keys(&split.right), vec!["h"]);

        assert_eq!(split.left.node_type, NodeType::NonLeaf);
        assert_eq!(split.left.rightmost_child, 12);
        assert_eq!(split.right.rightmost_child, 14);
    }

    #[test]
    fn test_split_preserves_keys() {
        let cells: Vec<Cell> = (0..15).map(|i| leaf_cell(&format!("k{:02}", i))).collect();
        let before: Vec<String> = cells.iter().map(|c| c.key.clone()).collect();
        let split = split_node(NodePage::new(NodeType::Leaf, cells, 0)).unwrap();

        let mut after: Vec<String> = split.left.cells.iter().map(|c| c.key.clone()).collect();
        after.push(split.middle.key.clone());
        after.extend(split.right.cells.iter().map(|c| c.key.clone()));
        assert_eq!(after, before);
    }

    #[test]
    fn test_split_empty_node_is_corruption() {
        let err = split_node(NodePage::empty_leaf()).unwrap_err();
        assert!(err.is_corruption());
    }

    #[test]
    fn test_split_child_rewrites_in_place() {
        let mut pager = Pager::create(Box::new(MemoryFile::new()), 4096, 3).unwrap();

        // Root (page 1) with one key pointing at two leaves.
        let left_leaf = NodePage::new(NodeType::Leaf, vec![leaf_cell("a")], 0);
        let full_leaf = NodePage::new(
            NodeType::Leaf,
            vec![leaf_cell("c"), leaf_cell("d"), leaf_cell("e")],
            0,
        );
        let left_page = pager.append_page(&left_leaf).unwrap();
        let full_page = pager.append_page(&full_leaf).unwrap();
        let mut root = NodePage::new(NodeType::NonLeaf, vec![child_cell("b", left_page)], full_page);
        pager.write_page(&root, 1).unwrap();

        split_child(&mut pager, &mut root, 1, 1, full_leaf, full_page).unwrap();

        assert_eq!(keys(&root), vec!["b", "d"]);
        assert_eq!(root.cells[1].child_page, full_page);
        let right_page = root.rightmost_child;
        assert_eq!(right_page, 4);

        assert_eq!(pager.read_node(1).unwrap(), root);
        assert_eq!(keys(&pager.read_node(full_page).unwrap()), vec!["c"]);
        assert_eq!(keys(&pager.read_node(right_page).unwrap()), vec!["e"]);
    }

    #[test]
    fn test_split_root_keeps_page_number() {
        let mut pager = Pager::create(Box::new(MemoryFile::new()), 4096, 3).unwrap();
        let root = NodePage::new(
            NodeType::Leaf,
            vec![leaf_cell("a"), leaf_cell("b"), leaf_cell("c")],
            0,
        );
        pager.write_page(&root, 1).unwrap();

        split_root(&mut pager, root, 1).unwrap();

        let new_root = pager.read_node(1).unwrap();
        assert_eq!(new_root.node_type, NodeType::NonLeaf);
        assert_eq!(keys(&new_root), vec!["b"]);
        assert_eq!(new_root.cells[0].child_page, 2);
        assert_eq!(new_root.rightmost_child, 3);
        assert_eq!(keys(&pager.read_node(2).unwrap()), vec!["a"]);
        assert_eq!(keys(&pager.read_node(3).unwrap()), vec!["c"]);
    }
}
