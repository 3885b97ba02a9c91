//! Tidy tree layout for boundary-event branches, after Reingold–Tilford.
//!
//! The first walk computes a preliminary X for every node from subtree
//! widths, centering each parent above its children. The second walk adds
//! the accumulated modifier and assigns Y from the depth. The result maps
//! node ids to top-left positions in a local frame rooted at `(0, 0)`.

use indexmap::IndexMap;

use crate::geometry::{Bounds, Point};

/// A node of the branch tree handed to the layouter.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub id: String,
    pub width: f64,
    pub height: f64,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Creates a leaf node.
    #[must_use]
    pub fn leaf(id: impl Into<String>, width: f64, height: f64) -> Self {
        Self {
            id: id.into(),
            width,
            height,
            children: Vec::new(),
        }
    }

    fn max_height(&self) -> f64 {
        self.children
            .iter()
            .map(TreeNode::max_height)
            .fold(self.height, f64::max)
    }
}

/// Lays out a tree with the given gaps, returning id → top-left position.
#[must_use]
pub fn layout_tree(root: &TreeNode, horizontal_gap: f64, vertical_gap: f64) -> IndexMap<String, Point> {
    let mut positions = IndexMap::new();
    let level_step = root.max_height() + vertical_gap;
    place(root, 0.0, 0, horizontal_gap, level_step, &mut positions);
    positions
}

/// Width of the slot a subtree occupies, including inner gaps.
fn subtree_width(node: &TreeNode, horizontal_gap: f64) -> f64 {
    if node.children.is_empty() {
        return node.width;
    }
    let children: f64 = node
        .children
        .iter()
        .map(|child| subtree_width(child, horizontal_gap))
        .sum::<f64>()
        + horizontal_gap * (node.children.len() as f64 - 1.0);
    children.max(node.width)
}

fn place(
    node: &TreeNode,
    slot_x: f64,
    depth: usize,
    horizontal_gap: f64,
    level_step: f64,
    out: &mut IndexMap<String, Point>,
) {
    let slot = subtree_width(node, horizontal_gap);
    // Parent centered above its slot; children divide the slot left to right.
    let x = slot_x + (slot - node.width) / 2.0;
    let y = depth as f64 * level_step;
    out.insert(node.id.clone(), Point::new(x, y));

    let mut cursor = slot_x;
    if !node.children.is_empty() {
        let children_width: f64 = node
            .children
            .iter()
            .map(|child| subtree_width(child, horizontal_gap))
            .sum::<f64>()
            + horizontal_gap * (node.children.len() as f64 - 1.0);
        cursor += (slot - children_width) / 2.0;
    }
    for child in &node.children {
        place(child, cursor, depth + 1, horizontal_gap, level_step, out);
        cursor += subtree_width(child, horizontal_gap) + horizontal_gap;
    }
}

/// Lays out a boundary branch and translates it so the tree hangs centered
/// under the host's horizontal midline, `gap` below the host's bottom edge.
#[must_use]
pub fn layout_boundary_branch(
    root: &TreeNode,
    host: &Bounds,
    gap: f64,
    horizontal_gap: f64,
    vertical_gap: f64,
) -> IndexMap<String, Point> {
    let mut positions = layout_tree(root, horizontal_gap, vertical_gap);
    let root_pos = positions
        .get(root.id.as_str())
        .copied()
        .unwrap_or_default();
    let host_mid = host.x + host.width / 2.0;
    let dx = host_mid - (root_pos.x + root.width / 2.0);
    let dy = host.bottom() + gap - root_pos.y;
    for position in positions.values_mut() {
        *position = position.translated(dx, dy);
    }
    positions
}
