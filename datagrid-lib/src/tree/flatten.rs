//! Render-order flattening of tree rows.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::model::Row;
use crate::model::RowKey;

use super::TreeNode;

/// A row in render order with its tree placement.
#[derive(Debug, Clone)]
pub struct FlatRow {
    pub row: Row,
    /// Row identity, when a row key is configured.
    pub key: Option<String>,
    /// Depth, 0 for top-level rows.
    pub level: usize,
    /// False when any ancestor is collapsed.
    pub display: bool,
    /// `level * indent` pixels.
    pub indent: u32,
    /// Shows an expand affordance.
    pub has_children: bool,
    pub expanded: bool,
    pub loading: bool,
    pub loaded: bool,
    pub lazy: bool,
}

/// Depth-first flattening of `roots` and every known descendant.
///
/// Collapsed branches are kept with `display == false` rather than omitted,
/// so consumers keep stable row identities across expand and collapse.
pub(crate) fn flatten(
    roots: &[Row],
    row_key: Option<&RowKey>,
    nodes: &HashMap<String, TreeNode>,
    rows: &HashMap<String, Row>,
    indent: u32,
) -> Vec<FlatRow> {
    let mut out = Vec::with_capacity(roots.len());
    let Some(row_key) = row_key else {
        out.extend(roots.iter().map(|row| FlatRow {
            row: row.clone(),
            key: None,
            level: 0,
            display: true,
            indent: 0,
            has_children: false,
            expanded: false,
            loading: false,
            loaded: false,
            lazy: false,
        }));
        return out;
    };

    let mut walk = Walk {
        nodes,
        rows,
        indent,
        visited: HashSet::new(),
        out,
    };
    for row in roots {
        walk.push(row, row_key.identity(row), 0, true);
    }
    walk.out
}

struct Walk<'a> {
    nodes: &'a HashMap<String, TreeNode>,
    rows: &'a HashMap<String, Row>,
    indent: u32,
    visited: HashSet<String>,
    out: Vec<FlatRow>,
}

impl Walk<'_> {
    fn push(&mut self, row: &Row, key: String, level: usize, display: bool) {
        if !self.visited.insert(key.clone()) {
            return;
        }
        let node = self.nodes.get(&key);
        self.out.push(FlatRow {
            row: row.clone(),
            key: Some(key),
            level,
            display,
            indent: level as u32 * self.indent,
            has_children: node.is_some_and(TreeNode::has_children),
            expanded: node.is_some_and(|n| n.expanded),
            loading: node.is_some_and(|n| n.loading),
            loaded: node.is_some_and(|n| n.loaded),
            lazy: node.is_some_and(|n| n.lazy),
        });

        let Some(node) = node else {
            return;
        };
        let child_display = display && node.expanded;
        for child_key in &node.children {
            if let Some(child) = self.rows.get(child_key) {
                self.push(child, child_key.clone(), level + 1, child_display);
            }
        }
    }
}
