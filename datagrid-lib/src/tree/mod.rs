//! Hierarchical rows: normalization, expansion, lazy children and flattening.

mod flatten;
mod loader;
mod node;

pub use flatten::FlatRow;
pub use loader::*;
pub use node::TreeNode;
pub use node::is_tree_data;

use std::collections::HashMap;
use std::collections::HashSet;

use log::trace;

use crate::config::GridConfig;
use crate::config::TreeProps;
use crate::error::GridError;
use crate::error::Result;
use crate::model::Row;
use crate::model::RowKey;

use node::ExpandSeed;
use node::Normalize;
use node::index_inline;

/// Identity-keyed tree state for the current projection.
///
/// Nodes exist only for parent rows (inline children or lazy). Lazily loaded
/// children are kept per parent identity and survive data replacement for as
/// long as the parent identity is still present.
#[derive(Debug, Clone, Default)]
pub struct TreeStore {
    nodes: HashMap<String, TreeNode>,
    rows: HashMap<String, Row>,
    inline_children: HashMap<String, Vec<Row>>,
    lazy_children: HashMap<String, Vec<Row>>,
    seed: ExpandSeed,
    props: TreeProps,
    indent: u32,
}

impl TreeStore {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            seed: ExpandSeed {
                expand_all: config.default_expand_all,
                keys: config
                    .expand_row_keys
                    .as_ref()
                    .map(|keys| keys.iter().cloned().collect()),
            },
            props: config.tree_props.clone(),
            indent: config.indent,
            ..Default::default()
        }
    }

    pub fn props(&self) -> &TreeProps {
        &self.props
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Indexes inline children of freshly set raw rows.
    ///
    /// Tree data needs row identities, so this fails without a row key
    /// (leaving the store untouched).
    pub fn index_data(&mut self, raw: &[Row], row_key: Option<&RowKey>) -> Result<()> {
        let Some(row_key) = row_key else {
            if is_tree_data(raw, &self.props) {
                return Err(GridError::row_key_required("tree data"));
            }
            self.inline_children.clear();
            return Ok(());
        };

        // Raw data wins over stale lazily loaded rows with the same identity.
        let mut inline = HashMap::new();
        for children in self.lazy_children.values() {
            index_inline(children, row_key, &self.props, &mut inline);
        }
        index_inline(raw, row_key, &self.props, &mut inline);
        self.inline_children = inline;
        Ok(())
    }

    /// Re-normalizes the tree over the (filtered, sorted) top-level rows.
    pub fn normalize(&mut self, roots: &[Row], row_key: Option<&RowKey>) {
        let Some(row_key) = row_key else {
            self.nodes.clear();
            self.rows.clear();
            return;
        };
        let normalized = Normalize {
            row_key,
            props: &self.props,
            inline: &self.inline_children,
            lazy: &self.lazy_children,
            previous: &self.nodes,
            seed: &self.seed,
        }
        .run(roots);
        trace!(
            "Normalized {} tree nodes over {} rows",
            normalized.nodes.len(),
            normalized.rows.len()
        );
        self.nodes = normalized.nodes;
        self.rows = normalized.rows;
    }

    /// Drops lazily loaded children whose parent identity no longer exists.
    pub fn retain_lazy(&mut self, live: &HashSet<String>) {
        self.lazy_children.retain(|key, _| live.contains(key));
    }

    /// Every row reachable from `raw`, parents before children.
    ///
    /// Unlike the projection this includes filtered-out rows.
    pub fn all_rows(&self, raw: &[Row], row_key: Option<&RowKey>) -> Vec<Row> {
        let Some(row_key) = row_key else {
            return raw.to_vec();
        };
        let mut out = Vec::with_capacity(raw.len());
        let mut visited = HashSet::new();
        let mut stack: Vec<Row> = raw.iter().rev().cloned().collect();
        while let Some(row) = stack.pop() {
            let key = row_key.identity(&row);
            if !visited.insert(key.clone()) {
                continue;
            }
            if let Some(children) = self.children_of(&key) {
                stack.extend(children.iter().rev().cloned());
            }
            out.push(row);
        }
        out
    }

    /// Child rows of a parent identity (inline, else lazily loaded).
    pub fn children_of(&self, key: &str) -> Option<&[Row]> {
        self.inline_children
            .get(key)
            .or_else(|| self.lazy_children.get(key))
            .map(Vec::as_slice)
    }

    // =========================================================================
    // Nodes
    // =========================================================================

    pub fn node(&self, key: &str) -> Option<&TreeNode> {
        self.nodes.get(key)
    }

    pub fn nodes(&self) -> &HashMap<String, TreeNode> {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// A row of the current tree by identity.
    pub fn row(&self, key: &str) -> Option<&Row> {
        self.rows.get(key)
    }

    /// Sets a node's expansion. Returns `true` if it changed.
    pub fn set_expanded(&mut self, key: &str, expanded: bool) -> bool {
        match self.nodes.get_mut(key) {
            Some(node) if node.expanded != expanded => {
                node.expanded = expanded;
                true
            }
            _ => false,
        }
    }

    /// Applies an explicit expanded-key list.
    ///
    /// Every node is expanded iff its identity is listed (or expand-all is
    /// on), regardless of its previous state. The list also seeds
    /// identities that appear later.
    pub fn set_expand_keys(&mut self, keys: HashSet<String>) {
        self.seed.keys = Some(keys);
        for (key, node) in self.nodes.iter_mut() {
            node.expanded = self.seed.includes(key);
        }
    }

    // =========================================================================
    // Lazy loading
    // =========================================================================

    pub fn set_loading(&mut self, key: &str, loading: bool) {
        if let Some(node) = self.nodes.get_mut(key) {
            node.loading = loading;
        }
    }

    /// Stores loaded children and marks the node loaded and expanded.
    ///
    /// The caller re-normalizes afterwards to pick the children up.
    pub fn finish_load(&mut self, key: &str, children: Vec<Row>, row_key: &RowKey) {
        index_inline(&children, row_key, &self.props, &mut self.inline_children);
        self.lazy_children.insert(key.to_string(), children);
        if let Some(node) = self.nodes.get_mut(key) {
            node.loading = false;
            node.loaded = true;
            node.expanded = true;
        }
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Flattens `roots` and their descendants in render order.
    pub fn flatten(&self, roots: &[Row], row_key: Option<&RowKey>) -> Vec<FlatRow> {
        flatten::flatten(roots, row_key, &self.nodes, &self.rows, self.indent)
    }
}
