//! Tree nodes and normalization of hierarchical rows.

use std::collections::HashMap;
use std::collections::HashSet;

use serde::Serialize;

use crate::config::TreeProps;
use crate::model::Row;
use crate::model::RowKey;
use crate::model::is_truthy;

/// Expansion and loading state of a parent row.
///
/// Only rows with children (inline or lazy) have a node. `loaded` only ever
/// goes from false to true for a given identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// Child identities in declaration order.
    pub children: Vec<String>,
    /// Depth, 0 for top-level rows.
    pub level: usize,
    pub expanded: bool,
    pub loading: bool,
    pub loaded: bool,
    /// Declares children through the has-children flag without an inline array.
    pub lazy: bool,
}

impl TreeNode {
    /// Whether the row shows an expand affordance.
    pub fn has_children(&self) -> bool {
        !self.children.is_empty() || (self.lazy && !self.loaded)
    }
}

/// Initial expansion for identities seen for the first time.
#[derive(Debug, Clone, Default)]
pub(crate) struct ExpandSeed {
    pub expand_all: bool,
    pub keys: Option<HashSet<String>>,
}

impl ExpandSeed {
    pub fn includes(&self, key: &str) -> bool {
        self.expand_all || self.keys.as_ref().is_some_and(|keys| keys.contains(key))
    }
}

/// Returns `true` if any row carries inline children or a has-children flag.
pub fn is_tree_data(rows: &[Row], props: &TreeProps) -> bool {
    rows.iter().any(|row| {
        row.inline_children(&props.children).is_some() || is_truthy(row.get(&props.has_children))
    })
}

/// Builds `parent identity -> child rows` for inline children, recursively.
pub(crate) fn index_inline(
    rows: &[Row],
    row_key: &RowKey,
    props: &TreeProps,
    out: &mut HashMap<String, Vec<Row>>,
) {
    for row in rows {
        if let Some(children) = row.inline_children(&props.children) {
            let children: Vec<Row> = children.iter().cloned().map(Row::new).collect();
            index_inline(&children, row_key, props, out);
            out.insert(row_key.identity(row), children);
        }
    }
}

/// Sources consulted while normalizing.
pub(crate) struct Normalize<'a> {
    pub row_key: &'a RowKey,
    pub props: &'a TreeProps,
    pub inline: &'a HashMap<String, Vec<Row>>,
    pub lazy: &'a HashMap<String, Vec<Row>>,
    pub previous: &'a HashMap<String, TreeNode>,
    pub seed: &'a ExpandSeed,
}

/// Output of a normalization pass.
#[derive(Debug, Default)]
pub(crate) struct Normalized {
    pub nodes: HashMap<String, TreeNode>,
    pub rows: HashMap<String, Row>,
}

impl Normalize<'_> {
    /// Builds the identity-keyed node map for `roots` and everything below.
    ///
    /// Known identities keep their `expanded/loading/loaded` state; new ones
    /// are seeded. Repeated identities are visited once.
    pub fn run(&self, roots: &[Row]) -> Normalized {
        let mut out = Normalized::default();
        let mut visited = HashSet::new();
        for row in roots {
            self.visit(row, 0, &mut visited, &mut out);
        }
        out
    }

    fn visit(&self, row: &Row, level: usize, visited: &mut HashSet<String>, out: &mut Normalized) {
        let key = self.row_key.identity(row);
        if !visited.insert(key.clone()) {
            return;
        }
        out.rows.insert(key.clone(), row.clone());

        let inline = row.inline_children(&self.props.children).is_some();
        let lazy = !inline && is_truthy(row.get(&self.props.has_children));
        if !inline && !lazy {
            return;
        }

        let source = if inline { self.inline } else { self.lazy };
        let children = source.get(&key).map(Vec::as_slice).unwrap_or_default();
        let previous = self.previous.get(&key);
        let node = TreeNode {
            children: children.iter().map(|c| self.row_key.identity(c)).collect(),
            level,
            expanded: previous.map_or_else(|| self.seed.includes(&key), |p| p.expanded),
            loading: lazy && previous.is_some_and(|p| p.loading),
            loaded: lazy && previous.is_some_and(|p| p.loaded),
            lazy,
        };
        out.nodes.insert(key, node);

        for child in children {
            self.visit(child, level + 1, visited, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Row> {
        vec![
            Row::new(json!({
                "id": 1,
                "children": [
                    { "id": 11 },
                    { "id": 12, "children": [{ "id": 121 }] }
                ]
            })),
            Row::new(json!({ "id": 2, "hasChildren": true })),
            Row::new(json!({ "id": 3 })),
        ]
    }

    fn normalize(
        roots: &[Row],
        previous: &HashMap<String, TreeNode>,
        lazy: &HashMap<String, Vec<Row>>,
        seed: &ExpandSeed,
    ) -> Normalized {
        let key = RowKey::path("id");
        let props = TreeProps::default();
        let mut inline = HashMap::new();
        index_inline(roots, &key, &props, &mut inline);
        Normalize {
            row_key: &key,
            props: &props,
            inline: &inline,
            lazy,
            previous,
            seed,
        }
        .run(roots)
    }

    #[test]
    fn test_detects_tree_data() {
        let props = TreeProps::default();
        assert!(is_tree_data(&rows(), &props));
        assert!(!is_tree_data(&[Row::new(json!({ "id": 1 }))], &props));
    }

    #[test]
    fn test_nodes_and_levels() {
        let out = normalize(&rows(), &HashMap::new(), &HashMap::new(), &ExpandSeed::default());

        assert_eq!(out.nodes.len(), 3);
        assert_eq!(out.nodes["1"].children, vec!["11", "12"]);
        assert_eq!(out.nodes["1"].level, 0);
        assert_eq!(out.nodes["12"].level, 1);
        assert_eq!(out.nodes["12"].children, vec!["121"]);
        assert!(out.nodes["2"].lazy);
        assert!(!out.nodes["2"].loaded);
        assert!(out.nodes["2"].has_children());
        assert!(!out.nodes.contains_key("3"));
        assert_eq!(out.rows.len(), 6);
    }

    #[test]
    fn test_inherits_previous_state() {
        let mut previous = HashMap::new();
        previous.insert(
            "2".to_string(),
            TreeNode {
                expanded: true,
                loaded: true,
                lazy: true,
                ..Default::default()
            },
        );
        previous.insert(
            "1".to_string(),
            TreeNode {
                expanded: false,
                ..Default::default()
            },
        );
        let seed = ExpandSeed {
            expand_all: true,
            keys: None,
        };
        let mut lazy = HashMap::new();
        lazy.insert("2".to_string(), vec![Row::new(json!({ "id": 21 }))]);

        let out = normalize(&rows(), &previous, &lazy, &seed);
        assert!(!out.nodes["1"].expanded);
        assert!(out.nodes["2"].expanded);
        assert!(out.nodes["2"].loaded);
        assert_eq!(out.nodes["2"].children, vec!["21"]);
        // New identity, seeded by expand-all.
        assert!(out.nodes["12"].expanded);
        assert!(out.rows.contains_key("21"));
    }

    #[test]
    fn test_seed_keys() {
        let seed = ExpandSeed {
            expand_all: false,
            keys: Some(HashSet::from(["12".to_string()])),
        };
        let out = normalize(&rows(), &HashMap::new(), &HashMap::new(), &seed);
        assert!(!out.nodes["1"].expanded);
        assert!(out.nodes["12"].expanded);
    }

    #[test]
    fn test_repeated_identity_visited_once() {
        let roots = vec![
            Row::new(json!({ "id": 1, "children": [{ "id": 1 }] })),
        ];
        let out = normalize(&roots, &HashMap::new(), &HashMap::new(), &ExpandSeed::default());
        assert_eq!(out.rows.len(), 1);
        assert_eq!(out.nodes["1"].children, vec!["1"]);
    }
}
