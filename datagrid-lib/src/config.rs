//! Grid configuration

use serde::Deserialize;

use crate::column::Column;
use crate::model::Row;
use crate::model::RowKey;
use crate::selection::SelectionMode;

/// Field names used to read hierarchical rows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TreeProps {
    /// Field holding inline child rows.
    ///
    /// Default: `"children"`
    pub children: String,

    /// Flag field marking a row whose children are loaded lazily.
    ///
    /// Default: `"hasChildren"`
    pub has_children: String,
}

impl Default for TreeProps {
    fn default() -> Self {
        Self {
            children: "children".to_string(),
            has_children: "hasChildren".to_string(),
        }
    }
}

/// Configuration for a [`Grid`](crate::Grid).
///
/// # Example
///
/// ```
/// use datagrid_lib::GridConfig;
///
/// let config = GridConfig::default()
///     .with_row_key("id")
///     .with_default_expand_all(true)
///     .with_check_strictly(false);
/// assert!(config.row_key.is_some());
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GridConfig {
    /// Row identity. Required for tree data and key-based operations.
    pub row_key: Option<RowKey>,

    pub tree_props: TreeProps,

    /// Disables selection cascading between parents and children.
    pub check_strictly: bool,

    /// Default: `multi`
    pub selection_mode: SelectionMode,

    /// When false, toggling all with a partial selection clears it.
    ///
    /// Default: true
    pub select_on_indeterminate: bool,

    /// Keep selected rows that disappear from the data (needs `row_key`).
    pub reserve_selection: bool,

    /// Expand every tree node and expandable row by default.
    pub default_expand_all: bool,

    /// Initially expanded row identities.
    pub expand_row_keys: Option<Vec<String>>,

    /// Identity of the initial current row.
    pub current_row_key: Option<String>,

    /// Stretch flexible columns to fill the viewport.
    ///
    /// Default: true
    pub fit: bool,

    /// Gutter reserved in the header while the body scrolls vertically.
    ///
    /// Default: 17
    pub scrollbar_width: u32,

    /// Width of columns declaring neither `width` nor `min_width`.
    ///
    /// Default: 80
    pub default_min_width: u32,

    /// Indentation per tree level, in pixels.
    ///
    /// Default: 16
    pub indent: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_key: None,
            tree_props: TreeProps::default(),
            check_strictly: false,
            selection_mode: SelectionMode::Multi,
            select_on_indeterminate: true,
            reserve_selection: false,
            default_expand_all: false,
            expand_row_keys: None,
            current_row_key: None,
            fit: true,
            scrollbar_width: 17,
            default_min_width: 80,
            indent: 16,
        }
    }
}

impl GridConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_row_key(mut self, row_key: impl Into<RowKey>) -> Self {
        self.row_key = Some(row_key.into());
        self
    }

    pub fn with_tree_props(mut self, children: impl Into<String>, has_children: impl Into<String>) -> Self {
        self.tree_props = TreeProps {
            children: children.into(),
            has_children: has_children.into(),
        };
        self
    }

    pub fn with_check_strictly(mut self, check_strictly: bool) -> Self {
        self.check_strictly = check_strictly;
        self
    }

    pub fn with_selection_mode(mut self, mode: SelectionMode) -> Self {
        self.selection_mode = mode;
        self
    }

    pub fn with_select_on_indeterminate(mut self, value: bool) -> Self {
        self.select_on_indeterminate = value;
        self
    }

    pub fn with_reserve_selection(mut self, value: bool) -> Self {
        self.reserve_selection = value;
        self
    }

    pub fn with_default_expand_all(mut self, value: bool) -> Self {
        self.default_expand_all = value;
        self
    }

    pub fn with_expand_row_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.expand_row_keys = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_current_row_key(mut self, key: impl Into<String>) -> Self {
        self.current_row_key = Some(key.into());
        self
    }

    pub fn with_fit(mut self, fit: bool) -> Self {
        self.fit = fit;
        self
    }

    pub fn with_scrollbar_width(mut self, width: u32) -> Self {
        self.scrollbar_width = width;
        self
    }

    pub fn with_default_min_width(mut self, width: u32) -> Self {
        self.default_min_width = width;
        self
    }

    pub fn with_indent(mut self, indent: u32) -> Self {
        self.indent = indent;
        self
    }
}

/// A complete grid description: configuration, column tree and rows.
///
/// # Example
///
/// ```
/// use datagrid_lib::GridDocument;
///
/// let doc = GridDocument::from_json(r#"{
///     "config": { "rowKey": "id", "fit": false },
///     "columns": [{ "prop": "name", "label": "Name", "sortable": true }],
///     "data": [{ "id": 1, "name": "Ada" }]
/// }"#).unwrap();
/// assert_eq!(doc.columns.len(), 1);
/// assert_eq!(doc.data.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GridDocument {
    pub config: GridConfig,
    pub columns: Vec<Column>,
    pub data: Vec<Row>,
}

impl GridDocument {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let config = GridConfig::default();
        assert!(config.fit);
        assert!(config.select_on_indeterminate);
        assert_eq!(config.selection_mode, SelectionMode::Multi);
        assert_eq!(config.tree_props.has_children, "hasChildren");
        assert_eq!(config.default_min_width, 80);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let config: GridConfig = serde_json::from_value(json!({
            "rowKey": "meta.id",
            "treeProps": { "children": "items" },
            "checkStrictly": true,
            "selectionMode": "single",
            "expandRowKeys": ["1", "2"],
        }))
        .unwrap();

        assert!(matches!(config.row_key, Some(RowKey::Path(ref p)) if p == "meta.id"));
        assert_eq!(config.tree_props.children, "items");
        assert_eq!(config.tree_props.has_children, "hasChildren");
        assert!(config.check_strictly);
        assert_eq!(config.selection_mode, SelectionMode::Single);
        assert_eq!(config.expand_row_keys, Some(vec!["1".to_string(), "2".to_string()]));
        assert!(config.fit);
    }
}
