//! Column declarations.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde_json::Value;

use crate::model::Row;

// =============================================================================
// Identity
// =============================================================================

/// Stable column identifier, assigned when the column is registered.
///
/// `ColumnId::default()` (zero) marks a column that has not been registered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ColumnId(pub(crate) usize);

impl ColumnId {
    /// Returns `true` once the column has been registered.
    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for ColumnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "column_{}", self.0)
    }
}

// =============================================================================
// Column options
// =============================================================================

/// What a column renders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// A data column bound to a property.
    #[default]
    Default,
    /// A checkbox column driving row selection.
    Selection,
    /// A row-number column.
    Index,
    /// An expand toggle for expandable rows.
    Expand,
}

/// Sticky side of a column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FlagOrName")]
pub enum Fixed {
    /// Scrolls with the body.
    #[default]
    None,
    /// Sticks to the left edge.
    Left,
    /// Sticks to the right edge.
    Right,
}

impl Fixed {
    /// Returns `true` for left or right fixed columns.
    pub fn is_fixed(self) -> bool {
        self != Fixed::None
    }
}

/// Whether and how a column sorts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "FlagOrName")]
pub enum Sortable {
    /// No sorting.
    #[default]
    Disabled,
    /// Rows are sorted locally.
    Enabled,
    /// Sort changes are announced but rows are left in place for the caller
    /// to reorder (remote sorting).
    Custom,
}

/// Sort direction. A missing order (`None`) means unsorted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Parses `ascending`/`asc` and `descending`/`desc`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "ascending" | "asc" => Some(SortOrder::Ascending),
            "descending" | "desc" => Some(SortOrder::Descending),
            _ => None,
        }
    }

    /// Applies the direction to an ascending comparison.
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("ascending"),
            SortOrder::Descending => f.write_str("descending"),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FlagOrName {
    Flag(bool),
    Name(String),
}

impl TryFrom<FlagOrName> for Fixed {
    type Error = String;

    fn try_from(value: FlagOrName) -> Result<Self, Self::Error> {
        match value {
            FlagOrName::Flag(true) => Ok(Fixed::Left),
            FlagOrName::Flag(false) => Ok(Fixed::None),
            FlagOrName::Name(name) => match name.as_str() {
                "left" => Ok(Fixed::Left),
                "right" => Ok(Fixed::Right),
                "" | "none" => Ok(Fixed::None),
                other => Err(format!("invalid fixed side `{other}`")),
            },
        }
    }
}

impl TryFrom<FlagOrName> for Sortable {
    type Error = String;

    fn try_from(value: FlagOrName) -> Result<Self, Self::Error> {
        match value {
            FlagOrName::Flag(true) => Ok(Sortable::Enabled),
            FlagOrName::Flag(false) => Ok(Sortable::Disabled),
            FlagOrName::Name(name) if name == "custom" => Ok(Sortable::Custom),
            FlagOrName::Name(other) => Err(format!("invalid sortable mode `{other}`")),
        }
    }
}

/// Row comparator used instead of property comparison.
pub type SortMethod = Arc<dyn Fn(&Row, &Row) -> Ordering + Send + Sync>;

/// Sort key extractor, given the row and its index in the unsorted input.
pub type SortExtractor = Arc<dyn Fn(&Row, usize) -> Value + Send + Sync>;

/// Filter predicate: `(accepted value, row, column)`.
pub type FilterMethod = Arc<dyn Fn(&Value, &Row, &Column) -> bool + Send + Sync>;

/// Selectable predicate: `(row, index)`.
pub type SelectablePredicate = Arc<dyn Fn(&Row, usize) -> bool + Send + Sync>;

/// One component of a composite sort key.
#[derive(Clone)]
pub enum SortKey {
    /// Property path on the row.
    Path(String),
    /// Computed key.
    Extract(SortExtractor),
}

impl SortKey {
    /// Computes the key value for a row.
    pub fn extract(&self, row: &Row, index: usize) -> Value {
        match self {
            SortKey::Path(path) => row.get(path).cloned().unwrap_or(Value::Null),
            SortKey::Extract(f) => f(row, index),
        }
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortKey::Path(path) => f.debug_tuple("Path").field(path).finish(),
            SortKey::Extract(_) => f.write_str("Extract(..)"),
        }
    }
}

impl<'de> Deserialize<'de> for SortKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SortKey::Path)
    }
}

/// Accepts either a single sort key or a list of them.
fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<SortKey>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(SortKey),
        Many(Vec<SortKey>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(key) => vec![key],
        OneOrMany::Many(keys) => keys,
    })
}

/// An entry of a column's filter panel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FilterOption {
    /// Label shown to the user.
    pub text: String,
    /// Value handed to the filter method.
    pub value: Value,
}

impl FilterOption {
    pub fn new(text: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            text: text.into(),
            value: value.into(),
        }
    }
}

fn default_sort_orders() -> Vec<Option<SortOrder>> {
    vec![Some(SortOrder::Ascending), Some(SortOrder::Descending), None]
}

// =============================================================================
// Column
// =============================================================================

/// A column declaration, possibly grouping child columns.
///
/// Columns are plain values until they are inserted into a
/// [`ColumnRegistry`](super::ColumnRegistry), which assigns ids and the
/// derived header geometry.
///
/// # Example
///
/// ```
/// use datagrid_lib::column::Column;
///
/// let name = Column::new("name", "Name").width(160).sortable();
/// let address = Column::group("Address")
///     .child(Column::new("city", "City"))
///     .child(Column::new("zip", "Zip").min_width(60));
/// assert!(name.is_leaf());
/// assert!(!address.is_leaf());
/// ```
#[derive(Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Column {
    #[serde(skip)]
    pub id: ColumnId,
    /// User-facing key for lookups (`clear_filter`, filter-change maps).
    pub column_key: Option<String>,
    /// Property path read from each row.
    pub prop: Option<String>,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    /// Declaration sequence index among siblings.
    pub order: Option<usize>,
    pub children: Vec<Column>,

    pub width: Option<u32>,
    pub min_width: Option<u32>,
    /// Resolved pixel width, written by layout.
    #[serde(skip)]
    pub real_width: u32,
    pub fixed: Fixed,

    #[serde(skip)]
    pub level: usize,
    #[serde(skip)]
    pub col_span: usize,
    #[serde(skip)]
    pub row_span: usize,

    pub sortable: Sortable,
    pub sort_orders: Vec<Option<SortOrder>>,
    #[serde(deserialize_with = "one_or_many")]
    pub sort_by: Vec<SortKey>,
    #[serde(skip)]
    pub sort_method: Option<SortMethod>,

    pub filters: Vec<FilterOption>,
    pub filter_multiple: bool,
    /// Filter values applied when the column is inserted.
    pub filtered_value: Vec<Value>,
    #[serde(skip)]
    pub filter_method: Option<FilterMethod>,

    #[serde(skip)]
    pub selectable: Option<SelectablePredicate>,
}

impl Default for Column {
    fn default() -> Self {
        Self {
            id: ColumnId::default(),
            column_key: None,
            prop: None,
            label: String::new(),
            kind: ColumnKind::Default,
            order: None,
            children: Vec::new(),
            width: None,
            min_width: None,
            real_width: 0,
            fixed: Fixed::None,
            level: 1,
            col_span: 1,
            row_span: 1,
            sortable: Sortable::Disabled,
            sort_orders: default_sort_orders(),
            sort_by: Vec::new(),
            sort_method: None,
            filters: Vec::new(),
            filter_multiple: true,
            filtered_value: Vec::new(),
            filter_method: None,
            selectable: None,
        }
    }
}

impl fmt::Debug for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("id", &self.id)
            .field("column_key", &self.column_key)
            .field("prop", &self.prop)
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("fixed", &self.fixed)
            .field("width", &self.width)
            .field("min_width", &self.min_width)
            .field("real_width", &self.real_width)
            .field("sortable", &self.sortable)
            .field("children", &self.children)
            .finish_non_exhaustive()
    }
}

impl Column {
    /// Create a data column bound to `prop`.
    pub fn new(prop: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            prop: Some(prop.into()),
            label: label.into(),
            ..Default::default()
        }
    }

    /// Create a group header column. Add leaves with [`Column::child`].
    pub fn group(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Default::default()
        }
    }

    /// Create a selection (checkbox) column.
    pub fn selection() -> Self {
        Self {
            kind: ColumnKind::Selection,
            width: Some(48),
            min_width: Some(48),
            ..Default::default()
        }
    }

    /// Create a row-number column.
    pub fn index() -> Self {
        Self {
            kind: ColumnKind::Index,
            width: Some(48),
            min_width: Some(48),
            ..Default::default()
        }
    }

    /// Create an expand toggle column for expandable rows.
    pub fn expand() -> Self {
        Self {
            kind: ColumnKind::Expand,
            width: Some(48),
            min_width: Some(48),
            ..Default::default()
        }
    }

    // -------------------------------------------------------------------------
    // Builders
    // -------------------------------------------------------------------------

    pub fn width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self
    }

    pub fn min_width(mut self, min_width: u32) -> Self {
        self.min_width = Some(min_width);
        self
    }

    pub fn fixed_left(mut self) -> Self {
        self.fixed = Fixed::Left;
        self
    }

    pub fn fixed_right(mut self) -> Self {
        self.fixed = Fixed::Right;
        self
    }

    /// Sort locally when the header is toggled.
    pub fn sortable(mut self) -> Self {
        self.sortable = Sortable::Enabled;
        self
    }

    /// Announce sort changes without reordering rows.
    pub fn sortable_custom(mut self) -> Self {
        self.sortable = Sortable::Custom;
        self
    }

    /// Restrict the orders a header click cycles through.
    pub fn sort_orders(mut self, orders: Vec<Option<SortOrder>>) -> Self {
        self.sort_orders = orders;
        self
    }

    pub fn sort_method<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row, &Row) -> Ordering + Send + Sync + 'static,
    {
        self.sort_method = Some(Arc::new(f));
        self
    }

    /// Append a component to the composite sort key.
    pub fn sort_by(mut self, key: SortKey) -> Self {
        self.sort_by.push(key);
        self
    }

    pub fn filter_method<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value, &Row, &Column) -> bool + Send + Sync + 'static,
    {
        self.filter_method = Some(Arc::new(f));
        self
    }

    pub fn filters(mut self, filters: Vec<FilterOption>) -> Self {
        self.filters = filters;
        self
    }

    /// Allow at most one active filter value.
    pub fn filter_single(mut self) -> Self {
        self.filter_multiple = false;
        self
    }

    /// Filter values active as soon as the column is inserted.
    pub fn filtered_value(mut self, values: Vec<Value>) -> Self {
        self.filtered_value = values;
        self
    }

    pub fn selectable<F>(mut self, f: F) -> Self
    where
        F: Fn(&Row, usize) -> bool + Send + Sync + 'static,
    {
        self.selectable = Some(Arc::new(f));
        self
    }

    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.column_key = Some(key.into());
        self
    }

    pub fn order(mut self, order: usize) -> Self {
        self.order = Some(order);
        self
    }

    pub fn child(mut self, column: Column) -> Self {
        self.children.push(column);
        self
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The key used in filter-change maps: `column_key`, else the id.
    pub fn filter_key(&self) -> String {
        self.column_key
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Returns `true` if the column answers to `key` (its column key or id).
    pub fn matches_key(&self, key: &str) -> bool {
        self.column_key.as_deref() == Some(key) || self.id.to_string() == key
    }

    /// The property value of `row` for this column.
    pub fn cell<'a>(&self, row: &'a Row) -> Option<&'a Value> {
        self.prop.as_deref().and_then(|prop| row.get(prop))
    }

    /// Minimum width, falling back to `default_min`.
    pub fn effective_min_width(&self, default_min: u32) -> u32 {
        self.min_width.unwrap_or(default_min)
    }

    /// Applies the column's filter method, or value equality on its property.
    pub fn accepts(&self, value: &Value, row: &Row) -> bool {
        match &self.filter_method {
            Some(method) => method(value, row, self),
            None => crate::model::loose_eq(value, self.cell(row)),
        }
    }

    /// The order following `current` in this column's sort cycle.
    pub fn next_sort_order(&self, current: Option<SortOrder>) -> Option<SortOrder> {
        if self.sort_orders.is_empty() {
            return None;
        }
        let position = self.sort_orders.iter().position(|order| *order == current);
        match position {
            Some(index) => self.sort_orders[(index + 1) % self.sort_orders.len()],
            None => self.sort_orders[0],
        }
    }
}
