//! Expandable (detail) rows.

use crate::model::Row;
use crate::model::RowKey;
use crate::model::same_row;

/// Expanded rows of a grid that has an expand column.
#[derive(Debug, Clone, Default)]
pub struct ExpandRows {
    rows: Vec<Row>,
    expand_all: bool,
    /// Keys from configuration, applied on the first data set.
    initial_keys: Option<Vec<String>>,
}

impl ExpandRows {
    pub fn new(expand_all: bool, initial_keys: Option<Vec<String>>) -> Self {
        Self {
            rows: Vec::new(),
            expand_all,
            initial_keys,
        }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn is_expanded(&self, row: &Row, row_key: Option<&RowKey>) -> bool {
        self.rows.iter().any(|r| same_row(row_key, r, row))
    }

    /// Re-derives the expanded rows after the data changed.
    ///
    /// Expand-all expands everything; with a row key, expanded identities
    /// carry over to the new handles; otherwise expansion resets.
    pub fn update(&mut self, data: &[Row], row_key: Option<&RowKey>) {
        if let (Some(keys), Some(key)) = (self.initial_keys.take(), row_key) {
            self.set_keys(&keys, data, key);
        }
        self.rows = if self.expand_all {
            data.to_vec()
        } else if row_key.is_some() {
            data.iter()
                .filter(|row| self.is_expanded(row, row_key))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };
    }

    /// Expands, collapses or flips a row. Returns `true` if it changed.
    pub fn toggle(&mut self, row: &Row, expanded: Option<bool>, row_key: Option<&RowKey>) -> bool {
        let current = self.is_expanded(row, row_key);
        let target = expanded.unwrap_or(!current);
        if target == current {
            return false;
        }
        if target {
            self.rows.push(row.clone());
        } else {
            self.rows.retain(|r| !same_row(row_key, r, row));
        }
        true
    }

    /// Replaces the expanded rows with the rows of `data` whose identity is
    /// listed in `keys`, in key order.
    pub fn set_keys(&mut self, keys: &[String], data: &[Row], row_key: &RowKey) {
        self.rows = keys
            .iter()
            .filter_map(|key| data.iter().find(|row| row_key.identity(row) == *key))
            .cloned()
            .collect();
    }
}
