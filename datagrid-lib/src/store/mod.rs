//! Raw rows and their filtered, sorted projection.

mod filter;
mod sort;

pub use filter::*;
pub use sort::*;

use std::collections::BTreeMap;

use log::trace;
use serde_json::Value;

use crate::column::Column;
use crate::column::ColumnId;
use crate::column::ColumnRegistry;
use crate::column::SortOrder;
use crate::column::Sortable;
use crate::model::Row;

/// The active sort.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortState {
    pub column: Option<ColumnId>,
    pub prop: Option<String>,
    pub order: Option<SortOrder>,
}

impl SortState {
    pub fn is_active(&self) -> bool {
        self.column.is_some() && self.order.is_some()
    }
}

/// Raw rows plus filter and sort state, and the projection they produce.
///
/// Only top-level rows are filtered and sorted; tree children keep their
/// declared order.
#[derive(Debug, Clone, Default)]
pub struct RowStore {
    raw: Vec<Row>,
    projection: Vec<Row>,
    filters: BTreeMap<ColumnId, Vec<Value>>,
    sort: SortState,
}

impl RowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the raw rows. Call [`RowStore::recompute`] afterwards.
    pub fn set_data(&mut self, rows: Vec<Row>) {
        self.raw = rows;
    }

    pub fn raw(&self) -> &[Row] {
        &self.raw
    }

    /// Filtered and sorted top-level rows.
    pub fn projection(&self) -> &[Row] {
        &self.projection
    }

    // -------------------------------------------------------------------------
    // Filters
    // -------------------------------------------------------------------------

    pub fn filters(&self) -> &BTreeMap<ColumnId, Vec<Value>> {
        &self.filters
    }

    /// Sets the accepted values of a column. Empty values remove the filter.
    ///
    /// Returns `true` if the filter state changed.
    pub fn set_filter(&mut self, column: ColumnId, values: Vec<Value>) -> bool {
        if values.is_empty() {
            self.filters.remove(&column).is_some()
        } else if self.filters.get(&column) == Some(&values) {
            false
        } else {
            self.filters.insert(column, values);
            true
        }
    }

    /// Drops the filters of the given columns, or all filters with `None`.
    pub fn clear_filters(&mut self, columns: Option<&[ColumnId]>) {
        match columns {
            None => self.filters.clear(),
            Some(ids) => {
                for id in ids {
                    self.filters.remove(id);
                }
            }
        }
    }

    // -------------------------------------------------------------------------
    // Sort
    // -------------------------------------------------------------------------

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    pub fn set_sort(&mut self, sort: SortState) {
        self.sort = sort;
    }

    pub fn clear_sort(&mut self) {
        self.sort = SortState::default();
    }

    /// Forgets the filter and sort of a removed column.
    ///
    /// Returns `(filter_dropped, sort_cleared)`.
    pub fn forget_column(&mut self, id: ColumnId) -> (bool, bool) {
        let filter_dropped = self.filters.remove(&id).is_some();
        let sort_cleared = self.sort.column == Some(id);
        if sort_cleared {
            self.clear_sort();
        }
        (filter_dropped, sort_cleared)
    }

    // -------------------------------------------------------------------------
    // Pipeline
    // -------------------------------------------------------------------------

    /// Rebuilds the projection: filter, then sort.
    ///
    /// Filters of columns that are no longer registered are ignored. A
    /// `custom` sortable column leaves the order to the caller.
    pub fn recompute(&mut self, registry: &ColumnRegistry) {
        let active: Vec<(&Column, &[Value])> = self
            .filters
            .iter()
            .filter_map(|(id, values)| registry.leaf(*id).map(|column| (column, values.as_slice())))
            .collect();
        let filtered = apply_filters(self.raw.clone(), &active);
        trace!("Filtered {} rows down to {}", self.raw.len(), filtered.len());

        let sorting = self
            .sort
            .column
            .zip(self.sort.order)
            .and_then(|(id, order)| registry.leaf(id).map(|column| (column, order)));
        self.projection = match sorting {
            Some((column, order)) if column.sortable != Sortable::Custom => {
                trace!("Sorting by {} {}", column.id, order);
                order_by(filtered, column, order)
            }
            _ => filtered,
        };
    }
}
