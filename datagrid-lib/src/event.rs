//! Grid events.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use crate::column::ColumnId;
use crate::column::SortOrder;
use crate::model::Row;

/// Payload of an expand change.
#[derive(Debug, Clone)]
pub enum ExpandState {
    /// Tree mode: the node's new expansion.
    Expanded(bool),
    /// Expandable-row mode: every expanded row after the change.
    Rows(Vec<Row>),
}

/// Notifications emitted by grid commands.
///
/// Events are dispatched after the command has finished and the grid's lock
/// has been released, so listeners may call back into the grid.
#[derive(Debug, Clone)]
pub enum GridEvent {
    /// The selected set changed.
    SelectionChange { rows: Vec<Row> },
    /// A row was toggled through `toggle_row_selection` with `emit` set.
    Select { selection: Vec<Row>, row: Row },
    /// `toggle_all_selection` ran.
    SelectAll { selection: Vec<Row> },
    SortChange {
        column: Option<ColumnId>,
        prop: Option<String>,
        order: Option<SortOrder>,
    },
    /// Changed filters, keyed by column key (or column id).
    FilterChange { filters: BTreeMap<String, Vec<Value>> },
    CurrentChange { current: Option<Row>, old: Option<Row> },
    ExpandChange { row: Row, state: ExpandState },
}

impl GridEvent {
    /// Short event name, as used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            GridEvent::SelectionChange { .. } => "selection-change",
            GridEvent::Select { .. } => "select",
            GridEvent::SelectAll { .. } => "select-all",
            GridEvent::SortChange { .. } => "sort-change",
            GridEvent::FilterChange { .. } => "filter-change",
            GridEvent::CurrentChange { .. } => "current-change",
            GridEvent::ExpandChange { .. } => "expand-change",
        }
    }
}

/// Event callback registered with [`Grid::on_event`](crate::Grid::on_event).
pub type Listener = Arc<dyn Fn(&GridEvent) + Send + Sync>;
