//! The grid handle.

mod state;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::RwLockReadGuard;
use std::sync::RwLockWriteGuard;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use log::debug;
use serde_json::Value;

use crate::column::Column;
use crate::column::ColumnId;
use crate::column::HeaderCell;
use crate::column::SortOrder;
use crate::config::GridConfig;
use crate::config::GridDocument;
use crate::error::GridError;
use crate::error::Result;
use crate::event::ExpandState;
use crate::event::GridEvent;
use crate::event::Listener;
use crate::layout::Layout;
use crate::model::Row;
use crate::selection::CheckState;
use crate::store::SortState;
use crate::tree::FlatRow;
use crate::tree::TreeLoader;
use crate::tree::TreeNode;

use state::GridInner;

/// Outcome of [`Grid::load_or_toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeToggle {
    /// A loaded or inline node was expanded (`true`) or collapsed.
    Toggled(bool),
    /// Lazy children were loaded and the node expanded.
    Loaded,
    /// A load for this node is already in flight.
    AlreadyLoading,
    /// The data or columns changed while loading; the result was dropped and
    /// the node can be loaded again.
    Discarded,
    /// The row has no children.
    Leaf,
}

/// A data grid: columns, rows, and the state derived from them.
///
/// `Grid` is a cheap-clone handle over shared state. Every command mutates
/// one piece of state, recomputes everything downstream of it, and then
/// dispatches its events to the registered listeners after the internal lock
/// is released.
///
/// # Example
///
/// ```
/// use datagrid_lib::{Grid, GridConfig};
/// use datagrid_lib::column::{Column, SortOrder};
/// use datagrid_lib::model::Row;
/// use serde_json::json;
///
/// let grid = Grid::new(GridConfig::default().with_row_key("id"));
/// grid.insert_column(Column::new("name", "Name").sortable(), None).unwrap();
/// grid.set_data(vec![
///     Row::new(json!({ "id": 1, "name": "b" })),
///     Row::new(json!({ "id": 2, "name": "a" })),
/// ]).unwrap();
///
/// grid.sort("name", Some(SortOrder::Ascending)).unwrap();
/// assert_eq!(grid.data()[0].get("name"), Some(&json!("a")));
/// ```
#[derive(Clone)]
pub struct Grid {
    inner: Arc<RwLock<GridInner>>,
    listeners: Arc<RwLock<Vec<Listener>>>,
    /// Set while a toggle-all is running, to coalesce re-entrant calls.
    toggling_all: Arc<AtomicBool>,
    /// Set by every command, cleared by the renderer.
    dirty: Arc<AtomicBool>,
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.read();
        f.debug_struct("Grid")
            .field("rows", &inner.store.raw().len())
            .field("columns", &inner.columns.leaves().len())
            .field("selected", &inner.selection.len())
            .finish_non_exhaustive()
    }
}

impl Grid {
    pub fn new(config: GridConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(GridInner::new(config))),
            listeners: Arc::new(RwLock::new(Vec::new())),
            toggling_all: Arc::new(AtomicBool::new(false)),
            dirty: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Builds a grid from a JSON document: config, then columns, then data.
    pub fn from_document(document: GridDocument) -> Result<Self> {
        let grid = Self::new(document.config);
        for column in document.columns {
            grid.insert_column(column, None)?;
        }
        grid.set_data(document.data)?;
        Ok(grid)
    }

    /// Installs the loader for lazy tree rows.
    pub fn set_loader<L: TreeLoader + 'static>(&self, loader: L) {
        self.write().loader = Some(Arc::new(loader));
    }

    /// Registers an event listener.
    pub fn on_event<F>(&self, listener: F)
    where
        F: Fn(&GridEvent) + Send + Sync + 'static,
    {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(listener));
    }

    /// Returns `true` if state changed since the last [`Grid::clear_dirty`].
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn clear_dirty(&self) {
        self.dirty.store(false, Ordering::SeqCst);
    }

    // -------------------------------------------------------------------------
    // Plumbing
    // -------------------------------------------------------------------------

    fn read(&self) -> RwLockReadGuard<'_, GridInner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, GridInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs a command under the write lock, then dispatches its events.
    fn command<R>(&self, f: impl FnOnce(&mut GridInner) -> Result<(R, Vec<GridEvent>)>) -> Result<R> {
        let (value, events) = {
            let mut inner = self.write();
            f(&mut inner)?
        };
        self.dirty.store(true, Ordering::SeqCst);
        self.dispatch(events);
        Ok(value)
    }

    /// Like [`Grid::command`] for commands that cannot fail.
    fn apply(&self, f: impl FnOnce(&mut GridInner) -> Vec<GridEvent>) {
        let events = f(&mut self.write());
        self.dirty.store(true, Ordering::SeqCst);
        self.dispatch(events);
    }

    fn dispatch(&self, events: Vec<GridEvent>) {
        if events.is_empty() {
            return;
        }
        let listeners: Vec<Listener> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for event in &events {
            debug!("Emitting {}", event.name());
            for listener in &listeners {
                listener(event);
            }
        }
    }

    // =========================================================================
    // Data
    // =========================================================================

    /// Replaces the data and runs the full pipeline.
    ///
    /// Fails without a row key when the rows are hierarchical or
    /// `reserve_selection` is on; the grid is left untouched then.
    pub fn set_data(&self, rows: Vec<Row>) -> Result<()> {
        self.command(|inner| Ok(((), inner.set_data(rows)?)))
    }

    /// Filtered and sorted top-level rows.
    pub fn data(&self) -> Vec<Row> {
        self.read().store.projection().to_vec()
    }

    /// The rows as last set.
    pub fn raw_data(&self) -> Vec<Row> {
        self.read().store.raw().to_vec()
    }

    /// Every row in render order, including collapsed descendants.
    pub fn rows(&self) -> Vec<FlatRow> {
        self.read().flat_rows()
    }

    /// Rows in render order whose ancestors are all expanded.
    pub fn visible_rows(&self) -> Vec<FlatRow> {
        self.rows().into_iter().filter(|row| row.display).collect()
    }

    // =========================================================================
    // Columns
    // =========================================================================

    pub fn insert_column(&self, column: Column, parent: Option<ColumnId>) -> Result<ColumnId> {
        self.command(|inner| inner.insert_column(column, parent))
    }

    pub fn remove_column(&self, id: ColumnId, parent: Option<ColumnId>) -> Result<Column> {
        self.command(|inner| inner.remove_column(id, parent))
    }

    /// Flattened leaves (left-fixed, scrolling, right-fixed) with real widths.
    pub fn columns(&self) -> Vec<Column> {
        let mut inner = self.write();
        let GridInner { layout, columns, .. } = &mut *inner;
        layout.flush(columns);
        columns.leaves().to_vec()
    }

    pub fn header_rows(&self) -> Vec<Vec<HeaderCell>> {
        self.read().columns.header_rows().to_vec()
    }

    /// Looks a leaf column up by column key, id string or property.
    pub fn column(&self, key: &str) -> Option<Column> {
        self.read().columns.lookup(key).cloned()
    }

    // =========================================================================
    // Sort & filter
    // =========================================================================

    /// Sorts by the column matching `key`; `None` clears the sort.
    pub fn sort(&self, key: &str, order: Option<SortOrder>) -> Result<()> {
        self.command(|inner| Ok(((), inner.sort(key, order)?)))
    }

    /// Advances the column's sort order like a header click.
    pub fn cycle_sort(&self, key: &str) -> Result<Option<SortOrder>> {
        self.command(|inner| {
            let order = inner.next_sort_order(key)?;
            Ok((order, inner.sort(key, order)?))
        })
    }

    /// Clears the sort without emitting `sort-change`.
    pub fn clear_sort(&self) {
        self.apply(GridInner::clear_sort);
    }

    pub fn sort_state(&self) -> SortState {
        self.read().store.sort_state().clone()
    }

    /// Sets the accepted values of a column and emits `filter-change`.
    pub fn filter_change(&self, key: &str, values: Vec<Value>) -> Result<()> {
        self.command(|inner| Ok(((), inner.filter_change(key, values)?)))
    }

    /// Clears the filters of the given column keys, or every filter.
    ///
    /// Silent. Fails on an unknown key without clearing anything.
    pub fn clear_filter(&self, keys: Option<&[&str]>) -> Result<()> {
        self.command(|inner| Ok(((), inner.clear_filter(keys)?)))
    }

    /// Active filters keyed by column key (or column id).
    pub fn filters(&self) -> BTreeMap<String, Vec<Value>> {
        self.read().filters()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Selects every selectable row, or deselects all of them.
    ///
    /// A call made while another toggle-all is dispatching its events is
    /// ignored.
    pub fn toggle_all_selection(&self) {
        if self.toggling_all.swap(true, Ordering::SeqCst) {
            debug!("Coalesced re-entrant toggle-all");
            return;
        }
        self.apply(GridInner::toggle_all_selection);
        self.toggling_all.store(false, Ordering::SeqCst);
    }

    /// Selects (`Some(true)`), deselects (`Some(false)`) or flips a row.
    ///
    /// `emit` controls the `select` event; `selection-change` is emitted
    /// whenever the selection changed.
    pub fn toggle_row_selection(&self, row: &Row, selected: Option<bool>, emit: bool) {
        self.apply(|inner| inner.toggle_row_selection(row, selected, emit));
    }

    pub fn clear_selection(&self) {
        self.apply(GridInner::clear_selection);
    }

    /// Selected rows in selection order.
    pub fn selection(&self) -> Vec<Row> {
        self.read().selection.rows().to_vec()
    }

    pub fn is_selected(&self, row: &Row) -> bool {
        self.read().selection.contains(row)
    }

    pub fn check_state(&self, row: &Row) -> CheckState {
        self.read().selection.check_state(row)
    }

    pub fn is_all_selected(&self) -> bool {
        self.read().selection.is_all_selected()
    }

    // =========================================================================
    // Current row
    // =========================================================================

    pub fn set_current_row(&self, row: Option<Row>) {
        self.apply(|inner| inner.set_current_row(row));
    }

    /// Sets the current row by identity. Requires a row key.
    pub fn set_current_row_key(&self, key: Option<&str>) -> Result<()> {
        self.command(|inner| Ok(((), inner.set_current_row_key(key)?)))
    }

    pub fn current_row(&self) -> Option<Row> {
        self.read().current.row().cloned()
    }

    // =========================================================================
    // Expansion
    // =========================================================================

    /// Expands, collapses (or flips) a row.
    ///
    /// With an expand column this drives expandable rows; otherwise it
    /// drives tree nodes and needs a row key. Lazy rows are not loaded here,
    /// see [`Grid::load_or_toggle`].
    pub fn toggle_row_expansion(&self, row: &Row, expanded: Option<bool>) -> Result<()> {
        self.command(|inner| Ok(((), inner.toggle_row_expansion(row, expanded)?)))
    }

    /// Sets exactly which rows are expanded. Requires a row key.
    pub fn set_expand_row_keys<I, S>(&self, keys: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let keys: Vec<String> = keys.into_iter().map(Into::into).collect();
        self.command(|inner| Ok((inner.set_expand_row_keys(keys)?, Vec::new())))
    }

    pub fn is_row_expanded(&self, row: &Row) -> bool {
        self.read().is_row_expanded(row)
    }

    /// Tree node state by row identity.
    pub fn tree_node(&self, key: &str) -> Option<TreeNode> {
        self.read().tree.node(key).cloned()
    }

    /// Loads a lazy row's children, or toggles an already loaded node.
    ///
    /// The grid is not locked while the loader runs. If the data or the
    /// columns change in the meantime, or the row disappears, the result is
    /// discarded and the node stays unloaded. Dropping the returned future
    /// before it completes also leaves the node unloaded, so the load can be
    /// retried.
    pub async fn load_or_toggle(&self, row: &Row) -> Result<TreeToggle> {
        let (row_key, identity, loader, all_rows, generations) = {
            let mut inner = self.write();
            let row_key = inner
                .row_key()
                .cloned()
                .ok_or_else(|| GridError::row_key_required("lazy loading"))?;
            let identity = row_key.identity(row);
            let Some(node) = inner.tree.node(&identity).cloned() else {
                return Ok(TreeToggle::Leaf);
            };

            if !node.lazy || node.loaded {
                let target = !node.expanded;
                inner.tree.set_expanded(&identity, target);
                inner.layout.mark_dirty();
                drop(inner);
                self.dirty.store(true, Ordering::SeqCst);
                self.dispatch(vec![GridEvent::ExpandChange {
                    row: row.clone(),
                    state: ExpandState::Expanded(target),
                }]);
                return Ok(TreeToggle::Toggled(target));
            }
            if node.loading {
                return Ok(TreeToggle::AlreadyLoading);
            }
            let loader = inner
                .loader
                .clone()
                .ok_or_else(|| GridError::LoaderRequired {
                    key: identity.clone(),
                })?;

            inner.tree.set_loading(&identity, true);
            let generations = (inner.data_generation, inner.column_generation);
            let all_rows = inner.store.raw().to_vec();
            (row_key, identity, loader, all_rows, generations)
        };
        self.dirty.store(true, Ordering::SeqCst);
        debug!("Loading children of row {}", identity);

        let guard = LoadingGuard::new(self, &identity);
        let result = loader.load(row, &identity, &all_rows).await;
        guard.disarm();

        self.command(|inner| {
            // Rejections reach the caller even when the result is stale.
            let payload = match result {
                Ok(payload) => payload,
                Err(source) => {
                    inner.tree.set_loading(&identity, false);
                    return Err(GridError::Load {
                        key: identity.clone(),
                        source,
                    });
                }
            };

            let stale = (inner.data_generation, inner.column_generation) != generations;
            if stale || inner.tree.node(&identity).is_none() {
                inner.tree.set_loading(&identity, false);
                debug!("Discarded children of row {}", identity);
                return Ok((TreeToggle::Discarded, Vec::new()));
            }
            let items = match payload {
                Value::Array(items) => items,
                other => {
                    inner.tree.set_loading(&identity, false);
                    return Err(GridError::loader_contract(identity.as_str(), &other));
                }
            };

            let children: Vec<Row> = items.into_iter().map(Row::new).collect();
            debug!("Loaded {} children of row {}", children.len(), identity);
            let events = inner.apply_loaded(&identity, children, &row_key);
            Ok((TreeToggle::Loaded, events))
        })
    }

    // =========================================================================
    // Layout
    // =========================================================================

    pub fn set_viewport_width(&self, width: u32) {
        self.write().layout.set_viewport_width(width);
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Feeds measured body metrics; reserves the header gutter on overflow.
    pub fn update_scroll_y(&self, scroll_height: u32, client_height: u32) -> bool {
        let changed = self.write().layout.update_scroll_y(scroll_height, client_height);
        if changed {
            self.dirty.store(true, Ordering::SeqCst);
        }
        changed
    }

    /// Recomputes the layout if it is dirty. Returns `true` if it ran.
    pub fn flush_layout(&self) -> bool {
        let mut inner = self.write();
        let GridInner { layout, columns, .. } = &mut *inner;
        layout.flush(columns)
    }

    /// The current layout, flushed first if dirty.
    pub fn layout(&self) -> Layout {
        let mut inner = self.write();
        let GridInner { layout, columns, .. } = &mut *inner;
        layout.flush(columns);
        layout.snapshot().clone()
    }
}

/// Clears a node's loading flag if its load is dropped before completing.
struct LoadingGuard<'a> {
    grid: &'a Grid,
    key: &'a str,
    armed: bool,
}

impl<'a> LoadingGuard<'a> {
    fn new(grid: &'a Grid, key: &'a str) -> Self {
        Self {
            grid,
            key,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.grid.write().tree.set_loading(self.key, false);
        self.grid.dirty.store(true, Ordering::SeqCst);
        debug!("Cancelled load of row {}", self.key);
    }
}
