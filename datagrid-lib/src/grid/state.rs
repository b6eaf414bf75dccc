//! Grid state and its recomputation pipeline.

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::sync::Arc;

use log::debug;
use log::trace;
use serde_json::Value;

use crate::column::Column;
use crate::column::ColumnId;
use crate::column::ColumnKind;
use crate::column::ColumnRegistry;
use crate::column::SortOrder;
use crate::config::GridConfig;
use crate::current::CurrentRow;
use crate::error::GridError;
use crate::error::Result;
use crate::event::ExpandState;
use crate::event::GridEvent;
use crate::expand::ExpandRows;
use crate::layout::TableLayout;
use crate::model::Row;
use crate::model::RowKey;
use crate::selection::Selection;
use crate::selection::SelectionContext;
use crate::store::RowStore;
use crate::store::SortState;
use crate::tree::FlatRow;
use crate::tree::TreeLoader;
use crate::tree::TreeStore;

/// Builds a selection context from disjoint grid fields.
fn selection_ctx<'a>(
    config: &'a GridConfig,
    columns: &'a ColumnRegistry,
    store: &'a RowStore,
    tree: &'a TreeStore,
) -> SelectionContext<'a> {
    SelectionContext::new(
        config.row_key.as_ref(),
        tree,
        store.projection(),
        columns.selection_column().and_then(|c| c.selectable.as_ref()),
    )
}

/// Everything a grid owns. Commands mutate one slot and then run the
/// downstream pipeline; they return the events to dispatch.
pub(crate) struct GridInner {
    pub config: GridConfig,
    pub columns: ColumnRegistry,
    pub store: RowStore,
    pub tree: TreeStore,
    pub selection: Selection,
    pub current: CurrentRow,
    pub expand: ExpandRows,
    pub layout: TableLayout,
    pub loader: Option<Arc<dyn TreeLoader>>,
    /// Bumped on every data replacement.
    pub data_generation: u64,
    /// Bumped on every column insertion or removal.
    pub column_generation: u64,
}

impl GridInner {
    pub fn new(config: GridConfig) -> Self {
        Self {
            columns: ColumnRegistry::new(),
            store: RowStore::new(),
            tree: TreeStore::new(&config),
            selection: Selection::new(
                config.selection_mode,
                config.check_strictly,
                config.row_key.clone(),
            ),
            current: CurrentRow::new(config.current_row_key.clone()),
            expand: ExpandRows::new(config.default_expand_all, config.expand_row_keys.clone()),
            layout: TableLayout::new(&config),
            loader: None,
            data_generation: 0,
            column_generation: 0,
            config,
        }
    }

    pub fn row_key(&self) -> Option<&RowKey> {
        self.config.row_key.as_ref()
    }

    fn require_row_key(&self, operation: &'static str) -> Result<RowKey> {
        self.config
            .row_key
            .clone()
            .ok_or_else(|| GridError::row_key_required(operation))
    }

    fn selection_change(&self) -> GridEvent {
        GridEvent::SelectionChange {
            rows: self.selection.rows().to_vec(),
        }
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    /// filter -> sort -> tree -> selection counts -> layout.
    ///
    /// Returns `true` if the selection recount changed the selected set.
    pub fn recompute(&mut self) -> bool {
        self.store.recompute(&self.columns);
        self.tree.normalize(self.store.projection(), self.config.row_key.as_ref());
        let ctx = selection_ctx(&self.config, &self.columns, &self.store, &self.tree);
        let changed = self.selection.recount(&ctx);
        self.layout.mark_dirty();
        trace!(
            "Recomputed: {} of {} rows, {} tree nodes",
            self.store.projection().len(),
            self.store.raw().len(),
            self.tree.nodes().len()
        );
        changed
    }

    // =========================================================================
    // Data
    // =========================================================================

    pub fn set_data(&mut self, rows: Vec<Row>) -> Result<Vec<GridEvent>> {
        if self.config.reserve_selection && self.config.row_key.is_none() {
            return Err(GridError::row_key_required("reserve-selection"));
        }
        self.tree.index_data(&rows, self.config.row_key.as_ref())?;

        self.store.set_data(rows);
        self.data_generation += 1;
        debug!(
            "Data replaced with {} rows (generation {})",
            self.store.raw().len(),
            self.data_generation
        );

        let all_rows = self.tree.all_rows(self.store.raw(), self.config.row_key.as_ref());
        if let Some(key) = self.config.row_key.as_ref() {
            let live: HashSet<String> = all_rows.iter().map(|row| key.identity(row)).collect();
            self.tree.retain_lazy(&live);
        }

        let dropped = self
            .selection
            .reconcile(&all_rows, self.config.reserve_selection);
        let recounted = self.recompute();

        let mut events = Vec::new();
        if dropped || recounted {
            events.push(self.selection_change());
        }
        if let Some((current, old)) = self
            .current
            .reconcile(&all_rows, self.config.row_key.as_ref())
        {
            events.push(GridEvent::CurrentChange { current, old });
        }
        self.expand
            .update(self.store.raw(), self.config.row_key.as_ref());
        Ok(events)
    }

    // =========================================================================
    // Columns
    // =========================================================================

    pub fn insert_column(&mut self, column: Column, parent: Option<ColumnId>) -> Result<(ColumnId, Vec<GridEvent>)> {
        let id = self.columns.insert(column, parent)?;
        self.column_generation += 1;

        // Declared filter values become active filters.
        let seeded: Vec<(ColumnId, Vec<Value>)> = self
            .columns
            .leaves()
            .iter()
            .filter(|c| !c.filtered_value.is_empty() && !self.store.filters().contains_key(&c.id))
            .filter(|c| is_within(&self.columns, id, c.id))
            .map(|c| (c.id, c.filtered_value.clone()))
            .collect();
        for (leaf, values) in seeded {
            self.store.set_filter(leaf, values);
        }

        debug!("Inserted column {}", id);
        let mut events = Vec::new();
        if self.recompute() {
            events.push(self.selection_change());
        }
        Ok((id, events))
    }

    pub fn remove_column(&mut self, id: ColumnId, parent: Option<ColumnId>) -> Result<(Column, Vec<GridEvent>)> {
        let removed = self.columns.remove(id, parent)?;
        self.column_generation += 1;

        let mut leaf_ids = Vec::new();
        collect_leaf_ids(&removed, &mut leaf_ids);
        for leaf in leaf_ids {
            let (filter_dropped, sort_cleared) = self.store.forget_column(leaf);
            if filter_dropped || sort_cleared {
                debug!("Removed column {} dropped its filter or sort", leaf);
            }
        }

        debug!("Removed column {}", id);
        let mut events = Vec::new();
        if self.recompute() {
            events.push(self.selection_change());
        }
        Ok((removed, events))
    }

    fn column_by_key(&self, key: &str) -> Result<&Column> {
        self.columns
            .lookup(key)
            .ok_or_else(|| GridError::UnknownColumnKey(key.to_string()))
    }

    // =========================================================================
    // Sort & filter
    // =========================================================================

    pub fn sort(&mut self, key: &str, order: Option<SortOrder>) -> Result<Vec<GridEvent>> {
        let column = self.column_by_key(key)?;
        let id = column.id;
        let prop = column.prop.clone();

        let state = match order {
            Some(order) => SortState {
                column: Some(id),
                prop: prop.clone(),
                order: Some(order),
            },
            None => SortState::default(),
        };
        self.store.set_sort(state);
        debug!("Sort by {} {:?}", id, order);

        let mut events = Vec::new();
        if self.recompute() {
            events.push(self.selection_change());
        }
        events.push(GridEvent::SortChange {
            column: Some(id),
            prop,
            order,
        });
        Ok(events)
    }

    /// The order a header click on `key` moves to.
    pub fn next_sort_order(&self, key: &str) -> Result<Option<SortOrder>> {
        let column = self.column_by_key(key)?;
        let sort = self.store.sort_state();
        let current = if sort.column == Some(column.id) {
            sort.order
        } else {
            None
        };
        Ok(column.next_sort_order(current))
    }

    pub fn clear_sort(&mut self) -> Vec<GridEvent> {
        self.store.clear_sort();
        if self.recompute() {
            vec![self.selection_change()]
        } else {
            Vec::new()
        }
    }

    pub fn filter_change(&mut self, key: &str, mut values: Vec<Value>) -> Result<Vec<GridEvent>> {
        let column = self.column_by_key(key)?;
        let id = column.id;
        let filter_key = column.filter_key();
        if !column.filter_multiple {
            values.truncate(1);
        }

        self.store.set_filter(id, values.clone());
        debug!("Filter {} set to {} values", id, values.len());

        let mut events = Vec::new();
        if self.recompute() {
            events.push(self.selection_change());
        }
        events.push(GridEvent::FilterChange {
            filters: BTreeMap::from([(filter_key, values)]),
        });
        Ok(events)
    }

    pub fn clear_filter(&mut self, keys: Option<&[&str]>) -> Result<Vec<GridEvent>> {
        match keys {
            None => self.store.clear_filters(None),
            Some(keys) => {
                let ids = keys
                    .iter()
                    .map(|key| {
                        self.columns
                            .find_by_key(key)
                            .map(|c| c.id)
                            .ok_or_else(|| GridError::UnknownColumnKey(key.to_string()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                self.store.clear_filters(Some(&ids));
            }
        }
        if self.recompute() {
            Ok(vec![self.selection_change()])
        } else {
            Ok(Vec::new())
        }
    }

    /// Active filters keyed by column key (or id).
    pub fn filters(&self) -> BTreeMap<String, Vec<Value>> {
        self.store
            .filters()
            .iter()
            .filter_map(|(id, values)| {
                self.columns
                    .leaf(*id)
                    .map(|column| (column.filter_key(), values.clone()))
            })
            .collect()
    }

    // =========================================================================
    // Selection
    // =========================================================================

    pub fn toggle_all_selection(&mut self) -> Vec<GridEvent> {
        let ctx = selection_ctx(&self.config, &self.columns, &self.store, &self.tree);
        let changed = self
            .selection
            .toggle_all(&ctx, self.config.select_on_indeterminate);

        let mut events = Vec::new();
        if changed {
            events.push(self.selection_change());
        }
        events.push(GridEvent::SelectAll {
            selection: self.selection.rows().to_vec(),
        });
        events
    }

    pub fn toggle_row_selection(&mut self, row: &Row, selected: Option<bool>, emit: bool) -> Vec<GridEvent> {
        let ctx = selection_ctx(&self.config, &self.columns, &self.store, &self.tree);
        if !self.selection.toggle_row(&ctx, row, selected) {
            return Vec::new();
        }
        let selection = self.selection.rows().to_vec();
        let mut events = Vec::new();
        if emit {
            events.push(GridEvent::Select {
                selection: selection.clone(),
                row: row.clone(),
            });
        }
        events.push(GridEvent::SelectionChange { rows: selection });
        events
    }

    pub fn clear_selection(&mut self) -> Vec<GridEvent> {
        if self.selection.clear() {
            vec![GridEvent::SelectionChange { rows: Vec::new() }]
        } else {
            Vec::new()
        }
    }

    // =========================================================================
    // Current row
    // =========================================================================

    pub fn set_current_row(&mut self, row: Option<Row>) -> Vec<GridEvent> {
        self.current
            .set(row, self.config.row_key.as_ref())
            .map(|(current, old)| GridEvent::CurrentChange { current, old })
            .into_iter()
            .collect()
    }

    pub fn set_current_row_key(&mut self, key: Option<&str>) -> Result<Vec<GridEvent>> {
        let row_key = self.require_row_key("set-current-row-key")?;
        let all_rows = self.tree.all_rows(self.store.raw(), Some(&row_key));
        Ok(self
            .current
            .set_key(key, &all_rows, &row_key)
            .map(|(current, old)| GridEvent::CurrentChange { current, old })
            .into_iter()
            .collect())
    }

    // =========================================================================
    // Expansion
    // =========================================================================

    /// Expandable-row mode is active when an expand column exists.
    pub fn expand_row_mode(&self) -> bool {
        self.columns.has_kind(ColumnKind::Expand)
    }

    pub fn toggle_row_expansion(&mut self, row: &Row, expanded: Option<bool>) -> Result<Vec<GridEvent>> {
        if self.expand_row_mode() {
            let changed = self
                .expand
                .toggle(row, expanded, self.config.row_key.as_ref());
            if !changed {
                return Ok(Vec::new());
            }
            self.layout.mark_dirty();
            return Ok(vec![GridEvent::ExpandChange {
                row: row.clone(),
                state: ExpandState::Rows(self.expand.rows().to_vec()),
            }]);
        }

        let row_key = self.require_row_key("tree expansion")?;
        let identity = row_key.identity(row);
        let Some(node) = self.tree.node(&identity) else {
            return Ok(Vec::new());
        };
        let target = expanded.unwrap_or(!node.expanded);
        if !self.tree.set_expanded(&identity, target) {
            return Ok(Vec::new());
        }
        self.layout.mark_dirty();
        Ok(vec![GridEvent::ExpandChange {
            row: row.clone(),
            state: ExpandState::Expanded(target),
        }])
    }

    pub fn set_expand_row_keys(&mut self, keys: Vec<String>) -> Result<()> {
        let row_key = self.require_row_key("set-expand-row-keys")?;
        if self.expand_row_mode() {
            self.expand.set_keys(&keys, self.store.raw(), &row_key);
        } else {
            self.tree.set_expand_keys(keys.into_iter().collect());
        }
        self.layout.mark_dirty();
        Ok(())
    }

    pub fn is_row_expanded(&self, row: &Row) -> bool {
        if self.expand_row_mode() {
            return self.expand.is_expanded(row, self.config.row_key.as_ref());
        }
        self.config
            .row_key
            .as_ref()
            .and_then(|key| self.tree.node(&key.identity(row)))
            .is_some_and(|node| node.expanded)
    }

    // =========================================================================
    // Lazy loading
    // =========================================================================

    /// Applies loaded children to a lazy node and cascades selection.
    pub fn apply_loaded(&mut self, key: &str, children: Vec<Row>, row_key: &RowKey) -> Vec<GridEvent> {
        self.tree.finish_load(key, children, row_key);
        self.tree.normalize(self.store.projection(), Some(row_key));

        // Children join a selected parent before counts are re-derived.
        let parent = self.tree.row(key).cloned();
        let adopted = match &parent {
            Some(parent) => {
                let ctx = selection_ctx(&self.config, &self.columns, &self.store, &self.tree);
                self.selection.adopt_children(&ctx, parent)
            }
            None => false,
        };
        let recounted = self.recompute();

        let mut events = Vec::new();
        if recounted || adopted {
            events.push(self.selection_change());
        }
        if let Some(row) = parent {
            events.push(GridEvent::ExpandChange {
                row,
                state: ExpandState::Expanded(true),
            });
        }
        events
    }

    // =========================================================================
    // Rendering
    // =========================================================================

    /// Rows in render order, with expandable-row state folded in.
    pub fn flat_rows(&self) -> Vec<FlatRow> {
        let mut rows = self
            .tree
            .flatten(self.store.projection(), self.config.row_key.as_ref());
        if self.expand_row_mode() {
            for flat in rows.iter_mut() {
                flat.expanded = self.expand.is_expanded(&flat.row, self.config.row_key.as_ref());
            }
        }
        rows
    }
}

fn collect_leaf_ids(column: &Column, out: &mut Vec<ColumnId>) {
    if column.is_leaf() {
        out.push(column.id);
    }
    for child in &column.children {
        collect_leaf_ids(child, out);
    }
}

/// Returns `true` if `leaf` is `root` or lies below it.
fn is_within(columns: &ColumnRegistry, root: ColumnId, leaf: ColumnId) -> bool {
    columns.find(root).is_some_and(|column| {
        let mut ids = Vec::new();
        collect_leaf_ids(column, &mut ids);
        ids.contains(&leaf)
    })
}
