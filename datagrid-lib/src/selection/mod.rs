//! Row selection with cascading check states.

mod cascade;

use std::collections::HashMap;
use std::collections::HashSet;

use log::trace;
use serde::Deserialize;
use serde::Serialize;

use crate::column::SelectablePredicate;
use crate::model::Row;
use crate::model::RowKey;
use crate::tree::TreeStore;

/// How many rows may be selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Toggles are ignored.
    None,
    /// At most one selected row.
    Single,
    /// Any number of rows (checkbox style).
    #[default]
    Multi,
}

/// Derived checkbox state of a row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CheckState {
    pub checked: bool,
    pub indeterminate: bool,
}

impl CheckState {
    fn from_member(checked: bool) -> Self {
        Self {
            checked,
            indeterminate: false,
        }
    }
}

/// Borrowed view of the grid that selection walks need.
pub struct SelectionContext<'a> {
    pub row_key: Option<&'a RowKey>,
    pub tree: &'a TreeStore,
    /// Filtered, sorted top-level rows.
    pub roots: &'a [Row],
    pub selectable: Option<&'a SelectablePredicate>,
    indices: HashMap<String, usize>,
}

impl<'a> SelectionContext<'a> {
    pub fn new(
        row_key: Option<&'a RowKey>,
        tree: &'a TreeStore,
        roots: &'a [Row],
        selectable: Option<&'a SelectablePredicate>,
    ) -> Self {
        // Selectable predicates receive the row's position in render order.
        let indices = match (row_key, selectable) {
            (Some(key), Some(_)) => tree
                .flatten(roots, Some(key))
                .into_iter()
                .enumerate()
                .filter_map(|(index, flat)| flat.key.map(|key| (key, index)))
                .collect(),
            _ => HashMap::new(),
        };
        Self {
            row_key,
            tree,
            roots,
            selectable,
            indices,
        }
    }

    fn key(&self, row: &Row) -> Option<String> {
        self.row_key.map(|key| key.identity(row))
    }

    fn index_of(&self, row: &Row) -> usize {
        match self.key(row) {
            Some(key) => self.indices.get(&key).copied().unwrap_or(0),
            None => self.roots.iter().position(|r| r.ptr_eq(row)).unwrap_or(0),
        }
    }

    /// Applies the selection column's `selectable` predicate.
    pub fn is_selectable(&self, row: &Row) -> bool {
        self.selectable.is_none_or(|f| f(row, self.index_of(row)))
    }

    /// Lazy row whose children have not been loaded yet.
    fn is_unloaded(&self, row: &Row) -> bool {
        self.key(row)
            .and_then(|key| self.tree.node(&key))
            .is_some_and(|node| node.lazy && !node.loaded)
    }

    fn children(&self, row: &Row) -> Vec<Row> {
        let Some(key) = self.key(row) else {
            return Vec::new();
        };
        self.tree
            .node(&key)
            .map(|node| {
                node.children
                    .iter()
                    .filter_map(|child| self.tree.row(child).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// The selected rows plus the derived per-row check states.
///
/// Rows are identified by row key when one is configured, otherwise by
/// reference. Selection order is the order rows were selected in.
#[derive(Debug, Clone)]
pub struct Selection {
    mode: SelectionMode,
    check_strictly: bool,
    row_key: Option<RowKey>,
    rows: Vec<Row>,
    keys: HashSet<String>,
    states: HashMap<String, CheckState>,
    all_selected: bool,
}

impl Selection {
    pub fn new(mode: SelectionMode, check_strictly: bool, row_key: Option<RowKey>) -> Self {
        Self {
            mode,
            check_strictly,
            row_key,
            rows: Vec::new(),
            keys: HashSet::new(),
            states: HashMap::new(),
            all_selected: false,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    /// Selected rows in selection order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_all_selected(&self) -> bool {
        self.all_selected
    }

    pub fn contains(&self, row: &Row) -> bool {
        match &self.row_key {
            Some(key) => self.keys.contains(&key.identity(row)),
            None => self.rows.iter().any(|r| r.ptr_eq(row)),
        }
    }

    /// Checkbox state of a row.
    pub fn check_state(&self, row: &Row) -> CheckState {
        self.row_key
            .as_ref()
            .and_then(|key| self.states.get(&key.identity(row)).copied())
            .unwrap_or_else(|| CheckState::from_member(self.contains(row)))
    }

    fn cascades(&self, ctx: &SelectionContext<'_>) -> bool {
        self.mode == SelectionMode::Multi
            && !self.check_strictly
            && ctx.row_key.is_some()
            && !ctx.tree.is_empty()
    }

    fn insert(&mut self, row: &Row) -> bool {
        if self.contains(row) {
            return false;
        }
        if let Some(key) = &self.row_key {
            self.keys.insert(key.identity(row));
        }
        self.rows.push(row.clone());
        true
    }

    fn remove(&mut self, row: &Row) -> bool {
        match &self.row_key {
            Some(key) => {
                let identity = key.identity(row);
                if !self.keys.remove(&identity) {
                    return false;
                }
                self.rows.retain(|r| key.identity(r) != identity);
                true
            }
            None => {
                let before = self.rows.len();
                self.rows.retain(|r| !r.ptr_eq(row));
                self.rows.len() != before
            }
        }
    }

    fn set(&mut self, row: &Row, selected: bool) -> bool {
        if selected { self.insert(row) } else { self.remove(row) }
    }

    fn snapshot(&self) -> Vec<Row> {
        self.rows.clone()
    }

    fn differs(&self, before: &[Row]) -> bool {
        before.len() != self.rows.len()
            || before.iter().zip(&self.rows).any(|(a, b)| !a.ptr_eq(b))
    }

    // =========================================================================
    // Commands
    // =========================================================================

    /// Selects, deselects or flips one row.
    ///
    /// In cascading tree mode the new state is broadcast to every selectable
    /// descendant before check states are re-aggregated. Returns `true` if
    /// the selected set changed.
    pub fn toggle_row(&mut self, ctx: &SelectionContext<'_>, row: &Row, selected: Option<bool>) -> bool {
        if self.mode == SelectionMode::None {
            return false;
        }
        let before = self.snapshot();
        let target = selected.unwrap_or(!self.contains(row));

        match self.mode {
            SelectionMode::Single => {
                if target {
                    if !(self.rows.len() == 1 && self.contains(row)) {
                        self.clear_members();
                        self.insert(row);
                    }
                } else {
                    self.remove(row);
                }
            }
            _ => {
                self.set(row, target);
                if self.cascades(ctx) {
                    for child in cascade::descendants(ctx, row) {
                        if ctx.is_selectable(&child) {
                            self.set(&child, target);
                        }
                    }
                }
            }
        }

        self.recount(ctx);
        self.differs(&before)
    }

    /// Flips every selectable top-level row to the opposite of the
    /// all-selected state.
    ///
    /// With `select_on_indeterminate == false` a partial selection is
    /// cleared instead of completed. Only meaningful in multi mode.
    /// Returns `true` if the selected set changed.
    pub fn toggle_all(&mut self, ctx: &SelectionContext<'_>, select_on_indeterminate: bool) -> bool {
        if self.mode != SelectionMode::Multi {
            return false;
        }
        let before = self.snapshot();
        let value = if select_on_indeterminate {
            !self.all_selected
        } else {
            !(self.all_selected || !self.rows.is_empty())
        };
        let cascading = self.cascades(ctx);

        for row in ctx.roots {
            if !ctx.is_selectable(row) {
                continue;
            }
            self.set(row, value);
            if cascading {
                for child in cascade::descendants(ctx, row) {
                    if ctx.is_selectable(&child) {
                        self.set(&child, value);
                    }
                }
            }
        }

        self.recount(ctx);
        trace!("Toggled all rows to {}", value);
        self.differs(&before)
    }

    /// Selects the freshly loaded children of a selected parent.
    pub fn adopt_children(&mut self, ctx: &SelectionContext<'_>, parent: &Row) -> bool {
        if !self.cascades(ctx) || !self.contains(parent) {
            return false;
        }
        let before = self.snapshot();
        for child in cascade::descendants(ctx, parent) {
            if ctx.is_selectable(&child) {
                self.insert(&child);
            }
        }
        self.recount(ctx);
        self.differs(&before)
    }

    fn clear_members(&mut self) {
        self.rows.clear();
        self.keys.clear();
    }

    /// Deselects everything. Returns `true` if anything was selected.
    pub fn clear(&mut self) -> bool {
        let changed = !self.rows.is_empty();
        self.clear_members();
        self.states.clear();
        self.all_selected = false;
        changed
    }

    /// Reconciles the selection with replaced data.
    ///
    /// `all_rows` is every row of the new data, descendants included. Rows
    /// still present are swapped for their new handle. Rows no longer
    /// present are dropped, unless `reserve` keeps them. Returns `true` if
    /// rows were dropped.
    pub fn reconcile(&mut self, all_rows: &[Row], reserve: bool) -> bool {
        match &self.row_key {
            Some(key) => {
                let fresh: HashMap<String, &Row> =
                    all_rows.iter().map(|row| (key.identity(row), row)).collect();
                let before = self.rows.len();
                let mut kept = Vec::with_capacity(before);
                for row in self.rows.drain(..) {
                    let identity = key.identity(&row);
                    match fresh.get(&identity) {
                        Some(new_row) => kept.push((*new_row).clone()),
                        None if reserve => kept.push(row),
                        None => {
                            self.keys.remove(&identity);
                        }
                    }
                }
                self.rows = kept;
                self.rows.len() != before
            }
            None => {
                let before = self.rows.len();
                self.rows
                    .retain(|row| all_rows.iter().any(|candidate| candidate.ptr_eq(row)));
                self.rows.len() != before
            }
        }
    }

    /// Re-derives check states and the all-selected flag.
    ///
    /// In cascading tree mode, selectable parents follow their children.
    /// Returns `true` if that changed the selected set.
    pub fn recount(&mut self, ctx: &SelectionContext<'_>) -> bool {
        let before = self.snapshot();
        let cascading = self.cascades(ctx);

        if ctx.row_key.is_some() {
            let aggregate = {
                let is_member = |row: &Row| self.contains(row);
                cascade::aggregate(ctx, &is_member, cascading)
            };
            self.states = aggregate.states;
            for (row, checked) in aggregate.sync {
                self.set(&row, checked);
            }
        } else {
            self.states.clear();
        }

        self.all_selected = self.compute_all_selected(ctx);
        self.differs(&before)
    }

    fn compute_all_selected(&self, ctx: &SelectionContext<'_>) -> bool {
        let mut selected_count = 0;
        for row in ctx.roots {
            if self.contains(row) {
                selected_count += 1;
            } else if ctx.is_selectable(row) {
                return false;
            }
        }
        selected_count > 0
    }
}
