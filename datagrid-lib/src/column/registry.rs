//! Column tree registration and left/center/right partitioning.

use log::trace;

use crate::error::GridError;
use crate::error::Result;

use super::Column;
use super::ColumnId;
use super::ColumnKind;
use super::Fixed;
use super::HeaderCell;
use super::header::assign_geometry;
use super::header::build_header_rows;

/// Ordered column tree with its derived leaf list and header rows.
///
/// Declarations are kept as inserted (apart from ids and geometry). The
/// flattened leaves are copies carrying their *effective* fixed side, and
/// are ordered left-fixed, then scrolling, then right-fixed.
#[derive(Debug, Clone, Default)]
pub struct ColumnRegistry {
    roots: Vec<Column>,
    next_id: usize,
    next_order: usize,
    leaves: Vec<Column>,
    left_count: usize,
    right_count: usize,
    header_rows: Vec<Vec<HeaderCell>>,
}

impl ColumnRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Registers a column (and its children) under `parent`, or as a root.
    ///
    /// The column is appended and its siblings are re-sorted by declaration
    /// order, so columns inserted out of order still converge to it.
    pub fn insert(&mut self, mut column: Column, parent: Option<ColumnId>) -> Result<ColumnId> {
        if let Some(parent_id) = parent
            && self.find(parent_id).is_none()
        {
            return Err(GridError::UnknownColumn(parent_id));
        }

        self.assign(&mut column);
        let id = column.id;
        let siblings = self.siblings_mut(parent)?;
        siblings.push(column);
        sort_siblings(siblings);

        self.rebuild();
        trace!("Inserted column {} (parent {:?})", id, parent);
        Ok(id)
    }

    /// Removes a column from `parent`'s children (or the roots).
    ///
    /// Falls back to a search of the whole tree when the column is not a
    /// direct child of `parent`.
    pub fn remove(&mut self, id: ColumnId, parent: Option<ColumnId>) -> Result<Column> {
        let position = self.siblings_mut(parent)?.iter().position(|c| c.id == id);
        let removed = match position {
            Some(index) => self.siblings_mut(parent)?.remove(index),
            None => remove_deep(&mut self.roots, id).ok_or(GridError::UnknownColumn(id))?,
        };

        self.rebuild();
        trace!("Removed column {}", id);
        Ok(removed)
    }

    fn assign(&mut self, column: &mut Column) {
        if !column.id.is_assigned() {
            self.next_id += 1;
            column.id = ColumnId(self.next_id);
        }
        match column.order {
            Some(order) => self.next_order = self.next_order.max(order + 1),
            None => {
                column.order = Some(self.next_order);
                self.next_order += 1;
            }
        }
        for child in column.children.iter_mut() {
            self.assign(child);
        }
        sort_siblings(&mut column.children);
    }

    fn siblings_mut(&mut self, parent: Option<ColumnId>) -> Result<&mut Vec<Column>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(parent_id) => find_mut(&mut self.roots, parent_id)
                .map(|column| &mut column.children)
                .ok_or(GridError::UnknownColumn(parent_id)),
        }
    }

    /// Recomputes geometry, the fixed partition, leaves and header rows.
    fn rebuild(&mut self) {
        let max_level = assign_geometry(&mut self.roots);

        // A leading selection column follows the other fixed columns.
        let promote = self
            .roots
            .first()
            .is_some_and(|c| c.kind == ColumnKind::Selection && c.fixed == Fixed::None)
            && self.roots.iter().any(|c| c.fixed.is_fixed());

        let mut left = Vec::new();
        let mut center = Vec::new();
        let mut right = Vec::new();
        for (index, column) in self.roots.iter().enumerate() {
            let fixed = if promote && index == 0 {
                Fixed::Left
            } else {
                column.fixed
            };
            match fixed {
                Fixed::Left => left.push((column, fixed)),
                Fixed::None => center.push((column, fixed)),
                Fixed::Right => right.push((column, fixed)),
            }
        }

        let ordered: Vec<(&Column, Fixed)> = left
            .iter()
            .chain(center.iter())
            .chain(right.iter())
            .copied()
            .collect();

        let mut leaves = Vec::new();
        for (column, fixed) in &ordered {
            flatten_into(column, *fixed, &mut leaves);
        }

        self.left_count = left.iter().map(|(c, _)| c.col_span).sum();
        self.right_count = right.iter().map(|(c, _)| c.col_span).sum();
        self.header_rows = build_header_rows(&ordered, max_level);
        self.leaves = leaves;
    }

    /// Mutable access to the flattened leaves (layout writes real widths).
    pub(crate) fn leaves_mut(&mut self) -> &mut [Column] {
        &mut self.leaves
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Root declarations in declaration order.
    pub fn roots(&self) -> &[Column] {
        &self.roots
    }

    /// Flattened leaves: left-fixed, then scrolling, then right-fixed.
    pub fn leaves(&self) -> &[Column] {
        &self.leaves
    }

    pub fn left_leaves(&self) -> &[Column] {
        &self.leaves[..self.left_count]
    }

    pub fn center_leaves(&self) -> &[Column] {
        &self.leaves[self.left_count..self.leaves.len() - self.right_count]
    }

    pub fn right_leaves(&self) -> &[Column] {
        &self.leaves[self.leaves.len() - self.right_count..]
    }

    pub fn left_count(&self) -> usize {
        self.left_count
    }

    pub fn right_count(&self) -> usize {
        self.right_count
    }

    pub fn header_rows(&self) -> &[Vec<HeaderCell>] {
        &self.header_rows
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Finds a declaration (leaf or group) by id.
    pub fn find(&self, id: ColumnId) -> Option<&Column> {
        find(&self.roots, id)
    }

    /// Finds a flattened leaf by id.
    pub fn leaf(&self, id: ColumnId) -> Option<&Column> {
        self.leaves.iter().find(|c| c.id == id)
    }

    /// Finds a leaf by its column key or id string.
    pub fn find_by_key(&self, key: &str) -> Option<&Column> {
        self.leaves.iter().find(|c| c.matches_key(key))
    }

    /// Finds a leaf by its property path.
    pub fn find_by_prop(&self, prop: &str) -> Option<&Column> {
        self.leaves.iter().find(|c| c.prop.as_deref() == Some(prop))
    }

    /// Looks a leaf up by column key, id string, or property.
    pub fn lookup(&self, key: &str) -> Option<&Column> {
        self.find_by_key(key).or_else(|| self.find_by_prop(key))
    }

    pub fn has_kind(&self, kind: ColumnKind) -> bool {
        self.leaves.iter().any(|c| c.kind == kind)
    }

    /// The first selection column, which owns the `selectable` predicate.
    pub fn selection_column(&self) -> Option<&Column> {
        self.leaves.iter().find(|c| c.kind == ColumnKind::Selection)
    }
}

fn sort_siblings(columns: &mut [Column]) {
    columns.sort_by_key(|c| c.order.unwrap_or(usize::MAX));
}

fn flatten_into(column: &Column, fixed: Fixed, out: &mut Vec<Column>) {
    if column.is_leaf() {
        let mut leaf = column.clone();
        leaf.fixed = fixed;
        out.push(leaf);
    } else {
        for child in &column.children {
            flatten_into(child, fixed, out);
        }
    }
}

fn find(columns: &[Column], id: ColumnId) -> Option<&Column> {
    for column in columns {
        if column.id == id {
            return Some(column);
        }
        if let Some(found) = find(&column.children, id) {
            return Some(found);
        }
    }
    None
}

fn find_mut(columns: &mut [Column], id: ColumnId) -> Option<&mut Column> {
    for column in columns.iter_mut() {
        if column.id == id {
            return Some(column);
        }
        if let Some(found) = find_mut(&mut column.children, id) {
            return Some(found);
        }
    }
    None
}

fn remove_deep(columns: &mut Vec<Column>, id: ColumnId) -> Option<Column> {
    if let Some(index) = columns.iter().position(|c| c.id == id) {
        return Some(columns.remove(index));
    }
    columns
        .iter_mut()
        .find_map(|column| remove_deep(&mut column.children, id))
}
