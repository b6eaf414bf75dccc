//! Multi-level header geometry.

use std::ops::Range;

use super::Column;
use super::ColumnId;
use super::ColumnKind;
use super::Fixed;

/// One cell of the header grid.
#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCell {
    pub id: ColumnId,
    pub label: String,
    pub kind: ColumnKind,
    /// 1-based header row.
    pub level: usize,
    pub col_span: usize,
    pub row_span: usize,
    /// Effective sticky side (inherited from the root column).
    pub fixed: Fixed,
    pub is_leaf: bool,
    /// Indices of the covered leaves in the flattened leaf list.
    pub leaves: Range<usize>,
}

/// Assigns `level` top-down, `col_span` bottom-up and then `row_span`.
///
/// Returns the number of header rows.
pub(crate) fn assign_geometry(roots: &mut [Column]) -> usize {
    let max_level = assign_levels(roots, 1);
    assign_row_spans(roots, max_level);
    max_level
}

fn assign_levels(columns: &mut [Column], level: usize) -> usize {
    let mut max_level = if columns.is_empty() { 0 } else { level };
    for column in columns.iter_mut() {
        column.level = level;
        if column.is_leaf() {
            column.col_span = 1;
        } else {
            max_level = max_level.max(assign_levels(&mut column.children, level + 1));
            column.col_span = column.children.iter().map(|child| child.col_span).sum();
        }
    }
    max_level
}

fn assign_row_spans(columns: &mut [Column], max_level: usize) {
    for column in columns.iter_mut() {
        if column.is_leaf() {
            column.row_span = max_level - column.level + 1;
        } else {
            column.row_span = 1;
            assign_row_spans(&mut column.children, max_level);
        }
    }
}

/// Buckets the (already measured) column tree into header rows.
///
/// `ordered` lists the root columns in display order with their effective
/// fixed side.
pub(crate) fn build_header_rows(ordered: &[(&Column, Fixed)], max_level: usize) -> Vec<Vec<HeaderCell>> {
    let mut rows = vec![Vec::new(); max_level];
    let mut cursor = 0;
    for (column, fixed) in ordered {
        push_cells(column, *fixed, &mut cursor, &mut rows);
    }
    rows
}

fn push_cells(column: &Column, fixed: Fixed, cursor: &mut usize, rows: &mut [Vec<HeaderCell>]) {
    let start = *cursor;
    if let Some(row) = rows.get_mut(column.level - 1) {
        row.push(HeaderCell {
            id: column.id,
            label: column.label.clone(),
            kind: column.kind,
            level: column.level,
            col_span: column.col_span,
            row_span: column.row_span,
            fixed,
            is_leaf: column.is_leaf(),
            leaves: start..start + column.col_span,
        });
    }
    if column.is_leaf() {
        *cursor += 1;
    } else {
        for child in &column.children {
            push_cells(child, fixed, cursor, rows);
        }
    }
}
