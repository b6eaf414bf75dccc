//! Filter pipeline stage.

use serde_json::Value;

use crate::column::Column;
use crate::model::Row;

/// Keeps the rows accepted by every active filter.
///
/// Filters combine as a conjunction across columns and a disjunction within
/// a column: a row survives a column if it is accepted for *any* of that
/// column's values. Columns with no values do not filter.
pub fn apply_filters(rows: Vec<Row>, active: &[(&Column, &[Value])]) -> Vec<Row> {
    active
        .iter()
        .filter(|(_, values)| !values.is_empty())
        .fold(rows, |rows, (column, values)| {
            rows.into_iter()
                .filter(|row| values.iter().any(|value| column.accepts(value, row)))
                .collect()
        })
}
