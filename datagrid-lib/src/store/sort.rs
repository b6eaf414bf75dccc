//! Sort pipeline stage.

use std::cmp::Ordering;

use serde_json::Value;

use crate::column::Column;
use crate::column::SortOrder;
use crate::model::Row;
use crate::model::compare_values;

/// Sorts rows by a column.
///
/// The column's `sort_method` wins; otherwise rows are compared by the
/// composite key from `sort_by`, else by the value at `prop`. The sort is
/// stable in both directions: rows with equal keys keep their input order.
/// A column with nothing to sort by leaves the rows untouched.
///
/// # Example
///
/// ```
/// use datagrid_lib::column::{Column, SortOrder};
/// use datagrid_lib::model::Row;
/// use datagrid_lib::store::order_by;
/// use serde_json::json;
///
/// let rows = vec![
///     Row::new(json!({ "k": 1, "i": 0 })),
///     Row::new(json!({ "k": 1, "i": 1 })),
///     Row::new(json!({ "k": 0, "i": 2 })),
/// ];
/// let sorted = order_by(rows, &Column::new("k", "K"), SortOrder::Ascending);
/// let order: Vec<_> = sorted.iter().map(|r| r.value()["i"].clone()).collect();
/// assert_eq!(order, vec![json!(2), json!(0), json!(1)]);
/// ```
pub fn order_by(mut rows: Vec<Row>, column: &Column, order: SortOrder) -> Vec<Row> {
    if let Some(method) = &column.sort_method {
        rows.sort_by(|a, b| order.apply(method(a, b)));
        return rows;
    }

    if column.sort_by.is_empty() && column.prop.is_none() {
        return rows;
    }
    let extract = |row: &Row, index: usize| -> Vec<Value> {
        if column.sort_by.is_empty() {
            vec![column.cell(row).cloned().unwrap_or(Value::Null)]
        } else {
            column
                .sort_by
                .iter()
                .map(|key| key.extract(row, index))
                .collect()
        }
    };

    let mut keyed: Vec<(Vec<Value>, Row)> = rows
        .into_iter()
        .enumerate()
        .map(|(index, row)| (extract(&row, index), row))
        .collect();
    keyed.sort_by(|(a, _), (b, _)| order.apply(compare_keys(a, b)));
    keyed.into_iter().map(|(_, row)| row).collect()
}

fn compare_keys(a: &[Value], b: &[Value]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| compare_values(Some(x), Some(y)))
        .find(|ordering| *ordering != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
