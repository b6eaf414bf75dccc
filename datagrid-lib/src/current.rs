//! Current (highlighted) row tracking.

use crate::model::Row;
use crate::model::RowKey;
use crate::model::same_row;

/// A change of the current row: `(current, old)`.
pub type CurrentChange = (Option<Row>, Option<Row>);

/// The single current row.
///
/// Across data replacement the row is followed by identity: when its handle
/// disappears it is looked up again by row key, and only if that fails does
/// it become `None`.
#[derive(Debug, Clone, Default)]
pub struct CurrentRow {
    row: Option<Row>,
    /// Key requested before the matching row existed.
    pending_key: Option<String>,
}

impl CurrentRow {
    pub fn new(pending_key: Option<String>) -> Self {
        Self {
            row: None,
            pending_key,
        }
    }

    pub fn row(&self) -> Option<&Row> {
        self.row.as_ref()
    }

    pub fn pending_key(&self) -> Option<&str> {
        self.pending_key.as_deref()
    }

    /// Sets the current row. Returns the change if the identity differs.
    pub fn set(&mut self, row: Option<Row>, row_key: Option<&RowKey>) -> Option<CurrentChange> {
        self.pending_key = None;
        let unchanged = match (&self.row, &row) {
            (None, None) => true,
            (Some(old), Some(new)) => same_row(row_key, old, new),
            _ => false,
        };
        if unchanged {
            self.row = row;
            return None;
        }
        let old = std::mem::replace(&mut self.row, row.clone());
        Some((row, old))
    }

    /// Sets the current row by identity among `rows`.
    ///
    /// An unknown key clears the current row and is remembered until a
    /// matching row arrives.
    pub fn set_key(&mut self, key: Option<&str>, rows: &[Row], row_key: &RowKey) -> Option<CurrentChange> {
        let Some(key) = key else {
            return self.set(None, Some(row_key));
        };
        let found = rows.iter().find(|row| row_key.identity(row) == key).cloned();
        let missing = found.is_none();
        let change = self.set(found, Some(row_key));
        if missing {
            self.pending_key = Some(key.to_string());
        }
        change
    }

    /// Re-resolves the current row against replaced data.
    ///
    /// A row that is still present, or found again by key, is kept silently
    /// (with its new handle). A row that is gone becomes `None` with exactly
    /// one change. A pending key resolves once its row shows up.
    pub fn reconcile(&mut self, rows: &[Row], row_key: Option<&RowKey>) -> Option<CurrentChange> {
        if let Some(old) = &self.row {
            if rows.iter().any(|row| row.ptr_eq(old)) {
                return None;
            }
            let found = row_key.and_then(|key| {
                let identity = key.identity(old);
                rows.iter().find(|row| key.identity(row) == identity).cloned()
            });
            return match found {
                Some(row) => {
                    self.row = Some(row);
                    None
                }
                None => Some((None, self.row.take())),
            };
        }

        let key = self.pending_key.as_deref()?;
        let row_key = row_key?;
        let found = rows.iter().find(|row| row_key.identity(row) == key).cloned()?;
        self.pending_key = None;
        self.row = Some(found.clone());
        Some((Some(found), None))
    }
}
