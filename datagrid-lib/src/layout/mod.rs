//! Width resolution and fixed-column layout.
//!
//! Layout is never recomputed per column mutation. Mutations mark it dirty
//! and [`TableLayout::flush`] recomputes it once.

mod fixed;
mod width;

pub use fixed::*;
pub use width::*;

use log::trace;
use serde::Serialize;

use crate::column::ColumnId;
use crate::column::ColumnRegistry;
use crate::config::GridConfig;

/// Resolved layout of one leaf column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnLayout {
    pub id: ColumnId,
    pub real_width: u32,
    pub sticky: Option<StickyPosition>,
}

/// Resolved layout of one header cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderLayout {
    pub id: ColumnId,
    /// Sum of the covered leaves' widths.
    pub width: u32,
    pub sticky: Option<StickyPosition>,
}

/// Snapshot of the computed layout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Layout {
    pub viewport_width: u32,
    pub body_width: u32,
    pub scroll_x: bool,
    pub scroll_y: bool,
    /// Width reserved for the vertical scrollbar in the header (0 unless
    /// `scroll_y`).
    pub gutter_width: u32,
    pub left_fixed_width: u32,
    pub right_fixed_width: u32,
    /// One entry per leaf, in leaf order.
    pub columns: Vec<ColumnLayout>,
    /// Mirrors the registry's header rows.
    pub header: Vec<Vec<HeaderLayout>>,
}

impl Layout {
    pub fn column(&self, id: ColumnId) -> Option<&ColumnLayout> {
        self.columns.iter().find(|c| c.id == id)
    }
}

/// Layout state: viewport metrics, the dirty flag and the last snapshot.
#[derive(Debug, Clone)]
pub struct TableLayout {
    viewport_width: u32,
    scroll_y: bool,
    fit: bool,
    scrollbar_width: u32,
    default_min_width: u32,
    dirty: bool,
    snapshot: Layout,
}

impl TableLayout {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            viewport_width: 0,
            scroll_y: false,
            fit: config.fit,
            scrollbar_width: config.scrollbar_width,
            default_min_width: config.default_min_width,
            dirty: true,
            snapshot: Layout::default(),
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn viewport_width(&self) -> u32 {
        self.viewport_width
    }

    pub fn set_viewport_width(&mut self, width: u32) {
        if self.viewport_width != width {
            self.viewport_width = width;
            self.dirty = true;
        }
    }

    pub fn scroll_y(&self) -> bool {
        self.scroll_y
    }

    /// Updates the vertical overflow flag from measured body metrics.
    ///
    /// Returns `true` if the flag changed.
    pub fn update_scroll_y(&mut self, scroll_height: u32, client_height: u32) -> bool {
        let scroll_y = scroll_height > client_height;
        if scroll_y == self.scroll_y {
            return false;
        }
        self.scroll_y = scroll_y;
        self.dirty = true;
        true
    }

    pub fn gutter_width(&self) -> u32 {
        if self.scroll_y { self.scrollbar_width } else { 0 }
    }

    /// The last computed snapshot (may be stale while dirty).
    pub fn snapshot(&self) -> &Layout {
        &self.snapshot
    }

    /// Recomputes widths and sticky offsets if dirty.
    ///
    /// Real widths are written back onto the registry's flattened leaves.
    /// Returns `true` if a recomputation happened.
    pub fn flush(&mut self, registry: &mut ColumnRegistry) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;

        let gutter = self.gutter_width();
        let plan = resolve_widths(
            registry.leaves(),
            self.viewport_width,
            self.fit,
            self.default_min_width,
            gutter,
        );
        for (leaf, width) in registry.leaves_mut().iter_mut().zip(&plan.widths) {
            leaf.real_width = *width;
        }

        let left_count = registry.left_count();
        let right_count = registry.right_count();
        let positions = leaf_positions(&plan.widths, left_count, right_count);

        let columns = registry
            .leaves()
            .iter()
            .zip(plan.widths.iter().zip(&positions))
            .map(|(leaf, (width, sticky))| ColumnLayout {
                id: leaf.id,
                real_width: *width,
                sticky: *sticky,
            })
            .collect();

        let header = registry
            .header_rows()
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| HeaderLayout {
                        id: cell.id,
                        width: plan.widths[cell.leaves.clone()].iter().sum(),
                        sticky: header_position(cell, &positions, left_count, right_count, gutter),
                    })
                    .collect()
            })
            .collect();

        let total = plan.widths.len();
        self.snapshot = Layout {
            viewport_width: self.viewport_width,
            body_width: plan.body_width,
            scroll_x: plan.scroll_x,
            scroll_y: self.scroll_y,
            gutter_width: gutter,
            left_fixed_width: plan.widths[..left_count].iter().sum(),
            right_fixed_width: plan.widths[total - right_count..].iter().sum(),
            columns,
            header,
        };
        trace!(
            "Layout flushed: body width {}, scroll x {}",
            self.snapshot.body_width, self.snapshot.scroll_x
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::column::Column;

    #[test]
    fn test_flush_only_when_dirty() {
        let mut registry = ColumnRegistry::new();
        registry.insert(Column::new("a", "A").width(100), None).unwrap();
        let mut layout = TableLayout::new(&GridConfig::default());
        layout.set_viewport_width(300);

        assert!(layout.flush(&mut registry));
        assert!(!layout.flush(&mut registry));
        assert_eq!(registry.leaves()[0].real_width, 100);

        layout.set_viewport_width(300);
        assert!(!layout.is_dirty());
        layout.set_viewport_width(200);
        assert!(layout.is_dirty());
    }

    #[test]
    fn test_scroll_y_reserves_gutter() {
        let mut registry = ColumnRegistry::new();
        registry.insert(Column::new("a", "A"), None).unwrap();
        registry.insert(Column::new("b", "B").width(50).fixed_right(), None).unwrap();
        let mut layout = TableLayout::new(&GridConfig::default());
        layout.set_viewport_width(300);

        assert!(layout.update_scroll_y(1000, 400));
        assert!(!layout.update_scroll_y(900, 400));
        layout.flush(&mut registry);

        let snapshot = layout.snapshot();
        assert_eq!(snapshot.gutter_width, 17);
        assert_eq!(snapshot.columns[0].real_width, 233);
        assert_eq!(snapshot.right_fixed_width, 50);
        assert_eq!(snapshot.header[0][1].sticky.map(|s| s.offset), Some(17));
        assert_eq!(snapshot.columns[1].sticky.map(|s| s.offset), Some(0));
    }

    #[test]
    fn test_snapshot_serializes_column_ids() {
        let mut registry = ColumnRegistry::new();
        let id = registry.insert(Column::new("a", "A").width(100), None).unwrap();
        let mut layout = TableLayout::new(&GridConfig::default());
        layout.set_viewport_width(300);
        layout.flush(&mut registry);

        let json = serde_json::to_value(layout.snapshot()).unwrap();
        assert_eq!(json["columns"][0]["id"], serde_json::json!(id.0));
        assert_eq!(json["columns"][0]["realWidth"], 100);
        assert_eq!(json["header"][0][0]["id"], serde_json::json!(id.0));
    }
}
