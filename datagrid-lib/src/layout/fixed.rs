//! Sticky offsets for fixed columns.

use serde::Serialize;

use crate::column::Fixed;
use crate::column::HeaderCell;

/// Edge a fixed column sticks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StickySide {
    Left,
    Right,
}

/// Sticky placement of a fixed column or header cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StickyPosition {
    pub side: StickySide,
    /// Distance from the sticky edge in pixels.
    pub offset: u32,
    /// Last left-fixed or first right-fixed column (draws the shadow edge).
    pub boundary: bool,
}

/// Computes sticky positions for every leaf.
///
/// `widths` are the real widths in leaf order; the first `left_count`
/// leaves are left-fixed and the last `right_count` are right-fixed.
/// Scrolling leaves get `None`.
pub fn leaf_positions(
    widths: &[u32],
    left_count: usize,
    right_count: usize,
) -> Vec<Option<StickyPosition>> {
    let total = widths.len();
    let right_start = total.saturating_sub(right_count);
    let mut positions = vec![None; total];

    let mut offset = 0;
    for (index, width) in widths.iter().enumerate().take(left_count) {
        positions[index] = Some(StickyPosition {
            side: StickySide::Left,
            offset,
            boundary: index + 1 == left_count,
        });
        offset += width;
    }

    let mut offset = 0;
    for index in (right_start..total).rev() {
        positions[index] = Some(StickyPosition {
            side: StickySide::Right,
            offset,
            boundary: index == right_start,
        });
        offset += widths[index];
    }

    positions
}

/// Computes the sticky position of a header cell.
///
/// A group takes the offset of its outermost leaf: the first one on the
/// left side, the last one on the right side. Right-side header offsets are
/// shifted by `gutter` (the vertical scrollbar reserved in the header).
pub fn header_position(
    cell: &HeaderCell,
    leaves: &[Option<StickyPosition>],
    left_count: usize,
    right_count: usize,
    gutter: u32,
) -> Option<StickyPosition> {
    let right_start = leaves.len().saturating_sub(right_count);
    match cell.fixed {
        Fixed::None => None,
        Fixed::Left => {
            let leaf = (*leaves.get(cell.leaves.start)?)?;
            Some(StickyPosition {
                boundary: cell.leaves.end == left_count,
                ..leaf
            })
        }
        Fixed::Right => {
            let leaf = (*leaves.get(cell.leaves.end.checked_sub(1)?)?)?;
            Some(StickyPosition {
                offset: leaf.offset + gutter,
                boundary: cell.leaves.start == right_start,
                ..leaf
            })
        }
    }
}
