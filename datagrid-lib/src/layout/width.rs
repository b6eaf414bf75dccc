//! Column width resolution.

use crate::column::Column;

/// Resolved pixel widths for the flattened leaves.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WidthPlan {
    /// One entry per leaf, in leaf order.
    pub widths: Vec<u32>,
    /// Width of the scrolled body content.
    pub body_width: u32,
    /// Whether the body overflows horizontally.
    pub scroll_x: bool,
}

/// Resolves real widths for `leaves` inside a viewport of `viewport` pixels.
///
/// Columns with a declared `width` keep it. Flexible columns (no `width`)
/// start at `min_width`, or `default_min` when unset.
///
/// In fit mode, when the minimums fit into the viewport minus `gutter`, the
/// spare pixels are shared in proportion to each flexible column's minimum;
/// the first flexible column absorbs the rounding remainder so the columns
/// fill the space exactly. When they don't fit, flexible columns stay at
/// their minimum and the body scrolls. Without fit (or without any flexible
/// column) every column takes `width`, else `min_width`, else `default_min`.
///
/// # Example
///
/// ```
/// use datagrid_lib::column::Column;
/// use datagrid_lib::layout::resolve_widths;
///
/// let leaves = vec![
///     Column::new("a", "A").width(100),
///     Column::new("b", "B").min_width(100),
///     Column::new("c", "C").min_width(50),
/// ];
/// let plan = resolve_widths(&leaves, 401, true, 80, 0);
/// assert_eq!(plan.widths, vec![100, 201, 100]);
/// assert!(!plan.scroll_x);
/// ```
pub fn resolve_widths(
    leaves: &[Column],
    viewport: u32,
    fit: bool,
    default_min: u32,
    gutter: u32,
) -> WidthPlan {
    let min_of = |column: &Column| column.effective_min_width(default_min);
    let declared_or_min = |column: &Column| column.width.unwrap_or_else(|| min_of(column));

    let flex: Vec<usize> = leaves
        .iter()
        .enumerate()
        .filter(|(_, column)| column.width.is_none())
        .map(|(index, _)| index)
        .collect();

    if !fit || flex.is_empty() {
        let widths: Vec<u32> = leaves.iter().map(declared_or_min).collect();
        let body_width: u32 = widths.iter().sum();
        return WidthPlan {
            scroll_x: body_width > viewport,
            widths,
            body_width,
        };
    }

    let min_sum: u32 = leaves.iter().map(declared_or_min).sum();
    let available = viewport.saturating_sub(gutter);
    let mut widths: Vec<u32> = leaves.iter().map(declared_or_min).collect();

    let scroll_x = if min_sum <= available {
        let spare = available - min_sum;
        let flex_min_sum: u32 = flex.iter().map(|&i| min_of(&leaves[i])).sum();
        let mut rest_total = 0;
        for &index in flex.iter().skip(1) {
            let min = min_of(&leaves[index]);
            let share = if flex_min_sum == 0 {
                0
            } else {
                (u64::from(min) * u64::from(spare) / u64::from(flex_min_sum)) as u32
            };
            rest_total += share;
            widths[index] = min + share;
        }
        let first = flex[0];
        widths[first] = min_of(&leaves[first]) + spare - rest_total;
        false
    } else {
        true
    };

    WidthPlan {
        widths,
        body_width: min_sum.max(viewport),
        scroll_x,
    }
}
