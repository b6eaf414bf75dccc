//! Tree walks for cascading selection.

use std::collections::HashMap;

use crate::model::Row;

use super::CheckState;
use super::SelectionContext;

/// Collects the descendants of `row` in depth-first order.
pub(super) fn descendants(ctx: &SelectionContext<'_>, row: &Row) -> Vec<Row> {
    let mut out = Vec::new();
    let mut stack = ctx.children(row);
    stack.reverse();
    while let Some(child) = stack.pop() {
        let mut grandchildren = ctx.children(&child);
        grandchildren.reverse();
        stack.extend(grandchildren);
        out.push(child);
    }
    out
}

/// Result of the bottom-up pass.
pub(super) struct Aggregate {
    pub states: HashMap<String, CheckState>,
    /// Parents whose membership must follow their children: `(row, checked)`.
    pub sync: Vec<(Row, bool)>,
}

/// Derives check states bottom-up from leaf memberships.
///
/// Children are weighed in half units (checked 2, indeterminate 1) against
/// twice the number of selectable children. A parent is checked when every
/// selectable child is loaded and checked, and indeterminate when some
/// weight exists otherwise. A lazy child that has not loaded yet never
/// counts as checked: it weighs 1 if selected and 0 if not. Rows with no
/// selectable children report their own membership.
pub(super) fn aggregate(
    ctx: &SelectionContext<'_>,
    is_member: &dyn Fn(&Row) -> bool,
    cascade: bool,
) -> Aggregate {
    let mut out = Aggregate {
        states: HashMap::new(),
        sync: Vec::new(),
    };
    for row in ctx.roots {
        visit(ctx, row, is_member, cascade, &mut out);
    }
    out
}

fn visit(
    ctx: &SelectionContext<'_>,
    row: &Row,
    is_member: &dyn Fn(&Row) -> bool,
    cascade: bool,
    out: &mut Aggregate,
) -> CheckState {
    let Some(key) = ctx.key(row) else {
        return CheckState::from_member(is_member(row));
    };
    if let Some(state) = out.states.get(&key) {
        return *state;
    }

    let mut total = 0u32;
    let mut weight = 0u32;
    let mut pending = false;
    for child in ctx.children(row) {
        let state = visit(ctx, &child, is_member, cascade, out);
        if !ctx.is_selectable(&child) {
            continue;
        }
        total += 2;
        if ctx.is_unloaded(&child) {
            pending = true;
            weight += u32::from(is_member(&child));
            continue;
        }
        weight += match state {
            CheckState { checked: true, .. } => 2,
            CheckState { indeterminate: true, .. } => 1,
            _ => 0,
        };
    }

    let state = if total == 0 || !cascade {
        CheckState::from_member(is_member(row))
    } else {
        let checked = !pending && weight == total;
        let state = CheckState {
            checked,
            indeterminate: weight > 0 && !checked,
        };
        // Until every child has loaded, a parent is only ever deselected here.
        let follows = !pending || weight == 0;
        if follows && ctx.is_selectable(row) && is_member(row) != checked {
            out.sync.push((row.clone(), checked));
        }
        state
    };
    out.states.insert(key, state);
    state
}
