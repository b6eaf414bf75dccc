use std::sync::{Arc, Mutex};

use datagrid_lib::column::Column;
use datagrid_lib::model::Row;
use datagrid_lib::selection::SelectionMode;
use datagrid_lib::{Grid, GridConfig, GridError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Value, json};

fn recorder(grid: &Grid) -> Arc<Mutex<Vec<&'static str>>> {
    let names = Arc::new(Mutex::new(Vec::new()));
    let sink = names.clone();
    grid.on_event(move |event| sink.lock().unwrap().push(event.name()));
    names
}

fn flat(count: i64) -> Vec<Row> {
    (0..count).map(|id| Row::new(json!({ "id": id }))).collect()
}

fn keyed(config: GridConfig) -> Grid {
    let grid = Grid::new(config.with_row_key("id"));
    grid.insert_column(Column::selection(), None).unwrap();
    grid.insert_column(Column::new("id", "Id"), None).unwrap();
    grid
}

// ============================================================================
// Flat rows
// ============================================================================

#[test]
fn test_toggle_all_from_empty_and_from_full() {
    let grid = keyed(GridConfig::default());
    grid.set_data(flat(3)).unwrap();
    let events = recorder(&grid);

    grid.toggle_all_selection();
    assert_eq!(grid.selection().len(), 3);
    assert!(grid.is_all_selected());
    assert_eq!(*events.lock().unwrap(), vec!["selection-change", "select-all"]);

    events.lock().unwrap().clear();
    grid.toggle_all_selection();
    assert!(grid.selection().is_empty());
    assert!(!grid.is_all_selected());
    assert_eq!(*events.lock().unwrap(), vec!["selection-change", "select-all"]);
}

#[test]
fn test_toggle_all_with_partial_selection() {
    let grid = keyed(GridConfig::default());
    let rows = flat(3);
    grid.set_data(rows.clone()).unwrap();
    grid.toggle_row_selection(&rows[0], Some(true), false);

    grid.toggle_all_selection();
    assert_eq!(grid.selection().len(), 3);

    let grid = keyed(GridConfig::default().with_select_on_indeterminate(false));
    grid.set_data(rows.clone()).unwrap();
    grid.toggle_row_selection(&rows[0], Some(true), false);

    grid.toggle_all_selection();
    assert!(grid.selection().is_empty());
}

#[test]
fn test_toggle_all_skips_unselectable_rows() {
    let grid = Grid::new(GridConfig::default().with_row_key("id"));
    grid.insert_column(
        Column::selection().selectable(|row, _| row.get("id") != Some(&json!(1))),
        None,
    )
    .unwrap();
    let rows = flat(3);
    grid.set_data(rows.clone()).unwrap();

    grid.toggle_all_selection();
    assert_eq!(grid.selection().len(), 2);
    assert!(!grid.is_selected(&rows[1]));
    assert!(grid.is_all_selected());
}

#[test]
fn test_toggle_row_events() {
    let grid = keyed(GridConfig::default());
    let rows = flat(2);
    grid.set_data(rows.clone()).unwrap();
    let events = recorder(&grid);

    grid.toggle_row_selection(&rows[0], None, true);
    assert_eq!(*events.lock().unwrap(), vec!["select", "selection-change"]);

    // No change, no events.
    events.lock().unwrap().clear();
    grid.toggle_row_selection(&rows[0], Some(true), true);
    assert!(events.lock().unwrap().is_empty());

    grid.toggle_row_selection(&rows[0], Some(false), false);
    assert_eq!(*events.lock().unwrap(), vec!["selection-change"]);
}

#[test]
fn test_selection_keeps_selection_order() {
    let grid = keyed(GridConfig::default());
    let rows = flat(3);
    grid.set_data(rows.clone()).unwrap();
    grid.toggle_row_selection(&rows[2], Some(true), false);
    grid.toggle_row_selection(&rows[0], Some(true), false);

    let selected: Vec<Value> = grid
        .selection()
        .iter()
        .map(|row| row.get("id").cloned().unwrap())
        .collect();
    assert_eq!(selected, vec![json!(2), json!(0)]);
}

#[test]
fn test_single_mode_keeps_one_row() {
    let grid = keyed(GridConfig::default().with_selection_mode(SelectionMode::Single));
    let rows = flat(3);
    grid.set_data(rows.clone()).unwrap();

    grid.toggle_row_selection(&rows[0], Some(true), false);
    grid.toggle_row_selection(&rows[1], Some(true), false);
    assert_eq!(grid.selection().len(), 1);
    assert!(grid.is_selected(&rows[1]));

    grid.toggle_all_selection();
    assert_eq!(grid.selection().len(), 1);
}

#[test]
fn test_replacing_data_drops_missing_rows() {
    let grid = keyed(GridConfig::default());
    let rows = flat(3);
    grid.set_data(rows.clone()).unwrap();
    grid.toggle_row_selection(&rows[0], Some(true), false);
    grid.toggle_row_selection(&rows[2], Some(true), false);
    let events = recorder(&grid);

    // New handles, same identities for 0 and 1.
    grid.set_data(flat(2)).unwrap();
    assert_eq!(grid.selection().len(), 1);
    assert!(grid.selection()[0].ptr_eq(&grid.raw_data()[0]));
    assert_eq!(*events.lock().unwrap(), vec!["selection-change"]);
}

#[test]
fn test_reserve_selection_keeps_missing_rows() {
    let grid = keyed(GridConfig::default().with_reserve_selection(true));
    let rows = flat(3);
    grid.set_data(rows.clone()).unwrap();
    grid.toggle_row_selection(&rows[2], Some(true), false);

    grid.set_data(flat(2)).unwrap();
    assert_eq!(grid.selection().len(), 1);
    assert!(grid.is_selected(&rows[2]));
}

#[test]
fn test_reserve_selection_requires_row_key() {
    let grid = Grid::new(GridConfig::default().with_reserve_selection(true));
    assert!(matches!(
        grid.set_data(flat(1)),
        Err(GridError::RowKeyRequired { .. })
    ));
    assert!(grid.raw_data().is_empty());
}

#[test]
fn test_unkeyed_rows_select_by_reference() {
    let grid = Grid::new(GridConfig::default());
    let rows = vec![Row::new(json!({ "v": 1 })), Row::new(json!({ "v": 1 }))];
    grid.set_data(rows.clone()).unwrap();

    grid.toggle_row_selection(&rows[0], Some(true), false);
    assert!(grid.is_selected(&rows[0]));
    assert!(!grid.is_selected(&rows[1]));
}

#[test]
fn test_clear_selection() {
    let grid = keyed(GridConfig::default());
    grid.set_data(flat(2)).unwrap();
    grid.toggle_all_selection();
    let events = recorder(&grid);

    grid.clear_selection();
    grid.clear_selection();
    assert!(grid.selection().is_empty());
    assert_eq!(*events.lock().unwrap(), vec!["selection-change"]);
}

#[test]
fn test_reentrant_toggle_all_is_coalesced() {
    let grid = keyed(GridConfig::default());
    grid.set_data(flat(2)).unwrap();

    let inner = grid.clone();
    grid.on_event(move |event| {
        if event.name() == "select-all" {
            inner.toggle_all_selection();
        }
    });

    grid.toggle_all_selection();
    assert_eq!(grid.selection().len(), 2);
}

// ============================================================================
// Tree rows
// ============================================================================

fn tree_rows() -> Vec<Row> {
    vec![Row::new(json!({
        "id": 1,
        "children": [
            { "id": 11 },
            { "id": 12, "children": [{ "id": 121 }, { "id": 122 }] },
        ],
    }))]
}

fn find(grid: &Grid, id: i64) -> Row {
    grid.rows()
        .into_iter()
        .find(|flat| flat.row.get("id") == Some(&json!(id)))
        .map(|flat| flat.row)
        .unwrap()
}

#[test]
fn test_selecting_parent_cascades_to_descendants() {
    let grid = keyed(GridConfig::default());
    grid.set_data(tree_rows()).unwrap();

    grid.toggle_row_selection(&find(&grid, 1), Some(true), false);
    assert_eq!(grid.selection().len(), 5);

    grid.toggle_row_selection(&find(&grid, 121), Some(false), false);
    let parent = grid.check_state(&find(&grid, 12));
    assert!(!parent.checked);
    assert!(parent.indeterminate);
    let root = grid.check_state(&find(&grid, 1));
    assert!(!root.checked);
    assert!(root.indeterminate);
    assert!(!grid.is_selected(&find(&grid, 1)));
}

#[test]
fn test_selecting_all_children_checks_parent() {
    let grid = keyed(GridConfig::default());
    grid.set_data(tree_rows()).unwrap();

    grid.toggle_row_selection(&find(&grid, 121), Some(true), false);
    grid.toggle_row_selection(&find(&grid, 122), Some(true), false);
    assert!(grid.check_state(&find(&grid, 12)).checked);
    assert!(grid.is_selected(&find(&grid, 12)));
    assert!(grid.check_state(&find(&grid, 1)).indeterminate);
}

#[test]
fn test_check_strictly_does_not_cascade() {
    let grid = keyed(GridConfig::default().with_check_strictly(true));
    grid.set_data(tree_rows()).unwrap();

    grid.toggle_row_selection(&find(&grid, 1), Some(true), false);
    assert_eq!(grid.selection().len(), 1);
    assert!(!grid.check_state(&find(&grid, 12)).checked);
}

#[derive(Default)]
struct Builder {
    next: i64,
}

impl Builder {
    fn node(&mut self, rng: &mut StdRng, depth: usize) -> Value {
        self.next += 1;
        let id = self.next;
        let width = if depth == 0 { 0 } else { rng.random_range(0..4) };
        if width == 0 {
            if rng.random_bool(0.2) {
                return json!({ "id": id, "hasChildren": true });
            }
            return json!({ "id": id });
        }
        let children: Vec<Value> = (0..width).map(|_| self.node(rng, depth - 1)).collect();
        json!({ "id": id, "children": children })
    }
}

#[test]
fn test_random_trees_aggregate_consistently() {
    let mut rng = StdRng::seed_from_u64(7);

    for _ in 0..25 {
        let mut builder = Builder::default();
        let data: Vec<Row> = (0..3)
            .map(|_| Row::new(builder.node(&mut rng, 3)))
            .collect();
        let grid = keyed(GridConfig::default());
        grid.set_data(data).unwrap();

        let rows = grid.rows();
        for flat in rows.iter().filter(|flat| !flat.has_children || flat.lazy) {
            if rng.random_bool(0.5) {
                grid.toggle_row_selection(&flat.row, Some(true), false);
            }
        }

        for flat in grid.rows() {
            let Some(key) = flat.key.as_deref() else {
                continue;
            };
            let Some(node) = grid.tree_node(key) else {
                continue;
            };
            if node.children.is_empty() {
                continue;
            }
            // (loaded, checked, partially weighed) per child.
            let children: Vec<(bool, bool, bool)> = node
                .children
                .iter()
                .map(|child| {
                    let row = find(&grid, child.parse().unwrap());
                    let loaded = grid.tree_node(child).is_none_or(|n| !n.lazy || n.loaded);
                    let state = grid.check_state(&row);
                    let weighed = if loaded {
                        state.checked || state.indeterminate
                    } else {
                        grid.is_selected(&row)
                    };
                    (loaded, state.checked, weighed)
                })
                .collect();
            let state = grid.check_state(&flat.row);

            let all = children.iter().all(|&(loaded, checked, _)| loaded && checked);
            let some = children.iter().any(|&(_, _, weighed)| weighed);
            assert_eq!(state.checked, all, "node {key}");
            assert_eq!(state.indeterminate, some && !all, "node {key}");
            assert_eq!(grid.is_selected(&flat.row), all, "node {key}");
        }
    }
}
