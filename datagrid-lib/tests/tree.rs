use std::sync::{Arc, Mutex};

use datagrid_lib::column::Column;
use datagrid_lib::model::Row;
use datagrid_lib::{ExpandState, Grid, GridConfig, GridError, GridEvent};
use serde_json::json;

fn data() -> Vec<Row> {
    vec![
        Row::new(json!({
            "id": 1,
            "name": "b",
            "children": [
                { "id": 11, "name": "x" },
                { "id": 12, "name": "y", "children": [{ "id": 121, "name": "z" }] },
            ],
        })),
        Row::new(json!({ "id": 2, "name": "a" })),
    ]
}

fn keys(grid: &Grid) -> Vec<String> {
    grid.visible_rows()
        .into_iter()
        .filter_map(|flat| flat.key)
        .collect()
}

fn row(grid: &Grid, key: &str) -> Row {
    grid.rows()
        .into_iter()
        .find(|flat| flat.key.as_deref() == Some(key))
        .map(|flat| flat.row)
        .unwrap()
}

fn tree_grid(config: GridConfig) -> Grid {
    let grid = Grid::new(config.with_row_key("id"));
    grid.insert_column(Column::new("name", "Name").key("name").sortable(), None)
        .unwrap();
    grid.set_data(data()).unwrap();
    grid
}

#[test]
fn test_tree_data_requires_row_key() {
    let grid = Grid::new(GridConfig::default());
    let err = grid.set_data(data()).unwrap_err();
    assert!(matches!(err, GridError::RowKeyRequired { .. }));
    assert!(err.is_configuration());
    assert!(grid.raw_data().is_empty());
}

#[test]
fn test_collapsed_by_default() {
    let grid = tree_grid(GridConfig::default());
    assert_eq!(keys(&grid), vec!["1", "2"]);

    let rows = grid.rows();
    assert_eq!(rows.len(), 5);
    assert!(rows[0].has_children);
    assert!(!rows[1].display);
    assert_eq!(rows[1].level, 1);
    assert_eq!(rows[1].indent, 16);
}

#[test]
fn test_toggle_expansion_emits_expand_change() {
    let grid = tree_grid(GridConfig::default());
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    grid.on_event(move |event| sink.lock().unwrap().push(event.clone()));

    let parent = row(&grid, "1");
    grid.toggle_row_expansion(&parent, None).unwrap();
    assert!(grid.is_row_expanded(&parent));
    assert_eq!(keys(&grid), vec!["1", "11", "12", "2"]);

    grid.toggle_row_expansion(&row(&grid, "12"), Some(true)).unwrap();
    assert_eq!(keys(&grid), vec!["1", "11", "12", "121", "2"]);

    // Collapsing hides the whole branch.
    grid.toggle_row_expansion(&parent, Some(false)).unwrap();
    assert_eq!(keys(&grid), vec!["1", "2"]);

    // Already collapsed: no event.
    grid.toggle_row_expansion(&parent, Some(false)).unwrap();

    let events = events.lock().unwrap();
    assert_eq!(events.len(), 3);
    assert!(matches!(
        events[0],
        GridEvent::ExpandChange {
            state: ExpandState::Expanded(true),
            ..
        }
    ));
    assert!(matches!(
        events[2],
        GridEvent::ExpandChange {
            state: ExpandState::Expanded(false),
            ..
        }
    ));
}

#[test]
fn test_default_expand_all() {
    let grid = tree_grid(GridConfig::default().with_default_expand_all(true));
    assert_eq!(keys(&grid), vec!["1", "11", "12", "121", "2"]);
}

#[test]
fn test_configured_expand_row_keys() {
    let grid = tree_grid(GridConfig::default().with_expand_row_keys(["1"]));
    assert_eq!(keys(&grid), vec!["1", "11", "12", "2"]);
}

#[test]
fn test_set_expand_row_keys_is_exact() {
    let grid = tree_grid(GridConfig::default().with_default_expand_all(false));
    grid.toggle_row_expansion(&row(&grid, "1"), Some(true)).unwrap();

    grid.set_expand_row_keys(["12"]).unwrap();
    assert!(!grid.is_row_expanded(&row(&grid, "1")));
    assert!(grid.is_row_expanded(&row(&grid, "12")));
    assert_eq!(keys(&grid), vec!["1", "2"]);

    grid.set_expand_row_keys(["1", "12"]).unwrap();
    assert_eq!(keys(&grid), vec!["1", "11", "12", "121", "2"]);
}

#[test]
fn test_expansion_survives_data_replacement() {
    let grid = tree_grid(GridConfig::default());
    grid.toggle_row_expansion(&row(&grid, "1"), Some(true)).unwrap();

    grid.set_data(data()).unwrap();
    assert_eq!(keys(&grid), vec!["1", "11", "12", "2"]);
}

#[test]
fn test_sort_applies_to_top_level_rows() {
    let grid = tree_grid(GridConfig::default().with_default_expand_all(true));
    grid.sort("name", Some(datagrid_lib::column::SortOrder::Ascending))
        .unwrap();
    assert_eq!(keys(&grid), vec!["2", "1", "11", "12", "121"]);
}

#[test]
fn test_custom_tree_props() {
    let grid = Grid::new(
        GridConfig::default()
            .with_row_key("id")
            .with_tree_props("items", "leaf")
            .with_default_expand_all(true),
    );
    grid.set_data(vec![Row::new(json!({
        "id": 1,
        "items": [{ "id": 2 }],
    }))])
    .unwrap();
    assert_eq!(keys(&grid), vec!["1", "2"]);
}

#[test]
fn test_expand_column_switches_to_expandable_rows() {
    let grid = Grid::new(GridConfig::default().with_row_key("id"));
    grid.insert_column(Column::expand(), None).unwrap();
    grid.insert_column(Column::new("name", "Name"), None).unwrap();
    grid.set_data(vec![
        Row::new(json!({ "id": 1, "name": "a" })),
        Row::new(json!({ "id": 2, "name": "b" })),
    ])
    .unwrap();

    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    grid.on_event(move |event| sink.lock().unwrap().push(event.clone()));

    let first = grid.data()[0].clone();
    grid.toggle_row_expansion(&first, None).unwrap();
    assert!(grid.is_row_expanded(&first));
    assert!(grid.rows()[0].expanded);

    match &events.lock().unwrap()[0] {
        GridEvent::ExpandChange {
            state: ExpandState::Rows(rows),
            ..
        } => assert_eq!(rows.len(), 1),
        other => panic!("unexpected event {other:?}"),
    }

    // Identities carry over to new handles.
    grid.set_data(vec![
        Row::new(json!({ "id": 1, "name": "a" })),
        Row::new(json!({ "id": 2, "name": "b" })),
    ])
    .unwrap();
    assert!(grid.is_row_expanded(&grid.data()[0]));

    grid.set_expand_row_keys(["2"]).unwrap();
    assert!(!grid.is_row_expanded(&grid.data()[0]));
    assert!(grid.is_row_expanded(&grid.data()[1]));
}

#[test]
fn test_expanded_rows_survive_replacement_while_filtered_out() {
    let grid = Grid::new(GridConfig::default().with_row_key("id"));
    grid.insert_column(Column::expand(), None).unwrap();
    grid.insert_column(Column::new("name", "Name"), None).unwrap();
    let rows = || {
        vec![
            Row::new(json!({ "id": 1, "name": "a" })),
            Row::new(json!({ "id": 2, "name": "b" })),
        ]
    };
    grid.set_data(rows()).unwrap();
    grid.toggle_row_expansion(&grid.data()[0], Some(true)).unwrap();

    grid.filter_change("name", vec![json!("b")]).unwrap();
    assert_eq!(keys(&grid), vec!["2"]);
    grid.set_data(rows()).unwrap();
    grid.clear_filter(None).unwrap();

    assert_eq!(keys(&grid), vec!["1", "2"]);
    assert!(grid.is_row_expanded(&grid.data()[0]));
}

#[test]
fn test_set_expand_row_keys_requires_row_key() {
    let grid = Grid::new(GridConfig::default());
    assert!(matches!(
        grid.set_expand_row_keys(["1"]),
        Err(GridError::RowKeyRequired { .. })
    ));
}
