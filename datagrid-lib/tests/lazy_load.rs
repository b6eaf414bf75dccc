use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use datagrid_lib::column::Column;
use datagrid_lib::error::LoadError;
use datagrid_lib::model::Row;
use datagrid_lib::tree::{StaticLoader, loader_fn};
use datagrid_lib::{Grid, GridConfig, GridError, TreeToggle};
use serde_json::json;
use tokio::sync::Notify;

fn lazy_grid() -> Grid {
    let grid = Grid::new(GridConfig::default().with_row_key("id"));
    grid.insert_column(Column::selection(), None).unwrap();
    grid.insert_column(Column::new("name", "Name"), None).unwrap();
    grid.set_data(data()).unwrap();
    grid
}

fn data() -> Vec<Row> {
    vec![
        Row::new(json!({ "id": 1, "name": "parent", "hasChildren": true })),
        Row::new(json!({ "id": 2, "name": "other" })),
    ]
}

fn keys(grid: &Grid) -> Vec<String> {
    grid.visible_rows()
        .into_iter()
        .filter_map(|flat| flat.key)
        .collect()
}

/// A loader that waits for `gate` before answering.
fn gated(gate: Arc<Notify>) -> datagrid_lib::tree::FnLoader {
    loader_fn(move |_row, key, _all| {
        let gate = gate.clone();
        async move {
            gate.notified().await;
            Ok(json!([{ "id": format!("{key}-a") }, { "id": format!("{key}-b") }]))
        }
    })
}

#[tokio::test]
async fn test_load_children_on_first_expand() {
    let grid = lazy_grid();
    grid.set_loader(StaticLoader::new().with_children("1", json!([{ "id": 11 }, { "id": 12 }])));

    let parent = grid.data()[0].clone();
    assert!(grid.rows()[0].has_children);
    assert!(grid.rows()[0].lazy);

    let outcome = grid.load_or_toggle(&parent).await.unwrap();
    assert_eq!(outcome, TreeToggle::Loaded);

    let node = grid.tree_node("1").unwrap();
    assert!(node.loaded);
    assert!(!node.loading);
    assert!(node.expanded);
    assert_eq!(keys(&grid), vec!["1", "11", "12", "2"]);

    // Loaded nodes toggle without calling the loader again.
    assert_eq!(
        grid.load_or_toggle(&parent).await.unwrap(),
        TreeToggle::Toggled(false)
    );
    assert_eq!(keys(&grid), vec!["1", "2"]);
}

#[tokio::test]
async fn test_loader_called_once() {
    let grid = lazy_grid();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    grid.set_loader(loader_fn(move |_row, _key, _all| {
        counter.fetch_add(1, Ordering::SeqCst);
        async { Ok(json!([{ "id": 11 }])) }
    }));

    let parent = grid.data()[0].clone();
    grid.load_or_toggle(&parent).await.unwrap();
    grid.load_or_toggle(&parent).await.unwrap();
    grid.load_or_toggle(&parent).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_leaf_rows() {
    let grid = lazy_grid();
    let other = grid.data()[1].clone();
    assert_eq!(grid.load_or_toggle(&other).await.unwrap(), TreeToggle::Leaf);
}

#[tokio::test]
async fn test_missing_loader_is_a_configuration_error() {
    let grid = lazy_grid();
    let parent = grid.data()[0].clone();
    let err = grid.load_or_toggle(&parent).await.unwrap_err();
    assert!(matches!(err, GridError::LoaderRequired { .. }));
    assert!(!grid.tree_node("1").unwrap().loading);
}

#[tokio::test]
async fn test_lazy_loading_requires_row_key() {
    let grid = Grid::new(GridConfig::default());
    grid.set_data(vec![Row::new(json!({ "id": 1 }))]).unwrap();
    let row = grid.data()[0].clone();
    assert!(matches!(
        grid.load_or_toggle(&row).await,
        Err(GridError::RowKeyRequired { .. })
    ));
}

#[tokio::test]
async fn test_rejection_leaves_node_unloaded() {
    let grid = lazy_grid();
    grid.set_loader(loader_fn(|_row, _key, _all| async {
        Err(LoadError::new("backend unavailable"))
    }));

    let parent = grid.data()[0].clone();
    let err = grid.load_or_toggle(&parent).await.unwrap_err();
    match err {
        GridError::Load { key, source } => {
            assert_eq!(key, "1");
            assert_eq!(source.to_string(), "backend unavailable");
        }
        other => panic!("unexpected error {other:?}"),
    }

    let node = grid.tree_node("1").unwrap();
    assert!(!node.loading);
    assert!(!node.loaded);
    assert_eq!(keys(&grid), vec!["1", "2"]);
}

#[tokio::test]
async fn test_non_array_result_violates_contract() {
    let grid = lazy_grid();
    grid.set_loader(loader_fn(|_row, _key, _all| async { Ok(json!({ "id": 11 })) }));

    let parent = grid.data()[0].clone();
    let err = grid.load_or_toggle(&parent).await.unwrap_err();
    assert!(matches!(
        err,
        GridError::LoaderContract { found: "object", .. }
    ));
    assert!(!grid.tree_node("1").unwrap().loading);
}

#[tokio::test]
async fn test_reentry_while_loading() {
    let grid = lazy_grid();
    let gate = Arc::new(Notify::new());
    grid.set_loader(gated(gate.clone()));
    let parent = grid.data()[0].clone();

    let first = grid.load_or_toggle(&parent);
    let second = async {
        assert!(grid.tree_node("1").unwrap().loading);
        assert!(grid.rows()[0].loading);
        let outcome = grid.load_or_toggle(&parent).await.unwrap();
        gate.notify_one();
        outcome
    };
    let (first, second) = tokio::join!(first, second);

    assert_eq!(first.unwrap(), TreeToggle::Loaded);
    assert_eq!(second, TreeToggle::AlreadyLoading);
    assert_eq!(keys(&grid), vec!["1", "1-a", "1-b", "2"]);
}

#[tokio::test]
async fn test_result_discarded_after_data_replacement() {
    let grid = lazy_grid();
    let gate = Arc::new(Notify::new());
    grid.set_loader(gated(gate.clone()));
    let parent = grid.data()[0].clone();

    let load = grid.load_or_toggle(&parent);
    let replace = async {
        grid.set_data(data()).unwrap();
        gate.notify_one();
    };
    let (outcome, ()) = tokio::join!(load, replace);
    assert_eq!(outcome.unwrap(), TreeToggle::Discarded);

    let node = grid.tree_node("1").unwrap();
    assert!(!node.loading);
    assert!(!node.loaded);
    assert_eq!(keys(&grid), vec!["1", "2"]);
}

#[tokio::test]
async fn test_rejection_surfaces_after_data_replacement() {
    let grid = lazy_grid();
    let gate = Arc::new(Notify::new());
    let wait = gate.clone();
    grid.set_loader(loader_fn(move |_row, _key, _all| {
        let wait = wait.clone();
        async move {
            wait.notified().await;
            Err(LoadError::new("timed out"))
        }
    }));
    let parent = grid.data()[0].clone();

    let load = grid.load_or_toggle(&parent);
    let replace = async {
        grid.set_data(data()).unwrap();
        gate.notify_one();
    };
    let (outcome, ()) = tokio::join!(load, replace);
    assert!(matches!(outcome, Err(GridError::Load { ref key, .. }) if key == "1"));

    let node = grid.tree_node("1").unwrap();
    assert!(!node.loading);
    assert!(!node.loaded);
}

#[tokio::test]
async fn test_cancelled_load_can_be_retried() {
    let grid = lazy_grid();
    grid.set_loader(gated(Arc::new(Notify::new())));
    let parent = grid.data()[0].clone();

    let cancelled = tokio::time::timeout(Duration::from_millis(10), grid.load_or_toggle(&parent)).await;
    assert!(cancelled.is_err());

    let node = grid.tree_node("1").unwrap();
    assert!(!node.loading);
    assert!(!node.loaded);

    grid.set_loader(StaticLoader::new().with_children("1", json!([{ "id": 11 }])));
    assert_eq!(grid.load_or_toggle(&parent).await.unwrap(), TreeToggle::Loaded);
    assert_eq!(keys(&grid), vec!["1", "11", "2"]);
}

#[tokio::test]
async fn test_result_discarded_when_row_disappears() {
    let grid = lazy_grid();
    let gate = Arc::new(Notify::new());
    grid.set_loader(gated(gate.clone()));
    let parent = grid.data()[0].clone();

    let load = grid.load_or_toggle(&parent);
    let replace = async {
        grid.set_data(vec![Row::new(json!({ "id": 2 }))]).unwrap();
        gate.notify_one();
    };
    let (outcome, ()) = tokio::join!(load, replace);
    assert_eq!(outcome.unwrap(), TreeToggle::Discarded);
    assert!(grid.tree_node("1").is_none());
}

#[tokio::test]
async fn test_loaded_children_of_selected_parent_are_selected() {
    let grid = lazy_grid();
    grid.set_loader(StaticLoader::new().with_children("1", json!([{ "id": 11 }, { "id": 12 }])));
    let parent = grid.data()[0].clone();

    grid.toggle_row_selection(&parent, Some(true), false);
    grid.load_or_toggle(&parent).await.unwrap();

    assert_eq!(grid.selection().len(), 3);
    assert!(grid.check_state(&parent).checked);
}

#[tokio::test]
async fn test_loaded_children_survive_data_replacement() {
    let grid = lazy_grid();
    grid.set_loader(StaticLoader::new().with_children("1", json!([{ "id": 11 }])));
    let parent = grid.data()[0].clone();
    grid.load_or_toggle(&parent).await.unwrap();

    grid.set_data(data()).unwrap();
    assert!(grid.tree_node("1").unwrap().loaded);
    assert_eq!(keys(&grid), vec!["1", "11", "2"]);
}

#[tokio::test]
async fn test_unloaded_child_keeps_parent_unchecked() {
    let grid = Grid::new(GridConfig::default().with_row_key("id"));
    grid.insert_column(Column::selection(), None).unwrap();
    grid.set_data(vec![Row::new(json!({
        "id": 1,
        "children": [{ "id": 11, "hasChildren": true }, { "id": 12 }],
    }))])
    .unwrap();
    grid.set_loader(StaticLoader::new().with_children("11", json!([{ "id": 111 }])));
    let find = |id: i64| {
        grid.rows()
            .into_iter()
            .find(|flat| flat.row.get("id") == Some(&json!(id)))
            .map(|flat| flat.row)
            .unwrap()
    };

    grid.toggle_row_selection(&find(11), Some(true), false);
    grid.toggle_row_selection(&find(12), Some(true), false);
    let parent = grid.check_state(&find(1));
    assert!(!parent.checked);
    assert!(parent.indeterminate);
    assert!(!grid.is_selected(&find(1)));

    // Once the lazy child loads under its selection, the parent completes.
    grid.load_or_toggle(&find(11)).await.unwrap();
    assert!(grid.is_selected(&find(111)));
    assert!(grid.check_state(&find(11)).checked);
    assert!(grid.check_state(&find(1)).checked);
    assert!(grid.is_selected(&find(1)));
}
