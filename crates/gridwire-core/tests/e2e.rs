//! End-to-end scenarios against the public grid surface

use gridwire_core::{
    GridDimensions, GridDirectory, GridError, ServerMessage, ValidationError,
};
use tokio::sync::mpsc;

fn directory() -> GridDirectory {
    GridDirectory::in_memory(GridDimensions::default())
}

#[tokio::test]
async fn e2e_corner_cells() {
    let grid = directory().open("global").unwrap();
    grid.set_cell(0, 0, "a").await.unwrap();
    grid.set_cell(19, 19, "b").await.unwrap();

    let matrix = grid.get_grid().await.unwrap();
    assert_eq!(matrix.len(), 20);
    for (y, row) in matrix.iter().enumerate() {
        assert_eq!(row.len(), 20);
        for (x, value) in row.iter().enumerate() {
            let expected = match (x, y) {
                (0, 0) => "a",
                (19, 19) => "b",
                _ => "",
            };
            assert_eq!(value, expected, "cell ({},{})", x, y);
        }
    }
}

#[tokio::test]
async fn e2e_subscriber_sees_snapshot_then_delta() {
    let grid = directory().open("global").unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    grid.subscribe(tx).await.unwrap();
    grid.set_cell(5, 5, "x").await.unwrap();

    let first = ServerMessage::from_frame(&rx.recv().await.unwrap()).unwrap();
    assert!(matches!(first, ServerMessage::Snapshot { .. }));

    let second = ServerMessage::from_frame(&rx.recv().await.unwrap()).unwrap();
    assert_eq!(
        second,
        ServerMessage::Cell {
            x: 5,
            y: 5,
            value: "x".to_string()
        }
    );
}

#[tokio::test]
async fn e2e_out_of_range_write_leaves_grid_unchanged() {
    let grid = directory().open("global").unwrap();
    grid.set_cell(1, 1, "keep").await.unwrap();
    let before = grid.get_grid().await.unwrap();

    let err = grid.set_cell(20, 0, "x").await.unwrap_err();
    assert!(matches!(
        err,
        GridError::Validation(ValidationError::OutOfBounds { .. })
    ));
    assert_eq!(grid.get_grid().await.unwrap(), before);
}

#[tokio::test]
async fn e2e_clear_resets_everything() {
    let grid = directory().open("global").unwrap();
    for i in 0..5 {
        grid.set_cell(i, 0, "v").await.unwrap();
    }
    grid.clear().await.unwrap();

    let matrix = grid.get_grid().await.unwrap();
    assert!(matrix.iter().flatten().all(|v| v.is_empty()));
    for i in 0..5 {
        assert_eq!(grid.get_cell(i, 0).await.unwrap(), None);
    }
}

#[tokio::test]
async fn e2e_custom_dimensions() {
    let dims = GridDimensions::new(4, 2).unwrap();
    let grid = GridDirectory::in_memory(dims).open("small").unwrap();

    grid.set_cell(3, 1, "edge").await.unwrap();
    assert!(grid.set_cell(0, 2, "below").await.is_err());

    let matrix = grid.get_grid().await.unwrap();
    assert_eq!(matrix.len(), 2);
    assert_eq!(matrix[0].len(), 4);
    assert_eq!(matrix[1][3], "edge");
}
