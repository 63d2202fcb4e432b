/// Drag-and-drop adapter.
///
/// Translates the result of a drag gesture on one board into a single
/// mutation. A container id equal to the board id names the board's
/// column list; a container id equal to a column id names that column's
/// task list.
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mutation::BoardError;
use crate::store::BoardStore;
use crate::types::Board;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragLocation {
    pub container_id: String,
    pub index: usize,
}

/// Result of a finished drag. `destination` is `None` when the gesture was
/// cancelled or dropped outside any container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DragGesture {
    pub source: DragLocation,
    #[serde(default)]
    pub destination: Option<DragLocation>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragOutcome {
    Cancelled,
    Unchanged,
    ColumnsReordered {
        from: usize,
        to: usize,
    },
    TasksReordered {
        column_id: String,
        from: usize,
        to: usize,
    },
    TaskMoved {
        task_id: Uuid,
        from_column: String,
        to_column: String,
        index: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Container {
    ColumnList,
    TaskList(String),
}

fn resolve(board: &Board, container_id: &str) -> Result<Container, BoardError> {
    if container_id == board.id.to_string() {
        return Ok(Container::ColumnList);
    }
    match board.column(container_id) {
        Some(column) => Ok(Container::TaskList(column.id.clone())),
        None => Err(BoardError::InvalidDrag(format!(
            "unknown container {} on board {}",
            container_id, board.id
        ))),
    }
}

fn task_at(board: &Board, column_id: &str, index: usize) -> Result<Uuid, BoardError> {
    let tasks = board.column(column_id).map(|c| c.tasks.as_slice()).unwrap_or_default();
    tasks
        .get(index)
        .map(|t| t.id)
        .ok_or(BoardError::IndexOutOfRange {
            index,
            len: tasks.len(),
        })
}

/// Position of the dragged item after the commit.
fn landed_at(store: &BoardStore, board_id: Uuid, find: impl Fn(&Board) -> Option<usize>) -> Option<usize> {
    store.board(board_id).and_then(find)
}

/// Apply a drag gesture on `board_id` to the store. Reported positions
/// are where the item ended up, after clamping.
pub fn apply_drag(store: &mut BoardStore, board_id: Uuid, gesture: &DragGesture) -> Result<DragOutcome, BoardError> {
    let Some(destination) = gesture.destination.as_ref() else {
        return Ok(DragOutcome::Cancelled);
    };
    let source = &gesture.source;

    let snapshot = store.snapshot();
    let board = snapshot.board(board_id).ok_or(BoardError::BoardNotFound(board_id))?;
    let from = resolve(board, &source.container_id)?;
    let to = resolve(board, &destination.container_id)?;

    if from == to && source.index == destination.index {
        return Ok(DragOutcome::Unchanged);
    }

    match (from, to) {
        (Container::ColumnList, Container::ColumnList) => {
            store.reorder_columns(board_id, source.index, destination.index)?;
            let column_id = board.columns.get(source.index).map(|c| c.id.as_str());
            let to = landed_at(store, board_id, |b| b.column_index(column_id?));
            if to == Some(source.index) {
                return Ok(DragOutcome::Unchanged);
            }
            Ok(DragOutcome::ColumnsReordered {
                from: source.index,
                to: to.unwrap_or(destination.index),
            })
        }
        (Container::TaskList(src), Container::TaskList(dst)) if src == dst => {
            store.reorder_tasks(board_id, &src, source.index, destination.index)?;
            let task_id = task_at(board, &src, source.index)?;
            let to = landed_at(store, board_id, |b| b.column(&src)?.task_index(task_id));
            if to == Some(source.index) {
                return Ok(DragOutcome::Unchanged);
            }
            Ok(DragOutcome::TasksReordered {
                from: source.index,
                to: to.unwrap_or(destination.index),
                column_id: src,
            })
        }
        (Container::TaskList(src), Container::TaskList(dst)) => {
            let task_id = task_at(board, &src, source.index)?;
            store.move_task_between_columns(board_id, &src, &dst, task_id, Some(destination.index))?;
            let index = landed_at(store, board_id, |b| b.column(&dst)?.task_index(task_id));
            Ok(DragOutcome::TaskMoved {
                task_id,
                from_column: src,
                to_column: dst,
                index: index.unwrap_or(destination.index),
            })
        }
        _ => Err(BoardError::InvalidDrag(
            "columns and tasks cannot be dropped into each other's lists".to_string(),
        )),
    }
}
