/// Board mutations as pure snapshot transitions.
///
/// Every function takes the current snapshot and returns a new one. The
/// input is never modified: the work happens on a shallow copy whose
/// touched boards and columns are copied on write via `Arc::make_mut`, so
/// any error simply drops the copy and leaves the caller's state intact.
use std::sync::Arc;
use uuid::Uuid;

use crate::types::{Board, BoardsState, Column, Task};

/// Coarse classification of a [`BoardError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BoardError {
    #[error("{0} name must not be empty")]
    EmptyName(&'static str),

    #[error("Board not found: {0}")]
    BoardNotFound(Uuid),

    #[error("Column not found: {column_id} (board {board_id})")]
    ColumnNotFound { board_id: Uuid, column_id: String },

    #[error("Task not found: {task_id} (column {column_id})")]
    TaskNotFound { column_id: String, task_id: Uuid },

    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid drag: {0}")]
    InvalidDrag(String),
}

impl BoardError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BoardError::EmptyName(_) | BoardError::InvalidDrag(_) => ErrorKind::Validation,
            BoardError::BoardNotFound(_)
            | BoardError::ColumnNotFound { .. }
            | BoardError::TaskNotFound { .. } => ErrorKind::NotFound,
            BoardError::IndexOutOfRange { .. } => ErrorKind::Range,
        }
    }
}

fn validated_name(kind: &'static str, name: &str) -> Result<String, BoardError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(BoardError::EmptyName(kind));
    }
    Ok(trimmed.to_string())
}

fn board_mut(state: &mut BoardsState, board_id: Uuid) -> Result<&mut Board, BoardError> {
    state
        .boards
        .iter_mut()
        .find(|b| b.id == board_id)
        .map(Arc::make_mut)
        .ok_or(BoardError::BoardNotFound(board_id))
}

fn column_mut<'a>(board: &'a mut Board, column_id: &str) -> Result<&'a mut Column, BoardError> {
    let board_id = board.id;
    board
        .columns
        .iter_mut()
        .find(|c| c.id == column_id)
        .map(Arc::make_mut)
        .ok_or_else(|| BoardError::ColumnNotFound {
            board_id,
            column_id: column_id.to_string(),
        })
}

fn task_mut<'a>(column: &'a mut Column, task_id: Uuid) -> Result<&'a mut Task, BoardError> {
    let column_id = column.id.clone();
    column
        .tasks
        .iter_mut()
        .find(|t| t.id == task_id)
        .ok_or(BoardError::TaskNotFound { column_id, task_id })
}

/// Move `items[from]` to position `to`. `from` must be in range, `to` is
/// clamped to the last position.
fn move_within<T>(items: &mut Vec<T>, from: usize, to: usize) -> Result<(), BoardError> {
    if from >= items.len() {
        return Err(BoardError::IndexOutOfRange {
            index: from,
            len: items.len(),
        });
    }
    let to = to.min(items.len() - 1);
    if from != to {
        let item = items.remove(from);
        items.insert(to, item);
    }
    Ok(())
}

// ===== Boards =====

pub fn create_board(state: &BoardsState, name: &str) -> Result<(BoardsState, Uuid), BoardError> {
    let name = validated_name("Board", name)?;
    let board = Board::new(name);
    let id = board.id;
    let mut next = state.clone();
    next.boards.push(Arc::new(board));
    next.active_board_id = Some(id);
    Ok((next, id))
}

/// Remove a board together with its columns and tasks. If it was the
/// active board, the first remaining board becomes active.
pub fn delete_board(state: &BoardsState, board_id: Uuid) -> Result<BoardsState, BoardError> {
    let index = state
        .boards
        .iter()
        .position(|b| b.id == board_id)
        .ok_or(BoardError::BoardNotFound(board_id))?;
    let mut next = state.clone();
    next.boards.remove(index);
    if next.active_board_id == Some(board_id) {
        next.active_board_id = next.boards.first().map(|b| b.id);
    }
    Ok(next)
}

pub fn rename_board(state: &BoardsState, board_id: Uuid, name: &str) -> Result<BoardsState, BoardError> {
    let name = validated_name("Board", name)?;
    let mut next = state.clone();
    board_mut(&mut next, board_id)?.name = name;
    Ok(next)
}

pub fn set_active_board(state: &BoardsState, board_id: Uuid) -> Result<BoardsState, BoardError> {
    if state.board(board_id).is_none() {
        return Err(BoardError::BoardNotFound(board_id));
    }
    let mut next = state.clone();
    next.active_board_id = Some(board_id);
    Ok(next)
}

// ===== Columns =====

pub fn add_column(state: &BoardsState, board_id: Uuid, name: &str) -> Result<(BoardsState, String), BoardError> {
    let name = validated_name("Column", name)?;
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    let mut column = Column::new(name);
    while board.column_index(&column.id).is_some() {
        column.id = crate::types::generate_column_id();
    }
    let id = column.id.clone();
    board.columns.push(Arc::new(column));
    Ok((next, id))
}

pub fn rename_column(
    state: &BoardsState,
    board_id: Uuid,
    column_id: &str,
    name: &str,
) -> Result<BoardsState, BoardError> {
    let name = validated_name("Column", name)?;
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    column_mut(board, column_id)?.name = name;
    Ok(next)
}

pub fn delete_column(state: &BoardsState, board_id: Uuid, column_id: &str) -> Result<BoardsState, BoardError> {
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    let index = board
        .column_index(column_id)
        .ok_or_else(|| BoardError::ColumnNotFound {
            board_id,
            column_id: column_id.to_string(),
        })?;
    board.columns.remove(index);
    Ok(next)
}

pub fn reorder_columns(
    state: &BoardsState,
    board_id: Uuid,
    from_index: usize,
    to_index: usize,
) -> Result<BoardsState, BoardError> {
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    move_within(&mut board.columns, from_index, to_index)?;
    Ok(next)
}

// ===== Tasks =====

pub fn add_task(
    state: &BoardsState,
    board_id: Uuid,
    column_id: &str,
    name: &str,
) -> Result<(BoardsState, Uuid), BoardError> {
    let name = validated_name("Task", name)?;
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    let task = Task::new(name);
    let id = task.id;
    column_mut(board, column_id)?.tasks.push(task);
    Ok((next, id))
}

pub fn rename_task(
    state: &BoardsState,
    board_id: Uuid,
    column_id: &str,
    task_id: Uuid,
    name: &str,
) -> Result<BoardsState, BoardError> {
    let name = validated_name("Task", name)?;
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    task_mut(column_mut(board, column_id)?, task_id)?.name = name;
    Ok(next)
}

pub fn delete_task(
    state: &BoardsState,
    board_id: Uuid,
    column_id: &str,
    task_id: Uuid,
) -> Result<BoardsState, BoardError> {
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    let column = column_mut(board, column_id)?;
    let index = column.task_index(task_id).ok_or_else(|| BoardError::TaskNotFound {
        column_id: column_id.to_string(),
        task_id,
    })?;
    column.tasks.remove(index);
    Ok(next)
}

/// Flip a task's completion flag. Returns the new flag alongside the state.
pub fn toggle_complete_task(
    state: &BoardsState,
    board_id: Uuid,
    column_id: &str,
    task_id: Uuid,
) -> Result<(BoardsState, bool), BoardError> {
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    let task = task_mut(column_mut(board, column_id)?, task_id)?;
    task.completed = !task.completed;
    let completed = task.completed;
    Ok((next, completed))
}

pub fn reorder_tasks(
    state: &BoardsState,
    board_id: Uuid,
    column_id: &str,
    from_index: usize,
    to_index: usize,
) -> Result<BoardsState, BoardError> {
    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    let column = column_mut(board, column_id)?;
    move_within(&mut column.tasks, from_index, to_index)?;
    Ok(next)
}

/// Move a task from one column to another in a single transition.
///
/// `dest_index` is clamped to `[0, len]` of the destination and defaults
/// to the end. When source and destination are the same column this is a
/// reorder within that column.
pub fn move_task_between_columns(
    state: &BoardsState,
    board_id: Uuid,
    source_column_id: &str,
    dest_column_id: &str,
    task_id: Uuid,
    dest_index: Option<usize>,
) -> Result<BoardsState, BoardError> {
    let board = state.board(board_id).ok_or(BoardError::BoardNotFound(board_id))?;
    let source = board
        .column(source_column_id)
        .ok_or_else(|| BoardError::ColumnNotFound {
            board_id,
            column_id: source_column_id.to_string(),
        })?;
    let from = source.task_index(task_id).ok_or_else(|| BoardError::TaskNotFound {
        column_id: source_column_id.to_string(),
        task_id,
    })?;

    if source_column_id == dest_column_id {
        let to = dest_index.unwrap_or(usize::MAX);
        return reorder_tasks(state, board_id, source_column_id, from, to);
    }

    if board.column(dest_column_id).is_none() {
        return Err(BoardError::ColumnNotFound {
            board_id,
            column_id: dest_column_id.to_string(),
        });
    }

    let mut next = state.clone();
    let board = board_mut(&mut next, board_id)?;
    let task = column_mut(board, source_column_id)?.tasks.remove(from);
    let dest = column_mut(board, dest_column_id)?;
    let at = dest_index.unwrap_or(dest.tasks.len()).min(dest.tasks.len());
    dest.tasks.insert(at, task);
    Ok(next)
}
