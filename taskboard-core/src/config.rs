/// Shared configuration types used by the core and the sync client.
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::types::{Board, BoardsState, Column, Task};

/// Key under which the whole board state is cached locally.
pub const DEFAULT_CACHE_KEY: &str = "kanban_boards";

/// Names used for the board seeded on a first run with no remote and no cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedBoard {
    #[serde(default = "default_board_name")]
    pub board_name: String,
    #[serde(default = "default_column_name")]
    pub column_name: String,
    #[serde(default = "default_task_name")]
    pub task_name: String,
}

fn default_board_name() -> String {
    "My First Board".to_string()
}

fn default_column_name() -> String {
    "To Do".to_string()
}

fn default_task_name() -> String {
    "My first task".to_string()
}

impl Default for SeedBoard {
    fn default() -> Self {
        Self {
            board_name: default_board_name(),
            column_name: default_column_name(),
            task_name: default_task_name(),
        }
    }
}

impl SeedBoard {
    /// Build a fresh state with one board, one column and one task.
    pub fn build(&self) -> BoardsState {
        let mut column = Column::new(self.column_name.clone());
        column.tasks.push(Task::new(self.task_name.clone()));
        let mut board = Board::new(self.board_name.clone());
        board.columns.push(Arc::new(column));
        BoardsState {
            active_board_id: Some(board.id),
            boards: vec![Arc::new(board)],
        }
    }
}
