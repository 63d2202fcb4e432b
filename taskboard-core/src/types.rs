use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    /// Older caches stored the task text under `content`.
    #[serde(alias = "content")]
    pub name: String,
    #[serde(default)]
    pub completed: bool,
}

impl Task {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            completed: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: generate_column_id(),
            name: name.into(),
            tasks: Vec::new(),
        }
    }

    pub fn task_index(&self, task_id: Uuid) -> Option<usize> {
        self.tasks.iter().position(|t| t.id == task_id)
    }
}

/// A board owns its columns. Columns are reference-counted so that
/// snapshots share every column a mutation did not touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub columns: Vec<Arc<Column>>,
}

impl Board {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            columns: Vec::new(),
        }
    }

    pub fn column(&self, column_id: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.id == column_id).map(|c| c.as_ref())
    }

    pub fn column_index(&self, column_id: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.id == column_id)
    }

    /// Find the column currently holding a task.
    pub fn column_of_task(&self, task_id: Uuid) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.task_index(task_id).is_some())
            .map(|c| c.as_ref())
    }

    pub fn task_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }
}

/// Application state snapshot: every board plus the active selection.
///
/// This is also the wire shape exchanged with the remote service and the
/// local cache: `{ "boards": [...], "activeBoardId": "..." }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardsState {
    #[serde(default)]
    pub boards: Vec<Arc<Board>>,
    #[serde(default)]
    pub active_board_id: Option<Uuid>,
}

impl BoardsState {
    pub fn board(&self, board_id: Uuid) -> Option<&Board> {
        self.boards
            .iter()
            .find(|b| b.id == board_id)
            .map(|b| b.as_ref())
    }

    pub fn active_board(&self) -> Option<&Board> {
        self.active_board_id.and_then(|id| self.board(id))
    }

    /// Repair a snapshot that came from outside the store (remote payload
    /// or cache file) so that it satisfies the ownership invariants.
    /// Returns the number of repairs made.
    pub fn normalize(&mut self) -> usize {
        let mut repairs = 0;
        let mut board_ids = HashSet::new();
        let mut task_ids = HashSet::new();

        let before = self.boards.len();
        self.boards.retain(|b| board_ids.insert(b.id));
        if self.boards.len() != before {
            log::warn!(
                target: "taskboard.types",
                "Dropped {} board(s) with duplicate ids",
                before - self.boards.len()
            );
            repairs += before - self.boards.len();
        }

        for slot in self.boards.iter_mut() {
            if board_is_clean(slot, &task_ids) {
                task_ids.extend(slot.columns.iter().flat_map(|c| c.tasks.iter()).map(|t| t.id));
                continue;
            }

            // Copy only this board and the columns that need repair,
            // keeping first occurrences.
            let board = Arc::make_mut(slot);
            let mut column_ids = HashSet::new();
            let columns_before = board.columns.len();
            board.columns.retain(|c| column_ids.insert(c.id.clone()));
            repairs += columns_before - board.columns.len();

            for column in board.columns.iter_mut() {
                let mut local = HashSet::new();
                let needs_repair = column
                    .tasks
                    .iter()
                    .any(|t| task_ids.contains(&t.id) || !local.insert(t.id));
                if !needs_repair {
                    task_ids.extend(local);
                    continue;
                }
                let column = Arc::make_mut(column);
                let tasks_before = column.tasks.len();
                column.tasks.retain(|t| task_ids.insert(t.id));
                repairs += tasks_before - column.tasks.len();
            }
            log::warn!(
                target: "taskboard.types",
                "Removed duplicate columns/tasks from board {}",
                board.id
            );
        }

        let dangling = self
            .active_board_id
            .is_some_and(|id| !self.boards.iter().any(|b| b.id == id));
        if dangling || (self.active_board_id.is_none() && !self.boards.is_empty()) {
            let replacement = self.boards.first().map(|b| b.id);
            if dangling {
                log::warn!(
                    target: "taskboard.types",
                    "Active board {:?} does not exist, switching to {:?}",
                    self.active_board_id,
                    replacement
                );
                repairs += 1;
            }
            self.active_board_id = replacement;
        }

        repairs
    }

    pub fn summaries(&self) -> Vec<BoardSummary> {
        self.boards
            .iter()
            .map(|board| BoardSummary {
                id: board.id,
                name: board.name.clone(),
                active: self.active_board_id == Some(board.id),
                columns: board
                    .columns
                    .iter()
                    .enumerate()
                    .map(|(index, col)| ColumnSummary {
                        index,
                        id: col.id.clone(),
                        name: col.name.clone(),
                        task_count: col.tasks.len(),
                        completed_count: col.tasks.iter().filter(|t| t.completed).count(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Summary info for a board in list output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoardSummary {
    pub id: Uuid,
    pub name: String,
    pub active: bool,
    pub columns: Vec<ColumnSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnSummary {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub task_count: usize,
    pub completed_count: usize,
}

fn board_is_clean(board: &Board, seen_tasks: &HashSet<Uuid>) -> bool {
    let mut column_ids = HashSet::new();
    let mut task_ids = HashSet::new();
    board.columns.iter().all(|c| column_ids.insert(c.id.as_str()))
        && board
            .columns
            .iter()
            .flat_map(|c| c.tasks.iter())
            .all(|t| !seen_tasks.contains(&t.id) && task_ids.insert(t.id))
}

static COLUMN_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a column id: `col-<unix millis>-<seq>`.
/// The counter keeps ids distinct within the process even when several
/// columns are created in the same millisecond.
pub fn generate_column_id() -> String {
    let seq = COLUMN_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("col-{}-{}", chrono::Utc::now().timestamp_millis(), seq)
}
