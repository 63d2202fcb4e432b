/// The entity store: owner of the current board snapshot.
///
/// Reads hand out shared, immutable snapshots. The only way to change the
/// state is through the mutation methods below, each of which runs one
/// transition from [`crate::mutation`] and commits the result.
use std::sync::Arc;
use uuid::Uuid;

use crate::mutation::{self, BoardError};
use crate::types::{Board, BoardsState};

/// Notified synchronously after every committed mutation.
pub trait SnapshotObserver: Send + Sync {
    fn snapshot_committed(&self, revision: u64, snapshot: &Arc<BoardsState>);
}

pub struct BoardStore {
    current: Arc<BoardsState>,
    revision: u64,
    observers: Vec<Arc<dyn SnapshotObserver>>,
}

impl Default for BoardStore {
    fn default() -> Self {
        Self::new(BoardsState::default())
    }
}

impl std::fmt::Debug for BoardStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoardStore")
            .field("revision", &self.revision)
            .field("boards", &self.current.boards.len())
            .field("active_board_id", &self.current.active_board_id)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl BoardStore {
    /// Seed a store. The snapshot is normalized first so the store never
    /// starts out violating its invariants.
    pub fn new(mut initial: BoardsState) -> Self {
        initial.normalize();
        Self {
            current: Arc::new(initial),
            revision: 0,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: Arc<dyn SnapshotObserver>) {
        self.observers.push(observer);
    }

    pub fn snapshot(&self) -> Arc<BoardsState> {
        Arc::clone(&self.current)
    }

    pub fn boards(&self) -> &[Arc<Board>] {
        &self.current.boards
    }

    pub fn board(&self, board_id: Uuid) -> Option<&Board> {
        self.current.board(board_id)
    }

    pub fn active_board_id(&self) -> Option<Uuid> {
        self.current.active_board_id
    }

    pub fn active_board(&self) -> Option<&Board> {
        self.current.active_board()
    }

    /// Number of commits since the store was seeded.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Replace the snapshot. A value-equal snapshot is not a change and is
    /// neither committed nor announced. Returns whether a commit happened.
    pub(crate) fn replace(&mut self, next: BoardsState) -> bool {
        if next == *self.current {
            return false;
        }
        self.current = Arc::new(next);
        self.revision += 1;
        log::debug!(
            target: "taskboard.store",
            "Committed revision {} ({} boards)",
            self.revision,
            self.current.boards.len()
        );
        for observer in &self.observers {
            observer.snapshot_committed(self.revision, &self.current);
        }
        true
    }

    // ===== Boards =====

    pub fn create_board(&mut self, name: &str) -> Result<Uuid, BoardError> {
        let (next, id) = mutation::create_board(&self.current, name)?;
        self.replace(next);
        Ok(id)
    }

    pub fn delete_board(&mut self, board_id: Uuid) -> Result<(), BoardError> {
        let next = mutation::delete_board(&self.current, board_id)?;
        self.replace(next);
        Ok(())
    }

    pub fn rename_board(&mut self, board_id: Uuid, name: &str) -> Result<(), BoardError> {
        let next = mutation::rename_board(&self.current, board_id, name)?;
        self.replace(next);
        Ok(())
    }

    pub fn set_active_board(&mut self, board_id: Uuid) -> Result<(), BoardError> {
        let next = mutation::set_active_board(&self.current, board_id)?;
        self.replace(next);
        Ok(())
    }

    // ===== Columns =====

    pub fn add_column(&mut self, board_id: Uuid, name: &str) -> Result<String, BoardError> {
        let (next, id) = mutation::add_column(&self.current, board_id, name)?;
        self.replace(next);
        Ok(id)
    }

    pub fn rename_column(&mut self, board_id: Uuid, column_id: &str, name: &str) -> Result<(), BoardError> {
        let next = mutation::rename_column(&self.current, board_id, column_id, name)?;
        self.replace(next);
        Ok(())
    }

    pub fn delete_column(&mut self, board_id: Uuid, column_id: &str) -> Result<(), BoardError> {
        let next = mutation::delete_column(&self.current, board_id, column_id)?;
        self.replace(next);
        Ok(())
    }

    pub fn reorder_columns(&mut self, board_id: Uuid, from_index: usize, to_index: usize) -> Result<(), BoardError> {
        let next = mutation::reorder_columns(&self.current, board_id, from_index, to_index)?;
        self.replace(next);
        Ok(())
    }

    // ===== Tasks =====

    pub fn add_task(&mut self, board_id: Uuid, column_id: &str, name: &str) -> Result<Uuid, BoardError> {
        let (next, id) = mutation::add_task(&self.current, board_id, column_id, name)?;
        self.replace(next);
        Ok(id)
    }

    pub fn rename_task(
        &mut self,
        board_id: Uuid,
        column_id: &str,
        task_id: Uuid,
        name: &str,
    ) -> Result<(), BoardError> {
        let next = mutation::rename_task(&self.current, board_id, column_id, task_id, name)?;
        self.replace(next);
        Ok(())
    }

    pub fn delete_task(&mut self, board_id: Uuid, column_id: &str, task_id: Uuid) -> Result<(), BoardError> {
        let next = mutation::delete_task(&self.current, board_id, column_id, task_id)?;
        self.replace(next);
        Ok(())
    }

    pub fn toggle_complete_task(&mut self, board_id: Uuid, column_id: &str, task_id: Uuid) -> Result<bool, BoardError> {
        let (next, completed) = mutation::toggle_complete_task(&self.current, board_id, column_id, task_id)?;
        self.replace(next);
        Ok(completed)
    }

    pub fn reorder_tasks(
        &mut self,
        board_id: Uuid,
        column_id: &str,
        from_index: usize,
        to_index: usize,
    ) -> Result<(), BoardError> {
        let next = mutation::reorder_tasks(&self.current, board_id, column_id, from_index, to_index)?;
        self.replace(next);
        Ok(())
    }

    pub fn move_task_between_columns(
        &mut self,
        board_id: Uuid,
        source_column_id: &str,
        dest_column_id: &str,
        task_id: Uuid,
        dest_index: Option<usize>,
    ) -> Result<(), BoardError> {
        let next = mutation::move_task_between_columns(
            &self.current,
            board_id,
            source_column_id,
            dest_column_id,
            task_id,
            dest_index,
        )?;
        self.replace(next);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(u64, Arc<BoardsState>)>>,
    }

    impl SnapshotObserver for Recorder {
        fn snapshot_committed(&self, revision: u64, snapshot: &Arc<BoardsState>) {
            self.seen.lock().unwrap().push((revision, Arc::clone(snapshot)));
        }
    }

    #[test]
    fn test_mutations_notify_observers() {
        let recorder = Arc::new(Recorder::default());
        let mut store = BoardStore::default();
        store.subscribe(recorder.clone());

        let board_id = store.create_board("Sprint 1").unwrap();
        let column_id = store.add_column(board_id, "To Do").unwrap();
        store.add_task(board_id, &column_id, "Write docs").unwrap();

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen.iter().map(|(r, _)| *r).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert!(Arc::ptr_eq(&seen[2].1, &store.snapshot()));
        assert_eq!(store.revision(), 3);
    }

    #[test]
    fn test_failed_mutation_does_not_commit() {
        let recorder = Arc::new(Recorder::default());
        let mut store = BoardStore::default();
        let board_id = store.create_board("Sprint 1").unwrap();
        store.subscribe(recorder.clone());
        let before = store.snapshot();

        assert!(store.create_board("").is_err());
        assert!(store.add_column(Uuid::new_v4(), "To Do").is_err());
        assert!(store.reorder_columns(board_id, 5, 0).is_err());

        assert!(Arc::ptr_eq(&before, &store.snapshot()));
        assert!(recorder.seen.lock().unwrap().is_empty());
        assert_eq!(store.revision(), 1);
    }

    #[test]
    fn test_noop_mutation_does_not_commit() {
        let recorder = Arc::new(Recorder::default());
        let mut store = BoardStore::default();
        let board_id = store.create_board("Sprint 1").unwrap();
        let column_id = store.add_column(board_id, "To Do").unwrap();
        store.add_task(board_id, &column_id, "a").unwrap();
        store.subscribe(recorder.clone());

        store.reorder_tasks(board_id, &column_id, 0, 0).unwrap();
        store.reorder_columns(board_id, 0, 0).unwrap();
        store.rename_board(board_id, "Sprint 1").unwrap();

        assert!(recorder.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_snapshots_are_independent() {
        let mut store = BoardStore::default();
        let board_id = store.create_board("Sprint 1").unwrap();
        let old = store.snapshot();
        store.rename_board(board_id, "Sprint 2").unwrap();

        assert_eq!(old.boards[0].name, "Sprint 1");
        assert_eq!(store.boards()[0].name, "Sprint 2");
    }

    #[test]
    fn test_delete_only_active_board() {
        let mut store = BoardStore::default();
        let board_id = store.create_board("Only").unwrap();
        assert_eq!(store.active_board_id(), Some(board_id));
        store.delete_board(board_id).unwrap();
        assert_eq!(store.active_board_id(), None);
        assert!(store.boards().is_empty());
        assert!(store.active_board().is_none());
    }

    #[test]
    fn test_new_normalizes_initial_snapshot() {
        let board = Board::new("Only");
        let id = board.id;
        let store = BoardStore::new(BoardsState {
            boards: vec![Arc::new(board)],
            active_board_id: Some(Uuid::new_v4()),
        });
        assert_eq!(store.active_board_id(), Some(id));
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_toggle_returns_flag() {
        let mut store = BoardStore::default();
        let board_id = store.create_board("B").unwrap();
        let col = store.add_column(board_id, "C").unwrap();
        let task = store.add_task(board_id, &col, "T").unwrap();
        assert!(store.toggle_complete_task(board_id, &col, task).unwrap());
        assert!(store.board(board_id).unwrap().columns[0].tasks[0].completed);
        assert!(!store.toggle_complete_task(board_id, &col, task).unwrap());
    }
}
