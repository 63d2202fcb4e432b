use std::future::Future;
use std::sync::Arc;

use crate::types::BoardsState;

/// Failure talking to the remote board service. Never fatal: the bridge
/// falls back to the local cache on load and retries on the next push.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    #[error("Not authenticated")]
    Unauthenticated,

    #[error("Remote unavailable: {0}")]
    Transport(String),

    #[error("Remote rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid remote payload: {0}")]
    Payload(String),
}

/// The remote side of the persistence bridge.
pub trait RemoteService: Send + Sync + 'static {
    /// Pull the full board state.
    fn fetch_boards(&self) -> impl Future<Output = Result<BoardsState, SyncError>> + Send;

    /// Replace the remote board state with `state` (last write wins).
    fn save_boards(&self, state: Arc<BoardsState>) -> impl Future<Output = Result<(), SyncError>> + Send;
}

/// A remote that is never reachable; the bridge then runs purely on the
/// local cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRemote;

impl RemoteService for OfflineRemote {
    async fn fetch_boards(&self) -> Result<BoardsState, SyncError> {
        Err(SyncError::Transport("offline".to_string()))
    }

    async fn save_boards(&self, _state: Arc<BoardsState>) -> Result<(), SyncError> {
        Err(SyncError::Transport("offline".to_string()))
    }
}
