pub mod local;
pub mod memory;

use crate::types::BoardsState;

/// Durable local cache holding the whole board state under one key.
/// Implementations: FileCache (filesystem), MemoryCache (in-process).
pub trait LocalCache: Send + Sync {
    /// Read the cached state. `Ok(None)` when nothing has been cached yet.
    fn load(&self) -> Result<Option<BoardsState>, CacheError>;

    /// Replace the cached state.
    fn save(&self, state: &BoardsState) -> Result<(), CacheError>;

    /// Whether the cached state holds changes the remote has not accepted yet.
    fn has_unpushed(&self) -> Result<bool, CacheError>;

    fn set_unpushed(&self, unpushed: bool) -> Result<(), CacheError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache entry: {0}")]
    Corrupt(String),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}
