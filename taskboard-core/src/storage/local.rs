/// Filesystem cache backend.
///
/// Stores the serialized board state in a single JSON file with:
/// - Atomic writes (write to .tmp, fsync, rename, fsync directory)
/// - SHA-256 fingerprint of the last written content to skip identical rewrites
/// - Mutex-guarded writes so two saves never interleave
/// - An empty `<name>.json.unpushed` marker next to the file while the
///   remote is behind

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use sha2::{Digest, Sha256};

use super::{CacheError, LocalCache};
use crate::config::DEFAULT_CACHE_KEY;
use crate::types::BoardsState;

pub struct FileCache {
    path: PathBuf,
    /// SHA-256 of the content last read or written
    last_hash: Mutex<Option<String>>,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_hash: Mutex::new(None),
        }
    }

    /// Cache file named after the default key inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{}.json", DEFAULT_CACHE_KEY)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn marker_path(&self) -> PathBuf {
        self.path.with_extension("json.unpushed")
    }

    fn content_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        hex::encode(hasher.finalize())
    }

    fn atomic_write(path: &Path, content: &str) -> Result<(), std::io::Error> {
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }

        let tmp_path = path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp_path, path)?;

        // fsync directory for rename durability
        if let Some(dir) = path.parent() {
            if let Ok(d) = fs::File::open(dir) {
                let _ = d.sync_all();
            }
        }
        Ok(())
    }
}

impl LocalCache for FileCache {
    fn load(&self) -> Result<Option<BoardsState>, CacheError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let state: BoardsState = serde_json::from_str(&content)
            .map_err(|e| CacheError::Corrupt(format!("{}: {}", self.path.display(), e)))?;
        if let Ok(mut last) = self.last_hash.lock() {
            *last = Some(Self::content_hash(&content));
        }
        Ok(Some(state))
    }

    fn save(&self, state: &BoardsState) -> Result<(), CacheError> {
        let content = serde_json::to_string(state)?;
        let hash = Self::content_hash(&content);

        let mut last = self
            .last_hash
            .lock()
            .map_err(|_| CacheError::Corrupt("cache lock poisoned".to_string()))?;
        if last.as_deref() == Some(hash.as_str()) && self.path.exists() {
            log::trace!(target: "taskboard.cache", "Skipping unchanged write to {:?}", self.path);
            return Ok(());
        }

        Self::atomic_write(&self.path, &content)?;
        *last = Some(hash);
        log::debug!(
            target: "taskboard.cache",
            "Wrote {} bytes to {:?}",
            content.len(),
            self.path
        );
        Ok(())
    }

    fn has_unpushed(&self) -> Result<bool, CacheError> {
        Ok(self.marker_path().try_exists()?)
    }

    fn set_unpushed(&self, unpushed: bool) -> Result<(), CacheError> {
        let marker = self.marker_path();
        if unpushed {
            if let Some(dir) = marker.parent() {
                if !dir.as_os_str().is_empty() {
                    fs::create_dir_all(dir)?;
                }
            }
            fs::write(&marker, b"")?;
            return Ok(());
        }
        match fs::remove_file(&marker) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
