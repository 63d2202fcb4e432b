/// Configuration for the taskboard sync client.
/// Reads sync.json from ~/.config/taskboard/sync.json (or platform equivalent).
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use taskboard_core::config::{SeedBoard, DEFAULT_CACHE_KEY};

pub const TOKEN_ENV: &str = "TASKBOARD_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncConfig {
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Board save endpoint, relative to `api_url`.
    #[serde(default = "default_save_path")]
    pub save_path: String,
    /// Override for the local cache file.
    #[serde(default)]
    pub cache_file: Option<PathBuf>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub seed: SeedBoard,
}

fn default_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_save_path() -> String {
    "/boards".to_string()
}

fn default_request_timeout_secs() -> u64 {
    10
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            save_path: default_save_path(),
            cache_file: None,
            token: None,
            request_timeout_secs: default_request_timeout_secs(),
            seed: SeedBoard::default(),
        }
    }
}

impl SyncConfig {
    /// Cache file location: `cacheFile` if set, else
    /// `<data dir>/taskboard/kanban_boards.json`.
    pub fn cache_path(&self) -> PathBuf {
        self.cache_file.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("taskboard")
                .join(format!("{}.json", DEFAULT_CACHE_KEY))
        })
    }

    /// Token from the environment wins over the one in the file.
    fn apply_env(mut self) -> Self {
        if let Ok(token) = std::env::var(TOKEN_ENV) {
            if !token.trim().is_empty() {
                self.token = Some(token.trim().to_string());
            }
        }
        self
    }
}

/// Default config path: ~/.config/taskboard/sync.json
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("taskboard")
        .join("sync.json")
}

/// Load config from path. Returns defaults if the file is missing or unreadable.
pub fn load_config(path: &Path) -> SyncConfig {
    read_config(path).apply_env()
}

fn read_config(path: &Path) -> SyncConfig {
    match fs::read_to_string(path) {
        Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
            log::warn!(target: "taskboard.config", "Failed to parse config {}: {}", path.display(), e);
            SyncConfig::default()
        }),
        Err(_) => {
            log::info!(target: "taskboard.config", "No config at {}, using defaults", path.display());
            SyncConfig::default()
        }
    }
}
