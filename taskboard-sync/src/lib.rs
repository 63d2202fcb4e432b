/// taskboard-sync: HTTP remote, auth client, config and logging around the
/// taskboard core.
pub mod auth;
pub mod config;
pub mod log_bridge;
pub mod remote;

use std::path::PathBuf;
use std::sync::Arc;

use taskboard_core::bridge::{PersistenceBridge, SyncEvent};
use taskboard_core::storage::local::FileCache;

use crate::auth::Credentials;
use crate::remote::HttpRemote;

/// Load boards (remote, then cache, then seed), print a summary of every
/// board as JSON and wait for pending pushes before returning.
pub async fn run(config_path: PathBuf) -> Result<(), String> {
    if let Err(e) = log_bridge::init("info") {
        eprintln!("failed to initialize logger: {}", e);
    }

    let config = config::load_config(&config_path);
    let credentials = Arc::new(Credentials::new(config.token.clone()));
    if !credentials.is_authenticated() {
        log::warn!(
            target: "taskboard.sync",
            "No token configured (set \"token\" in {} or {}); remote sync disabled",
            config_path.display(),
            config::TOKEN_ENV
        );
    }

    let client = remote::http_client(config.request_timeout_secs).map_err(|e| format!("HTTP client: {}", e))?;
    let remote = HttpRemote::new(client, &config, credentials);
    let cache_path = config.cache_path();
    let cache = Arc::new(FileCache::new(&cache_path));

    let mut bridge = PersistenceBridge::new(remote, cache).with_seed(config.seed.clone());
    let mut events = bridge.subscribe_events();
    let store = bridge.start().await;

    while let Ok(event) = events.try_recv() {
        if let SyncEvent::Loaded { source, fetch_error } = event {
            log::info!(
                target: "taskboard.sync",
                "Boards loaded from {:?} (cache {}){}",
                source,
                cache_path.display(),
                fetch_error.map(|e| format!(", remote: {}", e)).unwrap_or_default()
            );
        }
    }

    let summaries = store.snapshot().summaries();
    let json = serde_json::to_string_pretty(&summaries).map_err(|e| format!("Serialize summaries: {}", e))?;
    println!("{}", json);

    bridge.shutdown().await;

    let warnings = log_bridge::recent_warnings();
    if !warnings.is_empty() {
        eprintln!("{} warning(s) during sync:", warnings.len());
        for w in warnings {
            eprintln!("  [{}] {}", w.target, w.message);
        }
    }
    Ok(())
}
