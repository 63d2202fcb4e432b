/// HTTP implementation of the remote board service.
///
/// GET  {api}/boards        -> `{ boards, activeBoardId }`
/// POST {api}{save_path}    -> `{ message }` or `{ error }`
///
/// Every request carries the bearer token from the shared [`Credentials`].
use std::sync::Arc;
use std::time::Duration;

use reqwest::StatusCode;
use taskboard_core::bridge::{RemoteService, SyncError};
use taskboard_core::sync::SaveResponse;
use taskboard_core::types::BoardsState;

use crate::auth::Credentials;
use crate::config::SyncConfig;

pub fn http_client(timeout_secs: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs.max(1)))
        .build()
}

pub struct HttpRemote {
    client: reqwest::Client,
    boards_url: String,
    save_url: String,
    credentials: Arc<Credentials>,
}

impl HttpRemote {
    pub fn new(client: reqwest::Client, config: &SyncConfig, credentials: Arc<Credentials>) -> Self {
        let base = config.api_url.trim_end_matches('/');
        let save_path = if config.save_path.starts_with('/') {
            config.save_path.clone()
        } else {
            format!("/{}", config.save_path)
        };
        Self {
            client,
            boards_url: format!("{}/boards", base),
            save_url: format!("{}{}", base, save_path),
            credentials,
        }
    }

    fn token(&self) -> Result<String, SyncError> {
        self.credentials.token().ok_or(SyncError::Unauthenticated)
    }
}

fn transport(e: reqwest::Error) -> SyncError {
    SyncError::Transport(e.to_string())
}

/// Turn a failed reply into a `Rejected`, preferring the server's own words.
fn rejection(status: StatusCode, body: &str) -> SyncError {
    let parsed: SaveResponse = serde_json::from_str(body).unwrap_or_default();
    let message = parsed
        .error
        .or(parsed.message)
        .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
    SyncError::Rejected {
        status: status.as_u16(),
        message,
    }
}

impl RemoteService for HttpRemote {
    async fn fetch_boards(&self) -> Result<BoardsState, SyncError> {
        let token = self.token()?;
        let resp = self
            .client
            .get(&self.boards_url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }
        let state: BoardsState = serde_json::from_str(&body).map_err(|e| SyncError::Payload(e.to_string()))?;
        log::info!(
            target: "taskboard.remote",
            "Fetched {} board(s) from {}",
            state.boards.len(),
            self.boards_url
        );
        Ok(state)
    }

    async fn save_boards(&self, state: Arc<BoardsState>) -> Result<(), SyncError> {
        let token = self.token()?;
        let resp = self
            .client
            .post(&self.save_url)
            .bearer_auth(token)
            .json(&*state)
            .send()
            .await
            .map_err(transport)?;
        let status = resp.status();
        let body = resp.text().await.map_err(transport)?;
        if !status.is_success() {
            return Err(rejection(status, &body));
        }
        // An empty or non-JSON 2xx body counts as success.
        let reply: SaveResponse = serde_json::from_str(&body).unwrap_or_default();
        if let Some(error) = reply.error {
            return Err(SyncError::Rejected {
                status: status.as_u16(),
                message: error,
            });
        }
        log::debug!(
            target: "taskboard.remote",
            "Saved {} board(s): {}",
            state.boards.len(),
            reply.message.as_deref().unwrap_or("ok")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::HeaderMap;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use std::sync::Mutex;
    use taskboard_core::bridge::PersistenceBridge;
    use taskboard_core::config::SeedBoard;
    use taskboard_core::storage::memory::MemoryCache;

    const TOKEN: &str = "secret";

    #[derive(Clone, Default)]
    struct Server {
        boards: Arc<Mutex<Option<BoardsState>>>,
        saves: Arc<Mutex<usize>>,
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v == format!("Bearer {}", TOKEN))
            .unwrap_or(false)
    }

    fn unauthorized() -> (StatusCode, Json<SaveResponse>) {
        let resp = SaveResponse {
            message: None,
            error: Some("Unauthorized".to_string()),
        };
        (StatusCode::UNAUTHORIZED, Json(resp))
    }

    async fn get_boards(
        State(server): State<Server>,
        headers: HeaderMap,
    ) -> Result<Json<BoardsState>, (StatusCode, Json<SaveResponse>)> {
        if !authorized(&headers) {
            return Err(unauthorized());
        }
        Ok(Json(server.boards.lock().unwrap().clone().unwrap_or_default()))
    }

    async fn save_boards(
        State(server): State<Server>,
        headers: HeaderMap,
        Json(body): Json<BoardsState>,
    ) -> (StatusCode, Json<SaveResponse>) {
        if !authorized(&headers) {
            return unauthorized();
        }
        *server.boards.lock().unwrap() = Some(body);
        *server.saves.lock().unwrap() += 1;
        let resp = SaveResponse {
            message: Some("Boards saved".to_string()),
            error: None,
        };
        (StatusCode::OK, Json(resp))
    }

    async fn quota_exceeded() -> Json<SaveResponse> {
        Json(SaveResponse {
            message: None,
            error: Some("Board limit reached".to_string()),
        })
    }

    async fn spawn_server(server: Server) -> String {
        let app = Router::new()
            .route("/boards", get(get_boards).post(save_boards))
            .route("/saveBoards", post(save_boards))
            .route("/full", post(quota_exceeded))
            .with_state(server);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn remote(api_url: &str, save_path: &str, token: Option<&str>) -> HttpRemote {
        let config = SyncConfig {
            api_url: format!("{}/", api_url),
            save_path: save_path.to_string(),
            ..SyncConfig::default()
        };
        let creds = Arc::new(Credentials::new(token.map(str::to_string)));
        HttpRemote::new(http_client(5).unwrap(), &config, creds)
    }

    #[tokio::test]
    async fn test_no_token_is_unauthenticated() {
        let remote = remote("http://127.0.0.1:9", "/boards", None);
        assert_eq!(remote.fetch_boards().await, Err(SyncError::Unauthenticated));
        assert_eq!(
            remote.save_boards(Arc::new(BoardsState::default())).await,
            Err(SyncError::Unauthenticated)
        );
    }

    #[tokio::test]
    async fn test_fetch_and_save() {
        let server = Server::default();
        let seeded = SeedBoard::default().build();
        *server.boards.lock().unwrap() = Some(seeded.clone());
        let base = spawn_server(server.clone()).await;

        let remote = remote(&base, "saveBoards", Some(TOKEN));
        assert_eq!(remote.fetch_boards().await.unwrap(), seeded);

        let next = BoardsState::default();
        remote.save_boards(Arc::new(next.clone())).await.unwrap();
        assert_eq!(*server.boards.lock().unwrap(), Some(next));
        assert_eq!(*server.saves.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_bad_token_is_rejected() {
        let base = spawn_server(Server::default()).await;
        let remote = remote(&base, "/boards", Some("stale"));
        assert_eq!(
            remote.fetch_boards().await,
            Err(SyncError::Rejected {
                status: 401,
                message: "Unauthorized".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_error_field_is_rejected() {
        let base = spawn_server(Server::default()).await;
        let remote = remote(&base, "/full", Some(TOKEN));
        assert_eq!(
            remote.save_boards(Arc::new(BoardsState::default())).await,
            Err(SyncError::Rejected {
                status: 200,
                message: "Board limit reached".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_unreachable_is_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let remote = remote(&format!("http://{}", addr), "/boards", Some(TOKEN));
        assert!(matches!(remote.fetch_boards().await, Err(SyncError::Transport(_))));
    }

    #[tokio::test]
    async fn test_bridge_pushes_latest_state_over_http() {
        let server = Server::default();
        *server.boards.lock().unwrap() = Some(SeedBoard::default().build());
        let base = spawn_server(server.clone()).await;

        let cache = Arc::new(MemoryCache::default());
        let mut bridge = PersistenceBridge::new(remote(&base, "/boards", Some(TOKEN)), cache);
        let mut store = bridge.start().await;
        let board_id = store.active_board_id().unwrap();
        let col = store.add_column(board_id, "Done").unwrap();
        store.add_task(board_id, &col, "Celebrate").unwrap();
        bridge.flush().await;

        assert_eq!(server.boards.lock().unwrap().as_ref(), Some(&*store.snapshot()));
        bridge.shutdown().await;
    }
}
