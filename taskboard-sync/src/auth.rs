/// Auth client: login, registration and password reset against the board
/// service, plus the shared credential slot the board remote reads from.
use serde::Serialize;
use std::sync::{Arc, RwLock};
use taskboard_core::sync::{
    AuthResponse, LoginRequest, RegisterRequest, ResetPasswordRequest, ResetRequest, VerifyCodeRequest,
};
use thiserror::Error;

/// Bearer token shared between the auth client and the board remote.
#[derive(Debug, Default)]
pub struct Credentials {
    token: RwLock<Option<String>>,
}

impl Credentials {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token.filter(|t| !t.is_empty())),
        }
    }

    pub fn set(&self, token: impl Into<String>) {
        if let Ok(mut slot) = self.token.write() {
            *slot = Some(token.into());
        }
    }

    pub fn clear(&self) {
        if let Ok(mut slot) = self.token.write() {
            *slot = None;
        }
    }

    pub fn token(&self) -> Option<String> {
        self.token.read().ok().and_then(|slot| slot.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Auth service unavailable: {0}")]
    Transport(String),
}

fn require(value: &str, what: &'static str) -> Result<(), AuthError> {
    if value.trim().is_empty() {
        return Err(AuthError::InvalidInput(what));
    }
    Ok(())
}

fn validate_code(code: &str) -> Result<(), AuthError> {
    let code = code.trim();
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Err(AuthError::InvalidInput("verification code must be 6 digits"));
    }
    Ok(())
}

pub struct AuthClient {
    client: reqwest::Client,
    base_url: String,
    credentials: Arc<Credentials>,
}

impl AuthClient {
    pub fn new(client: reqwest::Client, base_url: &str, credentials: Arc<Credentials>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            credentials,
        }
    }

    pub fn credentials(&self) -> &Arc<Credentials> {
        &self.credentials
    }

    /// Log in and keep the returned token.
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        require(email, "email is required")?;
        require(password, "password is required")?;
        let body = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp = self.post("/login", &body).await?;
        let token = resp.token.ok_or_else(|| AuthError::Rejected {
            status: 200,
            message: "no token in login response".to_string(),
        })?;
        self.credentials.set(token);
        log::info!(target: "taskboard.auth", "Logged in as {}", body.email);
        Ok(())
    }

    /// Create an account. A token in the reply logs the user in right away.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<(), AuthError> {
        require(name, "name is required")?;
        require(email, "email is required")?;
        require(password, "password is required")?;
        let body = RegisterRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let resp = self.post("/register", &body).await?;
        if let Some(token) = resp.token {
            self.credentials.set(token);
        }
        log::info!(target: "taskboard.auth", "Registered {}", body.email);
        Ok(())
    }

    /// Ask for a reset code by mail. Returns the server's message.
    pub async fn request_reset(&self, email: &str) -> Result<Option<String>, AuthError> {
        require(email, "email is required")?;
        let body = ResetRequest {
            email: email.trim().to_string(),
        };
        Ok(self.post("/api/auth/request-reset", &body).await?.message)
    }

    pub async fn verify_code(&self, email: &str, code: &str) -> Result<Option<String>, AuthError> {
        require(email, "email is required")?;
        validate_code(code)?;
        let body = VerifyCodeRequest {
            email: email.trim().to_string(),
            code: code.trim().to_string(),
        };
        Ok(self.post("/api/auth/verify-code", &body).await?.message)
    }

    pub async fn reset_password(&self, email: &str, password: &str, confirm: &str) -> Result<Option<String>, AuthError> {
        require(email, "email is required")?;
        require(password, "password is required")?;
        if password != confirm {
            return Err(AuthError::InvalidInput("passwords do not match"));
        }
        let body = ResetPasswordRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
            confirm: confirm.to_string(),
        };
        Ok(self.post("/api/auth/reset-password", &body).await?.message)
    }

    pub fn logout(&self) {
        self.credentials.clear();
        log::info!(target: "taskboard.auth", "Logged out");
    }

    async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<AuthResponse, AuthError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        let status = resp.status();
        let text = resp.text().await.map_err(|e| AuthError::Transport(e.to_string()))?;
        let parsed: AuthResponse = serde_json::from_str(&text).unwrap_or_default();

        if !status.is_success() || parsed.error.is_some() {
            let message = parsed
                .reason()
                .map(str::to_string)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            log::warn!(target: "taskboard.auth", "POST {} rejected ({}): {}", path, status, message);
            return Err(AuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }
        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn login(Json(req): Json<LoginRequest>) -> (StatusCode, Json<AuthResponse>) {
        if req.password == "hunter2" {
            let resp = AuthResponse {
                token: Some(format!("token-for-{}", req.email)),
                ..Default::default()
            };
            (StatusCode::OK, Json(resp))
        } else {
            let resp = AuthResponse {
                error: Some("Invalid credentials".to_string()),
                ..Default::default()
            };
            (StatusCode::UNAUTHORIZED, Json(resp))
        }
    }

    async fn verify_code(Json(req): Json<VerifyCodeRequest>) -> Json<AuthResponse> {
        let resp = if req.code == "123456" {
            AuthResponse {
                message: Some("Code verified".to_string()),
                ..Default::default()
            }
        } else {
            AuthResponse {
                error: Some("Wrong code".to_string()),
                ..Default::default()
            }
        };
        Json(resp)
    }

    fn reply(message: Option<&str>, error: Option<&str>) -> AuthResponse {
        AuthResponse {
            token: None,
            message: message.map(str::to_string),
            error: error.map(str::to_string),
        }
    }

    async fn register(Json(req): Json<RegisterRequest>) -> (StatusCode, Json<AuthResponse>) {
        if req.email == "taken@example.com" {
            return (
                StatusCode::CONFLICT,
                Json(reply(None, Some("Email already registered"))),
            );
        }
        let resp = AuthResponse {
            token: Some(format!("token-for-{}", req.email)),
            ..reply(Some("Welcome"), None)
        };
        (StatusCode::OK, Json(resp))
    }

    async fn request_reset(Json(req): Json<ResetRequest>) -> (StatusCode, Json<AuthResponse>) {
        if req.email == "nobody@example.com" {
            // Some endpoints put the failure text in `message`.
            return (
                StatusCode::NOT_FOUND,
                Json(reply(Some("No account for that email"), None)),
            );
        }
        (StatusCode::OK, Json(reply(Some("Reset code sent"), None)))
    }

    async fn reset_password(Json(req): Json<ResetPasswordRequest>) -> Json<AuthResponse> {
        if req.password.len() < 6 {
            return Json(reply(None, Some("Password too short")));
        }
        Json(reply(Some("Password updated"), None))
    }

    fn app() -> Router {
        Router::new()
            .route("/login", post(login))
            .route("/register", post(register))
            .route("/api/auth/request-reset", post(request_reset))
            .route("/api/auth/verify-code", post(verify_code))
            .route("/api/auth/reset-password", post(reset_password))
    }

    fn offline_client() -> AuthClient {
        // Port 9 (discard) is never contacted: validation fails first.
        AuthClient::new(reqwest::Client::new(), "http://127.0.0.1:9", Arc::new(Credentials::default()))
    }

    #[test]
    fn test_credentials_slot() {
        let creds = Credentials::new(Some(String::new()));
        assert!(!creds.is_authenticated());
        creds.set("abc");
        assert_eq!(creds.token().as_deref(), Some("abc"));
        creds.clear();
        assert_eq!(creds.token(), None);
    }

    #[tokio::test]
    async fn test_input_checked_before_request() {
        let client = offline_client();
        assert_eq!(
            client.login("  ", "pw").await,
            Err(AuthError::InvalidInput("email is required"))
        );
        assert_eq!(
            client.login("a@b.c", "").await,
            Err(AuthError::InvalidInput("password is required"))
        );
        assert!(matches!(
            client.verify_code("a@b.c", "12345").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            client.verify_code("a@b.c", "12a456").await,
            Err(AuthError::InvalidInput(_))
        ));
        assert_eq!(
            client.reset_password("a@b.c", "one", "two").await,
            Err(AuthError::InvalidInput("passwords do not match"))
        );
        assert!(matches!(
            client.register("", "a@b.c", "pw").await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_login_stores_token() {
        let base = spawn_server(app()).await;
        let creds = Arc::new(Credentials::default());
        let client = AuthClient::new(reqwest::Client::new(), &base, creds.clone());

        client.login("ann@example.com", "hunter2").await.unwrap();
        assert_eq!(creds.token().as_deref(), Some("token-for-ann@example.com"));

        client.logout();
        assert!(!creds.is_authenticated());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let base = spawn_server(app()).await;
        let client = AuthClient::new(reqwest::Client::new(), &base, Arc::new(Credentials::default()));
        let err = client.login("ann@example.com", "wrong").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::Rejected {
                status: 401,
                message: "Invalid credentials".to_string()
            }
        );
        assert!(!client.credentials().is_authenticated());
    }

    #[tokio::test]
    async fn test_error_field_on_success_status_is_rejection() {
        let base = spawn_server(app()).await;
        let client = AuthClient::new(reqwest::Client::new(), &base, Arc::new(Credentials::default()));

        let msg = client.verify_code("ann@example.com", "123456").await.unwrap();
        assert_eq!(msg.as_deref(), Some("Code verified"));

        let err = client.verify_code("ann@example.com", "654321").await.unwrap_err();
        assert!(matches!(err, AuthError::Rejected { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let client = AuthClient::new(
            reqwest::Client::new(),
            &format!("http://{}", addr),
            Arc::new(Credentials::default()),
        );
        assert!(matches!(
            client.request_reset("ann@example.com").await,
            Err(AuthError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn test_register_stores_token() {
        let base = spawn_server(app()).await;
        let creds = Arc::new(Credentials::default());
        let client = AuthClient::new(reqwest::Client::new(), &base, creds.clone());

        client.register("Ann", "ann@example.com", "hunter2").await.unwrap();
        assert_eq!(creds.token().as_deref(), Some("token-for-ann@example.com"));
    }

    #[tokio::test]
    async fn test_register_conflict() {
        let base = spawn_server(app()).await;
        let creds = Arc::new(Credentials::default());
        let client = AuthClient::new(reqwest::Client::new(), &base, creds.clone());

        let err = client.register("Ann", "taken@example.com", "hunter2").await.unwrap_err();
        assert_eq!(
            err,
            AuthError::Rejected {
                status: 409,
                message: "Email already registered".to_string()
            }
        );
        assert!(!creds.is_authenticated());
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let base = spawn_server(app()).await;
        let client = AuthClient::new(reqwest::Client::new(), &base, Arc::new(Credentials::default()));

        let sent = client.request_reset("ann@example.com").await.unwrap();
        assert_eq!(sent.as_deref(), Some("Reset code sent"));

        let verified = client.verify_code("ann@example.com", " 123456 ").await.unwrap();
        assert_eq!(verified.as_deref(), Some("Code verified"));

        let updated = client
            .reset_password("ann@example.com", "correct horse", "correct horse")
            .await
            .unwrap();
        assert_eq!(updated.as_deref(), Some("Password updated"));
    }

    #[tokio::test]
    async fn test_password_reset_rejections() {
        let base = spawn_server(app()).await;
        let client = AuthClient::new(reqwest::Client::new(), &base, Arc::new(Credentials::default()));

        assert_eq!(
            client.request_reset("nobody@example.com").await,
            Err(AuthError::Rejected {
                status: 404,
                message: "No account for that email".to_string()
            })
        );
        assert_eq!(
            client.reset_password("ann@example.com", "abc", "abc").await,
            Err(AuthError::Rejected {
                status: 200,
                message: "Password too short".to_string()
            })
        );
    }
}
