//! Mock of the Fastbound signing endpoint and the signed download host.
//!
//! Both live on the same axum server: the signing POST hands out URLs that
//! point back at `/download/{file}` on this server.

use super::constants::*;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// How the signing endpoint answers.
#[derive(Debug, Clone)]
pub enum SignResponse {
    /// 200 with a URL pointing at `/download/{0}` on the mock server
    File(String),
    /// 200 with this exact `url` value
    Url(String),
    /// Non-200 status with a body
    Status(u16, String),
    /// 200 with this raw body
    Raw(String),
}

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub sign: SignResponse,
    pub sign_delay: Duration,
    pub download_status: u16,
    pub download_delay: Duration,
    pub content: Vec<u8>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            sign: SignResponse::File(BOOK_FILE_NAME.to_string()),
            sign_delay: Duration::ZERO,
            download_status: 200,
            download_delay: Duration::ZERO,
            content: BOOK_CONTENT.to_vec(),
        }
    }
}

/// Headers captured from the last signing request
#[derive(Debug, Clone, Default)]
pub struct SignRequest {
    pub account: String,
    pub accept: Option<String>,
    pub audit_user: Option<String>,
    pub authorization: Option<String>,
}

struct MockState {
    base_url: String,
    config: MockConfig,
    post_count: AtomicUsize,
    get_count: AtomicUsize,
    last_sign_request: Mutex<Option<SignRequest>>,
}

/// Mock API server on a random port. Shuts down when dropped.
pub struct MockFastbound {
    pub base_url: String,
    state: Arc<MockState>,
    _shutdown_tx: tokio::sync::oneshot::Sender<()>,
}

impl MockFastbound {
    pub async fn spawn() -> Self {
        Self::spawn_with(MockConfig::default()).await
    }

    pub async fn spawn_with(config: MockConfig) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let state = Arc::new(MockState {
            base_url: base_url.clone(),
            config,
            post_count: AtomicUsize::new(0),
            get_count: AtomicUsize::new(0),
            last_sign_request: Mutex::new(None),
        });

        let app = Router::new()
            .route("/{account}/api/Downloads/BoundBook", post(sign_handler))
            .route("/download/{file}", get(download_handler))
            .with_state(state.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Mock server failed");
        });

        Self {
            base_url,
            state,
            _shutdown_tx: shutdown_tx,
        }
    }

    pub fn post_count(&self) -> usize {
        self.state.post_count.load(Ordering::SeqCst)
    }

    pub fn get_count(&self) -> usize {
        self.state.get_count.load(Ordering::SeqCst)
    }

    pub fn last_sign_request(&self) -> Option<SignRequest> {
        self.state.last_sign_request.lock().unwrap().clone()
    }

    /// Polls until at least `count` signing requests have been served.
    pub async fn wait_for_posts(&self, count: usize) {
        let deadline = tokio::time::Instant::now() + Duration::from_millis(WAIT_TIMEOUT_MS);
        while self.post_count() < count {
            if tokio::time::Instant::now() > deadline {
                panic!(
                    "Timed out waiting for {} signing requests, saw {}",
                    count,
                    self.post_count()
                );
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

fn header_string(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string())
}

async fn sign_handler(
    State(state): State<Arc<MockState>>,
    Path(account): Path<String>,
    headers: HeaderMap,
) -> Response {
    *state.last_sign_request.lock().unwrap() = Some(SignRequest {
        account,
        accept: header_string(&headers, "accept"),
        audit_user: header_string(&headers, "x-audituser"),
        authorization: header_string(&headers, "authorization"),
    });

    if !state.config.sign_delay.is_zero() {
        tokio::time::sleep(state.config.sign_delay).await;
    }

    let response = match &state.config.sign {
        SignResponse::File(name) => Json(serde_json::json!({
            "url": format!("{}/download/{}", state.base_url, name)
        }))
        .into_response(),
        SignResponse::Url(url) => Json(serde_json::json!({ "url": url })).into_response(),
        SignResponse::Status(code, body) => (
            StatusCode::from_u16(*code).expect("valid status code"),
            body.clone(),
        )
            .into_response(),
        SignResponse::Raw(body) => (StatusCode::OK, body.clone()).into_response(),
    };
    state.post_count.fetch_add(1, Ordering::SeqCst);
    response
}

async fn download_handler(
    State(state): State<Arc<MockState>>,
    Path(_file): Path<String>,
) -> Response {
    state.get_count.fetch_add(1, Ordering::SeqCst);

    if !state.config.download_delay.is_zero() {
        tokio::time::sleep(state.config.download_delay).await;
    }

    let status = StatusCode::from_u16(state.config.download_status).expect("valid status code");
    if status != StatusCode::OK {
        return (status, "no such book").into_response();
    }
    (StatusCode::OK, state.config.content.clone()).into_response()
}
