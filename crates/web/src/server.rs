//! Web server implementation

use crate::config::WebServerConfig;
use crate::views::Views;
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use loginlab_common::{CredentialValidator, LoginOutcome};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Web server state
#[derive(Clone)]
pub struct WebServer {
    state: Arc<WebServerState>,
}

struct WebServerState {
    /// Credential check; immutable after startup
    validator: CredentialValidator,
    /// Pre-rendered login and dashboard pages
    views: Views,
}

pub async fn serve(cfg: WebServerConfig) -> anyhow::Result<()> {
    let addr = cfg.addr().await?;
    let server = WebServer::new(cfg);
    server.serve(addr).await
}

impl WebServer {
    /// Create a new web server
    pub fn new(cfg: WebServerConfig) -> Self {
        info!(
            "Allow-list loaded with {} account(s), locale {}",
            cfg.allow_list.len(),
            cfg.locale
        );

        Self {
            state: Arc::new(WebServerState {
                validator: CredentialValidator::new(cfg.allow_list, cfg.locale),
                views: Views::render(cfg.locale),
            }),
        }
    }

    /// Create router
    pub fn router(&self) -> Router {
        Router::new()
            // Views
            .route("/", get(root_handler))
            .route("/login", get(login_view_handler))
            .route("/dashboard", get(dashboard_view_handler))
            // API
            .route("/api/login", post(login_handler))
            .route("/api/health", get(health_handler))
            .fallback(not_found_handler)
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Start the web server
    pub async fn serve(self, addr: SocketAddr) -> anyhow::Result<()> {
        info!("Login demo listening on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("Server stopped");
        Ok(())
    }
}

impl Default for WebServer {
    fn default() -> Self {
        Self::new(WebServerConfig::default())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}

// ============================================================================
// Handlers
// ============================================================================

async fn root_handler() -> Redirect {
    Redirect::to("/login")
}

async fn login_view_handler(State(state): State<Arc<WebServerState>>) -> Response {
    state.views.login()
}

async fn dashboard_view_handler(State(state): State<Arc<WebServerState>>) -> Response {
    state.views.dashboard()
}

/// `POST /api/login`
///
/// The body is read raw so that malformed JSON is reported with the login
/// contract's own 500 response instead of axum's extractor rejection.
async fn login_handler(State(state): State<Arc<WebServerState>>, body: Bytes) -> Response {
    let outcome = state.validator.validate_body(&body);
    log_outcome(&outcome);
    outcome_response(&outcome)
}

fn log_outcome(outcome: &LoginOutcome) {
    match outcome.reason() {
        None => info!(status = outcome.status_code(), "login accepted"),
        Some(reason) => info!(
            status = outcome.status_code(),
            reason = reason.kind(),
            "login rejected"
        ),
    }
}

fn outcome_response(outcome: &LoginOutcome) -> Response {
    let status =
        StatusCode::from_u16(outcome.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(outcome.response())).into_response()
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "loginlab-web"
    }))
}

async fn not_found_handler() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({"error": "not found"})),
    )
}
