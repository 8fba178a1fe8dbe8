//! API router configuration.

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{api_info, focus_change, get_session, health, invoke, AppState};

/// Create the API router with a default simulated state.
pub fn create_router() -> Router {
    create_router_with_state(AppState::default())
}

/// Create the API router with custom state.
pub fn create_router_with_state(state: AppState) -> Router {
    let api_v1 = Router::new()
        .route("/", get(api_info))
        .route("/channels/{channel}/invoke", post(invoke))
        .route("/session", get(get_session))
        .route("/platform/focus", post(focus_change));

    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_v1)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Stop on Ctrl-C and release the session before exiting.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            graceful_shutdown: true,
        }
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 4100)
    }
}

/// Start the API server with a default simulated state.
pub async fn serve(config: ServerConfig) -> crate::Result<()> {
    serve_with_state(config, AppState::default()).await
}

/// Start the API server with custom state.
///
/// With graceful shutdown enabled, Ctrl-C stops the server and the session
/// is released so the wake-lock does not outlive the host.
pub async fn serve_with_state(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let session = std::sync::Arc::clone(state.dispatcher.session());
    let router = create_router_with_state(state);

    tracing::info!("Starting call-audio API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(crate::error::CallAudioError::Io)?;

    let server = axum::serve(listener, router);
    let result = if config.graceful_shutdown {
        server
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                tracing::info!("Shutdown requested");
            })
            .await
    } else {
        server.await
    };
    result.map_err(|e| crate::error::CallAudioError::Io(std::io::Error::other(e.to_string())))?;

    session.release();
    Ok(())
}
