//! REST API handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::types::{ErrorResponse, FocusChangeRequest, FocusChangeResponse};
use crate::bridge::{Dispatcher, MethodCall, MethodResponse};
use crate::platform::{Platform, SimulatedPlatform};
use crate::session::{SessionConfig, SessionSnapshot};

type ApiError = (StatusCode, Json<ErrorResponse>);

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    /// Present when the host runs on the simulated platform; enables
    /// focus-change injection.
    pub simulator: Option<Arc<SimulatedPlatform>>,
}

impl AppState {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            simulator: None,
        }
    }

    /// State backed by a simulated platform.
    pub fn simulated(platform: Arc<SimulatedPlatform>, config: SessionConfig) -> Self {
        let dispatcher = Dispatcher::new(Arc::clone(&platform) as Arc<dyn Platform>, config);
        Self {
            dispatcher: Arc::new(dispatcher),
            simulator: Some(platform),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::simulated(Arc::new(SimulatedPlatform::default()), SessionConfig::default())
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// API information endpoint.
pub async fn api_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "call-audio",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running"
    }))
}

/// Invoke a method on a bridge channel.
pub async fn invoke(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Json(call): Json<MethodCall>,
) -> Result<Json<MethodResponse>, ApiError> {
    match state.dispatcher.dispatch(&channel, &call) {
        MethodResponse::NotImplemented => Err((
            StatusCode::NOT_IMPLEMENTED,
            Json(ErrorResponse::not_implemented(&channel, &call.method)),
        )),
        MethodResponse::Error { code, message } => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(code, message)),
        )),
        response => Ok(Json(response)),
    }
}

/// Get the current session snapshot.
pub async fn get_session(State(state): State<AppState>) -> Json<SessionSnapshot> {
    Json(state.dispatcher.session().snapshot())
}

/// Deliver a focus change from a simulated platform thread.
pub async fn focus_change(
    State(state): State<AppState>,
    Json(req): Json<FocusChangeRequest>,
) -> Result<Json<FocusChangeResponse>, ApiError> {
    let simulator = state.simulator.as_ref().ok_or_else(|| {
        (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::simulator_disabled()),
        )
    })?;

    let handle = simulator.audio().spawn_focus_change(req.change);
    let delivered = tokio::task::spawn_blocking(move || handle.join())
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error(e.to_string())),
            )
        })?
        .map_err(|_| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::internal_error("focus listener panicked")),
            )
        })?;

    Ok(Json(FocusChangeResponse {
        delivered,
        session: state.dispatcher.session().snapshot(),
    }))
}
