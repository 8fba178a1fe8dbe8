//! API layer for call-audio.
//!
//! This module exposes the bridge channels over HTTP so a host application
//! (or a test harness) can drive the call audio session.
//!
//! ## Endpoints
//!
//! ### Health & Info
//! - `GET /health` - Health check
//! - `GET /api/v1/` - API information
//!
//! ### Bridge
//! - `POST /api/v1/channels/{channel}/invoke` - Invoke a channel method
//! - `GET /api/v1/session` - Session snapshot
//!
//! ### Simulator
//! - `POST /api/v1/platform/focus` - Deliver a focus change
//!
//! ## Example
//!
//! ```no_run
//! use call_audio::api::{ServerConfig, serve};
//!
//! #[tokio::main]
//! async fn main() -> call_audio::Result<()> {
//!     let config = ServerConfig::new("127.0.0.1", 4100);
//!     serve(config).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod types;

pub use handlers::AppState;
pub use router::{create_router, create_router_with_state, serve, serve_with_state, ServerConfig};
pub use types::{ErrorResponse, FocusChangeRequest, FocusChangeResponse};
