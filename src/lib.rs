//! # call-audio
//!
//! Call audio resource session and audio route inspection.
//!
//! While a call is in progress the session holds a wake-lock, keeps
//! exclusive voice-communication audio focus and reclaims it after
//! transient interruptions. The route inspector reports which output the
//! audio is currently going to and which outputs are connected.
//!
//! ## Features
//!
//! - **Call session**: Idle/Active lifecycle with wake-lock and focus grant
//! - **Focus strategies**: Structured requests on modern platforms, legacy
//!   stream focus on older ones
//! - **Route inspection**: Current device derivation and output enumeration
//! - **Bridge channels**: Method-call dispatch for a host UI layer
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use call_audio::{CallAudioSession, Platform, SessionConfig, SimulatedPlatform};
//!
//! fn main() {
//!     call_audio::logging::try_init().ok();
//!
//!     let platform: Arc<dyn Platform> = Arc::new(SimulatedPlatform::default());
//!     let session = CallAudioSession::new(platform, SessionConfig::default());
//!
//!     session.acquire();
//!     session.set_mode("communication");
//!     println!("session is {}", session.state());
//!     session.release();
//! }
//! ```

pub mod api;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod route;
pub mod session;

// Re-export commonly used types
pub use bridge::{Dispatcher, MethodCall, MethodResponse};
pub use error::{CallAudioError, Result};
pub use platform::{AudioMode, FocusChange, Platform, PlatformCapabilities, SimulatedPlatform};
pub use route::{
    classify_device_type, AudioRouteInspector, DeviceCategory, DeviceDescriptor, RouteSummary,
};
pub use session::{CallAudioSession, SessionConfig, SessionSnapshot, SessionState};
