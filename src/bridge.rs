//! Method-channel dispatch.
//!
//! The host application talks to this crate through two named channels,
//! each carrying string-named method calls with a JSON argument map. The
//! [`Dispatcher`] owns the single [`CallAudioSession`] and routes calls to
//! it or to the [`AudioRouteInspector`].
//!
//! | channel               | method                     | effect                      |
//! |-----------------------|----------------------------|-----------------------------|
//! | `call_audio/wakelock` | `acquireWakeLock`          | acquire the session         |
//! | `call_audio/wakelock` | `releaseWakeLock`          | release the session         |
//! | `call_audio/wakelock` | `setAudioMode`             | set mode (`mode` argument)  |
//! | `call_audio/wakelock` | `getSessionStatus`         | session snapshot            |
//! | `call_audio/device`   | `getCurrentAudioDevice`    | route summary               |
//! | `call_audio/device`   | `getAvailableAudioDevices` | output device list          |

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::CallAudioError;
use crate::platform::Platform;
use crate::route::AudioRouteInspector;
use crate::session::{CallAudioSession, SessionConfig};
use crate::Result;

/// Channel for wake-lock and audio mode control.
pub const WAKELOCK_CHANNEL: &str = "call_audio/wakelock";

/// Channel for audio route queries.
pub const DEVICE_CHANNEL: &str = "call_audio/device";

/// A method invocation arriving on a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            arguments: Map::new(),
        }
    }

    pub fn with_argument(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    /// String argument, `None` when absent or null.
    pub fn str_argument(&self, key: &str) -> Result<Option<&str>> {
        match self.arguments.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(value)) => Ok(Some(value.as_str())),
            Some(other) => Err(CallAudioError::InvalidArgument(format!(
                "'{}' must be a string, got {}",
                key, other
            ))),
        }
    }
}

/// Outcome of a dispatched call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}

impl From<Result<Value>> for MethodResponse {
    fn from(outcome: Result<Value>) -> Self {
        match outcome {
            Ok(result) => Self::Success { result },
            Err(CallAudioError::NotImplemented { .. }) => Self::NotImplemented,
            Err(e) => Self::Error {
                code: error_code(&e).to_string(),
                message: e.to_string(),
            },
        }
    }
}

fn error_code(error: &CallAudioError) -> &'static str {
    match error {
        CallAudioError::InvalidArgument(_) => "INVALID_ARGUMENT",
        CallAudioError::PlatformUnavailable(_) => "PLATFORM_UNAVAILABLE",
        CallAudioError::QueryFailure(_) => "QUERY_FAILURE",
        CallAudioError::UnsupportedPlatformVersion { .. } => "UNSUPPORTED_PLATFORM",
        _ => "INTERNAL_ERROR",
    }
}

/// Routes channel calls to the session and the route inspector.
pub struct Dispatcher {
    session: Arc<CallAudioSession>,
    inspector: AudioRouteInspector,
}

impl Dispatcher {
    pub fn new(platform: Arc<dyn Platform>, config: SessionConfig) -> Self {
        let session = Arc::new(CallAudioSession::new(Arc::clone(&platform), config));
        let inspector = AudioRouteInspector::new(platform);
        Self { session, inspector }
    }

    pub fn session(&self) -> &Arc<CallAudioSession> {
        &self.session
    }

    pub fn inspector(&self) -> &AudioRouteInspector {
        &self.inspector
    }

    /// Dispatch one call. Unknown channels and methods yield
    /// [`MethodResponse::NotImplemented`].
    pub fn dispatch(&self, channel: &str, call: &MethodCall) -> MethodResponse {
        debug!(channel, method = %call.method, "dispatching");
        let outcome = match channel {
            WAKELOCK_CHANNEL => self.wakelock(call),
            DEVICE_CHANNEL => self.device(call),
            _ => Err(not_implemented(channel, call)),
        };
        MethodResponse::from(outcome)
    }

    fn wakelock(&self, call: &MethodCall) -> Result<Value> {
        match call.method.as_str() {
            "acquireWakeLock" => {
                self.session.acquire();
                Ok(Value::Null)
            }
            "releaseWakeLock" => {
                self.session.release();
                Ok(Value::Null)
            }
            "setAudioMode" => {
                let mode = call.str_argument("mode")?.unwrap_or("normal");
                self.session.set_mode(mode);
                Ok(Value::Null)
            }
            "getSessionStatus" => Ok(serde_json::to_value(self.session.snapshot())?),
            _ => Err(not_implemented(WAKELOCK_CHANNEL, call)),
        }
    }

    fn device(&self, call: &MethodCall) -> Result<Value> {
        match call.method.as_str() {
            "getCurrentAudioDevice" => Ok(serde_json::to_value(self.inspector.current_route())?),
            "getAvailableAudioDevices" => {
                Ok(serde_json::to_value(self.inspector.available_devices())?)
            }
            _ => Err(not_implemented(DEVICE_CHANNEL, call)),
        }
    }
}

fn not_implemented(channel: &str, call: &MethodCall) -> CallAudioError {
    CallAudioError::NotImplemented {
        channel: channel.to_string(),
        method: call.method.clone(),
    }
}
