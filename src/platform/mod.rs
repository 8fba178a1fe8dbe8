//! Platform service abstraction layer.
//!
//! The session and the route inspector never talk to the operating system
//! directly. They go through [`Platform`], which hands out the power and
//! audio services, and [`PlatformCapabilities`], which is resolved once and
//! decides between the modern and legacy code paths.

mod simulated;

pub use simulated::{SimulatedAudio, SimulatedPlatform, SimulatedPower};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::Result;

/// First API level with output device enumeration.
pub const API_LEVEL_DEVICE_ENUMERATION: u32 = 23;

/// First API level with structured focus requests.
pub const API_LEVEL_STRUCTURED_FOCUS: u32 = 26;

/// What the running platform version supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformCapabilities {
    /// Platform API level.
    pub api_level: u32,
}

impl PlatformCapabilities {
    /// Create capabilities for the given API level.
    pub fn new(api_level: u32) -> Self {
        Self { api_level }
    }

    /// Whether focus can be requested with a structured request object
    /// that reports transient loss to its listener.
    pub fn structured_focus(&self) -> bool {
        self.api_level >= API_LEVEL_STRUCTURED_FOCUS
    }

    /// Whether output devices can be enumerated.
    pub fn device_enumeration(&self) -> bool {
        self.api_level >= API_LEVEL_DEVICE_ENUMERATION
    }

    /// Fail with `UnsupportedPlatformVersion` when enumeration is missing.
    pub fn require_device_enumeration(&self) -> Result<()> {
        if self.device_enumeration() {
            Ok(())
        } else {
            Err(crate::CallAudioError::UnsupportedPlatformVersion {
                feature: "device enumeration",
                api_level: self.api_level,
            })
        }
    }
}

impl Default for PlatformCapabilities {
    fn default() -> Self {
        Self { api_level: 34 }
    }
}

/// Platform-wide audio routing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum AudioMode {
    #[default]
    Normal,
    Communication,
}

impl AudioMode {
    /// Parse a bridge mode string. Unknown values yield `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "normal" => Some(Self::Normal),
            "communication" => Some(Self::Communication),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Communication => "communication",
        }
    }
}

impl fmt::Display for AudioMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Focus-change notices delivered to a focus listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FocusChange {
    Gain,
    Loss,
    LossTransient,
    LossTransientCanDuck,
}

/// Kind of focus being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusGain {
    Gain,
}

/// Outcome of a focus request or abandon call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusRequestResult {
    Granted,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioUsage {
    VoiceCommunication,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    Speech,
}

/// Legacy stream types used by pre-structured focus requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    VoiceCall,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioAttributes {
    pub usage: AudioUsage,
    pub content_type: ContentType,
}

/// Callback the audio service invokes with focus changes.
pub type FocusListener = Arc<dyn Fn(FocusChange) + Send + Sync>;

/// A structured focus request.
///
/// The same request object is used to request, re-request and abandon
/// focus, so it is shared behind an `Arc`.
pub struct FocusRequest {
    pub gain: FocusGain,
    pub attributes: AudioAttributes,
    pub accepts_delayed_focus_gain: bool,
    pub will_pause_when_ducked: bool,
    listener: FocusListener,
}

impl FocusRequest {
    pub fn new(gain: FocusGain, attributes: AudioAttributes, listener: FocusListener) -> Self {
        Self {
            gain,
            attributes,
            accepts_delayed_focus_gain: true,
            will_pause_when_ducked: true,
            listener,
        }
    }

    pub fn with_delayed_focus_gain(mut self, accepts: bool) -> Self {
        self.accepts_delayed_focus_gain = accepts;
        self
    }

    pub fn with_pause_when_ducked(mut self, pauses: bool) -> Self {
        self.will_pause_when_ducked = pauses;
        self
    }

    /// Deliver a focus change to the registered listener.
    pub fn notify(&self, change: FocusChange) {
        (self.listener)(change)
    }

    pub fn listener(&self) -> FocusListener {
        Arc::clone(&self.listener)
    }
}

impl fmt::Debug for FocusRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusRequest")
            .field("gain", &self.gain)
            .field("attributes", &self.attributes)
            .field("accepts_delayed_focus_gain", &self.accepts_delayed_focus_gain)
            .field("will_pause_when_ducked", &self.will_pause_when_ducked)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the routing flags reported by the audio service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RouteFlags {
    #[serde(rename = "isBluetoothScoOn")]
    pub bluetooth_sco_on: bool,
    #[serde(rename = "isBluetoothA2dpOn")]
    pub bluetooth_a2dp_on: bool,
    #[serde(rename = "isSpeakerphoneOn")]
    pub speakerphone_on: bool,
}

/// An output device as reported by the platform, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOutputDevice {
    pub id: i32,
    pub device_type: i32,
    pub product_name: String,
}

impl RawOutputDevice {
    pub fn new(id: i32, device_type: i32, product_name: impl Into<String>) -> Self {
        Self {
            id,
            device_type,
            product_name: product_name.into(),
        }
    }
}

/// Wake-lock request flags. Locks are always partial (CPU only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WakeLockFlags {
    /// Turn the screen on when the lock is acquired.
    pub acquire_causes_wakeup: bool,
}

/// A platform wake-lock handle.
pub trait WakeLock: Send {
    /// Acquire the lock. The platform drops it after `timeout` even if
    /// it is never released.
    fn acquire(&mut self, timeout: Duration);

    /// Release the lock. Only valid while held.
    fn release(&mut self);

    fn is_held(&self) -> bool;
}

/// Platform power subsystem.
pub trait PowerService: Send + Sync {
    fn new_wake_lock(&self, flags: WakeLockFlags, tag: &str) -> Box<dyn WakeLock>;
}

/// Platform audio subsystem.
///
/// Implementations deliver focus changes from their own threads and must
/// not invoke a listener from inside `request_focus`.
pub trait AudioService: Send + Sync {
    fn request_focus(&self, request: Arc<FocusRequest>) -> FocusRequestResult;

    fn abandon_focus(&self, request: &FocusRequest) -> FocusRequestResult;

    /// Pre-structured focus request on a stream type.
    fn request_legacy_focus(
        &self,
        stream: StreamType,
        gain: FocusGain,
        listener: FocusListener,
    ) -> FocusRequestResult;

    fn abandon_legacy_focus(&self) -> FocusRequestResult;

    fn set_mode(&self, mode: AudioMode);

    fn set_speakerphone_on(&self, on: bool);

    fn route_flags(&self) -> Result<RouteFlags>;

    /// All output devices. Only meaningful when the platform supports
    /// device enumeration.
    fn output_devices(&self) -> Result<Vec<RawOutputDevice>>;
}

/// Entry point to the platform services.
pub trait Platform: Send + Sync {
    fn capabilities(&self) -> PlatformCapabilities;

    /// Obtain the power service, or `PlatformUnavailable`.
    fn power_service(&self) -> Result<Arc<dyn PowerService>>;

    /// Obtain the audio service, or `PlatformUnavailable`.
    fn audio_service(&self) -> Result<Arc<dyn AudioService>>;
}
