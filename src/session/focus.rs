//! Audio focus arbitration strategies.
//!
//! Which strategy a session uses is decided once from the platform
//! capabilities. The structured strategy submits a request object that
//! reports transient loss back to the session; the legacy one requests focus
//! on the voice-call stream and cannot tell transient loss apart.

use std::sync::Arc;

use tracing::debug;

use crate::platform::{
    AudioAttributes, AudioService, AudioUsage, ContentType, FocusChange, FocusGain,
    FocusListener, FocusRequest, FocusRequestResult, PlatformCapabilities, StreamType,
};

/// A focus grant owned by the session.
#[derive(Debug, Clone)]
pub enum FocusGrant {
    /// Held through a structured request; the same request is used to
    /// reclaim and abandon.
    Structured(Arc<FocusRequest>),
    /// Held through the legacy stream API.
    Legacy,
}

impl FocusGrant {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Structured(_) => "structured",
            Self::Legacy => "legacy",
        }
    }
}

/// Strategy for requesting, reclaiming and abandoning audio focus.
pub trait FocusArbiter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Request voice-call focus. `listener` receives focus changes if the
    /// strategy can deliver them.
    fn request(
        &self,
        audio: &dyn AudioService,
        listener: FocusListener,
    ) -> (FocusGrant, FocusRequestResult);

    /// Re-submit the grant's request after a transient loss. Returns
    /// `false` when the grant cannot be reclaimed this way.
    fn reclaim(&self, audio: &dyn AudioService, grant: &FocusGrant) -> bool;

    fn abandon(&self, audio: &dyn AudioService, grant: FocusGrant);
}

/// Pick the focus strategy for the given platform.
pub fn select_arbiter(capabilities: PlatformCapabilities) -> Box<dyn FocusArbiter> {
    if capabilities.structured_focus() {
        Box::new(StructuredFocus)
    } else {
        Box::new(LegacyFocus)
    }
}

/// Voice-communication focus request: exclusive gain, never delayed and
/// never ducked.
pub fn voice_call_request(listener: FocusListener) -> FocusRequest {
    let attributes = AudioAttributes {
        usage: AudioUsage::VoiceCommunication,
        content_type: ContentType::Speech,
    };
    FocusRequest::new(FocusGain::Gain, attributes, listener)
        .with_delayed_focus_gain(false)
        .with_pause_when_ducked(false)
}

/// Structured focus requests.
#[derive(Debug, Default)]
pub struct StructuredFocus;

impl FocusArbiter for StructuredFocus {
    fn name(&self) -> &'static str {
        "structured"
    }

    fn request(
        &self,
        audio: &dyn AudioService,
        listener: FocusListener,
    ) -> (FocusGrant, FocusRequestResult) {
        let request = Arc::new(voice_call_request(listener));
        let result = audio.request_focus(Arc::clone(&request));
        (FocusGrant::Structured(request), result)
    }

    fn reclaim(&self, audio: &dyn AudioService, grant: &FocusGrant) -> bool {
        match grant {
            FocusGrant::Structured(request) => {
                let result = audio.request_focus(Arc::clone(request));
                debug!(?result, "re-requested audio focus");
                true
            }
            FocusGrant::Legacy => false,
        }
    }

    fn abandon(&self, audio: &dyn AudioService, grant: FocusGrant) {
        match grant {
            FocusGrant::Structured(request) => {
                audio.abandon_focus(&request);
            }
            FocusGrant::Legacy => {
                audio.abandon_legacy_focus();
            }
        }
    }
}

/// Legacy stream focus for platforms without structured requests.
///
/// The listener handed to the platform ignores every change, so the
/// session's own listener is never called on this path.
#[derive(Debug, Default)]
pub struct LegacyFocus;

impl FocusArbiter for LegacyFocus {
    fn name(&self) -> &'static str {
        "legacy"
    }

    fn request(
        &self,
        audio: &dyn AudioService,
        _listener: FocusListener,
    ) -> (FocusGrant, FocusRequestResult) {
        let ignore: FocusListener = Arc::new(|_: FocusChange| {});
        let result = audio.request_legacy_focus(StreamType::VoiceCall, FocusGain::Gain, ignore);
        (FocusGrant::Legacy, result)
    }

    fn reclaim(&self, _audio: &dyn AudioService, _grant: &FocusGrant) -> bool {
        false
    }

    fn abandon(&self, audio: &dyn AudioService, _grant: FocusGrant) {
        audio.abandon_legacy_focus();
    }
}
