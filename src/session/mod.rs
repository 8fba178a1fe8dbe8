//! Call audio session module.
//!
//! This module owns the call's platform resources: the wake-lock, the audio
//! focus grant and the audio mode, together with the focus strategies the
//! session picks between.

mod call;
mod focus;
mod state;

pub use call::{CallAudioSession, SessionConfig, MAX_WAKE_LOCK_TIMEOUT};
pub use focus::{
    select_arbiter, voice_call_request, FocusArbiter, FocusGrant, LegacyFocus, StructuredFocus,
};
pub use state::{SessionSnapshot, SessionState};
