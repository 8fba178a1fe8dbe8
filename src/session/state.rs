//! Session state machine.

use std::fmt;

use serde::Serialize;

use crate::platform::AudioMode;

/// Lifecycle state of the call audio session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SessionState {
    /// No wake-lock and no focus grant held.
    #[default]
    Idle,
    /// Wake-lock and focus grant held for an ongoing call.
    Active,
}

impl SessionState {
    /// Check if transition to target state is valid.
    ///
    /// Valid transitions:
    /// - Idle -> Active
    /// - Active -> Idle
    ///
    /// Repeating the current state is not a transition; the session treats
    /// it as a no-op.
    pub fn can_transition_to(&self, target: SessionState) -> bool {
        use SessionState::*;
        matches!((*self, target), (Idle, Active) | (Active, Idle))
    }

    pub fn is_active(&self) -> bool {
        matches!(self, SessionState::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Idle => "Idle",
            SessionState::Active => "Active",
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the session, as reported to the bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub audio_mode: AudioMode,
    pub speaker_enabled: bool,
    /// Whether the platform still considers the wake-lock held. Goes false
    /// on its own once the expiry ceiling passes.
    pub wake_lock_held: bool,
    /// Focus strategy behind the current grant, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub focus_grant: Option<&'static str>,
    /// Automatic focus re-requests since the session became active.
    pub reclaim_count: u64,
}
