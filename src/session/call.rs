//! The call audio resource session.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use tracing::{debug, info, warn};

use super::focus::{select_arbiter, FocusArbiter, FocusGrant};
use super::state::{SessionSnapshot, SessionState};
use crate::platform::{
    AudioMode, AudioService, FocusChange, FocusListener, FocusRequestResult, Platform, WakeLock,
    WakeLockFlags,
};

/// Longest a call wake-lock may be held before the platform drops it.
pub const MAX_WAKE_LOCK_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// Configuration for the call audio session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Tag the wake-lock is registered under.
    pub wake_lock_tag: String,
    /// Ceiling after which the platform drops the wake-lock on its own.
    /// Clamped to [`MAX_WAKE_LOCK_TIMEOUT`].
    pub wake_lock_timeout: Duration,
    /// Turn the screen on when the wake-lock is acquired.
    pub acquire_causes_wakeup: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            wake_lock_tag: "call_audio::CallWakeLock".to_string(),
            wake_lock_timeout: MAX_WAKE_LOCK_TIMEOUT,
            acquire_causes_wakeup: true,
        }
    }
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    wake_lock: Option<Box<dyn WakeLock>>,
    grant: Option<FocusGrant>,
    audio: Option<Arc<dyn AudioService>>,
    audio_mode: AudioMode,
    speaker_enabled: bool,
    reclaims: u64,
}

struct Core {
    platform: Arc<dyn Platform>,
    arbiter: Box<dyn FocusArbiter>,
    config: SessionConfig,
    inner: Mutex<Inner>,
}

impl Core {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| {
            warn!("session lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Audio service handle, obtained on first use.
    fn audio(&self, inner: &mut Inner) -> Option<Arc<dyn AudioService>> {
        if inner.audio.is_none() {
            match self.platform.audio_service() {
                Ok(audio) => inner.audio = Some(audio),
                Err(e) => warn!(error = %e, "continuing without audio service"),
            }
        }
        inner.audio.clone()
    }

    fn on_focus_changed(&self, change: FocusChange) {
        // Only transient loss is acted on. Permanent loss, gain and
        // duckable loss are ignored on purpose: an active call never yields
        // the audio path to another app. Whether permanent loss should end
        // the session is a product decision that has not been made.
        if change != FocusChange::LossTransient {
            debug!(?change, "ignoring focus change");
            return;
        }

        let mut inner = self.lock();
        if !inner.state.is_active() {
            debug!("transient focus loss while idle");
            return;
        }
        let (Some(audio), Some(grant)) = (inner.audio.clone(), inner.grant.as_ref()) else {
            return;
        };
        if self.arbiter.reclaim(audio.as_ref(), grant) {
            inner.reclaims += 1;
            info!(reclaims = inner.reclaims, "reclaimed audio focus after transient loss");
        }
    }
}

/// Owns the call's wake-lock and audio focus grant.
///
/// There is one session per host. Bridge calls arrive serialized, but focus
/// changes come from platform threads, so every field lives behind a single
/// mutex. The focus listener only holds a weak reference and enters through
/// the same lock.
pub struct CallAudioSession {
    core: Arc<Core>,
}

impl CallAudioSession {
    /// Create an idle session. The focus strategy is fixed here from the
    /// platform capabilities.
    pub fn new(platform: Arc<dyn Platform>, config: SessionConfig) -> Self {
        let capabilities = platform.capabilities();
        let arbiter = select_arbiter(capabilities);
        info!(
            api_level = capabilities.api_level,
            focus = arbiter.name(),
            "call audio session ready"
        );

        Self {
            core: Arc::new(Core {
                platform,
                arbiter,
                config,
                inner: Mutex::new(Inner::default()),
            }),
        }
    }

    /// Take the wake-lock and audio focus for a call.
    ///
    /// A no-op while already active. Platform services that cannot be
    /// obtained are skipped with a warning; nothing is rolled back.
    pub fn acquire(&self) {
        let core = &self.core;
        let mut inner = core.lock();
        if inner.state.is_active() {
            debug!("call audio already acquired");
            return;
        }

        match core.platform.power_service() {
            Ok(power) => {
                let flags = WakeLockFlags {
                    acquire_causes_wakeup: core.config.acquire_causes_wakeup,
                };
                let mut wake_lock = power.new_wake_lock(flags, &core.config.wake_lock_tag);
                wake_lock.acquire(core.config.wake_lock_timeout.min(MAX_WAKE_LOCK_TIMEOUT));
                inner.wake_lock = Some(wake_lock);
            }
            Err(e) => warn!(error = %e, "acquiring call audio without a wake-lock"),
        }

        if let Some(audio) = core.audio(&mut inner) {
            let weak = Arc::downgrade(core);
            let (grant, result) = core.arbiter.request(audio.as_ref(), focus_listener(weak));
            if result != FocusRequestResult::Granted {
                warn!(?result, "audio focus not granted");
            }
            inner.grant = Some(grant);

            audio.set_mode(AudioMode::Communication);
            audio.set_speakerphone_on(true);
        }

        inner.audio_mode = AudioMode::Communication;
        inner.speaker_enabled = true;
        inner.reclaims = 0;
        debug_assert!(inner.state.can_transition_to(SessionState::Active));
        inner.state = SessionState::Active;
        info!(tag = %core.config.wake_lock_tag, "call audio acquired");
    }

    /// Drop the wake-lock and focus grant and restore normal audio.
    ///
    /// Safe to call any number of times, with or without a prior acquire.
    pub fn release(&self) {
        let core = &self.core;
        let mut inner = core.lock();
        let was_active = inner.state.is_active();

        if let Some(mut wake_lock) = inner.wake_lock.take() {
            if wake_lock.is_held() {
                wake_lock.release();
            } else {
                debug!("wake-lock already expired");
            }
        }

        if let Some(grant) = inner.grant.take() {
            if let Some(audio) = inner.audio.as_ref() {
                core.arbiter.abandon(audio.as_ref(), grant);
            }
        }

        if let Some(audio) = inner.audio.take() {
            audio.set_mode(AudioMode::Normal);
            audio.set_speakerphone_on(false);
        }

        inner.audio_mode = AudioMode::Normal;
        inner.speaker_enabled = false;
        inner.state = SessionState::Idle;

        if was_active {
            info!(reclaims = inner.reclaims, "call audio released");
        } else {
            debug!("release while idle");
        }
    }

    /// Set the platform audio mode without changing session state.
    ///
    /// Accepts `"communication"` and `"normal"`; anything else is ignored.
    pub fn set_mode(&self, mode: &str) {
        let core = &self.core;
        let mut inner = core.lock();
        let audio = core.audio(&mut inner);

        let Some(mode) = AudioMode::parse(mode) else {
            debug!(mode, "ignoring unrecognized audio mode");
            return;
        };
        if let Some(audio) = audio {
            audio.set_mode(mode);
        }
        inner.audio_mode = mode;
        debug!(%mode, "audio mode set");
    }

    /// Handle a focus change. Normally invoked by the platform through the
    /// listener registered on acquire.
    pub fn on_focus_changed(&self, change: FocusChange) {
        self.core.on_focus_changed(change);
    }

    pub fn state(&self) -> SessionState {
        self.core.lock().state
    }

    pub fn audio_mode(&self) -> AudioMode {
        self.core.lock().audio_mode
    }

    pub fn speaker_enabled(&self) -> bool {
        self.core.lock().speaker_enabled
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.core.lock();
        SessionSnapshot {
            state: inner.state,
            audio_mode: inner.audio_mode,
            speaker_enabled: inner.speaker_enabled,
            wake_lock_held: inner
                .wake_lock
                .as_ref()
                .map(|wake_lock| wake_lock.is_held())
                .unwrap_or(false),
            focus_grant: inner.grant.as_ref().map(FocusGrant::kind),
            reclaim_count: inner.reclaims,
        }
    }
}

fn focus_listener(core: Weak<Core>) -> FocusListener {
    Arc::new(move |change: FocusChange| {
        if let Some(core) = core.upgrade() {
            core.on_focus_changed(change);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{PlatformCapabilities, SimulatedPlatform, StreamType};

    fn session_on(api_level: u32) -> (Arc<SimulatedPlatform>, CallAudioSession) {
        let platform = Arc::new(SimulatedPlatform::new(PlatformCapabilities::new(api_level)));
        let session = CallAudioSession::new(
            Arc::clone(&platform) as Arc<dyn Platform>,
            SessionConfig::default(),
        );
        (platform, session)
    }

    fn session() -> (Arc<SimulatedPlatform>, CallAudioSession) {
        session_on(34)
    }

    #[test]
    fn test_new_session_is_idle() {
        let (platform, session) = session();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.audio_mode(), AudioMode::Normal);
        assert!(!session.speaker_enabled());
        assert_eq!(platform.power().created(), 0);
    }

    #[test]
    fn test_acquire_takes_both_resources() {
        let (platform, session) = session();
        session.acquire();

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(platform.power().acquisitions(), 1);
        assert_eq!(platform.power().last_timeout(), Some(Duration::from_secs(3600)));
        assert_eq!(
            platform.power().last_tag().as_deref(),
            Some("call_audio::CallWakeLock")
        );
        assert!(platform.power().last_flags().unwrap().acquire_causes_wakeup);
        assert_eq!(platform.audio().focus_requests().len(), 1);
        assert!(platform.audio().has_focus());

        let snapshot = session.snapshot();
        assert!(snapshot.wake_lock_held);
        assert_eq!(snapshot.focus_grant, Some("structured"));
    }

    #[test]
    fn test_acquire_forces_communication_and_speaker() {
        let (platform, session) = session();
        session.set_mode("normal");
        session.acquire();

        assert_eq!(session.audio_mode(), AudioMode::Communication);
        assert!(session.speaker_enabled());
        assert_eq!(platform.audio().mode(), AudioMode::Communication);
        assert!(platform.audio().speakerphone_on());
    }

    #[test]
    fn test_repeated_acquire_is_noop() {
        let (platform, session) = session();
        session.acquire();
        session.acquire();
        session.acquire();

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(platform.power().acquisitions(), 1);
        assert_eq!(platform.audio().focus_requests().len(), 1);
    }

    #[test]
    fn test_release_restores_normal() {
        let (platform, session) = session();
        session.acquire();
        session.set_mode("communication");
        session.release();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.audio_mode(), AudioMode::Normal);
        assert!(!session.speaker_enabled());
        assert_eq!(platform.power().releases(), 1);
        assert_eq!(platform.audio().abandons(), 1);
        assert!(!platform.audio().has_focus());
        assert_eq!(platform.audio().mode(), AudioMode::Normal);
        assert!(!platform.audio().speakerphone_on());

        let snapshot = session.snapshot();
        assert!(!snapshot.wake_lock_held);
        assert_eq!(snapshot.focus_grant, None);
    }

    #[test]
    fn test_release_without_acquire() {
        let (platform, session) = session();
        session.release();
        session.release();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(platform.power().releases(), 0);
        assert_eq!(platform.audio().abandons(), 0);
        assert_eq!(platform.audio().legacy_abandons(), 0);
    }

    #[test]
    fn test_release_is_idempotent() {
        let (platform, session) = session();
        session.acquire();
        session.release();
        session.release();

        assert_eq!(platform.power().releases(), 1);
        assert_eq!(platform.audio().abandons(), 1);
    }

    #[test]
    fn test_reacquire_after_release() {
        let (platform, session) = session();
        session.acquire();
        session.release();
        session.acquire();

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(platform.power().acquisitions(), 2);
        assert_eq!(platform.power().created(), 2);
        assert_eq!(platform.audio().focus_requests().len(), 2);
    }

    #[test]
    fn test_expired_wake_lock_is_not_released() {
        let platform = Arc::new(SimulatedPlatform::default());
        let config = SessionConfig {
            wake_lock_timeout: Duration::ZERO,
            ..SessionConfig::default()
        };
        let session = CallAudioSession::new(Arc::clone(&platform) as Arc<dyn Platform>, config);

        session.acquire();
        assert!(!session.snapshot().wake_lock_held);
        session.release();
        assert_eq!(platform.power().releases(), 0);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_oversized_timeout_is_clamped() {
        let platform = Arc::new(SimulatedPlatform::default());
        let config = SessionConfig {
            wake_lock_timeout: Duration::from_secs(u64::MAX),
            ..SessionConfig::default()
        };
        let session = CallAudioSession::new(Arc::clone(&platform) as Arc<dyn Platform>, config);

        session.acquire();
        assert_eq!(session.state(), SessionState::Active);
        assert!(session.snapshot().wake_lock_held);
        assert_eq!(platform.power().last_timeout(), Some(MAX_WAKE_LOCK_TIMEOUT));

        session.release();
        assert_eq!(platform.power().releases(), 1);
    }

    #[test]
    fn test_set_mode_without_transition() {
        let (platform, session) = session();
        session.set_mode("communication");

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.audio_mode(), AudioMode::Communication);
        assert_eq!(platform.audio().mode(), AudioMode::Communication);

        session.set_mode("normal");
        assert_eq!(platform.audio().mode(), AudioMode::Normal);
    }

    #[test]
    fn test_set_mode_ignores_unknown() {
        let (platform, session) = session();
        session.set_mode("communication");
        session.set_mode("ringtone");
        session.set_mode("");

        assert_eq!(session.audio_mode(), AudioMode::Communication);
        assert_eq!(platform.audio().mode(), AudioMode::Communication);
    }

    #[test]
    fn test_transient_loss_reclaims_once() {
        let (platform, session) = session();
        session.acquire();

        assert!(platform.audio().dispatch_focus_change(FocusChange::LossTransient));

        let requests = platform.audio().focus_requests();
        assert_eq!(requests.len(), 2);
        assert!(Arc::ptr_eq(&requests[0], &requests[1]));
        assert!(platform.audio().has_focus());
        assert_eq!(session.snapshot().reclaim_count, 1);
    }

    #[test]
    fn test_transient_loss_while_idle_is_noop() {
        let (platform, session) = session();
        session.on_focus_changed(FocusChange::LossTransient);
        assert!(platform.audio().focus_requests().is_empty());

        session.acquire();
        session.release();
        session.on_focus_changed(FocusChange::LossTransient);
        assert_eq!(platform.audio().focus_requests().len(), 1);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_other_focus_changes_are_ignored() {
        let (platform, session) = session();
        session.acquire();

        for change in [
            FocusChange::Loss,
            FocusChange::Gain,
            FocusChange::LossTransientCanDuck,
        ] {
            session.on_focus_changed(change);
        }

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(platform.audio().focus_requests().len(), 1);
        assert_eq!(session.snapshot().reclaim_count, 0);
    }

    #[test]
    fn test_focus_change_from_platform_thread() {
        let (platform, session) = session();
        session.acquire();

        let delivered = platform
            .audio()
            .spawn_focus_change(FocusChange::LossTransient)
            .join()
            .unwrap();

        assert!(delivered);
        assert_eq!(platform.audio().focus_requests().len(), 2);
        assert_eq!(session.snapshot().reclaim_count, 1);
    }

    #[test]
    fn test_legacy_platform_falls_back() {
        let (platform, session) = session_on(21);
        session.acquire();

        assert_eq!(platform.audio().legacy_requests(), vec![StreamType::VoiceCall]);
        assert!(platform.audio().focus_requests().is_empty());
        assert_eq!(session.snapshot().focus_grant, Some("legacy"));

        // The legacy listener ignores everything, transient loss included.
        platform.audio().dispatch_focus_change(FocusChange::LossTransient);
        session.on_focus_changed(FocusChange::LossTransient);
        assert_eq!(platform.audio().legacy_requests().len(), 1);

        session.release();
        assert_eq!(platform.audio().legacy_abandons(), 1);
    }

    #[test]
    fn test_power_unavailable_degrades() {
        let (platform, session) = session();
        platform.set_power_available(false);
        session.acquire();

        assert_eq!(session.state(), SessionState::Active);
        assert!(!session.snapshot().wake_lock_held);
        assert!(platform.audio().has_focus());

        session.release();
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn test_audio_unavailable_degrades() {
        let (platform, session) = session();
        platform.set_audio_available(false);
        session.acquire();

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.audio_mode(), AudioMode::Communication);
        assert!(session.snapshot().wake_lock_held);
        assert_eq!(session.snapshot().focus_grant, None);

        session.set_mode("normal");
        assert_eq!(session.audio_mode(), AudioMode::Normal);

        session.release();
        assert_eq!(platform.power().releases(), 1);
    }

    #[test]
    fn test_denied_focus_keeps_grant_for_abandon() {
        let (platform, session) = session();
        platform.audio().set_focus_result(FocusRequestResult::Failed);
        session.acquire();

        assert_eq!(session.state(), SessionState::Active);
        assert_eq!(session.snapshot().focus_grant, Some("structured"));

        session.release();
        assert_eq!(platform.audio().abandons(), 1);
    }

    #[test]
    fn test_concurrent_focus_changes_and_release() {
        use std::thread;

        let (platform, session) = session();
        let session = Arc::new(session);
        session.acquire();

        let handles: Vec<_> = (0..8)
            .map(|_| platform.audio().spawn_focus_change(FocusChange::LossTransient))
            .collect();
        let releaser = {
            let session = Arc::clone(&session);
            thread::spawn(move || session.release())
        };

        for handle in handles {
            handle.join().unwrap();
        }
        releaser.join().unwrap();

        assert_eq!(session.state(), SessionState::Idle);
        assert!(!platform.audio().has_focus());
        assert_eq!(platform.power().releases(), 1);
    }
}
