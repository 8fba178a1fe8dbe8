//! In-memory platform used by the host binary and the tests.
//!
//! Every call is recorded so callers can assert on what the session asked
//! the platform to do. Faults can be injected per service.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use tracing::debug;

use super::{
    AudioMode, AudioService, FocusChange, FocusGain, FocusListener, FocusRequest,
    FocusRequestResult, Platform, PlatformCapabilities, PowerService, RawOutputDevice,
    RouteFlags, StreamType, WakeLock, WakeLockFlags,
};
use crate::error::CallAudioError;
use crate::Result;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Simulated platform with a power and an audio service.
pub struct SimulatedPlatform {
    capabilities: PlatformCapabilities,
    power: Arc<SimulatedPower>,
    audio: Arc<SimulatedAudio>,
    power_available: AtomicBool,
    audio_available: AtomicBool,
}

impl SimulatedPlatform {
    pub fn new(capabilities: PlatformCapabilities) -> Self {
        Self {
            capabilities,
            power: Arc::new(SimulatedPower::default()),
            audio: Arc::new(SimulatedAudio::default()),
            power_available: AtomicBool::new(true),
            audio_available: AtomicBool::new(true),
        }
    }

    pub fn power(&self) -> &Arc<SimulatedPower> {
        &self.power
    }

    pub fn audio(&self) -> &Arc<SimulatedAudio> {
        &self.audio
    }

    /// Make `power_service` fail with `PlatformUnavailable`.
    pub fn set_power_available(&self, available: bool) {
        self.power_available.store(available, Ordering::SeqCst);
    }

    /// Make `audio_service` fail with `PlatformUnavailable`.
    pub fn set_audio_available(&self, available: bool) {
        self.audio_available.store(available, Ordering::SeqCst);
    }
}

impl Default for SimulatedPlatform {
    fn default() -> Self {
        Self::new(PlatformCapabilities::default())
    }
}

impl Platform for SimulatedPlatform {
    fn capabilities(&self) -> PlatformCapabilities {
        self.capabilities
    }

    fn power_service(&self) -> Result<Arc<dyn PowerService>> {
        if self.power_available.load(Ordering::SeqCst) {
            Ok(Arc::clone(&self.power) as Arc<dyn PowerService>)
        } else {
            Err(CallAudioError::PlatformUnavailable("power"))
        }
    }

    fn audio_service(&self) -> Result<Arc<dyn AudioService>> {
        if self.audio_available.load(Ordering::SeqCst) {
            Ok(Arc::clone(&self.audio) as Arc<dyn AudioService>)
        } else {
            Err(CallAudioError::PlatformUnavailable("audio"))
        }
    }
}

#[derive(Debug, Default)]
struct PowerLedger {
    created: usize,
    acquisitions: usize,
    releases: usize,
    last_tag: Option<String>,
    last_flags: Option<WakeLockFlags>,
    last_timeout: Option<Duration>,
}

/// Simulated power service. Wake-locks expire on their timeout.
#[derive(Debug, Default)]
pub struct SimulatedPower {
    ledger: Arc<Mutex<PowerLedger>>,
}

impl SimulatedPower {
    /// Number of wake-lock acquisitions so far.
    pub fn acquisitions(&self) -> usize {
        lock(&self.ledger).acquisitions
    }

    /// Number of explicit wake-lock releases so far.
    pub fn releases(&self) -> usize {
        lock(&self.ledger).releases
    }

    /// Number of wake-lock handles created.
    pub fn created(&self) -> usize {
        lock(&self.ledger).created
    }

    pub fn last_tag(&self) -> Option<String> {
        lock(&self.ledger).last_tag.clone()
    }

    pub fn last_flags(&self) -> Option<WakeLockFlags> {
        lock(&self.ledger).last_flags
    }

    pub fn last_timeout(&self) -> Option<Duration> {
        lock(&self.ledger).last_timeout
    }
}

impl PowerService for SimulatedPower {
    fn new_wake_lock(&self, flags: WakeLockFlags, tag: &str) -> Box<dyn WakeLock> {
        let mut ledger = lock(&self.ledger);
        ledger.created += 1;
        ledger.last_tag = Some(tag.to_string());
        ledger.last_flags = Some(flags);
        Box::new(SimulatedWakeLock {
            held: None,
            ledger: Arc::clone(&self.ledger),
        })
    }
}

/// Expiry of a held wake-lock.
#[derive(Debug, Clone, Copy)]
enum Expiry {
    At(Instant),
    /// The timeout lies past the clock's range.
    Never,
}

struct SimulatedWakeLock {
    held: Option<Expiry>,
    ledger: Arc<Mutex<PowerLedger>>,
}

impl WakeLock for SimulatedWakeLock {
    fn acquire(&mut self, timeout: Duration) {
        let expiry = Instant::now()
            .checked_add(timeout)
            .map_or(Expiry::Never, Expiry::At);
        self.held = Some(expiry);
        let mut ledger = lock(&self.ledger);
        ledger.acquisitions += 1;
        ledger.last_timeout = Some(timeout);
    }

    fn release(&mut self) {
        if self.is_held() {
            lock(&self.ledger).releases += 1;
        }
        self.held = None;
    }

    fn is_held(&self) -> bool {
        match self.held {
            Some(Expiry::At(deadline)) => Instant::now() < deadline,
            Some(Expiry::Never) => true,
            None => false,
        }
    }
}

enum FocusHolder {
    Structured(Arc<FocusRequest>),
    Legacy(FocusListener),
}

impl FocusHolder {
    fn listener(&self) -> FocusListener {
        match self {
            Self::Structured(request) => request.listener(),
            Self::Legacy(listener) => Arc::clone(listener),
        }
    }
}

struct AudioLedger {
    mode: AudioMode,
    route: RouteFlags,
    devices: Vec<RawOutputDevice>,
    fail_queries: bool,
    fail_enumeration: bool,
    focus_result: FocusRequestResult,
    holder: Option<FocusHolder>,
    has_focus: bool,
    focus_requests: Vec<Arc<FocusRequest>>,
    legacy_requests: Vec<StreamType>,
    abandons: usize,
    legacy_abandons: usize,
}

impl Default for AudioLedger {
    fn default() -> Self {
        Self {
            mode: AudioMode::Normal,
            route: RouteFlags::default(),
            devices: Vec::new(),
            fail_queries: false,
            fail_enumeration: false,
            focus_result: FocusRequestResult::Granted,
            holder: None,
            has_focus: false,
            focus_requests: Vec::new(),
            legacy_requests: Vec::new(),
            abandons: 0,
            legacy_abandons: 0,
        }
    }
}

/// Simulated audio service.
#[derive(Default)]
pub struct SimulatedAudio {
    ledger: Mutex<AudioLedger>,
}

impl SimulatedAudio {
    pub fn mode(&self) -> AudioMode {
        lock(&self.ledger).mode
    }

    pub fn speakerphone_on(&self) -> bool {
        lock(&self.ledger).route.speakerphone_on
    }

    pub fn set_bluetooth(&self, sco_on: bool, a2dp_on: bool) {
        let mut ledger = lock(&self.ledger);
        ledger.route.bluetooth_sco_on = sco_on;
        ledger.route.bluetooth_a2dp_on = a2dp_on;
    }

    pub fn set_output_devices(&self, devices: Vec<RawOutputDevice>) {
        lock(&self.ledger).devices = devices;
    }

    /// Make route and device queries fail with `QueryFailure`.
    pub fn set_fail_queries(&self, fail: bool) {
        lock(&self.ledger).fail_queries = fail;
    }

    /// Make only device enumeration fail; route flags stay readable.
    pub fn set_fail_enumeration(&self, fail: bool) {
        lock(&self.ledger).fail_enumeration = fail;
    }

    /// Result returned by subsequent focus requests.
    pub fn set_focus_result(&self, result: FocusRequestResult) {
        lock(&self.ledger).focus_result = result;
    }

    /// Whether the last holder currently has focus.
    pub fn has_focus(&self) -> bool {
        lock(&self.ledger).has_focus
    }

    /// Every structured request submitted, in order.
    pub fn focus_requests(&self) -> Vec<Arc<FocusRequest>> {
        lock(&self.ledger).focus_requests.clone()
    }

    pub fn legacy_requests(&self) -> Vec<StreamType> {
        lock(&self.ledger).legacy_requests.clone()
    }

    pub fn abandons(&self) -> usize {
        lock(&self.ledger).abandons
    }

    pub fn legacy_abandons(&self) -> usize {
        lock(&self.ledger).legacy_abandons
    }

    /// Deliver a focus change to the current holder on the calling thread.
    ///
    /// Returns `false` when nobody holds focus.
    pub fn dispatch_focus_change(&self, change: FocusChange) -> bool {
        let listener = {
            let mut ledger = lock(&self.ledger);
            let Some(holder) = ledger.holder.as_ref() else {
                return false;
            };
            let listener = holder.listener();
            ledger.has_focus = matches!(change, FocusChange::Gain);
            listener
        };
        debug!(?change, "delivering focus change");
        listener(change);
        true
    }

    /// Deliver a focus change from a separate platform thread.
    pub fn spawn_focus_change(self: &Arc<Self>, change: FocusChange) -> JoinHandle<bool> {
        let audio = Arc::clone(self);
        std::thread::spawn(move || audio.dispatch_focus_change(change))
    }
}

impl AudioService for SimulatedAudio {
    fn request_focus(&self, request: Arc<FocusRequest>) -> FocusRequestResult {
        let mut ledger = lock(&self.ledger);
        ledger.focus_requests.push(Arc::clone(&request));
        let result = ledger.focus_result;
        if result == FocusRequestResult::Granted {
            ledger.holder = Some(FocusHolder::Structured(request));
            ledger.has_focus = true;
        }
        result
    }

    fn abandon_focus(&self, request: &FocusRequest) -> FocusRequestResult {
        let mut ledger = lock(&self.ledger);
        ledger.abandons += 1;
        let holds = matches!(
            &ledger.holder,
            Some(FocusHolder::Structured(held)) if std::ptr::eq(held.as_ref(), request)
        );
        if holds {
            ledger.holder = None;
            ledger.has_focus = false;
        }
        FocusRequestResult::Granted
    }

    fn request_legacy_focus(
        &self,
        stream: StreamType,
        _gain: FocusGain,
        listener: FocusListener,
    ) -> FocusRequestResult {
        let mut ledger = lock(&self.ledger);
        ledger.legacy_requests.push(stream);
        let result = ledger.focus_result;
        if result == FocusRequestResult::Granted {
            ledger.holder = Some(FocusHolder::Legacy(listener));
            ledger.has_focus = true;
        }
        result
    }

    fn abandon_legacy_focus(&self) -> FocusRequestResult {
        let mut ledger = lock(&self.ledger);
        ledger.legacy_abandons += 1;
        if matches!(ledger.holder, Some(FocusHolder::Legacy(_))) {
            ledger.holder = None;
            ledger.has_focus = false;
        }
        FocusRequestResult::Granted
    }

    fn set_mode(&self, mode: AudioMode) {
        lock(&self.ledger).mode = mode;
    }

    fn set_speakerphone_on(&self, on: bool) {
        lock(&self.ledger).route.speakerphone_on = on;
    }

    fn route_flags(&self) -> Result<RouteFlags> {
        let ledger = lock(&self.ledger);
        if ledger.fail_queries {
            return Err(CallAudioError::QueryFailure("audio service not responding".into()));
        }
        Ok(ledger.route)
    }

    fn output_devices(&self) -> Result<Vec<RawOutputDevice>> {
        let ledger = lock(&self.ledger);
        if ledger.fail_queries || ledger.fail_enumeration {
            return Err(CallAudioError::QueryFailure("device list unavailable".into()));
        }
        Ok(ledger.devices.clone())
    }
}
