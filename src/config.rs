//! Configuration management for call-audio.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::cli::Args;
use crate::platform::PlatformCapabilities;
use crate::session::{SessionConfig, MAX_WAKE_LOCK_TIMEOUT};

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// Call audio session configuration.
    pub session: SessionSection,
    /// Platform configuration.
    pub platform: PlatformSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4100,
            graceful_shutdown: true,
        }
    }
}

/// Session configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    /// Wake-lock tag.
    pub wake_lock_tag: String,
    /// Wake-lock expiry ceiling in seconds, 1 to 3600.
    pub wake_lock_timeout_secs: u64,
    /// Turn the screen on when the wake-lock is acquired.
    pub acquire_causes_wakeup: bool,
}

impl Default for SessionSection {
    fn default() -> Self {
        let defaults = SessionConfig::default();
        Self {
            wake_lock_tag: defaults.wake_lock_tag,
            wake_lock_timeout_secs: defaults.wake_lock_timeout.as_secs(),
            acquire_causes_wakeup: defaults.acquire_causes_wakeup,
        }
    }
}

/// Platform configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSection {
    /// API level reported by the simulated platform.
    pub api_level: u32,
}

impl Default for PlatformSection {
    fn default() -> Self {
        Self {
            api_level: PlatformCapabilities::default().api_level,
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_vars(|key| std::env::var(key).ok());
    }

    /// Apply overrides from a variable lookup. Unparseable numbers are
    /// ignored.
    fn apply_vars<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = var("CALL_AUDIO_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("CALL_AUDIO_PORT").and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }

        if let Some(level) = var("CALL_AUDIO_API_LEVEL").and_then(|l| l.parse().ok()) {
            self.platform.api_level = level;
        }

        if let Some(level) = var("CALL_AUDIO_LOG_LEVEL").or_else(|| var("RUST_LOG")) {
            self.logging.level = level;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(level) = args.api_level {
            self.platform.api_level = level;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = match args.config {
            Some(ref path) => Config::from_file(path)?,
            None => Config::default(),
        };

        config.apply_env();
        config.apply_args(args);
        config.validate()?;

        Ok(config)
    }

    /// Convert to ServerConfig for the API server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let server_config = ServerConfig::new(host.to_string(), self.server.port);
        if self.server.graceful_shutdown {
            Ok(server_config)
        } else {
            Ok(server_config.without_graceful_shutdown())
        }
    }

    /// Check values that would otherwise only fail at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let secs = self.session.wake_lock_timeout_secs;
        if secs == 0 || secs > MAX_WAKE_LOCK_TIMEOUT.as_secs() {
            return Err(ConfigError::InvalidWakeLockTimeout(secs));
        }
        Ok(())
    }

    /// Convert to the session configuration.
    pub fn to_session_config(&self) -> Result<SessionConfig, ConfigError> {
        self.validate()?;
        Ok(SessionConfig {
            wake_lock_tag: self.session.wake_lock_tag.clone(),
            wake_lock_timeout: Duration::from_secs(self.session.wake_lock_timeout_secs),
            acquire_causes_wakeup: self.session.acquire_causes_wakeup,
        })
    }

    /// Platform capabilities to run with.
    pub fn capabilities(&self) -> PlatformCapabilities {
        PlatformCapabilities::new(self.platform.api_level)
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
    /// Wake-lock timeout outside 1..=3600 seconds.
    InvalidWakeLockTimeout(u64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
            Self::InvalidWakeLockTimeout(secs) => write!(
                f,
                "invalid wake_lock_timeout_secs: {} (expected 1 to {})",
                secs,
                MAX_WAKE_LOCK_TIMEOUT.as_secs()
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
