//! Application settings: persistence and change notification
//!
//! Settings live in a TOML file under the platform config directory. The
//! [`SettingsStore`] owns the current value and broadcasts every change on a
//! watch channel so listeners can react without polling the file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use directories::ProjectDirs;
use parking_lot::RwLock;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::constants::{
    DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_RATE, DEFAULT_FRAME_WIDTH, DEFAULT_HTTP_PORT,
    DEFAULT_JPEG_QUALITY, PIN_LENGTH,
};
use crate::error::ConfigError;

/// Capture and encoding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamSettings {
    /// Display to capture
    pub display_id: u32,
    /// Target frame rate
    pub frame_rate: u32,
    /// JPEG quality (1-100)
    pub jpeg_quality: u8,
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            display_id: 0,
            frame_rate: DEFAULT_FRAME_RATE,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

/// Address selection and HTTP settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Port the HTTP server binds on every discovered interface
    pub http_port: u16,
    /// Only serve on wireless interfaces
    pub wifi_only: bool,
    /// Include IPv6 addresses
    pub enable_ipv6: bool,
    /// Include loopback addresses
    pub enable_localhost: bool,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            http_port: DEFAULT_HTTP_PORT,
            wifi_only: false,
            enable_ipv6: false,
            enable_localhost: false,
        }
    }
}

/// Stream access control
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySettings {
    /// Require a PIN to view the stream
    pub enable_pin: bool,
    /// Current access PIN
    pub pin: String,
    /// Rotate the PIN every time the stream stops
    pub auto_change_pin: bool,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            enable_pin: false,
            pin: generate_pin(),
            auto_change_pin: false,
        }
    }
}

/// Device behavior settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorSettings {
    /// Stop the stream when the screen turns off
    pub stop_on_sleep: bool,
}

/// All persisted settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub stream: StreamSettings,
    pub network: NetworkSettings,
    pub security: SecuritySettings,
    pub behavior: BehaviorSettings,
}

impl AppSettings {
    /// Load settings from a TOML file; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write settings to a TOML file, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write(e.to_string()))?;
        }
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::Write(e.to_string()))?;
        std::fs::write(path, raw).map_err(|e| ConfigError::Write(e.to_string()))
    }

    /// Default settings file location for this platform
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "lan-screen-streamer")
            .map(|dirs| dirs.config_dir().join("settings.toml"))
    }
}

/// Generate a random numeric access PIN
pub fn generate_pin() -> String {
    let mut rng = rand::thread_rng();
    (0..PIN_LENGTH)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// How a settings change affects the running stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsDelta {
    /// No effect on the running stream
    None,
    /// Stream or security settings changed; the server content must reload
    Stream,
    /// Address selection changed; addresses must be rediscovered
    Network,
}

/// Classify the difference between two settings values
pub fn classify_change(old: &AppSettings, new: &AppSettings) -> SettingsDelta {
    if old.network != new.network {
        SettingsDelta::Network
    } else if old.stream != new.stream || old.security != new.security {
        SettingsDelta::Stream
    } else {
        SettingsDelta::None
    }
}

/// Shared settings store with change notification
pub struct SettingsStore {
    inner: RwLock<AppSettings>,
    path: Option<PathBuf>,
    tx: watch::Sender<AppSettings>,
}

/// Thread-safe handle to the settings store
pub type SharedSettings = Arc<SettingsStore>;

impl SettingsStore {
    /// Create a store around the given settings, persisting to `path` if set.
    pub fn new(settings: AppSettings, path: Option<PathBuf>) -> SharedSettings {
        let (tx, _) = watch::channel(settings.clone());
        Arc::new(Self {
            inner: RwLock::new(settings),
            path,
            tx,
        })
    }

    /// Load settings from `path` (or defaults when `path` is `None`).
    pub fn load_or_default(path: Option<PathBuf>) -> Result<SharedSettings, ConfigError> {
        let settings = match &path {
            Some(p) => AppSettings::load(p)?,
            None => AppSettings::default(),
        };
        Ok(Self::new(settings, path))
    }

    /// Current settings value
    pub fn get(&self) -> AppSettings {
        self.inner.read().clone()
    }

    /// Subscribe to settings changes
    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.tx.subscribe()
    }

    /// Apply a mutation, persist it, and notify subscribers.
    pub fn update(&self, mutate: impl FnOnce(&mut AppSettings)) -> Result<(), ConfigError> {
        let updated = {
            let mut guard = self.inner.write();
            mutate(&mut guard);
            guard.clone()
        };
        if let Some(path) = &self.path {
            updated.save(path)?;
        }
        self.tx.send_replace(updated);
        Ok(())
    }

    /// Rotate the access PIN if auto-rotation is enabled.
    ///
    /// Returns whether a rotation happened. Persistence failures are logged
    /// and do not undo the in-memory rotation.
    pub fn rotate_pin(&self) -> bool {
        let current = self.get();
        if !(current.security.enable_pin && current.security.auto_change_pin) {
            return false;
        }
        let result = self.update(|settings| {
            settings.security.pin = generate_pin();
        });
        if let Err(err) = result {
            tracing::warn!(%err, "failed to persist rotated pin");
        }
        tracing::info!("access pin rotated");
        true
    }
}
