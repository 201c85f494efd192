//! Error types for the screen streaming application

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum Error {
    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Screen capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Display not found: {0}")]
    DisplayNotFound(u32),

    #[error("Capture grant is no longer valid")]
    GrantInvalid,

    #[error("Failed to start capture: {0}")]
    StartFailed(String),

    #[error("Frame source failed: {0}")]
    SourceFailed(String),
}

/// Image codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Invalid JPEG quality: {0} (expected 1..=100)")]
    InvalidQuality(u8),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Invalid frame dimensions: {0}x{1}")]
    InvalidDimensions(u32, u32),
}

/// HTTP server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {reason}")]
    BindFailed { addr: String, reason: String },

    #[error("No interface to bind")]
    NoInterfaces,
}

/// Network discovery errors
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Failed to enumerate network interfaces: {0}")]
    Enumeration(String),
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings: {0}")]
    Read(String),

    #[error("Failed to parse settings: {0}")]
    Parse(String),

    #[error("Failed to write settings: {0}")]
    Write(String),
}

/// The one error surfaced through the public snapshot.
///
/// Fixable errors are user-actionable and clearable through error recovery;
/// fatal errors cannot be cleared from inside the engine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    #[error(transparent)]
    Fixable(#[from] FixableError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl AppError {
    /// Whether this error is recoverable by user action
    pub fn is_fixable(&self) -> bool {
        matches!(self, AppError::Fixable(_))
    }
}

/// User-actionable errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FixableError {
    #[error("No usable network address found")]
    AddressNotFound,

    #[error("Address already in use: {0}")]
    AddressInUse(String),

    #[error("Screen capture could not be started: {0}")]
    CaptureStart(String),
}

/// Errors the engine cannot recover from on its own
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("Event queue exhausted")]
    EventQueueFull,

    #[error("Internal dispatch failure: {0}")]
    Dispatch(String),
}

impl From<ServerError> for AppError {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::BindFailed { addr, .. } => {
                AppError::Fixable(FixableError::AddressInUse(addr))
            }
            ServerError::NoInterfaces => AppError::Fatal(FatalError::Dispatch(err.to_string())),
        }
    }
}

impl From<CaptureError> for AppError {
    fn from(err: CaptureError) -> Self {
        AppError::Fixable(FixableError::CaptureStart(err.to_string()))
    }
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, Error>;
