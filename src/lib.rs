//! # LAN Screen Streamer
//!
//! Low-latency screen streaming to browser clients over HTTP.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                            DEVICE                                │
//! │                                                                  │
//! │  listeners                     lifecycle engine (engine::)       │
//! │  ┌──────────────┐   events    ┌───────────────────────────────┐  │
//! │  │ connectivity ├────────────►│  bounded queue ──► one loop   │  │
//! │  │ settings     │             │  StreamState + transitions    │  │
//! │  │ web page     │             └──────┬──────────────┬─────────┘  │
//! │  └──────────────┘                    │ side effects │ snapshots  │
//! │                                      ▼              ▼            │
//! │  ┌─────────────┐  RGB frames  ┌────────────┐   ┌──────────┐     │
//! │  │ capture     ├─────────────►│ frame hub  │   │ observer │     │
//! │  │ session     │   (JPEG)     │ (latest)   │   └──────────┘     │
//! │  └─────────────┘              └─────┬──────┘                    │
//! │  ┌─────────────┐                    │                           │
//! │  │ status      ├────────────────────┤                           │
//! │  │ glyphs      │                    ▼                           │
//! │  └─────────────┘              ┌────────────┐                    │
//! │                               │ HTTP (ui::)│ MJPEG + control    │
//! │                               └─────┬──────┘                    │
//! └─────────────────────────────────────┼───────────────────────────┘
//!                                       │ HTTP over LAN
//!                                       ▼
//!                                 browser clients
//! ```
//!
//! All lifecycle decisions are made by the `engine` module: events from
//! listeners, the web page, and collaborators are serialized through one
//! bounded queue and processed by a single consumer loop that owns the
//! mutable stream state.

pub mod capture;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod network;
pub mod ui;

pub use error::{Error, Result};

/// Application-wide constants
pub mod constants {
    use std::time::Duration;

    /// Capacity of the engine event queue
    pub const EVENT_QUEUE_CAPACITY: usize = 32;

    /// Address discovery retries before giving up
    pub const DISCOVERY_MAX_ATTEMPTS: u32 = 3;

    /// Delay between address discovery retries
    pub const DISCOVERY_RETRY_DELAY: Duration = Duration::from_secs(1);

    /// Number of frames in a status glyph pulse
    pub const SIGNAL_FRAME_COUNT: usize = 3;

    /// Spacing between status glyph pulse frames
    pub const SIGNAL_FRAME_INTERVAL: Duration = Duration::from_millis(250);

    /// Default HTTP port for the stream server
    pub const DEFAULT_HTTP_PORT: u16 = 8080;

    /// Default capture frame rate
    pub const DEFAULT_FRAME_RATE: u32 = 15;

    /// Default JPEG quality
    pub const DEFAULT_JPEG_QUALITY: u8 = 80;

    /// Default frame width
    pub const DEFAULT_FRAME_WIDTH: u32 = 1280;

    /// Default frame height
    pub const DEFAULT_FRAME_HEIGHT: u32 = 720;

    /// Interval between client statistics reports
    pub const STATS_INTERVAL: Duration = Duration::from_secs(1);

    /// Number of traffic samples retained for reporting
    pub const TRAFFIC_HISTORY_LEN: usize = 30;

    /// Interval between connectivity polls
    pub const CONNECTIVITY_POLL_INTERVAL: Duration = Duration::from_secs(5);

    /// Length of the generated access PIN
    pub const PIN_LENGTH: usize = 6;

    /// Capacity of the statistics side channel
    pub const STATS_CHANNEL_CAPACITY: usize = 8;
}
