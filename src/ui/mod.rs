//! Web UI and HTTP streaming server

pub mod handlers;
pub mod server;

pub use server::{stats_channel, ClientInfo, StatsReport, StreamServer, TrafficPoint, WebServer};
