//! Network interface discovery
//!
//! Enumerates the addresses the HTTP server can bind, filtered by the
//! network settings (wireless-only, IPv6, loopback).

use std::net::IpAddr;

use serde::Serialize;

use crate::config::NetworkSettings;
use crate::error::DiscoveryError;

/// A usable network interface address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NetInterface {
    /// Interface name (e.g. `wlan0`)
    pub name: String,
    /// Address the server can bind
    pub address: IpAddr,
}

/// Filters applied when enumerating interfaces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceFilter {
    pub wifi_only: bool,
    pub enable_ipv6: bool,
    pub enable_localhost: bool,
}

impl From<&NetworkSettings> for InterfaceFilter {
    fn from(settings: &NetworkSettings) -> Self {
        Self {
            wifi_only: settings.wifi_only,
            enable_ipv6: settings.enable_ipv6,
            enable_localhost: settings.enable_localhost,
        }
    }
}

/// Enumerates usable network interfaces
pub trait NetworkDiscovery: Send {
    /// List interfaces matching the filter. Synchronous and side-effect-free.
    fn list_interfaces(&self, filter: &InterfaceFilter)
        -> Result<Vec<NetInterface>, DiscoveryError>;
}

/// System-backed discovery via the OS interface table
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemDiscovery;

impl NetworkDiscovery for SystemDiscovery {
    fn list_interfaces(
        &self,
        filter: &InterfaceFilter,
    ) -> Result<Vec<NetInterface>, DiscoveryError> {
        let addrs =
            if_addrs::get_if_addrs().map_err(|e| DiscoveryError::Enumeration(e.to_string()))?;
        let raw = addrs.into_iter().map(|itf| {
            let address = itf.ip();
            RawInterface {
                name: itf.name,
                address,
            }
        });
        Ok(apply_filter(raw, filter))
    }
}

/// An interface candidate before filtering
pub(crate) struct RawInterface {
    pub(crate) name: String,
    pub(crate) address: IpAddr,
}

/// Wireless interface name prefixes across common platforms
const WIRELESS_PREFIXES: &[&str] = &["wlan", "wlp", "wlx", "ap", "swlan", "wifi", "en0"];

pub(crate) fn is_wireless_name(name: &str) -> bool {
    WIRELESS_PREFIXES
        .iter()
        .any(|prefix| name.starts_with(prefix))
}

pub(crate) fn apply_filter(
    raw: impl IntoIterator<Item = RawInterface>,
    filter: &InterfaceFilter,
) -> Vec<NetInterface> {
    let mut interfaces: Vec<NetInterface> = raw
        .into_iter()
        .filter(|itf| filter.enable_localhost || !itf.address.is_loopback())
        .filter(|itf| filter.enable_ipv6 || itf.address.is_ipv4())
        .filter(|itf| !filter.wifi_only || is_wireless_name(&itf.name))
        .filter(|itf| match itf.address {
            // Link-local v6 addresses are not reachable without a scope id
            IpAddr::V6(v6) => (v6.segments()[0] & 0xffc0) != 0xfe80,
            IpAddr::V4(_) => true,
        })
        .map(|itf| NetInterface {
            name: itf.name,
            address: itf.address,
        })
        .collect();
    // Stable order so change detection compares like with like
    interfaces.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.address.cmp(&b.address)));
    interfaces
}
