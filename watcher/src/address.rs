//! Local Address Resolution
//!
//! Finds the IPv4 address the hub can use to reach this process when the
//! configured application host is `localhost`. Resolved once per process.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::{OnceLock, PoisonError, RwLock};

use tracing::{debug, warn};

use crate::config::Environment;
use crate::error::WatcherError;

/// Cached local address, shared by every callback URL built in this process.
static LOCAL_ADDRESS: OnceLock<RwLock<Option<Ipv4Addr>>> = OnceLock::new();

fn cache() -> &'static RwLock<Option<Ipv4Addr>> {
    LOCAL_ADDRESS.get_or_init(|| RwLock::new(None))
}

/// Return the cached address, if one has been resolved.
pub fn cached() -> Option<Ipv4Addr> {
    *cache().read().unwrap_or_else(PoisonError::into_inner)
}

/// Replace the cached address.
///
/// Lets tests and embedders pin the address instead of scanning interfaces.
pub fn set_cached(addr: Ipv4Addr) {
    *cache().write().unwrap_or_else(PoisonError::into_inner) = Some(addr);
}

/// Clear the cached address so the next [`resolve`] scans again.
pub fn reset() {
    *cache().write().unwrap_or_else(PoisonError::into_inner) = None;
}

/// Resolve the local address, scanning at most once per process.
///
/// A `LOCAL_IP_ADDRESS` override wins over scanning but must be an IPv4
/// address; anything else is a [`WatcherError::Config`] and is not cached.
/// Two racing first calls may both scan; they compute the same value.
pub fn resolve(environment: &Environment) -> Result<Ipv4Addr, WatcherError> {
    if let Some(addr) = cached() {
        return Ok(addr);
    }

    let addr = resolve_uncached(environment)?;
    debug!(address = %addr, environment = %environment.name, "Resolved local address");
    set_cached(addr);
    Ok(addr)
}

fn resolve_uncached(environment: &Environment) -> Result<Ipv4Addr, WatcherError> {
    if let Some(raw) = &environment.local_ip_override {
        return raw.trim().parse().map_err(|_| {
            WatcherError::Config(format!("LOCAL_IP_ADDRESS is not an IPv4 address: {raw}"))
        });
    }

    let interfaces = if_addrs::get_if_addrs().map_err(|e| {
        warn!(error = %e, "Failed to enumerate network interfaces");
        WatcherError::AddressUnavailable
    })?;

    let candidates = interfaces
        .iter()
        .filter(|iface| !iface.is_loopback())
        .filter_map(|iface| match iface.ip() {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(_) => None,
        });

    select_address(candidates, environment).ok_or(WatcherError::AddressUnavailable)
}

/// Pick an address from interface candidates.
///
/// Loopback and unspecified addresses are skipped. In development a `10.*`
/// address wins over earlier candidates; otherwise the first one is kept.
pub fn select_address(
    candidates: impl IntoIterator<Item = Ipv4Addr>,
    environment: &Environment,
) -> Option<Ipv4Addr> {
    let mut first = None;

    for addr in candidates {
        if addr.is_loopback() || addr.is_unspecified() {
            continue;
        }
        if environment.is_development() && addr.octets()[0] == 10 {
            return Some(addr);
        }
        if first.is_none() {
            first = Some(addr);
        }
    }

    first
}
