//! Round-robin rotation over the configured nameservers.

use crate::types::{Result, ScanError};
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Ordered, non-empty nameserver list with a single shared rotation
/// cursor. `next()` is called concurrently by the resolution workers,
/// the WHOIS stage, and the recon stage; the atomic fetch-add keeps the
/// cycle strict under that interleaving.
#[derive(Debug)]
pub struct NameserverPool {
    servers: Vec<IpAddr>,
    cursor: AtomicUsize,
}

impl NameserverPool {
    pub fn new(servers: Vec<IpAddr>) -> Result<Self> {
        if servers.is_empty() {
            return Err(ScanError::ConfigError(
                "at least one nameserver is required".to_string(),
            ));
        }
        Ok(Self {
            servers,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Parse a list of nameserver address strings.
    pub fn parse(addresses: &[String]) -> Result<Self> {
        let servers = addresses
            .iter()
            .map(|a| {
                a.trim().parse::<IpAddr>().map_err(|_| {
                    ScanError::ConfigError(format!("invalid nameserver address: {a}"))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(servers)
    }

    /// Next nameserver in the cycle.
    pub fn next(&self) -> IpAddr {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.servers[i % self.servers.len()]
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
