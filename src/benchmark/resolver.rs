//! Hostname resolution primitive
//!
//! Workers treat resolution as an opaque blocking call: only success or
//! failure matters, the returned addresses are discarded.

use std::net::ToSocketAddrs;

use tracing::trace;

use crate::utils::ResolutionError;

/// Blocking, possibly failing hostname lookup
pub trait Resolver: Send + Sync {
    fn resolve(&self, host: &str) -> Result<(), ResolutionError>;
}

/// System resolver backed by `getaddrinfo`
///
/// Honors the host's resolver configuration (/etc/hosts, resolv.conf, nsswitch).
/// There is no timeout on the call.
#[derive(Clone, Debug, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

impl Resolver for SystemResolver {
    fn resolve(&self, host: &str) -> Result<(), ResolutionError> {
        let mut addrs =
            (host, 0u16)
                .to_socket_addrs()
                .map_err(|source| ResolutionError::LookupFailed {
                    host: host.to_string(),
                    source,
                })?;

        match addrs.next() {
            Some(addr) => {
                trace!(host, %addr, "resolved");
                Ok(())
            }
            None => Err(ResolutionError::NoAddresses(host.to_string())),
        }
    }
}
