use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::Arc;

/// Forward name resolution: host name to the socket addresses it serves on.
pub trait HostResolver: Send + Sync + std::fmt::Debug {
    fn lookup_host(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>>;
}

/// Resolves through the operating system (`getaddrinfo`).
#[derive(Debug, Clone)]
pub struct DefaultHostResolver;

impl DefaultHostResolver {
    pub fn new() -> Self {
        Self
    }

    pub fn arc() -> Arc<dyn HostResolver> {
        Arc::new(Self::new())
    }
}

impl HostResolver for DefaultHostResolver {
    fn lookup_host(&self, host: &str, port: u16) -> io::Result<Vec<SocketAddr>> {
        Ok((host, port).to_socket_addrs()?.collect())
    }
}

impl Default for DefaultHostResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Picks the first IPv4 address, falling back to the first address of any
/// family.
pub fn prefer_ipv4(addrs: &[SocketAddr]) -> Option<SocketAddr> {
    addrs
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| addrs.first())
        .copied()
}
