use crate::dns::SrvResolver;
use crate::error::{ResolutionError, Result};
use crate::net::prefer_ipv4;
use crate::server::types::LocatorOptions;
use crate::server::JavaServer;
use std::net::{IpAddr, SocketAddr};
use tracing::debug;

/// Turns user supplied `host[:port]` strings into ready-to-use clients.
#[derive(Debug, Clone, Default)]
pub struct ServerLocator {
    options: LocatorOptions,
}

impl ServerLocator {
    pub fn new(options: LocatorOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LocatorOptions {
        &self.options
    }

    /// Resolves `address` to a [`JavaServer`].
    ///
    /// Literal IP addresses are used as given. For host names without an
    /// explicit port the `_minecraft._tcp` SRV record is consulted first; if
    /// that lookup fails for any reason the host is resolved directly on the
    /// default port.
    pub fn lookup(&self, address: &str) -> Result<JavaServer> {
        let client = self.options.client.clone();

        if let Some(literal) = self.literal_address(address)? {
            debug!(address, %literal, "using literal address");
            return Ok(JavaServer::with_options(literal, literal.ip().to_string(), client));
        }

        let (host, port) = split_host_port(address);
        let (host, port) = match port {
            Some(port) => (host.to_string(), parse_nonzero_port(address, port)?),
            None => self
                .srv_target(host)
                .unwrap_or_else(|| (host.to_string(), self.options.default_port)),
        };

        let addrs = self
            .options
            .host_resolver
            .lookup_host(&host, port)
            .map_err(|source| ResolutionError::HostLookup {
                input: address.to_string(),
                source,
            })?;
        let resolved = prefer_ipv4(&addrs).ok_or_else(|| ResolutionError::NoAddresses {
            input: address.to_string(),
        })?;

        debug!(address, host = %host, %resolved, "resolved server");
        Ok(JavaServer::with_options(resolved, host, client))
    }

    /// Consults the SRV record for `host`. Any failure means "no record".
    fn srv_target(&self, host: &str) -> Option<(String, u16)> {
        let resolver = SrvResolver::new(
            self.options.dns_transport.clone(),
            self.options.client.rng.clone(),
        );
        match resolver.lookup(&self.options.srv_service, &self.options.srv_protocol, host) {
            Ok(record) => Some((record.target, record.port)),
            Err(error) => {
                debug!(host, %error, "SRV lookup failed, using plain DNS");
                None
            }
        }
    }

    /// The last-colon split wins when it yields an IP and a decimal port, so
    /// `::1:8080` is `::1` on port 8080. Otherwise the whole input may still
    /// be a bare or bracketed address on the default port.
    fn literal_address(&self, address: &str) -> Result<Option<SocketAddr>> {
        let (host, port) = split_host_port(address);
        let host_ip = port.and_then(|_| strip_brackets(host).parse::<IpAddr>().ok());

        if let (Some(ip), Some(port)) = (host_ip, port) {
            if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) {
                return Ok(Some(SocketAddr::new(ip, parse_nonzero_port(address, port)?)));
            }
        }

        if let Ok(ip) = strip_brackets(address).parse::<IpAddr>() {
            return Ok(Some(SocketAddr::new(ip, self.options.default_port)));
        }

        match (host_ip, port) {
            (Some(ip), Some(port)) => {
                Ok(Some(SocketAddr::new(ip, parse_nonzero_port(address, port)?)))
            }
            _ => Ok(None),
        }
    }
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .unwrap_or(host)
}

/// Splits on the last colon. The port part is returned verbatim.
fn split_host_port(address: &str) -> (&str, Option<&str>) {
    match address.rfind(':') {
        Some(colon) => (&address[..colon], Some(&address[colon + 1..])),
        None => (address, None),
    }
}

fn parse_nonzero_port(input: &str, port: &str) -> Result<u16, ResolutionError> {
    match parse_port(port) {
        0 => Err(ResolutionError::InvalidPort {
            input: input.to_string(),
        }),
        port => Ok(port),
    }
}

/// Parses the leading decimal digits of `port`, ignoring anything after
/// them. Returns 0 when there are no leading digits or the value does not
/// fit in a port number.
pub fn parse_port(port: &str) -> u16 {
    let digits = port.bytes().take_while(u8::is_ascii_digit).count();
    port[..digits].parse().unwrap_or(0)
}
