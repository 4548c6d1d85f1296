use crate::dns::{DnsTransport, UdpDnsTransport};
use crate::net::{DefaultHostResolver, DefaultSocketFactory, HostResolver, SocketFactory};
use crate::rng::SharedRng;
use derive_builder::Builder;
use std::sync::Arc;

/// Protocol revision 47 (1.8), the last one before the handshake changed.
pub const LEGACY_PROTOCOL_VERSION: i32 = 47;

pub const DEFAULT_RETRIES: usize = 3;

/// Settings shared by every request a client makes.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct ClientOptions {
    /// Attempts per `ping` or `status` call, each on a fresh connection.
    #[builder(default = "DEFAULT_RETRIES")]
    pub retries: usize,
    #[builder(default = "LEGACY_PROTOCOL_VERSION")]
    pub protocol_version: i32,
    #[builder(default = "DefaultSocketFactory::arc()")]
    pub socket_factory: Arc<dyn SocketFactory>,
    #[builder(default)]
    pub rng: SharedRng,
}

impl ClientOptions {
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            protocol_version: LEGACY_PROTOCOL_VERSION,
            socket_factory: DefaultSocketFactory::arc(),
            rng: SharedRng::global(),
        }
    }
}

/// How [`ServerLocator`](super::ServerLocator) turns an address string into a
/// client.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct LocatorOptions {
    #[builder(default = "super::DEFAULT_PORT")]
    pub default_port: u16,
    #[builder(default = "String::from(\"minecraft\")")]
    pub srv_service: String,
    #[builder(default = "String::from(\"tcp\")")]
    pub srv_protocol: String,
    #[builder(default = "DefaultHostResolver::arc()")]
    pub host_resolver: Arc<dyn HostResolver>,
    #[builder(default = "UdpDnsTransport::arc()")]
    pub dns_transport: Arc<dyn DnsTransport>,
    #[builder(default)]
    pub client: ClientOptions,
}

impl LocatorOptions {
    pub fn builder() -> LocatorOptionsBuilder {
        LocatorOptionsBuilder::default()
    }
}

impl Default for LocatorOptions {
    fn default() -> Self {
        Self {
            default_port: super::DEFAULT_PORT,
            srv_service: String::from("minecraft"),
            srv_protocol: String::from("tcp"),
            host_resolver: DefaultHostResolver::arc(),
            dns_transport: UdpDnsTransport::arc(),
            client: ClientOptions::default(),
        }
    }
}
