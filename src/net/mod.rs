mod host_resolver;
mod socket_factory;

pub use host_resolver::{prefer_ipv4, DefaultHostResolver, HostResolver};
pub use socket_factory::{DefaultSocketFactory, SocketFactory};
