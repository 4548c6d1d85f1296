//! Java Edition server clients and the address lookup that produces them.

mod java;
mod locator;
mod retry;
mod status;
mod types;

use crate::error::Result;
use crate::message_types::ServerStatus;
use std::fmt;
use std::time::Duration;

pub use java::JavaServer;
pub use locator::{parse_port, ServerLocator};
pub use types::{
    ClientOptions, ClientOptionsBuilder, LocatorOptions, LocatorOptionsBuilder, DEFAULT_RETRIES,
    LEGACY_PROTOCOL_VERSION,
};

pub const DEFAULT_PORT: u16 = 25565;

/// Used by [`McServer::ping_default`] and [`McServer::status_default`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(3);

/// A server that can be pinged and asked for its status.
///
/// Every call opens its own connection, so implementations can be shared
/// between threads.
pub trait McServer: fmt::Display + fmt::Debug + Send + Sync {
    /// Round-trip latency of a ping exchange.
    fn ping(&self, timeout: Duration) -> Result<Duration>;

    fn status(&self, timeout: Duration) -> Result<ServerStatus>;

    fn ping_default(&self) -> Result<Duration> {
        self.ping(DEFAULT_TIMEOUT)
    }

    fn status_default(&self) -> Result<ServerStatus> {
        self.status(DEFAULT_TIMEOUT)
    }
}
