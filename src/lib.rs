//! Blocking client for querying Minecraft Java Edition servers.
//!
//! ```no_run
//! use mcstatus::{JavaServer, McServer};
//!
//! let server = JavaServer::lookup("mc.example.com")?;
//! let status = server.status_default()?;
//! println!("{} players online", status.common().players.online);
//! # Ok::<(), mcstatus::Error>(())
//! ```

pub mod codec;
pub mod dns;
pub mod error;
pub mod message_types;
pub mod net;
pub mod rng;
pub mod server;

// Re-export commonly used items for convenience
pub use codec::{CodecError, FrameCodec, PacketBuffer};
pub use dns::{SrvRecord, SrvRecords, SrvResolver};
pub use error::{Error, ProtocolError, ResolutionError, Result};
pub use message_types::{
    JavaPlayer, JavaStatusResponse, ServerStatus, StatusPlayers, StatusResponse, StatusVersion,
};
pub use rng::SharedRng;
pub use server::{
    parse_port, ClientOptions, JavaServer, LocatorOptions, McServer, ServerLocator, DEFAULT_PORT,
    DEFAULT_TIMEOUT,
};
