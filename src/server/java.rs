use crate::codec::PacketBuffer;
use crate::error::{ProtocolError, Result};
use crate::message_types::{JavaStatusResponse, ServerStatus};
use crate::server::retry::with_retries;
use crate::server::status::parse_java_status;
use crate::server::types::ClientOptions;
use crate::server::{McServer, ServerLocator};
use std::fmt;
use std::io::{Read, Write};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

const HANDSHAKE_ID: i32 = 0x00;
const STATUS_ID: i32 = 0x00;
const PING_ID: i32 = 0x01;
const NEXT_STATE_STATUS: i32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Connected,
    HandshakeSent,
    AwaitingPingReply,
    AwaitingStatusReply,
    Complete,
}

/// One exchange with the server. Never reused across calls.
struct Connection<S> {
    stream: S,
    state: State,
}

impl<S: Read + Write> Connection<S> {
    fn new(stream: S) -> Self {
        Self {
            stream,
            state: State::Connected,
        }
    }

    fn send(&mut self, packet: &PacketBuffer, next: State) -> Result<()> {
        packet.write_to_stream(&mut self.stream)?;
        trace!(from = ?self.state, to = ?next, "sent packet");
        self.state = next;
        Ok(())
    }

    fn receive(&mut self) -> Result<PacketBuffer> {
        let packet = PacketBuffer::read_framed_from_stream(&mut self.stream)?;
        trace!(from = ?self.state, bytes = packet.len(), "received packet");
        self.state = State::Complete;
        Ok(packet)
    }

    /// Declares the target and asks to switch to the status state. The
    /// server does not answer a handshake.
    fn handshake(&mut self, protocol_version: i32, host: &str, port: u16) -> Result<()> {
        debug_assert_eq!(self.state, State::Connected);

        let mut packet = PacketBuffer::new();
        packet.write_varint(HANDSHAKE_ID)?;
        packet.write_varint(protocol_version)?;
        packet.write_utf(host)?;
        packet.write_ushort(port);
        packet.write_varint(NEXT_STATE_STATUS)?;

        self.send(&packet, State::HandshakeSent)
    }
}

fn expect_packet_id(packet: &mut PacketBuffer, expected: i32) -> Result<()> {
    let actual = packet.read_varint()?;
    if actual != expected {
        return Err(ProtocolError::UnexpectedPacketId { expected, actual }.into());
    }
    Ok(())
}

/// A Java Edition server reachable over TCP.
#[derive(Debug, Clone)]
pub struct JavaServer {
    address: SocketAddr,
    host: String,
    options: ClientOptions,
}

impl JavaServer {
    pub const DEFAULT_PORT: u16 = super::DEFAULT_PORT;

    /// A client for `address` that declares the IP itself as its target host.
    pub fn new(address: SocketAddr) -> Self {
        Self::with_options(address, address.ip().to_string(), ClientOptions::default())
    }

    /// `host` is the name sent in the handshake. Proxies use it to route the
    /// connection.
    pub fn with_options(address: SocketAddr, host: impl Into<String>, options: ClientOptions) -> Self {
        Self {
            address,
            host: host.into(),
            options,
        }
    }

    /// Resolves `host[:port]` with the default [`ServerLocator`].
    pub fn lookup(address: &str) -> Result<Self> {
        ServerLocator::default().lookup(address)
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Measures the round trip of a ping packet.
    pub fn ping(&self, timeout: Duration) -> Result<Duration> {
        with_retries(self.options.retries, |attempt| {
            debug!(server = %self, attempt, "pinging");
            self.ping_once(timeout)
        })
    }

    /// Queries the server's status document.
    pub fn status(&self, timeout: Duration) -> Result<JavaStatusResponse> {
        with_retries(self.options.retries, |attempt| {
            debug!(server = %self, attempt, "requesting status");
            self.status_once(timeout)
        })
    }

    fn connect(&self, timeout: Duration) -> Result<Connection<std::net::TcpStream>> {
        let stream = self.options.socket_factory.connect_tcp(self.address, timeout)?;
        let mut connection = Connection::new(stream);
        connection.handshake(self.options.protocol_version, &self.host, self.address.port())?;
        Ok(connection)
    }

    fn ping_once(&self, timeout: Duration) -> Result<Duration> {
        let mut connection = self.connect(timeout)?;

        let token = self.options.rng.next_u64() as i64;
        let mut request = PacketBuffer::new();
        request.write_varint(PING_ID)?;
        request.write_long(token);

        let started = Instant::now();
        connection.send(&request, State::AwaitingPingReply)?;
        let mut reply = connection.receive()?;
        let latency = started.elapsed();

        expect_packet_id(&mut reply, PING_ID)?;
        let received = reply.read_long()?;
        if received != token {
            return Err(ProtocolError::TokenMismatch {
                expected: token,
                received,
            }
            .into());
        }

        Ok(latency)
    }

    fn status_once(&self, timeout: Duration) -> Result<JavaStatusResponse> {
        let mut connection = self.connect(timeout)?;

        let mut request = PacketBuffer::new();
        request.write_varint(STATUS_ID)?;

        let started = Instant::now();
        connection.send(&request, State::AwaitingStatusReply)?;
        let mut reply = connection.receive()?;
        let latency = started.elapsed();

        expect_packet_id(&mut reply, STATUS_ID)?;
        let document = reply.read_utf_bytes()?;
        Ok(parse_java_status(latency, document)?)
    }
}

impl McServer for JavaServer {
    fn ping(&self, timeout: Duration) -> Result<Duration> {
        JavaServer::ping(self, timeout)
    }

    fn status(&self, timeout: Duration) -> Result<ServerStatus> {
        JavaServer::status(self, timeout).map(ServerStatus::from)
    }
}

impl fmt::Display for JavaServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
