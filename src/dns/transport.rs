use crate::dns::message::{encode_query, peek_header};
use crate::error::ResolutionError;
use crate::net::{DefaultSocketFactory, SocketFactory};
use crate::rng::SharedRng;
use derive_builder::Builder;
use hickory_proto::op::MessageType;
use hickory_proto::rr::RecordType;
use hickory_resolver::config::ResolverConfig;
use hickory_resolver::system_conf::read_system_conf;
use std::io::{self, ErrorKind, Read, Write};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

const DNS_PORT: u16 = 53;
const UDP_RESPONSE_SIZE: usize = 4096;

/// Sends one DNS query and returns the raw response message.
///
/// Implementations report transport failures only; interpreting the
/// response (including its response code) is left to the caller.
pub trait DnsTransport: Send + Sync + std::fmt::Debug {
    fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<u8>, ResolutionError>;
}

/// Queries the configured name servers over UDP, retrying over TCP when the
/// answer comes back truncated.
#[derive(Debug, Clone, Builder)]
#[builder(setter(into))]
pub struct UdpDnsTransport {
    #[builder(default = "system_nameservers()")]
    pub nameservers: Vec<SocketAddr>,
    #[builder(default = "Duration::from_secs(5)")]
    pub timeout: Duration,
    #[builder(default = "DefaultSocketFactory::arc()")]
    pub socket_factory: Arc<dyn SocketFactory>,
    #[builder(default)]
    pub rng: SharedRng,
}

impl UdpDnsTransport {
    pub fn new() -> Self {
        Self {
            nameservers: system_nameservers(),
            timeout: Duration::from_secs(5),
            socket_factory: DefaultSocketFactory::arc(),
            rng: SharedRng::global(),
        }
    }

    pub fn builder() -> UdpDnsTransportBuilder {
        UdpDnsTransportBuilder::default()
    }

    pub fn arc() -> Arc<dyn DnsTransport> {
        Arc::new(Self::new())
    }

    fn query_udp(&self, server: SocketAddr, query: &[u8], id: u16) -> io::Result<Vec<u8>> {
        let bind_addr = match server.ip() {
            IpAddr::V4(_) => SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0)),
            IpAddr::V6(_) => SocketAddr::from((Ipv6Addr::UNSPECIFIED, 0)),
        };
        let socket = self.socket_factory.bind_udp(bind_addr, self.timeout)?;
        socket.connect(server)?;
        socket.send(query)?;

        let deadline = Instant::now() + self.timeout;
        let mut buf = vec![0u8; UDP_RESPONSE_SIZE];
        loop {
            let received = socket.recv(&mut buf)?;
            let header = peek_header(&buf[..received]);
            match header {
                Some(header)
                    if header.id() == id && header.message_type() == MessageType::Response =>
                {
                    buf.truncate(received);
                    return Ok(buf);
                }
                _ => trace!(%server, received, "ignoring unrelated datagram"),
            }
            if Instant::now() >= deadline {
                return Err(io::Error::new(ErrorKind::TimedOut, "no matching DNS response"));
            }
        }
    }

    fn query_tcp(&self, server: SocketAddr, query: &[u8], id: u16) -> io::Result<Vec<u8>> {
        let mut stream = self.socket_factory.connect_tcp(server, self.timeout)?;

        let length = u16::try_from(query.len())
            .map_err(|_| io::Error::new(ErrorKind::InvalidInput, "DNS query too long"))?;
        stream.write_all(&length.to_be_bytes())?;
        stream.write_all(query)?;

        let mut length = [0u8; 2];
        stream.read_exact(&mut length)?;
        let mut response = vec![0u8; usize::from(u16::from_be_bytes(length))];
        stream.read_exact(&mut response)?;

        match peek_header(&response) {
            Some(header) if header.id() == id => Ok(response),
            _ => Err(io::Error::new(
                ErrorKind::InvalidData,
                "DNS response over TCP does not match the query",
            )),
        }
    }
}

impl Default for UdpDnsTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl DnsTransport for UdpDnsTransport {
    fn query(&self, name: &str, record_type: RecordType) -> Result<Vec<u8>, ResolutionError> {
        let id = self.rng.next_u16();
        let query = encode_query(id, name, record_type).map_err(|reason| {
            ResolutionError::InvalidName {
                name: name.to_string(),
                reason,
            }
        })?;

        let mut last_error =
            io::Error::new(ErrorKind::NotFound, "no name servers configured");

        for &server in &self.nameservers {
            debug!(%server, name, ?record_type, "sending DNS query");
            let response = match self.query_udp(server, &query, id) {
                Ok(response) => response,
                Err(error) => {
                    warn!(%server, name, %error, "DNS query failed");
                    last_error = error;
                    continue;
                }
            };

            let truncated = peek_header(&response).is_some_and(|h| h.truncated());
            if !truncated {
                return Ok(response);
            }

            debug!(%server, name, "UDP answer truncated, retrying over TCP");
            match self.query_tcp(server, &query, id) {
                Ok(response) => return Ok(response),
                Err(error) => {
                    warn!(%server, name, %error, "DNS query over TCP failed");
                    last_error = error;
                }
            }
        }

        Err(ResolutionError::QueryFailed {
            name: name.to_string(),
            source: last_error,
        })
    }
}

/// Name servers from the system resolver configuration, or the local stub
/// resolver when none can be read.
pub fn system_nameservers() -> Vec<SocketAddr> {
    match read_system_conf() {
        Ok((config, _)) => {
            let nameservers = unique_nameservers(&config);
            if !nameservers.is_empty() {
                return nameservers;
            }
            debug!("system resolver configuration lists no name servers, using localhost");
        }
        Err(error) => {
            debug!(%error, "could not read system resolver configuration, using localhost")
        }
    }
    vec![SocketAddr::from((Ipv4Addr::LOCALHOST, DNS_PORT))]
}

// The configuration lists every server once per protocol.
fn unique_nameservers(config: &ResolverConfig) -> Vec<SocketAddr> {
    let mut nameservers: Vec<SocketAddr> = Vec::new();
    for server in config.name_servers() {
        if !nameservers.contains(&server.socket_addr) {
            nameservers.push(server.socket_addr);
        }
    }
    nameservers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::message::tests::{response, srv_rdata};
    use std::net::{TcpListener, UdpSocket};
    use std::thread;

    #[test]
    fn nameservers_are_listed_once() {
        let nameservers = unique_nameservers(&ResolverConfig::google());
        assert_eq!(nameservers.len(), 4);
        assert_eq!(nameservers[0], "8.8.8.8:53".parse::<SocketAddr>().unwrap());
        assert!(nameservers.iter().all(|addr| addr.port() == DNS_PORT));
    }

    #[test]
    fn system_nameservers_are_never_empty() {
        assert!(!system_nameservers().is_empty());
    }

    fn transport(server: SocketAddr) -> UdpDnsTransport {
        UdpDnsTransport::builder()
            .nameservers(vec![server])
            .timeout(Duration::from_secs(2))
            .rng(SharedRng::seeded(3))
            .build()
            .unwrap()
    }

    #[test]
    fn udp_query_returns_matching_response() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = server.local_addr().unwrap();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (len, peer) = server.recv_from(&mut buf).unwrap();
            let mut answer = response(0, &[(33, srv_rdata(1, 1, 25565, "mc.example.com"))]);
            answer[..2].copy_from_slice(&buf[..2]);
            // A stray datagram with the wrong id is skipped by the client.
            let mut stray = answer.clone();
            stray[0] ^= 0xFF;
            server.send_to(&stray, peer).unwrap();
            server.send_to(&answer, peer).unwrap();
            (buf[..len].to_vec(), answer)
        });

        let received = transport(addr).query("_minecraft._tcp.example.com", RecordType::SRV).unwrap();
        let (query, answer) = handle.join().unwrap();
        assert_eq!(received, answer);
        assert_eq!(&query[query.len() - 4..], [0, 33, 0, 1]);
    }

    /// Answers the UDP query with TC set, then serves the TCP retry. The
    /// TCP answer's id is the query's id XOR `id_mask`.
    fn truncating_server(id_mask: u16) -> (SocketAddr, thread::JoinHandle<Vec<u8>>) {
        let udp = UdpSocket::bind("127.0.0.1:0").unwrap();
        let addr = udp.local_addr().unwrap();
        let tcp = TcpListener::bind(addr).unwrap();

        let handle = thread::spawn(move || {
            let mut buf = [0u8; 512];
            let (_, peer) = udp.recv_from(&mut buf).unwrap();
            let mut truncated = response(0, &[]);
            truncated[..2].copy_from_slice(&buf[..2]);
            truncated[2] |= 0x02;
            udp.send_to(&truncated, peer).unwrap();

            let (mut stream, _) = tcp.accept().unwrap();
            let mut length = [0u8; 2];
            stream.read_exact(&mut length).unwrap();
            let mut query = vec![0u8; usize::from(u16::from_be_bytes(length))];
            stream.read_exact(&mut query).unwrap();

            let id = u16::from_be_bytes([query[0], query[1]]) ^ id_mask;
            let mut full = response(0, &[(33, srv_rdata(1, 1, 25565, "mc.example.com"))]);
            full[..2].copy_from_slice(&id.to_be_bytes());
            stream.write_all(&(full.len() as u16).to_be_bytes()).unwrap();
            stream.write_all(&full).unwrap();
            full
        });
        (addr, handle)
    }

    #[test]
    fn truncated_udp_answer_falls_back_to_tcp() {
        let (addr, handle) = truncating_server(0);
        let received = transport(addr).query("_minecraft._tcp.example.com", RecordType::SRV).unwrap();
        assert_eq!(received, handle.join().unwrap());
    }

    #[test]
    fn tcp_answer_with_wrong_id_is_rejected() {
        let (addr, handle) = truncating_server(0xFFFF);
        let error = transport(addr)
            .query("_minecraft._tcp.example.com", RecordType::SRV)
            .unwrap_err();
        handle.join().unwrap();

        match error {
            ResolutionError::QueryFailed { source, .. } => {
                assert_eq!(source.kind(), ErrorKind::InvalidData)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn invalid_name_is_rejected_before_sending() {
        let error = transport("127.0.0.1:9".parse().unwrap())
            .query("bad..name", RecordType::SRV)
            .unwrap_err();
        assert!(matches!(error, ResolutionError::InvalidName { .. }));
    }

    #[test]
    fn no_nameservers_is_a_query_failure() {
        let transport = UdpDnsTransport::builder().nameservers(Vec::new()).build().unwrap();
        let error = transport.query("example.com", RecordType::SRV).unwrap_err();
        assert!(matches!(error, ResolutionError::QueryFailed { .. }));
    }
}
