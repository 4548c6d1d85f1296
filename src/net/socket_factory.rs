use std::io;
use std::net::{SocketAddr, TcpStream, UdpSocket};
use std::sync::Arc;
use std::time::Duration;

/// Opens the sockets used to talk to game servers and name servers.
///
/// Every socket handed out has its read and write timeouts set, so blocking
/// calls on it surface expiry as an `io::Error`.
pub trait SocketFactory: Send + Sync + std::fmt::Debug {
    fn connect_tcp(&self, addr: SocketAddr, timeout: Duration) -> io::Result<TcpStream>;

    fn bind_udp(&self, bind_addr: SocketAddr, timeout: Duration) -> io::Result<UdpSocket>;
}

#[derive(Debug, Clone)]
pub struct DefaultSocketFactory;

impl DefaultSocketFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn arc() -> Arc<dyn SocketFactory> {
        Arc::new(Self::new())
    }
}

impl SocketFactory for DefaultSocketFactory {
    fn connect_tcp(&self, addr: SocketAddr, timeout: Duration) -> io::Result<TcpStream> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    fn bind_udp(&self, bind_addr: SocketAddr, timeout: Duration) -> io::Result<UdpSocket> {
        let socket = UdpSocket::bind(bind_addr)?;
        socket.set_read_timeout(Some(timeout))?;
        socket.set_write_timeout(Some(timeout))?;
        Ok(socket)
    }
}

impl Default for DefaultSocketFactory {
    fn default() -> Self {
        Self::new()
    }
}
