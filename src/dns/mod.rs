pub mod message;
mod srv;
mod transport;

pub use hickory_proto::rr::RecordType;
pub use srv::{SrvRecord, SrvRecords, SrvResolver};
pub use transport::{system_nameservers, DnsTransport, UdpDnsTransport, UdpDnsTransportBuilder};
