use crate::codec::CodecError;
use std::io;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[source] io::Error),

    #[error("Packet encoding error: {0}")]
    Encoding(#[source] CodecError),

    #[error("Packet decoding error: {0}")]
    Decoding(#[source] CodecError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Resolution error: {0}")]
    Resolution(#[from] ResolutionError),
}

impl Error {
    /// Whether a fresh connection attempt could plausibly succeed.
    ///
    /// Resolution failures are the only kind that retrying the same request
    /// cannot fix.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Error::Resolution(_))
    }
}

impl From<CodecError> for Error {
    fn from(value: CodecError) -> Self {
        match value {
            CodecError::Io(error) => Error::Io(error),
            error if error.is_encoding() => Error::Encoding(error),
            error => Error::Decoding(error),
        }
    }
}

impl From<io::Error> for Error {
    fn from(value: io::Error) -> Self {
        Error::Io(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    #[error("Unexpected packet id {actual} (expected {expected})")]
    UnexpectedPacketId { expected: i32, actual: i32 },

    #[error("Ping token mismatch: sent {expected}, received {received}")]
    TokenMismatch { expected: i64, received: i64 },

    #[error("Status response is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Malformed status response: {0}")]
    MalformedStatus(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolutionError {
    #[error("DNS query for {name} failed: {source}")]
    QueryFailed {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error("DNS query for {name} returned response code {rcode}")]
    ResponseCode { name: String, rcode: u16 },

    #[error("Malformed DNS response for {name}: {reason}")]
    MalformedMessage { name: String, reason: &'static str },

    #[error("Invalid DNS name {name:?}: {reason}")]
    InvalidName { name: String, reason: &'static str },

    #[error("No SRV records found")]
    NoRecords,

    #[error("Invalid port in address {input:?}")]
    InvalidPort { input: String },

    #[error("Failed to resolve host {input:?}: {source}")]
    HostLookup {
        input: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resolve host {input:?}: no addresses returned")]
    NoAddresses { input: String },
}
