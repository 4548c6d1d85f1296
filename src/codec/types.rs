use bytes::BytesMut;

/// Largest payload a single UDP datagram can carry.
pub const MAX_DATAGRAM_SIZE: usize = 65507;

pub(crate) const VARINT_MAX_BYTES: usize = 5;
pub(crate) const VARLONG_MAX_BYTES: usize = 10;

/// A single protocol packet: a byte payload plus a read cursor.
///
/// Writes always append to the end of the payload, reads advance the cursor.
/// The cursor never moves past the end of the payload; reading beyond it
/// yields [`CodecError::Underrun`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PacketBuffer {
    pub(crate) buffer: BytesMut,
    pub(crate) head: usize,
}

/// Splits a byte stream into varint length-prefixed frames.
#[derive(Debug, Default)]
pub struct FrameCodec;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected end of buffer while reading {context}: needed {needed} bytes, {remaining} remaining")]
    Underrun {
        context: &'static str,
        needed: usize,
        remaining: usize,
    },

    #[error("Received {kind} is too big (more than {max_bytes} bytes)")]
    VarIntTooBig { kind: &'static str, max_bytes: usize },

    #[error("Invalid length prefix {length} while reading {context}")]
    InvalidLength { context: &'static str, length: i32 },

    #[error("The value {value} is too big to send in a {kind}")]
    ValueTooBig { kind: &'static str, value: i64 },

    #[error("String of {0} bytes is too long to send")]
    StringTooLong(usize),
}

impl CodecError {
    /// True when more input might turn this failure into a success.
    pub fn is_underrun(&self) -> bool {
        matches!(self, CodecError::Underrun { .. })
    }

    /// True for failures raised while producing bytes rather than reading them.
    pub fn is_encoding(&self) -> bool {
        matches!(
            self,
            CodecError::ValueTooBig { .. } | CodecError::StringTooLong(_)
        )
    }
}
