use crate::codec::types::{
    CodecError, FrameCodec, PacketBuffer, MAX_DATAGRAM_SIZE, VARINT_MAX_BYTES, VARLONG_MAX_BYTES,
};
use bytes::{Buf, BytesMut};
use std::cell::RefCell;
use std::io::{self, ErrorKind, Read};
use std::net::UdpSocket;
use tokio_util::codec::Decoder;
use tracing::trace;

const READ_CHUNK_SIZE: usize = 4096;

thread_local! {
    // Reused across packets so stream and datagram reads don't allocate per frame.
    static SCRATCH: RefCell<BytesMut> = RefCell::new(BytesMut::with_capacity(READ_CHUNK_SIZE));
}

impl Decoder for FrameCodec {
    type Item = PacketBuffer;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }

        match frame_bounds(src) {
            Ok((header_len, payload_len)) => {
                let packet = PacketBuffer::from_bytes(&src[header_len..header_len + payload_len]);
                src.advance(header_len + payload_len);
                Ok(Some(packet))
            }
            Err(error) if error.is_underrun() => Ok(None),
            Err(error) => Err(error),
        }
    }
}

/// Locates the payload of the frame at the start of `src`.
///
/// Returns the size of the length prefix and the size of the payload.
fn frame_bounds(src: &[u8]) -> Result<(usize, usize), CodecError> {
    let mut prefix = PacketBuffer::from_bytes(&src[..src.len().min(VARINT_MAX_BYTES)]);
    let length = prefix.read_varint()?;
    let header_len = prefix.head;

    let payload_len = usize::try_from(length).map_err(|_| CodecError::InvalidLength {
        context: "frame",
        length,
    })?;

    let remaining = src.len() - header_len;
    if payload_len > remaining {
        return Err(CodecError::Underrun {
            context: "frame",
            needed: payload_len,
            remaining,
        });
    }

    Ok((header_len, payload_len))
}

impl PacketBuffer {
    /// True once the cursor has consumed the whole payload.
    pub fn eof(&self) -> bool {
        self.head >= self.buffer.len()
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.head
    }

    fn take(&mut self, needed: usize, context: &'static str) -> Result<&[u8], CodecError> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(CodecError::Underrun {
                context,
                needed,
                remaining,
            });
        }

        let start = self.head;
        self.head += needed;
        Ok(&self.buffer[start..self.head])
    }

    fn next_byte(&mut self, context: &'static str) -> Result<u8, CodecError> {
        Ok(self.take(1, context)?[0])
    }

    pub fn read_varint(&mut self) -> Result<i32, CodecError> {
        let mut result = 0u32;

        for i in 0..VARINT_MAX_BYTES {
            let part = self.next_byte("varint")?;
            result |= u32::from(part & 0x7F) << (7 * i);

            if part & 0x80 == 0 {
                return Ok(result as i32);
            }
        }

        Err(CodecError::VarIntTooBig {
            kind: "varint",
            max_bytes: VARINT_MAX_BYTES,
        })
    }

    pub fn read_varlong(&mut self) -> Result<i64, CodecError> {
        let mut result = 0u64;

        for i in 0..VARLONG_MAX_BYTES {
            let part = self.next_byte("varlong")?;
            result |= u64::from(part & 0x7F) << (7 * i);

            if part & 0x80 == 0 {
                return Ok(result as i64);
            }
        }

        Err(CodecError::VarIntTooBig {
            kind: "varlong",
            max_bytes: VARLONG_MAX_BYTES,
        })
    }

    /// Reads a varint length-prefixed string. Bytes that are not valid UTF-8
    /// are replaced rather than rejected.
    pub fn read_utf(&mut self) -> Result<String, CodecError> {
        let bytes = self.read_utf_bytes()?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// Reads a varint length-prefixed byte string verbatim.
    pub fn read_utf_bytes(&mut self) -> Result<&[u8], CodecError> {
        let length = self.read_varint()?;
        let length = usize::try_from(length).map_err(|_| CodecError::InvalidLength {
            context: "UTF string",
            length,
        })?;

        self.take(length, "UTF string")
    }

    /// Reads up to the next null byte (or the end of the payload) and skips
    /// the terminator.
    pub fn read_ascii(&mut self) -> Result<String, CodecError> {
        let rest = &self.buffer[self.head..];
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let value = String::from_utf8_lossy(&rest[..end]).into_owned();

        self.head = (self.head + end + 1).min(self.buffer.len());
        Ok(value)
    }

    pub fn read_short(&mut self) -> Result<i16, CodecError> {
        Ok(self.take(2, "short")?.get_i16())
    }

    pub fn read_ushort(&mut self) -> Result<u16, CodecError> {
        Ok(self.take(2, "ushort")?.get_u16())
    }

    pub fn read_int(&mut self) -> Result<i32, CodecError> {
        Ok(self.take(4, "int")?.get_i32())
    }

    pub fn read_uint(&mut self) -> Result<u32, CodecError> {
        Ok(self.take(4, "uint")?.get_u32())
    }

    pub fn read_long(&mut self) -> Result<i64, CodecError> {
        Ok(self.take(8, "long")?.get_i64())
    }

    pub fn read_ulong(&mut self) -> Result<u64, CodecError> {
        Ok(self.take(8, "ulong")?.get_u64())
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        Ok(self.next_byte("bool")? != 0)
    }

    /// Parses one frame, returning a packet scoped to exactly its payload.
    /// Any bytes after the frame are ignored.
    pub fn from_framed_bytes(bytes: &[u8]) -> Result<Self, CodecError> {
        let (header_len, payload_len) = frame_bounds(bytes)?;
        Ok(Self::from_bytes(&bytes[header_len..header_len + payload_len]))
    }

    /// Blocks until one complete frame has arrived on `stream`.
    ///
    /// Keeps reading while the accumulated bytes are only a partial frame.
    /// There is no byte or time bound here: the stream's own read timeout is
    /// the only backstop.
    pub fn read_framed_from_stream<R: Read>(stream: &mut R) -> Result<Self, CodecError> {
        SCRATCH.with(|scratch| {
            let mut scratch = scratch.borrow_mut();
            scratch.clear();

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            loop {
                let read = match stream.read(&mut chunk) {
                    Ok(0) => {
                        return Err(CodecError::Io(io::Error::new(
                            ErrorKind::UnexpectedEof,
                            "stream ended before a full packet was received",
                        )))
                    }
                    Ok(read) => read,
                    Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                    Err(error) => return Err(error.into()),
                };
                scratch.extend_from_slice(&chunk[..read]);
                trace!(read, buffered = scratch.len(), "read bytes from stream");

                if let Some(packet) = FrameCodec.decode(&mut scratch)? {
                    return Ok(packet);
                }
            }
        })
    }

    /// Receives one datagram and parses it as a single frame. Frames larger
    /// than one datagram are not supported.
    pub fn read_framed_from_datagram(socket: &UdpSocket) -> Result<Self, CodecError> {
        SCRATCH.with(|scratch| {
            let mut scratch = scratch.borrow_mut();
            scratch.clear();
            scratch.resize(MAX_DATAGRAM_SIZE, 0);

            let received = socket.recv(&mut scratch)?;
            scratch.truncate(received);
            trace!(received, "read datagram");

            Self::from_framed_bytes(&scratch)
        })
    }
}
