use crate::codec::types::{CodecError, FrameCodec, PacketBuffer, VARINT_MAX_BYTES, VARLONG_MAX_BYTES};
use bytes::{BufMut, BytesMut};
use std::io::Write;
use std::net::UdpSocket;
use tokio_util::codec::Encoder;
use tracing::trace;

impl<'a> Encoder<&'a PacketBuffer> for FrameCodec {
    type Error = CodecError;

    fn encode(&mut self, packet: &'a PacketBuffer, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = i32::try_from(packet.len()).map_err(|_| CodecError::ValueTooBig {
            kind: "frame length",
            value: packet.len() as i64,
        })?;

        dst.reserve(VARINT_MAX_BYTES + packet.len());
        put_varint(dst, length)?;
        dst.put_slice(packet.as_bytes());

        Ok(())
    }
}

impl PacketBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps existing bytes with the cursor at their start.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            buffer: BytesMut::from(bytes),
            head: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Moves the cursor back to the start so the payload can be read again.
    pub fn reset(&mut self) {
        self.head = 0;
    }

    pub fn write_varint(&mut self, value: i32) -> Result<(), CodecError> {
        put_varint(&mut self.buffer, value)
    }

    pub fn write_varlong(&mut self, value: i64) -> Result<(), CodecError> {
        let mut remaining = value as u64;

        for _ in 0..VARLONG_MAX_BYTES {
            if remaining & !0x7F == 0 {
                self.buffer.put_u8(remaining as u8);
                return Ok(());
            }
            self.buffer.put_u8((remaining & 0x7F) as u8 | 0x80);
            remaining >>= 7;
        }

        Err(CodecError::ValueTooBig {
            kind: "varlong",
            value,
        })
    }

    /// Varint byte length followed by the raw bytes. No encoding is enforced.
    pub fn write_utf(&mut self, value: impl AsRef<[u8]>) -> Result<(), CodecError> {
        let value = value.as_ref();
        let length =
            i32::try_from(value.len()).map_err(|_| CodecError::StringTooLong(value.len()))?;

        self.write_varint(length)?;
        self.buffer.put_slice(value);
        Ok(())
    }

    /// Raw bytes followed by a single null terminator.
    pub fn write_ascii(&mut self, value: impl AsRef<[u8]>) {
        self.buffer.put_slice(value.as_ref());
        self.buffer.put_u8(0);
    }

    pub fn write_short(&mut self, value: i16) {
        self.buffer.put_i16(value);
    }

    pub fn write_ushort(&mut self, value: u16) {
        self.buffer.put_u16(value);
    }

    pub fn write_int(&mut self, value: i32) {
        self.buffer.put_i32(value);
    }

    pub fn write_uint(&mut self, value: u32) {
        self.buffer.put_u32(value);
    }

    pub fn write_long(&mut self, value: i64) {
        self.buffer.put_i64(value);
    }

    pub fn write_ulong(&mut self, value: u64) {
        self.buffer.put_u64(value);
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buffer.put_u8(value as u8);
    }

    /// The on-wire representation: varint payload length, then the payload.
    pub fn to_framed_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut framed = BytesMut::new();
        FrameCodec.encode(self, &mut framed)?;
        Ok(framed.to_vec())
    }

    pub fn write_to_stream<W: Write>(&self, stream: &mut W) -> Result<(), CodecError> {
        let framed = self.to_framed_bytes()?;
        trace!(bytes = framed.len(), "writing frame to stream");
        stream.write_all(&framed)?;
        stream.flush()?;
        Ok(())
    }

    /// Sends the frame as one datagram on a connected socket.
    pub fn write_to_datagram(&self, socket: &UdpSocket) -> Result<(), CodecError> {
        let framed = self.to_framed_bytes()?;
        trace!(bytes = framed.len(), "writing frame to datagram");
        socket.send(&framed)?;
        Ok(())
    }
}

fn put_varint(dst: &mut BytesMut, value: i32) -> Result<(), CodecError> {
    let mut remaining = value as u32;

    for _ in 0..VARINT_MAX_BYTES {
        if remaining & !0x7F == 0 {
            dst.put_u8(remaining as u8);
            return Ok(());
        }
        dst.put_u8((remaining & 0x7F) as u8 | 0x80);
        remaining >>= 7;
    }

    Err(CodecError::ValueTooBig {
        kind: "varint",
        value: value as i64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn varint_bytes(value: i32) -> Vec<u8> {
        let mut packet = PacketBuffer::new();
        packet.write_varint(value).unwrap();
        packet.as_bytes().to_vec()
    }

    fn varlong_bytes(value: i64) -> Vec<u8> {
        let mut packet = PacketBuffer::new();
        packet.write_varlong(value).unwrap();
        packet.as_bytes().to_vec()
    }

    #[test]
    fn varint_known_encodings() {
        assert_eq!(varint_bytes(0), [0x00]);
        assert_eq!(varint_bytes(1), [0x01]);
        assert_eq!(varint_bytes(127), [0x7F]);
        assert_eq!(varint_bytes(128), [0x80, 0x01]);
        assert_eq!(varint_bytes(255), [0xFF, 0x01]);
        assert_eq!(varint_bytes(25565), [0xDD, 0xC7, 0x01]);
        assert_eq!(varint_bytes(i32::MAX), [0xFF, 0xFF, 0xFF, 0xFF, 0x07]);
        assert_eq!(varint_bytes(-1), [0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
        assert_eq!(varint_bytes(i32::MIN), [0x80, 0x80, 0x80, 0x80, 0x08]);
    }

    #[test]
    fn negative_values_use_maximum_length() {
        for value in [-1, -2, -128, -25565, i32::MIN] {
            assert_eq!(varint_bytes(value).len(), 5, "varint {value}");
        }
        for value in [-1i64, -300, i64::MIN] {
            assert_eq!(varlong_bytes(value).len(), 10, "varlong {value}");
        }
        assert_eq!(varlong_bytes(i64::MAX).len(), 9);
        assert_eq!(
            varlong_bytes(-1),
            [0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x01]
        );
    }

    #[test]
    fn fixed_width_values_are_big_endian() {
        let mut packet = PacketBuffer::new();
        packet.write_short(0x0102);
        packet.write_ushort(0xFFFE);
        packet.write_int(0x01020304);
        packet.write_uint(0xA0B0C0D0);
        packet.write_long(0x0102030405060708);
        packet.write_ulong(u64::MAX);

        assert_eq!(
            packet.as_bytes(),
            [
                0x01, 0x02, 0xFF, 0xFE, 0x01, 0x02, 0x03, 0x04, 0xA0, 0xB0, 0xC0, 0xD0, 0x01,
                0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF,
                0xFF, 0xFF,
            ]
        );
    }

    #[test]
    fn strings_and_bools() {
        let mut packet = PacketBuffer::new();
        packet.write_utf("hi").unwrap();
        packet.write_ascii("ok");
        packet.write_bool(true);
        packet.write_bool(false);

        assert_eq!(packet.as_bytes(), [0x02, b'h', b'i', b'o', b'k', 0x00, 0x01, 0x00]);
    }

    #[test]
    fn framing_prefixes_payload_length() {
        let mut packet = PacketBuffer::new();
        packet.write_varint(0).unwrap();
        packet.write_long(42);

        let framed = packet.to_framed_bytes().unwrap();
        assert_eq!(framed[0], 9);
        assert_eq!(&framed[1..], packet.as_bytes());

        let empty = PacketBuffer::new().to_framed_bytes().unwrap();
        assert_eq!(empty, [0x00]);
    }

    #[test]
    fn long_payload_uses_multibyte_prefix() {
        let packet = PacketBuffer::from_bytes(&[7u8; 300]);
        let framed = packet.to_framed_bytes().unwrap();
        assert_eq!(&framed[..2], [0xAC, 0x02]);
        assert_eq!(framed.len(), 302);
    }
}
