mod decoder;
mod encoder;
mod types;

pub use types::{CodecError, FrameCodec, PacketBuffer, MAX_DATAGRAM_SIZE};
