mod envelope;
mod envelope_stream_decoder;
mod frame_codec;
mod frame_error;
mod header_types;

pub use envelope::{CallEnvelope, EnvelopeBody};
pub use envelope_stream_decoder::{EnvelopeDecoderIterator, EnvelopeStreamDecoder};
pub use frame_codec::FrameCodec;
pub use frame_error::{FrameDecodeError, FrameEncodeError};
pub use header_types::{CompressType, RequestType, SerializeType};
