mod call_payload;
mod compressor;
mod serializer;

pub use call_payload::{CallPayload, CallReply, ReplyStatus};
pub use compressor::{Compressor, NoCompression, compressor_for};
pub use serializer::{BitcodeSerializer, PayloadSerializer, serializer_for};
