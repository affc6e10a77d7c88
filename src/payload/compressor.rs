use crate::frame::{CompressType, FrameDecodeError, FrameEncodeError};

/// Compression applied to a serialized frame body.
pub trait Compressor: Send + Sync {
    fn compress(&self, bytes: Vec<u8>) -> Result<Vec<u8>, FrameEncodeError>;

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, FrameDecodeError>;
}

/// Identity compressor.
pub struct NoCompression;

impl Compressor for NoCompression {
    fn compress(&self, bytes: Vec<u8>) -> Result<Vec<u8>, FrameEncodeError> {
        Ok(bytes)
    }

    fn decompress(&self, bytes: &[u8]) -> Result<Vec<u8>, FrameDecodeError> {
        Ok(bytes.to_vec())
    }
}

static NO_COMPRESSION: NoCompression = NoCompression;

pub fn compressor_for(compress_type: CompressType) -> &'static dyn Compressor {
    match compress_type {
        CompressType::None => &NO_COMPRESSION,
    }
}
