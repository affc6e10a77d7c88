use crate::frame::{FrameDecodeError, FrameEncodeError, SerializeType};
use crate::payload::{CallPayload, CallReply};

/// Turns call payloads and replies into frame bodies and back.
///
/// Implementations are looked up by the `serializeType` header byte through
/// [`serializer_for`].
pub trait PayloadSerializer: Send + Sync {
    fn serialize_call(&self, payload: &CallPayload) -> Result<Vec<u8>, FrameEncodeError>;

    fn deserialize_call(&self, bytes: &[u8]) -> Result<CallPayload, FrameDecodeError>;

    fn serialize_reply(&self, reply: &CallReply) -> Result<Vec<u8>, FrameEncodeError>;

    fn deserialize_reply(&self, bytes: &[u8]) -> Result<CallReply, FrameDecodeError>;
}

pub struct BitcodeSerializer;

impl PayloadSerializer for BitcodeSerializer {
    fn serialize_call(&self, payload: &CallPayload) -> Result<Vec<u8>, FrameEncodeError> {
        Ok(bitcode::encode(payload))
    }

    fn deserialize_call(&self, bytes: &[u8]) -> Result<CallPayload, FrameDecodeError> {
        bitcode::decode(bytes).map_err(|e| FrameDecodeError::MalformedBody(e.to_string()))
    }

    fn serialize_reply(&self, reply: &CallReply) -> Result<Vec<u8>, FrameEncodeError> {
        Ok(bitcode::encode(reply))
    }

    fn deserialize_reply(&self, bytes: &[u8]) -> Result<CallReply, FrameDecodeError> {
        bitcode::decode(bytes).map_err(|e| FrameDecodeError::MalformedBody(e.to_string()))
    }
}

static BITCODE_SERIALIZER: BitcodeSerializer = BitcodeSerializer;

pub fn serializer_for(serialize_type: SerializeType) -> &'static dyn PayloadSerializer {
    match serialize_type {
        SerializeType::Bitcode => &BITCODE_SERIALIZER,
    }
}
