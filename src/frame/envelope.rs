use crate::frame::{CompressType, RequestType, SerializeType};
use crate::payload::{CallPayload, CallReply};
use crate::utils::now;

/// One wire-level unit: a fixed header plus an optional body.
///
/// The body variant must agree with `request_type`: `Normal` carries a
/// [`CallPayload`], `Response` carries a [`CallReply`] and `Heartbeat` carries
/// nothing. The constructors below always produce consistent envelopes; the
/// encoder rejects inconsistent ones.
#[derive(Debug, Clone, PartialEq)]
pub struct CallEnvelope {
    /// Correlates a response with the call that caused it.
    pub request_id: u64,
    pub request_type: RequestType,
    pub serialize_type: SerializeType,
    pub compress_type: CompressType,
    /// Creation time in microseconds since the UNIX epoch.
    pub timestamp: u64,
    pub body: EnvelopeBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeBody {
    Empty,
    Call(CallPayload),
    Reply(CallReply),
}

impl CallEnvelope {
    pub fn call(request_id: u64, payload: CallPayload) -> Self {
        Self {
            request_id,
            request_type: RequestType::Normal,
            serialize_type: SerializeType::default(),
            compress_type: CompressType::default(),
            timestamp: now(),
            body: EnvelopeBody::Call(payload),
        }
    }

    pub fn heartbeat(request_id: u64) -> Self {
        Self {
            request_id,
            request_type: RequestType::Heartbeat,
            serialize_type: SerializeType::default(),
            compress_type: CompressType::default(),
            timestamp: now(),
            body: EnvelopeBody::Empty,
        }
    }

    /// Builds the response to `request`, echoing its id and codec choices.
    pub fn reply_to(request: &CallEnvelope, reply: CallReply) -> Self {
        Self {
            request_id: request.request_id,
            request_type: RequestType::Response,
            serialize_type: request.serialize_type,
            compress_type: request.compress_type,
            timestamp: now(),
            body: EnvelopeBody::Reply(reply),
        }
    }

    pub fn with_codec(
        mut self,
        serialize_type: SerializeType,
        compress_type: CompressType,
    ) -> Self {
        self.serialize_type = serialize_type;
        self.compress_type = compress_type;
        self
    }

    pub fn payload(&self) -> Option<&CallPayload> {
        match &self.body {
            EnvelopeBody::Call(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn into_reply(self) -> Option<CallReply> {
        match self.body {
            EnvelopeBody::Reply(reply) => Some(reply),
            _ => None,
        }
    }
}
