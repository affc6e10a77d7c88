use crate::{
    constants::{
        FRAME_COMPRESS_TYPE_OFFSET, FRAME_HEADER_LENGTH, FRAME_HEADER_LENGTH_OFFSET, FRAME_MAGIC,
        FRAME_MAGIC_OFFSET, FRAME_REQUEST_ID_OFFSET, FRAME_REQUEST_TYPE_OFFSET,
        FRAME_SERIALIZE_TYPE_OFFSET, FRAME_TIMESTAMP_OFFSET, FRAME_TOTAL_LENGTH_OFFSET,
        FRAME_TOTAL_LENGTH_SIZE, FRAME_VERSION, FRAME_VERSION_OFFSET, MAX_FRAME_LENGTH,
    },
    frame::{
        CallEnvelope, CompressType, EnvelopeBody, FrameDecodeError, FrameEncodeError, RequestType,
        SerializeType,
    },
    payload::{compressor_for, serializer_for},
};

/// Converts [`CallEnvelope`]s to and from their wire representation.
///
/// A frame is a 30-byte big-endian header followed by the serialized, then
/// compressed, body:
///
/// ```text
/// magic(4) version(1) headerLength(2) totalLength(4) requestType(1)
/// serializeType(1) compressType(1) requestId(8) timestamp(8) | body
/// ```
///
/// `totalLength` covers header and body and is the only field a stream framer
/// needs to find frame boundaries.
pub struct FrameCodec;

impl FrameCodec {
    /// Encodes an envelope into a single frame.
    ///
    /// Fails if the body does not agree with the request type, if a call's
    /// parameter lists differ in length, or if the frame would exceed
    /// `MAX_FRAME_LENGTH`.
    pub fn encode(envelope: &CallEnvelope) -> Result<Vec<u8>, FrameEncodeError> {
        let body = Self::encode_body(envelope)?;

        let mut buf = Vec::with_capacity(FRAME_HEADER_LENGTH + body.len());
        buf.extend_from_slice(&FRAME_MAGIC);
        buf.push(FRAME_VERSION);
        buf.extend_from_slice(&(FRAME_HEADER_LENGTH as u16).to_be_bytes());

        // Patched once the body is in place
        buf.extend_from_slice(&[0u8; FRAME_TOTAL_LENGTH_SIZE]);

        buf.push(envelope.request_type.into());
        buf.push(envelope.serialize_type.into());
        buf.push(envelope.compress_type.into());
        buf.extend_from_slice(&envelope.request_id.to_be_bytes());
        buf.extend_from_slice(&envelope.timestamp.to_be_bytes());
        buf.extend_from_slice(&body);

        let total_length = buf.len();
        if total_length > MAX_FRAME_LENGTH {
            return Err(FrameEncodeError::FrameTooLarge(total_length));
        }

        buf[FRAME_TOTAL_LENGTH_OFFSET..FRAME_TOTAL_LENGTH_OFFSET + FRAME_TOTAL_LENGTH_SIZE]
            .copy_from_slice(&(total_length as u32).to_be_bytes());

        Ok(buf)
    }

    fn encode_body(envelope: &CallEnvelope) -> Result<Vec<u8>, FrameEncodeError> {
        let serializer = serializer_for(envelope.serialize_type);
        let compressor = compressor_for(envelope.compress_type);

        match (envelope.request_type, &envelope.body) {
            (RequestType::Heartbeat, EnvelopeBody::Empty) => Ok(Vec::new()),
            (RequestType::Normal, EnvelopeBody::Call(payload)) => {
                if !payload.is_well_formed() {
                    return Err(FrameEncodeError::ParameterCountMismatch {
                        types: payload.parameter_types.len(),
                        values: payload.parameters.len(),
                    });
                }
                compressor.compress(serializer.serialize_call(payload)?)
            }
            (RequestType::Response, EnvelopeBody::Reply(reply)) => {
                compressor.compress(serializer.serialize_reply(reply)?)
            }
            _ => Err(FrameEncodeError::BodyMismatch),
        }
    }

    /// Inspects the start of `buf` and reports the length of the frame it
    /// begins with.
    ///
    /// Returns `Ok(None)` while too few bytes are available to decide. The
    /// magic sequence is checked as soon as it is available so a foreign peer
    /// is rejected without waiting for a full header.
    pub fn frame_length(buf: &[u8]) -> Result<Option<usize>, FrameDecodeError> {
        let magic_len = buf.len().saturating_sub(FRAME_MAGIC_OFFSET).min(FRAME_MAGIC.len());
        if buf[FRAME_MAGIC_OFFSET..FRAME_MAGIC_OFFSET + magic_len] != FRAME_MAGIC[..magic_len] {
            return Err(FrameDecodeError::BadMagic);
        }

        if buf.len() < FRAME_TOTAL_LENGTH_OFFSET + FRAME_TOTAL_LENGTH_SIZE {
            return Ok(None);
        }

        let version = buf[FRAME_VERSION_OFFSET];
        if version == 0 || version > FRAME_VERSION {
            return Err(FrameDecodeError::UnsupportedVersion(version));
        }

        let header_length = read_u16(buf, FRAME_HEADER_LENGTH_OFFSET)? as usize;
        let total_length = read_u32(buf, FRAME_TOTAL_LENGTH_OFFSET)? as usize;

        if header_length < FRAME_HEADER_LENGTH
            || total_length < header_length
            || total_length > MAX_FRAME_LENGTH
        {
            return Err(FrameDecodeError::InvalidLength {
                header_length,
                total_length,
            });
        }

        Ok(Some(total_length))
    }

    /// Decodes exactly one frame from the start of `buf`.
    ///
    /// Trailing bytes past `totalLength` are ignored. Returns
    /// [`FrameDecodeError::Incomplete`] if `buf` holds less than one frame.
    pub fn decode(buf: &[u8]) -> Result<CallEnvelope, FrameDecodeError> {
        let total_length = Self::frame_length(buf)?.ok_or(FrameDecodeError::Incomplete)?;
        if buf.len() < total_length {
            return Err(FrameDecodeError::Incomplete);
        }

        let header_length = read_u16(buf, FRAME_HEADER_LENGTH_OFFSET)? as usize;

        let request_type = RequestType::try_from(buf[FRAME_REQUEST_TYPE_OFFSET])
            .map_err(|e| FrameDecodeError::UnknownRequestType(e.number))?;
        let serialize_type = SerializeType::try_from(buf[FRAME_SERIALIZE_TYPE_OFFSET])
            .map_err(|e| FrameDecodeError::UnknownSerializeType(e.number))?;
        let compress_type = CompressType::try_from(buf[FRAME_COMPRESS_TYPE_OFFSET])
            .map_err(|e| FrameDecodeError::UnknownCompressType(e.number))?;
        let request_id = read_u64(buf, FRAME_REQUEST_ID_OFFSET)?;
        let timestamp = read_u64(buf, FRAME_TIMESTAMP_OFFSET)?;

        // Newer minor revisions may extend the header; skip what we don't know
        let body_bytes = &buf[header_length..total_length];

        let body = match request_type {
            RequestType::Heartbeat => EnvelopeBody::Empty,
            RequestType::Normal => {
                let raw = compressor_for(compress_type).decompress(body_bytes)?;
                let payload = serializer_for(serialize_type).deserialize_call(&raw)?;
                if !payload.is_well_formed() {
                    return Err(FrameDecodeError::MalformedBody(format!(
                        "{} parameter types but {} parameters",
                        payload.parameter_types.len(),
                        payload.parameters.len()
                    )));
                }
                EnvelopeBody::Call(payload)
            }
            RequestType::Response => {
                let raw = compressor_for(compress_type).decompress(body_bytes)?;
                EnvelopeBody::Reply(serializer_for(serialize_type).deserialize_reply(&raw)?)
            }
        };

        Ok(CallEnvelope {
            request_id,
            request_type,
            serialize_type,
            compress_type,
            timestamp,
            body,
        })
    }
}

fn read_u16(buf: &[u8], offset: usize) -> Result<u16, FrameDecodeError> {
    buf.get(offset..offset + 2)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u16::from_be_bytes)
        .ok_or(FrameDecodeError::Incomplete)
}

fn read_u32(buf: &[u8], offset: usize) -> Result<u32, FrameDecodeError> {
    buf.get(offset..offset + 4)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u32::from_be_bytes)
        .ok_or(FrameDecodeError::Incomplete)
}

fn read_u64(buf: &[u8], offset: usize) -> Result<u64, FrameDecodeError> {
    buf.get(offset..offset + 8)
        .and_then(|bytes| bytes.try_into().ok())
        .map(u64::from_be_bytes)
        .ok_or(FrameDecodeError::Incomplete)
}
