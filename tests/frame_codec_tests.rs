use srpc::constants::{
    FRAME_COMPRESS_TYPE_OFFSET, FRAME_HEADER_LENGTH, FRAME_HEADER_LENGTH_OFFSET,
    FRAME_REQUEST_ID_OFFSET, FRAME_SERIALIZE_TYPE_OFFSET, FRAME_TIMESTAMP_OFFSET,
    FRAME_TOTAL_LENGTH_OFFSET, MAX_FRAME_LENGTH,
};
use srpc::frame::{
    CallEnvelope, CompressType, EnvelopeBody, FrameCodec, FrameDecodeError, FrameEncodeError,
    RequestType, SerializeType,
};
use srpc::payload::{CallPayload, CallReply, ReplyStatus};

fn hello_payload() -> CallPayload {
    CallPayload {
        interface_name: "com.example.Greeter".to_string(),
        method_name: "hello".to_string(),
        parameter_types: vec!["alloc::string::String".to_string()],
        parameters: vec![bitcode::encode("Ada")],
        return_type: "alloc::string::String".to_string(),
    }
}

#[test]
fn call_envelope_round_trips() {
    let envelope = CallEnvelope::call(42, hello_payload());

    let bytes = FrameCodec::encode(&envelope).expect("encode failed");
    let decoded = FrameCodec::decode(&bytes).expect("decode failed");

    assert_eq!(decoded, envelope);
}

#[test]
fn reply_envelope_round_trips() {
    let request = CallEnvelope::call(7, hello_payload());
    let envelope = CallEnvelope::reply_to(
        &request,
        CallReply::failure(ReplyStatus::MethodNotFound, "no such method"),
    );

    let bytes = FrameCodec::encode(&envelope).expect("encode failed");
    let decoded = FrameCodec::decode(&bytes).expect("decode failed");

    assert_eq!(decoded.request_id, 7);
    assert_eq!(decoded.request_type, RequestType::Response);
    assert_eq!(decoded, envelope);
    assert_eq!(
        decoded.into_reply().map(|r| r.message()).as_deref(),
        Some("no such method")
    );
}

#[test]
fn heartbeat_has_no_body() {
    let envelope = CallEnvelope::heartbeat(9);

    let bytes = FrameCodec::encode(&envelope).expect("encode failed");
    assert_eq!(bytes.len(), FRAME_HEADER_LENGTH);

    let decoded = FrameCodec::decode(&bytes).expect("decode failed");
    assert_eq!(decoded.body, EnvelopeBody::Empty);
    assert_eq!(decoded.request_type, RequestType::Heartbeat);
    assert_eq!(decoded.request_id, 9);
}

#[test]
fn header_fields_are_big_endian_at_fixed_offsets() {
    let mut envelope = CallEnvelope::call(0x0102_0304_0506_0708, hello_payload());
    envelope.timestamp = 0x1112_1314_1516_1718;

    let bytes = FrameCodec::encode(&envelope).expect("encode failed");

    assert_eq!(&bytes[0..4], b"srpc");
    assert_eq!(bytes[4], 1);
    assert_eq!(&bytes[5..7], &(FRAME_HEADER_LENGTH as u16).to_be_bytes());
    assert_eq!(
        &bytes[FRAME_TOTAL_LENGTH_OFFSET..FRAME_TOTAL_LENGTH_OFFSET + 4],
        &(bytes.len() as u32).to_be_bytes()
    );
    assert_eq!(bytes[11], u8::from(RequestType::Normal));
    assert_eq!(bytes[12], u8::from(SerializeType::Bitcode));
    assert_eq!(bytes[13], u8::from(CompressType::None));
    assert_eq!(
        &bytes[FRAME_REQUEST_ID_OFFSET..FRAME_REQUEST_ID_OFFSET + 8],
        &[1, 2, 3, 4, 5, 6, 7, 8]
    );
    assert_eq!(
        &bytes[FRAME_TIMESTAMP_OFFSET..FRAME_TIMESTAMP_OFFSET + 8],
        &[0x11, 0x12, 0x13, 0x14, 0x15, 0x16, 0x17, 0x18]
    );
}

#[test]
fn rejects_bad_magic() {
    let mut bytes = FrameCodec::encode(&CallEnvelope::heartbeat(1)).expect("encode failed");
    bytes[0] = b'x';

    assert_eq!(FrameCodec::decode(&bytes), Err(FrameDecodeError::BadMagic));
}

#[test]
fn rejects_newer_version() {
    let mut bytes = FrameCodec::encode(&CallEnvelope::heartbeat(1)).expect("encode failed");
    bytes[4] = 2;

    assert_eq!(
        FrameCodec::decode(&bytes),
        Err(FrameDecodeError::UnsupportedVersion(2))
    );
}

#[test]
fn rejects_total_length_below_header() {
    let mut bytes = FrameCodec::encode(&CallEnvelope::heartbeat(1)).expect("encode failed");
    bytes[FRAME_TOTAL_LENGTH_OFFSET..FRAME_TOTAL_LENGTH_OFFSET + 4]
        .copy_from_slice(&10u32.to_be_bytes());

    assert!(matches!(
        FrameCodec::decode(&bytes),
        Err(FrameDecodeError::InvalidLength { total_length: 10, .. })
    ));
}

#[test]
fn rejects_unknown_request_type() {
    let mut bytes = FrameCodec::encode(&CallEnvelope::heartbeat(1)).expect("encode failed");
    bytes[11] = 9;

    assert_eq!(
        FrameCodec::decode(&bytes),
        Err(FrameDecodeError::UnknownRequestType(9))
    );
}

#[test]
fn rejects_garbage_body() {
    let mut bytes =
        FrameCodec::encode(&CallEnvelope::call(3, hello_payload())).expect("encode failed");
    for byte in bytes[FRAME_HEADER_LENGTH..].iter_mut() {
        *byte = 0xFF;
    }

    assert!(matches!(
        FrameCodec::decode(&bytes),
        Err(FrameDecodeError::MalformedBody(_))
    ));
}

#[test]
fn short_input_is_incomplete() {
    let bytes =
        FrameCodec::encode(&CallEnvelope::call(3, hello_payload())).expect("encode failed");

    assert_eq!(
        FrameCodec::decode(&bytes[..bytes.len() - 1]),
        Err(FrameDecodeError::Incomplete)
    );
    assert_eq!(FrameCodec::frame_length(&bytes[..8]), Ok(None));
    assert_eq!(FrameCodec::frame_length(&bytes), Ok(Some(bytes.len())));
}

#[test]
fn encode_rejects_parameter_count_mismatch() {
    let mut payload = hello_payload();
    payload.parameters.push(bitcode::encode(&1u32));

    assert_eq!(
        FrameCodec::encode(&CallEnvelope::call(1, payload)),
        Err(FrameEncodeError::ParameterCountMismatch { types: 1, values: 2 })
    );
}

#[test]
fn encode_rejects_heartbeat_with_body() {
    let mut envelope = CallEnvelope::heartbeat(1);
    envelope.body = EnvelopeBody::Call(hello_payload());

    assert_eq!(
        FrameCodec::encode(&envelope),
        Err(FrameEncodeError::BodyMismatch)
    );
}

#[test]
fn encode_rejects_oversized_frames() {
    let mut payload = hello_payload();
    // Varied bytes so the body cannot pack below the limit
    payload.parameters = vec![(0..MAX_FRAME_LENGTH).map(|i| (i * 31 % 251) as u8).collect()];

    assert!(matches!(
        FrameCodec::encode(&CallEnvelope::call(1, payload)),
        Err(FrameEncodeError::FrameTooLarge(_))
    ));
}

#[test]
fn rejects_total_length_above_maximum() {
    let mut bytes = FrameCodec::encode(&CallEnvelope::heartbeat(1)).expect("encode failed");
    let oversized = (MAX_FRAME_LENGTH + 1) as u32;
    bytes[FRAME_TOTAL_LENGTH_OFFSET..FRAME_TOTAL_LENGTH_OFFSET + 4]
        .copy_from_slice(&oversized.to_be_bytes());

    assert_eq!(
        FrameCodec::frame_length(&bytes),
        Err(FrameDecodeError::InvalidLength {
            header_length: FRAME_HEADER_LENGTH,
            total_length: MAX_FRAME_LENGTH + 1,
        })
    );
}

#[test]
fn rejects_header_length_below_fixed_header() {
    let mut bytes = FrameCodec::encode(&CallEnvelope::heartbeat(1)).expect("encode failed");
    bytes[FRAME_HEADER_LENGTH_OFFSET..FRAME_HEADER_LENGTH_OFFSET + 2]
        .copy_from_slice(&20u16.to_be_bytes());

    assert!(matches!(
        FrameCodec::decode(&bytes),
        Err(FrameDecodeError::InvalidLength {
            header_length: 20,
            ..
        })
    ));
}

#[test]
fn rejects_unknown_serialize_type() {
    let mut bytes = FrameCodec::encode(&CallEnvelope::heartbeat(1)).expect("encode failed");
    bytes[FRAME_SERIALIZE_TYPE_OFFSET] = 7;

    assert_eq!(
        FrameCodec::decode(&bytes),
        Err(FrameDecodeError::UnknownSerializeType(7))
    );
}

#[test]
fn rejects_unknown_compress_type() {
    let mut bytes = FrameCodec::encode(&CallEnvelope::heartbeat(1)).expect("encode failed");
    bytes[FRAME_COMPRESS_TYPE_OFFSET] = 5;

    assert_eq!(
        FrameCodec::decode(&bytes),
        Err(FrameDecodeError::UnknownCompressType(5))
    );
}
