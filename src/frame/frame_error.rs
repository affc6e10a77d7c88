use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum FrameEncodeError {
    /// The envelope body does not match its request type (e.g. a heartbeat
    /// carrying a payload).
    BodyMismatch,

    /// `parameters` and `parameter_types` differ in length.
    ParameterCountMismatch { types: usize, values: usize },

    /// Encoded frame would exceed `MAX_FRAME_LENGTH`.
    FrameTooLarge(usize),

    Serialize(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FrameDecodeError {
    /// Not enough bytes buffered to form a frame yet.
    Incomplete,

    BadMagic,

    UnsupportedVersion(u8),

    /// Header or total length fields are outside the acceptable range.
    InvalidLength { header_length: usize, total_length: usize },

    UnknownRequestType(u8),

    UnknownSerializeType(u8),

    UnknownCompressType(u8),

    /// Body bytes could not be turned back into a payload or reply.
    MalformedBody(String),

    /// The stream already produced a decode error; no further frames are read.
    ReadAfterCorruption,
}

impl fmt::Display for FrameEncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameEncodeError::BodyMismatch => {
                write!(f, "envelope body does not match request type")
            }
            FrameEncodeError::ParameterCountMismatch { types, values } => write!(
                f,
                "parameter count mismatch: {} types, {} values",
                types, values
            ),
            FrameEncodeError::FrameTooLarge(len) => {
                write!(f, "frame of {} bytes is too large", len)
            }
            FrameEncodeError::Serialize(msg) => write!(f, "serialization failed: {}", msg),
        }
    }
}

impl std::error::Error for FrameEncodeError {}

impl fmt::Display for FrameDecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameDecodeError::Incomplete => write!(f, "incomplete frame"),
            FrameDecodeError::BadMagic => write!(f, "bad magic sequence"),
            FrameDecodeError::UnsupportedVersion(v) => {
                write!(f, "unsupported protocol version {}", v)
            }
            FrameDecodeError::InvalidLength {
                header_length,
                total_length,
            } => write!(
                f,
                "invalid frame lengths: header {} total {}",
                header_length, total_length
            ),
            FrameDecodeError::UnknownRequestType(b) => write!(f, "unknown request type {}", b),
            FrameDecodeError::UnknownSerializeType(b) => write!(f, "unknown serialize type {}", b),
            FrameDecodeError::UnknownCompressType(b) => write!(f, "unknown compress type {}", b),
            FrameDecodeError::MalformedBody(msg) => write!(f, "malformed body: {}", msg),
            FrameDecodeError::ReadAfterCorruption => write!(f, "read after stream corruption"),
        }
    }
}

impl std::error::Error for FrameDecodeError {}
