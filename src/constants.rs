// Wire format constants. All multi-byte header fields are big-endian.

/// Marker at the start of every frame. A mismatch means a corrupt or foreign peer.
pub const FRAME_MAGIC: [u8; 4] = *b"srpc";

/// Highest protocol version this implementation understands.
pub const FRAME_VERSION: u8 = 1;

pub const FRAME_MAGIC_OFFSET: usize = 0;
pub const FRAME_VERSION_OFFSET: usize = 4;
pub const FRAME_HEADER_LENGTH_OFFSET: usize = 5;

/// Byte offset of the 4-byte total frame length (header + body).
///
/// The framer reads this field to find frame boundaries in a byte stream.
pub const FRAME_TOTAL_LENGTH_OFFSET: usize = 7;
pub const FRAME_TOTAL_LENGTH_SIZE: usize = 4;

pub const FRAME_REQUEST_TYPE_OFFSET: usize = 11;
pub const FRAME_SERIALIZE_TYPE_OFFSET: usize = 12;
pub const FRAME_COMPRESS_TYPE_OFFSET: usize = 13;
pub const FRAME_REQUEST_ID_OFFSET: usize = 14;
pub const FRAME_TIMESTAMP_OFFSET: usize = 22;

/// Size of the fixed header. Written into every frame so the body offset is
/// self-describing.
pub const FRAME_HEADER_LENGTH: usize = 30;

/// Upper bound on `totalLength`. Anything larger is treated as corrupt.
pub const MAX_FRAME_LENGTH: usize = 1024 * 1024;
