use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::str::FromStr;

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum RequestType {
    Normal = 0,
    Heartbeat = 1,
    Response = 2,
}

/// Codec used for the frame body.
///
/// Only `Bitcode` ships built in; new codecs get a new discriminant and a
/// matching `PayloadSerializer`.
#[repr(u8)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum SerializeType {
    #[default]
    Bitcode = 1,
}

#[repr(u8)]
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum CompressType {
    #[default]
    None = 0,
}

impl FromStr for SerializeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitcode" => Ok(SerializeType::Bitcode),
            other => Err(format!("unknown serialization codec: {}", other)),
        }
    }
}

impl FromStr for CompressType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "none" | "" => Ok(CompressType::None),
            other => Err(format!("unknown compression: {}", other)),
        }
    }
}
