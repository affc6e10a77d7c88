use crate::frame::{FrameDecodeError, FrameEncodeError};
use crate::payload::ReplyStatus;
use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::time::Duration;

/// Errors surfaced by the call path, from building a request to resolving its reply.
#[derive(Debug)]
pub enum RpcError {
    /// The outgoing envelope could not be encoded.
    Encode(FrameEncodeError),

    /// A frame or payload from the peer could not be decoded. Connection-fatal
    /// when raised by the transport.
    Protocol(FrameDecodeError),

    /// Discovery returned no providers for the service.
    ServiceUnavailable { service: String },

    Connect {
        endpoint: SocketAddr,
        source: io::Error,
    },

    /// The connection carrying the call closed before a reply arrived.
    ConnectionClosed { peer: SocketAddr },

    Timeout { request_id: u64, after: Duration },

    /// The provider answered with a non-success status.
    RemoteFault {
        status: ReplyStatus,
        message: String,
    },

    /// The coordination service failed an operation.
    Registry(Box<dyn std::error::Error + Send + Sync>),

    DuplicateRequestId(u64),

    /// A service or method could not be added to a provider's tables.
    Registration(String),

    /// A typed call was issued through a proxy for a different interface.
    InterfaceMismatch {
        proxy: String,
        method: &'static str,
        interface: &'static str,
    },

    /// The pending call was dropped without ever being resolved.
    Aborted,

    /// An operation needs a component that was never configured.
    NotConfigured(&'static str),

    InvalidConfig(String),

    Io(io::Error),
}

impl fmt::Display for RpcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcError::Encode(e) => write!(f, "encode error: {}", e),
            RpcError::Protocol(e) => write!(f, "protocol error: {}", e),
            RpcError::ServiceUnavailable { service } => {
                write!(f, "no provider available for service {}", service)
            }
            RpcError::Connect { endpoint, source } => {
                write!(f, "failed to connect to {}: {}", endpoint, source)
            }
            RpcError::ConnectionClosed { peer } => write!(f, "connection to {} closed", peer),
            RpcError::Timeout { request_id, after } => {
                write!(f, "request {} timed out after {:?}", request_id, after)
            }
            RpcError::RemoteFault { status, message } => {
                write!(f, "remote fault ({:?}): {}", status, message)
            }
            RpcError::Registry(e) => write!(f, "registry error: {}", e),
            RpcError::DuplicateRequestId(id) => write!(f, "request id {} is already pending", id),
            RpcError::Registration(msg) => write!(f, "registration failed: {}", msg),
            RpcError::InterfaceMismatch {
                proxy,
                method,
                interface,
            } => write!(
                f,
                "method {}.{} called through a proxy for {}",
                interface, method, proxy
            ),
            RpcError::Aborted => write!(f, "RPC call aborted"),
            RpcError::NotConfigured(what) => write!(f, "{} is not configured", what),
            RpcError::InvalidConfig(msg) => write!(f, "invalid configuration: {}", msg),
            RpcError::Io(e) => write!(f, "I/O error: {}", e),
        }
    }
}

impl std::error::Error for RpcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RpcError::Encode(e) => Some(e),
            RpcError::Protocol(e) => Some(e),
            RpcError::Connect { source, .. } => Some(source),
            RpcError::Registry(e) => Some(e.as_ref()),
            RpcError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FrameEncodeError> for RpcError {
    fn from(e: FrameEncodeError) -> Self {
        RpcError::Encode(e)
    }
}

impl From<FrameDecodeError> for RpcError {
    fn from(e: FrameDecodeError) -> Self {
        RpcError::Protocol(e)
    }
}

impl From<io::Error> for RpcError {
    fn from(e: io::Error) -> Self {
        RpcError::Io(e)
    }
}
