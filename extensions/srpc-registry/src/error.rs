use srpc::rpc::RpcError;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    NodeExists(String),
    NoNode(String),
    /// Ephemeral nodes cannot have children.
    EphemeralParent(String),
    InvalidPath(String),
    /// The session to the coordination service has been closed or expired.
    SessionClosed,
    InvalidConnectString(String),
    /// Failure reported by a concrete coordination-service driver.
    Driver(String),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::NodeExists(path) => write!(f, "node {} already exists", path),
            RegistryError::NoNode(path) => write!(f, "node {} does not exist", path),
            RegistryError::EphemeralParent(path) => {
                write!(f, "ephemeral node {} cannot have children", path)
            }
            RegistryError::InvalidPath(path) => write!(f, "invalid node path {:?}", path),
            RegistryError::SessionClosed => write!(f, "coordination session is closed"),
            RegistryError::InvalidConnectString(s) => {
                write!(f, "invalid registry address {:?}, expected scheme://host:port", s)
            }
            RegistryError::Driver(msg) => write!(f, "coordination driver error: {}", msg),
        }
    }
}

impl std::error::Error for RegistryError {}

impl From<RegistryError> for RpcError {
    fn from(err: RegistryError) -> Self {
        RpcError::Registry(Box::new(err))
    }
}
