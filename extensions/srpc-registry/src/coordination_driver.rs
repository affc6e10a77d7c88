use crate::{RegistryConfig, RegistryError};
use async_trait::async_trait;
use std::sync::Arc;

/// One session to a hierarchical coordination service.
///
/// Paths are absolute and `/`-separated. Ephemeral nodes belong to the
/// session that created them and disappear when it ends.
#[async_trait]
pub trait CoordinationDriver: Send + Sync {
    /// Fails with [`RegistryError::NodeExists`] if the node is already present.
    async fn create_persistent(&self, path: &str) -> Result<(), RegistryError>;

    async fn create_ephemeral(&self, path: &str, data: &[u8]) -> Result<(), RegistryError>;

    async fn exists(&self, path: &str) -> Result<bool, RegistryError>;

    /// Names (not full paths) of the node's direct children.
    async fn children(&self, path: &str) -> Result<Vec<String>, RegistryError>;

    /// Ends the session, removing its ephemeral nodes.
    async fn close(&self) -> Result<(), RegistryError>;
}

/// Opens driver sessions from a registry address.
#[async_trait]
pub trait DriverConnector: Send + Sync {
    async fn connect(
        &self,
        config: &RegistryConfig,
    ) -> Result<Arc<dyn CoordinationDriver>, RegistryError>;
}
