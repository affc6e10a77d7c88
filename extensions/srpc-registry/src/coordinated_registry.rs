use crate::constants::{PATH_SEPARATOR, PROVIDER_ROOT_PATH};
use crate::{CoordinationDriver, RegistryError};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::net::SocketAddr;
use std::sync::Arc;

/// Where providers announce themselves and consumers look them up.
#[async_trait]
pub trait Registry: Send + Sync {
    /// Announces `endpoint` as a live provider of `service_name`.
    ///
    /// The announcement lasts as long as the registry's session.
    async fn register(&self, service_name: &str, endpoint: SocketAddr) -> Result<(), RegistryError>;

    /// Currently live providers. An empty set means "no providers", not an error.
    async fn discover(&self, service_name: &str) -> Result<BTreeSet<SocketAddr>, RegistryError>;
}

/// [`Registry`] backed by a coordination-service session.
///
/// Layout: `<root>/<service>` is a persistent node, and each provider is an
/// ephemeral child named `host:port` whose data is the same string.
pub struct CoordinatedRegistry {
    driver: Arc<dyn CoordinationDriver>,
    root_path: String,
}

impl CoordinatedRegistry {
    pub fn new(driver: Arc<dyn CoordinationDriver>) -> Self {
        Self::with_root(driver, PROVIDER_ROOT_PATH)
    }

    pub fn with_root(driver: Arc<dyn CoordinationDriver>, root_path: impl Into<String>) -> Self {
        Self {
            driver,
            root_path: root_path.into(),
        }
    }

    pub fn service_path(&self, service_name: &str) -> Result<String, RegistryError> {
        if service_name.is_empty() || service_name.contains(PATH_SEPARATOR) {
            return Err(RegistryError::InvalidPath(service_name.to_string()));
        }
        Ok(format!("{}{}{}", self.root_path, PATH_SEPARATOR, service_name))
    }

    /// Ends the underlying session, withdrawing every registration made through it.
    pub async fn close(&self) -> Result<(), RegistryError> {
        self.driver.close().await
    }

    async fn ensure_persistent_path(&self, path: &str) -> Result<(), RegistryError> {
        let mut current = String::new();

        for segment in path.split(PATH_SEPARATOR).filter(|s| !s.is_empty()) {
            current.push(PATH_SEPARATOR);
            current.push_str(segment);

            match self.driver.create_persistent(&current).await {
                Ok(()) | Err(RegistryError::NodeExists(_)) => {}
                Err(e) => return Err(e),
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Registry for CoordinatedRegistry {
    async fn register(
        &self,
        service_name: &str,
        endpoint: SocketAddr,
    ) -> Result<(), RegistryError> {
        let service_path = self.service_path(service_name)?;
        self.ensure_persistent_path(&service_path).await?;

        let node_name = endpoint.to_string();
        let node_path = format!("{}{}{}", service_path, PATH_SEPARATOR, node_name);

        match self
            .driver
            .create_ephemeral(&node_path, node_name.as_bytes())
            .await
        {
            Ok(()) | Err(RegistryError::NodeExists(_)) => {
                tracing::info!(service = service_name, %endpoint, "registered provider");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    async fn discover(&self, service_name: &str) -> Result<BTreeSet<SocketAddr>, RegistryError> {
        let service_path = self.service_path(service_name)?;

        let children = match self.driver.children(&service_path).await {
            Ok(children) => children,
            Err(RegistryError::NoNode(_)) => Vec::new(),
            Err(e) => return Err(e),
        };

        let endpoints: BTreeSet<SocketAddr> = children
            .iter()
            .filter_map(|child| match child.parse::<SocketAddr>() {
                Ok(endpoint) => Some(endpoint),
                Err(_) => {
                    tracing::warn!(
                        service = service_name,
                        node = %child,
                        "skipping malformed provider node"
                    );
                    None
                }
            })
            .collect();

        tracing::debug!(
            service = service_name,
            providers = endpoints.len(),
            "discovered providers"
        );
        Ok(endpoints)
    }
}
