use crate::rpc::{MethodTable, RpcError};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::sync::Arc;

/// A local implementation that can be published under an interface name.
///
/// Implementors list their callable methods once, at publish time.
pub trait RpcService: Send + Sync + 'static {
    fn interface_name(&self) -> &str;

    fn register_methods(self: Arc<Self>, methods: &mut MethodTable) -> Result<(), RpcError>;
}

/// A published interface and its indexed methods.
pub struct PublishedService {
    methods: MethodTable,
}

impl PublishedService {
    pub fn interface_name(&self) -> &str {
        self.methods.interface_name()
    }

    pub fn methods(&self) -> &MethodTable {
        &self.methods
    }
}

/// Interface name to published implementation, shared by every connection
/// on a provider. Entries are only ever added.
#[derive(Default)]
pub struct ServiceTable {
    services: DashMap<String, Arc<PublishedService>>,
}

impl ServiceTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes `service`'s methods and makes it reachable by interface name.
    pub fn publish(&self, service: Arc<dyn RpcService>) -> Result<Arc<PublishedService>, RpcError> {
        let mut methods = MethodTable::new(service.interface_name());
        service.register_methods(&mut methods)?;
        self.publish_table(methods)
    }

    /// Publishes a hand-built method table.
    pub fn publish_table(&self, methods: MethodTable) -> Result<Arc<PublishedService>, RpcError> {
        match self.services.entry(methods.interface_name().to_string()) {
            Entry::Occupied(slot) => Err(RpcError::Registration(format!(
                "service {} is already published",
                slot.key()
            ))),
            Entry::Vacant(slot) => {
                tracing::info!(
                    service = %methods.interface_name(),
                    methods = methods.len(),
                    "published service"
                );
                let published = Arc::new(PublishedService { methods });
                slot.insert(Arc::clone(&published));
                Ok(published)
            }
        }
    }

    pub fn get(&self, interface_name: &str) -> Option<Arc<PublishedService>> {
        self.services
            .get(interface_name)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub fn interface_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.services.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}
