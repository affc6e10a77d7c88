use crate::{Connection, FrameHandler, Transport};
use async_trait::async_trait;
use dashmap::DashMap;
use srpc::frame::CallEnvelope;
use srpc::rpc::RpcError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Cache of outbound connections keyed by remote endpoint.
///
/// Connections are opened lazily and replaced once observed inactive. A
/// per-endpoint lock serializes first-time connects, so concurrent callers
/// share one connection instead of racing to open several. Calls to
/// different endpoints never contend.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    handler: Arc<dyn FrameHandler>,
    connections: Arc<DashMap<SocketAddr, Connection>>,
    connect_locks: DashMap<SocketAddr, Arc<Mutex<()>>>,
}

impl ConnectionManager {
    pub fn new(transport: Arc<dyn Transport>, handler: Arc<dyn FrameHandler>) -> Self {
        Self {
            transport,
            handler,
            connections: Arc::new(DashMap::new()),
            connect_locks: DashMap::new(),
        }
    }

    /// Returns the cached connection to `endpoint`, connecting if there is
    /// none or the cached one is no longer active.
    ///
    /// Connect failures are returned as-is; there is no retry.
    pub async fn get_or_connect(&self, endpoint: SocketAddr) -> Result<Connection, RpcError> {
        if let Some(connection) = self.cached(endpoint) {
            return Ok(connection);
        }

        let lock = Arc::clone(self.connect_locks.entry(endpoint).or_default().value());
        let _guard = lock.lock().await;

        if let Some(connection) = self.cached(endpoint) {
            return Ok(connection);
        }

        let handler = Arc::new(EvictingHandler {
            endpoint,
            inner: Arc::clone(&self.handler),
            connections: Arc::clone(&self.connections),
        });

        let connection = self.transport.connect(endpoint, handler).await?;
        tracing::info!(%endpoint, connection_id = connection.id(), "connected to provider");

        self.connections.insert(endpoint, connection.clone());
        Ok(connection)
    }

    /// The active cached connection to `endpoint`, if any.
    pub fn cached(&self, endpoint: SocketAddr) -> Option<Connection> {
        let existing = self
            .connections
            .get(&endpoint)
            .map(|entry| entry.value().clone())?;

        if existing.is_active() {
            return Some(existing);
        }

        self.connections
            .remove_if(&endpoint, |_, current| current.id() == existing.id());
        None
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Closes and forgets every cached connection.
    pub fn close_all(&self) {
        let connections: Vec<Connection> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.connections.clear();

        for connection in connections {
            connection.close();
        }
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Removes a connection from the cache when it closes, then forwards to the
/// wrapped handler.
struct EvictingHandler {
    endpoint: SocketAddr,
    inner: Arc<dyn FrameHandler>,
    connections: Arc<DashMap<SocketAddr, Connection>>,
}

#[async_trait]
impl FrameHandler for EvictingHandler {
    async fn on_envelope(&self, connection: &Connection, envelope: CallEnvelope) {
        self.inner.on_envelope(connection, envelope).await;
    }

    fn on_closed(&self, connection: &Connection) {
        let evicted = self
            .connections
            .remove_if(&self.endpoint, |_, current| current.id() == connection.id())
            .is_some();

        if evicted {
            tracing::debug!(
                endpoint = %self.endpoint,
                connection_id = connection.id(),
                "evicted closed connection"
            );
        }

        self.inner.on_closed(connection);
    }
}
