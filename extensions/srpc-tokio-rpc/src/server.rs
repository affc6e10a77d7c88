//! Provider-side TCP server.
//!
//! Each accepted socket gets its own reader and writer task. Heartbeats are
//! answered on the reader task; calls are dispatched on spawned tasks bounded
//! by a shared semaphore, so a slow handler never blocks reading.

use crate::constants::{DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CONCURRENT_CALLS};
use crate::{Connection, ConnectionOptions, FrameHandler, spawn_connection};
use async_trait::async_trait;
use dashmap::DashMap;
use srpc::frame::{CallEnvelope, RequestType};
use srpc::payload::{CallReply, ReplyStatus};
use srpc::rpc::{RpcError, ServiceDispatcher, ServiceTable};
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Semaphore;

pub struct RpcServer {
    dispatcher: ServiceDispatcher,
    options: ConnectionOptions,
    permits: Arc<Semaphore>,
    connections: Arc<DashMap<u64, Connection>>,
}

impl RpcServer {
    pub fn new(services: Arc<ServiceTable>) -> Self {
        Self {
            dispatcher: ServiceDispatcher::new(services),
            options: ConnectionOptions {
                idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
                ..ConnectionOptions::default()
            },
            permits: Arc::new(Semaphore::new(DEFAULT_MAX_CONCURRENT_CALLS)),
            connections: Arc::new(DashMap::new()),
        }
    }

    pub fn with_options(mut self, options: ConnectionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_max_concurrent_calls(mut self, max_concurrent_calls: usize) -> Self {
        self.permits = Arc::new(Semaphore::new(max_concurrent_calls.max(1)));
        self
    }

    pub fn services(&self) -> &Arc<ServiceTable> {
        self.dispatcher.services()
    }

    /// Number of currently open client connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Accepts connections on `listener` until `shutdown` resolves, then
    /// closes every open connection.
    pub async fn serve_with_listener<S>(
        self: Arc<Self>,
        listener: TcpListener,
        shutdown: S,
    ) -> io::Result<()>
    where
        S: Future<Output = ()> + Send,
    {
        let address = listener.local_addr()?;
        tracing::info!(%address, "server running");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,

                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };

                    let handler = Arc::new(ServerFrameHandler {
                        dispatcher: self.dispatcher.clone(),
                        permits: Arc::clone(&self.permits),
                        connections: Arc::clone(&self.connections),
                    });

                    match spawn_connection(stream, self.options.clone(), handler) {
                        Ok(connection) => {
                            tracing::info!(
                                %peer,
                                connection_id = connection.id(),
                                "client connected"
                            );
                            self.connections.insert(connection.id(), connection.clone());
                            if !connection.is_active() {
                                self.connections.remove(&connection.id());
                            }
                        }
                        Err(e) => tracing::warn!(%peer, error = %e, "failed to set up connection"),
                    }
                }
            }
        }

        let open: Vec<Connection> = self
            .connections
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        for connection in open {
            connection.close();
        }

        tracing::info!(%address, "server stopped");
        Ok(())
    }
}

struct ServerFrameHandler {
    dispatcher: ServiceDispatcher,
    permits: Arc<Semaphore>,
    connections: Arc<DashMap<u64, Connection>>,
}

#[async_trait]
impl FrameHandler for ServerFrameHandler {
    async fn on_envelope(&self, connection: &Connection, envelope: CallEnvelope) {
        if envelope.request_type == RequestType::Heartbeat {
            if let Err(e) = connection.send(&CallEnvelope::heartbeat(envelope.request_id)) {
                tracing::debug!(peer = %connection.peer(), error = %e, "failed to echo heartbeat");
            }
            return;
        }

        // Acquired here, in receive order, so dispatch starts in receive order
        let Ok(permit) = Arc::clone(&self.permits).acquire_owned().await else {
            return;
        };

        let dispatcher = self.dispatcher.clone();
        let connection = connection.clone();

        tokio::spawn(async move {
            let _permit = permit;
            let request_id = envelope.request_id;

            let Some(response) = dispatcher.dispatch(envelope).await else {
                return;
            };

            match connection.send(&response) {
                Ok(()) => {}
                Err(RpcError::Encode(e)) => {
                    tracing::warn!(request_id, error = %e, "response could not be encoded");
                    let fallback = CallEnvelope::reply_to(
                        &response,
                        CallReply::failure(
                            ReplyStatus::Fault,
                            format!("response could not be encoded: {}", e),
                        ),
                    );
                    let _ = connection.send(&fallback);
                }
                Err(e) => {
                    tracing::debug!(request_id, error = %e, "failed to send response");
                }
            }
        });
    }

    fn on_closed(&self, connection: &Connection) {
        self.connections.remove(&connection.id());
        tracing::info!(peer = %connection.peer(), "client disconnected");
    }
}
