use crate::constants::DEFAULT_CALL_TIMEOUT;
use crate::{Connection, ConnectionManager, FrameHandler, Transport};
use async_trait::async_trait;
use srpc::frame::{CallEnvelope, CompressType, RequestType, SerializeType};
use srpc::payload::{CallPayload, ReplyStatus};
use srpc::rpc::{CallInvoker, CorrelationTable, RemoteInterface, RpcError, ServiceProxy};
use srpc_registry::{FirstAvailable, LoadBalancer, Registry};
use std::sync::Arc;
use std::time::Duration;

/// Consumer side of the framework: discovers a provider, sends the call and
/// waits for its reply.
///
/// Proxies obtained from [`RpcClient::proxy`] route every method call through
/// [`CallInvoker::invoke`] on this client.
pub struct RpcClient {
    registry: Arc<dyn Registry>,
    load_balancer: Arc<dyn LoadBalancer>,
    connections: ConnectionManager,
    correlation: Arc<CorrelationTable>,
    call_timeout: Duration,
    serialize_type: SerializeType,
    compress_type: CompressType,
}

impl RpcClient {
    pub fn new(registry: Arc<dyn Registry>, transport: Arc<dyn Transport>) -> Self {
        let correlation = Arc::new(CorrelationTable::new());
        let handler = Arc::new(ClientFrameHandler {
            correlation: Arc::clone(&correlation),
        });

        Self {
            registry,
            load_balancer: Arc::new(FirstAvailable),
            connections: ConnectionManager::new(transport, handler),
            correlation,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            serialize_type: SerializeType::default(),
            compress_type: CompressType::default(),
        }
    }

    pub fn with_load_balancer(mut self, load_balancer: Arc<dyn LoadBalancer>) -> Self {
        self.load_balancer = load_balancer;
        self
    }

    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    pub fn with_codec(
        mut self,
        serialize_type: SerializeType,
        compress_type: CompressType,
    ) -> Self {
        self.serialize_type = serialize_type;
        self.compress_type = compress_type;
        self
    }

    /// Builds a typed proxy for interface `T`.
    pub fn proxy<T: RemoteInterface>(self: &Arc<Self>) -> T {
        let invoker: Arc<dyn CallInvoker> = Arc::clone(self) as Arc<dyn CallInvoker>;
        T::from_proxy(ServiceProxy::new(T::INTERFACE_NAME, invoker))
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Number of calls currently waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.correlation.pending_count()
    }
}

#[async_trait]
impl CallInvoker for RpcClient {
    async fn invoke(&self, payload: CallPayload) -> Result<Vec<u8>, RpcError> {
        let service = payload.interface_name.clone();

        let endpoints = self.registry.discover(&service).await?;
        let endpoint = self
            .load_balancer
            .select(&service, &endpoints)
            .ok_or_else(|| RpcError::ServiceUnavailable {
                service: service.clone(),
            })?;

        let connection = self.connections.get_or_connect(endpoint).await?;

        let request_id = self.correlation.next_request_id();
        let envelope = CallEnvelope::call(request_id, payload)
            .with_codec(self.serialize_type, self.compress_type);

        let pending = self.correlation.register(request_id, connection.id())?;

        tracing::debug!(request_id, %endpoint, service = %service, "sending call");

        if let Err(e) = connection.send(&envelope) {
            tracing::warn!(request_id, %endpoint, error = %e, "failed to send call");
            self.correlation.fail(request_id, e);
        }

        let reply = self.correlation.wait(pending, self.call_timeout).await?;

        match reply.status {
            ReplyStatus::Success => Ok(reply.payload),
            status => Err(RpcError::RemoteFault {
                status,
                message: reply.message(),
            }),
        }
    }
}

/// Routes replies on client connections into the correlation table.
struct ClientFrameHandler {
    correlation: Arc<CorrelationTable>,
}

#[async_trait]
impl FrameHandler for ClientFrameHandler {
    async fn on_envelope(&self, connection: &Connection, envelope: CallEnvelope) {
        let request_id = envelope.request_id;

        match envelope.request_type {
            RequestType::Response => match envelope.into_reply() {
                Some(reply) => {
                    if !self.correlation.complete(request_id, reply) {
                        tracing::debug!(request_id, "discarding reply with no pending call");
                    }
                }
                None => {
                    tracing::warn!(
                        request_id,
                        peer = %connection.peer(),
                        "response without reply body"
                    );
                }
            },
            RequestType::Heartbeat => {
                tracing::trace!(request_id, peer = %connection.peer(), "heartbeat acknowledged");
            }
            RequestType::Normal => {
                tracing::warn!(
                    request_id,
                    peer = %connection.peer(),
                    "consumer received a call; ignoring"
                );
            }
        }
    }

    fn on_closed(&self, connection: &Connection) {
        let peer = connection.peer();
        let failed = self
            .correlation
            .fail_connection(connection.id(), |_| RpcError::ConnectionClosed { peer });

        if failed > 0 {
            tracing::warn!(%peer, failed, "connection closed with calls in flight");
        }
    }
}
