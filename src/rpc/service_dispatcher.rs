use crate::frame::{CallEnvelope, EnvelopeBody, RequestType};
use crate::payload::{CallPayload, CallReply, ReplyStatus};
use crate::rpc::ServiceTable;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

/// Provider-side dispatch of decoded envelopes to published services.
///
/// Every `Normal` envelope produces exactly one response envelope with the
/// same request id, whether the call succeeded, faulted, panicked or named
/// an unknown service or method.
#[derive(Clone)]
pub struct ServiceDispatcher {
    services: Arc<ServiceTable>,
}

impl ServiceDispatcher {
    pub fn new(services: Arc<ServiceTable>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &Arc<ServiceTable> {
        &self.services
    }

    /// Handles one inbound envelope and returns the envelope to write back, if any.
    ///
    /// Heartbeats are echoed without touching the service table. Stray
    /// responses are ignored.
    pub async fn dispatch(&self, mut envelope: CallEnvelope) -> Option<CallEnvelope> {
        match envelope.request_type {
            RequestType::Heartbeat => Some(CallEnvelope::heartbeat(envelope.request_id)),
            RequestType::Response => {
                tracing::warn!(
                    request_id = envelope.request_id,
                    "provider received a response envelope; ignoring"
                );
                None
            }
            RequestType::Normal => {
                let reply = match std::mem::replace(&mut envelope.body, EnvelopeBody::Empty) {
                    EnvelopeBody::Call(payload) => self.invoke(payload).await,
                    _ => CallReply::failure(ReplyStatus::Fault, "call envelope without payload"),
                };

                Some(CallEnvelope::reply_to(&envelope, reply))
            }
        }
    }

    /// Resolves and runs the method named by `payload`.
    pub async fn invoke(&self, payload: CallPayload) -> CallReply {
        let Some(service) = self.services.get(&payload.interface_name) else {
            tracing::debug!(service = %payload.interface_name, "service not found");
            return CallReply::failure(
                ReplyStatus::ServiceNotFound,
                format!("service {} is not published", payload.interface_name),
            );
        };

        let Some(handler) = service.methods().resolve(
            &payload.method_name,
            &payload.parameter_types,
            &payload.return_type,
        ) else {
            tracing::debug!(
                service = %payload.interface_name,
                method = %payload.method_name,
                "method not found"
            );
            return CallReply::failure(
                ReplyStatus::MethodNotFound,
                format!(
                    "no method {}({}) -> {} on {}",
                    payload.method_name,
                    payload.parameter_types.join(","),
                    payload.return_type,
                    payload.interface_name
                ),
            );
        };

        let parameters = payload.parameters;
        match AssertUnwindSafe(async move { handler(parameters).await })
            .catch_unwind()
            .await
        {
            Ok(Ok(bytes)) => CallReply::success(bytes),
            Ok(Err(fault)) => CallReply::failure(ReplyStatus::Fault, fault.message),
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!(
                    service = %payload.interface_name,
                    method = %payload.method_name,
                    %message,
                    "handler panicked"
                );
                CallReply::failure(ReplyStatus::Fault, format!("handler panicked: {}", message))
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
