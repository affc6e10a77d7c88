use crate::frame::FrameDecodeError;
use crate::payload::CallPayload;
use crate::rpc::{CallParameters, RemoteMethod, RpcError};
use async_trait::async_trait;
use std::sync::Arc;

/// Carries a call payload to a provider and returns the encoded result.
///
/// The network client implements this; tests can substitute an in-process
/// invoker.
#[async_trait]
pub trait CallInvoker: Send + Sync {
    async fn invoke(&self, payload: CallPayload) -> Result<Vec<u8>, RpcError>;
}

/// Client-side stand-in for a remote interface.
///
/// Every call is turned into a [`CallPayload`] and handed to the invoker.
/// Typed adapters wrap a proxy and expose one method per [`RemoteMethod`].
#[derive(Clone)]
pub struct ServiceProxy {
    interface_name: String,
    invoker: Arc<dyn CallInvoker>,
}

impl ServiceProxy {
    pub fn new(interface_name: impl Into<String>, invoker: Arc<dyn CallInvoker>) -> Self {
        Self {
            interface_name: interface_name.into(),
            invoker,
        }
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// Untyped call: arguments are already encoded and positionally matched
    /// to `parameter_types`.
    pub async fn invoke(
        &self,
        method_name: &str,
        parameter_types: Vec<String>,
        parameters: Vec<Vec<u8>>,
        return_type: String,
    ) -> Result<Vec<u8>, RpcError> {
        let payload = CallPayload {
            interface_name: self.interface_name.clone(),
            method_name: method_name.to_string(),
            parameter_types,
            parameters,
            return_type,
        };

        self.invoker.invoke(payload).await
    }

    /// Typed call. `M` must belong to this proxy's interface.
    pub async fn call<M: RemoteMethod>(&self, input: M::Input) -> Result<M::Output, RpcError> {
        if M::INTERFACE_NAME != self.interface_name {
            return Err(RpcError::InterfaceMismatch {
                proxy: self.interface_name.clone(),
                method: M::METHOD_NAME,
                interface: M::INTERFACE_NAME,
            });
        }

        let bytes = self
            .invoke(
                M::METHOD_NAME,
                M::parameter_types(),
                input.encode_parameters(),
                M::return_type(),
            )
            .await?;

        bitcode::decode::<M::Output>(&bytes)
            .map_err(|e| RpcError::Protocol(FrameDecodeError::MalformedBody(e.to_string())))
    }
}

/// A typed client adapter for one remote interface.
pub trait RemoteInterface: Sized {
    const INTERFACE_NAME: &'static str;

    fn from_proxy(proxy: ServiceProxy) -> Self;
}
