use crate::rpc::{CallParameters, RemoteMethod, RpcError, method_id, method_signature};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Error returned by a provider's method implementation.
///
/// Travels back to the caller as a `Fault` reply carrying `message`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFault {
    pub message: String,
}

impl RemoteFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for RemoteFault {}

impl From<String> for RemoteFault {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for RemoteFault {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Type-erased method implementation: encoded arguments in, encoded return value out.
pub type MethodHandler =
    Arc<dyn Fn(Vec<Vec<u8>>) -> BoxFuture<'static, Result<Vec<u8>, RemoteFault>> + Send + Sync>;

struct MethodEntry {
    signature: String,
    return_type: String,
    handler: MethodHandler,
}

/// Callable methods of one published interface, indexed by signature.
///
/// Built once when a service is published; dispatch is a single hash lookup.
pub struct MethodTable {
    interface_name: String,
    methods: HashMap<u64, MethodEntry>,
}

impl MethodTable {
    pub fn new(interface_name: impl Into<String>) -> Self {
        Self {
            interface_name: interface_name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn interface_name(&self) -> &str {
        &self.interface_name
    }

    /// Registers a typed handler for `M`.
    ///
    /// Fails if `M` belongs to another interface or if a method with the same
    /// signature is already registered.
    pub fn register<M, F, Fut>(&mut self, handler: F) -> Result<&mut Self, RpcError>
    where
        M: RemoteMethod,
        F: Fn(M::Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Output, RemoteFault>> + Send + 'static,
    {
        if M::INTERFACE_NAME != self.interface_name {
            return Err(RpcError::Registration(format!(
                "method {} belongs to {}, not {}",
                M::METHOD_NAME,
                M::INTERFACE_NAME,
                self.interface_name
            )));
        }

        let handler = Arc::new(handler);
        let erased: MethodHandler = Arc::new(move |parameters: Vec<Vec<u8>>| {
            let handler = Arc::clone(&handler);
            async move {
                let input = M::Input::decode_parameters(&parameters)
                    .map_err(|e| RemoteFault::new(format!("invalid parameters: {}", e)))?;
                let output = handler(input).await?;
                Ok::<_, RemoteFault>(bitcode::encode(&output))
            }
            .boxed()
        });

        self.insert(M::signature(), M::return_type(), erased)?;
        Ok(self)
    }

    /// Registers an already type-erased handler.
    pub fn register_raw(
        &mut self,
        method_name: &str,
        parameter_types: &[String],
        return_type: &str,
        handler: MethodHandler,
    ) -> Result<&mut Self, RpcError> {
        self.insert(
            method_signature(method_name, parameter_types),
            return_type.to_string(),
            handler,
        )?;
        Ok(self)
    }

    fn insert(
        &mut self,
        signature: String,
        return_type: String,
        handler: MethodHandler,
    ) -> Result<(), RpcError> {
        match self.methods.entry(method_id(&signature)) {
            Entry::Occupied(_) => Err(RpcError::Registration(format!(
                "{}.{} is already registered",
                self.interface_name, signature
            ))),
            Entry::Vacant(slot) => {
                slot.insert(MethodEntry {
                    signature,
                    return_type,
                    handler,
                });
                Ok(())
            }
        }
    }

    /// Finds the handler for a call.
    ///
    /// The return type is part of the match: a caller expecting a different
    /// result type than the provider declares gets no handler.
    pub fn resolve(
        &self,
        method_name: &str,
        parameter_types: &[String],
        return_type: &str,
    ) -> Option<MethodHandler> {
        let signature = method_signature(method_name, parameter_types);

        self.methods
            .get(&method_id(&signature))
            .filter(|entry| entry.signature == signature && entry.return_type == return_type)
            .map(|entry| Arc::clone(&entry.handler))
    }

    pub fn signatures(&self) -> Vec<&str> {
        let mut signatures: Vec<&str> = self
            .methods
            .values()
            .map(|entry| entry.signature.as_str())
            .collect();
        signatures.sort_unstable();
        signatures
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }
}
