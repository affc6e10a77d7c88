use async_trait::async_trait;
use srpc::rpc::{
    MethodTable, RemoteFault, RemoteInterface, RemoteMethod, RpcError, RpcService, ServiceProxy,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

pub const GREETER: &str = "com.example.Greeter";

pub struct Hello;

impl RemoteMethod for Hello {
    const INTERFACE_NAME: &'static str = GREETER;
    const METHOD_NAME: &'static str = "hello";
    type Input = (String,);
    type Output = String;
}

/// Overload of `hello` taking a custom salutation.
pub struct HelloWith;

impl RemoteMethod for HelloWith {
    const INTERFACE_NAME: &'static str = GREETER;
    const METHOD_NAME: &'static str = "hello";
    type Input = (String, String);
    type Output = String;
}

pub struct GreetingCount;

impl RemoteMethod for GreetingCount {
    const INTERFACE_NAME: &'static str = GREETER;
    const METHOD_NAME: &'static str = "greeting_count";
    type Input = ();
    type Output = u64;
}

/// Provider-side contract.
#[async_trait]
pub trait Greeter: Send + Sync + 'static {
    async fn hello(&self, name: String) -> Result<String, RemoteFault>;

    async fn hello_with(&self, salutation: String, name: String) -> Result<String, RemoteFault>;

    async fn greeting_count(&self) -> Result<u64, RemoteFault>;
}

/// Publishes a [`Greeter`] implementation.
pub struct GreeterService<G: Greeter> {
    greeter: G,
}

impl<G: Greeter> GreeterService<G> {
    pub fn new(greeter: G) -> Arc<Self> {
        Arc::new(Self { greeter })
    }
}

impl<G: Greeter> RpcService for GreeterService<G> {
    fn interface_name(&self) -> &str {
        GREETER
    }

    fn register_methods(self: Arc<Self>, methods: &mut MethodTable) -> Result<(), RpcError> {
        let service = Arc::clone(&self);
        methods.register::<Hello, _, _>(move |(name,)| {
            let service = Arc::clone(&service);
            async move { service.greeter.hello(name).await }
        })?;

        let service = Arc::clone(&self);
        methods.register::<HelloWith, _, _>(move |(salutation, name)| {
            let service = Arc::clone(&service);
            async move { service.greeter.hello_with(salutation, name).await }
        })?;

        let service = self;
        methods.register::<GreetingCount, _, _>(move |()| {
            let service = Arc::clone(&service);
            async move { service.greeter.greeting_count().await }
        })?;

        Ok(())
    }
}

/// Greets with `"Hello, <name>"` and counts how many greetings it served.
#[derive(Default)]
pub struct DefaultGreeter {
    served: AtomicU64,
}

#[async_trait]
impl Greeter for DefaultGreeter {
    async fn hello(&self, name: String) -> Result<String, RemoteFault> {
        self.hello_with("Hello".to_string(), name).await
    }

    async fn hello_with(&self, salutation: String, name: String) -> Result<String, RemoteFault> {
        if name.is_empty() {
            return Err(RemoteFault::new("name must not be empty"));
        }
        self.served.fetch_add(1, Ordering::Relaxed);
        Ok(format!("{}, {}", salutation, name))
    }

    async fn greeting_count(&self) -> Result<u64, RemoteFault> {
        Ok(self.served.load(Ordering::Relaxed))
    }
}

/// Consumer-side adapter.
#[derive(Clone)]
pub struct GreeterClient {
    proxy: ServiceProxy,
}

impl RemoteInterface for GreeterClient {
    const INTERFACE_NAME: &'static str = GREETER;

    fn from_proxy(proxy: ServiceProxy) -> Self {
        Self { proxy }
    }
}

impl GreeterClient {
    pub async fn hello(&self, name: impl Into<String>) -> Result<String, RpcError> {
        self.proxy.call::<Hello>((name.into(),)).await
    }

    pub async fn hello_with(
        &self,
        salutation: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<String, RpcError> {
        self.proxy
            .call::<HelloWith>((salutation.into(), name.into()))
            .await
    }

    pub async fn greeting_count(&self) -> Result<u64, RpcError> {
        self.proxy.call::<GreetingCount>(()).await
    }
}
