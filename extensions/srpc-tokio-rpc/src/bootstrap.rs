use crate::{RpcClient, RpcConfig, RpcServer, TcpTransport, Transport, net};
use srpc::rpc::{RemoteInterface, RpcError, RpcService, ServiceTable};
use srpc_registry::{CoordinatedRegistry, DriverConnector, Registry, RegistryConfig};
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Wires registry, server and client together for one process.
///
/// ```rust,no_run
/// # use std::sync::Arc;
/// # use srpc::rpc::{RpcError, RpcService};
/// # async fn run(greeter: Arc<dyn RpcService>) -> Result<(), RpcError> {
/// use srpc_registry::InMemoryCoordinator;
/// use srpc_tokio_rpc::{RpcBootstrap, RpcConfig};
///
/// let coordinator = InMemoryCoordinator::new();
/// let mut bootstrap = RpcBootstrap::new(RpcConfig {
///     registry_address: Some("memory://localhost:2181".to_string()),
///     port: 0,
///     ..RpcConfig::default()
/// });
///
/// bootstrap.register_registry(&coordinator).await?;
/// bootstrap.publish(greeter).await?;
/// let server = bootstrap.start_server().await?;
///
/// // ... later
/// server.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct RpcBootstrap {
    config: RpcConfig,
    services: Arc<ServiceTable>,
    registry: Option<Arc<dyn Registry>>,
    transport: Option<Arc<dyn Transport>>,
    client: Option<Arc<RpcClient>>,
    advertised_addr: Option<SocketAddr>,
    unregistered: Vec<String>,
}

impl RpcBootstrap {
    pub fn new(config: RpcConfig) -> Self {
        Self {
            config,
            services: Arc::new(ServiceTable::new()),
            registry: None,
            transport: None,
            client: None,
            advertised_addr: None,
            unregistered: Vec::new(),
        }
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    pub fn services(&self) -> &Arc<ServiceTable> {
        &self.services
    }

    /// Opens a coordination session at `config.registry_address` and uses it
    /// as this process's registry.
    pub async fn register_registry<C>(&mut self, connector: &C) -> Result<&mut Self, RpcError>
    where
        C: DriverConnector + ?Sized,
    {
        let address = self
            .config
            .registry_address
            .as_deref()
            .ok_or(RpcError::NotConfigured("registry address"))?;
        let registry_config = RegistryConfig::parse(address)?;

        let driver = connector.connect(&registry_config).await?;
        tracing::info!(
            application = %self.config.application_name,
            registry = %registry_config,
            "connected to registry"
        );

        Ok(self.with_registry(Arc::new(CoordinatedRegistry::new(driver))))
    }

    /// Uses an already constructed registry.
    pub fn with_registry(&mut self, registry: Arc<dyn Registry>) -> &mut Self {
        self.registry = Some(registry);
        self
    }

    /// Replaces the default TCP transport used by the client.
    pub fn with_transport(&mut self, transport: Arc<dyn Transport>) -> &mut Self {
        self.transport = Some(transport);
        self
    }

    /// Makes `service` callable and announces it in the registry.
    ///
    /// Before [`start_server`](Self::start_server) the announcement is
    /// deferred until the listening address is known.
    pub async fn publish(&mut self, service: Arc<dyn RpcService>) -> Result<&mut Self, RpcError> {
        let registry = self.registry()?;
        let published = self.services.publish(service)?;
        let interface_name = published.interface_name().to_string();

        match self.advertised_addr {
            Some(addr) => registry.register(&interface_name, addr).await?,
            None => self.unregistered.push(interface_name),
        }

        Ok(self)
    }

    pub async fn publish_all<I>(&mut self, services: I) -> Result<&mut Self, RpcError>
    where
        I: IntoIterator<Item = Arc<dyn RpcService>>,
    {
        for service in services {
            self.publish(service).await?;
        }
        Ok(self)
    }

    /// Binds `config.host:config.port`, registers pending services and starts
    /// accepting calls in the background.
    pub async fn start_server(&mut self) -> Result<ServerHandle, RpcError> {
        let registry = self.registry()?;

        let listener =
            TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        let local_addr = listener.local_addr()?;

        let advertised_addr = net::advertised_addr(local_addr);

        let server = Arc::new(
            RpcServer::new(Arc::clone(&self.services))
                .with_options(self.config.server_connection_options())
                .with_max_concurrent_calls(self.config.max_concurrent_calls),
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(server.serve_with_listener(listener, async move {
            let _ = shutdown_rx.await;
        }));

        self.advertised_addr = Some(advertised_addr);
        for interface_name in std::mem::take(&mut self.unregistered) {
            registry.register(&interface_name, advertised_addr).await?;
        }

        tracing::info!(
            application = %self.config.application_name,
            %local_addr,
            services = self.services.len(),
            "provider started"
        );

        Ok(ServerHandle {
            local_addr,
            advertised_addr,
            shutdown: Some(shutdown_tx),
            task,
        })
    }

    /// Builds a proxy for remote interface `T`.
    pub fn reference<T: RemoteInterface>(&mut self) -> Result<T, RpcError> {
        Ok(self.client()?.proxy::<T>())
    }

    /// The shared client behind every proxy, created on first use.
    pub fn client(&mut self) -> Result<Arc<RpcClient>, RpcError> {
        if let Some(client) = &self.client {
            return Ok(Arc::clone(client));
        }

        let registry = self.registry()?;
        let (serialize_type, compress_type) = self.config.codec()?;
        let transport: Arc<dyn Transport> = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(
                TcpTransport::new(self.config.client_connection_options())
                    .with_connect_timeout(self.config.connect_timeout),
            ),
        };

        let client = Arc::new(
            RpcClient::new(registry, transport)
                .with_call_timeout(self.config.call_timeout)
                .with_codec(serialize_type, compress_type),
        );
        self.client = Some(Arc::clone(&client));
        Ok(client)
    }

    fn registry(&self) -> Result<Arc<dyn Registry>, RpcError> {
        self.registry
            .clone()
            .ok_or(RpcError::NotConfigured("registry"))
    }
}

/// Running provider. Dropping the handle stops the server.
pub struct ServerHandle {
    local_addr: SocketAddr,
    advertised_addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<io::Result<()>>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Address announced in the registry.
    pub fn advertised_addr(&self) -> SocketAddr {
        self.advertised_addr
    }

    /// Stops accepting, closes open connections and waits for the accept loop to exit.
    pub async fn shutdown(mut self) -> Result<(), RpcError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }

        match (&mut self.task).await {
            Ok(result) => result.map_err(RpcError::from),
            Err(e) => Err(RpcError::Io(io::Error::other(e))),
        }
    }
}
