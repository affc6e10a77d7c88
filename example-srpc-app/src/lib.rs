use example_srpc_service_definition::{DefaultGreeter, GreeterClient, GreeterService};
use srpc::rpc::RpcError;
use srpc_registry::InMemoryCoordinator;
use srpc_tokio_rpc::{RpcBootstrap, RpcConfig, ServerHandle};

pub const REGISTRY_ADDRESS: &str = "memory://127.0.0.1:2181";

/// Starts a provider publishing the default greeter on an ephemeral port.
///
/// The returned bootstrap owns the provider's registry session; keep it alive
/// for as long as the provider should stay discoverable.
pub async fn start_provider(
    coordinator: &InMemoryCoordinator,
) -> Result<(RpcBootstrap, ServerHandle), RpcError> {
    let mut provider = RpcBootstrap::new(RpcConfig {
        application_name: "greeter-provider".to_string(),
        registry_address: Some(REGISTRY_ADDRESS.to_string()),
        port: 0,
        ..RpcConfig::default()
    });

    provider.register_registry(coordinator).await?;
    provider
        .publish(GreeterService::new(DefaultGreeter::default()))
        .await?;
    let server = provider.start_server().await?;

    Ok((provider, server))
}

/// Connects a consumer through its own registry session and returns a greeter proxy.
pub async fn connect_consumer(
    coordinator: &InMemoryCoordinator,
) -> Result<(RpcBootstrap, GreeterClient), RpcError> {
    let mut consumer = RpcBootstrap::new(RpcConfig {
        application_name: "greeter-consumer".to_string(),
        registry_address: Some(REGISTRY_ADDRESS.to_string()),
        ..RpcConfig::default()
    });

    consumer.register_registry(coordinator).await?;
    let greeter = consumer.reference::<GreeterClient>()?;

    Ok((consumer, greeter))
}
