use example_srpc_app::{connect_consumer, start_provider};
use srpc::rpc::RpcError;
use srpc_registry::InMemoryCoordinator;
use tokio::join;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), RpcError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let coordinator = InMemoryCoordinator::new();

    let (_provider, server) = start_provider(&coordinator).await?;
    tracing::info!(addr = %server.local_addr(), "provider ready");

    let (_consumer, greeter) = connect_consumer(&coordinator).await?;

    // `join!` sends all three calls over the same cached connection
    let (res1, res2, res3) = join!(
        greeter.hello("Ada"),
        greeter.hello_with("Good evening", "Grace"),
        greeter.hello("")
    );

    println!("Result from hello(\"Ada\"): {:?}", res1);
    println!("Result from hello(\"Good evening\", \"Grace\"): {:?}", res2);
    println!("Result from hello(\"\"): {:?}", res3);
    println!("Greetings served: {:?}", greeter.greeting_count().await);

    server.shutdown().await
}
