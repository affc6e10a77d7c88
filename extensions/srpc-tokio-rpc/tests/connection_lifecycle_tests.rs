use async_trait::async_trait;
use example_srpc_service_definition::{GREETER, GreeterClient};
use srpc::frame::{CallEnvelope, EnvelopeStreamDecoder, FrameCodec, RequestType};
use srpc::rpc::{MethodTable, RemoteMethod, RpcError, RpcService, ServiceProxy, ServiceTable};
use srpc_registry::{CoordinatedRegistry, InMemoryCoordinator, Registry};
use srpc_tokio_rpc::{
    Connection, ConnectionOptions, FrameHandler, RpcClient, RpcConfig, RpcServer, TcpTransport,
    Transport,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, timeout};

const SLEEPER: &str = "com.example.Sleeper";

struct Nap;

impl RemoteMethod for Nap {
    const INTERFACE_NAME: &'static str = SLEEPER;
    const METHOD_NAME: &'static str = "nap";
    type Input = (u64,);
    type Output = u64;
}

/// Sleeps on request and records how many naps overlapped.
#[derive(Default)]
struct Sleeper {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl RpcService for Sleeper {
    fn interface_name(&self) -> &str {
        SLEEPER
    }

    fn register_methods(self: Arc<Self>, methods: &mut MethodTable) -> Result<(), RpcError> {
        methods.register::<Nap, _, _>(move |(millis,)| {
            let sleeper = Arc::clone(&self);
            async move {
                let now = sleeper.active.fetch_add(1, Ordering::SeqCst) + 1;
                sleeper.peak.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(millis)).await;
                sleeper.active.fetch_sub(1, Ordering::SeqCst);
                Ok(millis)
            }
        })?;
        Ok(())
    }
}

struct RunningServer {
    server: Arc<RpcServer>,
    endpoint: SocketAddr,
    shutdown: oneshot::Sender<()>,
}

async fn start_server(
    services: Arc<ServiceTable>,
    options: ConnectionOptions,
    max_concurrent_calls: usize,
) -> RunningServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap();
    let server = Arc::new(
        RpcServer::new(services)
            .with_options(options)
            .with_max_concurrent_calls(max_concurrent_calls),
    );

    let (shutdown, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(Arc::clone(&server).serve_with_listener(listener, async move {
        let _ = shutdown_rx.await;
    }));

    RunningServer {
        server,
        endpoint,
        shutdown,
    }
}

async fn start_sleeper(
    options: ConnectionOptions,
    max_concurrent_calls: usize,
) -> (Arc<Sleeper>, RunningServer) {
    let sleeper = Arc::new(Sleeper::default());
    let services = Arc::new(ServiceTable::new());
    services
        .publish(Arc::clone(&sleeper) as Arc<dyn RpcService>)
        .unwrap();
    let running = start_server(services, options, max_concurrent_calls).await;
    (sleeper, running)
}

async fn announce(
    coordinator: &InMemoryCoordinator,
    service: &str,
    endpoint: SocketAddr,
) -> Arc<dyn Registry> {
    let registry: Arc<dyn Registry> =
        Arc::new(CoordinatedRegistry::new(Arc::new(coordinator.session())));
    registry.register(service, endpoint).await.unwrap();
    registry
}

fn sleeper_client(registry: Arc<dyn Registry>) -> (Arc<RpcClient>, ServiceProxy) {
    let client = Arc::new(
        RpcClient::new(
            registry,
            Arc::new(TcpTransport::new(ConnectionOptions::default())),
        )
        .with_call_timeout(Duration::from_secs(5)),
    );
    let proxy = ServiceProxy::new(SLEEPER, client.clone());
    (client, proxy)
}

/// Forwards every inbound envelope to a channel.
struct RecordingHandler {
    envelopes: mpsc::UnboundedSender<CallEnvelope>,
}

#[async_trait]
impl FrameHandler for RecordingHandler {
    async fn on_envelope(&self, _connection: &Connection, envelope: CallEnvelope) {
        let _ = self.envelopes.send(envelope);
    }

    fn on_closed(&self, _connection: &Connection) {}
}

#[test]
fn client_liveness_follows_heartbeat_interval() {
    let options = RpcConfig::default().client_connection_options();
    assert_eq!(options.heartbeat_interval, Some(Duration::from_secs(5)));
    assert_eq!(options.idle_timeout, Some(Duration::from_secs(15)));

    let options = RpcConfig {
        heartbeat_interval: None,
        ..RpcConfig::default()
    }
    .client_connection_options();
    assert_eq!(options.idle_timeout, None);
}

#[tokio::test]
async fn silent_provider_connection_is_evicted() {
    let coordinator = InMemoryCoordinator::new();

    // Reads everything, answers nothing
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap();
    let holder = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    });

    let registry = announce(&coordinator, GREETER, endpoint).await;
    let options = RpcConfig {
        heartbeat_interval: Some(Duration::from_millis(50)),
        ..RpcConfig::default()
    }
    .client_connection_options();
    let client = Arc::new(
        RpcClient::new(registry, Arc::new(TcpTransport::new(options)))
            .with_call_timeout(Duration::from_millis(100)),
    );
    let greeter = client.proxy::<GreeterClient>();

    match greeter.hello("Ada").await {
        Err(RpcError::Timeout { .. }) => {}
        other => panic!("expected timeout, got {:?}", other),
    }

    let evicted = timeout(Duration::from_secs(2), async {
        while !client.connections().is_empty() {
            sleep(Duration::from_millis(20)).await;
        }
    })
    .await;
    assert!(evicted.is_ok(), "dead connection stayed cached");
    assert!(client.connections().cached(endpoint).is_none());

    holder.abort();
}

#[tokio::test]
async fn server_closes_idle_connections() {
    let running = start_server(
        Arc::new(ServiceTable::new()),
        ConnectionOptions {
            idle_timeout: Some(Duration::from_millis(100)),
            ..ConnectionOptions::default()
        },
        4,
    )
    .await;

    let mut raw = TcpStream::connect(running.endpoint).await.unwrap();
    let started = Instant::now();

    let mut buf = [0u8; 64];
    let n = timeout(Duration::from_secs(2), raw.read(&mut buf))
        .await
        .expect("server never closed the idle connection")
        .unwrap_or(0);
    assert_eq!(n, 0);
    assert!(started.elapsed() >= Duration::from_millis(90));

    timeout(Duration::from_secs(1), async {
        while running.server.connection_count() > 0 {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("closed connection still tracked");

    let _ = running.shutdown.send(());
}

#[tokio::test]
async fn client_sends_heartbeats_every_interval() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap();

    let transport = TcpTransport::new(ConnectionOptions {
        heartbeat_interval: Some(Duration::from_millis(30)),
        ..ConnectionOptions::default()
    });
    let (envelopes, _received) = mpsc::unbounded_channel();
    let connection = transport
        .connect(endpoint, Arc::new(RecordingHandler { envelopes }))
        .await
        .unwrap();
    let (mut socket, _) = listener.accept().await.unwrap();

    let started = Instant::now();
    let mut decoder = EnvelopeStreamDecoder::new();
    let mut heartbeats = Vec::new();
    let mut buf = [0u8; 256];
    timeout(Duration::from_secs(2), async {
        while heartbeats.len() < 3 {
            let n = socket.read(&mut buf).await.unwrap();
            assert!(n > 0, "client closed before sending heartbeats");
            for result in decoder.read_bytes(&buf[..n]) {
                heartbeats.push(result.unwrap());
            }
        }
    })
    .await
    .expect("heartbeats");

    assert!(started.elapsed() >= Duration::from_millis(60));
    let ids: Vec<u64> = heartbeats.iter().take(3).map(|e| e.request_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);
    assert!(
        heartbeats
            .iter()
            .all(|e| e.request_type == RequestType::Heartbeat)
    );

    connection.close();
}

#[tokio::test]
async fn decode_latency_keeps_frame_order() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap();

    let transport = TcpTransport::new(ConnectionOptions {
        decode_latency: Some(Duration::from_millis(5)),
        ..ConnectionOptions::default()
    });
    let (envelopes, mut received) = mpsc::unbounded_channel();
    let connection = transport
        .connect(endpoint, Arc::new(RecordingHandler { envelopes }))
        .await
        .unwrap();
    let (mut socket, _) = listener.accept().await.unwrap();

    // Frames split across writes so they straddle read boundaries
    let mut stream: Vec<u8> = Vec::new();
    for id in 1..=20 {
        stream.extend(FrameCodec::encode(&CallEnvelope::heartbeat(id)).unwrap());
    }
    for chunk in stream.chunks(17) {
        socket.write_all(chunk).await.unwrap();
        socket.flush().await.unwrap();
        sleep(Duration::from_millis(1)).await;
    }

    let ids = timeout(Duration::from_secs(5), async {
        let mut ids = Vec::new();
        while ids.len() < 20 {
            let envelope = received.recv().await.expect("handler dropped");
            ids.push(envelope.request_id);
        }
        ids
    })
    .await
    .expect("all frames delivered");

    assert_eq!(ids, (1..=20).collect::<Vec<u64>>());

    connection.close();
}

#[tokio::test]
async fn max_concurrent_calls_bounds_dispatch() {
    let coordinator = InMemoryCoordinator::new();
    let (sleeper, running) = start_sleeper(ConnectionOptions::default(), 2).await;
    let registry = announce(&coordinator, SLEEPER, running.endpoint).await;
    let (client, proxy) = sleeper_client(registry);

    let calls: Vec<_> = (0..6)
        .map(|_| {
            let proxy = proxy.clone();
            tokio::spawn(async move { proxy.call::<Nap>((50,)).await })
        })
        .collect();

    for call in calls {
        assert_eq!(call.await.unwrap().unwrap(), 50);
    }
    assert_eq!(sleeper.peak.load(Ordering::SeqCst), 2);
    assert_eq!(client.pending_calls(), 0);

    let _ = running.shutdown.send(());
}

#[tokio::test]
async fn waiting_for_a_permit_does_not_count_as_idle() {
    let coordinator = InMemoryCoordinator::new();
    let (_sleeper, running) = start_sleeper(
        ConnectionOptions {
            idle_timeout: Some(Duration::from_millis(300)),
            ..ConnectionOptions::default()
        },
        1,
    )
    .await;
    let registry = announce(&coordinator, SLEEPER, running.endpoint).await;
    let (_client, proxy) = sleeper_client(registry);

    // The second call waits 200ms for the only permit, then naps 200ms more
    let (first, second) = tokio::join!(proxy.call::<Nap>((200,)), proxy.call::<Nap>((200,)));

    assert_eq!(first.unwrap(), 200);
    assert_eq!(second.unwrap(), 200);

    let _ = running.shutdown.send(());
}
