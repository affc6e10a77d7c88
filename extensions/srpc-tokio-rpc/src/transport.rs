use crate::constants::{DEFAULT_CONNECT_TIMEOUT, READ_BUFFER_SIZE};
use async_trait::async_trait;
use rand::Rng;
use srpc::frame::{CallEnvelope, EnvelopeStreamDecoder};
use srpc::rpc::RpcError;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::{mpsc, watch};
use tokio::time::{Instant, Interval, MissedTickBehavior};

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Per-connection liveness and decoding settings.
#[derive(Debug, Clone, Default)]
pub struct ConnectionOptions {
    /// Send a heartbeat this often.
    pub heartbeat_interval: Option<Duration>,

    /// Close the connection after this long without inbound bytes.
    pub idle_timeout: Option<Duration>,

    /// Sleep a random duration up to this bound before decoding each read,
    /// to emulate a slow network.
    pub decode_latency: Option<Duration>,
}

/// Receives decoded envelopes and the close notification for a connection.
#[async_trait]
pub trait FrameHandler: Send + Sync + 'static {
    /// Called from the connection's reader task, one envelope at a time, in
    /// the order the frames arrived.
    async fn on_envelope(&self, connection: &Connection, envelope: CallEnvelope);

    /// Called exactly once, after the connection has stopped reading.
    fn on_closed(&self, connection: &Connection);
}

/// Opens outbound connections.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn connect(
        &self,
        endpoint: SocketAddr,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Connection, RpcError>;
}

struct ConnectionInner {
    id: u64,
    peer: SocketAddr,
    outbound: mpsc::UnboundedSender<Vec<u8>>,
    active: AtomicBool,
    shutdown: watch::Sender<bool>,
}

/// Handle to one live TCP connection.
///
/// Cloning is cheap; all clones refer to the same socket. Writes are queued
/// whole frames, so concurrent senders never interleave bytes.
#[derive(Clone)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.inner.peer
    }

    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Encodes `envelope` and queues the frame for writing.
    pub fn send(&self, envelope: &CallEnvelope) -> Result<(), RpcError> {
        if !self.is_active() {
            return Err(RpcError::ConnectionClosed {
                peer: self.inner.peer,
            });
        }

        let frame = srpc::frame::FrameCodec::encode(envelope)?;

        self.inner
            .outbound
            .send(frame)
            .map_err(|_| RpcError::ConnectionClosed {
                peer: self.inner.peer,
            })
    }

    /// Stops both connection tasks. Idempotent.
    pub fn close(&self) {
        if self.inner.active.swap(false, Ordering::AcqRel) {
            tracing::debug!(
                connection_id = self.inner.id,
                peer = %self.inner.peer,
                "closing connection"
            );
        }
        self.inner.shutdown.send_replace(true);
    }
}

/// TCP transport using the connection tasks from [`spawn_connection`].
pub struct TcpTransport {
    options: ConnectionOptions,
    connect_timeout: Duration,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self::new(ConnectionOptions::default())
    }
}

impl TcpTransport {
    pub fn new(options: ConnectionOptions) -> Self {
        Self {
            options,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    pub fn with_connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn connect(
        &self,
        endpoint: SocketAddr,
        handler: Arc<dyn FrameHandler>,
    ) -> Result<Connection, RpcError> {
        let stream = match tokio::time::timeout(self.connect_timeout, TcpStream::connect(endpoint))
            .await
        {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => return Err(RpcError::Connect { endpoint, source }),
            Err(_) => {
                return Err(RpcError::Connect {
                    endpoint,
                    source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
                });
            }
        };

        spawn_connection(stream, self.options.clone(), handler)
            .map_err(|source| RpcError::Connect { endpoint, source })
    }
}

/// Starts the reader and writer tasks for an established stream.
pub fn spawn_connection(
    stream: TcpStream,
    options: ConnectionOptions,
    handler: Arc<dyn FrameHandler>,
) -> io::Result<Connection> {
    let peer = stream.peer_addr()?;
    stream.set_nodelay(true)?;

    let (read_half, write_half) = stream.into_split();
    let (outbound_tx, outbound_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let connection = Connection {
        inner: Arc::new(ConnectionInner {
            id: NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
            peer,
            outbound: outbound_tx,
            active: AtomicBool::new(true),
            shutdown: shutdown_tx,
        }),
    };

    tracing::debug!(connection_id = connection.id(), %peer, "connection established");

    tokio::spawn(writer_task(
        write_half,
        outbound_rx,
        shutdown_rx.clone(),
        connection.clone(),
    ));
    tokio::spawn(reader_task(
        read_half,
        connection.clone(),
        handler,
        options,
        shutdown_rx,
    ));

    Ok(connection)
}

/// Drains the outbound queue onto the socket.
async fn writer_task(
    mut write_half: OwnedWriteHalf,
    mut outbound: mpsc::UnboundedReceiver<Vec<u8>>,
    mut shutdown: watch::Receiver<bool>,
    connection: Connection,
) {
    loop {
        tokio::select! {
            _ = shutdown.changed() => break,
            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = write_half.write_all(&frame).await {
                        tracing::warn!(peer = %connection.peer(), error = %e, "write failed");
                        break;
                    }
                }
                None => break,
            },
        }
    }

    connection.close();
    let _ = write_half.shutdown().await;
}

/// Reads, frames and decodes inbound bytes, sends heartbeats and enforces
/// the idle timeout.
async fn reader_task(
    mut read_half: OwnedReadHalf,
    connection: Connection,
    handler: Arc<dyn FrameHandler>,
    options: ConnectionOptions,
    mut shutdown: watch::Receiver<bool>,
) {
    let peer = connection.peer();
    let mut decoder = EnvelopeStreamDecoder::new();
    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    let mut heartbeat = options.heartbeat_interval.map(|period| {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });
    let mut heartbeat_seq: u64 = 0;
    let mut last_inbound = Instant::now();

    loop {
        tokio::select! {
            _ = shutdown.changed() => break,

            _ = next_tick(&mut heartbeat) => {
                heartbeat_seq += 1;
                if let Err(e) = connection.send(&CallEnvelope::heartbeat(heartbeat_seq)) {
                    tracing::info!(%peer, error = %e, "failed to send heartbeat");
                    break;
                }
                tracing::trace!(%peer, seq = heartbeat_seq, "sent heartbeat");
            }

            _ = idle_expired(options.idle_timeout, last_inbound) => {
                tracing::warn!(%peer, "connection idle for too long, closing");
                break;
            }

            read = read_half.read(&mut buf) => {
                let n = match read {
                    Ok(0) => {
                        tracing::info!(%peer, "peer closed connection");
                        break;
                    }
                    Ok(n) => n,
                    Err(e) => {
                        tracing::warn!(%peer, error = %e, "read failed");
                        break;
                    }
                };
                last_inbound = Instant::now();

                if let Some(max) = options.decode_latency {
                    let micros = rand::rng().random_range(0..=max.as_micros() as u64);
                    tokio::time::sleep(Duration::from_micros(micros)).await;
                }

                for result in decoder.read_bytes(&buf[..n]) {
                    match result {
                        Ok(envelope) => handler.on_envelope(&connection, envelope).await,
                        Err(e) => {
                            tracing::error!(
                                %peer,
                                error = %e,
                                "protocol error, dropping connection"
                            );
                            break;
                        }
                    }
                }

                if decoder.is_corrupted() {
                    break;
                }

                // Handlers may have blocked on backpressure; that time is not idleness
                last_inbound = Instant::now();
            }
        }
    }

    connection.close();
    handler.on_closed(&connection);
    tracing::debug!(connection_id = connection.id(), %peer, "connection terminated");
}

async fn next_tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn idle_expired(idle_timeout: Option<Duration>, since: Instant) {
    match idle_timeout {
        Some(timeout) => tokio::time::sleep_until(since + timeout).await,
        None => std::future::pending().await,
    }
}
