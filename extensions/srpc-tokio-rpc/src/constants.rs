use std::time::Duration;

pub const DEFAULT_APPLICATION_NAME: &str = "default";
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8080;

/// How long a caller waits for a reply before giving up.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(3);

/// Interval at which clients send heartbeats on idle and busy connections alike.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// A client connection that hears nothing for this many heartbeat intervals
/// is considered dead.
pub const HEARTBEAT_LIVENESS_FACTOR: u32 = 3;

/// A server connection with no inbound bytes for this long is closed.
pub const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15);

/// Upper bound on handler invocations running at once on one server.
pub const DEFAULT_MAX_CONCURRENT_CALLS: usize = 256;

pub const READ_BUFFER_SIZE: usize = 16 * 1024;
