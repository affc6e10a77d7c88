use crate::ConnectionOptions;
use crate::constants::{
    DEFAULT_APPLICATION_NAME, DEFAULT_CALL_TIMEOUT, DEFAULT_CONNECT_TIMEOUT,
    DEFAULT_HEARTBEAT_INTERVAL, DEFAULT_HOST, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_CONCURRENT_CALLS,
    DEFAULT_PORT, HEARTBEAT_LIVENESS_FACTOR,
};
use srpc::frame::{CompressType, SerializeType};
use srpc::rpc::RpcError;
use std::time::Duration;

/// Settings for [`RpcBootstrap`](crate::RpcBootstrap).
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// Shown in logs only.
    pub application_name: String,

    /// Coordination service address, `scheme://host:port`.
    pub registry_address: Option<String>,

    /// Body codec name, e.g. `"bitcode"`.
    pub serialization: String,

    /// Body compression name, e.g. `"none"`.
    pub compression: String,

    pub host: String,

    /// Listen port. `0` picks a free port.
    pub port: u16,

    pub call_timeout: Duration,
    pub connect_timeout: Duration,
    pub heartbeat_interval: Option<Duration>,
    pub idle_timeout: Option<Duration>,
    pub max_concurrent_calls: usize,
    pub decode_latency: Option<Duration>,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            registry_address: None,
            serialization: "bitcode".to_string(),
            compression: "none".to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            heartbeat_interval: Some(DEFAULT_HEARTBEAT_INTERVAL),
            idle_timeout: Some(DEFAULT_IDLE_TIMEOUT),
            max_concurrent_calls: DEFAULT_MAX_CONCURRENT_CALLS,
            decode_latency: None,
        }
    }
}

impl RpcConfig {
    pub fn codec(&self) -> Result<(SerializeType, CompressType), RpcError> {
        let serialize_type = self
            .serialization
            .parse::<SerializeType>()
            .map_err(RpcError::InvalidConfig)?;
        let compress_type = self
            .compression
            .parse::<CompressType>()
            .map_err(RpcError::InvalidConfig)?;
        Ok((serialize_type, compress_type))
    }

    /// Outbound connections send heartbeats and close once
    /// `HEARTBEAT_LIVENESS_FACTOR` intervals pass without any inbound bytes,
    /// echoes included.
    pub fn client_connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            heartbeat_interval: self.heartbeat_interval,
            idle_timeout: self
                .heartbeat_interval
                .map(|interval| interval * HEARTBEAT_LIVENESS_FACTOR),
            decode_latency: self.decode_latency,
        }
    }

    /// Inbound connections only watch for idleness.
    pub fn server_connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            heartbeat_interval: None,
            idle_timeout: self.idle_timeout,
            decode_latency: self.decode_latency,
        }
    }
}
