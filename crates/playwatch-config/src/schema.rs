//! Configuration schema definitions.

use std::time::Duration;

use serde::{Deserialize, Serialize};

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

fn default_true() -> bool {
    true
}

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub connection: ConnectionConfig,

    #[serde(default)]
    pub backoff: BackoffConfig,

    #[serde(default)]
    pub dispatch: DispatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Realtime channel endpoint.
    #[serde(default = "default_ws_url")]
    pub ws_url: String,

    /// Base URL of the request/response API (remote clicks).
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Authorization header value sent on both channels (e.g. "Bearer ...").
    #[serde(default)]
    pub authorization: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            api_base: default_api_base(),
            authorization: None,
        }
    }
}

fn default_ws_url() -> String {
    "ws://127.0.0.1:8000/ws".to_string()
}

fn default_api_base() -> String {
    "http://127.0.0.1:8000".to_string()
}

/// Realtime connection tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_ms: u64,

    /// Interval between liveness pings while connected.
    #[serde(default = "default_ping_interval")]
    pub ping_interval_ms: u64,

    /// How long to wait for a pong before declaring the link dead.
    #[serde(default = "default_pong_timeout")]
    pub pong_timeout_ms: u64,

    /// Outbound queue depth; sends beyond it are dropped.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer: usize,

    /// Broadcast capacity of the inbound message stream.
    #[serde(default = "default_inbound_buffer")]
    pub inbound_buffer: usize,
}

impl ConnectionConfig {
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    pub fn ping_interval(&self) -> Duration {
        Duration::from_millis(self.ping_interval_ms)
    }

    pub fn pong_timeout(&self) -> Duration {
        Duration::from_millis(self.pong_timeout_ms)
    }
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            handshake_timeout_ms: default_handshake_timeout(),
            ping_interval_ms: default_ping_interval(),
            pong_timeout_ms: default_pong_timeout(),
            outbound_buffer: default_outbound_buffer(),
            inbound_buffer: default_inbound_buffer(),
        }
    }
}

fn default_handshake_timeout() -> u64 {
    10_000
}

fn default_ping_interval() -> u64 {
    15_000
}

fn default_pong_timeout() -> u64 {
    10_000
}

fn default_outbound_buffer() -> usize {
    64
}

fn default_inbound_buffer() -> usize {
    256
}

/// Reconnect backoff.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackoffConfig {
    #[serde(default = "default_base_delay")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay")]
    pub max_delay_ms: u64,

    #[serde(default = "default_multiplier")]
    pub multiplier: f64,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: default_base_delay(),
            max_delay_ms: default_max_delay(),
            multiplier: default_multiplier(),
            jitter: true,
        }
    }
}

fn default_base_delay() -> u64 {
    1_000
}

fn default_max_delay() -> u64 {
    30_000
}

fn default_multiplier() -> f64 {
    2.0
}

/// Remote click dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    #[serde(default = "default_dispatch_timeout")]
    pub timeout_ms: u64,
}

impl DispatchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_dispatch_timeout(),
        }
    }
}

fn default_dispatch_timeout() -> u64 {
    5_000
}

/// Log output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,

    /// Directory for the rotating log file; `~` is expanded.
    #[serde(default = "default_log_directory")]
    pub directory: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            directory: default_log_directory(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}

fn default_log_directory() -> String {
    "~/.playwatch/logs".to_string()
}
