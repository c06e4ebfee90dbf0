//! Server configuration.

use std::time::Duration;

use clap::Parser;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_PING_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_HEARTBEAT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_OUTBOUND_BUFFER: usize = 256;

/// Command line arguments of the server binary
#[derive(Debug, Clone, Parser)]
#[command(name = "noteboard-server", version, about = "Real-time fan-out server for Noteboard")]
pub struct ServerArgs {
    /// Address to bind
    #[arg(long, env = "WS_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "WS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Seconds between liveness sweeps
    #[arg(long, default_value_t = DEFAULT_PING_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub ping_interval_secs: u64,

    /// Seconds without a heartbeat before a client is dropped
    #[arg(long, default_value_t = DEFAULT_HEARTBEAT_TIMEOUT_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub heartbeat_timeout_secs: u64,

    /// Outbound messages queued per client before it is evicted
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_BUFFER)]
    pub outbound_buffer: usize,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// Runtime configuration of the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Period of the liveness monitor
    pub ping_interval: Duration,
    /// Silence after which a session is evicted
    pub heartbeat_timeout: Duration,
    /// Capacity of each session's outbound channel. Always at least 1.
    pub outbound_buffer: usize,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            ping_interval: Duration::from_secs(DEFAULT_PING_INTERVAL_SECS),
            heartbeat_timeout: Duration::from_secs(DEFAULT_HEARTBEAT_TIMEOUT_SECS),
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
        }
    }
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            host: args.host,
            port: args.port,
            ping_interval: Duration::from_secs(args.ping_interval_secs),
            heartbeat_timeout: Duration::from_secs(args.heartbeat_timeout_secs),
            outbound_buffer: args.outbound_buffer.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults() {
        // テスト項目: 引数なしではデフォルト設定になる
        // given (前提条件):
        let args = ServerArgs::try_parse_from(["noteboard-server"]).unwrap();

        // when (操作):
        let config = ServerConfig::from(args);

        // then (期待する結果):
        // WS_HOST / WS_PORT が設定された環境ではこの値にならないため、フィールドを個別に確認する
        assert_eq!(config.ping_interval, Duration::from_secs(30));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(60));
        assert_eq!(config.outbound_buffer, 256);
    }

    #[test]
    fn test_args_override() {
        // テスト項目: 引数で間隔と上限を変更できる
        let args = ServerArgs::try_parse_from([
            "noteboard-server",
            "--host",
            "127.0.0.1",
            "--port",
            "9000",
            "--ping-interval-secs",
            "1",
            "--heartbeat-timeout-secs",
            "2",
            "--outbound-buffer",
            "0",
        ])
        .unwrap();

        let config = ServerConfig::from(args);

        assert_eq!(config.bind_addr(), "127.0.0.1:9000");
        assert_eq!(config.ping_interval, Duration::from_secs(1));
        assert_eq!(config.heartbeat_timeout, Duration::from_secs(2));
        assert_eq!(config.outbound_buffer, 1);
    }

    #[test]
    fn test_zero_interval_is_rejected() {
        // テスト項目: 0 秒の間隔は受け付けない
        assert!(
            ServerArgs::try_parse_from(["noteboard-server", "--ping-interval-secs", "0"]).is_err()
        );
    }
}
