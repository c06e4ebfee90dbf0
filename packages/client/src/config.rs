//! Client configuration.

use std::time::Duration;

use clap::Parser;

/// Command line arguments of the client binary
#[derive(Debug, Clone, Parser)]
#[command(name = "noteboard-client", version, about = "Interactive Noteboard canvas client")]
pub struct ClientArgs {
    /// Canvas to join
    #[arg(short, long)]
    pub canvas: String,

    /// Server host
    #[arg(long, env = "WS_HOST", default_value = "localhost")]
    pub host: String,

    /// Server port
    #[arg(short, long, env = "WS_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Milliseconds local edits are coalesced before saving
    #[arg(long, default_value_t = 1000)]
    pub debounce_ms: u64,

    /// Reconnect attempts after an abnormal close
    #[arg(long, default_value_t = 5)]
    pub max_reconnect_attempts: u32,

    /// Milliseconds between reloads of the persisted canvas. 0 disables polling.
    #[arg(long, default_value_t = 1000)]
    pub reconcile_ms: u64,

    /// Default log level when RUST_LOG is not set
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Timing and retry policy of the sync controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Delay between start and the first connect
    pub settle_delay: Duration,
    /// Coalescing window for local edits
    pub debounce: Duration,
    pub base_reconnect_delay: Duration,
    pub max_reconnect_delay: Duration,
    pub max_reconnect_attempts: u32,
    /// Attempts per save before it is reported as failed
    pub save_retries: u32,
    pub save_retry_delay: Duration,
    /// Period of the reload from the store. Zero disables polling; the canvas
    /// is still reloaded after every (re)connect.
    pub reconcile_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            debounce: Duration::from_millis(1000),
            base_reconnect_delay: Duration::from_secs(1),
            max_reconnect_delay: Duration::from_secs(30),
            max_reconnect_attempts: 5,
            save_retries: 3,
            save_retry_delay: Duration::from_millis(200),
            reconcile_interval: Duration::from_secs(1),
        }
    }
}

impl From<&ClientArgs> for SyncConfig {
    fn from(args: &ClientArgs) -> Self {
        Self {
            debounce: Duration::from_millis(args.debounce_ms),
            max_reconnect_attempts: args.max_reconnect_attempts,
            reconcile_interval: Duration::from_millis(args.reconcile_ms),
            ..Default::default()
        }
    }
}

/// Where the server is reached, for both WebSocket and HTTP
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressConfig {
    pub host: String,
    pub port: u16,
}

impl IngressConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}:{}", self.host, self.port)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}:{}/ws", self.host, self.port)
    }
}

impl Default for IngressConfig {
    fn default() -> Self {
        Self::new("localhost", 8080)
    }
}

impl From<&ClientArgs> for IngressConfig {
    fn from(args: &ClientArgs) -> Self {
        Self::new(args.host.clone(), args.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls() {
        // テスト項目: ホストとポートから HTTP と WebSocket の URL を組み立てる
        let config = IngressConfig::new("127.0.0.1", 9000);
        assert_eq!(config.base_url(), "http://127.0.0.1:9000");
        assert_eq!(config.ws_url(), "ws://127.0.0.1:9000/ws");
    }

    #[test]
    fn test_args_to_sync_config() {
        // テスト項目: 引数の debounce と再接続回数が反映され、他はデフォルトのまま
        // given (前提条件):
        let args = ClientArgs::try_parse_from([
            "noteboard-client",
            "--canvas",
            "c1",
            "--debounce-ms",
            "250",
            "--max-reconnect-attempts",
            "2",
            "--reconcile-ms",
            "0",
        ])
        .unwrap();

        // when (操作):
        let config = SyncConfig::from(&args);

        // then (期待する結果):
        assert_eq!(args.canvas, "c1");
        assert_eq!(config.debounce, Duration::from_millis(250));
        assert_eq!(config.max_reconnect_attempts, 2);
        assert_eq!(config.settle_delay, Duration::from_millis(100));
        assert_eq!(config.save_retries, 3);
        assert_eq!(config.reconcile_interval, Duration::ZERO);
    }

    #[test]
    fn test_canvas_is_required() {
        // テスト項目: --canvas は必須
        assert!(ClientArgs::try_parse_from(["noteboard-client"]).is_err());
    }
}
