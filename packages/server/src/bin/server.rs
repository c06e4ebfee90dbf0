//! Noteboard fan-out server.
//!
//! Relays note list updates between clients viewing the same canvas.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin noteboard-server -- --port 8080
//! ```

use clap::Parser;
use noteboard_server::{ServerArgs, ServerConfig};
use noteboard_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let args = ServerArgs::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = noteboard_server::run_server(ServerConfig::from(args)).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
