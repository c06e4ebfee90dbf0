//! Interactive Noteboard client.
//!
//! Joins a canvas, prints remote updates and lets you add and reorder notes.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin noteboard-client -- --canvas demo
//! ```

use clap::Parser;
use noteboard_client::ClientArgs;
use noteboard_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let args = ClientArgs::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    if let Err(e) = noteboard_client::run_client(args).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
