//! Wagerhall Server Binary
//!
//! Wires the ledger, outcome generator and wager engine together and
//! serves the HTTP API.

use clap::Parser;
use std::sync::Arc;
use wagerhall::api::{ApiConfig, ApiServer};
use wagerhall::config::WagerhallConfig;
use wagerhall::games::{engine::WagerEngine, generator::OutcomeGenerator};
use wagerhall::ledger::BalanceLedger;

#[derive(Parser, Debug)]
#[command(name = "wagerhall")]
#[command(about = "Wagerhall betting core API server", long_about = None)]
struct Args {
    /// API server host
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// API server port
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Path to a TOML configuration file (defaults apply when omitted)
    #[arg(long)]
    config: Option<String>,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long, default_value = "*")]
    cors_origins: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Service name reported by /status
    #[arg(long, default_value = "wagerhall")]
    service_name: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            println!("📂 Loading configuration: {}", path);
            WagerhallConfig::load(path)?
        }
        None => {
            let config = WagerhallConfig::default();
            config.validate()?;
            config
        }
    };

    // Parse CORS origins
    let allowed_origins: Vec<String> = args
        .cors_origins
        .split(',')
        .map(|s| s.trim().to_string())
        .collect();

    // Wire the core: ledger -> generator -> engine
    let ledger = Arc::new(BalanceLedger::new(config.ledger.clone()));
    let generator = Arc::new(OutcomeGenerator::new_random(config.games.clone()));
    println!("🔑 House draw public key: {}", generator.public_key_hex());

    let engine = Arc::new(WagerEngine::new(ledger, generator, config.games.clone()));

    let api_config = ApiConfig {
        host: args.host,
        port: args.port,
        allowed_origins,
        request_timeout_secs: args.timeout,
        service_name: args.service_name,
        version: env!("CARGO_PKG_VERSION").to_string(),
        heartbeat_interval_secs: config.monitoring.heartbeat_interval_seconds,
    };

    let server = ApiServer::new(api_config, engine);
    server.run().await?;

    Ok(())
}
