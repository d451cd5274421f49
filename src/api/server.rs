//! API Server
//!
//! Server setup: middleware stack, shared state, graceful shutdown.

use super::{
    handlers::AppState,
    middleware::{create_cors_layer, request_id_middleware},
    monitoring::MetricsRegistry,
    routes::create_router,
};
use crate::games::engine::WagerEngine;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::signal;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
    pub service_name: String,
    pub version: String,
    pub heartbeat_interval_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
            service_name: "wagerhall".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            heartbeat_interval_secs: 30,
        }
    }
}

/// HTTP server wrapping the wager engine
pub struct ApiServer {
    config: ApiConfig,
    engine: Arc<WagerEngine>,
}

impl ApiServer {
    pub fn new(config: ApiConfig, engine: Arc<WagerEngine>) -> Self {
        Self { config, engine }
    }

    /// Start the API server
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize tracing for request and settlement logs
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "wagerhall=info,tower_http=info".into()),
            )
            .init();

        let app = self.create_app();
        let addr = self.get_socket_addr()?;

        info!("🎡 Starting Wagerhall API Server");
        info!("   Listen: http://{}", addr);
        self.log_server_info();

        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!("✅ API Server running");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("🛑 API Server stopped gracefully");
        Ok(())
    }

    /// Create the application with the middleware stack
    fn create_app(&self) -> axum::Router {
        let state = Arc::new(AppState {
            engine: self.engine.clone(),
            metrics: Arc::new(MetricsRegistry::new()),
            service: self.config.service_name.clone(),
            version: self.config.version.clone(),
            heartbeat_interval: Duration::from_secs(self.config.heartbeat_interval_secs),
        });

        create_router(state)
            // Request ID middleware (first for tracing)
            .layer(axum::middleware::from_fn(request_id_middleware))

            // CORS layer (before timeout to handle preflight)
            .layer(create_cors_layer(self.config.allowed_origins.clone()))

            // Timeout layer; a timed-out bet never mutated the ledger,
            // so the client may retry with the same idempotency token
            .layer(TimeoutLayer::new(Duration::from_secs(
                self.config.request_timeout_secs,
            )))

            // Tracing layer (last for complete request tracing)
            .layer(TraceLayer::new_for_http())
    }

    /// Get socket address from config
    fn get_socket_addr(&self) -> Result<SocketAddr, Box<dyn std::error::Error>> {
        Ok(SocketAddr::from((
            self.config.host.parse::<std::net::IpAddr>()?,
            self.config.port,
        )))
    }

    /// Log server information
    fn log_server_info(&self) {
        info!("📋 Server Configuration:");
        info!("   Service: {}", self.config.service_name);
        info!("   Version: {}", self.config.version);
        info!("   CORS: {:?}", self.config.allowed_origins);
        info!("   Request timeout: {}s", self.config.request_timeout_secs);

        info!("📊 Available endpoints:");
        info!("   GET  /health                 - Health check");
        info!("   GET  /status                 - Service status");
        info!("   POST /accounts/:id/open      - Open account");
        info!("   GET  /accounts/:id/balance   - Balance and version");
        info!("   GET  /accounts/:id/history   - Audit trail");
        info!("   GET  /accounts/:id/stats     - Wager statistics");
        info!("   POST /accounts/:id/deposit   - Credit funds");
        info!("   POST /accounts/:id/withdraw  - Debit funds");
        info!("   POST /bets                   - Place a bet");
        info!("   POST /verify                 - Verify a draw trace");
        info!("   GET  /ws/accounts/:id        - Balance feed (WebSocket)");
        info!("   GET  /metrics                - Prometheus metrics");
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received terminate signal");
        },
    }
}
