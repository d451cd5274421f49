//! Route Definitions
//!
//! Maps URLs to handlers with type-safe routing.

use super::{
    handlers::*, monitoring::metrics_handler, websocket::balance_feed_handler,
};
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build the API router with all endpoints
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check (high priority)
        .route("/health", get(health_handler))

        // Service status
        .route("/status", get(status_handler))

        // Account endpoints
        .route("/accounts/:id/open", post(open_account_handler))
        .route("/accounts/:id/balance", get(balance_handler))
        .route("/accounts/:id/history", get(history_handler))
        .route("/accounts/:id/stats", get(stats_handler))
        .route("/accounts/:id/deposit", post(deposit_handler))
        .route("/accounts/:id/withdraw", post(withdraw_handler))

        // Betting endpoint
        .route("/bets", post(place_bet_handler))

        // Draw verification for provably-fair audits
        .route("/verify", post(verify_draw_handler))

        // WebSocket balance feed
        .route("/ws/accounts/:id", get(balance_feed_handler))

        // Metrics endpoint for Prometheus
        .route("/metrics", get(metrics_handler))

        // Attach shared state
        .with_state(state)
}
