//! Monitoring & Metrics
//!
//! Wagering counters with Prometheus text exposition at `/metrics`.

use crate::games::types::SettlementCategory;
use crate::money::Amount;
use axum::extract::State;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Prometheus-compatible metrics registry
pub struct MetricsRegistry {
    /// HTTP metrics
    pub http_requests_total: AtomicU64,
    pub errors_total: AtomicU64,

    /// Betting metrics
    pub bets_settled_total: AtomicU64,
    pub bets_rejected_total: AtomicU64,
    pub wins_total: AtomicU64,
    pub losses_total: AtomicU64,
    pub ties_total: AtomicU64,
    pub amount_wagered_cents_total: AtomicU64,

    /// Funds movement metrics
    pub deposits_total: AtomicU64,
    pub withdrawals_total: AtomicU64,

    /// WebSocket metrics
    pub websocket_connections_active: AtomicU64,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            errors_total: AtomicU64::new(0),
            bets_settled_total: AtomicU64::new(0),
            bets_rejected_total: AtomicU64::new(0),
            wins_total: AtomicU64::new(0),
            losses_total: AtomicU64::new(0),
            ties_total: AtomicU64::new(0),
            amount_wagered_cents_total: AtomicU64::new(0),
            deposits_total: AtomicU64::new(0),
            withdrawals_total: AtomicU64::new(0),
            websocket_connections_active: AtomicU64::new(0),
        }
    }

    /// Record a settled bet by category.
    pub fn record_settlement(&self, category: SettlementCategory, stake: Amount) {
        self.bets_settled_total.fetch_add(1, Ordering::SeqCst);
        self.amount_wagered_cents_total
            .fetch_add(stake.cents(), Ordering::SeqCst);
        match category {
            SettlementCategory::Win => self.wins_total.fetch_add(1, Ordering::SeqCst),
            SettlementCategory::Lose => self.losses_total.fetch_add(1, Ordering::SeqCst),
            SettlementCategory::Tie => self.ties_total.fetch_add(1, Ordering::SeqCst),
        };
    }

    /// Record a rejected bet attempt.
    pub fn record_rejection(&self) {
        self.bets_rejected_total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_deposit(&self) {
        self.deposits_total.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_withdrawal(&self) {
        self.withdrawals_total.fetch_add(1, Ordering::SeqCst);
    }

    /// Record an HTTP request outcome.
    pub fn record_http_request(&self, success: bool) {
        self.http_requests_total.fetch_add(1, Ordering::SeqCst);
        if !success {
            self.errors_total.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub fn websocket_connected(&self) -> u64 {
        self.websocket_connections_active
            .fetch_add(1, Ordering::SeqCst)
            + 1
    }

    pub fn websocket_disconnected(&self) -> u64 {
        self.websocket_connections_active
            .fetch_sub(1, Ordering::SeqCst)
            .saturating_sub(1)
    }

    /// Generate Prometheus metrics format
    pub fn to_prometheus_format(&self, accounts: usize, in_flight_bets: usize) -> String {
        let mut output = String::new();

        let counters = [
            (
                "wagerhall_http_requests_total",
                "Total number of HTTP requests",
                self.http_requests_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_errors_total",
                "Total number of failed HTTP requests",
                self.errors_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_bets_settled_total",
                "Total number of settled bets",
                self.bets_settled_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_bets_rejected_total",
                "Total number of rejected bet attempts",
                self.bets_rejected_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_wins_total",
                "Total number of winning settlements",
                self.wins_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_losses_total",
                "Total number of losing settlements",
                self.losses_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_ties_total",
                "Total number of tied settlements",
                self.ties_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_amount_wagered_cents_total",
                "Total stake volume in minor units",
                self.amount_wagered_cents_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_deposits_total",
                "Total number of deposits",
                self.deposits_total.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_withdrawals_total",
                "Total number of withdrawals",
                self.withdrawals_total.load(Ordering::SeqCst),
            ),
        ];

        for (name, help, value) in counters {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} counter\n{name} {value}\n\n"
            ));
        }

        let gauges = [
            (
                "wagerhall_websocket_connections_active",
                "Currently connected balance-feed clients",
                self.websocket_connections_active.load(Ordering::SeqCst),
            ),
            (
                "wagerhall_accounts",
                "Number of open accounts",
                accounts as u64,
            ),
            (
                "wagerhall_in_flight_bets",
                "Bet attempts currently being settled",
                in_flight_bets as u64,
            ),
        ];

        for (name, help, value) in gauges {
            output.push_str(&format!(
                "# HELP {name} {help}\n# TYPE {name} gauge\n{name} {value}\n\n"
            ));
        }

        output
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// GET /metrics - Prometheus exposition
pub async fn metrics_handler(State(state): State<Arc<super::handlers::AppState>>) -> String {
    state.metrics.to_prometheus_format(
        state.engine.account_count(),
        state.engine.in_flight_count(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settlement_counters() {
        let metrics = MetricsRegistry::new();
        metrics.record_settlement(SettlementCategory::Win, Amount::from_cents(100));
        metrics.record_settlement(SettlementCategory::Lose, Amount::from_cents(50));
        metrics.record_rejection();

        assert_eq!(metrics.bets_settled_total.load(Ordering::SeqCst), 2);
        assert_eq!(metrics.wins_total.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.losses_total.load(Ordering::SeqCst), 1);
        assert_eq!(metrics.bets_rejected_total.load(Ordering::SeqCst), 1);
        assert_eq!(
            metrics.amount_wagered_cents_total.load(Ordering::SeqCst),
            150
        );
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = MetricsRegistry::new();
        metrics.record_settlement(SettlementCategory::Win, Amount::from_cents(100));

        let output = metrics.to_prometheus_format(3, 1);
        assert!(output.contains("wagerhall_bets_settled_total 1"));
        assert!(output.contains("wagerhall_accounts 3"));
        assert!(output.contains("# TYPE wagerhall_in_flight_bets gauge"));
    }
}
