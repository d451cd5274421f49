//! Request Handlers
//!
//! Thin adapters over the wager engine: decode the request, call the
//! core, encode the receipt. No session logic lives here; the account
//! id is explicit in every route.

use super::{errors::ApiError, middleware::RequestId, models::*, monitoring::MetricsRegistry};
use crate::games::engine::WagerEngine;
use crate::games::generator::OutcomeGenerator;
use crate::games::types::{Settlement, WagerRequest};
use crate::money::Amount;
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state
pub struct AppState {
    pub engine: Arc<WagerEngine>,
    pub metrics: Arc<MetricsRegistry>,
    pub service: String,
    pub version: String,
    pub heartbeat_interval: Duration,
}

/// Health check handler - minimal response time
/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
    })
}

/// Service status handler
/// GET /status
pub async fn status_handler(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    Json(StatusResponse {
        service: state.service.clone(),
        version: state.version.clone(),
        server_time: Utc::now(),
        accounts: state.engine.account_count(),
        in_flight_bets: state.engine.in_flight_count(),
    })
}

/// Open a fresh account with a zero balance
/// POST /accounts/:id/open
pub async fn open_account_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    match state.engine.open_account(&account_id) {
        Ok((balance, version)) => {
            state.metrics.record_http_request(true);
            Ok(Json(BalanceResponse {
                account_id,
                balance_cents: balance,
                version,
            }))
        }
        Err(err) => {
            state.metrics.record_http_request(false);
            Err(ApiError::from_wager(request_id.0, err))
        }
    }
}

/// Current balance and ledger version
/// GET /accounts/:id/balance
pub async fn balance_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<BalanceResponse>, ApiError> {
    match state.engine.balance(&account_id) {
        Ok((balance, version)) => {
            state.metrics.record_http_request(true);
            Ok(Json(BalanceResponse {
                account_id,
                balance_cents: balance,
                version,
            }))
        }
        Err(err) => {
            state.metrics.record_http_request(false);
            Err(ApiError::from_wager(request_id.0, err))
        }
    }
}

/// Audit trail, newest first
/// GET /accounts/:id/history?limit={n}&offset={n}
pub async fn history_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    // Enforce maximum page size
    let limit = params.limit.min(200);

    match state.engine.history(&account_id, limit, params.offset) {
        Ok(entries) => {
            state.metrics.record_http_request(true);
            let total_returned = entries.len();
            Ok(Json(HistoryResponse {
                account_id,
                entries,
                pagination: PaginationInfo {
                    limit,
                    offset: params.offset,
                    total_returned,
                },
            }))
        }
        Err(err) => {
            state.metrics.record_http_request(false);
            Err(ApiError::from_wager(request_id.0, err))
        }
    }
}

/// Wager statistics
/// GET /accounts/:id/stats
pub async fn stats_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
) -> Result<Json<StatsResponse>, ApiError> {
    match state.engine.stats(&account_id) {
        Ok(stats) => {
            state.metrics.record_http_request(true);
            Ok(Json(StatsResponse { account_id, stats }))
        }
        Err(err) => {
            state.metrics.record_http_request(false);
            Err(ApiError::from_wager(request_id.0, err))
        }
    }
}

/// Credit funds
/// POST /accounts/:id/deposit
pub async fn deposit_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Json(body): Json<MoveFundsRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let amount = Amount::from_cents(body.amount_cents);
    match state
        .engine
        .deposit(&account_id, amount, &body.idempotency_token)
        .await
    {
        Ok((balance, version)) => {
            state.metrics.record_http_request(true);
            state.metrics.record_deposit();
            Ok(Json(BalanceResponse {
                account_id,
                balance_cents: balance,
                version,
            }))
        }
        Err(err) => {
            state.metrics.record_http_request(false);
            Err(ApiError::from_wager(request_id.0, err))
        }
    }
}

/// Debit funds
/// POST /accounts/:id/withdraw
pub async fn withdraw_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(account_id): Path<String>,
    Json(body): Json<MoveFundsRequest>,
) -> Result<Json<BalanceResponse>, ApiError> {
    let amount = Amount::from_cents(body.amount_cents);
    match state
        .engine
        .withdraw(&account_id, amount, &body.idempotency_token)
        .await
    {
        Ok((balance, version)) => {
            state.metrics.record_http_request(true);
            state.metrics.record_withdrawal();
            Ok(Json(BalanceResponse {
                account_id,
                balance_cents: balance,
                version,
            }))
        }
        Err(err) => {
            state.metrics.record_http_request(false);
            Err(ApiError::from_wager(request_id.0, err))
        }
    }
}

/// Place a bet and return the settlement receipt
/// POST /bets
pub async fn place_bet_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(body): Json<PlaceBetRequest>,
) -> Result<Json<Settlement>, ApiError> {
    let request: WagerRequest = body.into();
    let stake = request.stake;

    match state.engine.place_bet(request).await {
        Ok(settlement) => {
            state.metrics.record_http_request(true);
            state.metrics.record_settlement(settlement.category, stake);
            Ok(Json(settlement))
        }
        Err(err) => {
            state.metrics.record_http_request(false);
            state.metrics.record_rejection();
            Err(ApiError::from_wager(request_id.0, err))
        }
    }
}

/// Verify a draw trace and recompute the result it encodes
/// POST /verify
pub async fn verify_draw_handler(
    State(state): State<Arc<AppState>>,
    Json(body): Json<VerifyDrawRequest>,
) -> Json<VerifyDrawResponse> {
    state.metrics.record_http_request(true);

    match OutcomeGenerator::verify(&body.trace) {
        Ok(true) => {
            let result = state
                .engine
                .generator()
                .recompute(body.game, &body.trace)
                .ok();
            Json(VerifyDrawResponse {
                is_valid: true,
                result,
                error: None,
            })
        }
        Ok(false) => Json(VerifyDrawResponse {
            is_valid: false,
            result: None,
            error: None,
        }),
        Err(e) => Json(VerifyDrawResponse {
            is_valid: false,
            result: None,
            error: Some(e.to_string()),
        }),
    }
}
