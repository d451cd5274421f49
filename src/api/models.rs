//! API Request/Response Models
//!
//! Wire types for the account and betting endpoints. Settlements and
//! ledger entries serialize directly; these wrappers add request
//! decoding and pagination framing.

use crate::games::types::{DrawnResult, GameKind, PlayerChoice, VrfTrace, WagerRequest};
use crate::ledger::{AccountStats, LedgerEntry};
use crate::money::Amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

/// Service status response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub service: String,
    pub version: String,
    pub server_time: DateTime<Utc>,
    pub accounts: usize,
    pub in_flight_bets: usize,
}

/// Balance snapshot for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalanceResponse {
    pub account_id: String,
    pub balance_cents: Amount,
    pub version: u64,
}

/// Deposit/withdraw request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveFundsRequest {
    pub amount_cents: u64,
    pub idempotency_token: String,
}

/// Bet placement request body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBetRequest {
    pub account_id: String,
    pub game: GameKind,
    pub stake_cents: u64,
    pub choice: PlayerChoice,
    pub idempotency_token: String,
}

impl From<PlaceBetRequest> for WagerRequest {
    fn from(request: PlaceBetRequest) -> Self {
        WagerRequest {
            account_id: request.account_id,
            game: request.game,
            stake: Amount::from_cents(request.stake_cents),
            choice: request.choice,
            idempotency_token: request.idempotency_token,
        }
    }
}

/// History query parameters
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    #[serde(default = "default_history_limit")]
    pub limit: usize,
    #[serde(default)]
    pub offset: usize,
}

fn default_history_limit() -> usize {
    20
}

/// Paginated audit trail for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub account_id: String,
    pub entries: Vec<LedgerEntry>,
    pub pagination: PaginationInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationInfo {
    pub limit: usize,
    pub offset: usize,
    pub total_returned: usize,
}

/// Wager statistics for one account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsResponse {
    pub account_id: String,
    #[serde(flatten)]
    pub stats: AccountStats,
}

/// Request to verify a draw trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyDrawRequest {
    pub game: GameKind,
    pub trace: VrfTrace,
}

/// Response from draw verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyDrawResponse {
    pub is_valid: bool,
    /// The result the trace encodes, recomputed server-side when valid.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<DrawnResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
