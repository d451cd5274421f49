//! WebSocket balance feed
//!
//! Pushes post-mutation balance snapshots for one account so the
//! presentation layer renders what the ledger says instead of polling
//! or syncing balances across tabs itself.

use super::handlers::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use serde::Serialize;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::ledger::EntryReason;
use crate::money::Amount;

/// Events pushed to balance-feed clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsEvent {
    /// Current balance at connect time (and after feed lag)
    Snapshot {
        account_id: String,
        balance_cents: Amount,
        version: u64,
        timestamp: u64,
    },

    /// A ledger mutation landed for the subscribed account
    BalanceChanged {
        account_id: String,
        balance_cents: Amount,
        version: u64,
        reason: EntryReason,
        timestamp: u64,
    },

    /// Keep-alive
    Heartbeat { timestamp: u64 },
}

/// WebSocket endpoint handler
/// GET /ws/accounts/:id
pub async fn balance_feed_handler(
    ws: WebSocketUpgrade,
    Path(account_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, account_id, state))
}

async fn handle_connection(socket: WebSocket, account_id: String, state: Arc<AppState>) {
    let total = state.metrics.websocket_connected();
    info!(
        account_id = %account_id,
        total, "Balance feed client connected"
    );

    let (mut sender, mut receiver) = socket.split();
    // Subscribe before the initial snapshot so no mutation can slip
    // between snapshot and stream.
    let mut feed = state.engine.subscribe_balances();
    let mut heartbeat = interval(state.heartbeat_interval);
    // The first tick fires immediately; consume it so heartbeats start
    // one interval after connect.
    heartbeat.tick().await;

    if let Ok(snapshot) = snapshot_event(&state, &account_id) {
        if send_event(&mut sender, &snapshot).await.is_err() {
            finish(&state, &account_id);
            return;
        }
    }

    loop {
        tokio::select! {
            event = feed.recv() => match event {
                Ok(event) if event.account_id == account_id => {
                    let push = WsEvent::BalanceChanged {
                        account_id: event.account_id,
                        balance_cents: event.balance,
                        version: event.version,
                        reason: event.reason,
                        timestamp: now_secs(),
                    };
                    if send_event(&mut sender, &push).await.is_err() {
                        break;
                    }
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(account_id = %account_id, skipped, "Balance feed lagged; resyncing");
                    // Resync from the ledger; the feed is a wake-up
                    // channel, the ledger is the source of truth.
                    if let Ok(snapshot) = snapshot_event(&state, &account_id) {
                        if send_event(&mut sender, &snapshot).await.is_err() {
                            break;
                        }
                    }
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = heartbeat.tick() => {
                let beat = WsEvent::Heartbeat { timestamp: now_secs() };
                if send_event(&mut sender, &beat).await.is_err() {
                    break;
                }
            },
            msg = receiver.next() => match msg {
                Some(Ok(Message::Close(_))) | None => {
                    debug!(account_id = %account_id, "Client closed balance feed");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(account_id = %account_id, "Balance feed socket error: {}", e);
                    break;
                }
            },
        }
    }

    finish(&state, &account_id);
}

fn snapshot_event(state: &AppState, account_id: &str) -> Result<WsEvent, ()> {
    let (balance, version) = state.engine.balance(account_id).map_err(|_| ())?;
    Ok(WsEvent::Snapshot {
        account_id: account_id.to_string(),
        balance_cents: balance,
        version,
        timestamp: now_secs(),
    })
}

async fn send_event(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &WsEvent,
) -> Result<(), ()> {
    let text = serde_json::to_string(event).map_err(|_| ())?;
    sender.send(Message::Text(text)).await.map_err(|_| ())
}

fn finish(state: &AppState, account_id: &str) {
    let remaining = state.metrics.websocket_disconnected();
    info!(
        account_id = %account_id,
        remaining, "Balance feed client disconnected"
    );
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
