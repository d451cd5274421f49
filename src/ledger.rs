//! Balance ledger
//!
//! The single source of truth for funds. Each account carries a balance
//! and a version that increments on every successful mutation; every
//! mutation appends one immutable audit entry. Commits are optimistic:
//! an attempt snapshots the version, then lands only if the version is
//! unchanged, retrying internally with bounded backoff on conflict.
//! Replaying an idempotency token returns the recorded result without
//! touching the balance.

use crate::config::LedgerConfig;
use crate::errors::LedgerError;
use crate::money::Amount;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Why a ledger entry exists.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EntryReason {
    AccountOpened,
    Deposit,
    Withdrawal,
    WagerWin,
    WagerLoss,
    WagerTie,
}

impl EntryReason {
    pub fn is_wager(self) -> bool {
        matches!(
            self,
            EntryReason::WagerWin | EntryReason::WagerLoss | EntryReason::WagerTie
        )
    }
}

impl fmt::Display for EntryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryReason::AccountOpened => write!(f, "account_opened"),
            EntryReason::Deposit => write!(f, "deposit"),
            EntryReason::Withdrawal => write!(f, "withdrawal"),
            EntryReason::WagerWin => write!(f, "wager_win"),
            EntryReason::WagerLoss => write!(f, "wager_loss"),
            EntryReason::WagerTie => write!(f, "wager_tie"),
        }
    }
}

/// One immutable audit record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub account_id: String,
    pub delta: i64,
    pub reason: EntryReason,
    pub balance_after: Amount,
    pub version: u64,
    pub idempotency_token: String,
    pub timestamp: u64,
}

/// Published on the balance feed after every successful mutation.
#[derive(Debug, Clone, Serialize)]
pub struct BalanceEvent {
    pub account_id: String,
    pub balance: Amount,
    pub version: u64,
    pub reason: EntryReason,
}

/// Aggregate wager statistics derived from the audit trail.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountStats {
    pub bets: u64,
    pub wins: u64,
    pub losses: u64,
    pub ties: u64,
    /// Net result of all wagers in minor units (signed).
    pub net: i64,
}

struct AccountRecord {
    balance: Amount,
    version: u64,
    entries: Vec<LedgerEntry>,
    token_index: HashMap<String, usize>,
}

enum Commit {
    Landed(Amount, u64),
    /// The version moved between snapshot and commit; retry.
    Conflict,
}

/// Authoritative per-account balances with audit trail and change feed.
pub struct BalanceLedger {
    accounts: DashMap<String, AccountRecord>,
    events: broadcast::Sender<BalanceEvent>,
    config: LedgerConfig,
}

impl BalanceLedger {
    pub fn new(config: LedgerConfig) -> Self {
        let (events, _) = broadcast::channel(config.feed_capacity);
        Self {
            accounts: DashMap::new(),
            events,
            config,
        }
    }

    /// Open a fresh account with a zero balance.
    pub fn open_account(&self, account_id: &str) -> Result<(Amount, u64), LedgerError> {
        use dashmap::mapref::entry::Entry;

        match self.accounts.entry(account_id.to_string()) {
            Entry::Occupied(_) => Err(LedgerError::DuplicateAccount {
                account_id: account_id.to_string(),
            }),
            Entry::Vacant(slot) => {
                let entry = LedgerEntry {
                    account_id: account_id.to_string(),
                    delta: 0,
                    reason: EntryReason::AccountOpened,
                    balance_after: Amount::ZERO,
                    version: 1,
                    idempotency_token: format!("open:{}", account_id),
                    timestamp: now_secs(),
                };

                let mut token_index = HashMap::new();
                token_index.insert(entry.idempotency_token.clone(), 0);

                slot.insert(AccountRecord {
                    balance: Amount::ZERO,
                    version: 1,
                    entries: vec![entry],
                    token_index,
                });

                let _ = self.events.send(BalanceEvent {
                    account_id: account_id.to_string(),
                    balance: Amount::ZERO,
                    version: 1,
                    reason: EntryReason::AccountOpened,
                });

                Ok((Amount::ZERO, 1))
            }
        }
    }

    /// Current balance and version.
    pub fn balance(&self, account_id: &str) -> Result<(Amount, u64), LedgerError> {
        let record = self
            .accounts
            .get(account_id)
            .ok_or_else(|| LedgerError::UnknownAccount {
                account_id: account_id.to_string(),
            })?;
        Ok((record.balance, record.version))
    }

    /// Apply a signed delta exactly once per idempotency token.
    ///
    /// Balance read, delta application, version increment and audit
    /// append happen in one critical section per account; version
    /// conflicts between snapshot and commit are retried here and never
    /// surfaced to the caller.
    pub async fn apply_delta(
        &self,
        account_id: &str,
        delta: i64,
        reason: EntryReason,
        idempotency_token: &str,
    ) -> Result<(Amount, u64), LedgerError> {
        let mut delay = Duration::from_millis(self.config.backoff_base_ms);
        let max_delay = Duration::from_millis(self.config.backoff_max_ms);

        for attempt in 1..=self.config.max_apply_attempts {
            // Snapshot phase: replay check and precondition against the
            // current balance, without holding the account exclusively.
            let expected_version = {
                let record =
                    self.accounts
                        .get(account_id)
                        .ok_or_else(|| LedgerError::UnknownAccount {
                            account_id: account_id.to_string(),
                        })?;

                if let Some(&ix) = record.token_index.get(idempotency_token) {
                    let entry = &record.entries[ix];
                    debug!(
                        account_id,
                        idempotency_token, "Replayed idempotency token; returning recorded result"
                    );
                    return Ok((entry.balance_after, entry.version));
                }

                if record.balance.checked_apply(delta).is_none() {
                    return Err(overdraft_or_overflow(account_id, delta));
                }

                record.version
            };

            // Commit phase: land only if the version is still the one we saw.
            match self.try_commit(account_id, delta, reason, idempotency_token, expected_version)? {
                Commit::Landed(balance, version) => return Ok((balance, version)),
                Commit::Conflict => {
                    if attempt < self.config.max_apply_attempts {
                        let jitter_ms =
                            rand::thread_rng().gen_range(0..=delay.as_millis() as u64);
                        tokio::time::sleep(delay + Duration::from_millis(jitter_ms)).await;
                        delay = (delay * 2).min(max_delay);
                    }
                }
            }
        }

        warn!(
            account_id,
            attempts = self.config.max_apply_attempts,
            "Ledger commit retries exhausted"
        );
        Err(LedgerError::Contended {
            account_id: account_id.to_string(),
        })
    }

    fn try_commit(
        &self,
        account_id: &str,
        delta: i64,
        reason: EntryReason,
        idempotency_token: &str,
        expected_version: u64,
    ) -> Result<Commit, LedgerError> {
        let mut record =
            self.accounts
                .get_mut(account_id)
                .ok_or_else(|| LedgerError::UnknownAccount {
                    account_id: account_id.to_string(),
                })?;
        let record = record.value_mut();

        // A concurrent retry with the same token may have landed first.
        if let Some(&ix) = record.token_index.get(idempotency_token) {
            let entry = &record.entries[ix];
            return Ok(Commit::Landed(entry.balance_after, entry.version));
        }

        if record.version != expected_version {
            return Ok(Commit::Conflict);
        }

        let balance = record
            .balance
            .checked_apply(delta)
            .ok_or_else(|| overdraft_or_overflow(account_id, delta))?;
        let version = record.version + 1;

        let entry_index = record.entries.len();
        record.entries.push(LedgerEntry {
            account_id: account_id.to_string(),
            delta,
            reason,
            balance_after: balance,
            version,
            idempotency_token: idempotency_token.to_string(),
            timestamp: now_secs(),
        });
        record
            .token_index
            .insert(idempotency_token.to_string(), entry_index);
        record.balance = balance;
        record.version = version;

        let _ = self.events.send(BalanceEvent {
            account_id: account_id.to_string(),
            balance,
            version,
            reason,
        });

        Ok(Commit::Landed(balance, version))
    }

    /// Audit trail for one account, newest first.
    pub fn history(
        &self,
        account_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, LedgerError> {
        let record = self
            .accounts
            .get(account_id)
            .ok_or_else(|| LedgerError::UnknownAccount {
                account_id: account_id.to_string(),
            })?;
        Ok(record
            .entries
            .iter()
            .rev()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    /// Wager statistics derived from the audit trail.
    pub fn stats(&self, account_id: &str) -> Result<AccountStats, LedgerError> {
        let record = self
            .accounts
            .get(account_id)
            .ok_or_else(|| LedgerError::UnknownAccount {
                account_id: account_id.to_string(),
            })?;

        let mut stats = AccountStats::default();
        for entry in &record.entries {
            match entry.reason {
                EntryReason::WagerWin => stats.wins += 1,
                EntryReason::WagerLoss => stats.losses += 1,
                EntryReason::WagerTie => stats.ties += 1,
                _ => continue,
            }
            stats.bets += 1;
            stats.net += entry.delta;
        }
        Ok(stats)
    }

    /// Subscribe to post-mutation balance snapshots.
    pub fn subscribe(&self) -> broadcast::Receiver<BalanceEvent> {
        self.events.subscribe()
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }
}

fn overdraft_or_overflow(account_id: &str, delta: i64) -> LedgerError {
    if delta < 0 {
        LedgerError::InsufficientFunds {
            account_id: account_id.to_string(),
        }
    } else {
        LedgerError::AmountOverflow {
            account_id: account_id.to_string(),
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn ledger() -> BalanceLedger {
        BalanceLedger::new(LedgerConfig {
            backoff_base_ms: 1,
            backoff_max_ms: 2,
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_open_and_duplicate_account() {
        let ledger = ledger();

        assert_eq!(ledger.open_account("alice").unwrap(), (Amount::ZERO, 1));
        assert_eq!(
            ledger.open_account("alice").unwrap_err(),
            LedgerError::DuplicateAccount {
                account_id: "alice".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_apply_delta_increments_version_and_appends_entry() {
        let ledger = ledger();
        ledger.open_account("alice").unwrap();

        let (balance, version) = ledger
            .apply_delta("alice", 500, EntryReason::Deposit, "dep-1")
            .await
            .unwrap();
        assert_eq!(balance, Amount::from_cents(500));
        assert_eq!(version, 2);

        let (balance, version) = ledger
            .apply_delta("alice", -200, EntryReason::Withdrawal, "wd-1")
            .await
            .unwrap();
        assert_eq!(balance, Amount::from_cents(300));
        assert_eq!(version, 3);

        let history = ledger.history("alice", 10, 0).unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].reason, EntryReason::Withdrawal);
        assert_eq!(history[2].reason, EntryReason::AccountOpened);
    }

    #[tokio::test]
    async fn test_token_replay_returns_recorded_result_without_reapplying() {
        let ledger = ledger();
        ledger.open_account("alice").unwrap();

        let first = ledger
            .apply_delta("alice", 500, EntryReason::Deposit, "dep-1")
            .await
            .unwrap();
        let replay = ledger
            .apply_delta("alice", 500, EntryReason::Deposit, "dep-1")
            .await
            .unwrap();

        assert_eq!(first, replay);
        assert_eq!(ledger.balance("alice").unwrap(), (Amount::from_cents(500), 2));

        // Exactly one deposit entry.
        let deposits: Vec<_> = ledger
            .history("alice", 10, 0)
            .unwrap()
            .into_iter()
            .filter(|e| e.reason == EntryReason::Deposit)
            .collect();
        assert_eq!(deposits.len(), 1);
    }

    #[tokio::test]
    async fn test_insufficient_funds_leaves_account_untouched() {
        let ledger = ledger();
        ledger.open_account("alice").unwrap();
        ledger
            .apply_delta("alice", 30, EntryReason::Deposit, "dep-1")
            .await
            .unwrap();

        let err = ledger
            .apply_delta("alice", -50, EntryReason::WagerLoss, "bet-1")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientFunds {
                account_id: "alice".to_string()
            }
        );

        assert_eq!(ledger.balance("alice").unwrap(), (Amount::from_cents(30), 2));
        assert_eq!(ledger.history("alice", 10, 0).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_account() {
        let ledger = ledger();
        assert!(matches!(
            ledger.balance("ghost"),
            Err(LedgerError::UnknownAccount { .. })
        ));
        assert!(matches!(
            ledger
                .apply_delta("ghost", 10, EntryReason::Deposit, "dep-1")
                .await,
            Err(LedgerError::UnknownAccount { .. })
        ));
    }

    #[tokio::test]
    async fn test_concurrent_debits_never_overdraw() {
        let ledger = Arc::new(ledger());
        ledger.open_account("alice").unwrap();
        ledger
            .apply_delta("alice", 150, EntryReason::Deposit, "dep-1")
            .await
            .unwrap();

        let a = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .apply_delta("alice", -100, EntryReason::WagerLoss, "bet-a")
                    .await
            })
        };
        let b = {
            let ledger = ledger.clone();
            tokio::spawn(async move {
                ledger
                    .apply_delta("alice", -100, EntryReason::WagerLoss, "bet-b")
                    .await
            })
        };

        let results = vec![a.await.unwrap(), b.await.unwrap()];
        let ok = results.iter().filter(|r| r.is_ok()).count();
        let insufficient = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientFunds { .. })))
            .count();

        assert_eq!(ok, 1);
        assert_eq!(insufficient, 1);
        assert_eq!(ledger.balance("alice").unwrap().0, Amount::from_cents(50));
    }

    #[tokio::test]
    async fn test_balance_feed_publishes_mutations() {
        let ledger = ledger();
        let mut feed = ledger.subscribe();

        ledger.open_account("alice").unwrap();
        ledger
            .apply_delta("alice", 500, EntryReason::Deposit, "dep-1")
            .await
            .unwrap();

        let opened = feed.recv().await.unwrap();
        assert_eq!(opened.reason, EntryReason::AccountOpened);

        let deposited = feed.recv().await.unwrap();
        assert_eq!(deposited.reason, EntryReason::Deposit);
        assert_eq!(deposited.balance, Amount::from_cents(500));
        assert_eq!(deposited.version, 2);
    }

    #[tokio::test]
    async fn test_stats_cover_wagers_only() {
        let ledger = ledger();
        ledger.open_account("alice").unwrap();
        ledger
            .apply_delta("alice", 1_000, EntryReason::Deposit, "dep-1")
            .await
            .unwrap();
        ledger
            .apply_delta("alice", 100, EntryReason::WagerWin, "bet-1")
            .await
            .unwrap();
        ledger
            .apply_delta("alice", -300, EntryReason::WagerLoss, "bet-2")
            .await
            .unwrap();
        ledger
            .apply_delta("alice", 0, EntryReason::WagerTie, "bet-3")
            .await
            .unwrap();

        let stats = ledger.stats("alice").unwrap();
        assert_eq!(stats.bets, 3);
        assert_eq!(stats.wins, 1);
        assert_eq!(stats.losses, 1);
        assert_eq!(stats.ties, 1);
        assert_eq!(stats.net, -200);
    }
}
