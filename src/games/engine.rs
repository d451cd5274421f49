//! Wagering transaction core
//!
//! Orchestrates one bet end-to-end: validate, draw, evaluate, settle.
//! Each attempt walks Received -> Validated -> OutcomeDrawn -> Evaluated
//! -> Settled, with Rejected terminal from the first two states. A
//! settled idempotency token short-circuits to the recorded receipt; a
//! token whose first attempt is still running parks the duplicate on a
//! oneshot waiter so both callers observe the same settlement.

use crate::config::GamesConfig;
use crate::errors::WagerError;
use crate::games::evaluator;
use crate::games::generator::OutcomeGenerator;
use crate::games::types::{Settlement, SettlementCategory, WagerRequest};
use crate::ledger::{AccountStats, BalanceEvent, BalanceLedger, EntryReason, LedgerEntry};
use crate::money::Amount;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::{broadcast, oneshot};
use tracing::debug;
use uuid::Uuid;

/// (account id, idempotency token): one logical bet attempt.
type ReceiptKey = (String, String);

/// The wagering engine exposed to presentation-facing adapters.
pub struct WagerEngine {
    ledger: Arc<BalanceLedger>,
    generator: Arc<OutcomeGenerator>,
    config: GamesConfig,
    /// Settled receipts, replayed verbatim for duplicate tokens.
    receipts: DashMap<ReceiptKey, Settlement>,
    /// Duplicates arriving while the first attempt runs park here.
    in_flight: DashMap<ReceiptKey, Vec<oneshot::Sender<Result<Settlement, WagerError>>>>,
}

impl WagerEngine {
    pub fn new(
        ledger: Arc<BalanceLedger>,
        generator: Arc<OutcomeGenerator>,
        config: GamesConfig,
    ) -> Self {
        Self {
            ledger,
            generator,
            config,
            receipts: DashMap::new(),
            in_flight: DashMap::new(),
        }
    }

    /// Place one bet. At most one financial effect per idempotency
    /// token, no matter how often or how concurrently it is submitted.
    pub async fn place_bet(&self, request: WagerRequest) -> Result<Settlement, WagerError> {
        let key = (
            request.account_id.clone(),
            request.idempotency_token.clone(),
        );

        if let Some(receipt) = self.receipts.get(&key) {
            debug!(
                account_id = %request.account_id,
                token = %request.idempotency_token,
                "Duplicate bet token; returning recorded settlement"
            );
            return Ok(receipt.clone());
        }

        // Claim the attempt, or park behind the one already running.
        let waiter = {
            use dashmap::mapref::entry::Entry;
            match self.in_flight.entry(key.clone()) {
                Entry::Occupied(mut slot) => {
                    let (tx, rx) = oneshot::channel();
                    slot.get_mut().push(tx);
                    Some(rx)
                }
                Entry::Vacant(slot) => {
                    // The first attempt may have settled between the
                    // receipt probe and this claim.
                    if let Some(receipt) = self.receipts.get(&key) {
                        return Ok(receipt.clone());
                    }
                    slot.insert(Vec::new());
                    None
                }
            }
        };

        if let Some(rx) = waiter {
            return match rx.await {
                Ok(result) => result,
                // First attempt dropped without resolving; transient,
                // the client may retry with the same token.
                Err(_) => Err(WagerError::Contended),
            };
        }

        // If this future is cancelled mid-attempt (request timeout),
        // the guard clears the claim so parked duplicates fail fast
        // instead of waiting forever; the ledger was not mutated.
        let mut claim = InFlightClaim {
            engine: self,
            key: key.clone(),
            armed: true,
        };

        let result = self.run_attempt(&request).await;

        if let Ok(settlement) = &result {
            self.receipts.insert(key.clone(), settlement.clone());
        }
        claim.armed = false;
        if let Some((_, waiters)) = self.in_flight.remove(&key) {
            for waiter in waiters {
                let _ = waiter.send(result.clone());
            }
        }

        result
    }

    async fn run_attempt(&self, request: &WagerRequest) -> Result<Settlement, WagerError> {
        // Received -> Validated
        self.validate(request)?;

        // Validated -> OutcomeDrawn: exactly one draw per attempt.
        let bet_id = Uuid::new_v4().to_string();
        let outcome = self
            .generator
            .draw(request.game, &bet_id, &request.account_id)?;

        // OutcomeDrawn -> Evaluated
        let score = evaluator::evaluate(request.choice, &outcome.result, request.stake)?;
        let reason = match score.category {
            SettlementCategory::Win => EntryReason::WagerWin,
            SettlementCategory::Lose => EntryReason::WagerLoss,
            SettlementCategory::Tie => EntryReason::WagerTie,
        };

        // Evaluated -> Settled. An InsufficientFunds here means a
        // concurrent bet drained the balance after validation; the
        // attempt aborts with no mutation and the draw is discarded.
        let (balance, version) = self
            .ledger
            .apply_delta(
                &request.account_id,
                score.delta,
                reason,
                &request.idempotency_token,
            )
            .await?;

        debug!(
            account_id = %request.account_id,
            bet_id = %bet_id,
            game = %request.game,
            category = ?score.category,
            delta = score.delta,
            "Bet settled"
        );

        Ok(Settlement {
            bet_id,
            account_id: request.account_id.clone(),
            game: request.game,
            stake: request.stake,
            choice: request.choice,
            outcome,
            category: score.category,
            multiplier: score.multiplier,
            delta: score.delta,
            balance,
            version,
            settled_at: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs(),
        })
    }

    fn validate(&self, request: &WagerRequest) -> Result<(), WagerError> {
        let stake = request.stake.cents();
        if stake < self.config.min_stake_cents
            || stake > self.config.max_stake_cents
            || request.stake.signed().is_none()
        {
            return Err(WagerError::InvalidStake);
        }
        if !request.choice.belongs_to(request.game) {
            return Err(WagerError::InvalidChoice);
        }

        // Stake must not exceed the current balance. The ledger
        // re-checks at settlement in case a concurrent bet lands in
        // between; no outcome is disclosed on either rejection.
        let (balance, _) = self.ledger.balance(&request.account_id)?;
        if request.stake > balance {
            return Err(WagerError::InsufficientFunds {
                account_id: request.account_id.clone(),
            });
        }

        Ok(())
    }

    /// Open a fresh account with a zero balance.
    pub fn open_account(&self, account_id: &str) -> Result<(Amount, u64), WagerError> {
        Ok(self.ledger.open_account(account_id)?)
    }

    /// Current balance and ledger version.
    pub fn balance(&self, account_id: &str) -> Result<(Amount, u64), WagerError> {
        Ok(self.ledger.balance(account_id)?)
    }

    /// Credit funds; idempotent per token.
    pub async fn deposit(
        &self,
        account_id: &str,
        amount: Amount,
        idempotency_token: &str,
    ) -> Result<(Amount, u64), WagerError> {
        let delta = amount
            .signed()
            .filter(|d| *d > 0)
            .ok_or(WagerError::InvalidAmount)?;
        Ok(self
            .ledger
            .apply_delta(account_id, delta, EntryReason::Deposit, idempotency_token)
            .await?)
    }

    /// Debit funds; idempotent per token.
    pub async fn withdraw(
        &self,
        account_id: &str,
        amount: Amount,
        idempotency_token: &str,
    ) -> Result<(Amount, u64), WagerError> {
        let delta = amount
            .signed()
            .filter(|d| *d > 0)
            .ok_or(WagerError::InvalidAmount)?;
        Ok(self
            .ledger
            .apply_delta(
                account_id,
                -delta,
                EntryReason::Withdrawal,
                idempotency_token,
            )
            .await?)
    }

    /// Audit trail for one account, newest first.
    pub fn history(
        &self,
        account_id: &str,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>, WagerError> {
        Ok(self.ledger.history(account_id, limit, offset)?)
    }

    /// Wager statistics for one account.
    pub fn stats(&self, account_id: &str) -> Result<AccountStats, WagerError> {
        Ok(self.ledger.stats(account_id)?)
    }

    /// Subscribe to the ledger's balance feed.
    pub fn subscribe_balances(&self) -> broadcast::Receiver<BalanceEvent> {
        self.ledger.subscribe()
    }

    /// The outcome generator, for draw verification endpoints.
    pub fn generator(&self) -> &OutcomeGenerator {
        self.generator.as_ref()
    }

    pub fn account_count(&self) -> usize {
        self.ledger.account_count()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }
}

/// Clears a claimed in-flight slot when the owning attempt is dropped
/// before completing. Dropping the slot drops its waiters' senders, so
/// parked duplicates observe a transient failure and may retry.
struct InFlightClaim<'a> {
    engine: &'a WagerEngine,
    key: ReceiptKey,
    armed: bool,
}

impl Drop for InFlightClaim<'_> {
    fn drop(&mut self) {
        if self.armed {
            self.engine.in_flight.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LedgerConfig, WagerhallConfig};
    use crate::games::types::{GameKind, PlayerChoice, RpsMove, WheelColor};

    fn engine() -> Arc<WagerEngine> {
        let config = WagerhallConfig::testing();
        let ledger = Arc::new(BalanceLedger::new(config.ledger.clone()));
        let generator = Arc::new(OutcomeGenerator::new_random(config.games.clone()));
        Arc::new(WagerEngine::new(ledger, generator, config.games))
    }

    async fn funded_engine(cents: u64) -> Arc<WagerEngine> {
        let engine = engine();
        engine.open_account("alice").unwrap();
        engine
            .deposit("alice", Amount::from_cents(cents), "dep-1")
            .await
            .unwrap();
        engine
    }

    fn wheel_request(stake: u64, token: &str) -> WagerRequest {
        WagerRequest {
            account_id: "alice".to_string(),
            game: GameKind::Wheel,
            stake: Amount::from_cents(stake),
            choice: PlayerChoice::Color(WheelColor::Blue),
            idempotency_token: token.to_string(),
        }
    }

    #[tokio::test]
    async fn test_settlement_arithmetic() {
        let engine = funded_engine(1_000).await;

        let settlement = engine.place_bet(wheel_request(100, "bet-1")).await.unwrap();

        match settlement.category {
            SettlementCategory::Win => {
                assert_eq!(settlement.delta, 100);
                assert_eq!(settlement.multiplier, 2.0);
                assert_eq!(settlement.balance, Amount::from_cents(1_100));
            }
            SettlementCategory::Lose => {
                assert_eq!(settlement.delta, -100);
                assert_eq!(settlement.multiplier, 0.0);
                assert_eq!(settlement.balance, Amount::from_cents(900));
            }
            SettlementCategory::Tie => panic!("wheel has no tie state"),
        }
        // Open + deposit + wager.
        assert_eq!(settlement.version, 3);
    }

    #[tokio::test]
    async fn test_insufficient_funds_rejected_before_any_effect() {
        let engine = funded_engine(30).await;

        let err = engine.place_bet(wheel_request(50, "bet-1")).await.unwrap_err();
        assert_eq!(
            err,
            WagerError::InsufficientFunds {
                account_id: "alice".to_string()
            }
        );

        // Balance untouched, no wager entry, version unchanged.
        assert_eq!(engine.balance("alice").unwrap(), (Amount::from_cents(30), 2));
        let wagers: Vec<_> = engine
            .history("alice", 10, 0)
            .unwrap()
            .into_iter()
            .filter(|e| e.reason.is_wager())
            .collect();
        assert!(wagers.is_empty());
    }

    #[tokio::test]
    async fn test_validation_rejections() {
        let engine = funded_engine(1_000).await;

        // Zero stake.
        let err = engine.place_bet(wheel_request(0, "bet-1")).await.unwrap_err();
        assert_eq!(err, WagerError::InvalidStake);

        // Choice from the wrong game.
        let mut request = wheel_request(100, "bet-2");
        request.choice = PlayerChoice::Move(RpsMove::Rock);
        let err = engine.place_bet(request).await.unwrap_err();
        assert_eq!(err, WagerError::InvalidChoice);

        // Unknown account.
        let mut request = wheel_request(100, "bet-3");
        request.account_id = "ghost".to_string();
        let err = engine.place_bet(request).await.unwrap_err();
        assert_eq!(
            err,
            WagerError::UnknownAccount {
                account_id: "ghost".to_string()
            }
        );
    }

    #[tokio::test]
    async fn test_disabled_game_rejected() {
        let mut config = WagerhallConfig::testing();
        config.games.enable_wheel = false;
        let ledger = Arc::new(BalanceLedger::new(LedgerConfig::default()));
        let generator = Arc::new(OutcomeGenerator::new_random(config.games.clone()));
        let engine = WagerEngine::new(ledger, generator, config.games);

        engine.open_account("alice").unwrap();
        engine
            .deposit("alice", Amount::from_cents(1_000), "dep-1")
            .await
            .unwrap();

        let err = engine.place_bet(wheel_request(100, "bet-1")).await.unwrap_err();
        assert_eq!(err, WagerError::UnsupportedGameType(GameKind::Wheel));
    }

    #[tokio::test]
    async fn test_replayed_token_returns_identical_settlement() {
        let engine = funded_engine(1_000).await;

        let first = engine.place_bet(wheel_request(100, "bet-1")).await.unwrap();
        let replay = engine.place_bet(wheel_request(100, "bet-1")).await.unwrap();

        assert_eq!(first, replay);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&replay).unwrap()
        );

        // Exactly one wager entry.
        let wagers: Vec<_> = engine
            .history("alice", 10, 0)
            .unwrap()
            .into_iter()
            .filter(|e| e.reason.is_wager())
            .collect();
        assert_eq!(wagers.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_same_token_settles_once() {
        let engine = funded_engine(1_000).await;

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.place_bet(wheel_request(100, "bet-1")).await })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.place_bet(wheel_request(100, "bet-1")).await })
        };

        let a = a.await.unwrap().unwrap();
        let b = b.await.unwrap().unwrap();
        assert_eq!(a, b);

        let wagers: Vec<_> = engine
            .history("alice", 10, 0)
            .unwrap()
            .into_iter()
            .filter(|e| e.reason.is_wager())
            .collect();
        assert_eq!(wagers.len(), 1);
    }

    #[tokio::test]
    async fn test_deposit_and_withdraw_validation() {
        let engine = engine();
        engine.open_account("alice").unwrap();

        let err = engine
            .deposit("alice", Amount::ZERO, "dep-1")
            .await
            .unwrap_err();
        assert_eq!(err, WagerError::InvalidAmount);

        engine
            .deposit("alice", Amount::from_cents(500), "dep-2")
            .await
            .unwrap();

        let err = engine
            .withdraw("alice", Amount::from_cents(600), "wd-1")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            WagerError::InsufficientFunds {
                account_id: "alice".to_string()
            }
        );

        let (balance, version) = engine
            .withdraw("alice", Amount::from_cents(200), "wd-2")
            .await
            .unwrap();
        assert_eq!(balance, Amount::from_cents(300));
        assert_eq!(version, 3);
    }
}
