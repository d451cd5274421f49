//! Error types for the wagering core
//!
//! Each layer owns its failure modes: the ledger reports funds and
//! account problems, the generator reports draw problems, and the
//! engine folds both into the caller-facing [`WagerError`] taxonomy.

use crate::games::types::GameKind;

/// Failures raised by the balance ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Insufficient funds for account {account_id}")]
    InsufficientFunds { account_id: String },

    #[error("Unknown account: {account_id}")]
    UnknownAccount { account_id: String },

    #[error("Account already exists: {account_id}")]
    DuplicateAccount { account_id: String },

    #[error("Balance arithmetic overflow for account {account_id}")]
    AmountOverflow { account_id: String },

    #[error("Ledger contended for account {account_id}; retries exhausted")]
    Contended { account_id: String },
}

/// Failures raised by the outcome generator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GeneratorError {
    #[error("Game type not enabled: {0}")]
    UnsupportedGameType(GameKind),

    #[error("Malformed draw trace: {0}")]
    MalformedTrace(String),
}

/// Caller-facing failures of the wagering transaction core.
///
/// Validation variants reject a request before any side effect;
/// `Contended` is the only transient variant and is always safe to
/// retry with the same idempotency token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WagerError {
    #[error("Stake must be positive and within table limits")]
    InvalidStake,

    #[error("Choice does not belong to the requested game")]
    InvalidChoice,

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Game type not enabled: {0}")]
    UnsupportedGameType(GameKind),

    #[error("Insufficient funds for account {account_id}")]
    InsufficientFunds { account_id: String },

    #[error("Unknown account: {account_id}")]
    UnknownAccount { account_id: String },

    #[error("Account already exists: {account_id}")]
    DuplicateAccount { account_id: String },

    #[error("Settlement contended; safe to retry with the same idempotency token")]
    Contended,
}

impl From<LedgerError> for WagerError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientFunds { account_id } => {
                WagerError::InsufficientFunds { account_id }
            }
            LedgerError::UnknownAccount { account_id } => WagerError::UnknownAccount { account_id },
            LedgerError::DuplicateAccount { account_id } => {
                WagerError::DuplicateAccount { account_id }
            }
            // Overflow can only come from a credit pushing the balance past
            // u64 minor units; fold it into the transient variant instead of
            // widening the caller-facing taxonomy for an unreachable case.
            LedgerError::AmountOverflow { .. } => WagerError::Contended,
            LedgerError::Contended { .. } => WagerError::Contended,
        }
    }
}

impl From<GeneratorError> for WagerError {
    fn from(e: GeneratorError) -> Self {
        match e {
            GeneratorError::UnsupportedGameType(kind) => WagerError::UnsupportedGameType(kind),
            GeneratorError::MalformedTrace(_) => WagerError::Contended,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_error_maps_to_wager_error() {
        let e = LedgerError::InsufficientFunds {
            account_id: "alice".to_string(),
        };
        assert_eq!(
            WagerError::from(e),
            WagerError::InsufficientFunds {
                account_id: "alice".to_string()
            }
        );

        let e = LedgerError::Contended {
            account_id: "alice".to_string(),
        };
        assert_eq!(WagerError::from(e), WagerError::Contended);
    }

    #[test]
    fn test_error_display() {
        let e = WagerError::UnknownAccount {
            account_id: "ghost".to_string(),
        };
        assert!(e.to_string().contains("ghost"));
    }
}
