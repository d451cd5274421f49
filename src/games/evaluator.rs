//! Pure wager evaluation
//!
//! Maps (choice, drawn result, stake) to a settlement score. No I/O,
//! no randomness; this isolation keeps settlement math testable apart
//! from the ledger and the entropy source.

use crate::errors::WagerError;
use crate::games::types::{DrawnResult, PlayerChoice, Score, SettlementCategory};
use crate::money::Amount;

/// Total-return multiplier on a winning stake (stake back plus 1:1 profit).
pub const WIN_MULTIPLIER: f64 = 2.0;
/// Total-return multiplier on a tie (stake returned).
pub const TIE_MULTIPLIER: f64 = 1.0;
/// Total-return multiplier on a loss.
pub const LOSS_MULTIPLIER: f64 = 0.0;

/// Score a drawn result against the player's choice.
///
/// Returns `InvalidChoice` when the choice and result belong to
/// different games, and `InvalidStake` when the stake does not fit a
/// signed delta; both are pre-validated by the engine, so for valid
/// inputs this function cannot fail.
pub fn evaluate(
    choice: PlayerChoice,
    drawn: &DrawnResult,
    stake: Amount,
) -> Result<Score, WagerError> {
    let stake = stake.signed().ok_or(WagerError::InvalidStake)?;

    let category = match (choice, drawn) {
        (PlayerChoice::Color(picked), DrawnResult::Wheel { color, .. }) => {
            // The wheel has no tie state.
            if picked == *color {
                SettlementCategory::Win
            } else {
                SettlementCategory::Lose
            }
        }
        (PlayerChoice::Move(picked), DrawnResult::RockPaperScissors { house_move }) => {
            if picked == *house_move {
                SettlementCategory::Tie
            } else if picked.beats() == *house_move {
                SettlementCategory::Win
            } else {
                SettlementCategory::Lose
            }
        }
        _ => return Err(WagerError::InvalidChoice),
    };

    Ok(match category {
        SettlementCategory::Win => Score {
            category,
            multiplier: WIN_MULTIPLIER,
            delta: stake,
        },
        SettlementCategory::Lose => Score {
            category,
            multiplier: LOSS_MULTIPLIER,
            delta: -stake,
        },
        SettlementCategory::Tie => Score {
            category,
            multiplier: TIE_MULTIPLIER,
            delta: 0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::types::{RpsMove, WheelColor};

    fn wheel(color: WheelColor) -> DrawnResult {
        DrawnResult::Wheel { segment: 0, color }
    }

    fn rps(house_move: RpsMove) -> DrawnResult {
        DrawnResult::RockPaperScissors { house_move }
    }

    #[test]
    fn test_wheel_win_and_loss() {
        let stake = Amount::from_cents(100);

        let score = evaluate(
            PlayerChoice::Color(WheelColor::Blue),
            &wheel(WheelColor::Blue),
            stake,
        )
        .unwrap();
        assert_eq!(score.category, SettlementCategory::Win);
        assert_eq!(score.multiplier, 2.0);
        assert_eq!(score.delta, 100);

        let score = evaluate(
            PlayerChoice::Color(WheelColor::Blue),
            &wheel(WheelColor::White),
            stake,
        )
        .unwrap();
        assert_eq!(score.category, SettlementCategory::Lose);
        assert_eq!(score.multiplier, 0.0);
        assert_eq!(score.delta, -100);
    }

    #[test]
    fn test_rps_correctness_table() {
        // rock beats scissors
        let score = evaluate(
            PlayerChoice::Move(RpsMove::Rock),
            &rps(RpsMove::Scissors),
            Amount::from_cents(100),
        )
        .unwrap();
        assert_eq!(
            (score.category, score.multiplier, score.delta),
            (SettlementCategory::Win, 2.0, 100)
        );

        // paper ties paper
        let score = evaluate(
            PlayerChoice::Move(RpsMove::Paper),
            &rps(RpsMove::Paper),
            Amount::from_cents(100),
        )
        .unwrap();
        assert_eq!(
            (score.category, score.multiplier, score.delta),
            (SettlementCategory::Tie, 1.0, 0)
        );

        // scissors loses to rock
        let score = evaluate(
            PlayerChoice::Move(RpsMove::Scissors),
            &rps(RpsMove::Rock),
            Amount::from_cents(50),
        )
        .unwrap();
        assert_eq!(
            (score.category, score.multiplier, score.delta),
            (SettlementCategory::Lose, 0.0, -50)
        );
    }

    #[test]
    fn test_cross_game_choice_rejected() {
        let err = evaluate(
            PlayerChoice::Move(RpsMove::Rock),
            &wheel(WheelColor::Blue),
            Amount::from_cents(100),
        )
        .unwrap_err();
        assert_eq!(err, WagerError::InvalidChoice);
    }

    #[test]
    fn test_deterministic_for_same_inputs() {
        let a = evaluate(
            PlayerChoice::Move(RpsMove::Paper),
            &rps(RpsMove::Rock),
            Amount::from_cents(777),
        )
        .unwrap();
        let b = evaluate(
            PlayerChoice::Move(RpsMove::Paper),
            &rps(RpsMove::Rock),
            Amount::from_cents(777),
        )
        .unwrap();
        assert_eq!(a, b);
    }
}
