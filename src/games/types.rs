use crate::money::Amount;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported game types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum GameKind {
    Wheel,
    RockPaperScissors,
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameKind::Wheel => write!(f, "wheel"),
            GameKind::RockPaperScissors => write!(f, "rock_paper_scissors"),
        }
    }
}

/// Wheel segment color. Segments alternate, even indices are blue.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WheelColor {
    Blue,
    White,
}

impl fmt::Display for WheelColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WheelColor::Blue => write!(f, "blue"),
            WheelColor::White => write!(f, "white"),
        }
    }
}

/// Rock-paper-scissors move
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RpsMove {
    Rock,
    Paper,
    Scissors,
}

impl RpsMove {
    /// The move this move defeats under cyclic dominance.
    pub fn beats(self) -> RpsMove {
        match self {
            RpsMove::Rock => RpsMove::Scissors,
            RpsMove::Paper => RpsMove::Rock,
            RpsMove::Scissors => RpsMove::Paper,
        }
    }
}

impl fmt::Display for RpsMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpsMove::Rock => write!(f, "rock"),
            RpsMove::Paper => write!(f, "paper"),
            RpsMove::Scissors => write!(f, "scissors"),
        }
    }
}

/// Player choice for either game, serialized as the bare name
/// (`"blue"`, `"white"`, `"rock"`, `"paper"`, `"scissors"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum PlayerChoice {
    Color(WheelColor),
    Move(RpsMove),
}

impl PlayerChoice {
    /// Whether this choice belongs to the given game type.
    pub fn belongs_to(self, game: GameKind) -> bool {
        matches!(
            (self, game),
            (PlayerChoice::Color(_), GameKind::Wheel)
                | (PlayerChoice::Move(_), GameKind::RockPaperScissors)
        )
    }
}

impl fmt::Display for PlayerChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerChoice::Color(c) => c.fmt(f),
            PlayerChoice::Move(m) => m.fmt(f),
        }
    }
}

/// What the generator drew, per game type.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DrawnResult {
    Wheel { segment: u8, color: WheelColor },
    RockPaperScissors { house_move: RpsMove },
}

/// VRF trace attached to every outcome: enough to reproduce and verify
/// the draw without letting the player predict it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VrfTrace {
    /// Hex-encoded VRF output (32 bytes)
    pub output: String,
    /// Hex-encoded VRF proof (64 bytes for schnorrkel)
    pub proof: String,
    /// Hex-encoded public key (32 bytes)
    pub public_key: String,
    /// Input message used for the draw; never contains the player choice
    pub input_message: String,
}

/// A generated game outcome prior to evaluation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outcome {
    pub game: GameKind,
    pub result: DrawnResult,
    pub drawn_at: u64,
    pub vrf: VrfTrace,
}

/// Settlement category for a resolved wager.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SettlementCategory {
    Win,
    Lose,
    Tie,
}

/// The evaluator's scoring of an outcome against a choice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Score {
    pub category: SettlementCategory,
    /// Total-return multiplier applied to the stake (2.0 win, 1.0 tie, 0.0 loss).
    pub multiplier: f64,
    /// Net balance delta in minor units.
    pub delta: i64,
}

/// One bet attempt as submitted by the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WagerRequest {
    pub account_id: String,
    pub game: GameKind,
    pub stake: Amount,
    pub choice: PlayerChoice,
    /// Client-supplied token; one logical bet attempt, at most one settlement.
    pub idempotency_token: String,
}

/// Receipt for a settled wager, returned to the caller and replayed
/// verbatim for duplicate submissions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Settlement {
    pub bet_id: String,
    pub account_id: String,
    pub game: GameKind,
    pub stake: Amount,
    pub choice: PlayerChoice,
    pub outcome: Outcome,
    pub category: SettlementCategory,
    pub multiplier: f64,
    pub delta: i64,
    pub balance: Amount,
    pub version: u64,
    pub settled_at: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_choice_game_pairing() {
        assert!(PlayerChoice::Color(WheelColor::Blue).belongs_to(GameKind::Wheel));
        assert!(PlayerChoice::Move(RpsMove::Rock).belongs_to(GameKind::RockPaperScissors));
        assert!(!PlayerChoice::Move(RpsMove::Rock).belongs_to(GameKind::Wheel));
        assert!(!PlayerChoice::Color(WheelColor::White).belongs_to(GameKind::RockPaperScissors));
    }

    #[test]
    fn test_rps_dominance_cycle() {
        assert_eq!(RpsMove::Rock.beats(), RpsMove::Scissors);
        assert_eq!(RpsMove::Scissors.beats(), RpsMove::Paper);
        assert_eq!(RpsMove::Paper.beats(), RpsMove::Rock);
    }

    #[test]
    fn test_choice_serialization_is_bare_name() {
        let choice = PlayerChoice::Color(WheelColor::Blue);
        assert_eq!(serde_json::to_string(&choice).unwrap(), "\"blue\"");

        let choice = PlayerChoice::Move(RpsMove::Scissors);
        assert_eq!(serde_json::to_string(&choice).unwrap(), "\"scissors\"");

        let parsed: PlayerChoice = serde_json::from_str("\"rock\"").unwrap();
        assert_eq!(parsed, PlayerChoice::Move(RpsMove::Rock));

        let parsed: PlayerChoice = serde_json::from_str("\"white\"").unwrap();
        assert_eq!(parsed, PlayerChoice::Color(WheelColor::White));
    }

    #[test]
    fn test_game_kind_serialization() {
        assert_eq!(
            serde_json::to_string(&GameKind::RockPaperScissors).unwrap(),
            "\"rock_paper_scissors\""
        );
    }
}
