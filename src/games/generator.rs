//! VRF-backed outcome generation
//!
//! Every draw is a schnorrkel signature over `bet_id:game:account_id`,
//! hashed to a 32-byte output the result is derived from. The input
//! message never contains the player's choice, so the draw is provably
//! independent of it; the signature itself is the audit proof.

use crate::config::GamesConfig;
use crate::errors::GeneratorError;
use crate::games::types::{DrawnResult, GameKind, Outcome, RpsMove, VrfTrace, WheelColor};
use schnorrkel::{context::SigningContext, Keypair, PublicKey, Signature};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

const DRAW_SIGNING_CONTEXT: &[u8] = b"wagerhall-draw";

/// Draws fair, unpredictable outcomes for the configured game tables.
pub struct OutcomeGenerator {
    keypair: Arc<Keypair>,
    config: GamesConfig,
}

impl OutcomeGenerator {
    /// Create a generator with the house keypair.
    pub fn new(keypair: Keypair, config: GamesConfig) -> Self {
        Self {
            keypair: Arc::new(keypair),
            config,
        }
    }

    /// Create a generator with a fresh random keypair.
    pub fn new_random(config: GamesConfig) -> Self {
        use rand_core::OsRng;
        let keypair = Keypair::generate_with(OsRng);
        Self::new(keypair, config)
    }

    /// Draw an outcome for one bet attempt.
    ///
    /// `draw_id` must be unique per attempt (the bet id); together with
    /// the account id it fixes the VRF input, so replaying the trace
    /// later reproduces the identical result.
    pub fn draw(
        &self,
        game: GameKind,
        draw_id: &str,
        account_id: &str,
    ) -> Result<Outcome, GeneratorError> {
        match game {
            GameKind::Wheel if !self.config.enable_wheel => {
                return Err(GeneratorError::UnsupportedGameType(game));
            }
            GameKind::RockPaperScissors if !self.config.enable_rock_paper_scissors => {
                return Err(GeneratorError::UnsupportedGameType(game));
            }
            _ => {}
        }

        let input_message = format!("{}:{}:{}", draw_id, game, account_id);
        let (output, proof) = self.vrf_sign(input_message.as_bytes());

        let result = derive_result(game, &output, self.config.wheel_segments);

        let drawn_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Ok(Outcome {
            game,
            result,
            drawn_at,
            vrf: VrfTrace {
                output: hex::encode(output),
                proof: hex::encode(proof),
                public_key: hex::encode(self.keypair.public.to_bytes()),
                input_message,
            },
        })
    }

    /// Sign the input message; the output is the SHA-256 of the
    /// signature, the proof is the signature itself.
    fn vrf_sign(&self, message: &[u8]) -> (Vec<u8>, Vec<u8>) {
        let ctx = SigningContext::new(DRAW_SIGNING_CONTEXT);
        let transcript = ctx.bytes(message);
        let signature = self.keypair.sign(transcript);

        let mut hasher = Sha256::new();
        hasher.update(signature.to_bytes());
        let output = hasher.finalize().to_vec();

        (output, signature.to_bytes().to_vec())
    }

    /// Verify a draw trace: signature over the recorded input message,
    /// and output correctly derived from the signature.
    pub fn verify(trace: &VrfTrace) -> Result<bool, GeneratorError> {
        let output = hex::decode(&trace.output)
            .map_err(|e| GeneratorError::MalformedTrace(format!("output: {}", e)))?;
        let proof = hex::decode(&trace.proof)
            .map_err(|e| GeneratorError::MalformedTrace(format!("proof: {}", e)))?;
        let public_key_bytes = hex::decode(&trace.public_key)
            .map_err(|e| GeneratorError::MalformedTrace(format!("public key: {}", e)))?;

        let public_key_array: [u8; 32] = public_key_bytes
            .try_into()
            .map_err(|_| GeneratorError::MalformedTrace("public key must be 32 bytes".into()))?;
        let public_key = PublicKey::from_bytes(&public_key_array)
            .map_err(|e| GeneratorError::MalformedTrace(format!("public key: {:?}", e)))?;

        let signature_array: [u8; 64] = proof
            .try_into()
            .map_err(|_| GeneratorError::MalformedTrace("proof must be 64 bytes".into()))?;
        let signature = Signature::from_bytes(&signature_array)
            .map_err(|e| GeneratorError::MalformedTrace(format!("proof: {:?}", e)))?;

        let ctx = SigningContext::new(DRAW_SIGNING_CONTEXT);
        let transcript = ctx.bytes(trace.input_message.as_bytes());
        if public_key.verify(transcript, &signature).is_err() {
            return Ok(false);
        }

        let mut hasher = Sha256::new();
        hasher.update(signature_array);
        let computed = hasher.finalize();

        Ok(computed.as_slice() == output.as_slice())
    }

    /// Recompute the drawn result a trace encodes, for audit responses.
    pub fn recompute(&self, game: GameKind, trace: &VrfTrace) -> Result<DrawnResult, GeneratorError> {
        let output = hex::decode(&trace.output)
            .map_err(|e| GeneratorError::MalformedTrace(format!("output: {}", e)))?;
        if output.len() < 8 {
            return Err(GeneratorError::MalformedTrace(
                "output shorter than 8 bytes".into(),
            ));
        }
        Ok(derive_result(game, &output, self.config.wheel_segments))
    }

    /// The house public key as hex.
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.keypair.public.to_bytes())
    }
}

/// Map a VRF output onto a game result.
///
/// The first 8 output bytes are read as a little-endian u64 and reduced
/// modulo the segment/move count; the modulo bias is at most 2^-64 and
/// ignorable.
fn derive_result(game: GameKind, output: &[u8], wheel_segments: u8) -> DrawnResult {
    let mut first = [0u8; 8];
    first.copy_from_slice(&output[..8]);
    let value = u64::from_le_bytes(first);

    match game {
        GameKind::Wheel => {
            let segment = (value % wheel_segments as u64) as u8;
            let color = if segment % 2 == 0 {
                WheelColor::Blue
            } else {
                WheelColor::White
            };
            DrawnResult::Wheel { segment, color }
        }
        GameKind::RockPaperScissors => {
            let house_move = match value % 3 {
                0 => RpsMove::Rock,
                1 => RpsMove::Paper,
                _ => RpsMove::Scissors,
            };
            DrawnResult::RockPaperScissors { house_move }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator() -> OutcomeGenerator {
        OutcomeGenerator::new_random(GamesConfig::default())
    }

    #[test]
    fn test_draw_and_verify() {
        let gen = generator();
        let outcome = gen
            .draw(GameKind::Wheel, "bet-1", "alice")
            .expect("draw failed");

        assert_eq!(outcome.game, GameKind::Wheel);
        assert_eq!(outcome.vrf.input_message, "bet-1:wheel:alice");
        assert!(OutcomeGenerator::verify(&outcome.vrf).expect("verify failed"));
    }

    #[test]
    fn test_input_message_excludes_choice_material() {
        let gen = generator();
        let outcome = gen
            .draw(GameKind::RockPaperScissors, "bet-9", "bob")
            .expect("draw failed");

        // The input binds only attempt, game and account.
        assert_eq!(outcome.vrf.input_message, "bet-9:rock_paper_scissors:bob");
    }

    #[test]
    fn test_same_input_reproduces_result() {
        let gen = generator();
        let a = gen.draw(GameKind::Wheel, "bet-1", "alice").unwrap();
        let recomputed = gen.recompute(GameKind::Wheel, &a.vrf).unwrap();
        assert_eq!(a.result, recomputed);
    }

    #[test]
    fn test_tamper_detection() {
        let gen = generator();
        let mut outcome = gen.draw(GameKind::Wheel, "bet-1", "alice").unwrap();

        outcome.vrf.output = hex::encode([0xffu8; 32]);
        assert!(!OutcomeGenerator::verify(&outcome.vrf).expect("verify failed"));
    }

    #[test]
    fn test_disabled_game_is_unsupported() {
        let config = GamesConfig {
            enable_rock_paper_scissors: false,
            ..Default::default()
        };
        let gen = OutcomeGenerator::new_random(config);

        let err = gen
            .draw(GameKind::RockPaperScissors, "bet-1", "alice")
            .unwrap_err();
        assert_eq!(
            err,
            GeneratorError::UnsupportedGameType(GameKind::RockPaperScissors)
        );
    }

    #[test]
    fn test_wheel_draws_converge_to_even_split() {
        let gen = generator();
        let mut blue = 0u32;
        let samples = 2_000;

        for i in 0..samples {
            let outcome = gen
                .draw(GameKind::Wheel, &format!("bet-{}", i), "alice")
                .unwrap();
            if let DrawnResult::Wheel { color, .. } = outcome.result {
                if color == WheelColor::Blue {
                    blue += 1;
                }
            }
        }

        // 50/50 within 5 percentage points over 2k samples.
        let ratio = blue as f64 / samples as f64;
        assert!(
            (0.45..=0.55).contains(&ratio),
            "blue ratio {} outside tolerance",
            ratio
        );
    }

    #[test]
    fn test_distinct_attempts_produce_distinct_proofs() {
        let gen = generator();
        let mut proofs = std::collections::HashSet::new();
        for i in 0..10 {
            let outcome = gen
                .draw(GameKind::Wheel, &format!("bet-{}", i), "alice")
                .unwrap();
            proofs.insert(outcome.vrf.proof);
        }
        assert_eq!(proofs.len(), 10);
    }
}
