// =============================================================================
// Signal Vote — one classified indicator opinion
// =============================================================================
//
// Invariants held by construction:
//   score in [-100, 100]
//   BULLISH => score > 0,  BEARISH => score < 0,  NEUTRAL => score == 0
//   weight finite and > 0

use serde::Serialize;

use crate::error::BiasError;
use crate::types::Direction;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalVote {
    source_name: String,
    direction: Direction,
    score: f64,
    weight: f64,
}

impl SignalVote {
    /// Unit-weight vote. The score is clamped to [-100, 100] and the direction
    /// follows its sign; a non-finite score becomes a neutral vote.
    pub fn from_score(source_name: impl Into<String>, score: f64) -> Self {
        let score = if score.is_finite() {
            score.clamp(-100.0, 100.0)
        } else {
            0.0
        };
        Self {
            source_name: source_name.into(),
            direction: Direction::from_sign(score),
            score,
            weight: 1.0,
        }
    }

    pub fn neutral(source_name: impl Into<String>) -> Self {
        Self::from_score(source_name, 0.0)
    }

    /// Replace the weight.
    pub fn with_weight(mut self, weight: f64) -> Result<Self, BiasError> {
        if !weight.is_finite() || weight <= 0.0 {
            return Err(BiasError::config(
                format!("vote.{}.weight", self.source_name),
                format!("must be finite and > 0, got {weight}"),
            ));
        }
        self.weight = weight;
        Ok(self)
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_score_sign() {
        assert_eq!(SignalVote::from_score("a", 12.0).direction(), Direction::Bullish);
        assert_eq!(SignalVote::from_score("a", -0.5).direction(), Direction::Bearish);
        let n = SignalVote::neutral("a");
        assert_eq!(n.direction(), Direction::Neutral);
        assert_eq!(n.score(), 0.0);
    }

    #[test]
    fn score_is_clamped_and_sanitised() {
        assert_eq!(SignalVote::from_score("a", 400.0).score(), 100.0);
        assert_eq!(SignalVote::from_score("a", -400.0).score(), -100.0);
        let nan = SignalVote::from_score("a", f64::NAN);
        assert_eq!(nan.score(), 0.0);
        assert_eq!(nan.direction(), Direction::Neutral);
    }

    #[test]
    fn weight_must_be_positive() {
        let v = SignalVote::from_score("a", 10.0);
        assert_eq!(v.weight(), 1.0);
        assert!(v.clone().with_weight(0.0).is_err());
        assert!(v.clone().with_weight(f64::INFINITY).is_err());
        assert_eq!(v.with_weight(2.5).unwrap().weight(), 2.5);
    }
}
