// =============================================================================
// Shared types used across the market-bias engine
// =============================================================================

use serde::{Deserialize, Serialize};

/// Three-state market direction shared by votes, tiers, ensembles and the
/// overall verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Bullish,
    Bearish,
    Neutral,
}

impl Direction {
    /// Direction implied by the sign of `value`. Exactly zero (and NaN) is
    /// neutral.
    pub fn from_sign(value: f64) -> Self {
        if value > 0.0 {
            Self::Bullish
        } else if value < 0.0 {
            Self::Bearish
        } else {
            Self::Neutral
        }
    }

    /// +1.0 / -1.0 / 0.0.
    pub fn signum(self) -> f64 {
        match self {
            Self::Bullish => 1.0,
            Self::Bearish => -1.0,
            Self::Neutral => 0.0,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::Neutral
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bullish => write!(f, "BULLISH"),
            Self::Bearish => write!(f, "BEARISH"),
            Self::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Weighting mode of the tiered aggregator. `Reversal` is entered when the
/// fast tier diverges from the slow tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mode {
    Normal,
    Reversal,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Normal
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Reversal => write!(f, "REVERSAL"),
        }
    }
}

/// Time-horizon tier of the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TierName {
    Fast,
    Medium,
    Slow,
}

impl std::fmt::Display for TierName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => write!(f, "FAST"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Slow => write!(f, "SLOW"),
        }
    }
}
