// =============================================================================
// Tiers — per-horizon vote tallies
// =============================================================================
//
//   bullish_pct = bullish votes / tier size * 100
//   bearish_pct = bearish votes / tier size * 100
//
// An empty tier reports 0 / 0 and is excluded from the weighted overall sums.

use serde::Serialize;

use crate::signals::SignalVote;
use crate::types::{Direction, TierName};

/// Classified votes for each tier, in a fixed per-tier order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TierVotes {
    pub fast: Vec<SignalVote>,
    pub medium: Vec<SignalVote>,
    pub slow: Vec<SignalVote>,
}

/// One tier's tally and the weight it carried this cycle.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierBreakdown {
    pub name: TierName,
    pub weight: f64,
    pub bullish_pct: f64,
    pub bearish_pct: f64,
    pub bullish_votes: usize,
    pub bearish_votes: usize,
    pub neutral_votes: usize,
    pub votes: Vec<SignalVote>,
}

impl TierBreakdown {
    pub fn tally(name: TierName, votes: Vec<SignalVote>, weight: f64) -> Self {
        let count = |d: Direction| votes.iter().filter(|v| v.direction() == d).count();
        let bullish_votes = count(Direction::Bullish);
        let bearish_votes = count(Direction::Bearish);
        let neutral_votes = count(Direction::Neutral);

        let (bullish_pct, bearish_pct) = if votes.is_empty() {
            (0.0, 0.0)
        } else {
            let n = votes.len() as f64;
            (
                bullish_votes as f64 / n * 100.0,
                bearish_votes as f64 / n * 100.0,
            )
        };

        Self {
            name,
            weight,
            bullish_pct,
            bearish_pct,
            bullish_votes,
            bearish_votes,
            neutral_votes,
            votes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn votes(bull: usize, bear: usize, neutral: usize) -> Vec<SignalVote> {
        let mut v = Vec::new();
        v.extend((0..bull).map(|i| SignalVote::from_score(format!("b{i}"), 40.0)));
        v.extend((0..bear).map(|i| SignalVote::from_score(format!("s{i}"), -40.0)));
        v.extend((0..neutral).map(|i| SignalVote::neutral(format!("n{i}"))));
        v
    }

    #[test]
    fn percentages_use_tier_size() {
        let t = TierBreakdown::tally(TierName::Fast, votes(7, 1, 0), 2.0);
        assert!((t.bullish_pct - 87.5).abs() < 1e-10);
        assert!((t.bearish_pct - 12.5).abs() < 1e-10);

        let t = TierBreakdown::tally(TierName::Slow, votes(1, 1, 2), 5.0);
        assert!((t.bullish_pct - 25.0).abs() < 1e-10);
        assert_eq!(t.neutral_votes, 2);
    }

    #[test]
    fn empty_tier_reports_zero() {
        let t = TierBreakdown::tally(TierName::Medium, Vec::new(), 3.0);
        assert!(t.is_empty());
        assert_eq!(t.bullish_pct, 0.0);
        assert_eq!(t.bearish_pct, 0.0);
    }
}
