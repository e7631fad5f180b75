// =============================================================================
// Basket performance — cross-instrument inputs for the slow tier
// =============================================================================
//
// The slow tier reads the weighted percentage change of a basket of
// constituent instruments at three horizons:
//
//   same_day        — change since the session open
//   short_intraday  — change over the shorter intraday window
//   long_intraday   — change over the longer intraday window
//
// Breadth (supplementary sentiment source):
//   avg     = weighted mean of constituent same-day changes
//   breadth = constituents advancing more than `advance_pct` / total * 100
//             (total counts every member, whatever its weight)
//   score   = avg * 5 + (breadth - 50), clamped to [-100, 100]
//   bias    = BULLISH if avg > bias_pct, BEARISH if avg < -bias_pct
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::config::{ClassifierParams, SentimentParams};
use crate::signals::{EnsembleInput, IndicatorKind, IndicatorReading};
use crate::types::Direction;

/// Pre-weighted basket changes at the three slow-tier horizons (percent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BasketPerformance {
    pub same_day_pct: f64,
    pub short_intraday_pct: f64,
    pub long_intraday_pct: f64,
}

/// One basket member with its weight and horizon changes (percent).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constituent {
    pub symbol: String,
    pub weight: f64,
    #[serde(default)]
    pub same_day_pct: f64,
    #[serde(default)]
    pub short_intraday_pct: f64,
    #[serde(default)]
    pub long_intraday_pct: f64,
}

/// Breadth summary of a constituent list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreadthReport {
    pub average_change_pct: f64,
    pub breadth_pct: f64,
    pub advancing: usize,
    pub total: usize,
    pub score: f64,
    pub direction: Direction,
}

impl BasketPerformance {
    /// Weight-average the constituents' horizon changes. Members with a
    /// non-positive or non-finite weight are skipped; an empty effective
    /// basket reads flat (all zero).
    pub fn from_constituents(constituents: &[Constituent]) -> Self {
        let members: Vec<&Constituent> = usable(constituents).collect();
        let total: f64 = members.iter().map(|c| c.weight).sum();
        if total <= 0.0 {
            return Self::default();
        }
        let avg = |f: fn(&Constituent) -> f64| {
            members.iter().map(|c| f(c) * c.weight).sum::<f64>() / total
        };
        Self {
            same_day_pct: avg(|c| c.same_day_pct),
            short_intraday_pct: avg(|c| c.short_intraday_pct),
            long_intraday_pct: avg(|c| c.long_intraday_pct),
        }
    }

    /// The three slow-tier readings, each a midpoint rule centred on 0.
    pub fn readings(&self, params: &ClassifierParams) -> [IndicatorReading; 3] {
        let horizon = |kind, value| IndicatorReading::Midpoint {
            kind,
            value,
            center: 0.0,
            scale: params.basket_scale,
        };
        [
            horizon(IndicatorKind::BasketSameDay, self.same_day_pct),
            horizon(IndicatorKind::BasketShortIntraday, self.short_intraday_pct),
            horizon(IndicatorKind::BasketLongIntraday, self.long_intraday_pct),
        ]
    }
}

/// Breadth over the constituents' same-day changes. Every member with a finite
/// change counts toward breadth, zero-weight members included; only the
/// average is weighted. `None` for an empty list.
pub fn breadth(constituents: &[Constituent], params: &SentimentParams) -> Option<BreadthReport> {
    let members: Vec<&Constituent> = constituents
        .iter()
        .filter(|c| c.same_day_pct.is_finite())
        .collect();
    if members.is_empty() {
        return None;
    }

    let average_change_pct = BasketPerformance::from_constituents(constituents).same_day_pct;
    let advancing = members
        .iter()
        .filter(|c| c.same_day_pct > params.breadth_advance_pct)
        .count();
    let total = members.len();
    let breadth_pct = advancing as f64 / total as f64 * 100.0;

    let score = (average_change_pct * 5.0 + (breadth_pct - 50.0)).clamp(-100.0, 100.0);
    let direction = if average_change_pct > params.breadth_bias_pct {
        Direction::Bullish
    } else if average_change_pct < -params.breadth_bias_pct {
        Direction::Bearish
    } else {
        Direction::Neutral
    };

    Some(BreadthReport {
        average_change_pct,
        breadth_pct,
        advancing,
        total,
        score,
        direction,
    })
}

/// Breadth as a ready-made ensemble source named `basket`.
pub fn breadth_sentiment(
    constituents: &[Constituent],
    params: &SentimentParams,
) -> Option<EnsembleInput> {
    breadth(constituents, params).map(|r| r.to_input(BASKET_SOURCE, params))
}

pub const BASKET_SOURCE: &str = "basket";

impl BreadthReport {
    /// Ensemble source named `name`, weighted from the sentiment settings.
    pub fn to_input(&self, name: &str, params: &SentimentParams) -> EnsembleInput {
        EnsembleInput::with_direction(name, self.score, params.weight_for(name), self.direction)
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn usable(constituents: &[Constituent]) -> impl Iterator<Item = &Constituent> {
    constituents.iter().filter(|c| {
        c.weight.is_finite()
            && c.weight > 0.0
            && c.same_day_pct.is_finite()
            && c.short_intraday_pct.is_finite()
            && c.long_intraday_pct.is_finite()
    })
}
