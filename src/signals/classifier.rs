// =============================================================================
// Signal Classifier — indicator reading -> directional vote
// =============================================================================
//
// Three rule shapes, selected by the reading's variant:
//
//   Midpoint         score = clamp((value - center) * scale, -100, 100)
//   Crossover        value > upper => BULLISH, value < lower => BEARISH,
//                    otherwise NEUTRAL (upper == lower for a plain crossover)
//                    magnitude = clamp(distance / |reference| * 100 * scale, 1, 100)
//   DirectionalPair  plus > minus => BULLISH, minus > plus => BEARISH
//                    magnitude = clamp(strength * scale, 1, 100)
//
// Exactly equal inputs always produce a NEUTRAL vote with score 0. The floor
// of 1 on non-neutral magnitudes keeps the vote's sign equal to its direction.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::signals::vote::SignalVote;

const MIN_DIRECTIONAL_SCORE: f64 = 1.0;

/// Which indicator produced a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IndicatorKind {
    Rsi,
    Mfi,
    Dmi,
    Vidya,
    EmaCrossover,
    VolumePressure,
    Obv,
    ForceIndex,
    Vwap,
    BasketSameDay,
    BasketShortIntraday,
    BasketLongIntraday,
}

impl IndicatorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::Rsi => "rsi",
            Self::Mfi => "mfi",
            Self::Dmi => "dmi",
            Self::Vidya => "vidya",
            Self::EmaCrossover => "ema_crossover",
            Self::VolumePressure => "volume_pressure",
            Self::Obv => "obv",
            Self::ForceIndex => "force_index",
            Self::Vwap => "vwap",
            Self::BasketSameDay => "basket_same_day",
            Self::BasketShortIntraday => "basket_short_intraday",
            Self::BasketLongIntraday => "basket_long_intraday",
        }
    }
}

impl std::fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single indicator value paired with the rule that interprets it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum IndicatorReading {
    Midpoint {
        kind: IndicatorKind,
        value: f64,
        center: f64,
        scale: f64,
    },
    Crossover {
        kind: IndicatorKind,
        value: f64,
        upper: f64,
        lower: f64,
        scale: f64,
    },
    DirectionalPair {
        kind: IndicatorKind,
        plus: f64,
        minus: f64,
        strength: f64,
        scale: f64,
    },
}

impl IndicatorReading {
    /// Plain two-value crossover: `value` against a single `reference`.
    pub fn crossover(kind: IndicatorKind, value: f64, reference: f64, scale: f64) -> Self {
        Self::Crossover {
            kind,
            value,
            upper: reference,
            lower: reference,
            scale,
        }
    }

    pub fn kind(&self) -> IndicatorKind {
        match *self {
            Self::Midpoint { kind, .. }
            | Self::Crossover { kind, .. }
            | Self::DirectionalPair { kind, .. } => kind,
        }
    }

    /// Classify into a unit-weight vote named after the indicator kind.
    pub fn classify(&self) -> SignalVote {
        let name = self.kind().label();
        let score = match *self {
            Self::Midpoint {
                value,
                center,
                scale,
                ..
            } => midpoint_score(value, center, scale),
            Self::Crossover {
                value,
                upper,
                lower,
                scale,
                ..
            } => crossover_score(value, upper, lower, scale),
            Self::DirectionalPair {
                plus,
                minus,
                strength,
                scale,
                ..
            } => directional_pair_score(plus, minus, strength, scale),
        };
        SignalVote::from_score(name, score)
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn midpoint_score(value: f64, center: f64, scale: f64) -> f64 {
    if value == center {
        return 0.0;
    }
    ((value - center) * scale).clamp(-100.0, 100.0)
}

fn crossover_score(value: f64, upper: f64, lower: f64, scale: f64) -> f64 {
    let (sign, distance, reference) = if value > upper {
        (1.0, value - upper, upper)
    } else if value < lower {
        (-1.0, lower - value, lower)
    } else {
        return 0.0;
    };

    let relative = if reference == 0.0 {
        distance * scale
    } else {
        distance / reference.abs() * 100.0 * scale
    };
    let magnitude = if relative.is_finite() {
        relative.clamp(MIN_DIRECTIONAL_SCORE, 100.0)
    } else {
        100.0
    };
    sign * magnitude
}

fn directional_pair_score(plus: f64, minus: f64, strength: f64, scale: f64) -> f64 {
    let sign = if plus > minus {
        1.0
    } else if minus > plus {
        -1.0
    } else {
        return 0.0;
    };
    let raw = strength * scale;
    let magnitude = if raw.is_finite() {
        raw.clamp(MIN_DIRECTIONAL_SCORE, 100.0)
    } else {
        MIN_DIRECTIONAL_SCORE
    };
    sign * magnitude
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Direction;

    fn rsi(value: f64) -> IndicatorReading {
        IndicatorReading::Midpoint {
            kind: IndicatorKind::Rsi,
            value,
            center: 50.0,
            scale: 2.0,
        }
    }

    #[test]
    fn midpoint_rule() {
        let v = rsi(65.0).classify();
        assert_eq!(v.direction(), Direction::Bullish);
        assert!((v.score() - 30.0).abs() < 1e-10);
        assert_eq!(v.source_name(), "rsi");

        let v = rsi(10.0).classify();
        assert_eq!(v.direction(), Direction::Bearish);
        assert!((v.score() + 80.0).abs() < 1e-10);

        assert_eq!(rsi(100.0).classify().score(), 100.0);
    }

    #[test]
    fn midpoint_equal_is_neutral_zero() {
        let v = rsi(50.0).classify();
        assert_eq!(v.direction(), Direction::Neutral);
        assert_eq!(v.score(), 0.0);
    }

    #[test]
    fn crossover_plain() {
        let up = IndicatorReading::crossover(IndicatorKind::Vwap, 101.0, 100.0, 10.0).classify();
        assert_eq!(up.direction(), Direction::Bullish);
        assert!((up.score() - 10.0).abs() < 1e-10, "1% above * scale 10, got {}", up.score());

        let down = IndicatorReading::crossover(IndicatorKind::Vwap, 99.9, 100.0, 10.0).classify();
        assert_eq!(down.direction(), Direction::Bearish);
        assert!((down.score() + MIN_DIRECTIONAL_SCORE).abs() < 1e-10);

        let flat = IndicatorReading::crossover(IndicatorKind::Vwap, 100.0, 100.0, 10.0).classify();
        assert_eq!(flat.direction(), Direction::Neutral);
        assert_eq!(flat.score(), 0.0);
    }

    #[test]
    fn crossover_band_is_neutral_inside() {
        let inside = IndicatorReading::Crossover {
            kind: IndicatorKind::Vidya,
            value: 100.0,
            upper: 103.0,
            lower: 97.0,
            scale: 10.0,
        };
        assert_eq!(inside.classify().direction(), Direction::Neutral);

        let above = IndicatorReading::Crossover {
            kind: IndicatorKind::Vidya,
            value: 110.0,
            upper: 103.0,
            lower: 97.0,
            scale: 10.0,
        };
        assert_eq!(above.classify().direction(), Direction::Bullish);
        assert_eq!(above.classify().score(), 100.0);
    }

    #[test]
    fn crossover_zero_reference_uses_raw_distance() {
        let v = IndicatorReading::crossover(IndicatorKind::Obv, -30.0, 0.0, 1.0).classify();
        assert_eq!(v.direction(), Direction::Bearish);
        assert!((v.score() + 30.0).abs() < 1e-10);
    }

    #[test]
    fn directional_pair_rule() {
        let pair = |plus, minus, strength| IndicatorReading::DirectionalPair {
            kind: IndicatorKind::Dmi,
            plus,
            minus,
            strength,
            scale: 2.0,
        };
        let bull = pair(30.0, 10.0, 25.0).classify();
        assert_eq!(bull.direction(), Direction::Bullish);
        assert!((bull.score() - 50.0).abs() < 1e-10);

        let bear = pair(10.0, 30.0, 0.0).classify();
        assert_eq!(bear.direction(), Direction::Bearish);
        assert!(bear.score() < 0.0, "zero strength keeps the sign");

        let tie = pair(20.0, 20.0, 40.0).classify();
        assert_eq!(tie.direction(), Direction::Neutral);
        assert_eq!(tie.score(), 0.0);
    }

    #[test]
    fn kind_labels_are_unique() {
        use std::collections::HashSet;
        let kinds = [
            IndicatorKind::Rsi,
            IndicatorKind::Mfi,
            IndicatorKind::Dmi,
            IndicatorKind::Vidya,
            IndicatorKind::EmaCrossover,
            IndicatorKind::VolumePressure,
            IndicatorKind::Obv,
            IndicatorKind::ForceIndex,
            IndicatorKind::Vwap,
            IndicatorKind::BasketSameDay,
            IndicatorKind::BasketShortIntraday,
            IndicatorKind::BasketLongIntraday,
        ];
        let labels: HashSet<&str> = kinds.iter().map(|k| k.label()).collect();
        assert_eq!(labels.len(), kinds.len());
    }
}
