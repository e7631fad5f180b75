// =============================================================================
// Market Regime Detector
// =============================================================================
//
// Classifies the market into one of four regimes from price structure alone.
//
// Detection hierarchy (evaluated top-to-bottom; first match wins):
//
//   1. RANGE-BOUND   — range width <= threshold (inclusive)
//                      AND fast/slow EMA spread <= spread threshold
//                      AND ATR <= baseline ATR * volatility ratio
//                      AND the tight range has persisted >= min bars
//   2. TRENDING UP   — fast EMA above slow, not falling, spread > trend threshold
//      TRENDING DOWN — mirror image
//   3. TRANSITION    — anything else
//
// Range width is (HH - LL) / midpoint * 100 over the trailing window.
// Movement quality (spread * 10) and the choppiness index are reported as
// annotations only; they never change the regime.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::config::{IndicatorParams, RegimeParams};
use crate::indicators::atr::{calculate_atr_series, rolling_atr_mean};
use crate::indicators::choppiness::calculate_choppiness;
use crate::indicators::ema::ema_crossover;
use crate::market_data::Candle;

// =============================================================================
// Types
// =============================================================================

/// High-level market regime classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketRegime {
    TrendingUp,
    TrendingDown,
    RangeBound,
    Transition,
}

impl std::fmt::Display for MarketRegime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TrendingUp => write!(f, "TRENDING UP"),
            Self::TrendingDown => write!(f, "TRENDING DOWN"),
            Self::RangeBound => write!(f, "RANGE-BOUND"),
            Self::Transition => write!(f, "TRANSITION"),
        }
    }
}

/// Annotation describing how decisively price is moving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MovementQuality {
    Strong,
    Moderate,
    Weak,
    Choppy,
}

impl MovementQuality {
    /// Bucket `strength = spread_pct * 10`.
    pub fn from_spread(spread_pct: f64) -> Self {
        let strength = spread_pct * 10.0;
        if strength > 5.0 {
            Self::Strong
        } else if strength > 2.0 {
            Self::Moderate
        } else if strength > 0.5 {
            Self::Weak
        } else {
            Self::Choppy
        }
    }
}

impl std::fmt::Display for MovementQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "STRONG"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::Weak => write!(f, "WEAK"),
            Self::Choppy => write!(f, "CHOPPY"),
        }
    }
}

/// Boundaries of a detected trading range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub high: f64,
    pub low: f64,
    pub mid: f64,
}

/// Raw measurements feeding the classification.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegimeMetrics {
    pub range_high: f64,
    pub range_low: f64,
    /// (HH - LL) / midpoint * 100 over the trailing window.
    pub range_pct: f64,
    /// |fast EMA - slow EMA| / close * 100.
    pub spread_pct: f64,
    pub fast_ema: f64,
    pub slow_ema: f64,
    pub fast_rising: bool,
    pub fast_falling: bool,
    pub atr: f64,
    pub atr_baseline: f64,
    /// Consecutive trailing bars whose own range window stayed within the
    /// width threshold.
    pub persisted_bars: usize,
    pub choppiness: Option<f64>,
}

/// Complete snapshot of the detected regime plus all contributing metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeState {
    pub regime: MarketRegime,
    /// Present only when `regime == RangeBound`.
    pub range: Option<PriceRange>,
    pub movement: MovementQuality,
    /// Confidence in the classification [0.0, 1.0].
    pub confidence: f64,
    pub metrics: RegimeMetrics,
}

// =============================================================================
// RegimeDetector
// =============================================================================

/// Stateless detector; every call classifies from scratch.
#[derive(Debug, Clone)]
pub struct RegimeDetector {
    params: RegimeParams,
    atr_period: usize,
    ema_fast: usize,
    ema_slow: usize,
    choppiness_period: usize,
    required: usize,
}

impl RegimeDetector {
    pub fn new(params: RegimeParams, indicators: &IndicatorParams) -> Self {
        let required = params.required_history(indicators);
        Self {
            params,
            atr_period: indicators.atr_period,
            ema_fast: indicators.ema_fast,
            ema_slow: indicators.ema_slow,
            choppiness_period: indicators.choppiness_period,
            required,
        }
    }

    /// Bars needed before `detect` returns a state.
    pub fn required_history(&self) -> usize {
        self.required
    }

    /// Classify the regime at the latest candle.
    ///
    /// Returns `None` when the history is shorter than `required_history()` or
    /// an underlying indicator cannot be computed.
    pub fn detect(&self, candles: &[Candle]) -> Option<RegimeState> {
        if candles.len() < self.required {
            trace!(
                bars = candles.len(),
                required = self.required,
                "Regime: insufficient history"
            );
            return None;
        }

        let metrics = self.measure(candles)?;
        let state = classify(&metrics, &self.params);

        debug!(
            regime = %state.regime,
            movement = %state.movement,
            range_pct = format!("{:.3}", metrics.range_pct),
            spread_pct = format!("{:.3}", metrics.spread_pct),
            atr = format!("{:.4}", metrics.atr),
            atr_baseline = format!("{:.4}", metrics.atr_baseline),
            persisted_bars = metrics.persisted_bars,
            confidence = format!("{:.2}", state.confidence),
            "Regime detected"
        );

        Some(state)
    }

    fn measure(&self, candles: &[Candle]) -> Option<RegimeMetrics> {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let last_close = *closes.last()?;

        let cross = ema_crossover(&closes, self.ema_fast, self.ema_slow)?;

        let atr_series = calculate_atr_series(candles, self.atr_period);
        let atr = *atr_series.last()?;
        let atr_baseline = rolling_atr_mean(&atr_series, self.params.volatility_lookback)?;

        let lookback = self.params.range_lookback;
        let (range_high, range_low, range_pct) = range_width(&candles[candles.len() - lookback..]);

        let mut persisted_bars = 0;
        let mut end = candles.len();
        while end >= lookback {
            let (_, _, pct) = range_width(&candles[end - lookback..end]);
            if pct > self.params.range_pct_threshold {
                break;
            }
            persisted_bars += 1;
            end -= 1;
        }

        Some(RegimeMetrics {
            range_high,
            range_low,
            range_pct,
            spread_pct: cross.spread_pct(last_close),
            fast_ema: cross.fast,
            slow_ema: cross.slow,
            fast_rising: cross.fast_rising(),
            fast_falling: cross.fast_falling(),
            atr,
            atr_baseline,
            persisted_bars,
            choppiness: calculate_choppiness(candles, self.choppiness_period),
        })
    }
}

// =============================================================================
// Classification logic
// =============================================================================

/// Apply the regime policy to a set of measurements.
pub fn classify(m: &RegimeMetrics, p: &RegimeParams) -> RegimeState {
    let movement = MovementQuality::from_spread(m.spread_pct);

    let tight = m.range_pct <= p.range_pct_threshold;
    let flat_emas = m.spread_pct <= p.ema_spread_threshold;
    let calm = m.atr <= m.atr_baseline * p.volatility_ratio;
    let persisted = m.persisted_bars >= p.range_min_bars;

    if tight && flat_emas && calm && persisted {
        let confidence = remap(m.range_pct, p.range_pct_threshold, 0.0, 0.50, 1.0);
        return RegimeState {
            regime: MarketRegime::RangeBound,
            range: Some(PriceRange {
                high: m.range_high,
                low: m.range_low,
                mid: (m.range_high + m.range_low) / 2.0,
            }),
            movement,
            confidence,
            metrics: *m,
        };
    }

    let trending = m.spread_pct > p.trend_spread_threshold;
    let regime = if trending && m.fast_ema > m.slow_ema && m.fast_rising {
        MarketRegime::TrendingUp
    } else if trending && m.fast_ema < m.slow_ema && m.fast_falling {
        MarketRegime::TrendingDown
    } else {
        MarketRegime::Transition
    };

    let confidence = match regime {
        MarketRegime::Transition => 0.30,
        _ => remap(
            m.spread_pct,
            p.trend_spread_threshold,
            p.trend_spread_threshold * 3.0,
            0.60,
            1.0,
        ),
    };

    RegimeState {
        regime,
        range: None,
        movement,
        confidence,
        metrics: *m,
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

/// (HH, LL, width percent of midpoint) over `window`.
fn range_width(window: &[Candle]) -> (f64, f64, f64) {
    let hh = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let ll = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let range = hh - ll;
    let mid = (hh + ll) / 2.0;
    let pct = if range <= 0.0 {
        0.0
    } else if mid <= 0.0 {
        f64::INFINITY
    } else {
        range / mid * 100.0
    };
    (hh, ll, pct)
}

/// Linearly remap `value` from `[in_lo, in_hi]` to `[out_lo, out_hi]`, clamped
/// to the output range. Works for descending input ranges too.
fn remap(value: f64, in_lo: f64, in_hi: f64, out_lo: f64, out_hi: f64) -> f64 {
    let t = if (in_hi - in_lo).abs() < f64::EPSILON {
        0.5
    } else {
        (value - in_lo) / (in_hi - in_lo)
    };
    out_lo + t.clamp(0.0, 1.0) * (out_hi - out_lo)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn metrics(range_pct: f64, spread_pct: f64, fast_above: bool) -> RegimeMetrics {
        RegimeMetrics {
            range_high: 102.0,
            range_low: 100.0,
            range_pct,
            spread_pct,
            fast_ema: if fast_above { 101.5 } else { 100.5 },
            slow_ema: 101.0,
            fast_rising: fast_above,
            fast_falling: !fast_above,
            atr: 1.0,
            atr_baseline: 1.2,
            persisted_bars: 10,
            choppiness: None,
        }
    }

    fn candle(timestamp: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp,
            open: close,
            high,
            low,
            close,
            volume: 100.0,
        }
    }

    fn detector() -> RegimeDetector {
        RegimeDetector::new(RegimeParams::default(), &IndicatorParams::default())
    }

    #[test]
    fn range_threshold_is_inclusive() {
        let p = RegimeParams::default();
        let at = classify(&metrics(2.0, 0.2, true), &p);
        assert_eq!(at.regime, MarketRegime::RangeBound);
        let range = at.range.unwrap();
        assert!((range.mid - 101.0).abs() < 1e-10);

        let above = classify(&metrics(3.0, 0.2, true), &p);
        assert_ne!(above.regime, MarketRegime::RangeBound);
        assert!(above.range.is_none());
    }

    #[test]
    fn range_requires_calm_volatility_and_persistence() {
        let p = RegimeParams::default();
        let mut m = metrics(1.0, 0.2, true);
        m.atr = 2.0;
        assert_eq!(classify(&m, &p).regime, MarketRegime::Transition);

        let mut m = metrics(1.0, 0.2, true);
        m.persisted_bars = p.range_min_bars - 1;
        assert_eq!(classify(&m, &p).regime, MarketRegime::Transition);

        let mut m = metrics(1.0, 0.2, true);
        m.atr = m.atr_baseline;
        assert_eq!(classify(&m, &p).regime, MarketRegime::RangeBound);
    }

    #[test]
    fn trend_classification() {
        let p = RegimeParams::default();
        assert_eq!(classify(&metrics(8.0, 1.5, true), &p).regime, MarketRegime::TrendingUp);
        assert_eq!(classify(&metrics(8.0, 1.5, false), &p).regime, MarketRegime::TrendingDown);
        assert_eq!(classify(&metrics(8.0, 0.8, true), &p).regime, MarketRegime::Transition);
    }

    #[test]
    fn movement_quality_buckets() {
        assert_eq!(MovementQuality::from_spread(0.6), MovementQuality::Strong);
        assert_eq!(MovementQuality::from_spread(0.3), MovementQuality::Moderate);
        assert_eq!(MovementQuality::from_spread(0.1), MovementQuality::Weak);
        assert_eq!(MovementQuality::from_spread(0.05), MovementQuality::Choppy);
    }

    #[test]
    fn detect_needs_history() {
        let candles: Vec<Candle> = (0..49)
            .map(|i| candle(i, 101.0, 99.0, 100.0))
            .collect();
        assert_eq!(detector().required_history(), 50);
        assert!(detector().detect(&candles).is_none());
    }

    #[test]
    fn detect_flat_market_is_range_bound() {
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let wiggle = if i % 2 == 0 { 0.2 } else { -0.2 };
                candle(i, 100.5 + wiggle, 99.5 + wiggle, 100.0 + wiggle)
            })
            .collect();
        let state = detector().detect(&candles).unwrap();
        assert_eq!(state.regime, MarketRegime::RangeBound);
        assert!(state.metrics.persisted_bars >= 5);
        let range = state.range.unwrap();
        assert!(range.high > range.low);
    }

    #[test]
    fn detect_steady_rally_is_trending_up() {
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let c = 100.0 * 1.01_f64.powi(i as i32);
                candle(i, c * 1.002, c * 0.998, c)
            })
            .collect();
        let state = detector().detect(&candles).unwrap();
        assert_eq!(state.regime, MarketRegime::TrendingUp);
        assert!(state.range.is_none());
        assert!(state.confidence >= 0.6);
    }

    #[test]
    fn detect_steady_decline_is_trending_down() {
        let candles: Vec<Candle> = (0..80)
            .map(|i| {
                let c = 200.0 * 0.99_f64.powi(i as i32);
                candle(i, c * 1.002, c * 0.998, c)
            })
            .collect();
        assert_eq!(detector().detect(&candles).unwrap().regime, MarketRegime::TrendingDown);
    }

    #[test]
    fn regime_display() {
        assert_eq!(format!("{}", MarketRegime::RangeBound), "RANGE-BOUND");
        assert_eq!(format!("{}", MarketRegime::TrendingUp), "TRENDING UP");
    }

    #[test]
    fn test_remap() {
        assert!((remap(0.5, 0.0, 1.0, 0.0, 10.0) - 5.0).abs() < 1e-10);
        assert!((remap(2.0, 0.0, 1.0, 0.0, 10.0) - 10.0).abs() < 1e-10);
        assert!((remap(-1.0, 0.0, 1.0, 0.0, 10.0) - 0.0).abs() < 1e-10);
        assert!((remap(1.0, 2.0, 0.0, 0.5, 1.0) - 0.75).abs() < 1e-10);
    }
}
