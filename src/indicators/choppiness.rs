// =============================================================================
// Choppiness Index — congestion oscillator
// =============================================================================
//
//   CI = 100 * log10( sum(TR, n) / (HH_n - LL_n) ) / log10(n)
//
// High readings (above ~61.8) indicate sideways congestion; low readings
// (below ~38.2) indicate a directional move. Reported with the regime as an
// annotation; it never casts a vote.
// =============================================================================

use crate::indicators::atr::true_range_series;
use crate::market_data::Candle;

/// Latest choppiness index over `lookback` bars, clamped to [0, 100].
///
/// `None` when `lookback < 2` or fewer than `lookback + 1` candles. A zero
/// high-low range (no movement at all) reads 100, full congestion.
pub fn calculate_choppiness(candles: &[Candle], lookback: usize) -> Option<f64> {
    if lookback < 2 || candles.len() < lookback + 1 {
        return None;
    }

    let tr = true_range_series(candles);
    let tr_sum: f64 = tr[tr.len() - lookback..].iter().sum();

    let window = &candles[candles.len() - lookback..];
    let hh = window.iter().map(|c| c.high).fold(f64::MIN, f64::max);
    let ll = window.iter().map(|c| c.low).fold(f64::MAX, f64::min);
    let range = hh - ll;

    if range <= 0.0 || tr_sum <= 0.0 {
        return Some(100.0);
    }

    let ci = 100.0 * (tr_sum / range).log10() / (lookback as f64).log10();
    ci.is_finite().then(|| ci.clamp(0.0, 100.0))
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candle(high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp: 0,
            open: close,
            high,
            low,
            close,
            volume: 1.0,
        }
    }

    #[test]
    fn guards() {
        let candles = vec![candle(101.0, 99.0, 100.0); 20];
        assert!(calculate_choppiness(&candles, 1).is_none());
        assert!(calculate_choppiness(&candles, 20).is_none());
        assert!(calculate_choppiness(&candles, 14).is_some());
    }

    #[test]
    fn straight_trend_is_low() {
        let candles: Vec<Candle> = (0..30)
            .map(|i| {
                let c = 100.0 + i as f64;
                candle(c + 0.5, c - 0.5, c)
            })
            .collect();
        let ci = calculate_choppiness(&candles, 14).unwrap();
        assert!(ci < 38.2, "trend should read low, got {ci}");
    }

    #[test]
    fn overlapping_bars_are_high() {
        let candles = vec![candle(101.0, 99.0, 100.0); 30];
        let ci = calculate_choppiness(&candles, 14).unwrap();
        assert!((ci - 100.0).abs() < 1e-10, "identical bars saturate, got {ci}");
    }

    #[test]
    fn zero_range_reads_full_congestion() {
        let candles = vec![candle(100.0, 100.0, 100.0); 30];
        assert_eq!(calculate_choppiness(&candles, 14), Some(100.0));
    }
}
