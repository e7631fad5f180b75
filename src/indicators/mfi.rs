// =============================================================================
// Money Flow Index (MFI) — volume-weighted gain/loss oscillator
// =============================================================================
//
//   typical   = (H + L + C) / 3
//   raw flow  = typical * volume
//   positive  = sum of raw flow over bars where typical rose
//   negative  = sum of raw flow over bars where typical fell
//   MFI       = 100 - 100 / (1 + positive / negative)
//
// Output is in [0, 100]; the classifier treats 50 as the midpoint.
// =============================================================================

use crate::market_data::Candle;

/// MFI series; one value per candle starting at index `period`.
///
/// # Edge cases
/// - `period == 0` or fewer than `period + 1` candles => empty vec
/// - no flow in either direction (flat or zero volume) => 50.0
/// - only positive flow => 100.0
pub fn calculate_mfi(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period + 1 {
        return Vec::new();
    }

    // signed_flow[i] describes the move from candle i to candle i + 1.
    let signed_flow: Vec<f64> = candles
        .windows(2)
        .map(|w| {
            let prev_tp = w[0].typical_price();
            let tp = w[1].typical_price();
            let flow = tp * w[1].volume;
            if tp > prev_tp {
                flow
            } else if tp < prev_tp {
                -flow
            } else {
                0.0
            }
        })
        .collect();

    let mut out = Vec::with_capacity(signed_flow.len() - period + 1);
    for window in signed_flow.windows(period) {
        let (pos, neg) = window.iter().fold((0.0_f64, 0.0_f64), |(p, n), &f| {
            if f > 0.0 {
                (p + f, n)
            } else {
                (p, n - f)
            }
        });

        let mfi = if pos == 0.0 && neg == 0.0 {
            50.0
        } else if neg == 0.0 {
            100.0
        } else {
            100.0 - 100.0 / (1.0 + pos / neg)
        };

        if !mfi.is_finite() {
            break;
        }
        out.push(mfi);
    }
    out
}

/// Most recent MFI value.
pub fn latest_mfi(candles: &[Candle], period: usize) -> Option<f64> {
    calculate_mfi(candles, period).last().copied()
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(close: f64, volume: f64) -> Candle {
        Candle {
            timestamp: 0,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
        }
    }

    #[test]
    fn mfi_guards() {
        let candles: Vec<Candle> = (0..10).map(|i| bar(100.0 + i as f64, 10.0)).collect();
        assert!(calculate_mfi(&candles, 0).is_empty());
        assert!(calculate_mfi(&candles, 10).is_empty());
        assert_eq!(calculate_mfi(&candles, 9).len(), 1);
    }

    #[test]
    fn rising_prices_give_100() {
        let candles: Vec<Candle> = (0..30).map(|i| bar(100.0 + i as f64, 10.0)).collect();
        let v = latest_mfi(&candles, 10).unwrap();
        assert!((v - 100.0).abs() < 1e-10, "expected 100.0, got {v}");
    }

    #[test]
    fn falling_prices_give_0() {
        let candles: Vec<Candle> = (0..30).map(|i| bar(200.0 - i as f64, 10.0)).collect();
        let v = latest_mfi(&candles, 10).unwrap();
        assert!(v.abs() < 1e-10, "expected 0.0, got {v}");
    }

    #[test]
    fn zero_volume_is_neutral() {
        let candles: Vec<Candle> = (0..30).map(|i| bar(100.0 + i as f64, 0.0)).collect();
        let v = latest_mfi(&candles, 10).unwrap();
        assert!((v - 50.0).abs() < 1e-10);
    }

    #[test]
    fn volume_tilts_the_oscillator() {
        // Alternating up/down closes; up bars carry three times the volume.
        let candles: Vec<Candle> = (0..30)
            .map(|i| {
                if i % 2 == 0 {
                    bar(101.0, 30.0)
                } else {
                    bar(100.0, 10.0)
                }
            })
            .collect();
        let v = latest_mfi(&candles, 10).unwrap();
        assert!(v > 50.0 && v <= 100.0, "expected bullish tilt, got {v}");
    }
}
