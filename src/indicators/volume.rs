// =============================================================================
// Volume indicators — On-Balance Volume and volume pressure
// =============================================================================
//
// OBV (signed-volume accumulator):
//   OBV_0 = 0
//   OBV_t = OBV_{t-1} + volume_t   if close_t > close_{t-1}
//         = OBV_{t-1} - volume_t   if close_t < close_{t-1}
//         = OBV_{t-1}              otherwise
//
// Volume pressure: when the latest volume reaches `multiplier` times its SMA,
// the surge is signed by the bar body (close vs open). Quiet bars read 0.
// A surge never reads below MIN_PRESSURE, so its sign always follows the body.
// =============================================================================

use crate::market_data::Candle;
use crate::types::Direction;

const MIN_PRESSURE: f64 = 1.0;

/// OBV series aligned one-to-one with `candles`.
pub fn calculate_obv(candles: &[Candle]) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut obv = 0.0;
    for (i, c) in candles.iter().enumerate() {
        if i > 0 {
            let prev = candles[i - 1].close;
            if c.close > prev {
                obv += c.volume;
            } else if c.close < prev {
                obv -= c.volume;
            }
        }
        out.push(obv);
    }
    out
}

/// `(obv_now, obv_lookback_bars_ago)`.
pub fn obv_change(candles: &[Candle], lookback: usize) -> Option<(f64, f64)> {
    if lookback == 0 || candles.len() < lookback + 1 {
        return None;
    }
    let obv = calculate_obv(candles);
    let now = *obv.last()?;
    let then = obv[obv.len() - 1 - lookback];
    Some((now, then))
}

/// Latest volume divided by the SMA of the last `period` volumes (latest
/// included). Zero average volume reads as 1.0.
pub fn volume_ratio(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period {
        return None;
    }
    let window = &candles[candles.len() - period..];
    let avg = window.iter().map(|c| c.volume).sum::<f64>() / period as f64;
    let last = window.last()?.volume;
    if avg == 0.0 {
        return Some(1.0);
    }
    let ratio = last / avg;
    ratio.is_finite().then_some(ratio)
}

/// Signed volume surge: `max((ratio - 1) * 100, 1)` carrying the sign of the
/// latest bar body when `ratio >= multiplier`, otherwise 0.
pub fn volume_pressure(candles: &[Candle], period: usize, multiplier: f64) -> Option<f64> {
    let ratio = volume_ratio(candles, period)?;
    let last = candles.last()?;
    if ratio < multiplier {
        return Some(0.0);
    }
    let sign = Direction::from_sign(last.close - last.open).signum();
    let magnitude = ((ratio - 1.0) * 100.0).max(MIN_PRESSURE);
    Some(magnitude * sign)
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn bar(open: f64, close: f64, volume: f64) -> Candle {
        Candle {
            timestamp: 0,
            open,
            high: open.max(close),
            low: open.min(close),
            close,
            volume,
        }
    }

    #[test]
    fn obv_accumulates_signed_volume() {
        let candles = vec![
            bar(10.0, 10.0, 5.0),
            bar(10.0, 11.0, 3.0),
            bar(11.0, 10.5, 2.0),
            bar(10.5, 10.5, 7.0),
        ];
        assert_eq!(calculate_obv(&candles), vec![0.0, 3.0, 1.0, 1.0]);
    }

    #[test]
    fn obv_change_window() {
        let candles: Vec<Candle> = (0..10).map(|i| bar(i as f64, i as f64 + 1.0, 1.0)).collect();
        let (now, then) = obv_change(&candles, 5).unwrap();
        assert!((now - 9.0).abs() < 1e-10);
        assert!((then - 4.0).abs() < 1e-10);
        assert!(obv_change(&candles, 10).is_none());
        assert!(obv_change(&candles, 0).is_none());
    }

    #[test]
    fn ratio_and_zero_average() {
        let mut candles = vec![bar(1.0, 1.0, 10.0); 19];
        candles.push(bar(1.0, 1.0, 29.0));
        let r = volume_ratio(&candles, 20).unwrap();
        assert!((r - 29.0 / 10.95).abs() < 1e-10);

        let quiet = vec![bar(1.0, 1.0, 0.0); 20];
        assert_eq!(volume_ratio(&quiet, 20), Some(1.0));
        assert!(volume_ratio(&quiet[..5], 20).is_none());
    }

    #[test]
    fn pressure_is_signed_by_body() {
        let mut up = vec![bar(1.0, 1.0, 10.0); 19];
        up.push(bar(1.0, 2.0, 50.0));
        assert!(volume_pressure(&up, 20, 1.2).unwrap() > 0.0);

        let mut down = vec![bar(1.0, 1.0, 10.0); 19];
        down.push(bar(2.0, 1.0, 50.0));
        assert!(volume_pressure(&down, 20, 1.2).unwrap() < 0.0);

        let calm = vec![bar(1.0, 2.0, 10.0); 20];
        assert_eq!(volume_pressure(&calm, 20, 1.2), Some(0.0));
    }

    #[test]
    fn pressure_below_average_keeps_body_sign() {
        // Ratio ~0.8 passes a 0.5 multiplier; the vote must still follow the body.
        let mut up = vec![bar(100.0, 100.0, 100.0); 79];
        up.push(bar(100.0, 101.5, 80.0));
        let p = volume_pressure(&up, 20, 0.5).unwrap();
        assert!((p - MIN_PRESSURE).abs() < 1e-10);

        let mut down = vec![bar(100.0, 100.0, 100.0); 79];
        down.push(bar(101.5, 100.0, 80.0));
        assert!((volume_pressure(&down, 20, 0.5).unwrap() + MIN_PRESSURE).abs() < 1e-10);

        let mut flat = vec![bar(100.0, 100.0, 100.0); 19];
        flat.push(bar(100.0, 100.0, 500.0));
        assert_eq!(volume_pressure(&flat, 20, 1.2), Some(0.0));
    }
}
