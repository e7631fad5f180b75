// =============================================================================
// Average True Range (ATR) — Wilder's Smoothing Method
// =============================================================================
//
//   TR    = max(H - L, |H - prevClose|, |L - prevClose|)
//   ATR_0 = SMA of first `period` TR values
//   ATR_t = (ATR_{t-1} * (period - 1) + TR_t) / period
//
// The regime detector compares the latest ATR with the mean of the trailing
// ATR series to decide whether volatility is elevated. The VIDYA band width
// is expressed in ATR units.
// =============================================================================

use crate::market_data::Candle;

/// True range of every bar after the first (`candles.len() - 1` values).
pub fn true_range_series(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            (cur.high - cur.low)
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs())
        })
        .collect()
}

/// Full Wilder ATR series. The first element corresponds to candle index
/// `period`; the last to the latest candle.
///
/// Empty when `period == 0` or fewer than `period + 1` candles. A non-finite
/// value truncates the series.
pub fn calculate_atr_series(candles: &[Candle], period: usize) -> Vec<f64> {
    if period == 0 || candles.len() < period + 1 {
        return Vec::new();
    }

    let tr = true_range_series(candles);
    let period_f = period as f64;

    let seed = tr[..period].iter().sum::<f64>() / period_f;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut out = Vec::with_capacity(tr.len() - period + 1);
    out.push(seed);

    let mut atr = seed;
    for &t in &tr[period..] {
        atr = (atr * (period_f - 1.0) + t) / period_f;
        if !atr.is_finite() {
            break;
        }
        out.push(atr);
    }
    out
}

/// Most recent ATR value.
///
/// `None` when the period is zero, data is short, or a non-finite value
/// appeared anywhere in the smoothing chain.
pub fn calculate_atr(candles: &[Candle], period: usize) -> Option<f64> {
    let series = calculate_atr_series(candles, period);
    // A truncated series means the chain broke before the latest candle.
    if series.len() != candles.len().saturating_sub(period) {
        return None;
    }
    series.last().copied()
}

/// Mean of the last `lookback` ATR values (fewer if the series is shorter).
pub fn rolling_atr_mean(atr_series: &[f64], lookback: usize) -> Option<f64> {
    if atr_series.is_empty() || lookback == 0 {
        return None;
    }
    let start = atr_series.len().saturating_sub(lookback);
    let window = &atr_series[start..];
    Some(window.iter().sum::<f64>() / window.len() as f64)
}
