// =============================================================================
// Exponential Moving Average (EMA) and fast/slow crossover
// =============================================================================
//
//   multiplier = 2 / (period + 1)
//   EMA_t      = close_t * multiplier + EMA_{t-1} * (1 - multiplier)
//
// The first value is seeded with the SMA of the first `period` closes, so the
// output series starts at input index `period - 1`.
//
// The crossover reading pairs a fast and a slow EMA (default 5 / 18) and is
// used both as a fast-tier vote and by the regime detector (spread + slope).
// =============================================================================

use serde::{Deserialize, Serialize};

/// Latest state of a fast/slow EMA pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaCrossover {
    pub fast: f64,
    pub slow: f64,
    /// Fast EMA one bar earlier (slope reference).
    pub fast_prev: f64,
    /// Fast crossed above slow on the latest bar.
    pub crossed_up: bool,
    /// Fast crossed below slow on the latest bar.
    pub crossed_down: bool,
}

impl EmaCrossover {
    /// |fast - slow| as a percentage of `reference` (normally the last close).
    /// A zero reference yields 0.
    pub fn spread_pct(&self, reference: f64) -> f64 {
        if reference == 0.0 {
            return 0.0;
        }
        let pct = (self.fast - self.slow).abs() / reference.abs() * 100.0;
        if pct.is_finite() {
            pct
        } else {
            0.0
        }
    }

    pub fn fast_rising(&self) -> bool {
        self.fast >= self.fast_prev
    }

    pub fn fast_falling(&self) -> bool {
        self.fast <= self.fast_prev
    }
}

/// Compute the EMA series for `closes` with look-back `period`.
///
/// Returns an empty `Vec` when `period == 0` or `closes.len() < period`.
/// A non-finite intermediate value truncates the series.
pub fn calculate_ema(closes: &[f64], period: usize) -> Vec<f64> {
    if period == 0 || closes.len() < period {
        return Vec::new();
    }

    let multiplier = 2.0 / (period + 1) as f64;

    let seed: f64 = closes[..period].iter().sum::<f64>() / period as f64;
    if !seed.is_finite() {
        return Vec::new();
    }

    let mut result = Vec::with_capacity(closes.len() - period + 1);
    result.push(seed);

    let mut prev = seed;
    for &close in &closes[period..] {
        let ema = close * multiplier + prev * (1.0 - multiplier);
        if !ema.is_finite() {
            break;
        }
        result.push(ema);
        prev = ema;
    }

    result
}

/// Latest fast/slow EMA state.
///
/// Returns `None` when `fast >= slow`, either period is zero, or there are
/// fewer than `slow + 1` closes (one extra bar is needed for the slope and
/// cross detection).
pub fn ema_crossover(closes: &[f64], fast: usize, slow: usize) -> Option<EmaCrossover> {
    if fast == 0 || fast >= slow || closes.len() < slow + 1 {
        return None;
    }

    let fast_series = calculate_ema(closes, fast);
    let slow_series = calculate_ema(closes, slow);
    if fast_series.len() < 2 || slow_series.len() < 2 {
        return None;
    }

    let f_now = fast_series[fast_series.len() - 1];
    let f_prev = fast_series[fast_series.len() - 2];
    let s_now = slow_series[slow_series.len() - 1];
    let s_prev = slow_series[slow_series.len() - 2];

    Some(EmaCrossover {
        fast: f_now,
        slow: s_now,
        fast_prev: f_prev,
        crossed_up: f_prev <= s_prev && f_now > s_now,
        crossed_down: f_prev >= s_prev && f_now < s_now,
    })
}
