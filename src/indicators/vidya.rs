// =============================================================================
// Variable Index Dynamic Average (VIDYA) with ATR bands
// =============================================================================
//
// An adaptive moving average whose smoothing constant scales with the
// absolute Chande Momentum Oscillator (CMO):
//
//   CMO_t   = (sum_up - sum_down) / (sum_up + sum_down) * 100    over `momentum`
//   k_t     = alpha * |CMO_t| / 100,   alpha = 2 / (length + 1)
//   VIDYA_t = k_t * close_t + (1 - k_t) * VIDYA_{t-1}
//
// The raw line is then smoothed with an SMA over `smoothing` bars. Bands sit
// `band_distance` ATRs above and below the smoothed line; the classifier
// votes only when price leaves the band.
// =============================================================================

use serde::{Deserialize, Serialize};

/// Latest VIDYA line with its ATR bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VidyaBands {
    pub value: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Smoothed VIDYA series.
///
/// The raw line starts at close index `momentum` (first bar with a full CMO
/// window); after smoothing the series has `len - momentum - smoothing + 1`
/// values. Empty when any parameter is zero or data is short. A flat CMO
/// window (zero denominator) carries the previous value forward.
pub fn calculate_vidya(closes: &[f64], length: usize, momentum: usize, smoothing: usize) -> Vec<f64> {
    if length == 0 || momentum == 0 || smoothing == 0 || closes.len() < momentum + smoothing {
        return Vec::new();
    }

    let alpha = 2.0 / (length + 1) as f64;
    let deltas: Vec<f64> = closes.windows(2).map(|w| w[1] - w[0]).collect();

    let mut raw = Vec::with_capacity(closes.len() - momentum);
    let mut prev = closes[momentum];
    raw.push(prev);

    for t in (momentum + 1)..closes.len() {
        // deltas[t - 1] is the move into close t.
        let window = &deltas[t - momentum..t];
        let (up, down) = window.iter().fold((0.0_f64, 0.0_f64), |(u, d), &x| {
            if x > 0.0 {
                (u + x, d)
            } else {
                (u, d - x)
            }
        });
        let cmo = if up + down == 0.0 {
            0.0
        } else {
            (up - down) / (up + down) * 100.0
        };

        let k = alpha * cmo.abs() / 100.0;
        let v = k * closes[t] + (1.0 - k) * prev;
        if !v.is_finite() {
            break;
        }
        raw.push(v);
        prev = v;
    }

    if raw.len() < smoothing {
        return Vec::new();
    }
    raw.windows(smoothing)
        .map(|w| w.iter().sum::<f64>() / smoothing as f64)
        .collect()
}

/// Latest smoothed VIDYA with bands at `band_distance * atr`.
pub fn vidya_bands(
    closes: &[f64],
    length: usize,
    momentum: usize,
    smoothing: usize,
    atr: f64,
    band_distance: f64,
) -> Option<VidyaBands> {
    let value = *calculate_vidya(closes, length, momentum, smoothing).last()?;
    let offset = (atr * band_distance).abs();
    if !offset.is_finite() {
        return None;
    }
    Some(VidyaBands {
        value,
        upper: value + offset,
        lower: value - offset,
    })
}
