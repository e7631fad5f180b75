// =============================================================================
// Directional Movement Index (DMI / ADX)
// =============================================================================
//
//   1. +DM / -DM and True Range per bar transition.
//   2. Wilder smoothing over `period` of +DM, -DM and TR.
//   3. +DI = smoothed(+DM) / smoothed(TR) * 100
//      -DI = smoothed(-DM) / smoothed(TR) * 100
//   4. DX  = |+DI - -DI| / (+DI + -DI) * 100
//   5. ADX = Wilder average of DX over `smoothing` bars.
//
// The pair (+DI, -DI) gives direction; ADX gives trend strength and scales
// the directional-pair vote.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::indicators::atr::true_range_series;
use crate::market_data::Candle;

/// Latest directional-movement reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DmiReading {
    pub plus_di: f64,
    pub minus_di: f64,
    pub adx: f64,
}

/// Compute the latest +DI, -DI and ADX.
///
/// Needs at least `period + smoothing` candles. A zero smoothed true range
/// (perfectly flat prices) yields DI = 0 and DX = 0 rather than `None`.
pub fn calculate_dmi(candles: &[Candle], period: usize, smoothing: usize) -> Option<DmiReading> {
    if period == 0 || smoothing == 0 || candles.len() < period + smoothing {
        return None;
    }

    let period_f = period as f64;
    let mut plus_dm = Vec::with_capacity(candles.len() - 1);
    let mut minus_dm = Vec::with_capacity(candles.len() - 1);
    let tr = true_range_series(candles);

    for w in candles.windows(2) {
        let (prev, cur) = (&w[0], &w[1]);
        let up_move = cur.high - prev.high;
        let down_move = prev.low - cur.low;

        plus_dm.push(if up_move > down_move && up_move > 0.0 { up_move } else { 0.0 });
        minus_dm.push(if down_move > up_move && down_move > 0.0 { down_move } else { 0.0 });
    }

    let mut s_plus: f64 = plus_dm[..period].iter().sum();
    let mut s_minus: f64 = minus_dm[..period].iter().sum();
    let mut s_tr: f64 = tr[..period].iter().sum();

    let mut dx_values = Vec::with_capacity(tr.len() - period + 1);
    let (mut plus_di, mut minus_di, dx) = directional_indices(s_plus, s_minus, s_tr)?;
    dx_values.push(dx);

    for i in period..tr.len() {
        s_plus = s_plus - s_plus / period_f + plus_dm[i];
        s_minus = s_minus - s_minus / period_f + minus_dm[i];
        s_tr = s_tr - s_tr / period_f + tr[i];

        let (p, m, dx) = directional_indices(s_plus, s_minus, s_tr)?;
        plus_di = p;
        minus_di = m;
        dx_values.push(dx);
    }

    if dx_values.len() < smoothing {
        return None;
    }

    let smoothing_f = smoothing as f64;
    let mut adx = dx_values[..smoothing].iter().sum::<f64>() / smoothing_f;
    for &dx in &dx_values[smoothing..] {
        adx = (adx * (smoothing_f - 1.0) + dx) / smoothing_f;
    }

    adx.is_finite().then_some(DmiReading {
        plus_di,
        minus_di,
        adx,
    })
}

// =============================================================================
// Internal helpers
// =============================================================================

/// (+DI, -DI, DX) from smoothed sums. `None` only on non-finite input.
fn directional_indices(s_plus: f64, s_minus: f64, s_tr: f64) -> Option<(f64, f64, f64)> {
    if !(s_plus.is_finite() && s_minus.is_finite() && s_tr.is_finite()) {
        return None;
    }
    if s_tr == 0.0 {
        return Some((0.0, 0.0, 0.0));
    }

    let plus_di = s_plus / s_tr * 100.0;
    let minus_di = s_minus / s_tr * 100.0;
    let di_sum = plus_di + minus_di;
    let dx = if di_sum == 0.0 {
        0.0
    } else {
        (plus_di - minus_di).abs() / di_sum * 100.0
    };
    Some((plus_di, minus_di, dx))
}
