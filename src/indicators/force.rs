// =============================================================================
// Force Index oscillator
// =============================================================================
//
//   force_t = (close_t - close_{t-1}) * volume_t
//   FO      = 100 * EMA(force, period) / EMA(|force|, period)
//
// Normalising by the EMA of the absolute force makes the reading independent
// of price and volume scale and bounds it to [-100, 100]. Zero force over the
// whole window reads 0.
// =============================================================================

use crate::indicators::ema::calculate_ema;
use crate::market_data::Candle;

/// Latest normalised force oscillator value.
///
/// `None` when `period == 0` or fewer than `period + 1` candles.
pub fn calculate_force_oscillator(candles: &[Candle], period: usize) -> Option<f64> {
    if period == 0 || candles.len() < period + 1 {
        return None;
    }

    let force: Vec<f64> = candles
        .windows(2)
        .map(|w| (w[1].close - w[0].close) * w[1].volume)
        .collect();
    let abs_force: Vec<f64> = force.iter().map(|f| f.abs()).collect();

    let signed = *calculate_ema(&force, period).last()?;
    let magnitude = *calculate_ema(&abs_force, period).last()?;

    if magnitude == 0.0 {
        return Some(0.0);
    }
    let fo = (100.0 * signed / magnitude).clamp(-100.0, 100.0);
    fo.is_finite().then_some(fo)
}
