// =============================================================================
// Indicator Panel — one cycle's readings for the fast and medium tiers
// =============================================================================
//
// Fast tier (fixed set, in this order):
//   rsi, mfi, dmi, vidya, ema_crossover, volume_pressure, obv, force_index
// Medium tier:
//   vwap (close against the session VWAP)
//
// An indicator that cannot be computed contributes no reading; the tier then
// counts fewer votes instead of inventing a neutral one.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::config::{ClassifierParams, IndicatorParams};
use crate::indicators::{atr, choppiness, dmi, ema, force, mfi, rsi, vidya, volume, vwap};
use crate::market_data::Candle;
use crate::signals::{IndicatorKind, IndicatorReading};

/// Latest raw indicator values, reported alongside the verdict.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    pub close: Option<f64>,
    pub rsi: Option<f64>,
    pub mfi: Option<f64>,
    pub plus_di: Option<f64>,
    pub minus_di: Option<f64>,
    pub adx: Option<f64>,
    pub atr: Option<f64>,
    pub vwap: Option<f64>,
    pub vidya: Option<f64>,
    pub vidya_upper: Option<f64>,
    pub vidya_lower: Option<f64>,
    pub ema_fast: Option<f64>,
    pub ema_slow: Option<f64>,
    pub ema_crossed_up: bool,
    pub ema_crossed_down: bool,
    pub volume_ratio: Option<f64>,
    pub obv: Option<f64>,
    pub force_index: Option<f64>,
    pub choppiness: Option<f64>,
}

/// Readings for the technical tiers plus the raw values behind them.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorPanel {
    pub fast: Vec<IndicatorReading>,
    pub medium: Vec<IndicatorReading>,
    pub snapshot: IndicatorSnapshot,
}

impl IndicatorPanel {
    pub fn compute(candles: &[Candle], ind: &IndicatorParams, cls: &ClassifierParams) -> Self {
        let closes: Vec<f64> = candles.iter().map(|c| c.close).collect();
        let close = closes.last().copied();
        let mut snap = IndicatorSnapshot {
            close,
            ..IndicatorSnapshot::default()
        };
        let mut fast = Vec::with_capacity(8);
        let mut medium = Vec::with_capacity(1);

        let oscillator = |kind, value| IndicatorReading::Midpoint {
            kind,
            value,
            center: 50.0,
            scale: cls.oscillator_scale,
        };

        if let Some(v) = rsi::latest_rsi(&closes, ind.rsi_period) {
            snap.rsi = Some(v);
            fast.push(oscillator(IndicatorKind::Rsi, v));
        }

        if let Some(v) = mfi::latest_mfi(candles, ind.mfi_period) {
            snap.mfi = Some(v);
            fast.push(oscillator(IndicatorKind::Mfi, v));
        }

        if let Some(d) = dmi::calculate_dmi(candles, ind.dmi_period, ind.dmi_smoothing) {
            snap.plus_di = Some(d.plus_di);
            snap.minus_di = Some(d.minus_di);
            snap.adx = Some(d.adx);
            fast.push(IndicatorReading::DirectionalPair {
                kind: IndicatorKind::Dmi,
                plus: d.plus_di,
                minus: d.minus_di,
                strength: d.adx,
                scale: cls.dmi_strength_scale,
            });
        }

        snap.atr = atr::calculate_atr(candles, ind.atr_period);
        if let (Some(atr), Some(price)) = (snap.atr, close) {
            if let Some(b) = vidya::vidya_bands(
                &closes,
                ind.vidya_length,
                ind.vidya_momentum,
                ind.vidya_smoothing,
                atr,
                ind.vidya_band_distance,
            ) {
                snap.vidya = Some(b.value);
                snap.vidya_upper = Some(b.upper);
                snap.vidya_lower = Some(b.lower);
                fast.push(IndicatorReading::Crossover {
                    kind: IndicatorKind::Vidya,
                    value: price,
                    upper: b.upper,
                    lower: b.lower,
                    scale: cls.crossover_scale,
                });
            }
        }

        if let Some(x) = ema::ema_crossover(&closes, ind.ema_fast, ind.ema_slow) {
            snap.ema_fast = Some(x.fast);
            snap.ema_slow = Some(x.slow);
            snap.ema_crossed_up = x.crossed_up;
            snap.ema_crossed_down = x.crossed_down;
            fast.push(IndicatorReading::crossover(
                IndicatorKind::EmaCrossover,
                x.fast,
                x.slow,
                cls.crossover_scale,
            ));
        }

        snap.volume_ratio = volume::volume_ratio(candles, ind.volume_sma_period);
        if let Some(p) =
            volume::volume_pressure(candles, ind.volume_sma_period, ind.volume_surge_multiplier)
        {
            fast.push(IndicatorReading::Midpoint {
                kind: IndicatorKind::VolumePressure,
                value: p,
                center: 0.0,
                scale: cls.volume_pressure_scale,
            });
        }

        if let Some((now, then)) = volume::obv_change(candles, ind.obv_lookback) {
            snap.obv = Some(now);
            fast.push(IndicatorReading::crossover(
                IndicatorKind::Obv,
                now,
                then,
                cls.crossover_scale,
            ));
        }

        if let Some(f) = force::calculate_force_oscillator(candles, ind.force_period) {
            snap.force_index = Some(f);
            fast.push(IndicatorReading::Midpoint {
                kind: IndicatorKind::ForceIndex,
                value: f,
                center: 0.0,
                scale: cls.force_scale,
            });
        }

        if let (Some(v), Some(price)) = (vwap::latest_vwap(candles, ind.vwap_anchor), close) {
            snap.vwap = Some(v);
            medium.push(IndicatorReading::crossover(
                IndicatorKind::Vwap,
                price,
                v,
                cls.crossover_scale,
            ));
        }

        snap.choppiness = choppiness::calculate_choppiness(candles, ind.choppiness_period);

        Self {
            fast,
            medium,
            snapshot: snap,
        }
    }
}
