// =============================================================================
// Engine Configuration — tunable parameters with atomic save
// =============================================================================
//
// Every look-back, weight and threshold the engine uses lives here. All fields
// carry serde defaults so a partial JSON file (or `{}`) loads cleanly.
// `validate()` is called by every engine constructor; an invalid value is a
// construction error, never a silent fallback.
//
// Persistence uses the tmp + rename pattern so a crash mid-write cannot leave
// a truncated file behind.
// =============================================================================

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::BiasError;
use crate::indicators::VwapAnchor;
use crate::signals::ThresholdBand;
use crate::types::Mode;

// =============================================================================
// Default-value helpers (required by serde `default = "..."` attribute)
// =============================================================================

fn default_rsi_period() -> usize {
    14
}

fn default_mfi_period() -> usize {
    10
}

fn default_dmi_period() -> usize {
    13
}

fn default_dmi_smoothing() -> usize {
    8
}

fn default_atr_period() -> usize {
    14
}

fn default_vidya_length() -> usize {
    10
}

fn default_vidya_momentum() -> usize {
    20
}

fn default_vidya_smoothing() -> usize {
    15
}

fn default_vidya_band_distance() -> f64 {
    2.0
}

fn default_ema_fast() -> usize {
    5
}

fn default_ema_slow() -> usize {
    18
}

fn default_volume_sma_period() -> usize {
    20
}

fn default_volume_surge_multiplier() -> f64 {
    1.2
}

fn default_obv_lookback() -> usize {
    10
}

fn default_force_period() -> usize {
    13
}

fn default_choppiness_period() -> usize {
    14
}

fn default_oscillator_scale() -> f64 {
    2.0
}

fn default_unit_scale() -> f64 {
    1.0
}

fn default_crossover_scale() -> f64 {
    10.0
}

fn default_range_lookback() -> usize {
    20
}

fn default_range_pct_threshold() -> f64 {
    2.0
}

fn default_range_min_bars() -> usize {
    5
}

fn default_ema_spread_threshold() -> f64 {
    0.5
}

fn default_trend_spread_threshold() -> f64 {
    1.0
}

fn default_volatility_lookback() -> usize {
    50
}

fn default_volatility_ratio() -> f64 {
    1.0
}

fn default_bias_strength() -> f64 {
    60.0
}

fn default_divergence_threshold() -> f64 {
    60.0
}

fn default_range_bias_bump() -> f64 {
    10.0
}

fn default_technical_band() -> ThresholdBand {
    ThresholdBand::symmetric(20.0)
}

fn default_overall_band() -> ThresholdBand {
    ThresholdBand::symmetric(25.0)
}

fn default_source_weights() -> BTreeMap<String, f64> {
    [
        ("technical", 3.0),
        ("basket", 2.0),
        ("pcr", 2.5),
        ("option_chain", 2.0),
        ("advanced", 2.5),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

fn default_source_weight() -> f64 {
    1.0
}

fn default_breadth_advance_pct() -> f64 {
    0.5
}

fn default_breadth_bias_pct() -> f64 {
    1.0
}

// =============================================================================
// IndicatorParams
// =============================================================================

/// Look-backs for every indicator in the fast and medium tiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorParams {
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,

    #[serde(default = "default_mfi_period")]
    pub mfi_period: usize,

    /// Wilder period for +DI / -DI.
    #[serde(default = "default_dmi_period")]
    pub dmi_period: usize,

    /// Averaging period applied to DX to obtain ADX.
    #[serde(default = "default_dmi_smoothing")]
    pub dmi_smoothing: usize,

    #[serde(default = "default_atr_period")]
    pub atr_period: usize,

    #[serde(default = "default_vidya_length")]
    pub vidya_length: usize,

    /// CMO window driving the VIDYA smoothing constant.
    #[serde(default = "default_vidya_momentum")]
    pub vidya_momentum: usize,

    /// SMA applied to the raw VIDYA line.
    #[serde(default = "default_vidya_smoothing")]
    pub vidya_smoothing: usize,

    /// Band half-width in ATR units.
    #[serde(default = "default_vidya_band_distance")]
    pub vidya_band_distance: f64,

    #[serde(default = "default_ema_fast")]
    pub ema_fast: usize,

    #[serde(default = "default_ema_slow")]
    pub ema_slow: usize,

    #[serde(default = "default_volume_sma_period")]
    pub volume_sma_period: usize,

    /// Latest volume must reach this multiple of its SMA to count as a surge.
    #[serde(default = "default_volume_surge_multiplier")]
    pub volume_surge_multiplier: f64,

    #[serde(default = "default_obv_lookback")]
    pub obv_lookback: usize,

    #[serde(default = "default_force_period")]
    pub force_period: usize,

    #[serde(default = "default_choppiness_period")]
    pub choppiness_period: usize,

    #[serde(default)]
    pub vwap_anchor: VwapAnchor,
}

impl Default for IndicatorParams {
    fn default() -> Self {
        Self {
            rsi_period: default_rsi_period(),
            mfi_period: default_mfi_period(),
            dmi_period: default_dmi_period(),
            dmi_smoothing: default_dmi_smoothing(),
            atr_period: default_atr_period(),
            vidya_length: default_vidya_length(),
            vidya_momentum: default_vidya_momentum(),
            vidya_smoothing: default_vidya_smoothing(),
            vidya_band_distance: default_vidya_band_distance(),
            ema_fast: default_ema_fast(),
            ema_slow: default_ema_slow(),
            volume_sma_period: default_volume_sma_period(),
            volume_surge_multiplier: default_volume_surge_multiplier(),
            obv_lookback: default_obv_lookback(),
            force_period: default_force_period(),
            choppiness_period: default_choppiness_period(),
            vwap_anchor: VwapAnchor::default(),
        }
    }
}

impl IndicatorParams {
    /// Bars needed before every indicator produces a value.
    pub fn required_history(&self) -> usize {
        [
            self.rsi_period + 1,
            self.mfi_period + 1,
            self.dmi_period + self.dmi_smoothing,
            self.atr_period + 1,
            self.vidya_momentum + self.vidya_smoothing,
            self.ema_slow + 1,
            self.volume_sma_period,
            self.obv_lookback + 1,
            self.force_period + 1,
            self.choppiness_period + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }

    fn validate(&self) -> Result<(), BiasError> {
        let periods = [
            ("indicators.rsi_period", self.rsi_period),
            ("indicators.mfi_period", self.mfi_period),
            ("indicators.dmi_period", self.dmi_period),
            ("indicators.dmi_smoothing", self.dmi_smoothing),
            ("indicators.atr_period", self.atr_period),
            ("indicators.vidya_length", self.vidya_length),
            ("indicators.vidya_momentum", self.vidya_momentum),
            ("indicators.vidya_smoothing", self.vidya_smoothing),
            ("indicators.ema_fast", self.ema_fast),
            ("indicators.volume_sma_period", self.volume_sma_period),
            ("indicators.obv_lookback", self.obv_lookback),
            ("indicators.force_period", self.force_period),
        ];
        for (field, value) in periods {
            if value == 0 {
                return Err(BiasError::config(field, "period must be >= 1"));
            }
        }
        if self.choppiness_period < 2 {
            return Err(BiasError::config("indicators.choppiness_period", "must be >= 2"));
        }
        if self.ema_slow <= self.ema_fast {
            return Err(BiasError::config(
                "indicators.ema_slow",
                format!("must exceed ema_fast ({})", self.ema_fast),
            ));
        }
        positive("indicators.vidya_band_distance", self.vidya_band_distance)?;
        if !(self.volume_surge_multiplier.is_finite() && self.volume_surge_multiplier >= 1.0) {
            return Err(BiasError::config(
                "indicators.volume_surge_multiplier",
                format!("must be finite and >= 1, got {}", self.volume_surge_multiplier),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// ClassifierParams
// =============================================================================

/// Score scaling for the three classifier rule shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierParams {
    /// RSI / MFI: score = (value - 50) * scale.
    #[serde(default = "default_oscillator_scale")]
    pub oscillator_scale: f64,

    /// Force oscillator (already in [-100, 100]).
    #[serde(default = "default_unit_scale")]
    pub force_scale: f64,

    /// Volume pressure (percent surge above average).
    #[serde(default = "default_unit_scale")]
    pub volume_pressure_scale: f64,

    /// Crossovers: percent distance from the reference times this scale.
    #[serde(default = "default_crossover_scale")]
    pub crossover_scale: f64,

    /// DMI: ADX times this scale.
    #[serde(default = "default_oscillator_scale")]
    pub dmi_strength_scale: f64,

    /// Basket horizons: percent change times this scale.
    #[serde(default = "default_crossover_scale")]
    pub basket_scale: f64,
}

impl Default for ClassifierParams {
    fn default() -> Self {
        Self {
            oscillator_scale: default_oscillator_scale(),
            force_scale: default_unit_scale(),
            volume_pressure_scale: default_unit_scale(),
            crossover_scale: default_crossover_scale(),
            dmi_strength_scale: default_oscillator_scale(),
            basket_scale: default_crossover_scale(),
        }
    }
}

impl ClassifierParams {
    fn validate(&self) -> Result<(), BiasError> {
        positive("classifier.oscillator_scale", self.oscillator_scale)?;
        positive("classifier.force_scale", self.force_scale)?;
        positive("classifier.volume_pressure_scale", self.volume_pressure_scale)?;
        positive("classifier.crossover_scale", self.crossover_scale)?;
        positive("classifier.dmi_strength_scale", self.dmi_strength_scale)?;
        positive("classifier.basket_scale", self.basket_scale)
    }
}

// =============================================================================
// RegimeParams
// =============================================================================

/// Thresholds for the trending / range-bound / transition classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegimeParams {
    /// Bars in the high-low range window.
    #[serde(default = "default_range_lookback")]
    pub range_lookback: usize,

    /// Maximum range width, percent of the range midpoint (inclusive).
    #[serde(default = "default_range_pct_threshold")]
    pub range_pct_threshold: f64,

    /// Consecutive trailing bars whose own range window must stay tight.
    #[serde(default = "default_range_min_bars")]
    pub range_min_bars: usize,

    /// Maximum fast/slow EMA spread (percent of close) for a range.
    #[serde(default = "default_ema_spread_threshold")]
    pub ema_spread_threshold: f64,

    /// Minimum fast/slow EMA spread (percent of close) for a trend.
    #[serde(default = "default_trend_spread_threshold")]
    pub trend_spread_threshold: f64,

    /// ATR values averaged for the volatility baseline.
    #[serde(default = "default_volatility_lookback")]
    pub volatility_lookback: usize,

    /// Volatility is elevated when ATR exceeds baseline * ratio.
    #[serde(default = "default_volatility_ratio")]
    pub volatility_ratio: f64,
}

impl Default for RegimeParams {
    fn default() -> Self {
        Self {
            range_lookback: default_range_lookback(),
            range_pct_threshold: default_range_pct_threshold(),
            range_min_bars: default_range_min_bars(),
            ema_spread_threshold: default_ema_spread_threshold(),
            trend_spread_threshold: default_trend_spread_threshold(),
            volatility_lookback: default_volatility_lookback(),
            volatility_ratio: default_volatility_ratio(),
        }
    }
}

impl RegimeParams {
    /// Bars needed for a regime classification (given the shared ATR / EMA
    /// look-backs).
    pub fn required_history(&self, indicators: &IndicatorParams) -> usize {
        [
            self.range_lookback + self.range_min_bars - 1,
            self.volatility_lookback,
            indicators.atr_period + 1,
            indicators.ema_slow + 1,
        ]
        .into_iter()
        .max()
        .unwrap_or(1)
    }

    fn validate(&self) -> Result<(), BiasError> {
        if self.range_lookback < 2 {
            return Err(BiasError::config("regime.range_lookback", "must be >= 2"));
        }
        if self.range_min_bars == 0 {
            return Err(BiasError::config("regime.range_min_bars", "must be >= 1"));
        }
        if self.volatility_lookback == 0 {
            return Err(BiasError::config("regime.volatility_lookback", "must be >= 1"));
        }
        positive("regime.range_pct_threshold", self.range_pct_threshold)?;
        non_negative("regime.ema_spread_threshold", self.ema_spread_threshold)?;
        non_negative("regime.trend_spread_threshold", self.trend_spread_threshold)?;
        positive("regime.volatility_ratio", self.volatility_ratio)
    }
}

// =============================================================================
// Tier weights
// =============================================================================

/// Relative weight of each tier in the overall percentage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierWeights {
    pub fast: f64,
    pub medium: f64,
    pub slow: f64,
}

/// Weights keyed by aggregator mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierWeightTable {
    #[serde(default = "TierWeightTable::default_normal")]
    pub normal: TierWeights,
    #[serde(default = "TierWeightTable::default_reversal")]
    pub reversal: TierWeights,
}

impl TierWeightTable {
    fn default_normal() -> TierWeights {
        TierWeights {
            fast: 2.0,
            medium: 3.0,
            slow: 5.0,
        }
    }

    fn default_reversal() -> TierWeights {
        TierWeights {
            fast: 5.0,
            medium: 3.0,
            slow: 2.0,
        }
    }

    pub fn for_mode(&self, mode: Mode) -> TierWeights {
        match mode {
            Mode::Normal => self.normal,
            Mode::Reversal => self.reversal,
        }
    }

    fn validate(&self) -> Result<(), BiasError> {
        for (mode, w) in [("normal", self.normal), ("reversal", self.reversal)] {
            positive(&format!("weights.{mode}.fast"), w.fast)?;
            positive(&format!("weights.{mode}.medium"), w.medium)?;
            positive(&format!("weights.{mode}.slow"), w.slow)?;
        }
        Ok(())
    }
}

impl Default for TierWeightTable {
    fn default() -> Self {
        Self {
            normal: Self::default_normal(),
            reversal: Self::default_reversal(),
        }
    }
}

// =============================================================================
// SentimentParams
// =============================================================================

/// Settings for fusing the technical panel with other sub-system scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentParams {
    /// Band applied to the combined indicator panel.
    #[serde(default = "default_technical_band")]
    pub technical_band: ThresholdBand,

    /// Band applied to the top-level fusion.
    #[serde(default = "default_overall_band")]
    pub overall_band: ThresholdBand,

    /// Per-source weights, keyed by source name.
    #[serde(default = "default_source_weights")]
    pub source_weights: BTreeMap<String, f64>,

    /// Weight for sources absent from `source_weights`.
    #[serde(default = "default_source_weight")]
    pub default_source_weight: f64,

    /// A constituent counts as advancing above this daily change (percent).
    #[serde(default = "default_breadth_advance_pct")]
    pub breadth_advance_pct: f64,

    /// Average basket change (percent) beyond which breadth is directional.
    #[serde(default = "default_breadth_bias_pct")]
    pub breadth_bias_pct: f64,
}

impl Default for SentimentParams {
    fn default() -> Self {
        Self {
            technical_band: default_technical_band(),
            overall_band: default_overall_band(),
            source_weights: default_source_weights(),
            default_source_weight: default_source_weight(),
            breadth_advance_pct: default_breadth_advance_pct(),
            breadth_bias_pct: default_breadth_bias_pct(),
        }
    }
}

impl SentimentParams {
    pub fn weight_for(&self, source: &str) -> f64 {
        self.source_weights
            .get(source)
            .copied()
            .unwrap_or(self.default_source_weight)
    }

    fn validate(&self) -> Result<(), BiasError> {
        self.technical_band.validate("sentiment.technical_band")?;
        self.overall_band.validate("sentiment.overall_band")?;
        for (name, &w) in &self.source_weights {
            positive(&format!("sentiment.source_weights.{name}"), w)?;
        }
        positive("sentiment.default_source_weight", self.default_source_weight)?;
        non_negative("sentiment.breadth_bias_pct", self.breadth_bias_pct)
    }
}

// =============================================================================
// BiasConfig
// =============================================================================

/// Top-level configuration for the bias engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasConfig {
    #[serde(default)]
    pub indicators: IndicatorParams,

    #[serde(default)]
    pub classifier: ClassifierParams,

    #[serde(default)]
    pub regime: RegimeParams,

    #[serde(default)]
    pub weights: TierWeightTable,

    /// Percentage a side must reach for a directional verdict.
    #[serde(default = "default_bias_strength")]
    pub bias_strength: f64,

    /// Percentage both the slow and the fast tier must reach (on opposite
    /// sides) to enter reversal mode.
    #[serde(default = "default_divergence_threshold")]
    pub divergence_threshold: f64,

    /// Added to `bias_strength` while the market is range-bound.
    #[serde(default = "default_range_bias_bump")]
    pub range_bias_bump: f64,

    /// Relaxation of the divergence threshold while a carried-forward mode is
    /// `Reversal`. Zero disables hysteresis.
    #[serde(default)]
    pub mode_hysteresis_pct: f64,

    #[serde(default)]
    pub sentiment: SentimentParams,
}

impl Default for BiasConfig {
    fn default() -> Self {
        Self {
            indicators: IndicatorParams::default(),
            classifier: ClassifierParams::default(),
            regime: RegimeParams::default(),
            weights: TierWeightTable::default(),
            bias_strength: default_bias_strength(),
            divergence_threshold: default_divergence_threshold(),
            range_bias_bump: default_range_bias_bump(),
            mode_hysteresis_pct: 0.0,
            sentiment: SentimentParams::default(),
        }
    }
}

impl BiasConfig {
    /// Minimum series length for a conclusive cycle.
    pub fn required_history(&self) -> usize {
        self.indicators
            .required_history()
            .max(self.regime.required_history(&self.indicators))
    }

    /// Reject out-of-range values.
    pub fn validate(&self) -> Result<(), BiasError> {
        self.indicators.validate()?;
        self.classifier.validate()?;
        self.regime.validate()?;
        self.weights.validate()?;
        self.sentiment.validate()?;
        percentage("bias_strength", self.bias_strength)?;
        percentage("divergence_threshold", self.divergence_threshold)?;
        non_negative("range_bias_bump", self.range_bias_bump)?;
        if !(0.0..self.divergence_threshold).contains(&self.mode_hysteresis_pct) {
            return Err(BiasError::config(
                "mode_hysteresis_pct",
                format!(
                    "must be in [0, divergence_threshold), got {}",
                    self.mode_hysteresis_pct
                ),
            ));
        }
        Ok(())
    }

    /// Load configuration from a JSON file at `path`.
    ///
    /// Returns an error when the file is missing or malformed so the caller
    /// can fall back to defaults with a warning.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read bias config from {}", path.display()))?;

        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse bias config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("invalid bias config in {}", path.display()))?;

        info!(
            path = %path.display(),
            bias_strength = config.bias_strength,
            divergence_threshold = config.divergence_threshold,
            required_history = config.required_history(),
            "bias config loaded"
        );

        Ok(config)
    }

    /// Persist to `path` atomically (write `.tmp`, then rename).
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        let content =
            serde_json::to_string_pretty(self).context("failed to serialise bias config to JSON")?;

        let tmp_path = path.with_extension("json.tmp");

        std::fs::write(&tmp_path, &content)
            .with_context(|| format!("failed to write tmp config to {}", tmp_path.display()))?;

        std::fs::rename(&tmp_path, path)
            .with_context(|| format!("failed to rename tmp config to {}", path.display()))?;

        info!(path = %path.display(), "bias config saved (atomic)");
        Ok(())
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn positive(field: &str, value: f64) -> Result<(), BiasError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(BiasError::config(field, format!("must be finite and > 0, got {value}")))
    }
}

fn non_negative(field: &str, value: f64) -> Result<(), BiasError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(BiasError::config(field, format!("must be finite and >= 0, got {value}")))
    }
}

fn percentage(field: &str, value: f64) -> Result<(), BiasError> {
    if value.is_finite() && value > 0.0 && value <= 100.0 {
        Ok(())
    } else {
        Err(BiasError::config(field, format!("must be in (0, 100], got {value}")))
    }
}
