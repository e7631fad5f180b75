// =============================================================================
// Tiered Bias Aggregator
// =============================================================================
//
// Pipeline for one instrument and one cycle:
//
//   1. Length gate: shorter than the required history => inconclusive result.
//   2. Readings -> votes:  FAST (8 technical), MEDIUM (VWAP), SLOW (basket).
//   3. Tier tallies:       bullish% / bearish% per tier.
//   4. Divergence:         slow bull% >= D and fast bear% >= D  => bullish div.
//                          slow bear% >= D and fast bull% >= D  => bearish div.
//                          either => REVERSAL mode, else NORMAL.
//   5. Weights:            mode-keyed table (NORMAL 2:3:5, REVERSAL 5:3:2).
//   6. Overall:            bull% = sum(tier bull% * w) / sum(w), non-empty tiers.
//   7. Threshold:          bias_strength (+ bump when RANGE-BOUND).
//   8. Verdict:            BULLISH if bull% >= T, else BEARISH if bear% >= T,
//                          else NEUTRAL.
//
// The mode is recomputed every cycle. A caller may pass the previous cycle's
// mode back in; with a non-zero hysteresis a carried REVERSAL survives while
// the divergence holds at the relaxed threshold D - hysteresis.
// =============================================================================

use serde::Serialize;
use tracing::{debug, info};

use crate::basket::BasketPerformance;
use crate::bias::panel::{IndicatorPanel, IndicatorSnapshot};
use crate::bias::tiers::{TierBreakdown, TierVotes};
use crate::config::BiasConfig;
use crate::error::BiasError;
use crate::market_data::PriceSeries;
use crate::regime::{MarketRegime, RegimeDetector, RegimeState};
use crate::signals::{Combine, ConsensusCombiner, EnsembleInput, EnsembleResult};
use crate::types::{Direction, Mode, TierName};

// =============================================================================
// Types
// =============================================================================

/// Which side, if any, the fast tier is diverging toward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Divergence {
    /// Slow tier bullish while the fast tier turns bearish.
    pub bullish: bool,
    /// Slow tier bearish while the fast tier turns bullish.
    pub bearish: bool,
}

impl Divergence {
    pub fn any(&self) -> bool {
        self.bullish || self.bearish
    }
}

/// Why a cycle produced no verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Inconclusive {
    pub required: usize,
    pub actual: usize,
}

impl From<Inconclusive> for BiasError {
    fn from(i: Inconclusive) -> Self {
        BiasError::InsufficientData {
            required: i.required,
            actual: i.actual,
        }
    }
}

/// Verdict of one aggregation cycle. Contains no clocks or ids, so identical
/// inputs serialise to identical bytes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BiasResult {
    pub overall_direction: Direction,
    pub bullish_pct: f64,
    pub bearish_pct: f64,
    pub mode: Mode,
    pub divergence: Divergence,
    /// Threshold actually applied (includes the range-bound bump).
    pub bias_threshold: f64,
    pub tiers: Vec<TierBreakdown>,
    pub regime: Option<RegimeState>,
    /// Fast and medium votes collapsed by the consensus combiner.
    pub technical_consensus: Option<EnsembleResult>,
    pub indicators: Option<IndicatorSnapshot>,
    pub inconclusive: Option<Inconclusive>,
}

impl BiasResult {
    pub fn is_conclusive(&self) -> bool {
        self.inconclusive.is_none()
    }

    pub fn tier(&self, name: TierName) -> Option<&TierBreakdown> {
        self.tiers.iter().find(|t| t.name == name)
    }

    /// The result as an error when the cycle was inconclusive.
    pub fn require_conclusive(&self) -> Result<&Self, BiasError> {
        match self.inconclusive {
            Some(i) => Err(i.into()),
            None => Ok(self),
        }
    }
}

// =============================================================================
// TieredBiasAggregator
// =============================================================================

/// Immutable after construction; safe to share across tasks.
#[derive(Debug, Clone)]
pub struct TieredBiasAggregator {
    config: BiasConfig,
    regime: RegimeDetector,
    technical: ConsensusCombiner,
    required: usize,
}

impl TieredBiasAggregator {
    pub fn new(config: BiasConfig) -> Result<Self, BiasError> {
        config.validate()?;
        let regime = RegimeDetector::new(config.regime.clone(), &config.indicators);
        let technical = ConsensusCombiner::new(config.sentiment.technical_band)?;
        let required = config.required_history();
        Ok(Self {
            config,
            regime,
            technical,
            required,
        })
    }

    pub fn config(&self) -> &BiasConfig {
        &self.config
    }

    pub fn required_history(&self) -> usize {
        self.required
    }

    /// Run one full cycle over `series` and the basket inputs.
    pub fn evaluate(
        &self,
        series: &PriceSeries,
        basket: &BasketPerformance,
        carried_mode: Option<Mode>,
    ) -> BiasResult {
        if series.len() < self.required {
            debug!(
                bars = series.len(),
                required = self.required,
                "Bias cycle inconclusive: insufficient history"
            );
            return self.inconclusive(series.len());
        }

        let candles = series.candles();
        let panel = IndicatorPanel::compute(candles, &self.config.indicators, &self.config.classifier);
        let regime = self.regime.detect(candles);

        let votes = TierVotes {
            fast: panel.fast.iter().map(|r| r.classify()).collect(),
            medium: panel.medium.iter().map(|r| r.classify()).collect(),
            slow: basket
                .readings(&self.config.classifier)
                .iter()
                .map(|r| r.classify())
                .collect(),
        };

        let mut result = self.aggregate(votes, regime, carried_mode);
        result.indicators = Some(panel.snapshot);
        result
    }

    /// Aggregate pre-classified votes. `regime` only affects the threshold.
    pub fn aggregate(
        &self,
        votes: TierVotes,
        regime: Option<RegimeState>,
        carried_mode: Option<Mode>,
    ) -> BiasResult {
        let cfg = &self.config;

        let technical_consensus = self.technical_consensus(&votes);

        // Weights are assigned after the mode is known.
        let fast = TierBreakdown::tally(TierName::Fast, votes.fast, 0.0);
        let medium = TierBreakdown::tally(TierName::Medium, votes.medium, 0.0);
        let slow = TierBreakdown::tally(TierName::Slow, votes.slow, 0.0);

        let divergence = detect_divergence(&fast, &slow, cfg.divergence_threshold);
        let mode = if divergence.any() {
            Mode::Reversal
        } else if carried_mode == Some(Mode::Reversal)
            && cfg.mode_hysteresis_pct > 0.0
            && detect_divergence(
                &fast,
                &slow,
                cfg.divergence_threshold - cfg.mode_hysteresis_pct,
            )
            .any()
        {
            debug!(
                hysteresis = cfg.mode_hysteresis_pct,
                "Reversal mode held by hysteresis"
            );
            Mode::Reversal
        } else {
            Mode::Normal
        };

        let weights = cfg.weights.for_mode(mode);
        let mut tiers = vec![fast, medium, slow];
        for tier in &mut tiers {
            tier.weight = match tier.name {
                TierName::Fast => weights.fast,
                TierName::Medium => weights.medium,
                TierName::Slow => weights.slow,
            };
        }

        let (mut bull_sum, mut bear_sum, mut weight_sum) = (0.0, 0.0, 0.0);
        for tier in tiers.iter().filter(|t| !t.is_empty()) {
            bull_sum += tier.bullish_pct * tier.weight;
            bear_sum += tier.bearish_pct * tier.weight;
            weight_sum += tier.weight;
        }
        let (bullish_pct, bearish_pct) = if weight_sum > 0.0 {
            (bull_sum / weight_sum, bear_sum / weight_sum)
        } else {
            (0.0, 0.0)
        };

        let range_bound = regime
            .as_ref()
            .is_some_and(|r| r.regime == MarketRegime::RangeBound);
        let bias_threshold = if range_bound {
            cfg.bias_strength + cfg.range_bias_bump
        } else {
            cfg.bias_strength
        };

        let overall_direction = if bullish_pct >= bias_threshold {
            Direction::Bullish
        } else if bearish_pct >= bias_threshold {
            Direction::Bearish
        } else {
            Direction::Neutral
        };

        if let Some(previous) = carried_mode {
            if previous != mode {
                info!(from = %previous, to = %mode, "Aggregator mode changed");
            }
        }

        debug!(
            direction = %overall_direction,
            mode = %mode,
            bullish_pct = format!("{:.2}", bullish_pct),
            bearish_pct = format!("{:.2}", bearish_pct),
            threshold = format!("{:.1}", bias_threshold),
            regime = regime.as_ref().map(|r| r.regime.to_string()).unwrap_or_default(),
            bullish_divergence = divergence.bullish,
            bearish_divergence = divergence.bearish,
            "Bias aggregated"
        );

        BiasResult {
            overall_direction,
            bullish_pct,
            bearish_pct,
            mode,
            divergence,
            bias_threshold,
            tiers,
            regime,
            technical_consensus,
            indicators: None,
            inconclusive: None,
        }
    }

    fn technical_consensus(&self, votes: &TierVotes) -> Option<EnsembleResult> {
        let inputs: Vec<EnsembleInput> = votes
            .fast
            .iter()
            .chain(votes.medium.iter())
            .map(EnsembleInput::from)
            .collect();
        if inputs.is_empty() {
            return None;
        }
        self.technical.combine(&inputs).ok()
    }

    fn inconclusive(&self, actual: usize) -> BiasResult {
        BiasResult {
            overall_direction: Direction::Neutral,
            bullish_pct: 0.0,
            bearish_pct: 0.0,
            mode: Mode::Normal,
            divergence: Divergence::default(),
            bias_threshold: self.config.bias_strength,
            tiers: Vec::new(),
            regime: None,
            technical_consensus: None,
            indicators: None,
            inconclusive: Some(Inconclusive {
                required: self.required,
                actual,
            }),
        }
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn detect_divergence(fast: &TierBreakdown, slow: &TierBreakdown, threshold: f64) -> Divergence {
    Divergence {
        bullish: slow.bullish_pct >= threshold && fast.bearish_pct >= threshold,
        bearish: slow.bearish_pct >= threshold && fast.bullish_pct >= threshold,
    }
}
