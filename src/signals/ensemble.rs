// =============================================================================
// Consensus Ensemble Combiner — weighted score + agreement-scaled confidence
// =============================================================================
//
//   overall_score = sum(score_i * weight_i) / sum(weight_i)
//   direction     = BULLISH if score >  band.bullish_above
//                   BEARISH if score <  band.bearish_below
//                   NEUTRAL otherwise
//   agreement     = sources whose own direction equals the overall direction
//   confidence    = min(100, |overall_score|) * agreement / total
//
// The same combiner collapses a panel of indicator votes into one technical
// score (band +/-20) and fuses heterogeneous sub-system scores into the
// top-level market sentiment (band +/-25).
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::BiasError;
use crate::signals::vote::SignalVote;
use crate::types::Direction;

// =============================================================================
// Types
// =============================================================================

/// Strict score thresholds separating bullish / neutral / bearish verdicts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub bullish_above: f64,
    pub bearish_below: f64,
}

impl ThresholdBand {
    /// `+width` / `-width`.
    pub fn symmetric(width: f64) -> Self {
        Self {
            bullish_above: width,
            bearish_below: -width,
        }
    }

    pub fn classify(&self, score: f64) -> Direction {
        if score > self.bullish_above {
            Direction::Bullish
        } else if score < self.bearish_below {
            Direction::Bearish
        } else {
            Direction::Neutral
        }
    }

    /// Both edges finite, inside [-100, 100], and ordered.
    pub fn validate(&self, field: &str) -> Result<(), BiasError> {
        let in_range = |v: f64| v.is_finite() && (-100.0..=100.0).contains(&v);
        if !in_range(self.bullish_above) || !in_range(self.bearish_below) {
            return Err(BiasError::config(field, "band edges must lie in [-100, 100]"));
        }
        if self.bearish_below > self.bullish_above {
            return Err(BiasError::config(
                field,
                format!(
                    "bearish_below {} exceeds bullish_above {}",
                    self.bearish_below, self.bullish_above
                ),
            ));
        }
        Ok(())
    }
}

/// Free-text bias verdict produced by an upstream sub-system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BiasLabel {
    StrongBullish,
    Bullish,
    Neutral,
    Bearish,
    StrongBearish,
}

impl BiasLabel {
    /// Case-insensitive parse; anything unrecognised is `Neutral`.
    pub fn parse(text: &str) -> Self {
        let upper = text.trim().to_uppercase();
        let strong = upper.contains("STRONG");
        if upper.contains("BULL") {
            if strong {
                Self::StrongBullish
            } else {
                Self::Bullish
            }
        } else if upper.contains("BEAR") {
            if strong {
                Self::StrongBearish
            } else {
                Self::Bearish
            }
        } else {
            Self::Neutral
        }
    }

    pub fn score(self) -> f64 {
        match self {
            Self::StrongBullish => 75.0,
            Self::Bullish => 40.0,
            Self::Neutral => 0.0,
            Self::Bearish => -40.0,
            Self::StrongBearish => -75.0,
        }
    }

    pub fn direction(self) -> Direction {
        Direction::from_sign(self.score())
    }
}

/// One source feeding the combiner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleInput {
    pub name: String,
    /// Signed strength in [-100, 100].
    pub score: f64,
    pub weight: f64,
    /// The source's own verdict. Usually the sign of `score`, but an upstream
    /// system may report a direction that its score alone would not imply.
    pub direction: Direction,
}

impl EnsembleInput {
    /// Direction taken from the sign of `score`; score clamped to [-100, 100].
    pub fn new(name: impl Into<String>, score: f64, weight: f64) -> Self {
        let score = clamp_score(score);
        Self {
            name: name.into(),
            score,
            weight,
            direction: Direction::from_sign(score),
        }
    }

    /// Score with an explicitly reported direction.
    pub fn with_direction(
        name: impl Into<String>,
        score: f64,
        weight: f64,
        direction: Direction,
    ) -> Self {
        Self {
            name: name.into(),
            score: clamp_score(score),
            weight,
            direction,
        }
    }

    /// Convert a verdict label ("Strong Bullish", "Bearish", ...) to a score.
    pub fn from_label(name: impl Into<String>, label: &str, weight: f64) -> Self {
        let label = BiasLabel::parse(label);
        Self::with_direction(name, label.score(), weight, label.direction())
    }
}

impl From<&SignalVote> for EnsembleInput {
    fn from(vote: &SignalVote) -> Self {
        Self {
            name: vote.source_name().to_string(),
            score: vote.score(),
            weight: vote.weight(),
            direction: vote.direction(),
        }
    }
}

/// Output of a combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub overall_score: f64,
    pub overall_direction: Direction,
    pub confidence_pct: f64,
    pub agreement_pct: f64,
    pub bullish_sources: usize,
    pub bearish_sources: usize,
    pub neutral_sources: usize,
    pub source_count: usize,
}

/// Result of the all-sources-agree check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alignment {
    pub aligned: bool,
    /// The shared direction when aligned, otherwise `Neutral`.
    pub direction: Direction,
    /// min(100, mean |score|) when aligned, otherwise 0.
    pub confidence_pct: f64,
    pub sources: Vec<(String, Direction)>,
}

// =============================================================================
// Combiner
// =============================================================================

/// Anything that folds a list of scored sources into one verdict.
pub trait Combine {
    fn combine(&self, inputs: &[EnsembleInput]) -> Result<EnsembleResult, BiasError>;
}

/// Weighted-average combiner with a caller-supplied threshold band.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsensusCombiner {
    band: ThresholdBand,
}

impl ConsensusCombiner {
    pub fn new(band: ThresholdBand) -> Result<Self, BiasError> {
        band.validate("band")?;
        Ok(Self { band })
    }
}

impl Combine for ConsensusCombiner {
    fn combine(&self, inputs: &[EnsembleInput]) -> Result<EnsembleResult, BiasError> {
        if inputs.is_empty() {
            return Err(BiasError::config("inputs", "ensemble needs at least one source"));
        }
        for input in inputs {
            if !input.weight.is_finite() || input.weight <= 0.0 {
                return Err(BiasError::config(
                    format!("inputs.{}.weight", input.name),
                    format!("must be finite and > 0, got {}", input.weight),
                ));
            }
            if !input.score.is_finite() {
                return Err(BiasError::config(
                    format!("inputs.{}.score", input.name),
                    "must be finite",
                ));
            }
        }

        let total_weight: f64 = inputs.iter().map(|i| i.weight).sum();
        let weighted: f64 = inputs.iter().map(|i| i.score * i.weight).sum();
        let overall_score = weighted / total_weight;
        let overall_direction = self.band.classify(overall_score);

        let count = |d: Direction| inputs.iter().filter(|i| i.direction == d).count();
        let bullish_sources = count(Direction::Bullish);
        let bearish_sources = count(Direction::Bearish);
        let neutral_sources = count(Direction::Neutral);
        let agreeing = count(overall_direction);

        let total = inputs.len() as f64;
        let agreement = agreeing as f64 / total;

        Ok(EnsembleResult {
            overall_score,
            overall_direction,
            confidence_pct: overall_score.abs().min(100.0) * agreement,
            agreement_pct: agreement * 100.0,
            bullish_sources,
            bearish_sources,
            neutral_sources,
            source_count: inputs.len(),
        })
    }
}

/// Whether every source points the same non-neutral way.
pub fn check_alignment(inputs: &[EnsembleInput]) -> Alignment {
    let sources: Vec<(String, Direction)> =
        inputs.iter().map(|i| (i.name.clone(), i.direction)).collect();

    let first = inputs.first().map(|i| i.direction);
    let shared = match first {
        Some(d) if d != Direction::Neutral && inputs.iter().all(|i| i.direction == d) => Some(d),
        _ => None,
    };

    match shared {
        Some(direction) => {
            let mean_abs = inputs.iter().map(|i| i.score.abs()).sum::<f64>() / inputs.len() as f64;
            Alignment {
                aligned: true,
                direction,
                confidence_pct: mean_abs.min(100.0),
                sources,
            }
        }
        None => Alignment {
            aligned: false,
            direction: Direction::Neutral,
            confidence_pct: 0.0,
            sources,
        },
    }
}

// =============================================================================
// Internal helpers
// =============================================================================

fn clamp_score(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(-100.0, 100.0)
    } else {
        score
    }
}
