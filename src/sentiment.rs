// =============================================================================
// Sentiment Fusion — technical panel + basket breadth + external sub-systems
// =============================================================================
//
//   sources  = [technical?, basket?, external...]
//   weight   = explicit source weight, else configured per-name weight,
//              else the default source weight
//   overall  = ConsensusCombiner(overall_band).combine(sources)
//
// With no usable source the report carries `data_available = false` and a
// NEUTRAL direction instead of an error.
// =============================================================================

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::basket::{breadth, Constituent, BASKET_SOURCE};
use crate::bias::BiasResult;
use crate::config::SentimentParams;
use crate::error::BiasError;
use crate::signals::{check_alignment, Alignment, Combine, ConsensusCombiner, EnsembleInput, EnsembleResult};
use crate::types::Direction;

pub const TECHNICAL_SOURCE: &str = "technical";

/// Score or verdict reported by a sub-system outside the engine (option
/// chain, put/call ratio, ...). A label wins over a score when both are set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExternalSource {
    pub name: String,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub weight: Option<f64>,
}

impl ExternalSource {
    fn to_input(&self, params: &SentimentParams) -> Option<EnsembleInput> {
        let weight = self.weight.unwrap_or_else(|| params.weight_for(&self.name));
        match (&self.label, self.score) {
            (Some(label), _) => Some(EnsembleInput::from_label(&self.name, label, weight)),
            (None, Some(score)) => Some(EnsembleInput::new(&self.name, score, weight)),
            (None, None) => None,
        }
    }
}

/// Fused verdict across every available source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SentimentReport {
    pub data_available: bool,
    pub overall_direction: Direction,
    pub ensemble: Option<EnsembleResult>,
    pub alignment: Alignment,
    pub sources: Vec<EnsembleInput>,
}

#[derive(Debug, Clone)]
pub struct SentimentFuser {
    params: SentimentParams,
    combiner: ConsensusCombiner,
}

impl SentimentFuser {
    pub fn new(params: SentimentParams) -> Result<Self, BiasError> {
        let combiner = ConsensusCombiner::new(params.overall_band)?;
        Ok(Self { params, combiner })
    }

    /// Collect the sources available this cycle, in a fixed order.
    pub fn sources(
        &self,
        bias: Option<&BiasResult>,
        constituents: &[Constituent],
        external: &[ExternalSource],
    ) -> Vec<EnsembleInput> {
        let mut sources = Vec::with_capacity(2 + external.len());

        if let Some(tech) = bias.and_then(|b| b.technical_consensus.as_ref()) {
            sources.push(EnsembleInput::with_direction(
                TECHNICAL_SOURCE,
                tech.overall_score,
                self.params.weight_for(TECHNICAL_SOURCE),
                tech.overall_direction,
            ));
        }

        if let Some(report) = breadth(constituents, &self.params) {
            sources.push(report.to_input(BASKET_SOURCE, &self.params));
        }

        sources.extend(external.iter().filter_map(|s| s.to_input(&self.params)));
        sources
    }

    pub fn fuse(
        &self,
        bias: Option<&BiasResult>,
        constituents: &[Constituent],
        external: &[ExternalSource],
    ) -> Result<SentimentReport, BiasError> {
        let sources = self.sources(bias, constituents, external);
        let alignment = check_alignment(&sources);

        if sources.is_empty() {
            return Ok(SentimentReport {
                data_available: false,
                overall_direction: Direction::Neutral,
                ensemble: None,
                alignment,
                sources,
            });
        }

        let ensemble = self.combiner.combine(&sources)?;

        debug!(
            direction = %ensemble.overall_direction,
            score = format!("{:.2}", ensemble.overall_score),
            confidence = format!("{:.1}", ensemble.confidence_pct),
            sources = sources.len(),
            aligned = alignment.aligned,
            "Sentiment fused"
        );

        Ok(SentimentReport {
            data_available: true,
            overall_direction: ensemble.overall_direction,
            ensemble: Some(ensemble),
            alignment,
            sources,
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;
    use crate::bias::{TierVotes, TieredBiasAggregator};
    use crate::config::BiasConfig;
    use crate::signals::SignalVote;

    fn fuser() -> SentimentFuser {
        SentimentFuser::new(SentimentParams::default()).unwrap()
    }

    fn member(symbol: &str, day: f64) -> Constituent {
        Constituent {
            symbol: symbol.to_string(),
            weight: 1.0,
            same_day_pct: day,
            short_intraday_pct: 0.0,
            long_intraday_pct: 0.0,
        }
    }

    fn external(name: &str, score: Option<f64>, label: Option<&str>) -> ExternalSource {
        ExternalSource {
            name: name.to_string(),
            score,
            label: label.map(str::to_string),
            weight: None,
        }
    }

    fn bullish_bias() -> BiasResult {
        let votes = |n: usize| -> Vec<SignalVote> {
            (0..n).map(|i| SignalVote::from_score(format!("v{i}"), 60.0)).collect()
        };
        TieredBiasAggregator::new(BiasConfig::default())
            .unwrap()
            .aggregate(
                TierVotes {
                    fast: votes(8),
                    medium: votes(1),
                    slow: votes(3),
                },
                None,
                None,
            )
    }

    #[test]
    fn no_sources_is_neutral_without_data() {
        let report = fuser().fuse(None, &[], &[]).unwrap();
        assert!(!report.data_available);
        assert_eq!(report.overall_direction, Direction::Neutral);
        assert!(report.ensemble.is_none());
        assert!(!report.alignment.aligned);
    }

    #[test]
    fn configured_weights_apply_per_source() {
        let bias = bullish_bias();
        let basket = vec![member("A", 2.0), member("B", 3.0)];
        let ext = vec![external("pcr", Some(-20.0), None)];
        let sources = fuser().sources(Some(&bias), &basket, &ext);

        let names: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["technical", "basket", "pcr"]);
        assert_eq!(sources[0].weight, 3.0);
        assert_eq!(sources[1].weight, 2.0);
        assert_eq!(sources[2].weight, 2.5);
        assert!((sources[0].score - 60.0).abs() < 1e-10);
    }

    #[test]
    fn fused_score_is_weighted_average() {
        let ext = vec![
            external("pcr", Some(50.0), None),
            external("option_chain", None, Some("Strong Bearish")),
        ];
        let report = fuser().fuse(None, &[], &ext).unwrap();
        let ensemble = report.ensemble.unwrap();
        // (50 * 2.5 - 75 * 2) / 4.5
        assert!((ensemble.overall_score - (-25.0 / 4.5)).abs() < 1e-10);
        assert_eq!(report.overall_direction, Direction::Neutral);
        assert!(!report.alignment.aligned);
    }

    #[test]
    fn aligned_bullish_sources() {
        let bias = bullish_bias();
        let basket = vec![member("A", 2.0), member("B", 3.0)];
        let ext = vec![external("advanced", Some(40.0), None)];
        let report = fuser().fuse(Some(&bias), &basket, &ext).unwrap();

        assert!(report.data_available);
        assert_eq!(report.overall_direction, Direction::Bullish);
        assert!(report.alignment.aligned);
        assert_eq!(report.alignment.direction, Direction::Bullish);
        assert_eq!(report.ensemble.unwrap().agreement_pct, 100.0);
    }

    #[test]
    fn label_wins_and_empty_external_is_skipped() {
        let ext = vec![
            external("chain", Some(-90.0), Some("Bullish")),
            external("silent", None, None),
        ];
        let sources = fuser().sources(None, &[], &ext);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].direction, Direction::Bullish);
        assert!((sources[0].score - 40.0).abs() < 1e-10);
        assert_eq!(sources[0].weight, 1.0);
    }

    #[test]
    fn invalid_external_weight_is_rejected() {
        let ext = vec![ExternalSource {
            name: "pcr".into(),
            score: Some(10.0),
            label: None,
            weight: Some(0.0),
        }];
        assert!(matches!(
            fuser().fuse(None, &[], &ext),
            Err(BiasError::InvalidConfiguration { .. })
        ));
    }
}
