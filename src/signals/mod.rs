// =============================================================================
// Signals Module
// =============================================================================
//
// From indicator readings to verdicts:
// - Classifier: one reading -> one directional vote
// - Ensemble: weighted consensus over many scored sources

pub mod classifier;
pub mod ensemble;
pub mod vote;

pub use classifier::{IndicatorKind, IndicatorReading};
pub use ensemble::{
    check_alignment, Alignment, BiasLabel, Combine, ConsensusCombiner, EnsembleInput,
    EnsembleResult, ThresholdBand,
};
pub use vote::SignalVote;
