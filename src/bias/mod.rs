pub mod aggregator;
pub mod panel;
pub mod tiers;

pub use aggregator::{BiasResult, Divergence, Inconclusive, TieredBiasAggregator};
pub use panel::{IndicatorPanel, IndicatorSnapshot};
pub use tiers::{TierBreakdown, TierVotes};
