// =============================================================================
// Market Bias Engine
// =============================================================================
//
// Multi-tier directional bias for one instrument per cycle:
//
//   candles ──► indicators ──► classifier ──► FAST / MEDIUM tiers ─┐
//   basket  ──────────────────► classifier ──► SLOW tier ──────────┼─► aggregator ─► BiasResult
//   candles ──► regime detector ──────────────────────────────────┘
//
// The core is synchronous and free of I/O. `ResultCache` and the binary are
// the only host-side pieces.
// =============================================================================

pub mod basket;
pub mod bias;
pub mod cache;
pub mod config;
pub mod error;
pub mod indicators;
pub mod market_data;
pub mod regime;
pub mod sentiment;
pub mod signals;
pub mod types;

pub use basket::{BasketPerformance, Constituent};
pub use bias::{BiasResult, TierVotes, TieredBiasAggregator};
pub use cache::ResultCache;
pub use config::BiasConfig;
pub use error::BiasError;
pub use market_data::{Candle, PriceSeries};
pub use regime::{MarketRegime, RegimeState};
pub use sentiment::{ExternalSource, SentimentFuser, SentimentReport};
pub use signals::{ConsensusCombiner, EnsembleInput, EnsembleResult};
pub use types::{Direction, Mode, TierName};
