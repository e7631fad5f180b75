// =============================================================================
// Regime Detection Module
// =============================================================================
//
// Market regime classification from price structure:
// - trailing high-low range width and its persistence
// - fast/slow EMA spread and slope
// - ATR against its rolling baseline

pub mod detector;

pub use detector::{
    classify, MarketRegime, MovementQuality, PriceRange, RegimeDetector, RegimeMetrics,
    RegimeState,
};
