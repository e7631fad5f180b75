// =============================================================================
// Technical Indicators Module
// =============================================================================
//
// Pure, side-effect-free indicator functions over a borrowed candle or close
// slice. Insufficient data is reported as `None` or an empty series, never as
// a panic; vanishing denominators substitute a documented neutral value.

pub mod atr;
pub mod choppiness;
pub mod dmi;
pub mod ema;
pub mod force;
pub mod mfi;
pub mod rsi;
pub mod vidya;
pub mod volume;
pub mod vwap;

pub use dmi::DmiReading;
pub use ema::EmaCrossover;
pub use vidya::VidyaBands;
pub use vwap::VwapAnchor;
