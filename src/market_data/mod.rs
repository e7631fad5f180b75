pub mod series;

// Re-export for convenient access (e.g. `use crate::market_data::Candle`).
pub use series::{Candle, PriceSeries};
