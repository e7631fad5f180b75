// =============================================================================
// Price Series — validated, immutable candle history for one instrument
// =============================================================================
//
// The caller owns the series for the duration of a cycle; every indicator and
// the aggregator only borrow it. Validation happens once at construction so the
// numeric code downstream can assume:
//
//   - timestamps strictly increase
//   - open/high/low/close are finite and high >= low
//   - volume is finite and non-negative
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::error::BiasError;

/// One OHLCV bar. `timestamp` is the bar open time in milliseconds since the
/// Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub volume: f64,
}

impl Candle {
    /// (high + low + close) / 3
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }
}

/// Ordered candle history for one instrument / interval.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriceSeries {
    candles: Vec<Candle>,
}

impl PriceSeries {
    /// Validate and wrap `candles` (oldest first).
    pub fn new(candles: Vec<Candle>) -> Result<Self, BiasError> {
        for (index, c) in candles.iter().enumerate() {
            let prices = [c.open, c.high, c.low, c.close];
            if prices.iter().any(|p| !p.is_finite()) {
                return Err(BiasError::InvalidSeries {
                    index,
                    reason: "non-finite price".to_string(),
                });
            }
            if c.high < c.low {
                return Err(BiasError::InvalidSeries {
                    index,
                    reason: format!("high {} below low {}", c.high, c.low),
                });
            }
            if !c.volume.is_finite() || c.volume < 0.0 {
                return Err(BiasError::InvalidSeries {
                    index,
                    reason: format!("invalid volume {}", c.volume),
                });
            }
            if index > 0 && c.timestamp <= candles[index - 1].timestamp {
                return Err(BiasError::InvalidSeries {
                    index,
                    reason: "timestamps must strictly increase".to_string(),
                });
            }
        }
        Ok(Self { candles })
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn last(&self) -> Option<&Candle> {
        self.candles.last()
    }
}

impl<'de> Deserialize<'de> for PriceSeries {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let candles = Vec::<Candle>::deserialize(deserializer)?;
        PriceSeries::new(candles).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    fn candle(timestamp: i64, high: f64, low: f64, close: f64) -> Candle {
        Candle {
            timestamp,
            open: close,
            high,
            low,
            close,
            volume: 10.0,
        }
    }

    #[test]
    fn accepts_well_formed_series() {
        let series = PriceSeries::new(vec![
            candle(1, 101.0, 99.0, 100.0),
            candle(2, 102.0, 100.0, 101.0),
        ])
        .unwrap();
        assert_eq!(series.len(), 2);
        assert_eq!(series.closes(), vec![100.0, 101.0]);
        assert!((series.last().unwrap().typical_price() - 101.0).abs() < 1e-10);
    }

    #[test]
    fn empty_series_is_allowed() {
        let series = PriceSeries::new(Vec::new()).unwrap();
        assert!(series.is_empty());
    }

    #[test]
    fn rejects_non_increasing_timestamps() {
        let err = PriceSeries::new(vec![
            candle(5, 101.0, 99.0, 100.0),
            candle(5, 101.0, 99.0, 100.0),
        ])
        .unwrap_err();
        assert!(matches!(err, BiasError::InvalidSeries { index: 1, .. }));
    }

    #[test]
    fn rejects_inverted_bar() {
        let err = PriceSeries::new(vec![candle(1, 99.0, 101.0, 100.0)]).unwrap_err();
        assert!(matches!(err, BiasError::InvalidSeries { index: 0, .. }));
    }

    #[test]
    fn rejects_nan_and_negative_volume() {
        assert!(PriceSeries::new(vec![candle(1, f64::NAN, 99.0, 100.0)]).is_err());
        let mut bad = candle(1, 101.0, 99.0, 100.0);
        bad.volume = -1.0;
        assert!(PriceSeries::new(vec![bad]).is_err());
    }

    #[test]
    fn deserialisation_validates() {
        let ok = r#"[{"timestamp":1,"open":1,"high":2,"low":0.5,"close":1.5,"volume":3}]"#;
        assert!(serde_json::from_str::<PriceSeries>(ok).is_ok());
        let bad = r#"[{"timestamp":1,"open":1,"high":0.5,"low":2,"close":1.5}]"#;
        assert!(serde_json::from_str::<PriceSeries>(bad).is_err());
    }
}
