// =============================================================================
// Volume-Weighted Average Price (VWAP)
// =============================================================================
//
//   VWAP_t = sum(typical_i * volume_i) / sum(volume_i)
//
// Accumulation runs either over the whole series or per trading session. In
// session mode the running sums restart whenever the local calendar date of
// the bar (UTC shifted by a fixed offset) changes.
// =============================================================================

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::market_data::Candle;

/// How VWAP accumulation is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VwapAnchor {
    /// Accumulate over the entire series.
    Cumulative,
    /// Restart at each local calendar day, `utc_offset_minutes` east of UTC.
    Session { utc_offset_minutes: i32 },
}

impl Default for VwapAnchor {
    fn default() -> Self {
        Self::Session {
            utc_offset_minutes: 0,
        }
    }
}

/// VWAP series aligned one-to-one with `candles`.
///
/// Zero cumulative volume falls back to the bar's typical price.
pub fn calculate_vwap(candles: &[Candle], anchor: VwapAnchor) -> Vec<f64> {
    let mut out = Vec::with_capacity(candles.len());
    let mut cum_pv = 0.0;
    let mut cum_vol = 0.0;
    let mut session: Option<NaiveDate> = None;

    for c in candles {
        if let VwapAnchor::Session { utc_offset_minutes } = anchor {
            let day = session_date(c.timestamp, utc_offset_minutes);
            if session.is_some() && day != session {
                cum_pv = 0.0;
                cum_vol = 0.0;
            }
            session = day;
        }

        let tp = c.typical_price();
        cum_pv += tp * c.volume;
        cum_vol += c.volume;

        let vwap = if cum_vol > 0.0 { cum_pv / cum_vol } else { tp };
        out.push(if vwap.is_finite() { vwap } else { tp });
    }
    out
}

/// Latest VWAP value.
pub fn latest_vwap(candles: &[Candle], anchor: VwapAnchor) -> Option<f64> {
    calculate_vwap(candles, anchor).last().copied()
}

// =============================================================================
// Internal helpers
// =============================================================================

fn session_date(timestamp_ms: i64, utc_offset_minutes: i32) -> Option<NaiveDate> {
    let offset = FixedOffset::east_opt(utc_offset_minutes.saturating_mul(60))
        .or_else(|| FixedOffset::east_opt(0))?;
    DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.with_timezone(&offset).date_naive())
}

// =============================================================================
// Unit Tests
// =============================================================================
#[cfg(test)]
mod tests {
    use super::*;

    const HOUR_MS: i64 = 3_600_000;

    fn bar(timestamp: i64, price: f64, volume: f64) -> Candle {
        Candle {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
        }
    }

    #[test]
    fn empty_input() {
        assert!(calculate_vwap(&[], VwapAnchor::Cumulative).is_empty());
        assert!(latest_vwap(&[], VwapAnchor::Cumulative).is_none());
    }

    #[test]
    fn cumulative_weighting() {
        let candles = vec![bar(0, 100.0, 1.0), bar(HOUR_MS, 110.0, 3.0)];
        let v = calculate_vwap(&candles, VwapAnchor::Cumulative);
        assert!((v[0] - 100.0).abs() < 1e-10);
        assert!((v[1] - 107.5).abs() < 1e-10, "got {}", v[1]);
    }

    #[test]
    fn zero_volume_falls_back_to_typical_price() {
        let candles = vec![bar(0, 100.0, 0.0), bar(HOUR_MS, 104.0, 0.0)];
        let v = calculate_vwap(&candles, VwapAnchor::Cumulative);
        assert_eq!(v, vec![100.0, 104.0]);
    }

    #[test]
    fn session_anchor_resets_on_new_day() {
        // 22:00 and 23:00 UTC on day 0, then 01:00 UTC on day 1.
        let candles = vec![
            bar(22 * HOUR_MS, 100.0, 1.0),
            bar(23 * HOUR_MS, 102.0, 1.0),
            bar(25 * HOUR_MS, 200.0, 1.0),
        ];
        let utc = calculate_vwap(&candles, VwapAnchor::Session { utc_offset_minutes: 0 });
        assert!((utc[1] - 101.0).abs() < 1e-10);
        assert!((utc[2] - 200.0).abs() < 1e-10, "new session must restart, got {}", utc[2]);

        let cumulative = calculate_vwap(&candles, VwapAnchor::Cumulative);
        assert!((cumulative[2] - 134.0).abs() < 1e-10);
    }

    #[test]
    fn session_offset_shifts_the_boundary() {
        // With +05:30 the UTC midnight is 05:30 local: 22:00 UTC day 0 is
        // already 03:30 local on day 1, so all three bars share a session.
        let candles = vec![
            bar(22 * HOUR_MS, 100.0, 1.0),
            bar(23 * HOUR_MS, 102.0, 1.0),
            bar(25 * HOUR_MS, 200.0, 1.0),
        ];
        let v = calculate_vwap(&candles, VwapAnchor::Session { utc_offset_minutes: 330 });
        assert!((v[2] - 134.0).abs() < 1e-10, "got {}", v[2]);
    }
}
