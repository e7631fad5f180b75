// =============================================================================
// Market Bias — Main Entry Point
// =============================================================================
//
// Usage: market-bias <snapshot.json>
//
// The snapshot holds one entry per instrument (candles plus basket data and
// optional external sentiment sources). Each instrument is evaluated on its
// own task; verdicts land in the result cache and are printed as JSON.
//
// Environment:
//   BIAS_CONFIG   path to the engine config (default bias_config.json)
//   BIAS_SYMBOLS  comma-separated allow-list of instruments
//   RUST_LOG      tracing filter (default info)
// =============================================================================

use std::sync::Arc;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use tokio::task::JoinSet;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use market_bias::basket::{BasketPerformance, Constituent};
use market_bias::cache::ResultCache;
use market_bias::config::BiasConfig;
use market_bias::market_data::{Candle, PriceSeries};
use market_bias::sentiment::{ExternalSource, SentimentFuser, SentimentReport};
use market_bias::{BiasResult, TieredBiasAggregator};

/// One instrument's inputs for this cycle.
#[derive(Debug, Deserialize)]
struct InstrumentInput {
    symbol: String,
    candles: Vec<Candle>,
    /// Pre-weighted basket changes. Derived from `constituents` when absent.
    #[serde(default)]
    basket: Option<BasketPerformance>,
    #[serde(default)]
    constituents: Vec<Constituent>,
    #[serde(default)]
    external_sources: Vec<ExternalSource>,
}

#[derive(Debug, Deserialize)]
struct Snapshot {
    instruments: Vec<InstrumentInput>,
}

/// Per-instrument output. A rejected price series yields `bias: None` and
/// the rejection reason in `error`.
#[derive(Debug, Serialize)]
struct InstrumentReport {
    symbol: String,
    bias: Option<BiasResult>,
    sentiment: Option<SentimentReport>,
    error: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // ── 1. Environment & config ──────────────────────────────────────────
    let _ = dotenv::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config_path =
        std::env::var("BIAS_CONFIG").unwrap_or_else(|_| "bias_config.json".to_string());
    let config = BiasConfig::load(&config_path).unwrap_or_else(|e| {
        warn!(error = %e, path = %config_path, "Failed to load config, using defaults");
        BiasConfig::default()
    });

    let Some(snapshot_path) = std::env::args().nth(1) else {
        bail!("usage: market-bias <snapshot.json>");
    };

    // ── 2. Load snapshot ─────────────────────────────────────────────────
    let content = std::fs::read_to_string(&snapshot_path)
        .with_context(|| format!("failed to read snapshot from {snapshot_path}"))?;
    let snapshot: Snapshot = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse snapshot from {snapshot_path}"))?;

    let allow: Option<Vec<String>> = std::env::var("BIAS_SYMBOLS").ok().map(|syms| {
        syms.split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect()
    });
    let instruments: Vec<InstrumentInput> = snapshot
        .instruments
        .into_iter()
        .filter(|i| {
            allow
                .as_ref()
                .map_or(true, |a| a.contains(&i.symbol.to_uppercase()))
        })
        .collect();

    info!(
        instruments = instruments.len(),
        required_history = config.required_history(),
        "Snapshot loaded"
    );

    // ── 3. Build engine ──────────────────────────────────────────────────
    let fuser = Arc::new(
        SentimentFuser::new(config.sentiment.clone()).context("invalid sentiment settings")?,
    );
    let aggregator =
        Arc::new(TieredBiasAggregator::new(config).context("invalid bias configuration")?);
    let cache = Arc::new(ResultCache::new());

    // ── 4. One task per instrument ───────────────────────────────────────
    let mut tasks = JoinSet::new();
    for input in instruments {
        let aggregator = aggregator.clone();
        let fuser = fuser.clone();
        let cache = cache.clone();
        tasks.spawn(async move { evaluate_instrument(input, &aggregator, &fuser, &cache) });
    }

    let mut reports = Vec::new();
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok(report) => reports.push(report),
            Err(e) => error!(error = %e, "Instrument task failed"),
        }
    }
    reports.sort_by(|a, b| a.symbol.cmp(&b.symbol));

    // ── 5. Output ────────────────────────────────────────────────────────
    let json = serde_json::to_string_pretty(&reports).context("failed to serialise reports")?;
    println!("{json}");

    info!(
        reports = reports.len(),
        cached = cache.len(),
        cache_version = cache.version(),
        "Bias cycle complete"
    );
    Ok(())
}

fn evaluate_instrument(
    input: InstrumentInput,
    aggregator: &TieredBiasAggregator,
    fuser: &SentimentFuser,
    cache: &ResultCache,
) -> InstrumentReport {
    let symbol = input.symbol;

    let series = match PriceSeries::new(input.candles) {
        Ok(s) => s,
        Err(e) => {
            error!(symbol = %symbol, error = %e, "Rejected price series");
            return InstrumentReport {
                symbol,
                bias: None,
                sentiment: None,
                error: Some(e.to_string()),
            };
        }
    };

    let basket = input
        .basket
        .unwrap_or_else(|| BasketPerformance::from_constituents(&input.constituents));

    let bias = aggregator.evaluate(&series, &basket, cache.carried_mode(&symbol));

    let sentiment = match fuser.fuse(Some(&bias), &input.constituents, &input.external_sources) {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(symbol = %symbol, error = %e, "Sentiment fusion skipped");
            None
        }
    };

    info!(
        symbol = %symbol,
        direction = %bias.overall_direction,
        mode = %bias.mode,
        bullish_pct = format!("{:.2}", bias.bullish_pct),
        bearish_pct = format!("{:.2}", bias.bearish_pct),
        regime = bias.regime.as_ref().map(|r| r.regime.to_string()).unwrap_or_default(),
        conclusive = bias.is_conclusive(),
        "Bias evaluated"
    );

    cache.record(&symbol, bias.clone());

    InstrumentReport {
        symbol,
        bias: Some(bias),
        sentiment,
        error: None,
    }
}
