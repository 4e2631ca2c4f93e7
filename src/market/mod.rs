pub mod alpaca;
pub mod indicators;
pub mod pool;
pub mod signals;
pub mod yahoo;

pub use indicators::{compute_indicators, Indicators};
pub use signals::{compute_signals, Signals};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A single symbol's last-close snapshot: current/previous close, percent change, and
/// enough history for indicator computation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quote {
    pub current: f64,
    pub previous: f64,
    pub change_pct: f64,
    pub history: Vec<f64>,
    pub volume: i64,
}

/// Raw chart series: timestamps, closes, volumes, any of which may be shorter than
/// the requested range if the upstream has gaps.
#[derive(Debug, Clone, Default)]
pub struct Series {
    pub timestamps: Vec<i64>,
    pub closes: Vec<f64>,
    pub volumes: Vec<i64>,
}

/// Implemented by each concrete market-data source (Yahoo, Alpaca). `fetch_single`
/// is expected to cache internally per its own TTL; `fetch_series` is uncached.
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn fetch_series(&self, symbol: &str, days: u32) -> Series;
    async fn fetch_single(&self, symbol: &str) -> Option<Quote>;
}
