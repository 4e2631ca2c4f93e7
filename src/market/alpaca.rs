//! Alpaca market-data client, used when `DATA_PROVIDER=alpaca`. Daily bars via
//! `GET /v2/stocks/{symbol}/bars?timeframe=1Day&limit=N`, keyed auth headers.
//! No per-symbol cache of its own; `fetch_single` derives from `fetch_series`.

use super::{MarketDataProvider, Quote, Series};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

pub struct AlpacaProvider {
    http: reqwest::Client,
    base_url: String,
    key_id: String,
    secret_key: String,
    timeout: Duration,
}

impl AlpacaProvider {
    pub fn new(base_url: String, key_id: String, secret_key: String, timeout_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            key_id,
            secret_key,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

#[async_trait]
impl MarketDataProvider for AlpacaProvider {
    async fn fetch_series(&self, symbol: &str, days: u32) -> Series {
        let url = format!("{}/v2/stocks/{}/bars", self.base_url, symbol);

        let resp = match self
            .http
            .get(&url)
            .query(&[("timeframe", "1Day"), ("limit", &days.to_string())])
            .header("APCA-API-KEY-ID", &self.key_id)
            .header("APCA-API-SECRET-KEY", &self.secret_key)
            .timeout(self.timeout)
            .send()
            .await
        {
            Ok(r) => r,
            Err(_) => return Series::default(),
        };

        if !resp.status().is_success() {
            return Series::default();
        }

        let body: BarsResponse = match resp.json().await {
            Ok(b) => b,
            Err(_) => return Series::default(),
        };

        let mut timestamps = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        for bar in body.bars {
            timestamps.push(bar.t.timestamp());
            closes.push(bar.c);
            volumes.push(bar.v);
        }

        Series { timestamps, closes, volumes }
    }

    async fn fetch_single(&self, symbol: &str) -> Option<Quote> {
        let series = self.fetch_series(symbol, 90).await;
        if series.closes.len() < 2 {
            return None;
        }

        let current = series.closes[series.closes.len() - 1];
        let previous = series.closes[series.closes.len() - 2];
        let change_pct = (current - previous) / previous.max(1e-9) * 100.0;
        let volume = *series.volumes.last().unwrap_or(&0);

        Some(Quote { current, previous, change_pct, history: series.closes, volume })
    }
}

#[derive(Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Vec<Bar>,
}

#[derive(Deserialize)]
struct Bar {
    t: chrono::DateTime<chrono::Utc>,
    c: f64,
    v: i64,
}
