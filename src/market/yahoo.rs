//! Yahoo Finance chart API client. No vendor SDK: a raw
//! `GET /v8/finance/chart/{symbol}?interval=1d&range={N}d` with a rotated
//! User-Agent.

use super::{MarketDataProvider, Quote, Series};
use async_trait::async_trait;
use parking_lot::Mutex;
use rand::seq::SliceRandom;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

const UA_LIST: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36",
];

fn random_user_agent() -> &'static str {
    UA_LIST.choose(&mut rand::thread_rng()).copied().unwrap_or(UA_LIST[0])
}

/// Minimal percent-encoding for path segments; Yahoo symbols only ever contain
/// `^`, `=`, `.`, `-` alongside alphanumerics, none of which are safe unescaped in a
/// URL path segment except `.` and `-`.
fn percent_encode_symbol(symbol: &str) -> String {
    let mut out = String::with_capacity(symbol.len());
    for b in symbol.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' => out.push(b as char),
            _ => out.push_str(&format!("%{:02X}", b)),
        }
    }
    out
}

pub struct YahooProvider {
    http: reqwest::Client,
    timeout: Duration,
    cache_ttl: Duration,
    cache: Mutex<HashMap<String, (Instant, Quote)>>,
}

impl YahooProvider {
    pub fn new(timeout_secs: u64, cache_ttl_secs: u64) -> Self {
        Self {
            http: reqwest::Client::new(),
            timeout: Duration::from_secs(timeout_secs),
            cache_ttl: Duration::from_secs(cache_ttl_secs),
            cache: Mutex::new(HashMap::new()),
        }
    }

    async fn fetch_chart(&self, symbol: &str, range_days: u32) -> Series {
        let encoded = percent_encode_symbol(symbol);
        let url = format!("https://query2.finance.yahoo.com/v8/finance/chart/{encoded}");

        let resp = match self
            .http
            .get(&url)
            .query(&[("interval", "1d"), ("range", &format!("{range_days}d"))])
            .header(reqwest::header::USER_AGENT, random_user_agent())
            .header(reqwest::header::ACCEPT, "application/json")
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

        let body: ChartResponse = match resp.json().await {
            Ok(b) => b,
            Err(_) => return Series::default(),
        };

        let Some(result) = body.chart.result.into_iter().next() else {
            return Series::default();
        };
        let Some(quote) = result.indicators.quote.into_iter().next() else {
            return Series::default();
        };

        let mut timestamps = Vec::new();
        let mut closes = Vec::new();
        let mut volumes = Vec::new();
        for (i, close) in quote.close.iter().enumerate() {
            if let Some(c) = close {
                timestamps.push(result.timestamp.get(i).copied().unwrap_or(0));
                closes.push(*c);
                volumes.push(quote.volume.get(i).copied().flatten().unwrap_or(0));
            }
        }

        Series { timestamps, closes, volumes }
    }
}

#[async_trait]
impl MarketDataProvider for YahooProvider {
    async fn fetch_series(&self, symbol: &str, days: u32) -> Series {
        self.fetch_chart(symbol, days).await
    }

    async fn fetch_single(&self, symbol: &str) -> Option<Quote> {
        let now = Instant::now();
        if let Some((fetched_at, payload)) = self.cache.lock().get(symbol) {
            if now.duration_since(*fetched_at) <= self.cache_ttl {
                return Some(payload.clone());
            }
        }

        let series = self.fetch_chart(symbol, 90).await;
        if series.closes.len() < 2 {
            return None;
        }

        let current = series.closes[series.closes.len() - 1];
        let previous = series.closes[series.closes.len() - 2];
        let change_pct = (current - previous) / previous.max(1e-9) * 100.0;
        let volume = *series.volumes.last().unwrap_or(&0);

        let quote = Quote { current, previous, change_pct, history: series.closes, volume };
        self.cache.lock().insert(symbol.to_string(), (now, quote.clone()));
        Some(quote)
    }
}

#[derive(Deserialize)]
struct ChartResponse {
    chart: ChartBody,
}

#[derive(Deserialize)]
struct ChartBody {
    result: Vec<ChartResult>,
}

#[derive(Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: ChartIndicators,
}

#[derive(Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<i64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_caret_and_equals() {
        assert_eq!(percent_encode_symbol("^VIX"), "%5EVIX");
        assert_eq!(percent_encode_symbol("CL=F"), "CL%3DF");
        assert_eq!(percent_encode_symbol("AAPL"), "AAPL");
    }

    #[test]
    fn cache_ttl_respects_elapsed_time() {
        let provider = YahooProvider::new(5, 90);
        assert!(provider.cache.lock().is_empty());
    }
}
