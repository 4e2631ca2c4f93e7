//! Bounded-concurrency fan-out over a `MarketDataProvider`, with pool-level
//! fallback: if the primary comes back empty, retry the whole symbol set on the
//! fallback provider. Per-symbol failures are omissions, never substitutions.

use super::{MarketDataProvider, Quote};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub struct MarketPool {
    primary: Arc<dyn MarketDataProvider>,
    fallback: Option<Arc<dyn MarketDataProvider>>,
    max_workers: usize,
}

impl MarketPool {
    pub fn new(
        primary: Arc<dyn MarketDataProvider>,
        fallback: Option<Arc<dyn MarketDataProvider>>,
        max_workers: usize,
    ) -> Self {
        Self { primary, fallback, max_workers: max_workers.max(1) }
    }

    pub async fn fetch_many(&self, symbols: &[String]) -> HashMap<String, Quote> {
        let results = Self::fan_out(&self.primary, symbols, self.max_workers).await;
        if !results.is_empty() {
            return results;
        }
        match &self.fallback {
            Some(fallback) => Self::fan_out(fallback, symbols, self.max_workers).await,
            None => results,
        }
    }

    async fn fan_out(
        provider: &Arc<dyn MarketDataProvider>,
        symbols: &[String],
        max_workers: usize,
    ) -> HashMap<String, Quote> {
        let semaphore = Arc::new(Semaphore::new(max_workers));
        let mut set = JoinSet::new();

        for symbol in symbols {
            let provider = provider.clone();
            let symbol = symbol.clone();
            let semaphore = semaphore.clone();
            set.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                let quote = provider.fetch_single(&symbol).await;
                quote.map(|q| (symbol, q))
            });
        }

        let mut results = HashMap::with_capacity(symbols.len());
        while let Some(joined) = set.join_next().await {
            if let Ok(Some((symbol, quote))) = joined {
                results.insert(symbol, quote);
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::Series;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        good: Vec<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MarketDataProvider for FakeProvider {
        async fn fetch_series(&self, _symbol: &str, _days: u32) -> Series {
            Series::default()
        }

        async fn fetch_single(&self, symbol: &str) -> Option<Quote> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.good.contains(&symbol) {
                Some(Quote { current: 1.0, previous: 1.0, change_pct: 0.0, history: vec![], volume: 0 })
            } else {
                None
            }
        }
    }

    #[tokio::test]
    async fn omits_failing_symbols_without_substitution() {
        let calls = Arc::new(AtomicUsize::new(0));
        let primary = Arc::new(FakeProvider { good: vec!["AAPL"], calls: calls.clone() });
        let pool = MarketPool::new(primary, None, 4);
        let symbols = vec!["AAPL".to_string(), "BAD".to_string()];
        let results = pool.fetch_many(&symbols).await;
        assert_eq!(results.len(), 1);
        assert!(results.contains_key("AAPL"));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retries_whole_pool_on_fallback_when_primary_is_empty() {
        let primary_calls = Arc::new(AtomicUsize::new(0));
        let fallback_calls = Arc::new(AtomicUsize::new(0));
        let primary = Arc::new(FakeProvider { good: vec![], calls: primary_calls.clone() });
        let fallback = Arc::new(FakeProvider { good: vec!["AAPL"], calls: fallback_calls.clone() });
        let pool = MarketPool::new(primary, Some(fallback), 4);
        let symbols = vec!["AAPL".to_string()];
        let results = pool.fetch_many(&symbols).await;
        assert_eq!(results.len(), 1);
        assert_eq!(primary_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback_calls.load(Ordering::SeqCst), 1);
    }
}
