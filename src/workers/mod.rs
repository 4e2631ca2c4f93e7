//! The three always-on workers (Market / Dream / Think) wired onto the shared
//! `Supervisor` shape. Options and OptionsThink are external collaborators, not
//! part of this core — `Workers` only start the three below.

pub mod dream_worker;
pub mod market_worker;
pub mod supervisor;
pub mod think_worker;

use crate::config::Config;
use crate::llm::LlmAdapter;
use crate::market::{alpaca::AlpacaProvider, pool::MarketPool, yahoo::YahooProvider, MarketDataProvider};
use crate::store::Store;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use supervisor::Supervisor;

type StepFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

pub struct Workers {
    pub market: Supervisor,
    pub dream: Supervisor,
    pub think: Supervisor,
}

impl Workers {
    pub fn new() -> Self {
        Self {
            market: Supervisor::new("market"),
            dream: Supervisor::new("dream"),
            think: Supervisor::new("think"),
        }
    }

    /// Builds the primary/fallback provider pair per `cfg.data_provider`: Yahoo is
    /// always available as the fallback (and as the sole Yahoo-only-bellwether
    /// fetcher), Alpaca is primary only when configured and credentialed.
    fn build_pool(cfg: &Config) -> (MarketPool, Arc<YahooProvider>) {
        let yahoo = Arc::new(YahooProvider::new(cfg.yahoo_timeout_secs, cfg.yahoo_cache_secs));
        let primary: Arc<dyn MarketDataProvider> = match cfg.data_provider {
            crate::config::DataProvider::Yahoo => yahoo.clone(),
            crate::config::DataProvider::Alpaca => {
                let key_id = cfg.alpaca_key_id.clone().unwrap_or_default();
                let secret = cfg.alpaca_secret_key.clone().unwrap_or_default();
                Arc::new(AlpacaProvider::new(cfg.alpaca_base_url.clone(), key_id, secret, cfg.yahoo_timeout_secs))
            }
        };
        let fallback: Option<Arc<dyn MarketDataProvider>> = match cfg.data_provider {
            crate::config::DataProvider::Yahoo => None,
            crate::config::DataProvider::Alpaca => Some(yahoo.clone()),
        };
        (MarketPool::new(primary, fallback, 8), yahoo)
    }

    pub fn start_all(&self, store: Store, cfg: Arc<Config>, adapter: Arc<LlmAdapter>) {
        if cfg.auto_market {
            self.start_market(store.clone(), cfg.clone());
        }
        if cfg.auto_dream {
            self.start_dream(store.clone(), cfg.clone(), adapter.clone());
        }
        if cfg.auto_think {
            self.start_think(store, cfg, adapter);
        }
    }

    pub fn start_market(&self, store: Store, cfg: Arc<Config>) {
        let (pool, yahoo) = Self::build_pool(&cfg);
        let pool = Arc::new(pool);
        self.market.start(
            Duration::from_secs_f64(cfg.market_interval_secs()),
            Arc::new(move || -> StepFuture {
                let store = store.clone();
                let cfg = cfg.clone();
                let pool = pool.clone();
                let yahoo = yahoo.clone();
                Box::pin(async move { market_worker::step_once(&store, &cfg, &pool, &yahoo).await })
            }),
        );
    }

    pub fn start_dream(&self, store: Store, cfg: Arc<Config>, adapter: Arc<LlmAdapter>) {
        self.dream.start(
            Duration::from_secs_f64(cfg.dream_interval_secs()),
            Arc::new(move || -> StepFuture {
                let store = store.clone();
                let cfg = cfg.clone();
                let adapter = adapter.clone();
                Box::pin(async move { dream_worker::step_once(&store, &cfg, &adapter).await })
            }),
        );
    }

    pub fn start_think(&self, store: Store, cfg: Arc<Config>, adapter: Arc<LlmAdapter>) {
        self.think.start(
            Duration::from_secs_f64(cfg.think_interval_secs()),
            Arc::new(move || -> StepFuture {
                let store = store.clone();
                let cfg = cfg.clone();
                let adapter = adapter.clone();
                Box::pin(async move { think_worker::step_once(&store, &cfg, &adapter).await })
            }),
        );
    }

    /// Starts the named worker (`"market" | "dream" | "think"`) with its normal
    /// recurring cadence. Returns `false` for an unrecognized name.
    pub fn start_named(&self, name: &str, store: Store, cfg: Arc<Config>, adapter: Arc<LlmAdapter>) -> bool {
        match name {
            "market" => self.start_market(store, cfg),
            "dream" => self.start_dream(store, cfg, adapter),
            "think" => self.start_think(store, cfg, adapter),
            _ => return false,
        }
        true
    }

    /// Stops the named worker. Returns `false` for an unrecognized name.
    pub fn stop_named(&self, name: &str) -> bool {
        match name {
            "market" => self.market.stop_now(),
            "dream" => self.dream.stop_now(),
            "think" => self.think.stop_now(),
            _ => return false,
        }
        true
    }

    /// Runs exactly one `step_once` for the named worker, out of band from its
    /// supervisor loop and regardless of whether it is currently running.
    pub async fn step_named(
        &self,
        name: &str,
        store: &Store,
        cfg: &Config,
        adapter: &LlmAdapter,
    ) -> Option<anyhow::Result<()>> {
        match name {
            "market" => {
                let (pool, yahoo) = Self::build_pool(cfg);
                Some(market_worker::step_once(store, cfg, &pool, &yahoo).await)
            }
            "dream" => Some(dream_worker::step_once(store, cfg, adapter).await),
            "think" => Some(think_worker::step_once(store, cfg, adapter).await),
            _ => None,
        }
    }

    pub fn stop_all(&self) {
        self.market.stop_now();
        self.dream.stop_now();
        self.think.stop_now();
    }

    pub fn stats_for(&self, name: &str) -> Option<supervisor::WorkerStats> {
        match name {
            "market" => Some(self.market.stats()),
            "dream" => Some(self.dream.stats()),
            "think" => Some(self.think.stats()),
            _ => None,
        }
    }
}

impl Default for Workers {
    fn default() -> Self {
        Self::new()
    }
}
