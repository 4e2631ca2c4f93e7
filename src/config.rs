//! Environment-sourced configuration, assembled once at startup.

use anyhow::Result;

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}

fn env_list(key: &str, default: &[&str]) -> Vec<String> {
    std::env::var(key)
        .ok()
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
        })
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.iter().map(|s| s.to_string()).collect())
}

pub const DEFAULT_INVESTIBLES: &[&str] = &[
    "XLE", "XLF", "XLV", "XME", "IYT", "AAPL", "MSFT", "JPM", "UNH", "CAT", "NVDA", "AMD", "AMZN",
    "GOOGL", "META", "ARCB", "TTMI", "TRMK", "KWR", "ICUI", "ACHR", "BBAI", "ASTS", "JOBY", "LUNR",
    "OKLO", "LAC", "INTC", "APLD", "F", "PSNY", "PSFE", "U", "LCID", "SMR", "WOLF", "BYND", "AIG",
];

pub const DEFAULT_BELLWETHERS: &[&str] =
    &["^VIX", "SPY", "QQQ", "TLT", "UUP", "^TNX", "CL=F", "TSM", "VTI"];

/// Bellwethers unsupported on non-Yahoo providers (indices, futures, currency index) —
/// always fetched through the Yahoo client regardless of `DATA_PROVIDER`.
pub const DEFAULT_BELLWETHERS_YF: &[&str] = &["^VIX", "^TNX", "CL=F", "UUP", "DX-Y.NYB"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmProvider {
    Ollama,
    OpenRouter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataProvider {
    Yahoo,
    Alpaca,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerProvider {
    Paper,
    Alpaca,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,

    pub llm_provider: LlmProvider,
    pub ollama_host: String,
    pub dream_model: String,
    pub openrouter_base_url: String,
    pub openrouter_api_key: Option<String>,
    pub openrouter_http_referer: Option<String>,
    pub openrouter_app_title: String,
    pub llm_calls_per_min: u32,
    pub llm_timeout_secs: u64,
    pub llm_temp: f64,
    pub llm_max_reask: u32,
    pub llm_max_tokens: u32,

    pub investibles: Vec<String>,
    pub bellwethers: Vec<String>,
    pub bellwethers_yf: Vec<String>,

    pub market_speed: f64,
    pub dream_speed: f64,
    pub think_speed: f64,

    pub auto_market: bool,
    pub auto_dream: bool,
    pub auto_think: bool,
    pub auto_trade: bool,

    pub start_cash: f64,
    pub min_trade_notional: f64,
    pub max_buy_equity_pct_per_cycle: f64,
    pub max_sell_holding_pct_per_cycle: f64,
    pub max_symbol_weight_pct: f64,
    pub min_cash_buffer_pct: f64,
    pub trade_anytime: bool,

    pub data_provider: DataProvider,
    pub broker_provider: BrokerProvider,
    pub yahoo_timeout_secs: u64,
    pub yahoo_range_days: u32,
    pub yahoo_cache_secs: u64,

    pub alpaca_base_url: String,
    pub alpaca_key_id: Option<String>,
    pub alpaca_secret_key: Option<String>,

    pub star_threshold: f64,
    pub explanation_min_length: usize,

    pub options_enabled: bool,

    pub api_port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let llm_provider = match env_string("LLM_PROVIDER", "ollama").as_str() {
            "openrouter" => LlmProvider::OpenRouter,
            _ => LlmProvider::Ollama,
        };
        let data_provider = match env_string("DATA_PROVIDER", "yahoo").as_str() {
            "alpaca" => DataProvider::Alpaca,
            _ => DataProvider::Yahoo,
        };
        let broker_provider = match env_string("BROKER_PROVIDER", "paper").as_str() {
            "alpaca" => BrokerProvider::Alpaca,
            _ => BrokerProvider::Paper,
        };

        Ok(Self {
            db_path: env_string("DB_PATH", "data/kginvest_live.db"),

            llm_provider,
            ollama_host: env_string("OLLAMA_HOST", "http://localhost:11434"),
            dream_model: env_string("DREAM_MODEL", "gemma3:4b"),
            openrouter_base_url: env_string("OPENROUTER_BASE_URL", "https://openrouter.ai/api/v1"),
            openrouter_api_key: std::env::var("OPENROUTER_API_KEY").ok(),
            openrouter_http_referer: std::env::var("OPENROUTER_HTTP_REFERER").ok(),
            openrouter_app_title: env_string("OPENROUTER_APP_TITLE", "KGDreamInvest"),
            llm_calls_per_min: env_parse("LLM_CALLS_PER_MIN", 8u32).max(1),
            llm_timeout_secs: env_parse("LLM_TIMEOUT", 45u64),
            llm_temp: env_parse("LLM_TEMP", 0.25f64),
            llm_max_reask: env_parse("LLM_MAX_REASK", 1u32),
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", 4000u32),

            investibles: env_list("INVESTIBLES", DEFAULT_INVESTIBLES),
            bellwethers: env_list("BELLWETHERS", DEFAULT_BELLWETHERS),
            bellwethers_yf: env_list("BELLWETHERS_YF", DEFAULT_BELLWETHERS_YF),

            market_speed: env_parse("MARKET_SPEED", 0.35f64),
            dream_speed: env_parse("DREAM_SPEED", 0.25f64),
            think_speed: env_parse("THINK_SPEED", 0.20f64),

            auto_market: env_bool("AUTO_MARKET", true),
            auto_dream: env_bool("AUTO_DREAM", true),
            auto_think: env_bool("AUTO_THINK", true),
            auto_trade: env_bool("AUTO_TRADE", true),

            start_cash: env_parse("START_CASH", 10_000.0f64),
            min_trade_notional: env_parse("MIN_TRADE_NOTIONAL", 25.0f64),
            max_buy_equity_pct_per_cycle: env_parse("MAX_BUY_EQUITY_PCT_PER_CYCLE", 18.0f64),
            max_sell_holding_pct_per_cycle: env_parse("MAX_SELL_HOLDING_PCT_PER_CYCLE", 35.0f64),
            max_symbol_weight_pct: env_parse("MAX_SYMBOL_WEIGHT_PCT", 14.0f64),
            min_cash_buffer_pct: env_parse("MIN_CASH_BUFFER_PCT", 12.0f64),
            trade_anytime: env_bool("TRADE_ANYTIME", false),

            data_provider,
            broker_provider,
            yahoo_timeout_secs: env_parse("YAHOO_TIMEOUT", 12u64),
            yahoo_range_days: env_parse("YAHOO_RANGE_DAYS", 90u32),
            yahoo_cache_secs: env_parse("YAHOO_CACHE_SECONDS", 90u64),

            alpaca_base_url: env_string("ALPACA_BASE_URL", "https://paper-api.alpaca.markets"),
            alpaca_key_id: std::env::var("ALPACA_API_KEY_ID").ok(),
            alpaca_secret_key: std::env::var("ALPACA_API_SECRET_KEY").ok(),

            star_threshold: env_parse("STAR_THRESHOLD", 0.72f64),
            explanation_min_length: env_parse("EXPLANATION_MIN_LENGTH", 180usize),

            options_enabled: env_bool("OPTIONS_ENABLED", false),

            api_port: env_parse("PORT", 8080u16),
        })
    }

    /// `interval = 60 / speed`, floor speed at 0.05 ticks/min to avoid division blowups.
    pub fn market_interval_secs(&self) -> f64 {
        60.0 / self.market_speed.max(0.05)
    }
    pub fn dream_interval_secs(&self) -> f64 {
        60.0 / self.dream_speed.max(0.05)
    }
    pub fn think_interval_secs(&self) -> f64 {
        60.0 / self.think_speed.max(0.05)
    }

    pub fn all_tickers(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .investibles
            .iter()
            .chain(self.bellwethers.iter())
            .cloned()
            .collect();
        all.sort();
        all.dedup();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_floors_speed() {
        let mut cfg = Config::from_env().unwrap();
        cfg.market_speed = 0.0;
        assert!((cfg.market_interval_secs() - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn default_investibles_match_bootstrap_count() {
        assert_eq!(DEFAULT_INVESTIBLES.len(), 38);
        assert_eq!(DEFAULT_BELLWETHERS.len(), 9);
    }
}
