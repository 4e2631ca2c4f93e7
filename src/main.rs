//! Entry point: loads configuration, opens the store, bootstraps the knowledge
//! graph if empty, starts the Market/Dream/Think worker trio per their auto flags,
//! and serves the internal stats/control API alongside them.

use anyhow::{Context, Result};
use clap::Parser;
use kgdreaminvest::api::{self, AppState};
use kgdreaminvest::config::Config;
use kgdreaminvest::llm::budget::LlmBudget;
use kgdreaminvest::llm::provider::build_provider;
use kgdreaminvest::llm::LlmAdapter;
use kgdreaminvest::store::Store;
use kgdreaminvest::workers::Workers;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "kgdreaminvest", about = "Knowledge-graph-driven paper/live trading loop")]
struct Cli {
    /// Bind address for the internal stats/control API.
    #[arg(long, env = "API_HOST", default_value = "0.0.0.0")]
    host: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let cfg = Arc::new(Config::from_env().context("loading configuration")?);

    let store = Store::open(&cfg.db_path).context("opening store")?;
    store.init_db(cfg.start_cash).await.context("initializing schema")?;
    store
        .bootstrap_if_empty(&cfg.investibles, &cfg.bellwethers)
        .await
        .context("bootstrapping knowledge graph")?;
    info!(db_path = %cfg.db_path, "store ready");

    let provider = build_provider(&cfg).context("building LLM provider")?;
    let budget = LlmBudget::new(cfg.llm_calls_per_min);
    let adapter = Arc::new(LlmAdapter::new(provider, budget, cfg.llm_max_reask));

    let workers = Arc::new(Workers::new());
    workers.start_all(store.clone(), cfg.clone(), adapter.clone());
    info!(
        market = cfg.auto_market,
        dream = cfg.auto_dream,
        think = cfg.auto_think,
        "workers started per config"
    );

    let state = AppState { store, cfg: cfg.clone(), adapter, workers: workers.clone() };
    let app = api::router(state);

    let addr = format!("{}:{}", cli.host, cfg.api_port);
    let listener = TcpListener::bind(&addr).await.with_context(|| format!("binding {addr}"))?;
    info!(addr = %addr, "API listening");

    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
        info!("shutdown signal received");
    };

    axum::serve(listener, app).with_graceful_shutdown(shutdown).await.context("server error")?;

    workers.stop_all();
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "kgdreaminvest=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
