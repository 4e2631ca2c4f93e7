//! Offline reconciliation CLI: diffs the local trade ledger against the Alpaca
//! broker's reported positions since a given timestamp and, after an operator
//! confirms, submits the delta orders that bring the broker back in line.

use anyhow::{Context, Result};
use clap::Parser;
use kgdreaminvest::config::Config;
use kgdreaminvest::executor::alpaca::AlpacaBroker;
use kgdreaminvest::executor::reconcile::plan_reconciliation;
use kgdreaminvest::store::trades::Side;
use kgdreaminvest::store::Store;
use std::io::Write;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "reconcile", about = "Diff local trade ledger against the broker and submit delta orders")]
struct Cli {
    /// ISO-8601 timestamp; only trades at or after this time are summed into the
    /// expected-quantity baseline.
    #[arg(long)]
    since: String,

    /// Skip the interactive confirmation prompt and submit every action.
    #[arg(long, default_value_t = false)]
    yes: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    let cfg = Config::from_env().context("loading configuration")?;
    let store = Store::open(&cfg.db_path).context("opening store")?;

    let key_id = cfg.alpaca_key_id.clone().context("ALPACA_API_KEY_ID is required for reconcile")?;
    let secret = cfg.alpaca_secret_key.clone().context("ALPACA_API_SECRET_KEY is required for reconcile")?;
    let broker = AlpacaBroker::new(cfg.alpaca_base_url.clone(), key_id, secret);

    let actions = plan_reconciliation(&store, &broker, &cli.since).await.context("computing reconciliation plan")?;
    if actions.is_empty() {
        println!("broker and ledger already agree since {}", cli.since);
        return Ok(());
    }

    println!("{} discrepancies found since {}:", actions.len(), cli.since);
    for a in &actions {
        println!(
            "  {:<6} {:?} {:.4} shares (expected={:.4} broker={:.4})",
            a.symbol, a.side, a.qty, a.expected_qty, a.broker_qty
        );
    }

    if !cli.yes && !confirm("submit these orders to Alpaca?")? {
        println!("aborted, no orders submitted");
        return Ok(());
    }

    for a in &actions {
        match broker.submit_order(&a.symbol, a.side, a.qty).await {
            Ok(order_id) => info!(symbol = %a.symbol, side = ?a.side, qty = a.qty, order_id, "reconcile order submitted"),
            Err(e) => eprintln!("FAILED {} {:?} {:.4}: {e}", a.symbol, a.side, a.qty),
        }
    }

    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{prompt} [y/N] ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(matches!(line.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
