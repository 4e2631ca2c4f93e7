//! Guard-rail sizing shared by every broker backend: SELL pass first (frees cash),
//! then BUY pass, both bounded by equity-relative caps. Pure function of a snapshot
//! of cash/positions/prices — the concrete backend (paper, Alpaca) is responsible
//! for committing the resulting plan.

use crate::committee::schema::{Action, Decision};
use crate::config::Config;
use crate::market::Quote;
use crate::store::positions::Position;
use std::collections::HashMap;

#[derive(Debug, Clone)]
pub struct PlannedTrade {
    pub symbol: String,
    pub shares: f64,
    pub price: f64,
    pub notional: f64,
}

#[derive(Debug, Clone, Default)]
pub struct GuardrailPlan {
    pub sells: Vec<PlannedTrade>,
    pub buys: Vec<PlannedTrade>,
    pub skipped: Vec<(String, String)>,
    pub final_cash: f64,
}

#[derive(Clone, Copy)]
struct WorkingPosition {
    qty: f64,
    last_price: f64,
}

fn price_for(symbol: &str, prices: &HashMap<String, Quote>, fallback: f64) -> f64 {
    prices.get(symbol).map(|q| q.current).unwrap_or(fallback)
}

pub fn plan_trades(
    cfg: &Config,
    decisions: &[Decision],
    prices: &HashMap<String, Quote>,
    positions: &HashMap<String, Position>,
    cash: f64,
) -> GuardrailPlan {
    let mut working: HashMap<String, WorkingPosition> = positions
        .iter()
        .map(|(sym, p)| (sym.clone(), WorkingPosition { qty: p.qty, last_price: p.last_price }))
        .collect();

    let equity: f64 = cash
        + working
            .iter()
            .map(|(sym, p)| p.qty * price_for(sym, prices, p.last_price))
            .sum::<f64>();

    let mut buy_budget = equity * cfg.max_buy_equity_pct_per_cycle / 100.0;
    let cash_buffer = equity * cfg.min_cash_buffer_pct / 100.0;
    let mut cash = cash;
    let mut plan = GuardrailPlan::default();

    for d in decisions.iter().filter(|d| d.action == Action::Sell && d.allocation_pct > 0.0) {
        let Some(pos) = working.get(&d.ticker).copied() else {
            plan.skipped.push((d.ticker.clone(), "no_position".to_string()));
            continue;
        };
        let price = price_for(&d.ticker, prices, pos.last_price);
        let pct = d.allocation_pct.min(cfg.max_sell_holding_pct_per_cycle);
        let sell_qty = pos.qty * pct / 100.0;
        let notional = sell_qty * price;
        if notional < cfg.min_trade_notional {
            plan.skipped.push((d.ticker.clone(), "below_min_notional".to_string()));
            continue;
        }

        cash += notional;
        working.insert(d.ticker.clone(), WorkingPosition { qty: pos.qty - sell_qty, last_price: price });
        plan.sells.push(PlannedTrade { symbol: d.ticker.clone(), shares: sell_qty, price, notional });
    }

    for d in decisions.iter().filter(|d| d.action == Action::Buy && d.allocation_pct > 0.0) {
        let spendable = (cash - cash_buffer).max(0.0);
        if spendable < cfg.min_trade_notional {
            break;
        }

        let price = price_for(&d.ticker, prices, working.get(&d.ticker).map(|p| p.last_price).unwrap_or(0.0));
        if price <= 0.0 {
            plan.skipped.push((d.ticker.clone(), "no_price".to_string()));
            continue;
        }

        let requested = equity * d.allocation_pct / 100.0;
        let mut notional = requested.min(buy_budget).min(spendable);
        if notional < cfg.min_trade_notional {
            plan.skipped.push((d.ticker.clone(), "below_min_notional".to_string()));
            continue;
        }

        let current_qty = working.get(&d.ticker).map(|p| p.qty).unwrap_or(0.0);
        let current_mv = current_qty * price;
        let cap = equity * cfg.max_symbol_weight_pct / 100.0;
        if current_mv >= cap {
            plan.skipped.push((d.ticker.clone(), "symbol_cap".to_string()));
            continue;
        }
        notional = notional.min(cap - current_mv);

        let shares = notional / price;
        cash -= notional;
        buy_budget -= notional;
        working.insert(d.ticker.clone(), WorkingPosition { qty: current_qty + shares, last_price: price });
        plan.buys.push(PlannedTrade { symbol: d.ticker.clone(), shares, price, notional });

        if buy_budget < cfg.min_trade_notional {
            break;
        }
    }

    plan.final_cash = cash;
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> Config {
        let mut c = Config::from_env().unwrap();
        c.max_buy_equity_pct_per_cycle = 18.0;
        c.max_sell_holding_pct_per_cycle = 35.0;
        c.max_symbol_weight_pct = 14.0;
        c.min_cash_buffer_pct = 12.0;
        c.min_trade_notional = 25.0;
        c
    }

    fn decision(ticker: &str, action: Action, pct: f64) -> Decision {
        Decision { ticker: ticker.to_string(), action, allocation_pct: pct, note: String::new() }
    }

    #[test]
    fn sells_run_before_buys_and_free_cash() {
        let mut positions = HashMap::new();
        positions.insert(
            "AAPL".to_string(),
            Position { symbol: "AAPL".to_string(), qty: 10.0, avg_cost: 100.0, last_price: 150.0, updated_at: None, executed_at: None },
        );
        let decisions = vec![decision("AAPL", Action::Sell, 20.0), decision("MSFT", Action::Buy, 10.0)];
        let mut prices = HashMap::new();
        prices.insert("MSFT".to_string(), Quote { current: 300.0, previous: 300.0, change_pct: 0.0, history: vec![], volume: 0 });

        let plan = plan_trades(&cfg(), &decisions, &prices, &positions, 100.0);
        assert_eq!(plan.sells.len(), 1);
        assert!((plan.sells[0].shares - 2.0).abs() < 1e-9);
    }

    #[test]
    fn symbol_weight_cap_limits_additional_buy() {
        let mut positions = HashMap::new();
        positions.insert(
            "AAPL".to_string(),
            Position { symbol: "AAPL".to_string(), qty: 100.0, avg_cost: 100.0, last_price: 100.0, updated_at: None, executed_at: None },
        );
        let decisions = vec![decision("AAPL", Action::Buy, 50.0)];
        let plan = plan_trades(&cfg(), &decisions, &HashMap::new(), &positions, 5_000.0);
        assert!(plan.buys.is_empty() || plan.skipped.iter().any(|(t, r)| t == "AAPL" && r == "symbol_cap"));
    }

    #[test]
    fn stops_buying_once_cash_buffer_is_breached() {
        let decisions = vec![decision("AAPL", Action::Buy, 5.0), decision("MSFT", Action::Buy, 5.0)];
        let mut prices = HashMap::new();
        prices.insert("AAPL".to_string(), Quote { current: 100.0, previous: 100.0, change_pct: 0.0, history: vec![], volume: 0 });
        prices.insert("MSFT".to_string(), Quote { current: 100.0, previous: 100.0, change_pct: 0.0, history: vec![], volume: 0 });
        let plan = plan_trades(&cfg(), &decisions, &prices, &HashMap::new(), 30.0);
        assert!(plan.buys.len() <= 1);
    }
}
