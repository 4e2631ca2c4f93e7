//! Committee wire schema: what the LLM is asked to return, and the sanitizer that
//! turns a loosely-typed response into something safe to execute against.

use crate::config::Config;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn from_str_lenient(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "BUY" => Action::Buy,
            "SELL" => Action::Sell,
            _ => Action::Hold,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
            Action::Hold => "HOLD",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub ticker: String,
    pub action: Action,
    pub allocation_pct: f64,
    pub note: String,
}

#[derive(Debug, Clone, Default)]
pub struct CommitteeOutput {
    pub agents: Value,
    pub decisions: Vec<Decision>,
    pub explanation: String,
    pub confidence: f64,
}

#[derive(Deserialize)]
struct RawDecision {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    action: String,
    #[serde(default)]
    allocation_pct: Value,
    #[serde(default)]
    note: String,
}

#[derive(Serialize)]
pub struct DecisionView<'a> {
    pub ticker: &'a str,
    pub action: &'a str,
    pub allocation_pct: f64,
    pub note: &'a str,
}

fn coerce_pct(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

/// Drops decisions on tickers outside `investibles`, coerces invalid actions to HOLD,
/// clamps `allocation_pct` to `[0, 80]`, and fills in a synthetic HOLD for any
/// investible the model never mentioned.
pub fn sanitize_decisions(raw: &Value, investibles: &[String]) -> Vec<Decision> {
    let mut out = Vec::new();
    let Some(items) = raw.as_array() else { return fill_missing(out, investibles) };

    for item in items {
        let Ok(parsed) = serde_json::from_value::<RawDecision>(item.clone()) else { continue };
        let ticker = parsed.ticker.to_ascii_uppercase().trim().to_string();
        if !investibles.iter().any(|t| t == &ticker) {
            continue;
        }
        let action = Action::from_str_lenient(&parsed.action);
        let allocation_pct = coerce_pct(&parsed.allocation_pct).clamp(0.0, 80.0);
        let note: String = parsed.note.trim().chars().take(260).collect();
        out.push(Decision { ticker, action, allocation_pct, note });
    }

    fill_missing(out, investibles)
}

fn fill_missing(mut out: Vec<Decision>, investibles: &[String]) -> Vec<Decision> {
    use std::collections::HashSet;
    let present: HashSet<&str> = out.iter().map(|d| d.ticker.as_str()).collect();
    for t in investibles {
        if !present.contains(t.as_str()) {
            out.push(Decision {
                ticker: t.clone(),
                action: Action::Hold,
                allocation_pct: 0.0,
                note: "default HOLD".to_string(),
            });
        }
    }
    out
}

/// Parses a raw LLM JSON object into sanitized committee output. Returns `None` if
/// the object doesn't even parse as an object (caller should fall back).
pub fn parse_committee_output(raw: &Value, cfg: &Config) -> Option<CommitteeOutput> {
    let obj = raw.as_object()?;
    let agents = obj.get("agents").cloned().unwrap_or(Value::Object(Default::default()));
    let decisions = sanitize_decisions(obj.get("decisions").unwrap_or(&Value::Null), &cfg.investibles);
    let explanation = obj
        .get("explanation")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .trim()
        .to_string();
    let confidence = obj
        .get("confidence")
        .and_then(|v| v.as_f64())
        .unwrap_or(0.5)
        .clamp(0.0, 1.0);

    Some(CommitteeOutput { agents, decisions, explanation, confidence })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn investibles() -> Vec<String> {
        vec!["AAPL".to_string(), "MSFT".to_string()]
    }

    #[test]
    fn drops_unknown_tickers_and_fills_missing_holds() {
        let raw = json!([
            {"ticker": "AAPL", "action": "buy", "allocation_pct": 200, "note": "x"},
            {"ticker": "TSLA", "action": "BUY", "allocation_pct": 10, "note": "not investible"},
        ]);
        let decisions = sanitize_decisions(&raw, &investibles());
        assert_eq!(decisions.len(), 2);
        let aapl = decisions.iter().find(|d| d.ticker == "AAPL").unwrap();
        assert_eq!(aapl.action, Action::Buy);
        assert_eq!(aapl.allocation_pct, 80.0);
        let msft = decisions.iter().find(|d| d.ticker == "MSFT").unwrap();
        assert_eq!(msft.action, Action::Hold);
        assert_eq!(msft.note, "default HOLD");
    }

    #[test]
    fn invalid_action_coerces_to_hold() {
        let raw = json!([{"ticker": "AAPL", "action": "YOLO", "allocation_pct": 5, "note": ""}]);
        let decisions = sanitize_decisions(&raw, &investibles());
        assert_eq!(decisions[0].action, Action::Hold);
    }
}
