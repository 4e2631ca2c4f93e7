//! Dream worker dispatch: pick an assessment category and pair, derive heuristic
//! channels from return correlation (and, when options monitoring is enabled, the
//! option-pair predicates in `kg::correlation`), then optionally hand off to the LLM
//! adjudicator. Option Greeks themselves (IV/delta/vega series) are out of scope for
//! this core — they are owned by the external options workflow that creates the
//! monitored option nodes; `OptionPairInputs` is the narrow contract this engine
//! needs from that data, supplied by the caller.

use super::correlation::{corr, delta_alignment, iv_corr, spread_score, vega_similarity};
use crate::llm::LlmAdapter;
use crate::store::Store;
use rand::Rng;
use serde::Deserialize;
use std::collections::HashMap;

const BROAD_MARKET_PROXY: &str = "SPY";
const OPTION_CHURN_WINDOW_SECS: i64 = 3600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchCategory {
    InvestibleBellwether,
    OptionBellwether,
    OptionOption,
}

/// 60/20/20 split; the two option categories only fire when options monitoring is on,
/// otherwise every tick dispatches an investible-bellwether assessment.
pub fn pick_category(options_enabled: bool) -> DispatchCategory {
    if !options_enabled {
        return DispatchCategory::InvestibleBellwether;
    }
    let roll: f64 = rand::thread_rng().gen_range(0.0..1.0);
    if roll < 0.60 {
        DispatchCategory::InvestibleBellwether
    } else if roll < 0.80 {
        DispatchCategory::OptionBellwether
    } else {
        DispatchCategory::OptionOption
    }
}

/// Probability of consulting the LLM adjudicator for a chosen category.
pub fn adjudication_probability(category: DispatchCategory) -> f64 {
    match category {
        DispatchCategory::InvestibleBellwether => 0.30,
        DispatchCategory::OptionBellwether => 0.40,
        DispatchCategory::OptionOption => 0.50,
    }
}

fn pick_random<'a>(items: &'a [String]) -> Option<&'a String> {
    if items.is_empty() {
        return None;
    }
    let idx = rand::thread_rng().gen_range(0..items.len());
    items.get(idx)
}

/// Resolves a concrete `(node_a, node_b)` pair for the chosen category. Returns
/// `None` if the universe can't supply one (e.g. no option nodes yet) or, for
/// option-option, the pair's edge was assessed within the last hour.
pub async fn pick_pair(store: &Store, category: DispatchCategory) -> Result<Option<(String, String)>, anyhow::Error> {
    match category {
        DispatchCategory::InvestibleBellwether => {
            let investibles = store.active_investibles().await?;
            let bellwethers = store.active_bellwethers().await?;
            Ok(match (pick_random(&investibles), pick_random(&bellwethers)) {
                (Some(a), Some(b)) => Some((a.clone(), b.clone())),
                _ => None,
            })
        }
        DispatchCategory::OptionBellwether => {
            let options = store.monitored_options().await?;
            let bellwethers = store.active_bellwethers().await?;
            Ok(match (pick_random(&options), pick_random(&bellwethers)) {
                (Some(a), Some(b)) => Some((a.clone(), b.clone())),
                _ => None,
            })
        }
        DispatchCategory::OptionOption => {
            let options = store.monitored_options().await?;
            if options.len() < 2 {
                return Ok(None);
            }
            let mut rng = rand::thread_rng();
            let i = rng.gen_range(0..options.len());
            let mut j = rng.gen_range(0..options.len());
            while j == i {
                j = rng.gen_range(0..options.len());
            }
            let (a, b) = (options[i].clone(), options[j].clone());

            if let Some(edge) = store.get_edge_between(&a, &b).await? {
                if let Some(last) = &edge.last_assessed {
                    if let Ok(last_ts) = chrono::DateTime::parse_from_rfc3339(last) {
                        let age = crate::clock::now().signed_duration_since(last_ts.with_timezone(&chrono::Utc));
                        if age.num_seconds() < OPTION_CHURN_WINDOW_SECS {
                            return Ok(None);
                        }
                    }
                }
            }
            Ok(Some((a, b)))
        }
    }
}

/// `correlates`/`inverse_correlates` from |c| ≥ 0.25, plus `liquidity_coupled` when
/// the bellwether side is the broad-market proxy and |c| ≥ 0.15.
pub fn derive_heuristic_channels(bellwether: &str, a_history: &[f64], b_history: &[f64]) -> HashMap<String, f64> {
    let c = corr(a_history, b_history);
    let mut channels = HashMap::new();

    if c.abs() >= 0.25 {
        let strength = (0.35 + 0.75 * c.abs()).min(1.0);
        let channel = if c >= 0.0 { "correlates" } else { "inverse_correlates" };
        channels.insert(channel.to_string(), strength);
    }
    if bellwether == BROAD_MARKET_PROXY && c.abs() >= 0.15 {
        let strength = (0.25 + 0.8 * c.abs()).min(1.0);
        channels.insert("liquidity_coupled".to_string(), strength);
    }
    channels
}

/// The narrow option-pair data this engine needs from the (externally owned) options
/// workflow: price history for the correlation base rule, plus per-leg IV history,
/// delta, vega, strike, expiration, and option type for the options-specific rules.
#[derive(Debug, Clone, Default)]
pub struct OptionPairInputs {
    pub underlying_history_a: Vec<f64>,
    pub underlying_history_b: Vec<f64>,
    pub iv_history_a: Vec<f64>,
    pub iv_history_b: Vec<f64>,
    pub delta_a: f64,
    pub delta_b: f64,
    pub vega_a: f64,
    pub vega_b: f64,
    pub opt_type_a: String,
    pub opt_type_b: String,
    pub strike_a: f64,
    pub strike_b: f64,
    pub expiration_a: String,
    pub expiration_b: String,
    /// True when A is an option node and B is a plain underlying/bellwether rather
    /// than another option — selects `options_hedges`/`cross_underlying_hedge` over
    /// the option-option spread rules.
    pub cross_underlying: bool,
}

/// Options-specific heuristic channels, applied on top of `derive_heuristic_channels`
/// for option-bellwether/option-option pairs.
pub fn derive_option_channels(inputs: &OptionPairInputs) -> HashMap<String, f64> {
    let mut channels = HashMap::new();

    let ivc = iv_corr(&inputs.iv_history_a, &inputs.iv_history_b);
    if ivc.abs() >= 0.25 {
        let strength = (0.35 + 0.75 * ivc.abs()).min(1.0);
        let channel = if ivc >= 0.0 { "iv_correlates" } else { "iv_inverse" };
        channels.insert(channel.to_string(), strength);
        channels.insert("vol_regime_coupled".to_string(), (0.30 + 0.6 * ivc.abs()).min(1.0));
    }

    if inputs.cross_underlying {
        let price_c = corr(&inputs.underlying_history_a, &inputs.underlying_history_b);
        if price_c.abs() >= 0.20 {
            channels.insert("options_hedges".to_string(), (0.30 + 0.7 * price_c.abs()).min(1.0));
            channels.insert("cross_underlying_hedge".to_string(), (0.25 + 0.65 * price_c.abs()).min(1.0));
        }
        return channels;
    }

    let alignment = delta_alignment(inputs.delta_a, inputs.delta_b);
    if !(0.40..=0.60).contains(&alignment) {
        channels.insert("delta_flow".to_string(), alignment);
    }

    let vega_sim = vega_similarity(inputs.vega_a, inputs.vega_b);
    if vega_sim >= 0.60 {
        channels.insert("vega_exposure".to_string(), vega_sim);
    }

    let (strategy, score) = spread_score(
        &inputs.opt_type_a,
        &inputs.opt_type_b,
        inputs.strike_a,
        inputs.strike_b,
        &inputs.expiration_a,
        &inputs.expiration_b,
    );
    match strategy {
        super::correlation::SpreadStrategy::Collar => {
            channels.insert("collar_strategy".to_string(), score);
        }
        super::correlation::SpreadStrategy::None => {}
        _ => {
            channels.insert("spread_strategy".to_string(), score);
        }
    }

    channels
}

#[derive(Debug, Deserialize, Default)]
pub struct AdjudicatorChannels {
    #[serde(default)]
    pub channels: HashMap<String, f64>,
    #[serde(default)]
    pub note: String,
}

const ADJUDICATOR_SYSTEM_PROMPT: &str = "You are a quantitative relationship adjudicator for a trading knowledge graph. \
Given two instruments and their recent behavior, respond ONLY with a JSON object of the \
form {\"channels\": {\"<channel name>\": <strength 0.10-1.00>, ...}, \"note\": \"<short rationale>\"}. \
Use channel names from: correlates, inverse_correlates, drives, hedges, liquidity_coupled, \
policy_exposed, sentiment_coupled, narrative_supports, narrative_contradicts, leads, lags, \
results_from, supply_chain_linked. Do not include any other keys or prose outside the JSON object.";

/// Consults the LLM for a channel set; returns `None` (heuristics stand) if the
/// adapter fails to parse or every returned strength is outside `[0.10, 1.00]`.
pub async fn adjudicate(adapter: &LlmAdapter, node_a: &str, node_b: &str, note_context: &str) -> Option<HashMap<String, f64>> {
    let user = format!(
        "Instrument A: {node_a}\nInstrument B: {node_b}\nContext: {note_context}\n\
         Propose the relationship channels and strengths between A and B."
    );
    let (parsed, _raw) = adapter.chat_json(ADJUDICATOR_SYSTEM_PROMPT, &user).await;
    let value = parsed?;
    let parsed: AdjudicatorChannels = serde_json::from_value(value).ok()?;

    let valid: HashMap<String, f64> = parsed
        .channels
        .into_iter()
        .filter(|(_, strength)| (0.10..=1.00).contains(strength))
        .collect();

    if valid.is_empty() {
        None
    } else {
        Some(valid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_category_is_always_investible_bellwether_when_options_disabled() {
        for _ in 0..20 {
            assert_eq!(pick_category(false), DispatchCategory::InvestibleBellwether);
        }
    }

    #[test]
    fn adjudication_probabilities_match_expected_values() {
        assert!((adjudication_probability(DispatchCategory::InvestibleBellwether) - 0.30).abs() < 1e-9);
        assert!((adjudication_probability(DispatchCategory::OptionBellwether) - 0.40).abs() < 1e-9);
        assert!((adjudication_probability(DispatchCategory::OptionOption) - 0.50).abs() < 1e-9);
    }

    #[test]
    fn heuristic_channels_add_liquidity_coupled_only_for_broad_market_proxy() {
        let a: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let b: Vec<f64> = (0..25).map(|i| 50.0 + i as f64 * 0.4).collect();
        let spy_channels = derive_heuristic_channels("SPY", &a, &b);
        assert!(spy_channels.contains_key("liquidity_coupled"));

        let qqq_channels = derive_heuristic_channels("QQQ", &a, &b);
        assert!(!qqq_channels.contains_key("liquidity_coupled"));
        assert!(qqq_channels.contains_key("correlates"));
    }

    #[test]
    fn option_channels_flag_strong_iv_correlation() {
        let iv_a: Vec<f64> = (0..15).map(|i| 0.20 + i as f64 * 0.01).collect();
        let iv_b: Vec<f64> = (0..15).map(|i| 0.22 + i as f64 * 0.011).collect();
        let inputs = OptionPairInputs {
            iv_history_a: iv_a,
            iv_history_b: iv_b,
            delta_a: 0.5,
            delta_b: 0.5,
            ..Default::default()
        };
        let channels = derive_option_channels(&inputs);
        assert!(channels.contains_key("iv_correlates") || channels.contains_key("iv_inverse"));
    }

    #[test]
    fn cross_underlying_pair_only_emits_hedge_channels() {
        let a: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let b: Vec<f64> = (0..25).map(|i| 50.0 + i as f64 * 0.4).collect();
        let inputs = OptionPairInputs {
            underlying_history_a: a,
            underlying_history_b: b,
            cross_underlying: true,
            delta_a: 1.0,
            delta_b: -1.0,
            ..Default::default()
        };
        let channels = derive_option_channels(&inputs);
        assert!(!channels.contains_key("delta_flow"));
    }
}
