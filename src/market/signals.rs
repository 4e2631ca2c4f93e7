//! Macro signals computed from bellwether daily change_pct. Each starts from a
//! neutral 0.5 and adds linear contributions from whichever bellwethers are
//! present; missing inputs contribute 0 rather than failing the tick.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Signals {
    pub risk_off: f64,
    pub rates_up: f64,
    pub oil_shock: f64,
    pub semi_pulse: f64,
}

fn clamp01(x: f64) -> f64 {
    x.max(0.0).min(1.0)
}

/// `changes` maps bellwether symbol to its `change_pct` (as a fraction, e.g. 0.01 for
/// 1%). Bond-yield proxy: if `^TNX` is absent but `TLT` is present, `rates_up` uses
/// `TLT`'s negated change as a stand-in for the yield move. Vol proxy: if `^VIX` is
/// absent but `VXX` is present, `risk_off` uses `VXX`'s change (same direction as VIX)
/// as a stand-in.
pub fn compute_signals(changes: &HashMap<String, f64>) -> Signals {
    let get = |sym: &str| changes.get(sym).copied().unwrap_or(0.0);

    let vix = if changes.contains_key("^VIX") { get("^VIX") } else { get("VXX") };
    let usd = get("UUP").max(get("DX-Y.NYB"));
    let spy = get("SPY");
    let qqq = get("QQQ");
    let tlt = get("TLT");
    let oil = if changes.contains_key("CL=F") { get("CL=F") } else { get("USO") };
    let tsm = get("TSM");

    let tnx = if changes.contains_key("^TNX") {
        get("^TNX")
    } else {
        -tlt
    };

    let risk_off = clamp01(0.50 + 0.06 * vix + 0.05 * usd - 0.05 * spy - 0.03 * qqq + 0.03 * tlt);
    let rates_up = clamp01(0.50 + 0.10 * tnx - 0.03 * tlt);
    let oil_shock = clamp01(0.50 + 0.06 * oil);
    let semi_pulse = clamp01(0.50 + 0.06 * tsm + 0.03 * qqq);

    Signals { risk_off, rates_up, oil_shock, semi_pulse }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_inputs_are_neutral() {
        let s = compute_signals(&HashMap::new());
        assert_eq!(s, Signals { risk_off: 0.5, rates_up: 0.5, oil_shock: 0.5, semi_pulse: 0.5 });
    }

    #[test]
    fn seed_scenario_matches_formula() {
        let mut changes = HashMap::new();
        changes.insert("SPY".to_string(), 0.010101);
        changes.insert("^VIX".to_string(), 0.20);
        let s = compute_signals(&changes);
        let expected = (0.50 + 0.06 * 0.20 - 0.05 * 0.010101f64).max(0.0).min(1.0);
        assert!((s.risk_off - expected).abs() < 1e-9);
    }

    #[test]
    fn rates_up_falls_back_to_negated_tlt_when_tnx_absent() {
        let mut changes = HashMap::new();
        changes.insert("TLT".to_string(), -0.02);
        let s = compute_signals(&changes);
        let expected = (0.50 + 0.10 * 0.02 - 0.03 * -0.02f64).max(0.0).min(1.0);
        assert!((s.rates_up - expected).abs() < 1e-9);
    }

    #[test]
    fn risk_off_falls_back_to_vxx_when_vix_absent() {
        let mut changes = HashMap::new();
        changes.insert("VXX".to_string(), 0.15);
        let s = compute_signals(&changes);
        let expected = (0.50 + 0.06 * 0.15f64).max(0.0).min(1.0);
        assert!((s.risk_off - expected).abs() < 1e-9);
    }

    #[test]
    fn extreme_inputs_clamp_to_unit_interval() {
        let mut changes = HashMap::new();
        changes.insert("^VIX".to_string(), 20.0);
        let s = compute_signals(&changes);
        assert_eq!(s.risk_off, 1.0);
    }
}
