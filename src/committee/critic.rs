//! Quality heuristic for a committee insight: rewards confidence, explanation
//! length, and reasoning language; penalizes overly aggressive plans.

use super::schema::{Action, Decision};

const KEYWORDS: &[&str] =
    &["because", "however", "therefore", "driven", "while", "but", "risk"];

pub fn critic_score(explanation: &str, decisions: &[Decision], confidence: f64, min_length: usize) -> f64 {
    let mut score = 0.22 + 0.48 * confidence.clamp(0.0, 1.0);

    if explanation.len() >= min_length {
        score += 0.10;
    }

    let lower = explanation.to_ascii_lowercase();
    if KEYWORDS.iter().any(|w| lower.contains(w)) {
        score += 0.10;
    }

    let buys = decisions
        .iter()
        .filter(|d| d.action == Action::Buy && d.allocation_pct > 0.0)
        .count();
    let sells = decisions
        .iter()
        .filter(|d| d.action == Action::Sell && d.allocation_pct > 0.0)
        .count();
    if buys >= 10 {
        score -= 0.06;
    }
    if sells >= 10 {
        score -= 0.04;
    }

    score.clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(ticker: &str, action: Action, pct: f64) -> Decision {
        Decision { ticker: ticker.to_string(), action, allocation_pct: pct, note: String::new() }
    }

    #[test]
    fn rewards_confidence_length_and_keywords() {
        let explanation = "We trim positions because risk is elevated; however leaders remain strong and therefore we add selectively while staying cautious.";
        let score = critic_score(explanation, &[], 0.8, 180.min(explanation.len()));
        assert!(score > 0.7);
    }

    #[test]
    fn penalizes_many_buys_and_sells() {
        let buys: Vec<Decision> = (0..11).map(|i| decision(&format!("T{i}"), Action::Buy, 5.0)).collect();
        let score_with_buys = critic_score("plain text of no particular keyword content here at all for length", &buys, 0.5, 9999);
        let score_without = critic_score("plain text of no particular keyword content here at all for length", &[], 0.5, 9999);
        assert!(score_with_buys < score_without);
    }

    #[test]
    fn seed_scenario_clears_star_threshold() {
        let explanation = "Risk-off regime because VIX is elevated and the dollar is firming; however we trim the weakest laggards and hold the remaining leaders while preserving a defensive cash buffer, but we stay flexible enough to rotate back toward risk assets once conditions settle, therefore this plan favors patience over conviction.";
        let decisions = vec![
            decision("A", Action::Sell, 15.0),
            decision("B", Action::Sell, 15.0),
            decision("C", Action::Sell, 15.0),
            decision("XLV", Action::Buy, 6.0),
        ];
        let score = critic_score(explanation, &decisions, 0.7, 180);
        assert!(score >= 0.72, "expected star-worthy score, got {score}");
    }
}
