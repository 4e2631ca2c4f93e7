//! Indicators over a close-price history: momentum, volatility, z-score, RSI.
//! Population statistics (ddof=0) throughout.

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Indicators {
    pub mom5: f64,
    pub mom20: f64,
    pub volatility: f64,
    pub zscore: f64,
    pub rsi: f64,
}

impl Default for Indicators {
    fn default() -> Self {
        Self { mom5: 0.0, mom20: 0.0, volatility: 0.0, zscore: 0.0, rsi: 50.0 }
    }
}

fn mean(xs: &[f64]) -> f64 {
    xs.iter().sum::<f64>() / xs.len() as f64
}

fn population_std_dev(xs: &[f64]) -> f64 {
    let m = mean(xs);
    let variance = xs.iter().map(|x| (x - m).powi(2)).sum::<f64>() / xs.len() as f64;
    variance.sqrt()
}

/// Percentage returns with the denominator floored at 1e-9.
fn pct_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0].max(1e-9))
        .collect()
}

/// Requires at least 21 closes; otherwise returns the neutral default (`rsi=50`, all
/// else zero).
pub fn compute_indicators(closes: &[f64]) -> Indicators {
    if closes.len() < 21 {
        return Indicators::default();
    }

    let last = closes[closes.len() - 1];
    let mom5 = last / closes[closes.len() - 6] - 1.0;
    let mom20 = last / closes[closes.len() - 21] - 1.0;

    let returns = pct_returns(closes);
    let vol_window = &returns[returns.len() - 20..];
    let volatility = population_std_dev(vol_window);

    let last20 = &closes[closes.len() - 20..];
    let ma20 = mean(last20);
    let sd20 = population_std_dev(last20);
    let zscore = if sd20 > 0.0 { (last - ma20) / (sd20 + 1e-9) } else { 0.0 };

    let rsi_window = &returns[returns.len() - 14..];
    let gains: Vec<f64> = rsi_window.iter().map(|r| r.max(0.0)).collect();
    let losses: Vec<f64> = rsi_window.iter().map(|r| (-r).max(0.0)).collect();
    let avg_gain = mean(&gains);
    let avg_loss = mean(&losses);
    let rs = avg_gain / (avg_loss + 1e-9);
    let rsi = 100.0 - 100.0 / (1.0 + rs);

    Indicators { mom5, mom20, volatility, zscore, rsi }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_history_returns_neutral_defaults() {
        let closes = vec![100.0; 10];
        let ind = compute_indicators(&closes);
        assert_eq!(ind, Indicators::default());
    }

    #[test]
    fn flat_series_has_zero_momentum_and_neutral_rsi() {
        let closes = vec![100.0; 30];
        let ind = compute_indicators(&closes);
        assert!((ind.mom5).abs() < 1e-9);
        assert!((ind.mom20).abs() < 1e-9);
        assert!((ind.volatility).abs() < 1e-9);
        assert!((ind.rsi - 0.0).abs() < 1e-6);
    }

    #[test]
    fn steadily_rising_series_has_positive_momentum_and_high_rsi() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let ind = compute_indicators(&closes);
        assert!(ind.mom5 > 0.0);
        assert!(ind.mom20 > 0.0);
        assert!(ind.rsi > 90.0);
    }
}
