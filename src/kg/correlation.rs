//! Heuristic relationship math for the Dream worker's edge assessments: return
//! correlation over price history, and the option-pair predicates (IV correlation,
//! delta alignment, vega similarity, spread classification) used once options
//! monitoring is enabled.

/// Pearson correlation of percent returns over the last up-to-60 closes. `< 20`
/// closes in either series, or `< 10` resulting returns, yields 0.0 rather than an
/// unstable estimate.
pub fn corr(a: &[f64], b: &[f64]) -> f64 {
    if a.len() < 20 || b.len() < 20 {
        return 0.0;
    }
    let rx = pct_returns_tail(a, 60);
    let ry = pct_returns_tail(b, 60);
    if rx.len() < 10 || ry.len() < 10 {
        return 0.0;
    }
    pearson(&rx, &ry)
}

/// Pearson correlation on raw IV values (not returns) over the last up-to-30
/// samples, after dropping any pair with a non-positive or NaN entry.
pub fn iv_corr(iv_a: &[f64], iv_b: &[f64]) -> f64 {
    if iv_a.len() < 10 || iv_b.len() < 10 {
        return 0.0;
    }
    let n = iv_a.len().min(iv_b.len());
    let tail = 30.min(n);
    let xs = &iv_a[iv_a.len() - tail..];
    let ys = &iv_b[iv_b.len() - tail..];

    let mut x = Vec::with_capacity(tail);
    let mut y = Vec::with_capacity(tail);
    for (&xi, &yi) in xs.iter().zip(ys.iter()) {
        if xi > 0.0 && yi > 0.0 && !xi.is_nan() && !yi.is_nan() {
            x.push(xi);
            y.push(yi);
        }
    }
    if x.len() < 5 {
        return 0.0;
    }
    pearson(&x, &y)
}

/// `(delta_a*delta_b + 1) / 2`, so same-direction deltas score near 1.0 and
/// opposite-direction deltas score near 0.0.
pub fn delta_alignment(delta_a: f64, delta_b: f64) -> f64 {
    let d_a = delta_a.max(-1.0).min(1.0);
    let d_b = delta_b.max(-1.0).min(1.0);
    (d_a * d_b + 1.0) / 2.0
}

/// Ratio of smaller to larger absolute vega; both near-zero reads as neutral (0.5)
/// rather than maximally similar.
pub fn vega_similarity(vega_a: f64, vega_b: f64) -> f64 {
    let v_a = vega_a.abs();
    let v_b = vega_b.abs();
    if v_a < 0.01 && v_b < 0.01 {
        return 0.5;
    }
    v_a.min(v_b) / v_a.max(v_b).max(0.01)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpreadStrategy {
    Vertical,
    Horizontal,
    Diagonal,
    Collar,
    None,
}

impl SpreadStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpreadStrategy::Vertical => "vertical",
            SpreadStrategy::Horizontal => "horizontal",
            SpreadStrategy::Diagonal => "diagonal",
            SpreadStrategy::Collar => "collar",
            SpreadStrategy::None => "none",
        }
    }
}

/// Classifies a pair of monitored options into a spread shape from their
/// type/strike/expiration relationship. `opt_type_a`/`opt_type_b` are `"call"` or
/// `"put"` (case-insensitive).
pub fn spread_score(
    opt_type_a: &str,
    opt_type_b: &str,
    strike_a: f64,
    strike_b: f64,
    exp_a: &str,
    exp_b: &str,
) -> (SpreadStrategy, f64) {
    let same_type = opt_type_a.eq_ignore_ascii_case(opt_type_b);
    let same_exp = exp_a == exp_b;
    let strike_diff = (strike_a - strike_b).abs();
    let strike_ratio = strike_diff / strike_a.max(strike_b).max(1.0);

    if !same_type && same_exp {
        return if strike_ratio > 0.05 && strike_ratio < 0.25 {
            (SpreadStrategy::Collar, 0.85)
        } else {
            (SpreadStrategy::Collar, 0.65)
        };
    }
    if same_type && same_exp && strike_a != strike_b {
        return if strike_ratio > 0.02 && strike_ratio < 0.15 {
            (SpreadStrategy::Vertical, 0.90)
        } else {
            (SpreadStrategy::Vertical, 0.70)
        };
    }
    if same_type && !same_exp && strike_a == strike_b {
        return (SpreadStrategy::Horizontal, 0.80);
    }
    if same_type && !same_exp && strike_a != strike_b {
        return if strike_ratio > 0.02 && strike_ratio < 0.15 {
            (SpreadStrategy::Diagonal, 0.75)
        } else {
            (SpreadStrategy::Diagonal, 0.60)
        };
    }
    (SpreadStrategy::None, 0.0)
}

fn pct_returns_tail(series: &[f64], tail: usize) -> Vec<f64> {
    let take = tail.min(series.len());
    let window = &series[series.len() - take..];
    window
        .windows(2)
        .map(|w| (w[1] - w[0]) / w[0].abs().max(1e-9))
        .collect()
}

fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let dx = xi - mx;
        let dy = yi - my;
        cov += dx * dy;
        vx += dx * dx;
        vy += dy * dy;
    }
    if vx <= 0.0 || vy <= 0.0 {
        return 0.0;
    }
    let c = cov / (vx.sqrt() * vy.sqrt());
    if c.is_nan() || c.is_infinite() {
        return 0.0;
    }
    c.max(-1.0).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_history_yields_zero_correlation() {
        let a = vec![1.0; 10];
        let b = vec![1.0; 10];
        assert_eq!(corr(&a, &b), 0.0);
    }

    #[test]
    fn identical_moving_series_is_perfectly_correlated() {
        let a: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let b: Vec<f64> = (0..25).map(|i| 50.0 + i as f64 * 0.5).collect();
        let c = corr(&a, &b);
        assert!(c > 0.99, "expected near-perfect correlation, got {c}");
    }

    #[test]
    fn inverted_series_is_negatively_correlated() {
        let a: Vec<f64> = (0..25).map(|i| 100.0 + i as f64).collect();
        let b: Vec<f64> = (0..25).map(|i| 200.0 - i as f64).collect();
        let c = corr(&a, &b);
        assert!(c < -0.99, "expected near-perfect inverse correlation, got {c}");
    }

    #[test]
    fn delta_alignment_matches_examples() {
        assert!((delta_alignment(0.55, 0.60) - 0.665).abs() < 1e-9);
        assert!((delta_alignment(0.55, -0.50) - 0.3625).abs() < 1e-9);
    }

    #[test]
    fn vega_similarity_treats_both_negligible_as_neutral() {
        assert_eq!(vega_similarity(0.001, 0.002), 0.5);
        assert!((vega_similarity(1.0, 2.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn spread_score_classifies_vertical_and_collar() {
        let (s, score) = spread_score("call", "call", 100.0, 105.0, "2026-01-16", "2026-01-16");
        assert_eq!(s, SpreadStrategy::Vertical);
        assert!((score - 0.90).abs() < 1e-9);

        let (s, _) = spread_score("call", "put", 100.0, 90.0, "2026-01-16", "2026-01-16");
        assert_eq!(s, SpreadStrategy::Collar);
    }
}
