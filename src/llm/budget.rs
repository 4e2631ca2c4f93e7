//! Sliding-window call budget, shared process-wide per subsystem.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct Inner {
    calls_per_min: u32,
    window_start: Instant,
    calls: u32,
    last_error: Option<String>,
}

#[derive(Clone)]
pub struct LlmBudget {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct BudgetStats {
    pub calls_used: u32,
    pub calls_budget: u32,
    pub last_error: Option<String>,
}

impl LlmBudget {
    pub fn new(calls_per_min: u32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                calls_per_min: calls_per_min.max(1),
                window_start: Instant::now(),
                calls: 0,
                last_error: None,
            })),
        }
    }

    fn reset_if_needed(inner: &mut Inner) {
        if inner.window_start.elapsed() >= Duration::from_secs(60) {
            inner.window_start = Instant::now();
            inner.calls = 0;
        }
    }

    /// Non-blocking: true iff under budget for the trailing 60s window, in which case
    /// the call is recorded immediately.
    pub fn acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        Self::reset_if_needed(&mut inner);
        if inner.calls >= inner.calls_per_min {
            return false;
        }
        inner.calls += 1;
        true
    }

    pub fn set_last_error(&self, err: impl Into<String>) {
        self.inner.lock().last_error = Some(err.into());
    }

    pub fn clear_last_error(&self) {
        self.inner.lock().last_error = None;
    }

    pub fn stats(&self) -> BudgetStats {
        let mut inner = self.inner.lock();
        Self::reset_if_needed(&mut inner);
        BudgetStats {
            calls_used: inner.calls,
            calls_budget: inner.calls_per_min,
            last_error: inner.last_error.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denies_once_budget_exhausted_within_window() {
        let budget = LlmBudget::new(2);
        assert!(budget.acquire());
        assert!(budget.acquire());
        assert!(!budget.acquire());
        let stats = budget.stats();
        assert_eq!(stats.calls_used, 2);
        assert_eq!(stats.calls_budget, 2);
    }

    #[test]
    fn floors_calls_per_min_to_one() {
        let budget = LlmBudget::new(0);
        assert!(budget.acquire());
        assert!(!budget.acquire());
    }
}
