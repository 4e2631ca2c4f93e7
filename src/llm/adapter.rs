//! JSON-only chat adapter: budget-gated, with bounded re-ask on parse failure.
//! Never throws to callers — every failure mode is in-band as `(None, raw)`.

use super::budget::LlmBudget;
use super::json_extract::extract_json;
use super::provider::ChatProvider;
use serde_json::Value;

const REPAIR_INSTRUCTION: &str =
    "Your prior output was not valid JSON. Respond with ONLY one valid JSON object; no extra text.";

pub struct LlmAdapter {
    provider: Box<dyn ChatProvider>,
    budget: LlmBudget,
    max_reask: u32,
}

impl LlmAdapter {
    pub fn new(provider: Box<dyn ChatProvider>, budget: LlmBudget, max_reask: u32) -> Self {
        Self { provider, budget, max_reask }
    }

    pub fn budget(&self) -> &LlmBudget {
        &self.budget
    }

    /// `(parsed, raw)`. `parsed` is `None` on budget exhaustion, transport failure, or
    /// exhausted re-asks; `raw` carries the last raw text seen, if any.
    pub async fn chat_json(&self, system: &str, user: &str) -> (Option<Value>, Option<String>) {
        if !self.budget.acquire() {
            return (None, None);
        }

        let mut conversation_user = user.to_string();
        let mut last_raw: Option<String> = None;

        for attempt in 0..=self.max_reask {
            let raw = match self.provider.chat(system, &conversation_user).await {
                Ok(raw) => raw,
                Err(e) => {
                    self.budget.set_last_error(e.to_string());
                    return (None, last_raw);
                }
            };
            last_raw = Some(raw.clone());

            if let Some(parsed) = extract_json(&raw) {
                self.budget.clear_last_error();
                return (Some(parsed), last_raw);
            }

            if attempt < self.max_reask {
                conversation_user =
                    format!("{conversation_user}\n\nPrior output:\n{raw}\n\n{REPAIR_INSTRUCTION}");
            }
        }

        self.budget.set_last_error("parse_fail");
        (None, last_raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedProvider {
        replies: Vec<&'static str>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ChatProvider for ScriptedProvider {
        async fn chat(&self, _system: &str, _user: &str) -> anyhow::Result<String> {
            let i = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.replies.get(i).copied().unwrap_or("").to_string())
        }
    }

    #[tokio::test]
    async fn tier_one_extraction_needs_no_reask() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider {
            replies: vec!["Sure, here: {\"a\":1} and some trailing text."],
            calls: calls.clone(),
        };
        let adapter = LlmAdapter::new(Box::new(provider), LlmBudget::new(10), 1);
        let (parsed, _raw) = adapter.chat_json("sys", "usr").await;
        assert_eq!(parsed.unwrap()["a"], 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn reasks_once_then_succeeds() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider {
            replies: vec!["not json at all", "{\"a\":2}"],
            calls: calls.clone(),
        };
        let adapter = LlmAdapter::new(Box::new(provider), LlmBudget::new(10), 1);
        let (parsed, _raw) = adapter.chat_json("sys", "usr").await;
        assert_eq!(parsed.unwrap()["a"], 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn exhausts_reasks_and_sets_parse_fail() {
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider {
            replies: vec!["nope", "still nope"],
            calls: calls.clone(),
        };
        let budget = LlmBudget::new(10);
        let adapter = LlmAdapter::new(Box::new(provider), budget.clone(), 1);
        let (parsed, raw) = adapter.chat_json("sys", "usr").await;
        assert!(parsed.is_none());
        assert_eq!(raw.as_deref(), Some("still nope"));
        assert_eq!(budget.stats().last_error.as_deref(), Some("parse_fail"));
    }

    #[tokio::test]
    async fn budget_exhaustion_short_circuits() {
        let budget = LlmBudget::new(1);
        assert!(budget.acquire());
        let calls = Arc::new(AtomicUsize::new(0));
        let provider = ScriptedProvider { replies: vec!["{\"a\":1}"], calls: calls.clone() };
        let adapter = LlmAdapter::new(Box::new(provider), budget, 1);
        let (parsed, raw) = adapter.chat_json("sys", "usr").await;
        assert!(parsed.is_none());
        assert!(raw.is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
