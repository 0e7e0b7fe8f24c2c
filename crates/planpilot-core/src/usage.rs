use serde::{Deserialize, Serialize};

/// Token counts reported by a single generation call.
///
/// Returned alongside each refinement so the caller can account for
/// spend explicitly; there is no process-wide counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Running totals accumulated across planning cycles.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct UsageTotals {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub calls: u64,
}

impl UsageTotals {
    pub fn record(&mut self, usage: TokenUsage) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.calls += 1;
    }

    /// Dollar estimate for the accumulated usage. Unknown models cost 0;
    /// the table only covers the models the refiner defaults between.
    pub fn estimated_cost(&self, model: &str) -> f64 {
        let prompt = self.prompt_tokens as f64;
        let completion = self.completion_tokens as f64;
        if model.starts_with("gpt-4") {
            prompt / 1000.0 * 0.03 + completion / 1000.0 * 0.06
        } else if model.starts_with("gpt-3.5-turbo") {
            (prompt + completion) / 1000.0 * 0.0002
        } else {
            0.0
        }
    }
}
