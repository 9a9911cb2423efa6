// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types used across the Tokentally crates.

use serde::{Deserialize, Serialize};

/// Token counts reported by a single call to a priced model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Number of prompt/input tokens.
    pub input_tokens: u64,
    /// Number of completion/output tokens.
    pub output_tokens: u64,
}

impl TokenUsage {
    pub fn new(input_tokens: u64, output_tokens: u64) -> Self {
        Self {
            input_tokens,
            output_tokens,
        }
    }

    /// Input plus output tokens.
    pub fn total(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Running (calls, tokens, cost) triple kept per agent and per model.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageTotals {
    pub calls: u64,
    pub tokens: u64,
    /// Accumulated cost in USD.
    pub cost: f64,
}

impl UsageTotals {
    /// Count one more call with the given tokens and cost.
    pub fn add_call(&mut self, tokens: u64, cost: f64) {
        self.calls += 1;
        self.tokens += tokens;
        self.cost += cost;
    }

    /// Fold another triple into this one.
    pub fn merge(&mut self, other: &UsageTotals) {
        self.calls += other.calls;
        self.tokens += other.tokens;
        self.cost += other.cost;
    }
}
