// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Call usage reported by callers and the priced record derived from it.

use std::time::Duration;

use chrono::{DateTime, SubsecRound, Utc};
use tokentally_core::TokenUsage;

use crate::pricing::CostBreakdown;

/// A finished call as reported by the code that made it.
#[derive(Debug, Clone, PartialEq)]
pub struct CallUsage {
    /// Opaque grouping key chosen by the caller.
    pub session_id: String,
    /// Logical actor that issued the call (e.g. "Planner").
    pub agent_name: String,
    /// Model identifier used for pricing lookup.
    pub model: String,
    /// Provider name (e.g. "openai", "anthropic").
    pub provider: String,
    pub usage: TokenUsage,
    /// Measured call latency; zero when unmeasured.
    pub latency: Duration,
}

impl CallUsage {
    pub fn new(
        session_id: impl Into<String>,
        agent_name: impl Into<String>,
        model: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            agent_name: agent_name.into(),
            model: model.into(),
            provider: provider.into(),
            usage: TokenUsage::default(),
            latency: Duration::ZERO,
        }
    }

    /// Set input and output token counts.
    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.usage = TokenUsage::new(input_tokens, output_tokens);
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }
}

/// One tracked call with its derived costs.
///
/// Built once when the call is tracked; costs are never recomputed.
#[derive(Debug, Clone, PartialEq)]
pub struct CallRecord {
    /// Completion time, truncated to microseconds so it survives the CSV log.
    pub timestamp: DateTime<Utc>,
    pub session_id: String,
    pub agent_name: String,
    pub model: String,
    pub provider: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub total_tokens: u64,
    /// USD, rounded to 6 decimals.
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub latency: Duration,
}

impl CallRecord {
    /// Build a record stamped with the current time.
    pub fn new(call: CallUsage, costs: CostBreakdown) -> Self {
        Self::at(Utc::now(), call, costs)
    }

    /// Build a record with an explicit completion time.
    pub fn at(timestamp: DateTime<Utc>, call: CallUsage, costs: CostBreakdown) -> Self {
        Self {
            timestamp: timestamp.trunc_subsecs(6),
            session_id: call.session_id,
            agent_name: call.agent_name,
            model: call.model,
            provider: call.provider,
            input_tokens: call.usage.input_tokens,
            output_tokens: call.usage.output_tokens,
            total_tokens: call.usage.total(),
            input_cost: costs.input_cost,
            output_cost: costs.output_cost,
            total_cost: costs.total_cost,
            latency: call.latency,
        }
    }

    /// Latency in fractional milliseconds, as written to the call log.
    pub fn latency_ms(&self) -> f64 {
        self.latency.as_secs_f64() * 1000.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Timelike};

    #[test]
    fn call_usage_defaults() {
        let call = CallUsage::new("s1", "Planner", "gpt-4o-mini", "openai");
        assert_eq!(call.usage, TokenUsage::default());
        assert_eq!(call.latency, Duration::ZERO);
    }

    #[test]
    fn record_copies_fields_and_totals_tokens() {
        let call = CallUsage::new("s1", "Recon", "gpt-4o", "openai")
            .with_tokens(2000, 1000)
            .with_latency(Duration::from_millis(1250));
        let costs = CostBreakdown {
            input_cost: 0.01,
            output_cost: 0.015,
            total_cost: 0.025,
        };
        let rec = CallRecord::new(call, costs);
        assert_eq!(rec.session_id, "s1");
        assert_eq!(rec.agent_name, "Recon");
        assert_eq!(rec.provider, "openai");
        assert_eq!(rec.total_tokens, 3000);
        assert_eq!(rec.total_cost, 0.025);
        assert!((rec.latency_ms() - 1250.0).abs() < 1e-9);
    }

    #[test]
    fn timestamp_is_truncated_to_micros() {
        let ts = Utc
            .with_ymd_and_hms(2026, 3, 1, 10, 0, 0)
            .unwrap()
            .with_nanosecond(123_456_789)
            .unwrap();
        let rec = CallRecord::at(
            ts,
            CallUsage::new("s", "a", "m", "p"),
            CostBreakdown::default(),
        );
        assert_eq!(rec.timestamp.timestamp_subsec_nanos(), 123_456_000);
    }
}
