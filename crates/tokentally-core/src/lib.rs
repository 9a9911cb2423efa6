// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for Tokentally.
//!
//! Holds the error type and the small value types shared by the cost engine,
//! the trace logger and the analysis CLI.

pub mod error;
pub mod types;

pub use error::TokentallyError;
pub use types::{TokenUsage, UsageTotals};

/// Round a USD amount to 6 fractional digits, half away from zero.
///
/// Every derived cost goes through this exactly once, at record creation.
pub fn round_usd(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_render() {
        let invalid = TokentallyError::invalid_input("model must not be empty");
        assert_eq!(invalid.to_string(), "invalid input: model must not be empty");

        let persistence = TokentallyError::persistence(
            "/tmp/cost_log.csv",
            std::io::Error::other("disk full"),
        );
        assert!(persistence.is_persistence());
        assert_eq!(
            persistence.to_string(),
            "persistence error at /tmp/cost_log.csv: disk full"
        );

        let _config = TokentallyError::Config("test".into());
        let _internal = TokentallyError::Internal("test".into());
    }

    #[test]
    fn round_usd_half_away_from_zero() {
        assert_eq!(round_usd(0.1234567), 0.123457);
        assert_eq!(round_usd(-0.1234567), -0.123457);
        assert_eq!(round_usd(0.0000004), 0.0);
        assert_eq!(round_usd(0.15), 0.15);
        assert_eq!(round_usd(0.0), 0.0);
    }

    #[test]
    fn token_usage_total() {
        let usage = TokenUsage::new(1000, 500);
        assert_eq!(usage.total(), 1500);
        assert_eq!(TokenUsage::default().total(), 0);
    }

    #[test]
    fn usage_totals_add_and_merge() {
        let mut a = UsageTotals::default();
        a.add_call(100, 0.5);
        a.add_call(50, 0.25);
        assert_eq!(a.calls, 2);
        assert_eq!(a.tokens, 150);

        let mut b = UsageTotals::default();
        b.add_call(10, 0.25);
        b.merge(&a);
        assert_eq!(b.calls, 3);
        assert_eq!(b.tokens, 160);
        assert!((b.cost - 1.0).abs() < 1e-12);
    }

    #[test]
    fn usage_totals_serialization() {
        let totals = UsageTotals {
            calls: 2,
            tokens: 1500,
            cost: 0.00045,
        };
        let json = serde_json::to_string(&totals).expect("should serialize");
        assert_eq!(json, r#"{"calls":2,"tokens":1500,"cost":0.00045}"#);
        let parsed: UsageTotals = serde_json::from_str(&json).expect("should deserialize");
        assert_eq!(parsed, totals);
    }
}
