// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Tokentally.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Top-level Tokentally configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TokentallyConfig {
    /// Log output settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Where and how tracked calls are persisted.
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Pricing overrides and the fallback tier.
    #[serde(default)]
    pub pricing: PricingConfig,
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Persistence and alerting settings for the cost engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Directory holding `cost_log.csv` and `session_costs.json`.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// Warn once when a session's running cost crosses this many USD.
    /// `None` disables the warning.
    #[serde(default = "default_session_cost_warning_usd")]
    pub session_cost_warning_usd: Option<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            session_cost_warning_usd: default_session_cost_warning_usd(),
        }
    }
}

fn default_log_dir() -> String {
    "logs/metrics".to_string()
}

fn default_session_cost_warning_usd() -> Option<f64> {
    Some(0.10)
}

/// Pricing configuration.
///
/// Entries in `models` override or extend the built-in pricing table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    /// Model whose rates apply to any model missing from the table.
    #[serde(default = "default_pricing_model")]
    pub default_model: String,

    /// Per-model rates keyed by exact model identifier.
    #[serde(default)]
    pub models: BTreeMap<String, ModelRate>,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            default_model: default_pricing_model(),
            models: BTreeMap::new(),
        }
    }
}

fn default_pricing_model() -> String {
    "gpt-4o-mini".to_string()
}

/// USD rates for one model, per million tokens.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ModelRate {
    pub input_per_mtok: f64,
    pub output_per_mtok: f64,
}
