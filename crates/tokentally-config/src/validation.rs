// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks semantic constraints that serde attributes cannot express, such as
//! non-empty paths, known log levels and non-negative prices.

use crate::diagnostic::ConfigError;
use crate::model::TokentallyConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns every validation error found rather than stopping at the first.
pub fn validate_config(config: &TokentallyConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    let level = config.logging.level.trim().to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if config.metrics.log_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "metrics.log_dir must not be empty".to_string(),
        });
    }

    if let Some(threshold) = config.metrics.session_cost_warning_usd {
        if !threshold.is_finite() || threshold < 0.0 {
            errors.push(ConfigError::Validation {
                message: format!(
                    "metrics.session_cost_warning_usd must be non-negative, got {threshold}"
                ),
            });
        }
    }

    if config.pricing.default_model.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "pricing.default_model must not be empty".to_string(),
        });
    }

    for (model, rate) in &config.pricing.models {
        if model.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: "pricing.models keys must not be empty".to_string(),
            });
        }
        for (field, value) in [
            ("input_per_mtok", rate.input_per_mtok),
            ("output_per_mtok", rate.output_per_mtok),
        ] {
            if !value.is_finite() || value < 0.0 {
                errors.push(ConfigError::Validation {
                    message: format!(
                        "pricing.models.\"{model}\".{field} must be non-negative, got {value}"
                    ),
                });
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
