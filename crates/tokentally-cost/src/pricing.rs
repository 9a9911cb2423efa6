// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model pricing tables and cost calculation.
//!
//! Built-in rates, USD per million tokens (input / output):
//!
//! gpt-4o-mini:                 0.15 / 0.60  (default tier)
//! gpt-4o:                      5.00 / 15.00
//! gpt-4:                       30.00 / 60.00
//! claude-3-5-sonnet-20241022:  3.00 / 15.00
//! claude-3-opus-20240229:      15.00 / 75.00
//! claude-3-haiku-20240307:     0.25 / 1.25
//!
//! Costs are rounded to 6 fractional digits, half away from zero, once at
//! calculation time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokentally_config::model::PricingConfig;
use tokentally_core::{TokenUsage, TokentallyError, round_usd};

/// Model whose rates apply when a model is missing from the table.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

const BUILTIN_RATES: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 5.00, 15.00),
    ("gpt-4", 30.00, 60.00),
    ("claude-3-5-sonnet-20241022", 3.00, 15.00),
    ("claude-3-opus-20240229", 15.00, 75.00),
    ("claude-3-haiku-20240307", 0.25, 1.25),
];

/// Per-model pricing in USD per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    /// Cost per million input tokens.
    pub input_per_mtok: f64,
    /// Cost per million output tokens.
    pub output_per_mtok: f64,
}

impl ModelPricing {
    pub const fn new(input_per_mtok: f64, output_per_mtok: f64) -> Self {
        Self {
            input_per_mtok,
            output_per_mtok,
        }
    }
}

/// Costs derived for one call, already rounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl CostBreakdown {
    /// Apply `pricing` to `usage`.
    ///
    /// The total is rounded from the unrounded sum, so it can differ from
    /// `input_cost + output_cost` in the last digit.
    pub fn compute(usage: &TokenUsage, pricing: &ModelPricing) -> Self {
        let input = (usage.input_tokens as f64 / 1_000_000.0) * pricing.input_per_mtok;
        let output = (usage.output_tokens as f64 / 1_000_000.0) * pricing.output_per_mtok;
        Self {
            input_cost: round_usd(input),
            output_cost: round_usd(output),
            total_cost: round_usd(input + output),
        }
    }
}

/// Reject model identifiers that cannot be logged or looked up meaningfully.
pub fn validate_model(model: &str) -> Result<(), TokentallyError> {
    if model.trim().is_empty() {
        return Err(TokentallyError::invalid_input(
            "model identifier must not be empty",
        ));
    }
    if model.chars().any(char::is_control) {
        return Err(TokentallyError::invalid_input(format!(
            "model identifier {model:?} contains control characters"
        )));
    }
    Ok(())
}

/// Exact-match pricing table with a named default tier.
#[derive(Debug, Clone)]
pub struct PricingTable {
    models: HashMap<String, ModelPricing>,
    default_model: String,
    default_pricing: ModelPricing,
}

impl PricingTable {
    /// The built-in table with `gpt-4o-mini` as the default tier.
    pub fn builtin() -> Self {
        let models = BUILTIN_RATES
            .iter()
            .map(|&(name, input, output)| (name.to_string(), ModelPricing::new(input, output)))
            .collect();
        Self {
            models,
            default_model: DEFAULT_MODEL.to_string(),
            default_pricing: ModelPricing::new(0.15, 0.60),
        }
    }

    /// Built-in table overlaid with the configured entries.
    ///
    /// Fails if `default_model` names a model present in neither.
    pub fn from_config(config: &PricingConfig) -> Result<Self, TokentallyError> {
        let mut table = Self::builtin();
        for (model, rate) in &config.models {
            table.insert(
                model.clone(),
                ModelPricing::new(rate.input_per_mtok, rate.output_per_mtok),
            );
        }
        table.set_default_model(&config.default_model)?;
        Ok(table)
    }

    /// Add or replace a model's rates.
    pub fn insert(&mut self, model: impl Into<String>, pricing: ModelPricing) {
        let model = model.into();
        if model == self.default_model {
            self.default_pricing = pricing;
        }
        self.models.insert(model, pricing);
    }

    /// Switch the fallback tier to an existing entry.
    pub fn set_default_model(&mut self, model: &str) -> Result<(), TokentallyError> {
        let pricing = self.models.get(model).copied().ok_or_else(|| {
            TokentallyError::Config(format!(
                "pricing.default_model `{model}` is not in the pricing table"
            ))
        })?;
        self.default_model = model.to_string();
        self.default_pricing = pricing;
        Ok(())
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Whether `model` has its own entry (as opposed to falling back).
    pub fn contains(&self, model: &str) -> bool {
        self.models.contains_key(model)
    }

    /// Look up pricing by exact model identifier, falling back to the
    /// default tier so tracking never blocks on an incomplete table.
    pub fn get_pricing(&self, model: &str) -> ModelPricing {
        self.models
            .get(model)
            .copied()
            .unwrap_or(self.default_pricing)
    }

    /// Validate the model identifier and price the usage.
    pub fn calculate_cost(
        &self,
        model: &str,
        usage: &TokenUsage,
    ) -> Result<CostBreakdown, TokentallyError> {
        validate_model(model)?;
        Ok(CostBreakdown::compute(usage, &self.get_pricing(model)))
    }
}

impl Default for PricingTable {
    fn default() -> Self {
        Self::builtin()
    }
}
