// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./tokentally.toml` > `~/.config/tokentally/tokentally.toml`
//! > `/etc/tokentally/tokentally.toml` with environment variable overrides via
//! the `TOKENTALLY_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::TokentallyConfig;

/// Config file name looked up in every hierarchy level.
pub const CONFIG_FILE_NAME: &str = "tokentally.toml";

/// System-wide config path.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/tokentally/tokentally.toml";

/// Per-user config path under the platform config dir, if one exists.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tokentally").join(CONFIG_FILE_NAME))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/tokentally/tokentally.toml` (system-wide)
/// 3. `~/.config/tokentally/tokentally.toml` (user XDG config)
/// 4. `./tokentally.toml` (local directory)
/// 5. `TOKENTALLY_*` environment variables
pub fn load_config() -> Result<TokentallyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
///
/// Used for testing and explicit configuration.
pub fn load_config_from_str(toml_content: &str) -> Result<TokentallyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TokentallyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<TokentallyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(TokentallyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used for hierarchy loading, before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(TokentallyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(CONFIG_FILE_NAME))
        .merge(env_provider())
}

/// Create the environment variable provider with explicit section mapping.
///
/// Uses `Env::map()` rather than `Env::split("_")` because key names contain
/// underscores: `TOKENTALLY_METRICS_LOG_DIR` must map to `metrics.log_dir`,
/// not `metrics.log.dir`.
fn env_provider() -> Env {
    Env::prefixed("TOKENTALLY_").map(|key| {
        let mapped = key
            .as_str()
            .to_ascii_lowercase()
            .replacen("logging_", "logging.", 1)
            .replacen("metrics_", "metrics.", 1)
            .replacen("pricing_", "pricing.", 1);
        mapped.into()
    })
}
