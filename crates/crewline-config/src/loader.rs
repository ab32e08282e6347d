// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./crewline.toml` > `~/.config/crewline/crewline.toml`
//! > `/etc/crewline/crewline.toml` with environment variable overrides via
//! `CREWLINE_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::CrewlineConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/crewline/crewline.toml` (system-wide)
/// 3. `~/.config/crewline/crewline.toml` (user XDG config)
/// 4. `./crewline.toml` (local directory)
/// 5. `CREWLINE_*` environment variables
pub fn load_config() -> Result<CrewlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrewlineConfig::default()))
        .merge(Toml::file("/etc/crewline/crewline.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("crewline/crewline.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("crewline.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<CrewlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrewlineConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<CrewlineConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(CrewlineConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `CREWLINE_SWEEP_GRACE_MINUTES` must map
/// to `sweep.grace_minutes`, not `sweep.grace.minutes`.
fn env_provider() -> Env {
    Env::prefixed("CREWLINE_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("storage_", "storage.", 1)
            .replacen("sweep_", "sweep.", 1);
        mapped.into()
    })
}
