// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Crewline engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use serde::{Deserialize, Serialize};

/// Top-level Crewline configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CrewlineConfig {
    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Background sweep settings.
    #[serde(default)]
    pub sweep: SweepConfig,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("crewline/crewline.db").display().to_string())
        .unwrap_or_else(|| "crewline.db".to_string())
}

/// Background sweep configuration.
///
/// Each sweep job is independently toggleable; `run_*_once` entry points on
/// the scheduler ignore the toggles so tests can drive one job in isolation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    /// Series auto-generation sweep on/off.
    #[serde(default = "default_true")]
    pub generation_enabled: bool,

    /// Coverage auto-fill sweep on/off.
    #[serde(default = "default_true")]
    pub autofill_enabled: bool,

    /// No-show detection sweep on/off.
    #[serde(default = "default_true")]
    pub no_show_enabled: bool,

    /// Completion promotion sweep on/off.
    #[serde(default = "default_true")]
    pub completion_enabled: bool,

    /// Seconds between ticks of each sweep job.
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,

    /// Grace period after shift end before no-show / completion kick in.
    #[serde(default = "default_grace_minutes")]
    pub grace_minutes: u32,

    /// Lookahead window for series auto-generation when the series does not
    /// carry its own.
    #[serde(default = "default_lookahead_days")]
    pub default_lookahead_days: u32,

    /// Hard cap on shifts touched in a single autofill sweep tick.
    #[serde(default = "default_max_shifts_per_sweep")]
    pub max_shifts_per_sweep: u32,

    /// Hard cap on candidates returned by a single ranking call.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: u32,

    /// Minimum minutes between auto-generation passes for one series.
    #[serde(default = "default_generation_interval_minutes")]
    pub generation_interval_minutes: u32,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            generation_enabled: true,
            autofill_enabled: true,
            no_show_enabled: true,
            completion_enabled: true,
            tick_seconds: default_tick_seconds(),
            grace_minutes: default_grace_minutes(),
            default_lookahead_days: default_lookahead_days(),
            max_shifts_per_sweep: default_max_shifts_per_sweep(),
            max_candidates: default_max_candidates(),
            generation_interval_minutes: default_generation_interval_minutes(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_tick_seconds() -> u64 {
    300
}

fn default_grace_minutes() -> u32 {
    30
}

fn default_lookahead_days() -> u32 {
    14
}

fn default_max_shifts_per_sweep() -> u32 {
    50
}

fn default_max_candidates() -> u32 {
    100
}

fn default_generation_interval_minutes() -> u32 {
    360
}
