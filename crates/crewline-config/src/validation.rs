// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes. Collects all violations rather than failing fast.

use crate::diagnostic::ConfigError;
use crate::model::CrewlineConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors.
pub fn validate_config(config: &CrewlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if config.sweep.tick_seconds == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.tick_seconds must be at least 1".to_string(),
        });
    }

    if config.sweep.grace_minutes == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.grace_minutes must be at least 1".to_string(),
        });
    }

    if !(1..=90).contains(&config.sweep.default_lookahead_days) {
        errors.push(ConfigError::Validation {
            message: format!(
                "sweep.default_lookahead_days must be in 1..=90, got {}",
                config.sweep.default_lookahead_days
            ),
        });
    }

    if config.sweep.max_shifts_per_sweep == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.max_shifts_per_sweep must be at least 1".to_string(),
        });
    }

    if config.sweep.max_candidates == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.max_candidates must be at least 1".to_string(),
        });
    }

    if config.sweep.generation_interval_minutes == 0 {
        errors.push(ConfigError::Validation {
            message: "sweep.generation_interval_minutes must be at least 1".to_string(),
        });
    }

    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.log_level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "log_level must be one of trace/debug/info/warn/error, got `{}`",
                config.log_level
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = CrewlineConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn collects_all_violations() {
        let mut config = CrewlineConfig::default();
        config.storage.database_path = "  ".to_string();
        config.sweep.grace_minutes = 0;
        config.sweep.max_shifts_per_sweep = 0;
        config.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4, "all violations should be reported");
    }

    #[test]
    fn lookahead_out_of_range_rejected() {
        let mut config = CrewlineConfig::default();
        config.sweep.default_lookahead_days = 365;
        assert!(validate_config(&config).is_err());

        config.sweep.default_lookahead_days = 90;
        assert!(validate_config(&config).is_ok());
    }
}
