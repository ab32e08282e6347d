// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Crewline configuration system.

use crewline_config::model::CrewlineConfig;
use crewline_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_crewline_config() {
    let toml = r#"
log_level = "debug"

[storage]
database_path = "/tmp/test.db"

[sweep]
generation_enabled = false
autofill_enabled = true
no_show_enabled = true
completion_enabled = false
tick_seconds = 60
grace_minutes = 15
default_lookahead_days = 7
max_shifts_per_sweep = 25
max_candidates = 40
generation_interval_minutes = 120
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.log_level, "debug");
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.sweep.generation_enabled);
    assert!(config.sweep.autofill_enabled);
    assert!(!config.sweep.completion_enabled);
    assert_eq!(config.sweep.tick_seconds, 60);
    assert_eq!(config.sweep.grace_minutes, 15);
    assert_eq!(config.sweep.default_lookahead_days, 7);
    assert_eq!(config.sweep.max_shifts_per_sweep, 25);
    assert_eq!(config.sweep.max_candidates, 40);
    assert_eq!(config.sweep.generation_interval_minutes, 120);
}

/// Unknown field in [sweep] produces an error instead of being ignored.
#[test]
fn unknown_field_in_sweep_produces_error() {
    let toml = r#"
[sweep]
grce_minutes = 20
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("grce_minutes"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.log_level, "info");
    assert!(config.sweep.generation_enabled);
    assert!(config.sweep.autofill_enabled);
    assert!(config.sweep.no_show_enabled);
    assert!(config.sweep.completion_enabled);
    assert_eq!(config.sweep.tick_seconds, 300);
    assert_eq!(config.sweep.grace_minutes, 30);
    assert_eq!(config.sweep.default_lookahead_days, 14);
    assert!(!config.storage.database_path.is_empty());
}

/// Environment variable CREWLINE_SWEEP_GRACE_MINUTES maps onto
/// sweep.grace_minutes despite the underscore in the key name.
#[test]
fn env_var_maps_underscore_keys_correctly() {
    use figment::providers::{Env, Format, Serialized, Toml};
    use figment::Figment;

    figment::Jail::expect_with(|jail| {
        jail.set_env("CREWLINE_SWEEP_GRACE_MINUTES", "45");
        jail.set_env("CREWLINE_STORAGE_DATABASE_PATH", "/var/lib/crew.db");

        let config: CrewlineConfig = Figment::new()
            .merge(Serialized::defaults(CrewlineConfig::default()))
            .merge(Toml::string(""))
            .merge(Env::prefixed("CREWLINE_").map(|key| {
                key.as_str()
                    .replacen("storage_", "storage.", 1)
                    .replacen("sweep_", "sweep.", 1)
                    .into()
            }))
            .extract()?;

        assert_eq!(config.sweep.grace_minutes, 45);
        assert_eq!(config.storage.database_path, "/var/lib/crew.db");
        Ok(())
    });
}

/// Semantic validation rejects out-of-range values after deserialization.
#[test]
fn validation_rejects_zero_caps() {
    let toml = r#"
[sweep]
max_shifts_per_sweep = 0
max_candidates = 0
"#;

    let errors = load_and_validate_str(toml).expect_err("zero caps should be rejected");
    assert_eq!(errors.len(), 2);
    let rendered: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
    assert!(rendered.iter().any(|m| m.contains("max_shifts_per_sweep")));
    assert!(rendered.iter().any(|m| m.contains("max_candidates")));
}

/// Validation accepts a fully-defaulted config.
#[test]
fn validation_accepts_defaults() {
    let config = load_and_validate_str("").expect("defaults should validate");
    assert_eq!(config.sweep.grace_minutes, 30);
}

/// Wrong type for a numeric field is a parse error.
#[test]
fn wrong_type_produces_error() {
    let toml = r#"
[sweep]
tick_seconds = "fast"
"#;

    assert!(load_config_from_str(toml).is_err());
}
