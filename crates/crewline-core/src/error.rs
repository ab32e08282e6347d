// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Crewline scheduling engine.

use thiserror::Error;

/// The primary error type used across the Crewline workspace.
#[derive(Debug, Error)]
pub enum CrewlineError {
    /// Malformed input rejected before any mutation (bad recurrence rule,
    /// time string, date window, ...). Always names the offending field.
    #[error("validation error on `{field}`: {message}")]
    Validation { field: String, message: String },

    /// Entity absent or not owned by the caller's company. Cross-tenant
    /// lookups report this identically to a true miss.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Rejected state change (edit after shift start, name collision, ...).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Worker-facing denial: bad check-in code, geofence miss, or a
    /// self-service action in the wrong workflow state.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Persisted configuration points at something that no longer exists.
    /// Self-healed by the sweep (disable + log), never surfaced to callers.
    #[error("stale configuration: {0}")]
    StaleConfiguration(String),

    /// Storage backend errors (database connection, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl CrewlineError {
    /// Build a `Validation` error naming the offending field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Build a `NotFound` error for the given entity kind and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, CrewlineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_names_field() {
        let err = CrewlineError::validation("start_time", "expected HH:MM");
        assert_eq!(
            err.to_string(),
            "validation error on `start_time`: expected HH:MM"
        );
    }

    #[test]
    fn not_found_never_leaks_ownership() {
        // Cross-tenant and true misses render identically.
        let a = CrewlineError::not_found("shift", "sh-1");
        let b = CrewlineError::not_found("shift", "sh-1");
        assert_eq!(a.to_string(), b.to_string());
    }
}
