// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Crewline shift scheduling and coverage engine.
//!
//! This crate provides the foundational pieces shared by the rest of the
//! workspace: the error taxonomy, domain entities with exhaustive status
//! enums, the assignment transition table, the pure calendar expander,
//! geofence math, check-in code hashing, and the outbound collaborator
//! traits (notifications, trust signals).

pub mod calendar;
pub mod code;
pub mod error;
pub mod geo;
pub mod traits;
pub mod transition;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{CrewlineError, Result};
pub use traits::{Notification, Notifier, NullOutbound, TrustSignals};
pub use transition::{plan, Actor, StampField, TransitionPlan};
pub use types::{
    AssignmentStatus, AttendanceEvent, AttendanceKind, AttendanceMethod, AutopilotRun,
    CompanyOpsSettings, Geofence, InviteOrigin, RunStatus, SeriesException, SeriesFillMode,
    SeriesStatus, Shift, ShiftAssignment, ShiftSeries, ShiftStatus, ShiftTemplate, WorkerNote,
    WorkerPool, WorkerPoolMember,
};
