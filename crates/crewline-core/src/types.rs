// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain entities and status enums for the scheduling engine.
//!
//! Status enums derive strum `Display`/`EnumString` with snake_case
//! serialization; the rendered string is exactly what is persisted in the
//! corresponding TEXT column, so `to_string()`/`parse()` round-trips through
//! the database.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle of a recurring series.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SeriesStatus {
    Active,
    Paused,
    Ended,
}

/// Lifecycle of one concrete dated shift.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    Scheduled,
    Cancelled,
    Completed,
}

/// Lifecycle of a (shift, worker) assignment.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    Invited,
    Accepted,
    Declined,
    CheckedIn,
    CheckedOut,
    Completed,
    NoShow,
    Cancelled,
}

impl AssignmentStatus {
    /// Terminal states admit no further transitions (re-applying the same
    /// status is a tolerated no-op).
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Declined | Self::Completed | Self::NoShow | Self::Cancelled
        )
    }

    /// The canonical "active for headcount" set: everything that still holds
    /// (or successfully held) a slot. Applied uniformly at every call site
    /// that computes open slots.
    pub fn counts_toward_headcount(self) -> bool {
        matches!(
            self,
            Self::Invited | Self::Accepted | Self::CheckedIn | Self::CheckedOut | Self::Completed
        )
    }
}

/// Whether an invitation was created by an employer action or by the
/// autonomous coverage sweep. The per-day invite cap only counts `Auto`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InviteOrigin {
    Manual,
    Auto,
}

/// Check-in vs check-out on the attendance ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceKind {
    CheckIn,
    CheckOut,
}

/// How an attendance event was captured.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttendanceMethod {
    #[strum(serialize = "self")]
    #[serde(rename = "self")]
    SelfService,
    Qr,
    Geo,
    EmployerConfirm,
}

/// Outcome of one autonomous sweep execution for a company.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Ok,
    Partial,
}

/// A circular geofence around a fixed coordinate, radius in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geofence {
    pub lat: f64,
    pub lng: f64,
    pub radius_m: f64,
}

/// Reusable shift definition owned by a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftTemplate {
    pub id: String,
    pub company_id: String,
    pub name: String,
    pub title: String,
    pub role_tag: String,
    pub location: String,
    pub department: Option<String>,
    pub headcount: u32,
    pub geofence: Option<Geofence>,
    pub created_at: DateTime<Utc>,
}

/// Fill target for a series' optional autofill hook: full headcount, or a
/// fixed number of slots per occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesFillMode {
    Headcount,
    Count(u32),
}

/// A recurrence rule bound to one template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftSeries {
    pub id: String,
    pub company_id: String,
    pub template_id: String,
    pub status: SeriesStatus,
    /// Repeat every N weeks, N >= 1.
    pub interval_weeks: u32,
    /// ISO weekday numbers, 1 = Monday .. 7 = Sunday. Never empty.
    pub days_of_week: Vec<u8>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub autofill_pool_id: Option<String>,
    pub autofill_mode: Option<SeriesFillMode>,
    pub auto_generate: bool,
    pub lookahead_days: u32,
    pub last_generated_at: Option<DateTime<Utc>>,
}

/// A `skip` exception: the expander excludes this date even though the
/// recurrence rule matches it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeriesException {
    pub series_id: String,
    pub date: NaiveDate,
}

/// One concrete dated occurrence, materialized from a series or created
/// ad hoc by an employer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shift {
    pub id: String,
    pub company_id: String,
    /// Back-reference to the producing series; `None` for ad hoc shifts.
    pub series_id: Option<String>,
    pub occurrence_date: Option<NaiveDate>,
    pub title: String,
    pub role_tag: String,
    pub location: String,
    pub department: Option<String>,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub headcount: u32,
    pub status: ShiftStatus,
    pub checkin_code_hash: Option<String>,
    pub code_rotated_at: Option<DateTime<Utc>>,
    pub geofence: Option<Geofence>,
    pub autofill_disabled: bool,
}

/// The unit the state machine operates on: one worker on one shift.
/// Unique per (shift, worker); re-inviting an existing pair is a no-op.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub id: String,
    pub shift_id: String,
    pub worker_id: String,
    pub status: AssignmentStatus,
    pub origin: InviteOrigin,
    pub invited_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub no_show_confirmed_at: Option<DateTime<Utc>>,
}

/// Employer-curated named list of workers used as the autofill source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPool {
    pub id: String,
    pub company_id: String,
    pub name: String,
}

/// Pool membership; `position` preserves insertion order for ranking
/// tie-breaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolMember {
    pub pool_id: String,
    pub worker_id: String,
    pub position: i64,
}

/// Per-(company, worker) employer annotation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerNote {
    pub company_id: String,
    pub worker_id: String,
    pub rating: Option<i64>,
    pub notes: Option<String>,
    pub preferred: bool,
    pub blocked: bool,
    pub block_reason: Option<String>,
}

/// Append-only attendance ledger row: the source of truth for check-ins,
/// distinct from the assignment's denormalized timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceEvent {
    pub id: String,
    pub assignment_id: String,
    pub kind: AttendanceKind,
    pub method: AttendanceMethod,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}

/// Per-company autofill and sweep configuration, defaulted lazily on first
/// read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanyOpsSettings {
    pub company_id: String,
    pub autofill_enabled: bool,
    pub autofill_pool_id: Option<String>,
    pub lookahead_days: u32,
    pub max_shifts_per_sweep: u32,
    pub max_invites_per_day: u32,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Audit record of one autonomous sweep execution for a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutopilotRun {
    pub id: String,
    pub company_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub shifts_processed: u32,
    pub workers_invited: u32,
    pub failures: u32,
    pub status: RunStatus,
}
