// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assignment persistence and the transactional transition apply.
//!
//! [`apply_transition`] is the only place an assignment's status column is
//! rewritten (besides the cancellation cascade in the shifts module). It
//! re-reads the current status and stamps timestamps inside one transaction
//! on the single writer, so two racing actors serialize and the loser's
//! request is re-planned against the winner's result.

use chrono::{DateTime, Utc};
use crewline_core::transition::{self, Actor, StampField, TransitionPlan};
use crewline_core::types::AssignmentStatus;
use crewline_core::CrewlineError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{enum_from_sql, opt_ts_from_sql, ts_from_sql, ts_to_sql, ShiftAssignment};

/// The canonical "active for headcount" set as a SQL IN-list. Every query
/// that computes open slots or cap usage goes through this one literal.
pub const ACTIVE_STATUS_SQL: &str =
    "('invited', 'accepted', 'checked_in', 'checked_out', 'completed')";

const ASSIGNMENT_COLS: &str = "id, shift_id, worker_id, status, origin, invited_at, \
     responded_at, check_in_at, check_out_at, completed_at, no_show_confirmed_at";

fn row_to_assignment(row: &rusqlite::Row<'_>) -> Result<ShiftAssignment, rusqlite::Error> {
    Ok(ShiftAssignment {
        id: row.get(0)?,
        shift_id: row.get(1)?,
        worker_id: row.get(2)?,
        status: enum_from_sql(3, row.get(3)?)?,
        origin: enum_from_sql(4, row.get(4)?)?,
        invited_at: ts_from_sql(5, row.get(5)?)?,
        responded_at: opt_ts_from_sql(6, row.get(6)?)?,
        check_in_at: opt_ts_from_sql(7, row.get(7)?)?,
        check_out_at: opt_ts_from_sql(8, row.get(8)?)?,
        completed_at: opt_ts_from_sql(9, row.get(9)?)?,
        no_show_confirmed_at: opt_ts_from_sql(10, row.get(10)?)?,
    })
}

/// Invite a worker to a shift. Returns true when a new row was created;
/// false when the (shift, worker) pair already exists and the write was
/// absorbed (re-invites never reset an existing assignment).
pub async fn invite(db: &Database, assignment: &ShiftAssignment) -> Result<bool, CrewlineError> {
    let a = assignment.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "INSERT OR IGNORE INTO shift_assignments \
                 (id, shift_id, worker_id, status, origin, invited_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    a.id,
                    a.shift_id,
                    a.worker_id,
                    a.status.to_string(),
                    a.origin.to_string(),
                    ts_to_sql(a.invited_at),
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get an assignment by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<ShiftAssignment>, CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ASSIGNMENT_COLS} FROM shift_assignments WHERE id = ?1"
            ))?;
            match stmt.query_row(params![id], row_to_assignment) {
                Ok(a) => Ok(Some(a)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the unique assignment for a (shift, worker) pair.
pub async fn get_by_pair(
    db: &Database,
    shift_id: &str,
    worker_id: &str,
) -> Result<Option<ShiftAssignment>, CrewlineError> {
    let shift_id = shift_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ASSIGNMENT_COLS} FROM shift_assignments \
                 WHERE shift_id = ?1 AND worker_id = ?2"
            ))?;
            match stmt.query_row(params![shift_id, worker_id], row_to_assignment) {
                Ok(a) => Ok(Some(a)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All assignments on a shift, invitation order.
pub async fn list_for_shift(
    db: &Database,
    shift_id: &str,
) -> Result<Vec<ShiftAssignment>, CrewlineError> {
    let shift_id = shift_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ASSIGNMENT_COLS} FROM shift_assignments \
                 WHERE shift_id = ?1 ORDER BY invited_at, id"
            ))?;
            let rows = stmt.query_map(params![shift_id], row_to_assignment)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A worker's assignments, most recent invitation first.
pub async fn list_for_worker(
    db: &Database,
    worker_id: &str,
) -> Result<Vec<ShiftAssignment>, CrewlineError> {
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {ASSIGNMENT_COLS} FROM shift_assignments \
                 WHERE worker_id = ?1 ORDER BY invited_at DESC, id"
            ))?;
            let rows = stmt.query_map(params![worker_id], row_to_assignment)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Result of a transactional transition apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The status was rewritten; carries the new status.
    Applied(AssignmentStatus),
    /// The assignment already held the target status.
    NoOp,
    /// The transition table rejected (current, target, actor).
    Illegal { current: AssignmentStatus },
    Missing,
}

fn stamp_column(field: StampField) -> &'static str {
    match field {
        StampField::RespondedAt => "responded_at",
        StampField::CheckInAt => "check_in_at",
        StampField::CheckOutAt => "check_out_at",
        StampField::CompletedAt => "completed_at",
        StampField::NoShowConfirmedAt => "no_show_confirmed_at",
    }
}

/// Move an assignment to `target` on behalf of `actor`.
///
/// Read-plan-write happens in one transaction. Timestamp columns are
/// first-write-wins via COALESCE, so a status reached twice keeps its
/// original stamp.
pub async fn apply_transition(
    db: &Database,
    id: &str,
    target: AssignmentStatus,
    actor: Actor,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<TransitionOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let current: Option<String> = match tx.query_row(
                "SELECT status FROM shift_assignments WHERE id = ?1",
                params![id],
                |row| row.get(0),
            ) {
                Ok(v) => Some(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e),
            };
            let Some(current) = current else {
                tx.commit()?;
                return Ok(TransitionOutcome::Missing);
            };
            let current: AssignmentStatus = enum_from_sql(0, current)?;

            let outcome = match transition::plan(current, target, actor) {
                TransitionPlan::NoOp => TransitionOutcome::NoOp,
                TransitionPlan::Illegal => TransitionOutcome::Illegal { current },
                TransitionPlan::Apply(stamp) => {
                    match stamp {
                        Some(field) => {
                            let col = stamp_column(field);
                            tx.execute(
                                &format!(
                                    "UPDATE shift_assignments \
                                     SET status = ?1, {col} = COALESCE({col}, ?2) \
                                     WHERE id = ?3"
                                ),
                                params![target.to_string(), ts_to_sql(now), id],
                            )?;
                        }
                        None => {
                            tx.execute(
                                "UPDATE shift_assignments SET status = ?1 WHERE id = ?2",
                                params![target.to_string(), id],
                            )?;
                        }
                    }
                    TransitionOutcome::Applied(target)
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Number of assignments on a shift that count toward headcount.
pub async fn count_active(db: &Database, shift_id: &str) -> Result<u32, CrewlineError> {
    let shift_id = shift_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                &format!(
                    "SELECT COUNT(*) FROM shift_assignments \
                     WHERE shift_id = ?1 AND status IN {ACTIVE_STATUS_SQL}"
                ),
                params![shift_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Sweep-originated invitations for a company since `cutoff`. Feeds the
/// per-day auto-invite cap.
pub async fn count_auto_invites_since(
    db: &Database,
    company_id: &str,
    cutoff: DateTime<Utc>,
) -> Result<u32, CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM shift_assignments a \
                 JOIN shifts s ON s.id = a.shift_id \
                 WHERE s.company_id = ?1 AND a.origin = 'auto' AND a.invited_at >= ?2",
                params![company_id, ts_to_sql(cutoff)],
                |row| row.get(0),
            )
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Open assignments (invited or accepted) on scheduled shifts that ended
/// before `cutoff`: the no-show sweep's work queue, oldest shift first.
pub async fn list_no_show_candidates(
    db: &Database,
    cutoff: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<ShiftAssignment>, CrewlineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT a.id, a.shift_id, a.worker_id, a.status, a.origin, a.invited_at, \
                        a.responded_at, a.check_in_at, a.check_out_at, a.completed_at, \
                        a.no_show_confirmed_at \
                 FROM shift_assignments a \
                 JOIN shifts s ON s.id = a.shift_id \
                 WHERE a.status IN ('invited', 'accepted') \
                   AND s.status = 'scheduled' AND s.end_at < ?1 \
                 ORDER BY s.end_at, a.id LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![ts_to_sql(cutoff), limit], row_to_assignment)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
