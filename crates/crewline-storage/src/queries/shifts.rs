// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dated shift persistence: materialization, schedule edits, cancellation
//! with assignment cascade, check-in code and geofence columns.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use crewline_core::CrewlineError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{
    date_from_sql, date_to_sql, enum_from_sql, geofence_from_cols, opt_date_from_sql,
    opt_ts_from_sql, opt_ts_to_sql, ts_from_sql, ts_to_sql, Geofence, Shift,
};

const SHIFT_COLS: &str = "id, company_id, series_id, occurrence_date, title, role_tag, location, \
     department, start_at, end_at, headcount, status, checkin_code_hash, code_rotated_at, \
     geofence_lat, geofence_lng, geofence_radius_m, autofill_disabled";

fn row_to_shift(row: &rusqlite::Row<'_>) -> Result<Shift, rusqlite::Error> {
    Ok(Shift {
        id: row.get(0)?,
        company_id: row.get(1)?,
        series_id: row.get(2)?,
        occurrence_date: opt_date_from_sql(3, row.get(3)?)?,
        title: row.get(4)?,
        role_tag: row.get(5)?,
        location: row.get(6)?,
        department: row.get(7)?,
        start_at: ts_from_sql(8, row.get(8)?)?,
        end_at: ts_from_sql(9, row.get(9)?)?,
        headcount: row.get(10)?,
        status: enum_from_sql(11, row.get(11)?)?,
        checkin_code_hash: row.get(12)?,
        code_rotated_at: opt_ts_from_sql(13, row.get(13)?)?,
        geofence: geofence_from_cols(row.get(14)?, row.get(15)?, row.get(16)?),
        autofill_disabled: row.get(17)?,
    })
}

/// INSERT OR IGNORE the row; returns the number of rows written (0 when the
/// unique (series, occurrence date) slot absorbed the write).
fn insert_shift(conn: &rusqlite::Connection, s: &Shift) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "INSERT OR IGNORE INTO shifts (id, company_id, series_id, occurrence_date, title, \
         role_tag, location, department, start_at, end_at, headcount, status, \
         checkin_code_hash, code_rotated_at, geofence_lat, geofence_lng, geofence_radius_m, \
         autofill_disabled) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            s.id,
            s.company_id,
            s.series_id,
            s.occurrence_date.map(date_to_sql),
            s.title,
            s.role_tag,
            s.location,
            s.department,
            ts_to_sql(s.start_at),
            ts_to_sql(s.end_at),
            s.headcount,
            s.status.to_string(),
            s.checkin_code_hash,
            opt_ts_to_sql(s.code_rotated_at),
            s.geofence.map(|g| g.lat),
            s.geofence.map(|g| g.lng),
            s.geofence.map(|g| g.radius_m),
            s.autofill_disabled,
        ],
    )
}

/// Insert a shift materialized from a series. Returns false when the
/// (series, occurrence date) slot is already taken, in which case the write
/// is absorbed and the existing row is untouched.
pub async fn materialize(db: &Database, shift: &Shift) -> Result<bool, CrewlineError> {
    debug_assert!(shift.series_id.is_some() && shift.occurrence_date.is_some());
    let s = shift.clone();
    db.connection()
        .call(move |conn| {
            let changed = insert_shift(conn, &s)?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert an ad hoc shift. Duplicate ids are a `Conflict`.
pub async fn create(db: &Database, shift: &Shift) -> Result<(), CrewlineError> {
    let s = shift.clone();
    let inserted = db
        .connection()
        .call(move |conn| {
            let changed = insert_shift(conn, &s)?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(CrewlineError::Conflict(format!(
            "shift `{}` already exists",
            shift.id
        )))
    }
}

/// Get a shift by id within a company.
pub async fn get(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<Shift>, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SHIFT_COLS} FROM shifts WHERE id = ?1 AND company_id = ?2"
            ))?;
            match stmt.query_row(params![id, company_id], row_to_shift) {
                Ok(shift) => Ok(Some(shift)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a shift by bare id, for flows keyed by assignment rather than
/// company (check-in verification).
pub async fn get_by_id(db: &Database, id: &str) -> Result<Option<Shift>, CrewlineError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {SHIFT_COLS} FROM shifts WHERE id = ?1"))?;
            match stmt.query_row(params![id], row_to_shift) {
                Ok(shift) => Ok(Some(shift)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a company's shifts in a start window, soonest first.
pub async fn list(
    db: &Database,
    company_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<Shift>, CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SHIFT_COLS} FROM shifts \
                 WHERE company_id = ?1 AND start_at >= ?2 AND start_at < ?3 \
                 ORDER BY start_at, id"
            ))?;
            let rows = stmt.query_map(
                params![company_id, ts_to_sql(from), ts_to_sql(to)],
                row_to_shift,
            )?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Occurrence dates already materialized for a series. Feeds the expander's
/// `already_generated` marking.
pub async fn list_occurrence_dates(
    db: &Database,
    series_id: &str,
) -> Result<HashSet<NaiveDate>, CrewlineError> {
    let series_id = series_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT occurrence_date FROM shifts \
                 WHERE series_id = ?1 AND occurrence_date IS NOT NULL",
            )?;
            let rows = stmt.query_map(params![series_id], |row| date_from_sql(0, row.get(0)?))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Outcome of a schedule edit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleUpdate {
    Updated,
    /// The shift has already started; its schedule is frozen.
    Frozen,
    Missing,
}

/// Rewrite a scheduled shift's times and headcount. The freeze check and the
/// write happen in one transaction so a shift cannot start in between.
pub async fn update_schedule(
    db: &Database,
    company_id: &str,
    id: &str,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    headcount: u32,
    now: DateTime<Utc>,
) -> Result<ScheduleUpdate, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<ScheduleUpdate, rusqlite::Error> {
            let tx = conn.transaction()?;
            let current: Option<String> = match tx.query_row(
                "SELECT start_at FROM shifts \
                 WHERE id = ?1 AND company_id = ?2 AND status = 'scheduled'",
                params![id, company_id],
                |row| row.get(0),
            ) {
                Ok(v) => Some(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e),
            };
            let Some(current_start) = current else {
                tx.commit()?;
                return Ok(ScheduleUpdate::Missing);
            };
            if ts_from_sql(0, current_start)? <= now {
                tx.commit()?;
                return Ok(ScheduleUpdate::Frozen);
            }
            tx.execute(
                "UPDATE shifts SET start_at = ?1, end_at = ?2, headcount = ?3 \
                 WHERE id = ?4 AND company_id = ?5",
                params![ts_to_sql(start_at), ts_to_sql(end_at), headcount, id, company_id],
            )?;
            tx.commit()?;
            Ok(ScheduleUpdate::Updated)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Outcome of a cancellation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Cancelled; carries the number of open assignments cascaded to
    /// `cancelled` alongside the shift.
    Cancelled { cascaded: usize },
    AlreadyCancelled,
    Completed,
    Missing,
}

/// Cancel a shift and cascade its open (invited or accepted) assignments to
/// `cancelled` in the same transaction. Workers already checked in keep
/// their state for payroll reconciliation.
pub async fn cancel(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<CancelOutcome, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<CancelOutcome, rusqlite::Error> {
            let tx = conn.transaction()?;
            let status: Option<String> = match tx.query_row(
                "SELECT status FROM shifts WHERE id = ?1 AND company_id = ?2",
                params![id, company_id],
                |row| row.get(0),
            ) {
                Ok(v) => Some(v),
                Err(rusqlite::Error::QueryReturnedNoRows) => None,
                Err(e) => return Err(e),
            };
            let outcome = match status.as_deref() {
                None => CancelOutcome::Missing,
                Some("cancelled") => CancelOutcome::AlreadyCancelled,
                Some("completed") => CancelOutcome::Completed,
                _ => {
                    tx.execute(
                        "UPDATE shifts SET status = 'cancelled' WHERE id = ?1",
                        params![id],
                    )?;
                    let cascaded = tx.execute(
                        "UPDATE shift_assignments SET status = 'cancelled' \
                         WHERE shift_id = ?1 AND status IN ('invited', 'accepted')",
                        params![id],
                    )?;
                    CancelOutcome::Cancelled { cascaded }
                }
            };
            tx.commit()?;
            Ok(outcome)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a shift completed. Returns false when no scheduled row matched.
pub async fn complete(db: &Database, company_id: &str, id: &str) -> Result<bool, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE shifts SET status = 'completed' \
                 WHERE id = ?1 AND company_id = ?2 AND status = 'scheduled'",
                params![id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Store a freshly rotated check-in code hash.
pub async fn set_code(
    db: &Database,
    company_id: &str,
    id: &str,
    code_hash: &str,
    rotated_at: DateTime<Utc>,
) -> Result<bool, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    let code_hash = code_hash.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE shifts SET checkin_code_hash = ?1, code_rotated_at = ?2 \
                 WHERE id = ?3 AND company_id = ?4",
                params![code_hash, ts_to_sql(rotated_at), id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Drop the check-in code, disabling code verification for the shift.
pub async fn clear_code(db: &Database, company_id: &str, id: &str) -> Result<bool, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE shifts SET checkin_code_hash = NULL, code_rotated_at = NULL \
                 WHERE id = ?1 AND company_id = ?2",
                params![id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set or clear the shift's geofence.
pub async fn set_geofence(
    db: &Database,
    company_id: &str,
    id: &str,
    fence: Option<Geofence>,
) -> Result<bool, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE shifts SET geofence_lat = ?1, geofence_lng = ?2, \
                 geofence_radius_m = ?3 WHERE id = ?4 AND company_id = ?5",
                params![
                    fence.map(|g| g.lat),
                    fence.map(|g| g.lng),
                    fence.map(|g| g.radius_m),
                    id,
                    company_id
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Opt a single shift out of (or back into) the coverage sweep.
pub async fn set_autofill_disabled(
    db: &Database,
    company_id: &str,
    id: &str,
    disabled: bool,
) -> Result<bool, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE shifts SET autofill_disabled = ?1 WHERE id = ?2 AND company_id = ?3",
                params![disabled, id, company_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Scheduled shifts whose end passed the cutoff, oldest first. The
/// completion sweep walks these in bounded batches.
pub async fn list_ended_scheduled(
    db: &Database,
    cutoff: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<Shift>, CrewlineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SHIFT_COLS} FROM shifts \
                 WHERE status = 'scheduled' AND end_at < ?1 \
                 ORDER BY end_at, id LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![ts_to_sql(cutoff), limit], row_to_shift)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upcoming scheduled, autofill-eligible shifts for one company, soonest
/// first. The coverage sweep's work queue.
pub async fn list_open_upcoming(
    db: &Database,
    company_id: &str,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    limit: u32,
) -> Result<Vec<Shift>, CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SHIFT_COLS} FROM shifts \
                 WHERE company_id = ?1 AND status = 'scheduled' AND autofill_disabled = 0 \
                   AND start_at >= ?2 AND start_at < ?3 \
                 ORDER BY start_at, id LIMIT ?4"
            ))?;
            let rows = stmt.query_map(
                params![company_id, ts_to_sql(from), ts_to_sql(to), limit],
                row_to_shift,
            )?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Company ids with at least one upcoming scheduled shift, the coverage
/// sweep's outer loop.
pub async fn list_companies_with_upcoming(
    db: &Database,
    from: DateTime<Utc>,
) -> Result<Vec<String>, CrewlineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT DISTINCT company_id FROM shifts \
                 WHERE status = 'scheduled' AND start_at >= ?1 ORDER BY company_id",
            )?;
            let rows = stmt.query_map(params![ts_to_sql(from)], |row| row.get(0))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
