// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-company ops settings, autopilot audit runs, and the attendance
//! ledger.

use chrono::{DateTime, Utc};
use crewline_core::CrewlineError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{
    enum_from_sql, opt_ts_from_sql, ts_from_sql, ts_to_sql, AttendanceEvent, AutopilotRun,
    CompanyOpsSettings,
};

fn default_settings(company_id: &str) -> CompanyOpsSettings {
    CompanyOpsSettings {
        company_id: company_id.to_string(),
        autofill_enabled: false,
        autofill_pool_id: None,
        lookahead_days: 7,
        max_shifts_per_sweep: 25,
        max_invites_per_day: 50,
        last_run_at: None,
    }
}

fn row_to_settings(row: &rusqlite::Row<'_>) -> Result<CompanyOpsSettings, rusqlite::Error> {
    Ok(CompanyOpsSettings {
        company_id: row.get(0)?,
        autofill_enabled: row.get(1)?,
        autofill_pool_id: row.get(2)?,
        lookahead_days: row.get(3)?,
        max_shifts_per_sweep: row.get(4)?,
        max_invites_per_day: row.get(5)?,
        last_run_at: opt_ts_from_sql(6, row.get(6)?)?,
    })
}

/// Read a company's ops settings, falling back to defaults when the company
/// has never touched them. No row is written on the default path.
pub async fn get_settings(
    db: &Database,
    company_id: &str,
) -> Result<CompanyOpsSettings, CrewlineError> {
    let company = company_id.to_string();
    let found = db
        .connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT company_id, autofill_enabled, autofill_pool_id, lookahead_days, \
                 max_shifts_per_sweep, max_invites_per_day, last_run_at \
                 FROM company_ops_settings WHERE company_id = ?1",
            )?;
            match stmt.query_row(params![company], row_to_settings) {
                Ok(settings) => Ok(Some(settings)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(found.unwrap_or_else(|| default_settings(company_id)))
}

/// Upsert a company's ops settings, preserving `last_run_at`.
pub async fn update_settings(
    db: &Database,
    settings: &CompanyOpsSettings,
) -> Result<(), CrewlineError> {
    let s = settings.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO company_ops_settings (company_id, autofill_enabled, \
                 autofill_pool_id, lookahead_days, max_shifts_per_sweep, max_invites_per_day) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
                 ON CONFLICT (company_id) DO UPDATE SET \
                   autofill_enabled = excluded.autofill_enabled, \
                   autofill_pool_id = excluded.autofill_pool_id, \
                   lookahead_days = excluded.lookahead_days, \
                   max_shifts_per_sweep = excluded.max_shifts_per_sweep, \
                   max_invites_per_day = excluded.max_invites_per_day",
                params![
                    s.company_id,
                    s.autofill_enabled,
                    s.autofill_pool_id,
                    s.lookahead_days,
                    s.max_shifts_per_sweep,
                    s.max_invites_per_day,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Disable autofill for a company. The coverage sweep self-heals with this
/// when the configured pool has gone stale.
pub async fn disable_autofill(db: &Database, company_id: &str) -> Result<(), CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO company_ops_settings (company_id, autofill_enabled) \
                 VALUES (?1, 0) \
                 ON CONFLICT (company_id) DO UPDATE SET autofill_enabled = 0",
                params![company_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Stamp the last sweep run for a company.
pub async fn stamp_last_run(
    db: &Database,
    company_id: &str,
    at: DateTime<Utc>,
) -> Result<(), CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO company_ops_settings (company_id, last_run_at) VALUES (?1, ?2) \
                 ON CONFLICT (company_id) DO UPDATE SET last_run_at = excluded.last_run_at",
                params![company_id, ts_to_sql(at)],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_run(row: &rusqlite::Row<'_>) -> Result<AutopilotRun, rusqlite::Error> {
    Ok(AutopilotRun {
        id: row.get(0)?,
        company_id: row.get(1)?,
        started_at: ts_from_sql(2, row.get(2)?)?,
        finished_at: opt_ts_from_sql(3, row.get(3)?)?,
        shifts_processed: row.get(4)?,
        workers_invited: row.get(5)?,
        failures: row.get(6)?,
        status: enum_from_sql(7, row.get(7)?)?,
    })
}

/// Record the start of a sweep run.
pub async fn start_run(db: &Database, run: &AutopilotRun) -> Result<(), CrewlineError> {
    let r = run.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO autopilot_runs (id, company_id, started_at, status) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![r.id, r.company_id, ts_to_sql(r.started_at), r.status.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Close out a sweep run with its final counters.
pub async fn finish_run(db: &Database, run: &AutopilotRun) -> Result<(), CrewlineError> {
    let r = run.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE autopilot_runs SET finished_at = ?1, shifts_processed = ?2, \
                 workers_invited = ?3, failures = ?4, status = ?5 WHERE id = ?6",
                params![
                    r.finished_at.map(ts_to_sql),
                    r.shifts_processed,
                    r.workers_invited,
                    r.failures,
                    r.status.to_string(),
                    r.id,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// A company's sweep runs, most recent first.
pub async fn list_runs(
    db: &Database,
    company_id: &str,
    limit: u32,
) -> Result<Vec<AutopilotRun>, CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, company_id, started_at, finished_at, shifts_processed, \
                 workers_invited, failures, status FROM autopilot_runs \
                 WHERE company_id = ?1 ORDER BY started_at DESC, id LIMIT ?2",
            )?;
            let rows = stmt.query_map(params![company_id, limit], row_to_run)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_event(row: &rusqlite::Row<'_>) -> Result<AttendanceEvent, rusqlite::Error> {
    Ok(AttendanceEvent {
        id: row.get(0)?,
        assignment_id: row.get(1)?,
        kind: enum_from_sql(2, row.get(2)?)?,
        method: enum_from_sql(3, row.get(3)?)?,
        lat: row.get(4)?,
        lng: row.get(5)?,
        recorded_at: ts_from_sql(6, row.get(6)?)?,
    })
}

/// Append to the attendance ledger. The ledger is insert-only; corrections
/// are new events, never edits.
pub async fn append_attendance(db: &Database, event: &AttendanceEvent) -> Result<(), CrewlineError> {
    let e = event.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO attendance_events (id, assignment_id, kind, method, lat, lng, \
                 recorded_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    e.id,
                    e.assignment_id,
                    e.kind.to_string(),
                    e.method.to_string(),
                    e.lat,
                    e.lng,
                    ts_to_sql(e.recorded_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// An assignment's ledger, oldest first.
pub async fn list_attendance(
    db: &Database,
    assignment_id: &str,
) -> Result<Vec<AttendanceEvent>, CrewlineError> {
    let assignment_id = assignment_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, assignment_id, kind, method, lat, lng, recorded_at \
                 FROM attendance_events WHERE assignment_id = ?1 \
                 ORDER BY recorded_at, id",
            )?;
            let rows = stmt.query_map(params![assignment_id], row_to_event)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::setup_db;
    use chrono::TimeZone;
    use crewline_core::types::{AttendanceKind, AttendanceMethod, RunStatus};

    fn at(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, h, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn settings_default_without_writing() {
        let (db, _dir) = setup_db().await;
        let settings = get_settings(&db, "co-1").await.unwrap();
        assert!(!settings.autofill_enabled);
        assert_eq!(settings.lookahead_days, 7);
        assert_eq!(settings.max_invites_per_day, 50);

        // Reading defaults did not create a row.
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, rusqlite::Error> {
                conn.query_row("SELECT COUNT(*) FROM company_ops_settings", [], |row| {
                    row.get(0)
                })
            })
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn update_preserves_last_run_stamp() {
        let (db, _dir) = setup_db().await;
        stamp_last_run(&db, "co-1", at(6)).await.unwrap();

        let mut settings = get_settings(&db, "co-1").await.unwrap();
        settings.autofill_enabled = true;
        settings.autofill_pool_id = Some("p-1".to_string());
        update_settings(&db, &settings).await.unwrap();

        let settings = get_settings(&db, "co-1").await.unwrap();
        assert!(settings.autofill_enabled);
        assert_eq!(settings.last_run_at, Some(at(6)));
    }

    #[tokio::test]
    async fn self_heal_disables_autofill_only() {
        let (db, _dir) = setup_db().await;
        let mut settings = get_settings(&db, "co-1").await.unwrap();
        settings.autofill_enabled = true;
        settings.autofill_pool_id = Some("p-gone".to_string());
        update_settings(&db, &settings).await.unwrap();

        disable_autofill(&db, "co-1").await.unwrap();
        let settings = get_settings(&db, "co-1").await.unwrap();
        assert!(!settings.autofill_enabled);
        // The stale pointer is kept for the operator to inspect.
        assert_eq!(settings.autofill_pool_id.as_deref(), Some("p-gone"));
    }

    #[tokio::test]
    async fn run_lifecycle_round_trips() {
        let (db, _dir) = setup_db().await;
        let mut run = AutopilotRun {
            id: "run-1".to_string(),
            company_id: "co-1".to_string(),
            started_at: at(6),
            finished_at: None,
            shifts_processed: 0,
            workers_invited: 0,
            failures: 0,
            status: RunStatus::Ok,
        };
        start_run(&db, &run).await.unwrap();

        run.finished_at = Some(at(7));
        run.shifts_processed = 4;
        run.workers_invited = 9;
        run.failures = 1;
        run.status = RunStatus::Partial;
        finish_run(&db, &run).await.unwrap();

        let runs = list_runs(&db, "co-1", 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].workers_invited, 9);
        assert_eq!(runs[0].status, RunStatus::Partial);
        assert_eq!(runs[0].finished_at, Some(at(7)));
    }

    #[tokio::test]
    async fn attendance_ledger_keeps_order() {
        let (db, _dir) = setup_db().await;
        crate::queries::shifts::create(
            &db,
            &crate::queries::test_support::make_shift("sh-1", "co-1"),
        )
        .await
        .unwrap();
        crate::queries::assignments::invite(
            &db,
            &crate::queries::test_support::make_assignment("as-1", "sh-1", "w-1"),
        )
        .await
        .unwrap();
        let base = AttendanceEvent {
            id: "ev-1".to_string(),
            assignment_id: "as-1".to_string(),
            kind: AttendanceKind::CheckIn,
            method: AttendanceMethod::Geo,
            lat: Some(40.0),
            lng: Some(-74.0),
            recorded_at: at(9),
        };
        append_attendance(&db, &base).await.unwrap();
        append_attendance(
            &db,
            &AttendanceEvent {
                id: "ev-2".to_string(),
                kind: AttendanceKind::CheckOut,
                method: AttendanceMethod::SelfService,
                lat: None,
                lng: None,
                recorded_at: at(17),
                ..base.clone()
            },
        )
        .await
        .unwrap();

        let ledger = list_attendance(&db, "as-1").await.unwrap();
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger[0].kind, AttendanceKind::CheckIn);
        assert_eq!(ledger[1].method, AttendanceMethod::SelfService);
    }
}
