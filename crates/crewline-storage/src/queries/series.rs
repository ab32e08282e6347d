// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shift series CRUD and skip exceptions.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use crewline_core::types::SeriesFillMode;
use crewline_core::CrewlineError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{
    date_from_sql, date_to_sql, enum_from_sql, opt_date_from_sql, opt_ts_from_sql, opt_ts_to_sql,
    time_from_sql, time_to_sql, ts_to_sql, weekdays_from_sql, weekdays_to_sql, ShiftSeries,
};

const SERIES_COLS: &str = "id, company_id, template_id, status, interval_weeks, days_of_week, \
     start_date, end_date, start_time, end_time, autofill_pool_id, autofill_mode, \
     autofill_count, auto_generate, lookahead_days, last_generated_at";

fn row_to_series(row: &rusqlite::Row<'_>) -> Result<ShiftSeries, rusqlite::Error> {
    let mode: Option<String> = row.get(11)?;
    let count: Option<u32> = row.get(12)?;
    let autofill_mode = match mode.as_deref() {
        Some("headcount") => Some(SeriesFillMode::Headcount),
        Some("count") => Some(SeriesFillMode::Count(count.unwrap_or(1))),
        _ => None,
    };
    Ok(ShiftSeries {
        id: row.get(0)?,
        company_id: row.get(1)?,
        template_id: row.get(2)?,
        status: enum_from_sql(3, row.get(3)?)?,
        interval_weeks: row.get(4)?,
        days_of_week: weekdays_from_sql(5, row.get(5)?)?,
        start_date: date_from_sql(6, row.get(6)?)?,
        end_date: opt_date_from_sql(7, row.get(7)?)?,
        start_time: time_from_sql(8, row.get(8)?)?,
        end_time: time_from_sql(9, row.get(9)?)?,
        autofill_pool_id: row.get(10)?,
        autofill_mode,
        auto_generate: row.get(13)?,
        lookahead_days: row.get(14)?,
        last_generated_at: opt_ts_from_sql(15, row.get(15)?)?,
    })
}

fn mode_cols(mode: Option<SeriesFillMode>) -> (Option<&'static str>, Option<u32>) {
    match mode {
        Some(SeriesFillMode::Headcount) => (Some("headcount"), None),
        Some(SeriesFillMode::Count(n)) => (Some("count"), Some(n)),
        None => (None, None),
    }
}

/// Insert a series.
pub async fn create(db: &Database, series: &ShiftSeries) -> Result<(), CrewlineError> {
    let s = series.clone();
    db.connection()
        .call(move |conn| {
            let (mode, count) = mode_cols(s.autofill_mode);
            conn.execute(
                "INSERT INTO shift_series (id, company_id, template_id, status, interval_weeks, \
                 days_of_week, start_date, end_date, start_time, end_time, autofill_pool_id, \
                 autofill_mode, autofill_count, auto_generate, lookahead_days, last_generated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    s.id,
                    s.company_id,
                    s.template_id,
                    s.status.to_string(),
                    s.interval_weeks,
                    weekdays_to_sql(&s.days_of_week),
                    date_to_sql(s.start_date),
                    s.end_date.map(date_to_sql),
                    time_to_sql(s.start_time),
                    time_to_sql(s.end_time),
                    s.autofill_pool_id,
                    mode,
                    count,
                    s.auto_generate,
                    s.lookahead_days,
                    opt_ts_to_sql(s.last_generated_at),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a series by id within a company.
pub async fn get(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<ShiftSeries>, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SERIES_COLS} FROM shift_series WHERE id = ?1 AND company_id = ?2"
            ))?;
            match stmt.query_row(params![id, company_id], row_to_series) {
                Ok(series) => Ok(Some(series)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a company's series.
pub async fn list(db: &Database, company_id: &str) -> Result<Vec<ShiftSeries>, CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SERIES_COLS} FROM shift_series WHERE company_id = ?1 ORDER BY start_date"
            ))?;
            let rows = stmt.query_map(params![company_id], row_to_series)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update the recurrence and autofill fields of a series. Returns false when
/// no row matched.
pub async fn update(db: &Database, series: &ShiftSeries) -> Result<bool, CrewlineError> {
    let s = series.clone();
    db.connection()
        .call(move |conn| {
            let (mode, count) = mode_cols(s.autofill_mode);
            let changed = conn.execute(
                "UPDATE shift_series SET status = ?1, interval_weeks = ?2, days_of_week = ?3, \
                 start_date = ?4, end_date = ?5, start_time = ?6, end_time = ?7, \
                 autofill_pool_id = ?8, autofill_mode = ?9, autofill_count = ?10, \
                 auto_generate = ?11, lookahead_days = ?12 \
                 WHERE id = ?13 AND company_id = ?14",
                params![
                    s.status.to_string(),
                    s.interval_weeks,
                    weekdays_to_sql(&s.days_of_week),
                    date_to_sql(s.start_date),
                    s.end_date.map(date_to_sql),
                    time_to_sql(s.start_time),
                    time_to_sql(s.end_time),
                    s.autofill_pool_id,
                    mode,
                    count,
                    s.auto_generate,
                    s.lookahead_days,
                    s.id,
                    s.company_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a skip exception for (series, date). Re-adding the same date is
/// absorbed.
pub async fn add_exception(
    db: &Database,
    series_id: &str,
    date: NaiveDate,
) -> Result<(), CrewlineError> {
    let series_id = series_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO series_exceptions (series_id, date) VALUES (?1, ?2)",
                params![series_id, date_to_sql(date)],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// The skip set for a series.
pub async fn list_exceptions(
    db: &Database,
    series_id: &str,
) -> Result<HashSet<NaiveDate>, CrewlineError> {
    let series_id = series_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt =
                conn.prepare("SELECT date FROM series_exceptions WHERE series_id = ?1")?;
            let rows = stmt.query_map(params![series_id], |row| date_from_sql(0, row.get(0)?))?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Stamp `last_generated_at`. Called after every auto-generation pass for a
/// series, including passes that produced zero shifts, so the sweep always
/// makes forward progress.
pub async fn stamp_generated_at(
    db: &Database,
    series_id: &str,
    at: DateTime<Utc>,
) -> Result<(), CrewlineError> {
    let series_id = series_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE shift_series SET last_generated_at = ?1 WHERE id = ?2",
                params![ts_to_sql(at), series_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Active series with auto-generation enabled whose last pass is older than
/// `stale_before` (or that never ran).
pub async fn list_due_for_generation(
    db: &Database,
    stale_before: DateTime<Utc>,
) -> Result<Vec<ShiftSeries>, CrewlineError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SERIES_COLS} FROM shift_series \
                 WHERE auto_generate = 1 AND status = 'active' \
                   AND (last_generated_at IS NULL OR last_generated_at < ?1) \
                 ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![ts_to_sql(stale_before)], row_to_series)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{make_series, make_template, setup_db};
    use chrono::TimeZone;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn seeded_db() -> (Database, tempfile::TempDir) {
        let (db, dir) = setup_db().await;
        crate::queries::templates::create(&db, &make_template("tpl-1", "co-1", "Floor"))
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let (db, _dir) = seeded_db().await;
        let mut series = make_series("ser-1", "co-1", "tpl-1");
        series.autofill_mode = Some(SeriesFillMode::Count(2));
        series.autofill_pool_id = Some("pool-1".to_string());
        create(&db, &series).await.unwrap();

        let fetched = get(&db, "co-1", "ser-1").await.unwrap().unwrap();
        assert_eq!(fetched.days_of_week, vec![1, 3]);
        assert_eq!(fetched.interval_weeks, 2);
        assert_eq!(fetched.autofill_mode, Some(SeriesFillMode::Count(2)));
        assert!(fetched.last_generated_at.is_none());
    }

    #[tokio::test]
    async fn cross_company_get_returns_none() {
        let (db, _dir) = seeded_db().await;
        create(&db, &make_series("ser-1", "co-1", "tpl-1")).await.unwrap();
        assert!(get(&db, "co-other", "ser-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn exceptions_are_deduplicated() {
        let (db, _dir) = seeded_db().await;
        create(&db, &make_series("ser-1", "co-1", "tpl-1")).await.unwrap();

        add_exception(&db, "ser-1", date("2024-01-15")).await.unwrap();
        add_exception(&db, "ser-1", date("2024-01-15")).await.unwrap();
        add_exception(&db, "ser-1", date("2024-01-17")).await.unwrap();

        let skips = list_exceptions(&db, "ser-1").await.unwrap();
        assert_eq!(skips.len(), 2);
        assert!(skips.contains(&date("2024-01-15")));
    }

    #[tokio::test]
    async fn generation_due_filtering() {
        let (db, _dir) = seeded_db().await;
        let mut auto = make_series("ser-auto", "co-1", "tpl-1");
        auto.auto_generate = true;
        create(&db, &auto).await.unwrap();
        let manual = make_series("ser-manual", "co-1", "tpl-1");
        create(&db, &manual).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();

        // Never ran: due.
        let due = list_due_for_generation(&db, now).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "ser-auto");

        // Freshly stamped: no longer due for a cutoff before the stamp.
        stamp_generated_at(&db, "ser-auto", now).await.unwrap();
        let due = list_due_for_generation(&db, now).await.unwrap();
        assert!(due.is_empty());

        // Stale again once the cutoff passes the stamp.
        let later = Utc.with_ymd_and_hms(2024, 1, 11, 12, 0, 0).unwrap();
        let due = list_due_for_generation(&db, later).await.unwrap();
        assert_eq!(due.len(), 1);
    }

    #[tokio::test]
    async fn paused_series_not_due() {
        let (db, _dir) = seeded_db().await;
        let mut series = make_series("ser-1", "co-1", "tpl-1");
        series.auto_generate = true;
        series.status = crewline_core::types::SeriesStatus::Paused;
        create(&db, &series).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap();
        assert!(list_due_for_generation(&db, now).await.unwrap().is_empty());
    }
}
