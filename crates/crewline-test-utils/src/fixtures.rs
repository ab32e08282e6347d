// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database fixtures shared by the engine tests.

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use tempfile::TempDir;

use crewline_core::types::{
    SeriesStatus, Shift, ShiftSeries, ShiftStatus, ShiftTemplate, WorkerPool,
};
use crewline_storage::{queries, Database};

/// Open a migrated database in a fresh temp directory. Keep the returned
/// `TempDir` alive for the duration of the test.
pub async fn open_temp_db() -> (Database, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("crewline-test.db");
    let db = Database::open(path.to_str().expect("utf-8 temp path"))
        .await
        .expect("open test database");
    (db, dir)
}

/// Ids created by [`seed_company`].
#[derive(Debug, Clone)]
pub struct SeededCompany {
    pub company_id: String,
    pub template_id: String,
    pub series_id: String,
    pub pool_id: String,
    pub worker_ids: Vec<String>,
}

pub fn template(id: &str, company_id: &str, name: &str) -> ShiftTemplate {
    ShiftTemplate {
        id: id.to_string(),
        company_id: company_id.to_string(),
        name: name.to_string(),
        title: "Line Cook".to_string(),
        role_tag: "kitchen".to_string(),
        location: "Main St".to_string(),
        department: None,
        headcount: 3,
        geofence: None,
        created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
    }
}

/// Weekly Monday/Wednesday/Friday series starting 2024-06-03, 09:00-17:00.
pub fn series(id: &str, company_id: &str, template_id: &str) -> ShiftSeries {
    ShiftSeries {
        id: id.to_string(),
        company_id: company_id.to_string(),
        template_id: template_id.to_string(),
        status: SeriesStatus::Active,
        interval_weeks: 1,
        days_of_week: vec![1, 3, 5],
        start_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        end_date: None,
        start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
        end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
        autofill_pool_id: None,
        autofill_mode: None,
        auto_generate: false,
        lookahead_days: 14,
        last_generated_at: None,
    }
}

/// Ad hoc scheduled shift on 2024-06-10, 09:00-17:00 UTC.
pub fn shift(id: &str, company_id: &str) -> Shift {
    Shift {
        id: id.to_string(),
        company_id: company_id.to_string(),
        series_id: None,
        occurrence_date: None,
        title: "Line Cook".to_string(),
        role_tag: "kitchen".to_string(),
        location: "Main St".to_string(),
        department: None,
        start_at: Utc.with_ymd_and_hms(2024, 6, 10, 9, 0, 0).unwrap(),
        end_at: Utc.with_ymd_and_hms(2024, 6, 10, 17, 0, 0).unwrap(),
        headcount: 3,
        status: ShiftStatus::Scheduled,
        checkin_code_hash: None,
        code_rotated_at: None,
        geofence: None,
        autofill_disabled: false,
    }
}

/// Seed one company with a template, a series bound to it, and a pool of
/// `worker_count` members (`{company}-w-0`, `{company}-w-1`, ...).
pub async fn seed_company(db: &Database, company_id: &str, worker_count: usize) -> SeededCompany {
    let template_id = format!("{company_id}-tpl");
    let series_id = format!("{company_id}-ser");
    let pool_id = format!("{company_id}-pool");

    queries::templates::create(db, &template(&template_id, company_id, "Default"))
        .await
        .expect("seed template");
    queries::series::create(db, &series(&series_id, company_id, &template_id))
        .await
        .expect("seed series");
    queries::workers::create_pool(
        db,
        &WorkerPool {
            id: pool_id.clone(),
            company_id: company_id.to_string(),
            name: "Default Pool".to_string(),
        },
    )
    .await
    .expect("seed pool");

    let mut worker_ids = Vec::with_capacity(worker_count);
    for i in 0..worker_count {
        let worker_id = format!("{company_id}-w-{i}");
        queries::workers::add_member(db, &pool_id, &worker_id)
            .await
            .expect("seed pool member");
        worker_ids.push(worker_id);
    }

    SeededCompany {
        company_id: company_id.to_string(),
        template_id,
        series_id,
        pool_id,
        worker_ids,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seed_company_creates_pool_members_in_order() {
        let (db, _dir) = open_temp_db().await;
        let seeded = seed_company(&db, "co-1", 3).await;

        let members = queries::workers::list_members(&db, &seeded.pool_id)
            .await
            .unwrap();
        let order: Vec<_> = members.iter().map(|m| m.worker_id.as_str()).collect();
        assert_eq!(order, ["co-1-w-0", "co-1-w-1", "co-1-w-2"]);
    }
}
