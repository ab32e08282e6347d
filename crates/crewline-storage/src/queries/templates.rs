// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shift template CRUD.
//!
//! All lookups are scoped to the caller's company; a template owned by
//! another tenant is indistinguishable from a missing one.

use crewline_core::CrewlineError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{geofence_from_cols, ts_from_sql, ts_to_sql, ShiftTemplate};

fn row_to_template(row: &rusqlite::Row<'_>) -> Result<ShiftTemplate, rusqlite::Error> {
    Ok(ShiftTemplate {
        id: row.get(0)?,
        company_id: row.get(1)?,
        name: row.get(2)?,
        title: row.get(3)?,
        role_tag: row.get(4)?,
        location: row.get(5)?,
        department: row.get(6)?,
        headcount: row.get(7)?,
        geofence: geofence_from_cols(row.get(8)?, row.get(9)?, row.get(10)?),
        created_at: ts_from_sql(11, row.get(11)?)?,
    })
}

const TEMPLATE_COLS: &str = "id, company_id, name, title, role_tag, location, department, \
     headcount, geofence_lat, geofence_lng, geofence_radius_m, created_at";

/// Insert a template. A (company, name) collision is a `Conflict`.
pub async fn create(db: &Database, template: &ShiftTemplate) -> Result<(), CrewlineError> {
    let t = template.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO shift_templates (id, company_id, name, title, role_tag, location, \
                 department, headcount, geofence_lat, geofence_lng, geofence_radius_m, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    t.id,
                    t.company_id,
                    t.name,
                    t.title,
                    t.role_tag,
                    t.location,
                    t.department,
                    t.headcount,
                    t.geofence.map(|g| g.lat),
                    t.geofence.map(|g| g.lng),
                    t.geofence.map(|g| g.radius_m),
                    ts_to_sql(t.created_at),
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(e) if is_unique_violation(&e) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    if inserted {
        Ok(())
    } else {
        Err(CrewlineError::Conflict(format!(
            "template name `{}` already exists",
            template.name
        )))
    }
}

/// Get a template by id within a company.
pub async fn get(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<ShiftTemplate>, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLS} FROM shift_templates WHERE id = ?1 AND company_id = ?2"
            ))?;
            let result = stmt.query_row(params![id, company_id], row_to_template);
            match result {
                Ok(template) => Ok(Some(template)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a company's templates, newest first.
pub async fn list(db: &Database, company_id: &str) -> Result<Vec<ShiftTemplate>, CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TEMPLATE_COLS} FROM shift_templates \
                 WHERE company_id = ?1 ORDER BY created_at DESC"
            ))?;
            let rows = stmt.query_map(params![company_id], row_to_template)?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Update mutable template fields. Returns false when no row matched.
pub async fn update(db: &Database, template: &ShiftTemplate) -> Result<bool, CrewlineError> {
    let t = template.clone();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE shift_templates SET name = ?1, title = ?2, role_tag = ?3, location = ?4, \
                 department = ?5, headcount = ?6, geofence_lat = ?7, geofence_lng = ?8, \
                 geofence_radius_m = ?9 WHERE id = ?10 AND company_id = ?11",
                params![
                    t.name,
                    t.title,
                    t.role_tag,
                    t.location,
                    t.department,
                    t.headcount,
                    t.geofence.map(|g| g.lat),
                    t.geofence.map(|g| g.lng),
                    t.geofence.map(|g| g.radius_m),
                    t.id,
                    t.company_id,
                ],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a template. Rejected with `Conflict` while any series references
/// it; returns false when no row matched.
pub async fn delete(db: &Database, company_id: &str, id: &str) -> Result<bool, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    let outcome = db
        .connection()
        .call(move |conn| -> Result<Option<bool>, rusqlite::Error> {
            let tx = conn.transaction()?;
            let referenced: i64 = tx.query_row(
                "SELECT COUNT(*) FROM shift_series WHERE template_id = ?1",
                params![id],
                |row| row.get(0),
            )?;
            if referenced > 0 {
                tx.commit()?;
                return Ok(None);
            }
            let changed = tx.execute(
                "DELETE FROM shift_templates WHERE id = ?1 AND company_id = ?2",
                params![id, company_id],
            )?;
            tx.commit()?;
            Ok(Some(changed > 0))
        })
        .await
        .map_err(crate::database::map_tr_err)?;

    outcome.ok_or_else(|| {
        CrewlineError::Conflict("template is referenced by one or more series".to_string())
    })
}

/// True only for unique/primary-key violations. Other constraint failures
/// on the same statement (foreign key, CHECK) must not be mistaken for a
/// duplicate row.
pub(crate) fn is_unique_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                || err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::test_support::{make_template, setup_db};

    #[tokio::test]
    async fn create_and_get_round_trips() {
        let (db, _dir) = setup_db().await;
        let template = make_template("tpl-1", "co-1", "Morning Floor");
        create(&db, &template).await.unwrap();

        let fetched = get(&db, "co-1", "tpl-1").await.unwrap().unwrap();
        assert_eq!(fetched.name, "Morning Floor");
        assert_eq!(fetched.headcount, 3);
    }

    #[tokio::test]
    async fn cross_company_get_returns_none() {
        let (db, _dir) = setup_db().await;
        create(&db, &make_template("tpl-1", "co-1", "Night")).await.unwrap();

        assert!(get(&db, "co-2", "tpl-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_name_is_a_conflict() {
        let (db, _dir) = setup_db().await;
        create(&db, &make_template("tpl-1", "co-1", "Floor")).await.unwrap();
        let err = create(&db, &make_template("tpl-2", "co-1", "Floor"))
            .await
            .unwrap_err();
        assert!(matches!(err, CrewlineError::Conflict(_)));

        // Same name under a different company is fine.
        create(&db, &make_template("tpl-3", "co-2", "Floor")).await.unwrap();
    }

    #[test]
    fn only_unique_violations_are_absorbed() {
        let unique = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE),
            None,
        );
        assert!(is_unique_violation(&unique));
        let pk = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY),
            None,
        );
        assert!(is_unique_violation(&pk));

        // Other constraint failures on the same statement must surface as
        // storage errors, not duplicates.
        let fk = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY),
            None,
        );
        assert!(!is_unique_violation(&fk));
        let check = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CONSTRAINT_CHECK),
            None,
        );
        assert!(!is_unique_violation(&check));
    }

    #[tokio::test]
    async fn delete_blocked_while_series_reference() {
        let (db, _dir) = setup_db().await;
        let template = make_template("tpl-1", "co-1", "Floor");
        create(&db, &template).await.unwrap();
        crate::queries::series::create(
            &db,
            &crate::queries::test_support::make_series("ser-1", "co-1", "tpl-1"),
        )
        .await
        .unwrap();

        let err = delete(&db, "co-1", "tpl-1").await.unwrap_err();
        assert!(matches!(err, CrewlineError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_unreferenced_template_succeeds() {
        let (db, _dir) = setup_db().await;
        create(&db, &make_template("tpl-1", "co-1", "Floor")).await.unwrap();
        assert!(delete(&db, "co-1", "tpl-1").await.unwrap());
        assert!(get(&db, "co-1", "tpl-1").await.unwrap().is_none());
    }
}
