// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Worker pools, membership, employer notes, and the candidate feed the
//! ranking pass consumes.

use crewline_core::CrewlineError;
use rusqlite::params;

use crate::database::Database;
use crate::models::{WorkerNote, WorkerPool, WorkerPoolMember};
use crate::queries::templates::is_unique_violation;

/// One pool member joined with its employer note and per-company history
/// counts. This is the ranker's input row; ordering is decided in the
/// engine, not in SQL.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRow {
    pub worker_id: String,
    /// Pool insertion order, the final tie-break.
    pub position: i64,
    pub preferred: bool,
    pub blocked: bool,
    pub rating: Option<i64>,
    pub completed_count: i64,
    pub no_show_count: i64,
    pub check_in_count: i64,
}

/// Insert a pool. A (company, name) collision is a `Conflict`.
pub async fn create_pool(db: &Database, pool: &WorkerPool) -> Result<(), CrewlineError> {
    let p = pool.clone();
    let inserted = db
        .connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let result = conn.execute(
                "INSERT INTO worker_pools (id, company_id, name) VALUES (?1, ?2, ?3)",
                params![p.id, p.company_id, p.name],
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
            "pool name `{}` already exists",
            pool.name
        )))
    }
}

/// Get a pool by id within a company.
pub async fn get_pool(
    db: &Database,
    company_id: &str,
    id: &str,
) -> Result<Option<WorkerPool>, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, company_id, name FROM worker_pools \
                 WHERE id = ?1 AND company_id = ?2",
            )?;
            let result = stmt.query_row(params![id, company_id], |row| {
                Ok(WorkerPool {
                    id: row.get(0)?,
                    company_id: row.get(1)?,
                    name: row.get(2)?,
                })
            });
            match result {
                Ok(pool) => Ok(Some(pool)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List a company's pools by name.
pub async fn list_pools(db: &Database, company_id: &str) -> Result<Vec<WorkerPool>, CrewlineError> {
    let company_id = company_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, company_id, name FROM worker_pools \
                 WHERE company_id = ?1 ORDER BY name",
            )?;
            let rows = stmt.query_map(params![company_id], |row| {
                Ok(WorkerPool {
                    id: row.get(0)?,
                    company_id: row.get(1)?,
                    name: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Delete a pool and its memberships. Returns false when no row matched.
pub async fn delete_pool(db: &Database, company_id: &str, id: &str) -> Result<bool, CrewlineError> {
    let company_id = company_id.to_string();
    let id = id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let owned: i64 = tx.query_row(
                "SELECT COUNT(*) FROM worker_pools WHERE id = ?1 AND company_id = ?2",
                params![id, company_id],
                |row| row.get(0),
            )?;
            if owned == 0 {
                tx.commit()?;
                return Ok(false);
            }
            tx.execute(
                "DELETE FROM worker_pool_members WHERE pool_id = ?1",
                params![id],
            )?;
            tx.execute("DELETE FROM worker_pools WHERE id = ?1", params![id])?;
            tx.commit()?;
            Ok(true)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append a worker to a pool. Position is assigned from the current tail;
/// re-adding an existing member is absorbed and keeps the original position.
pub async fn add_member(
    db: &Database,
    pool_id: &str,
    worker_id: &str,
) -> Result<bool, CrewlineError> {
    let pool_id = pool_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| -> Result<bool, rusqlite::Error> {
            let tx = conn.transaction()?;
            let next: i64 = tx.query_row(
                "SELECT COALESCE(MAX(position) + 1, 0) FROM worker_pool_members \
                 WHERE pool_id = ?1",
                params![pool_id],
                |row| row.get(0),
            )?;
            let changed = tx.execute(
                "INSERT OR IGNORE INTO worker_pool_members (pool_id, worker_id, position) \
                 VALUES (?1, ?2, ?3)",
                params![pool_id, worker_id, next],
            )?;
            tx.commit()?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a worker from a pool. Positions of the remaining members are left
/// untouched; ordering stays monotonic.
pub async fn remove_member(
    db: &Database,
    pool_id: &str,
    worker_id: &str,
) -> Result<bool, CrewlineError> {
    let pool_id = pool_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM worker_pool_members WHERE pool_id = ?1 AND worker_id = ?2",
                params![pool_id, worker_id],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Pool members in insertion order.
pub async fn list_members(
    db: &Database,
    pool_id: &str,
) -> Result<Vec<WorkerPoolMember>, CrewlineError> {
    let pool_id = pool_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT pool_id, worker_id, position FROM worker_pool_members \
                 WHERE pool_id = ?1 ORDER BY position",
            )?;
            let rows = stmt.query_map(params![pool_id], |row| {
                Ok(WorkerPoolMember {
                    pool_id: row.get(0)?,
                    worker_id: row.get(1)?,
                    position: row.get(2)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_note(row: &rusqlite::Row<'_>) -> Result<WorkerNote, rusqlite::Error> {
    Ok(WorkerNote {
        company_id: row.get(0)?,
        worker_id: row.get(1)?,
        rating: row.get(2)?,
        notes: row.get(3)?,
        preferred: row.get(4)?,
        blocked: row.get(5)?,
        block_reason: row.get(6)?,
    })
}

/// Get the employer note for a worker, if any.
pub async fn get_note(
    db: &Database,
    company_id: &str,
    worker_id: &str,
) -> Result<Option<WorkerNote>, CrewlineError> {
    let company_id = company_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT company_id, worker_id, rating, notes, preferred, blocked, block_reason \
                 FROM worker_notes WHERE company_id = ?1 AND worker_id = ?2",
            )?;
            match stmt.query_row(params![company_id, worker_id], row_to_note) {
                Ok(note) => Ok(Some(note)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Upsert a worker's rating and free-form notes, preserving the flag
/// columns.
pub async fn upsert_note(
    db: &Database,
    company_id: &str,
    worker_id: &str,
    rating: Option<i64>,
    notes: Option<String>,
) -> Result<(), CrewlineError> {
    let company_id = company_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO worker_notes (company_id, worker_id, rating, notes) \
                 VALUES (?1, ?2, ?3, ?4) \
                 ON CONFLICT (company_id, worker_id) \
                 DO UPDATE SET rating = excluded.rating, notes = excluded.notes",
                params![company_id, worker_id, rating, notes],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Set or clear the preferred flag. Preferring a worker lifts any block:
/// the two flags are mutually exclusive.
pub async fn set_preferred(
    db: &Database,
    company_id: &str,
    worker_id: &str,
    preferred: bool,
) -> Result<(), CrewlineError> {
    let company_id = company_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            if preferred {
                conn.execute(
                    "INSERT INTO worker_notes (company_id, worker_id, preferred, blocked, \
                     block_reason) VALUES (?1, ?2, 1, 0, NULL) \
                     ON CONFLICT (company_id, worker_id) \
                     DO UPDATE SET preferred = 1, blocked = 0, block_reason = NULL",
                    params![company_id, worker_id],
                )?;
            } else {
                conn.execute(
                    "INSERT INTO worker_notes (company_id, worker_id, preferred) \
                     VALUES (?1, ?2, 0) \
                     ON CONFLICT (company_id, worker_id) DO UPDATE SET preferred = 0",
                    params![company_id, worker_id],
                )?;
            }
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Block a worker from autofill with a mandatory reason, clearing the
/// preferred flag.
pub async fn set_blocked(
    db: &Database,
    company_id: &str,
    worker_id: &str,
    reason: &str,
) -> Result<(), CrewlineError> {
    let reason = reason.trim().to_string();
    if reason.len() < 5 {
        return Err(CrewlineError::validation(
            "block_reason",
            "a block reason of at least 5 characters is required",
        ));
    }
    let company_id = company_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO worker_notes (company_id, worker_id, preferred, blocked, \
                 block_reason) VALUES (?1, ?2, 0, 1, ?3) \
                 ON CONFLICT (company_id, worker_id) \
                 DO UPDATE SET preferred = 0, blocked = 1, block_reason = excluded.block_reason",
                params![company_id, worker_id, reason],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Lift a block, keeping the rest of the note.
pub async fn clear_blocked(
    db: &Database,
    company_id: &str,
    worker_id: &str,
) -> Result<(), CrewlineError> {
    let company_id = company_id.to_string();
    let worker_id = worker_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE worker_notes SET blocked = 0, block_reason = NULL \
                 WHERE company_id = ?1 AND worker_id = ?2",
                params![company_id, worker_id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Load the ranking input for every member of a pool: note flags plus
/// per-company assignment history. Blocked workers are included here and
/// filtered by the caller so the filter step stays observable in logs.
pub async fn load_candidates(
    db: &Database,
    company_id: &str,
    pool_id: &str,
) -> Result<Vec<CandidateRow>, CrewlineError> {
    let company_id = company_id.to_string();
    let pool_id = pool_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT m.worker_id, m.position, \
                        COALESCE(n.preferred, 0), COALESCE(n.blocked, 0), n.rating, \
                        COALESCE(h.completed, 0), COALESCE(h.no_shows, 0), \
                        COALESCE(h.check_ins, 0) \
                 FROM worker_pool_members m \
                 LEFT JOIN worker_notes n \
                   ON n.company_id = ?1 AND n.worker_id = m.worker_id \
                 LEFT JOIN ( \
                     SELECT a.worker_id, \
                            SUM(CASE WHEN a.status = 'completed' THEN 1 ELSE 0 END) \
                                AS completed, \
                            SUM(CASE WHEN a.status = 'no_show' THEN 1 ELSE 0 END) \
                                AS no_shows, \
                            SUM(CASE WHEN a.check_in_at IS NOT NULL THEN 1 ELSE 0 END) \
                                AS check_ins \
                     FROM shift_assignments a \
                     JOIN shifts s ON s.id = a.shift_id \
                     WHERE s.company_id = ?1 \
                     GROUP BY a.worker_id \
                 ) h ON h.worker_id = m.worker_id \
                 WHERE m.pool_id = ?2 \
                 ORDER BY m.position",
            )?;
            let rows = stmt.query_map(params![company_id, pool_id], |row| {
                Ok(CandidateRow {
                    worker_id: row.get(0)?,
                    position: row.get(1)?,
                    preferred: row.get(2)?,
                    blocked: row.get(3)?,
                    rating: row.get(4)?,
                    completed_count: row.get(5)?,
                    no_show_count: row.get(6)?,
                    check_in_count: row.get(7)?,
                })
            })?;
            rows.collect()
        })
        .await
        .map_err(crate::database::map_tr_err)
}
