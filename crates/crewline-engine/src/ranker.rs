// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic candidate ranking for coverage auto-fill.
//!
//! Ordering is a pure total order over [`CandidateRow`]; the same inputs
//! always produce the same list. Ties fall through to pool insertion order,
//! which is unique, so there is no unstable tail.

use std::cmp::Ordering;
use std::collections::HashSet;

use crewline_core::Result;
use crewline_storage::queries;
use crewline_storage::queries::workers::CandidateRow;
use crewline_storage::Database;

/// Total order: preferred first, then rating (descending, unrated last),
/// completed shifts (descending), no-shows (ascending), check-ins
/// (descending), pool position (ascending).
pub fn compare(a: &CandidateRow, b: &CandidateRow) -> Ordering {
    b.preferred
        .cmp(&a.preferred)
        // Option<i64> orders None first; reversing yields rating-desc with
        // unrated workers last.
        .then_with(|| b.rating.cmp(&a.rating))
        .then_with(|| b.completed_count.cmp(&a.completed_count))
        .then_with(|| a.no_show_count.cmp(&b.no_show_count))
        .then_with(|| b.check_in_count.cmp(&a.check_in_count))
        .then_with(|| a.position.cmp(&b.position))
}

/// Filter out blocked and excluded workers, order the rest, keep `limit`.
pub fn rank(
    mut candidates: Vec<CandidateRow>,
    exclude: &HashSet<String>,
    limit: usize,
) -> Vec<CandidateRow> {
    candidates.retain(|c| !c.blocked && !exclude.contains(&c.worker_id));
    candidates.sort_by(compare);
    candidates.truncate(limit);
    candidates
}

/// Load and rank a pool's candidates for one shift. Workers already holding
/// any assignment on the shift are excluded regardless of its status: a
/// declined worker is not re-courted by automation.
pub async fn rank_candidates(
    db: &Database,
    company_id: &str,
    pool_id: &str,
    shift_id: &str,
    limit: usize,
) -> Result<Vec<CandidateRow>> {
    let candidates = queries::workers::load_candidates(db, company_id, pool_id).await?;
    let exclude: HashSet<String> = queries::assignments::list_for_shift(db, shift_id)
        .await?
        .into_iter()
        .map(|a| a.worker_id)
        .collect();
    Ok(rank(candidates, &exclude, limit))
}
