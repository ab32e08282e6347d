// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coverage auto-fill: manual fills and the autonomous per-company sweep.
//!
//! Headcount safety is enforced at the moment of each invitation: the open
//! slot count is recomputed against the canonical active set before every
//! batch, and invitations ride the unique (shift, worker) index, so a
//! concurrent fill converges instead of overbooking.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crewline_config::model::SweepConfig;
use crewline_core::types::{AssignmentStatus, InviteOrigin, RunStatus, Shift};
use crewline_core::{AutopilotRun, CrewlineError, Notification, Notifier, Result};
use crewline_storage::queries;
use crewline_storage::queries::workers::CandidateRow;
use crewline_storage::Database;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How many slots a fill should target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Up to `n` invitations, never beyond the open slot count.
    Count(u32),
    /// Every open slot.
    Remaining,
    /// One invitation per confirmed no-show, capped by open slots.
    ReplaceNoShows,
}

/// Workers invited by one fill call.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FillReport {
    pub invited: Vec<String>,
}

/// Per-shift result of a [`AutofillEngine::fill_many`] batch.
#[derive(Debug)]
pub struct ShiftFillOutcome {
    pub shift_id: String,
    pub result: Result<FillReport>,
}

pub struct AutofillEngine {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    config: SweepConfig,
}

impl AutofillEngine {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn Notifier>, config: SweepConfig) -> Self {
        Self {
            db,
            notifier,
            config,
        }
    }

    /// Open slots on a shift under the canonical active set.
    async fn open_slots(&self, shift: &Shift) -> Result<u32> {
        let active = queries::assignments::count_active(&self.db, &shift.id).await?;
        Ok(shift.headcount.saturating_sub(active))
    }

    /// Resolve the company's configured autofill pool. A missing pointer or
    /// a dangling one is `StaleConfiguration`; the sweep self-heals on it,
    /// manual callers see it as-is.
    async fn resolve_pool(&self, company_id: &str) -> Result<String> {
        let settings = queries::ops::get_settings(&self.db, company_id).await?;
        let pool_id = settings.autofill_pool_id.ok_or_else(|| {
            CrewlineError::StaleConfiguration(format!(
                "company `{company_id}` has no autofill pool configured"
            ))
        })?;
        match queries::workers::get_pool(&self.db, company_id, &pool_id).await? {
            Some(_) => Ok(pool_id),
            None => Err(CrewlineError::StaleConfiguration(format!(
                "autofill pool `{pool_id}` for company `{company_id}` no longer exists"
            ))),
        }
    }

    /// Invite the top-ranked candidates into up to `target` slots. Absorbed
    /// invitations (pair already exists) do not consume the target.
    async fn invite_ranked(
        &self,
        company_id: &str,
        shift: &Shift,
        pool_id: &str,
        target: u32,
        now: DateTime<Utc>,
    ) -> Result<Vec<String>> {
        if target == 0 {
            return Ok(Vec::new());
        }
        let candidates: Vec<CandidateRow> = crate::ranker::rank_candidates(
            &self.db,
            company_id,
            pool_id,
            &shift.id,
            self.config.max_candidates as usize,
        )
        .await?;

        let mut invited = Vec::new();
        for candidate in candidates {
            if invited.len() as u32 >= target {
                break;
            }
            let assignment = crewline_core::ShiftAssignment {
                id: Uuid::new_v4().to_string(),
                shift_id: shift.id.clone(),
                worker_id: candidate.worker_id.clone(),
                status: AssignmentStatus::Invited,
                origin: InviteOrigin::Auto,
                invited_at: now,
                responded_at: None,
                check_in_at: None,
                check_out_at: None,
                completed_at: None,
                no_show_confirmed_at: None,
            };
            if queries::assignments::invite(&self.db, &assignment).await? {
                crate::notify_best_effort(
                    self.notifier.as_ref(),
                    Notification {
                        user_id: candidate.worker_id.clone(),
                        kind: "shift_invite".to_string(),
                        title: format!("New shift: {}", shift.title),
                        body: format!(
                            "{} at {}, starting {}",
                            shift.title, shift.location, shift.start_at
                        ),
                        dedupe_key: Some(format!("invite:{}:{}", shift.id, candidate.worker_id)),
                    },
                )
                .await;
                invited.push(candidate.worker_id);
            }
        }
        Ok(invited)
    }

    /// Fill one shift on demand.
    pub async fn fill_shift(
        &self,
        company_id: &str,
        shift_id: &str,
        mode: FillMode,
        now: DateTime<Utc>,
    ) -> Result<FillReport> {
        let shift = queries::shifts::get(&self.db, company_id, shift_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("shift", shift_id))?;
        if shift.status != crewline_core::ShiftStatus::Scheduled {
            return Err(CrewlineError::Conflict(format!(
                "shift `{shift_id}` is {}, only scheduled shifts can be filled",
                shift.status
            )));
        }

        let open = self.open_slots(&shift).await?;
        let target = match mode {
            FillMode::Remaining => open,
            FillMode::Count(n) => n.min(open),
            FillMode::ReplaceNoShows => {
                let no_shows = queries::assignments::list_for_shift(&self.db, shift_id)
                    .await?
                    .iter()
                    .filter(|a| a.status == AssignmentStatus::NoShow)
                    .count() as u32;
                no_shows.min(open)
            }
        };
        if target == 0 {
            return Ok(FillReport::default());
        }

        let pool_id = self.resolve_pool(company_id).await?;
        let invited = self
            .invite_ranked(company_id, &shift, &pool_id, target, now)
            .await?;
        info!(shift_id, count = invited.len(), ?mode, "shift filled");
        Ok(FillReport { invited })
    }

    /// Fill several shifts with one mode. Per-shift failures are captured in
    /// the outcome list, never propagated; one bad shift does not stop the
    /// batch.
    pub async fn fill_many(
        &self,
        company_id: &str,
        shift_ids: &[String],
        mode: FillMode,
        now: DateTime<Utc>,
    ) -> Vec<ShiftFillOutcome> {
        let mut outcomes = Vec::with_capacity(shift_ids.len());
        for shift_id in shift_ids {
            let result = self.fill_shift(company_id, shift_id, mode, now).await;
            if let Err(e) = &result {
                warn!(shift_id, error = %e, "fill failed for shift");
            }
            outcomes.push(ShiftFillOutcome {
                shift_id: shift_id.clone(),
                result,
            });
        }
        outcomes
    }

    /// One autonomous coverage pass over every company with upcoming work.
    ///
    /// Per company: honors the autofill toggle, self-heals a stale pool by
    /// disabling autofill, scans the lookahead window bounded by
    /// `max_shifts_per_sweep`, and spends at most the remaining per-day
    /// auto-invite budget (counted since UTC midnight). Each company gets an
    /// [`AutopilotRun`] audit row; a failing shift marks the run `Partial`
    /// and the pass moves on.
    pub async fn run_sweep(&self, now: DateTime<Utc>) -> Result<Vec<AutopilotRun>> {
        let companies = queries::shifts::list_companies_with_upcoming(&self.db, now).await?;
        let mut runs = Vec::new();

        for company_id in companies {
            let settings = queries::ops::get_settings(&self.db, &company_id).await?;
            if !settings.autofill_enabled {
                continue;
            }

            let pool_id = match self.resolve_pool(&company_id).await {
                Ok(pool_id) => pool_id,
                Err(CrewlineError::StaleConfiguration(reason)) => {
                    warn!(company_id, %reason, "disabling autofill until reconfigured");
                    queries::ops::disable_autofill(&self.db, &company_id).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let mut run = AutopilotRun {
                id: Uuid::new_v4().to_string(),
                company_id: company_id.clone(),
                started_at: now,
                finished_at: None,
                shifts_processed: 0,
                workers_invited: 0,
                failures: 0,
                status: RunStatus::Ok,
            };
            queries::ops::start_run(&self.db, &run).await?;

            let midnight = now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .unwrap_or_default()
                .and_utc();
            let used_today =
                queries::assignments::count_auto_invites_since(&self.db, &company_id, midnight)
                    .await?;
            let mut budget = settings.max_invites_per_day.saturating_sub(used_today);

            let horizon = now + chrono::Duration::days(i64::from(settings.lookahead_days));
            let shifts = queries::shifts::list_open_upcoming(
                &self.db,
                &company_id,
                now,
                horizon,
                settings.max_shifts_per_sweep,
            )
            .await?;

            for shift in shifts {
                if budget == 0 {
                    debug!(company_id, "daily auto-invite budget exhausted");
                    break;
                }
                run.shifts_processed += 1;
                let outcome = async {
                    let open = self.open_slots(&shift).await?;
                    let target = open.min(budget);
                    self.invite_ranked(&company_id, &shift, &pool_id, target, now)
                        .await
                }
                .await;
                match outcome {
                    Ok(invited) => {
                        let count = invited.len() as u32;
                        run.workers_invited += count;
                        budget -= count.min(budget);
                    }
                    Err(e) => {
                        warn!(company_id, shift_id = %shift.id, error = %e, "autofill failed for shift");
                        run.failures += 1;
                        run.status = RunStatus::Partial;
                    }
                }
            }

            run.finished_at = Some(now);
            queries::ops::finish_run(&self.db, &run).await?;
            queries::ops::stamp_last_run(&self.db, &company_id, now).await?;
            info!(
                company_id,
                shifts = run.shifts_processed,
                invited = run.workers_invited,
                failures = run.failures,
                "autofill sweep finished for company"
            );
            runs.push(run);
        }
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crewline_core::Actor;
    use crewline_test_utils::fixtures;
    use crewline_test_utils::RecordingOutbound;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 9, 6, 0, 0).unwrap()
    }

    async fn engine() -> (
        AutofillEngine,
        Arc<RecordingOutbound>,
        Arc<Database>,
        tempfile::TempDir,
    ) {
        let (db, dir) = fixtures::open_temp_db().await;
        let db = Arc::new(db);
        let outbound = Arc::new(RecordingOutbound::new());
        let engine = AutofillEngine::new(Arc::clone(&db), outbound.clone(), SweepConfig::default());
        (engine, outbound, db, dir)
    }

    /// Seed a company with a pool, enable autofill, and create one upcoming
    /// shift with the given headcount.
    async fn seed_enabled(
        db: &Database,
        company_id: &str,
        workers: usize,
        headcount: u32,
    ) -> (String, String) {
        let seeded = fixtures::seed_company(db, company_id, workers).await;
        let mut settings = queries::ops::get_settings(db, company_id).await.unwrap();
        settings.autofill_enabled = true;
        settings.autofill_pool_id = Some(seeded.pool_id.clone());
        queries::ops::update_settings(db, &settings).await.unwrap();

        let shift_id = format!("{company_id}-sh");
        let mut shift = fixtures::shift(&shift_id, company_id);
        shift.headcount = headcount;
        queries::shifts::create(db, &shift).await.unwrap();
        (shift_id, seeded.pool_id)
    }

    #[tokio::test]
    async fn fill_never_exceeds_open_slots() {
        let (engine, _outbound, db, _dir) = engine().await;
        let (shift_id, _pool) = seed_enabled(&db, "co-1", 5, 2).await;

        let report = engine
            .fill_shift("co-1", &shift_id, FillMode::Remaining, now())
            .await
            .unwrap();
        assert_eq!(report.invited.len(), 2);

        // Already full: a second fill is a no-op.
        let report = engine
            .fill_shift("co-1", &shift_id, FillMode::Remaining, now())
            .await
            .unwrap();
        assert!(report.invited.is_empty());
        assert_eq!(
            queries::assignments::count_active(&db, &shift_id).await.unwrap(),
            2
        );
    }

    #[tokio::test]
    async fn count_mode_is_bounded_by_open_slots() {
        let (engine, _outbound, db, _dir) = engine().await;
        let (shift_id, _pool) = seed_enabled(&db, "co-1", 5, 3).await;

        let report = engine
            .fill_shift("co-1", &shift_id, FillMode::Count(10), now())
            .await
            .unwrap();
        assert_eq!(report.invited.len(), 3);
    }

    #[tokio::test]
    async fn fill_many_captures_per_shift_failures() {
        let (engine, _outbound, db, _dir) = engine().await;
        let (shift_id, _pool) = seed_enabled(&db, "co-1", 4, 2).await;

        let ids = vec![shift_id.clone(), "sh-missing".to_string()];
        let outcomes = engine
            .fill_many("co-1", &ids, FillMode::Remaining, now())
            .await;
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].result.as_ref().unwrap().invited.len(), 2);
        assert!(matches!(
            outcomes[1].result,
            Err(CrewlineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn replace_no_shows_fills_exactly_the_gap() {
        let (engine, _outbound, db, _dir) = engine().await;
        let (shift_id, _pool) = seed_enabled(&db, "co-1", 6, 3).await;

        // Fill, then two of the three no-show.
        let report = engine
            .fill_shift("co-1", &shift_id, FillMode::Remaining, now())
            .await
            .unwrap();
        for worker_id in report.invited.iter().take(2) {
            let a = queries::assignments::get_by_pair(&db, &shift_id, worker_id)
                .await
                .unwrap()
                .unwrap();
            queries::assignments::apply_transition(
                &db,
                &a.id,
                AssignmentStatus::NoShow,
                Actor::Sweep,
                now(),
            )
            .await
            .unwrap();
        }

        let report = engine
            .fill_shift("co-1", &shift_id, FillMode::ReplaceNoShows, now())
            .await
            .unwrap();
        assert_eq!(report.invited.len(), 2);
        assert_eq!(
            queries::assignments::count_active(&db, &shift_id).await.unwrap(),
            3
        );
    }

    #[tokio::test]
    async fn declined_workers_are_not_recourted() {
        let (engine, _outbound, db, _dir) = engine().await;
        let (shift_id, _pool) = seed_enabled(&db, "co-1", 2, 2).await;

        let report = engine
            .fill_shift("co-1", &shift_id, FillMode::Remaining, now())
            .await
            .unwrap();
        assert_eq!(report.invited.len(), 2);

        // One declines; the pool has nobody fresh, so the slot stays open.
        let a = queries::assignments::get_by_pair(&db, &shift_id, &report.invited[0])
            .await
            .unwrap()
            .unwrap();
        queries::assignments::apply_transition(
            &db,
            &a.id,
            AssignmentStatus::Declined,
            Actor::Worker,
            now(),
        )
        .await
        .unwrap();

        let report = engine
            .fill_shift("co-1", &shift_id, FillMode::Remaining, now())
            .await
            .unwrap();
        assert!(report.invited.is_empty());
    }

    #[tokio::test]
    async fn sweep_respects_daily_invite_cap() {
        let (engine, _outbound, db, _dir) = engine().await;
        let (_shift_id, _pool) = seed_enabled(&db, "co-1", 10, 4).await;
        let mut settings = queries::ops::get_settings(&db, "co-1").await.unwrap();
        settings.max_invites_per_day = 3;
        queries::ops::update_settings(&db, &settings).await.unwrap();

        let runs = engine.run_sweep(now()).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].workers_invited, 3, "stops at the cap, not headcount");

        // Same day: budget is spent, nothing more goes out.
        let later = now() + chrono::Duration::hours(2);
        let runs = engine.run_sweep(later).await.unwrap();
        assert_eq!(runs[0].workers_invited, 0);

        // Next UTC day the budget resets.
        let tomorrow = Utc.with_ymd_and_hms(2024, 6, 10, 0, 30, 0).unwrap();
        let runs = engine.run_sweep(tomorrow).await.unwrap();
        assert_eq!(runs[0].workers_invited, 1, "fourth slot filled after reset");
    }

    #[tokio::test]
    async fn sweep_self_heals_stale_pool() {
        let (engine, _outbound, db, _dir) = engine().await;
        let (_shift_id, pool_id) = seed_enabled(&db, "co-1", 3, 2).await;
        queries::workers::delete_pool(&db, "co-1", &pool_id).await.unwrap();

        let runs = engine.run_sweep(now()).await.unwrap();
        assert!(runs.is_empty(), "no run is recorded for a self-healed company");

        let settings = queries::ops::get_settings(&db, "co-1").await.unwrap();
        assert!(!settings.autofill_enabled, "autofill disabled until reconfigured");
    }

    #[tokio::test]
    async fn sweep_skips_disabled_companies_and_optout_shifts() {
        let (engine, outbound, db, _dir) = engine().await;
        let (shift_id, _pool) = seed_enabled(&db, "co-1", 4, 2).await;
        queries::shifts::set_autofill_disabled(&db, "co-1", &shift_id, true)
            .await
            .unwrap();
        // co-2 never enabled autofill.
        let seeded = fixtures::seed_company(&db, "co-2", 4).await;
        queries::shifts::create(&db, &fixtures::shift("co-2-sh", &seeded.company_id))
            .await
            .unwrap();

        let runs = engine.run_sweep(now()).await.unwrap();
        assert_eq!(runs.len(), 1, "only the enabled company gets a run");
        assert_eq!(runs[0].shifts_processed, 0, "opted-out shift is untouched");
        assert_eq!(outbound.sent_count().await, 0);
    }

    #[tokio::test]
    async fn sweep_records_audit_run() {
        let (engine, _outbound, db, _dir) = engine().await;
        seed_enabled(&db, "co-1", 5, 2).await;

        engine.run_sweep(now()).await.unwrap();
        let runs = queries::ops::list_runs(&db, "co-1", 10).await.unwrap();
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].workers_invited, 2);
        assert_eq!(runs[0].status, RunStatus::Ok);
        assert!(runs[0].finished_at.is_some());

        let settings = queries::ops::get_settings(&db, "co-1").await.unwrap();
        assert_eq!(settings.last_run_at, Some(now()));
    }
}
