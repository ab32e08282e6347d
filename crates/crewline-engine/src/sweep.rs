// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The four re-entrant background jobs: series generation, coverage
//! auto-fill, no-show detection, and completion promotion.
//!
//! Each job is a fixed-interval loop that can be cancelled cleanly. The
//! `run_*_once` entry points are the actual job bodies; they take an
//! explicit `now` and ignore the enable toggles, so tests and operators can
//! drive a single pass deterministically. One bad row never aborts a pass:
//! per-item failures are logged and the pass moves on.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use crewline_config::model::SweepConfig;
use crewline_core::types::AssignmentStatus;
use crewline_core::{Actor, AutopilotRun, Notifier, Result, TrustSignals};
use crewline_storage::queries;
use crewline_storage::queries::assignments::TransitionOutcome;
use crewline_storage::Database;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::autofill::AutofillEngine;
use crate::shifts::ShiftService;

#[derive(Debug, Clone, Copy)]
enum Job {
    Generation,
    Autofill,
    NoShow,
    Completion,
}

impl Job {
    fn name(self) -> &'static str {
        match self {
            Self::Generation => "generation",
            Self::Autofill => "autofill",
            Self::NoShow => "no_show",
            Self::Completion => "completion",
        }
    }
}

pub struct SweepScheduler {
    db: Arc<Database>,
    shifts: ShiftService,
    autofill: AutofillEngine,
    trust: Arc<dyn TrustSignals>,
    config: SweepConfig,
    token: CancellationToken,
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl SweepScheduler {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn Notifier>,
        trust: Arc<dyn TrustSignals>,
        config: SweepConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            shifts: ShiftService::new(Arc::clone(&db), Arc::clone(&notifier)),
            autofill: AutofillEngine::new(Arc::clone(&db), notifier, config.clone()),
            db,
            trust,
            config,
            token: CancellationToken::new(),
            handles: Mutex::new(Vec::new()),
        })
    }

    /// Spawn one interval loop per enabled job. Idempotent start is not
    /// supported; call once at boot.
    pub async fn start(self: &Arc<Self>) {
        let jobs = [
            (Job::Generation, self.config.generation_enabled),
            (Job::Autofill, self.config.autofill_enabled),
            (Job::NoShow, self.config.no_show_enabled),
            (Job::Completion, self.config.completion_enabled),
        ];
        let mut handles = self.handles.lock().await;
        for (job, enabled) in jobs {
            if !enabled {
                debug!(job = job.name(), "sweep job disabled");
                continue;
            }
            handles.push(self.spawn_job(job));
        }
        info!(
            jobs = handles.len(),
            tick_seconds = self.config.tick_seconds,
            "sweep scheduler started"
        );
    }

    fn spawn_job(self: &Arc<Self>, job: Job) -> JoinHandle<()> {
        let scheduler = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker =
                tokio::time::interval(StdDuration::from_secs(scheduler.config.tick_seconds));
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = scheduler.token.cancelled() => {
                        debug!(job = job.name(), "sweep job stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = scheduler.run_job(job, Utc::now()).await {
                            warn!(job = job.name(), error = %e, "sweep tick failed");
                        }
                    }
                }
            }
        })
    }

    async fn run_job(&self, job: Job, now: DateTime<Utc>) -> Result<()> {
        match job {
            Job::Generation => {
                self.run_generation_once(now).await?;
            }
            Job::Autofill => {
                self.run_autofill_once(now).await?;
            }
            Job::NoShow => {
                self.run_no_show_once(now).await?;
            }
            Job::Completion => {
                self.run_completion_once(now).await?;
            }
        }
        Ok(())
    }

    /// Cancel every job loop and wait for the tasks to drain.
    pub async fn stop(&self) {
        self.token.cancel();
        let mut handles = self.handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "sweep task panicked during shutdown");
            }
        }
        info!("sweep scheduler stopped");
    }

    /// Materialize shifts for every series whose last generation pass is
    /// older than the configured interval. Returns the number of shifts
    /// created.
    pub async fn run_generation_once(&self, now: DateTime<Utc>) -> Result<u32> {
        let stale_before =
            now - Duration::minutes(i64::from(self.config.generation_interval_minutes));
        let due = queries::series::list_due_for_generation(&self.db, stale_before).await?;
        let mut created = 0;
        for series in &due {
            match self.shifts.generate_now(&series.company_id, &series.id, now).await {
                Ok(report) => created += report.created,
                Err(e) => {
                    warn!(series_id = %series.id, error = %e, "generation failed for series");
                }
            }
        }
        if !due.is_empty() {
            info!(series = due.len(), created, "generation sweep pass finished");
        }
        Ok(created)
    }

    /// One coverage auto-fill pass across all companies.
    pub async fn run_autofill_once(&self, now: DateTime<Utc>) -> Result<Vec<AutopilotRun>> {
        self.autofill.run_sweep(now).await
    }

    /// Confirm no-shows: invited or accepted assignments whose shift ended
    /// strictly more than the grace period ago. Returns the number
    /// confirmed. Each confirmation emits a best-effort trust signal.
    pub async fn run_no_show_once(&self, now: DateTime<Utc>) -> Result<u32> {
        let cutoff = now - Duration::minutes(i64::from(self.config.grace_minutes));
        let candidates = queries::assignments::list_no_show_candidates(
            &self.db,
            cutoff,
            self.config.max_shifts_per_sweep,
        )
        .await?;
        let mut confirmed = 0;
        for assignment in candidates {
            match queries::assignments::apply_transition(
                &self.db,
                &assignment.id,
                AssignmentStatus::NoShow,
                Actor::Sweep,
                now,
            )
            .await
            {
                Ok(TransitionOutcome::Applied(_)) => {
                    confirmed += 1;
                    if let Err(e) = self
                        .trust
                        .record_policy_event(
                            &assignment.worker_id,
                            "no_show",
                            "shift",
                            &assignment.shift_id,
                        )
                        .await
                    {
                        warn!(
                            worker_id = %assignment.worker_id,
                            error = %e,
                            "trust signal delivery failed, dropping"
                        );
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(assignment_id = %assignment.id, error = %e, "no-show confirmation failed");
                }
            }
        }
        if confirmed > 0 {
            info!(confirmed, "no-show sweep pass finished");
        }
        Ok(confirmed)
    }

    /// Promote ended shifts: `CheckedOut` assignments become `Completed`,
    /// then the shift itself completes once no assignment still holds a
    /// non-terminal status. A shift nobody worked completes as well.
    /// Returns the number of shifts completed.
    pub async fn run_completion_once(&self, now: DateTime<Utc>) -> Result<u32> {
        let cutoff = now - Duration::minutes(i64::from(self.config.grace_minutes));
        let ended = queries::shifts::list_ended_scheduled(
            &self.db,
            cutoff,
            self.config.max_shifts_per_sweep,
        )
        .await?;
        let mut completed = 0;
        for shift in ended {
            match self.promote_shift(&shift.id, &shift.company_id, now).await {
                Ok(true) => completed += 1,
                Ok(false) => {}
                Err(e) => {
                    warn!(shift_id = %shift.id, error = %e, "completion promotion failed");
                }
            }
        }
        if completed > 0 {
            info!(completed, "completion sweep pass finished");
        }
        Ok(completed)
    }

    async fn promote_shift(
        &self,
        shift_id: &str,
        company_id: &str,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let assignments = queries::assignments::list_for_shift(&self.db, shift_id).await?;
        let mut blocking = 0;
        for assignment in assignments {
            let status = match assignment.status {
                AssignmentStatus::CheckedOut => {
                    match queries::assignments::apply_transition(
                        &self.db,
                        &assignment.id,
                        AssignmentStatus::Completed,
                        Actor::Sweep,
                        now,
                    )
                    .await?
                    {
                        TransitionOutcome::Applied(status) => status,
                        // Raced by another actor; re-read would cost a
                        // round-trip, the next pass settles it.
                        _ => assignment.status,
                    }
                }
                other => other,
            };
            if !status.is_terminal() {
                blocking += 1;
            }
        }
        if blocking > 0 {
            debug!(shift_id, blocking, "shift not yet completable");
            return Ok(false);
        }
        queries::shifts::complete(&self.db, company_id, shift_id).await
    }
}
