// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assignment service: invitations plus the actor-gated state machine.
//!
//! Single transitions surface domain errors; bulk operations return a
//! per-worker report instead, so one settled or ineligible worker never
//! fails the batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crewline_core::types::{AssignmentStatus, InviteOrigin, Shift, ShiftStatus};
use crewline_core::{
    Actor, CrewlineError, Notification, Notifier, Result, ShiftAssignment, TrustSignals,
};
use crewline_storage::queries;
use crewline_storage::queries::assignments::TransitionOutcome;
use crewline_storage::Database;
use tracing::{info, warn};
use uuid::Uuid;

/// Per-worker result of a bulk invite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteReport {
    pub worker_id: String,
    /// False when the (shift, worker) pair already existed.
    pub created: bool,
}

/// Per-worker result of a bulk transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionReport {
    pub worker_id: String,
    pub outcome: TransitionOutcome,
}

pub struct AssignmentService {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
    trust: Arc<dyn TrustSignals>,
}

impl AssignmentService {
    pub fn new(
        db: Arc<Database>,
        notifier: Arc<dyn Notifier>,
        trust: Arc<dyn TrustSignals>,
    ) -> Self {
        Self {
            db,
            notifier,
            trust,
        }
    }

    async fn scheduled_shift(&self, company_id: &str, shift_id: &str) -> Result<Shift> {
        let shift = queries::shifts::get(&self.db, company_id, shift_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("shift", shift_id))?;
        if shift.status != ShiftStatus::Scheduled {
            return Err(CrewlineError::Conflict(format!(
                "shift `{shift_id}` is {}, workers can only be invited to scheduled shifts",
                shift.status
            )));
        }
        Ok(shift)
    }

    /// Invite a worker to a shift. Re-inviting an existing pair is absorbed
    /// and the original assignment is returned untouched; only a genuinely
    /// new invitation notifies the worker.
    pub async fn invite(
        &self,
        company_id: &str,
        shift_id: &str,
        worker_id: &str,
        origin: InviteOrigin,
        now: DateTime<Utc>,
    ) -> Result<ShiftAssignment> {
        let shift = self.scheduled_shift(company_id, shift_id).await?;

        let assignment = ShiftAssignment {
            id: Uuid::new_v4().to_string(),
            shift_id: shift_id.to_string(),
            worker_id: worker_id.to_string(),
            status: AssignmentStatus::Invited,
            origin,
            invited_at: now,
            responded_at: None,
            check_in_at: None,
            check_out_at: None,
            completed_at: None,
            no_show_confirmed_at: None,
        };
        let created = queries::assignments::invite(&self.db, &assignment).await?;
        if created {
            info!(shift_id, worker_id, ?origin, "worker invited");
            crate::notify_best_effort(
                self.notifier.as_ref(),
                Notification {
                    user_id: worker_id.to_string(),
                    kind: "shift_invite".to_string(),
                    title: format!("New shift: {}", shift.title),
                    body: format!("{} at {}, starting {}", shift.title, shift.location, shift.start_at),
                    dedupe_key: Some(format!("invite:{shift_id}:{worker_id}")),
                },
            )
            .await;
        }

        queries::assignments::get_by_pair(&self.db, shift_id, worker_id)
            .await?
            .ok_or_else(|| {
                CrewlineError::Internal(format!(
                    "assignment for shift `{shift_id}` worker `{worker_id}` vanished after insert"
                ))
            })
    }

    /// Invite a batch of workers, reporting per worker.
    pub async fn invite_bulk(
        &self,
        company_id: &str,
        shift_id: &str,
        worker_ids: &[String],
        origin: InviteOrigin,
        now: DateTime<Utc>,
    ) -> Result<Vec<InviteReport>> {
        self.scheduled_shift(company_id, shift_id).await?;

        let mut reports = Vec::with_capacity(worker_ids.len());
        for worker_id in worker_ids {
            let existing =
                queries::assignments::get_by_pair(&self.db, shift_id, worker_id).await?;
            if existing.is_some() {
                reports.push(InviteReport {
                    worker_id: worker_id.clone(),
                    created: false,
                });
                continue;
            }
            let assignment = self
                .invite(company_id, shift_id, worker_id, origin, now)
                .await?;
            reports.push(InviteReport {
                worker_id: assignment.worker_id,
                created: true,
            });
        }
        Ok(reports)
    }

    /// Worker self-service response to an invitation.
    pub async fn respond(
        &self,
        assignment_id: &str,
        worker_id: &str,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<ShiftAssignment> {
        let assignment = queries::assignments::get(&self.db, assignment_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("assignment", assignment_id))?;
        if assignment.worker_id != worker_id {
            return Err(CrewlineError::PermissionDenied(
                "assignment belongs to another worker".to_string(),
            ));
        }
        let target = if accept {
            AssignmentStatus::Accepted
        } else {
            AssignmentStatus::Declined
        };
        self.transition(assignment_id, target, Actor::Worker, now)
            .await
    }

    /// Apply a single transition, surfacing `Illegal` as a `Conflict` and a
    /// missing row as `NotFound`. A no-op re-apply succeeds and returns the
    /// unchanged assignment.
    pub async fn transition(
        &self,
        assignment_id: &str,
        target: AssignmentStatus,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<ShiftAssignment> {
        let outcome =
            queries::assignments::apply_transition(&self.db, assignment_id, target, actor, now)
                .await?;
        match outcome {
            TransitionOutcome::Applied(_) | TransitionOutcome::NoOp => {}
            TransitionOutcome::Illegal { current } => {
                return Err(CrewlineError::Conflict(format!(
                    "assignment `{assignment_id}` cannot move from {current} to {target}"
                )));
            }
            TransitionOutcome::Missing => {
                return Err(CrewlineError::not_found("assignment", assignment_id));
            }
        }

        let assignment = queries::assignments::get(&self.db, assignment_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("assignment", assignment_id))?;

        if matches!(outcome, TransitionOutcome::Applied(AssignmentStatus::NoShow)) {
            self.emit_no_show_penalty(&assignment).await;
        }
        Ok(assignment)
    }

    /// Apply one transition to many workers on a shift, reporting per
    /// worker. Ineligible, settled, or unknown workers are reported, never
    /// propagated as errors.
    pub async fn transition_bulk(
        &self,
        shift_id: &str,
        worker_ids: &[String],
        target: AssignmentStatus,
        actor: Actor,
        now: DateTime<Utc>,
    ) -> Result<Vec<TransitionReport>> {
        let mut reports = Vec::with_capacity(worker_ids.len());
        for worker_id in worker_ids {
            let outcome = match queries::assignments::get_by_pair(&self.db, shift_id, worker_id)
                .await?
            {
                None => TransitionOutcome::Missing,
                Some(assignment) => {
                    let outcome = queries::assignments::apply_transition(
                        &self.db,
                        &assignment.id,
                        target,
                        actor,
                        now,
                    )
                    .await?;
                    if matches!(outcome, TransitionOutcome::Applied(AssignmentStatus::NoShow)) {
                        self.emit_no_show_penalty(&assignment).await;
                    }
                    outcome
                }
            };
            reports.push(TransitionReport {
                worker_id: worker_id.clone(),
                outcome,
            });
        }
        Ok(reports)
    }

    /// Fire the trust signal for a confirmed no-show. Best-effort: delivery
    /// failure is logged and dropped.
    pub(crate) async fn emit_no_show_penalty(&self, assignment: &ShiftAssignment) {
        if let Err(e) = self
            .trust
            .record_policy_event(&assignment.worker_id, "no_show", "shift", &assignment.shift_id)
            .await
        {
            warn!(
                worker_id = %assignment.worker_id,
                shift_id = %assignment.shift_id,
                error = %e,
                "trust signal delivery failed, dropping"
            );
        }
    }
}
