// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The assignment transition table.
//!
//! Three kinds of actor drive an assignment through its lifecycle: the
//! worker (self-service), the employer, and the background sweeps. Legality
//! is decided by one exhaustive match over (current, target, actor) so the
//! "no illegal transition" invariant is checkable in one place rather than
//! scattered through call sites.
//!
//! Idempotence contract: requesting the status an assignment already holds
//! is a [`TransitionPlan::NoOp`] success, including on terminal states.
//! Bulk callers rely on this to not fail a batch over an already-settled
//! item.

use crate::types::AssignmentStatus;

/// Who is requesting the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    /// The assigned worker acting on their own assignment.
    Worker,
    /// An employer role (owner/ops/supervisor) or a cancellation cascade.
    Employer,
    /// An autonomous background sweep.
    Sweep,
}

/// The single timestamp column stamped the first time a status is reached.
/// `Cancelled` has no dedicated column and stamps nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StampField {
    RespondedAt,
    CheckInAt,
    CheckOutAt,
    CompletedAt,
    NoShowConfirmedAt,
}

/// Outcome of planning a transition. `Apply` carries the timestamp column
/// to stamp (first-write-wins; a re-reached status never overwrites).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionPlan {
    Apply(Option<StampField>),
    NoOp,
    Illegal,
}

/// Decide whether `actor` may move an assignment from `current` to `target`.
pub fn plan(
    current: AssignmentStatus,
    target: AssignmentStatus,
    actor: Actor,
) -> TransitionPlan {
    use AssignmentStatus::*;
    use TransitionPlan::*;

    // Same-status requests are always absorbed, terminal or not. This covers
    // retried worker actions (double-tap check-in) and bulk re-applies.
    if current == target {
        return NoOp;
    }

    match (current, target, actor) {
        // Worker responds to an invitation.
        (Invited, Accepted, Actor::Worker) => Apply(Some(StampField::RespondedAt)),
        (Invited, Declined, Actor::Worker) => Apply(Some(StampField::RespondedAt)),

        // Shift cancellation cascade or employer bulk action.
        (Invited, Cancelled, Actor::Employer | Actor::Sweep) => Apply(None),
        (Accepted, Cancelled, _) => Apply(None),

        // Worker self check-in (gated upstream by the check-in verifier).
        (Accepted, CheckedIn, Actor::Worker) => Apply(Some(StampField::CheckInAt)),

        // Worker self check-out.
        (CheckedIn, CheckedOut, Actor::Worker) => Apply(Some(StampField::CheckOutAt)),

        // Employer can force-settle a worker who is on site.
        (CheckedIn, Completed, Actor::Employer) => Apply(Some(StampField::CompletedAt)),
        (CheckedIn, NoShow, Actor::Employer) => Apply(Some(StampField::NoShowConfirmedAt)),

        // Completion promotion after check-out.
        (CheckedOut, Completed, Actor::Employer | Actor::Sweep) => {
            Apply(Some(StampField::CompletedAt))
        }

        // No-show sweep: no check-in ever recorded, grace expired.
        (Invited | Accepted, NoShow, Actor::Sweep) => {
            Apply(Some(StampField::NoShowConfirmedAt))
        }

        _ => Illegal,
    }
}
