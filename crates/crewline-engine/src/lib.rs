// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduling services for the Crewline engine.
//!
//! Each service owns one operational concern on top of the storage layer:
//!
//! - [`ShiftService`] - series generation, previews, schedule edits, cancellation
//! - [`AssignmentService`] - invitations and the assignment state machine
//! - [`ranker`] - deterministic candidate ordering for coverage
//! - [`AutofillEngine`] - coverage auto-fill, manual and sweep-driven
//! - [`CheckinService`] - code/geofence-verified attendance capture
//! - [`SweepScheduler`] - the four re-entrant background jobs

pub mod assignments;
pub mod autofill;
pub mod checkin;
pub mod ranker;
pub mod shifts;
pub mod sweep;

pub use assignments::AssignmentService;
pub use autofill::{AutofillEngine, FillMode, FillReport, ShiftFillOutcome};
pub use checkin::CheckinService;
pub use shifts::ShiftService;
pub use sweep::SweepScheduler;

use crewline_core::{Notification, Notifier};
use tracing::warn;

/// Deliver a notification without letting a backend failure surface.
/// Every producer in this crate uses this path; a state change must never
/// roll back because a side channel is down.
pub(crate) async fn notify_best_effort(notifier: &dyn Notifier, notification: Notification) {
    let kind = notification.kind.clone();
    let user_id = notification.user_id.clone();
    if let Err(e) = notifier.notify(notification).await {
        warn!(%kind, %user_id, error = %e, "notification delivery failed, dropping");
    }
}
