// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Verified attendance capture.
//!
//! Check-in and check-out are worker-initiated and gated by the shift's
//! configured proofs: a rotating numeric code, a geofence, or neither. Every
//! accepted capture both advances the assignment state machine and appends
//! to the attendance ledger.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use crewline_core::types::{
    AssignmentStatus, AttendanceEvent, AttendanceKind, AttendanceMethod, Shift, ShiftStatus,
};
use crewline_core::{code, geo, Actor, CrewlineError, Result, ShiftAssignment};
use crewline_storage::queries;
use crewline_storage::queries::assignments::TransitionOutcome;
use crewline_storage::Database;
use tracing::info;
use uuid::Uuid;

/// Check-in opens this long before the scheduled start.
fn early_check_in_window() -> Duration {
    Duration::hours(2)
}

/// Check-out stays open this long after the scheduled end, even for workers
/// who checked in on time. Past it the assignment needs an employer
/// `completed` confirmation instead, which keeps very late self-reports off
/// the attendance ledger.
fn late_check_out_window() -> Duration {
    Duration::hours(2)
}

/// Result of a capture attempt that did not error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceOutcome {
    /// State advanced and a ledger event was appended.
    Recorded,
    /// The assignment was already in the requested state; nothing written.
    AlreadyRecorded,
}

pub struct CheckinService {
    db: Arc<Database>,
}

impl CheckinService {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Load the assignment and its shift, enforcing worker identity and
    /// that the shift is still live.
    async fn load_verified(
        &self,
        assignment_id: &str,
        worker_id: &str,
    ) -> Result<(ShiftAssignment, Shift)> {
        let assignment = queries::assignments::get(&self.db, assignment_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("assignment", assignment_id))?;
        if assignment.worker_id != worker_id {
            return Err(CrewlineError::PermissionDenied(
                "assignment belongs to a different worker".to_string(),
            ));
        }
        let shift = queries::shifts::get_by_id(&self.db, &assignment.shift_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("shift", &assignment.shift_id))?;
        if shift.status != ShiftStatus::Scheduled {
            return Err(CrewlineError::Conflict(format!(
                "shift `{}` is {}, attendance is closed",
                shift.id, shift.status
            )));
        }
        Ok((assignment, shift))
    }

    fn record_event(
        assignment_id: &str,
        kind: AttendanceKind,
        method: AttendanceMethod,
        coords: Option<(f64, f64)>,
        now: DateTime<Utc>,
    ) -> AttendanceEvent {
        AttendanceEvent {
            id: Uuid::new_v4().to_string(),
            assignment_id: assignment_id.to_string(),
            kind,
            method,
            lat: coords.map(|(lat, _)| lat),
            lng: coords.map(|(_, lng)| lng),
            recorded_at: now,
        }
    }

    /// Worker check-in. Verifies the shift's configured proofs before
    /// advancing `Accepted -> CheckedIn` and appending a ledger event.
    /// A repeated check-in is a tolerated no-op.
    pub async fn check_in(
        &self,
        assignment_id: &str,
        worker_id: &str,
        submitted_code: Option<&str>,
        coords: Option<(f64, f64)>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceOutcome> {
        let (assignment, shift) = self.load_verified(assignment_id, worker_id).await?;

        if assignment.status == AssignmentStatus::CheckedIn {
            return Ok(AttendanceOutcome::AlreadyRecorded);
        }
        if assignment.status != AssignmentStatus::Accepted {
            return Err(CrewlineError::PermissionDenied(format!(
                "cannot check in from status `{}`",
                assignment.status
            )));
        }
        if now < shift.start_at - early_check_in_window() {
            return Err(CrewlineError::PermissionDenied(format!(
                "check-in opens at {}",
                shift.start_at - early_check_in_window()
            )));
        }
        if now > shift.end_at {
            return Err(CrewlineError::PermissionDenied(
                "shift has already ended".to_string(),
            ));
        }

        if let Some(stored_hash) = shift.checkin_code_hash.as_deref() {
            let ok = submitted_code.is_some_and(|c| code::verify_code(c.trim(), stored_hash));
            if !ok {
                return Err(CrewlineError::PermissionDenied(
                    "check-in code is missing or incorrect".to_string(),
                ));
            }
        }

        if let Some(fence) = &shift.geofence {
            let (lat, lng) = coords.ok_or_else(|| {
                CrewlineError::PermissionDenied(
                    "this shift requires location to check in".to_string(),
                )
            })?;
            let result = geo::check(fence, lat, lng);
            if !result.within {
                return Err(CrewlineError::PermissionDenied(format!(
                    "outside the geofence by {:.0} m",
                    result.distance_m - fence.radius_m
                )));
            }
        }

        let method = if shift.geofence.is_some() && coords.is_some() {
            AttendanceMethod::Geo
        } else if shift.checkin_code_hash.is_some() {
            AttendanceMethod::Qr
        } else {
            AttendanceMethod::SelfService
        };

        match queries::assignments::apply_transition(
            &self.db,
            assignment_id,
            AssignmentStatus::CheckedIn,
            Actor::Worker,
            now,
        )
        .await?
        {
            TransitionOutcome::Applied(_) => {
                let event = Self::record_event(
                    assignment_id,
                    AttendanceKind::CheckIn,
                    method,
                    coords,
                    now,
                );
                queries::ops::append_attendance(&self.db, &event).await?;
                info!(assignment_id, worker_id, %method, "worker checked in");
                Ok(AttendanceOutcome::Recorded)
            }
            TransitionOutcome::NoOp => Ok(AttendanceOutcome::AlreadyRecorded),
            TransitionOutcome::Illegal { current } => Err(CrewlineError::Conflict(format!(
                "assignment moved to `{current}` while checking in"
            ))),
            TransitionOutcome::Missing => {
                Err(CrewlineError::not_found("assignment", assignment_id))
            }
        }
    }

    /// Worker check-out, `CheckedIn -> CheckedOut`. No proof is re-verified;
    /// the worker already proved presence at check-in. Closes two hours
    /// after the scheduled end.
    pub async fn check_out(
        &self,
        assignment_id: &str,
        worker_id: &str,
        coords: Option<(f64, f64)>,
        now: DateTime<Utc>,
    ) -> Result<AttendanceOutcome> {
        let (assignment, shift) = self.load_verified(assignment_id, worker_id).await?;

        if assignment.status == AssignmentStatus::CheckedOut {
            return Ok(AttendanceOutcome::AlreadyRecorded);
        }
        if assignment.status != AssignmentStatus::CheckedIn {
            return Err(CrewlineError::PermissionDenied(format!(
                "cannot check out from status `{}`",
                assignment.status
            )));
        }
        if now > shift.end_at + late_check_out_window() {
            return Err(CrewlineError::PermissionDenied(
                "check-out window has closed, contact the employer".to_string(),
            ));
        }

        let method = if shift.geofence.is_some() && coords.is_some() {
            AttendanceMethod::Geo
        } else {
            AttendanceMethod::SelfService
        };

        match queries::assignments::apply_transition(
            &self.db,
            assignment_id,
            AssignmentStatus::CheckedOut,
            Actor::Worker,
            now,
        )
        .await?
        {
            TransitionOutcome::Applied(_) => {
                let event = Self::record_event(
                    assignment_id,
                    AttendanceKind::CheckOut,
                    method,
                    coords,
                    now,
                );
                queries::ops::append_attendance(&self.db, &event).await?;
                info!(assignment_id, worker_id, "worker checked out");
                Ok(AttendanceOutcome::Recorded)
            }
            TransitionOutcome::NoOp => Ok(AttendanceOutcome::AlreadyRecorded),
            TransitionOutcome::Illegal { current } => Err(CrewlineError::Conflict(format!(
                "assignment moved to `{current}` while checking out"
            ))),
            TransitionOutcome::Missing => {
                Err(CrewlineError::not_found("assignment", assignment_id))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use crewline_core::types::{Geofence, InviteOrigin};
    use crewline_test_utils::fixtures;

    // fixtures::shift runs 2024-06-10 09:00-17:00 UTC.
    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, h, m, 0).unwrap()
    }

    async fn setup() -> (CheckinService, Arc<Database>, tempfile::TempDir) {
        let (db, dir) = fixtures::open_temp_db().await;
        let db = Arc::new(db);
        (CheckinService::new(Arc::clone(&db)), db, dir)
    }

    /// Create a shift and an accepted assignment for worker `w-1`.
    async fn seed_accepted(db: &Database, shift: &Shift) -> String {
        queries::shifts::create(db, shift).await.unwrap();
        let assignment = ShiftAssignment {
            id: format!("{}-a", shift.id),
            shift_id: shift.id.clone(),
            worker_id: "w-1".to_string(),
            status: AssignmentStatus::Invited,
            origin: InviteOrigin::Manual,
            invited_at: at(6, 0),
            responded_at: None,
            check_in_at: None,
            check_out_at: None,
            completed_at: None,
            no_show_confirmed_at: None,
        };
        queries::assignments::invite(db, &assignment).await.unwrap();
        queries::assignments::apply_transition(
            db,
            &assignment.id,
            AssignmentStatus::Accepted,
            Actor::Worker,
            at(6, 30),
        )
        .await
        .unwrap();
        assignment.id
    }

    #[tokio::test]
    async fn plain_check_in_records_self_service() {
        let (svc, db, _dir) = setup().await;
        let shift = fixtures::shift("sh-1", "co-1");
        let aid = seed_accepted(&db, &shift).await;

        let outcome = svc.check_in(&aid, "w-1", None, None, at(8, 45)).await.unwrap();
        assert_eq!(outcome, AttendanceOutcome::Recorded);

        let assignment = queries::assignments::get(&db, &aid).await.unwrap().unwrap();
        assert_eq!(assignment.status, AssignmentStatus::CheckedIn);
        assert_eq!(assignment.check_in_at, Some(at(8, 45)));

        let ledger = queries::ops::list_attendance(&db, &aid).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, AttendanceKind::CheckIn);
        assert_eq!(ledger[0].method, AttendanceMethod::SelfService);
    }

    #[tokio::test]
    async fn repeated_check_in_is_a_no_op() {
        let (svc, db, _dir) = setup().await;
        let shift = fixtures::shift("sh-1", "co-1");
        let aid = seed_accepted(&db, &shift).await;

        svc.check_in(&aid, "w-1", None, None, at(8, 45)).await.unwrap();
        let outcome = svc.check_in(&aid, "w-1", None, None, at(9, 15)).await.unwrap();
        assert_eq!(outcome, AttendanceOutcome::AlreadyRecorded);

        // First-write-wins stamp, single ledger row.
        let assignment = queries::assignments::get(&db, &aid).await.unwrap().unwrap();
        assert_eq!(assignment.check_in_at, Some(at(8, 45)));
        assert_eq!(queries::ops::list_attendance(&db, &aid).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn early_and_late_attempts_are_denied() {
        let (svc, db, _dir) = setup().await;
        let shift = fixtures::shift("sh-1", "co-1");
        let aid = seed_accepted(&db, &shift).await;

        // 06:59 is more than two hours before the 09:00 start.
        let err = svc.check_in(&aid, "w-1", None, None, at(6, 59)).await.unwrap_err();
        assert!(matches!(err, CrewlineError::PermissionDenied(_)));

        // 07:00 exactly opens the window.
        assert_eq!(
            svc.check_in(&aid, "w-1", None, None, at(7, 0)).await.unwrap(),
            AttendanceOutcome::Recorded
        );

        // Check-out at 19:01 is past end + 2h.
        let err = svc.check_out(&aid, "w-1", None, at(19, 1)).await.unwrap_err();
        assert!(matches!(err, CrewlineError::PermissionDenied(_)));
        assert_eq!(
            svc.check_out(&aid, "w-1", None, at(19, 0)).await.unwrap(),
            AttendanceOutcome::Recorded
        );
    }

    #[tokio::test]
    async fn code_gate_rejects_wrong_or_missing_code() {
        let (svc, db, _dir) = setup().await;
        let mut shift = fixtures::shift("sh-1", "co-1");
        shift.checkin_code_hash = Some(code::hash_code("042913"));
        let aid = seed_accepted(&db, &shift).await;

        let err = svc.check_in(&aid, "w-1", None, None, at(8, 50)).await.unwrap_err();
        assert!(matches!(err, CrewlineError::PermissionDenied(_)));
        let err = svc
            .check_in(&aid, "w-1", Some("000000"), None, at(8, 50))
            .await
            .unwrap_err();
        assert!(matches!(err, CrewlineError::PermissionDenied(_)));

        let outcome = svc
            .check_in(&aid, "w-1", Some(" 042913 "), None, at(8, 50))
            .await
            .unwrap();
        assert_eq!(outcome, AttendanceOutcome::Recorded);
        let ledger = queries::ops::list_attendance(&db, &aid).await.unwrap();
        assert_eq!(ledger[0].method, AttendanceMethod::Qr);
    }

    #[tokio::test]
    async fn geofence_miss_reports_overshoot_distance() {
        let (svc, db, _dir) = setup().await;
        let mut shift = fixtures::shift("sh-1", "co-1");
        shift.geofence = Some(Geofence {
            lat: 40.7128,
            lng: -74.0060,
            radius_m: 50.0,
        });
        let aid = seed_accepted(&db, &shift).await;

        // No coordinates at all.
        let err = svc.check_in(&aid, "w-1", None, None, at(8, 50)).await.unwrap_err();
        assert!(matches!(err, CrewlineError::PermissionDenied(_)));

        // ~111m away from a 50m fence.
        let err = svc
            .check_in(&aid, "w-1", None, Some((40.7138, -74.0060)), at(8, 50))
            .await
            .unwrap_err();
        match err {
            CrewlineError::PermissionDenied(msg) => {
                assert!(msg.contains("outside the geofence by"), "got: {msg}");
            }
            other => panic!("expected PermissionDenied, got {other:?}"),
        }

        // Inside the fence.
        let outcome = svc
            .check_in(&aid, "w-1", None, Some((40.7128, -74.0061)), at(8, 50))
            .await
            .unwrap();
        assert_eq!(outcome, AttendanceOutcome::Recorded);
        let ledger = queries::ops::list_attendance(&db, &aid).await.unwrap();
        assert_eq!(ledger[0].method, AttendanceMethod::Geo);
        assert_eq!(ledger[0].lat, Some(40.7128));
    }

    #[tokio::test]
    async fn identity_and_state_are_enforced() {
        let (svc, db, _dir) = setup().await;
        let shift = fixtures::shift("sh-1", "co-1");
        let aid = seed_accepted(&db, &shift).await;

        let err = svc.check_in(&aid, "w-2", None, None, at(8, 45)).await.unwrap_err();
        assert!(matches!(err, CrewlineError::PermissionDenied(_)));

        // Check-out before check-in is refused.
        let err = svc.check_out(&aid, "w-1", None, at(17, 5)).await.unwrap_err();
        assert!(matches!(err, CrewlineError::PermissionDenied(_)));
    }

    #[tokio::test]
    async fn cancelled_shift_closes_attendance() {
        let (svc, db, _dir) = setup().await;
        let shift = fixtures::shift("sh-1", "co-1");
        let aid = seed_accepted(&db, &shift).await;
        queries::shifts::cancel(&db, "co-1", "sh-1").await.unwrap();

        let err = svc.check_in(&aid, "w-1", None, None, at(8, 45)).await.unwrap_err();
        assert!(matches!(err, CrewlineError::Conflict(_)));
    }
}
