// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shift lifecycle service: series generation, previews, ad hoc creation,
//! schedule edits, cancellation, check-in codes, geofences.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use crewline_core::calendar::{self, DateWindow, Occurrence, RecurrenceRule};
use crewline_core::types::{SeriesStatus, Shift, ShiftSeries, ShiftStatus};
use crewline_core::{code, CrewlineError, Geofence, Notification, Notifier, Result};
use crewline_storage::queries::shifts::{CancelOutcome, ScheduleUpdate};
use crewline_storage::{queries, Database};
use tracing::{debug, info};
use uuid::Uuid;

/// Outcome of one generation pass over a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GenerationReport {
    /// Shifts newly materialized this pass.
    pub created: u32,
    /// Occurrence dates that already had a shift; absorbed, never duplicated.
    pub already_present: u32,
}

pub struct ShiftService {
    db: Arc<Database>,
    notifier: Arc<dyn Notifier>,
}

impl ShiftService {
    pub fn new(db: Arc<Database>, notifier: Arc<dyn Notifier>) -> Self {
        Self { db, notifier }
    }

    fn rule_of(series: &ShiftSeries) -> RecurrenceRule {
        RecurrenceRule {
            interval_weeks: series.interval_weeks,
            days_of_week: series.days_of_week.clone(),
            start_date: series.start_date,
            end_date: series.end_date,
            start_time: series.start_time,
            end_time: series.end_time,
        }
    }

    /// Expand a series over a window without writing anything. Occurrences
    /// whose date is already materialized come back flagged.
    pub async fn preview(
        &self,
        company_id: &str,
        series_id: &str,
        window: DateWindow,
    ) -> Result<Vec<Occurrence>> {
        let series = queries::series::get(&self.db, company_id, series_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("series", series_id))?;
        let skips = queries::series::list_exceptions(&self.db, series_id).await?;
        let existing = queries::shifts::list_occurrence_dates(&self.db, series_id).await?;
        calendar::expand(&Self::rule_of(&series), window, &skips, &existing)
    }

    /// Materialize a series' occurrences over its lookahead window starting
    /// at `now`. Re-running is safe: dates that already carry a shift are
    /// absorbed. Stamps `last_generated_at` even when nothing was produced.
    pub async fn generate_now(
        &self,
        company_id: &str,
        series_id: &str,
        now: DateTime<Utc>,
    ) -> Result<GenerationReport> {
        let series = queries::series::get(&self.db, company_id, series_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("series", series_id))?;
        if series.status != SeriesStatus::Active {
            return Err(CrewlineError::Conflict(format!(
                "series `{series_id}` is {}, only active series generate shifts",
                series.status
            )));
        }
        let template = queries::templates::get(&self.db, company_id, &series.template_id)
            .await?
            .ok_or_else(|| CrewlineError::not_found("template", series.template_id.clone()))?;

        let from = now.date_naive();
        let to = from + Duration::days(i64::from(series.lookahead_days));
        let window = DateWindow { from, to };
        let skips = queries::series::list_exceptions(&self.db, series_id).await?;
        let existing = queries::shifts::list_occurrence_dates(&self.db, series_id).await?;
        let occurrences = calendar::expand(&Self::rule_of(&series), window, &skips, &existing)?;

        let mut report = GenerationReport::default();
        for occ in &occurrences {
            if occ.already_generated {
                report.already_present += 1;
                continue;
            }
            let shift = Shift {
                id: Uuid::new_v4().to_string(),
                company_id: company_id.to_string(),
                series_id: Some(series_id.to_string()),
                occurrence_date: Some(occ.date),
                title: template.title.clone(),
                role_tag: template.role_tag.clone(),
                location: template.location.clone(),
                department: template.department.clone(),
                start_at: occ.start_at,
                end_at: occ.end_at,
                headcount: template.headcount,
                status: ShiftStatus::Scheduled,
                checkin_code_hash: None,
                code_rotated_at: None,
                geofence: template.geofence,
                autofill_disabled: false,
            };
            if queries::shifts::materialize(&self.db, &shift).await? {
                report.created += 1;
            } else {
                // Lost the race to a concurrent pass; the slot is taken.
                report.already_present += 1;
            }
        }
        queries::series::stamp_generated_at(&self.db, series_id, now).await?;

        debug!(
            series_id,
            created = report.created,
            already_present = report.already_present,
            "generation pass finished"
        );
        Ok(report)
    }

    /// Create a one-off shift outside any series.
    pub async fn create_ad_hoc(&self, shift: &Shift) -> Result<()> {
        if shift.end_at <= shift.start_at {
            return Err(CrewlineError::validation(
                "end_at",
                "shift must end after it starts",
            ));
        }
        if shift.headcount == 0 {
            return Err(CrewlineError::validation(
                "headcount",
                "headcount must be at least 1",
            ));
        }
        queries::shifts::create(&self.db, shift).await
    }

    /// Edit a shift's times and headcount. Schedules freeze once the shift
    /// has started.
    pub async fn update_schedule(
        &self,
        company_id: &str,
        shift_id: &str,
        start_at: DateTime<Utc>,
        end_at: DateTime<Utc>,
        headcount: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if end_at <= start_at {
            return Err(CrewlineError::validation(
                "end_at",
                "shift must end after it starts",
            ));
        }
        let outcome = queries::shifts::update_schedule(
            &self.db, company_id, shift_id, start_at, end_at, headcount, now,
        )
        .await?;
        match outcome {
            ScheduleUpdate::Updated => Ok(()),
            ScheduleUpdate::Frozen => Err(CrewlineError::Conflict(format!(
                "shift `{shift_id}` has started, its schedule is frozen"
            ))),
            ScheduleUpdate::Missing => Err(CrewlineError::not_found("shift", shift_id)),
        }
    }

    /// Cancel a shift, cascading its open invitations. Workers whose
    /// assignment was cancelled are notified best-effort. Returns the number
    /// of cascaded assignments; re-cancelling is an idempotent zero.
    pub async fn cancel(&self, company_id: &str, shift_id: &str) -> Result<u32> {
        // Snapshot the open assignments first so the cascaded workers can be
        // notified after the fact.
        let open: Vec<_> = queries::assignments::list_for_shift(&self.db, shift_id)
            .await?
            .into_iter()
            .filter(|a| {
                matches!(
                    a.status,
                    crewline_core::AssignmentStatus::Invited
                        | crewline_core::AssignmentStatus::Accepted
                )
            })
            .collect();

        match queries::shifts::cancel(&self.db, company_id, shift_id).await? {
            CancelOutcome::Cancelled { cascaded } => {
                info!(shift_id, cascaded, "shift cancelled");
                for assignment in &open {
                    crate::notify_best_effort(
                        self.notifier.as_ref(),
                        Notification {
                            user_id: assignment.worker_id.clone(),
                            kind: "shift_cancelled".to_string(),
                            title: "Shift cancelled".to_string(),
                            body: format!("Your shift `{shift_id}` was cancelled."),
                            dedupe_key: Some(format!("cancel:{}", assignment.id)),
                        },
                    )
                    .await;
                }
                Ok(cascaded as u32)
            }
            CancelOutcome::AlreadyCancelled => Ok(0),
            CancelOutcome::Completed => Err(CrewlineError::Conflict(format!(
                "shift `{shift_id}` is completed and cannot be cancelled"
            ))),
            CancelOutcome::Missing => Err(CrewlineError::not_found("shift", shift_id)),
        }
    }

    /// Rotate the shift's check-in code. The plaintext is returned exactly
    /// once; only the hash is stored.
    pub async fn rotate_code(
        &self,
        company_id: &str,
        shift_id: &str,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let plain = code::generate_code();
        let hash = code::hash_code(&plain);
        let found = queries::shifts::set_code(&self.db, company_id, shift_id, &hash, now).await?;
        if !found {
            return Err(CrewlineError::not_found("shift", shift_id));
        }
        info!(shift_id, "check-in code rotated");
        Ok(plain)
    }

    /// Remove the check-in code, turning code verification off.
    pub async fn disable_code(&self, company_id: &str, shift_id: &str) -> Result<()> {
        if !queries::shifts::clear_code(&self.db, company_id, shift_id).await? {
            return Err(CrewlineError::not_found("shift", shift_id));
        }
        Ok(())
    }

    /// Attach a geofence to the shift.
    pub async fn set_geofence(
        &self,
        company_id: &str,
        shift_id: &str,
        fence: Geofence,
    ) -> Result<()> {
        if fence.radius_m <= 0.0 {
            return Err(CrewlineError::validation(
                "radius_m",
                "geofence radius must be positive",
            ));
        }
        if !queries::shifts::set_geofence(&self.db, company_id, shift_id, Some(fence)).await? {
            return Err(CrewlineError::not_found("shift", shift_id));
        }
        Ok(())
    }

    /// Remove the shift's geofence.
    pub async fn clear_geofence(&self, company_id: &str, shift_id: &str) -> Result<()> {
        if !queries::shifts::set_geofence(&self.db, company_id, shift_id, None).await? {
            return Err(CrewlineError::not_found("shift", shift_id));
        }
        Ok(())
    }

    /// Opt one shift out of (or back into) coverage auto-fill.
    pub async fn set_autofill_disabled(
        &self,
        company_id: &str,
        shift_id: &str,
        disabled: bool,
    ) -> Result<()> {
        if !queries::shifts::set_autofill_disabled(&self.db, company_id, shift_id, disabled).await?
        {
            return Err(CrewlineError::not_found("shift", shift_id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use crewline_core::AssignmentStatus;
    use crewline_test_utils::fixtures;
    use crewline_test_utils::RecordingOutbound;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    async fn service() -> (ShiftService, Arc<RecordingOutbound>, Arc<Database>, tempfile::TempDir)
    {
        let (db, dir) = fixtures::open_temp_db().await;
        let db = Arc::new(db);
        let outbound = Arc::new(RecordingOutbound::new());
        let service = ShiftService::new(Arc::clone(&db), outbound.clone());
        (service, outbound, db, dir)
    }

    #[tokio::test]
    async fn generation_is_idempotent() {
        let (service, _outbound, db, _dir) = service().await;
        let seeded = fixtures::seed_company(&db, "co-1", 0).await;

        // Seeded series: weekly Mon/Wed/Fri from 2024-06-03, lookahead 14d.
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let first = service.generate_now("co-1", &seeded.series_id, now).await.unwrap();
        assert_eq!(first.created, 7, "Mon/Wed/Fri over 15 days from a Monday");

        let second = service.generate_now("co-1", &seeded.series_id, now).await.unwrap();
        assert_eq!(second.created, 0);
        assert_eq!(second.already_present, 7);

        let series = queries::series::get(&db, "co-1", &seeded.series_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(series.last_generated_at, Some(now));
    }

    #[tokio::test]
    async fn generation_honors_skip_exceptions() {
        let (service, _outbound, db, _dir) = service().await;
        let seeded = fixtures::seed_company(&db, "co-1", 0).await;
        queries::series::add_exception(&db, &seeded.series_id, date("2024-06-05"))
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let report = service.generate_now("co-1", &seeded.series_id, now).await.unwrap();
        assert_eq!(report.created, 6);

        let dates = queries::shifts::list_occurrence_dates(&db, &seeded.series_id)
            .await
            .unwrap();
        assert!(!dates.contains(&date("2024-06-05")));
    }

    #[tokio::test]
    async fn paused_series_refuses_generation() {
        let (service, _outbound, db, _dir) = service().await;
        let seeded = fixtures::seed_company(&db, "co-1", 0).await;
        let mut series = queries::series::get(&db, "co-1", &seeded.series_id)
            .await
            .unwrap()
            .unwrap();
        series.status = SeriesStatus::Paused;
        queries::series::update(&db, &series).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        let err = service
            .generate_now("co-1", &seeded.series_id, now)
            .await
            .unwrap_err();
        assert!(matches!(err, CrewlineError::Conflict(_)));
    }

    #[tokio::test]
    async fn preview_writes_nothing() {
        let (service, _outbound, db, _dir) = service().await;
        let seeded = fixtures::seed_company(&db, "co-1", 0).await;

        let window = DateWindow {
            from: date("2024-06-03"),
            to: date("2024-06-09"),
        };
        let occ = service.preview("co-1", &seeded.series_id, window).await.unwrap();
        assert_eq!(occ.len(), 3);
        assert!(occ.iter().all(|o| !o.already_generated));

        let dates = queries::shifts::list_occurrence_dates(&db, &seeded.series_id)
            .await
            .unwrap();
        assert!(dates.is_empty());
    }

    #[tokio::test]
    async fn frozen_schedule_rejected_with_conflict() {
        let (service, _outbound, db, _dir) = service().await;
        let shift = fixtures::shift("sh-1", "co-1");
        service.create_ad_hoc(&shift).await.unwrap();

        let after_start = shift.start_at + Duration::minutes(1);
        let err = service
            .update_schedule(
                "co-1",
                "sh-1",
                shift.start_at + Duration::hours(1),
                shift.end_at + Duration::hours(1),
                5,
                after_start,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, CrewlineError::Conflict(_)));

        let stored = queries::shifts::get(&db, "co-1", "sh-1").await.unwrap().unwrap();
        assert_eq!(stored.headcount, shift.headcount);
    }

    #[tokio::test]
    async fn cancel_notifies_cascaded_workers() {
        let (service, outbound, db, _dir) = service().await;
        service.create_ad_hoc(&fixtures::shift("sh-1", "co-1")).await.unwrap();
        for (id, worker) in [("as-1", "w-1"), ("as-2", "w-2")] {
            queries::assignments::invite(
                &db,
                &crewline_core::ShiftAssignment {
                    id: id.to_string(),
                    shift_id: "sh-1".to_string(),
                    worker_id: worker.to_string(),
                    status: AssignmentStatus::Invited,
                    origin: crewline_core::InviteOrigin::Manual,
                    invited_at: Utc.with_ymd_and_hms(2024, 6, 9, 12, 0, 0).unwrap(),
                    responded_at: None,
                    check_in_at: None,
                    check_out_at: None,
                    completed_at: None,
                    no_show_confirmed_at: None,
                },
            )
            .await
            .unwrap();
        }

        let cascaded = service.cancel("co-1", "sh-1").await.unwrap();
        assert_eq!(cascaded, 2);
        assert_eq!(outbound.sent_count().await, 2);

        // Idempotent re-cancel: no new work, no new notifications.
        assert_eq!(service.cancel("co-1", "sh-1").await.unwrap(), 0);
        assert_eq!(outbound.sent_count().await, 2);
    }

    #[tokio::test]
    async fn rotate_code_returns_plaintext_and_stores_hash() {
        let (service, _outbound, db, _dir) = service().await;
        service.create_ad_hoc(&fixtures::shift("sh-1", "co-1")).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 9, 8, 0, 0).unwrap();
        let plain = service.rotate_code("co-1", "sh-1", now).await.unwrap();
        assert_eq!(plain.len(), code::CODE_LEN);

        let stored = queries::shifts::get(&db, "co-1", "sh-1").await.unwrap().unwrap();
        let hash = stored.checkin_code_hash.unwrap();
        assert_ne!(hash, plain);
        assert!(code::verify_code(&plain, &hash));
    }

    #[tokio::test]
    async fn ad_hoc_validation_rejects_inverted_times() {
        let (service, _outbound, _db, _dir) = service().await;
        let mut shift = fixtures::shift("sh-1", "co-1");
        shift.end_at = shift.start_at;
        let err = service.create_ad_hoc(&shift).await.unwrap_err();
        assert!(matches!(
            err,
            CrewlineError::Validation { ref field, .. } if field == "end_at"
        ));
    }
}
