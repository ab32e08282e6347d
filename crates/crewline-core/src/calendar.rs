// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pure recurrence expansion: (series rule, date window) -> dated occurrences.
//!
//! The expander never queries state. Callers pass in the skip-exception set
//! and the set of already-materialized dates, and decide what to do with the
//! result; this keeps expansion deterministic and directly testable.

use std::collections::HashSet;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};

use crate::error::{CrewlineError, Result};

/// The recurrence inputs of a series, detached from its identity.
#[derive(Debug, Clone)]
pub struct RecurrenceRule {
    /// Repeat every N weeks, N >= 1, counted from the week of `start_date`.
    pub interval_weeks: u32,
    /// ISO weekday numbers, 1 = Monday .. 7 = Sunday. Must be non-empty.
    pub days_of_week: Vec<u8>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// A closed date window `[from, to]`, UTC, date-only.
#[derive(Debug, Clone, Copy)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// One expanded occurrence.
#[derive(Debug, Clone, PartialEq)]
pub struct Occurrence {
    pub date: NaiveDate,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    /// True when the caller reported this date as already materialized.
    pub already_generated: bool,
}

/// Parse a `YYYY-MM-DD` date string, naming the offending field on failure.
pub fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        CrewlineError::validation(field, format!("expected YYYY-MM-DD, got `{value}`"))
    })
}

/// Parse an `HH:MM` time-of-day string, naming the offending field on failure.
pub fn parse_time(field: &str, value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|_| {
        CrewlineError::validation(field, format!("expected HH:MM, got `{value}`"))
    })
}

/// Expand a recurrence rule over a date window.
///
/// Algorithm: clamp the window to the series bounds, then keep each calendar
/// day whose weekday is in the allowed set and whose week offset from
/// `start_date` lands on the interval, dropping days in the skip set. Start
/// and end instants combine the UTC date with the rule's times of day; an
/// end time at or before the start time rolls to the next day (overnight
/// shift).
pub fn expand(
    rule: &RecurrenceRule,
    window: DateWindow,
    skips: &HashSet<NaiveDate>,
    existing: &HashSet<NaiveDate>,
) -> Result<Vec<Occurrence>> {
    validate_rule(rule)?;
    if window.from > window.to {
        return Err(CrewlineError::validation(
            "window",
            format!("`from` ({}) is after `to` ({})", window.from, window.to),
        ));
    }

    let from = window.from.max(rule.start_date);
    let to = match rule.end_date {
        Some(end) => window.to.min(end),
        None => window.to,
    };

    let overnight = rule.end_time <= rule.start_time;
    let mut occurrences = Vec::new();
    let mut day = from;
    while day <= to {
        if is_occurrence_day(rule, day) && !skips.contains(&day) {
            let start_at = day.and_time(rule.start_time).and_utc();
            let end_date = if overnight { day + Duration::days(1) } else { day };
            let end_at = end_date.and_time(rule.end_time).and_utc();
            occurrences.push(Occurrence {
                date: day,
                start_at,
                end_at,
                already_generated: existing.contains(&day),
            });
        }
        day += Duration::days(1);
    }
    Ok(occurrences)
}

/// Whether a single day matches the rule's weekday set and week interval.
/// Days before `start_date` never match.
pub fn is_occurrence_day(rule: &RecurrenceRule, day: NaiveDate) -> bool {
    if day < rule.start_date {
        return false;
    }
    let weekday = day.weekday().number_from_monday() as u8;
    if !rule.days_of_week.contains(&weekday) {
        return false;
    }
    let weeks_since_start = (day - rule.start_date).num_days() / 7;
    weeks_since_start % i64::from(rule.interval_weeks) == 0
}

fn validate_rule(rule: &RecurrenceRule) -> Result<()> {
    if rule.interval_weeks < 1 {
        return Err(CrewlineError::validation(
            "interval_weeks",
            "must be at least 1",
        ));
    }
    if rule.days_of_week.is_empty() {
        return Err(CrewlineError::validation(
            "days_of_week",
            "must contain at least one weekday",
        ));
    }
    if let Some(bad) = rule.days_of_week.iter().find(|d| !(1..=7).contains(*d)) {
        return Err(CrewlineError::validation(
            "days_of_week",
            format!("weekday {bad} is out of range 1..=7"),
        ));
    }
    if let Some(end) = rule.end_date
        && end < rule.start_date
    {
        return Err(CrewlineError::validation(
            "end_date",
            format!("end date {} is before start date {}", end, rule.start_date),
        ));
    }
    Ok(())
}
