// SPDX-FileCopyrightText: 2026 Crewline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row conversion helpers shared by the query modules.
//!
//! The canonical entity types live in `crewline-core::types`; this module
//! re-exports them and provides the TEXT-column codecs (RFC 3339 instants,
//! `YYYY-MM-DD` dates, snake_case status enums) used when mapping rows.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::types::Type;

pub use crewline_core::types::{
    AssignmentStatus, AttendanceEvent, AttendanceKind, AttendanceMethod, AutopilotRun,
    CompanyOpsSettings, Geofence, InviteOrigin, RunStatus, SeriesFillMode, SeriesStatus, Shift,
    ShiftAssignment, ShiftSeries, ShiftStatus, ShiftTemplate, WorkerNote, WorkerPool,
    WorkerPoolMember,
};

/// Render an instant for storage.
pub fn ts_to_sql(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render an optional instant for storage.
pub fn opt_ts_to_sql(t: Option<DateTime<Utc>>) -> Option<String> {
    t.map(ts_to_sql)
}

/// Parse a stored instant; `idx` is the column index for error reporting.
pub fn ts_from_sql(idx: usize, value: String) -> Result<DateTime<Utc>, rusqlite::Error> {
    DateTime::parse_from_rfc3339(&value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse an optional stored instant.
pub fn opt_ts_from_sql(
    idx: usize,
    value: Option<String>,
) -> Result<Option<DateTime<Utc>>, rusqlite::Error> {
    value.map(|v| ts_from_sql(idx, v)).transpose()
}

/// Render a date for storage.
pub fn date_to_sql(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

/// Parse a stored date.
pub fn date_from_sql(idx: usize, value: String) -> Result<NaiveDate, rusqlite::Error> {
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse an optional stored date.
pub fn opt_date_from_sql(
    idx: usize,
    value: Option<String>,
) -> Result<Option<NaiveDate>, rusqlite::Error> {
    value.map(|v| date_from_sql(idx, v)).transpose()
}

/// Render a time-of-day for storage.
pub fn time_to_sql(t: NaiveTime) -> String {
    t.format("%H:%M").to_string()
}

/// Parse a stored time-of-day.
pub fn time_from_sql(idx: usize, value: String) -> Result<NaiveTime, rusqlite::Error> {
    NaiveTime::parse_from_str(&value, "%H:%M")
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Parse a snake_case status enum from its TEXT column.
pub fn enum_from_sql<T>(idx: usize, value: String) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(&value)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Assemble a geofence from its three nullable columns. All-or-nothing:
/// a partially set fence is treated as absent.
pub fn geofence_from_cols(
    lat: Option<f64>,
    lng: Option<f64>,
    radius_m: Option<f64>,
) -> Option<Geofence> {
    match (lat, lng, radius_m) {
        (Some(lat), Some(lng), Some(radius_m)) => Some(Geofence { lat, lng, radius_m }),
        _ => None,
    }
}

/// Render a weekday set as the stored CSV, e.g. `1,3,5`.
pub fn weekdays_to_sql(days: &[u8]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

/// Parse the stored weekday CSV.
pub fn weekdays_from_sql(idx: usize, value: String) -> Result<Vec<u8>, rusqlite::Error> {
    value
        .split(',')
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u8>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn instant_round_trip() {
        let t = Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap();
        let text = ts_to_sql(t);
        assert_eq!(ts_from_sql(0, text).unwrap(), t);
    }

    #[test]
    fn weekday_csv_round_trip() {
        let days = vec![1u8, 3, 5];
        assert_eq!(weekdays_to_sql(&days), "1,3,5");
        assert_eq!(weekdays_from_sql(0, "1,3,5".into()).unwrap(), days);
    }

    #[test]
    fn partial_geofence_treated_as_absent() {
        assert!(geofence_from_cols(Some(1.0), None, Some(50.0)).is_none());
        assert!(geofence_from_cols(Some(1.0), Some(2.0), Some(50.0)).is_some());
    }

    #[test]
    fn bad_stored_enum_is_a_conversion_error() {
        let result: Result<AssignmentStatus, _> = enum_from_sql(3, "exploded".into());
        assert!(result.is_err());
    }
}
