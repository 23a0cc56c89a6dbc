//! View report: recorded-day coverage per participant and device type
//!
//! Each record's recording window is expanded into the calendar days it
//! touches. Days are collected per (participant, device type, device) and then
//! reduced per (participant, device type) to the first day, the last day and
//! the number of distinct devices.

use crate::records::Record;
use chrono::{DateTime, Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

/// Device types reported when settings do not name their own, in column order
pub const DEFAULT_DEVICE_TYPES: [&str; 7] = ["ACT", "BTF", "ECG", "EMP", "GPS", "HRM", "SLP"];

/// Earliest and latest calendar years a recording window may touch
pub const YEAR_RANGE: std::ops::RangeInclusive<i32> = 1970..=9999;

/// Longest recording window expanded into days
pub const MAX_WINDOW_DAYS: i64 = 3660;

/// Why a record's recording window cannot be expanded into days
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WindowError {
    #[error("timestamp {0} ms is not a representable date")]
    Unrepresentable(i64),

    #[error("window ends on {end} before it starts on {start}")]
    Inverted { start: NaiveDate, end: NaiveDate },

    #[error("date {0} lies outside years 1970..=9999")]
    OutOfRange(NaiveDate),

    #[error("window spans {0} days, more than {max}", max = MAX_WINDOW_DAYS)]
    TooLong(i64),
}

/// Time zone used to cut epoch timestamps into calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayBoundary {
    #[default]
    Local,
    Utc,
}

impl DayBoundary {
    /// Calendar day containing `ms`, or `None` if it is out of range
    pub fn date_of(self, ms: i64) -> Option<NaiveDate> {
        let utc = DateTime::from_timestamp_millis(ms)?;
        Some(match self {
            Self::Local => utc.with_timezone(&Local).date_naive(),
            Self::Utc => utc.date_naive(),
        })
    }
}

/// participant -> device type -> device id -> covered days
pub type CoverageIndex = BTreeMap<String, BTreeMap<String, BTreeMap<String, BTreeSet<NaiveDate>>>>;

/// First day, last day and device count for one participant and device type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub first: Option<NaiveDate>,
    pub last: Option<NaiveDate>,
    pub devices: usize,
}

/// The reduced view: one row per participant, one summary per device type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewReport {
    /// Column order of the device types
    pub device_types: Vec<String>,
    pub rows: BTreeMap<String, BTreeMap<String, DeviceSummary>>,
}

/// Every calendar day from the day of `start_ms` through the day of `end_ms`
pub fn covered_days(
    start_ms: i64,
    end_ms: i64,
    boundary: DayBoundary,
) -> Result<Vec<NaiveDate>, WindowError> {
    let date = |ms: i64| -> Result<NaiveDate, WindowError> {
        let day = boundary
            .date_of(ms)
            .ok_or(WindowError::Unrepresentable(ms))?;
        if YEAR_RANGE.contains(&day.year()) {
            Ok(day)
        } else {
            Err(WindowError::OutOfRange(day))
        }
    };
    let (first, last) = (date(start_ms)?, date(end_ms)?);

    if last < first {
        return Err(WindowError::Inverted {
            start: first,
            end: last,
        });
    }
    let span = (last - first).num_days();
    if span > MAX_WINDOW_DAYS {
        return Err(WindowError::TooLong(span));
    }

    Ok(first.iter_days().take_while(|day| *day <= last).collect())
}

/// Collect covered days for records whose participant id starts with `site`
pub fn coverage_index(records: &[Record], site: char, boundary: DayBoundary) -> CoverageIndex {
    let mut index = CoverageIndex::new();

    for record in records.iter().filter(|r| r.participant_id.starts_with(site)) {
        let days = match covered_days(record.start_ms, record.end_ms, boundary) {
            Ok(days) => days,
            Err(reason) => {
                tracing::warn!(
                    participant = %record.participant_id,
                    device = %record.device_id,
                    %reason,
                    "leaving record out of the view report"
                );
                continue;
            }
        };

        index
            .entry(record.participant_id.clone())
            .or_default()
            .entry(record.device_type().to_string())
            .or_default()
            .entry(record.device_id.clone())
            .or_default()
            .extend(days);
    }

    index
}

/// Reduce the days of every device of one type to a summary
pub fn summarize(devices: &BTreeMap<String, BTreeSet<NaiveDate>>) -> DeviceSummary {
    let days: BTreeSet<NaiveDate> = devices.values().flatten().copied().collect();
    DeviceSummary {
        first: days.first().copied(),
        last: days.last().copied(),
        devices: devices.len(),
    }
}

/// Reduce a coverage index to one row per participant over `device_types`
///
/// Device types outside the enumeration are dropped. A participant with no
/// data for any listed type gets no row.
pub fn reduce(index: &CoverageIndex, device_types: &[String]) -> ViewReport {
    let known: BTreeSet<&str> = device_types.iter().map(String::as_str).collect();
    let mut rows = BTreeMap::new();

    for (participant, by_type) in index {
        let dropped: Vec<&str> = by_type
            .keys()
            .map(String::as_str)
            .filter(|t| !known.contains(t))
            .collect();
        if !dropped.is_empty() {
            tracing::debug!(participant = %participant, ?dropped, "dropping unlisted device types");
        }
        if dropped.len() == by_type.len() {
            continue;
        }

        let row: BTreeMap<String, DeviceSummary> = device_types
            .iter()
            .map(|t| {
                let summary = by_type.get(t).map(summarize).unwrap_or_default();
                (t.clone(), summary)
            })
            .collect();
        rows.insert(participant.clone(), row);
    }

    ViewReport {
        device_types: device_types.to_vec(),
        rows,
    }
}

/// Compute the view report for `records`
pub fn view_report(
    records: &[Record],
    site: char,
    boundary: DayBoundary,
    device_types: &[String],
) -> ViewReport {
    let index = coverage_index(records, site, boundary);
    reduce(&index, device_types)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 86_400_000;
    // 2021-04-01T00:00:00Z
    const APRIL_1: i64 = 1_617_235_200_000;

    fn rec(participant: &str, device: &str, start_ms: i64, end_ms: i64) -> Record {
        Record {
            participant_id: participant.into(),
            device_id: device.into(),
            start_ms,
            end_ms,
            uploaded_by: "A".into(),
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn types(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_covered_days_inclusive() {
        let days = covered_days(APRIL_1, APRIL_1 + 2 * DAY_MS, DayBoundary::Utc).unwrap();
        let rendered: Vec<String> = days.iter().map(|d| d.to_string()).collect();
        assert_eq!(rendered, vec!["2021-04-01", "2021-04-02", "2021-04-03"]);
    }

    #[test]
    fn test_same_day_yields_one_day() {
        let days = covered_days(APRIL_1 + 1000, APRIL_1 + 3_600_000, DayBoundary::Utc).unwrap();
        assert_eq!(days, vec![date("2021-04-01")]);
    }

    #[test]
    fn test_partial_days_floor_to_calendar_day() {
        // 23:00 on the 1st through 01:00 on the 2nd touches two days
        let days =
            covered_days(APRIL_1 + 23 * 3_600_000, APRIL_1 + 25 * 3_600_000, DayBoundary::Utc)
                .unwrap();
        assert_eq!(days, vec![date("2021-04-01"), date("2021-04-02")]);
    }

    #[test]
    fn test_unrepresentable_timestamp() {
        assert_eq!(
            covered_days(i64::MAX, i64::MAX, DayBoundary::Utc),
            Err(WindowError::Unrepresentable(i64::MAX))
        );
    }

    #[test]
    fn test_inverted_window_rejected() {
        let err = covered_days(APRIL_1 + DAY_MS, APRIL_1, DayBoundary::Utc).unwrap_err();
        assert!(matches!(err, WindowError::Inverted { .. }));
    }

    #[test]
    fn test_microsecond_timestamp_rejected() {
        // microseconds mistaken for milliseconds land tens of millennia out
        let err = covered_days(0, 1_600_000_000_000_000, DayBoundary::Utc).unwrap_err();
        assert!(matches!(err, WindowError::OutOfRange(_)));
    }

    #[test]
    fn test_window_longer_than_limit_rejected() {
        let end = APRIL_1 + (MAX_WINDOW_DAYS + 1) * DAY_MS;
        assert_eq!(
            covered_days(APRIL_1, end, DayBoundary::Utc),
            Err(WindowError::TooLong(MAX_WINDOW_DAYS + 1))
        );
        let days = covered_days(APRIL_1, APRIL_1 + MAX_WINDOW_DAYS * DAY_MS, DayBoundary::Utc);
        assert_eq!(days.unwrap().len() as i64, MAX_WINDOW_DAYS + 1);
    }

    #[test]
    fn test_bad_windows_left_out_of_view() {
        let records = vec![
            rec("K001", "BTF-01", APRIL_1 + DAY_MS, APRIL_1),
            rec("K001", "BTF-02", 0, 1_600_000_000_000_000),
            rec("K001", "BTF-03", APRIL_1, APRIL_1),
        ];

        let report = view_report(&records, 'K', DayBoundary::Utc, &types(&["BTF"]));
        assert_eq!(
            report.rows["K001"]["BTF"],
            DeviceSummary {
                first: Some(date("2021-04-01")),
                last: Some(date("2021-04-01")),
                devices: 1,
            }
        );
    }

    #[test]
    fn test_reduce_first_last_and_count() {
        let records = vec![
            rec("K001", "BTF-01", APRIL_1, APRIL_1 + DAY_MS),
            rec("K001", "BTF-01", APRIL_1 + 5 * DAY_MS, APRIL_1 + 5 * DAY_MS),
            rec("K001", "BTF-02", APRIL_1 + 2 * DAY_MS, APRIL_1 + 9 * DAY_MS),
            rec("K001", "EMP-07", APRIL_1, APRIL_1),
        ];

        let report = view_report(&records, 'K', DayBoundary::Utc, &types(&["BTF", "EMP", "GPS"]));
        let row = &report.rows["K001"];

        assert_eq!(
            row["BTF"],
            DeviceSummary {
                first: Some(date("2021-04-01")),
                last: Some(date("2021-04-10")),
                devices: 2,
            }
        );
        assert_eq!(row["EMP"].devices, 1);
        assert_eq!(row["GPS"], DeviceSummary::default());
    }

    #[test]
    fn test_device_count_ignores_repeat_records() {
        let records: Vec<Record> = (0..10)
            .map(|i| rec("K001", "BTF-01", APRIL_1 + i * DAY_MS, APRIL_1 + i * DAY_MS))
            .collect();

        let report = view_report(&records, 'K', DayBoundary::Utc, &types(&["BTF"]));
        assert_eq!(report.rows["K001"]["BTF"].devices, 1);
    }

    #[test]
    fn test_site_filter() {
        let records = vec![rec("K001", "BTF-01", APRIL_1, APRIL_1), rec("M001", "BTF-01", APRIL_1, APRIL_1)];

        let report = view_report(&records, 'M', DayBoundary::Utc, &types(&["BTF"]));
        assert_eq!(report.rows.keys().collect::<Vec<_>>(), vec!["M001"]);
    }

    #[test]
    fn test_unlisted_types_are_dropped() {
        let records = vec![
            rec("K001", "ZZZ-01", APRIL_1, APRIL_1),
            rec("K002", "ZZZ-01", APRIL_1, APRIL_1),
            rec("K002", "BTF-01", APRIL_1, APRIL_1),
        ];

        let report = view_report(&records, 'K', DayBoundary::Utc, &types(&["BTF"]));
        assert!(!report.rows.contains_key("K001"));
        assert!(!report.rows["K002"].contains_key("ZZZ"));
        assert_eq!(report.rows["K002"].len(), 1);
    }

    #[test]
    fn test_every_row_has_every_type() {
        let records = vec![rec("K001", "BTF-01", APRIL_1, APRIL_1), rec("K002", "ACT-01", APRIL_1, APRIL_1)];
        let listed = types(&DEFAULT_DEVICE_TYPES);

        let report = view_report(&records, 'K', DayBoundary::Utc, &listed);
        for row in report.rows.values() {
            assert_eq!(row.len(), listed.len());
        }
    }
}
