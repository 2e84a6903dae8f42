//! Synthetic attendance series over the school calendar.
//!
//! The presence signal is a deterministic placeholder derived from the
//! day-of-month; it is not real attendance data.

use super::SchoolCalendar;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

/// One school day of the simulated series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    pub present: bool,
    pub absent: bool,
}

impl AttendanceRecord {
    /// Present unless the day-of-month is a multiple of 3.
    pub fn simulated(date: NaiveDate) -> Self {
        let present = date.day() % 3 != 0;
        Self {
            date,
            present,
            absent: !present,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceTotals {
    pub school_days: usize,
    pub present: usize,
    pub absent: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceReport {
    /// Ascending by date; school days only.
    pub records: Vec<AttendanceRecord>,
    pub totals: AttendanceTotals,
}

/// Builds the simulated series from term start up to `until` inclusive.
///
/// Returns an empty report when `until` precedes the term.
pub fn simulate_attendance(calendar: &SchoolCalendar, until: NaiveDate) -> AttendanceReport {
    let records: Vec<AttendanceRecord> = calendar
        .school_days_until(until)
        .map(AttendanceRecord::simulated)
        .collect();

    let present = records.iter().filter(|record| record.present).count();
    let totals = AttendanceTotals {
        school_days: records.len(),
        present,
        absent: records.len() - present,
    };

    AttendanceReport { records, totals }
}

#[cfg(test)]
mod tests {
    use super::simulate_attendance;
    use crate::calendar::SchoolCalendar;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn totals_balance_for_every_upper_bound_in_term() {
        let calendar = SchoolCalendar::default();
        let mut until = date(2025, 9, 1);
        while until <= date(2026, 7, 1) {
            let report = simulate_attendance(&calendar, until);
            assert_eq!(
                report.totals.present + report.totals.absent,
                report.totals.school_days
            );
            assert_eq!(report.records.len(), report.totals.school_days);
            until = until + chrono::Days::new(17);
        }
    }

    #[test]
    fn first_week_marks_multiples_of_three_absent() {
        let calendar = SchoolCalendar::default();
        let report = simulate_attendance(&calendar, date(2025, 9, 12));

        let absent: Vec<NaiveDate> = report
            .records
            .iter()
            .filter(|record| record.absent)
            .map(|record| record.date)
            .collect();
        assert_eq!(absent, vec![date(2025, 9, 9), date(2025, 9, 12)]);
        assert_eq!(report.totals.school_days, 5);
        assert_eq!(report.totals.present, 3);
        assert!(report.records.iter().all(|r| r.present != r.absent));
    }

    #[test]
    fn upper_bound_before_term_yields_empty_report() {
        let report = simulate_attendance(&SchoolCalendar::default(), date(2025, 8, 31));
        assert!(report.records.is_empty());
        assert_eq!(report.totals.school_days, 0);
    }

    #[test]
    fn records_skip_holidays() {
        let report = simulate_attendance(&SchoolCalendar::default(), date(2025, 10, 10));
        assert!(report.records.iter().all(|r| r.date != date(2025, 10, 9)));
    }
}
