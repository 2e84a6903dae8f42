//! School calendar engine.
//!
//! # Responsibility
//! - Classify a calendar date as a school day or not.
//! - Provide range helpers built on that classification.
//!
//! # Invariants
//! - `term_start <= term_end` for every constructed calendar.
//! - Exactly one [`DayReason`] applies per date, checked in the fixed order
//!   outside-term, weekend, holiday, vacation, school day.

pub mod attendance;
pub mod grade;

use chrono::{Datelike, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Upper bound for backwards scans, in days.
const MAX_LOOKBACK_DAYS: u32 = 365 * 5;

/// Why a date is (or is not) a school day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DayReason {
    OutsideCalendar,
    Weekend,
    OfficialHoliday,
    SchoolVacation,
    SchoolDay,
}

impl DayReason {
    /// Human-readable label shown next to calendar cells.
    pub fn label(self) -> &'static str {
        match self {
            Self::OutsideCalendar => "Outside the school calendar",
            Self::Weekend => "Weekend",
            Self::OfficialHoliday => "Official holiday",
            Self::SchoolVacation => "School vacation",
            Self::SchoolDay => "School day",
        }
    }
}

/// Result of classifying one date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DayClassification {
    pub date: NaiveDate,
    pub reason: DayReason,
}

impl DayClassification {
    pub fn is_school_day(&self) -> bool {
        self.reason == DayReason::SchoolDay
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// Term (or vacation range) ends before it starts.
    InvertedRange { start: NaiveDate, end: NaiveDate },
}

impl Display for CalendarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvertedRange { start, end } => {
                write!(f, "date range ends ({end}) before it starts ({start})")
            }
        }
    }
}

impl Error for CalendarError {}

/// Term boundaries plus the dates on which no classes are held.
///
/// Passed explicitly to every calendar computation so alternate calendars
/// can be supplied per school year or per test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchoolCalendar {
    term_start: NaiveDate,
    term_end: NaiveDate,
    holidays: BTreeSet<NaiveDate>,
    vacations: BTreeSet<NaiveDate>,
}

impl SchoolCalendar {
    /// Creates a calendar with no holidays or vacations.
    pub fn new(term_start: NaiveDate, term_end: NaiveDate) -> Result<Self, CalendarError> {
        if term_start > term_end {
            return Err(CalendarError::InvertedRange {
                start: term_start,
                end: term_end,
            });
        }
        Ok(Self {
            term_start,
            term_end,
            holidays: BTreeSet::new(),
            vacations: BTreeSet::new(),
        })
    }

    pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(holidays);
        self
    }

    /// Adds every date in `[start, end]` to the vacation set.
    pub fn with_vacation_range(
        mut self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Self, CalendarError> {
        if start > end {
            return Err(CalendarError::InvertedRange { start, end });
        }
        self.vacations.extend(expand_range(start, end));
        Ok(self)
    }

    pub fn term_start(&self) -> NaiveDate {
        self.term_start
    }

    pub fn term_end(&self) -> NaiveDate {
        self.term_end
    }

    pub fn holidays(&self) -> &BTreeSet<NaiveDate> {
        &self.holidays
    }

    pub fn vacations(&self) -> &BTreeSet<NaiveDate> {
        &self.vacations
    }

    /// Classifies `date`; the first matching rule wins.
    pub fn classify(&self, date: NaiveDate) -> DayClassification {
        let reason = if date < self.term_start || date > self.term_end {
            DayReason::OutsideCalendar
        } else if matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
            DayReason::Weekend
        } else if self.holidays.contains(&date) {
            DayReason::OfficialHoliday
        } else if self.vacations.contains(&date) {
            DayReason::SchoolVacation
        } else {
            DayReason::SchoolDay
        };
        DayClassification { date, reason }
    }

    pub fn is_school_day(&self, date: NaiveDate) -> bool {
        self.classify(date).is_school_day()
    }

    /// School days in `[term_start, until]`, ascending.
    ///
    /// Iteration stops at term end whatever `until` is.
    pub fn school_days_until(&self, until: NaiveDate) -> impl Iterator<Item = NaiveDate> + '_ {
        let last = until.min(self.term_end);
        self.term_start
            .iter_days()
            .take_while(move |day| *day <= last)
            .filter(move |day| self.is_school_day(*day))
    }

    /// Number of school days from term start to `until` inclusive.
    pub fn count_school_days(&self, until: NaiveDate) -> usize {
        self.school_days_until(until).count()
    }

    /// Calendar days elapsed since term start; negative before the term.
    pub fn days_since_term_start(&self, today: NaiveDate) -> i64 {
        (today - self.term_start).num_days()
    }

    /// The last `n` school days on or before `until`, oldest first.
    ///
    /// Scans back at most five years, so fewer than `n` days may be returned
    /// when the calendar has too few school days.
    pub fn recent_school_days(&self, n: usize, until: NaiveDate) -> Vec<NaiveDate> {
        let mut days = Vec::with_capacity(n);
        let mut cursor = Some(until.min(self.term_end));
        let mut scanned = 0;
        while let Some(day) = cursor {
            if days.len() >= n || scanned > MAX_LOOKBACK_DAYS {
                break;
            }
            if self.is_school_day(day) {
                days.push(day);
            }
            cursor = day.pred_opt();
            scanned += 1;
        }
        days.reverse();
        days
    }
}

fn expand_range(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |day| *day <= end)
}

impl Default for SchoolCalendar {
    /// The 2025/26 school year.
    fn default() -> Self {
        let ymd = |(y, m, d): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, d);
        let holidays = [
            (2025, 10, 9),
            (2025, 10, 12),
            (2025, 11, 1),
            (2025, 12, 6),
            (2025, 12, 8),
            (2026, 3, 19),
            (2026, 5, 1),
        ]
        .into_iter()
        .filter_map(ymd)
        .collect();
        let vacations = [
            ((2025, 12, 20), (2025, 12, 31)),
            ((2026, 1, 1), (2026, 1, 7)),
            ((2026, 3, 28), (2026, 3, 31)),
            ((2026, 4, 1), (2026, 4, 5)),
        ]
        .into_iter()
        .filter_map(|(start, end)| Some((ymd(start)?, ymd(end)?)))
        .flat_map(|(start, end)| expand_range(start, end))
        .collect();

        Self {
            term_start: ymd((2025, 9, 8)).unwrap_or(NaiveDate::MIN),
            term_end: ymd((2026, 6, 19)).unwrap_or(NaiveDate::MIN),
            holidays,
            vacations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{DayReason, SchoolCalendar};
    use chrono::{Datelike, NaiveDate, Weekday};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn holiday_on_a_thursday_is_official_holiday() {
        let calendar = SchoolCalendar::default();
        assert_eq!(
            calendar.classify(date(2025, 10, 9)).reason,
            DayReason::OfficialHoliday
        );
    }

    #[test]
    fn christmas_is_school_vacation() {
        let calendar = SchoolCalendar::default();
        assert_eq!(
            calendar.classify(date(2025, 12, 25)).reason,
            DayReason::SchoolVacation
        );
    }

    #[test]
    fn dates_outside_term_ignore_weekday_and_holidays() {
        let calendar = SchoolCalendar::new(date(2025, 9, 8), date(2026, 6, 19))
            .unwrap()
            .with_holidays([date(2025, 9, 1), date(2026, 6, 24)]);

        for day in [date(2025, 9, 1), date(2025, 9, 6), date(2026, 6, 24), date(2026, 6, 20)] {
            assert_eq!(calendar.classify(day).reason, DayReason::OutsideCalendar);
        }
    }

    #[test]
    fn weekend_wins_over_holiday_and_vacation() {
        let calendar = SchoolCalendar::default();
        // 2025-12-20 is a Saturday inside the Christmas range.
        assert_eq!(calendar.classify(date(2025, 12, 20)).reason, DayReason::Weekend);
        // 2025-10-12 is a Sunday and a holiday.
        assert_eq!(calendar.classify(date(2025, 10, 12)).reason, DayReason::Weekend);
    }

    #[test]
    fn holiday_wins_over_vacation() {
        let calendar = SchoolCalendar::new(date(2025, 9, 8), date(2026, 6, 19))
            .unwrap()
            .with_holidays([date(2025, 12, 22)])
            .with_vacation_range(date(2025, 12, 20), date(2025, 12, 31))
            .unwrap();
        assert_eq!(
            calendar.classify(date(2025, 12, 22)).reason,
            DayReason::OfficialHoliday
        );
    }

    #[test]
    fn every_in_term_weekend_day_is_weekend() {
        let calendar = SchoolCalendar::default();
        let weekend_reasons = calendar
            .term_start()
            .iter_days()
            .take_while(|day| *day <= calendar.term_end())
            .filter(|day| matches!(day.weekday(), Weekday::Sat | Weekday::Sun))
            .map(|day| calendar.classify(day).reason);
        for reason in weekend_reasons {
            assert_eq!(reason, DayReason::Weekend);
        }
    }

    #[test]
    fn inverted_term_is_rejected() {
        assert!(SchoolCalendar::new(date(2026, 1, 1), date(2025, 1, 1)).is_err());
    }

    #[test]
    fn recent_school_days_skips_non_school_days_and_is_ascending() {
        let calendar = SchoolCalendar::default();
        // Monday 2025-10-13; Thursday 10-09 is a holiday, 10-11/12 weekend.
        let days = calendar.recent_school_days(4, date(2025, 10, 13));
        assert_eq!(
            days,
            vec![date(2025, 10, 7), date(2025, 10, 8), date(2025, 10, 10), date(2025, 10, 13)]
        );
    }

    #[test]
    fn recent_school_days_before_term_is_empty() {
        let calendar = SchoolCalendar::default();
        assert!(calendar.recent_school_days(7, date(2025, 9, 1)).is_empty());
    }

    #[test]
    fn far_future_bound_stops_at_term_end() {
        let calendar = SchoolCalendar::default();
        let end = calendar.term_end();
        let far = date(9999, 12, 31);
        assert_eq!(calendar.count_school_days(far), calendar.count_school_days(end));
        assert_eq!(calendar.school_days_until(far).last(), Some(end));
        assert_eq!(
            calendar.recent_school_days(3, far),
            calendar.recent_school_days(3, end)
        );
    }

    #[test]
    fn first_week_counts_five_school_days() {
        let calendar = SchoolCalendar::default();
        assert_eq!(calendar.count_school_days(date(2025, 9, 14)), 5);
        assert_eq!(calendar.days_since_term_start(date(2025, 9, 14)), 6);
    }
}
