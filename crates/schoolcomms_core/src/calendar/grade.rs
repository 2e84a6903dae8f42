//! Presentational weekly grade variation.

use serde::Serialize;

pub const GRADE_MIN: i32 = 50;
pub const GRADE_MAX: i32 = 100;

/// Subjects and base scores shown on the dashboard.
pub const DASHBOARD_SUBJECTS: &[(&str, i32)] = &[
    ("Mathematics", 85),
    ("Language", 78),
    ("History", 92),
    ("Physics", 74),
    ("Chemistry", 88),
    ("Biology", 81),
    ("Geography", 69),
    ("Physical Education", 95),
    ("English", 79),
    ("Economics", 68),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectGrade {
    pub subject: String,
    pub grade: i32,
}

/// Shifts `base` by a value in `[-2, 2]` seeded from the subject's code
/// points and the ISO week number, then clamps to `[50, 100]`.
pub fn weekly_grade(base: i32, subject: &str, iso_week: u32) -> i32 {
    let seed: u64 = subject.chars().map(|c| u64::from(u32::from(c))).sum::<u64>()
        + u64::from(iso_week);
    let variation = (seed % 5) as i32 - 2;
    base.saturating_add(variation).clamp(GRADE_MIN, GRADE_MAX)
}

/// Grades for [`DASHBOARD_SUBJECTS`] in the given ISO week.
pub fn dashboard_grades(iso_week: u32) -> Vec<SubjectGrade> {
    DASHBOARD_SUBJECTS
        .iter()
        .map(|(subject, base)| SubjectGrade {
            subject: (*subject).to_string(),
            grade: weekly_grade(*base, subject, iso_week),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{dashboard_grades, weekly_grade, GRADE_MAX, GRADE_MIN};

    #[test]
    fn output_stays_in_range_for_extreme_bases() {
        for base in [-500, 0, 49, 50, 51, 99, 100, 101, 1_000, i32::MIN, i32::MAX] {
            for week in 1..=53 {
                let grade = weekly_grade(base, "Physics", week);
                assert!((GRADE_MIN..=GRADE_MAX).contains(&grade), "{base} w{week} -> {grade}");
            }
        }
    }

    #[test]
    fn variation_is_seeded_by_code_points_and_week() {
        // "A" = 65; 65 + 1 = 66; 66 % 5 = 1 -> -1
        assert_eq!(weekly_grade(80, "A", 1), 79);
        // 65 + 3 = 68; 68 % 5 = 3 -> +1
        assert_eq!(weekly_grade(80, "A", 3), 81);
    }

    #[test]
    fn non_ascii_subjects_use_code_points() {
        // 'é' = 233; 233 + 1 = 234; 234 % 5 = 4 -> +2
        assert_eq!(weekly_grade(70, "é", 1), 72);
        // 233 + 2 = 235; 235 % 5 = 0 -> -2
        assert_eq!(weekly_grade(70, "é", 2), 68);
    }

    #[test]
    fn dashboard_grades_cover_every_subject() {
        let grades = dashboard_grades(10);
        assert_eq!(grades.len(), 10);
        assert!(grades.iter().all(|g| (GRADE_MIN..=GRADE_MAX).contains(&g.grade)));
    }
}
