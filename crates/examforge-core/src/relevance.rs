//! Relevance scoring for stored exemplars.
//!
//! `score = 0.6 * difficulty + 0.4 * recency`, where difficulty is the
//! item's share of its exam's marks and recency decays linearly to zero over
//! ten years. The weights are fixed: indices built with them stay comparable.

use chrono::NaiveDate;

pub const DIFFICULTY_WEIGHT: f64 = 0.6;
pub const RECENCY_WEIGHT: f64 = 0.4;
pub const RECENCY_HORIZON_DAYS: f64 = 3650.0;
/// Recency used when the exam date cannot be parsed.
pub const UNKNOWN_DATE_RECENCY: f64 = 0.5;

/// Accepted exam date layouts, tried in order.
const DATE_FORMATS: &[&str] = &["%B %d, %Y", "%b %d, %Y", "%Y-%m-%d", "%m/%d/%Y"];

/// Parse an exam date such as "April 20, 2013" or "2013-04-20".
pub fn parse_exam_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Item marks as a share of the exam total, in [0,1]. Zero total gives 0.
pub fn difficulty_component(marks: u32, parent_total_marks: u32) -> f64 {
    if parent_total_marks == 0 {
        return 0.0;
    }
    (f64::from(marks) / f64::from(parent_total_marks)).clamp(0.0, 1.0)
}

/// Linear decay over ten years, in [0,1]. Future dates count as brand new.
pub fn recency_component(parent_timestamp: &str, now: NaiveDate) -> f64 {
    match parse_exam_date(parent_timestamp) {
        Some(date) => {
            let age_days = (now - date).num_days() as f64;
            (1.0 - age_days / RECENCY_HORIZON_DAYS).clamp(0.0, 1.0)
        }
        None => UNKNOWN_DATE_RECENCY,
    }
}

/// Relevance of one item within its parent exam, in [0,1].
pub fn score(marks: u32, parent_total_marks: u32, parent_timestamp: &str, now: NaiveDate) -> f64 {
    DIFFICULTY_WEIGHT * difficulty_component(marks, parent_total_marks)
        + RECENCY_WEIGHT * recency_component(parent_timestamp, now)
}

/// Scorer pinned to a reference date, so one ingestion run scores
/// every item against the same "now".
#[derive(Debug, Clone, Copy)]
pub struct RelevanceScorer {
    now: NaiveDate,
}

impl RelevanceScorer {
    pub fn new(now: NaiveDate) -> Self {
        Self { now }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }

    pub fn now(&self) -> NaiveDate {
        self.now
    }

    pub fn score(&self, marks: u32, parent_total_marks: u32, parent_timestamp: &str) -> f64 {
        score(marks, parent_total_marks, parent_timestamp, self.now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_all_formats() {
        let expected = day(2013, 4, 20);
        assert_eq!(parse_exam_date("April 20, 2013"), Some(expected));
        assert_eq!(parse_exam_date("Apr 20, 2013"), Some(expected));
        assert_eq!(parse_exam_date("2013-04-20"), Some(expected));
        assert_eq!(parse_exam_date("04/20/2013"), Some(expected));
        assert_eq!(parse_exam_date("Winter term"), None);
    }

    #[test]
    fn test_unparsable_date_scores_half() {
        let s = score(50, 100, "sometime", day(2026, 1, 1));
        assert!((s - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_total_marks_has_no_difficulty() {
        assert_eq!(difficulty_component(40, 0), 0.0);
        let now = day(2026, 1, 1);
        let s = score(40, 0, "2026-01-01", now);
        assert!((s - RECENCY_WEIGHT).abs() < 1e-12);
    }

    #[test]
    fn test_recency_decay_and_clamps() {
        let now = day(2020, 1, 1);
        assert_eq!(recency_component("2020-01-01", now), 1.0);
        assert_eq!(recency_component("2021-06-01", now), 1.0);
        assert_eq!(recency_component("1990-01-01", now), 0.0);

        // 1825 days is half the horizon.
        let half = now - chrono::Duration::days(1825);
        let r = recency_component(&half.format("%Y-%m-%d").to_string(), now);
        assert!((r - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_score_bounded() {
        let now = day(2026, 6, 1);
        for marks in [0u32, 5, 50, 100, 500] {
            for total in [0u32, 1, 50, 100] {
                for date in ["April 20, 2013", "2026-06-01", "2040-01-01", "garbage"] {
                    let s = score(marks, total, date, now);
                    assert!((0.0..=1.0).contains(&s), "{marks}/{total} {date} -> {s}");
                }
            }
        }
    }

    #[test]
    fn test_marks_over_total_clamp() {
        assert_eq!(difficulty_component(150, 100), 1.0);
    }
}
