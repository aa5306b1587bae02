use chrono::{Duration, NaiveDate};

/// Trailing window length in days (inclusive of both ends).
pub const WINDOW_DAYS: i64 = 30;

/// An inclusive calendar-date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ReportPeriod {
    /// The 30-day window ending yesterday. Analytics data lags by about a day,
    /// so `reference_date` itself is never included.
    pub fn trailing(reference_date: NaiveDate) -> Self {
        let end = reference_date - Duration::days(1);
        let start = end - Duration::days(WINDOW_DAYS - 1);
        ReportPeriod { start, end }
    }

    /// The window of equal length immediately before this one.
    pub fn previous(&self) -> Self {
        let end = self.start - Duration::days(1);
        let start = end - Duration::days(self.span_days());
        ReportPeriod { start, end }
    }

    /// `end - start` in days.
    pub fn span_days(&self) -> i64 {
        (self.end - self.start).num_days()
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        self.span_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_trailing_window_ends_yesterday() {
        let period = ReportPeriod::trailing(date(2024, 10, 15));

        assert_eq!(period.end, date(2024, 10, 14));
        assert_eq!(period.start, date(2024, 9, 15));
        assert_eq!(period.days(), 30);
    }

    #[test]
    fn test_previous_window_is_adjacent_and_equal_length() {
        let period = ReportPeriod::trailing(date(2024, 10, 15));
        let prev = period.previous();

        assert_eq!(prev.end, date(2024, 9, 14));
        assert_eq!(prev.start, date(2024, 8, 16));
        assert_eq!(prev.days(), period.days());
    }

    #[test]
    fn test_window_across_year_boundary() {
        let period = ReportPeriod::trailing(date(2024, 1, 10));

        assert_eq!(period.end, date(2024, 1, 9));
        assert_eq!(period.start, date(2023, 12, 11));
    }

    #[test]
    fn test_days_for_custom_period() {
        let period = ReportPeriod {
            start: date(2024, 3, 1),
            end: date(2024, 3, 15),
        };
        assert_eq!(period.span_days(), 14);
        assert_eq!(period.days(), 15);
    }
}
