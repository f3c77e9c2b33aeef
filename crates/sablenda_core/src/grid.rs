//! Month-view date enumeration.
//!
//! # Responsibility
//! - Produce the dates a month view renders, padded to whole Monday-start
//!   weeks.
//!
//! # Invariants
//! - Output is ascending, starts on a Monday and ends on a Sunday.
//! - Output length is a multiple of 7, between 28 and 42 inclusive.
//! - Every day of the requested month is included.

use chrono::{Datelike, Days, Months, NaiveDate};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rejected `(year, month)` input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthGridError {
    /// Month outside 1..=12, or a year the calendar cannot represent.
    InvalidMonth { year: i32, month: u32 },
}

impl Display for MonthGridError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidMonth { year, month } => {
                write!(f, "invalid month {year}-{month:02}; month must be 1..=12")
            }
        }
    }
}

impl Error for MonthGridError {}

/// Returns every date shown for `(year, month)`, Monday through Sunday rows.
///
/// # Errors
/// - `InvalidMonth` when `month` is outside 1..=12 or the padded grid would
///   leave the representable date range.
pub fn month_days(year: i32, month: u32) -> Result<Vec<NaiveDate>, MonthGridError> {
    let invalid = MonthGridError::InvalidMonth { year, month };

    let first_day = NaiveDate::from_ymd_opt(year, month, 1).ok_or(invalid)?;
    let last_day = first_day
        .checked_add_months(Months::new(1))
        .and_then(|next_month| next_month.pred_opt())
        .ok_or(invalid)?;

    let lead = u64::from(first_day.weekday().num_days_from_monday());
    let trail = 6 - u64::from(last_day.weekday().num_days_from_monday());
    let grid_start = first_day.checked_sub_days(Days::new(lead)).ok_or(invalid)?;
    let grid_end = last_day.checked_add_days(Days::new(trail)).ok_or(invalid)?;

    Ok(grid_start
        .iter_days()
        .take_while(|date| *date <= grid_end)
        .collect())
}

/// Same dates as [`month_days`], split into 7-day rows.
pub fn month_weeks(year: i32, month: u32) -> Result<Vec<Vec<NaiveDate>>, MonthGridError> {
    Ok(month_days(year, month)?
        .chunks(7)
        .map(<[NaiveDate]>::to_vec)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{month_days, month_weeks, MonthGridError};
    use chrono::{Datelike, NaiveDate, Weekday};

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn february_2025_spans_five_weeks() {
        let days = month_days(2025, 2).unwrap();
        assert_eq!(days.len(), 35);
        assert_eq!(days.first(), Some(&day(2025, 1, 27)));
        assert_eq!(days.last(), Some(&day(2025, 3, 2)));
    }

    #[test]
    fn february_2021_fits_exactly_four_weeks() {
        let days = month_days(2021, 2).unwrap();
        assert_eq!(days.len(), 28);
        assert_eq!(days.first(), Some(&day(2021, 2, 1)));
        assert_eq!(days.last(), Some(&day(2021, 2, 28)));
    }

    #[test]
    fn march_2026_needs_six_weeks() {
        let days = month_days(2026, 3).unwrap();
        assert_eq!(days.len(), 42);
        assert_eq!(days.first(), Some(&day(2026, 2, 23)));
        assert_eq!(days.last(), Some(&day(2026, 4, 5)));
    }

    #[test]
    fn december_rolls_into_next_january() {
        let days = month_days(2025, 12).unwrap();
        assert_eq!(days.first(), Some(&day(2025, 12, 1)));
        assert_eq!(days.last(), Some(&day(2026, 1, 4)));
    }

    #[test]
    fn every_month_yields_whole_weeks_covering_the_month() {
        for year in [2023, 2024, 2025, 2000, 1900] {
            for month in 1..=12 {
                let days = month_days(year, month).unwrap();
                assert_eq!(days.len() % 7, 0, "{year}-{month}");
                assert!((28..=42).contains(&days.len()), "{year}-{month}");
                assert_eq!(days[0].weekday(), Weekday::Mon, "{year}-{month}");
                assert_eq!(days[days.len() - 1].weekday(), Weekday::Sun, "{year}-{month}");
                assert!(days.windows(2).all(|pair| pair[0].succ_opt() == Some(pair[1])));

                let in_month = days
                    .iter()
                    .filter(|date| date.year() == year && date.month() == month)
                    .count();
                let month_len = day(year, month, 1)
                    .iter_days()
                    .take_while(|date| date.month() == month)
                    .count();
                assert_eq!(in_month, month_len, "{year}-{month}");
            }
        }
    }

    #[test]
    fn invalid_month_is_rejected() {
        assert_eq!(
            month_days(2025, 13),
            Err(MonthGridError::InvalidMonth {
                year: 2025,
                month: 13
            })
        );
        assert!(month_days(2025, 0).is_err());
    }

    #[test]
    fn weeks_are_seven_days_each() {
        let weeks = month_weeks(2024, 9).unwrap();
        assert!(weeks.iter().all(|week| week.len() == 7));
        assert_eq!(weeks[0][0].weekday(), Weekday::Mon);
    }
}
