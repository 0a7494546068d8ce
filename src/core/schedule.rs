//! Payment schedule date arithmetic.
//!
//! Pure functions computing the next monthly due date of a credit and the
//! monthly interest accrual day. All calendar math is done on UTC dates.

use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};

/// Number of days in the given month.
#[must_use]
pub const fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        4 | 6 | 9 | 11 => 30,
        2 if is_leap_year(year) => 29,
        2 => 28,
        _ => 31,
    }
}

const fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

/// Whether `date` is the last calendar day of its month.
#[must_use]
pub fn is_last_day_of_month(date: NaiveDate) -> bool {
    date.day() == days_in_month(date.year(), date.month())
}

fn last_day_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(days_in_month(date.year(), date.month()))
        .unwrap_or(date)
}

const fn previous_month(year: i32, month: u32) -> (i32, u32) {
    if month == 1 {
        (year - 1, 12)
    } else {
        (year, month - 1)
    }
}

/// Adds `months` calendar months, clamping the day to the length of the target month.
#[must_use]
pub fn add_months_clamped(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}

/// Next due date one calendar month after `current_due`.
///
/// A due date on the last day of its month rolls to the last day of the
/// following month (Feb 28 -> Mar 31). Other dates keep their day of month,
/// clamped when the following month is shorter (Jan 30 -> Feb 28).
#[must_use]
pub fn next_payment_date(current_due: NaiveDate) -> NaiveDate {
    let next = add_months_clamped(current_due, 1);
    if is_last_day_of_month(current_due) {
        last_day_of_month(next)
    } else {
        next
    }
}

/// [`next_payment_date`] for a timestamp, keeping its time of day.
#[must_use]
pub fn next_payment_timestamp(current_due: DateTime<Utc>) -> DateTime<Utc> {
    next_payment_date(current_due.date_naive())
        .and_time(current_due.time())
        .and_utc()
}

/// Whether interest accrues on `today` for a credit that started on `start`.
///
/// Interest accrues the day after the monthly anniversary of the start day,
/// starting with the origination month itself (a credit opened on the 12th
/// first accrues on the 13th). Nothing accrues on or before the start date.
///
/// Start days 29-31 are clamped: when the previous month was too short to
/// contain the start day, or the current month cannot contain the day after
/// it, accrual falls on the 1st. Every month then has exactly one accrual day,
/// but two of them can be consecutive: a credit started on the 30th accrues on
/// May 31 and again on June 1.
///
/// Only the day of month is compared; calling this twice on the same day
/// returns the same answer both times.
#[must_use]
pub fn is_accrual_day(start: NaiveDate, today: NaiveDate) -> bool {
    if today <= start {
        return false;
    }

    let start_day = start.day();
    if start_day >= 29 {
        let (prev_year, prev_month) = previous_month(today.year(), today.month());
        if start_day > days_in_month(prev_year, prev_month) {
            return today.day() == 1;
        }
        if start_day + 1 > days_in_month(today.year(), today.month()) {
            return today.day() == 1;
        }
    }

    today.day() == start_day + 1
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn days_between(from: NaiveDate, to: NaiveDate) -> impl Iterator<Item = NaiveDate> {
        from.iter_days().take_while(move |d| *d <= to)
    }

    fn accrual_days_in_month(start: NaiveDate, year: i32, month: u32) -> Vec<u32> {
        (1..=days_in_month(year, month))
            .filter(|d| is_accrual_day(start, date(year, month, *d)))
            .collect()
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), 29);
        assert_eq!(days_in_month(2025, 2), 28);
        assert_eq!(days_in_month(1900, 2), 28);
        assert_eq!(days_in_month(2000, 2), 29);
        assert_eq!(days_in_month(2025, 4), 30);
        assert_eq!(days_in_month(2025, 12), 31);
    }

    #[test]
    fn test_next_payment_date_examples() {
        assert_eq!(next_payment_date(date(2025, 1, 15)), date(2025, 2, 15));
        assert_eq!(next_payment_date(date(2025, 2, 28)), date(2025, 3, 31));
        assert_eq!(next_payment_date(date(2024, 2, 29)), date(2024, 3, 31));
        assert_eq!(next_payment_date(date(2025, 1, 31)), date(2025, 2, 28));
        assert_eq!(next_payment_date(date(2025, 1, 30)), date(2025, 2, 28));
        assert_eq!(next_payment_date(date(2025, 4, 30)), date(2025, 5, 31));
        assert_eq!(next_payment_date(date(2025, 12, 31)), date(2026, 1, 31));
        assert_eq!(next_payment_date(date(2025, 12, 10)), date(2026, 1, 10));
    }

    #[test]
    fn test_month_end_rolls_to_month_end() {
        for d in days_between(date(2020, 1, 1), date(2030, 12, 31)) {
            if is_last_day_of_month(d) {
                let next = next_payment_date(d);
                assert!(is_last_day_of_month(next), "{d} -> {next}");
                assert_eq!(next, add_months_clamped(d, 1).with_day(1).map(last_day_of_month).unwrap());
            }
        }
    }

    #[test]
    fn test_mid_month_keeps_day() {
        for d in days_between(date(2020, 1, 1), date(2030, 12, 31)) {
            if !is_last_day_of_month(d) && d.day() <= 28 {
                let next = next_payment_date(d);
                assert_eq!(next.day(), d.day(), "{d} -> {next}");
                assert_eq!(next, add_months_clamped(d, 1));
            }
        }
    }

    #[test]
    fn test_next_payment_timestamp_keeps_time() {
        let due = date(2025, 2, 28).and_hms_opt(14, 30, 5).unwrap().and_utc();
        let next = next_payment_timestamp(due);
        assert_eq!(next, date(2025, 3, 31).and_hms_opt(14, 30, 5).unwrap().and_utc());
    }

    #[test]
    fn test_accrual_day_after_anniversary() {
        let start = date(2025, 1, 12);
        assert!(is_accrual_day(start, date(2025, 2, 13)));
        assert!(is_accrual_day(start, date(2025, 3, 13)));
        assert!(!is_accrual_day(start, date(2025, 3, 12)));
        assert!(!is_accrual_day(start, date(2025, 3, 14)));
    }

    #[test]
    fn test_accrual_starts_in_origination_month() {
        let start = date(2025, 1, 12);
        assert!(is_accrual_day(start, date(2025, 1, 13)));
        assert!(!is_accrual_day(start, date(2025, 1, 12)));
        assert!(!is_accrual_day(start, date(2024, 12, 13)));
        assert!(!is_accrual_day(start, date(2025, 2, 12)));

        let month_end = date(2025, 1, 31);
        assert!(!is_accrual_day(month_end, date(2025, 1, 31)));
        assert!(is_accrual_day(month_end, date(2025, 2, 1)));
        assert!(is_accrual_day(month_end, date(2025, 3, 1)));
    }

    #[test]
    fn test_day_30_start_accrues_on_consecutive_days_around_june() {
        let start = date(2025, 1, 30);
        assert!(is_accrual_day(start, date(2025, 5, 31)));
        assert!(is_accrual_day(start, date(2025, 6, 1)));
        assert_eq!(accrual_days_in_month(start, 2025, 5), vec![31]);
        assert_eq!(accrual_days_in_month(start, 2025, 6), vec![1]);
        assert_eq!(accrual_days_in_month(start, 2025, 7), vec![31]);
    }

    #[test]
    fn test_low_start_days_accrue_once_per_month_on_next_day() {
        for k in 1..29 {
            let start = date(2023, 6, k);
            for (year, month) in (2024..=2025).flat_map(|y| (1..=12).map(move |m| (y, m))) {
                let days = accrual_days_in_month(start, year, month);
                if k + 1 <= days_in_month(year, month) {
                    assert_eq!(days, vec![k + 1], "start day {k}, {year}-{month}");
                } else {
                    assert!(days.is_empty(), "start day {k}, {year}-{month}");
                }
            }
        }
    }

    #[test]
    fn test_high_start_days_accrue_on_first_after_short_month() {
        for k in 29..=31 {
            let start = date(2023, 1, k.min(31));
            for (year, month) in (2024..=2026).flat_map(|y| (1..=12).map(move |m| (y, m))) {
                let (py, pm) = previous_month(year, month);
                if k > days_in_month(py, pm) {
                    assert_eq!(
                        accrual_days_in_month(start, year, month),
                        vec![1],
                        "start day {k}, {year}-{month}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_high_start_days_accrue_exactly_once_every_month() {
        for k in 29..=31 {
            let start = date(2023, 1, k);
            for (year, month) in (2024..=2026).flat_map(|y| (1..=12).map(move |m| (y, m))) {
                assert_eq!(
                    accrual_days_in_month(start, year, month).len(),
                    1,
                    "start day {k}, {year}-{month}"
                );
            }
        }
    }

    #[test]
    fn test_start_on_31st_examples() {
        let start = date(2025, 1, 31);
        assert!(is_accrual_day(start, date(2025, 3, 1)));
        assert!(is_accrual_day(start, date(2025, 4, 1)));
        assert!(is_accrual_day(start, date(2025, 5, 1)));
        assert!(!is_accrual_day(start, date(2025, 3, 31)));
    }
}
