//! Whole-day differences, interval conversion and non-business-day counting.
//!
//! [`DateMath`] owns a [`TimeSource`] and does all of its calendar work
//! through it. Date arguments are free-form expressions in whatever syntax the
//! time source accepts; for [`ChronoTimeSource`](crate::ChronoTimeSource) that
//! is the grammar documented in [`crate::expression`].

use chrono::{DateTime, Duration, Utc, Weekday};
use log::{debug, trace, warn};
use regex::Regex;
use std::sync::OnceLock;

use crate::calendar::BusinessCalendar;
use crate::error::Result;
use crate::time_source::TimeSource;

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Upper bound on remainder-scan steps in [`DateMath::non_business_days`].
///
/// The remainder after whole weeks is always shorter than a week, so the scan
/// only reaches this bound if date arithmetic misbehaves (for example around
/// a DST shift). Reaching it stops the scan silently.
pub const MAX_REMAINDER_STEPS: usize = 7;

/// Default start of a non-business-day range when none is given.
///
/// Noon keeps the day-by-day scan clear of midnight DST transitions.
const DEFAULT_RANGE_START: &str = "today 12:00";

/// Floor division of seconds into whole days (rounds toward negative infinity).
///
/// ```
/// use date_math::seconds_to_days;
///
/// assert_eq!(seconds_to_days(86_400), 1);
/// assert_eq!(seconds_to_days(86_399), 0);
/// assert_eq!(seconds_to_days(-1), -1);
/// ```
pub fn seconds_to_days(sec: i64) -> i64 {
    sec.div_euclid(SECONDS_PER_DAY)
}

/// Rewrite clock-formatted interval text (`H:MM:SS`) with explicit units.
///
/// Databases such as PostgreSQL render intervals like `"5 hours 6 min"` as
/// `"05:06:00"`, which a date parser reads as a time of day. The first
/// greedy match of `^(.*)(\d+):(\d+):(\d+)(.*)$` is rewritten as
/// `"<prefix><hours> hours <minutes> minutes <seconds> seconds<suffix>"`.
/// The prefix is greedy, so in `"2 days 05:06:00"` it keeps the leading `0`
/// of the hours. Digits are ASCII only and `.` stops at a newline, so
/// multi-line text never matches; a single trailing newline is accepted and
/// dropped. Input without a match is returned unchanged.
///
/// ```
/// use date_math::normalize_db_interval;
///
/// assert_eq!(normalize_db_interval("5:06:00"), "5 hours 06 minutes 00 seconds");
/// assert_eq!(normalize_db_interval("3 days"), "3 days");
/// ```
pub fn normalize_db_interval(interval: &str) -> String {
    static CLOCK_INTERVAL: OnceLock<Regex> = OnceLock::new();
    let re = CLOCK_INTERVAL.get_or_init(|| {
        Regex::new(
            r"^(?P<prefix>.*)(?P<hours>[0-9]+):(?P<minutes>[0-9]+):(?P<seconds>[0-9]+)(?P<suffix>.*)\n?$",
        )
        .expect("clock interval pattern is valid")
    });

    match re.captures(interval) {
        Some(caps) => format!(
            "{}{} hours {} minutes {} seconds{}",
            &caps["prefix"], &caps["hours"], &caps["minutes"], &caps["seconds"], &caps["suffix"]
        ),
        None => interval.to_string(),
    }
}

/// Day arithmetic over a [`TimeSource`].
#[derive(Debug, Clone, Default)]
pub struct DateMath<S> {
    source: S,
}

impl<S: TimeSource> DateMath<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn time_source(&self) -> &S {
        &self.source
    }

    /// Seconds an interval expression spans, measured from the Unix epoch.
    ///
    /// `"5 hours 6 minutes"` → `18360`. Calendar units are applied as
    /// calendar moves from 1970-01-01, so `"1 month"` is 31 days.
    ///
    /// # Errors
    ///
    /// Propagates the time source's parse error unchanged.
    pub fn interval_to_seconds(&self, interval: &str) -> Result<i64> {
        let epoch = DateTime::<Utc>::UNIX_EPOCH;
        Ok(self.source.parse(interval, Some(epoch))?.timestamp())
    }

    /// Whole days an interval expression spans, floored.
    ///
    /// # Errors
    ///
    /// Propagates the time source's parse error unchanged.
    pub fn interval_to_days(&self, interval: &str) -> Result<i64> {
        Ok(seconds_to_days(self.interval_to_seconds(interval)?))
    }

    /// Whole days from 00:00 on `from_date` (default: today) to 00:00 on `to_date`.
    ///
    /// Both dates are truncated to their calendar day first, so times of day
    /// never matter. Negative when `to_date` is earlier.
    ///
    /// # Errors
    ///
    /// Propagates the time source's parse error unchanged.
    pub fn days_until_date(&self, to_date: &str, from_date: Option<&str>) -> Result<i64> {
        let from = match from_date {
            Some(text) => self.source.parse(text, None)?,
            None => self.source.now(),
        };
        let to = self.source.parse(to_date, None)?;

        let from_day = self.truncate_to_day(from)?;
        let to_day = self.truncate_to_day(to)?;
        Ok(seconds_to_days(to_day.timestamp()) - seconds_to_days(from_day.timestamp()))
    }

    /// Count non-business days between `from_date` and `to_date`.
    ///
    /// Whole weeks contribute one day per flagged weekday without being
    /// walked; only the remaining days (fewer than a week) are scanned. The
    /// calendar's explicit dates are then added when they fall strictly after
    /// `from_date` and before the end of `to_date`, unless they already land
    /// on a flagged weekday. `from_date` defaults to 12:00 today.
    ///
    /// # Errors
    ///
    /// Propagates the time source's parse error for any unparseable date,
    /// including entries of `calendar.non_business_dates`.
    pub fn non_business_days(
        &self,
        to_date: &str,
        from_date: Option<&str>,
        calendar: &BusinessCalendar,
    ) -> Result<i64> {
        let weekdays = calendar.distinct_weekdays();
        let range_days = self.days_until_date(to_date, from_date)?;
        let full_weeks = range_days.div_euclid(7);
        let mut count = weekdays.len() as i64 * full_weeks;

        let from = self
            .source
            .parse(from_date.unwrap_or(DEFAULT_RANGE_START), None)?;
        let to = self
            .source
            .parse("+1 day", Some(self.source.parse(to_date, None)?))?;

        let remainder_offset = full_weeks * 7 + 1;
        let mut cursor = self
            .source
            .parse(&format!("{remainder_offset:+} days"), Some(from))?;

        debug!(
            "non-business range: {range_days} days, {full_weeks} full weeks, \
             {count} from weeks, remainder scan {cursor} .. {to}"
        );

        let mut steps = 0;
        while cursor < to {
            let day = self.source.weekday_of(cursor);
            if weekdays.contains(&day) {
                count += 1;
            }
            trace!("remainder {cursor} ({day:?}) running count {count}");
            steps += 1;
            cursor = match cursor.checked_add_signed(Duration::seconds(SECONDS_PER_DAY)) {
                Some(next) => next,
                None => {
                    debug!("remainder scan reached the end of the supported range at {cursor}");
                    break;
                }
            };
            if steps >= MAX_REMAINDER_STEPS {
                if cursor < to {
                    warn!(
                        "remainder scan stopped after {MAX_REMAINDER_STEPS} steps \
                         at {cursor}, before {to}"
                    );
                }
                break;
            }
        }

        for date in &calendar.non_business_dates {
            let instant = self.source.parse(date, None)?;
            if self.is_extra_holiday(instant, from, to, &weekdays) {
                trace!("holiday {date} counted");
                count += 1;
            } else {
                trace!("holiday {date} skipped");
            }
        }

        debug!("non-business days: {count}");
        Ok(count)
    }

    fn is_extra_holiday(
        &self,
        instant: DateTime<Utc>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        weekdays: &[Weekday],
    ) -> bool {
        instant > from && instant < to && !weekdays.contains(&self.source.weekday_of(instant))
    }

    fn truncate_to_day(&self, instant: DateTime<Utc>) -> Result<DateTime<Utc>> {
        let date = self.source.format_date(instant);
        self.source.parse(&date, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DateMathError;
    use crate::time_source::ChronoTimeSource;
    use chrono::{Datelike, NaiveDate, TimeZone};
    use std::cell::Cell;

    fn anchor() -> DateTime<Utc> {
        // Wednesday, February 18, 2026, 14:30:00 UTC
        Utc.with_ymd_and_hms(2026, 2, 18, 14, 30, 0).unwrap()
    }

    fn math() -> DateMath<ChronoTimeSource> {
        DateMath::new(ChronoTimeSource::anchored(anchor(), chrono_tz::UTC))
    }

    fn weekend() -> BusinessCalendar {
        BusinessCalendar::default()
    }

    // ── seconds_to_days tests ───────────────────────────────────────────

    #[test]
    fn test_seconds_to_days_exact_multiples() {
        for n in [-3, -1, 0, 1, 2, 400] {
            assert_eq!(seconds_to_days(SECONDS_PER_DAY * n), n);
        }
    }

    #[test]
    fn test_seconds_to_days_floors() {
        for n in 1..5 {
            assert_eq!(seconds_to_days(SECONDS_PER_DAY * n - 1), n - 1);
        }
        assert_eq!(seconds_to_days(-1), -1);
        assert_eq!(seconds_to_days(-SECONDS_PER_DAY - 1), -2);
    }

    // ── normalize_db_interval tests ─────────────────────────────────────

    #[test]
    fn test_normalize_plain_clock() {
        assert_eq!(normalize_db_interval("5:06:00"), "5 hours 06 minutes 00 seconds");
    }

    #[test]
    fn test_normalize_greedy_prefix_keeps_leading_digit() {
        assert_eq!(
            normalize_db_interval("2 days 05:06:00"),
            "2 days 05 hours 06 minutes 00 seconds"
        );
        assert_eq!(
            normalize_db_interval("123:00:00"),
            "123 hours 00 minutes 00 seconds"
        );
    }

    #[test]
    fn test_normalize_keeps_suffix() {
        assert_eq!(
            normalize_db_interval("1 day 01:30:15 ago"),
            "1 day 01 hours 30 minutes 15 seconds ago"
        );
    }

    #[test]
    fn test_normalize_without_clock_is_unchanged() {
        assert_eq!(normalize_db_interval("3 days"), "3 days");
        assert_eq!(normalize_db_interval("12:30"), "12:30");
        assert_eq!(normalize_db_interval(""), "");
    }

    #[test]
    fn test_normalize_multiline_is_unchanged() {
        assert_eq!(normalize_db_interval("a\n5:06:00"), "a\n5:06:00");
        assert_eq!(normalize_db_interval("5:06:00\nx"), "5:06:00\nx");
        assert_eq!(normalize_db_interval("5:06:00\n"), "5 hours 06 minutes 00 seconds");
    }

    #[test]
    fn test_normalize_ascii_digits_only() {
        // Arabic-Indic digits
        let clock = "\u{665}:\u{660}\u{666}:\u{660}\u{660}";
        assert_eq!(normalize_db_interval(clock), clock);
        assert_eq!(
            normalize_db_interval("\u{665} 5:06:00"),
            "\u{665} 5 hours 06 minutes 00 seconds"
        );
    }

    #[test]
    fn test_normalized_interval_parses_as_duration() {
        let m = math();
        let normalized = normalize_db_interval("2 days 05:06:00");
        assert_eq!(
            m.interval_to_seconds(&normalized).unwrap(),
            2 * SECONDS_PER_DAY + 5 * 3600 + 6 * 60
        );
    }

    // ── interval conversion tests ───────────────────────────────────────

    #[test]
    fn test_interval_to_seconds() {
        let m = math();
        assert_eq!(m.interval_to_seconds("5 hours 6 minutes").unwrap(), 18360);
        assert_eq!(m.interval_to_seconds("+1 day").unwrap(), SECONDS_PER_DAY);
        assert_eq!(m.interval_to_seconds("-2 weeks").unwrap(), -14 * SECONDS_PER_DAY);
    }

    #[test]
    fn test_interval_to_days_floors_negative() {
        let m = math();
        assert_eq!(m.interval_to_days("36 hours").unwrap(), 1);
        assert_eq!(m.interval_to_days("-1 hour").unwrap(), -1);
        assert_eq!(m.interval_to_days("-36 hours").unwrap(), -2);
    }

    #[test]
    fn test_interval_parse_error_propagates() {
        let err = math().interval_to_seconds("five hours").unwrap_err();
        assert!(matches!(err, DateMathError::InvalidExpression(_)));
    }

    // ── days_until_date tests ───────────────────────────────────────────

    #[test]
    fn test_days_until_same_day_is_zero() {
        let m = math();
        for d in ["2024-01-01", "2024-02-29", "2026-12-31"] {
            assert_eq!(m.days_until_date(d, Some(d)).unwrap(), 0);
        }
    }

    #[test]
    fn test_days_until_one_week() {
        assert_eq!(math().days_until_date("2024-01-08", Some("2024-01-01")).unwrap(), 7);
    }

    #[test]
    fn test_days_until_ignores_time_of_day() {
        let m = math();
        assert_eq!(
            m.days_until_date("2024-01-02 00:05", Some("2024-01-01 23:55")).unwrap(),
            1
        );
        assert_eq!(
            m.days_until_date("2024-01-01 23:59", Some("2024-01-01 00:00")).unwrap(),
            0
        );
    }

    #[test]
    fn test_days_until_negative() {
        assert_eq!(math().days_until_date("2024-01-01", Some("2024-01-08")).unwrap(), -7);
    }

    #[test]
    fn test_days_until_defaults_to_today() {
        // anchor is 2026-02-18 14:30
        let m = math();
        assert_eq!(m.days_until_date("2026-02-25", None).unwrap(), 7);
        assert_eq!(m.days_until_date("tomorrow", None).unwrap(), 1);
        assert_eq!(m.days_until_date("today", None).unwrap(), 0);
    }

    #[test]
    fn test_days_until_across_dst() {
        let m = DateMath::new(ChronoTimeSource::anchored(anchor(), chrono_tz::America::New_York));
        assert_eq!(m.days_until_date("2026-03-09", Some("2026-03-07")).unwrap(), 2);
        assert_eq!(m.days_until_date("2026-11-02", Some("2026-10-31")).unwrap(), 2);
    }

    #[test]
    fn test_days_until_london_spring_forward_undercounts() {
        // Local midnight on 2026-03-30 is 23:00 UTC the day before, so the
        // floored epoch days of the two midnights differ by one.
        let m = DateMath::new(ChronoTimeSource::anchored(anchor(), chrono_tz::Europe::London));
        assert_eq!(m.days_until_date("2026-03-30", Some("2026-03-28")).unwrap(), 1);
        // Both midnights on the same side of the change count normally.
        assert_eq!(m.days_until_date("2026-03-27", Some("2026-03-25")).unwrap(), 2);
    }

    #[test]
    fn test_days_until_parse_error_propagates() {
        assert!(math().days_until_date("someday", Some("2024-01-01")).is_err());
        assert!(math().days_until_date("2024-01-01", Some("someday")).is_err());
    }

    // ── non_business_days tests ─────────────────────────────────────────

    #[test]
    fn test_non_business_first_week_of_2024() {
        // Mon 2024-01-01 .. Sun 2024-01-07: Sat 6th and Sun 7th
        let n = math()
            .non_business_days("2024-01-07", Some("2024-01-01"), &weekend())
            .unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_non_business_range_start_day_is_excluded() {
        // Sat 2024-01-06 .. Sun 2024-01-07: only the Sunday lies after the start
        let n = math()
            .non_business_days("2024-01-07", Some("2024-01-06"), &weekend())
            .unwrap();
        assert_eq!(n, 1);
        let n = math()
            .non_business_days("2024-01-06", Some("2024-01-06"), &weekend())
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_non_business_whole_weeks() {
        let m = math();
        // Mon 2024-01-01 + 28 days = Mon 2024-01-29
        assert_eq!(m.non_business_days("2024-01-29", Some("2024-01-01"), &weekend()).unwrap(), 8);
        // Sat 2024-01-06 + 14 days = Sat 2024-01-20
        assert_eq!(m.non_business_days("2024-01-20", Some("2024-01-06"), &weekend()).unwrap(), 4);
    }

    #[test]
    fn test_non_business_long_range() {
        // 2024 is a leap year: 366 days from 2024-01-01 to 2025-01-01,
        // weekend days in (2024-01-01, 2025-01-01] = 104
        let n = math()
            .non_business_days("2025-01-01", Some("2024-01-01"), &weekend())
            .unwrap();
        assert_eq!(n, 104);
    }

    #[test]
    fn test_non_business_holiday_on_weekday_counts() {
        // Wed 2024-01-03
        let cal = BusinessCalendar::weekend_with_holidays(["2024-01-03"]);
        let n = math().non_business_days("2024-01-07", Some("2024-01-01"), &cal).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_non_business_holiday_on_weekend_not_double_counted() {
        // Sat 2024-01-06 is already a weekend day
        let cal = BusinessCalendar::weekend_with_holidays(["2024-01-06"]);
        let n = math().non_business_days("2024-01-07", Some("2024-01-01"), &cal).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_non_business_holiday_outside_range_ignored() {
        let cal = BusinessCalendar::weekend_with_holidays(["2023-12-29", "2024-01-08", "2024-01-01"]);
        let n = math().non_business_days("2024-01-07", Some("2024-01-01"), &cal).unwrap();
        assert_eq!(n, 2);
    }

    #[test]
    fn test_non_business_holiday_on_last_day_counts() {
        // Fri 2024-01-05 is the final day of the range
        let cal = BusinessCalendar::weekend_with_holidays(["2024-01-05"]);
        let n = math().non_business_days("2024-01-05", Some("2024-01-01"), &cal).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_non_business_duplicate_weekdays_ignored() {
        let cal = BusinessCalendar::new(
            vec![Weekday::Sat, Weekday::Sun, Weekday::Sat, Weekday::Sat, Weekday::Sun],
            vec![],
        );
        let m = math();
        assert_eq!(
            m.non_business_days("2024-01-29", Some("2024-01-01"), &cal).unwrap(),
            m.non_business_days("2024-01-29", Some("2024-01-01"), &weekend()).unwrap()
        );
    }

    #[test]
    fn test_non_business_custom_weekdays() {
        // Friday/Saturday weekend over Mon 2024-01-01 .. Sun 2024-01-14
        let cal = BusinessCalendar::new(vec![Weekday::Fri, Weekday::Sat], vec![]);
        let n = math().non_business_days("2024-01-14", Some("2024-01-01"), &cal).unwrap();
        assert_eq!(n, 4);
    }

    #[test]
    fn test_non_business_no_weekdays_only_holidays() {
        let cal = BusinessCalendar::new(vec![], vec!["2024-01-06".to_string()]);
        let n = math().non_business_days("2024-01-29", Some("2024-01-01"), &cal).unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn test_non_business_defaults_from_today_noon() {
        // anchor: Wed 2026-02-18; through Sun 2026-02-22 covers Sat 21 and Sun 22
        let n = math().non_business_days("2026-02-22", None, &weekend()).unwrap();
        assert_eq!(n, 2);
        // a holiday today is before noon today and is not counted
        let cal = BusinessCalendar::weekend_with_holidays(["2026-02-18", "2026-02-19"]);
        let n = math().non_business_days("2026-02-22", None, &cal).unwrap();
        assert_eq!(n, 3);
    }

    #[test]
    fn test_non_business_negative_range() {
        // -1 full week contributes -2; the remainder scan starts at the
        // exclusive end and walks nothing
        let n = math()
            .non_business_days("2024-01-01", Some("2024-01-08"), &weekend())
            .unwrap();
        assert_eq!(n, -2);
    }

    #[test]
    fn test_non_business_parse_error_propagates() {
        let cal = BusinessCalendar::weekend_with_holidays(["not a date"]);
        let err = math()
            .non_business_days("2024-01-07", Some("2024-01-01"), &cal)
            .unwrap_err();
        assert!(matches!(err, DateMathError::InvalidExpression(_)));
    }

    // ── remainder scan bound ────────────────────────────────────────────

    /// Wraps a real source and counts weekday lookups.
    struct CountingSource {
        inner: ChronoTimeSource,
        weekday_calls: Cell<usize>,
        ignore_offsets: bool,
    }

    impl TimeSource for CountingSource {
        fn parse(&self, text: &str, relative_to: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
            // A broken source that drops relative day offsets: the remainder
            // scan then starts at the range start, weeks before the end.
            if self.ignore_offsets && text.ends_with(" days") {
                if let Some(base) = relative_to {
                    return Ok(base);
                }
            }
            self.inner.parse(text, relative_to)
        }

        fn format_date(&self, instant: DateTime<Utc>) -> String {
            self.inner.format_date(instant)
        }

        fn weekday_of(&self, instant: DateTime<Utc>) -> Weekday {
            self.weekday_calls.set(self.weekday_calls.get() + 1);
            self.inner.weekday_of(instant)
        }

        fn now(&self) -> DateTime<Utc> {
            self.inner.now()
        }
    }

    fn counting(ignore_offsets: bool) -> DateMath<CountingSource> {
        DateMath::new(CountingSource {
            inner: ChronoTimeSource::anchored(anchor(), chrono_tz::UTC),
            weekday_calls: Cell::new(0),
            ignore_offsets,
        })
    }

    #[test]
    fn test_remainder_scan_is_short_for_long_ranges() {
        let m = counting(false);
        m.non_business_days("2034-06-30", Some("2024-01-01"), &weekend())
            .unwrap();
        assert!(m.time_source().weekday_calls.get() <= MAX_REMAINDER_STEPS);
    }

    #[test]
    fn test_remainder_scan_stops_at_end_of_range() {
        // Range ends on the last representable day, so stepping past the
        // final remainder day leaves the supported range.
        let last = NaiveDate::MAX.pred_opt().unwrap();
        let midnight = last.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let noon = last.and_hms_opt(12, 0, 0).unwrap().and_utc().timestamp();
        let n = math()
            .non_business_days(&format!("@{noon}"), Some(&format!("@{midnight}")), &weekend())
            .unwrap();
        let expected = i64::from(matches!(NaiveDate::MAX.weekday(), Weekday::Sat | Weekday::Sun));
        assert_eq!(n, expected);
    }

    #[test]
    fn test_remainder_scan_failsafe_stops_runaway_scan() {
        let m = counting(true);
        // Mon 2024-01-01 .. Mon 2024-03-04: 9 full weeks = 18, then a broken
        // scan from Mon 1/1 stopped after 7 days adds Sat 1/6 and Sun 1/7
        let n = m
            .non_business_days("2024-03-04", Some("2024-01-01"), &weekend())
            .unwrap();
        assert_eq!(m.time_source().weekday_calls.get(), MAX_REMAINDER_STEPS);
        assert_eq!(n, 20);
    }
}
