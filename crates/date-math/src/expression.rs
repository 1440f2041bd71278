//! Free-form date/time expression resolution.
//!
//! Resolves expressions such as `"2024-01-07 +1 day"`, `"today 12:00"`,
//! `"5 hours 6 minutes"` or `"2 weeks ago"` against an explicit base instant
//! and timezone. The base is always supplied by the caller (no system clock
//! access here), which keeps resolution deterministic.
//!
//! # Grammar
//!
//! An expression is a whitespace-separated sequence of items:
//!
//! - **Passthrough**: a whole-string RFC 3339 datetime
//! - **Absolute date**: `YYYY-MM-DD`, optionally `YYYY-MM-DDTHH:MM[:SS]`
//! - **Epoch**: `@<seconds>`
//! - **Anchors**: `now`, `today`, `midnight`, `noon`, `tomorrow`, `yesterday`
//! - **Time of day**: `H:MM`, `H:MM:SS`
//! - **Relative**: `[+|-]N unit` (space optional: `+1day`), `next unit`,
//!   `last unit`, with units second/minute/hour/day/week/fortnight/month/year
//! - **`ago`**: negates every relative item read before it
//!
//! Setting a date without a time resets the wall clock to midnight.
//! Calendar units move the local date and keep the wall-clock time; clock
//! units are added to the resolved instant.

use chrono::{
    DateTime, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::DateMathError;

/// Units accepted after a relative number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Unit {
    Second,
    Minute,
    Hour,
    Day,
    Week,
    Fortnight,
    Month,
    Year,
}

/// Relative components accumulated while reading an expression.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RelativeOffset {
    months: i64,
    days: i64,
    seconds: i64,
}

impl RelativeOffset {
    fn add(&mut self, n: i64, unit: Unit) {
        let (field, factor) = match unit {
            Unit::Second => (&mut self.seconds, 1),
            Unit::Minute => (&mut self.seconds, 60),
            Unit::Hour => (&mut self.seconds, 3600),
            Unit::Day => (&mut self.days, 1),
            Unit::Week => (&mut self.days, 7),
            Unit::Fortnight => (&mut self.days, 14),
            Unit::Month => (&mut self.months, 1),
            Unit::Year => (&mut self.months, 12),
        };
        // Saturate; oversized offsets fail later as out of range
        *field = field.saturating_add(n.saturating_mul(factor));
    }

    fn negate(&mut self) {
        self.months = self.months.saturating_neg();
        self.days = self.days.saturating_neg();
        self.seconds = self.seconds.saturating_neg();
    }

    fn moves_calendar(&self) -> bool {
        self.months != 0 || self.days != 0
    }
}

/// Everything an expression says, before it is applied to a base instant.
#[derive(Debug, Clone, Default)]
struct ParsedExpression {
    instant: Option<DateTime<Utc>>,
    date: Option<NaiveDate>,
    time: Option<NaiveTime>,
    /// Day shift from `tomorrow`/`yesterday`; not affected by `ago`.
    day_shift: i64,
    relative: RelativeOffset,
}

impl ParsedExpression {
    /// True when the wall clock of the base has to be rebuilt.
    fn rewrites_local_time(&self) -> bool {
        self.date.is_some()
            || self.time.is_some()
            || self.day_shift != 0
            || self.relative.moves_calendar()
    }
}

/// Resolve `expression` to an absolute instant.
///
/// Relative items are applied to `base`; absolute items replace the
/// corresponding part of it. Wall-clock arithmetic happens in `tz`.
///
/// # Errors
///
/// Returns [`DateMathError::InvalidExpression`] for empty input, unknown
/// words, invalid dates or times, and results outside chrono's range.
pub fn resolve(
    expression: &str,
    base: DateTime<Utc>,
    tz: &Tz,
) -> Result<DateTime<Utc>, DateMathError> {
    let trimmed = expression.trim();
    if let Some(dt) = try_passthrough_rfc3339(trimmed) {
        return Ok(dt);
    }

    let parsed = parse_items(trimmed)?;
    let base = parsed.instant.unwrap_or(base);

    let anchored = if parsed.rewrites_local_time() {
        let local = base.with_timezone(tz);
        let date = parsed.date.unwrap_or_else(|| local.date_naive());
        let time = match (parsed.time, parsed.date) {
            (Some(time), _) => time,
            (None, Some(_)) => NaiveTime::MIN,
            (None, None) => local.time(),
        };
        let naive = shift_calendar(
            date.and_time(time),
            parsed.day_shift + parsed.relative.days,
            parsed.relative.months,
        )
        .ok_or_else(|| out_of_range(expression))?;
        localize(naive, tz)
            .ok_or_else(|| out_of_range(expression))?
            .with_timezone(&Utc)
    } else {
        base
    };

    Duration::try_seconds(parsed.relative.seconds)
        .and_then(|offset| anchored.checked_add_signed(offset))
        .ok_or_else(|| out_of_range(expression))
}

// ── Item parsing ────────────────────────────────────────────────────────────

fn parse_items(expression: &str) -> Result<ParsedExpression, DateMathError> {
    let normalized = expression.to_lowercase();
    let tokens: Vec<&str> = normalized.split_whitespace().collect();
    if tokens.is_empty() {
        return Err(DateMathError::InvalidExpression(
            "empty expression".to_string(),
        ));
    }

    let mut parsed = ParsedExpression::default();
    let mut i = 0;
    while i < tokens.len() {
        let token = tokens[i];
        i += 1;

        match token {
            "now" => continue,
            "today" | "midnight" => {
                parsed.time = Some(NaiveTime::MIN);
                continue;
            }
            "noon" => {
                parsed.time = NaiveTime::from_hms_opt(12, 0, 0);
                continue;
            }
            "tomorrow" | "yesterday" => {
                parsed.day_shift += if token == "tomorrow" { 1 } else { -1 };
                parsed.time = Some(NaiveTime::MIN);
                continue;
            }
            "ago" => {
                parsed.relative.negate();
                continue;
            }
            "next" | "last" | "previous" => {
                let unit = tokens
                    .get(i)
                    .and_then(|t| parse_unit(t))
                    .ok_or_else(|| unrecognized(expression, token))?;
                i += 1;
                parsed.relative.add(if token == "next" { 1 } else { -1 }, unit);
                continue;
            }
            _ => {}
        }

        if let Some(epoch) = token.strip_prefix('@') {
            let secs: i64 = epoch
                .parse()
                .map_err(|_| unrecognized(expression, token))?;
            parsed.instant = Some(
                DateTime::from_timestamp(secs, 0).ok_or_else(|| out_of_range(expression))?,
            );
            continue;
        }

        if let Some((date, time)) = parse_date_token(token) {
            parsed.date = Some(date);
            if time.is_some() {
                parsed.time = time;
            }
            continue;
        }

        if token.contains(':') {
            let time = parse_clock(token).ok_or_else(|| unrecognized(expression, token))?;
            parsed.time = Some(time);
            continue;
        }

        if let Some((n, rest)) = split_number(token) {
            let unit = if rest.is_empty() {
                let next = tokens.get(i).ok_or_else(|| unrecognized(expression, token))?;
                i += 1;
                parse_unit(next).ok_or_else(|| unrecognized(expression, next))?
            } else {
                parse_unit(rest).ok_or_else(|| unrecognized(expression, token))?
            };
            parsed.relative.add(n, unit);
            continue;
        }

        return Err(unrecognized(expression, token));
    }

    Ok(parsed)
}

/// Try to parse as an RFC 3339 passthrough.
fn try_passthrough_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DDTHH:MM[:SS]` (already lowercased).
fn parse_date_token(token: &str) -> Option<(NaiveDate, Option<NaiveTime>)> {
    let (date_part, time_part) = match token.split_once('t') {
        Some((d, t)) => (d, Some(t)),
        None => (token, None),
    };
    let date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()?;
    match time_part {
        Some(t) => Some((date, Some(parse_clock(t)?))),
        None => Some((date, None)),
    }
}

/// Parse a wall-clock time: `H:MM` or `H:MM:SS`.
fn parse_clock(s: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()
}

/// Split a signed leading integer from the rest of the token: `"+8days"` → `(8, "days")`.
fn split_number(token: &str) -> Option<(i64, &str)> {
    let digits_start = usize::from(token.starts_with(['+', '-']));
    let digits_end = token[digits_start..]
        .find(|c: char| !c.is_ascii_digit())
        .map_or(token.len(), |pos| pos + digits_start);
    if digits_end == digits_start {
        return None;
    }
    let n = token[..digits_end].parse::<i64>().ok()?;
    Some((n, &token[digits_end..]))
}

/// Map a unit name (singular, plural or short form) to a [`Unit`].
fn parse_unit(s: &str) -> Option<Unit> {
    match s {
        "sec" | "secs" | "second" | "seconds" => Some(Unit::Second),
        "min" | "mins" | "minute" | "minutes" => Some(Unit::Minute),
        "hour" | "hours" | "hr" | "hrs" => Some(Unit::Hour),
        "day" | "days" => Some(Unit::Day),
        "week" | "weeks" | "wk" | "wks" => Some(Unit::Week),
        "fortnight" | "fortnights" => Some(Unit::Fortnight),
        "month" | "months" => Some(Unit::Month),
        "year" | "years" | "yr" | "yrs" => Some(Unit::Year),
        _ => None,
    }
}

// ── Calendar helpers ────────────────────────────────────────────────────────

/// Move a local datetime by whole months then whole days.
///
/// Month arithmetic clamps to the last day of the target month.
fn shift_calendar(naive: NaiveDateTime, days: i64, months: i64) -> Option<NaiveDateTime> {
    let months_abs = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    let shifted = if months >= 0 {
        naive.checked_add_months(months_abs)?
    } else {
        naive.checked_sub_months(months_abs)?
    };
    shifted.checked_add_signed(Duration::try_days(days)?)
}

/// Pin a local datetime to an instant in `tz`.
///
/// Ambiguous times take the earlier instant; times inside a DST gap move
/// forward one hour.
fn localize(naive: NaiveDateTime, tz: &Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => tz
            .from_local_datetime(&naive.checked_add_signed(Duration::hours(1))?)
            .earliest(),
    }
}

fn unrecognized(expression: &str, token: &str) -> DateMathError {
    DateMathError::InvalidExpression(format!(
        "cannot parse expression '{}': unexpected '{}'",
        expression.trim(),
        token
    ))
}

fn out_of_range(expression: &str) -> DateMathError {
    DateMathError::InvalidExpression(format!(
        "expression '{}' resolves outside the supported range",
        expression.trim()
    ))
}

// ── Tests ───────────────────────────────────────────────────────────────────
