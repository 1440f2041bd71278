//! The date/time collaborator consumed by [`DateMath`](crate::DateMath).
//!
//! Everything the day-counting code knows about calendars, timezones and
//! free-form date text goes through [`TimeSource`]. The production
//! implementation, [`ChronoTimeSource`], resolves expressions with
//! [`crate::expression`] in a fixed IANA timezone and reads "now" from an
//! injectable clock anchor.

use chrono::{DateTime, Datelike, Utc, Weekday};
use chrono_tz::Tz;

use crate::error::{DateMathError, Result};
use crate::expression;

/// Date/time parsing and formatting capability.
///
/// Implementations must be deterministic for a given clock and timezone:
/// the counting algorithms call them repeatedly and compare the results.
pub trait TimeSource {
    /// Interpret a date/time/interval expression.
    ///
    /// Relative expressions resolve against `relative_to`, or against
    /// [`now`](TimeSource::now) when it is `None`.
    ///
    /// # Errors
    ///
    /// Returns [`DateMathError::InvalidExpression`] if the text is not
    /// recognized.
    fn parse(&self, text: &str, relative_to: Option<DateTime<Utc>>) -> Result<DateTime<Utc>>;

    /// Render an instant as a `YYYY-MM-DD` calendar date in the active timezone.
    fn format_date(&self, instant: DateTime<Utc>) -> String;

    /// Day of the week of an instant in the active timezone.
    fn weekday_of(&self, instant: DateTime<Utc>) -> Weekday;

    /// The current instant.
    fn now(&self) -> DateTime<Utc>;
}

impl<T: TimeSource + ?Sized> TimeSource for &T {
    fn parse(&self, text: &str, relative_to: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
        (**self).parse(text, relative_to)
    }

    fn format_date(&self, instant: DateTime<Utc>) -> String {
        (**self).format_date(instant)
    }

    fn weekday_of(&self, instant: DateTime<Utc>) -> Weekday {
        (**self).weekday_of(instant)
    }

    fn now(&self) -> DateTime<Utc> {
        (**self).now()
    }
}

/// [`TimeSource`] backed by chrono and chrono-tz.
///
/// With an anchor, [`now`](TimeSource::now) always returns that instant,
/// which makes every operation reproducible. Without one it reads the
/// system clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChronoTimeSource {
    tz: Tz,
    anchor: Option<DateTime<Utc>>,
}

impl ChronoTimeSource {
    /// Use the system clock in `tz`.
    pub fn system(tz: Tz) -> Self {
        Self { tz, anchor: None }
    }

    /// Freeze "now" at `anchor`, interpreting local times in `tz`.
    pub fn anchored(anchor: DateTime<Utc>, tz: Tz) -> Self {
        Self {
            tz,
            anchor: Some(anchor),
        }
    }

    /// Build from an IANA timezone name, optionally anchored.
    ///
    /// # Errors
    ///
    /// Returns [`DateMathError::InvalidTimezone`] if the name is unknown.
    pub fn from_timezone_name(name: &str, anchor: Option<DateTime<Utc>>) -> Result<Self> {
        let tz = name
            .parse::<Tz>()
            .map_err(|_| DateMathError::InvalidTimezone(format!("'{}'", name)))?;
        Ok(Self { tz, anchor })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    pub fn anchor(&self) -> Option<DateTime<Utc>> {
        self.anchor
    }
}

impl Default for ChronoTimeSource {
    fn default() -> Self {
        Self::system(chrono_tz::UTC)
    }
}

impl TimeSource for ChronoTimeSource {
    fn parse(&self, text: &str, relative_to: Option<DateTime<Utc>>) -> Result<DateTime<Utc>> {
        let base = relative_to.unwrap_or_else(|| self.now());
        expression::resolve(text, base, &self.tz)
    }

    fn format_date(&self, instant: DateTime<Utc>) -> String {
        instant.with_timezone(&self.tz).format("%Y-%m-%d").to_string()
    }

    fn weekday_of(&self, instant: DateTime<Utc>) -> Weekday {
        instant.with_timezone(&self.tz).weekday()
    }

    fn now(&self) -> DateTime<Utc> {
        self.anchor.unwrap_or_else(Utc::now)
    }
}
