//! # date-math
//!
//! Deterministic date-interval arithmetic.
//!
//! Converts free-form interval text to seconds and days, measures whole-day
//! distances between calendar dates, rewrites database clock-style intervals
//! into explicit units, and counts non-business days over a range without
//! walking every day in it.
//!
//! ## Modules
//!
//! - [`date_math`] — [`DateMath`]: interval conversion, whole-day differences, non-business-day counting
//! - [`time_source`] — [`TimeSource`] collaborator trait and the chrono-backed [`ChronoTimeSource`]
//! - [`expression`] — Free-form date/time expression resolution used by [`ChronoTimeSource`]
//! - [`calendar`] — [`BusinessCalendar`]: non-business weekdays and holiday dates
//! - [`error`] — Error types
//!
//! ## Example
//!
//! ```
//! use chrono::{TimeZone, Utc};
//! use date_math::{BusinessCalendar, ChronoTimeSource, DateMath};
//!
//! let now = Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap();
//! let math = DateMath::new(ChronoTimeSource::anchored(now, chrono_tz::UTC));
//!
//! assert_eq!(math.days_until_date("2024-01-08", None).unwrap(), 7);
//! let calendar = BusinessCalendar::weekend_with_holidays(["2024-01-03"]);
//! assert_eq!(
//!     math.non_business_days("2024-01-07", Some("2024-01-01"), &calendar).unwrap(),
//!     3
//! );
//! ```

pub mod calendar;
pub mod date_math;
pub mod error;
pub mod expression;
pub mod time_source;

pub use calendar::{weekday_from_index, weekday_index, BusinessCalendar};
pub use date_math::{
    normalize_db_interval, seconds_to_days, DateMath, MAX_REMAINDER_STEPS, SECONDS_PER_DAY,
};
pub use error::{DateMathError, Result};
pub use time_source::{ChronoTimeSource, TimeSource};
