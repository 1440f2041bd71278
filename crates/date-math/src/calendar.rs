//! Non-business day configuration.
//!
//! A [`BusinessCalendar`] names the recurring weekdays that are never
//! business days and an explicit list of holiday dates. It serializes with
//! weekdays as integers (0 = Sunday … 6 = Saturday) so calendars can be kept
//! in JSON files:
//!
//! ```
//! use date_math::BusinessCalendar;
//!
//! let cal: BusinessCalendar = serde_json::from_str(
//!     r#"{ "non_business_weekdays": [5, 6], "non_business_dates": ["2024-04-10"] }"#,
//! )
//! .unwrap();
//! assert_eq!(cal.non_business_weekdays.len(), 2);
//! ```

use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::error::{DateMathError, Result};

/// Weekdays and explicit dates that do not count as business days.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessCalendar {
    /// Recurring non-business weekdays. Duplicates are tolerated and ignored.
    #[serde(default = "default_weekend", with = "weekday_indices")]
    pub non_business_weekdays: Vec<Weekday>,
    /// Holiday expressions, resolved through the active time source.
    #[serde(default)]
    pub non_business_dates: Vec<String>,
}

impl Default for BusinessCalendar {
    fn default() -> Self {
        Self {
            non_business_weekdays: default_weekend(),
            non_business_dates: Vec::new(),
        }
    }
}

impl BusinessCalendar {
    pub fn new(non_business_weekdays: Vec<Weekday>, non_business_dates: Vec<String>) -> Self {
        Self {
            non_business_weekdays,
            non_business_dates,
        }
    }

    /// Saturday and Sunday, plus the given holidays.
    pub fn weekend_with_holidays<I, S>(dates: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            non_business_dates: dates.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Parse a calendar from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`DateMathError::InvalidCalendar`] for malformed JSON or
    /// weekday indices outside `0..=6`.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| DateMathError::InvalidCalendar(e.to_string()))
    }

    /// The weekday set without duplicates, in first-seen order.
    pub fn distinct_weekdays(&self) -> Vec<Weekday> {
        let mut seen = Vec::with_capacity(7);
        for day in &self.non_business_weekdays {
            if !seen.contains(day) {
                seen.push(*day);
            }
        }
        seen
    }
}

fn default_weekend() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

/// Convert an integer weekday (0 = Sunday … 6 = Saturday).
///
/// # Errors
///
/// Returns [`DateMathError::InvalidWeekday`] outside `0..=6`.
pub fn weekday_from_index(index: u8) -> Result<Weekday> {
    match index {
        0 => Ok(Weekday::Sun),
        1 => Ok(Weekday::Mon),
        2 => Ok(Weekday::Tue),
        3 => Ok(Weekday::Wed),
        4 => Ok(Weekday::Thu),
        5 => Ok(Weekday::Fri),
        6 => Ok(Weekday::Sat),
        _ => Err(DateMathError::InvalidWeekday(format!(
            "{index} (expected 0 = Sunday through 6 = Saturday)"
        ))),
    }
}

/// Integer form of a weekday (0 = Sunday … 6 = Saturday).
pub fn weekday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

mod weekday_indices {
    use chrono::Weekday;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(days: &[Weekday], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(days.iter().map(|d| super::weekday_index(*d)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Weekday>, D::Error> {
        Vec::<u8>::deserialize(deserializer)?
            .into_iter()
            .map(|i| super::weekday_from_index(i).map_err(D::Error::custom))
            .collect()
    }
}
