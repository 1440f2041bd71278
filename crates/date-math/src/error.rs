//! Error types for date-math operations.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DateMathError {
    #[error("Invalid expression: {0}")]
    InvalidExpression(String),

    #[error("Invalid timezone: {0}")]
    InvalidTimezone(String),

    #[error("Invalid weekday: {0}")]
    InvalidWeekday(String),

    #[error("Invalid calendar: {0}")]
    InvalidCalendar(String),
}

pub type Result<T> = std::result::Result<T, DateMathError>;
