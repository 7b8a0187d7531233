//! Failure taxonomy for mailclerk.
//!
//! Every failure is a value carrying exactly the data needed to render one
//! diagnostic line; the jobs chain stages with `?` and render the first
//! failure at the boundary. Scheduling rejections ("no need to run") travel
//! through the same type as real errors; the caller only ever sees the
//! formatted line.

use chrono::{DateTime, NaiveTime, Utc, Weekday};
use thiserror::Error;

/// Result type alias used throughout the pipeline.
pub type Outcome<T> = std::result::Result<T, ClerkError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClerkError {
    // Scheduling rejections: expected no-ops, not errors
    #[error("No need to run - day of month is {day}, only running on day {} of each month", join_days(.days))]
    NoNeedToRunOnThisDayOfMonth { day: u32, days: Vec<u32> },

    #[error("No need to run - today is {}, only running on {}", weekday_name(*.day), join_weekdays(.days))]
    NoNeedToRunOnThisDayOfWeek { day: Weekday, days: Vec<Weekday> },

    #[error("No need to run - time is {} in {zone}, only running after {} in {zone}", .now.format("%H:%M"), .run_after.format("%H:%M"))]
    NoNeedToRunAtThisTime {
        now: NaiveTime,
        run_after: NaiveTime,
        zone: String,
    },

    // Integrity violations: corrupted persisted state
    #[error("Exiting due to invalid state, previous email appears to have been sent in the future")]
    InvalidStateInFuture,

    // No-op conditions
    #[error("Exiting as this exact email has already been sent")]
    ThisEmailAlreadySent,

    #[error("Exiting, email has already been sent for {month} {year}")]
    AnEmailAlreadySentThisMonth { month: String, year: i32 },

    #[error("No matching results for query: '{0}'")]
    NoMatchingResultsForQuery(String),

    // Transient / environment failures
    #[error("Error - could not get raw message content for email")]
    CouldNotGetRawContent,

    #[error("Error - could not decode raw message")]
    CouldNotDecodeRawContent,

    #[error("Error sending email with subject '{subject}' to {}", .recipients.join(", "))]
    CouldNotSendEmail {
        subject: String,
        recipients: Vec<String>,
    },

    #[error("Error downloading file {name} from Dropbox")]
    StateReadFailure { name: String },

    #[error("{description}\nError - could not store state in Dropbox")]
    StateWriteFailure { description: String },

    #[error("Error - {0} is not a list of valid email address")]
    NotAListOfEmailAddresses(String),

    #[error("Email client error: {0}")]
    Mail(String),

    #[error("Blob store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Config(String),

    // Catch-all, unreachable in correct operation
    #[error("Exiting due to unknown error")]
    Unknown,
}

impl ClerkError {
    pub fn mail(msg: impl Into<String>) -> Self {
        Self::Mail(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// An email already went out during `now`'s calendar month.
    pub fn already_sent_this_month(now: DateTime<Utc>) -> Self {
        Self::AnEmailAlreadySentThisMonth {
            month: month_name(now).to_string(),
            year: chrono::Datelike::year(&now),
        }
    }
}

fn join_days(days: &[u32]) -> String {
    days.iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn join_weekdays(days: &[Weekday]) -> String {
    days.iter()
        .map(|d| weekday_name(*d))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Full English weekday name (chrono's `Display` is the short form).
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn month_name(now: DateTime<Utc>) -> &'static str {
    const NAMES: [&str; 12] = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    NAMES[(chrono::Datelike::month(&now) - 1) as usize]
}
