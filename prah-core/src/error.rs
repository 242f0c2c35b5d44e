//! Error types for session loading and reshaping

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by a [`SessionSource`](crate::source::SessionSource)
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SourceError {
    #[error("No event schedule available for {year}")]
    ScheduleUnavailable { year: i32 },

    #[error("No event matching '{query}' in the {year} schedule")]
    EventNotFound { year: i32, query: String },

    #[error("Session {session} of {year} round {round} is not available")]
    SessionUnavailable {
        year: i32,
        round: u32,
        session: String,
    },

    #[error("Failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Unsupported request: {0}")]
    Unsupported(String),
}

impl SourceError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn decode(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Decode {
            path: path.into(),
            source,
        }
    }
}

/// Per-driver failures of the telemetry normalizer
#[derive(Error, Debug, PartialEq)]
pub enum NormalizeError {
    #[error("Driver {driver} has laps but no telemetry samples")]
    NoTelemetry { driver: String },

    #[error("Driver {driver} telemetry spans {slots} grid slots (limit {limit})")]
    GridTooLarge {
        driver: String,
        slots: i64,
        limit: i64,
    },
}

/// Failure to parse a textual duration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid timedelta '{input}': {reason}")]
pub struct ParseTimedeltaError {
    pub input: String,
    pub reason: &'static str,
}
