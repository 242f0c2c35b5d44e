//! Session source trait definition

use crate::error::SourceError;
use crate::model::{EventInfo, Session};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Trait for providers of timing data
///
/// A source owns whatever caching or fetching is needed to produce a
/// [`Session`]. Calls are synchronous and may block on disk or network I/O;
/// async callers should run them on a blocking thread.
pub trait SessionSource: Send + Sync {
    /// Get the name of this source (e.g., "Cache", "Demo")
    fn name(&self) -> &str;

    /// Event schedule for one season, in round order
    fn event_schedule(&self, year: i32) -> Result<Vec<EventInfo>, SourceError>;

    /// Load one session of the event selected by `event` (name or round)
    ///
    /// Tables not requested in `options` are left empty.
    fn load_session(
        &self,
        year: i32,
        event: &str,
        kind: SessionKind,
        options: LoadOptions,
    ) -> Result<Session, SourceError>;

    /// Resolve a user-supplied race identifier against the schedule
    fn find_event(&self, year: i32, event: &str) -> Result<EventInfo, SourceError> {
        self.event_schedule(year)?
            .into_iter()
            .find(|e| e.matches(event))
            .ok_or_else(|| SourceError::EventNotFound {
                year,
                query: event.to_string(),
            })
    }
}

/// Which tables to load alongside the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    pub laps: bool,
    pub telemetry: bool,
    pub weather: bool,
    /// Race control messages and team radio
    pub messages: bool,
}

impl LoadOptions {
    pub fn all() -> Self {
        Self {
            laps: true,
            telemetry: true,
            weather: true,
            messages: true,
        }
    }

    pub fn messages_only() -> Self {
        Self {
            laps: false,
            telemetry: false,
            weather: false,
            messages: true,
        }
    }

    /// Drop the tables that were not requested
    pub fn apply(&self, session: &mut Session) {
        if !self.laps {
            session.laps = None;
            session.track_status = None;
        }
        if !self.telemetry {
            session.telemetry.clear();
        }
        if !self.weather {
            session.weather_data = None;
        }
        if !self.messages {
            session.race_control_messages = None;
            session.team_radio = None;
        }
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self::all()
    }
}

/// Session type within an event weekend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionKind {
    Practice1,
    Practice2,
    Practice3,
    SprintQualifying,
    Sprint,
    Qualifying,
    Race,
}

impl SessionKind {
    /// Short identifier used by the timing library and in cache file names
    pub fn code(&self) -> &'static str {
        match self {
            SessionKind::Practice1 => "FP1",
            SessionKind::Practice2 => "FP2",
            SessionKind::Practice3 => "FP3",
            SessionKind::SprintQualifying => "SQ",
            SessionKind::Sprint => "S",
            SessionKind::Qualifying => "Q",
            SessionKind::Race => "R",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            SessionKind::Practice1 => "Practice 1",
            SessionKind::Practice2 => "Practice 2",
            SessionKind::Practice3 => "Practice 3",
            SessionKind::SprintQualifying => "Sprint Qualifying",
            SessionKind::Sprint => "Sprint",
            SessionKind::Qualifying => "Qualifying",
            SessionKind::Race => "Race",
        }
    }
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SessionKind {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let kind = match s.trim().to_lowercase().as_str() {
            "fp1" | "practice 1" => SessionKind::Practice1,
            "fp2" | "practice 2" => SessionKind::Practice2,
            "fp3" | "practice 3" => SessionKind::Practice3,
            "sq" | "sprint qualifying" | "sprint shootout" => SessionKind::SprintQualifying,
            "s" | "sprint" => SessionKind::Sprint,
            "q" | "qualifying" => SessionKind::Qualifying,
            "r" | "race" => SessionKind::Race,
            other => {
                return Err(SourceError::Unsupported(format!(
                    "unknown session '{}'",
                    other
                )))
            }
        };
        Ok(kind)
    }
}
