//! Session data model
//!
//! Mirrors the tables exposed by the timing library for one session. Every
//! table and column the library may omit is an `Option`, so consumers check
//! presence explicitly instead of probing attributes at runtime.
//!
//! Column names follow the library (`LapNumber`, `nGear`, `RPM`, ...) so a
//! cached session dump deserializes without a mapping layer.

use crate::units::{bool_or_number, SessionClock, Timedelta};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One loaded session with all tables the source could provide
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub year: i32,

    /// Session name, e.g. "Race"
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub event: Option<EventInfo>,

    /// Driver numbers in session order
    #[serde(default)]
    pub drivers: Vec<String>,

    /// Scheduled race distance in laps
    #[serde(default)]
    pub total_laps: Option<u32>,

    /// Wall-clock instant of session time zero
    #[serde(default)]
    pub t0_date: Option<NaiveDateTime>,

    #[serde(default)]
    pub results: Option<Vec<DriverResult>>,

    #[serde(default)]
    pub laps: Option<Vec<Lap>>,

    /// Merged position and car channels, keyed by driver number
    #[serde(default)]
    pub telemetry: BTreeMap<String, Vec<Sample>>,

    #[serde(default)]
    pub track_status: Option<Vec<TrackStatus>>,

    #[serde(default)]
    pub race_control_messages: Option<Vec<RaceControlMessage>>,

    #[serde(default)]
    pub weather_data: Option<Vec<WeatherSample>>,

    #[serde(default)]
    pub team_radio: Option<Vec<TeamRadio>>,

    #[serde(default)]
    pub circuit_info: Option<CircuitInfo>,
}

impl Session {
    /// All laps of one driver, in table order
    pub fn driver_laps(&self, driver_number: &str) -> Vec<&Lap> {
        self.laps
            .iter()
            .flatten()
            .filter(|lap| lap.driver_number.as_deref() == Some(driver_number))
            .collect()
    }

    /// Results row for one driver
    pub fn driver_result(&self, driver_number: &str) -> Option<&DriverResult> {
        self.results
            .iter()
            .flatten()
            .find(|r| r.driver_number == driver_number)
    }

    /// Scheduled lap count, falling back to the highest lap number seen
    pub fn total_laps(&self) -> u32 {
        self.total_laps.unwrap_or_else(|| {
            self.laps
                .iter()
                .flatten()
                .filter_map(|lap| lap.lap_number)
                .max()
                .unwrap_or(0)
        })
    }
}

/// One event of a season schedule
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventInfo {
    pub round_number: u32,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub event_name: String,
    #[serde(default)]
    pub official_event_name: String,
    #[serde(default)]
    pub event_date: Option<String>,
    #[serde(default)]
    pub event_format: Option<String>,
    #[serde(default, rename = "F1ApiSupport")]
    pub f1_api_support: Option<bool>,
}

impl EventInfo {
    /// Whether a user-supplied race identifier selects this event
    ///
    /// Numbers select by round; text matches the event name, location or
    /// country, ignoring case and punctuation.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if let Ok(round) = query.parse::<u32>() {
            return round == self.round_number;
        }

        let needle = fold(query);
        if needle.is_empty() {
            return false;
        }
        [
            &self.event_name,
            &self.location,
            &self.country,
            &self.official_event_name,
        ]
        .iter()
        .any(|field| fold(field).contains(&needle))
    }

    /// Event name folded into a file-name friendly form
    pub fn slug(&self) -> String {
        slugify(if self.event_name.is_empty() {
            &self.location
        } else {
            &self.event_name
        })
    }
}

fn fold(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}

/// Lowercase a name and join its words with `_`
pub fn slugify(s: &str) -> String {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join("_")
}

/// One row of the session results table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverResult {
    pub driver_number: String,
    #[serde(default)]
    pub broadcast_name: Option<String>,
    #[serde(default)]
    pub abbreviation: Option<String>,
    #[serde(default)]
    pub team_name: Option<String>,
    #[serde(default)]
    pub team_color: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub headshot_url: Option<String>,
    #[serde(default)]
    pub country_code: Option<String>,
    #[serde(default)]
    pub position: Option<f64>,
    #[serde(default)]
    pub classified_position: Option<String>,
    #[serde(default)]
    pub grid_position: Option<f64>,
    #[serde(default)]
    pub time: Option<Timedelta>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub points: Option<f64>,
}

impl DriverResult {
    pub fn display_name(&self) -> String {
        match (&self.full_name, &self.first_name, &self.last_name) {
            (Some(full), _, _) => full.clone(),
            (None, Some(first), Some(last)) => format!("{} {}", first, last),
            _ => self.driver_number.clone(),
        }
    }
}

/// One lap of one driver
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Lap {
    /// Driver abbreviation
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub driver_number: Option<String>,
    #[serde(default)]
    pub lap_number: Option<u32>,
    #[serde(default)]
    pub stint: Option<u32>,
    #[serde(default)]
    pub compound: Option<String>,
    #[serde(default)]
    pub tyre_life: Option<f64>,
    #[serde(default)]
    pub position: Option<f64>,

    /// Session time at which the lap was set
    #[serde(default)]
    pub time: Option<Timedelta>,
    #[serde(default)]
    pub lap_time: Option<Timedelta>,
    #[serde(default)]
    pub lap_start_time: Option<Timedelta>,
    #[serde(default)]
    pub pit_in_time: Option<Timedelta>,
    #[serde(default)]
    pub pit_out_time: Option<Timedelta>,
    #[serde(default)]
    pub sector1_time: Option<Timedelta>,
    #[serde(default)]
    pub sector2_time: Option<Timedelta>,
    #[serde(default)]
    pub sector3_time: Option<Timedelta>,
    #[serde(default)]
    pub sector1_session_time: Option<Timedelta>,
    #[serde(default)]
    pub sector2_session_time: Option<Timedelta>,
    #[serde(default)]
    pub sector3_session_time: Option<Timedelta>,
}

/// One telemetry observation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Session time of the observation
    #[serde(rename = "Time")]
    pub time: Timedelta,
    #[serde(rename = "X", default)]
    pub x: Option<f64>,
    #[serde(rename = "Y", default)]
    pub y: Option<f64>,
    #[serde(rename = "Speed", default)]
    pub speed: Option<f64>,
    #[serde(rename = "Throttle", default)]
    pub throttle: Option<f64>,
    #[serde(rename = "Brake", default, deserialize_with = "bool_or_number")]
    pub brake: Option<f64>,
    #[serde(rename = "nGear", default)]
    pub gear: Option<i32>,
    #[serde(rename = "RPM", default)]
    pub rpm: Option<f64>,
    #[serde(rename = "DRS", default)]
    pub drs: Option<i32>,
    #[serde(rename = "Distance", default)]
    pub distance: Option<f64>,
}

/// Track status change (flags, safety car)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrackStatus {
    pub time: Timedelta,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Message published by race control
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RaceControlMessage {
    #[serde(default)]
    pub time: Option<SessionClock>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub flag: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub sector: Option<f64>,
    #[serde(default)]
    pub racing_number: Option<String>,
    #[serde(default)]
    pub lap: Option<u32>,
}

/// One weather station reading
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherSample {
    pub time: Timedelta,
    #[serde(default)]
    pub air_temp: Option<f64>,
    #[serde(default)]
    pub humidity: Option<f64>,
    #[serde(default)]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub rainfall: Option<bool>,
    #[serde(default)]
    pub track_temp: Option<f64>,
    #[serde(default)]
    pub wind_direction: Option<f64>,
    #[serde(default)]
    pub wind_speed: Option<f64>,
}

/// One team radio clip
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamRadio {
    #[serde(default)]
    pub time: Option<Timedelta>,
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Circuit layout details
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CircuitInfo {
    /// Rotation in degrees that aligns the track map with the official layout
    #[serde(default)]
    pub rotation: Option<f64>,
    #[serde(default)]
    pub corners: Vec<Corner>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Corner {
    pub number: u32,
    #[serde(default)]
    pub letter: Option<String>,
    #[serde(rename = "X")]
    pub x: f64,
    #[serde(rename = "Y")]
    pub y: f64,
    #[serde(default)]
    pub angle: Option<f64>,
    #[serde(default)]
    pub distance: Option<f64>,
}
