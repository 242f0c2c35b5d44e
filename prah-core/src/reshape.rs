//! Table reshapers and session bundle assembly
//!
//! Each reshaper takes one table of a loaded [`Session`], keeps a fixed set
//! of columns, converts timedeltas to seconds and returns plain records. An
//! absent table yields an empty result.

use crate::model::{Lap, Session};
use crate::normalize::{normalize_session, time_base, NormalizedPoint};
use crate::units::Timedelta;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use tracing::info;

/// Position reported for drivers without a grid slot or classification
pub const UNKNOWN_POSITION: u32 = 20;

/// Records carrying session-time fields that move with the time base
pub trait TimeShift {
    fn shift(&mut self, offset: f64);
}

fn shift_opt(value: &mut Option<f64>, offset: f64) {
    if let Some(v) = value {
        *v -= offset;
    }
}

/// Which bundle tables to populate
///
/// Table names: `telemetry`, `drivers`, `laps`, `events`, `race_control`,
/// `circuit_info`, `weather`.
#[derive(Debug, Clone)]
pub struct TableMask {
    tables: HashSet<String>,
    include_all: bool,
}

impl TableMask {
    /// Create a mask that includes all tables
    pub fn all() -> Self {
        Self {
            tables: HashSet::new(),
            include_all: true,
        }
    }

    /// Create a mask from a comma-separated list of table names
    pub fn parse(tables: &str) -> Self {
        let tables: HashSet<String> = tables
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            tables,
            include_all: false,
        }
    }

    pub fn includes(&self, table: &str) -> bool {
        self.include_all || self.tables.contains(&table.to_lowercase())
    }

    pub fn is_all(&self) -> bool {
        self.include_all
    }
}

impl Default for TableMask {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for TableMask {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(s))
    }
}

// === Laps ===

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct LapRecord {
    pub driver: Option<String>,
    pub lap_number: Option<u32>,
    pub stint: Option<u32>,
    pub compound: Option<String>,
    pub tyre_life: Option<f64>,
    pub lap_time: Option<f64>,
    pub lap_start_time: Option<f64>,
    pub pit_in_time: Option<f64>,
    pub pit_out_time: Option<f64>,
    pub sector1_time: Option<f64>,
    pub sector2_time: Option<f64>,
    pub sector3_time: Option<f64>,
}

impl From<&Lap> for LapRecord {
    fn from(lap: &Lap) -> Self {
        let secs = |td: Option<Timedelta>| td.map(|t| t.total_seconds());
        Self {
            driver: lap.driver.clone(),
            lap_number: lap.lap_number,
            stint: lap.stint,
            compound: lap.compound.clone(),
            tyre_life: lap.tyre_life,
            lap_time: secs(lap.lap_time),
            lap_start_time: secs(lap.lap_start_time),
            pit_in_time: secs(lap.pit_in_time),
            pit_out_time: secs(lap.pit_out_time),
            sector1_time: secs(lap.sector1_time),
            sector2_time: secs(lap.sector2_time),
            sector3_time: secs(lap.sector3_time),
        }
    }
}

impl TimeShift for LapRecord {
    fn shift(&mut self, offset: f64) {
        // lap and sector times are durations and stay as they are
        shift_opt(&mut self.lap_start_time, offset);
        shift_opt(&mut self.pit_in_time, offset);
        shift_opt(&mut self.pit_out_time, offset);
    }
}

pub fn laps_table(session: &Session) -> Vec<LapRecord> {
    session
        .laps
        .iter()
        .flatten()
        .map(LapRecord::from)
        .collect()
}

// === Driver roster ===

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DriverInfo {
    pub driver_number: String,
    pub abbreviation: Option<String>,
    pub team_name: Option<String>,
    pub team_color: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headshot_url: String,
    pub status: String,
    pub grid_position: u32,
    pub classified_position: u32,
}

/// Roster keyed by driver number, built from the results table
pub fn driver_roster(session: &Session) -> BTreeMap<String, DriverInfo> {
    session
        .results
        .iter()
        .flatten()
        .map(|row| {
            let info = DriverInfo {
                driver_number: row.driver_number.clone(),
                abbreviation: row.abbreviation.clone(),
                team_name: row.team_name.clone(),
                team_color: match row.team_color.as_deref() {
                    Some(color) if !color.is_empty() => format!("#{}", color),
                    _ => "#FFFFFF".to_string(),
                },
                first_name: row.first_name.clone(),
                last_name: row.last_name.clone(),
                headshot_url: row.headshot_url.clone().unwrap_or_default(),
                status: row
                    .status
                    .clone()
                    .unwrap_or_else(|| "Finished".to_string()),
                grid_position: position_or_unknown(row.grid_position),
                classified_position: position_or_unknown(row.position),
            };
            (row.driver_number.clone(), info)
        })
        .collect()
}

fn position_or_unknown(position: Option<f64>) -> u32 {
    position
        .filter(|p| p.is_finite() && *p >= 0.0)
        .map(|p| p as u32)
        .unwrap_or(UNKNOWN_POSITION)
}

// === Track status ===

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TrackEvent {
    pub time: f64,
    pub status: Option<String>,
    pub message: Option<String>,
}

impl TimeShift for TrackEvent {
    fn shift(&mut self, offset: f64) {
        self.time -= offset;
    }
}

pub fn track_status_table(session: &Session) -> Vec<TrackEvent> {
    session
        .track_status
        .iter()
        .flatten()
        .map(|row| TrackEvent {
            time: row.time.total_seconds(),
            status: row.status.clone(),
            message: row.message.clone(),
        })
        .collect()
}

// === Race control ===

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct RaceControlRecord {
    pub time: Option<f64>,
    /// Wall-clock timestamp as published, when the source provided one
    pub utc: Option<String>,
    pub category: Option<String>,
    pub message: Option<String>,
    pub status: Option<String>,
    pub flag: Option<String>,
    pub scope: Option<String>,
    pub sector: Option<f64>,
    pub racing_number: Option<String>,
    pub lap: Option<u32>,
}

impl TimeShift for RaceControlRecord {
    fn shift(&mut self, offset: f64) {
        shift_opt(&mut self.time, offset);
    }
}

pub fn race_control_table(session: &Session) -> Vec<RaceControlRecord> {
    session
        .race_control_messages
        .iter()
        .flatten()
        .map(|row| RaceControlRecord {
            time: row
                .time
                .as_ref()
                .and_then(|t| t.session_seconds(session.t0_date)),
            utc: row
                .time
                .as_ref()
                .and_then(|t| t.wall_clock())
                .map(|at| at.format("%Y-%m-%dT%H:%M:%S%.3f").to_string()),
            category: row.category.clone(),
            message: row.message.clone(),
            status: row.status.clone(),
            flag: row.flag.clone(),
            scope: row.scope.clone(),
            sector: row.sector,
            racing_number: row.racing_number.clone(),
            lap: row.lap,
        })
        .collect()
}

// === Weather ===

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct WeatherRecord {
    pub time: f64,
    pub air_temp: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub rainfall: Option<bool>,
    pub track_temp: Option<f64>,
    pub wind_direction: Option<f64>,
    pub wind_speed: Option<f64>,
}

impl TimeShift for WeatherRecord {
    fn shift(&mut self, offset: f64) {
        self.time -= offset;
    }
}

pub fn weather_table(session: &Session) -> Vec<WeatherRecord> {
    session
        .weather_data
        .iter()
        .flatten()
        .map(|row| WeatherRecord {
            time: row.time.total_seconds(),
            air_temp: row.air_temp,
            humidity: row.humidity,
            pressure: row.pressure,
            rainfall: row.rainfall,
            track_temp: row.track_temp,
            wind_direction: row.wind_direction,
            wind_speed: row.wind_speed,
        })
        .collect()
}

// === Team radio ===

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TeamRadioRecord {
    pub time: Option<f64>,
    pub driver: Option<String>,
    pub message: Option<String>,
}

pub fn team_radio_table(session: &Session) -> Vec<TeamRadioRecord> {
    session
        .team_radio
        .iter()
        .flatten()
        .map(|row| TeamRadioRecord {
            time: row.time.map(|t| t.total_seconds()),
            driver: row.driver.clone(),
            message: row.message.clone(),
        })
        .collect()
}

// === Circuit ===

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CircuitSummary {
    pub location: String,
    pub official_event_name: String,
    pub event_date: String,
    pub country: String,
    pub round_number: String,
}

pub fn circuit_summary(session: &Session) -> Option<CircuitSummary> {
    session.event.as_ref().map(|event| CircuitSummary {
        location: event.location.clone(),
        official_event_name: event.official_event_name.clone(),
        event_date: event.event_date.clone().unwrap_or_default(),
        country: event.country.clone(),
        round_number: event.round_number.to_string(),
    })
}

fn object_or_empty<S: Serializer>(
    value: &Option<CircuitSummary>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(summary) => summary.serialize(s),
        None => serde_json::Map::new().serialize(s),
    }
}

// === Bundle ===

/// Everything the replay view needs for one session
#[derive(Debug, Clone, Serialize)]
pub struct SessionBundle {
    pub telemetry: Vec<NormalizedPoint>,
    pub drivers: BTreeMap<String, DriverInfo>,
    pub laps: Vec<LapRecord>,
    pub events: Vec<TrackEvent>,
    pub race_control: Vec<RaceControlRecord>,
    #[serde(serialize_with = "object_or_empty")]
    pub circuit_info: Option<CircuitSummary>,
    pub weather: Vec<WeatherRecord>,
    pub total_laps: u32,
    /// Session time, in seconds, that maps to zero in every table above
    pub time_offset: f64,
}

fn shift_all<T: TimeShift>(records: &mut [T], offset: f64) {
    for record in records {
        record.shift(offset);
    }
}

/// Reshape a loaded session into a bundle with one shared time base
///
/// Telemetry is always normalized because it defines the time base, even
/// when the mask leaves it out of the response.
pub fn build_bundle(session: &Session, mask: &TableMask) -> SessionBundle {
    let mut series = normalize_session(session);
    let offset = time_base(&series).unwrap_or(0.0);
    for s in &mut series {
        s.shift(offset);
    }

    let telemetry = if mask.includes("telemetry") {
        series.into_iter().flat_map(|s| s.points).collect()
    } else {
        Vec::new()
    };

    let mut laps = if mask.includes("laps") {
        laps_table(session)
    } else {
        Vec::new()
    };
    shift_all(&mut laps, offset);

    let mut events = if mask.includes("events") {
        track_status_table(session)
    } else {
        Vec::new()
    };
    shift_all(&mut events, offset);
    if !events.is_empty() {
        info!("Track status events: {}", events.len());
    }

    let mut race_control = if mask.includes("race_control") {
        race_control_table(session)
    } else {
        Vec::new()
    };
    shift_all(&mut race_control, offset);
    if !race_control.is_empty() {
        info!("Race control messages: {}", race_control.len());
    }

    let mut weather = if mask.includes("weather") {
        weather_table(session)
    } else {
        Vec::new()
    };
    shift_all(&mut weather, offset);

    SessionBundle {
        telemetry,
        drivers: if mask.includes("drivers") {
            driver_roster(session)
        } else {
            BTreeMap::new()
        },
        laps,
        events,
        race_control,
        circuit_info: if mask.includes("circuit_info") {
            circuit_summary(session)
        } else {
            None
        },
        weather,
        total_laps: session.total_laps(),
        time_offset: offset,
    }
}
