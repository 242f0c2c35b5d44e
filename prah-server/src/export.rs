//! Batch export of one session into CSV files
//!
//! Every table lands in its own file under the output directory. Times are
//! raw session seconds; unlike the replay bundle nothing is shifted onto a
//! common time base.

use anyhow::{Context, Result};
use prah_core::model::{Lap, Session};
use prah_core::normalize::normalize_session;
use prah_core::reshape::{race_control_table, team_radio_table, track_status_table, weather_table};
use prah_core::summary::driver_summaries;
use prah_core::Timedelta;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Files written by one export run, with their row counts
#[derive(Debug, Default)]
pub struct ExportReport {
    pub output_dir: PathBuf,
    pub files: Vec<(String, usize)>,
}

impl ExportReport {
    pub fn rows(&self, file: &str) -> Option<usize> {
        self.files
            .iter()
            .find(|(name, _)| name == file)
            .map(|(_, rows)| *rows)
    }
}

#[derive(Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct LapRow<'a> {
    driver: Option<&'a str>,
    driver_number: Option<&'a str>,
    lap_number: Option<u32>,
    stint: Option<u32>,
    compound: Option<&'a str>,
    tyre_life: Option<f64>,
    position: Option<f64>,
    #[serde(rename = "Time_seconds")]
    time: Option<f64>,
    #[serde(rename = "LapTime_seconds")]
    lap_time: Option<f64>,
    #[serde(rename = "Sector1Time_seconds")]
    sector1_time: Option<f64>,
    #[serde(rename = "Sector2Time_seconds")]
    sector2_time: Option<f64>,
    #[serde(rename = "Sector3Time_seconds")]
    sector3_time: Option<f64>,
    #[serde(rename = "LapStartTime_seconds")]
    lap_start_time: Option<f64>,
    #[serde(rename = "PitInTime_seconds")]
    pit_in_time: Option<f64>,
    #[serde(rename = "PitOutTime_seconds")]
    pit_out_time: Option<f64>,
    #[serde(rename = "Sector1SessionTime_seconds")]
    sector1_session_time: Option<f64>,
    #[serde(rename = "Sector2SessionTime_seconds")]
    sector2_session_time: Option<f64>,
    #[serde(rename = "Sector3SessionTime_seconds")]
    sector3_session_time: Option<f64>,
}

impl<'a> From<&'a Lap> for LapRow<'a> {
    fn from(lap: &'a Lap) -> Self {
        let secs = |td: Option<Timedelta>| td.map(|t| t.total_seconds());
        Self {
            driver: lap.driver.as_deref(),
            driver_number: lap.driver_number.as_deref(),
            lap_number: lap.lap_number,
            stint: lap.stint,
            compound: lap.compound.as_deref(),
            tyre_life: lap.tyre_life,
            position: lap.position,
            time: secs(lap.time),
            lap_time: secs(lap.lap_time),
            sector1_time: secs(lap.sector1_time),
            sector2_time: secs(lap.sector2_time),
            sector3_time: secs(lap.sector3_time),
            lap_start_time: secs(lap.lap_start_time),
            pit_in_time: secs(lap.pit_in_time),
            pit_out_time: secs(lap.pit_out_time),
            sector1_session_time: secs(lap.sector1_session_time),
            sector2_session_time: secs(lap.sector2_session_time),
            sector3_session_time: secs(lap.sector3_session_time),
        }
    }
}

#[derive(Default, Serialize)]
struct TelemetryRow<'a> {
    #[serde(rename = "Time_seconds")]
    time: f64,
    #[serde(rename = "Driver")]
    driver: &'a str,
    #[serde(rename = "DriverName")]
    driver_name: &'a str,
    #[serde(rename = "Team")]
    team: &'a str,
    #[serde(rename = "LapNumber")]
    lap_number: Option<u32>,
    #[serde(rename = "Compound")]
    compound: Option<&'a str>,
    #[serde(rename = "X")]
    x: Option<f64>,
    #[serde(rename = "Y")]
    y: Option<f64>,
    #[serde(rename = "Distance")]
    distance: Option<f64>,
    #[serde(rename = "Speed")]
    speed: Option<f64>,
    #[serde(rename = "Throttle")]
    throttle: Option<f64>,
    #[serde(rename = "Brake")]
    brake: Option<f64>,
    #[serde(rename = "nGear")]
    gear: Option<i32>,
    #[serde(rename = "RPM")]
    rpm: Option<f64>,
    #[serde(rename = "DRS")]
    drs: Option<i32>,
}

#[derive(Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct SessionInfoRow<'a> {
    year: i32,
    event_name: &'a str,
    official_event_name: &'a str,
    location: &'a str,
    country: &'a str,
    round_number: Option<u32>,
    session_name: &'a str,
    total_laps: u32,
}

#[derive(Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct CornerRow<'a> {
    number: u32,
    letter: Option<&'a str>,
    #[serde(rename = "X")]
    x: f64,
    #[serde(rename = "Y")]
    y: f64,
    angle: Option<f64>,
    distance: Option<f64>,
    rotation: Option<f64>,
}

/// Header of a row type, taken from how serde names its fields
fn column_names<T: Serialize + Default>() -> Result<csv::StringRecord> {
    let mut scratch = csv::Writer::from_writer(Vec::new());
    scratch
        .serialize(T::default())
        .context("Failed to derive CSV columns")?;
    let bytes = scratch
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to derive CSV columns: {}", e.error()))?;
    let mut reader = csv::Reader::from_reader(bytes.as_slice());
    Ok(reader.headers()?.clone())
}

/// Write `rows` to `<dir>/<name>` with a header derived from the row type
///
/// An empty table still gets its header line.
fn write_table<T: Serialize + Default>(dir: &Path, name: &str, rows: &[T]) -> Result<usize> {
    let path = dir.join(name);
    let mut writer = csv::Writer::from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    if rows.is_empty() {
        writer
            .write_record(&column_names::<T>()?)
            .with_context(|| format!("Failed to write the header of {}", path.display()))?;
    }
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write a row of {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    info!("Saved: {} ({} rows)", name, rows.len());
    Ok(rows.len())
}

/// Export every available table of `session` into `output_dir`
///
/// Tables the session does not carry produce no file, except
/// `session_info.csv` which is always written.
pub fn export_session(session: &Session, output_dir: &Path) -> Result<ExportReport> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    let mut report = ExportReport {
        output_dir: output_dir.to_path_buf(),
        files: Vec::new(),
    };
    let mut record = |name: &str, rows: usize| report.files.push((name.to_string(), rows));

    if let Some(results) = &session.results {
        record("race_results.csv", write_table(output_dir, "race_results.csv", results)?);
    }

    if let Some(laps) = &session.laps {
        let rows: Vec<LapRow> = laps.iter().map(LapRow::from).collect();
        record("all_laps.csv", write_table(output_dir, "all_laps.csv", &rows)?);
    }

    info!("Exporting driver telemetry (this may take a while)...");
    let series = normalize_session(session);
    if !series.is_empty() {
        let mut labelled = Vec::new();
        for s in &series {
            let result = session.driver_result(&s.driver);
            let driver_name = result
                .map(|r| r.display_name())
                .unwrap_or_else(|| s.driver.clone());
            let team = result
                .and_then(|r| r.team_name.clone())
                .unwrap_or_else(|| "Unknown".to_string());
            labelled.extend(s.points.iter().map(|p| (p, driver_name.clone(), team.clone())));
        }
        let rows: Vec<TelemetryRow> = labelled
            .iter()
            .map(|(p, driver_name, team)| TelemetryRow {
                time: p.time,
                driver: &p.driver,
                driver_name,
                team,
                lap_number: p.lap_number,
                compound: p.compound.as_deref(),
                x: p.x,
                y: p.y,
                distance: p.distance,
                speed: p.speed,
                throttle: p.throttle,
                brake: p.brake,
                gear: p.gear,
                rpm: p.rpm,
                drs: p.drs,
            })
            .collect();
        record("telemetry.csv", write_table(output_dir, "telemetry.csv", &rows)?);
    }

    if session.weather_data.is_some() {
        let rows = weather_table(session);
        record("weather.csv", write_table(output_dir, "weather.csv", &rows)?);
    }

    if session.track_status.is_some() {
        let rows = track_status_table(session);
        record("track_status.csv", write_table(output_dir, "track_status.csv", &rows)?);
    }

    if session.race_control_messages.is_some() {
        let rows = race_control_table(session);
        record(
            "race_control_messages.csv",
            write_table(output_dir, "race_control_messages.csv", &rows)?,
        );
    }

    if session.team_radio.is_some() {
        let rows = team_radio_table(session);
        record("team_radio.csv", write_table(output_dir, "team_radio.csv", &rows)?);
    }

    let event = session.event.as_ref();
    let info_row = SessionInfoRow {
        year: session.year,
        event_name: event.map(|e| e.event_name.as_str()).unwrap_or_default(),
        official_event_name: event
            .map(|e| e.official_event_name.as_str())
            .unwrap_or_default(),
        location: event.map(|e| e.location.as_str()).unwrap_or_default(),
        country: event.map(|e| e.country.as_str()).unwrap_or_default(),
        round_number: event.map(|e| e.round_number),
        session_name: if session.name.is_empty() {
            "Race"
        } else {
            session.name.as_str()
        },
        total_laps: session.total_laps(),
    };
    record("session_info.csv", write_table(output_dir, "session_info.csv", &[info_row])?);

    if let Some(circuit) = &session.circuit_info {
        let rows: Vec<CornerRow> = circuit
            .corners
            .iter()
            .map(|c| CornerRow {
                number: c.number,
                letter: c.letter.as_deref(),
                x: c.x,
                y: c.y,
                angle: c.angle,
                distance: c.distance,
                rotation: circuit.rotation,
            })
            .collect();
        record("circuit_info.csv", write_table(output_dir, "circuit_info.csv", &rows)?);
    }

    let summaries = driver_summaries(session);
    if !summaries.is_empty() {
        record(
            "driver_summary.csv",
            write_table(output_dir, "driver_summary.csv", &summaries)?,
        );
    }

    info!("All data exported to: {}/", output_dir.display());
    Ok(report)
}
