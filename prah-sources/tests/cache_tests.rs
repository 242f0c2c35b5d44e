//! Integration tests for the FileCacheSource

use prah_core::model::EventInfo;
use prah_core::{LoadOptions, SessionKind, SessionSource, SourceError};
use prah_sources::FileCacheSource;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const SESSION_JSON: &str = r#"{
    "drivers": ["1", "11"],
    "total_laps": 57,
    "laps": [
        {"DriverNumber": "1", "LapNumber": 1, "Compound": "SOFT",
         "LapStartTime": "0 days 01:02:03.500000", "LapTime": 97.2}
    ],
    "telemetry": {
        "1": [{"Time": 3723.6, "Speed": 121.0, "Brake": false}]
    },
    "weather_data": [{"Time": 0.0, "AirTemp": 24.1}]
}"#;

fn write_schedule(root: &Path, year: i32) {
    let events = vec![
        EventInfo {
            round_number: 2,
            country: "Saudi Arabia".into(),
            location: "Jeddah".into(),
            event_name: "Saudi Arabian Grand Prix".into(),
            ..Default::default()
        },
        EventInfo {
            round_number: 1,
            country: "Bahrain".into(),
            location: "Sakhir".into(),
            event_name: "Bahrain Grand Prix".into(),
            ..Default::default()
        },
    ];
    let dir = root.join(year.to_string());
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("schedule.json"), serde_json::to_vec(&events).unwrap()).unwrap();
}

fn write_session(root: &Path, year: i32, round: u32, file: &str, bytes: &[u8]) {
    let dir = root.join(year.to_string()).join(format!("{:02}", round));
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join(file), bytes).unwrap();
}

#[test]
fn test_cache_source_name() {
    let tmp = TempDir::new().unwrap();
    assert_eq!(FileCacheSource::new(tmp.path()).name(), "Cache");
}

#[test]
fn test_missing_schedule_is_unavailable() {
    let tmp = TempDir::new().unwrap();
    let err = FileCacheSource::new(tmp.path())
        .event_schedule(2023)
        .unwrap_err();
    assert!(matches!(err, SourceError::ScheduleUnavailable { year: 2023 }));
}

#[test]
fn test_schedule_sorted_by_round() {
    let tmp = TempDir::new().unwrap();
    write_schedule(tmp.path(), 2023);
    let events = FileCacheSource::new(tmp.path()).event_schedule(2023).unwrap();
    let rounds: Vec<u32> = events.iter().map(|e| e.round_number).collect();
    assert_eq!(rounds, vec![1, 2]);
}

#[test]
fn test_corrupt_schedule_is_decode_error() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("2023");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("schedule.json"), b"not json").unwrap();

    let err = FileCacheSource::new(tmp.path())
        .event_schedule(2023)
        .unwrap_err();
    assert!(matches!(err, SourceError::Decode { .. }));
}

#[test]
fn test_load_plain_json_by_name() {
    let tmp = TempDir::new().unwrap();
    write_schedule(tmp.path(), 2023);
    write_session(tmp.path(), 2023, 1, "R.json", SESSION_JSON.as_bytes());

    let session = FileCacheSource::new(tmp.path())
        .load_session(2023, "bahrain", SessionKind::Race, LoadOptions::all())
        .unwrap();

    assert_eq!(session.year, 2023);
    assert_eq!(session.name, "Race");
    assert_eq!(session.event.as_ref().map(|e| e.round_number), Some(1));
    assert_eq!(session.total_laps(), 57);
    let laps = session.driver_laps("1");
    let lap = laps[0];
    assert!((lap.lap_start_time.unwrap().total_seconds() - 3723.5).abs() < 1e-9);
    assert_eq!(session.telemetry["1"][0].brake, Some(0.0));
}

#[test]
fn test_load_compressed_json_by_round() {
    let tmp = TempDir::new().unwrap();
    write_schedule(tmp.path(), 2023);
    let packed = zstd::encode_all(SESSION_JSON.as_bytes(), 3).unwrap();
    write_session(tmp.path(), 2023, 2, "R.json.zst", &packed);

    let session = FileCacheSource::new(tmp.path())
        .load_session(2023, "2", SessionKind::Race, LoadOptions::all())
        .unwrap();
    assert_eq!(session.drivers, vec!["1", "11"]);
    assert_eq!(
        session.event.as_ref().map(|e| e.location.as_str()),
        Some("Jeddah")
    );
}

#[test]
fn test_missing_session_file() {
    let tmp = TempDir::new().unwrap();
    write_schedule(tmp.path(), 2023);
    write_session(tmp.path(), 2023, 1, "R.json", SESSION_JSON.as_bytes());

    let err = FileCacheSource::new(tmp.path())
        .load_session(2023, "Bahrain", SessionKind::Qualifying, LoadOptions::all())
        .unwrap_err();
    assert!(matches!(
        err,
        SourceError::SessionUnavailable { year: 2023, round: 1, .. }
    ));
}

#[test]
fn test_unknown_event() {
    let tmp = TempDir::new().unwrap();
    write_schedule(tmp.path(), 2023);
    let err = FileCacheSource::new(tmp.path())
        .load_session(2023, "Monaco", SessionKind::Race, LoadOptions::all())
        .unwrap_err();
    assert!(matches!(err, SourceError::EventNotFound { .. }));
}

#[test]
fn test_load_options_applied() {
    let tmp = TempDir::new().unwrap();
    write_schedule(tmp.path(), 2023);
    write_session(tmp.path(), 2023, 1, "R.json", SESSION_JSON.as_bytes());

    let session = FileCacheSource::new(tmp.path())
        .load_session(2023, "1", SessionKind::Race, LoadOptions::messages_only())
        .unwrap();
    assert!(session.laps.is_none());
    assert!(session.telemetry.is_empty());
    assert!(session.weather_data.is_none());
}
