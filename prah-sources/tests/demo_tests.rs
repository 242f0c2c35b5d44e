//! Integration tests for the DemoSource

use prah_core::normalize::normalize_session;
use prah_core::{LoadOptions, SessionKind, SessionSource, SourceError};
use prah_sources::DemoSource;

fn race() -> prah_core::Session {
    DemoSource::new()
        .load_session(2024, "1", SessionKind::Race, LoadOptions::all())
        .expect("demo race should load")
}

#[test]
fn test_demo_source_name() {
    assert_eq!(DemoSource::new().name(), "Demo");
}

#[test]
fn test_demo_schedule_is_in_round_order() {
    let events = DemoSource::new().event_schedule(2024).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].round_number, 1);
    assert_eq!(events[0].event_name, "Demo Grand Prix");
    assert_eq!(events[1].round_number, 2);
}

#[test]
fn test_demo_event_lookup_by_name() {
    let source = DemoSource::new();
    let event = source.find_event(2024, "sample").unwrap();
    assert_eq!(event.round_number, 2);

    let err = source.find_event(2024, "Monaco").unwrap_err();
    assert!(matches!(err, SourceError::EventNotFound { .. }));
}

#[test]
fn test_demo_only_race_is_available() {
    let err = DemoSource::new()
        .load_session(2024, "1", SessionKind::Qualifying, LoadOptions::all())
        .unwrap_err();
    assert!(matches!(err, SourceError::SessionUnavailable { round: 1, .. }));
}

#[test]
fn test_demo_session_has_every_table() {
    let session = race();
    assert_eq!(session.year, 2024);
    assert_eq!(session.drivers.len(), 4);
    assert_eq!(session.total_laps(), 5);
    assert!(session.t0_date.is_some());
    assert!(session.results.as_ref().is_some_and(|r| r.len() == 4));
    assert!(session.track_status.as_ref().is_some_and(|t| !t.is_empty()));
    assert!(session.race_control_messages.as_ref().is_some_and(|m| !m.is_empty()));
    assert!(session.weather_data.as_ref().is_some_and(|w| !w.is_empty()));
    assert!(session.team_radio.as_ref().is_some_and(|r| r.len() == 2));
    assert!(session.circuit_info.as_ref().is_some_and(|c| c.corners.len() == 4));
}

#[test]
fn test_demo_non_starter_has_no_laps() {
    let session = race();
    assert!(session.driver_laps("2").is_empty());
    assert!(!session.telemetry.contains_key("2"));
    assert_eq!(session.driver_laps("1").len(), 5);
}

#[test]
fn test_demo_telemetry_starts_before_first_lap() {
    let session = race();
    let first_lap = session.driver_laps("1")[0]
        .lap_start_time
        .expect("lap 1 has a start time")
        .total_seconds();
    let first_sample = session.telemetry["1"][0].time.total_seconds();
    assert!(first_sample < first_lap);
}

#[test]
fn test_demo_pit_stop_changes_compound() {
    let session = race();
    let laps = session.driver_laps("16");
    assert_eq!(laps[1].compound.as_deref(), Some("SOFT"));
    assert!(laps[1].pit_in_time.is_some());
    assert_eq!(laps[2].compound.as_deref(), Some("HARD"));
    assert!(laps[2].pit_out_time.is_some());
}

#[test]
fn test_demo_is_deterministic() {
    let a = race();
    let b = race();
    assert_eq!(a.telemetry, b.telemetry);
}

#[test]
fn test_demo_load_options_drop_tables() {
    let session = DemoSource::new()
        .load_session(2024, "1", SessionKind::Race, LoadOptions::messages_only())
        .unwrap();
    assert!(session.laps.is_none());
    assert!(session.telemetry.is_empty());
    assert!(session.weather_data.is_none());
    assert!(session.team_radio.is_some());
}

#[test]
fn test_demo_session_normalizes_three_drivers() {
    let series = normalize_session(&race());
    let drivers: Vec<_> = series.iter().map(|s| s.driver.as_str()).collect();
    assert_eq!(drivers, vec!["1", "16", "44"]);

    // The dropout of driver 44 is bridged on the one second grid
    let ham = &series[2];
    for pair in ham.points.windows(2) {
        assert!((pair[1].time - pair[0].time - 1.0).abs() < 1e-9);
    }
}
