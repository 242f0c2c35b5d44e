//! Per-driver race summary aggregated from the lap table

use crate::model::Session;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DriverSummary {
    #[serde(rename = "DriverNumber")]
    pub driver_number: String,
    #[serde(rename = "DriverName")]
    pub driver_name: String,
    #[serde(rename = "Abbreviation")]
    pub abbreviation: String,
    #[serde(rename = "Team")]
    pub team: String,
    #[serde(rename = "TeamColor")]
    pub team_color: String,
    #[serde(rename = "Position")]
    pub position: Option<f64>,
    #[serde(rename = "GridPosition")]
    pub grid_position: Option<f64>,
    #[serde(rename = "Status")]
    pub status: Option<String>,
    #[serde(rename = "Points")]
    pub points: Option<f64>,
    #[serde(rename = "TotalLapsCompleted")]
    pub total_laps_completed: usize,
    #[serde(rename = "FastestLap_seconds")]
    pub fastest_lap_seconds: Option<f64>,
    #[serde(rename = "AverageLap_seconds")]
    pub average_lap_seconds: Option<f64>,
    #[serde(rename = "PitStops")]
    pub pit_stops: usize,
}

/// One summary per driver that completed at least one lap, in session order
pub fn driver_summaries(session: &Session) -> Vec<DriverSummary> {
    session
        .drivers
        .iter()
        .filter_map(|driver| summarize_driver(session, driver))
        .collect()
}

pub fn summarize_driver(session: &Session, driver: &str) -> Option<DriverSummary> {
    let laps = session.driver_laps(driver);
    if laps.is_empty() {
        return None;
    }

    let lap_times: Vec<f64> = laps
        .iter()
        .filter_map(|lap| lap.lap_time)
        .map(|t| t.total_seconds())
        .collect();
    let fastest = lap_times.iter().copied().min_by(f64::total_cmp);
    let average = (!lap_times.is_empty())
        .then(|| lap_times.iter().sum::<f64>() / lap_times.len() as f64);

    let result = session.driver_result(driver);

    Some(DriverSummary {
        driver_number: driver.to_string(),
        driver_name: result
            .map(|r| r.display_name())
            .unwrap_or_else(|| driver.to_string()),
        abbreviation: result
            .and_then(|r| r.abbreviation.clone())
            .unwrap_or_default(),
        team: result.and_then(|r| r.team_name.clone()).unwrap_or_default(),
        team_color: result.and_then(|r| r.team_color.clone()).unwrap_or_default(),
        position: result.and_then(|r| r.position),
        grid_position: result.and_then(|r| r.grid_position),
        status: result.and_then(|r| r.status.clone()),
        points: result.and_then(|r| r.points),
        total_laps_completed: laps.len(),
        fastest_lap_seconds: fastest,
        average_lap_seconds: average,
        pit_stops: laps.iter().filter(|lap| lap.pit_out_time.is_some()).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DriverResult, Lap};
    use crate::units::Timedelta;

    fn lap(driver: &str, lap_time: Option<f64>, pit_out: Option<f64>) -> Lap {
        Lap {
            driver_number: Some(driver.to_string()),
            lap_time: lap_time.map(Timedelta::from_seconds_f64),
            pit_out_time: pit_out.map(Timedelta::from_seconds_f64),
            ..Default::default()
        }
    }

    #[test]
    fn test_summary_aggregates_laps() {
        let session = Session {
            drivers: vec!["16".into(), "55".into(), "2".into()],
            laps: Some(vec![
                lap("16", None, Some(3600.0)),
                lap("16", Some(95.0), None),
                lap("16", Some(93.0), None),
                lap("16", Some(100.0), Some(3900.0)),
                lap("55", None, None),
            ]),
            results: Some(vec![DriverResult {
                driver_number: "16".into(),
                first_name: Some("Charles".into()),
                last_name: Some("Leclerc".into()),
                abbreviation: Some("LEC".into()),
                team_name: Some("Ferrari".into()),
                points: Some(18.0),
                ..Default::default()
            }]),
            ..Default::default()
        };

        let summaries = driver_summaries(&session);
        assert_eq!(summaries.len(), 2, "driver 2 has no laps");

        let lec = &summaries[0];
        assert_eq!(lec.driver_name, "Charles Leclerc");
        assert_eq!(lec.abbreviation, "LEC");
        assert_eq!(lec.total_laps_completed, 4);
        assert_eq!(lec.fastest_lap_seconds, Some(93.0));
        assert_eq!(lec.average_lap_seconds, Some(96.0));
        assert_eq!(lec.pit_stops, 2);
        assert_eq!(lec.points, Some(18.0));

        let sai = &summaries[1];
        assert_eq!(sai.driver_name, "55");
        assert_eq!(sai.fastest_lap_seconds, None);
        assert_eq!(sai.average_lap_seconds, None);
        assert_eq!(sai.team, "");
    }
}
