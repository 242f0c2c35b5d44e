//! Telemetry normalizer
//!
//! Converts one driver's irregular telemetry into a 1 Hz series:
//!
//! 1. samples and lap markers are sorted by session time
//! 2. each sample picks up the lap number and compound of the latest lap
//!    that started at or before it (as-of join)
//! 3. samples are binned into 1-second slots counted from the driver's first
//!    sample, keeping the first observed value per field
//! 4. continuous channels are linearly interpolated across empty slots
//! 5. categorical channels are forward-filled
//!
//! Shifting onto the session-wide time base happens afterwards, once every
//! driver has been processed (see [`time_base`]).

use crate::error::NormalizeError;
use crate::model::{Lap, Sample, Session};
use crate::units::Timedelta;
use serde::Serialize;
use tracing::{debug, info, warn};

/// Upper bound on grid length (48 hours at 1 Hz)
pub const MAX_GRID_SLOTS: i64 = 48 * 3600;

/// Lap context attached to telemetry by the as-of join
#[derive(Debug, Clone, PartialEq)]
pub struct LapMarker {
    pub start: Timedelta,
    pub lap_number: Option<u32>,
    pub compound: Option<String>,
}

impl LapMarker {
    /// Markers for every lap with a known start time, ordered by start
    pub fn from_laps<'a>(laps: impl IntoIterator<Item = &'a Lap>) -> Vec<LapMarker> {
        let mut markers: Vec<LapMarker> = laps
            .into_iter()
            .filter_map(|lap| {
                Some(LapMarker {
                    start: lap.lap_start_time?,
                    lap_number: lap.lap_number,
                    compound: lap.compound.clone(),
                })
            })
            .collect();
        markers.sort_by_key(|m| m.start);
        markers
    }
}

/// One slot of the resampled series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPoint {
    /// Seconds; session time until shifted onto the global time base
    #[serde(rename = "Time")]
    pub time: f64,
    #[serde(rename = "X")]
    pub x: Option<f64>,
    #[serde(rename = "Y")]
    pub y: Option<f64>,
    #[serde(rename = "Speed")]
    pub speed: Option<f64>,
    #[serde(rename = "Compound")]
    pub compound: Option<String>,
    #[serde(rename = "LapNumber")]
    pub lap_number: Option<u32>,
    #[serde(rename = "Distance")]
    pub distance: Option<f64>,
    #[serde(rename = "Throttle")]
    pub throttle: Option<f64>,
    #[serde(rename = "Brake")]
    pub brake: Option<f64>,
    #[serde(rename = "nGear")]
    pub gear: Option<i32>,
    #[serde(rename = "RPM")]
    pub rpm: Option<f64>,
    #[serde(rename = "DRS")]
    pub drs: Option<i32>,
    #[serde(rename = "Driver")]
    pub driver: String,
}

/// Normalized series of one driver
#[derive(Debug, Clone, PartialEq)]
pub struct DriverSeries {
    pub driver: String,
    pub points: Vec<NormalizedPoint>,
}

impl DriverSeries {
    /// Earliest grid timestamp; points are ordered so this is the first one
    pub fn start(&self) -> Option<f64> {
        self.points.first().map(|p| p.time)
    }

    pub fn shift(&mut self, offset: f64) {
        for point in &mut self.points {
            point.time -= offset;
        }
    }
}

/// Channels that vary smoothly and may be interpolated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Channel {
    X,
    Y,
    Speed,
    Distance,
    Throttle,
    Brake,
    Rpm,
}

const CHANNEL_COUNT: usize = 7;

const CONTINUOUS: [Channel; CHANNEL_COUNT] = [
    Channel::X,
    Channel::Y,
    Channel::Speed,
    Channel::Distance,
    Channel::Throttle,
    Channel::Brake,
    Channel::Rpm,
];

impl Channel {
    fn read(self, sample: &Sample) -> Option<f64> {
        match self {
            Channel::X => sample.x,
            Channel::Y => sample.y,
            Channel::Speed => sample.speed,
            Channel::Distance => sample.distance,
            Channel::Throttle => sample.throttle,
            Channel::Brake => sample.brake,
            Channel::Rpm => sample.rpm,
        }
    }
}

/// Column-oriented 1 Hz grid
struct Grid {
    continuous: [Vec<Option<f64>>; CHANNEL_COUNT],
    lap_number: Vec<Option<u32>>,
    compound: Vec<Option<String>>,
    gear: Vec<Option<i32>>,
    drs: Vec<Option<i32>>,
}

impl Grid {
    fn with_len(len: usize) -> Self {
        Self {
            continuous: std::array::from_fn(|_| vec![None; len]),
            lap_number: vec![None; len],
            compound: vec![None; len],
            gear: vec![None; len],
            drs: vec![None; len],
        }
    }

    fn observe(&mut self, slot: usize, sample: &Sample, lap: Option<&LapMarker>) {
        for (column, channel) in self.continuous.iter_mut().zip(CONTINUOUS) {
            keep_first(&mut column[slot], channel.read(sample));
        }
        keep_first(&mut self.gear[slot], sample.gear);
        keep_first(&mut self.drs[slot], sample.drs);
        if let Some(lap) = lap {
            keep_first(&mut self.lap_number[slot], lap.lap_number);
            if self.compound[slot].is_none() {
                self.compound[slot] = lap.compound.clone();
            }
        }
    }

    fn fill_gaps(&mut self) {
        for column in &mut self.continuous {
            interpolate_linear(column);
        }
        forward_fill(&mut self.lap_number);
        forward_fill(&mut self.compound);
        forward_fill(&mut self.gear);
        forward_fill(&mut self.drs);
    }

    fn into_points(self, origin: f64, driver: &str) -> Vec<NormalizedPoint> {
        let [x, y, speed, distance, throttle, brake, rpm] = self.continuous;
        let categorical = self
            .lap_number
            .into_iter()
            .zip(self.compound)
            .zip(self.gear)
            .zip(self.drs);

        categorical
            .enumerate()
            .map(|(i, (((lap_number, compound), gear), drs))| NormalizedPoint {
                time: origin + i as f64,
                x: x[i],
                y: y[i],
                speed: speed[i],
                compound,
                lap_number,
                distance: distance[i],
                throttle: throttle[i],
                brake: brake[i],
                gear,
                rpm: rpm[i],
                drs,
                driver: driver.to_string(),
            })
            .collect()
    }
}

fn keep_first<T>(cell: &mut Option<T>, value: Option<T>) {
    if cell.is_none() {
        *cell = value;
    }
}

/// Slot of `time` on a grid starting at `origin`, `None` on overflow
fn slot_index(origin: Timedelta, time: Timedelta) -> Option<i64> {
    time.0.checked_sub(&origin.0).map(|elapsed| elapsed.num_seconds())
}

/// Resample one driver's telemetry onto a 1 Hz grid
///
/// The grid starts at the exact time of the first sample.
/// Samples before the first lap marker carry no lap number or compound;
/// those slots stay null until the first lap starts.
pub fn normalize_driver(
    driver: &str,
    samples: &[Sample],
    markers: &[LapMarker],
) -> Result<Vec<NormalizedPoint>, NormalizeError> {
    let mut samples: Vec<&Sample> = samples.iter().collect();
    samples.sort_by_key(|s| s.time);
    let mut markers: Vec<&LapMarker> = markers.iter().collect();
    markers.sort_by_key(|m| m.start);

    let (Some(first), Some(last)) = (samples.first(), samples.last()) else {
        return Err(NormalizeError::NoTelemetry {
            driver: driver.to_string(),
        });
    };
    let origin = first.time;
    let slots = slot_index(origin, last.time)
        .map_or(i64::MAX, |last_slot| last_slot.saturating_add(1));
    if slots > MAX_GRID_SLOTS {
        return Err(NormalizeError::GridTooLarge {
            driver: driver.to_string(),
            slots,
            limit: MAX_GRID_SLOTS,
        });
    }

    let mut grid = Grid::with_len(slots as usize);
    let mut upcoming = 0;
    for sample in samples {
        while upcoming < markers.len() && markers[upcoming].start <= sample.time {
            upcoming += 1;
        }
        let lap = upcoming.checked_sub(1).map(|i| markers[i]);
        // sorted input keeps every offset within 0..slots
        let slot = slot_index(origin, sample.time).unwrap_or_default() as usize;
        grid.observe(slot, sample, lap);
    }

    grid.fill_gaps();
    Ok(grid.into_points(origin.total_seconds(), driver))
}

/// Normalize every driver of the session that has laps
///
/// A driver whose telemetry cannot be normalized is logged and left out;
/// the remaining drivers are still processed.
pub fn normalize_session(session: &Session) -> Vec<DriverSeries> {
    info!(
        "Processing {} drivers for {} {}",
        session.drivers.len(),
        session.year,
        session.event.as_ref().map(|e| e.event_name.as_str()).unwrap_or("")
    );

    let mut series = Vec::new();
    for driver in &session.drivers {
        let laps = session.driver_laps(driver);
        if laps.is_empty() {
            debug!("Driver {} has no laps, skipping", driver);
            continue;
        }

        let markers = LapMarker::from_laps(laps);
        let samples = session
            .telemetry
            .get(driver)
            .map(Vec::as_slice)
            .unwrap_or_default();

        match normalize_driver(driver, samples, &markers) {
            Ok(points) => {
                info!("Processed {} - {} points", driver, points.len());
                series.push(DriverSeries {
                    driver: driver.clone(),
                    points,
                });
            }
            Err(e) => warn!("Error processing driver {}: {}", driver, e),
        }
    }

    info!(
        "Finished processing all drivers. Total points: {}",
        series.iter().map(|s| s.points.len()).sum::<usize>()
    );
    series
}

/// Session-wide zero point: the earliest grid timestamp of any driver
pub fn time_base(series: &[DriverSeries]) -> Option<f64> {
    series
        .iter()
        .filter_map(DriverSeries::start)
        .min_by(f64::total_cmp)
}

/// Fill interior gaps linearly and extend the edge values outwards
///
/// A column with no observed value is left untouched.
pub fn interpolate_linear(values: &mut [Option<f64>]) {
    let known: Vec<(usize, f64)> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|v| (i, v)))
        .collect();

    let (Some(&(head, head_value)), Some(&(tail, tail_value))) = (known.first(), known.last())
    else {
        return;
    };

    for v in &mut values[..head] {
        *v = Some(head_value);
    }
    for v in &mut values[tail + 1..] {
        *v = Some(tail_value);
    }

    for pair in known.windows(2) {
        let ((a, va), (b, vb)) = (pair[0], pair[1]);
        let span = (b - a) as f64;
        for (offset, v) in values[a + 1..b].iter_mut().enumerate() {
            let t = (offset + 1) as f64 / span;
            *v = Some(va + (vb - va) * t);
        }
    }
}

/// Carry the last observed value forward; leading gaps stay empty
pub fn forward_fill<T: Clone>(values: &mut [Option<T>]) {
    let mut last: Option<T> = None;
    for v in values.iter_mut() {
        match v.as_ref() {
            Some(current) => last = Some(current.clone()),
            None => *v = last.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(t: f64, speed: f64) -> Sample {
        Sample {
            time: Timedelta::from_seconds_f64(t),
            x: Some(speed * 10.0),
            y: Some(-speed),
            speed: Some(speed),
            throttle: Some(100.0),
            brake: Some(0.0),
            gear: Some(7),
            rpm: Some(11000.0),
            drs: Some(0),
            distance: Some(t * 80.0),
        }
    }

    fn marker(start: f64, lap: u32, compound: &str) -> LapMarker {
        LapMarker {
            start: Timedelta::from_seconds_f64(start),
            lap_number: Some(lap),
            compound: Some(compound.to_string()),
        }
    }

    fn series(driver: &str, start: f64, end: f64) -> DriverSeries {
        let samples: Vec<Sample> = [start, end].iter().map(|&t| sample(t, 200.0)).collect();
        DriverSeries {
            driver: driver.to_string(),
            points: normalize_driver(driver, &samples, &[]).unwrap(),
        }
    }

    #[test]
    fn test_grid_is_one_second_and_gap_free() {
        // Irregular rate with a 5 s hole in the middle
        let times = [10.1, 10.4, 10.9, 11.3, 12.8, 18.2, 18.7, 19.05];
        let samples: Vec<Sample> = times
            .iter()
            .enumerate()
            .map(|(i, &t)| sample(t, 100.0 + i as f64))
            .collect();

        let points = normalize_driver("44", &samples, &[marker(9.0, 1, "SOFT")]).unwrap();

        assert_eq!(points.len(), 9);
        for pair in points.windows(2) {
            assert!((pair[1].time - pair[0].time - 1.0).abs() < 1e-9);
        }
        assert!((points[0].time - 10.1).abs() < 1e-9);
        assert!(points
            .iter()
            .all(|p| p.speed.is_some() && p.x.is_some() && p.distance.is_some()));
    }

    #[test]
    fn test_slot_keeps_first_sample() {
        let samples = vec![sample(5.2, 150.0), sample(5.8, 160.0), sample(6.3, 170.0)];
        let points = normalize_driver("1", &samples, &[]).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].speed, Some(150.0));
        assert_eq!(points[1].speed, Some(170.0));
    }

    #[test]
    fn test_grid_starts_at_first_sample_time() {
        let samples = vec![sample(10.3, 100.0), sample(10.9, 110.0), sample(12.5, 140.0)];
        let points = normalize_driver("81", &samples, &[]).unwrap();

        let times: Vec<f64> = points.iter().map(|p| p.time).collect();
        assert_eq!(times.len(), 3);
        for (time, expected) in times.iter().zip([10.3, 11.3, 12.3]) {
            assert!((time - expected).abs() < 1e-9, "{} != {}", time, expected);
        }
        // 10.9 shares the first slot, 12.5 lands in the third
        assert_eq!(points[0].speed, Some(100.0));
        assert_eq!(points[1].speed, Some(120.0));
        assert_eq!(points[2].speed, Some(140.0));
    }

    #[test]
    fn test_unsorted_input_is_sorted_first() {
        let samples = vec![sample(7.5, 170.0), sample(5.2, 150.0), sample(5.8, 160.0)];
        let points = normalize_driver("1", &samples, &[]).unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].speed, Some(150.0));
        // the middle slot is interpolated between 150 and 170
        assert_eq!(points[1].speed, Some(160.0));
        assert_eq!(points[2].speed, Some(170.0));
    }

    #[test]
    fn test_interpolation_is_linear_inside_and_flat_at_edges() {
        let mut values = vec![None, Some(10.0), None, None, Some(40.0), None];
        interpolate_linear(&mut values);
        assert_eq!(
            values,
            vec![Some(10.0), Some(10.0), Some(20.0), Some(30.0), Some(40.0), Some(40.0)]
        );

        let mut empty: Vec<Option<f64>> = vec![None, None];
        interpolate_linear(&mut empty);
        assert_eq!(empty, vec![None, None]);
    }

    #[test]
    fn test_forward_fill_leaves_leading_gap() {
        let mut values = vec![None, Some(3), None, Some(4), None];
        forward_fill(&mut values);
        assert_eq!(values, vec![None, Some(3), Some(3), Some(4), Some(4)]);
    }

    #[test]
    fn test_as_of_join_attaches_latest_lap() {
        let samples: Vec<Sample> = (0..12).map(|i| sample(i as f64 + 0.5, 200.0)).collect();
        let markers = vec![marker(8.0, 2, "HARD"), marker(3.0, 1, "MEDIUM")];

        let points = normalize_driver("16", &samples, &markers).unwrap();

        // Before the first lap start there is no lap context
        assert!(points[..3].iter().all(|p| p.lap_number.is_none() && p.compound.is_none()));
        assert!(points[3..8].iter().all(|p| p.lap_number == Some(1)));
        assert!(points[3..8].iter().all(|p| p.compound.as_deref() == Some("MEDIUM")));
        assert!(points[8..].iter().all(|p| p.lap_number == Some(2)));
        assert!(points[8..].iter().all(|p| p.compound.as_deref() == Some("HARD")));
    }

    #[test]
    fn test_marker_exactly_at_sample_time_applies() {
        let samples = vec![sample(3.0, 200.0)];
        let points = normalize_driver("16", &samples, &[marker(3.0, 1, "SOFT")]).unwrap();
        assert_eq!(points[0].lap_number, Some(1));
    }

    #[test]
    fn test_categorical_fields_only_take_observed_values() {
        let mut a = sample(0.2, 100.0);
        a.gear = Some(3);
        a.drs = Some(0);
        let mut b = sample(6.4, 300.0);
        b.gear = Some(8);
        b.drs = Some(12);

        let points = normalize_driver("4", &[a, b], &[]).unwrap();

        assert_eq!(points.len(), 7);
        assert!(points[..6].iter().all(|p| p.gear == Some(3) && p.drs == Some(0)));
        assert_eq!(points[6].gear, Some(8));
        assert_eq!(points[6].drs, Some(12));
        // the continuous channel in between is interpolated
        assert_eq!(points[3].speed, Some(200.0));
    }

    #[test]
    fn test_missing_channel_stays_null() {
        let mut a = sample(0.0, 100.0);
        let mut b = sample(3.0, 120.0);
        a.rpm = None;
        b.rpm = None;
        let points = normalize_driver("10", &[a, b], &[]).unwrap();
        assert!(points.iter().all(|p| p.rpm.is_none()));
        let json = serde_json::to_value(&points[1]).unwrap();
        assert!(json["RPM"].is_null());
        assert_eq!(json["Driver"], "10");
    }

    #[test]
    fn test_no_samples_is_an_error() {
        let err = normalize_driver("2", &[], &[]).unwrap_err();
        assert_eq!(
            err,
            NormalizeError::NoTelemetry {
                driver: "2".into()
            }
        );
    }

    #[test]
    fn test_absurd_span_is_rejected() {
        let samples = vec![sample(0.0, 1.0), sample(1e9, 1.0)];
        assert!(matches!(
            normalize_driver("2", &samples, &[]),
            Err(NormalizeError::GridTooLarge { .. })
        ));
    }

    #[test]
    fn test_time_base_already_zero_leaves_spans() {
        let mut all = vec![series("1", 0.0, 100.0), series("2", 5.0, 120.0)];
        let base = time_base(&all).unwrap();
        assert_eq!(base, 0.0);
        all.iter_mut().for_each(|s| s.shift(base));
        assert_eq!(all[0].start(), Some(0.0));
        assert_eq!(all[0].points.last().unwrap().time, 100.0);
        assert_eq!(all[1].start(), Some(5.0));
        assert_eq!(all[1].points.last().unwrap().time, 120.0);
    }

    #[test]
    fn test_time_base_shifts_to_zero() {
        let mut all = vec![series("1", 10.0, 100.0), series("2", 20.0, 120.0)];
        let base = time_base(&all).unwrap();
        assert_eq!(base, 10.0);
        all.iter_mut().for_each(|s| s.shift(base));
        assert_eq!(all[0].start(), Some(0.0));
        assert_eq!(all[0].points.last().unwrap().time, 90.0);
        assert_eq!(all[1].start(), Some(10.0));
        assert_eq!(all[1].points.last().unwrap().time, 110.0);
    }

    #[test]
    fn test_time_base_empty() {
        assert_eq!(time_base(&[]), None);
    }

    #[test]
    fn test_session_skips_driver_without_laps_and_isolates_failures() {
        let lap = |driver: &str| Lap {
            driver_number: Some(driver.to_string()),
            lap_number: Some(1),
            lap_start_time: Some(Timedelta::from_seconds_f64(1.0)),
            ..Default::default()
        };
        let mut session = Session {
            drivers: vec!["1".into(), "2".into(), "3".into()],
            // driver 2 has no laps; driver 3 has laps but no telemetry
            laps: Some(vec![lap("1"), lap("3")]),
            ..Default::default()
        };
        session
            .telemetry
            .insert("1".into(), vec![sample(0.5, 100.0), sample(4.5, 110.0)]);
        session.telemetry.insert("2".into(), vec![sample(0.5, 100.0)]);

        let out = normalize_session(&session);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].driver, "1");
        assert_eq!(out[0].points.len(), 5);
    }
}
