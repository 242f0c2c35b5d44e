//! Demo source that synthesizes a complete race session
//!
//! Simulates a short race around an oval-ish circuit with straights, braking
//! zones, corners and acceleration phases. Telemetry is sampled at irregular
//! intervals like the real feed, one driver has a telemetry dropout and one
//! driver never starts, so every gap-filling path gets exercised.
//!
//! Everything is derived from deterministic noise: two loads of the same
//! session are identical.

use chrono::{Duration, NaiveDate};
use prah_core::model::{
    CircuitInfo, Corner, DriverResult, EventInfo, Lap, RaceControlMessage, Sample, Session,
    TeamRadio, TrackStatus, WeatherSample,
};
use prah_core::units::{SessionClock, Timedelta};
use prah_core::{LoadOptions, SessionKind, SessionSource, SourceError};
use std::collections::BTreeMap;
use std::f64::consts::TAU;
use tracing::info;

/// Session time at which the race starts; earlier samples are on the grid
const RACE_START: f64 = 62.0;
const RACE_LAPS: u32 = 5;
const LAP_LENGTH_M: f64 = 4_200.0;
const PIT_LOSS: f64 = 21.5;
const PIT_LAP: u32 = 2;

// =============================================================================
// Track definition: a sequence of segments that form a lap
// =============================================================================

#[derive(Clone, Copy)]
enum SegmentKind {
    Straight,
    Braking,
    Corner,
    Accel,
}

#[derive(Clone, Copy)]
struct TrackSegment {
    kind: SegmentKind,
    duration: f64,     // seconds at reference pace
    target_speed: f64, // km/h at end of segment
}

fn demo_track() -> Vec<TrackSegment> {
    use SegmentKind::*;
    let seg = |kind, duration, target_speed| TrackSegment {
        kind,
        duration,
        target_speed,
    };
    vec![
        seg(Straight, 12.0, 318.0),
        seg(Braking, 2.5, 95.0),
        seg(Corner, 4.0, 88.0),
        seg(Accel, 5.0, 240.0),
        seg(Straight, 9.0, 301.0),
        seg(Braking, 2.0, 160.0),
        seg(Corner, 5.5, 172.0),
        seg(Accel, 4.0, 262.0),
        seg(Straight, 14.0, 325.0),
        seg(Braking, 3.0, 70.0),
        seg(Corner, 4.5, 66.0),
        seg(Accel, 5.5, 230.0),
        seg(Straight, 8.0, 296.0),
        seg(Braking, 2.0, 135.0),
        seg(Corner, 3.0, 128.0),
        seg(Accel, 4.0, 318.0),
    ]
}

struct LapState {
    speed: f64,
    throttle: f64,
    braking: bool,
    straight: bool,
}

fn compute_lap_state(track: &[TrackSegment], fraction: f64) -> LapState {
    let lap_duration: f64 = track.iter().map(|s| s.duration).sum();
    let t = fraction.clamp(0.0, 1.0) * lap_duration;

    let mut elapsed = 0.0;
    let mut seg_idx = track.len() - 1;
    for (i, seg) in track.iter().enumerate() {
        if elapsed + seg.duration > t {
            seg_idx = i;
            break;
        }
        elapsed += seg.duration;
    }

    let seg = track[seg_idx];
    let seg_t = ((t - elapsed) / seg.duration).clamp(0.0, 1.0);
    let prev_speed = track[(seg_idx + track.len() - 1) % track.len()].target_speed;
    let smooth_t = smoothstep(seg_t);

    let throttle = match seg.kind {
        SegmentKind::Straight => 100.0,
        SegmentKind::Braking => 0.0,
        SegmentKind::Corner => 20.0 + 30.0 * seg_t,
        SegmentKind::Accel => 50.0 + 50.0 * smooth_t,
    };

    LapState {
        speed: lerp(prev_speed, seg.target_speed, smooth_t),
        throttle,
        braking: matches!(seg.kind, SegmentKind::Braking),
        straight: matches!(seg.kind, SegmentKind::Straight),
    }
}

fn smoothstep(t: f64) -> f64 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn speed_to_gear(kph: f64) -> i32 {
    match kph {
        x if x < 1.0 => 0,
        x if x < 90.0 => 2,
        x if x < 130.0 => 3,
        x if x < 165.0 => 4,
        x if x < 200.0 => 5,
        x if x < 240.0 => 6,
        x if x < 280.0 => 7,
        _ => 8,
    }
}

fn speed_to_rpm(kph: f64, gear: i32) -> f64 {
    if gear == 0 {
        return 4_000.0;
    }
    let ratio = [0.0, 0.0, 120.0, 88.0, 70.0, 58.0, 49.0, 43.0, 38.5][gear as usize];
    (kph * ratio).clamp(6_000.0, 12_200.0)
}

/// Simple deterministic noise from a seed
fn noise(seed: f64) -> f64 {
    let x = (seed * 12.9898 + 78.233).sin() * 43_758.547;
    x - x.floor()
}

/// Small jitter centered around 0
fn jitter(seed: f64, amplitude: f64) -> f64 {
    (noise(seed) - 0.5) * 2.0 * amplitude
}

fn track_xy(fraction: f64) -> (f64, f64) {
    let angle = fraction * TAU;
    (4_000.0 * angle.cos(), 2_500.0 * angle.sin())
}

// =============================================================================
// Grid
// =============================================================================

struct DemoDriver {
    number: &'static str,
    abbreviation: &'static str,
    first_name: &'static str,
    last_name: &'static str,
    team: &'static str,
    color: &'static str,
    /// Seconds slower than the reference lap
    pace: f64,
    starts: bool,
    /// Window of session time without telemetry
    dropout: Option<(f64, f64)>,
}

static DRIVERS: [DemoDriver; 4] = [
    DemoDriver {
        number: "1",
        abbreviation: "VER",
        first_name: "Max",
        last_name: "Verstappen",
        team: "Red Bull Racing",
        color: "3671C6",
        pace: 0.0,
        starts: true,
        dropout: None,
    },
    DemoDriver {
        number: "16",
        abbreviation: "LEC",
        first_name: "Charles",
        last_name: "Leclerc",
        team: "Ferrari",
        color: "E8002D",
        pace: 0.45,
        starts: true,
        dropout: None,
    },
    DemoDriver {
        number: "44",
        abbreviation: "HAM",
        first_name: "Lewis",
        last_name: "Hamilton",
        team: "Mercedes",
        color: "27F4D2",
        pace: 0.8,
        starts: true,
        dropout: Some((250.0, 258.5)),
    },
    DemoDriver {
        number: "2",
        abbreviation: "SAR",
        first_name: "Logan",
        last_name: "Sargeant",
        team: "Williams",
        color: "64C4FF",
        pace: 1.5,
        starts: false,
        dropout: None,
    },
];

/// Lap times of one driver, including the standing start and the pit stop
fn lap_times(driver: &DemoDriver, reference: f64, seed: f64) -> Vec<f64> {
    (1..=RACE_LAPS)
        .map(|lap| {
            let mut time = reference + driver.pace + jitter(seed + f64::from(lap), 0.35);
            if lap == 1 {
                time += 3.2;
            }
            if lap == PIT_LAP + 1 {
                time += PIT_LOSS;
            }
            time
        })
        .collect()
}

// =============================================================================
// DemoSource
// =============================================================================

pub struct DemoSource {
    track: Vec<TrackSegment>,
    reference_lap: f64,
}

impl DemoSource {
    pub fn new() -> Self {
        let track = demo_track();
        let reference_lap = track.iter().map(|s| s.duration).sum();
        Self {
            track,
            reference_lap,
        }
    }

    fn schedule(&self, year: i32) -> Vec<EventInfo> {
        let event = |round: u32, name: &str, location: &str, country: &str, month: u32| EventInfo {
            round_number: round,
            country: country.to_string(),
            location: location.to_string(),
            event_name: format!("{} Grand Prix", name),
            official_event_name: format!("FORMULA 1 {} GRAND PRIX {}", name.to_uppercase(), year),
            event_date: Some(format!("{}-{:02}-10 00:00:00", year, month)),
            event_format: Some("conventional".to_string()),
            f1_api_support: Some(true),
        };
        vec![
            event(1, "Demo", "Demo Park", "Nowhere", 3),
            event(2, "Sample", "Sample Bay", "Elsewhere", 4),
        ]
    }

    fn build_session(&self, year: i32, event: EventInfo) -> Session {
        let seed = f64::from(year) + f64::from(event.round_number) * 100.0;
        let t0 = NaiveDate::from_ymd_opt(year, 3, 10)
            .and_then(|d| d.and_hms_opt(14, 0, 0))
            .unwrap_or_default();

        let mut laps = Vec::new();
        let mut telemetry = BTreeMap::new();
        let mut finish_times = Vec::new();

        for (idx, driver) in DRIVERS.iter().enumerate() {
            if !driver.starts {
                continue;
            }
            let times = lap_times(driver, self.reference_lap, seed + idx as f64 * 10.0);
            let mut start = RACE_START;
            let mut lap_starts = Vec::new();
            for (i, &lap_time) in times.iter().enumerate() {
                let lap_number = i as u32 + 1;
                let compound = if lap_number <= PIT_LAP { "SOFT" } else { "HARD" };
                let stint = if lap_number <= PIT_LAP { 1 } else { 2 };
                let sector = lap_time / 3.0;
                laps.push(Lap {
                    driver: Some(driver.abbreviation.to_string()),
                    driver_number: Some(driver.number.to_string()),
                    lap_number: Some(lap_number),
                    stint: Some(stint),
                    compound: Some(compound.to_string()),
                    tyre_life: Some(f64::from(if stint == 1 {
                        lap_number
                    } else {
                        lap_number - PIT_LAP
                    })),
                    position: None,
                    time: Some(secs(start + lap_time)),
                    lap_time: Some(secs(lap_time)),
                    lap_start_time: Some(secs(start)),
                    pit_in_time: (lap_number == PIT_LAP).then(|| secs(start + lap_time - 4.0)),
                    pit_out_time: (lap_number == PIT_LAP + 1).then(|| secs(start + 18.0)),
                    sector1_time: Some(secs(sector)),
                    sector2_time: Some(secs(sector)),
                    sector3_time: Some(secs(lap_time - 2.0 * sector)),
                    sector1_session_time: Some(secs(start + sector)),
                    sector2_session_time: Some(secs(start + 2.0 * sector)),
                    sector3_session_time: Some(secs(start + lap_time)),
                });
                lap_starts.push((start, lap_time));
                start += lap_time;
            }
            finish_times.push((driver, start));
            telemetry.insert(
                driver.number.to_string(),
                self.driver_samples(driver, &lap_starts, seed + idx as f64),
            );
        }

        finish_times.sort_by(|a, b| a.1.total_cmp(&b.1));
        let race_end = finish_times.last().map(|(_, t)| *t).unwrap_or(RACE_START);
        let results = DRIVERS
            .iter()
            .enumerate()
            .map(|(grid, driver)| {
                let position = finish_times
                    .iter()
                    .position(|(d, _)| d.number == driver.number)
                    .map(|p| p as f64 + 1.0);
                DriverResult {
                    driver_number: driver.number.to_string(),
                    broadcast_name: Some(format!(
                        "{} {}",
                        &driver.first_name[..1],
                        driver.last_name.to_uppercase()
                    )),
                    abbreviation: Some(driver.abbreviation.to_string()),
                    team_name: Some(driver.team.to_string()),
                    team_color: Some(driver.color.to_string()),
                    first_name: Some(driver.first_name.to_string()),
                    last_name: Some(driver.last_name.to_string()),
                    full_name: Some(format!("{} {}", driver.first_name, driver.last_name)),
                    headshot_url: None,
                    country_code: None,
                    position,
                    classified_position: Some(
                        position
                            .map(|p| p.to_string())
                            .unwrap_or_else(|| "W".to_string()),
                    ),
                    grid_position: driver.starts.then_some(grid as f64 + 1.0),
                    time: None,
                    status: Some(
                        if driver.starts {
                            "Finished"
                        } else {
                            "Did not start"
                        }
                        .to_string(),
                    ),
                    points: Some(match position.map(|p| p as u32) {
                        Some(1) => 25.0,
                        Some(2) => 18.0,
                        Some(3) => 15.0,
                        _ => 0.0,
                    }),
                }
            })
            .collect();

        let sc_at = RACE_START + 2.4 * self.reference_lap;
        let wall = |t: f64| SessionClock::Wall(t0 + Duration::milliseconds((t * 1000.0) as i64));
        let race_control =
            |t: f64, category: &str, message: &str, flag: Option<&str>| RaceControlMessage {
                time: Some(wall(t)),
                category: Some(category.to_string()),
                message: Some(message.to_string()),
                status: None,
                flag: flag.map(str::to_string),
                scope: flag.map(|_| "Track".to_string()),
                sector: None,
                racing_number: None,
                lap: None,
            };

        let session = Session {
            year,
            name: SessionKind::Race.display_name().to_string(),
            event: Some(event),
            drivers: DRIVERS.iter().map(|d| d.number.to_string()).collect(),
            total_laps: Some(RACE_LAPS),
            t0_date: Some(t0),
            results: Some(results),
            laps: Some(laps),
            telemetry,
            track_status: Some(vec![
                track_status(RACE_START - 10.0, "1", "AllClear"),
                track_status(sc_at, "4", "SCDeployed"),
                track_status(sc_at + 45.0, "1", "AllClear"),
            ]),
            race_control_messages: Some(vec![
                race_control(
                    RACE_START - 30.0,
                    "Flag",
                    "GREEN LIGHT - PIT EXIT OPEN",
                    Some("GREEN"),
                ),
                race_control(sc_at, "SafetyCar", "SAFETY CAR DEPLOYED", None),
                race_control(sc_at + 45.0, "SafetyCar", "SAFETY CAR IN THIS LAP", None),
                race_control(race_end, "Flag", "CHEQUERED FLAG", Some("CHEQUERED")),
            ]),
            weather_data: Some(
                (0u32..)
                    .map(|minute| f64::from(minute) * 60.0)
                    .take_while(|t| *t <= race_end)
                    .map(|t| WeatherSample {
                        time: secs(t),
                        air_temp: Some(27.0 + jitter(seed + t, 0.4)),
                        humidity: Some(46.0 + jitter(seed * 2.0 + t, 2.0)),
                        pressure: Some(1012.0),
                        rainfall: Some(false),
                        track_temp: Some(36.0 - t / 600.0),
                        wind_direction: Some(140.0 + jitter(seed * 3.0 + t, 20.0).round()),
                        wind_speed: Some(1.5 + jitter(seed * 4.0 + t, 0.5)),
                    })
                    .collect(),
            ),
            team_radio: Some(vec![
                TeamRadio {
                    time: Some(secs(sc_at + 5.0)),
                    driver: Some("1".to_string()),
                    message: Some(
                        "Safety car, safety car. Box this lap is not an option.".to_string(),
                    ),
                },
                TeamRadio {
                    time: Some(secs(race_end + 10.0)),
                    driver: Some("16".to_string()),
                    message: Some("Good job, P2.".to_string()),
                },
            ]),
            circuit_info: Some(CircuitInfo {
                rotation: Some(92.0),
                corners: [0.12, 0.3, 0.52, 0.81]
                    .iter()
                    .enumerate()
                    .map(|(i, &f)| {
                        let (x, y) = track_xy(f);
                        Corner {
                            number: i as u32 + 1,
                            letter: None,
                            x,
                            y,
                            angle: Some((f * 360.0).round()),
                            distance: Some(f * LAP_LENGTH_M),
                        }
                    })
                    .collect(),
            }),
        };

        info!(
            "Generated demo session {} round {} ({} laps, {} drivers)",
            year,
            session.event.as_ref().map(|e| e.round_number).unwrap_or(0),
            session.laps.as_ref().map(Vec::len).unwrap_or(0),
            session.drivers.len()
        );
        session
    }

    fn driver_samples(
        &self,
        driver: &DemoDriver,
        lap_starts: &[(f64, f64)],
        seed: f64,
    ) -> Vec<Sample> {
        let race_end = lap_starts.last().map(|(s, l)| s + l).unwrap_or(RACE_START);
        let mut samples = Vec::new();
        let mut t = RACE_START - 6.0 + noise(seed) * 0.5;
        let mut n = 0.0;

        while t < race_end {
            n += 1.0;
            let in_dropout = driver
                .dropout
                .map(|(from, to)| t >= from && t < to)
                .unwrap_or(false);

            if !in_dropout {
                samples.push(self.sample_at(t, lap_starts, seed + n));
            }
            // Irregular 3-5 Hz feed
            t += 0.2 + noise(seed * 0.37 + n) * 0.13;
        }
        samples
    }

    fn sample_at(&self, t: f64, lap_starts: &[(f64, f64)], seed: f64) -> Sample {
        let current = lap_starts
            .iter()
            .enumerate()
            .rev()
            .find(|(_, (start, _))| *start <= t);

        let Some((lap_idx, &(start, lap_time))) = current else {
            // Still on the grid
            let (x, y) = track_xy(-0.01);
            return Sample {
                time: secs(t),
                x: Some(x),
                y: Some(y),
                speed: Some(0.0),
                throttle: Some(0.0),
                brake: Some(1.0),
                gear: Some(0),
                rpm: Some(speed_to_rpm(0.0, 0)),
                drs: Some(0),
                distance: Some(0.0),
            };
        };

        let fraction = ((t - start) / lap_time).clamp(0.0, 1.0);
        let state = compute_lap_state(&self.track, fraction);
        let speed = (state.speed + jitter(seed, 1.5)).max(0.0);
        let gear = speed_to_gear(speed);
        let (x, y) = track_xy(fraction);
        let drs_open = state.straight && lap_idx > 0 && speed > 280.0;

        Sample {
            time: secs(t),
            x: Some(x + jitter(seed * 1.1, 2.0)),
            y: Some(y + jitter(seed * 1.2, 2.0)),
            speed: Some(speed),
            throttle: Some((state.throttle + jitter(seed * 1.3, 2.0)).clamp(0.0, 100.0)),
            brake: Some(if state.braking { 1.0 } else { 0.0 }),
            gear: Some(gear),
            rpm: Some(speed_to_rpm(speed, gear) + jitter(seed * 1.4, 40.0)),
            drs: Some(if drs_open { 12 } else { 0 }),
            distance: Some((lap_idx as f64 + fraction) * LAP_LENGTH_M),
        }
    }
}

impl Default for DemoSource {
    fn default() -> Self {
        Self::new()
    }
}

fn secs(t: f64) -> Timedelta {
    Timedelta::from_seconds_f64(t)
}

fn track_status(t: f64, status: &str, message: &str) -> TrackStatus {
    TrackStatus {
        time: secs(t),
        status: Some(status.to_string()),
        message: Some(message.to_string()),
    }
}

impl SessionSource for DemoSource {
    fn name(&self) -> &str {
        "Demo"
    }

    fn event_schedule(&self, year: i32) -> Result<Vec<EventInfo>, SourceError> {
        Ok(self.schedule(year))
    }

    fn load_session(
        &self,
        year: i32,
        event: &str,
        kind: SessionKind,
        options: LoadOptions,
    ) -> Result<Session, SourceError> {
        let event = self.find_event(year, event)?;
        if kind != SessionKind::Race {
            return Err(SourceError::SessionUnavailable {
                year,
                round: event.round_number,
                session: kind.to_string(),
            });
        }

        let mut session = self.build_session(year, event);
        options.apply(&mut session);
        Ok(session)
    }
}
