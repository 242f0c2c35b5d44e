//! Time representations used by session tables
//!
//! The data source stores session-relative times and lap/sector durations as
//! timedeltas. They arrive either as a number of seconds or in the textual
//! form `"0 days 01:02:03.456000"`; everything leaving this crate is seconds.

use crate::error::ParseTimedeltaError;
use chrono::{Duration, NaiveDateTime};
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// A signed duration, usually measured from the start of the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timedelta(pub Duration);

impl Timedelta {
    pub fn zero() -> Self {
        Self(Duration::zero())
    }

    pub fn from_seconds_f64(secs: f64) -> Self {
        Self(Duration::nanoseconds((secs * 1e9).round() as i64))
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(Duration::milliseconds(ms))
    }

    /// Total length in seconds, including the fractional part
    pub fn total_seconds(&self) -> f64 {
        self.0.num_seconds() as f64 + f64::from(self.0.subsec_nanos()) / 1e9
    }
}

impl Default for Timedelta {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Duration> for Timedelta {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl FromStr for Timedelta {
    type Err = ParseTimedeltaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fail = |reason| ParseTimedeltaError {
            input: s.to_string(),
            reason,
        };
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(fail("empty string"));
        }

        let (days, clock) = match trimmed.split_once("day") {
            Some((days, rest)) => {
                let days: i64 = days
                    .trim()
                    .parse()
                    .map_err(|_| fail("day count is not an integer"))?;
                let rest = rest.strip_prefix('s').unwrap_or(rest);
                (days, rest.trim())
            }
            None => (0, trimmed),
        };

        let clock_nanos = if clock.is_empty() {
            0
        } else {
            parse_clock_nanos(clock).ok_or_else(|| fail("expected HH:MM:SS[.fraction]"))?
        };

        Duration::try_days(days)
            .and_then(|d| d.checked_add(&Duration::nanoseconds(clock_nanos)))
            .map(Self)
            .ok_or_else(|| fail("out of range"))
    }
}

/// Parse `[+|-]HH:MM:SS[.fraction]` into signed nanoseconds
fn parse_clock_nanos(clock: &str) -> Option<i64> {
    let (sign, body) = match clock.as_bytes().first()? {
        b'-' => (-1, &clock[1..]),
        b'+' => (1, &clock[1..]),
        _ => (1, clock),
    };

    let mut parts = body.split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds = parts.next()?;
    if parts.next().is_some() || !(0..60).contains(&minutes) {
        return None;
    }

    let (whole, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
    let whole: i64 = whole.parse().ok()?;
    if !(0..60).contains(&whole) || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    // Fractions longer than nanosecond precision are truncated
    let digits: String = fraction.chars().take(9).collect();
    let frac_nanos: i64 = if digits.is_empty() {
        0
    } else {
        format!("{:0<9}", digits).parse().ok()?
    };

    let total = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(whole)?
        .checked_mul(1_000_000_000)?
        .checked_add(frac_nanos)?;
    Some(sign * total)
}

impl fmt::Display for Timedelta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let nanos = self.0.num_nanoseconds().unwrap_or(i64::MAX);
        let days = nanos.div_euclid(86_400 * 1_000_000_000);
        let rem = nanos.rem_euclid(86_400 * 1_000_000_000);
        let secs = rem / 1_000_000_000;
        write!(
            f,
            "{} days {:02}:{:02}:{:02}.{:06}",
            days,
            secs / 3600,
            (secs / 60) % 60,
            secs % 60,
            (rem % 1_000_000_000) / 1000
        )
    }
}

impl Serialize for Timedelta {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(self.total_seconds())
    }
}

impl<'de> Deserialize<'de> for Timedelta {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        struct TimedeltaVisitor;

        impl Visitor<'_> for TimedeltaVisitor {
            type Value = Timedelta;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("seconds as a number or a timedelta string")
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Timedelta, E> {
                if v.is_finite() {
                    Ok(Timedelta::from_seconds_f64(v))
                } else {
                    Err(E::custom("timedelta must be finite"))
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Timedelta, E> {
                Duration::try_seconds(v)
                    .map(Timedelta)
                    .ok_or_else(|| E::custom("timedelta out of range"))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Timedelta, E> {
                let secs = i64::try_from(v).map_err(E::custom)?;
                self.visit_i64(secs)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Timedelta, E> {
                v.parse().map_err(E::custom)
            }
        }

        d.deserialize_any(TimedeltaVisitor)
    }
}

/// A race-control timestamp: elapsed session time or a wall-clock instant
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SessionClock {
    Elapsed(Timedelta),
    Wall(NaiveDateTime),
}

impl SessionClock {
    /// Session-relative seconds, using `t0` to anchor wall-clock instants
    pub fn session_seconds(&self, t0: Option<NaiveDateTime>) -> Option<f64> {
        match self {
            SessionClock::Elapsed(td) => Some(td.total_seconds()),
            SessionClock::Wall(at) => t0.map(|t0| Timedelta(*at - t0).total_seconds()),
        }
    }

    pub fn wall_clock(&self) -> Option<NaiveDateTime> {
        match self {
            SessionClock::Wall(at) => Some(*at),
            SessionClock::Elapsed(_) => None,
        }
    }
}

/// Accept a boolean or a number for 0/1 channels such as `Brake`
pub fn bool_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(f64),
    }

    Ok(Option::<Flag>::deserialize(d)?.map(|flag| match flag {
        Flag::Bool(b) => f64::from(u8::from(b)),
        Flag::Number(n) => n,
    }))
}
