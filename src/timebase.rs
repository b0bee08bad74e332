//! Device timestamp encodings and the shared civil-time axis.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use chrono_tz::Tz;
use log::warn;

use crate::error::{PipelineError, Result, TimeError};
use crate::table::Field;

/// Native timestamp encodings seen in the vendor exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeEncoding {
    EpochMillis,
    EpochNanos,
    /// Epoch seconds multiplied by `divisor` (Babolat writes seconds × 10000).
    EpochScaled { divisor: i64 },
}

pub const DISPLAY_FORMAT: &str = "%m-%d-%Y %I:%M:%S%.f %p";

pub fn parse_timezone(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|_| PipelineError::UnknownTimezone(name.to_string()))
}

/// Interpret `raw` as a UTC instant in `encoding` and express it in `tz`.
pub fn normalize(
    raw: &Field,
    encoding: TimeEncoding,
    tz: Tz,
) -> std::result::Result<DateTime<Tz>, TimeError> {
    let utc = match raw {
        Field::Null => return Err(TimeError::Missing),
        Field::Int(v) => from_int(*v, encoding),
        Field::Float(v) => from_float(*v, encoding),
        Field::Text(s) => match Field::parse(s) {
            Field::Int(v) => from_int(v, encoding),
            Field::Float(v) => from_float(v, encoding),
            Field::Null => return Err(TimeError::Missing),
            Field::Text(s) => return Err(TimeError::NotNumeric(s)),
        },
    };
    utc.map(|t| t.with_timezone(&tz))
        .ok_or_else(|| TimeError::OutOfRange(format!("{raw:?}")))
}

fn from_int(v: i64, encoding: TimeEncoding) -> Option<DateTime<Utc>> {
    match encoding {
        TimeEncoding::EpochMillis => DateTime::from_timestamp_millis(v),
        TimeEncoding::EpochNanos => Some(DateTime::from_timestamp_nanos(v)),
        TimeEncoding::EpochScaled { divisor } if divisor > 0 => {
            let secs = v.div_euclid(divisor);
            let rem = v.rem_euclid(divisor) as i128;
            let nanos = (rem * 1_000_000_000 / divisor as i128) as u32;
            DateTime::from_timestamp(secs, nanos)
        }
        TimeEncoding::EpochScaled { .. } => None,
    }
}

fn from_float(v: f64, encoding: TimeEncoding) -> Option<DateTime<Utc>> {
    if !v.is_finite() {
        return None;
    }
    let nanos = match encoding {
        TimeEncoding::EpochMillis => v * 1e6,
        TimeEncoding::EpochNanos => v,
        TimeEncoding::EpochScaled { divisor } if divisor > 0 => v / divisor as f64 * 1e9,
        TimeEncoding::EpochScaled { .. } => return None,
    };
    if nanos.abs() >= i64::MAX as f64 {
        return None;
    }
    Some(DateTime::from_timestamp_nanos(nanos.round() as i64))
}

pub fn display(t: &DateTime<Tz>) -> String {
    t.format(DISPLAY_FORMAT).to_string()
}

/// Inclusive analysis window in the session timezone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisWindow {
    pub start: DateTime<Tz>,
    pub end: DateTime<Tz>,
}

impl AnalysisWindow {
    /// Whole calendar days `start..=end`, local to `tz`. Spans longer than
    /// `max_days` are allowed but logged.
    pub fn from_dates(start: NaiveDate, end: NaiveDate, tz: Tz, max_days: u32) -> Result<Self> {
        let invalid = || PipelineError::InvalidWindow {
            start: start.to_string(),
            end: end.to_string(),
        };
        if start > end {
            return Err(invalid());
        }
        let days = end.signed_duration_since(start).num_days();
        if days > i64::from(max_days) {
            warn!("window spans {days} days (> {max_days}); this may take a while");
        }

        let first = start.and_hms_opt(0, 0, 0).ok_or_else(invalid)?;
        let last = end
            .and_hms_nano_opt(23, 59, 59, 999_999_999)
            .ok_or_else(invalid)?;
        let start = tz.from_local_datetime(&first).earliest().ok_or_else(invalid)?;
        let end = tz.from_local_datetime(&last).latest().ok_or_else(invalid)?;
        Ok(Self { start, end })
    }

    pub fn parse(start: &str, end: &str, tz: Tz, max_days: u32) -> Result<Self> {
        let parse = |s: &str| {
            NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
                PipelineError::InvalidWindow {
                    start: start.to_string(),
                    end: end.to_string(),
                }
            })
        };
        Self::from_dates(parse(start)?, parse(end)?, tz, max_days)
    }

    pub fn contains(&self, t: &DateTime<Tz>) -> bool {
        *t >= self.start && *t <= self.end
    }
}
