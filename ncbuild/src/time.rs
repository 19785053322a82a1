//! Decoding of CF style time coordinates, `"<unit> since <date>"`.
//!
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    errors::{Error, Result},
    range::Selection,
    storage::DatasetReader,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
}

impl TimeUnit {
    fn seconds(&self) -> i64 {
        match self {
            Self::Seconds => 1,
            Self::Minutes => 60,
            Self::Hours => 60 * 60,
            Self::Days => 24 * 60 * 60,
        }
    }
}

/// Parsed form of a time variable's `units` attribute
///
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeUnits {
    pub unit: TimeUnit,
    pub epoch: NaiveDateTime,
}

impl TimeUnits {
    /// Parse `"<unit> since YYYY-MM-DD"`, optionally followed by a `HH:MM:SS` time of day.
    ///
    /// `unit` is one of seconds, minutes, hours or days, singular or plural, in any case.
    ///
    pub fn parse(units: &str) -> Result<Self> {
        let unparsable = || Error::UnparsableUnits(units.to_string());
        let mut tokens = units.split_whitespace();

        let unit = match tokens.next().map(str::to_lowercase).as_deref() {
            Some("second" | "seconds") => TimeUnit::Seconds,
            Some("minute" | "minutes") => TimeUnit::Minutes,
            Some("hour" | "hours") => TimeUnit::Hours,
            Some("day" | "days") => TimeUnit::Days,
            _ => return Err(unparsable()),
        };

        if !tokens
            .next()
            .is_some_and(|since| since.eq_ignore_ascii_case("since"))
        {
            return Err(unparsable());
        }

        let date = tokens
            .next()
            .and_then(parse_date)
            .ok_or_else(unparsable)?;
        let time = match tokens.next() {
            Some(time) => {
                NaiveTime::parse_from_str(time, "%H:%M:%S").map_err(|_| unparsable())?
            }
            None => NaiveTime::MIN,
        };
        if tokens.next().is_some() {
            return Err(unparsable());
        }

        Ok(Self {
            unit,
            epoch: date.and_time(time),
        })
    }

    /// The instant `offset` units after the epoch
    pub fn decode(&self, offset: i64) -> Result<NaiveDateTime> {
        let out_of_range = || Error::DateOutOfRange(offset);
        let seconds = offset
            .checked_mul(self.unit.seconds())
            .ok_or_else(out_of_range)?;
        let delta = Duration::try_seconds(seconds).ok_or_else(out_of_range)?;

        self.epoch
            .checked_add_signed(delta)
            .ok_or_else(out_of_range)
    }
}

fn parse_date(token: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(token, "%Y-%m-%d").ok()
}

/// Calendar date `offset_minutes` minutes after the date at the end of `units`.
///
/// Only the trailing `YYYY-MM-DD` token of `units` is read; it is taken as midnight UTC on the
/// proleptic Gregorian calendar. The unit word is not consulted, the offset is always minutes.
///
pub fn decode_offset_to_date(offset_minutes: i64, units: &str) -> Result<NaiveDate> {
    let epoch = units
        .split_whitespace()
        .last()
        .and_then(parse_date)
        .ok_or_else(|| Error::UnparsableUnits(units.to_string()))?;

    let units = TimeUnits {
        unit: TimeUnit::Minutes,
        epoch: epoch.and_time(NaiveTime::MIN),
    };

    Ok(units.decode(offset_minutes)?.date())
}

/// Read the whole of the time variable `name` and decode each value with its `units` attribute.
///
/// Entries with no integer equivalent, such as NaN, decode to `None`. Fractional offsets are
/// truncated.
///
pub fn decode_time_variable<R>(dataset: &R, name: &str) -> Result<Vec<Option<NaiveDateTime>>>
where
    R: DatasetReader + ?Sized,
{
    let variable = dataset.find_variable(name)?;
    let units = variable
        .attribute("units")
        .and_then(|units| units.value.as_text())
        .ok_or_else(|| Error::UnparsableUnits(String::new()))?;
    let units = TimeUnits::parse(units)?;

    let block = dataset.read(name, &Selection::all(&variable.shape())?)?;
    block
        .to_i64_vec()
        .into_iter()
        .map(|offset| offset.map(|offset| units.decode(offset)).transpose())
        .collect()
}
