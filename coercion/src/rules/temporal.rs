//! `datetime`, `date`, `time` and `timedelta` rules.
//!
//! Text is ISO-8601 (`Z` or `+HH:MM` offsets; a bare date is midnight in lax
//! mode). Numbers are Unix epochs: magnitudes up to 2e10 are seconds,
//! larger ones milliseconds, always in UTC.

use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use regex::Regex;

use crate::dispatch::State;
use crate::error::{ErrorKind, RuleFailure};
use crate::rules::numeric;
use crate::target::{Mode, Source};
use crate::value::{DateTimeValue, Value};

#[allow(clippy::expect_used)]
static DATETIME_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}").expect("valid datetime prefix"));

#[allow(clippy::expect_used)]
static DATE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{4}-[0-9]{2}-[0-9]{2}$").expect("valid date pattern"));

#[allow(clippy::expect_used)]
static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]{2}:[0-9]{2}(?::[0-9]{2}(?:\.[0-9]{1,9})?)?$").expect("valid time pattern")
});

#[allow(clippy::expect_used)]
static ISO_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([+-])?P(?:([0-9]+)W)?(?:([0-9]+)D)?(?:T(?:([0-9]+)H)?(?:([0-9]+)M)?(?:([0-9]+)(?:\.([0-9]{1,9}))?S)?)?$",
    )
    .expect("valid duration pattern")
});

#[allow(clippy::expect_used)]
static CLOCK_DURATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([+-])?(?:([0-9]+) days?,\s*)?([0-9]{1,2}):([0-9]{2}):([0-9]{2})(?:\.([0-9]{1,6}))?$",
    )
    .expect("valid clock duration pattern")
});

const AWARE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Epoch magnitudes above this are milliseconds.
const MILLIS_THRESHOLD: f64 = 2e10;
const MILLIS_THRESHOLD_INT: u64 = 20_000_000_000;
const SECONDS_PER_DAY: f64 = 86_400.0;
/// Keeps float-to-integer casts of epoch seconds in range.
const MAX_EPOCH_SECONDS: f64 = 1e15;

fn mismatch(kind: &str) -> RuleFailure {
    RuleFailure::new(ErrorKind::TypeMismatch, format!("Input should be a valid {kind}"))
}

fn datetime_parsing() -> RuleFailure {
    RuleFailure::new(
        ErrorKind::DateTimeParsing,
        "Input should be a valid datetime, invalid datetime format or out of range",
    )
}

fn date_parsing() -> RuleFailure {
    RuleFailure::new(
        ErrorKind::DateParsing,
        "Input should be a valid date in the format YYYY-MM-DD",
    )
}

fn time_parsing() -> RuleFailure {
    RuleFailure::new(
        ErrorKind::TimeParsing,
        "Input should be a valid time in the format HH:MM[:SS[.ffffff]]",
    )
}

fn timedelta_parsing() -> RuleFailure {
    RuleFailure::new(
        ErrorKind::TimedeltaParsing,
        "Input should be a valid timedelta, ISO 8601 duration or [-][D days, ]HH:MM:SS[.ffffff]",
    )
}

/// Parse an ISO-8601 date-time; `allow_bare_date` admits `YYYY-MM-DD`.
pub fn parse_datetime(raw: &str, allow_bare_date: bool) -> Option<DateTimeValue> {
    let text = raw.trim();
    if !DATETIME_PREFIX.is_match(text) {
        return None;
    }
    let normalized = match text.strip_suffix(['Z', 'z']) {
        Some(stripped) => format!("{stripped}+00:00"),
        None => text.to_owned(),
    };
    for format in AWARE_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, format) {
            return Some(DateTimeValue {
                local: dt.naive_local(),
                offset: Some(*dt.offset()),
            });
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(local) = NaiveDateTime::parse_from_str(text, format) {
            return Some(DateTimeValue::naive(local));
        }
    }
    if allow_bare_date {
        return parse_date(text)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(DateTimeValue::naive);
    }
    None
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    if !DATE_PATTERN.is_match(text) {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let text = raw.trim();
    if !TIME_PATTERN.is_match(text) {
        return None;
    }
    let format = if text.matches(':').count() == 2 {
        "%H:%M:%S%.f"
    } else {
        "%H:%M"
    };
    NaiveTime::parse_from_str(text, format).ok()
}

/// Split finite seconds into whole seconds and nanoseconds.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn split_seconds(seconds: f64) -> Option<(i64, u32)> {
    if !seconds.is_finite() || seconds.abs() > MAX_EPOCH_SECONDS {
        return None;
    }
    let whole = seconds.floor();
    let nanos = ((seconds - whole) * 1e9).round();
    if nanos >= 1e9 {
        Some((whole as i64 + 1, 0))
    } else {
        Some((whole as i64, nanos as u32))
    }
}

pub fn timedelta_from_seconds(seconds: f64) -> Option<TimeDelta> {
    let (secs, nanos) = split_seconds(seconds)?;
    TimeDelta::new(secs, nanos)
}

fn datetime_from_epoch(value: f64) -> Option<DateTimeValue> {
    let seconds = if value.abs() <= MILLIS_THRESHOLD {
        value
    } else {
        value / 1000.0
    };
    let (secs, nanos) = split_seconds(seconds)?;
    DateTime::from_timestamp(secs, nanos).map(|dt| DateTimeValue::utc(dt.naive_utc()))
}

fn datetime_from_epoch_int(value: i64) -> Option<DateTimeValue> {
    let dt = if value.unsigned_abs() <= MILLIS_THRESHOLD_INT {
        DateTime::from_timestamp(value, 0)
    } else {
        DateTime::from_timestamp_millis(value)
    };
    dt.map(|dt| DateTimeValue::utc(dt.naive_utc()))
}

fn epoch_of(input: &Value) -> Option<Option<DateTimeValue>> {
    match input {
        Value::Int(i) => Some(datetime_from_epoch_int(*i)),
        Value::Float(f) => Some(datetime_from_epoch(*f)),
        _ => None,
    }
}

/// Decode text input for lax temporal rules (strings and UTF-8 bytes).
fn lax_text(input: &Value) -> Option<&str> {
    match input {
        Value::Str(s) => Some(s.trim()),
        Value::Bytes(raw) => std::str::from_utf8(raw).ok().map(str::trim),
        _ => None,
    }
}

/// Numeric text is an epoch, not a calendar string.
fn numeric_text(text: &str) -> Option<f64> {
    numeric::parse_float_str(text).ok()
}

pub fn coerce_datetime(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    let parsed = match (state.mode, state.source) {
        (Mode::Strict, Source::Json) => match input {
            Value::Str(s) => parse_datetime(s, false),
            other => epoch_of(other).ok_or_else(|| mismatch("datetime"))?,
        },
        (Mode::Strict, Source::Python) => return Err(mismatch("datetime")),
        (Mode::Lax, _) => match input {
            Value::Date(d) => d.and_hms_opt(0, 0, 0).map(DateTimeValue::naive),
            other => match lax_text(other) {
                Some(text) => match numeric_text(text) {
                    Some(epoch) => datetime_from_epoch(epoch),
                    None => parse_datetime(text, true),
                },
                None => epoch_of(other).ok_or_else(|| mismatch("datetime"))?,
            },
        },
    };
    parsed.map(Value::DateTime).ok_or_else(datetime_parsing)
}

/// A date from an epoch, which must fall exactly on midnight UTC.
fn date_from_epoch(epoch: Option<DateTimeValue>) -> Result<Value, RuleFailure> {
    let dt = epoch.ok_or_else(date_parsing)?;
    exact_date(&dt)
}

fn exact_date(dt: &DateTimeValue) -> Result<Value, RuleFailure> {
    if dt.local.time() == NaiveTime::MIN {
        Ok(Value::Date(dt.local.date()))
    } else {
        Err(RuleFailure::new(
            ErrorKind::DateFromDateTimeInexact,
            "Datetimes provided to dates should have zero time - e.g. be exact dates",
        ))
    }
}

pub fn coerce_date(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    match (state.mode, state.source) {
        (Mode::Strict, Source::Json) => match input {
            Value::Str(s) => parse_date(s).map(Value::Date).ok_or_else(date_parsing),
            other => date_from_epoch(epoch_of(other).ok_or_else(|| mismatch("date"))?),
        },
        (Mode::Strict, Source::Python) => Err(mismatch("date")),
        (Mode::Lax, _) => match input {
            Value::DateTime(dt) => exact_date(dt),
            other => match lax_text(other) {
                Some(text) => match numeric_text(text) {
                    Some(epoch) => date_from_epoch(datetime_from_epoch(epoch)),
                    None => parse_date(text).map(Value::Date).ok_or_else(date_parsing),
                },
                None => date_from_epoch(epoch_of(other).ok_or_else(|| mismatch("date"))?),
            },
        },
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn time_from_seconds(seconds: f64) -> Result<Value, RuleFailure> {
    if !(0.0..SECONDS_PER_DAY).contains(&seconds) {
        return Err(time_parsing());
    }
    let (secs, nanos) = split_seconds(seconds).ok_or_else(time_parsing)?;
    NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, nanos)
        .map(Value::Time)
        .ok_or_else(time_parsing)
}

#[allow(clippy::cast_precision_loss)]
pub fn coerce_time(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    match (state.mode, state.source, input) {
        (Mode::Strict, Source::Json, Value::Str(s)) | (Mode::Lax, _, Value::Str(s)) => {
            parse_time(s).map(Value::Time).ok_or_else(time_parsing)
        }
        (Mode::Lax, _, Value::Int(i)) => time_from_seconds(*i as f64),
        (Mode::Lax, _, Value::Float(f)) => time_from_seconds(*f),
        _ => Err(mismatch("time")),
    }
}

fn capture_number(caps: &regex::Captures<'_>, index: usize) -> Option<i64> {
    caps.get(index).map_or(Some(0), |m| m.as_str().parse::<i64>().ok())
}

/// Fractional digits as nanoseconds (`"5"` is 500ms).
fn fraction_nanos(caps: &regex::Captures<'_>, index: usize) -> Option<u32> {
    caps.get(index).map_or(Some(0), |m| {
        let digits = m.as_str();
        let padded = format!("{digits:0<9}");
        padded.parse::<u32>().ok()
    })
}

fn signed(caps: &regex::Captures<'_>, delta: TimeDelta) -> TimeDelta {
    if caps.get(1).is_some_and(|m| m.as_str() == "-") {
        -delta
    } else {
        delta
    }
}

fn parse_iso_duration(text: &str) -> Option<TimeDelta> {
    let caps = ISO_DURATION.captures(text)?;
    if (2..=6).all(|i| caps.get(i).is_none()) {
        return None;
    }
    let weeks = capture_number(&caps, 2)?;
    let days = capture_number(&caps, 3)?;
    let hours = capture_number(&caps, 4)?;
    let minutes = capture_number(&caps, 5)?;
    let seconds = capture_number(&caps, 6)?;
    let total = weeks
        .checked_mul(7)?
        .checked_add(days)?
        .checked_mul(24)?
        .checked_add(hours)?
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?;
    let delta = TimeDelta::new(total, fraction_nanos(&caps, 7)?)?;
    Some(signed(&caps, delta))
}

/// `[-]H:MM:SS[.ffffff]` or `[-]D day[s], H:MM:SS[.ffffff]`.
///
/// With a day count the sign belongs to the days alone, so the printed
/// form of a negative duration (`-1 day, 23:00:00`) reads back as -1h.
fn parse_clock_duration(text: &str) -> Option<TimeDelta> {
    let caps = CLOCK_DURATION.captures(text)?;
    let days = TimeDelta::try_days(capture_number(&caps, 2)?)?;
    let hours = capture_number(&caps, 3)?;
    let minutes = capture_number(&caps, 4)?;
    let seconds = capture_number(&caps, 5)?;
    if minutes >= 60 || seconds >= 60 {
        return None;
    }
    let total = hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?;
    let clock = TimeDelta::new(total, fraction_nanos(&caps, 6)?)?;
    if caps.get(2).is_some() {
        signed(&caps, days).checked_add(&clock)
    } else {
        Some(signed(&caps, clock))
    }
}

pub fn parse_timedelta(raw: &str) -> Option<TimeDelta> {
    let text = raw.trim();
    parse_iso_duration(text).or_else(|| parse_clock_duration(text))
}

pub fn coerce_timedelta(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    let parsed = match (state.mode, state.source, input) {
        (Mode::Strict, Source::Json, Value::Str(s)) | (Mode::Lax, _, Value::Str(s)) => {
            parse_timedelta(s)
        }
        (Mode::Strict, Source::Json, Value::Int(i)) | (Mode::Lax, _, Value::Int(i)) => {
            TimeDelta::try_seconds(*i)
        }
        (Mode::Strict, Source::Json, Value::Float(f)) | (Mode::Lax, _, Value::Float(f)) => {
            timedelta_from_seconds(*f)
        }
        _ => return Err(mismatch("timedelta")),
    };
    parsed.map(Value::Timedelta).ok_or_else(timedelta_parsing)
}
