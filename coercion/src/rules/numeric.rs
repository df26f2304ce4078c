//! `int`, `float` and `decimal` rules.
//!
//! Numeric strings follow a deliberately narrow grammar: surrounding
//! whitespace is trimmed, underscores are allowed between digits, and
//! anything else (including empty strings) is a parsing error.

use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::config::SchemaConfig;
use crate::dispatch::State;
use crate::error::{ErrorKind, RuleFailure};
use crate::target::{Mode, NumberConstraints, Source};
use crate::value::Value;

#[allow(clippy::expect_used)]
static INT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[0-9]+(?:_[0-9]+)*$").expect("valid int pattern"));

#[allow(clippy::expect_used)]
static FLOAT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[+-]?(?:[0-9]+(?:_[0-9]+)*(?:\.(?:[0-9]+(?:_[0-9]+)*)?)?|\.[0-9]+(?:_[0-9]+)*)(?:[eE][+-]?[0-9]+)?$",
    )
    .expect("valid float pattern")
});

/// 2^63, the first float outside `i64`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

fn int_type() -> RuleFailure {
    RuleFailure::new(ErrorKind::TypeMismatch, "Input should be a valid integer")
}

fn int_parsing() -> RuleFailure {
    RuleFailure::new(
        ErrorKind::IntParsing,
        "Input should be a valid integer, unable to parse string as an integer",
    )
}

fn float_type() -> RuleFailure {
    RuleFailure::new(ErrorKind::TypeMismatch, "Input should be a valid number")
}

fn float_parsing() -> RuleFailure {
    RuleFailure::new(
        ErrorKind::FloatParsing,
        "Input should be a valid number, unable to parse string as a number",
    )
}

fn finite_number() -> RuleFailure {
    RuleFailure::new(ErrorKind::FiniteNumber, "Input should be a finite number")
}

fn decimal_parsing() -> RuleFailure {
    RuleFailure::new(ErrorKind::DecimalParsing, "Input should be a valid decimal")
}

pub fn coerce_int(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    match (state.mode, state.source, input) {
        (Mode::Strict, Source::Json, Value::Float(f)) => float_to_int(*f).map(Value::Int),
        // A JSON string is the text of a number, not a number.
        (Mode::Strict, Source::Json, Value::Str(_)) => Err(RuleFailure::new(
            ErrorKind::IntParsing,
            "Input should be a valid integer, strings are not accepted in strict mode",
        )),
        (Mode::Strict, _, _) => Err(int_type()),
        (Mode::Lax, _, value) => lax_int(value).map(Value::Int),
    }
}

/// Lax integer conversion, shared with literal and enum lookups.
pub fn lax_int(input: &Value) -> Result<i64, RuleFailure> {
    match input {
        Value::Int(i) => Ok(*i),
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Float(f) => float_to_int(*f),
        Value::Decimal(d) => {
            if d.fract().is_zero() {
                d.to_i64().ok_or_else(int_parsing)
            } else {
                Err(RuleFailure::new(
                    ErrorKind::IntFromFloat,
                    "Input should be a valid integer, got a number with a fractional part",
                ))
            }
        }
        Value::Str(s) => parse_int_str(s),
        _ => Err(int_type()),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn float_to_int(f: f64) -> Result<i64, RuleFailure> {
    if !f.is_finite() {
        return Err(finite_number());
    }
    if f.fract() != 0.0 {
        return Err(RuleFailure::new(
            ErrorKind::IntFromFloat,
            "Input should be a valid integer, got a number with a fractional part",
        ));
    }
    if !(-I64_BOUND..I64_BOUND).contains(&f) {
        return Err(RuleFailure::new(
            ErrorKind::IntParsing,
            "Input should be a valid integer, number is out of range",
        ));
    }
    Ok(f as i64)
}

pub fn parse_int_str(raw: &str) -> Result<i64, RuleFailure> {
    let text = raw.trim();
    if !INT_PATTERN.is_match(text) {
        return Err(int_parsing());
    }
    text.replace('_', "").parse::<i64>().map_err(|_| {
        RuleFailure::new(
            ErrorKind::IntParsing,
            "Input should be a valid integer, unable to parse string as an integer: out of range",
        )
    })
}

pub fn coerce_float(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    let f = match (state.mode, state.source, input) {
        (Mode::Strict, Source::Json, Value::Int(i)) => int_to_f64(*i),
        (Mode::Strict, Source::Json, Value::Str(s)) => parse_float_str(s)?,
        (Mode::Strict, _, _) => return Err(float_type()),
        (Mode::Lax, _, value) => lax_float(value)?,
    };
    Ok(Value::Float(f))
}

fn lax_float(input: &Value) -> Result<f64, RuleFailure> {
    match input {
        Value::Float(f) => Ok(*f),
        Value::Int(i) => Ok(int_to_f64(*i)),
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Decimal(d) => d.to_f64().ok_or_else(float_parsing),
        Value::Str(s) => parse_float_str(s),
        _ => Err(float_type()),
    }
}

#[allow(clippy::cast_precision_loss)]
fn int_to_f64(i: i64) -> f64 {
    i as f64
}

pub fn parse_float_str(raw: &str) -> Result<f64, RuleFailure> {
    let text = raw.trim();
    let lower = text.to_ascii_lowercase();
    let unsigned = lower.trim_start_matches(['+', '-']);
    if matches!(unsigned, "inf" | "infinity" | "nan") {
        return lower.parse::<f64>().map_err(|_| float_parsing());
    }
    if !FLOAT_PATTERN.is_match(text) {
        return Err(float_parsing());
    }
    text.replace('_', "").parse::<f64>().map_err(|_| float_parsing())
}

/// Reject NaN and infinities when the config disallows them.
pub fn check_finite(value: Value, config: &SchemaConfig) -> Result<Value, RuleFailure> {
    match value {
        Value::Float(f) if !f.is_finite() && !config.inf_nan_allowed() => Err(finite_number()),
        other => Ok(other),
    }
}

pub fn coerce_decimal(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    match (state.mode, state.source, input) {
        (Mode::Strict, Source::Json, Value::Str(s)) | (Mode::Lax, _, Value::Str(s)) => {
            parse_decimal_str(s).map(Value::Decimal)
        }
        (Mode::Strict, _, _) => Err(RuleFailure::new(
            ErrorKind::TypeMismatch,
            "Input should be an instance of Decimal",
        )),
        (Mode::Lax, _, Value::Int(i)) => Ok(Value::Decimal(Decimal::from(*i))),
        (Mode::Lax, _, Value::Float(f)) => {
            if f.is_finite() {
                // Shortest round-trip text, so 0.1 stays 0.1.
                parse_decimal_str(&f.to_string()).map(Value::Decimal)
            } else {
                Err(decimal_parsing())
            }
        }
        (Mode::Lax, _, _) => Err(RuleFailure::new(
            ErrorKind::TypeMismatch,
            "Decimal input should be an integer, float, string or Decimal object",
        )),
    }
}

fn parse_decimal_str(raw: &str) -> Result<Decimal, RuleFailure> {
    let text = raw.trim();
    if text.is_empty() {
        return Err(decimal_parsing());
    }
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|_| {
            if FLOAT_PATTERN.is_match(text) {
                // Well-formed, but past the 96-bit mantissa.
                RuleFailure::new(
                    ErrorKind::DecimalParsing,
                    "Input should be a valid decimal of at most 28 significant digits",
                )
            } else {
                decimal_parsing()
            }
        })
}

#[allow(clippy::cast_precision_loss)]
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Int(i) => Some(*i as f64),
        Value::Float(f) => Some(*f),
        Value::Decimal(d) => d.to_f64(),
        _ => None,
    }
}

fn bound_failure(kind: ErrorKind, relation: &str, bound: f64) -> RuleFailure {
    RuleFailure::new(kind, format!("Input should be {relation} {bound}"))
}

/// Whether `value` is a whole multiple of `step`.
///
/// Integers and decimals are checked exactly. Floats allow a remainder
/// within a billionth of the value.
fn is_multiple(value: &Value, number: f64, step: f64) -> bool {
    let exact = match value {
        Value::Int(i) => Some(Decimal::from(*i)),
        Value::Decimal(d) => Some(*d),
        _ => None,
    };
    if let Some(exact) = exact
        && let Ok(step) = parse_decimal_str(&step.to_string())
        && !step.is_zero()
    {
        return exact.checked_rem(step).is_some_and(|rem| rem.is_zero());
    }
    let rem = (number % step).abs();
    let threshold = number.abs() / 1e9;
    rem <= threshold || (rem - step.abs()).abs() <= threshold
}

/// Check a coerced `int`, `float` or `decimal` against numeric bounds.
///
/// NaN satisfies no bound.
pub fn check_bounds(value: Value, bounds: &NumberConstraints) -> Result<Value, RuleFailure> {
    let Some(number) = as_f64(&value) else {
        return Ok(value);
    };
    let order = |bound: f64| number.partial_cmp(&bound);
    if let Some(gt) = bounds.gt
        && order(gt) != Some(Ordering::Greater)
    {
        return Err(bound_failure(ErrorKind::GreaterThan, "greater than", gt));
    }
    if let Some(ge) = bounds.ge
        && !matches!(order(ge), Some(Ordering::Greater | Ordering::Equal))
    {
        return Err(bound_failure(
            ErrorKind::GreaterThanEqual,
            "greater than or equal to",
            ge,
        ));
    }
    if let Some(lt) = bounds.lt
        && order(lt) != Some(Ordering::Less)
    {
        return Err(bound_failure(ErrorKind::LessThan, "less than", lt));
    }
    if let Some(le) = bounds.le
        && !matches!(order(le), Some(Ordering::Less | Ordering::Equal))
    {
        return Err(bound_failure(
            ErrorKind::LessThanEqual,
            "less than or equal to",
            le,
        ));
    }
    if let Some(step) = bounds.multiple_of
        && !is_multiple(&value, number, step)
    {
        return Err(bound_failure(ErrorKind::MultipleOf, "a multiple of", step));
    }
    Ok(value)
}
