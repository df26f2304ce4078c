//! `str` and `bytes` rules, plus string constraints.

use crate::config::SchemaConfig;
use crate::dispatch::State;
use crate::error::{ErrorKind, RuleFailure};
use crate::target::{Mode, Source, StringConstraints};
use crate::value::Value;

fn str_type() -> RuleFailure {
    RuleFailure::new(ErrorKind::TypeMismatch, "Input should be a valid string")
}

pub fn coerce_str(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    match state.mode {
        Mode::Strict => Err(str_type()),
        Mode::Lax => lax_str(input).map(Value::Str),
    }
}

/// Lax string conversion, shared with literal and enum lookups.
pub fn lax_str(input: &Value) -> Result<String, RuleFailure> {
    match input {
        Value::Str(s) => Ok(s.clone()),
        Value::Bytes(raw) => String::from_utf8(raw.clone()).map_err(|_| {
            RuleFailure::new(
                ErrorKind::StringUnicode,
                "Input should be a valid string, unable to parse raw data as a unicode string",
            )
        }),
        Value::Enum(member) => match member.value.as_ref() {
            Value::Str(s) => Ok(s.clone()),
            _ => Err(str_type()),
        },
        _ => Err(str_type()),
    }
}

/// Apply whitespace stripping, case folding and length bounds.
///
/// Per-field constraints win; unset keys fall back to the schema config.
/// Lengths count characters, not bytes.
pub fn apply_constraints(
    value: Value,
    constraints: &StringConstraints,
    config: &SchemaConfig,
) -> Result<Value, RuleFailure> {
    let Value::Str(mut text) = value else {
        return Ok(value);
    };
    if constraints
        .strip_whitespace
        .or(config.str_strip_whitespace)
        .unwrap_or(false)
    {
        text = text.trim().to_owned();
    }
    if constraints.to_lower.or(config.str_to_lower).unwrap_or(false) {
        text = text.to_lowercase();
    } else if constraints.to_upper.or(config.str_to_upper).unwrap_or(false) {
        text = text.to_uppercase();
    }

    let length = text.chars().count();
    if let Some(min) = constraints.min_length.or(config.str_min_length)
        && length < min
    {
        return Err(RuleFailure::new(
            ErrorKind::StringTooShort,
            format!("String should have at least {min} character{}", plural(min)),
        ));
    }
    if let Some(max) = constraints.max_length.or(config.str_max_length)
        && length > max
    {
        return Err(RuleFailure::new(
            ErrorKind::StringTooLong,
            format!("String should have at most {max} character{}", plural(max)),
        ));
    }
    Ok(Value::Str(text))
}

pub fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

pub fn coerce_bytes(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    match (state.mode, state.source, input) {
        (Mode::Strict, Source::Json, Value::Str(s)) | (Mode::Lax, _, Value::Str(s)) => {
            Ok(Value::Bytes(s.as_bytes().to_vec()))
        }
        _ => Err(RuleFailure::new(
            ErrorKind::TypeMismatch,
            "Input should be a valid bytes",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn constrain(s: &str, c: &StringConstraints) -> Result<Value, RuleFailure> {
        apply_constraints(Value::str(s), c, &SchemaConfig::default())
    }

    #[test]
    fn test_lengths_count_characters() {
        let c = StringConstraints::length(None, Some(3));
        assert!(constrain("\u{e9}\u{e9}\u{e9}", &c).is_ok());
        assert_eq!(constrain("abcd", &c).unwrap_err().kind, ErrorKind::StringTooLong);

        let c = StringConstraints::length(Some(1), None);
        let err = constrain("", &c).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StringTooShort);
        assert_eq!(err.message, "String should have at least 1 character");
    }

    #[test]
    fn test_strip_applies_before_length_check() {
        let mut c = StringConstraints::length(None, Some(2));
        c.strip_whitespace = Some(true);
        assert_eq!(constrain("  ab  ", &c).unwrap(), Value::str("ab"));
    }

    #[test]
    fn test_field_constraint_wins_over_config() {
        let mut config = SchemaConfig::default();
        config.str_max_length = Some(2);
        config.str_to_upper = Some(true);
        let c = StringConstraints::length(None, Some(5));
        let out = apply_constraints(Value::str("abcd"), &c, &config).unwrap();
        assert_eq!(out, Value::str("ABCD"));
        let err = apply_constraints(Value::str("abc"), &StringConstraints::default(), &config);
        assert_eq!(err.unwrap_err().kind, ErrorKind::StringTooLong);
    }

    #[test]
    fn test_lax_str_decodes_utf8_bytes() {
        assert_eq!(lax_str(&Value::Bytes(b"hi".to_vec())).unwrap(), "hi");
        assert_eq!(
            lax_str(&Value::Bytes(vec![0xc3, 0x28])).unwrap_err().kind,
            ErrorKind::StringUnicode
        );
        assert_eq!(lax_str(&Value::Int(1)).unwrap_err().kind, ErrorKind::TypeMismatch);
    }
}
