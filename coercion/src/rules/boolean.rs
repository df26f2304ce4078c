//! `bool` rule.

use crate::dispatch::State;
use crate::error::{ErrorKind, RuleFailure};
use crate::target::{Mode, Source};
use crate::value::Value;

const TRUE_WORDS: &[&str] = &["1", "on", "t", "true", "y", "yes"];
const FALSE_WORDS: &[&str] = &["0", "off", "f", "false", "n", "no"];

fn bool_parsing() -> RuleFailure {
    RuleFailure::new(
        ErrorKind::BoolParsing,
        "Input should be a valid boolean, unable to interpret input",
    )
}

#[allow(clippy::float_cmp)]
pub fn coerce_bool(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    match (state.mode, state.source, input) {
        (Mode::Strict, Source::Json, Value::Str(s)) | (Mode::Lax, _, Value::Str(s)) => {
            parse_bool_str(s)
        }
        (Mode::Strict, _, _) => Err(RuleFailure::new(
            ErrorKind::TypeMismatch,
            "Input should be a valid boolean",
        )),
        (Mode::Lax, _, Value::Int(0)) => Ok(Value::Bool(false)),
        (Mode::Lax, _, Value::Int(1)) => Ok(Value::Bool(true)),
        (Mode::Lax, _, Value::Float(f)) if *f == 0.0 => Ok(Value::Bool(false)),
        (Mode::Lax, _, Value::Float(f)) if *f == 1.0 => Ok(Value::Bool(true)),
        (Mode::Lax, _, Value::Int(_) | Value::Float(_)) => Err(bool_parsing()),
        (Mode::Lax, _, Value::Bytes(raw)) => match std::str::from_utf8(raw) {
            Ok(s) => parse_bool_str(s),
            Err(_) => Err(bool_parsing()),
        },
        (Mode::Lax, _, _) => Err(RuleFailure::new(
            ErrorKind::TypeMismatch,
            "Input should be a valid boolean",
        )),
    }
}

fn parse_bool_str(raw: &str) -> Result<Value, RuleFailure> {
    let word = raw.trim().to_ascii_lowercase();
    if TRUE_WORDS.contains(&word.as_str()) {
        Ok(Value::Bool(true))
    } else if FALSE_WORDS.contains(&word.as_str()) {
        Ok(Value::Bool(false))
    } else {
        Err(bool_parsing())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;

    fn lax(input: &Value) -> Result<Value, RuleFailure> {
        let config = SchemaConfig::default();
        coerce_bool(input, &State::new(Mode::Lax, Source::Python, &config))
    }

    #[test]
    fn test_word_table_is_case_insensitive() {
        for word in ["YES", "True", "on", "1", "t", "Y"] {
            assert_eq!(lax(&Value::str(word)).unwrap(), Value::Bool(true), "{word}");
        }
        for word in ["No", "FALSE", "off", "0", "f", "n"] {
            assert_eq!(lax(&Value::str(word)).unwrap(), Value::Bool(false), "{word}");
        }
    }

    #[test]
    fn test_numbers_outside_zero_one_fail() {
        assert_eq!(lax(&Value::Int(1)).unwrap(), Value::Bool(true));
        assert_eq!(lax(&Value::Float(0.0)).unwrap(), Value::Bool(false));
        assert_eq!(lax(&Value::Int(2)).unwrap_err().kind, ErrorKind::BoolParsing);
        assert_eq!(lax(&Value::Float(0.5)).unwrap_err().kind, ErrorKind::BoolParsing);
        assert_eq!(lax(&Value::str("maybe")).unwrap_err().kind, ErrorKind::BoolParsing);
        assert_eq!(lax(&Value::List(vec![])).unwrap_err().kind, ErrorKind::TypeMismatch);
    }

    #[test]
    fn test_bytes_are_decoded() {
        assert_eq!(lax(&Value::Bytes(b"yes".to_vec())).unwrap(), Value::Bool(true));
        assert_eq!(
            lax(&Value::Bytes(vec![0xff])).unwrap_err().kind,
            ErrorKind::BoolParsing
        );
    }

    #[test]
    fn test_strict_json_accepts_words_only() {
        let config = SchemaConfig::default();
        let state = State::new(Mode::Strict, Source::Json, &config);
        assert_eq!(coerce_bool(&Value::str("on"), &state).unwrap(), Value::Bool(true));
        assert_eq!(
            coerce_bool(&Value::Int(1), &state).unwrap_err().kind,
            ErrorKind::TypeMismatch
        );
    }
}
