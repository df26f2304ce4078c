//! `uuid` rule.

use uuid::Uuid;

use crate::dispatch::State;
use crate::error::{ErrorKind, RuleFailure};
use crate::target::{Mode, Source};
use crate::value::Value;

fn parse_uuid(text: &str) -> Result<Value, RuleFailure> {
    Uuid::parse_str(text.trim()).map(Value::Uuid).map_err(|e| {
        RuleFailure::new(
            ErrorKind::UuidParsing,
            format!("Input should be a valid UUID, {e}"),
        )
    })
}

pub fn coerce_uuid(input: &Value, state: &State<'_>) -> Result<Value, RuleFailure> {
    match (state.mode, state.source, input) {
        (Mode::Strict, Source::Json, Value::Str(s)) | (Mode::Lax, _, Value::Str(s)) => parse_uuid(s),
        (Mode::Strict, _, _) => Err(RuleFailure::new(
            ErrorKind::TypeMismatch,
            "Input should be an instance of UUID",
        )),
        (Mode::Lax, _, Value::Bytes(raw)) if raw.len() == 16 => Uuid::from_slice(raw)
            .map(Value::Uuid)
            .map_err(|e| RuleFailure::new(ErrorKind::UuidParsing, e.to_string())),
        (Mode::Lax, _, Value::Bytes(raw)) => match std::str::from_utf8(raw) {
            Ok(text) => parse_uuid(text),
            Err(_) => Err(RuleFailure::new(
                ErrorKind::UuidParsing,
                "Input should be a valid UUID, bytes are neither 16 raw bytes nor UTF-8 text",
            )),
        },
        (Mode::Lax, _, _) => Err(RuleFailure::new(
            ErrorKind::TypeMismatch,
            "UUID input should be a string, bytes or UUID object",
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;

    const TEXT: &str = "12345678-1234-5678-1234-567812345678";

    #[test]
    fn test_lax_accepts_text_and_raw_bytes() {
        let config = SchemaConfig::default();
        let state = State::new(Mode::Lax, Source::Python, &config);
        let expected = Value::Uuid(Uuid::parse_str(TEXT).unwrap());
        assert_eq!(coerce_uuid(&Value::str(TEXT), &state).unwrap(), expected);

        let Value::Uuid(u) = &expected else {
            panic!("expected uuid");
        };
        let raw = Value::Bytes(u.as_bytes().to_vec());
        assert_eq!(coerce_uuid(&raw, &state).unwrap(), expected);
        assert_eq!(
            coerce_uuid(&Value::Bytes(TEXT.as_bytes().to_vec()), &state).unwrap(),
            expected
        );
    }

    #[test]
    fn test_malformed_text_is_parsing_error() {
        let config = SchemaConfig::default();
        let state = State::new(Mode::Strict, Source::Json, &config);
        assert_eq!(
            coerce_uuid(&Value::str("not-a-uuid"), &state).unwrap_err().kind,
            ErrorKind::UuidParsing
        );
        let python = State::new(Mode::Strict, Source::Python, &config);
        assert_eq!(
            coerce_uuid(&Value::str(TEXT), &python).unwrap_err().kind,
            ErrorKind::TypeMismatch
        );
    }
}
