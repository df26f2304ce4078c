//! `literal[...]` and enumeration rules.
//!
//! Exact matches never reach these rules; they only handle inputs that need
//! a lax conversion before they compare equal to an allowed value.

use crate::dispatch::State;
use crate::error::{ErrorKind, RuleFailure};
use crate::rules::{expected_list, numeric, text};
use crate::target::{EnumType, Mode, Source};
use crate::value::{EnumValue, Value};

/// Index of the first candidate equal to the input after lax int or str
/// conversion. Bools never stand in for integers here.
fn lax_position(candidates: &[&Value], input: &Value) -> Option<usize> {
    if !matches!(input, Value::Bool(_))
        && candidates.iter().any(|c| matches!(c, Value::Int(_)))
        && let Ok(i) = numeric::lax_int(input)
        && let Some(pos) = candidates.iter().position(|c| **c == Value::Int(i))
    {
        return Some(pos);
    }
    if candidates.iter().any(|c| matches!(c, Value::Str(_)))
        && let Ok(s) = text::lax_str(input)
    {
        return candidates
            .iter()
            .position(|c| matches!(c, Value::Str(cs) if *cs == s));
    }
    None
}

fn describe(values: &[&Value]) -> String {
    let items: Vec<String> = values.iter().map(ToString::to_string).collect();
    expected_list(&items)
}

pub fn coerce_literal(
    values: &[Value],
    input: &Value,
    state: &State<'_>,
) -> Result<Value, RuleFailure> {
    let candidates: Vec<&Value> = values.iter().collect();
    if state.mode == Mode::Lax
        && let Some(pos) = lax_position(&candidates, input)
    {
        return Ok(values[pos].clone());
    }
    Err(RuleFailure::new(
        ErrorKind::LiteralError,
        format!("Input should be {}", describe(&candidates)),
    ))
}

pub fn coerce_enum(
    ty: &EnumType,
    input: &Value,
    state: &State<'_>,
) -> Result<Value, RuleFailure> {
    let candidates: Vec<&Value> = ty.members.iter().map(|(_, v)| v).collect();
    let position = match (state.mode, state.source, input) {
        (Mode::Strict, Source::Python, _) => {
            return Err(RuleFailure::new(
                ErrorKind::TypeMismatch,
                format!("Input should be an instance of {}", ty.name),
            ));
        }
        // A member of a different enumeration is not converted by value.
        (_, _, Value::Enum(_)) => None,
        (Mode::Strict, Source::Json, _) => candidates.iter().position(|c| *c == input),
        (Mode::Lax, _, _) => candidates
            .iter()
            .position(|c| *c == input)
            .or_else(|| lax_position(&candidates, input)),
    };
    match position {
        Some(pos) => {
            let (member, value) = &ty.members[pos];
            Ok(Value::Enum(EnumValue {
                enum_name: ty.name.clone(),
                member: member.clone(),
                value: Box::new(value.clone()),
            }))
        }
        None => Err(RuleFailure::new(
            ErrorKind::EnumError,
            format!("Input should be {}", describe(&candidates)),
        )),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;

    fn color() -> EnumType {
        EnumType::new(
            "Color",
            vec![
                ("RED".to_owned(), Value::str("red")),
                ("GREEN".to_owned(), Value::str("green")),
                ("ONE".to_owned(), Value::Int(1)),
            ],
        )
    }

    #[test]
    fn test_literal_lax_conversion() {
        let config = SchemaConfig::default();
        let lax = State::new(Mode::Lax, Source::Python, &config);
        let values = vec![Value::Int(1), Value::str("a")];
        assert_eq!(coerce_literal(&values, &Value::str("1"), &lax).unwrap(), Value::Int(1));
        assert_eq!(
            coerce_literal(&values, &Value::Bytes(b"a".to_vec()), &lax).unwrap(),
            Value::str("a")
        );
        assert_eq!(
            coerce_literal(&values, &Value::Bool(true), &lax).unwrap_err().kind,
            ErrorKind::LiteralError
        );
    }

    #[test]
    fn test_literal_strict_message_lists_choices() {
        let config = SchemaConfig::default();
        let strict = State::new(Mode::Strict, Source::Python, &config);
        let values = vec![Value::str("a"), Value::str("b")];
        let err = coerce_literal(&values, &Value::str("c"), &strict).unwrap_err();
        assert_eq!(err.kind, ErrorKind::LiteralError);
        assert_eq!(err.message, "Input should be 'a' or 'b'");
    }

    #[test]
    fn test_enum_by_value() {
        let config = SchemaConfig::default();
        let ty = color();
        let json = State::new(Mode::Strict, Source::Json, &config);
        let Value::Enum(member) = coerce_enum(&ty, &Value::str("green"), &json).unwrap() else {
            panic!("expected enum member");
        };
        assert_eq!(member.member, "GREEN");

        let lax = State::new(Mode::Lax, Source::Python, &config);
        let Value::Enum(member) = coerce_enum(&ty, &Value::str("1"), &lax).unwrap() else {
            panic!("expected enum member");
        };
        assert_eq!(member.member, "ONE");

        assert_eq!(
            coerce_enum(&ty, &Value::str("blue"), &lax).unwrap_err().kind,
            ErrorKind::EnumError
        );
    }

    #[test]
    fn test_enum_strict_python_requires_instance() {
        let config = SchemaConfig::default();
        let strict = State::new(Mode::Strict, Source::Python, &config);
        let err = coerce_enum(&color(), &Value::str("red"), &strict).unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeMismatch);
        assert_eq!(err.message, "Input should be an instance of Color");
    }
}
