//! Container rules: list, tuple, set, frozenset, deque, sequence, iterable
//! and dict.
//!
//! Every element is validated even after a failure; element errors are
//! gathered under one `ContainerElementError` record for the container.

use crate::dispatch::{State, validate_value};
use crate::error::{ErrorKind, ErrorRecord, LocItem, RuleFailure};
use crate::rules::text::plural;
use crate::target::{LengthConstraints, Mode, Source, TargetType, TupleShape};
use crate::value::Value;

/// Location step for a dict key.
pub fn key_location(key: &Value) -> LocItem {
    match key {
        Value::Str(s) => LocItem::Key(s.clone()),
        Value::Int(i) => usize::try_from(*i).map_or_else(|_| LocItem::Key(i.to_string()), LocItem::Index),
        other => LocItem::Key(other.to_string()),
    }
}

fn kind_name(target: &TargetType) -> &'static str {
    match target {
        TargetType::Tuple(_) => "tuple",
        TargetType::Set(_) => "set",
        TargetType::FrozenSet(_) => "frozenset",
        TargetType::Deque(_) => "deque",
        TargetType::Sequence(_) => "sequence",
        TargetType::Iterable(_) => "iterable",
        _ => "list",
    }
}

fn element_type(target: &TargetType) -> Option<&TargetType> {
    match target {
        TargetType::List(e)
        | TargetType::Set(e)
        | TargetType::FrozenSet(e)
        | TargetType::Deque(e)
        | TargetType::Sequence(e)
        | TargetType::Iterable(e)
        | TargetType::Tuple(TupleShape::Variadic(e)) => e.as_deref(),
        _ => None,
    }
}

/// A string would iterate into characters; abstract sequences of strings
/// reject it outright instead.
fn rejects_as_string_sequence(target: &TargetType) -> bool {
    matches!(target, TargetType::Sequence(_) | TargetType::Iterable(_))
        && matches!(
            element_type(target),
            None | Some(TargetType::Any | TargetType::Str(_) | TargetType::Bytes)
        )
}

fn accepts_kind(target: &TargetType, input: &Value, state: &State<'_>) -> bool {
    if state.source == Source::Json && matches!(input, Value::List(_)) {
        return true;
    }
    match (state.mode, target, input) {
        (_, TargetType::Sequence(_), Value::List(_) | Value::Tuple(_) | Value::Deque(_)) => true,
        (_, TargetType::Sequence(_), _) => false,
        (_, TargetType::Iterable(_), _) => input.as_items().is_some(),
        (Mode::Strict, TargetType::List(_), Value::List(_))
        | (Mode::Strict, TargetType::Tuple(_), Value::Tuple(_))
        | (Mode::Strict, TargetType::Set(_), Value::Set(_))
        | (Mode::Strict, TargetType::FrozenSet(_), Value::FrozenSet(_))
        | (Mode::Strict, TargetType::Deque(_), Value::Deque(_)) => true,
        (Mode::Strict, _, _) => false,
        (Mode::Lax, _, _) => input.as_items().is_some(),
    }
}

fn mismatch(target: &TargetType, input: &Value) -> Vec<ErrorRecord> {
    let message = match target {
        TargetType::Iterable(_) => "Input should be iterable".to_owned(),
        _ => format!("Input should be a valid {}", kind_name(target)),
    };
    vec![ErrorRecord::new(ErrorKind::TypeMismatch, message, input)]
}

/// `TooShort`/`TooLong` when `got` falls outside `min..=max`.
fn count_failure(
    label: &str,
    got: usize,
    min: Option<usize>,
    max: Option<usize>,
) -> Option<RuleFailure> {
    let (kind, bound, expected) = match (min, max) {
        (Some(min), _) if got < min => (ErrorKind::TooShort, "least", min),
        (_, Some(max)) if got > max => (ErrorKind::TooLong, "most", max),
        _ => return None,
    };
    Some(RuleFailure::new(
        kind,
        format!(
            "{label} should have at {bound} {expected} item{} after validation, not {got}",
            plural(expected)
        ),
    ))
}

/// Check a positional tuple's arity before looking at elements.
fn check_arity(expected: usize, input: &Value, items: &[Value]) -> Result<(), Vec<ErrorRecord>> {
    match count_failure("Tuple", items.len(), Some(expected), Some(expected)) {
        Some(failure) => Err(vec![failure.into_record(input)]),
        None => Ok(()),
    }
}

/// Check a validated container's item count.
pub fn check_length(
    value: Value,
    target: &TargetType,
    length: &LengthConstraints,
) -> Result<Value, RuleFailure> {
    let Some(count) = value.as_items().map(<[Value]>::len) else {
        return Ok(value);
    };
    let label = match target {
        TargetType::Tuple(_) => "Tuple",
        TargetType::Set(_) => "Set",
        TargetType::FrozenSet(_) => "Frozenset",
        TargetType::Deque(_) => "Deque",
        _ => "List",
    };
    match count_failure(label, count, length.min_length, length.max_length) {
        Some(failure) => Err(failure),
        None => Ok(value),
    }
}

fn dedupe(items: Vec<Value>) -> Vec<Value> {
    let mut out: Vec<Value> = Vec::with_capacity(items.len());
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

pub fn validate_array(
    target: &TargetType,
    input: &Value,
    state: &State<'_>,
) -> Result<Value, Vec<ErrorRecord>> {
    if matches!(input, Value::Str(_) | Value::Bytes(_)) {
        if rejects_as_string_sequence(target) {
            return Err(vec![ErrorRecord::new(
                ErrorKind::SequenceStringRejected,
                format!(
                    "'{}' instances are not allowed as a Sequence value",
                    input.type_name()
                ),
                input,
            )]);
        }
        return Err(mismatch(target, input));
    }
    let items = match input.as_items() {
        Some(items) if accepts_kind(target, input, state) => items,
        _ => return Err(mismatch(target, input)),
    };
    if let TargetType::Tuple(TupleShape::Positional(shape)) = target {
        check_arity(shape.len(), input, items)?;
    }

    let mut validated = Vec::with_capacity(items.len());
    let mut nested = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let elem = match target {
            TargetType::Tuple(TupleShape::Positional(shape)) => shape.get(index),
            _ => element_type(target),
        };
        match elem {
            None => validated.push(item.clone()),
            Some(elem) => match validate_value(elem, item, state) {
                Ok(value) => validated.push(value),
                Err(errors) => nested.extend(
                    errors
                        .into_iter()
                        .map(|e| e.prefixed(LocItem::Index(index))),
                ),
            },
        }
    }
    if !nested.is_empty() {
        return Err(vec![ErrorRecord::container(input, nested, items.len())]);
    }

    Ok(match target {
        TargetType::Tuple(_) => Value::Tuple(validated),
        TargetType::Set(_) => Value::Set(dedupe(validated)),
        TargetType::FrozenSet(_) => Value::FrozenSet(dedupe(validated)),
        TargetType::Deque(_) => Value::Deque(validated),
        TargetType::Iterable(_) => Value::Generator(validated),
        TargetType::Sequence(_) => match input {
            Value::Tuple(_) => Value::Tuple(validated),
            Value::Deque(_) => Value::Deque(validated),
            _ => Value::List(validated),
        },
        _ => Value::List(validated),
    })
}

pub fn validate_dict(
    key_type: Option<&TargetType>,
    value_type: Option<&TargetType>,
    input: &Value,
    state: &State<'_>,
) -> Result<Value, Vec<ErrorRecord>> {
    let Value::Dict(entries) = input else {
        return Err(vec![ErrorRecord::new(
            ErrorKind::TypeMismatch,
            "Input should be a valid dictionary",
            input,
        )]);
    };

    let mut validated: Vec<(Value, Value)> = Vec::with_capacity(entries.len());
    let mut nested = Vec::new();
    for (key, value) in entries {
        let location = key_location(key);
        let new_key = match key_type {
            Some(t) => validate_value(t, key, state).map_err(|errors| {
                errors
                    .into_iter()
                    .map(|e| {
                        e.prefixed(LocItem::from("[key]"))
                            .prefixed(location.clone())
                    })
                    .collect::<Vec<_>>()
            }),
            None => Ok(key.clone()),
        };
        let new_value = match value_type {
            Some(t) => validate_value(t, value, state).map_err(|errors| {
                errors
                    .into_iter()
                    .map(|e| e.prefixed(location.clone()))
                    .collect::<Vec<_>>()
            }),
            None => Ok(value.clone()),
        };
        match (new_key, new_value) {
            (Ok(k), Ok(v)) => {
                // Keys that coerce to the same value collapse; the last one wins.
                if let Some(slot) = validated.iter_mut().find(|(existing, _)| *existing == k) {
                    slot.1 = v;
                } else {
                    validated.push((k, v));
                }
            }
            (k, v) => {
                nested.extend(k.err().unwrap_or_default());
                nested.extend(v.err().unwrap_or_default());
            }
        }
    }
    if !nested.is_empty() {
        return Err(vec![ErrorRecord::container(input, nested, entries.len())]);
    }
    Ok(Value::Dict(validated))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::config::SchemaConfig;

    fn run(target: &TargetType, input: &Value, mode: Mode) -> Result<Value, Vec<ErrorRecord>> {
        let config = SchemaConfig::default();
        validate_value(target, input, &State::new(mode, Source::Python, &config))
    }

    #[test]
    fn test_key_location() {
        assert_eq!(key_location(&Value::str("a")), LocItem::Key("a".to_owned()));
        assert_eq!(key_location(&Value::Int(3)), LocItem::Index(3));
        assert_eq!(key_location(&Value::Int(-1)), LocItem::Key("-1".to_owned()));
    }

    #[test]
    fn test_lax_set_from_list_dedupes_in_order() {
        let input = Value::List(vec![Value::Int(2), Value::str("2"), Value::Int(1)]);
        let out = run(&TargetType::set_of(TargetType::Int), &input, Mode::Lax).unwrap();
        assert_eq!(out, Value::Set(vec![Value::Int(2), Value::Int(1)]));
    }

    #[test]
    fn test_strict_rejects_other_container_kinds() {
        let input = Value::Tuple(vec![Value::Int(1)]);
        let errors = run(&TargetType::list_of(TargetType::Int), &input, Mode::Strict).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::TypeMismatch);
        assert_eq!(errors[0].message, "Input should be a valid list");
    }

    #[test]
    fn test_sequence_keeps_input_kind() {
        let input = Value::Tuple(vec![Value::str("a")]);
        let out = run(&TargetType::sequence_of(TargetType::str()), &input, Mode::Lax).unwrap();
        assert_eq!(out, Value::Tuple(vec![Value::str("a")]));

        let set = Value::Set(vec![Value::str("a")]);
        assert!(run(&TargetType::sequence_of(TargetType::str()), &set, Mode::Lax).is_err());
    }

    #[test]
    fn test_positional_tuple_arity() {
        let target = TargetType::Tuple(TupleShape::Positional(vec![TargetType::Int, TargetType::str()]));
        let short = Value::Tuple(vec![Value::Int(1)]);
        assert_eq!(run(&target, &short, Mode::Lax).unwrap_err()[0].kind, ErrorKind::TooShort);
        let long = Value::Tuple(vec![Value::Int(1), Value::str("a"), Value::None]);
        assert_eq!(run(&target, &long, Mode::Lax).unwrap_err()[0].kind, ErrorKind::TooLong);
        let ok = Value::List(vec![Value::str("7"), Value::str("a")]);
        assert_eq!(
            run(&target, &ok, Mode::Lax).unwrap(),
            Value::Tuple(vec![Value::Int(7), Value::str("a")])
        );
    }

    #[test]
    fn test_item_count_is_checked_after_validation() {
        let target = TargetType::set_of(TargetType::Int)
            .with_length_constraints(LengthConstraints::new(Some(2), Some(3)))
            .unwrap();
        let collapses = Value::List(vec![Value::Int(1), Value::str("1")]);
        let errors = run(&target, &collapses, Mode::Lax).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::TooShort);
        assert_eq!(
            errors[0].message,
            "Set should have at least 2 items after validation, not 1"
        );
        assert_eq!(errors[0].input_value, collapses);

        let four = Value::List((1..=4).map(Value::Int).collect());
        let errors = run(&target, &four, Mode::Lax).unwrap_err();
        assert_eq!(errors[0].kind, ErrorKind::TooLong);
        assert_eq!(
            errors[0].message,
            "Set should have at most 3 items after validation, not 4"
        );

        let single = TargetType::list_of(TargetType::Int)
            .with_length_constraints(LengthConstraints::new(None, Some(1)))
            .unwrap();
        let pair = Value::List(vec![Value::Int(1), Value::Int(2)]);
        let errors = run(&single, &pair, Mode::Strict).unwrap_err();
        assert_eq!(
            errors[0].message,
            "List should have at most 1 item after validation, not 2"
        );
    }

    #[test]
    fn test_element_failures_win_over_item_count() {
        let target = TargetType::list_of(TargetType::Int)
            .with_length_constraints(LengthConstraints::new(Some(3), None))
            .unwrap();
        let errors = run(&target, &Value::List(vec![Value::str("x")]), Mode::Lax).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ErrorKind::ContainerElementError);
    }

    #[test]
    fn test_dict_key_and_value_locations() {
        let target = TargetType::dict_of(TargetType::Int, TargetType::Int);
        let input = Value::Dict(vec![
            (Value::str("x"), Value::Int(1)),
            (Value::str("2"), Value::str("y")),
        ]);
        let errors = run(&target, &input, Mode::Lax).unwrap_err();
        assert_eq!(errors.len(), 1);
        let nested = &errors[0].nested;
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].location_string(), "x.[key]");
        assert_eq!(nested[1].location_string(), "2");
    }

    #[test]
    fn test_iterable_yields_generator() {
        let input = Value::Set(vec![Value::Int(1)]);
        let target = TargetType::Iterable(Some(Box::new(TargetType::Int)));
        assert_eq!(
            run(&target, &input, Mode::Strict).unwrap(),
            Value::Generator(vec![Value::Int(1)])
        );
    }
}
