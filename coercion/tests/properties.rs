//! Property tests for the dispatcher.

use coercion::{Mode, Source, TargetType, Value, dispatch};
use proptest::prelude::*;

const TRUE_WORDS: &[&str] = &["1", "on", "t", "true", "y", "yes"];
const FALSE_WORDS: &[&str] = &["0", "off", "f", "false", "n", "no"];

fn any_mode() -> impl Strategy<Value = Mode> {
    prop_oneof![Just(Mode::Lax), Just(Mode::Strict)]
}

fn any_source() -> impl Strategy<Value = Source> {
    prop_oneof![Just(Source::Python), Just(Source::Json)]
}

/// Flip the case of each letter whose bit is set in `mask`.
fn mixed_case(word: &str, mask: u32) -> String {
    word.chars()
        .enumerate()
        .map(|(i, c)| {
            if mask & (1 << (i % 32)) == 0 {
                c
            } else {
                c.to_ascii_uppercase()
            }
        })
        .collect()
}

proptest! {
    /// Values that already have the target type come back unchanged.
    #[test]
    fn exact_int_is_identity(i in any::<i64>(), mode in any_mode(), source in any_source()) {
        let input = Value::Int(i);
        prop_assert_eq!(dispatch(&TargetType::Int, &input, mode, source).unwrap(), input);
    }

    #[test]
    fn exact_str_is_identity(s in ".*", mode in any_mode(), source in any_source()) {
        let input = Value::Str(s);
        prop_assert_eq!(dispatch(&TargetType::str(), &input, mode, source).unwrap(), input);
    }

    #[test]
    fn exact_bool_is_identity(b in any::<bool>(), mode in any_mode(), source in any_source()) {
        let input = Value::Bool(b);
        prop_assert_eq!(dispatch(&TargetType::Bool, &input, mode, source).unwrap(), input);
    }

    #[test]
    fn exact_float_is_identity(f in -1.0e12_f64..1.0e12, mode in any_mode(), source in any_source()) {
        let input = Value::Float(f);
        prop_assert_eq!(dispatch(&TargetType::Float, &input, mode, source).unwrap(), input);
    }

    /// Re-validating a lax result strictly changes nothing.
    #[test]
    fn lax_int_list_revalidates_strictly(items in proptest::collection::vec(any::<i64>(), 0..16)) {
        let target = TargetType::list_of(TargetType::Int);
        let text = Value::List(items.iter().map(|i| Value::str(&i.to_string())).collect());
        let lax = dispatch(&target, &text, Mode::Lax, Source::Python).unwrap();
        let strict = dispatch(&target, &lax, Mode::Strict, Source::Python).unwrap();
        prop_assert_eq!(&lax, &strict);
        prop_assert_eq!(lax, Value::List(items.into_iter().map(Value::Int).collect()));
    }

    /// The bool word table ignores case.
    #[test]
    fn bool_words_ignore_case(
        word in prop::sample::select(TRUE_WORDS.iter().chain(FALSE_WORDS).copied().collect::<Vec<_>>()),
        mask in any::<u32>(),
    ) {
        let expected = TRUE_WORDS.contains(&word);
        let input = Value::str(&mixed_case(word, mask));
        prop_assert_eq!(
            dispatch(&TargetType::Bool, &input, Mode::Lax, Source::Python).unwrap(),
            Value::Bool(expected)
        );
    }

    /// Whatever the input, a failed container reports element locations
    /// only for the elements that failed.
    #[test]
    fn int_list_failures_point_at_bad_elements(flags in proptest::collection::vec(any::<bool>(), 1..12)) {
        let target = TargetType::list_of(TargetType::Int);
        let input = Value::List(
            flags
                .iter()
                .map(|bad| if *bad { Value::str("x") } else { Value::str("7") })
                .collect(),
        );
        let expected: Vec<String> = flags
            .iter()
            .enumerate()
            .filter(|(_, bad)| **bad)
            .map(|(i, _)| i.to_string())
            .collect();
        match dispatch(&target, &input, Mode::Lax, Source::Python) {
            Ok(_) => prop_assert!(expected.is_empty()),
            Err(error) => {
                let locations: Vec<String> =
                    error.records().iter().map(coercion::ErrorRecord::location_string).collect();
                prop_assert_eq!(locations, expected);
            }
        }
    }
}
