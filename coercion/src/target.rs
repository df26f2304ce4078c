//! Declared target types, validation mode and input source.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::registry::CoercionRule;
use crate::schema::Schema;
use crate::value::Value;

/// Strict rejects most cross-type coercion; lax attempts best-effort coercion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Lax,
    Strict,
}

impl Mode {
    #[must_use]
    pub fn from_strict(strict: bool) -> Self {
        if strict { Mode::Strict } else { Mode::Lax }
    }

    #[must_use]
    pub fn is_strict(self) -> bool {
        self == Mode::Strict
    }
}

/// Where the input came from; selects the strict-mode allowlist.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// In-memory native values.
    #[default]
    Python,
    /// Values decoded from JSON text.
    Json,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Source::Python => "python",
            Source::Json => "json",
        })
    }
}

/// Per-field string constraints. Unset keys fall back to the schema config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct StringConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub strip_whitespace: Option<bool>,
    pub to_lower: Option<bool>,
    pub to_upper: Option<bool>,
}

impl StringConstraints {
    #[must_use]
    pub fn length(min_length: Option<usize>, max_length: Option<usize>) -> Self {
        Self {
            min_length,
            max_length,
            ..Self::default()
        }
    }
}

/// Bounds on an `int`, `float` or `decimal` value.
///
/// Bounds are compared in `f64`; `multiple_of` is exact for `int` and
/// `decimal` values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct NumberConstraints {
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,
}

impl NumberConstraints {
    #[must_use]
    pub fn greater_than(mut self, bound: f64) -> Self {
        self.gt = Some(bound);
        self
    }

    #[must_use]
    pub fn greater_than_equal(mut self, bound: f64) -> Self {
        self.ge = Some(bound);
        self
    }

    #[must_use]
    pub fn less_than(mut self, bound: f64) -> Self {
        self.lt = Some(bound);
        self
    }

    #[must_use]
    pub fn less_than_equal(mut self, bound: f64) -> Self {
        self.le = Some(bound);
        self
    }

    #[must_use]
    pub fn multiple_of(mut self, step: f64) -> Self {
        self.multiple_of = Some(step);
        self
    }
}

/// Item-count bounds on a list, set, frozenset, deque or tuple, checked
/// after the elements are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LengthConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
}

impl LengthConstraints {
    #[must_use]
    pub fn new(min_length: Option<usize>, max_length: Option<usize>) -> Self {
        Self {
            min_length,
            max_length,
        }
    }
}

/// Element layout of a tuple target.
#[derive(Clone)]
pub enum TupleShape {
    /// `tuple[T, ...]` (or bare `tuple` when the element type is `None`).
    Variadic(Option<Box<TargetType>>),
    /// `tuple[A, B, ...]` with a fixed arity.
    Positional(Vec<TargetType>),
}

/// A declared enumeration: ordered `(member name, member value)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumType {
    pub name: String,
    pub members: Vec<(String, Value)>,
}

impl EnumType {
    #[must_use]
    pub fn new(name: &str, members: Vec<(String, Value)>) -> Self {
        Self {
            name: name.to_owned(),
            members,
        }
    }
}

/// The declared type of a field or value.
///
/// Built-in types are closed variants; open extension goes through
/// [`TargetType::Custom`], resolved once from a
/// [`TypeRegistry`](crate::TypeRegistry) at declaration time.
#[derive(Clone)]
pub enum TargetType {
    Any,
    None,
    Int,
    Float,
    Bool,
    Str(StringConstraints),
    Bytes,
    DateTime,
    Date,
    Time,
    Timedelta,
    Uuid,
    Decimal,
    List(Option<Box<TargetType>>),
    Set(Option<Box<TargetType>>),
    FrozenSet(Option<Box<TargetType>>),
    Deque(Option<Box<TargetType>>),
    Tuple(TupleShape),
    Dict {
        key: Option<Box<TargetType>>,
        value: Option<Box<TargetType>>,
    },
    /// Abstract sequence: list, tuple or deque; keeps the input's kind.
    Sequence(Option<Box<TargetType>>),
    /// Any container; yields a generator.
    Iterable(Option<Box<TargetType>>),
    Literal(Vec<Value>),
    Enum(Arc<EnumType>),
    Optional(Box<TargetType>),
    Model(Arc<Schema>),
    Custom(Arc<dyn CoercionRule>),
    /// An `int`, `float` or `decimal` target with numeric bounds.
    Bounded {
        inner: Box<TargetType>,
        bounds: NumberConstraints,
    },
    /// A list, set, frozenset, deque or tuple target with item-count bounds.
    Counted {
        inner: Box<TargetType>,
        length: LengthConstraints,
    },
}

impl TargetType {
    /// `str` without constraints.
    #[must_use]
    pub fn str() -> Self {
        TargetType::Str(StringConstraints::default())
    }

    #[must_use]
    pub fn list_of(elem: TargetType) -> Self {
        TargetType::List(Some(Box::new(elem)))
    }

    #[must_use]
    pub fn set_of(elem: TargetType) -> Self {
        TargetType::Set(Some(Box::new(elem)))
    }

    #[must_use]
    pub fn sequence_of(elem: TargetType) -> Self {
        TargetType::Sequence(Some(Box::new(elem)))
    }

    #[must_use]
    pub fn dict_of(key: TargetType, value: TargetType) -> Self {
        TargetType::Dict {
            key: Some(Box::new(key)),
            value: Some(Box::new(value)),
        }
    }

    #[must_use]
    pub fn optional(inner: TargetType) -> Self {
        TargetType::Optional(Box::new(inner))
    }

    /// Whether the input's runtime type already is this target's canonical
    /// representation, so it can be accepted without coercion.
    ///
    /// Containers are never exact: their elements still need validating.
    #[must_use]
    pub fn accepts_exactly(&self, input: &Value) -> bool {
        match (self, input) {
            (TargetType::Any, _)
            | (TargetType::None, Value::None)
            | (TargetType::Int, Value::Int(_))
            | (TargetType::Float, Value::Float(_))
            | (TargetType::Bool, Value::Bool(_))
            | (TargetType::Str(_), Value::Str(_))
            | (TargetType::Bytes, Value::Bytes(_))
            | (TargetType::DateTime, Value::DateTime(_))
            | (TargetType::Date, Value::Date(_))
            | (TargetType::Time, Value::Time(_))
            | (TargetType::Timedelta, Value::Timedelta(_))
            | (TargetType::Uuid, Value::Uuid(_))
            | (TargetType::Decimal, Value::Decimal(_)) => true,
            (TargetType::Literal(values), _) => values.contains(input),
            (TargetType::Enum(ty), Value::Enum(e)) => {
                e.enum_name == ty.name && ty.members.iter().any(|(name, _)| *name == e.member)
            }
            _ => false,
        }
    }

    /// Apply string constraints to a `str` (or `optional[str]`) target.
    ///
    /// Returns `None` when the target is not a string type.
    #[must_use]
    pub fn with_string_constraints(self, constraints: StringConstraints) -> Option<Self> {
        match self {
            TargetType::Str(_) => Some(TargetType::Str(constraints)),
            TargetType::Optional(inner) => inner
                .with_string_constraints(constraints)
                .map(TargetType::optional),
            _ => None,
        }
    }

    /// Bound an `int`, `float` or `decimal` (or `optional` of one) target.
    ///
    /// Returns `None` for any other target. Existing bounds are replaced.
    #[must_use]
    pub fn with_number_constraints(self, bounds: NumberConstraints) -> Option<Self> {
        match self {
            TargetType::Int | TargetType::Float | TargetType::Decimal => {
                Some(TargetType::Bounded {
                    inner: Box::new(self),
                    bounds,
                })
            }
            TargetType::Bounded { inner, .. } => Some(TargetType::Bounded { inner, bounds }),
            TargetType::Optional(inner) => inner
                .with_number_constraints(bounds)
                .map(TargetType::optional),
            _ => None,
        }
    }

    /// Bound the item count of a list, set, frozenset, deque or tuple (or
    /// `optional` of one) target.
    ///
    /// Returns `None` for any other target. Existing bounds are replaced.
    #[must_use]
    pub fn with_length_constraints(self, length: LengthConstraints) -> Option<Self> {
        match self {
            TargetType::List(_)
            | TargetType::Set(_)
            | TargetType::FrozenSet(_)
            | TargetType::Deque(_)
            | TargetType::Tuple(_) => Some(TargetType::Counted {
                inner: Box::new(self),
                length,
            }),
            TargetType::Counted { inner, .. } => Some(TargetType::Counted { inner, length }),
            TargetType::Optional(inner) => inner
                .with_length_constraints(length)
                .map(TargetType::optional),
            _ => None,
        }
    }
}

fn write_param(f: &mut fmt::Formatter<'_>, name: &str, elem: Option<&TargetType>) -> fmt::Result {
    match elem {
        Some(t) => write!(f, "{name}[{t}]"),
        None => f.write_str(name),
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Any => f.write_str("any"),
            TargetType::None => f.write_str("None"),
            TargetType::Int => f.write_str("int"),
            TargetType::Float => f.write_str("float"),
            TargetType::Bool => f.write_str("bool"),
            TargetType::Str(_) => f.write_str("str"),
            TargetType::Bytes => f.write_str("bytes"),
            TargetType::DateTime => f.write_str("datetime"),
            TargetType::Date => f.write_str("date"),
            TargetType::Time => f.write_str("time"),
            TargetType::Timedelta => f.write_str("timedelta"),
            TargetType::Uuid => f.write_str("uuid"),
            TargetType::Decimal => f.write_str("decimal"),
            TargetType::List(e) => write_param(f, "list", e.as_deref()),
            TargetType::Set(e) => write_param(f, "set", e.as_deref()),
            TargetType::FrozenSet(e) => write_param(f, "frozenset", e.as_deref()),
            TargetType::Deque(e) => write_param(f, "deque", e.as_deref()),
            TargetType::Sequence(e) => write_param(f, "sequence", e.as_deref()),
            TargetType::Iterable(e) => write_param(f, "iterable", e.as_deref()),
            TargetType::Tuple(TupleShape::Variadic(None)) => f.write_str("tuple"),
            TargetType::Tuple(TupleShape::Variadic(Some(e))) => write!(f, "tuple[{e}, ...]"),
            TargetType::Tuple(TupleShape::Positional(items)) => {
                f.write_str("tuple[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            TargetType::Dict { key, value } => match (key, value) {
                (None, None) => f.write_str("dict"),
                (k, v) => {
                    let any = TargetType::Any;
                    let k = k.as_deref().unwrap_or(&any);
                    let v = v.as_deref().unwrap_or(&any);
                    write!(f, "dict[{k}, {v}]")
                }
            },
            TargetType::Literal(values) => {
                f.write_str("literal[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{v}")?;
                }
                f.write_str("]")
            }
            TargetType::Enum(ty) => f.write_str(&ty.name),
            TargetType::Optional(inner) => write!(f, "optional[{inner}]"),
            TargetType::Model(schema) => f.write_str(schema.name()),
            TargetType::Custom(rule) => f.write_str(rule.name()),
            TargetType::Bounded { inner, .. } | TargetType::Counted { inner, .. } => {
                write!(f, "{inner}")
            }
        }
    }
}

impl fmt::Debug for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetType({self})")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_canonical_expressions() {
        assert_eq!(TargetType::list_of(TargetType::Int).to_string(), "list[int]");
        assert_eq!(
            TargetType::dict_of(TargetType::str(), TargetType::list_of(TargetType::Float)).to_string(),
            "dict[str, list[float]]"
        );
        assert_eq!(
            TargetType::Tuple(TupleShape::Variadic(Some(Box::new(TargetType::Int)))).to_string(),
            "tuple[int, ...]"
        );
        assert_eq!(
            TargetType::Literal(vec![Value::str("a"), Value::Int(1)]).to_string(),
            "literal['a', 1]"
        );
        assert_eq!(TargetType::optional(TargetType::Uuid).to_string(), "optional[uuid]");
    }

    #[test]
    fn test_exact_acceptance() {
        assert!(TargetType::Int.accepts_exactly(&Value::Int(3)));
        assert!(!TargetType::Int.accepts_exactly(&Value::Bool(true)));
        assert!(!TargetType::Float.accepts_exactly(&Value::Int(3)));
        assert!(!TargetType::list_of(TargetType::Int).accepts_exactly(&Value::List(Vec::new())));

        let literal = TargetType::Literal(vec![Value::Int(1)]);
        assert!(literal.accepts_exactly(&Value::Int(1)));
        assert!(!literal.accepts_exactly(&Value::Bool(true)));
    }

    #[test]
    fn test_string_constraints_only_apply_to_strings() {
        let constrained = TargetType::optional(TargetType::str())
            .with_string_constraints(StringConstraints::length(Some(1), None))
            .unwrap();
        let TargetType::Optional(inner) = constrained else {
            panic!("expected optional");
        };
        assert!(matches!(*inner, TargetType::Str(ref c) if c.min_length == Some(1)));

        assert!(
            TargetType::Int
                .with_string_constraints(StringConstraints::default())
                .is_none()
        );
    }

    #[test]
    fn test_number_and_length_constraints_pick_their_targets() {
        let bounds = NumberConstraints::default().greater_than(0.0);
        let bounded = TargetType::optional(TargetType::Decimal)
            .with_number_constraints(bounds)
            .unwrap();
        assert_eq!(bounded.to_string(), "optional[decimal]");
        let TargetType::Optional(inner) = &bounded else {
            panic!("expected optional");
        };
        let TargetType::Bounded { inner, bounds: kept } = &**inner else {
            panic!("expected bounds");
        };
        assert!(matches!(**inner, TargetType::Decimal));
        assert_eq!(kept.gt, Some(0.0));
        assert!(TargetType::str().with_number_constraints(bounds).is_none());

        let length = LengthConstraints::new(Some(1), Some(3));
        let counted = TargetType::set_of(TargetType::Int)
            .with_length_constraints(length)
            .unwrap();
        assert_eq!(counted.to_string(), "set[int]");
        let widened = counted
            .with_length_constraints(LengthConstraints::new(None, Some(9)))
            .unwrap();
        assert!(matches!(
            widened,
            TargetType::Counted { ref inner, length } if length.max_length == Some(9)
                && matches!(**inner, TargetType::Set(_))
        ));
        assert!(TargetType::dict_of(TargetType::str(), TargetType::Int)
            .with_length_constraints(length)
            .is_none());
    }

    #[test]
    fn test_mode_from_strict() {
        assert_eq!(Mode::from_strict(true), Mode::Strict);
        assert!(!Mode::from_strict(false).is_strict());
        assert_eq!(Mode::default(), Mode::Lax);
    }
}
