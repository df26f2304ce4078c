//! Runtime values seen by the dispatcher.
//!
//! `Value` is a closed model of the native values a caller can hand to the
//! engine, plus the two value shapes the engine itself produces (enum
//! members and validated schema instances). JSON-decoded input is a strict
//! subset: `None`, `Bool`, `Int`, `Float`, `Str`, `List` and `Dict` with
//! string keys.

use std::fmt::{self, Write as _};
use std::str::FromStr;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::ValueDecodeError;
use crate::rules::temporal;

/// A runtime value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Value>),
    Tuple(Vec<Value>),
    Set(Vec<Value>),
    FrozenSet(Vec<Value>),
    Deque(Vec<Value>),
    /// A finite iterator whose items have already been produced.
    Generator(Vec<Value>),
    /// Ordered key/value pairs; keys may be any value.
    Dict(Vec<(Value, Value)>),
    DateTime(DateTimeValue),
    Date(NaiveDate),
    Time(NaiveTime),
    Timedelta(TimeDelta),
    Uuid(Uuid),
    Decimal(Decimal),
    Enum(EnumValue),
    Model(ModelValue),
}

/// A date-time with an optional fixed UTC offset (`None` means naive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateTimeValue {
    pub local: NaiveDateTime,
    pub offset: Option<FixedOffset>,
}

/// A member of a declared enumeration.
#[derive(Debug, Clone, PartialEq)]
pub struct EnumValue {
    pub enum_name: String,
    pub member: String,
    pub value: Box<Value>,
}

/// A validated schema instance.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelValue {
    pub schema: String,
    pub fields: Vec<(String, Value)>,
}

impl ModelValue {
    /// Look up a field value by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }
}

impl DateTimeValue {
    #[must_use]
    pub fn naive(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: None,
        }
    }

    #[must_use]
    pub fn utc(local: NaiveDateTime) -> Self {
        Self {
            local,
            offset: FixedOffset::east_opt(0),
        }
    }
}

impl fmt::Display for DateTimeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.local.format("%Y-%m-%dT%H:%M:%S%.f"))?;
        if let Some(offset) = self.offset {
            write!(f, "{offset}")?;
        }
        Ok(())
    }
}

impl Value {
    /// Convenience constructor for string values.
    #[must_use]
    pub fn str(s: &str) -> Self {
        Value::Str(s.to_owned())
    }

    /// Runtime type name, as reported in error records.
    #[must_use]
    pub fn type_name(&self) -> &str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::Bytes(_) => "bytes",
            Value::List(_) => "list",
            Value::Tuple(_) => "tuple",
            Value::Set(_) => "set",
            Value::FrozenSet(_) => "frozenset",
            Value::Deque(_) => "deque",
            Value::Generator(_) => "generator",
            Value::Dict(_) => "dict",
            Value::DateTime(_) => "datetime",
            Value::Date(_) => "date",
            Value::Time(_) => "time",
            Value::Timedelta(_) => "timedelta",
            Value::Uuid(_) => "UUID",
            Value::Decimal(_) => "Decimal",
            Value::Enum(e) => &e.enum_name,
            Value::Model(m) => &m.schema,
        }
    }

    /// Items of any array-like value.
    #[must_use]
    pub fn as_items(&self) -> Option<&[Value]> {
        match self {
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items)
            | Value::Deque(items)
            | Value::Generator(items) => Some(items),
            _ => None,
        }
    }

    /// The value as decoded JSON presents it.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::None,
            serde_json::Value::Bool(b) => Value::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::Str(s.clone()),
            serde_json::Value::Array(items) => Value::List(items.iter().map(Value::from_json).collect()),
            serde_json::Value::Object(map) => Value::Dict(
                map.iter()
                    .map(|(k, v)| (Value::Str(k.clone()), Value::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Decode the tagged JSON form of a native value.
    ///
    /// A single-key object whose key starts with `$` names a native type
    /// (`$tuple`, `$set`, `$frozenset`, `$deque`, `$generator`, `$bytes`,
    /// `$bytes_hex`, `$datetime`, `$date`, `$time`, `$timedelta`, `$uuid`,
    /// `$decimal`, `$dict`); everything else decodes as [`Value::from_json`]
    /// does, recursively.
    ///
    /// # Errors
    /// Returns [`ValueDecodeError`] for unknown tags or malformed tag bodies.
    pub fn from_tagged_json(json: &serde_json::Value) -> Result<Self, ValueDecodeError> {
        decode_tagged(json, "$")
    }

    /// Plain JSON rendering used by reports.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as J;
        match self {
            Value::None => J::Null,
            Value::Bool(b) => J::Bool(*b),
            Value::Int(i) => J::from(*i),
            Value::Float(f) => {
                serde_json::Number::from_f64(*f).map_or_else(|| J::String(float_repr(*f)), J::Number)
            }
            Value::Str(s) => J::String(s.clone()),
            Value::Bytes(b) => J::String(String::from_utf8_lossy(b).into_owned()),
            Value::List(items)
            | Value::Tuple(items)
            | Value::Set(items)
            | Value::FrozenSet(items)
            | Value::Deque(items)
            | Value::Generator(items) => J::Array(items.iter().map(Value::to_json).collect()),
            Value::Dict(entries) => {
                if entries.iter().all(|(k, _)| matches!(k, Value::Str(_))) {
                    J::Object(
                        entries
                            .iter()
                            .filter_map(|(k, v)| match k {
                                Value::Str(s) => Some((s.clone(), v.to_json())),
                                _ => None,
                            })
                            .collect(),
                    )
                } else {
                    J::Array(
                        entries
                            .iter()
                            .map(|(k, v)| J::Array(vec![k.to_json(), v.to_json()]))
                            .collect(),
                    )
                }
            }
            Value::DateTime(dt) => J::String(dt.to_string()),
            Value::Date(d) => J::String(d.to_string()),
            Value::Time(t) => J::String(t.to_string()),
            Value::Timedelta(td) => {
                let seconds = f64::from(td.subsec_nanos()).mul_add(1e-9, to_f64(td.num_seconds()));
                serde_json::Number::from_f64(seconds).map_or(J::Null, J::Number)
            }
            Value::Uuid(u) => J::String(u.hyphenated().to_string()),
            Value::Decimal(d) => J::String(d.to_string()),
            Value::Enum(e) => e.value.to_json(),
            Value::Model(m) => J::Object(
                m.fields
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[allow(clippy::cast_precision_loss)]
fn to_f64(i: i64) -> f64 {
    i as f64
}

fn decode_tagged(json: &serde_json::Value, path: &str) -> Result<Value, ValueDecodeError> {
    let fail = |cause: String| ValueDecodeError {
        path: path.to_owned(),
        cause,
    };

    match json {
        serde_json::Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| decode_tagged(v, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        serde_json::Value::Object(map) => {
            let tagged = map
                .iter()
                .next()
                .filter(|(k, _)| map.len() == 1 && k.starts_with('$'));
            let Some((tag, body)) = tagged else {
                let mut entries = Vec::with_capacity(map.len());
                for (k, v) in map {
                    entries.push((Value::Str(k.clone()), decode_tagged(v, &format!("{path}.{k}"))?));
                }
                return Ok(Value::Dict(entries));
            };

            let inner_path = format!("{path}.{tag}");
            let items = || -> Result<Vec<Value>, ValueDecodeError> {
                match decode_tagged(body, &inner_path)? {
                    Value::List(items) => Ok(items),
                    _ => Err(fail(format!("'{tag}' expects an array"))),
                }
            };
            let text = || tag_text(body, tag, path);

            match tag.as_str() {
                "$tuple" => items().map(Value::Tuple),
                "$set" => items().map(Value::Set),
                "$frozenset" => items().map(Value::FrozenSet),
                "$deque" => items().map(Value::Deque),
                "$generator" => items().map(Value::Generator),
                "$bytes" => text().map(|s| Value::Bytes(s.as_bytes().to_vec())),
                "$bytes_hex" => decode_hex(text()?)
                    .map(Value::Bytes)
                    .ok_or_else(|| fail("invalid hex string".to_owned())),
                "$datetime" => temporal::parse_datetime(text()?, true)
                    .map(Value::DateTime)
                    .ok_or_else(|| fail("invalid datetime".to_owned())),
                "$date" => temporal::parse_date(text()?)
                    .map(Value::Date)
                    .ok_or_else(|| fail("invalid date".to_owned())),
                "$time" => temporal::parse_time(text()?)
                    .map(Value::Time)
                    .ok_or_else(|| fail("invalid time".to_owned())),
                "$timedelta" => body
                    .as_f64()
                    .and_then(temporal::timedelta_from_seconds)
                    .map(Value::Timedelta)
                    .ok_or_else(|| fail("'$timedelta' expects a number of seconds".to_owned())),
                "$uuid" => Uuid::parse_str(text()?)
                    .map(Value::Uuid)
                    .map_err(|e| fail(e.to_string())),
                "$decimal" => Decimal::from_str(text()?)
                    .map(Value::Decimal)
                    .map_err(|e| fail(e.to_string())),
                "$dict" => {
                    let mut entries = Vec::new();
                    for pair in items()? {
                        match pair {
                            Value::List(mut kv) if kv.len() == 2 => {
                                let v = kv.pop().unwrap_or(Value::None);
                                let k = kv.pop().unwrap_or(Value::None);
                                entries.push((k, v));
                            }
                            _ => return Err(fail("'$dict' expects [key, value] pairs".to_owned())),
                        }
                    }
                    Ok(Value::Dict(entries))
                }
                other => Err(fail(format!("unknown tag '{other}'"))),
            }
        }
        scalar => Ok(Value::from_json(scalar)),
    }
}

fn tag_text<'a>(body: &'a serde_json::Value, tag: &str, path: &str) -> Result<&'a str, ValueDecodeError> {
    body.as_str().ok_or_else(|| ValueDecodeError {
        path: path.to_owned(),
        cause: format!("'{tag}' expects a string"),
    })
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Python-style float repr (`1.0`, `0.1`, `inf`, `nan`).
#[must_use]
pub fn float_repr(f: f64) -> String {
    if f.is_nan() {
        "nan".to_owned()
    } else if f.is_infinite() {
        if f > 0.0 { "inf" } else { "-inf" }.to_owned()
    } else if f.fract() == 0.0 && f.abs() < 1e16 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

fn write_str_repr(f: &mut fmt::Formatter<'_>, s: &str) -> fmt::Result {
    f.write_char('\'')?;
    for c in s.chars() {
        match c {
            '\\' => f.write_str("\\\\")?,
            '\'' => f.write_str("\\'")?,
            '\n' => f.write_str("\\n")?,
            '\r' => f.write_str("\\r")?,
            '\t' => f.write_str("\\t")?,
            c if c.is_control() => write!(f, "\\x{:02x}", u32::from(c))?,
            c => f.write_char(c)?,
        }
    }
    f.write_char('\'')
}

fn write_bytes_repr(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("b'")?;
    for &b in bytes {
        match b {
            b'\\' => f.write_str("\\\\")?,
            b'\'' => f.write_str("\\'")?,
            b'\n' => f.write_str("\\n")?,
            0x20..=0x7e => f.write_char(char::from(b))?,
            _ => write!(f, "\\x{b:02x}")?,
        }
    }
    f.write_char('\'')
}

fn write_seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{item}")?;
    }
    Ok(())
}

/// Python-like repr, used for `input_value` in human-readable errors.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("None"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => f.write_str(&float_repr(*x)),
            Value::Str(s) => write_str_repr(f, s),
            Value::Bytes(b) => write_bytes_repr(f, b),
            Value::List(items) => {
                f.write_char('[')?;
                write_seq(f, items)?;
                f.write_char(']')
            }
            Value::Tuple(items) => {
                f.write_char('(')?;
                write_seq(f, items)?;
                if items.len() == 1 {
                    f.write_char(',')?;
                }
                f.write_char(')')
            }
            Value::Set(items) if items.is_empty() => f.write_str("set()"),
            Value::Set(items) => {
                f.write_char('{')?;
                write_seq(f, items)?;
                f.write_char('}')
            }
            Value::FrozenSet(items) => {
                f.write_str("frozenset({")?;
                write_seq(f, items)?;
                f.write_str("})")
            }
            Value::Deque(items) => {
                f.write_str("deque([")?;
                write_seq(f, items)?;
                f.write_str("])")
            }
            Value::Generator(_) => f.write_str("<generator>"),
            Value::Dict(entries) => {
                f.write_char('{')?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_char('}')
            }
            Value::DateTime(dt) => write!(f, "datetime('{dt}')"),
            Value::Date(d) => write!(f, "date('{d}')"),
            Value::Time(t) => write!(f, "time('{t}')"),
            Value::Timedelta(td) => write!(f, "timedelta('{td}')"),
            Value::Uuid(u) => write!(f, "UUID('{}')", u.hyphenated()),
            Value::Decimal(d) => write!(f, "Decimal('{d}')"),
            Value::Enum(e) => write!(f, "<{}.{}: {}>", e.enum_name, e.member, e.value),
            Value::Model(m) => {
                write!(f, "{}(", m.schema)?;
                for (i, (k, v)) in m.fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                f.write_char(')')
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_repr_scalars() {
        assert_eq!(Value::None.to_string(), "None");
        assert_eq!(Value::Bool(true).to_string(), "True");
        assert_eq!(Value::Float(1.0).to_string(), "1.0");
        assert_eq!(Value::Float(0.25).to_string(), "0.25");
        assert_eq!(Value::Float(f64::INFINITY).to_string(), "inf");
        assert_eq!(Value::str("it's").to_string(), r"'it\'s'");
        assert_eq!(Value::Bytes(vec![b'a', 0xff]).to_string(), r"b'a\xff'");
    }

    #[test]
    fn test_repr_containers() {
        let tuple = Value::Tuple(vec![Value::Int(1)]);
        assert_eq!(tuple.to_string(), "(1,)");
        assert_eq!(Value::Set(Vec::new()).to_string(), "set()");
        let dict = Value::Dict(vec![(Value::str("a"), Value::List(vec![Value::Int(1), Value::Int(2)]))]);
        assert_eq!(dict.to_string(), "{'a': [1, 2]}");
    }

    #[test]
    fn test_from_json_shapes() {
        let value = Value::from_json(&json!({"b": [1, 2.5, null], "a": "x"}));
        let Value::Dict(entries) = value else {
            panic!("expected a dict");
        };
        // Object key order is preserved.
        assert_eq!(entries[0].0, Value::str("b"));
        assert_eq!(
            entries[0].1,
            Value::List(vec![Value::Int(1), Value::Float(2.5), Value::None])
        );
        assert_eq!(entries[1], (Value::str("a"), Value::str("x")));
    }

    #[test]
    fn test_from_json_large_unsigned_becomes_float() {
        let value = Value::from_json(&json!(u64::MAX));
        assert!(matches!(value, Value::Float(_)));
    }

    #[test]
    fn test_tagged_native_values() {
        let value = Value::from_tagged_json(&json!({
            "t": {"$tuple": [1, {"$set": ["a"]}]},
            "u": {"$uuid": "12345678-1234-1234-1234-123456789012"},
            "b": {"$bytes_hex": "00ff"},
            "d": {"$dict": [[1, "one"]]}
        }))
        .unwrap();
        let Value::Dict(entries) = value else {
            panic!("expected a dict");
        };
        assert_eq!(
            entries[0].1,
            Value::Tuple(vec![Value::Int(1), Value::Set(vec![Value::str("a")])])
        );
        assert!(matches!(entries[1].1, Value::Uuid(_)));
        assert_eq!(entries[2].1, Value::Bytes(vec![0x00, 0xff]));
        assert_eq!(entries[3].1, Value::Dict(vec![(Value::Int(1), Value::str("one"))]));
    }

    #[test]
    fn test_tagged_errors_name_path() {
        let err = Value::from_tagged_json(&json!({"x": [{"$nope": 1}]})).unwrap_err();
        assert_eq!(err.path, "$.x[0]");
        assert!(err.cause.contains("unknown tag"));

        let err = Value::from_tagged_json(&json!({"$tuple": "abc"})).unwrap_err();
        assert!(err.cause.contains("expects an array"));
    }

    #[test]
    fn test_to_json_rendering() {
        let model = Value::Model(ModelValue {
            schema: "User".to_owned(),
            fields: vec![
                ("id".to_owned(), Value::Int(1)),
                ("tags".to_owned(), Value::Set(vec![Value::str("a")])),
            ],
        });
        assert_eq!(model.to_json(), json!({"id": 1, "tags": ["a"]}));
        assert_eq!(Value::Float(f64::NAN).to_json(), json!("nan"));
        let mixed = Value::Dict(vec![(Value::Int(1), Value::Bool(true))]);
        assert_eq!(mixed.to_json(), json!([[1, true]]));
    }
}
