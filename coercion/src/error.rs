//! Error types: per-failure records, the aggregate validation error, and
//! declaration-time defects.

use std::fmt;

use coercion_type::TypeExprError;
use serde::Serialize;
use thiserror::Error;

use crate::value::Value;

/// Machine-readable tag of a single validation failure.
///
/// The tag is the stable contract; message text is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ErrorKind {
    /// The input's runtime type is not accepted for the target in this mode.
    TypeMismatch,
    IntParsing,
    /// A float with a fractional part was given for an integer.
    IntFromFloat,
    FloatParsing,
    /// NaN or infinity where only finite numbers are allowed.
    FiniteNumber,
    BoolParsing,
    /// Bytes that are not valid UTF-8 were given for a string.
    StringUnicode,
    StringTooShort,
    StringTooLong,
    /// A container has fewer items than its arity or minimum length.
    TooShort,
    /// A container has more items than its arity or maximum length.
    TooLong,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    MultipleOf,
    DateTimeParsing,
    DateParsing,
    /// A datetime or timestamp with a non-zero time was given for a date.
    DateFromDateTimeInexact,
    TimeParsing,
    TimedeltaParsing,
    UuidParsing,
    DecimalParsing,
    LiteralError,
    EnumError,
    MissingField,
    ExtraFieldForbidden,
    /// A bare `str`/`bytes` given for a sequence of strings or bytes.
    SequenceStringRejected,
    /// One or more elements of a container failed; see `nested`.
    ContainerElementError,
    JsonInvalid,
    /// Raised by a registered custom rule.
    ValueError,
}

impl ErrorKind {
    /// The snake_case tag, identical to the serialized form.
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            ErrorKind::TypeMismatch => "type_mismatch",
            ErrorKind::IntParsing => "int_parsing",
            ErrorKind::IntFromFloat => "int_from_float",
            ErrorKind::FloatParsing => "float_parsing",
            ErrorKind::FiniteNumber => "finite_number",
            ErrorKind::BoolParsing => "bool_parsing",
            ErrorKind::StringUnicode => "string_unicode",
            ErrorKind::StringTooShort => "string_too_short",
            ErrorKind::StringTooLong => "string_too_long",
            ErrorKind::TooShort => "too_short",
            ErrorKind::TooLong => "too_long",
            ErrorKind::GreaterThan => "greater_than",
            ErrorKind::GreaterThanEqual => "greater_than_equal",
            ErrorKind::LessThan => "less_than",
            ErrorKind::LessThanEqual => "less_than_equal",
            ErrorKind::MultipleOf => "multiple_of",
            ErrorKind::DateTimeParsing => "date_time_parsing",
            ErrorKind::DateParsing => "date_parsing",
            ErrorKind::DateFromDateTimeInexact => "date_from_date_time_inexact",
            ErrorKind::TimeParsing => "time_parsing",
            ErrorKind::TimedeltaParsing => "timedelta_parsing",
            ErrorKind::UuidParsing => "uuid_parsing",
            ErrorKind::DecimalParsing => "decimal_parsing",
            ErrorKind::LiteralError => "literal_error",
            ErrorKind::EnumError => "enum_error",
            ErrorKind::MissingField => "missing_field",
            ErrorKind::ExtraFieldForbidden => "extra_field_forbidden",
            ErrorKind::SequenceStringRejected => "sequence_string_rejected",
            ErrorKind::ContainerElementError => "container_element_error",
            ErrorKind::JsonInvalid => "json_invalid",
            ErrorKind::ValueError => "value_error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One step of an error location: a field/key name or a container index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum LocItem {
    Key(String),
    Index(usize),
}

impl fmt::Display for LocItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocItem::Key(k) => f.write_str(k),
            LocItem::Index(i) => write!(f, "{i}"),
        }
    }
}

impl From<&str> for LocItem {
    fn from(key: &str) -> Self {
        LocItem::Key(key.to_owned())
    }
}

impl From<usize> for LocItem {
    fn from(index: usize) -> Self {
        LocItem::Index(index)
    }
}

/// The failure half of a single coercion rule: a kind and a message,
/// without location or input (the dispatcher adds those).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl RuleFailure {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Attach the offending input, producing a record with an empty location.
    #[must_use]
    pub fn into_record(self, input: &Value) -> ErrorRecord {
        ErrorRecord::new(self.kind, self.message, input)
    }
}

/// A single validation failure at a specific location.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[non_exhaustive]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    /// Path from the validated root to the failing value.
    pub location: Vec<LocItem>,
    /// Human-readable description; not a stable contract.
    pub message: String,
    /// The original, unconverted input.
    pub input_value: Value,
    /// Runtime type name of `input_value`.
    pub input_type: String,
    /// Element records of a `ContainerElementError`, with locations
    /// relative to this record. Empty in the flat view.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nested: Vec<ErrorRecord>,
}

impl ErrorRecord {
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>, input: &Value) -> Self {
        Self {
            kind,
            location: Vec::new(),
            message: message.into(),
            input_value: input.clone(),
            input_type: input.type_name().to_owned(),
            nested: Vec::new(),
        }
    }

    /// Wrap failed element records of a container.
    #[must_use]
    pub fn container(input: &Value, nested: Vec<ErrorRecord>, total: usize) -> Self {
        let failed = nested.len();
        let mut record = Self::new(
            ErrorKind::ContainerElementError,
            format!("{failed} of {total} element(s) failed validation"),
            input,
        );
        record.nested = nested;
        record
    }

    /// Prepend a location step (used as errors bubble up to parents).
    #[must_use]
    pub fn prefixed(mut self, item: LocItem) -> Self {
        self.location.insert(0, item);
        self
    }

    /// Location rendered as dot-separated steps (`items.3.name`).
    #[must_use]
    pub fn location_string(&self) -> String {
        self.location
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Flatten container wrappers into leaf records with absolute locations.
    fn flatten_into(&self, prefix: &[LocItem], out: &mut Vec<ErrorRecord>) {
        let mut location = prefix.to_vec();
        location.extend(self.location.iter().cloned());
        if self.nested.is_empty() {
            let mut leaf = self.clone();
            leaf.location = location;
            out.push(leaf);
        } else {
            for child in &self.nested {
                child.flatten_into(&location, out);
            }
        }
    }

    /// Format the record for human-readable output.
    ///
    /// `{location}\n  {message} [kind=.., input_value=.., input_type=..]`;
    /// the location line is omitted for root-level failures. Nested records
    /// are indented one level per container.
    #[must_use]
    pub fn format_human_readable(&self) -> String {
        let mut out = String::new();
        self.write_human(&mut out, 0);
        out
    }

    fn write_human(&self, out: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        if !self.location.is_empty() {
            out.push_str(&indent);
            out.push_str(&self.location_string());
            out.push('\n');
        }
        out.push_str(&indent);
        out.push_str("  ");
        out.push_str(&self.message);
        out.push_str(" [kind=");
        out.push_str(self.kind.tag());
        out.push_str(", input_value=");
        out.push_str(&self.input_value.to_string());
        out.push_str(", input_type=");
        out.push_str(&self.input_type);
        out.push(']');
        for child in &self.nested {
            out.push('\n');
            child.write_human(out, depth + 1);
        }
    }
}

/// The aggregate failure of one top-level validation call.
///
/// Holds every record of the call. [`records`](Self::records) is the flat
/// view (one leaf record per failure, absolute locations); [`grouped`](Self::grouped)
/// keeps container failures folded into `ContainerElementError` records.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    title: String,
    #[serde(rename = "errors")]
    records: Vec<ErrorRecord>,
    #[serde(skip)]
    tree: Vec<ErrorRecord>,
}

impl ValidationError {
    /// Build the aggregate from (possibly grouped) records.
    #[must_use]
    pub fn new(title: impl Into<String>, tree: Vec<ErrorRecord>) -> Self {
        let mut records = Vec::new();
        for record in &tree {
            record.flatten_into(&[], &mut records);
        }
        Self {
            title: title.into(),
            records,
            tree,
        }
    }

    /// Name of what was validated (type expression or schema name).
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Flat, ordered records.
    #[must_use]
    pub fn records(&self) -> &[ErrorRecord] {
        &self.records
    }

    /// Records with container failures folded into `ContainerElementError`.
    #[must_use]
    pub fn grouped(&self) -> &[ErrorRecord] {
        &self.tree
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn into_records(self) -> Vec<ErrorRecord> {
        self.records
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.records.len();
        let noun = if count == 1 { "error" } else { "errors" };
        write!(f, "{count} validation {noun} for {}", self.title)?;
        for record in &self.records {
            write!(f, "\n{}", record.format_human_readable())?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Declaration-time defects: an unusable type or schema declaration.
///
/// These are programmer errors and never surface as a [`ValidationError`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SchemaError {
    #[error("Invalid type expression: {0}")]
    Syntax(#[from] TypeExprError),

    #[error("Unknown type '{name}'")]
    UnknownType { name: String },

    #[error("Type '{name}' expects {expected} parameter(s), got {got}")]
    ParameterCount {
        name: String,
        expected: &'static str,
        got: usize,
    },

    #[error("Invalid parameter for '{name}': {cause}")]
    InvalidParameter { name: String, cause: String },

    #[error("Type '{name}' is already registered")]
    DuplicateType { name: String },

    #[error("Duplicate field '{field}' in schema '{schema}'")]
    DuplicateField { schema: String, field: String },

    #[error("Unknown parent schema '{name}'")]
    UnknownParent { name: String },

    #[error("Invalid default for field '{field}': {cause}")]
    InvalidDefault { field: String, cause: String },

    #[error("Failed to parse schema document: {0}")]
    Document(String),
}

/// A malformed tagged-JSON native value.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Invalid tagged value at {path}: {cause}")]
pub struct ValueDecodeError {
    /// JSON path of the offending node (`$.a[0]`).
    pub path: String,
    pub cause: String,
}
