//! The validator dispatcher.
//!
//! Maps `(target type, input, mode, source)` to either a coerced value or a
//! list of error records. Scalars whose runtime type already matches the
//! target are returned unchanged; everything else goes to the rule for the
//! target type.

use tracing::{debug, trace};

use crate::config::SchemaConfig;
use crate::error::{ErrorKind, ErrorRecord, RuleFailure, ValidationError};
use crate::rules::{boolean, choice, collections, numeric, temporal, text, uuids};
use crate::target::{Mode, Source, TargetType};
use crate::value::Value;

/// Coerced value on success, aggregated errors on failure.
pub type ValidationOutcome = Result<Value, ValidationError>;

/// Resolved context for one validation step.
#[derive(Debug, Clone, Copy)]
pub struct State<'a> {
    pub mode: Mode,
    pub source: Source,
    /// Config of the schema that owns the value (defaults outside schemas).
    pub config: &'a SchemaConfig,
}

impl<'a> State<'a> {
    #[must_use]
    pub fn new(mode: Mode, source: Source, config: &'a SchemaConfig) -> Self {
        Self {
            mode,
            source,
            config,
        }
    }
}

fn scalar(
    target: &TargetType,
    input: &Value,
    state: &State<'_>,
    rule: impl FnOnce(&Value, &State<'_>) -> Result<Value, RuleFailure>,
) -> Result<Value, RuleFailure> {
    if target.accepts_exactly(input) {
        trace!(target = %target, "input already has the target type");
        return Ok(input.clone());
    }
    trace!(
        target = %target,
        mode = ?state.mode,
        source = %state.source,
        input_type = input.type_name(),
        "coercing"
    );
    rule(input, state)
}

/// Validate one value against one target type.
pub fn validate_value(
    target: &TargetType,
    input: &Value,
    state: &State<'_>,
) -> Result<Value, Vec<ErrorRecord>> {
    let scalar_result = match target {
        TargetType::Optional(inner) => {
            return match input {
                Value::None => Ok(Value::None),
                _ => validate_value(inner, input, state),
            };
        }
        TargetType::List(_)
        | TargetType::Set(_)
        | TargetType::FrozenSet(_)
        | TargetType::Deque(_)
        | TargetType::Tuple(_)
        | TargetType::Sequence(_)
        | TargetType::Iterable(_) => return collections::validate_array(target, input, state),
        TargetType::Dict { key, value } => {
            return collections::validate_dict(key.as_deref(), value.as_deref(), input, state);
        }
        TargetType::Model(schema) => return schema.validate_nested(input, state),
        TargetType::Bounded { inner, bounds } => {
            let value = validate_value(inner, input, state)?;
            numeric::check_bounds(value, bounds)
        }
        TargetType::Counted { inner, length } => {
            let value = validate_value(inner, input, state)?;
            collections::check_length(value, inner, length)
        }
        TargetType::Custom(rule) => {
            trace!(rule = rule.name(), "custom rule");
            rule.coerce(input, state.mode, state.source)
        }
        TargetType::Any => Ok(input.clone()),
        TargetType::None => scalar(target, input, state, |_, _| {
            Err(RuleFailure::new(ErrorKind::TypeMismatch, "Input should be None"))
        }),
        TargetType::Int => scalar(target, input, state, numeric::coerce_int),
        TargetType::Float => scalar(target, input, state, numeric::coerce_float)
            .and_then(|v| numeric::check_finite(v, state.config)),
        TargetType::Decimal => scalar(target, input, state, numeric::coerce_decimal),
        TargetType::Bool => scalar(target, input, state, boolean::coerce_bool),
        TargetType::Str(constraints) => scalar(target, input, state, text::coerce_str)
            .and_then(|v| text::apply_constraints(v, constraints, state.config)),
        TargetType::Bytes => scalar(target, input, state, text::coerce_bytes),
        TargetType::DateTime => scalar(target, input, state, temporal::coerce_datetime),
        TargetType::Date => scalar(target, input, state, temporal::coerce_date),
        TargetType::Time => scalar(target, input, state, temporal::coerce_time),
        TargetType::Timedelta => scalar(target, input, state, temporal::coerce_timedelta),
        TargetType::Uuid => scalar(target, input, state, uuids::coerce_uuid),
        TargetType::Literal(values) => scalar(target, input, state, |i, s| {
            choice::coerce_literal(values, i, s)
        }),
        TargetType::Enum(ty) => scalar(target, input, state, |i, s| choice::coerce_enum(ty, i, s)),
    };
    scalar_result.map_err(|failure| vec![failure.into_record(input)])
}

/// Parse JSON text into a value, reporting syntax errors as a record.
pub fn parse_json_input(text: &str) -> Result<Value, ErrorRecord> {
    serde_json::from_str::<serde_json::Value>(text)
        .map(|json| Value::from_json(&json))
        .map_err(|e| {
            ErrorRecord::new(
                ErrorKind::JsonInvalid,
                format!("Invalid JSON: {e}"),
                &Value::str(text),
            )
        })
}

#[must_use]
pub fn failed(title: String, records: Vec<ErrorRecord>) -> ValidationError {
    let error = ValidationError::new(title, records);
    debug!(
        title = error.title(),
        errors = error.error_count(),
        "validation failed"
    );
    error
}

/// Validate `input` against `target` with an explicit mode and source,
/// outside any schema.
///
/// A model target is validated with `mode` as its call-level strictness.
///
/// # Errors
///
/// Returns a [`ValidationError`] listing every failure found.
pub fn dispatch(target: &TargetType, input: &Value, mode: Mode, source: Source) -> ValidationOutcome {
    if let TargetType::Model(schema) = target {
        return schema.validate(input, source, Some(mode.is_strict()));
    }
    let config = SchemaConfig::default();
    let state = State::new(mode, source, &config);
    validate_value(target, input, &state).map_err(|records| failed(target.to_string(), records))
}

/// A reusable validator for one target type.
///
/// The config supplies defaults (strictness, string rules, extra handling)
/// for values validated outside a schema.
#[derive(Debug, Clone)]
pub struct Validator {
    target: TargetType,
    config: SchemaConfig,
}

impl Validator {
    #[must_use]
    pub fn new(target: TargetType) -> Self {
        Self::with_config(target, SchemaConfig::default())
    }

    #[must_use]
    pub fn with_config(target: TargetType, config: SchemaConfig) -> Self {
        Self { target, config }
    }

    #[must_use]
    pub fn target(&self) -> &TargetType {
        &self.target
    }

    /// Validate with an optional call-level strict override.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failure found.
    pub fn validate(&self, input: &Value, source: Source, strict: Option<bool>) -> ValidationOutcome {
        if let TargetType::Model(schema) = &self.target {
            return schema.validate(input, source, strict);
        }
        let mode = Mode::from_strict(strict.unwrap_or_else(|| self.config.is_strict()));
        let state = State::new(mode, source, &self.config);
        validate_value(&self.target, input, &state)
            .map_err(|records| failed(self.target.to_string(), records))
    }

    /// Validate an in-memory value.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failure found.
    pub fn validate_python(&self, input: &Value, strict: Option<bool>) -> ValidationOutcome {
        self.validate(input, Source::Python, strict)
    }

    /// Parse and validate JSON text. Malformed JSON yields a single
    /// `JsonInvalid` record.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`] listing every failure found.
    pub fn validate_json(&self, text: &str, strict: Option<bool>) -> ValidationOutcome {
        let input = parse_json_input(text)
            .map_err(|record| failed(self.target.to_string(), vec![record]))?;
        self.validate(&input, Source::Json, strict)
    }
}
