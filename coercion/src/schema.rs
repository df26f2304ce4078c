//! Record schemas: named fields with target types, defaults, aliases and a
//! schema-level config.
//!
//! Mode resolution per field: the field's own `strict` flag, then the
//! call-level override, then the schema config, then lax. A nested schema
//! validates its own fields from its own config; neither the enclosing
//! schema's config nor the call-level override reaches them. The enclosing
//! field's mode only decides whether native input must already be an
//! instance of the nested schema.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::config::{ExtraBehavior, SchemaConfig};
use crate::dispatch::{State, ValidationOutcome, failed, parse_json_input, validate_value};
use crate::error::{ErrorKind, ErrorRecord, LocItem, SchemaError};
use crate::rules::collections::key_location;
use crate::target::{Mode, Source, TargetType};
use crate::value::{ModelValue, Value};

/// A declared field.
#[derive(Debug, Clone)]
pub struct Field {
    name: String,
    target: TargetType,
    strict: Option<bool>,
    default: Option<Value>,
    alias: Option<String>,
}

impl Field {
    #[must_use]
    pub fn new(name: &str, target: TargetType) -> Self {
        Self {
            name: name.to_owned(),
            target,
            strict: None,
            default: None,
            alias: None,
        }
    }

    /// Per-field strict override; wins over call-level and schema config.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Value used when the input omits the field. Defaults are not validated.
    #[must_use]
    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    /// Input key to read instead of the field name.
    #[must_use]
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_owned());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn target(&self) -> &TargetType {
        &self.target
    }

    #[must_use]
    pub fn strict_override(&self) -> Option<bool> {
        self.strict
    }

    #[must_use]
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    #[must_use]
    pub fn alias_name(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    #[must_use]
    pub fn is_required(&self) -> bool {
        self.default.is_none()
    }

    /// The key reported for a missing field.
    fn input_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    /// Position of this field's entry in the input, preferring the alias.
    fn find(&self, entries: &[(Value, Value)], by_name: bool) -> Option<usize> {
        let position_of = |key: &str| {
            entries
                .iter()
                .position(|(k, _)| matches!(k, Value::Str(s) if s == key))
        };
        match &self.alias {
            Some(alias) => position_of(alias).or_else(|| {
                if by_name {
                    position_of(&self.name)
                } else {
                    None
                }
            }),
            None => position_of(&self.name),
        }
    }
}

/// A named record type.
#[derive(Debug)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
    config: SchemaConfig,
}

impl Schema {
    #[must_use]
    pub fn builder(name: &str) -> SchemaBuilder {
        SchemaBuilder::new(name)
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[must_use]
    pub fn config(&self) -> &SchemaConfig {
        &self.config
    }

    /// Validate `input` as an instance of this schema.
    ///
    /// `strict` is the call-level override: it applies to every field that
    /// has no strict flag of its own, but not to the fields of nested
    /// schemas. A `Dict` is always accepted here; only nested schemas may
    /// demand instances.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationError`](crate::ValidationError) listing every
    /// failure found, across all fields.
    pub fn validate(
        &self,
        input: &Value,
        source: Source,
        strict: Option<bool>,
    ) -> ValidationOutcome {
        self.validate_instance(input, source, false, strict)
            .map_err(|records| failed(self.name.clone(), records))
    }

    /// Validate an in-memory value.
    ///
    /// # Errors
    ///
    /// See [`Schema::validate`].
    pub fn validate_python(&self, input: &Value, strict: Option<bool>) -> ValidationOutcome {
        self.validate(input, Source::Python, strict)
    }

    /// Parse and validate JSON text.
    ///
    /// # Errors
    ///
    /// See [`Schema::validate`]; malformed JSON yields one `JsonInvalid` record.
    pub fn validate_json(&self, text: &str, strict: Option<bool>) -> ValidationOutcome {
        let input =
            parse_json_input(text).map_err(|record| failed(self.name.clone(), vec![record]))?;
        self.validate(&input, Source::Json, strict)
    }

    /// Validate as the target of an enclosing field.
    pub(crate) fn validate_nested(
        &self,
        input: &Value,
        state: &State<'_>,
    ) -> Result<Value, Vec<ErrorRecord>> {
        let instance_only = state.mode.is_strict() || self.config.is_strict();
        self.validate_instance(input, state.source, instance_only, None)
    }

    /// Whether `model` was produced by a schema of this name and shape:
    /// the declared fields in order, followed by extras only when allowed.
    fn is_instance(&self, model: &ModelValue) -> bool {
        if model.schema != self.name || model.fields.len() < self.fields.len() {
            return false;
        }
        let declared = self
            .fields
            .iter()
            .zip(&model.fields)
            .all(|(field, (name, _))| field.name == *name);
        declared
            && (model.fields.len() == self.fields.len()
                || self.config.extra_behavior() == ExtraBehavior::Allow)
    }

    fn validate_instance(
        &self,
        input: &Value,
        source: Source,
        instance_only: bool,
        call_strict: Option<bool>,
    ) -> Result<Value, Vec<ErrorRecord>> {
        if let Value::Model(model) = input
            && self.is_instance(model)
        {
            trace!(schema = %self.name, "input already is an instance");
            return Ok(input.clone());
        }
        let Value::Dict(entries) = input else {
            return Err(vec![ErrorRecord::new(
                ErrorKind::TypeMismatch,
                format!(
                    "Input should be a valid dictionary or instance of {}",
                    self.name
                ),
                input,
            )]);
        };
        if instance_only && source == Source::Python {
            return Err(vec![ErrorRecord::new(
                ErrorKind::TypeMismatch,
                format!("Input should be an instance of {}", self.name),
                input,
            )]);
        }

        let by_name = self.config.populates_by_name();
        let mut consumed = vec![false; entries.len()];
        let mut fields = Vec::with_capacity(self.fields.len());
        let mut errors = Vec::new();

        for field in &self.fields {
            let Some(position) = field.find(entries, by_name) else {
                match &field.default {
                    Some(default) => fields.push((field.name.clone(), default.clone())),
                    None => errors.push(
                        ErrorRecord::new(ErrorKind::MissingField, "Field required", input)
                            .prefixed(LocItem::Key(field.input_key().to_owned())),
                    ),
                }
                continue;
            };
            consumed[position] = true;
            if by_name && field.alias.is_some() {
                // Both spellings belong to the field; neither is extra.
                if let Some(other) = entries
                    .iter()
                    .position(|(k, _)| matches!(k, Value::Str(s) if *s == field.name))
                {
                    consumed[other] = true;
                }
            }

            let (key, raw) = &entries[position];
            let strict = field
                .strict
                .or(call_strict)
                .unwrap_or_else(|| self.config.is_strict());
            let state = State::new(Mode::from_strict(strict), source, &self.config);
            match validate_value(&field.target, raw, &state) {
                Ok(value) => fields.push((field.name.clone(), value)),
                Err(field_errors) => {
                    let location = key_location(key);
                    errors.extend(
                        field_errors
                            .into_iter()
                            .map(|e| e.prefixed(location.clone())),
                    );
                }
            }
        }

        self.apply_extras(entries, &consumed, &mut fields, &mut errors);

        if errors.is_empty() {
            Ok(Value::Model(ModelValue {
                schema: self.name.clone(),
                fields,
            }))
        } else {
            Err(errors)
        }
    }

    /// Handle input keys that matched no field, per the `extra` config.
    fn apply_extras(
        &self,
        entries: &[(Value, Value)],
        consumed: &[bool],
        fields: &mut Vec<(String, Value)>,
        errors: &mut Vec<ErrorRecord>,
    ) {
        let extras = entries
            .iter()
            .zip(consumed)
            .filter(|(_, used)| !**used)
            .map(|(entry, _)| entry);
        match self.config.extra_behavior() {
            ExtraBehavior::Ignore => {}
            ExtraBehavior::Forbid => {
                for (key, value) in extras {
                    errors.push(
                        ErrorRecord::new(
                            ErrorKind::ExtraFieldForbidden,
                            "Extra inputs are not permitted",
                            value,
                        )
                        .prefixed(key_location(key)),
                    );
                }
            }
            ExtraBehavior::Allow => {
                for (key, value) in extras {
                    let name = match key {
                        Value::Str(s) => s.clone(),
                        other => other.to_string(),
                    };
                    if fields.iter().any(|(taken, _)| *taken == name) {
                        debug!(
                            schema = %self.name,
                            key = %name,
                            "extra key shadows a field, dropped"
                        );
                        continue;
                    }
                    fields.push((name, value.clone()));
                }
            }
        }
    }
}

/// Builds a [`Schema`], optionally extending a parent.
///
/// The effective config is the parent's config overlaid by this schema's
/// own keys. A field redeclared by the child replaces the parent's field in
/// place; new fields are appended in declaration order.
#[derive(Debug)]
pub struct SchemaBuilder {
    name: String,
    inherited: Vec<Field>,
    declared: Vec<Field>,
    base_config: SchemaConfig,
    config: SchemaConfig,
}

impl SchemaBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            inherited: Vec::new(),
            declared: Vec::new(),
            base_config: SchemaConfig::default(),
            config: SchemaConfig::default(),
        }
    }

    #[must_use]
    pub fn extends(mut self, parent: &Schema) -> Self {
        self.inherited.clone_from(&parent.fields);
        self.base_config = parent.config.clone();
        self
    }

    #[must_use]
    pub fn config(mut self, config: SchemaConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn field(self, name: &str, target: TargetType) -> Self {
        self.field_with(Field::new(name, target))
    }

    #[must_use]
    pub fn field_with(mut self, field: Field) -> Self {
        self.declared.push(field);
        self
    }

    /// Finish the declaration.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateField`] if this schema declares the
    /// same field name twice.
    pub fn build(self) -> Result<Arc<Schema>, SchemaError> {
        let mut fields = self.inherited;
        let mut declared_names: Vec<String> = Vec::with_capacity(self.declared.len());
        for field in self.declared {
            if declared_names.contains(&field.name) {
                return Err(SchemaError::DuplicateField {
                    schema: self.name,
                    field: field.name,
                });
            }
            declared_names.push(field.name.clone());
            match fields.iter_mut().find(|f| f.name == field.name) {
                Some(slot) => *slot = field,
                None => fields.push(field),
            }
        }
        let config = self.base_config.merge(&self.config);
        debug!(schema = %self.name, fields = fields.len(), "built schema");
        Ok(Arc::new(Schema {
            name: self.name,
            fields,
            config,
        }))
    }
}
