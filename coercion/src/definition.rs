//! Declarative schema documents (JSON or YAML).
//!
//! A document lists enumerations and schemas. Enumerations are registered
//! first, then schemas in document order, so a schema may nest or extend
//! any schema declared before it.

use serde::Deserialize;
use tracing::debug;

use crate::config::SchemaConfig;
use crate::error::SchemaError;
use crate::registry::TypeRegistry;
use crate::schema::{Field, SchemaBuilder};
use crate::target::{
    EnumType, LengthConstraints, NumberConstraints, StringConstraints, TargetType,
};
use crate::value::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDocument {
    #[serde(default)]
    pub enums: Vec<EnumDefinition>,
    #[serde(default)]
    pub schemas: Vec<SchemaDefinition>,
}

/// Members map member names to values (tagged JSON), in declaration order.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnumDefinition {
    pub name: String,
    pub members: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaDefinition {
    pub name: String,
    #[serde(default)]
    pub extends: Option<String>,
    #[serde(default)]
    pub config: SchemaConfig,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldDefinition {
    pub name: String,
    /// Type expression, e.g. `list[int]`.
    #[serde(rename = "type")]
    pub type_expr: String,
    #[serde(default)]
    pub strict: Option<bool>,
    /// Default value as tagged JSON; an explicit `null` is a `None` default.
    #[serde(default, deserialize_with = "present")]
    pub default: Option<serde_json::Value>,
    #[serde(default)]
    pub alias: Option<String>,
    #[serde(default)]
    pub constraints: Option<FieldConstraints>,
}

/// Constraint keys a field may declare. Which keys apply depends on the
/// field's type:
/// - `str`: all string keys, with `min_length`/`max_length` counting characters
/// - `int`, `float`, `decimal`: `gt`, `ge`, `lt`, `le`, `multiple_of`
/// - `list`, `set`, `frozenset`, `deque`, `tuple`: `min_length`/`max_length`
///   counting items
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldConstraints {
    pub min_length: Option<usize>,
    pub max_length: Option<usize>,
    pub strip_whitespace: Option<bool>,
    pub to_lower: Option<bool>,
    pub to_upper: Option<bool>,
    pub gt: Option<f64>,
    pub ge: Option<f64>,
    pub lt: Option<f64>,
    pub le: Option<f64>,
    pub multiple_of: Option<f64>,
}

impl FieldConstraints {
    fn apply(&self, target: TargetType) -> Result<TargetType, &'static str> {
        let bounds = NumberConstraints {
            gt: self.gt,
            ge: self.ge,
            lt: self.lt,
            le: self.le,
            multiple_of: self.multiple_of,
        };
        let has_bounds = bounds != NumberConstraints::default();
        if self
            .multiple_of
            .is_some_and(|step| step <= 0.0 || !step.is_finite())
        {
            return Err("declares a multiple_of that is not a positive number");
        }

        let text = StringConstraints {
            min_length: self.min_length,
            max_length: self.max_length,
            strip_whitespace: self.strip_whitespace,
            to_lower: self.to_lower,
            to_upper: self.to_upper,
        };
        if let Some(constrained) = target.clone().with_string_constraints(text) {
            return if has_bounds {
                Err("declares numeric bounds on a string type")
            } else {
                Ok(constrained)
            };
        }
        if self.strip_whitespace.is_some() || self.to_lower.is_some() || self.to_upper.is_some() {
            return Err("declares string constraints on a non-string type");
        }

        let target = if has_bounds {
            target
                .with_number_constraints(bounds)
                .ok_or("declares numeric bounds on a non-numeric type")?
        } else {
            target
        };
        if self.min_length.is_none() && self.max_length.is_none() {
            return Ok(target);
        }
        target
            .with_length_constraints(LengthConstraints::new(self.min_length, self.max_length))
            .ok_or("declares length constraints on a type without a length")
    }
}

/// Distinguish an explicit `null` from an absent key.
fn present<'de, D>(deserializer: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(deserializer).map(Some)
}

impl SchemaDocument {
    /// # Errors
    ///
    /// Returns [`SchemaError::Document`] if the text is not a valid document.
    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        serde_json::from_str(text).map_err(|e| SchemaError::Document(e.to_string()))
    }

    /// # Errors
    ///
    /// Returns [`SchemaError::Document`] if the text is not a valid document.
    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        let raw: serde_json::Value =
            serde_saphyr::from_str(text).map_err(|e| SchemaError::Document(e.to_string()))?;
        serde_json::from_value(raw).map_err(|e| SchemaError::Document(e.to_string()))
    }

    /// Build a fresh registry from this document.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] met while resolving declarations.
    pub fn into_registry(self) -> Result<TypeRegistry, SchemaError> {
        let mut registry = TypeRegistry::new();
        self.extend_registry(&mut registry)?;
        Ok(registry)
    }

    /// Register this document's declarations into an existing registry, so
    /// they can use custom rules registered beforehand.
    ///
    /// # Errors
    ///
    /// Returns the first [`SchemaError`] met while resolving declarations.
    pub fn extend_registry(&self, registry: &mut TypeRegistry) -> Result<(), SchemaError> {
        for definition in &self.enums {
            let members = definition
                .members
                .iter()
                .map(|(name, raw)| {
                    Value::from_tagged_json(raw)
                        .map(|value| (name.clone(), value))
                        .map_err(|e| {
                            SchemaError::Document(format!("enum '{}': {e}", definition.name))
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            registry.register_enum(EnumType::new(&definition.name, members))?;
        }

        for definition in &self.schemas {
            let mut builder = SchemaBuilder::new(&definition.name).config(definition.config.clone());
            if let Some(parent) = &definition.extends {
                let parent = registry
                    .schema(parent)
                    .ok_or_else(|| SchemaError::UnknownParent {
                        name: parent.clone(),
                    })?;
                builder = builder.extends(&parent);
            }
            for field in &definition.fields {
                builder = builder.field_with(field.to_field(registry)?);
            }
            registry.register_schema(builder.build()?)?;
        }
        debug!(
            enums = self.enums.len(),
            schemas = self.schemas.len(),
            "loaded schema document"
        );
        Ok(())
    }
}

impl FieldDefinition {
    fn to_field(&self, registry: &TypeRegistry) -> Result<Field, SchemaError> {
        let mut target = registry.parse(&self.type_expr)?;
        if let Some(constraints) = &self.constraints {
            target = constraints
                .apply(target)
                .map_err(|problem| SchemaError::InvalidParameter {
                    name: self.type_expr.clone(),
                    cause: format!("field '{}' {problem}", self.name),
                })?;
        }
        let mut field = Field::new(&self.name, target);
        if let Some(strict) = self.strict {
            field = field.strict(strict);
        }
        if let Some(alias) = &self.alias {
            field = field.alias(alias);
        }
        if let Some(raw) = &self.default {
            let value = Value::from_tagged_json(raw).map_err(|e| SchemaError::InvalidDefault {
                field: self.name.clone(),
                cause: e.to_string(),
            })?;
            field = field.default_value(value);
        }
        Ok(field)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const DOCUMENT: &str = r#"{
        "enums": [{"name": "Color", "members": {"RED": "red", "GREEN": "green"}}],
        "schemas": [
            {"name": "Base", "config": {"extra": "forbid"},
             "fields": [{"name": "id", "type": "int"}]},
            {"name": "Item", "extends": "Base", "config": {"strict": true},
             "fields": [
                {"name": "color", "type": "Color"},
                {"name": "label", "type": "optional[str]", "default": null,
                 "constraints": {"max_length": 8}},
                {"name": "tags", "type": "list[str]", "default": [], "alias": "labels"}
             ]}
        ]
    }"#;

    #[test]
    fn test_document_builds_schemas() {
        let registry = SchemaDocument::from_json_str(DOCUMENT)
            .unwrap()
            .into_registry()
            .unwrap();
        let item = registry.schema("item").unwrap();
        let names: Vec<&str> = item.fields().iter().map(Field::name).collect();
        assert_eq!(names, vec!["id", "color", "label", "tags"]);
        assert!(item.config().is_strict());
        assert_eq!(item.config().extra, Some(crate::config::ExtraBehavior::Forbid));

        let label = item.field("label").unwrap();
        assert_eq!(label.default(), Some(&Value::None));
        let TargetType::Optional(inner) = label.target() else {
            panic!("expected optional");
        };
        assert!(matches!(inner.as_ref(), TargetType::Str(c) if c.max_length == Some(8)));
        assert_eq!(item.field("tags").unwrap().alias_name(), Some("labels"));
        assert!(item.field("id").unwrap().is_required());
    }

    #[test]
    fn test_numeric_and_item_constraints() {
        let yaml = "schemas:
  - name: Order
    fields:
      - name: quantity
        type: int
        constraints: {gt: 0, le: 100}
      - name: price
        type: optional[decimal]
        constraints: {ge: 0, multiple_of: 0.01}
      - name: lines
        type: list[str]
        constraints: {min_length: 1, max_length: 3}
";
        let registry = SchemaDocument::from_yaml_str(yaml)
            .unwrap()
            .into_registry()
            .unwrap();
        let order = registry.schema("Order").unwrap();
        assert!(matches!(
            order.field("quantity").unwrap().target(),
            TargetType::Bounded { bounds, .. } if bounds.le == Some(100.0)
        ));
        assert!(matches!(
            order.field("lines").unwrap().target(),
            TargetType::Counted { length, .. } if length.min_length == Some(1)
        ));

        let input = |quantity: i64, price: &str, lines: usize| {
            serde_json::json!({
                "quantity": quantity,
                "price": price,
                "lines": vec!["x"; lines],
            })
            .to_string()
        };
        assert!(order.validate_json(&input(3, "9.99", 2), None).is_ok());

        let error = order
            .validate_json(&input(0, "9.995", 0), None)
            .unwrap_err();
        let kinds: Vec<(ErrorKind, String)> = error
            .records()
            .iter()
            .map(|r| (r.kind, r.location_string()))
            .collect();
        assert_eq!(
            kinds,
            vec![
                (ErrorKind::GreaterThan, "quantity".to_owned()),
                (ErrorKind::MultipleOf, "price".to_owned()),
                (ErrorKind::TooShort, "lines".to_owned()),
            ]
        );
    }

    #[test]
    fn test_constraints_must_fit_the_type() {
        let declare = |ty: &str, constraints: &str| {
            let text = format!(
                r#"{{"schemas": [{{"name": "A", "fields": [{{"name": "n", "type": "{ty}", "constraints": {constraints}}}]}}]}}"#
            );
            SchemaDocument::from_json_str(&text)
                .unwrap()
                .into_registry()
                .map(|_| ())
        };
        assert!(declare("float", r#"{"lt": 1.5}"#).is_ok());
        assert!(declare("tuple[int, ...]", r#"{"max_length": 2}"#).is_ok());
        for (ty, constraints, problem) in [
            ("str", r#"{"gt": 1}"#, "numeric bounds on a string type"),
            ("list[int]", r#"{"to_lower": true}"#, "string constraints on a non-string type"),
            ("bool", r#"{"ge": 0}"#, "numeric bounds on a non-numeric type"),
            ("int", r#"{"gt": 0, "max_length": 2}"#, "type without a length"),
            ("int", r#"{"multiple_of": 0}"#, "not a positive number"),
        ] {
            let err = declare(ty, constraints).unwrap_err();
            assert!(
                matches!(&err, SchemaError::InvalidParameter { cause, .. } if cause.contains(problem)),
                "{ty} {constraints}: {err}"
            );
        }
    }

    #[test]
    fn test_yaml_document() {
        let yaml = "schemas:\n  - name: Point\n    fields:\n      - name: x\n        type: float\n      - name: y\n        type: float\n        default: 0.0\n";
        let registry = SchemaDocument::from_yaml_str(yaml)
            .unwrap()
            .into_registry()
            .unwrap();
        let point = registry.schema("Point").unwrap();
        assert_eq!(point.fields().len(), 2);
        assert_eq!(point.field("y").unwrap().default(), Some(&Value::Float(0.0)));
    }

    #[test]
    fn test_document_errors() {
        let unknown_parent = r#"{"schemas": [{"name": "A", "extends": "B"}]}"#;
        assert!(matches!(
            SchemaDocument::from_json_str(unknown_parent)
                .unwrap()
                .into_registry()
                .unwrap_err(),
            SchemaError::UnknownParent { .. }
        ));

        let bad_constraint =
            r#"{"schemas": [{"name": "A", "fields": [{"name": "n", "type": "int", "constraints": {"min_length": 1}}]}]}"#;
        assert!(matches!(
            SchemaDocument::from_json_str(bad_constraint)
                .unwrap()
                .into_registry()
                .unwrap_err(),
            SchemaError::InvalidParameter { .. }
        ));

        assert!(matches!(
            SchemaDocument::from_json_str(r#"{"schemas": [{"nme": "A"}]}"#).unwrap_err(),
            SchemaError::Document(_)
        ));
    }
}
