//! Type registry: resolves type expressions into [`TargetType`]s.
//!
//! Built-in names are fixed. Enumerations, schemas and custom coercion rules
//! are registered by name (case-insensitive) before declarations that use
//! them are resolved. Resolution happens once, at declaration time; the
//! dispatcher never consults the registry.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use coercion_type::{TypeArg, TypeExpr, parse_type_expr};
use tracing::debug;

use crate::error::{RuleFailure, SchemaError};
use crate::schema::Schema;
use crate::target::{EnumType, Mode, Source, TargetType, TupleShape};
use crate::value::Value;

/// An externally registered coercion for a named type.
///
/// Implementations see every input for their type, including ones that
/// already have the right shape, and decide per mode and source.
pub trait CoercionRule: Send + Sync {
    /// Name used in type expressions and error titles.
    fn name(&self) -> &str;

    /// Convert `input` or explain why it cannot be converted.
    ///
    /// # Errors
    ///
    /// Returns a [`RuleFailure`] when the input is not acceptable.
    fn coerce(&self, input: &Value, mode: Mode, source: Source) -> Result<Value, RuleFailure>;
}

const BUILTIN_TYPES: &[&str] = &[
    "any",
    "bool",
    "bytes",
    "date",
    "datetime",
    "decimal",
    "deque",
    "dict",
    "float",
    "frozenset",
    "int",
    "iterable",
    "list",
    "literal",
    "none",
    "optional",
    "sequence",
    "set",
    "str",
    "time",
    "timedelta",
    "tuple",
    "uuid",
];

/// Named types available to type expressions.
#[derive(Clone, Default)]
pub struct TypeRegistry {
    rules: HashMap<String, Arc<dyn CoercionRule>>,
    enums: HashMap<String, Arc<EnumType>>,
    schemas: HashMap<String, Arc<Schema>>,
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .field("enums", &self.enums.keys().collect::<Vec<_>>())
            .field("schemas", &self.schemas.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn parameter_count(expr: &TypeExpr, expected: &'static str) -> SchemaError {
    SchemaError::ParameterCount {
        name: expr.name.clone(),
        expected,
        got: expr.args().len(),
    }
}

fn invalid_parameter(expr: &TypeExpr, cause: impl Into<String>) -> SchemaError {
    SchemaError::InvalidParameter {
        name: expr.name.clone(),
        cause: cause.into(),
    }
}

impl TypeRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_free(&self, name: &str) -> Result<String, SchemaError> {
        let key = name.to_ascii_lowercase();
        if BUILTIN_TYPES.contains(&key.as_str())
            || self.rules.contains_key(&key)
            || self.enums.contains_key(&key)
            || self.schemas.contains_key(&key)
        {
            return Err(SchemaError::DuplicateType {
                name: name.to_owned(),
            });
        }
        Ok(key)
    }

    /// Register a custom coercion rule under [`CoercionRule::name`].
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken.
    pub fn register_rule(&mut self, rule: Arc<dyn CoercionRule>) -> Result<(), SchemaError> {
        let key = self.ensure_free(rule.name())?;
        debug!(name = rule.name(), "registered coercion rule");
        self.rules.insert(key, rule);
        Ok(())
    }

    /// Register an enumeration under its own name.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken.
    pub fn register_enum(&mut self, ty: EnumType) -> Result<Arc<EnumType>, SchemaError> {
        let key = self.ensure_free(&ty.name)?;
        debug!(name = %ty.name, members = ty.members.len(), "registered enum");
        let ty = Arc::new(ty);
        self.enums.insert(key, Arc::clone(&ty));
        Ok(ty)
    }

    /// Register a schema so later declarations can nest or extend it.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::DuplicateType`] if the name is taken.
    pub fn register_schema(&mut self, schema: Arc<Schema>) -> Result<(), SchemaError> {
        let key = self.ensure_free(schema.name())?;
        debug!(name = schema.name(), fields = schema.fields().len(), "registered schema");
        self.schemas.insert(key, schema);
        Ok(())
    }

    #[must_use]
    pub fn schema(&self, name: &str) -> Option<Arc<Schema>> {
        self.schemas.get(&name.to_ascii_lowercase()).cloned()
    }

    #[must_use]
    pub fn enumeration(&self, name: &str) -> Option<Arc<EnumType>> {
        self.enums.get(&name.to_ascii_lowercase()).cloned()
    }

    /// Every name a type expression may use, sorted.
    #[must_use]
    pub fn type_names(&self) -> Vec<String> {
        let mut names: Vec<String> = BUILTIN_TYPES.iter().map(|s| (*s).to_owned()).collect();
        names.extend(self.rules.values().map(|r| r.name().to_owned()));
        names.extend(self.enums.values().map(|e| e.name.clone()));
        names.extend(self.schemas.values().map(|s| s.name().to_owned()));
        names.sort_by_key(|n| n.to_ascii_lowercase());
        names
    }

    /// Parse and resolve a type expression.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for syntax errors, unknown names or
    /// malformed parameters.
    pub fn parse(&self, text: &str) -> Result<TargetType, SchemaError> {
        let expr = parse_type_expr(text)?;
        self.resolve(&expr)
    }

    /// Resolve an already parsed type expression.
    ///
    /// # Errors
    ///
    /// Returns a [`SchemaError`] for unknown names or malformed parameters.
    pub fn resolve(&self, expr: &TypeExpr) -> Result<TargetType, SchemaError> {
        let key = expr.key();
        match key.as_str() {
            "any" => Self::bare(expr, TargetType::Any),
            "none" => Self::bare(expr, TargetType::None),
            "int" => Self::bare(expr, TargetType::Int),
            "float" => Self::bare(expr, TargetType::Float),
            "bool" => Self::bare(expr, TargetType::Bool),
            "str" => Self::bare(expr, TargetType::str()),
            "bytes" => Self::bare(expr, TargetType::Bytes),
            "datetime" => Self::bare(expr, TargetType::DateTime),
            "date" => Self::bare(expr, TargetType::Date),
            "time" => Self::bare(expr, TargetType::Time),
            "timedelta" => Self::bare(expr, TargetType::Timedelta),
            "uuid" => Self::bare(expr, TargetType::Uuid),
            "decimal" => Self::bare(expr, TargetType::Decimal),
            "list" => self.container(expr, TargetType::List),
            "set" => self.container(expr, TargetType::Set),
            "frozenset" => self.container(expr, TargetType::FrozenSet),
            "deque" => self.container(expr, TargetType::Deque),
            "sequence" => self.container(expr, TargetType::Sequence),
            "iterable" => self.container(expr, TargetType::Iterable),
            "tuple" => self.tuple(expr),
            "dict" => self.dict(expr),
            "literal" => Self::literal(expr),
            "optional" => match expr.args() {
                [arg] => Ok(TargetType::optional(self.type_arg(expr, arg)?)),
                _ => Err(parameter_count(expr, "1")),
            },
            _ => self.named(expr, &key),
        }
    }

    fn bare(expr: &TypeExpr, target: TargetType) -> Result<TargetType, SchemaError> {
        if expr.args.is_some() {
            return Err(parameter_count(expr, "0"));
        }
        Ok(target)
    }

    fn named(&self, expr: &TypeExpr, key: &str) -> Result<TargetType, SchemaError> {
        let target = if let Some(ty) = self.enums.get(key) {
            TargetType::Enum(Arc::clone(ty))
        } else if let Some(schema) = self.schemas.get(key) {
            TargetType::Model(Arc::clone(schema))
        } else if let Some(rule) = self.rules.get(key) {
            TargetType::Custom(Arc::clone(rule))
        } else {
            return Err(SchemaError::UnknownType {
                name: expr.name.clone(),
            });
        };
        Self::bare(expr, target)
    }

    fn type_arg(&self, owner: &TypeExpr, arg: &TypeArg) -> Result<TargetType, SchemaError> {
        match arg {
            TypeArg::Type(inner) => self.resolve(inner),
            other => Err(invalid_parameter(owner, format!("expected a type, found {other}"))),
        }
    }

    fn container(
        &self,
        expr: &TypeExpr,
        build: fn(Option<Box<TargetType>>) -> TargetType,
    ) -> Result<TargetType, SchemaError> {
        match (&expr.args, expr.args()) {
            (None, _) => Ok(build(None)),
            (Some(_), [arg]) => Ok(build(Some(Box::new(self.type_arg(expr, arg)?)))),
            _ => Err(parameter_count(expr, "0 or 1")),
        }
    }

    fn tuple(&self, expr: &TypeExpr) -> Result<TargetType, SchemaError> {
        let shape = match (&expr.args, expr.args()) {
            (None, _) => TupleShape::Variadic(None),
            (Some(_), []) => return Err(parameter_count(expr, "at least 1")),
            (Some(_), [elem, TypeArg::Ellipsis]) => {
                TupleShape::Variadic(Some(Box::new(self.type_arg(expr, elem)?)))
            }
            (Some(_), items) => TupleShape::Positional(
                items
                    .iter()
                    .map(|arg| match arg {
                        TypeArg::Ellipsis => Err(invalid_parameter(
                            expr,
                            "'...' is only allowed as the second of two parameters",
                        )),
                        other => self.type_arg(expr, other),
                    })
                    .collect::<Result<_, _>>()?,
            ),
        };
        Ok(TargetType::Tuple(shape))
    }

    fn dict(&self, expr: &TypeExpr) -> Result<TargetType, SchemaError> {
        match (&expr.args, expr.args()) {
            (None, _) => Ok(TargetType::Dict {
                key: None,
                value: None,
            }),
            (Some(_), [key, value]) => Ok(TargetType::dict_of(
                self.type_arg(expr, key)?,
                self.type_arg(expr, value)?,
            )),
            _ => Err(parameter_count(expr, "0 or 2")),
        }
    }

    fn literal(expr: &TypeExpr) -> Result<TargetType, SchemaError> {
        if expr.args().is_empty() {
            return Err(parameter_count(expr, "at least 1"));
        }
        let values = expr
            .args()
            .iter()
            .map(|arg| match arg {
                TypeArg::Str(s) => Ok(Value::Str(s.clone())),
                TypeArg::Int(i) => Ok(Value::Int(*i)),
                TypeArg::Type(word) if word.is_word("true") => Ok(Value::Bool(true)),
                TypeArg::Type(word) if word.is_word("false") => Ok(Value::Bool(false)),
                TypeArg::Type(word) if word.is_word("none") => Ok(Value::None),
                other => Err(invalid_parameter(
                    expr,
                    format!("literal values must be strings, integers, booleans or None, found {other}"),
                )),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TargetType::Literal(values))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    struct Celsius;

    impl CoercionRule for Celsius {
        fn name(&self) -> &str {
            "Celsius"
        }

        fn coerce(&self, input: &Value, _mode: Mode, _source: Source) -> Result<Value, RuleFailure> {
            match input {
                Value::Float(f) if *f >= -273.15 => Ok(Value::Float(*f)),
                _ => Err(RuleFailure::new(ErrorKind::ValueError, "below absolute zero")),
            }
        }
    }

    #[test]
    fn test_resolves_nested_builtins() {
        let registry = TypeRegistry::new();
        for text in [
            "list[int]",
            "dict[str, list[float]]",
            "tuple[int, ...]",
            "tuple[int, str]",
            "optional[uuid]",
            "sequence[str]",
            "literal['a', 1]",
            "frozenset[date]",
        ] {
            assert_eq!(registry.parse(text).unwrap().to_string(), text);
        }
        assert_eq!(registry.parse("List[INT]").unwrap().to_string(), "list[int]");
        assert_eq!(registry.parse("str | None").unwrap().to_string(), "optional[str]");
    }

    #[test]
    fn test_parameter_errors() {
        let registry = TypeRegistry::new();
        assert!(matches!(
            registry.parse("dict[str]").unwrap_err(),
            SchemaError::ParameterCount { expected: "0 or 2", got: 1, .. }
        ));
        assert!(matches!(
            registry.parse("int[str]").unwrap_err(),
            SchemaError::ParameterCount { expected: "0", .. }
        ));
        assert!(matches!(
            registry.parse("list['a']").unwrap_err(),
            SchemaError::InvalidParameter { .. }
        ));
        assert!(matches!(
            registry.parse("tuple[..., int]").unwrap_err(),
            SchemaError::InvalidParameter { .. }
        ));
        assert!(matches!(
            registry.parse("money").unwrap_err(),
            SchemaError::UnknownType { .. }
        ));
        assert!(matches!(registry.parse("list[").unwrap_err(), SchemaError::Syntax(_)));
    }

    #[test]
    fn test_literal_words() {
        let registry = TypeRegistry::new();
        let TargetType::Literal(values) = registry.parse("literal[true, None, 'x']").unwrap() else {
            panic!("expected literal");
        };
        assert_eq!(values, vec![Value::Bool(true), Value::None, Value::str("x")]);
    }

    #[test]
    fn test_registered_names_resolve() {
        let mut registry = TypeRegistry::new();
        registry.register_rule(Arc::new(Celsius)).unwrap();
        registry
            .register_enum(EnumType::new("Color", vec![("RED".to_owned(), Value::str("red"))]))
            .unwrap();

        assert!(matches!(registry.parse("list[celsius]").unwrap(), TargetType::List(Some(_))));
        assert!(matches!(registry.parse("color").unwrap(), TargetType::Enum(_)));
        assert!(registry.type_names().contains(&"Celsius".to_owned()));
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register_rule(Arc::new(Celsius)).unwrap();
        assert!(matches!(
            registry.register_rule(Arc::new(Celsius)).unwrap_err(),
            SchemaError::DuplicateType { .. }
        ));
        assert!(matches!(
            registry.register_enum(EnumType::new("INT", Vec::new())).unwrap_err(),
            SchemaError::DuplicateType { .. }
        ));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TypeRegistry>();
        assert_send_sync::<TargetType>();
    }
}
