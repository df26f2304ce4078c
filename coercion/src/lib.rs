//! # coercion
//!
//! Strict/lax type coercion and validation.
//!
//! Given a declared [`TargetType`], an input [`Value`], a [`Mode`] and a
//! [`Source`], the dispatcher either returns the coerced value or a
//! [`ValidationError`] listing every failure with its location.
//!
//! ## Quick Start
//!
//! ```rust
//! use coercion::{Mode, Source, TypeRegistry, Value, dispatch};
//!
//! let registry = TypeRegistry::new();
//! let target = registry.parse("list[int]").unwrap();
//!
//! let input = Value::List(vec![Value::str("1"), Value::Int(2)]);
//! let lax = dispatch(&target, &input, Mode::Lax, Source::Python).unwrap();
//! assert_eq!(lax, Value::List(vec![Value::Int(1), Value::Int(2)]));
//!
//! let err = dispatch(&target, &input, Mode::Strict, Source::Python).unwrap_err();
//! assert_eq!(err.error_count(), 1);
//! assert_eq!(err.records()[0].location_string(), "0");
//! ```
//!
//! Schemas group typed fields under one config:
//!
//! ```rust
//! use coercion::{Schema, SchemaConfig, TargetType, Value};
//!
//! let user = Schema::builder("User")
//!     .config(SchemaConfig::default().with_strict(true))
//!     .field("id", TargetType::Int)
//!     .field("name", TargetType::str())
//!     .build()
//!     .unwrap();
//!
//! let ok = user.validate_json(r#"{"id": 1, "name": "ann"}"#, None).unwrap();
//! assert!(matches!(ok, Value::Model(_)));
//!
//! let err = user.validate_json(r#"{"id": "1", "name": "ann"}"#, None).unwrap_err();
//! assert_eq!(err.records()[0].location_string(), "id");
//! ```

mod config;
mod definition;
mod dispatch;
mod error;
pub mod output;
mod registry;
mod report;
mod rules;
mod schema;
mod target;
mod value;



pub use config::{ExtraBehavior, SchemaConfig};
pub use definition::{
    EnumDefinition, FieldConstraints, FieldDefinition, SchemaDefinition, SchemaDocument,
};
pub use dispatch::{ValidationOutcome, Validator, dispatch};
pub use error::{
    ErrorKind, ErrorRecord, LocItem, RuleFailure, SchemaError, ValidationError, ValueDecodeError,
};
pub use registry::{CoercionRule, TypeRegistry};
pub use report::ValidationReport;
pub use schema::{Field, Schema, SchemaBuilder};
pub use target::{
    EnumType, LengthConstraints, Mode, NumberConstraints, Source, StringConstraints, TargetType,
    TupleShape,
};
pub use value::{DateTimeValue, EnumValue, ModelValue, Value, float_repr};

pub use coercion_type::{TypeArg, TypeExpr, TypeExprError, parse_type_expr};
