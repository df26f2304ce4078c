//! Schema configuration.
//!
//! Every key is optional so that a child configuration can be overlaid onto
//! its parent key by key ([`SchemaConfig::merge`]). Accessors resolve the
//! effective value, falling back to the engine default.

use serde::{Deserialize, Serialize};

/// What to do with input keys that match no declared field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraBehavior {
    /// Drop unknown keys (default).
    #[default]
    Ignore,
    /// Report each unknown key as `ExtraFieldForbidden`.
    Forbid,
    /// Keep unknown keys, unvalidated, in the resulting instance.
    Allow,
}

/// Schema-level configuration, fixed at declaration time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
#[non_exhaustive]
pub struct SchemaConfig {
    /// Validate every field of this schema in strict mode (default: lax).
    /// Not inherited by nested schemas.
    pub strict: Option<bool>,
    /// Handling of undeclared input keys (default: ignore).
    pub extra: Option<ExtraBehavior>,
    /// Strip leading/trailing whitespace from strings.
    pub str_strip_whitespace: Option<bool>,
    pub str_to_lower: Option<bool>,
    pub str_to_upper: Option<bool>,
    /// Minimum string length in characters.
    pub str_min_length: Option<usize>,
    /// Maximum string length in characters.
    pub str_max_length: Option<usize>,
    /// Accept NaN and infinities for floats (default: true).
    pub allow_inf_nan: Option<bool>,
    /// Also accept a field's own name when it declares an alias.
    pub populate_by_name: Option<bool>,
}

impl SchemaConfig {
    #[must_use]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    #[must_use]
    pub fn with_extra(mut self, extra: ExtraBehavior) -> Self {
        self.extra = Some(extra);
        self
    }

    /// Overlay `child` onto `self`: every key the child sets wins, every key
    /// it leaves unset keeps the parent's value.
    #[must_use]
    pub fn merge(&self, child: &SchemaConfig) -> SchemaConfig {
        SchemaConfig {
            strict: child.strict.or(self.strict),
            extra: child.extra.or(self.extra),
            str_strip_whitespace: child.str_strip_whitespace.or(self.str_strip_whitespace),
            str_to_lower: child.str_to_lower.or(self.str_to_lower),
            str_to_upper: child.str_to_upper.or(self.str_to_upper),
            str_min_length: child.str_min_length.or(self.str_min_length),
            str_max_length: child.str_max_length.or(self.str_max_length),
            allow_inf_nan: child.allow_inf_nan.or(self.allow_inf_nan),
            populate_by_name: child.populate_by_name.or(self.populate_by_name),
        }
    }

    #[must_use]
    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    #[must_use]
    pub fn extra_behavior(&self) -> ExtraBehavior {
        self.extra.unwrap_or_default()
    }

    #[must_use]
    pub fn inf_nan_allowed(&self) -> bool {
        self.allow_inf_nan.unwrap_or(true)
    }

    #[must_use]
    pub fn populates_by_name(&self) -> bool {
        self.populate_by_name.unwrap_or(false)
    }
}
