//! Validation report types.

use serde::Serialize;

use crate::dispatch::ValidationOutcome;
use crate::error::ErrorRecord;
use crate::target::Source;
use crate::value::Value;

/// Result of one validation run, ready for rendering.
#[derive(Debug, Clone, Serialize)]
#[non_exhaustive]
pub struct ValidationReport {
    /// Canonical type expression or schema name.
    pub target: String,
    pub source: Source,
    /// Call-level strict override; `None` means the configured default.
    pub strict: Option<bool>,
    pub ok: bool,
    /// The coerced value on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Flat records, or one record per failing container when grouped.
    pub errors: Vec<ErrorRecord>,
}

impl ValidationReport {
    #[must_use]
    pub fn from_outcome(
        target: &str,
        source: Source,
        strict: Option<bool>,
        outcome: ValidationOutcome,
        grouped: bool,
    ) -> Self {
        let (value, errors) = match outcome {
            Ok(value) => (Some(value), Vec::new()),
            Err(error) if grouped => (None, error.grouped().to_vec()),
            Err(error) => (None, error.into_records()),
        };
        Self {
            target: target.to_owned(),
            source,
            strict,
            ok: errors.is_empty(),
            value,
            errors,
        }
    }

    /// Number of leaf failures reported.
    #[must_use]
    pub fn errors_count(&self) -> usize {
        self.errors.iter().map(leaf_count).sum()
    }

    #[must_use]
    pub fn mode_label(&self) -> &'static str {
        match self.strict {
            Some(true) => "strict",
            Some(false) => "lax",
            None => "default",
        }
    }
}

fn leaf_count(record: &ErrorRecord) -> usize {
    if record.nested.is_empty() {
        1
    } else {
        record.nested.iter().map(leaf_count).sum()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch;
    use crate::target::{Mode, TargetType};

    #[test]
    fn test_grouped_report_counts_leaves() {
        let input = Value::List(vec![Value::str("a"), Value::Int(1), Value::str("b")]);
        let target = TargetType::list_of(TargetType::Int);

        let flat = ValidationReport::from_outcome(
            "list[int]",
            Source::Python,
            None,
            dispatch(&target, &input, Mode::Lax, Source::Python),
            false,
        );
        assert!(!flat.ok);
        assert_eq!(flat.errors.len(), 2);
        assert_eq!(flat.errors_count(), 2);

        let grouped = ValidationReport::from_outcome(
            "list[int]",
            Source::Python,
            None,
            dispatch(&target, &input, Mode::Lax, Source::Python),
            true,
        );
        assert_eq!(grouped.errors.len(), 1);
        assert_eq!(grouped.errors_count(), 2);
        assert_eq!(grouped.mode_label(), "default");
    }

    #[test]
    fn test_success_report_serializes_value() {
        let report = ValidationReport::from_outcome(
            "int",
            Source::Json,
            Some(true),
            Ok(Value::Int(3)),
            false,
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["ok"], true);
        assert_eq!(json["value"], 3);
        assert_eq!(json["source"], "json");
        assert_eq!(json["errors"].as_array().unwrap().len(), 0);
    }
}
