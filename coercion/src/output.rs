//! Shared output formatting for validation reports.
//!
//! Provides JSON and plain-text formatters for `ValidationReport`.
//! Color is left to the CLI layer.

use std::io::Write;

use crate::report::ValidationReport;

/// Format a `ValidationReport` as JSON to a writer.
///
/// # Errors
///
/// Returns an error if serialization or writing fails.
pub fn write_json(report: &ValidationReport, writer: &mut dyn Write) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    writeln!(writer, "{json}")?;
    Ok(())
}

/// Format a `ValidationReport` as human-readable plain text to a writer.
///
/// # Errors
///
/// Returns an error if writing fails.
pub fn write_human(report: &ValidationReport, writer: &mut dyn Write) -> anyhow::Result<()> {
    writeln!(writer)?;
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer, "  COERCION VALIDATION REPORT")?;
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer)?;
    writeln!(writer, "  Target:  {}", report.target)?;
    writeln!(writer, "  Source:  {}", report.source)?;
    writeln!(writer, "  Mode:    {}", report.mode_label())?;
    writeln!(writer, "  Errors:  {}", report.errors_count())?;
    writeln!(writer)?;

    if let Some(value) = &report.value {
        writeln!(writer, "{}", "-".repeat(80))?;
        writeln!(writer, "  VALIDATED VALUE")?;
        writeln!(writer, "{}", "-".repeat(80))?;
        writeln!(writer, "{value}")?;
        writeln!(writer)?;
    }

    if !report.errors.is_empty() {
        writeln!(writer, "{}", "-".repeat(80))?;
        writeln!(writer, "  VALIDATION ERRORS")?;
        writeln!(writer, "{}", "-".repeat(80))?;
        for record in &report.errors {
            writeln!(writer, "{}", record.format_human_readable())?;
        }
        writeln!(writer)?;
    }

    writeln!(writer, "{}", "=".repeat(80))?;
    if report.ok {
        writeln!(writer, "\u{2713} Input is valid for {}", report.target)?;
    } else {
        let count = report.errors_count();
        writeln!(
            writer,
            "\u{2717} {count} validation error{} for {}",
            if count == 1 { "" } else { "s" },
            report.target
        )?;
    }
    writeln!(writer, "{}", "=".repeat(80))?;
    writeln!(writer)?;

    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::target::Source;
    use crate::value::Value;

    fn render(report: &ValidationReport) -> String {
        let mut out = Vec::new();
        write_human(report, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_human_success() {
        let report =
            ValidationReport::from_outcome("int", Source::Python, None, Ok(Value::Int(5)), false);
        let text = render(&report);
        assert!(text.contains("  Target:  int"));
        assert!(text.contains("VALIDATED VALUE"));
        assert!(text.contains("\u{2713} Input is valid for int"));
    }

    #[test]
    fn test_human_failure_lists_records() {
        let outcome = crate::Validator::new(crate::TargetType::Int).validate_json("\"x\"", None);
        let report = ValidationReport::from_outcome("int", Source::Json, None, outcome, false);
        let text = render(&report);
        assert!(text.contains("VALIDATION ERRORS"));
        assert!(text.contains("[kind=int_parsing"));
        assert!(text.contains("\u{2717} 1 validation error for int"));
    }

    #[test]
    fn test_json_output_is_parseable() {
        let report =
            ValidationReport::from_outcome("str", Source::Json, Some(false), Ok(Value::str("a")), false);
        let mut out = Vec::new();
        write_json(&report, &mut out).unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&out).unwrap();
        assert_eq!(parsed["target"], "str");
        assert_eq!(parsed["strict"], false);
    }
}
