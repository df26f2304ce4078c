//! Reading definition documents and input values.

use std::fs;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};
use coercion::{SchemaDocument, TypeRegistry, Value};
use tracing::info;

/// Load a schema document, choosing YAML or JSON by file extension.
///
/// # Errors
///
/// Returns an error if the file cannot be read or does not define a valid
/// set of enums and schemas.
pub fn load_registry(path: &Path) -> Result<TypeRegistry> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read schema document {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml"));
    let document = if is_yaml {
        SchemaDocument::from_yaml_str(&text)
    } else {
        SchemaDocument::from_json_str(&text)
    }
    .with_context(|| format!("invalid schema document {}", path.display()))?;
    let registry = document
        .into_registry()
        .with_context(|| format!("invalid schema document {}", path.display()))?;
    info!(path = %path.display(), "loaded schema document");
    Ok(registry)
}

/// Input text from `--value`, `--input FILE` (`-` for stdin), or stdin.
///
/// # Errors
///
/// Returns an error if the file or stdin cannot be read.
pub fn read_input(file: Option<&Path>, value: Option<&str>) -> Result<String> {
    if let Some(value) = value {
        return Ok(value.to_owned());
    }
    match file {
        Some(path) if path != Path::new("-") => fs::read_to_string(path)
            .with_context(|| format!("failed to read input {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("failed to read input from stdin")?;
            Ok(text)
        }
    }
}

/// Decode native-source input: JSON with tagged objects for values JSON
/// cannot express (`{"$tuple": [...]}`, `{"$uuid": "..."}` and so on).
///
/// # Errors
///
/// Returns an error if the text is not JSON or carries a malformed tag.
pub fn decode_native(text: &str) -> Result<Value> {
    let json: serde_json::Value =
        serde_json::from_str(text).context("native input must be tagged JSON")?;
    Ok(Value::from_tagged_json(&json)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_value_wins_over_file() {
        let text = read_input(Some(Path::new("/does/not/exist")), Some("[1]")).unwrap();
        assert_eq!(text, "[1]");
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = read_input(Some(Path::new("/does/not/exist.json")), None).unwrap_err();
        assert!(err.to_string().contains("failed to read input"));
    }

    #[test]
    fn test_decode_native_tags() {
        let value = decode_native(r#"{"$tuple": [1, "a"]}"#).unwrap();
        assert_eq!(value, Value::Tuple(vec![Value::Int(1), Value::str("a")]));
        assert!(decode_native("not json").is_err());
    }
}
