//! Output serialization, dispatched on the output file extension.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::WriteError;

/// Output format derived from a destination path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

impl OutputFormat {
    /// Determine the format from a file extension.
    ///
    /// `.json` selects JSON, `.yaml`/`.yml` select YAML; anything else is
    /// unsupported.
    pub fn from_path(path: &Path) -> Result<Self, WriteError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(OutputFormat::Json),
            Some("yaml") | Some("yml") => Ok(OutputFormat::Yaml),
            _ => Err(WriteError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }
}

/// Serialize a document to `path`, format chosen by extension.
///
/// The format check happens before anything touches the filesystem, so an
/// unsupported extension never leaves a partial file behind.
///
/// # Errors
///
/// Returns `WriteError::UnsupportedFormat` for unrecognised extensions and
/// `WriteError::Io` for filesystem failures.
pub fn write_document(document: &Value, path: &Path, pretty: bool) -> Result<(), WriteError> {
    let output = render(document, OutputFormat::from_path(path)?, pretty)?;

    std::fs::write(path, output).map_err(|source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(path = %path.display(), "wrote output document");
    Ok(())
}

/// Render a document to a string in the given format.
pub fn render(document: &Value, format: OutputFormat, pretty: bool) -> Result<String, WriteError> {
    match format {
        OutputFormat::Json => {
            let rendered = if pretty {
                serde_json::to_string_pretty(document)
            } else {
                serde_json::to_string(document)
            };
            rendered.map_err(|source| WriteError::JsonSerialize { source })
        }
        OutputFormat::Yaml => {
            serde_yaml::to_string(document).map_err(|source| WriteError::YamlSerialize { source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn format_from_extension() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out.json")).unwrap(),
            OutputFormat::Json
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("out.yaml")).unwrap(),
            OutputFormat::Yaml
        );
        assert_eq!(
            OutputFormat::from_path(Path::new("out.yml")).unwrap(),
            OutputFormat::Yaml
        );
    }

    #[test]
    fn unsupported_extension_errors() {
        let result = OutputFormat::from_path(Path::new("out.txt"));
        assert!(matches!(result, Err(WriteError::UnsupportedFormat { .. })));

        let result = OutputFormat::from_path(Path::new("out"));
        assert!(matches!(result, Err(WriteError::UnsupportedFormat { .. })));
    }

    #[test]
    fn writes_json_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let doc = json!({ "openapi": "3.0.0", "paths": {} });

        write_document(&doc, &path, false).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn writes_yaml_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.yaml");
        let doc = json!({ "openapi": "3.0.0", "paths": { "/widgets": { "get": {} } } });

        write_document(&doc, &path, false).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let parsed: Value = serde_yaml::from_str(&content).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn unsupported_extension_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.txt");
        let doc = json!({ "paths": {} });

        let result = write_document(&doc, &path, false);
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn pretty_json_has_indentation() {
        let doc = json!({ "paths": {} });
        let rendered = render(&doc, OutputFormat::Json, true).unwrap();
        assert!(rendered.contains("{\n"));

        let compact = render(&doc, OutputFormat::Json, false).unwrap();
        assert!(!compact.contains('\n'));
    }
}
