//! Document loading and `$ref` dereferencing.
//!
//! Handles loading OpenAPI documents from JSON or YAML files and inlining
//! `$ref` pointers, with a configurable policy for circular references.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::LoadError;
use crate::types::CircularRefPolicy;

#[cfg(feature = "remote")]
use std::time::Duration;

/// Default timeout for HTTP requests (10 seconds).
#[cfg(feature = "remote")]
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Load a document from a file path.
///
/// The format is chosen by extension: `.json` parses as JSON,
/// `.yaml`/`.yml` as YAML. Any other extension is tried as JSON first,
/// then YAML.
///
/// # Errors
///
/// Returns `LoadError::FileNotFound` if the file doesn't exist, or a parse
/// error if the content isn't valid for the detected format.
pub fn load_document(path: &Path) -> Result<Value, LoadError> {
    if !path.exists() {
        return Err(LoadError::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = std::fs::read_to_string(path).map_err(|source| LoadError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;

    match extension(path) {
        Some("json") => {
            serde_json::from_str(&content).map_err(|source| LoadError::InvalidJson { source })
        }
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|source| LoadError::InvalidYaml { source })
        }
        _ => serde_json::from_str(&content)
            .or_else(|_| serde_yaml::from_str(&content))
            .map_err(|_| LoadError::UnknownFormat {
                path: path.to_path_buf(),
            }),
    }
}

/// Load a document from a string, trying JSON first, then YAML.
///
/// # Errors
///
/// Returns `LoadError::InvalidJson` if the string parses as neither.
pub fn load_document_str(content: &str) -> Result<Value, LoadError> {
    match serde_json::from_str(content) {
        Ok(value) => Ok(value),
        Err(source) => {
            serde_yaml::from_str(content).map_err(|_| LoadError::InvalidJson { source })
        }
    }
}

/// Load a document from an HTTP/HTTPS URL.
///
/// Requires the `remote` feature (enabled by default).
///
/// # Errors
///
/// Returns `LoadError::NetworkError` if the request fails,
/// or `LoadError::InvalidJson` if the response isn't valid JSON.
#[cfg(feature = "remote")]
pub fn load_document_url(url: &str) -> Result<Value, LoadError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let response = response
        .error_for_status()
        .map_err(|source| LoadError::NetworkError {
            url: url.to_string(),
            source,
        })?;

    let body = response.text().map_err(|source| LoadError::NetworkError {
        url: url.to_string(),
        source,
    })?;

    load_document_str(&body)
}

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Navigate a JSON Pointer fragment (e.g., "#/components/schemas/Widget").
///
/// Returns the value at the given JSON Pointer path within the document.
/// The fragment should start with '#'.
pub fn navigate_fragment(document: &Value, fragment: &str) -> Result<Value, LoadError> {
    let path = fragment.trim_start_matches('#').trim_start_matches('/');
    if path.is_empty() {
        return Ok(document.clone());
    }

    let mut current = document;
    for part in path.split('/') {
        // Unescape JSON Pointer encoding (~1 = /, ~0 = ~)
        let key = part.replace("~1", "/").replace("~0", "~");
        current = current.get(&key).ok_or_else(|| LoadError::BadReference {
            reference: fragment.to_string(),
            message: "fragment not found".to_string(),
        })?;
    }
    Ok(current.clone())
}

/// Recursively resolve and inline every `$ref` pointer in a document.
///
/// Internal refs (`#/...`) are resolved against the document root; external
/// refs load the referenced file (relative to `base_dir`) and resolve that
/// file's internal refs against it. Refs forming a cycle are handled per
/// `policy`: [`CircularRefPolicy::Ignore`] leaves the `$ref` in place so the
/// output stays structurally parseable, [`CircularRefPolicy::Error`] fails.
///
/// # Arguments
/// * `document` - The document to process (modified in place)
/// * `base_dir` - Base directory for resolving relative file refs
/// * `policy` - What to do when a reference cycle is detected
pub fn dereference(
    document: &mut Value,
    base_dir: &Path,
    policy: CircularRefPolicy,
) -> Result<(), LoadError> {
    // Snapshot of the root so internal refs resolve against the original
    // structure while the tree is mutated.
    let root = document.clone();
    dereference_inner(
        document,
        &root,
        "",
        base_dir,
        policy,
        &mut HashSet::new(),
    )
}

fn dereference_inner(
    value: &mut Value,
    root: &Value, // Root of the current file, for internal ref resolution
    scope: &str,  // Identity of the current file, for cycle tracking
    base_dir: &Path,
    policy: CircularRefPolicy,
    visited: &mut HashSet<String>,
) -> Result<(), LoadError> {
    match value {
        Value::Object(obj) => {
            let ref_val = obj.get("$ref").and_then(|v| v.as_str()).map(String::from);
            if let Some(ref_val) = ref_val {
                if ref_val.starts_with('#') {
                    // Self-root refs can never be inlined into a finite tree
                    let visit_key = format!("{}{}", scope, ref_val);
                    if ref_val == "#" || visited.contains(&visit_key) {
                        return on_cycle(&ref_val, policy);
                    }

                    debug!(reference = %ref_val, "inlining internal $ref");
                    let mut target = navigate_fragment(root, &ref_val)?;
                    visited.insert(visit_key.clone());
                    dereference_inner(&mut target, root, scope, base_dir, policy, visited)?;
                    visited.remove(&visit_key);

                    splice_target(obj, target);
                    return Ok(());
                }

                // External ref - relative file path or absolute URL
                let (file_part, fragment) = match ref_val.find('#') {
                    Some(idx) => (&ref_val[..idx], Some(&ref_val[idx..])),
                    None => (ref_val.as_str(), None),
                };

                if is_url(file_part) {
                    return inline_remote_ref(
                        obj, file_part, fragment, base_dir, policy, visited,
                    );
                }

                let ref_path = base_dir.join(file_part);
                let canonical = ref_path.canonicalize().unwrap_or(ref_path.clone());
                let visit_key =
                    format!("{}|{}", canonical.display(), fragment.unwrap_or(""));
                if visited.contains(&visit_key) {
                    return on_cycle(&ref_val, policy);
                }

                debug!(reference = %ref_val, "inlining external $ref");
                let loaded = load_document(&ref_path)?;
                let mut target = match fragment {
                    Some(frag) => navigate_fragment(&loaded, frag)?,
                    None => loaded.clone(),
                };

                visited.insert(visit_key.clone());
                let ref_dir = ref_path.parent().unwrap_or(base_dir);
                let file_scope = format!("{}:", canonical.display());
                dereference_inner(
                    &mut target,
                    &loaded,
                    &file_scope,
                    ref_dir,
                    policy,
                    visited,
                )?;
                visited.remove(&visit_key);

                splice_target(obj, target);
                return Ok(());
            }

            for child in obj.values_mut() {
                dereference_inner(child, root, scope, base_dir, policy, visited)?;
            }
        }
        Value::Array(arr) => {
            for item in arr {
                dereference_inner(item, root, scope, base_dir, policy, visited)?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// Inline a `$ref` pointing at an HTTP(S) URL.
#[cfg(feature = "remote")]
fn inline_remote_ref(
    obj: &mut serde_json::Map<String, Value>,
    url: &str,
    fragment: Option<&str>,
    base_dir: &Path,
    policy: CircularRefPolicy,
    visited: &mut HashSet<String>,
) -> Result<(), LoadError> {
    let visit_key = format!("{}|{}", url, fragment.unwrap_or(""));
    if visited.contains(&visit_key) {
        return on_cycle(url, policy);
    }

    debug!(url, "fetching remote $ref");
    let loaded = load_document_url(url)?;
    let mut target = match fragment {
        Some(frag) => navigate_fragment(&loaded, frag)?,
        None => loaded.clone(),
    };

    visited.insert(visit_key.clone());
    let file_scope = format!("{}:", url);
    dereference_inner(&mut target, &loaded, &file_scope, base_dir, policy, visited)?;
    visited.remove(&visit_key);

    splice_target(obj, target);
    Ok(())
}

#[cfg(not(feature = "remote"))]
fn inline_remote_ref(
    _obj: &mut serde_json::Map<String, Value>,
    url: &str,
    _fragment: Option<&str>,
    _base_dir: &Path,
    _policy: CircularRefPolicy,
    _visited: &mut HashSet<String>,
) -> Result<(), LoadError> {
    Err(LoadError::RemoteDisabled {
        url: url.to_string(),
    })
}

/// Replace the `$ref` key with the resolved target's content.
///
/// Sibling keys next to `$ref` win over keys from the target.
fn splice_target(obj: &mut serde_json::Map<String, Value>, target: Value) {
    obj.remove("$ref");
    if let Value::Object(target_obj) = target {
        for (k, v) in target_obj {
            obj.entry(k).or_insert(v);
        }
    }
}

fn on_cycle(reference: &str, policy: CircularRefPolicy) -> Result<(), LoadError> {
    match policy {
        CircularRefPolicy::Ignore => {
            debug!(reference, "leaving circular $ref in place");
            Ok(())
        }
        CircularRefPolicy::Error => Err(LoadError::CircularReference {
            reference: reference.to_string(),
        }),
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|e| e.to_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn load_document_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "api.json", r#"{"openapi": "3.0.0"}"#);

        let doc = load_document(&path).unwrap();
        assert_eq!(doc["openapi"], "3.0.0");
    }

    #[test]
    fn load_document_yaml() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "api.yaml", "openapi: 3.0.0\npaths: {}\n");

        let doc = load_document(&path).unwrap();
        assert_eq!(doc["openapi"], "3.0.0");
        assert!(doc["paths"].is_object());
    }

    #[test]
    fn load_document_not_found() {
        let result = load_document(Path::new("/nonexistent/api.json"));
        assert!(matches!(result, Err(LoadError::FileNotFound { .. })));
    }

    #[test]
    fn load_document_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = write_file(&dir, "api.json", "not json at all {");

        let result = load_document(&path);
        assert!(matches!(result, Err(LoadError::InvalidJson { .. })));
    }

    #[test]
    fn load_document_str_json_and_yaml() {
        let doc = load_document_str(r#"{"openapi": "3.0.0"}"#).unwrap();
        assert_eq!(doc["openapi"], "3.0.0");

        let doc = load_document_str("openapi: 3.0.0\n").unwrap();
        assert_eq!(doc["openapi"], "3.0.0");
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/api.json"));
        assert!(is_url("http://example.com/api.json"));
        assert!(!is_url("./api.json"));
        assert!(!is_url("/abs/api.json"));
    }

    #[test]
    fn navigate_fragment_nested() {
        let doc = json!({
            "components": {
                "schemas": {
                    "Widget": { "type": "object" }
                }
            }
        });
        let target = navigate_fragment(&doc, "#/components/schemas/Widget").unwrap();
        assert_eq!(target, json!({ "type": "object" }));
    }

    #[test]
    fn navigate_fragment_missing() {
        let doc = json!({ "components": {} });
        let result = navigate_fragment(&doc, "#/components/schemas/Missing");
        assert!(matches!(result, Err(LoadError::BadReference { .. })));
    }

    #[test]
    fn navigate_fragment_unescapes_pointer() {
        let doc = json!({ "paths": { "/widgets": { "get": {} } } });
        let target = navigate_fragment(&doc, "#/paths/~1widgets/get").unwrap();
        assert_eq!(target, json!({}));
    }

    #[test]
    fn dereference_internal_ref() {
        let mut doc = json!({
            "paths": {
                "/widgets": {
                    "get": {
                        "responses": {
                            "200": {
                                "content": {
                                    "application/json": {
                                        "schema": { "$ref": "#/components/schemas/Widget" }
                                    }
                                }
                            }
                        }
                    }
                }
            },
            "components": {
                "schemas": {
                    "Widget": { "type": "object" }
                }
            }
        });

        dereference(&mut doc, Path::new("."), CircularRefPolicy::Ignore).unwrap();

        let schema = &doc["paths"]["/widgets"]["get"]["responses"]["200"]["content"]
            ["application/json"]["schema"];
        assert_eq!(schema["type"], "object");
        assert!(schema.get("$ref").is_none());
    }

    #[test]
    fn dereference_chained_internal_refs() {
        let mut doc = json!({
            "paths": {},
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/B" },
                    "B": { "type": "string" }
                }
            }
        });

        dereference(&mut doc, Path::new("."), CircularRefPolicy::Ignore).unwrap();
        assert_eq!(doc["components"]["schemas"]["A"]["type"], "string");
    }

    #[test]
    fn dereference_external_file_ref() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "widget.json",
            r#"{"type": "object", "properties": {"id": {"type": "string"}}}"#,
        );
        let mut doc = json!({
            "paths": {},
            "components": {
                "schemas": {
                    "Widget": { "$ref": "widget.json" }
                }
            }
        });

        dereference(&mut doc, dir.path(), CircularRefPolicy::Ignore).unwrap();
        assert_eq!(doc["components"]["schemas"]["Widget"]["type"], "object");
    }

    #[test]
    fn dereference_external_file_ref_with_fragment() {
        let dir = TempDir::new().unwrap();
        write_file(
            &dir,
            "shared.yaml",
            "definitions:\n  Id:\n    type: string\n",
        );
        let mut doc = json!({
            "paths": {},
            "components": {
                "schemas": {
                    "Id": { "$ref": "shared.yaml#/definitions/Id" }
                }
            }
        });

        dereference(&mut doc, dir.path(), CircularRefPolicy::Ignore).unwrap();
        assert_eq!(doc["components"]["schemas"]["Id"]["type"], "string");
    }

    #[test]
    fn dereference_circular_ignore_keeps_ref() {
        let mut doc = json!({
            "paths": {},
            "components": {
                "schemas": {
                    "Node": {
                        "type": "object",
                        "properties": {
                            "next": { "$ref": "#/components/schemas/Node" }
                        }
                    }
                }
            }
        });

        dereference(&mut doc, Path::new("."), CircularRefPolicy::Ignore).unwrap();

        // The cycle is broken by leaving an inner self-reference in place.
        let node = &doc["components"]["schemas"]["Node"];
        assert_eq!(node["type"], "object");
        let inner = &node["properties"]["next"]["properties"]["next"];
        assert_eq!(inner["$ref"], "#/components/schemas/Node");
    }

    #[test]
    fn dereference_circular_error_policy() {
        let mut doc = json!({
            "paths": {},
            "components": {
                "schemas": {
                    "Node": {
                        "properties": {
                            "next": { "$ref": "#/components/schemas/Node" }
                        }
                    }
                }
            }
        });

        let result = dereference(&mut doc, Path::new("."), CircularRefPolicy::Error);
        assert!(matches!(result, Err(LoadError::CircularReference { .. })));
    }

    #[test]
    fn dereference_missing_fragment_errors() {
        let mut doc = json!({
            "paths": {},
            "components": {
                "schemas": {
                    "A": { "$ref": "#/components/schemas/Nope" }
                }
            }
        });

        let result = dereference(&mut doc, Path::new("."), CircularRefPolicy::Ignore);
        assert!(matches!(result, Err(LoadError::BadReference { .. })));
    }

    #[test]
    fn dereference_sibling_keys_win() {
        let mut doc = json!({
            "paths": {},
            "components": {
                "schemas": {
                    "A": {
                        "$ref": "#/components/schemas/B",
                        "description": "local override"
                    },
                    "B": { "type": "string", "description": "from B" }
                }
            }
        });

        dereference(&mut doc, Path::new("."), CircularRefPolicy::Ignore).unwrap();
        let a = &doc["components"]["schemas"]["A"];
        assert_eq!(a["type"], "string");
        assert_eq!(a["description"], "local override");
    }
}
