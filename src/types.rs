//! Core types for OpenAPI document flattening.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// HTTP methods recognised on a Path Item, in visit order.
pub const HTTP_METHODS: &[&str] = &["get", "head", "post", "patch", "put", "delete"];

/// The only media type whose schemas are flattened.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Policy for `$ref` cycles encountered during dereferencing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CircularRefPolicy {
    /// Leave the circular `$ref` in place and keep going.
    #[default]
    Ignore,
    /// Fail the whole dereference pass.
    Error,
}

/// Options for the allOf merger.
#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    /// When true, `additionalProperties` never participates in (or blocks)
    /// a merge. Matches the common flattening configuration where `false`
    /// on one member must not erase properties contributed by another.
    pub ignore_additional_properties: bool,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            ignore_additional_properties: true,
        }
    }
}

/// Options for the document walker.
#[derive(Debug, Clone, Default)]
pub struct FlattenOptions {
    /// Whether the document was fully dereferenced before flattening.
    /// Controls how `components` is treated.
    pub dereferenced: bool,
    /// Keep `components` in the output even when `dereferenced` is true.
    /// By default a fully dereferenced document drops its components since
    /// every former `$ref` target has been inlined.
    pub keep_components: bool,
    /// Options forwarded to the merger at each schema location.
    pub merge: MergeOptions,
}

impl FlattenOptions {
    /// Options for a fully dereferenced document.
    pub fn dereferenced() -> Self {
        Self {
            dereferenced: true,
            ..Self::default()
        }
    }

    /// Set whether components survive in dereferenced output.
    pub fn keep_components(mut self, keep: bool) -> Self {
        self.keep_components = keep;
        self
    }
}
