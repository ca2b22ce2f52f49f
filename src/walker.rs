//! Document traversal - applies the allOf merger at every schema-bearing
//! location reachable from an OpenAPI document root.
//!
//! The walk covers path operations (request bodies, responses, callbacks,
//! with callbacks re-entered as nested path maps) and, for documents that
//! were not fully dereferenced, the reusable `components` categories.
//! Merge conflicts are recovered per location: the offending schema stays
//! unmodified and the walk continues.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::MergeError;
use crate::merge::merge_all_of;
use crate::types::{FlattenOptions, HTTP_METHODS, JSON_MEDIA_TYPE};

/// Callback path items can nest operations that declare further callbacks.
/// Past this depth the walk stops descending.
const MAX_CALLBACK_DEPTH: usize = 32;

/// A schema location whose `allOf` members could not be merged.
#[derive(Debug)]
pub struct MergeFailure {
    /// JSON Pointer (RFC 6901) to the schema that was left unmerged.
    pub location: String,
    pub error: MergeError,
}

impl std::fmt::Display for MergeFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.location, self.error)
    }
}

/// Outcome of a flattening pass.
#[derive(Debug, Default)]
pub struct FlattenReport {
    /// Number of schema locations rewritten by the merger.
    pub merged: usize,
    /// Locations left unmerged because their members conflict.
    pub failures: Vec<MergeFailure>,
}

impl FlattenReport {
    /// True when no location failed to merge.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Flatten every `allOf` composition reachable from the document root.
///
/// Mutates schema fragments in place and leaves all other content
/// unchanged. When `options.dereferenced` is set and `keep_components`
/// is not, the redundant `components` section is dropped from the output;
/// otherwise each component category is processed per its shape.
pub fn flatten(document: &mut Value, options: &FlattenOptions) -> FlattenReport {
    let mut walker = Walker {
        options,
        report: FlattenReport::default(),
    };

    if let Some(paths) = document.get_mut("paths").and_then(Value::as_object_mut) {
        for (path, item) in paths.iter_mut() {
            debug!(path = %path, "visiting path");
            let location = format!("/paths/{}", escape_pointer(path));
            walker.visit_path_item(item, &location, 0);
        }
    }

    if options.dereferenced && !options.keep_components {
        // Fully dereferenced: every former $ref target is inlined, so the
        // reusable definitions are dead weight in the output.
        if let Some(root) = document.as_object_mut() {
            if root.remove("components").is_some() {
                debug!("dropped components from dereferenced document");
            }
        }
    } else if let Some(components) = document.get_mut("components") {
        walker.visit_components(components);
    }

    walker.report
}

struct Walker<'a> {
    options: &'a FlattenOptions,
    report: FlattenReport,
}

impl Walker<'_> {
    /// Visit one Path Item: each recognised HTTP method present is an Operation.
    fn visit_path_item(&mut self, item: &mut Value, location: &str, depth: usize) {
        for method in HTTP_METHODS {
            if let Some(operation) = item.get_mut(*method) {
                debug!(method = *method, location, "visiting operation");
                let op_location = format!("{}/{}", location, method);
                self.visit_operation(operation, &op_location, depth);
            }
        }
    }

    fn visit_operation(&mut self, operation: &mut Value, location: &str, depth: usize) {
        if let Some(body) = operation.get_mut("requestBody") {
            self.merge_media_schema(body, &format!("{}/requestBody", location));
        }

        if let Some(responses) = operation
            .get_mut("responses")
            .and_then(Value::as_object_mut)
        {
            for (status, response) in responses.iter_mut() {
                let response_location = format!("{}/responses/{}", location, status);
                self.merge_media_schema(response, &response_location);
            }
        }

        if let Some(callbacks) = operation
            .get_mut("callbacks")
            .and_then(Value::as_object_mut)
        {
            for (name, callback) in callbacks.iter_mut() {
                let callback_location =
                    format!("{}/callbacks/{}", location, escape_pointer(name));
                self.visit_callback(callback, &callback_location, depth);
            }
        }
    }

    /// Visit a Callback object: a mapping from runtime expression to Path Item.
    fn visit_callback(&mut self, callback: &mut Value, location: &str, depth: usize) {
        if depth >= MAX_CALLBACK_DEPTH {
            warn!(location, "callback nesting exceeds depth limit, skipping");
            return;
        }
        if let Some(expressions) = callback.as_object_mut() {
            for (expression, item) in expressions.iter_mut() {
                let item_location = format!("{}/{}", location, escape_pointer(expression));
                self.visit_path_item(item, &item_location, depth + 1);
            }
        }
    }

    /// Merge the `content["application/json"].schema` of a Response or
    /// RequestBody, if present. Missing content, media type, or schema
    /// means there is nothing to merge. Other media types are never touched.
    fn merge_media_schema(&mut self, holder: &mut Value, location: &str) {
        let Some(schema) = holder
            .get_mut("content")
            .and_then(|content| content.get_mut(JSON_MEDIA_TYPE))
            .and_then(|media| media.get_mut("schema"))
        else {
            return;
        };
        let schema_location = format!(
            "{}/content/{}/schema",
            location,
            escape_pointer(JSON_MEDIA_TYPE)
        );
        self.merge_at(schema, &schema_location);
    }

    /// Visit the reusable component categories of a non-dereferenced document.
    ///
    /// `schemas` and `examples` hold raw schema fragments and are merged
    /// directly. `responses` and `requestBodies` are shaped like Response/
    /// RequestBody and go through the media-type unwrapping step. `callbacks`
    /// entries are path mappings and re-enter the path visit. `parameters`
    /// carry no composed schemas and are left alone.
    fn visit_components(&mut self, components: &mut Value) {
        for category in ["schemas", "examples"] {
            if let Some(entries) = components
                .get_mut(category)
                .and_then(Value::as_object_mut)
            {
                for (name, fragment) in entries.iter_mut() {
                    let location =
                        format!("/components/{}/{}", category, escape_pointer(name));
                    self.merge_at(fragment, &location);
                }
            }
        }

        for category in ["responses", "requestBodies"] {
            if let Some(entries) = components
                .get_mut(category)
                .and_then(Value::as_object_mut)
            {
                for (name, holder) in entries.iter_mut() {
                    let location =
                        format!("/components/{}/{}", category, escape_pointer(name));
                    self.merge_media_schema(holder, &location);
                }
            }
        }

        if let Some(entries) = components
            .get_mut("callbacks")
            .and_then(Value::as_object_mut)
        {
            for (name, callback) in entries.iter_mut() {
                let location = format!("/components/callbacks/{}", escape_pointer(name));
                self.visit_callback(callback, &location, 0);
            }
        }
    }

    /// Apply the merger at one schema location, recovering from conflicts.
    fn merge_at(&mut self, schema: &mut Value, location: &str) {
        match merge_all_of(schema, &self.options.merge) {
            Ok(merged) => {
                if merged != *schema {
                    debug!(location, "merged allOf composition");
                    self.report.merged += 1;
                    *schema = merged;
                }
            }
            Err(error) => {
                warn!(location, %error, "cannot merge allOf, leaving location unchanged");
                self.report.failures.push(MergeFailure {
                    location: location.to_string(),
                    error,
                });
            }
        }
    }
}

/// Escape a map key for use in a JSON Pointer (~0 = ~, ~1 = /).
fn escape_pointer(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
