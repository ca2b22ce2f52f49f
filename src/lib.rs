//! OpenAPI allOf Flattener
//!
//! Dereferences `$ref` pointers in OpenAPI v3 documents and collapses
//! `allOf` schema compositions into single flattened schemas.
//!
//! The library walks every schema-bearing location reachable from the
//! document root - request bodies, responses, callback operations (at any
//! nesting depth), and the reusable `components` categories - and rewrites
//! each `allOf` composition in place. Merge conflicts at one location never
//! abort the rest of the document.
//!
//! # Example
//!
//! ```
//! use oas_flatten::{flatten, FlattenOptions};
//! use serde_json::json;
//!
//! let mut doc = json!({
//!     "paths": {
//!         "/widgets": {
//!             "get": {
//!                 "responses": {
//!                     "200": {
//!                         "content": {
//!                             "application/json": {
//!                                 "schema": {
//!                                     "allOf": [
//!                                         { "type": "object",
//!                                           "properties": { "id": { "type": "string" } } },
//!                                         { "required": ["id"] }
//!                                     ]
//!                                 }
//!                             }
//!                         }
//!                     }
//!                 }
//!             }
//!         }
//!     }
//! });
//!
//! let report = flatten(&mut doc, &FlattenOptions::default());
//! assert!(report.is_clean());
//!
//! let schema = &doc["paths"]["/widgets"]["get"]["responses"]["200"]
//!     ["content"]["application/json"]["schema"];
//! assert!(schema.get("allOf").is_none());
//! assert_eq!(schema["required"], json!(["id"]));
//! ```
//!
//! # Pipeline
//!
//! The CLI runs three stages over one in-memory document:
//!
//! 1. [`load_document`] + [`dereference`] - load JSON or YAML and inline
//!    `$ref` pointers (circular refs are left in place by default).
//! 2. [`flatten`] - merge every reachable `allOf` composition.
//! 3. [`write_document`] - serialize to JSON or YAML, chosen by the output
//!    file extension.

mod error;
mod loader;
mod merge;
mod types;
mod walker;
mod writer;

pub use error::{LoadError, MergeError, WriteError};
pub use loader::{dereference, is_url, load_document, load_document_str, navigate_fragment};
pub use merge::merge_all_of;
pub use types::{CircularRefPolicy, FlattenOptions, MergeOptions};
pub use walker::{flatten, FlattenReport, MergeFailure};
pub use writer::{render, write_document, OutputFormat};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
