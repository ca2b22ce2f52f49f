//! Error types for document loading, schema merging, and output writing.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading or dereferencing a source document.
#[derive(Debug, Error)]
pub enum LoadError {
    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[cfg(not(feature = "remote"))]
    #[error("cannot fetch {url}: remote refs require the 'remote' feature")]
    RemoteDisabled { url: String },

    // Parse errors (exit code 2)
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid YAML: {source}")]
    InvalidYaml {
        #[source]
        source: serde_yaml::Error,
    },

    #[error("cannot parse {path}: not valid JSON or YAML")]
    UnknownFormat { path: PathBuf },

    // Reference errors (exit code 2)
    #[error("unresolvable $ref \"{reference}\": {message}")]
    BadReference { reference: String, message: String },

    #[error("circular reference detected: {reference}")]
    CircularReference { reference: String },
}

impl LoadError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LoadError::FileNotFound { .. } | LoadError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            LoadError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while merging the members of an `allOf` composition.
///
/// These are recoverable per schema location: the walker reports them and
/// leaves the offending location unmerged.
#[derive(Debug, Error)]
pub enum MergeError {
    #[error("conflicting \"{keyword}\" values: {left} vs {right}")]
    Conflict {
        keyword: String,
        left: String,
        right: String,
    },

    #[error("enum members have no values in common")]
    EmptyEnum,

    #[error("allOf member still contains $ref \"{reference}\" (dereference first)")]
    UnresolvedRef { reference: String },

    #[error("allOf must be an array of schemas, got {actual}")]
    InvalidComposition { actual: String },
}

/// Errors while serializing the transformed document to disk.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("unrecognised output file type: {path}")]
    UnsupportedFormat { path: PathBuf },

    #[error("cannot write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot serialize document as JSON: {source}")]
    JsonSerialize {
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize document as YAML: {source}")]
    YamlSerialize {
        #[source]
        source: serde_yaml::Error,
    },
}

impl WriteError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            WriteError::Io { .. } => 3,
            _ => 2,
        }
    }
}
