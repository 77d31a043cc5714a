//! File-processing errors raised while discovering connectivity.
//!
//! Every error carries a location (file, 1-based line, 0-based document
//! index) and two severity flags:
//! - `fatal` - downstream output must not be trusted; the run stops.
//! - `severe` - output is usable with caveats; the run stops only in fail-fast mode.
//!
//! Errors that are neither are advisory and only logged.

use std::fmt;
use std::path::{Path, PathBuf};

/// Line number used when the location inside a file is unknown.
pub const UNKNOWN_LINE: usize = 0;
/// Document index used when the document inside a file is unknown.
pub const UNKNOWN_DOC_INDEX: i32 = -1;

/// The underlying reason for a [`FileProcessingError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("no yaml or json files found")]
    NoManifestsFound,

    #[error("no relevant Kubernetes resources found")]
    NoRelevantResourcesFound,

    #[error("configmap {config_map} referenced by {workload} was not found")]
    ConfigMapNotFound { config_map: String, workload: String },

    #[error("configmap {config_map} referenced by {workload} has no key {key}")]
    ConfigMapKeyNotFound {
        config_map: String,
        key: String,
        workload: String,
    },

    #[error("failed scanning {kind} resource: {reason}")]
    FailedScanningResource { kind: String, reason: String },

    #[error("document does not contain a Kubernetes object: {0}")]
    BadObject(String),

    #[error("malformed yaml document: {0}")]
    MalformedYamlDoc(String),

    #[error("failed reading file: {0}")]
    FailedReadingFile(String),

    #[error("error accessing directory: {0}")]
    FailedAccessingDir(String),

    #[error("invalid connection entry: {0}")]
    InvalidConnectionsEntry(String),
}

/// An error found while processing one manifest file (or one object in it).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileProcessingError {
    kind: ErrorKind,
    file_path: Option<PathBuf>,
    line_number: usize,
    doc_index: i32,
    fatal: bool,
    severe: bool,
}

impl FileProcessingError {
    fn new(kind: ErrorKind, fatal: bool, severe: bool) -> Self {
        Self {
            kind,
            file_path: None,
            line_number: UNKNOWN_LINE,
            doc_index: UNKNOWN_DOC_INDEX,
            fatal,
            severe,
        }
    }

    /// Attach the file the error was found in.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    /// Attach the 1-based line and 0-based document index.
    pub fn with_location(mut self, line_number: usize, doc_index: i32) -> Self {
        self.line_number = line_number;
        self.doc_index = doc_index;
        self
    }

    pub fn no_manifests_found(dir: &Path) -> Self {
        Self::new(ErrorKind::NoManifestsFound, false, false).with_file(dir)
    }

    pub fn no_relevant_resources_found() -> Self {
        Self::new(ErrorKind::NoRelevantResourcesFound, true, true)
    }

    pub fn config_map_not_found(config_map: &str, workload: &str) -> Self {
        Self::new(
            ErrorKind::ConfigMapNotFound {
                config_map: config_map.to_string(),
                workload: workload.to_string(),
            },
            false,
            false,
        )
    }

    pub fn config_map_key_not_found(config_map: &str, key: &str, workload: &str) -> Self {
        Self::new(
            ErrorKind::ConfigMapKeyNotFound {
                config_map: config_map.to_string(),
                key: key.to_string(),
                workload: workload.to_string(),
            },
            false,
            false,
        )
    }

    pub fn failed_scanning_resource(kind: &str, reason: impl fmt::Display) -> Self {
        Self::new(
            ErrorKind::FailedScanningResource {
                kind: kind.to_string(),
                reason: reason.to_string(),
            },
            false,
            false,
        )
    }

    pub fn bad_object(reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadObject(reason.into()), false, true)
    }

    pub fn malformed_yaml_doc(reason: impl fmt::Display) -> Self {
        Self::new(ErrorKind::MalformedYamlDoc(reason.to_string()), false, true)
    }

    pub fn failed_reading_file(path: &Path, reason: impl fmt::Display) -> Self {
        Self::new(ErrorKind::FailedReadingFile(reason.to_string()), false, true).with_file(path)
    }

    /// A directory that could not be read. Fatal only for a walk root.
    pub fn failed_accessing_dir(path: &Path, reason: impl fmt::Display, is_root: bool) -> Self {
        Self::new(ErrorKind::FailedAccessingDir(reason.to_string()), is_root, true).with_file(path)
    }

    pub fn invalid_connections_entry(path: &Path, line_number: usize, reason: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidConnectionsEntry(reason.into()), false, false)
            .with_file(path)
            .with_location(line_number, UNKNOWN_DOC_INDEX)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    /// 1-based line, or [`UNKNOWN_LINE`].
    pub fn line_number(&self) -> usize {
        self.line_number
    }

    /// 0-based document index, or [`UNKNOWN_DOC_INDEX`].
    pub fn doc_index(&self) -> i32 {
        self.doc_index
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }

    pub fn is_severe(&self) -> bool {
        self.severe
    }

    /// Human readable `file:line` prefix, empty when nothing is known.
    pub fn location(&self) -> String {
        match (&self.file_path, self.line_number) {
            (None, _) => String::new(),
            (Some(path), UNKNOWN_LINE) => path.display().to_string(),
            (Some(path), line) => format!("{}:{}", path.display(), line),
        }
    }
}

impl fmt::Display for FileProcessingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = self.location();
        if location.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", location, self.kind)
        }
    }
}

impl std::error::Error for FileProcessingError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_classification() {
        let fatal = FileProcessingError::no_relevant_resources_found();
        assert!(fatal.is_fatal());
        assert!(fatal.is_severe());

        let advisory = FileProcessingError::config_map_not_found("default/cfg", "web");
        assert!(!advisory.is_fatal());
        assert!(!advisory.is_severe());

        let root = FileProcessingError::failed_accessing_dir(Path::new("/nope"), "denied", true);
        assert!(root.is_fatal());
        let nested = FileProcessingError::failed_accessing_dir(Path::new("/nope/x"), "denied", false);
        assert!(!nested.is_fatal());
        assert!(nested.is_severe());
    }

    #[test]
    fn test_display_includes_location() {
        let err = FileProcessingError::malformed_yaml_doc("bad indent")
            .with_file("k8s/app.yaml")
            .with_location(12, 1);
        assert_eq!(err.to_string(), "k8s/app.yaml:12: malformed yaml document: bad indent");
        assert_eq!(err.doc_index(), 1);

        let bare = FileProcessingError::no_relevant_resources_found();
        assert_eq!(bare.location(), "");
        assert_eq!(bare.line_number(), UNKNOWN_LINE);
        assert_eq!(bare.doc_index(), UNKNOWN_DOC_INDEX);
    }
}
