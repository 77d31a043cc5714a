//! YAML and JSON parsing for Kubernetes manifests.
//!
//! A file may hold several YAML documents separated by `---` lines. Each
//! document is decoded on its own so one broken document does not hide the
//! rest of the file. Problems are returned alongside the objects that did
//! parse, located by line and document index.

use crate::analyzer::netpol::context::{K8sObject, Object, ObjectMetadata};
use crate::analyzer::netpol::errors::FileProcessingError;
use serde_yaml::Value;
use std::path::Path;

/// Objects parsed from one source, plus every problem met while parsing it.
#[derive(Debug, Default)]
pub struct ParsedManifests {
    pub objects: Vec<Object>,
    pub errors: Vec<FileProcessingError>,
}

/// Parse a YAML string containing one or more Kubernetes objects.
pub fn parse_yaml(content: &str) -> ParsedManifests {
    parse_yaml_with_path(content, Path::new("<stdin>"))
}

/// Parse YAML content with a source file path.
pub fn parse_yaml_with_path(content: &str, path: &Path) -> ParsedManifests {
    let mut parsed = ParsedManifests::default();

    for (doc_index, doc) in split_documents(content).into_iter().enumerate() {
        let doc_index = doc_index as i32;
        let value = match serde_yaml::from_str::<Value>(&doc.text) {
            Ok(value) => value,
            Err(e) => {
                let line = e
                    .location()
                    .map(|loc| doc.start_line + loc.line().saturating_sub(1))
                    .unwrap_or(doc.first_content_line);
                parsed.errors.push(
                    FileProcessingError::malformed_yaml_doc(e)
                        .with_file(path)
                        .with_location(line, doc_index),
                );
                continue;
            }
        };

        let metadata = ObjectMetadata::from_file(path)
            .with_line(doc.first_content_line)
            .with_doc_index(doc_index as usize);
        parse_value(value, &metadata, &mut parsed);
    }

    parsed
}

/// Parse a manifest file. Unreadable files yield a single error.
pub fn parse_manifest_file(path: &Path) -> ParsedManifests {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_yaml_with_path(&content, path),
        Err(e) => ParsedManifests {
            objects: Vec::new(),
            errors: vec![FileProcessingError::failed_reading_file(path, e)],
        },
    }
}

/// Convert one decoded document; `kind: List` documents are expanded.
fn parse_value(value: Value, metadata: &ObjectMetadata, parsed: &mut ParsedManifests) {
    let error_at = |err: FileProcessingError| {
        err.with_file(&metadata.file_path).with_location(
            metadata.line_number.unwrap_or_default(),
            metadata.doc_index.map(|i| i as i32).unwrap_or(-1),
        )
    };

    if !value.is_mapping() {
        let reason = if value.is_null() {
            "document is empty".to_string()
        } else {
            "document is not a mapping".to_string()
        };
        parsed.errors.push(error_at(FileProcessingError::bad_object(reason)));
        return;
    }

    let Some(kind) = value.get("kind").and_then(Value::as_str).map(str::to_string) else {
        parsed
            .errors
            .push(error_at(FileProcessingError::bad_object("missing kind")));
        return;
    };
    let api_version = value
        .get("apiVersion")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if kind.ends_with("List") && value.get("items").is_some() {
        if let Some(Value::Sequence(items)) = value.get("items").cloned() {
            for item in items {
                parse_value(item, metadata, parsed);
            }
        }
        return;
    }

    match K8sObject::from_value(&api_version, &kind, value) {
        Ok(object) => parsed.objects.push(Object::new(metadata.clone(), object)),
        Err(e) => parsed
            .errors
            .push(error_at(FileProcessingError::failed_scanning_resource(&kind, e))),
    }
}

/// A YAML document and where it starts in its file.
#[derive(Debug)]
struct Document {
    text: String,
    /// 1-based line of the document's first line.
    start_line: usize,
    /// 1-based line of the first line that is neither blank nor a comment.
    first_content_line: usize,
}

fn is_separator(line: &str) -> bool {
    let line = line.trim_end();
    line == "---" || line.starts_with("--- ") || line.starts_with("---\t")
}

fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#') && trimmed != "..."
}

/// Split on `---` lines, dropping documents without content.
fn split_documents(content: &str) -> Vec<Document> {
    let mut documents = Vec::new();
    let mut text = String::new();
    let mut start_line = 1;
    let mut first_content_line = None;

    let mut flush = |text: &mut String, start_line: usize, first: Option<usize>| {
        if let Some(first_content_line) = first {
            documents.push(Document {
                text: std::mem::take(text),
                start_line,
                first_content_line,
            });
        }
        text.clear();
    };

    for (index, line) in content.lines().enumerate() {
        let line_number = index + 1;
        if is_separator(line) {
            flush(&mut text, start_line, first_content_line.take());
            start_line = line_number + 1;
            continue;
        }
        if first_content_line.is_none() && is_content(line) {
            first_content_line = Some(line_number);
        }
        text.push_str(line);
        text.push('\n');
    }
    flush(&mut text, start_line, first_content_line);

    documents
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::netpol::errors::ErrorKind;

    #[test]
    fn test_parse_multi_document() {
        let yaml = r#"# leading comment
apiVersion: v1
kind: Service
metadata:
  name: web
spec:
  selector:
    app: web
---
apiVersion: apps/v1
kind: Deployment
metadata:
  name: web
spec:
  template:
    metadata:
      labels:
        app: web
"#;
        let parsed = parse_yaml(yaml);
        assert!(parsed.errors.is_empty(), "{:?}", parsed.errors);
        assert_eq!(parsed.objects.len(), 2);
        assert_eq!(parsed.objects[0].kind(), "Service");
        assert_eq!(parsed.objects[0].metadata.line_number, Some(2));
        assert_eq!(parsed.objects[1].kind(), "Deployment");
        assert_eq!(parsed.objects[1].metadata.line_number, Some(10));
        assert_eq!(parsed.objects[1].metadata.doc_index, Some(1));
    }

    #[test]
    fn test_empty_documents_are_skipped() {
        let yaml = "---\n# only a comment\n---\napiVersion: v1\nkind: ConfigMap\nmetadata:\n  name: cfg\n---\n";
        let parsed = parse_yaml(yaml);
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.objects.len(), 1);
        assert_eq!(parsed.objects[0].metadata.doc_index, Some(0));
    }

    #[test]
    fn test_malformed_document_does_not_hide_others() {
        let yaml = r#"apiVersion: v1
kind: ConfigMap
metadata:
  name: first
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: [unclosed
---
apiVersion: v1
kind: ConfigMap
metadata:
  name: third
"#;
        let parsed = parse_yaml(yaml);
        assert_eq!(parsed.objects.len(), 2);
        assert_eq!(parsed.errors.len(), 1);
        let err = &parsed.errors[0];
        assert!(matches!(err.kind(), ErrorKind::MalformedYamlDoc(_)));
        assert!(err.is_severe());
        assert_eq!(err.doc_index(), 1);
        assert!(err.line_number() >= 6);
    }

    #[test]
    fn test_document_without_kind_is_bad_object() {
        let parsed = parse_yaml("apiVersion: v1\nmetadata:\n  name: x\n");
        assert!(parsed.objects.is_empty());
        assert_eq!(parsed.errors.len(), 1);
        assert!(matches!(parsed.errors[0].kind(), ErrorKind::BadObject(_)));
        assert!(parsed.errors[0].is_severe());
        assert!(!parsed.errors[0].is_fatal());
    }

    #[test]
    fn test_scalar_document_is_bad_object() {
        let parsed = parse_yaml("just a string\n");
        assert_eq!(parsed.errors.len(), 1);
        assert!(matches!(parsed.errors[0].kind(), ErrorKind::BadObject(_)));
    }

    #[test]
    fn test_wrong_shape_is_failed_scan() {
        let yaml = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: broken
spec:
  template:
    spec:
      containers: 42
"#;
        let parsed = parse_yaml(yaml);
        assert!(parsed.objects.is_empty());
        assert_eq!(parsed.errors.len(), 1);
        let err = &parsed.errors[0];
        assert!(matches!(err.kind(), ErrorKind::FailedScanningResource { kind, .. } if kind == "Deployment"));
        assert!(!err.is_severe());
        assert_eq!(err.line_number(), 1);
    }

    #[test]
    fn test_list_is_expanded() {
        let yaml = r#"apiVersion: v1
kind: List
items:
- apiVersion: v1
  kind: Service
  metadata:
    name: a
- apiVersion: v1
  kind: Service
  metadata:
    name: b
"#;
        let parsed = parse_yaml(yaml);
        assert!(parsed.errors.is_empty());
        let names: Vec<_> = parsed.objects.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_json_manifest() {
        let json = r#"{"apiVersion": "v1", "kind": "Service", "metadata": {"name": "api"}, "spec": {"ports": [{"port": 80}]}}"#;
        let parsed = parse_yaml_with_path(json, Path::new("svc.json"));
        assert!(parsed.errors.is_empty());
        assert_eq!(parsed.objects.len(), 1);
        assert_eq!(parsed.objects[0].name(), "api");
    }

    #[test]
    fn test_unreadable_file() {
        let parsed = parse_manifest_file(Path::new("/definitely/not/here.yaml"));
        assert_eq!(parsed.errors.len(), 1);
        assert!(matches!(parsed.errors[0].kind(), ErrorKind::FailedReadingFile(_)));
        assert!(parsed.errors[0].is_severe());
    }
}
