//! Parsed Kubernetes objects.
//!
//! Objects are produced by the parser (or supplied directly by callers) and
//! consumed by the resource accumulator.

pub mod manifests;
pub mod object;

pub use object::{K8sObject, Object, ObjectMetadata, UnknownObject};
