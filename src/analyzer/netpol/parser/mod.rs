//! Locating and parsing Kubernetes manifests.

pub mod walk;
pub mod yaml;

pub use walk::{LocatedManifests, ManifestWalker, WalkDirWalker, WalkError, locate_manifests};
pub use yaml::{ParsedManifests, parse_manifest_file, parse_yaml, parse_yaml_with_path};
