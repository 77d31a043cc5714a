//! Locating manifest files under a directory.

use crate::analyzer::netpol::errors::FileProcessingError;
use std::path::{Path, PathBuf};

/// A directory entry that could not be visited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkError {
    /// The entry that failed (the root when unknown).
    pub path: PathBuf,
    /// Depth below the walk root; 0 is the root itself.
    pub depth: usize,
    pub message: String,
}

/// Lists the files under a root directory.
///
/// Implemented for any `Fn(&Path) -> Vec<Result<PathBuf, WalkError>>`, so a
/// closure can stand in for the default walker.
pub trait ManifestWalker: Send + Sync {
    fn walk(&self, root: &Path) -> Vec<Result<PathBuf, WalkError>>;
}

impl<F> ManifestWalker for F
where
    F: Fn(&Path) -> Vec<Result<PathBuf, WalkError>> + Send + Sync,
{
    fn walk(&self, root: &Path) -> Vec<Result<PathBuf, WalkError>> {
        self(root)
    }
}

/// Recursive walk with `walkdir`, following symlinks.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkDirWalker;

impl ManifestWalker for WalkDirWalker {
    fn walk(&self, root: &Path) -> Vec<Result<PathBuf, WalkError>> {
        walkdir::WalkDir::new(root)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) if entry.file_type().is_file() => Some(Ok(entry.into_path())),
                Ok(_) => None,
                Err(err) => Some(Err(WalkError {
                    path: err.path().unwrap_or(root).to_path_buf(),
                    depth: err.depth(),
                    message: err.to_string(),
                })),
            })
            .collect()
    }
}

/// Whether a file looks like a Kubernetes manifest.
pub fn is_manifest_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml") | Some("json")
    )
}

/// Manifest files found under one root, and the problems met on the way.
#[derive(Debug, Default)]
pub struct LocatedManifests {
    pub files: Vec<PathBuf>,
    pub errors: Vec<FileProcessingError>,
}

/// Walk `root` and keep manifest files, sorted for a stable processing order.
///
/// An unreadable root is fatal; unreadable nested entries are severe. A root
/// without any manifest yields an advisory error.
pub fn locate_manifests(root: &Path, walker: &dyn ManifestWalker) -> LocatedManifests {
    let mut located = LocatedManifests::default();

    for entry in walker.walk(root) {
        match entry {
            Ok(path) if is_manifest_file(&path) => located.files.push(path),
            Ok(_) => {}
            Err(err) => located.errors.push(FileProcessingError::failed_accessing_dir(
                &err.path,
                &err.message,
                err.depth == 0,
            )),
        }
    }

    located.files.sort();
    let root_failed = located.errors.iter().any(|e| e.is_fatal());
    if located.files.is_empty() && !root_failed {
        located.errors.push(FileProcessingError::no_manifests_found(root));
    }

    located
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_locate_manifests_filters_and_sorts() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("nested")).unwrap();
        fs::write(root.join("b.yaml"), "").unwrap();
        fs::write(root.join("nested/a.yml"), "").unwrap();
        fs::write(root.join("c.json"), "{}").unwrap();
        fs::write(root.join("README.md"), "").unwrap();

        let located = locate_manifests(root, &WalkDirWalker);
        assert!(located.errors.is_empty());
        let names: Vec<_> = located
            .files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["b.yaml", "c.json", "nested/a.yml"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let located = locate_manifests(&dir.path().join("missing"), &WalkDirWalker);
        assert!(located.files.is_empty());
        assert_eq!(located.errors.len(), 1);
        assert!(located.errors[0].is_fatal());
    }

    #[test]
    fn test_empty_root_is_advisory() {
        let dir = TempDir::new().unwrap();
        let located = locate_manifests(dir.path(), &WalkDirWalker);
        assert_eq!(located.errors.len(), 1);
        assert!(!located.errors[0].is_fatal());
        assert!(!located.errors[0].is_severe());
    }

    #[test]
    fn test_custom_walker_closure() {
        let walker = |root: &Path| -> Vec<Result<PathBuf, WalkError>> {
            vec![
                Ok(root.join("app.yaml")),
                Err(WalkError {
                    path: root.join("locked"),
                    depth: 1,
                    message: "permission denied".to_string(),
                }),
            ]
        };
        let located = locate_manifests(Path::new("/virtual"), &walker);
        assert_eq!(located.files, vec![PathBuf::from("/virtual/app.yaml")]);
        assert_eq!(located.errors.len(), 1);
        assert!(located.errors[0].is_severe());
        assert!(!located.errors[0].is_fatal());
    }
}
