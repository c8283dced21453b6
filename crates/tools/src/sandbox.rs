//! Workspace sandbox for the file tools.
//!
//! Paths are resolved against the workspace root. With confinement on,
//! anything that lands outside the root after `..` normalization or after
//! following symlinks is refused.

use std::path::{Component, Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Path escapes workspace: {path}")]
    EscapesWorkspace { path: String },

    #[error("Empty path")]
    EmptyPath,
}

#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
    confine: bool,
}

impl Workspace {
    pub fn new(root: impl Into<PathBuf>, confine: bool) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or_else(|_| normalize(&root));
        Self { root, confine }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_confined(&self) -> bool {
        self.confine
    }

    /// Resolve a tool-supplied path to an absolute one.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, SandboxError> {
        if path.trim().is_empty() {
            return Err(SandboxError::EmptyPath);
        }

        let candidate = normalize(&self.root.join(path));
        if !self.confine {
            return Ok(candidate);
        }

        if !candidate.starts_with(&self.root) {
            return Err(SandboxError::EscapesWorkspace { path: path.into() });
        }

        if !self.links_stay_inside(&candidate) {
            return Err(SandboxError::EscapesWorkspace { path: path.into() });
        }
        Ok(candidate)
    }

    /// Walk `candidate` below the root and vet every symlink on the way.
    ///
    /// A link must resolve to a location inside the root. Dangling links
    /// are refused outright: the file tools would create their target,
    /// wherever it points.
    fn links_stay_inside(&self, candidate: &Path) -> bool {
        let Ok(rest) = candidate.strip_prefix(&self.root) else {
            return false;
        };
        let mut current = self.root.clone();
        for component in rest.components() {
            current.push(component);
            let Ok(meta) = std::fs::symlink_metadata(&current) else {
                // Nothing further down exists yet.
                return true;
            };
            if meta.file_type().is_symlink() {
                match current.canonicalize() {
                    Ok(real) if real.starts_with(&self.root) => {}
                    _ => return false,
                }
            }
        }
        true
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
