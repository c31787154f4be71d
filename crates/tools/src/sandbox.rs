//! Sandbox path resolution — filesystem containment for the file tools.
//!
//! Every filename an agent supplies is resolved against one fixed base
//! directory and must stay inside it. Canonicalization resolves symlinks
//! and `..` components before the containment check.

use colloquy_core::error::ToolError;
use std::path::{Component, Path, PathBuf};

/// The fixed directory all file tools operate in.
#[derive(Debug, Clone)]
pub struct Sandbox {
    base: PathBuf,
}

impl Sandbox {
    /// Create a sandbox rooted at `base`. The directory must exist.
    pub fn new(base: impl Into<PathBuf>) -> Result<Self, ToolError> {
        let base: PathBuf = base.into();
        let base = base.canonicalize().map_err(|e| {
            ToolError::SandboxViolation(format!(
                "sandbox base '{}' is not usable: {e}",
                base.display()
            ))
        })?;
        Ok(Self { base })
    }

    /// The canonicalized base directory.
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Resolve a filename to a path inside the sandbox.
    ///
    /// Rejects absolute paths and any name that walks out of the base
    /// directory. For names whose file does not exist yet (writes), the
    /// existing parent is canonicalized instead.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, ToolError> {
        let name = Path::new(filename);

        if name.is_absolute() {
            return Err(ToolError::SandboxViolation(format!(
                "absolute path '{filename}' is not allowed"
            )));
        }

        // Reject traversal components before touching the filesystem.
        if name
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(ToolError::SandboxViolation(format!(
                "path traversal detected in '{filename}'"
            )));
        }

        let joined = self.base.join(name);

        // Canonicalize the target (or its parent for not-yet-existing files)
        // to resolve symlinks, then require containment.
        let canonical = if joined.exists() {
            joined.canonicalize().map_err(|e| {
                ToolError::SandboxViolation(format!("cannot resolve '{filename}': {e}"))
            })?
        } else {
            let parent = joined.parent().ok_or_else(|| {
                ToolError::SandboxViolation(format!("'{filename}' has no parent directory"))
            })?;
            let canonical_parent = parent.canonicalize().map_err(|e| {
                ToolError::SandboxViolation(format!(
                    "cannot resolve parent of '{filename}': {e}"
                ))
            })?;
            canonical_parent.join(joined.file_name().unwrap_or_default())
        };

        if !canonical.starts_with(&self.base) {
            return Err(ToolError::SandboxViolation(format!(
                "'{filename}' resolves outside the sandbox"
            )));
        }

        Ok(canonical)
    }
}
