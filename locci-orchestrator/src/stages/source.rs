//! Source resolution
//!
//! Fetches the file tree of a branch into a temporary directory.

use async_trait::async_trait;
use locci_core::domain::build::SourceReference;
use std::path::Path;
use tempfile::TempDir;
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Source stage errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// The remote could not serve the branch
    ///
    /// Network, authentication and missing-branch failures all collapse into
    /// this one kind; none of them can be recovered within a run.
    #[error("source {source_ref} unavailable: {reason}")]
    Unavailable {
        source_ref: SourceReference,
        reason: String,
    },

    /// The fetch could not even be attempted on this host
    #[error("failed to fetch {source_ref}: {reason}")]
    Local {
        source_ref: SourceReference,
        reason: String,
    },
}

impl SourceError {
    pub fn unavailable(source_ref: &SourceReference, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            source_ref: source_ref.clone(),
            reason: reason.into(),
        }
    }

    pub fn local(source_ref: &SourceReference, reason: impl Into<String>) -> Self {
        Self::Local {
            source_ref: source_ref.clone(),
            reason: reason.into(),
        }
    }

    /// Reference the fetch was attempted for
    pub fn source_ref(&self) -> &SourceReference {
        match self {
            Self::Unavailable { source_ref, .. } | Self::Local { source_ref, .. } => source_ref,
        }
    }
}

/// Read-only handle to a fetched file tree
///
/// The tree lives in a temporary directory that is removed when the handle
/// is dropped.
#[derive(Debug)]
pub struct SourceTree {
    dir: TempDir,
}

impl SourceTree {
    pub fn new(dir: TempDir) -> Self {
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Names of the top-level entries, sorted
    pub fn entries(&self) -> std::io::Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in std::fs::read_dir(self.dir.path())? {
            names.push(entry?.file_name().to_string_lossy().to_string());
        }
        names.sort();
        Ok(names)
    }
}

/// Fetches source trees
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Retrieves the tree at the head of `source.branch`
    async fn resolve(&self, source: &SourceReference) -> Result<SourceTree, SourceError>;
}

/// Resolver that shallow-clones with the git CLI
#[derive(Debug, Clone)]
pub struct GitSourceResolver {
    git_bin: String,
}

impl GitSourceResolver {
    pub fn new(git_bin: impl Into<String>) -> Self {
        Self {
            git_bin: git_bin.into(),
        }
    }
}

#[async_trait]
impl SourceResolver for GitSourceResolver {
    async fn resolve(&self, source: &SourceReference) -> Result<SourceTree, SourceError> {
        let dir = tempfile::Builder::new()
            .prefix("locci-src-")
            .tempdir()
            .map_err(|e| {
                SourceError::local(source, format!("failed to create checkout dir: {}", e))
            })?;

        info!("Cloning {}", source);

        let output = Command::new(&self.git_bin)
            .args(["clone", "--depth", "1", "--single-branch", "--branch"])
            .arg(&source.branch)
            .arg("--")
            .arg(&source.repository)
            .arg(dir.path())
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .await
            .map_err(|e| SourceError::local(source, format!("failed to execute git: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SourceError::unavailable(source, stderr.trim().to_string()));
        }

        // The build only needs the working tree
        if let Err(e) = tokio::fs::remove_dir_all(dir.path().join(".git")).await {
            warn!("Failed to strip .git from checkout of {}: {}", source, e);
        }

        let tree = SourceTree::new(dir);
        match tree.entries() {
            Ok(entries) => debug!("Repo files: {:?}", entries),
            Err(e) => warn!("Failed to list checkout of {}: {}", source, e),
        }

        Ok(tree)
    }
}
