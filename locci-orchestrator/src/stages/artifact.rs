//! Local artifact export
//!
//! Every run exports its build output to `{root}/build-{build_id}`. The
//! path depends on nothing but the build id, and build ids are unique, so
//! runs never share a directory.

use locci_core::domain::build::BuildId;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::stages::builder::BuildOutput;

/// Export stage errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create export directory '{path}': {cause}")]
    CreateDir {
        path: PathBuf,
        #[source]
        cause: std::io::Error,
    },

    #[error("failed to copy '{from}' to '{to}': {cause}")]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        cause: std::io::Error,
    },
}

/// Directory tree receiving exported build output
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Store rooted at `{export_root}/{namespace}`
    pub fn new(export_root: impl AsRef<Path>, namespace: &str) -> Self {
        Self {
            root: export_root.as_ref().join(namespace),
        }
    }

    /// Export directory of a run
    pub fn path_for(&self, build_id: BuildId) -> PathBuf {
        self.root.join(format!("build-{}", build_id))
    }

    /// Copies the build output into the run's export directory
    pub async fn export(
        &self,
        output: &BuildOutput,
        build_id: BuildId,
    ) -> Result<PathBuf, ExportError> {
        let target = self.path_for(build_id);

        tokio::fs::create_dir_all(&target)
            .await
            .map_err(|cause| ExportError::CreateDir {
                path: target.clone(),
                cause,
            })?;

        let files = copy_tree(&output.dir(), &target).await?;

        info!("Exported {} file(s) to {}", files, target.display());
        Ok(target)
    }
}

/// Recursively copies the contents of `from` into the existing directory `to`
///
/// Symbolic links are recreated as links and never followed, so nothing
/// outside `from` is read.
async fn copy_tree(from: &Path, to: &Path) -> Result<usize, ExportError> {
    let copy_err = |from: &Path, to: &Path| {
        let (from, to) = (from.to_path_buf(), to.to_path_buf());
        move |cause| ExportError::Copy { from, to, cause }
    };

    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];
    let mut files = 0;

    while let Some((src_dir, dst_dir)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&src_dir)
            .await
            .map_err(copy_err(&src_dir, &dst_dir))?;

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(copy_err(&src_dir, &dst_dir))?
        {
            let src = entry.path();
            let dst = dst_dir.join(entry.file_name());
            let file_type = tokio::fs::symlink_metadata(&src)
                .await
                .map_err(copy_err(&src, &dst))?
                .file_type();

            if file_type.is_symlink() {
                copy_link(&src, &dst).await?;
            } else if file_type.is_dir() {
                tokio::fs::create_dir_all(&dst)
                    .await
                    .map_err(|cause| ExportError::CreateDir {
                        path: dst.clone(),
                        cause,
                    })?;
                pending.push((src, dst));
            } else {
                debug!("Copying {}", src.display());
                tokio::fs::copy(&src, &dst)
                    .await
                    .map_err(copy_err(&src, &dst))?;
                files += 1;
            }
        }
    }

    Ok(files)
}

#[cfg(unix)]
async fn copy_link(src: &Path, dst: &Path) -> Result<(), ExportError> {
    let copy_err = |cause| ExportError::Copy {
        from: src.to_path_buf(),
        to: dst.to_path_buf(),
        cause,
    };

    let target = tokio::fs::read_link(src).await.map_err(copy_err)?;
    debug!("Linking {} -> {}", dst.display(), target.display());
    tokio::fs::symlink(&target, dst).await.map_err(copy_err)
}

#[cfg(not(unix))]
async fn copy_link(src: &Path, _dst: &Path) -> Result<(), ExportError> {
    tracing::warn!("Skipping symbolic link {}", src.display());
    Ok(())
}
