//! Per-request scratch space on local disk.
//!
//! Every request gets its own subdirectory of the scratch root, named from the current
//! second plus a random UUID so that concurrent requests never share files. The directory
//! is removed when its [`ScratchSpace`] guard is dropped.

use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs::DirBuilder;
use uuid::Uuid;

pub const INPUT_FILE: &str = "input.pdf";
pub const OUTPUT_FILE: &str = "output.pdf";
pub const SPACE_PREFIX: &str = "watermark_";

#[derive(Debug, Clone)]
pub struct ScratchRoot {
    path: PathBuf,
}

impl ScratchRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the root directory (and parents) if it does not exist yet.
    pub async fn ensure(&self) -> io::Result<()> {
        let mut builder = DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        builder.mode(0o755);
        builder.create(&self.path).await
    }

    /// Creates a fresh, owner-only subdirectory for one request.
    pub async fn allocate(&self) -> io::Result<ScratchSpace> {
        let name = format!(
            "{}{}_{}",
            SPACE_PREFIX,
            Utc::now().timestamp(),
            Uuid::new_v4().simple()
        );
        let dir = self.path.join(name);

        let mut builder = DirBuilder::new();
        #[cfg(unix)]
        builder.mode(0o700);
        builder.create(&dir).await?;

        tracing::debug!(dir = ?dir, "Scratch space allocated");
        Ok(ScratchSpace { dir })
    }
}

/// Guard over one request's scratch directory.
///
/// Dropping it removes the directory with a blocking `remove_dir_all`, which may run on a
/// runtime worker thread. The directory only ever holds `input.pdf` and `output.pdf`.
#[derive(Debug)]
pub struct ScratchSpace {
    dir: PathBuf,
}

impl ScratchSpace {
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.join(INPUT_FILE)
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.join(OUTPUT_FILE)
    }
}

impl Drop for ScratchSpace {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.dir) {
            Ok(()) => tracing::debug!(dir = ?self.dir, "Scratch space removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!(
                dir = ?self.dir,
                error = %e,
                "Failed to remove scratch space"
            ),
        }
    }
}
