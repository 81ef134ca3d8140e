//! Job-scoped scratch directories.

use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use uuid::Uuid;

/// A job-private scratch area removed when the guard drops.
///
/// Holding the directory in a guard rather than a bare path makes cleanup
/// run on every pipeline exit path, including panics inside a stage.
pub struct WorkDir {
    dir: TempDir,
}

impl WorkDir {
    /// Create a fresh `job-<id>-*` directory under `root`.
    pub fn create(root: &Path, job_id: &Uuid) -> io::Result<Self> {
        std::fs::create_dir_all(root)?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("job-{job_id}-"))
            .tempdir_in(root)?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Where the raw uploaded archive is staged.
    pub fn archive_path(&self) -> PathBuf {
        self.dir.path().join("bundle.upload")
    }

    /// Directory the bundle is extracted into.
    pub fn package_dir(&self) -> PathBuf {
        self.dir.path().join("package")
    }
}
