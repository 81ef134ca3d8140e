//! Archive extraction with path-traversal containment.
//!
//! Uploads are untrusted: the declared filename decides the container
//! format when it is recognizable, otherwise the leading bytes are sniffed,
//! and every entry path is checked against the extraction root before
//! anything is written.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use flate2::read::GzDecoder;

use crate::domain::error::{DeployError, Result};

/// Supported archive container formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    Tar,
    TarGz,
}

impl ArchiveFormat {
    /// Infer the format from the declared file name, when recognizable.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.ends_with(".zip") {
            Some(ArchiveFormat::Zip)
        } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
            Some(ArchiveFormat::TarGz)
        } else if lower.ends_with(".tar") {
            Some(ArchiveFormat::Tar)
        } else {
            None
        }
    }

    /// Sniff the format from leading magic bytes.
    ///
    /// ZIP and gzip have stable signatures; anything else is treated as
    /// plain tar, matching the declared-name-first dispatch for uploads
    /// with mislabeled or missing extensions.
    pub fn sniff(header: &[u8]) -> Self {
        if header.starts_with(&[0x50, 0x4B]) {
            ArchiveFormat::Zip
        } else if header.starts_with(&[0x1F, 0x8B]) {
            ArchiveFormat::TarGz
        } else {
            ArchiveFormat::Tar
        }
    }
}

/// Extract `archive` into `dest`.
///
/// Dispatches on `original_name` first, falling back to content sniffing.
/// Any entry that would resolve outside `dest` aborts the extraction with
/// [`DeployError::PathTraversal`] and discards partial output.
pub fn extract_archive(archive: &Path, original_name: &str, dest: &Path) -> Result<()> {
    let format = match ArchiveFormat::from_name(original_name) {
        Some(format) => format,
        None => {
            let mut header = [0u8; 4];
            let mut file = File::open(archive)?;
            let n = file.read(&mut header)?;
            ArchiveFormat::sniff(&header[..n])
        }
    };

    fs::create_dir_all(dest)?;
    let outcome = match format {
        ArchiveFormat::Zip => extract_zip(archive, dest),
        ArchiveFormat::Tar => extract_tar(File::open(archive)?, dest),
        ArchiveFormat::TarGz => extract_tar(GzDecoder::new(File::open(archive)?), dest),
    };

    if outcome.is_err() {
        let _ = fs::remove_dir_all(dest);
    }
    outcome
}

/// Async wrapper routing blocking archive IO through the blocking pool.
pub async fn extract_archive_async(
    archive: PathBuf,
    original_name: String,
    dest: PathBuf,
) -> Result<()> {
    tokio::task::spawn_blocking(move || extract_archive(&archive, &original_name, &dest))
        .await
        .map_err(|e| DeployError::Io(io::Error::other(e)))?
}

/// Resolve `entry` under `dest`, rejecting anything that would land outside.
///
/// The path is rebuilt component by component: `..`, absolute roots, and
/// drive prefixes are refused outright, so containment holds on a
/// path-separator boundary rather than a string prefix (`dest-evil` is not
/// inside `dest`).
fn contained_join(dest: &Path, entry: &Path) -> Result<PathBuf> {
    let mut out = dest.to_path_buf();
    for component in entry.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => {
                return Err(DeployError::PathTraversal(
                    entry.display().to_string(),
                ))
            }
        }
    }
    if !out.starts_with(dest) {
        return Err(DeployError::PathTraversal(entry.display().to_string()));
    }
    Ok(out)
}

fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| DeployError::UnsupportedFormat(format!("not a readable zip archive: {e}")))?;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| DeployError::UnsupportedFormat(format!("bad zip entry: {e}")))?;
        let raw_name = entry.name().to_string();
        let path = contained_join(dest, Path::new(&raw_name))?;

        if entry.is_dir() {
            fs::create_dir_all(&path)?;
        } else {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Entries are streamed to disk, never buffered whole.
            let mut out = File::create(&path)?;
            io::copy(&mut entry, &mut out)?;
        }
    }
    Ok(())
}

fn extract_tar<R: Read>(reader: R, dest: &Path) -> Result<()> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        let raw_path = entry
            .path()
            .map_err(|e| DeployError::UnsupportedFormat(format!("bad tar entry path: {e}")))?
            .into_owned();
        let path = contained_join(dest, &raw_path)?;

        match entry.header().entry_type() {
            tar::EntryType::Directory => fs::create_dir_all(&path)?,
            tar::EntryType::Regular => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent)?;
                }
                let mut out = File::create(&path)?;
                io::copy(&mut entry, &mut out)?;
            }
            // Symlinks and device entries have no place in a source bundle.
            _ => {}
        }
    }
    Ok(())
}
