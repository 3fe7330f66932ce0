//! Safe archive extraction
//!
//! Unpacks the registry tarball with a data-safe member policy: entries must
//! stay inside the destination directory, links may not point outside it,
//! and special files (devices, FIFOs) are rejected. The `tar` crate has no
//! built-in filter for this, so each member is validated before unpacking.

use flate2::read::GzDecoder;
use std::fs::File;
use std::path::{Component, Path, PathBuf};
use tar::{Archive, EntryType};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during archive extraction
#[derive(Debug, Error)]
pub enum ExtractError {
    /// IO error writing extracted files
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Corrupt or unreadable archive
    #[error("Failed to read archive: {0}")]
    Malformed(String),

    /// Member path is absolute or traverses outside the destination
    #[error("Unsafe member path in archive: {0}")]
    UnsafePath(PathBuf),

    /// Link member points outside the destination
    #[error("Unsafe link target in archive: {path} -> {target}")]
    UnsafeLink { path: PathBuf, target: PathBuf },

    /// Device, FIFO, or other unsupported member type
    #[error("Unsupported member type {kind} in archive: {path}")]
    UnsupportedEntry { path: PathBuf, kind: String },
}

/// Extract a .tar.gz archive into a destination directory.
///
/// Every member is validated against the safe-member policy before it is
/// written. Permission bits from the archive are not applied; extracted
/// files get the process default mode.
pub fn extract_tgz(archive_path: &Path, dest: &Path) -> Result<(), ExtractError> {
    let file = File::open(archive_path)?;
    let decoder = GzDecoder::new(file);
    let mut archive = Archive::new(decoder);
    archive.set_preserve_permissions(false);
    archive.set_unpack_xattrs(false);

    let entries = archive
        .entries()
        .map_err(|e| ExtractError::Malformed(format!("Failed to read tar entries: {}", e)))?;

    let mut count = 0usize;
    for entry in entries {
        let mut entry =
            entry.map_err(|e| ExtractError::Malformed(format!("Failed to read entry: {}", e)))?;

        let raw_path = entry
            .path()
            .map_err(|e| ExtractError::Malformed(format!("Invalid entry path: {}", e)))?
            .into_owned();

        let kind = entry.header().entry_type();

        // Extended headers are metadata for the entry that follows, not
        // members of their own.
        if matches!(
            kind,
            EntryType::XGlobalHeader
                | EntryType::XHeader
                | EntryType::GNULongName
                | EntryType::GNULongLink
        ) {
            continue;
        }

        let rel_path = sanitize_entry_path(&raw_path)?;
        let dest_path = dest.join(&rel_path);

        match kind {
            EntryType::Directory => {
                std::fs::create_dir_all(&dest_path)?;
            }
            EntryType::Regular | EntryType::Continuous | EntryType::GNUSparse => {
                if let Some(parent) = dest_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                entry.unpack(&dest_path).map_err(|e| {
                    ExtractError::Malformed(format!(
                        "Failed to extract {}: {}",
                        dest_path.display(),
                        e
                    ))
                })?;
            }
            EntryType::Symlink | EntryType::Link => {
                let target = entry
                    .link_name()
                    .map_err(|e| ExtractError::Malformed(format!("Invalid link target: {}", e)))?
                    .ok_or_else(|| {
                        ExtractError::Malformed(format!(
                            "Link member without target: {}",
                            rel_path.display()
                        ))
                    })?
                    .into_owned();

                if link_escapes(&rel_path, &target) {
                    return Err(ExtractError::UnsafeLink {
                        path: rel_path,
                        target,
                    });
                }

                if let Some(parent) = dest_path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                entry.unpack(&dest_path).map_err(|e| {
                    ExtractError::Malformed(format!(
                        "Failed to extract {}: {}",
                        dest_path.display(),
                        e
                    ))
                })?;
            }
            other => {
                return Err(ExtractError::UnsupportedEntry {
                    path: rel_path,
                    kind: format!("{:?}", other),
                });
            }
        }

        count += 1;
    }

    debug!(members = count, dest = %dest.display(), "extracted archive");
    Ok(())
}

/// Validate and normalize a member path.
///
/// Only normal components are allowed; `..`, root, and prefix components
/// reject the member. Empty paths reject too.
fn sanitize_entry_path(raw: &Path) -> Result<PathBuf, ExtractError> {
    let mut out = PathBuf::new();

    for component in raw.components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            _ => return Err(ExtractError::UnsafePath(raw.to_path_buf())),
        }
    }

    if out.as_os_str().is_empty() {
        return Err(ExtractError::UnsafePath(raw.to_path_buf()));
    }

    Ok(out)
}

/// Whether a link member's target resolves outside the destination.
///
/// `entry_path` is the sanitized relative path of the link itself; the
/// target is resolved against the directory containing it.
fn link_escapes(entry_path: &Path, target: &Path) -> bool {
    if target.is_absolute() {
        return true;
    }

    // Depth of the directory containing the link, relative to the
    // destination root.
    let mut depth = entry_path.components().count() as i64 - 1;

    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth -= 1;
                if depth < 0 {
                    return true;
                }
            }
            _ => return true,
        }
    }

    false
}
