//! Content negotiation - gzip-fallback path resolution and MIME deduction.
//!
//! The `.gz` fallback is a path-suffix convention only: content is never
//! inspected or decompressed here. A file served through the fallback is
//! sent raw, with HTTP streams marking `Content-Encoding: gzip` so the
//! client does the inflating.

use std::path::{Path, PathBuf};

use tokio::fs::File;

use crate::error::{StorageError, StorageResult};

/// Suffix appended when the primary path does not open.
pub const GZIP_SUFFIX: &str = ".gz";

/// A file opened for reading, together with the path that actually opened
/// and its measured size.
#[derive(Debug)]
pub struct ResolvedFile {
    pub file: File,
    /// Either the requested path or `path + ".gz"`.
    pub path: PathBuf,
    pub size: u64,
}

/// Open `path` for reading, falling back to `path + ".gz"`.
///
/// Returns [`StorageError::NotFound`] carrying the *requested* path when
/// neither opens.
pub async fn resolve_with_gzip_fallback(path: &Path) -> StorageResult<ResolvedFile> {
    if let Some(resolved) = try_open(path.to_path_buf()).await? {
        return Ok(resolved);
    }

    let fallback = gzip_alternative(path);
    tracing::debug!(path = %path.display(), "file not found, trying gz alternative");
    if let Some(resolved) = try_open(fallback).await? {
        return Ok(resolved);
    }

    Err(StorageError::not_found(path))
}

/// Open one candidate path, distinguishing "absent" from real I/O errors.
async fn try_open(path: PathBuf) -> StorageResult<Option<ResolvedFile>> {
    match File::open(&path).await {
        Ok(file) => {
            let size = file
                .metadata()
                .await
                .map_err(|e| StorageError::io(&path, e))?
                .len();
            Ok(Some(ResolvedFile { file, path, size }))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::io(&path, e)),
    }
}

/// Whether `path` or its gzip alternative exists, without opening either.
///
/// Lets callers that must answer on the same socket (a 404, say) probe
/// before committing the stream to the accessor.
pub async fn exists_with_gzip_fallback(path: &Path) -> bool {
    tokio::fs::metadata(path).await.is_ok()
        || tokio::fs::metadata(gzip_alternative(path)).await.is_ok()
}

/// `path` with the gzip suffix appended to its final component.
fn gzip_alternative(path: &Path) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(GZIP_SUFFIX);
    PathBuf::from(s)
}

/// Whether a resolved path carries the gzip suffix.
pub fn is_gzip_path(path: &Path) -> bool {
    path.to_string_lossy().ends_with(GZIP_SUFFIX)
}

/// Strip a trailing gzip suffix, if present, before MIME deduction.
pub fn strip_gzip_suffix(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    match s.strip_suffix(GZIP_SUFFIX) {
        Some(stripped) => PathBuf::from(stripped),
        None => path.to_path_buf(),
    }
}

/// Deduce a MIME type from the path's extension.
///
/// Case-sensitive suffix match, first match wins; everything unknown is
/// `text/plain`.
pub fn deduce_mime_type(path: &Path) -> &'static str {
    let s = path.to_string_lossy();
    if s.ends_with(".html") {
        "text/html"
    } else if s.ends_with(".js") {
        "application/javascript"
    } else if s.ends_with(".css") {
        "text/css"
    } else {
        "text/plain"
    }
}
