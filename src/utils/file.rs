//! File utilities for ingestion.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::error::PipelineError;

/// Calculate SHA-256 checksum of content.
pub fn calculate_checksum(content: &str) -> String {
    let hash = Sha256::digest(content.as_bytes());
    hex::encode(hash)
}

/// Resolve a caller-supplied path against the upload directory.
///
/// The joined path is normalized lexically and must stay inside `base_dir`.
/// Absolute requests and `..` segments that climb out of the base are
/// rejected before any read. An existing target is also canonicalized so a
/// symlink cannot lead outside the base.
pub fn resolve_upload_path(base_dir: &Path, requested: &Path) -> Result<PathBuf, PipelineError> {
    let base = std::path::absolute(base_dir).map_err(|source| PipelineError::FileRead {
        path: base_dir.to_path_buf(),
        source,
    })?;
    let base = normalize_lexically(&base);
    let resolved = normalize_lexically(&base.join(requested));

    if resolved == base || !resolved.starts_with(&base) {
        return Err(PipelineError::PathTraversal(requested.to_path_buf()));
    }

    // Symlinks inside the base may point anywhere; check where they land.
    match (fs::canonicalize(&resolved), fs::canonicalize(&base)) {
        (Ok(real), Ok(real_base)) => {
            if real == real_base || !real.starts_with(&real_base) {
                return Err(PipelineError::PathTraversal(requested.to_path_buf()));
            }
            Ok(real)
        }
        _ => Ok(resolved),
    }
}

/// Collapse `.` and `..` components. `..` never climbs above the root.
fn normalize_lexically(path: &Path) -> PathBuf {
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

/// Read a UTF-8 text file with a size limit.
///
/// Files with a known binary extension, NUL bytes or invalid UTF-8 are
/// rejected as `InvalidData`.
pub fn read_text_file(path: &Path, max_size: u64) -> io::Result<String> {
    if let Some(ext) = path.extension()
        && is_binary_extension(&ext.to_string_lossy().to_lowercase())
    {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "binary file type is not supported",
        ));
    }

    let metadata = fs::metadata(path)?;
    if metadata.len() > max_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "file exceeds maximum size: {} > {}",
                metadata.len(),
                max_size
            ),
        ));
    }

    let bytes = fs::read(path)?;
    if bytes.contains(&0) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "file contains NUL bytes",
        ));
    }
    String::from_utf8(bytes)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "file is not valid UTF-8"))
}

/// Check if extension indicates a binary file.
fn is_binary_extension(ext: &str) -> bool {
    matches!(
        ext,
        "exe"
            | "dll"
            | "so"
            | "dylib"
            | "o"
            | "png"
            | "jpg"
            | "jpeg"
            | "gif"
            | "webp"
            | "mp3"
            | "mp4"
            | "wav"
            | "zip"
            | "tar"
            | "gz"
            | "7z"
            | "pdf"
            | "docx"
            | "xlsx"
            | "pptx"
            | "sqlite"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_calculate_checksum() {
        let checksum = calculate_checksum("hello world");
        assert_eq!(
            checksum,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_resolve_inside_base() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_upload_path(dir.path(), Path::new("docs/./notes.txt")).unwrap();
        assert!(resolved.starts_with(dir.path()));
        assert!(resolved.ends_with("docs/notes.txt"));
    }

    #[test]
    fn test_resolve_allows_inner_parent_segments() {
        let dir = TempDir::new().unwrap();
        let resolved = resolve_upload_path(dir.path(), Path::new("a/../b.txt")).unwrap();
        assert_eq!(resolved, dir.path().join("b.txt"));
    }

    #[test]
    fn test_traversal_rejected() {
        let dir = TempDir::new().unwrap();
        for attempt in ["../../etc/passwd", "../secret.txt", "docs/../../x", ".."] {
            assert!(
                matches!(
                    resolve_upload_path(dir.path(), Path::new(attempt)),
                    Err(PipelineError::PathTraversal(_))
                ),
                "{attempt}"
            );
        }
    }

    #[test]
    fn test_absolute_request_rejected() {
        let dir = TempDir::new().unwrap();
        assert!(resolve_upload_path(dir.path(), Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_sibling_prefix_rejected() {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("uploads");
        let attempt = Path::new("../uploads-evil/file.txt");
        assert!(resolve_upload_path(&base, attempt).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escaping_base_rejected() {
        let outside = TempDir::new().unwrap();
        let secret = outside.path().join("secret.txt");
        fs::write(&secret, "secret").unwrap();

        let uploads = TempDir::new().unwrap();
        std::os::unix::fs::symlink(&secret, uploads.path().join("link.txt")).unwrap();
        std::os::unix::fs::symlink(outside.path(), uploads.path().join("dir")).unwrap();

        for attempt in ["link.txt", "dir/secret.txt"] {
            assert!(
                matches!(
                    resolve_upload_path(uploads.path(), Path::new(attempt)),
                    Err(PipelineError::PathTraversal(_))
                ),
                "{attempt}"
            );
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_within_base_allowed() {
        let uploads = TempDir::new().unwrap();
        let target = uploads.path().join("real.txt");
        fs::write(&target, "inside").unwrap();
        std::os::unix::fs::symlink(&target, uploads.path().join("alias.txt")).unwrap();

        let resolved = resolve_upload_path(uploads.path(), Path::new("alias.txt")).unwrap();
        assert_eq!(read_text_file(&resolved, 1024).unwrap(), "inside");
    }

    #[test]
    fn test_read_text_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.md");
        fs::write(&path, "# Notes\nsome text").unwrap();
        assert_eq!(read_text_file(&path, 1024).unwrap(), "# Notes\nsome text");
    }

    #[test]
    fn test_read_text_file_limits() {
        let dir = TempDir::new().unwrap();

        let big = dir.path().join("big.txt");
        fs::write(&big, "x".repeat(100)).unwrap();
        assert!(read_text_file(&big, 10).is_err());

        let nul = dir.path().join("nul.txt");
        fs::write(&nul, b"abc\0def").unwrap();
        assert_eq!(
            read_text_file(&nul, 1024).unwrap_err().kind(),
            io::ErrorKind::InvalidData
        );

        let latin1 = dir.path().join("latin1.txt");
        fs::write(&latin1, [0x63, 0x61, 0x66, 0xe9]).unwrap();
        assert!(read_text_file(&latin1, 1024).is_err());

        let image = dir.path().join("photo.png");
        fs::write(&image, "not really").unwrap();
        assert!(read_text_file(&image, 1024).is_err());
    }
}
