//! Release file download and caching
//!
//! Providers publish release files over HTTP(S), usually gzip-compressed.
//! `ensure_local` resolves a [`SourceLocation`] to a readable local path:
//! local paths are verified, URLs are fetched into the data directory (with
//! transparent `.gz` decompression) and reused on later runs when a checksum
//! confirms the cached copy.

use crate::config::SourceLocation;
use bgl_common::{checksum, BglError, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Resolve a source to a local file, downloading if necessary.
///
/// `name` is used for the cached file name when the URL does not end in a
/// usable one.
pub fn ensure_local(source: &SourceLocation, name: &str, data_dir: &Path) -> Result<PathBuf> {
    if let Some(path) = &source.path {
        if !path.exists() {
            return Err(BglError::SourceNotFound(path.display().to_string()));
        }
        if let Some(expected) = &source.sha256 {
            checksum::verify_file_sha256(path, expected)?;
        }
        return Ok(path.clone());
    }

    let url = source
        .url
        .as_deref()
        .ok_or_else(|| BglError::Config(format!("source {name} has neither path nor url")))?;

    let target = data_dir.join(cached_file_name(url, name));
    if target.exists() {
        match &source.sha256 {
            Some(expected) if checksum::verify_file_sha256(&target, expected).is_err() => {
                info!(file = %target.display(), "cached copy failed checksum; re-downloading");
            }
            _ => {
                debug!(file = %target.display(), "using cached release file");
                return Ok(target);
            }
        }
    }

    fetch(url, &target)?;
    if let Some(expected) = &source.sha256 {
        checksum::verify_file_sha256(&target, expected)?;
    }
    Ok(target)
}

/// Download `url` to `dest`, decompressing gzip payloads transparently.
pub fn fetch(url: &str, dest: &Path) -> Result<()> {
    info!(url, dest = %dest.display(), "downloading release file");
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let response = reqwest::blocking::get(url)
        .and_then(reqwest::blocking::Response::error_for_status)
        .map_err(|err| BglError::Download(err.to_string()))?;

    let mut writer = BufWriter::new(File::create(dest)?);
    let mut reader: Box<dyn Read> = if url.ends_with(".gz") {
        Box::new(GzDecoder::new(response))
    } else {
        Box::new(response)
    };
    let bytes = std::io::copy(&mut reader, &mut writer)?;
    info!(dest = %dest.display(), bytes, "download complete");
    Ok(())
}

/// Cache file name for a URL: its last path segment, minus any `.gz`.
fn cached_file_name(url: &str, fallback: &str) -> String {
    let segment = url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(fallback);
    segment.strip_suffix(".gz").unwrap_or(segment).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_file_name() {
        assert_eq!(
            cached_file_name("https://example.org/release/fb_genes.json.gz", "genes"),
            "fb_genes.json"
        );
        assert_eq!(
            cached_file_name("https://example.org/release/do.obo", "do"),
            "do.obo"
        );
        assert_eq!(cached_file_name("https://example.org/", "genes"), "genes");
    }

    #[test]
    fn test_ensure_local_missing_path() {
        let source = SourceLocation {
            path: Some(PathBuf::from("/no/such/file.json")),
            url: None,
            sha256: None,
        };
        let err = ensure_local(&source, "genes", Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, BglError::SourceNotFound(_)));
    }

    #[test]
    fn test_ensure_local_existing_path_with_checksum() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("genes.json");
        std::fs::write(&path, b"hello world").unwrap();

        let source = SourceLocation {
            path: Some(path.clone()),
            url: None,
            sha256: Some(
                "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9".to_string(),
            ),
        };
        assert_eq!(ensure_local(&source, "genes", dir.path()).unwrap(), path);
    }

    #[test]
    fn test_ensure_local_empty_source() {
        let source = SourceLocation::default();
        let err = ensure_local(&source, "genes", Path::new("/tmp")).unwrap_err();
        assert!(matches!(err, BglError::Config(_)));
    }
}
