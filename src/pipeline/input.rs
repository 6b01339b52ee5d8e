//! Upload candidates: a file name, its declared media type and its bytes.
//!
//! Browsers (and many HTTP clients) report media types unreliably, so the
//! declared type is kept exactly as given, empty string included, and the
//! validator decides how much to trust it. Content is either already in
//! memory or read lazily from disk by the encoder, so validation never
//! touches the file system.

use crate::error::DocNotesError;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a candidate's bytes come from.
#[derive(Debug, Clone)]
pub enum CandidateSource {
    /// Content already held in memory (e.g. an HTTP upload).
    Bytes(Vec<u8>),
    /// Content still on disk; read when the candidate is encoded.
    Path(PathBuf),
}

/// A file offered for analysis. Ephemeral: it only lives through
/// validation and encoding.
#[derive(Debug, Clone)]
pub struct UploadCandidate {
    pub name: String,
    /// Declared media type, possibly empty.
    pub media_type: String,
    pub source: CandidateSource,
}

impl UploadCandidate {
    /// A candidate whose bytes are already in memory.
    pub fn from_bytes(
        name: impl Into<String>,
        media_type: impl Into<String>,
        bytes: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            source: CandidateSource::Bytes(bytes.into()),
        }
    }

    /// A candidate backed by a local file.
    ///
    /// The file name is taken from the last path component. When
    /// `media_type` is `None` the declared type is left empty, as a browser
    /// would for an unknown extension; the validator then relies on the
    /// extension alone.
    pub fn from_path(path: impl AsRef<Path>, media_type: Option<&str>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Self {
            name,
            media_type: media_type.unwrap_or_default().to_string(),
            source: CandidateSource::Path(path.to_path_buf()),
        }
    }

    /// Lower-cased extension of the file name, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
    }

    /// Declared media type, trimmed and lower-cased.
    pub(crate) fn declared_type(&self) -> String {
        self.media_type.trim().to_ascii_lowercase()
    }

    /// Read the full content. Resolves once, with either all bytes or an error.
    pub async fn read_bytes(&self) -> Result<Vec<u8>, DocNotesError> {
        match &self.source {
            CandidateSource::Bytes(bytes) => Ok(bytes.clone()),
            CandidateSource::Path(path) => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|source| DocNotesError::Io {
                        path: path.clone(),
                        source,
                    })?;
                debug!("Read {} bytes from {}", bytes.len(), path.display());
                Ok(bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn from_path_takes_file_name_and_leaves_type_empty() {
        let c = UploadCandidate::from_path("/tmp/books/Chapter One.PDF", None);
        assert_eq!(c.name, "Chapter One.PDF");
        assert_eq!(c.media_type, "");
        assert_eq!(c.extension().as_deref(), Some("pdf"));
    }

    #[test]
    fn extension_absent() {
        let c = UploadCandidate::from_bytes("README", "", b"x".to_vec());
        assert_eq!(c.extension(), None);
    }

    #[tokio::test]
    async fn read_bytes_from_disk() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"# Title\n").unwrap();
        let c = UploadCandidate::from_path(tmp.path(), Some("text/markdown"));
        assert_eq!(c.read_bytes().await.unwrap(), b"# Title\n");
    }

    #[tokio::test]
    async fn read_bytes_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let c = UploadCandidate::from_path(dir.path().join("gone.pdf"), None);
        let err = c.read_bytes().await.unwrap_err();
        assert!(matches!(err, DocNotesError::Io { .. }), "got: {err:?}");
    }
}
