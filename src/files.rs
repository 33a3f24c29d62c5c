//! File-read and MIME-lookup collaborators used when attaching files.
//!
//! Both are traits so tests (and embedding applications) can substitute
//! in-memory implementations for the filesystem and the extension table.

use std::path::Path;

use crate::error::ConnectorError;

/// Content type used when the extension of an attachment is not recognised.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Reads a file fully into memory.
pub trait FileReader: Send + Sync {
    /// Returns the raw bytes at `path`.
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>>;
}

/// Reads files from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsFileReader;

impl FileReader for FsFileReader {
    fn read(&self, path: &Path) -> std::io::Result<Vec<u8>> {
        std::fs::read(path)
    }
}

/// Maps a file name to a content type.
pub trait MimeLookup: Send + Sync {
    /// Returns the content type for `filename`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::MimeMappingNotFound` when the extension is
    /// unknown.
    fn content_type(&self, filename: &str) -> Result<String, ConnectorError>;
}

/// Extension table lookup backed by `mime_guess`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MimeGuessLookup;

impl MimeLookup for MimeGuessLookup {
    fn content_type(&self, filename: &str) -> Result<String, ConnectorError> {
        mime_guess::from_path(filename)
            .first_raw()
            .map(str::to_string)
            .ok_or_else(|| ConnectorError::MimeMappingNotFound {
                filename: filename.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_office_document_extensions_resolve() {
        let lookup = MimeGuessLookup;
        assert_eq!(lookup.content_type("invoice.pdf").unwrap(), "application/pdf");
        assert_eq!(lookup.content_type("notes.txt").unwrap(), "text/plain");
        assert_eq!(
            lookup.content_type("report.docx").unwrap(),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
    }

    #[test]
    fn test_unknown_extension_is_mapping_not_found() {
        let err = MimeGuessLookup.content_type("core.zzqx").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MimeMappingNotFound);
        assert!(err.to_string().contains("core.zzqx"));
    }

    #[test]
    fn test_fs_reader_reports_missing_file() {
        let result = FsFileReader.read(Path::new("/definitely/not/here.pdf"));
        assert!(result.is_err());
    }
}
