//! Attachment model.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{ConnectorError, ErrorKind};
use crate::files::{FileReader, MimeLookup, FALLBACK_CONTENT_TYPE};

/// A file attached to the first article of a new ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Attachment {
    /// Base64 encoding of the complete file contents.
    pub content: String,

    /// MIME type derived from the file extension.
    pub content_type: String,

    /// File name without any directory part.
    pub filename: String,
}

impl Attachment {
    /// Reads `path` and builds an attachment from its current contents.
    ///
    /// The file is read in full on every call. An extension unknown to
    /// `mime` falls back to `application/octet-stream`.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::FileNotReadable` if the file cannot be read.
    pub fn from_file(
        path: &Path,
        reader: &dyn FileReader,
        mime: &dyn MimeLookup,
    ) -> Result<Self, ConnectorError> {
        let raw = reader
            .read(path)
            .map_err(|e| ConnectorError::file_not_readable(path, e))?;

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let content_type = match mime.content_type(&filename) {
            Ok(content_type) => content_type,
            Err(e) if e.kind() == ErrorKind::MimeMappingNotFound => {
                tracing::warn!(
                    filename = %filename,
                    "Unknown attachment extension, sending as {}",
                    FALLBACK_CONTENT_TYPE
                );
                FALLBACK_CONTENT_TYPE.to_string()
            }
            Err(e) => return Err(e),
        };

        tracing::debug!(
            filename = %filename,
            content_type = %content_type,
            bytes = raw.len(),
            "Attachment read"
        );

        Ok(Self {
            content: STANDARD.encode(&raw),
            content_type,
            filename,
        })
    }

    /// Decodes the base64 content back into raw bytes.
    pub fn decoded_content(&self) -> Result<Vec<u8>, base64::DecodeError> {
        STANDARD.decode(&self.content)
    }
}
