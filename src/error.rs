//! Error types for the OTRS connector.
//!
//! This module defines `ConnectorError`, the unified error type used throughout
//! the crate, and `ErrorKind`, the coarse classification callers use to decide
//! whether to re-enter credentials, retry, or fix their input.
//!
//! # Security
//!
//! The connector password travels in the query string of every request, so
//! transport errors that echo the URL may contain it. Use `sanitize_message()`
//! before logging or returning any message built from an external source.

use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

/// Coarse error classification.
///
/// Every `ConnectorError` maps onto exactly one kind. None of the kinds are
/// retried inside the crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// An attachment could not be read. Fix the input.
    FileNotReadable,
    /// Stored credentials are missing, corrupt, or from another protection
    /// scope. Re-enter the password.
    DecryptionFailed,
    /// Network, DNS or TLS failure during submit. The caller may retry.
    TransportFailure,
    /// The endpoint answered, but not with a created ticket.
    EndpointError,
    /// Process configuration is missing or invalid.
    Configuration,
    /// The settings file or the scope key store could not be read or
    /// written.
    Settings,
    /// The credential vault has not been loaded yet.
    CredentialsNotLoaded,
    /// No content type is known for a file extension.
    MimeMappingNotFound,
    /// JSON serialization failed.
    Serialization,
}

/// Unified error type for all connector operations.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Configuration error - missing or invalid environment variables.
    #[error("configuration error: {0}")]
    Config(String),

    /// Attachment file could not be read.
    #[error("cannot read attachment {}: {source}", path.display())]
    FileNotReadable {
        /// The path that was requested.
        path: PathBuf,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The MIME lookup has no entry for this file name.
    #[error("no content type mapping for {filename}")]
    MimeMappingNotFound {
        /// The file name whose extension was looked up.
        filename: String,
    },

    /// Stored credentials could not be decrypted.
    #[error("stored credentials could not be decrypted: {0}")]
    DecryptionFailed(String),

    /// Encryption of a new password failed.
    #[error("password encryption failed: {0}")]
    EncryptionFailed(String),

    /// The vault was used before `load()` or `rotate()`.
    #[error("credentials not loaded - call load() before submitting")]
    CredentialsNotLoaded,

    /// The settings store could not be read or persisted.
    #[error("settings store error: {message}")]
    Settings {
        /// What went wrong.
        message: String,
        /// The underlying I/O failure, if any.
        #[source]
        source: Option<std::io::Error>,
    },

    /// HTTP client initialization failed.
    #[error("HTTP client error: {0}")]
    HttpClient(#[source] reqwest::Error),

    /// The request could not be delivered or the reply could not be read.
    #[error("transport failure: {message}")]
    Transport {
        /// Sanitized description of the failure.
        message: String,
        /// Whether the failure was a timeout.
        timed_out: bool,
    },

    /// The endpoint did not create a ticket.
    #[error("endpoint error (HTTP {status}): {message}")]
    Endpoint {
        /// The HTTP status code returned.
        status: StatusCode,
        /// Error code reported by the endpoint, if any.
        code: Option<String>,
        /// Human-readable description.
        message: String,
    },

    /// JSON serialization or deserialization failed.
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ConnectorError {
    /// Creates a configuration error for a missing environment variable.
    pub fn missing_env(var_name: &str) -> Self {
        ConnectorError::Config(format!(
            "missing required environment variable: {}",
            var_name
        ))
    }

    /// Creates a configuration error for an invalid value.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        ConnectorError::Config(message.into())
    }

    /// Creates a file-not-readable error for an attachment path.
    pub fn file_not_readable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ConnectorError::FileNotReadable {
            path: path.into(),
            source,
        }
    }

    /// Creates a decryption error.
    pub fn decryption_failed(message: impl Into<String>) -> Self {
        ConnectorError::DecryptionFailed(message.into())
    }

    /// Creates a settings error wrapping an I/O failure.
    pub fn settings_io(message: impl Into<String>, source: std::io::Error) -> Self {
        ConnectorError::Settings {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Creates a settings error without an underlying cause.
    pub fn settings(message: impl Into<String>) -> Self {
        ConnectorError::Settings {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an endpoint error.
    pub fn endpoint(status: StatusCode, code: Option<String>, message: impl Into<String>) -> Self {
        ConnectorError::Endpoint {
            status,
            code,
            message: message.into(),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConnectorError::Config(_) => ErrorKind::Configuration,
            ConnectorError::FileNotReadable { .. } => ErrorKind::FileNotReadable,
            ConnectorError::MimeMappingNotFound { .. } => ErrorKind::MimeMappingNotFound,
            ConnectorError::DecryptionFailed(_) => ErrorKind::DecryptionFailed,
            ConnectorError::EncryptionFailed(_) => ErrorKind::Settings,
            ConnectorError::CredentialsNotLoaded => ErrorKind::CredentialsNotLoaded,
            ConnectorError::Settings { .. } => ErrorKind::Settings,
            ConnectorError::HttpClient(_) => ErrorKind::Configuration,
            ConnectorError::Transport { .. } => ErrorKind::TransportFailure,
            ConnectorError::Endpoint { .. } => ErrorKind::EndpointError,
            ConnectorError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    /// Returns true if the caller may reasonably retry the operation.
    ///
    /// Only transport failures qualify. The connector itself makes a single
    /// attempt and never retries.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::TransportFailure
    }

    /// Returns true if the user should be prompted to re-enter the password.
    #[must_use]
    pub fn needs_new_credentials(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::DecryptionFailed | ErrorKind::CredentialsNotLoaded
        )
    }

    /// Sanitizes an error message to remove any occurrence of a secret.
    ///
    /// The raw secret and its percent-encoded and form-encoded forms are
    /// replaced with `[REDACTED]`, since the password is sent as a query
    /// parameter.
    #[must_use]
    pub fn sanitize_message(message: &str, secret: &str) -> String {
        if secret.is_empty() {
            return message.to_string();
        }
        let percent_encoded = urlencoding::encode(secret).into_owned();
        let form_encoded: String = url::form_urlencoded::byte_serialize(secret.as_bytes()).collect();

        [secret.to_string(), percent_encoded, form_encoded]
            .iter()
            .fold(message.to_string(), |message, form| {
                message.replace(form.as_str(), "[REDACTED]")
            })
    }

    /// Creates a sanitized version of this error's display message.
    #[must_use]
    pub fn sanitized_display(&self, secret: &str) -> String {
        Self::sanitize_message(&self.to_string(), secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_env_error() {
        let err = ConnectorError::missing_env("OTRS_SETTINGS_PATH");
        assert!(err.to_string().contains("OTRS_SETTINGS_PATH"));
        assert!(err.to_string().contains("missing"));
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn test_file_not_readable_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ConnectorError::file_not_readable("/tmp/missing.pdf", io);
        assert_eq!(err.kind(), ErrorKind::FileNotReadable);
        assert!(err.to_string().contains("/tmp/missing.pdf"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_decryption_failed_needs_new_credentials() {
        let err = ConnectorError::decryption_failed("authentication tag mismatch");
        assert_eq!(err.kind(), ErrorKind::DecryptionFailed);
        assert!(err.needs_new_credentials());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_transport_is_retryable() {
        let err = ConnectorError::Transport {
            message: "connection refused".to_string(),
            timed_out: false,
        };
        assert_eq!(err.kind(), ErrorKind::TransportFailure);
        assert!(err.is_retryable());
        assert!(!err.needs_new_credentials());
    }

    #[test]
    fn test_endpoint_error_display() {
        let err = ConnectorError::endpoint(
            StatusCode::OK,
            Some("TicketCreate.AuthFail".to_string()),
            "Authorization failing!",
        );
        assert_eq!(err.kind(), ErrorKind::EndpointError);
        assert!(err.to_string().contains("200"));
        assert!(err.to_string().contains("Authorization failing!"));
    }

    #[test]
    fn test_sanitize_message_removes_password() {
        let password = "super_secret_12345";
        let message = format!("error sending request with {} attached", password);
        let sanitized = ConnectorError::sanitize_message(&message, password);
        assert!(!sanitized.contains(password));
        assert!(sanitized.contains("[REDACTED]"));
    }

    #[test]
    fn test_sanitize_message_removes_url_encoded_password() {
        let password = "p@ss word&x";
        let message = "error sending request for url \
                       (https://otrs.example.com/ws?UserLogin=bot&Password=p%40ss%20word%26x)";
        let sanitized = ConnectorError::sanitize_message(message, password);
        assert!(!sanitized.contains("p%40ss"));
        assert!(sanitized.contains("Password=[REDACTED]"));
    }

    #[test]
    fn test_sanitize_message_removes_form_encoded_password() {
        let msg = "GET /Ticket?UserLogin=bot&Password=s3cret+pass%26word failed";
        let sanitized = ConnectorError::sanitize_message(msg, "s3cret pass&word");
        assert!(!sanitized.contains("s3cret"));
        assert!(sanitized.contains("[REDACTED]"));
    }

    #[test]
    fn test_encryption_failure_is_not_a_credential_problem() {
        let err =
            ConnectorError::EncryptionFailed("cannot write scope key: permission denied".to_string());
        assert_eq!(err.kind(), ErrorKind::Settings);
        assert!(!err.needs_new_credentials());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_sanitize_message_empty_secret() {
        let message = "Some error message";
        assert_eq!(ConnectorError::sanitize_message(message, ""), message);
    }
}
