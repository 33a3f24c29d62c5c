//! HTTP client for the OTRS GenericInterface `TicketCreate` operation.
//!
//! This module provides the `TicketClient` struct, which builds the request
//! URI, serializes a [`TicketCreateRequest`] as the JSON body, and maps the
//! reply into a [`SubmitResponse`].
//!
//! # Single attempt
//!
//! Every submit is exactly one POST. Transport failures are returned as
//! `ConnectorError::Transport`; callers that want retries or a deadline wrap
//! the call themselves.
//!
//! # Security
//!
//! The endpoint authenticates through the `UserLogin` and `Password` query
//! parameters. The password is never logged, and transport errors are
//! stripped of the request URL and sanitized before they are returned.

use std::fmt;

use reqwest::header::ACCEPT;
use reqwest::Client;
use url::Url;
use zeroize::Zeroizing;

use crate::config::Config;
use crate::error::ConnectorError;
use crate::models::{ResponseTicket, SubmitResponse, TicketCreateRequest};
use crate::settings::ConnectorSettings;
use crate::vault::CredentialVault;

/// The Accept header value sent with every request.
const JSON_ACCEPT_HEADER: &str = "application/json";

/// Client for creating tickets through one configured endpoint.
///
/// # Example
///
/// ```ignore
/// let store = SettingsStore::open(&config.settings_path)?;
/// let settings = ConnectorSettings::from_store(&store);
/// let mut vault = CredentialVault::from_config(&config, store);
/// vault.load()?;
///
/// let client = TicketClient::new(&config, &settings, &vault)?;
/// let outcome = client.submit(&request).await?;
/// ```
#[derive(Clone)]
pub struct TicketClient {
    /// The underlying HTTP client (cloning is cheap).
    http: Client,

    /// Base URI joined with the resource path, without credentials.
    endpoint: Url,

    /// Agent login sent as `UserLogin`.
    user: String,

    /// Decrypted password sent as `Password`.
    /// SECURITY: Never log this value!
    password: Zeroizing<String>,
}

impl TicketClient {
    /// Creates a client from the endpoint settings and a loaded vault.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::CredentialsNotLoaded` if the vault has not
    /// been loaded, `ConnectorError::Config` if `uri`/`resource` do not form
    /// a valid URL, and `ConnectorError::HttpClient` if the HTTP client fails
    /// to initialize.
    pub fn new(
        config: &Config,
        settings: &ConnectorSettings,
        vault: &CredentialVault,
    ) -> Result<Self, ConnectorError> {
        let password = vault.password()?;
        Self::with_credentials(config, settings, &settings.user, password)
    }

    /// Creates a client with an explicit login and password.
    pub fn with_credentials(
        config: &Config,
        settings: &ConnectorSettings,
        user: &str,
        password: &str,
    ) -> Result<Self, ConnectorError> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build().map_err(ConnectorError::HttpClient)?;

        let endpoint = Self::endpoint_url(&settings.uri, &settings.resource)?;

        Ok(Self {
            http,
            endpoint,
            user: user.to_string(),
            password: Zeroizing::new(password.to_string()),
        })
    }

    /// Joins the base URI and the resource path.
    fn endpoint_url(uri: &str, resource: &str) -> Result<Url, ConnectorError> {
        let base = Config::validate_base_url(uri)?;
        let resource = resource.trim().trim_matches('/');

        let joined = if resource.is_empty() {
            base
        } else {
            format!("{}/{}", base, resource)
        };

        Url::parse(&joined).map_err(|e| {
            ConnectorError::invalid_config(format!("invalid endpoint URL {:?}: {}", joined, e))
        })
    }

    /// The endpoint without credentials, safe to log.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns a reference to the password for sanitization purposes.
    ///
    /// This should ONLY be used for sanitizing error messages, never for logging.
    pub(crate) fn password_for_sanitization(&self) -> &str {
        &self.password
    }

    /// The full request URL, including the authentication parameters.
    ///
    /// Any query already present on the endpoint is kept.
    fn request_url(&self) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("UserLogin", &self.user)
            .append_pair("Password", &self.password);
        url
    }

    /// Submits `request` and returns the status code with the parsed reply.
    ///
    /// A non-2xx status is not an error: the status is returned unchanged
    /// together with whatever ticket data the body held. A body that is not
    /// valid JSON yields an empty [`ResponseTicket`].
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Transport` if the request cannot be sent or
    /// the reply cannot be read, and `ConnectorError::Serialization` if the
    /// request cannot be encoded.
    pub async fn submit(
        &self,
        request: &TicketCreateRequest,
    ) -> Result<SubmitResponse, ConnectorError> {
        tracing::debug!(
            endpoint = %self.endpoint,
            title = %request.ticket.title,
            queue = %request.ticket.queue,
            dynamic_fields = request.dynamic_fields().map_or(0, <[_]>::len),
            attachments = request.attachments().map_or(0, <[_]>::len),
            "Submitting TicketCreate request"
        );

        let body = serde_json::to_vec(request)?;

        let response = self
            .http
            .post(self.request_url())
            .header(ACCEPT, JSON_ACCEPT_HEADER)
            .header(reqwest::header::CONTENT_TYPE, JSON_ACCEPT_HEADER)
            .body(body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(e))?;

        tracing::trace!(
            body = %ConnectorError::sanitize_message(&body, &self.password),
            "TicketCreate response"
        );

        let ticket = match serde_json::from_str::<ResponseTicket>(&body) {
            Ok(ticket) => ticket,
            Err(e) => {
                tracing::warn!(status = %status, error = %e, "Response body is not a ticket reply");
                ResponseTicket::default()
            }
        };

        if status.is_success() && ticket.is_created() {
            tracing::info!(
                status = %status,
                ticket_number = ticket.ticket_number_or_empty(),
                "Ticket created"
            );
        } else {
            tracing::warn!(
                status = %status,
                error_code = ticket.error.as_ref().map(|e| e.code.as_str()),
                "Endpoint did not create a ticket"
            );
        }

        Ok(SubmitResponse { status, ticket })
    }

    /// Converts a reqwest failure into a sanitized transport error.
    fn transport_error(&self, error: reqwest::Error) -> ConnectorError {
        let timed_out = error.is_timeout();
        let message = ConnectorError::sanitize_message(
            &error.without_url().to_string(),
            &self.password,
        );
        tracing::error!(error = %message, timed_out, "TicketCreate transport failure");
        ConnectorError::Transport { message, timed_out }
    }
}

impl fmt::Debug for TicketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TicketClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(uri: &str, resource: &str) -> ConnectorSettings {
        ConnectorSettings {
            uri: uri.to_string(),
            resource: resource.to_string(),
            user: "ticketbot".to_string(),
            ..Default::default()
        }
    }

    /// Creates a TicketClient for unit tests without a vault.
    fn test_client(password: &str) -> TicketClient {
        TicketClient::with_credentials(
            &Config::for_settings_file("settings.json"),
            &settings(
                "https://otrs.example.com/otrs/nph-genericinterface.pl/",
                "/Webservice/Connector/Ticket",
            ),
            "ticketbot",
            password,
        )
        .expect("Failed to create test client")
    }

    #[test]
    fn test_endpoint_url_joins_base_and_resource() {
        let url = TicketClient::endpoint_url(
            "https://otrs.example.com/otrs/nph-genericinterface.pl/",
            "/Webservice/Connector/Ticket",
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://otrs.example.com/otrs/nph-genericinterface.pl/Webservice/Connector/Ticket"
        );
    }

    #[test]
    fn test_endpoint_url_without_resource() {
        let url = TicketClient::endpoint_url("https://otrs.example.com/ws", "").unwrap();
        assert_eq!(url.as_str(), "https://otrs.example.com/ws");
    }

    #[test]
    fn test_endpoint_url_rejects_missing_scheme() {
        assert!(TicketClient::endpoint_url("otrs.example.com", "Ticket").is_err());
    }

    #[test]
    fn test_request_url_carries_credentials_in_query() {
        let client = test_client("s3cret");
        let url = client.request_url();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("UserLogin".to_string(), "ticketbot".to_string()),
                ("Password".to_string(), "s3cret".to_string()),
            ]
        );
        assert!(url.path().ends_with("/Webservice/Connector/Ticket"));
    }

    #[test]
    fn test_request_url_encodes_special_characters() {
        let client = test_client("p@ss&word=1");
        let url = client.request_url();

        assert!(!url.as_str().contains("&word=1"));
        let password = url
            .query_pairs()
            .find(|(k, _)| k == "Password")
            .map(|(_, v)| v.into_owned());
        assert_eq!(password.as_deref(), Some("p@ss&word=1"));
    }

    #[test]
    fn test_request_url_password_is_redactable() {
        let client = test_client("s3cret pass&word");
        let url = client.request_url();

        assert!(url.as_str().ends_with("Password=s3cret+pass%26word"));
        let sanitized = ConnectorError::sanitize_message(url.as_str(), "s3cret pass&word");
        assert!(!sanitized.contains("s3cret"));
        assert!(sanitized.ends_with("Password=[REDACTED]"));
    }

    #[test]
    fn test_request_url_keeps_existing_query() {
        let mut client = test_client("pw");
        client.endpoint = Url::parse("https://otrs.example.com/ws?Version=2").unwrap();
        let url = client.request_url();
        assert_eq!(url.query(), Some("Version=2&UserLogin=ticketbot&Password=pw"));
    }

    #[test]
    fn test_debug_hides_password() {
        let client = test_client("s3cret");
        let debug = format!("{:?}", client);
        assert!(!debug.contains("s3cret"));
        assert!(debug.contains("ticketbot"));
        assert_eq!(client.password_for_sanitization(), "s3cret");
    }

    #[test]
    fn test_new_requires_loaded_vault() {
        use crate::settings::SettingsStore;
        use crate::vault::{MemoryScopeKeys, ProtectionScope};
        use std::sync::Arc;

        let vault = CredentialVault::new(
            SettingsStore::in_memory(),
            ProtectionScope::CurrentUser,
            Arc::new(MemoryScopeKeys::new()),
        );
        let err = TicketClient::new(
            &Config::for_settings_file("settings.json"),
            &settings("https://otrs.example.com", "Ticket"),
            &vault,
        )
        .unwrap_err();
        assert!(matches!(err, ConnectorError::CredentialsNotLoaded));
    }
}
