//! Response models for the `TicketCreate` operation.

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::ConnectorError;

/// Identifiers assigned by OTRS to a newly created ticket.
///
/// All fields are `None` until a successful round trip fills them. OTRS may
/// return the IDs as numbers or strings; both are kept as strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseTicket {
    /// Internal ticket ID.
    #[serde(
        rename = "TicketID",
        default,
        deserialize_with = "deserialize_optional_string_or_int"
    )]
    pub ticket_id: Option<String>,

    /// ID of the first article.
    #[serde(
        rename = "ArticleID",
        default,
        deserialize_with = "deserialize_optional_string_or_int"
    )]
    pub article_id: Option<String>,

    /// Human-facing ticket number.
    #[serde(
        rename = "TicketNumber",
        default,
        deserialize_with = "deserialize_optional_string_or_int"
    )]
    pub ticket_number: Option<String>,

    /// Logical failure reported by the GenericInterface.
    #[serde(rename = "Error", default, skip_serializing_if = "Option::is_none")]
    pub error: Option<EndpointFault>,
}

/// The `Error` object OTRS returns when an operation fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointFault {
    /// Machine-readable code, e.g. `TicketCreate.AuthFail`.
    #[serde(rename = "ErrorCode", default)]
    pub code: String,

    /// Human-readable message.
    #[serde(rename = "ErrorMessage", default)]
    pub message: String,
}

impl ResponseTicket {
    /// Returns the ticket number, or an empty string when none was assigned.
    pub fn ticket_number_or_empty(&self) -> &str {
        self.ticket_number.as_deref().unwrap_or("")
    }

    /// Returns true if OTRS assigned a ticket number and reported no error.
    pub fn is_created(&self) -> bool {
        self.error.is_none() && self.ticket_number.as_deref().is_some_and(|n| !n.is_empty())
    }
}

/// Outcome of a completed submit: the HTTP status and whatever ticket data
/// the body contained.
///
/// A completed call is not necessarily a successful one. Check both
/// [`status`](Self::status) and [`ticket`](Self::ticket), or use
/// [`into_result`](Self::into_result).
#[derive(Debug, Clone)]
pub struct SubmitResponse {
    /// HTTP status code, passed through unchanged.
    pub status: StatusCode,

    /// Ticket identifiers parsed from the body. Empty if the body was not
    /// valid JSON.
    pub ticket: ResponseTicket,
}

impl SubmitResponse {
    /// Returns true if the call completed with 2xx and created a ticket.
    pub fn is_success(&self) -> bool {
        self.status.is_success() && self.ticket.is_created()
    }

    /// Converts the outcome into a `Result`, mapping every logical failure to
    /// `ConnectorError::Endpoint`.
    pub fn into_result(self) -> Result<ResponseTicket, ConnectorError> {
        if self.is_success() {
            return Ok(self.ticket);
        }

        let (code, message) = match self.ticket.error {
            Some(fault) => (Some(fault.code), fault.message),
            None if self.status.is_success() => {
                (None, "response did not contain a ticket number".to_string())
            }
            None => (
                None,
                self.status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string(),
            ),
        };

        Err(ConnectorError::endpoint(self.status, code, message))
    }
}

/// Deserializes an optional value that can be either a string or an integer into Option<String>.
fn deserialize_optional_string_or_int<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::{self, Visitor};

    struct OptionalStringOrIntVisitor;

    impl<'de> Visitor<'de> for OptionalStringOrIntVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("null, a string, or an integer")
        }

        fn visit_none<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
        where
            D: serde::Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_string<E>(self, value: String) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value))
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(value.to_string()))
        }
    }

    deserializer.deserialize_option(OptionalStringOrIntVisitor)
}
