//! MCP server implementation for the OTRS connector.
//!
//! This module defines the `ConnectorServer` struct that implements the MCP
//! `ServerHandler` trait. Its tools are the stringly-typed scripting surface
//! of the connector: create a ticket, read a setting, update a setting.

use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router, ServerHandler,
};

use crate::config::Config;
use crate::connector::TicketCreator;
use crate::error::ConnectorError;
use crate::models::ResponseTicket;
use crate::settings::SettingsFacade;
use crate::tools::{CreateTicketInput, GetSettingInput, UpdateSettingInput};

/// The connector MCP server.
#[derive(Clone)]
pub struct ConnectorServer {
    /// Process configuration.
    config: Config,
    /// Settings access, shared with every ticket creator.
    settings: SettingsFacade,
    /// Tool router for MCP tool dispatch.
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ConnectorServer {
    /// Creates a new server instance.
    ///
    /// # Arguments
    ///
    /// * `config` - Process configuration
    /// * `settings` - Settings facade over the persisted store
    pub fn new(config: Config, settings: SettingsFacade) -> Self {
        Self {
            config,
            settings,
            tool_router: Self::tool_router(),
        }
    }

    /// A simple ping tool to verify the server is running.
    #[tool(description = "Test connectivity to the OTRS connector. Returns 'pong' if the server is running correctly.")]
    fn ping(&self) -> String {
        tracing::debug!("ping tool called");
        "pong".to_string()
    }

    /// Create a new OTRS ticket.
    ///
    /// Loads the stored credentials on every call, so a password rotated
    /// through update_setting takes effect immediately.
    #[tool(description = "Create a new OTRS ticket. Subject and message are the article; title defaults to the subject and vice versa. Customer, queue, state and priority default to the configured values. Optionally attach a local file by path. Returns the ticket number.")]
    async fn create_ticket(
        &self,
        Parameters(input): Parameters<CreateTicketInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(subject = %input.subject, "create_ticket tool called");

        let mut creator = TicketCreator::connect(&self.config, &self.settings).map_err(|e| {
            tracing::error!(error = %e, "Failed to prepare ticket creation");
            format_failure("prepare ticket creation", &e)
        })?;

        let ticket_number = creator.create_ticket(input.into()).await.map_err(|e| {
            let sanitized = e.sanitized_display(creator.client().password_for_sanitization());
            tracing::error!(error = %sanitized, "Failed to create ticket");
            format!("Failed to create ticket: {}", sanitized)
        })?;

        let status = creator.status().map(|s| s.as_u16()).unwrap_or_default();
        let response = creator.response();

        if ticket_number.is_empty() || !response.is_created() {
            return Err(format_endpoint_failure(status, response));
        }

        Ok(format_create_result(status, response))
    }

    /// Read a connector setting.
    #[tool(description = "Read a connector setting (uri, resource, user, customer, queue). Unknown names and the password return an empty string.")]
    fn get_setting(&self, Parameters(input): Parameters<GetSettingInput>) -> String {
        let input = input.sanitize();
        tracing::debug!(setting = %input.name, "get_setting tool called");
        self.settings.get(&input.name)
    }

    /// Update a connector setting.
    #[tool(description = "Update a connector setting (uri, resource, user, password, customer, queue). The password is stored encrypted. Returns 'true' if the setting was updated and 'false' for unknown names.")]
    fn update_setting(
        &self,
        Parameters(input): Parameters<UpdateSettingInput>,
    ) -> Result<String, String> {
        let input = input.sanitize();
        tracing::debug!(setting = %input.name, "update_setting tool called");

        let updated = self
            .settings
            .update(&input.name, &input.value)
            .map_err(|e| {
                let sanitized = e.sanitized_display(&input.value);
                tracing::error!(error = %sanitized, setting = %input.name, "Failed to update setting");
                format!("Failed to update setting {}: {}", input.name, sanitized)
            })?;

        Ok(updated.to_string())
    }
}

#[tool_handler]
impl ServerHandler for ConnectorServer {
    /// Returns server information for the MCP initialize handshake.
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "The OTRS connector creates helpdesk tickets. \
                 Use create_ticket to open a ticket, get_setting and update_setting \
                 to inspect or change the endpoint, defaults and stored password. \
                 Start with 'ping' to verify connectivity."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Response formatting helpers
// ============================================================================

/// Formats a failure that happened before anything was submitted.
fn format_failure(action: &str, error: &ConnectorError) -> String {
    let hint = if error.needs_new_credentials() {
        " - re-enter the password with update_setting"
    } else {
        ""
    };
    format!("Failed to {}: {}{}", action, error, hint)
}

/// Formats a completed call that did not create a ticket.
fn format_endpoint_failure(status: u16, response: &ResponseTicket) -> String {
    match &response.error {
        Some(fault) => format!(
            "OTRS did not create the ticket (HTTP {}): {} {}",
            status, fault.code, fault.message
        ),
        None => format!(
            "OTRS did not create the ticket (HTTP {}): no ticket number in the response",
            status
        ),
    }
}

/// Formats the result of a successful create.
fn format_create_result(status: u16, response: &ResponseTicket) -> String {
    let mut output = format!(
        "Successfully created ticket #{}\n\n",
        response.ticket_number_or_empty()
    );

    if let Some(id) = &response.ticket_id {
        output.push_str(&format!("Ticket ID: {}\n", id));
    }
    if let Some(id) = &response.article_id {
        output.push_str(&format!("Article ID: {}\n", id));
    }
    output.push_str(&format!("HTTP status: {}\n", status));

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EndpointFault;
    use crate::settings::SettingsStore;
    use crate::vault::{MemoryScopeKeys, ProtectionScope};
    use std::sync::Arc;

    fn test_server() -> ConnectorServer {
        let settings = SettingsFacade::new(
            SettingsStore::in_memory(),
            ProtectionScope::CurrentUser,
            Arc::new(MemoryScopeKeys::new()),
        );
        ConnectorServer::new(Config::for_settings_file("settings.json"), settings)
    }

    #[test]
    fn test_server_info_has_tools_capability() {
        let server = test_server();
        let info = server.get_info();
        assert!(info.instructions.is_some());
        assert!(info.capabilities.tools.is_some());
    }

    #[test]
    fn test_ping_tool_returns_pong() {
        assert_eq!(test_server().ping(), "pong");
    }

    #[test]
    fn test_setting_tools_soft_miss() {
        let server = test_server();

        let updated = server.update_setting(Parameters(UpdateSettingInput {
            name: "colour".to_string(),
            value: "blue".to_string(),
        }));
        assert_eq!(updated.unwrap(), "false");

        let value = server.get_setting(Parameters(GetSettingInput {
            name: "colour".to_string(),
        }));
        assert_eq!(value, "");
    }

    #[test]
    fn test_setting_tools_round_trip() {
        let server = test_server();

        let updated = server.update_setting(Parameters(UpdateSettingInput {
            name: " queue ".to_string(),
            value: "Raw".to_string(),
        }));
        assert_eq!(updated.unwrap(), "true");

        let value = server.get_setting(Parameters(GetSettingInput {
            name: "queue".to_string(),
        }));
        assert_eq!(value, "Raw");
    }

    #[test]
    fn test_password_is_never_read_back() {
        let server = test_server();
        server
            .update_setting(Parameters(UpdateSettingInput {
                name: "password".to_string(),
                value: "hunter2".to_string(),
            }))
            .unwrap();

        let value = server.get_setting(Parameters(GetSettingInput {
            name: "password".to_string(),
        }));
        assert_eq!(value, "");
    }

    #[tokio::test]
    async fn test_create_ticket_without_credentials_asks_for_password() {
        let server = test_server();
        let err = server
            .create_ticket(Parameters(CreateTicketInput {
                subject: "Printer broken".to_string(),
                message: "Out of toner".to_string(),
                title: None,
                customer: None,
                queue: None,
                state: None,
                priority: None,
                attachment: None,
            }))
            .await
            .unwrap_err();
        assert!(err.contains("decrypted"));
        assert!(err.contains("update_setting"));
    }

    #[test]
    fn test_format_failure_hints_only_for_credential_errors() {
        let hinted = format_failure(
            "prepare ticket creation",
            &ConnectorError::decryption_failed("authentication failed"),
        );
        assert!(hinted.contains("update_setting"));

        let plain = format_failure(
            "prepare ticket creation",
            &ConnectorError::EncryptionFailed("cannot write scope key".to_string()),
        );
        assert!(!plain.contains("update_setting"));
    }

    #[test]
    fn test_format_create_result() {
        let response = ResponseTicket {
            ticket_id: Some("42".to_string()),
            article_id: Some("97".to_string()),
            ticket_number: Some("2024061010000042".to_string()),
            error: None,
        };
        let result = format_create_result(200, &response);
        assert!(result.contains("Successfully created ticket #2024061010000042"));
        assert!(result.contains("Ticket ID: 42"));
        assert!(result.contains("Article ID: 97"));
    }

    #[test]
    fn test_format_endpoint_failure_with_fault() {
        let response = ResponseTicket {
            error: Some(EndpointFault {
                code: "TicketCreate.AuthFail".to_string(),
                message: "Authorization failing!".to_string(),
            }),
            ..Default::default()
        };
        let result = format_endpoint_failure(200, &response);
        assert!(result.contains("HTTP 200"));
        assert!(result.contains("TicketCreate.AuthFail"));
    }

    #[test]
    fn test_format_endpoint_failure_without_body() {
        let result = format_endpoint_failure(502, &ResponseTicket::default());
        assert!(result.contains("HTTP 502"));
        assert!(result.contains("no ticket number"));
    }
}
