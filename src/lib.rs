//! # otrs-connector
//!
//! A client-side connector that creates tickets through the OTRS
//! GenericInterface REST API and keeps the connector password encrypted at
//! rest.
//!
//! ## Features
//!
//! - **Ticket payloads**: ticket and article with installation defaults,
//!   dynamic fields, and file attachments
//! - **Credential vault**: the stored password is encrypted under a
//!   per-account or per-machine key with fresh entropy on every rotation
//! - **Single-attempt submit**: one POST per ticket, status code and reply
//!   returned to the caller unchanged
//! - **Scripting surface**: an MCP server with `create_ticket`,
//!   `get_setting` and `update_setting` tools
//!
//! ## Architecture
//!
//! - [`config`] - Process configuration from environment variables
//! - [`error`] - Error type and error kinds
//! - [`models`] - Request and response payloads
//! - [`files`] - File-read and MIME-lookup collaborators
//! - [`settings`] - Persisted settings store and get/update facade
//! - [`vault`] - Password encryption and protection scopes
//! - [`otrs_client`] - HTTP client for `TicketCreate`
//! - [`connector`] - High-level ticket creation
//! - [`server`] - MCP server implementation with tool routing
//! - [`tools`] - Tool input parameter structs
//!
//! ## Security Considerations
//!
//! The password is held decrypted only in memory and is:
//! - Never logged at any log level
//! - Sanitized from all error messages, raw and URL-encoded
//! - Never returned by `get_setting`
//!
//! ## Example
//!
//! ```ignore
//! use otrs_connector::config::Config;
//! use otrs_connector::connector::TicketCreator;
//! use otrs_connector::settings::{SettingsFacade, SettingsStore};
//!
//! async fn example() -> Result<(), otrs_connector::error::ConnectorError> {
//!     let config = Config::from_env()?;
//!     let store = SettingsStore::open(&config.settings_path)?;
//!     let facade = SettingsFacade::from_config(&config, store);
//!
//!     let mut creator = TicketCreator::connect(&config, &facade)?;
//!     creator.request.ticket.title = "Printer broken".to_string();
//!     creator.request.article.body = "Out of toner".to_string();
//!     creator.request.add_dynamic_field("Room", "B12");
//!     creator.request.add_attachment("invoice.pdf")?;
//!
//!     let status = creator.request().await?;
//!     println!("{}: ticket #{}", status, creator.response().ticket_number_or_empty());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod connector;
pub mod error;
pub mod files;
pub mod models;
pub mod otrs_client;
pub mod server;
pub mod settings;
pub mod tools;
pub mod vault;
