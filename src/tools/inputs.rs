//! Tool input parameter structs for MCP tools.
//!
//! This module defines the input types for each MCP tool, with
//! JSON Schema derivation for MCP tool discovery.
//!
//! # Input Sanitization
//!
//! Input structs implement `sanitize()`, which trims whitespace from
//! identifier-like fields. Free text and setting values are left untouched.

use std::path::PathBuf;

use rmcp::schemars::{self, JsonSchema};
use serde::Deserialize;

use crate::connector::CreateTicketArgs;

/// Helper function to trim an optional string.
fn trim_option(s: &Option<String>) -> Option<String> {
    s.as_ref().map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Input parameters for the create_ticket tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateTicketInput {
    /// Article subject. Used as the title when no title is given.
    #[serde(default)]
    pub subject: String,

    /// Article body (plain text).
    #[serde(default)]
    pub message: String,

    /// Ticket title. Defaults to the subject.
    #[serde(default)]
    pub title: Option<String>,

    /// Customer user login. Defaults to the 'customer' setting.
    #[serde(default)]
    pub customer: Option<String>,

    /// Queue name. Defaults to the 'queue' setting.
    #[serde(default)]
    pub queue: Option<String>,

    /// Initial state (default: 'new').
    #[serde(default)]
    pub state: Option<String>,

    /// Priority ID (default: 3). 0 keeps the default.
    #[serde(default)]
    pub priority: Option<i32>,

    /// Path of a local file to attach.
    #[serde(default)]
    pub attachment: Option<String>,
}

impl CreateTicketInput {
    /// Sanitizes input by trimming whitespace from identifier fields.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            subject: self.subject.trim().to_string(),
            message: self.message,
            title: trim_option(&self.title),
            customer: trim_option(&self.customer),
            queue: trim_option(&self.queue),
            state: trim_option(&self.state),
            priority: self.priority,
            attachment: trim_option(&self.attachment),
        }
    }
}

impl From<CreateTicketInput> for CreateTicketArgs {
    fn from(input: CreateTicketInput) -> Self {
        Self {
            subject: input.subject,
            message: input.message,
            title: input.title,
            customer: input.customer,
            queue: input.queue,
            state: input.state,
            priority: input.priority,
            attachment: input.attachment.map(PathBuf::from),
        }
    }
}

/// Input parameters for the get_setting tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct GetSettingInput {
    /// Setting name: uri, resource, user, customer or queue.
    pub name: String,
}

impl GetSettingInput {
    /// Sanitizes input by trimming whitespace from the name.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
        }
    }
}

/// Input parameters for the update_setting tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateSettingInput {
    /// Setting name: uri, resource, user, password, customer or queue.
    pub name: String,

    /// New value. Passwords are stored encrypted.
    pub value: String,
}

impl UpdateSettingInput {
    /// Sanitizes input by trimming whitespace from the name only.
    #[must_use]
    pub fn sanitize(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            value: self.value,
        }
    }
}
