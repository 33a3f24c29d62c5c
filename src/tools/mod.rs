//! MCP tool inputs for the connector.
//!
//! This module contains the input types for the MCP tools that expose
//! ticket creation and settings access to scripting hosts.

mod inputs;

pub use inputs::*;
