//! Data models for the OTRS `TicketCreate` operation.
//!
//! This module contains the request payload (ticket, article, dynamic
//! fields, attachments) and the response types.

mod attachment;
mod response;
mod ticket;
mod ticket_request;

pub use attachment::*;
pub use response::*;
pub use ticket::*;
pub use ticket_request::*;
