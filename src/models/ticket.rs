//! Ticket, article and dynamic field models.
//!
//! These are the value objects nested inside a
//! [`TicketCreateRequest`](super::TicketCreateRequest). Field names are
//! serialized exactly as the OTRS GenericInterface expects them.

use serde::{Deserialize, Serialize};

/// State given to new tickets unless overridden.
pub const DEFAULT_STATE: &str = "new";

/// Priority given to new tickets unless overridden (3 = normal).
pub const DEFAULT_PRIORITY_ID: i32 = 3;

/// Sender type given to new articles unless overridden.
pub const DEFAULT_SENDER_TYPE: &str = "system";

/// Content type given to new articles unless overridden.
pub const DEFAULT_ARTICLE_CONTENT_TYPE: &str = "text/plain; charset=utf8";

/// Installation-specific defaults for new tickets.
///
/// Read from the `customer` and `queue` settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketDefaults {
    /// Default customer user login.
    pub customer_user: String,

    /// Default queue name.
    pub queue: String,
}

impl TicketDefaults {
    /// Creates defaults from explicit values.
    pub fn new(customer_user: impl Into<String>, queue: impl Into<String>) -> Self {
        Self {
            customer_user: customer_user.into(),
            queue: queue.into(),
        }
    }
}

/// The ticket part of a create request.
///
/// Defaults are applied once, at construction. Assigning a field afterwards
/// replaces the default for good.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewTicket {
    /// Ticket title. Sent as-is, even when blank.
    pub title: String,

    /// Customer user login.
    pub customer_user: String,

    /// Queue the ticket is created in.
    pub queue: String,

    /// Initial state name.
    pub state: String,

    /// Priority ID.
    #[serde(rename = "PriorityID")]
    pub priority_id: i32,
}

impl NewTicket {
    /// Creates a ticket with an empty title and the given defaults.
    pub fn new(defaults: &TicketDefaults) -> Self {
        Self {
            title: String::new(),
            customer_user: defaults.customer_user.clone(),
            queue: defaults.queue.clone(),
            state: DEFAULT_STATE.to_string(),
            priority_id: DEFAULT_PRIORITY_ID,
        }
    }
}

/// The first article (body) of a new ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NewArticle {
    /// Article subject.
    pub subject: String,

    /// Article body.
    pub body: String,

    /// Sender type, e.g. "system", "agent" or "customer".
    pub sender_type: String,

    /// MIME type and charset of the body.
    pub content_type: String,
}

impl Default for NewArticle {
    fn default() -> Self {
        Self {
            subject: String::new(),
            body: String::new(),
            sender_type: DEFAULT_SENDER_TYPE.to_string(),
            content_type: DEFAULT_ARTICLE_CONTENT_TYPE.to_string(),
        }
    }
}

/// A dynamic field value set on the new ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DynamicField {
    /// Field name as configured in OTRS.
    pub name: String,

    /// Field value.
    pub value: String,
}
