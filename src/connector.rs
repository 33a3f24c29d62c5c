//! High-level ticket creation.
//!
//! [`TicketCreator`] bundles one request payload, one client and the last
//! response. It handles a single submission at a time; create one per
//! ticket.

use std::path::PathBuf;

use reqwest::StatusCode;

use crate::config::Config;
use crate::error::ConnectorError;
use crate::models::{ResponseTicket, TicketCreateRequest, TicketDefaults};
use crate::otrs_client::TicketClient;
use crate::settings::{ConnectorSettings, SettingsFacade};

/// Arguments of [`TicketCreator::create_ticket`].
///
/// Empty strings and a zero priority count as "not given" and keep the
/// defaults.
#[derive(Debug, Clone, Default)]
pub struct CreateTicketArgs {
    /// Article subject. Also used as title when `title` is empty.
    pub subject: String,
    /// Article body.
    pub message: String,
    /// Ticket title. Also used as subject when `subject` is empty.
    pub title: Option<String>,
    /// Customer user override.
    pub customer: Option<String>,
    /// Queue override.
    pub queue: Option<String>,
    /// State override.
    pub state: Option<String>,
    /// Priority override; 0 keeps the default.
    pub priority: Option<i32>,
    /// File to attach.
    pub attachment: Option<PathBuf>,
}

/// Builds and submits one ticket.
#[derive(Debug)]
pub struct TicketCreator {
    /// The payload to submit. Mutate it freely before calling
    /// [`request`](Self::request).
    pub request: TicketCreateRequest,

    client: TicketClient,
    response: ResponseTicket,
    status: Option<StatusCode>,
}

impl TicketCreator {
    /// Creates a creator with a fresh payload built from `defaults`.
    pub fn new(client: TicketClient, defaults: &TicketDefaults) -> Self {
        Self {
            request: TicketCreateRequest::new(defaults),
            client,
            response: ResponseTicket::default(),
            status: None,
        }
    }

    /// Reads the endpoint settings, loads the stored credentials and
    /// prepares a creator.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::DecryptionFailed` if the stored password
    /// cannot be recovered, or `ConnectorError::Config` if the endpoint
    /// settings are invalid.
    pub fn connect(config: &Config, facade: &SettingsFacade) -> Result<Self, ConnectorError> {
        let settings = ConnectorSettings::from_store(facade.store());

        let mut vault = facade.vault();
        vault.load()?;

        let client = TicketClient::new(config, &settings, &vault)?;
        Ok(Self::new(client, &settings.ticket_defaults()))
    }

    /// The reply to the last submission; empty before the first one.
    pub fn response(&self) -> &ResponseTicket {
        &self.response
    }

    /// Status code of the last submission.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// The client used for submission.
    pub fn client(&self) -> &TicketClient {
        &self.client
    }

    /// Submits the payload as-is and stores the reply.
    ///
    /// Returns the HTTP status unchanged; inspect [`response`](Self::response)
    /// to see whether a ticket was created.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::Transport` if the call did not complete.
    pub async fn request(&mut self) -> Result<StatusCode, ConnectorError> {
        let outcome = self.client.submit(&self.request).await?;
        self.status = Some(outcome.status);
        self.response = outcome.ticket;
        Ok(outcome.status)
    }

    /// Applies overrides and the title/subject fallback, submits, and returns
    /// the assigned ticket number ("" if none was assigned).
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::FileNotReadable` if the attachment cannot be
    /// read (nothing is submitted), or `ConnectorError::Transport` if the
    /// call did not complete.
    pub async fn create_ticket(&mut self, args: CreateTicketArgs) -> Result<String, ConnectorError> {
        let ticket = &mut self.request.ticket;
        if let Some(customer) = non_empty(args.customer) {
            ticket.customer_user = customer;
        }
        if let Some(queue) = non_empty(args.queue) {
            ticket.queue = queue;
        }
        if let Some(state) = non_empty(args.state) {
            ticket.state = state;
        }
        if let Some(priority) = args.priority.filter(|p| *p != 0) {
            ticket.priority_id = priority;
        }
        if let Some(path) = args.attachment.filter(|p| !p.as_os_str().is_empty()) {
            self.request.add_attachment(path)?;
        }

        self.request.ticket.title = args.title.unwrap_or_default();
        self.request.article.subject = args.subject;
        self.request.article.body = args.message;
        self.request.apply_title_subject_fallback();

        self.request().await?;
        Ok(self.response.ticket_number_or_empty().to_string())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
