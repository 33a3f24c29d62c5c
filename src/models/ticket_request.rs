//! The aggregate ticket-create request.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Attachment, DynamicField, NewArticle, NewTicket, TicketDefaults};
use crate::error::ConnectorError;
use crate::files::{FileReader, FsFileReader, MimeGuessLookup, MimeLookup};

/// Body of a `TicketCreate` call.
///
/// `DynamicField` and `Attachment` stay absent from the serialized JSON until
/// the first entry is added; they are never sent as empty lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TicketCreateRequest {
    /// The ticket to create.
    pub ticket: NewTicket,

    /// Its first article.
    pub article: NewArticle,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    dynamic_field: Option<Vec<DynamicField>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    attachment: Option<Vec<Attachment>>,
}

impl TicketCreateRequest {
    /// Creates a request with a defaulted ticket and article.
    pub fn new(defaults: &TicketDefaults) -> Self {
        Self {
            ticket: NewTicket::new(defaults),
            article: NewArticle::default(),
            dynamic_field: None,
            attachment: None,
        }
    }

    /// Appends a dynamic field.
    ///
    /// Names are not deduplicated; repeated names are sent in insertion order.
    pub fn add_dynamic_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.dynamic_field
            .get_or_insert_with(Vec::new)
            .push(DynamicField {
                name: name.into(),
                value: value.into(),
            });
    }

    /// Reads a file from disk and appends it as an attachment.
    ///
    /// # Errors
    ///
    /// Returns `ConnectorError::FileNotReadable` if the file cannot be read.
    /// Nothing is appended in that case.
    pub fn add_attachment(&mut self, path: impl AsRef<Path>) -> Result<(), ConnectorError> {
        self.add_attachment_with(path, &FsFileReader, &MimeGuessLookup)
    }

    /// Like [`add_attachment`](Self::add_attachment), with explicit
    /// collaborators for reading the file and resolving its content type.
    pub fn add_attachment_with(
        &mut self,
        path: impl AsRef<Path>,
        reader: &dyn FileReader,
        mime: &dyn MimeLookup,
    ) -> Result<(), ConnectorError> {
        let attachment = Attachment::from_file(path.as_ref(), reader, mime)?;
        self.attachment.get_or_insert_with(Vec::new).push(attachment);
        Ok(())
    }

    /// Dynamic fields added so far, or `None` if none were added.
    pub fn dynamic_fields(&self) -> Option<&[DynamicField]> {
        self.dynamic_field.as_deref()
    }

    /// Attachments added so far, or `None` if none were added.
    pub fn attachments(&self) -> Option<&[Attachment]> {
        self.attachment.as_deref()
    }

    /// Fills an empty title from the subject, then an empty subject from the
    /// title.
    ///
    /// When both are empty, both stay empty.
    pub fn apply_title_subject_fallback(&mut self) {
        if self.ticket.title.is_empty() {
            self.ticket.title = self.article.subject.clone();
        }
        if self.article.subject.is_empty() {
            self.article.subject = self.ticket.title.clone();
        }
    }
}

impl Default for TicketCreateRequest {
    fn default() -> Self {
        Self::new(&TicketDefaults::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn request() -> TicketCreateRequest {
        TicketCreateRequest::new(&TicketDefaults::new("oc", "Online Classroom"))
    }

    #[test]
    fn test_optional_collections_absent_until_added() {
        let request = request();
        let json = serde_json::to_value(&request).unwrap();

        assert!(json.get("Ticket").is_some());
        assert!(json.get("Article").is_some());
        assert!(json.get("DynamicField").is_none());
        assert!(json.get("Attachment").is_none());
        assert!(request.dynamic_fields().is_none());
        assert!(request.attachments().is_none());
    }

    #[test]
    fn test_dynamic_fields_keep_duplicates_in_order() {
        let mut request = request();
        request.add_dynamic_field("Room", "B12");
        request.add_dynamic_field("Course", "CS101");
        request.add_dynamic_field("Room", "B14");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["DynamicField"],
            json!([
                {"Name": "Room", "Value": "B12"},
                {"Name": "Course", "Value": "CS101"},
                {"Name": "Room", "Value": "B14"},
            ])
        );
    }

    #[test]
    fn test_failed_attachment_does_not_create_collection() {
        let mut request = request();
        let err = request
            .add_attachment("/definitely/not/here/invoice.pdf")
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::FileNotReadable);
        assert!(request.attachments().is_none());
    }

    #[test]
    fn test_explicit_assignment_overrides_defaults() {
        let mut request = request();
        request.ticket.queue = "Hardware".to_string();
        request.ticket.priority_id = 5;

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["Ticket"]["Queue"], "Hardware");
        assert_eq!(json["Ticket"]["PriorityID"], 5);
        assert_eq!(json["Ticket"]["CustomerUser"], "oc");
        assert_eq!(json["Ticket"]["State"], "new");
    }

    #[test]
    fn test_fallback_title_from_subject() {
        let mut request = request();
        request.article.subject = "Printer broken".to_string();
        request.apply_title_subject_fallback();
        assert_eq!(request.ticket.title, "Printer broken");
        assert_eq!(request.article.subject, "Printer broken");
    }

    #[test]
    fn test_fallback_subject_from_title() {
        let mut request = request();
        request.ticket.title = "Printer broken".to_string();
        request.apply_title_subject_fallback();
        assert_eq!(request.article.subject, "Printer broken");
    }

    #[test]
    fn test_fallback_both_empty_stay_empty() {
        let mut request = request();
        request.apply_title_subject_fallback();
        assert_eq!(request.ticket.title, "");
        assert_eq!(request.article.subject, "");
    }

    #[test]
    fn test_fallback_keeps_distinct_values() {
        let mut request = request();
        request.ticket.title = "Printer".to_string();
        request.article.subject = "Toner".to_string();
        request.apply_title_subject_fallback();
        assert_eq!(request.ticket.title, "Printer");
        assert_eq!(request.article.subject, "Toner");
    }
}
