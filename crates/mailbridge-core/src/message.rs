//! Outbound message model and builder.

use crate::environment::Environment;
use chrono::{DateTime, Utc};
use mailbridge_mime::{ContentType, MessageWriter, Part, format_date, generate_message_id};
use std::io;
use std::path::Path;
use tracing::debug;

/// A named binary payload attached to a message.
///
/// The content is opaque to the builder; it is base64 encoded on render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    filename: String,
    content_type: ContentType,
    data: Vec<u8>,
}

impl Attachment {
    /// Creates an attachment from in-memory data.
    #[must_use]
    pub fn new(
        filename: impl Into<String>,
        content_type: ContentType,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type,
            data: data.into(),
        }
    }

    /// Reads a file into an attachment named after the file.
    ///
    /// The content type is guessed from the extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no file name or cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("No file name in {}", path.display()),
                )
            })?;
        let content_type = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map_or_else(ContentType::octet_stream, ContentType::from_extension);

        let data = tokio::fs::read(path).await?;
        debug!(%filename, bytes = data.len(), "Loaded attachment");

        Ok(Self::new(filename, content_type, data))
    }

    /// File name shown to the recipient.
    #[must_use]
    pub fn filename(&self) -> &str {
        &self.filename
    }

    /// Declared MIME type.
    #[must_use]
    pub const fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// Raw content.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// A fully built message, ready for a transport.
///
/// Immutable once built. The body is always HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    from: String,
    subject: String,
    body: String,
    to: Vec<String>,
    cc: Vec<String>,
    attachments: Vec<Attachment>,
}

impl OutboundMessage {
    /// Sender address.
    #[must_use]
    pub fn from(&self) -> &str {
        &self.from
    }

    /// Subject, already decorated for the environment.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// HTML body.
    #[must_use]
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Always true; bodies are sent as `text/html`.
    #[must_use]
    pub const fn is_body_html(&self) -> bool {
        true
    }

    /// Primary recipients, in the order supplied.
    #[must_use]
    pub fn to(&self) -> &[String] {
        &self.to
    }

    /// Carbon-copy recipients, in the order supplied.
    #[must_use]
    pub fn cc(&self) -> &[String] {
        &self.cc
    }

    /// Attachments, in the order supplied.
    #[must_use]
    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    /// Every envelope recipient: To first, then Cc.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to.iter().chain(&self.cc).map(String::as_str)
    }

    /// Renders the message as RFC 5322 bytes with a fresh `Date` and
    /// `Message-ID`.
    #[must_use]
    pub fn to_mime(&self) -> Vec<u8> {
        self.writer(&Utc::now(), &generate_message_id(&self.from)).render()
    }

    fn writer(&self, date: &DateTime<Utc>, message_id: &str) -> MessageWriter {
        let mut writer = MessageWriter::new().header("From", &self.from);
        if !self.to.is_empty() {
            writer = writer.header("To", &self.to.join(", "));
        }
        if !self.cc.is_empty() {
            writer = writer.header("Cc", &self.cc.join(", "));
        }

        let mut writer = writer
            .text_header("Subject", &self.subject)
            .header("Date", &format_date(date))
            .header("Message-ID", message_id)
            .part(Part::html(&self.body));

        for attachment in &self.attachments {
            writer = writer.part(Part::attachment(
                &attachment.filename,
                &attachment.content_type,
                &attachment.data,
            ));
        }

        writer
    }
}

/// Assembles a message, decorating the subject for `environment`.
///
/// Recipients and attachments are kept in the order given, without
/// deduplication or validation. No I/O happens here.
#[must_use]
pub fn build_message(
    subject: &str,
    body: &str,
    to: Vec<String>,
    cc: Vec<String>,
    attachments: Vec<Attachment>,
    from: &str,
    environment: Environment,
) -> OutboundMessage {
    let message = OutboundMessage {
        from: from.to_string(),
        subject: environment.decorate_subject(subject),
        body: body.to_string(),
        to,
        cc,
        attachments,
    };

    debug!(
        %environment,
        to = message.to.len(),
        cc = message.cc.len(),
        attachments = message.attachments.len(),
        "Built outbound message"
    );

    message
}
