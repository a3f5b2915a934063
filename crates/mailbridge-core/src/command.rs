//! Command-style entry point for sending email.
//!
//! A [`SendEmailCommand`] carries delimited recipient strings, typically
//! deserialized from JSON, and [`SendEmailHandler`] forwards it to an
//! [`EmailSender`] unchanged.

use crate::error::Result;
use crate::mailer::Recipients;
use crate::message::Attachment;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Anything that can send an email.
pub trait EmailSender: Send + Sync {
    /// Sends one message.
    fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: Recipients,
        attachments: Vec<Attachment>,
    ) -> impl Future<Output = Result<()>> + Send;
}

impl<E: EmailSender + ?Sized> EmailSender for Arc<E> {
    fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: Recipients,
        attachments: Vec<Attachment>,
    ) -> impl Future<Output = Result<()>> + Send {
        (**self).send(subject, body, recipients, attachments)
    }
}

/// Request to send an email to delimited recipient lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailCommand {
    /// Subject line, before environment decoration.
    pub subject: String,
    /// HTML body.
    pub body: String,
    /// Primary recipients, separated by `delimiter`.
    pub recipients: String,
    /// Carbon-copy recipients, separated by `delimiter`.
    #[serde(default)]
    pub recipients_cc: String,
    /// Separator used in both recipient strings.
    pub delimiter: String,
}

impl SendEmailCommand {
    /// Creates a command.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        body: impl Into<String>,
        recipients: impl Into<String>,
        recipients_cc: impl Into<String>,
        delimiter: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            recipients: recipients.into(),
            recipients_cc: recipients_cc.into(),
            delimiter: delimiter.into(),
        }
    }
}

/// Dispatches [`SendEmailCommand`]s to an [`EmailSender`].
#[derive(Debug, Clone)]
pub struct SendEmailHandler<E> {
    sender: E,
}

impl<E: EmailSender> SendEmailHandler<E> {
    /// Creates a handler around `sender`.
    pub const fn new(sender: E) -> Self {
        Self { sender }
    }

    /// Sends the command once, as delimited recipients with no attachments.
    ///
    /// # Errors
    ///
    /// Returns whatever the sender returns.
    pub async fn handle(&self, command: SendEmailCommand) -> Result<()> {
        let SendEmailCommand {
            subject,
            body,
            recipients,
            recipients_cc,
            delimiter,
        } = command;

        self.sender
            .send(
                &subject,
                &body,
                Recipients::Delimited {
                    to: recipients,
                    cc: recipients_cc,
                    delimiter,
                },
                Vec::new(),
            )
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::sync::Mutex;

    type Call = (String, String, Recipients, usize);

    #[derive(Default)]
    struct RecordingSender {
        calls: Mutex<Vec<Call>>,
        fail: bool,
    }

    impl EmailSender for RecordingSender {
        async fn send(
            &self,
            subject: &str,
            body: &str,
            recipients: Recipients,
            attachments: Vec<Attachment>,
        ) -> Result<()> {
            self.calls.lock().unwrap().push((
                subject.to_string(),
                body.to_string(),
                recipients,
                attachments.len(),
            ));
            if self.fail {
                Err(Error::Configuration)
            } else {
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn handler_forwards_fields_once() {
        let sender = Arc::new(RecordingSender::default());
        let handler = SendEmailHandler::new(Arc::clone(&sender));

        handler
            .handle(SendEmailCommand::new(
                "subject",
                "body",
                "recipients",
                "recipientsCc",
                "delimiter",
            ))
            .await
            .unwrap();

        let calls = sender.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(
            calls[0],
            (
                "subject".to_string(),
                "body".to_string(),
                Recipients::Delimited {
                    to: "recipients".into(),
                    cc: "recipientsCc".into(),
                    delimiter: "delimiter".into(),
                },
                0,
            )
        );
    }

    #[tokio::test]
    async fn handler_propagates_errors() {
        let handler = SendEmailHandler::new(RecordingSender {
            fail: true,
            ..RecordingSender::default()
        });
        let err = handler
            .handle(SendEmailCommand::new("s", "b", "a@x.com", "", ";"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Configuration));
    }

    #[test]
    fn command_deserializes_from_camel_case_json() {
        let command: SendEmailCommand = serde_json::from_str(
            r#"{
                "subject": "Nightly report",
                "body": "<p>Done</p>",
                "recipients": "ops@bob.com;dev@bob.com",
                "recipientsCc": "",
                "delimiter": ";"
            }"#,
        )
        .unwrap();
        assert_eq!(command.recipients_cc, "");
        assert_eq!(command.delimiter, ";");

        let without_cc: SendEmailCommand = serde_json::from_str(
            r#"{"subject":"s","body":"b","recipients":"a@x.com","delimiter":","}"#,
        )
        .unwrap();
        assert!(without_cc.recipients_cc.is_empty());
    }
}
