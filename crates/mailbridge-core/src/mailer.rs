//! The mailer: validate, build, deliver.

use crate::address::parse_addresses;
use crate::command::EmailSender;
use crate::config::{ConfigSource, SmtpSettings};
use crate::error::Result;
use crate::message::{Attachment, OutboundMessage, build_message};
use crate::transport::{Session, SmtpTransport, Transport};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Recipients of a send, either as lists or as delimited strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipients {
    /// Ready-made address lists.
    List {
        /// Primary recipients.
        to: Vec<String>,
        /// Carbon-copy recipients.
        cc: Vec<String>,
    },
    /// Delimited strings, split with [`parse_addresses`] before building.
    Delimited {
        /// Primary recipients.
        to: String,
        /// Carbon-copy recipients.
        cc: String,
        /// Separator between addresses.
        delimiter: String,
    },
}

impl Recipients {
    /// Normalizes into `(to, cc)` address lists.
    #[must_use]
    pub fn into_lists(self) -> (Vec<String>, Vec<String>) {
        match self {
            Self::List { to, cc } => (to, cc),
            Self::Delimited { to, cc, delimiter } => (
                parse_addresses(&to, &delimiter),
                parse_addresses(&cc, &delimiter),
            ),
        }
    }
}

/// Sends HTML email using settings read from a [`ConfigSource`].
///
/// Settings are read on every call, never cached, so configuration changes
/// apply to the next send. Each send opens, uses and closes its own session.
#[derive(Debug)]
pub struct Mailer<C: ?Sized, T = SmtpTransport> {
    config: Arc<C>,
    transport: T,
}

impl<C> Mailer<C, SmtpTransport>
where
    C: ConfigSource + ?Sized,
{
    /// Creates a mailer that delivers over plaintext SMTP.
    #[must_use]
    pub fn smtp(config: Arc<C>) -> Self {
        Self::new(config, SmtpTransport::new())
    }
}

impl<C, T> Mailer<C, T>
where
    C: ConfigSource + ?Sized,
    T: Transport,
{
    /// Creates a mailer over a custom transport.
    #[must_use]
    pub const fn new(config: Arc<C>, transport: T) -> Self {
        Self { config, transport }
    }

    /// Reads the current settings.
    #[must_use]
    pub fn settings(&self) -> SmtpSettings {
        SmtpSettings::load(&*self.config)
    }

    /// Builds a message with the current sender and environment, without
    /// validating or sending it.
    #[must_use]
    pub fn build(
        &self,
        subject: &str,
        body: &str,
        recipients: Recipients,
        attachments: Vec<Attachment>,
    ) -> OutboundMessage {
        let settings = self.settings();
        let (to, cc) = recipients.into_lists();
        build_message(
            subject,
            body,
            to,
            cc,
            attachments,
            &settings.from_address,
            settings.environment,
        )
    }

    /// Validates the settings, builds the message and delivers it.
    ///
    /// The session is closed on every path once opened. If delivery fails,
    /// the delivery error is returned even when closing also fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) before
    /// any I/O when a required setting is blank, or
    /// [`Error::Transport`](crate::Error::Transport) when the transport fails.
    pub async fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: Recipients,
        attachments: Vec<Attachment>,
    ) -> Result<()> {
        let settings = self.settings();
        settings.validate()?;

        let (to, cc) = recipients.into_lists();
        let message = build_message(
            subject,
            body,
            to,
            cc,
            attachments,
            &settings.from_address,
            settings.environment,
        );

        debug!(server = %settings.server, port = settings.port, "Opening mail session");
        let mut session = self.transport.open(&settings.server, settings.port).await?;

        match deliver(&mut session, &settings, &message).await {
            Ok(()) => {
                session.close().await?;
                info!(
                    subject = message.subject(),
                    recipients = message.recipients().count(),
                    "Email sent"
                );
                Ok(())
            }
            Err(e) => {
                if let Err(close_error) = session.close().await {
                    warn!(error = %close_error, "Failed to close mail session after error");
                }
                Err(e.into())
            }
        }
    }
}

async fn deliver<S: Session>(
    session: &mut S,
    settings: &SmtpSettings,
    message: &OutboundMessage,
) -> mailbridge_smtp::Result<()> {
    session
        .authenticate(&settings.username, &settings.password)
        .await?;
    session.send(message).await
}

impl<C, T> EmailSender for Mailer<C, T>
where
    C: ConfigSource + ?Sized,
    T: Transport,
{
    async fn send(
        &self,
        subject: &str,
        body: &str,
        recipients: Recipients,
        attachments: Vec<Attachment>,
    ) -> Result<()> {
        Self::send(self, subject, body, recipients, attachments).await
    }
}
