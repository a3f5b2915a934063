//! Transport seam between the mailer and the network.
//!
//! A [`Transport`] opens one [`Session`] per send. The mailer drives the
//! session through `authenticate`, `send` and `close`, and always attempts
//! `close` once a session was opened.

mod smtp;

pub use smtp::{SmtpSession, SmtpTransport};

use crate::message::OutboundMessage;
use mailbridge_smtp::Result;

/// Opens sessions to a mail server.
pub trait Transport: Send + Sync {
    /// Session type produced by [`open`](Self::open).
    type Session: Session;

    /// Connects to `host:port`.
    fn open(&self, host: &str, port: u16) -> impl Future<Output = Result<Self::Session>> + Send;
}

/// A single connection to a mail server.
pub trait Session: Send {
    /// Logs in with the given credentials.
    fn authenticate(
        &mut self,
        username: &str,
        password: &str,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Transmits one message.
    fn send(&mut self, message: &OutboundMessage) -> impl Future<Output = Result<()>> + Send;

    /// Ends the session.
    fn close(self) -> impl Future<Output = Result<()>> + Send;
}
