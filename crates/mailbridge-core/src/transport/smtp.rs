//! SMTP-backed transport.
//!
//! Connections are plain TCP. Encryption is never negotiated, so
//! credentials and content cross the network in clear text.

use super::{Session, Transport};
use crate::message::OutboundMessage;
use mailbridge_smtp::connection::connect;
use mailbridge_smtp::{
    Address, Authenticated, Client, Connected, Error, Mailbox, Ready, Result, SmtpConnection,
    SmtpStream,
};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Opens plaintext SMTP sessions.
#[derive(Debug, Clone)]
pub struct SmtpTransport {
    timeout: Option<Duration>,
    client_hostname: String,
}

impl Default for SmtpTransport {
    fn default() -> Self {
        Self {
            timeout: None,
            client_hostname: "localhost".to_string(),
        }
    }
}

impl SmtpTransport {
    /// Creates a transport with no timeout that greets as `localhost`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bounds connecting and every command round-trip by `timeout`.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the name announced in EHLO/HELO.
    #[must_use]
    pub fn with_client_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.client_hostname = hostname.into();
        self
    }
}

impl Transport for SmtpTransport {
    type Session = SmtpSession<TcpStream>;

    async fn open(&self, host: &str, port: u16) -> Result<Self::Session> {
        let stream = connect(host, port, self.timeout).await?;
        SmtpSession::from_stream(stream, &self.client_hostname).await
    }
}

#[derive(Debug)]
enum Stage<S> {
    Connected(Client<Connected, S>),
    Authenticated(Client<Authenticated, S>),
}

/// An open SMTP conversation.
///
/// A failed command consumes the underlying client, after which the
/// connection is dropped and [`close`](Session::close) has nothing to do.
#[derive(Debug)]
pub struct SmtpSession<S = TcpStream> {
    stage: Option<Stage<S>>,
}

impl<S> SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    /// Reads the greeting and introduces the client with EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not greet with 220 or rejects
    /// both EHLO and HELO.
    pub async fn from_stream(stream: SmtpStream<S>, client_hostname: &str) -> Result<Self> {
        let client = Client::from_stream(stream)
            .await?
            .ehlo(client_hostname)
            .await?;
        debug!(server = %client.server_info().hostname, "SMTP session ready");

        Ok(Self {
            stage: Some(Stage::Connected(client)),
        })
    }

    fn max_message_size(&self) -> Option<usize> {
        match self.stage.as_ref()? {
            Stage::Connected(client) => client.server_info().max_message_size(),
            Stage::Authenticated(client) => client.server_info().max_message_size(),
        }
    }
}

impl<S> Session for SmtpSession<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn authenticate(&mut self, username: &str, password: &str) -> Result<()> {
        match self.stage.take() {
            Some(Stage::Connected(client)) if !client.server_info().offers_auth() => {
                debug!("Server advertises no AUTH, continuing unauthenticated");
                self.stage = Some(Stage::Connected(client));
                Ok(())
            }
            Some(Stage::Connected(client)) => {
                let client = client.authenticate(username, password).await?;
                debug!(%username, "SMTP authentication succeeded");
                self.stage = Some(Stage::Authenticated(client));
                Ok(())
            }
            Some(authenticated @ Stage::Authenticated(_)) => {
                self.stage = Some(authenticated);
                Err(Error::Protocol("Session is already authenticated".into()))
            }
            None => Err(Error::ConnectionClosed),
        }
    }

    async fn send(&mut self, message: &OutboundMessage) -> Result<()> {
        let from = Mailbox::parse(message.from())?.address;
        let recipients = message
            .recipients()
            .map(|recipient| Mailbox::parse(recipient).map(|mailbox| mailbox.address))
            .collect::<Result<Vec<_>>>()?;
        if recipients.is_empty() {
            return Err(Error::InvalidAddress("No recipients specified".into()));
        }

        let data = message.to_mime();
        if let Some(limit) = self.max_message_size()
            && data.len() > limit
        {
            return Err(Error::MessageTooLarge(data.len()));
        }

        let count = recipients.len();
        self.stage = match self.stage.take() {
            Some(Stage::Connected(client)) => Some(Stage::Connected(
                transact(client, from, recipients, &data).await?,
            )),
            Some(Stage::Authenticated(client)) => Some(Stage::Authenticated(
                transact(client, from, recipients, &data).await?,
            )),
            None => return Err(Error::ConnectionClosed),
        };

        debug!(recipients = count, bytes = data.len(), "Message accepted for delivery");
        Ok(())
    }

    async fn close(self) -> Result<()> {
        match self.stage {
            Some(Stage::Connected(client)) => client.quit().await,
            Some(Stage::Authenticated(client)) => client.quit().await,
            None => {
                debug!("SMTP connection already dropped");
                Ok(())
            }
        }
    }
}

/// Runs one MAIL FROM / RCPT TO / DATA transaction.
async fn transact<R, S>(
    client: Client<R, S>,
    from: Address,
    recipients: Vec<Address>,
    data: &[u8],
) -> Result<Client<R, S>>
where
    R: Ready,
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut recipients = recipients.into_iter();
    let first = recipients
        .next()
        .ok_or_else(|| Error::InvalidAddress("No recipients specified".into()))?;

    let mut client = client
        .mail_from(from, Some(data.len()))
        .await?
        .rcpt_to(first)
        .await?;
    for recipient in recipients {
        client = client.rcpt_to(recipient).await?;
    }

    client.data().await?.send_message(data).await
}
