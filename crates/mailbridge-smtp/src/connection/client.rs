//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::Command;
use crate::error::{Error, Result};
use crate::parser::{is_last_reply_line, parse_reply};
use crate::types::{Address, AuthMechanism, Extension, Reply, ReplyCode};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::collections::HashSet;
use std::marker::PhantomData;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::debug;

/// Type-state marker for a greeted, unauthenticated session.
#[derive(Debug)]
pub struct Connected;

/// Type-state marker for an authenticated session.
#[derive(Debug)]
pub struct Authenticated;

/// Type-state marker for mail transaction started from session state `S`.
#[derive(Debug)]
pub struct MailTransaction<S>(PhantomData<S>);

/// Type-state marker for at least one accepted recipient.
#[derive(Debug)]
pub struct RecipientAdded<S>(PhantomData<S>);

/// Type-state marker for data mode.
#[derive(Debug)]
pub struct Data<S>(PhantomData<S>);

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Authenticated {}
}

/// Session states from which a mail transaction may start.
pub trait Ready: sealed::Sealed {}
impl Ready for Connected {}
impl Ready for Authenticated {}

/// SMTP client with type-state pattern.
#[derive(Debug)]
pub struct Client<State, S = TcpStream> {
    stream: SmtpStream<S>,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

/// Connection trait for all states.
pub trait SmtpConnection {
    /// Returns the server information.
    fn server_info(&self) -> &ServerInfo;
}

impl<St, S> SmtpConnection for Client<St, S> {
    fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }
}

impl<S> Client<Connected, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a client from a stream and reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if reading the greeting fails or if the server returns an error.
    pub async fn from_stream(mut stream: SmtpStream<S>) -> Result<Self> {
        let greeting = read_reply(&mut stream).await?;
        if greeting.code != ReplyCode::SERVICE_READY {
            return Err(reply_error(&greeting));
        }

        // First word of the greeting is the server's hostname
        let hostname = greeting
            .message
            .first()
            .and_then(|msg| msg.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();
        debug!(%hostname, "SMTP greeting received");

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                extensions: HashSet::new(),
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// Servers that reject EHLO with a 5xx reply are greeted with HELO
    /// instead, leaving the extension set empty.
    ///
    /// # Errors
    ///
    /// Returns an error if both greetings fail.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?;

        if reply.is_success() {
            // First line echoes the server name
            self.server_info.extensions = reply
                .message
                .iter()
                .skip(1)
                .map(|line| Extension::parse(line))
                .collect();
            return Ok(self);
        }

        if !reply.is_permanent_error() {
            return Err(reply_error(&reply));
        }

        debug!(code = %reply.code, "EHLO rejected, falling back to HELO");
        let reply = self
            .send_command(Command::Helo {
                hostname: client_hostname.to_string(),
            })
            .await?;
        ensure_success(&reply)?;
        self.server_info.extensions.clear();
        Ok(self)
    }

    /// Authenticates with whichever supported mechanism the server offers.
    ///
    /// PLAIN is preferred over LOGIN.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if the server advertises no AUTH
    /// extension or only mechanisms this client does not implement, or the
    /// server's rejection.
    pub async fn authenticate(
        self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated, S>> {
        if !self.server_info.offers_auth() {
            return Err(Error::NotSupported("AUTH".into()));
        }
        let mechanisms = self.server_info.auth_mechanisms();
        if mechanisms.contains(&AuthMechanism::Plain) {
            self.auth_plain(username, password).await
        } else if mechanisms.contains(&AuthMechanism::Login) {
            self.auth_login(username, password).await
        } else {
            Err(Error::NotSupported("AUTH PLAIN or AUTH LOGIN".into()))
        }
    }

    /// Authenticates using PLAIN mechanism.
    ///
    /// # Errors
    ///
    /// Returns an error if authentication fails.
    pub async fn auth_plain(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated, S>> {
        // PLAIN response: \0username\0password
        let credentials = format!("\0{username}\0{password}");
        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Plain,
                initial_response: Some(STANDARD.encode(credentials.as_bytes())),
            })
            .await?;
        ensure_success(&reply)?;

        debug!("Authenticated with AUTH PLAIN");
        Ok(self.into_state())
    }

    /// Authenticates using the LOGIN mechanism (username and password sent
    /// in answer to two server challenges).
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not follow the challenge sequence
    /// or rejects the credentials.
    pub async fn auth_login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated, S>> {
        let reply = self
            .send_command(Command::Auth {
                mechanism: AuthMechanism::Login,
                initial_response: None,
            })
            .await?;
        ensure_code(&reply, ReplyCode::AUTH_CONTINUE)?;

        let reply = self
            .send_command(Command::AuthResponse {
                response: STANDARD.encode(username.as_bytes()),
            })
            .await?;
        ensure_code(&reply, ReplyCode::AUTH_CONTINUE)?;

        let reply = self
            .send_command(Command::AuthResponse {
                response: STANDARD.encode(password.as_bytes()),
            })
            .await?;
        ensure_success(&reply)?;

        debug!("Authenticated with AUTH LOGIN");
        Ok(self.into_state())
    }
}

impl<R, S> Client<R, S>
where
    R: Ready,
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Starts a mail transaction.
    ///
    /// `size` is announced only when the server advertised the SIZE
    /// extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the MAIL FROM command fails.
    pub async fn mail_from(
        mut self,
        from: Address,
        size: Option<usize>,
    ) -> Result<Client<MailTransaction<R>, S>> {
        let advertises_size = self
            .server_info
            .extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Size(_)));

        let reply = self
            .send_command(Command::MailFrom {
                from,
                size: size.filter(|_| advertises_size),
            })
            .await?;
        ensure_success(&reply)?;

        Ok(self.into_state())
    }
}

impl<R, S> Client<MailTransaction<R>, S>
where
    R: Ready,
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds the first recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Client<RecipientAdded<R>, S>> {
        let reply = self.send_command(Command::RcptTo { to }).await?;
        ensure_success(&reply)?;

        Ok(self.into_state())
    }
}

impl<R, S> Client<RecipientAdded<R>, S>
where
    R: Ready,
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Adds another recipient to the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the RCPT TO command fails.
    pub async fn rcpt_to(mut self, to: Address) -> Result<Self> {
        let reply = self.send_command(Command::RcptTo { to }).await?;
        ensure_success(&reply)?;

        Ok(self)
    }

    /// Begins sending message data.
    ///
    /// # Errors
    ///
    /// Returns an error if the server does not answer DATA with 354.
    pub async fn data(mut self) -> Result<Client<Data<R>, S>> {
        let reply = self.send_command(Command::Data).await?;
        ensure_code(&reply, ReplyCode::START_DATA)?;

        Ok(self.into_state())
    }
}

impl<R, S> Client<Data<R>, S>
where
    R: Ready,
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Sends the message content and completes the transaction.
    ///
    /// Line endings are normalized to CRLF, lines starting with `.` are
    /// dot-stuffed, and the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if sending the message fails or server rejects it.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<R, S>> {
        self.stream.write_all(&encode_data(message)).await?;

        let reply = read_reply(&mut self.stream).await?;
        ensure_success(&reply)?;
        debug!(bytes = message.len(), "Message accepted");

        Ok(self.into_state())
    }
}

// Common implementation for all states
impl<St, S> Client<St, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    async fn send_command(&mut self, cmd: Command) -> Result<Reply> {
        debug!(command = cmd.verb(), "SMTP >");
        self.stream.write_all(&cmd.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        debug!(code = %reply.code, "SMTP <");
        Ok(reply)
    }

    fn into_state<T>(self) -> Client<T, S> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }

    /// Sends QUIT and closes the connection (available in any state).
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT command fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;

        if !reply.is_success() && reply.code != ReplyCode::CLOSING {
            return Err(reply_error(&reply));
        }

        Ok(())
    }
}

async fn read_reply<S>(stream: &mut SmtpStream<S>) -> Result<Reply>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }

        let is_last = is_last_reply_line(&line);
        lines.push(line);

        if is_last {
            break;
        }
    }

    parse_reply(&lines)
}

fn reply_error(reply: &Reply) -> Error {
    Error::smtp_error(reply.code.as_u16(), reply.message_text())
}

fn ensure_success(reply: &Reply) -> Result<()> {
    if reply.is_success() {
        Ok(())
    } else {
        Err(reply_error(reply))
    }
}

fn ensure_code(reply: &Reply, expected: ReplyCode) -> Result<()> {
    if reply.code == expected {
        Ok(())
    } else {
        Err(reply_error(reply))
    }
}

/// Normalizes line endings, dot-stuffs, and appends the end-of-data marker.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(message.len() + 16);
    let body = message.strip_suffix(b"\n").unwrap_or(message);

    if !body.is_empty() {
        for line in body.split(|&b| b == b'\n') {
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if line.first() == Some(&b'.') {
                out.push(b'.');
            }
            out.extend_from_slice(line);
            out.extend_from_slice(b"\r\n");
        }
    }

    out.extend_from_slice(b".\r\n");
    out
}
