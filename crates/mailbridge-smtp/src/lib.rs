//! # mailbridge-smtp
//!
//! Async SMTP client used by `mailbridge` to hand finished messages to a
//! relay.
//!
//! The client speaks plain SMTP (RFC 5321) over an unencrypted connection.
//! There is no TLS or STARTTLS support: the relays this crate is written for
//! accept credentials on the clear channel. Callers that need transport
//! encryption must provide an already-encrypted stream through
//! [`SmtpStream::new`].
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailbridge_smtp::{Address, Client};
//! use mailbridge_smtp::connection::connect;
//!
//! let stream = connect("smtp.example.com", 25, None).await?;
//! let client = Client::from_stream(stream).await?;
//! let client = client.ehlo("localhost").await?;
//! let client = client.authenticate("user", "secret").await?;
//!
//! let client = client.mail_from(Address::new("sender@example.com")?).await?;
//! let client = client.rcpt_to(Address::new("rcpt@example.com")?).await?;
//! let client = client.data().await?;
//! let client = client.send_message(b"Subject: Hi\r\n\r\nHello\r\n").await?;
//! client.quit().await?;
//! ```
//!
//! ## Connection States
//!
//! ```text
//! Connected ── authenticate() ──→ Authenticated
//!     │                                │
//!     └──────────── mail_from() ───────┘
//!                       │
//!                       ▼
//!   MailTransaction<S> → RecipientAdded<S> → Data<S> ── send_message() ──→ S
//! ```
//!
//! A finished transaction returns the client to the state it started from, so
//! an authenticated session stays authenticated.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod command;
pub mod connection;
mod error;
pub mod parser;
pub mod types;

pub use connection::{
    Authenticated, Client, Connected, Data, MailTransaction, Ready, RecipientAdded, ServerInfo,
    SmtpConnection, SmtpStream,
};
pub use error::{Error, Result};
pub use types::{Address, AuthMechanism, Extension, Mailbox, Reply, ReplyCode};

/// Default SMTP port used when configuration does not provide one.
pub const DEFAULT_PORT: u16 = 25;
