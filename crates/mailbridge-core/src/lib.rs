//! # mailbridge-core
//!
//! Configuration-driven email sending.
//!
//! This crate provides:
//! - Configuration sources (in-memory, JSON file, environment, layered)
//! - Deployment environments with subject decoration
//! - Delimited recipient parsing
//! - Message building with HTML bodies and attachments
//! - A [`Mailer`] that validates settings and delivers over a [`Transport`]
//! - A command/handler pair for dispatching sends from serialized requests
//!
//! SMTP sessions are plaintext: encryption is never negotiated.
//!
//! ```ignore
//! use mailbridge_core::{Mailer, MemoryConfig, Recipients};
//! use std::sync::Arc;
//!
//! let config = Arc::new(MemoryConfig::from_iter([
//!     ("Smtp:SmtpServer", "mail.example.com"),
//!     ("Smtp:Username", "reports"),
//!     ("Smtp:Password", "secret"),
//!     ("Smtp:EmailFromAddress", "noreply@example.com"),
//!     ("Smtp:Environment", "Production"),
//! ]));
//!
//! Mailer::smtp(config)
//!     .send(
//!         "Nightly report",
//!         "<p>All jobs finished.</p>",
//!         Recipients::Delimited {
//!             to: "ops@example.com;dev@example.com".into(),
//!             cc: String::new(),
//!             delimiter: ";".into(),
//!         },
//!         Vec::new(),
//!     )
//!     .await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
pub mod command;
pub mod config;
mod environment;
mod error;
mod mailer;
mod message;
pub mod transport;

pub use address::parse_addresses;
pub use command::{EmailSender, SendEmailCommand, SendEmailHandler};
pub use config::{ConfigSource, EnvConfig, JsonConfig, LayeredConfig, MemoryConfig, SmtpSettings};
pub use environment::{Environment, UnknownEnvironment};
pub use error::{ConfigError, Error, Result};
pub use mailbridge_mime::ContentType;
pub use mailer::{Mailer, Recipients};
pub use message::{Attachment, OutboundMessage, build_message};
pub use transport::{Session, SmtpSession, SmtpTransport, Transport};
