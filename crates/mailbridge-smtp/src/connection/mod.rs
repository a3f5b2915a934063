//! SMTP connection management with type-state pattern.

mod client;
mod stream;

pub use client::{
    Authenticated, Client, Connected, Data, MailTransaction, Ready, RecipientAdded,
    SmtpConnection,
};
pub use stream::{SmtpStream, connect};

use crate::types::{AuthMechanism, Extension};
use std::collections::HashSet;

/// Server capabilities from EHLO response.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    /// Server hostname from greeting.
    pub hostname: String,
    /// Supported extensions.
    pub extensions: HashSet<Extension>,
}

impl ServerInfo {
    /// Returns true if the server advertised an AUTH extension.
    #[must_use]
    pub fn offers_auth(&self) -> bool {
        self.extensions
            .iter()
            .any(|ext| matches!(ext, Extension::Auth(_)))
    }

    /// Returns the maximum message size, if advertised with a value.
    #[must_use]
    pub fn max_message_size(&self) -> Option<usize> {
        self.extensions.iter().find_map(|ext| match ext {
            Extension::Size(size) => *size,
            _ => None,
        })
    }

    /// Returns supported authentication mechanisms.
    #[must_use]
    pub fn auth_mechanisms(&self) -> Vec<AuthMechanism> {
        self.extensions
            .iter()
            .find_map(|ext| match ext {
                Extension::Auth(mechanisms) => Some(mechanisms.clone()),
                _ => None,
            })
            .unwrap_or_default()
    }
}
