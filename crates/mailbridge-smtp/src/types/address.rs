//! Email address types.

use crate::error::{Error, Result};

/// Email address for SMTP envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address(String);

impl Address {
    /// Creates a new address from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(addr: impl Into<String>) -> Result<Self> {
        let addr = addr.into();
        Self::validate(&addr)?;
        Ok(Self(addr))
    }

    /// Returns the address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Basic envelope validation: one `@`, both sides non-empty, no
    /// whitespace or angle brackets.
    fn validate(addr: &str) -> Result<()> {
        if addr.is_empty() {
            return Err(Error::InvalidAddress("Address cannot be empty".into()));
        }

        if addr.contains(|c: char| c.is_whitespace() || c == '<' || c == '>') {
            return Err(Error::InvalidAddress(format!(
                "Address contains illegal characters: {addr}"
            )));
        }

        let Some((local, domain)) = addr.split_once('@') else {
            return Err(Error::InvalidAddress(format!("Address must contain @: {addr}")));
        };

        if domain.contains('@') {
            return Err(Error::InvalidAddress(format!(
                "Address must have exactly one @: {addr}"
            )));
        }

        if local.is_empty() || domain.is_empty() {
            return Err(Error::InvalidAddress(format!(
                "Local and domain parts cannot be empty: {addr}"
            )));
        }

        Ok(())
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mailbox (optional display name + address).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mailbox {
    /// Display name (optional).
    pub name: Option<String>,
    /// Email address.
    pub address: Address,
}

impl Mailbox {
    /// Creates a new mailbox with just an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid.
    pub fn new(address: impl Into<String>) -> Result<Self> {
        Ok(Self {
            name: None,
            address: Address::new(address)?,
        })
    }

    /// Parses either a bare address or the `Display Name <addr>` form.
    ///
    /// Surrounding whitespace and quotes around the display name are removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the angle brackets are unbalanced or the address
    /// inside them is invalid.
    pub fn parse(input: &str) -> Result<Self> {
        let input = input.trim();

        let Some(open) = input.rfind('<') else {
            return Self::new(input);
        };

        let rest = &input[open + 1..];
        let close = rest
            .find('>')
            .ok_or_else(|| Error::InvalidAddress(format!("Unclosed angle bracket: {input}")))?;

        if !rest[close + 1..].trim().is_empty() {
            return Err(Error::InvalidAddress(format!(
                "Unexpected text after address: {input}"
            )));
        }

        let name = input[..open].trim().trim_matches('"').trim();
        Ok(Self {
            name: (!name.is_empty()).then(|| name.to_string()),
            address: Address::new(rest[..close].trim())?,
        })
    }
}

impl std::fmt::Display for Mailbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "\"{name}\" <{}>", self.address),
            None => write!(f, "{}", self.address),
        }
    }
}
