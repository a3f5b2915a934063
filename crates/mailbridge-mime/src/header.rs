//! MIME header handling.

use chrono::{DateTime, TimeZone};
use rand::Rng;
use rand::distributions::Alphanumeric;
use std::fmt;

/// Soft limit for a header line before it is folded.
const FOLD_WIDTH: usize = 78;

/// Ordered collection of email headers.
///
/// Unlike a map, insertion order is preserved on output, which keeps
/// `From`/`To`/`Subject` at the top of the rendered message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, String)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Gets the first value for a header (case-insensitive).
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Returns an iterator over all headers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl fmt::Display for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, value) in &self.entries {
            write_folded(f, name, value)?;
        }
        Ok(())
    }
}

/// Writes `Name: value\r\n`, folding before a space once the line would
/// pass [`FOLD_WIDTH`]. A single word longer than that stays whole.
fn write_folded(f: &mut fmt::Formatter<'_>, name: &str, value: &str) -> fmt::Result {
    write!(f, "{name}:")?;
    let mut width = name.len() + 1;

    for (i, word) in value.split(' ').enumerate() {
        if i > 0 && width + 1 + word.len() > FOLD_WIDTH {
            f.write_str("\r\n ")?;
            width = 1;
        } else {
            f.write_str(" ")?;
            width += 1;
        }
        f.write_str(word)?;
        width += word.len();
    }

    f.write_str("\r\n")
}

/// Formats a timestamp for the `Date` header (RFC 2822).
#[must_use]
pub fn format_date<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.to_rfc2822()
}

/// Generates a `Message-ID` value using the right-hand side of `from`.
#[must_use]
pub fn generate_message_id(from: &str) -> String {
    let domain = from
        .rsplit_once('@')
        .map(|(_, d)| d.trim_end_matches('>').trim())
        .filter(|d| !d.is_empty())
        .unwrap_or("localhost");

    let unique: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect();

    format!("<{unique}@{domain}>")
}
