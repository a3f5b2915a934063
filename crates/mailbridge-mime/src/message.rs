//! MIME message rendering.

use crate::content_type::ContentType;
use crate::encoding::{encode_base64_lines, encode_rfc2047, needs_encoding};
use crate::header::Headers;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// One body part, already transfer-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    /// Part headers.
    pub headers: Headers,
    /// Encoded body, CRLF line endings.
    pub body: String,
}

impl Part {
    /// Creates an HTML part (`text/html; charset=utf-8`, base64).
    #[must_use]
    pub fn html(html: &str) -> Self {
        let mut headers = Headers::new();
        headers.add("Content-Type", ContentType::text_html().to_string());
        headers.add("Content-Transfer-Encoding", "base64");
        Self {
            headers,
            body: encode_base64_lines(html.as_bytes()),
        }
    }

    /// Creates an attachment part.
    ///
    /// The filename is carried on both `Content-Type; name=` and
    /// `Content-Disposition; filename=` for older clients.
    #[must_use]
    pub fn attachment(filename: &str, content_type: &ContentType, data: &[u8]) -> Self {
        let filename = if needs_encoding(filename) {
            encode_rfc2047(filename, "utf-8")
        } else {
            filename.replace(['"', '\\'], "_")
        };

        let mut headers = Headers::new();
        headers.add(
            "Content-Type",
            format!("{content_type}; name=\"{filename}\""),
        );
        headers.add("Content-Transfer-Encoding", "base64");
        headers.add(
            "Content-Disposition",
            format!("attachment; filename=\"{filename}\""),
        );
        Self {
            headers,
            body: encode_base64_lines(data),
        }
    }
}

/// Assembles top-level headers and parts into RFC 5322 bytes.
#[derive(Debug, Clone, Default)]
pub struct MessageWriter {
    headers: Headers,
    parts: Vec<Part>,
    boundary: Option<String>,
}

impl MessageWriter {
    /// Creates an empty writer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a structured top-level header such as `From` or `To`.
    ///
    /// Control characters are replaced with spaces so a value can never
    /// start a new header line.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        let value: String = value
            .chars()
            .map(|c| if c.is_ascii_control() { ' ' } else { c })
            .collect();
        self.headers.add(name, value);
        self
    }

    /// Appends an unstructured header such as `Subject`, RFC 2047 encoded
    /// when it is not plain ASCII.
    #[must_use]
    pub fn text_header(mut self, name: &str, value: &str) -> Self {
        self.headers.add(name, encode_rfc2047(value, "utf-8"));
        self
    }

    /// Appends a body part.
    #[must_use]
    pub fn part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Fixes the multipart boundary instead of generating one.
    #[must_use]
    pub fn boundary(mut self, boundary: impl Into<String>) -> Self {
        self.boundary = Some(boundary.into());
        self
    }

    /// Renders the message.
    ///
    /// A single part is inlined into the top-level entity. Several parts
    /// become `multipart/mixed` in the order they were added.
    #[must_use]
    pub fn render(&self) -> Vec<u8> {
        let mut headers = self.headers.clone();
        headers.add("MIME-Version", "1.0");

        let mut out = String::new();
        match self.parts.as_slice() {
            [] => {
                out.push_str(&headers.to_string());
                out.push_str("\r\n");
            }
            [single] => {
                for (name, value) in single.headers.iter() {
                    headers.add(name, value);
                }
                out.push_str(&headers.to_string());
                out.push_str("\r\n");
                out.push_str(&single.body);
            }
            parts => {
                let boundary = self.boundary.clone().unwrap_or_else(generate_boundary);
                headers.add(
                    "Content-Type",
                    ContentType::multipart_mixed(&boundary).to_string(),
                );
                out.push_str(&headers.to_string());
                out.push_str("\r\n");

                for part in parts {
                    out.push_str("--");
                    out.push_str(&boundary);
                    out.push_str("\r\n");
                    out.push_str(&part.headers.to_string());
                    out.push_str("\r\n");
                    out.push_str(&part.body);
                }
                out.push_str("--");
                out.push_str(&boundary);
                out.push_str("--\r\n");
            }
        }

        out.into_bytes()
    }
}

/// Generates a multipart boundary.
///
/// The `=_` prefix cannot occur in base64 output, so the boundary never
/// collides with encoded part content.
#[must_use]
pub fn generate_boundary() -> String {
    let unique: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(28)
        .map(char::from)
        .collect();
    format!("=_mb_{unique}")
}
