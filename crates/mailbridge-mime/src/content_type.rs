//! MIME content type handling.

use std::collections::BTreeMap;
use std::fmt;

/// MIME content type with parameters.
///
/// Parameters are kept sorted so rendering is deterministic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg").
    pub sub_type: String,
    /// Parameters (e.g., charset=utf-8, boundary=xxx).
    pub parameters: BTreeMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into().to_lowercase(),
            sub_type: sub_type.into().to_lowercase(),
            parameters: BTreeMap::new(),
        }
    }

    /// Creates a text/plain content type.
    #[must_use]
    pub fn text_plain() -> Self {
        Self::new("text", "plain").with_parameter("charset", "utf-8")
    }

    /// Creates a text/html content type.
    #[must_use]
    pub fn text_html() -> Self {
        Self::new("text", "html").with_parameter("charset", "utf-8")
    }

    /// Creates an application/octet-stream content type.
    #[must_use]
    pub fn octet_stream() -> Self {
        Self::new("application", "octet-stream")
    }

    /// Creates a multipart/mixed content type with boundary.
    #[must_use]
    pub fn multipart_mixed(boundary: impl Into<String>) -> Self {
        Self::new("multipart", "mixed").with_parameter("boundary", boundary)
    }

    /// Guesses a content type from a file extension, falling back to
    /// `application/octet-stream`.
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        match extension.to_lowercase().as_str() {
            "txt" | "log" => Self::text_plain(),
            "htm" | "html" => Self::text_html(),
            "csv" => Self::new("text", "csv"),
            "json" => Self::new("application", "json"),
            "xml" => Self::new("application", "xml"),
            "pdf" => Self::new("application", "pdf"),
            "zip" => Self::new("application", "zip"),
            "png" => Self::new("image", "png"),
            "jpg" | "jpeg" => Self::new("image", "jpeg"),
            "gif" => Self::new("image", "gif"),
            _ => Self::octet_stream(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters
            .insert(key.into().to_lowercase(), value.into());
        self
    }

    /// Returns the `type/subtype` pair without parameters.
    #[must_use]
    pub fn essence(&self) -> String {
        format!("{}/{}", self.main_type, self.sub_type)
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.main_type, self.sub_type)?;

        for (key, value) in &self.parameters {
            // Quote value if it contains tspecials
            if value.contains(|c: char| c.is_whitespace() || "()<>@,;:\\\"/[]?=".contains(c)) {
                write!(f, "; {key}=\"{value}\"")?;
            } else {
                write!(f, "; {key}={value}")?;
            }
        }

        Ok(())
    }
}
