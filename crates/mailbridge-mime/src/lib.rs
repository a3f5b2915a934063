//! # mailbridge-mime
//!
//! MIME message generation for outbound email.
//!
//! ## Features
//!
//! - **Message generation**: single-part and `multipart/mixed` messages
//! - **Encoding**: Base64 (wrapped at 76 columns) and RFC 2047 header words
//! - **Content types**: rendering with parameters, guessing from extensions
//! - **Headers**: insertion-ordered, folded at whitespace past 78 columns
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailbridge_mime::{ContentType, MessageWriter, Part};
//!
//! let bytes = MessageWriter::new()
//!     .header("From", "noreply@bob.com")
//!     .header("To", "john@bob.com")
//!     .text_header("Subject", "Report")
//!     .part(Part::html("<p>See attached.</p>"))
//!     .part(Part::attachment("report.csv", &ContentType::new("text", "csv"), b"a,b\n1,2\n"))
//!     .render();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod header;
mod message;

pub mod encoding;

pub use content_type::ContentType;
pub use header::{Headers, format_date, generate_message_id};
pub use message::{MessageWriter, Part, generate_boundary};
