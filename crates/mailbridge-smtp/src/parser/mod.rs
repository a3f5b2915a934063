//! SMTP response parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from response lines.
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK\r\n`
/// - Multi: `250-First line\r\n250-Second line\r\n250 Last line\r\n`
///
/// Every line of a multi-line reply must carry the same code.
///
/// # Errors
///
/// Returns an error if the reply is malformed.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let first = lines
        .first()
        .ok_or_else(|| Error::Protocol("Empty reply".into()))?;

    let code = parse_code(first)?;
    let mut message = Vec::with_capacity(lines.len());

    for line in lines {
        if parse_code(line)? != code {
            return Err(Error::Protocol(format!(
                "Reply code changed mid-reply: {line}"
            )));
        }

        match line.len() {
            3 => message.push(String::new()),
            // Skip code and separator (e.g., "250-" or "250 ")
            _ => message.push(line.get(4..).unwrap_or_default().to_string()),
        }
    }

    Ok(Reply::new(ReplyCode::new(code), message))
}

fn parse_code(line: &str) -> Result<u16> {
    let code_str = line
        .get(0..3)
        .ok_or_else(|| Error::Protocol(format!("Reply too short: {line}")))?;

    if !code_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Protocol(format!("Invalid reply code: {code_str}")));
    }

    if let Some(sep) = line.as_bytes().get(3)
        && *sep != b' '
        && *sep != b'-'
    {
        return Err(Error::Protocol(format!("Malformed reply line: {line}")));
    }

    code_str
        .parse::<u16>()
        .map_err(|_| Error::Protocol(format!("Invalid reply code: {code_str}")))
}

/// Checks if a line is the last line of a multi-line reply.
///
/// Multi-line replies use `-` separator for continuation and ` ` for the last
/// line. A bare three-digit code is also final.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    match line.as_bytes().get(3) {
        Some(sep) => *sep == b' ',
        None => line.len() == 3,
    }
}
