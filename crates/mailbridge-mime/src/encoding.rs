//! MIME encoding utilities.
//!
//! Supports Base64 bodies and RFC 2047 header encoding.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Maximum encoded line length for Base64 bodies (RFC 2045).
pub const MAX_LINE_LENGTH: usize = 76;

/// Encodes data as Base64 on a single line.
#[must_use]
pub fn encode_base64(data: &[u8]) -> String {
    STANDARD.encode(data)
}

/// Encodes data as Base64, broken into CRLF-terminated lines of at most
/// [`MAX_LINE_LENGTH`] characters.
#[must_use]
pub fn encode_base64_lines(data: &[u8]) -> String {
    let encoded = STANDARD.encode(data);
    let mut out = String::with_capacity(encoded.len() + encoded.len() / MAX_LINE_LENGTH * 2 + 2);

    // Base64 output is pure ASCII, so byte chunks are valid str boundaries
    for chunk in encoded.as_bytes().chunks(MAX_LINE_LENGTH) {
        out.push_str(std::str::from_utf8(chunk).unwrap_or_default());
        out.push_str("\r\n");
    }

    out
}

/// Longest encoded word allowed by RFC 2047.
pub const MAX_ENCODED_WORD: usize = 75;

/// Longest plain word that still fits on a folded 78-column header line.
const MAX_PLAIN_WORD: usize = 77;

/// Returns true if a header value must be encoded before transmission.
///
/// That is the case for non-ASCII text, control characters, and words too
/// long to ever be folded onto a legal line.
#[must_use]
pub fn needs_encoding(text: &str) -> bool {
    text.chars().any(|c| !c.is_ascii() || c.is_ascii_control())
        || text.split(' ').any(|word| word.len() > MAX_PLAIN_WORD)
}

/// Encodes a header value using RFC 2047 encoding.
///
/// Output is a run of `=?charset?B?encoded-text?=` words, each at most
/// [`MAX_ENCODED_WORD`] characters and separated by single spaces so the
/// header can be folded between them. Words never split a UTF-8 sequence.
/// Text that does not need encoding is returned as is.
#[must_use]
pub fn encode_rfc2047(text: &str, charset: &str) -> String {
    if !needs_encoding(text) {
        return text.to_string();
    }

    // "=?" + "?B?" + "?=" around the charset
    let overhead = charset.len() + 7;
    let chunk_bytes = (MAX_ENCODED_WORD.saturating_sub(overhead) / 4).max(1) * 3;

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in text.chars() {
        if !chunk.is_empty() && chunk.len() + c.len_utf8() > chunk_bytes {
            words.push(encoded_word(&chunk, charset));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk, charset));
    }

    words.join(" ")
}

fn encoded_word(chunk: &str, charset: &str) -> String {
    format!("=?{charset}?B?{}?=", encode_base64(chunk.as_bytes()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_base64_encode() {
        assert_eq!(encode_base64(b"Hello its my sample file"), "SGVsbG8gaXRzIG15IHNhbXBsZSBmaWxl");
    }

    #[test]
    fn test_base64_lines_wrap() {
        let data = vec![0u8; 100];
        let encoded = encode_base64_lines(&data);
        let lines: Vec<&str> = encoded.split("\r\n").collect();
        // 100 bytes -> 136 chars -> 76 + 60, then the trailing empty split
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].len(), 76);
        assert_eq!(lines[1].len(), 60);
        assert!(lines[2].is_empty());
    }

    #[test]
    fn test_base64_lines_empty_input() {
        assert_eq!(encode_base64_lines(b""), "");
    }

    #[test]
    fn test_rfc2047_encode() {
        assert_eq!(encode_rfc2047("Email Test on LocalDev", "utf-8"), "Email Test on LocalDev");

        let encoded = encode_rfc2047("Café report", "utf-8");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert!(encoded.ends_with("?="));
    }

    #[test]
    fn test_rfc2047_encodes_control_characters() {
        assert!(needs_encoding("line\r\nInjected: header"));
        assert!(!needs_encoding("plain subject"));
    }

    fn decode_rfc2047(encoded: &str) -> String {
        let mut bytes = Vec::new();
        for word in encoded.split(' ') {
            let payload = word
                .strip_prefix("=?utf-8?B?")
                .and_then(|rest| rest.strip_suffix("?="))
                .unwrap();
            bytes.extend(STANDARD.decode(payload).unwrap());
        }
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_rfc2047_splits_long_text_into_words() {
        let subject = "é".repeat(400);
        let encoded = encode_rfc2047(&subject, "utf-8");

        assert!(encoded.split(' ').count() > 1);
        for word in encoded.split(' ') {
            assert!(word.len() <= MAX_ENCODED_WORD, "word too long: {word}");
        }
        assert_eq!(decode_rfc2047(&encoded), subject);
    }

    #[test]
    fn test_rfc2047_encodes_unbreakable_ascii_runs() {
        let subject = "a".repeat(1200);
        let encoded = encode_rfc2047(&subject, "utf-8");
        assert!(encoded.starts_with("=?utf-8?B?"));
        assert_eq!(decode_rfc2047(&encoded), subject);

        let sentence = "word ".repeat(300);
        assert_eq!(encode_rfc2047(&sentence, "utf-8"), sentence);
    }

    proptest! {
        #[test]
        fn rfc2047_words_stay_short(text in "\\PC{1,300}") {
            let encoded = encode_rfc2047(&text, "utf-8");
            if needs_encoding(&text) {
                for word in encoded.split(' ') {
                    prop_assert!(word.len() <= MAX_ENCODED_WORD);
                }
                prop_assert_eq!(decode_rfc2047(&encoded), text);
            } else {
                prop_assert_eq!(encoded, text);
            }
        }

        #[test]
        fn base64_lines_round_trip(data in proptest::collection::vec(any::<u8>(), 0..600)) {
            let encoded = encode_base64_lines(&data);
            for line in encoded.split("\r\n") {
                prop_assert!(line.len() <= MAX_LINE_LENGTH);
            }
            let joined: String = encoded.split("\r\n").collect();
            prop_assert_eq!(STANDARD.decode(joined).unwrap(), data);
        }
    }
}
