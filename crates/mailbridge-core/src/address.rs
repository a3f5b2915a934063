//! Delimited recipient list parsing.

/// Splits a delimited recipient string into trimmed, non-empty addresses.
///
/// Order is preserved and duplicates are kept. Addresses are not validated
/// here; the transport rejects malformed ones. An empty `delimiter` does not
/// split, so the whole trimmed input is the only candidate.
///
/// ```
/// use mailbridge_core::parse_addresses;
///
/// assert_eq!(
///     parse_addresses("bob@bob.com;john@bob.com; ", ";"),
///     vec!["bob@bob.com", "john@bob.com"],
/// );
/// ```
#[must_use]
pub fn parse_addresses(raw: &str, delimiter: &str) -> Vec<String> {
    let keep = |segment: &str| {
        let segment = segment.trim();
        (!segment.is_empty()).then(|| segment.to_string())
    };

    if delimiter.is_empty() {
        return keep(raw).into_iter().collect();
    }

    raw.split(delimiter).filter_map(keep).collect()
}
