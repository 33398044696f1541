//! Byte-to-UTF-8 conversion for feed documents.
//!
//! The encoding comes from the byte order mark when there is one, then from
//! the `encoding` attribute of the XML declaration, and defaults to UTF-8.

use std::borrow::Cow;

use encoding_rs::{Encoding, UTF_8};

use super::decode::DecodeError;

/// How far into the document to look for the XML declaration.
const DECLARATION_SCAN_LIMIT: usize = 1024;

/// Converts a raw document to UTF-8.
///
/// Malformed sequences are replaced rather than rejected, matching the
/// forgiving stance taken everywhere else in decoding.
///
/// # Errors
///
/// Returns `DecodeError::Charset` when the declaration names an encoding
/// that is not known.
pub fn decode_to_utf8(bytes: &[u8]) -> Result<Cow<'_, str>, DecodeError> {
    let declared = match declared_encoding(bytes) {
        Some(label) => Some(
            Encoding::for_label(label.as_bytes())
                .ok_or_else(|| DecodeError::Charset(label.clone()))?,
        ),
        None => None,
    };

    // A declaration readable as ASCII cannot really be UTF-16, whatever it says.
    let encoding = match declared {
        Some(enc) if enc.output_encoding() == UTF_8 => UTF_8,
        Some(enc) => enc,
        None => UTF_8,
    };

    let (text, actual, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(encoding = actual.name(), "Replaced malformed byte sequences");
    }
    Ok(text)
}

/// Extracts the `encoding` label from an XML declaration, if present.
fn declared_encoding(bytes: &[u8]) -> Option<String> {
    let head = &bytes[..bytes.len().min(DECLARATION_SCAN_LIMIT)];
    let head = head.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(head);
    let start = find(head, b"<?xml")?;
    let end = start + find(&head[start..], b"?>")?;
    let decl = &head[start..end];

    let attr = find(decl, b"encoding")?;
    let rest = &decl[attr + b"encoding".len()..];
    let rest = trim_ascii_start(rest).strip_prefix(b"=")?;
    let rest = trim_ascii_start(rest);
    let quote = *rest.first()?;
    if quote != b'"' && quote != b'\'' {
        return None;
    }
    let value = &rest[1..];
    let close = value.iter().position(|&b| b == quote)?;
    let label = std::str::from_utf8(&value[..close]).ok()?.trim();
    (!label.is_empty()).then(|| label.to_owned())
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn trim_ascii_start(bytes: &[u8]) -> &[u8] {
    let skip = bytes.iter().take_while(|b| b.is_ascii_whitespace()).count();
    &bytes[skip..]
}
