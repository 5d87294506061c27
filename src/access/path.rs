use thiserror::Error;
use url::Url;

/// Throwaway origin used only to run request paths through the URL parser
const PARSE_BASE: &str = "http://gatekeeper.invalid";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("request path '{0}' cannot be parsed")]
    Unparseable(String),

    #[error("request path '{0}' percent-encodes a character that must appear literally")]
    EncodedLiteral(String),
}

/// Canonical form of a request path, the one both the route table and the
/// application server see.
///
/// Dot segments are resolved (`..`, `.`, and their `%2e` spellings in either
/// case) exactly as the URL parser in the upstream client resolves them, and
/// runs of `/` collapse to one. Paths that percent-encode `/`, `\` or an
/// unreserved character are refused: the application may decode them into a
/// path the route table never saw.
pub fn canonical_path(raw: &str) -> Result<String, PathError> {
    if !raw.starts_with('/') {
        return Err(PathError::Unparseable(raw.to_string()));
    }

    let url = Url::parse(&format!("{}{}", PARSE_BASE, raw))
        .map_err(|_| PathError::Unparseable(raw.to_string()))?;

    let mut canonical = String::with_capacity(url.path().len());
    for segment in url.path().split('/').filter(|segment| !segment.is_empty()) {
        canonical.push('/');
        canonical.push_str(segment);
    }
    if canonical.is_empty() || url.path().ends_with('/') {
        canonical.push('/');
    }

    if has_encoded_literal(&canonical) {
        return Err(PathError::EncodedLiteral(raw.to_string()));
    }

    Ok(canonical)
}

fn has_encoded_literal(path: &str) -> bool {
    path.as_bytes().windows(3).any(|window| {
        window[0] == b'%'
            && std::str::from_utf8(&window[1..])
                .ok()
                .and_then(|hex| u8::from_str_radix(hex, 16).ok())
                .is_some_and(|decoded| {
                    decoded.is_ascii_alphanumeric()
                        || matches!(decoded, b'-' | b'.' | b'_' | b'~' | b'/' | b'\\')
                })
    })
}
