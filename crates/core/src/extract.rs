//! Literal-marker parameter extraction.
//!
//! Directive parameters are delimited by fixed marker phrases (`deal name`,
//! `account`, ...). Extraction walks the markers in order, locating each as
//! the first occurrence at or after the previous split point; the trimmed
//! segment between consecutive markers (or after the last) is the parameter.
//! Markers are assumed not to appear inside parameter values; that is an
//! accepted limitation of the scheme, not something to work around.

use crate::errors::ParseError;

/// Splits `text` by `markers` into one raw parameter per marker.
///
/// Fails with `MissingMarker` when a marker cannot be found after the
/// previous split point, and `EmptyField` when a located segment trims to
/// nothing. Marker matching is ASCII-case-insensitive; parameter values keep
/// their original casing.
pub fn extract_params(text: &str, markers: &[&str]) -> Result<Vec<String>, ParseError> {
    let mut boundaries = Vec::with_capacity(markers.len());
    let mut cursor = 0usize;

    for marker in markers {
        let start = find_ignore_ascii_case(text, marker, cursor)
            .ok_or_else(|| ParseError::MissingMarker { marker: (*marker).to_owned() })?;
        let value_start = start + marker.len();
        boundaries.push(value_start);
        cursor = value_start;
    }

    let mut params = Vec::with_capacity(markers.len());
    for (index, value_start) in boundaries.iter().copied().enumerate() {
        let value_end = boundaries.get(index + 1).map_or(text.len(), |next| {
            // The next boundary points past its marker; back up to the
            // marker's own start.
            next - markers[index + 1].len()
        });
        let value = text[value_start..value_end].trim();
        if value.is_empty() {
            return Err(ParseError::EmptyField { field: markers[index].to_owned() });
        }
        params.push(value.to_owned());
    }

    Ok(params)
}

/// First occurrence of `needle` in `haystack` at or after byte offset `from`,
/// ignoring ASCII case. Byte-safe: no case folding that changes lengths.
fn find_ignore_ascii_case(haystack: &str, needle: &str, from: usize) -> Option<usize> {
    let haystack = haystack.as_bytes();
    let needle = needle.as_bytes();
    if needle.is_empty() || from > haystack.len() {
        return None;
    }

    haystack[from..]
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|offset| from + offset)
}
