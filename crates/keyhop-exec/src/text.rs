//! Conversion of raw command output into display-safe text

/// Decode `bytes` as UTF-8, replacing each maximal invalid sequence with U+FFFD
///
/// Total over arbitrary input: never fails, and the same bytes always give the same text.
#[must_use]
pub fn normalize(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Split normalized output on `\n`
///
/// Empty lines are kept, including trailing ones. The single empty piece after a final
/// line terminator is not a line and is dropped, so `"a\n"` gives `["a"]` and an empty
/// input gives no lines at all.
#[must_use]
pub fn split_lines(text: &str) -> Vec<String> {
    let body = text.strip_suffix('\n').unwrap_or(text);
    if text.is_empty() {
        return Vec::new();
    }
    body.split('\n').map(str::to_string).collect()
}

/// [`normalize`] then [`split_lines`]
#[must_use]
pub fn normalize_lines(bytes: &[u8]) -> Vec<String> {
    split_lines(&normalize(bytes))
}
