//! Text helpers shared by comparators and test data import.

/// Normalize program output for comparison.
///
/// CRLF and lone CR become LF, then trailing newlines are stripped. Leading and
/// internal whitespace, including trailing spaces on the last line, is kept.
pub fn normalize_output(s: &str) -> String {
    let lf = s.replace("\r\n", "\n").replace('\r', "\n");
    lf.trim_end_matches('\n').to_string()
}

/// Decode literal escape sequences found in stored test data.
///
/// `\r\n` is handled as a unit before the single `\n`, `\r` and `\t` escapes.
pub fn unescape(s: &str) -> String {
    s.replace("\\r\\n", "\n")
        .replace("\\n", "\n")
        .replace("\\r", "\r")
        .replace("\\t", "\t")
}
