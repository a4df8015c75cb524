use common::TestCase;

/// Expected outputs shorter than this are too common to be evidence.
pub const MIN_SUSPICIOUS_LEN: usize = 5;

/// Flag source code that embeds any expected output verbatim.
///
/// Whitespace is ignored on both sides. This is a cheap heuristic, not a parser.
pub fn is_suspicious(source_code: &str, test_cases: &[TestCase]) -> bool {
    if source_code.is_empty() || test_cases.is_empty() {
        return false;
    }
    let code = strip_whitespace(source_code);
    test_cases.iter().any(|tc| {
        let expected = strip_whitespace(&tc.expected_output);
        expected.chars().count() >= MIN_SUSPICIOUS_LEN && code.contains(&expected)
    })
}

fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}
