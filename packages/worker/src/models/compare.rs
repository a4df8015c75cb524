//! Output equivalence policies.

use common::ComparatorMode;
use common::text::normalize_output;

/// Separator between acceptable answers in `Alternatives` mode.
pub const ALTERNATIVE_SEPARATOR: &str = "||";

/// `(expected, actual) -> accepted`
pub type Comparator = fn(&str, &str) -> bool;

pub fn comparator_for(mode: ComparatorMode) -> Comparator {
    match mode {
        ComparatorMode::Strict => strict,
        ComparatorMode::Lenient => lenient,
        ComparatorMode::VeryLenient => very_lenient,
        ComparatorMode::Alternatives => alternatives,
    }
}

pub fn compare(mode: ComparatorMode, expected: &str, actual: &str) -> bool {
    comparator_for(mode)(expected, actual)
}

/// Exact equality, no normalization.
pub fn strict(expected: &str, actual: &str) -> bool {
    expected == actual
}

pub fn lenient(expected: &str, actual: &str) -> bool {
    normalize_output(expected) == normalize_output(actual)
}

/// Lenient, and additionally ignore outer whitespace and the width of internal runs.
pub fn very_lenient(expected: &str, actual: &str) -> bool {
    collapse_whitespace(&normalize_output(expected))
        == collapse_whitespace(&normalize_output(actual))
}

/// Accept any of the `||`-separated answers in `expected`.
///
/// An actual output equal to the whole normalized expected text is accepted too.
pub fn alternatives(expected: &str, actual: &str) -> bool {
    let actual = normalize_output(actual);
    if normalize_output(expected) == actual {
        return true;
    }
    expected
        .split(ALTERNATIVE_SEPARATOR)
        .map(str::trim)
        .filter(|alt| !alt.is_empty())
        .any(|alt| normalize_output(alt) == actual)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
