use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Output equivalence policy used when judging a problem.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparatorMode {
    /// Exact character equality, no normalization.
    Strict,
    /// Line endings normalized and trailing newlines ignored.
    #[default]
    Lenient,
    /// Lenient, plus outer whitespace trimmed and whitespace runs collapsed.
    VeryLenient,
    /// Expected output lists acceptable answers separated by `||`.
    Alternatives,
}

impl ComparatorMode {
    pub const ALL: &'static [ComparatorMode] = &[
        Self::Strict,
        Self::Lenient,
        Self::VeryLenient,
        Self::Alternatives,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Strict => "strict",
            Self::Lenient => "lenient",
            Self::VeryLenient => "very_lenient",
            Self::Alternatives => "alternatives",
        }
    }

    /// Parse a configured mode string, falling back to `Lenient` when the
    /// value is missing, blank or unknown.
    pub fn parse_or_default(value: Option<&str>) -> Self {
        value
            .and_then(|v| v.parse::<ComparatorMode>().ok())
            .unwrap_or_default()
    }
}

impl fmt::Display for ComparatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseModeError {
    invalid: String,
}

impl fmt::Display for ParseModeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown comparator mode '{}'", self.invalid)
    }
}

impl std::error::Error for ParseModeError {}

impl FromStr for ComparatorMode {
    type Err = ParseModeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(Self::Strict),
            "lenient" => Ok(Self::Lenient),
            "very_lenient" | "very-lenient" => Ok(Self::VeryLenient),
            "alternatives" => Ok(Self::Alternatives),
            _ => Err(ParseModeError {
                invalid: s.to_string(),
            }),
        }
    }
}
