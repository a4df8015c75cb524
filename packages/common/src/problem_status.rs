use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Publication state of a problem.
///
/// Only `PUBLISHED` problems are considered judgeable in production; the
/// workflow service is the only component that moves a problem between states.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProblemStatus {
    /// Being authored. Initial state of every problem.
    #[default]
    Draft,
    /// Waiting for a reviewer.
    InReview,
    /// Reviewer sent the problem back to its author.
    ChangesRequested,
    /// Live; hidden test cases may be used for grading.
    Published,
}

impl ProblemStatus {
    /// All possible status values.
    pub const ALL: &'static [ProblemStatus] = &[
        Self::Draft,
        Self::InReview,
        Self::ChangesRequested,
        Self::Published,
    ];

    /// Returns the string representation (SCREAMING_SNAKE_CASE).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::InReview => "IN_REVIEW",
            Self::ChangesRequested => "CHANGES_REQUESTED",
            Self::Published => "PUBLISHED",
        }
    }

    pub fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

impl fmt::Display for ProblemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            ProblemStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for ProblemStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DRAFT" => Ok(Self::Draft),
            "IN_REVIEW" => Ok(Self::InReview),
            "CHANGES_REQUESTED" => Ok(Self::ChangesRequested),
            "PUBLISHED" => Ok(Self::Published),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
