use std::path::Path;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::text::unescape;

/// A single input/expected-output pair owned by a problem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    /// Data fed to the program on stdin.
    pub input: String,
    /// Output the program must produce.
    pub expected_output: String,
    /// Visible to users before submission. Hidden cases are only used when grading.
    #[serde(default)]
    pub is_sample: bool,
}

impl TestCase {
    pub fn sample(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            is_sample: true,
        }
    }

    pub fn hidden(input: impl Into<String>, expected_output: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected_output: expected_output.into(),
            is_sample: false,
        }
    }
}

/// Problem metadata. Test cases are looked up separately through the repository.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub statement: String,
    #[serde(default)]
    pub input_spec: String,
    #[serde(default)]
    pub output_spec: String,
    #[serde(default)]
    pub constraints: Option<String>,
}

impl Problem {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            statement: String::new(),
            input_spec: String::new(),
            output_spec: String::new(),
            constraints: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("failed to read problem pack: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid problem pack: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("repository backend error: {0}")]
    Backend(String),
}

/// Read access to problems and their test cases.
///
/// Persistence lives outside the judge; this is the seam it is consumed through.
#[async_trait]
pub trait ProblemRepository: Send + Sync {
    async fn find_problem(&self, problem_id: &str) -> Result<Option<Problem>, RepositoryError>;

    /// Sample (visible) test cases, in stored order.
    async fn sample_test_cases(&self, problem_id: &str) -> Result<Vec<TestCase>, RepositoryError>;

    /// Every test case, samples and hidden, in stored order.
    async fn all_test_cases(&self, problem_id: &str) -> Result<Vec<TestCase>, RepositoryError>;
}

#[derive(Clone, Debug)]
struct StoredProblem {
    problem: Problem,
    test_cases: Vec<TestCase>,
}

/// Problem repository held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryProblemRepository {
    problems: DashMap<String, StoredProblem>,
}

impl InMemoryProblemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a problem together with its test cases.
    pub fn insert(&self, problem: Problem, test_cases: Vec<TestCase>) {
        self.problems.insert(
            problem.id.clone(),
            StoredProblem {
                problem,
                test_cases,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    /// Build a repository from a parsed problem pack.
    pub fn from_pack(pack: ProblemPack) -> Self {
        let repo = Self::new();
        for entry in pack.problems {
            let test_cases = if pack.unescape {
                entry
                    .test_cases
                    .into_iter()
                    .map(|tc| TestCase {
                        input: unescape(&tc.input),
                        expected_output: unescape(&tc.expected_output),
                        is_sample: tc.is_sample,
                    })
                    .collect()
            } else {
                entry.test_cases
            };
            repo.insert(entry.problem, test_cases);
        }
        repo
    }

    /// Load a TOML problem pack from disk.
    pub async fn load(path: &Path) -> Result<Self, RepositoryError> {
        let content = tokio::fs::read_to_string(path).await?;
        let pack: ProblemPack = toml::from_str(&content)?;
        Ok(Self::from_pack(pack))
    }

    /// Repository seeded with the built-in demo problems.
    pub fn with_demo_problems() -> Self {
        Self::from_pack(ProblemPack::demo())
    }
}

#[async_trait]
impl ProblemRepository for InMemoryProblemRepository {
    async fn find_problem(&self, problem_id: &str) -> Result<Option<Problem>, RepositoryError> {
        Ok(self.problems.get(problem_id).map(|p| p.problem.clone()))
    }

    async fn sample_test_cases(&self, problem_id: &str) -> Result<Vec<TestCase>, RepositoryError> {
        Ok(self
            .problems
            .get(problem_id)
            .map(|p| {
                p.test_cases
                    .iter()
                    .filter(|tc| tc.is_sample)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn all_test_cases(&self, problem_id: &str) -> Result<Vec<TestCase>, RepositoryError> {
        Ok(self
            .problems
            .get(problem_id)
            .map(|p| p.test_cases.clone())
            .unwrap_or_default())
    }
}

/// One problem entry inside a pack file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProblemPackEntry {
    #[serde(flatten)]
    pub problem: Problem,
    #[serde(default)]
    pub test_cases: Vec<TestCase>,
}

/// A set of problems that can be loaded from TOML.
///
/// ```toml
/// unescape = false
///
/// [[problems]]
/// id = "p2"
/// title = "Sum of Integers"
///
/// [[problems.test_cases]]
/// input = "3\n1 2 3\n"
/// expected_output = "6\n"
/// is_sample = true
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ProblemPack {
    /// Decode literal `\n`, `\r`, `\t` sequences in test data.
    #[serde(default)]
    pub unescape: bool,
    #[serde(default)]
    pub problems: Vec<ProblemPackEntry>,
}

impl ProblemPack {
    pub fn demo() -> Self {
        let entry = |id: &str,
                     title: &str,
                     statement: &str,
                     constraints: &str,
                     test_cases: Vec<TestCase>| ProblemPackEntry {
            problem: Problem {
                constraints: Some(constraints.to_string()),
                statement: statement.to_string(),
                ..Problem::new(id, title)
            },
            test_cases,
        };

        Self {
            unescape: false,
            problems: vec![
                entry(
                    "p1",
                    "Hello, Name",
                    "Read a single line as a name and print 'Hello, <name>!'",
                    "name length <= 100 characters",
                    vec![
                        TestCase::sample("Alice\n", "Hello, Alice!\n"),
                        TestCase::sample("Bob\n", "Hello, Bob!\n"),
                        TestCase::hidden("Zoe\n", "Hello, Zoe!\n"),
                    ],
                ),
                entry(
                    "p2",
                    "Sum of Integers",
                    "Given N followed by N integers, output their sum.",
                    "1 <= N <= 10^5, |ai| <= 10^9",
                    vec![
                        TestCase::sample("3\n1 2 3\n", "6\n"),
                        TestCase::sample("5\n10 20 30 40 50\n", "150\n"),
                        TestCase::hidden("4\n-5 7 100 2\n", "104\n"),
                    ],
                ),
                entry(
                    "p3",
                    "Reverse String",
                    "Read a string and print its reverse.",
                    "string length <= 10^5",
                    vec![
                        TestCase::sample("hello\n", "olleh\n"),
                        TestCase::sample("Java\n", "avaJ\n"),
                        TestCase::hidden("stressed\n", "desserts\n"),
                    ],
                ),
            ],
        }
    }
}
