use serde::{Deserialize, Serialize};

use crate::test_case::TestCase;

/// Exit code reserved for a process that was killed after its deadline.
pub const TIMEOUT_EXIT_CODE: i32 = -1;

/// Placeholder shown instead of hidden test data in submission results.
pub const HIDDEN_PLACEHOLDER: &str = "(hidden)";

/// Outcome of a single process invocation inside the sandbox.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    /// Captured stdout, possibly ending with the truncation marker.
    pub stdout: String,
    /// Captured stderr, possibly with diagnostic hints appended.
    pub stderr: String,
    /// Process exit code. `-1` means the process timed out and was killed.
    pub exit_code: i32,
    /// Wall-clock duration, at least 1.
    pub duration_ms: u64,
}

impl ExecutionResult {
    pub fn timed_out(&self) -> bool {
        self.exit_code == TIMEOUT_EXIT_CODE
    }

    pub fn succeeded(&self) -> bool {
        self.exit_code == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JudgeSystemErrorInfo {
    /// Machine-readable error code (e.g., "SANDBOX_ERROR").
    pub code: String,
    /// Human-readable error description.
    pub message: String,
}

impl JudgeSystemErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Judged outcome of one test case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub stderr: String,
    /// `None` when the sandbox could not execute the case at all.
    pub exit_code: Option<i32>,
    pub duration_ms: Option<u64>,
    pub passed: bool,
    /// Set when an infrastructure failure prevented execution.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_info: Option<JudgeSystemErrorInfo>,
}

impl TestCaseResult {
    /// Pair a test case with the execution that ran it.
    ///
    /// `passed` must already account for both the comparator verdict and the exit code.
    pub fn from_execution(test_case: &TestCase, execution: ExecutionResult, passed: bool) -> Self {
        Self {
            input: test_case.input.clone(),
            expected_output: test_case.expected_output.clone(),
            actual_output: execution.stdout,
            stderr: execution.stderr,
            exit_code: Some(execution.exit_code),
            duration_ms: Some(execution.duration_ms),
            passed,
            error_info: None,
        }
    }

    /// A case that never ran because the sandbox failed.
    pub fn system_error(test_case: &TestCase, error_info: JudgeSystemErrorInfo) -> Self {
        Self {
            input: test_case.input.clone(),
            expected_output: test_case.expected_output.clone(),
            actual_output: String::new(),
            stderr: error_info.message.clone(),
            exit_code: None,
            duration_ms: None,
            passed: false,
            error_info: Some(error_info),
        }
    }

    /// Replace expected output with the fixed placeholder.
    pub fn redact_expected(&mut self) {
        self.expected_output = HIDDEN_PLACEHOLDER.to_string();
    }

    /// Replace both test data fields with the fixed placeholder.
    pub fn redact_test_data(&mut self) {
        self.input = HIDDEN_PLACEHOLDER.to_string();
        self.redact_expected();
    }
}

/// Response of a trial run against sample test cases.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunResult {
    pub problem_id: String,
    pub all_passed: bool,
    pub results: Vec<TestCaseResult>,
}

/// Verdict message of a submission.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmitVerdict {
    Accepted,
    Rejected,
    SuspectedHardcode,
}

impl SubmitVerdict {
    pub fn decide(all_passed: bool, suspicious: bool) -> Self {
        if suspicious {
            Self::SuspectedHardcode
        } else if all_passed {
            Self::Accepted
        } else {
            Self::Rejected
        }
    }

    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Rejected => "Rejected",
            Self::SuspectedHardcode => "Rejected: suspected hardcoded outputs",
        }
    }
}

/// Response of a graded submission against every test case.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResult {
    pub problem_id: String,
    pub accepted: bool,
    pub results: Vec<TestCaseResult>,
    pub message: String,
}
