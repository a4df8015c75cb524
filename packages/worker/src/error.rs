use common::test_case::RepositoryError;
use common::workflow::WorkflowError;
use thiserror::Error;

use crate::models::sandbox::error::SandboxError;

/// Reasons a judging request is rejected before a verdict exists.
///
/// Timeouts, truncated output and runtime failures are not errors; they are part
/// of the judged result.
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Problem not found: {0}")]
    ProblemNotFound(String),

    #[error("Problem {problem_id} is not published (status: {status})")]
    NotPublished {
        problem_id: String,
        status: common::ProblemStatus,
    },

    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Sandbox error: {0}")]
    Sandbox(#[from] SandboxError),
}

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid task payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Task error: {0}")]
    Task(String),

    #[error(transparent)]
    Judge(#[from] JudgeError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),
}

pub type Result<T> = std::result::Result<T, WorkerError>;
