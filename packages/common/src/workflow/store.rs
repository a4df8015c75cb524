use async_trait::async_trait;
use dashmap::DashMap;

use super::error::WorkflowError;
use crate::ProblemStatus;

/// Persistence of the current workflow status per problem.
///
/// Problems never written before report `ProblemStatus::Draft`.
#[async_trait]
pub trait WorkflowStatusStore: Send + Sync {
    async fn get_status(&self, problem_id: &str) -> Result<ProblemStatus, WorkflowError>;
    async fn set_status(&self, problem_id: &str, next: ProblemStatus) -> Result<(), WorkflowError>;
}

#[derive(Debug, Default)]
pub struct InMemoryWorkflowStatusStore {
    status_by_problem: DashMap<String, ProblemStatus>,
}

impl InMemoryWorkflowStatusStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkflowStatusStore for InMemoryWorkflowStatusStore {
    async fn get_status(&self, problem_id: &str) -> Result<ProblemStatus, WorkflowError> {
        Ok(self
            .status_by_problem
            .get(problem_id)
            .map(|s| *s)
            .unwrap_or_default())
    }

    async fn set_status(&self, problem_id: &str, next: ProblemStatus) -> Result<(), WorkflowError> {
        self.status_by_problem.insert(problem_id.to_string(), next);
        Ok(())
    }
}
