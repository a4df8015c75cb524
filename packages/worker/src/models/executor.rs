use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use common::workflow::WorkflowAction;
use common::worker::{Executor, Task, TaskResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use crate::error::WorkerError;
use crate::models::judge::JudgeService;

pub const TASK_TYPES: &[&str] = &["execute", "run", "submit", "workflow"];

/// Payload of an `execute` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutePayload {
    pub code: String,
    #[serde(default)]
    pub stdin: Option<String>,
}

/// Payload of `run` and `submit` tasks.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgePayload {
    pub problem_id: String,
    pub code: String,
}

/// Payload of a `workflow` task.
///
/// `action` is a transition name, or `status` / `audit` to query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowPayload {
    pub problem_id: String,
    pub action: String,
    #[serde(default)]
    pub actor: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Executes judging and workflow tasks against a [`JudgeService`].
pub struct JudgeExecutor {
    judge: Arc<JudgeService>,
}

impl JudgeExecutor {
    pub fn new(judge: Arc<JudgeService>) -> Self {
        Self { judge }
    }

    async fn dispatch(
        &self,
        task_type: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, WorkerError> {
        match task_type {
            "execute" => {
                let p: ExecutePayload = serde_json::from_value(payload)?;
                let result = self
                    .judge
                    .execute(&p.code, p.stdin.as_deref().unwrap_or_default())
                    .await?;
                Ok(serde_json::to_value(result)?)
            }
            "run" => {
                let p: JudgePayload = serde_json::from_value(payload)?;
                let result = self.judge.run(&p.problem_id, &p.code).await?;
                Ok(serde_json::to_value(result)?)
            }
            "submit" => {
                let p: JudgePayload = serde_json::from_value(payload)?;
                let result = self.judge.submit(&p.problem_id, &p.code).await?;
                Ok(serde_json::to_value(result)?)
            }
            "workflow" => {
                let p: WorkflowPayload = serde_json::from_value(payload)?;
                self.workflow(p).await
            }
            other => Err(WorkerError::Task(format!("Unknown task type '{other}'"))),
        }
    }

    async fn workflow(&self, p: WorkflowPayload) -> Result<serde_json::Value, WorkerError> {
        self.judge.find_problem(&p.problem_id).await?;
        let workflow = self.judge.workflow();

        match p.action.trim() {
            "status" => {
                let status = workflow.get_status(&p.problem_id).await?;
                Ok(json!({ "problemId": p.problem_id, "status": status }))
            }
            "audit" => {
                let audit = workflow.get_audit(&p.problem_id).await;
                Ok(serde_json::to_value(audit)?)
            }
            action => {
                let action: WorkflowAction = action.parse()?;
                let status = workflow
                    .apply(
                        &p.problem_id,
                        action,
                        p.actor.as_deref(),
                        p.comment.as_deref(),
                    )
                    .await?;
                Ok(json!({ "problemId": p.problem_id, "status": status }))
            }
        }
    }
}

#[async_trait]
impl Executor for JudgeExecutor {
    fn if_accept(&self, task_type: &str) -> bool {
        TASK_TYPES.contains(&task_type)
    }

    #[instrument(skip(self, task), fields(task_id = %task.id, task_type = %task.task_type))]
    async fn execute(&self, task: Task) -> Result<TaskResult> {
        match self.dispatch(&task.task_type, task.payload).await {
            Ok(output) => Ok(TaskResult {
                task_id: task.id,
                success: true,
                output,
            }),
            Err(e) => {
                debug!(error = %e, "Task rejected");
                Ok(TaskResult::failure(task.id, e))
            }
        }
    }
}
