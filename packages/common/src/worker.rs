use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Task used for worker to execute
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    #[serde(default = "generate_task_id")]
    pub id: String,
    /// One of `execute`, `run`, `submit`, `workflow`.
    pub task_type: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn generate_task_id() -> String {
    uuid::Uuid::now_v7().to_string()
}

impl Task {
    pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id: generate_task_id(),
            task_type: task_type.into(),
            payload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    pub output: serde_json::Value,
}

impl TaskResult {
    pub fn failure(task_id: impl Into<String>, error: impl std::fmt::Display) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output: serde_json::json!({ "error": error.to_string() }),
        }
    }
}

/// Worker use executor to run tasks
#[async_trait]
pub trait Executor: Send + Sync {
    fn if_accept(&self, task_type: &str) -> bool;
    async fn execute(&self, task: Task) -> Result<TaskResult>;
}
