use std::sync::Arc;

use common::worker::{Executor, Task, TaskResult};
use tracing::{error, info, warn};

/// Routes each task to the first registered executor that accepts its type.
#[derive(Default)]
pub struct Worker {
    executors: Vec<(String, Arc<dyn Executor>)>,
}

impl Worker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_executor(mut self, name: &str, executor: Arc<dyn Executor>) -> Self {
        self.executors.push((name.to_string(), executor));
        self
    }

    pub async fn execute_task(&self, task: Task) -> TaskResult {
        let Some((name, executor)) = self
            .executors
            .iter()
            .find(|(_, executor)| executor.if_accept(&task.task_type))
        else {
            warn!(task_id = %task.id, task_type = %task.task_type, "No executor accepts task type");
            let message = format!("Unknown task type '{}'", task.task_type);
            return TaskResult::failure(task.id, message);
        };

        info!(task_id = %task.id, task_type = %task.task_type, executor = %name, "Task started");
        let task_id = task.id.clone();
        match executor.execute(task).await {
            Ok(result) => {
                info!(task_id = %result.task_id, success = result.success, "Task completed");
                result
            }
            Err(e) => {
                error!(task_id = %task_id, error = %e, "Task error");
                TaskResult::failure(task_id, e)
            }
        }
    }
}
