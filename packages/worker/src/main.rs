use std::sync::Arc;

use anyhow::Context;
use common::InMemoryProblemRepository;
use common::worker::{Task, TaskResult};
use common::workflow::WorkflowService;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{info, warn};
use worker::{JudgeExecutor, JudgeService, Worker, WorkerAppConfig};

/// Reads one JSON task per line on stdin and writes one JSON result per line on stdout.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries results
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;

    let problems = match &config.problems.path {
        Some(path) => InMemoryProblemRepository::load(path)
            .await
            .with_context(|| format!("Failed to load problem pack {}", path.display()))?,
        None => InMemoryProblemRepository::with_demo_problems(),
    };
    info!(
        problems = problems.len(),
        run = ?config.language.run,
        run_timeout_ms = config.sandbox.run_timeout_ms,
        "Worker starting"
    );

    let judge = JudgeService::from_config(
        &config,
        Arc::new(problems),
        Arc::new(WorkflowService::default()),
    );
    let worker =
        Worker::new().with_executor("judge", Arc::new(JudgeExecutor::new(Arc::new(judge))));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read task")? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let result = match serde_json::from_str::<Task>(line) {
            Ok(task) => worker.execute_task(task).await,
            Err(e) => {
                warn!(error = %e, "Malformed task line");
                TaskResult::failure(task_id_hint(line), format!("Invalid task: {e}"))
            }
        };

        let mut encoded =
            serde_json::to_vec(&result).context("Failed to serialize task result")?;
        encoded.push(b'\n');
        stdout
            .write_all(&encoded)
            .await
            .context("Failed to write task result")?;
        stdout.flush().await.context("Failed to flush stdout")?;
    }

    info!("Input closed, worker exiting");
    Ok(())
}

/// Best-effort task id of a line that failed to parse as a `Task`.
fn task_id_hint(line: &str) -> String {
    serde_json::from_str::<serde_json::Value>(line)
        .ok()
        .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
        .unwrap_or_default()
}
