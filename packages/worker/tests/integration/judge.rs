use std::sync::Arc;
use std::time::Duration;

use common::judge_result::{HIDDEN_PLACEHOLDER, TIMEOUT_EXIT_CODE};
use common::worker::Task;
use common::workflow::WorkflowService;
use common::{InMemoryProblemRepository, TestCase};
use serde_json::json;
use worker::{JudgeExecutor, JudgeService, Worker, WorkerAppConfig};

use crate::support::{SUM_SCRIPT, TestSandbox, shell_profile, sum_judge};

fn sum_samples() -> Vec<TestCase> {
    vec![
        TestCase::sample("3\n1 2 3\n", "6\n"),
        TestCase::sample("3\n1 2 3\n", "6\n"),
    ]
}

#[tokio::test]
async fn test_sum_program_passes_samples() {
    let sandbox = TestSandbox::new();
    let judge = sum_judge(&sandbox, sum_samples());

    let result = judge.run("sum", SUM_SCRIPT).await.unwrap();
    assert!(result.all_passed, "{result:?}");
    assert_eq!(result.results.len(), 2);
    for r in &result.results {
        assert_eq!(r.actual_output, "6\n");
        assert_eq!(r.expected_output, "6\n");
        assert_eq!(r.exit_code, Some(0));
    }
    assert_eq!(sandbox.leftovers(), 0);
}

#[tokio::test]
async fn test_hidden_mismatch_rejects_with_redaction() {
    let sandbox = TestSandbox::new();
    let mut cases = sum_samples();
    cases.push(TestCase::hidden("2\n1 1\n", "3\n"));
    let judge = sum_judge(&sandbox, cases);

    let result = judge.submit("sum", SUM_SCRIPT).await.unwrap();
    assert!(!result.accepted);
    assert_eq!(result.message, "Rejected");
    assert_eq!(result.results.len(), 3);
    assert!(result.results[0].passed);
    assert!(result.results[1].passed);

    let hidden = &result.results[2];
    assert!(!hidden.passed);
    assert_eq!(hidden.expected_output, HIDDEN_PLACEHOLDER);
    assert_eq!(hidden.input, HIDDEN_PLACEHOLDER);
    assert_eq!(hidden.actual_output, "2\n");
    for r in &result.results {
        assert_eq!(r.expected_output, HIDDEN_PLACEHOLDER);
    }
}

#[tokio::test]
async fn test_correct_submission_is_accepted() {
    let sandbox = TestSandbox::new();
    let mut cases = sum_samples();
    cases.push(TestCase::hidden("4\n-5 7 100 2\n", "104\n"));
    let judge = sum_judge(&sandbox, cases);

    let result = judge.submit("sum", SUM_SCRIPT).await.unwrap();
    assert!(result.accepted, "{result:?}");
    assert_eq!(result.message, "Accepted");
}

#[tokio::test]
async fn test_hardcoded_answers_are_flagged() {
    let sandbox = TestSandbox::new();
    let judge = sum_judge(&sandbox, vec![TestCase::hidden("5\n1 2 3 4 5\n", "1234567\n")]);

    let result = judge.submit("sum", "echo 1234567\n").await.unwrap();
    assert!(result.results[0].passed);
    assert!(!result.accepted);
    assert_eq!(result.message, "Rejected: suspected hardcoded outputs");
}

#[tokio::test]
async fn test_nonzero_exit_fails_even_with_matching_output() {
    let sandbox = TestSandbox::new();
    let judge = sum_judge(&sandbox, sum_samples());

    let result = judge.run("sum", "echo 6\nexit 1\n").await.unwrap();
    assert!(!result.all_passed);
    assert!(result.results.iter().all(|r| !r.passed));
}

#[tokio::test]
async fn test_timeout_fails_only_its_case() {
    let sandbox = TestSandbox::new().with_run_timeout(Duration::from_millis(500));
    let cases = vec![
        TestCase::sample("0\n\n", "0\n"),
        TestCase::sample("3\n1 2 3\n", "6\n"),
    ];
    let judge = sum_judge(&sandbox, cases);
    let source = format!("read n\nif [ \"$n\" = 0 ]; then sleep 5; fi\n{}", &SUM_SCRIPT[7..]);

    let result = judge.run("sum", &source).await.unwrap();
    assert!(!result.all_passed);
    assert_eq!(result.results[0].exit_code, Some(TIMEOUT_EXIT_CODE));
    assert!(result.results[0].stderr.contains("Process timed out"));
    assert!(result.results[1].passed, "{:?}", result.results[1]);
}

#[tokio::test]
async fn test_files_written_by_one_case_are_not_seen_by_the_next() {
    let sandbox = TestSandbox::new();
    let cases = vec![TestCase::sample("x\n", "1\n"), TestCase::sample("x\n", "1\n")];
    let judge = sum_judge(&sandbox, cases);
    let source = "if [ -f seen ]; then echo 2; else touch seen; echo 1; fi\n";

    let result = judge.run("sum", source).await.unwrap();
    assert!(result.all_passed, "{result:?}");
    for r in &result.results {
        assert_eq!(r.actual_output, "1\n");
    }
    assert_eq!(sandbox.leftovers(), 0);
}

#[tokio::test]
async fn test_compile_error_fails_every_case() {
    let sandbox = TestSandbox::new();
    let judge = sum_judge(&sandbox, sum_samples());

    let result = judge.run("sum", "if then fi (\n").await.unwrap();
    assert!(!result.all_passed);
    for r in &result.results {
        assert_eq!(r.actual_output, "");
        assert!(!r.stderr.is_empty());
        assert_ne!(r.exit_code, Some(0));
    }
    assert_eq!(sandbox.leftovers(), 0);
}

#[tokio::test]
async fn test_worker_handles_json_tasks() {
    let sandbox = TestSandbox::new();
    let config = WorkerAppConfig {
        sandbox: sandbox.config.clone(),
        language: shell_profile(),
        ..WorkerAppConfig::default()
    };
    let judge = JudgeService::from_config(
        &config,
        Arc::new(InMemoryProblemRepository::with_demo_problems()),
        Arc::new(WorkflowService::default()),
    );
    let worker =
        Worker::new().with_executor("judge", Arc::new(JudgeExecutor::new(Arc::new(judge))));

    let result = worker
        .execute_task(Task::new("execute", json!({ "code": "cat", "stdin": "ping" })))
        .await;
    assert!(result.success, "{:?}", result.output);
    assert_eq!(result.output["stdout"], "ping");
    assert_eq!(result.output["exitCode"], 0);

    let result = worker
        .execute_task(Task::new("run", json!({ "problemId": "p2", "code": SUM_SCRIPT })))
        .await;
    assert!(result.success);
    assert_eq!(result.output["allPassed"], true);
    assert_eq!(result.output["problemId"], "p2");

    let result = worker
        .execute_task(Task::new(
            "submit",
            json!({ "problemId": "p2", "code": SUM_SCRIPT }),
        ))
        .await;
    assert!(result.success);
    assert_eq!(result.output["accepted"], true);
    assert_eq!(result.output["message"], "Accepted");
    assert_eq!(result.output["results"][2]["expectedOutput"], HIDDEN_PLACEHOLDER);

    let result = worker
        .execute_task(Task::new("run", json!({ "problemId": "p404", "code": "cat" })))
        .await;
    assert!(!result.success);

    let result = worker.execute_task(Task::new("judge", json!({}))).await;
    assert!(!result.success);
}
