use std::time::{Duration, Instant};

use common::judge_result::TIMEOUT_EXIT_CODE;
use worker::SandboxManager;
use worker::models::sandbox::process::{RESOURCE_HINT, TIMEOUT_MESSAGE};
use worker::models::sandbox::stream::TRUNCATED_SUFFIX;

use crate::support::TestSandbox;

#[tokio::test]
async fn test_stdin_is_piped_through() {
    let sandbox = TestSandbox::new();
    let result = sandbox
        .manager()
        .compile_and_run("cat", "hello\nworld\n")
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "hello\nworld\n");
    assert_eq!(result.stderr, "");
    assert!(result.duration_ms >= 1);
    assert_eq!(sandbox.leftovers(), 0);
}

#[tokio::test]
async fn test_empty_stdin_is_closed_immediately() {
    let sandbox = TestSandbox::new();
    let start = Instant::now();
    let result = sandbox.manager().compile_and_run("cat", "").await.unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "");
    assert!(start.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_compile_failure_skips_run() {
    let sandbox = TestSandbox::new();
    let source = "echo should-not-run > ran.txt\nif then fi (\n";
    let result = sandbox.manager().compile_and_run(source, "").await.unwrap();

    assert_ne!(result.exit_code, 0);
    assert_eq!(result.stdout, "");
    assert!(!result.stderr.is_empty());
    assert_eq!(sandbox.leftovers(), 0);
}

#[tokio::test]
async fn test_timeout_kills_and_reports() {
    let sandbox = TestSandbox::new().with_run_timeout(Duration::from_millis(500));
    let start = Instant::now();
    let result = sandbox
        .manager()
        .compile_and_run("echo started\nsleep 5\necho finished\n", "")
        .await
        .unwrap();
    let elapsed = start.elapsed();

    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(result.stderr.ends_with(TIMEOUT_MESSAGE));
    // Output written before the kill survives.
    assert_eq!(result.stdout, "started\n");
    assert!(elapsed < Duration::from_secs(4), "took {elapsed:?}");
    assert_eq!(sandbox.leftovers(), 0);
}

#[tokio::test]
async fn test_timeout_kills_background_children_holding_pipes() {
    let sandbox = TestSandbox::new().with_run_timeout(Duration::from_millis(300));
    let start = Instant::now();
    let result = sandbox
        .manager()
        .compile_and_run("sleep 30 &\nsleep 30\n", "")
        .await
        .unwrap();

    assert_eq!(result.exit_code, TIMEOUT_EXIT_CODE);
    assert!(start.elapsed() < Duration::from_secs(4));
}

#[tokio::test]
async fn test_background_children_are_killed_after_normal_exit() {
    // Without the group kill the orphan would hold stdout for the whole grace.
    let sandbox = TestSandbox::new().with_exit_grace(Duration::from_secs(10));
    let start = Instant::now();
    let result = sandbox
        .manager()
        .compile_and_run("sleep 30 &\necho done\n", "")
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert_eq!(result.stdout, "done\n");
    assert!(start.elapsed() < Duration::from_secs(5), "took {:?}", start.elapsed());
    assert_eq!(sandbox.leftovers(), 0);
}

#[tokio::test]
async fn test_output_flood_is_truncated_without_hanging() {
    let sandbox = TestSandbox::new().with_stdout_limit(1000);
    let start = Instant::now();
    let result = sandbox
        .manager()
        .compile_and_run("head -c 200000 /dev/zero | tr '\\0' 'a'\n", "")
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.ends_with(TRUNCATED_SUFFIX));
    assert_eq!(result.stdout.len() - TRUNCATED_SUFFIX.len(), 1000);
    assert!(result.stdout.starts_with("aaaa"));
    assert!(result.stderr.ends_with(RESOURCE_HINT));
    assert!(start.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_both_pipes_flooding_do_not_deadlock() {
    let sandbox = TestSandbox::new();
    let result = sandbox
        .manager()
        .compile_and_run(
            "head -c 300000 /dev/zero >&2\nhead -c 300000 /dev/zero | tr '\\0' 'b'\necho\necho done\n",
            "",
        )
        .await
        .unwrap();

    assert_eq!(result.exit_code, 0);
    assert!(result.stdout.ends_with(TRUNCATED_SUFFIX));
    assert!(result.stderr.contains("[output truncated]"));
}

#[tokio::test]
async fn test_out_of_memory_marker_adds_hint() {
    let sandbox = TestSandbox::new();
    let result = sandbox
        .manager()
        .compile_and_run(
            "echo 'Exception in thread \"main\" java.lang.OutOfMemoryError: Java heap space' >&2\nexit 1\n",
            "",
        )
        .await
        .unwrap();

    assert_eq!(result.exit_code, 1);
    assert!(result.stderr.contains("OutOfMemoryError"));
    assert!(result.stderr.ends_with(RESOURCE_HINT));
}

#[tokio::test]
async fn test_plain_failure_has_no_hint() {
    let sandbox = TestSandbox::new();
    let result = sandbox
        .manager()
        .compile_and_run("echo oops >&2\nexit 3\n", "")
        .await
        .unwrap();

    assert_eq!(result.exit_code, 3);
    assert_eq!(result.stderr, "oops\n");
}

#[tokio::test]
async fn test_signal_exit_code() {
    let sandbox = TestSandbox::new();
    let result = sandbox
        .manager()
        .compile_and_run("kill -9 $$\n", "")
        .await
        .unwrap();

    assert_eq!(result.exit_code, 128 + 9);
}
