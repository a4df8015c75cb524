use std::sync::Arc;
use std::time::Duration;

use common::workflow::WorkflowService;
use common::{InMemoryProblemRepository, Problem, TestCase};
use tempfile::TempDir;
use worker::config::{CompareConfig, JudgeConfig};
use worker::{JudgeService, LanguageProfile, ProcessSandboxManager, SandboxConfig};

/// Reads a count line and a line of integers, prints their sum.
pub const SUM_SCRIPT: &str = r#"read n
read line
s=0
for x in $line; do s=$((s+x)); done
echo $s
"#;

/// Shell "language": `sh -n` stands in for the compiler.
pub fn shell_profile() -> LanguageProfile {
    LanguageProfile {
        source_file: "main.sh".into(),
        compile: vec!["sh".into(), "-n".into(), "main.sh".into()],
        run: vec!["sh".into(), "main.sh".into()],
        oom_markers: vec!["OutOfMemoryError".into()],
    }
}

/// Sandbox settings with a private scratch root and short deadlines.
pub struct TestSandbox {
    pub root: TempDir,
    pub config: SandboxConfig,
}

impl TestSandbox {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("create scratch root");
        let config = SandboxConfig {
            root_dir: Some(root.path().to_path_buf()),
            compile_timeout_ms: 5_000,
            run_timeout_ms: 3_000,
            kill_grace_ms: 1_000,
            exit_grace_ms: 1_000,
            ..SandboxConfig::default()
        };
        Self { root, config }
    }

    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.config.run_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn with_exit_grace(mut self, grace: Duration) -> Self {
        self.config.exit_grace_ms = grace.as_millis() as u64;
        self
    }

    pub fn with_stdout_limit(mut self, limit: usize) -> Self {
        self.config.stdout_limit_bytes = limit;
        self
    }

    pub fn manager(&self) -> ProcessSandboxManager {
        ProcessSandboxManager::new(self.config.clone(), shell_profile())
    }

    /// Entries left behind under the scratch root.
    pub fn leftovers(&self) -> usize {
        std::fs::read_dir(self.root.path())
            .expect("read scratch root")
            .count()
    }
}

/// Judge over a single "sum" problem with the given test cases.
pub fn sum_judge(sandbox: &TestSandbox, cases: Vec<TestCase>) -> JudgeService {
    let repo = InMemoryProblemRepository::new();
    repo.insert(Problem::new("sum", "Sum of Integers"), cases);
    JudgeService::new(
        Arc::new(repo),
        Arc::new(sandbox.manager()),
        Arc::new(WorkflowService::default()),
        CompareConfig::default(),
        JudgeConfig::default(),
    )
}
