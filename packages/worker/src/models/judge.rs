//! Judging orchestration: trial runs against samples, graded submissions
//! against every test case.

use std::sync::Arc;

use common::judge_result::{
    ExecutionResult, JudgeSystemErrorInfo, RunResult, SubmitResult, SubmitVerdict, TestCaseResult,
};
use common::workflow::WorkflowService;
use common::{ComparatorMode, Problem, ProblemRepository, TestCase};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{CompareConfig, JudgeConfig, WorkerAppConfig};
use crate::error::JudgeError;
use crate::models::compare::comparator_for;
use crate::models::hardcode;
use crate::models::sandbox::{ProcessSandboxManager, SandboxManager};

pub const SANDBOX_ERROR_CODE: &str = "SANDBOX_ERROR";

pub struct JudgeService {
    problems: Arc<dyn ProblemRepository>,
    sandbox: Arc<dyn SandboxManager>,
    workflow: Arc<WorkflowService>,
    compare: CompareConfig,
    policy: JudgeConfig,
}

impl JudgeService {
    pub fn new(
        problems: Arc<dyn ProblemRepository>,
        sandbox: Arc<dyn SandboxManager>,
        workflow: Arc<WorkflowService>,
        compare: CompareConfig,
        policy: JudgeConfig,
    ) -> Self {
        Self {
            problems,
            sandbox,
            workflow,
            compare,
            policy,
        }
    }

    /// Service backed by a [`ProcessSandboxManager`] built from `config`.
    pub fn from_config(
        config: &WorkerAppConfig,
        problems: Arc<dyn ProblemRepository>,
        workflow: Arc<WorkflowService>,
    ) -> Self {
        let sandbox =
            ProcessSandboxManager::new(config.sandbox.clone(), config.language.clone());
        Self::new(
            problems,
            Arc::new(sandbox),
            workflow,
            config.compare.clone(),
            config.judge.clone(),
        )
    }

    pub fn workflow(&self) -> &Arc<WorkflowService> {
        &self.workflow
    }

    pub fn mode_for(&self, problem_id: &str) -> ComparatorMode {
        self.compare.mode_for(problem_id)
    }

    pub async fn find_problem(&self, problem_id: &str) -> Result<Problem, JudgeError> {
        self.problems
            .find_problem(problem_id)
            .await?
            .ok_or_else(|| JudgeError::ProblemNotFound(problem_id.to_string()))
    }

    /// Compile and run arbitrary code once, outside any problem.
    pub async fn execute(
        &self,
        source_code: &str,
        stdin: &str,
    ) -> Result<ExecutionResult, JudgeError> {
        Ok(self.sandbox.compile_and_run(source_code, stdin).await?)
    }

    /// Trial run against the sample test cases, with expected output visible.
    #[instrument(skip(self, source_code))]
    pub async fn run(&self, problem_id: &str, source_code: &str) -> Result<RunResult, JudgeError> {
        self.find_problem(problem_id).await?;
        let cases = self.problems.sample_test_cases(problem_id).await?;

        let results = self.judge_cases(problem_id, source_code, &cases).await?;
        let all_passed = results.iter().all(|r| r.passed);
        info!(cases = results.len(), all_passed, "Trial run finished");

        Ok(RunResult {
            problem_id: problem_id.to_string(),
            all_passed,
            results,
        })
    }

    /// Graded submission against every test case.
    ///
    /// Hidden test data never leaves this function unredacted.
    #[instrument(skip(self, source_code))]
    pub async fn submit(
        &self,
        problem_id: &str,
        source_code: &str,
    ) -> Result<SubmitResult, JudgeError> {
        self.find_problem(problem_id).await?;
        if self.policy.require_published {
            let status = self.workflow.get_status(problem_id).await?;
            if !status.is_published() {
                warn!(%status, "Submission rejected for unpublished problem");
                return Err(JudgeError::NotPublished {
                    problem_id: problem_id.to_string(),
                    status,
                });
            }
        }
        let cases = self.problems.all_test_cases(problem_id).await?;

        let mut results = self.judge_cases(problem_id, source_code, &cases).await?;
        let all_passed = results.iter().all(|r| r.passed);

        let hidden: Vec<TestCase> = cases.iter().filter(|tc| !tc.is_sample).cloned().collect();
        let suspicious = hardcode::is_suspicious(source_code, &hidden);
        if suspicious {
            warn!("Submission embeds hidden expected output");
        }

        for (case, result) in cases.iter().zip(results.iter_mut()) {
            if !case.is_sample {
                result.redact_test_data();
            } else if self.policy.redact_samples {
                result.redact_expected();
            }
        }

        let verdict = SubmitVerdict::decide(all_passed, suspicious);
        info!(
            cases = results.len(),
            all_passed,
            suspicious,
            verdict = verdict.message(),
            "Submission judged"
        );

        Ok(SubmitResult {
            problem_id: problem_id.to_string(),
            accepted: verdict.is_accepted(),
            results,
            message: verdict.message().to_string(),
        })
    }

    /// Compile once, then run every case in order, each in its own copy of the
    /// compiled sandbox so files written by one run are never seen by the next.
    async fn judge_cases(
        &self,
        problem_id: &str,
        source_code: &str,
        cases: &[TestCase],
    ) -> Result<Vec<TestCaseResult>, JudgeError> {
        if cases.is_empty() {
            return Ok(Vec::new());
        }
        let comparator = comparator_for(self.mode_for(problem_id));

        let sandbox = self.sandbox.create_sandbox(source_code).await?;
        if let Some(compiled) = self.sandbox.compile(&sandbox).await? {
            if !compiled.succeeded() {
                debug!(exit_code = compiled.exit_code, "Compilation failed, skipping run step");
                let failed = ExecutionResult {
                    stdout: String::new(),
                    ..compiled
                };
                return Ok(cases
                    .iter()
                    .map(|tc| TestCaseResult::from_execution(tc, failed.clone(), false))
                    .collect());
            }
        }

        let mut results = Vec::with_capacity(cases.len());
        for (index, tc) in cases.iter().enumerate() {
            let outcome = match sandbox.duplicate().await {
                Ok(run_dir) => self.sandbox.execute(&run_dir, &tc.input).await,
                Err(e) => Err(e),
            };
            let result = match outcome {
                Ok(execution) => {
                    if execution.timed_out() {
                        warn!(index, duration_ms = execution.duration_ms, "Test case timed out");
                    }
                    let passed =
                        execution.succeeded() && comparator(&tc.expected_output, &execution.stdout);
                    debug!(
                        index,
                        passed,
                        exit_code = execution.exit_code,
                        duration_ms = execution.duration_ms,
                        "Test case judged"
                    );
                    TestCaseResult::from_execution(tc, execution, passed)
                }
                Err(e) => {
                    error!(index, error = %e, "Sandbox failed to execute test case");
                    TestCaseResult::system_error(
                        tc,
                        JudgeSystemErrorInfo::new(SANDBOX_ERROR_CODE, e.to_string()),
                    )
                }
            };
            results.push(result);
        }
        Ok(results)
    }
}
