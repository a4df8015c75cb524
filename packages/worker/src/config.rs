use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use common::ComparatorMode;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

/// Limits and timeouts applied to every sandbox invocation.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SandboxConfig {
    /// Parent directory for scratch directories. Default: OS temp dir.
    pub root_dir: Option<PathBuf>,
    /// Compile step deadline. Default: 10000.
    pub compile_timeout_ms: u64,
    /// Run step deadline. Default: 5000.
    pub run_timeout_ms: u64,
    /// Stdout capture cap. Default: 64 KiB.
    pub stdout_limit_bytes: usize,
    /// Stderr capture cap. Default: 32 KiB.
    pub stderr_limit_bytes: usize,
    /// How long to wait for output drains after a forced kill. Default: 2000.
    pub kill_grace_ms: u64,
    /// How long to wait for output drains after a normal exit. Default: 5000.
    pub exit_grace_ms: u64,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            compile_timeout_ms: 10_000,
            run_timeout_ms: 5_000,
            stdout_limit_bytes: 64 * 1024,
            stderr_limit_bytes: 32 * 1024,
            kill_grace_ms: 2_000,
            exit_grace_ms: 5_000,
        }
    }
}

impl SandboxConfig {
    pub fn root_dir(&self) -> PathBuf {
        self.root_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn compile_timeout(&self) -> Duration {
        Duration::from_millis(self.compile_timeout_ms)
    }

    pub fn run_timeout(&self) -> Duration {
        Duration::from_millis(self.run_timeout_ms)
    }

    pub fn kill_grace(&self) -> Duration {
        Duration::from_millis(self.kill_grace_ms)
    }

    pub fn exit_grace(&self) -> Duration {
        Duration::from_millis(self.exit_grace_ms)
    }
}

/// How to build and launch a submission.
///
/// Resource flags (e.g. JVM heap limits) belong in the argv templates.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LanguageProfile {
    /// File name the submitted source is written to. Default: "Main.java".
    pub source_file: String,
    /// Compile argv run inside the scratch directory. Empty to skip compilation.
    pub compile: Vec<String>,
    /// Run argv run inside the scratch directory.
    pub run: Vec<String>,
    /// Stderr substrings that indicate the program ran out of memory.
    pub oom_markers: Vec<String>,
}

impl Default for LanguageProfile {
    fn default() -> Self {
        Self {
            source_file: "Main.java".into(),
            compile: vec!["javac".into(), "-J-Xmx256m".into(), "Main.java".into()],
            run: vec!["java".into(), "-Xmx64m".into(), "Main".into()],
            oom_markers: vec!["OutOfMemoryError".into()],
        }
    }
}

/// Comparator selection per problem.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CompareConfig {
    /// Mode used when a problem has no entry. Default: "lenient".
    pub default_mode: Option<String>,
    /// Problem id -> mode string.
    pub problems: HashMap<String, String>,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            default_mode: Some("lenient".into()),
            problems: HashMap::new(),
        }
    }
}

impl CompareConfig {
    pub fn default_mode(&self) -> ComparatorMode {
        ComparatorMode::parse_or_default(self.default_mode.as_deref())
    }

    /// Problem entry, then the global default, then `Lenient`.
    pub fn mode_for(&self, problem_id: &str) -> ComparatorMode {
        match self.problems.get(problem_id).map(|m| m.trim()) {
            Some(mode) if !mode.is_empty() => ComparatorMode::parse_or_default(Some(mode)),
            _ => self.default_mode(),
        }
    }
}

/// Judging policy.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct JudgeConfig {
    /// Reject submissions to problems that are not published. Default: false.
    pub require_published: bool,
    /// Redact expected output of sample cases in submission results too. Default: true.
    pub redact_samples: bool,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            require_published: false,
            redact_samples: true,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct ProblemsConfig {
    /// TOML problem pack. Demo problems are used when unset.
    pub path: Option<PathBuf>,
}

/// Worker application configuration.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct WorkerAppConfig {
    #[serde(default)]
    pub sandbox: SandboxConfig,
    #[serde(default)]
    pub language: LanguageProfile,
    #[serde(default)]
    pub compare: CompareConfig,
    #[serde(default)]
    pub judge: JudgeConfig,
    #[serde(default)]
    pub problems: ProblemsConfig,
}

impl WorkerAppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("JUDGE_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("sandbox.compile_timeout_ms", 10_000_i64)?
            .set_default("sandbox.run_timeout_ms", 5_000_i64)?
            .set_default("compare.default_mode", "lenient")?
            .add_source(File::with_name(&config_path).required(false))
            .add_source(Environment::with_prefix("JUDGE").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
