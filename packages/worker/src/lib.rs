pub mod config;
pub mod error;
pub mod models;

pub use config::{LanguageProfile, SandboxConfig, WorkerAppConfig};
pub use error::{JudgeError, Result, WorkerError};
pub use models::{JudgeExecutor, JudgeService, ProcessSandboxManager, SandboxManager, Worker};
