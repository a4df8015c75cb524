pub mod compare;
pub mod executor;
pub mod hardcode;
pub mod judge;
pub mod sandbox;
pub mod worker;

pub use executor::JudgeExecutor;
pub use judge::JudgeService;
pub use sandbox::{ProcessSandboxManager, SandboxHandle, SandboxManager};
pub use worker::Worker;
