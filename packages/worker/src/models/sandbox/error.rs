use std::path::PathBuf;

use thiserror::Error;

/// Infrastructure failures of the sandbox itself.
///
/// A program that times out, crashes or floods its output is not an error here;
/// those outcomes are reported through `ExecutionResult`.
#[derive(Error, Debug)]
pub enum SandboxError {
    #[error("Environment initialization failed at {path}: {source}")]
    Initialization {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    #[error("execution error: {0}")]
    Execution(String),
}
