use thiserror::Error;

use super::WorkflowAction;
use crate::ProblemStatus;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Invalid transition: cannot {action} from {from}")]
    InvalidTransition {
        action: WorkflowAction,
        from: ProblemStatus,
    },

    #[error("Unknown workflow action '{0}'")]
    UnknownAction(String),

    #[error("Status store error: {0}")]
    Store(String),
}
