//! Publication workflow for problems.
//!
//! Every problem starts in `DRAFT`. Transitions are guarded by [`WorkflowAction`];
//! each successful one appends an [`AuditRecord`]. Actions on the same problem are
//! serialized through a per-problem lock, actions on different problems never
//! contend.

pub mod error;
pub mod store;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, instrument, warn};

pub use error::WorkflowError;
pub use store::{InMemoryWorkflowStatusStore, WorkflowStatusStore};

use crate::ProblemStatus;

/// Actor recorded when the caller does not name one.
pub const DEFAULT_ACTOR: &str = "admin";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    SubmitForReview,
    RequestChanges,
    Publish,
    RevertToDraft,
}

impl WorkflowAction {
    pub const ALL: &'static [WorkflowAction] = &[
        Self::SubmitForReview,
        Self::RequestChanges,
        Self::Publish,
        Self::RevertToDraft,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitForReview => "submit_for_review",
            Self::RequestChanges => "request_changes",
            Self::Publish => "publish",
            Self::RevertToDraft => "revert_to_draft",
        }
    }

    /// States this action may be taken from.
    pub fn allowed_from(&self) -> &'static [ProblemStatus] {
        match self {
            Self::SubmitForReview => &[ProblemStatus::Draft, ProblemStatus::ChangesRequested],
            Self::RequestChanges | Self::Publish => &[ProblemStatus::InReview],
            Self::RevertToDraft => &[ProblemStatus::Published],
        }
    }

    pub fn target(&self) -> ProblemStatus {
        match self {
            Self::SubmitForReview => ProblemStatus::InReview,
            Self::RequestChanges => ProblemStatus::ChangesRequested,
            Self::Publish => ProblemStatus::Published,
            Self::RevertToDraft => ProblemStatus::Draft,
        }
    }

    /// Target state when taken from `from`, or `None` if the transition is not allowed.
    pub fn transition(&self, from: ProblemStatus) -> Option<ProblemStatus> {
        self.allowed_from().contains(&from).then(|| self.target())
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkflowAction {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "submit_for_review" | "submit" => Ok(Self::SubmitForReview),
            "request_changes" => Ok(Self::RequestChanges),
            "publish" => Ok(Self::Publish),
            "revert_to_draft" | "revert" => Ok(Self::RevertToDraft),
            _ => Err(WorkflowError::UnknownAction(s.to_string())),
        }
    }
}

/// One successful workflow transition. Never mutated once recorded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditRecord {
    pub problem_id: String,
    pub actor: String,
    pub action: WorkflowAction,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub comment: Option<String>,
}

type AuditLog = Arc<Mutex<Vec<AuditRecord>>>;

/// Guarded status transitions plus the append-only audit trail.
pub struct WorkflowService {
    store: Arc<dyn WorkflowStatusStore>,
    /// Per-problem audit trail. Its mutex doubles as the per-problem transition lock.
    audit: DashMap<String, AuditLog>,
}

impl Default for WorkflowService {
    fn default() -> Self {
        Self::new(Arc::new(InMemoryWorkflowStatusStore::new()))
    }
}

impl WorkflowService {
    pub fn new(store: Arc<dyn WorkflowStatusStore>) -> Self {
        Self {
            store,
            audit: DashMap::new(),
        }
    }

    fn audit_log(&self, problem_id: &str) -> AuditLog {
        self.audit
            .entry(problem_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    pub async fn get_status(&self, problem_id: &str) -> Result<ProblemStatus, WorkflowError> {
        self.store.get_status(problem_id).await
    }

    /// Snapshot of the audit trail in the order transitions happened.
    pub async fn get_audit(&self, problem_id: &str) -> Vec<AuditRecord> {
        let Some(log) = self.audit.get(problem_id).map(|l| l.value().clone()) else {
            return Vec::new();
        };
        let records = log.lock().await;
        records.clone()
    }

    pub async fn submit_for_review(
        &self,
        problem_id: &str,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<ProblemStatus, WorkflowError> {
        self.apply(problem_id, WorkflowAction::SubmitForReview, actor, comment)
            .await
    }

    pub async fn request_changes(
        &self,
        problem_id: &str,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<ProblemStatus, WorkflowError> {
        self.apply(problem_id, WorkflowAction::RequestChanges, actor, comment)
            .await
    }

    pub async fn publish(
        &self,
        problem_id: &str,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<ProblemStatus, WorkflowError> {
        self.apply(problem_id, WorkflowAction::Publish, actor, comment)
            .await
    }

    pub async fn revert_to_draft(
        &self,
        problem_id: &str,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<ProblemStatus, WorkflowError> {
        self.apply(problem_id, WorkflowAction::RevertToDraft, actor, comment)
            .await
    }

    /// Perform `action` on a problem.
    ///
    /// On failure neither the status nor the audit trail is touched.
    #[instrument(skip(self, action, comment), fields(action = %action))]
    pub async fn apply(
        &self,
        problem_id: &str,
        action: WorkflowAction,
        actor: Option<&str>,
        comment: Option<&str>,
    ) -> Result<ProblemStatus, WorkflowError> {
        let log = self.audit_log(problem_id);
        let mut records = log.lock().await;

        let current = self.store.get_status(problem_id).await?;
        let Some(next) = action.transition(current) else {
            warn!(from = %current, "Rejected workflow transition");
            return Err(WorkflowError::InvalidTransition {
                action,
                from: current,
            });
        };

        self.store.set_status(problem_id, next).await?;

        let actor = actor
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_ACTOR);
        records.push(AuditRecord {
            problem_id: problem_id.to_string(),
            actor: actor.to_string(),
            action,
            timestamp_ms: chrono::Utc::now().timestamp_millis(),
            comment: comment.map(str::to_string),
        });

        info!(from = %current, to = %next, actor, "Workflow transition applied");
        Ok(next)
    }
}
