//! Workflow job event types
//!
//! The decoded form of a GitHub `workflow_job` webhook delivery, reduced to
//! the fields the orchestrator acts on. Everything here originates from an
//! untrusted HTTP payload, so nothing in this module assumes well-formed
//! values beyond successful deserialization.

use serde::{Deserialize, Serialize};

/// Lifecycle action carried by a `workflow_job` event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobAction {
    /// A job is waiting for a runner; a microVM should be created
    Queued,

    /// A job has finished; its microVM should be deleted
    Completed,

    /// Any other action (in_progress, waiting, ...); ignored
    Other,
}

impl JobAction {
    /// Map the raw webhook `action` string onto the actions we handle.
    /// Unknown actions are deliberately collapsed into `Other` rather than
    /// rejected, since GitHub adds action types over time.
    pub fn parse(action: &str) -> Self {
        match action {
            "queued" => JobAction::Queued,
            "completed" => JobAction::Completed,
            _ => JobAction::Other,
        }
    }
}

impl std::fmt::Display for JobAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobAction::Queued => write!(f, "queued"),
            JobAction::Completed => write!(f, "completed"),
            JobAction::Other => write!(f, "other"),
        }
    }
}

/// A single decoded `workflow_job` event
///
/// Built once per inbound webhook call and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub action: JobAction,

    /// Job identifier, unique per job execution
    pub job_id: i64,

    /// Workflow run identifier the job belongs to
    pub run_id: i64,

    /// GitHub global node id of the job
    pub node_id: String,

    /// Runner labels requested by the workflow (e.g. "self-hosted", "arm64")
    pub labels: Vec<String>,

    /// API URL of the workflow run, used only for logging
    pub run_url: String,
}

impl JobEvent {
    /// The runner name for this event.
    ///
    /// This is the only handle correlating the queued and completed
    /// deliveries of one job execution, so it must depend on nothing but
    /// the three identifying fields.
    pub fn runner_name(&self) -> String {
        runner_name(&self.node_id, self.job_id, self.run_id)
    }
}

/// Derive the deterministic runner name for a job execution.
///
/// Pure and total: the same triple always yields the same name, regardless
/// of event action, labels or delivery timing.
pub fn runner_name(node_id: &str, job_id: i64, run_id: i64) -> String {
    format!("{node_id}-{job_id}-{run_id}")
}
