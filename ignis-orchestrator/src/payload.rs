//! Webhook payload decoding and verification
//!
//! Turns a raw webhook delivery into a [`JobEvent`], verifying the
//! `X-Hub-Signature-256` HMAC when a shared secret is configured. Every
//! byte handled here is attacker-controllable; verification happens before
//! any of the body is interpreted.

use axum::http::HeaderMap;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

use ignis_core::event::{JobAction, JobEvent};

type HmacSha256 = Hmac<Sha256>;

const EVENT_HEADER: &str = "x-github-event";
const SIGNATURE_HEADER: &str = "x-hub-signature-256";
const SIGNATURE_PREFIX: &str = "sha256=";
const WORKFLOW_JOB_EVENT: &str = "workflow_job";

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("missing x-hub-signature-256 header")]
    MissingSignature,

    #[error("malformed signature header")]
    MalformedSignature,

    #[error("signature verification failed")]
    InvalidSignature,

    #[error("invalid workflow job payload: {0}")]
    InvalidBody(#[from] serde_json::Error),
}

/// Decodes webhook deliveries into job events.
///
/// `Ok(None)` means the delivery was valid but not a workflow job event
/// (pings, deployment events, ...) and should be acknowledged without
/// further processing.
pub trait PayloadParser: Send + Sync {
    fn parse(&self, headers: &HeaderMap, body: &[u8]) -> Result<Option<JobEvent>, PayloadError>;
}

/// [`PayloadParser`] for GitHub webhook deliveries
pub struct GithubParser {
    secret: Option<String>,
}

impl GithubParser {
    pub fn new(secret: Option<String>) -> Self {
        Self { secret }
    }

    fn verify_signature(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), PayloadError> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };

        let header = headers
            .get(SIGNATURE_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or(PayloadError::MissingSignature)?;

        let hex_digest = header
            .strip_prefix(SIGNATURE_PREFIX)
            .ok_or(PayloadError::MalformedSignature)?;

        let digest = hex::decode(hex_digest).map_err(|_| PayloadError::MalformedSignature)?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|_| PayloadError::InvalidSignature)?;
        mac.update(body);

        // constant-time comparison
        mac.verify_slice(&digest)
            .map_err(|_| PayloadError::InvalidSignature)
    }
}

impl PayloadParser for GithubParser {
    fn parse(&self, headers: &HeaderMap, body: &[u8]) -> Result<Option<JobEvent>, PayloadError> {
        self.verify_signature(headers, body)?;

        let event_type = headers.get(EVENT_HEADER).and_then(|v| v.to_str().ok());
        if event_type != Some(WORKFLOW_JOB_EVENT) {
            return Ok(None);
        }

        let payload: WorkflowJobPayload = serde_json::from_slice(body)?;

        Ok(Some(payload.into()))
    }
}

#[derive(Debug, Deserialize)]
struct WorkflowJobPayload {
    action: String,
    workflow_job: WorkflowJob,
}

#[derive(Debug, Deserialize)]
struct WorkflowJob {
    id: i64,
    run_id: i64,
    node_id: String,
    #[serde(default)]
    labels: Vec<String>,
    #[serde(default)]
    run_url: String,
}

impl From<WorkflowJobPayload> for JobEvent {
    fn from(payload: WorkflowJobPayload) -> Self {
        JobEvent {
            action: JobAction::parse(&payload.action),
            job_id: payload.workflow_job.id,
            run_id: payload.workflow_job.run_id,
            node_id: payload.workflow_job.node_id,
            labels: payload.workflow_job.labels,
            run_url: payload.workflow_job.run_url,
        }
    }
}
