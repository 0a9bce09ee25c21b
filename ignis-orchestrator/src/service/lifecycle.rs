//! Webhook-driven runner lifecycle
//!
//! One traversal per inbound delivery: a queued workflow job gets a microVM
//! created on the least-loaded backend host, a completed job gets the VM it
//! was created on deleted. The allocator is the only state carried between
//! the two calls; everything else is rebuilt per delivery.
//!
//! Failure semantics worth knowing about:
//! - a failed create leaves the allocator assignment in place, orphaning
//!   it; the later completed event then finds zero instances on the host,
//!   which is treated as benign
//! - a failed delete also keeps the assignment, so a redelivered webhook
//!   can try again
//! - no operation here retries internally; GitHub redelivers webhooks

use thiserror::Error;
use tracing::{debug, info, warn};

use ignis_client::{BackendClient, ClientError, Connector};
use ignis_core::event::{JobAction, JobEvent};
use ignis_core::spec::NAMESPACE;

use crate::config::Config;
use crate::service::allocator::{AllocError, HostAllocator};
use crate::service::bootstrap::{self, BootstrapError, BootstrapParams};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Alloc(#[from] AllocError),

    #[error(transparent)]
    Backend(#[from] ClientError),

    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
}

/// The orchestration state machine shared by all webhook handlers
pub struct Lifecycle {
    config: Config,
    allocator: HostAllocator,
    connector: Box<dyn Connector>,
}

impl Lifecycle {
    pub fn new(config: Config, connector: Box<dyn Connector>) -> Self {
        let allocator = HostAllocator::new(config.hosts.clone());

        Self {
            config,
            allocator,
            connector,
        }
    }

    /// Dispatch one decoded workflow job event.
    ///
    /// Label-gated events and actions other than queued/completed are
    /// acknowledged without touching any backend.
    pub async fn handle_event(&self, event: &JobEvent) -> Result<(), LifecycleError> {
        if !self.labels_match(&event.labels) {
            debug!(run_url = %event.run_url, "required labels not present, ignoring event");
            return Ok(());
        }

        match event.action {
            JobAction::Queued => self.process_queued(event).await,
            JobAction::Completed => self.process_completed(event).await,
            JobAction::Other => {
                debug!(run_url = %event.run_url, "event action not handled");
                Ok(())
            }
        }
    }

    /// An empty required set accepts every job; otherwise the event must
    /// carry at least one of the required labels.
    fn labels_match(&self, job_labels: &[String]) -> bool {
        if self.config.required_labels.is_empty() {
            return true;
        }

        self.config
            .required_labels
            .iter()
            .any(|required| job_labels.contains(required))
    }

    async fn process_queued(&self, event: &JobEvent) -> Result<(), LifecycleError> {
        let name = event.runner_name();
        info!(
            runner = %name,
            job_id = event.job_id,
            run_id = event.run_id,
            "processing queued action"
        );

        let host = self.allocator.assign(&name).inspect_err(|err| {
            warn!(runner = %name, error = %err, "failed to assign host to runner")
        })?;

        let client = self.connector.connect(&host).inspect_err(|err| {
            warn!(host = %host, error = %err, "failed to construct backend client")
        })?;

        // create happens in its own scope so the client is closed on every
        // exit path before the error (if any) propagates
        let result = self.create_instance(client.as_ref(), &name, event).await;
        close_client(client.as_ref(), &host).await;

        result
    }

    async fn create_instance(
        &self,
        client: &dyn BackendClient,
        name: &str,
        event: &JobEvent,
    ) -> Result<(), LifecycleError> {
        let spec = bootstrap::build(&BootstrapParams {
            name,
            api_token: &self.config.api_token,
            ssh_public_key: &self.config.ssh_public_key,
            owner: &self.config.owner,
            repo: &self.config.repo,
            labels: &event.labels,
        })
        .inspect_err(|err| warn!(runner = %name, error = %err, "failed to build instance spec"))?;

        debug!(runner = %name, "creating instance");

        let created = client.create(&spec).await.inspect_err(|err| {
            // the allocator assignment stays behind; the matching completed
            // event will find no instances and be acknowledged as benign
            warn!(runner = %name, error = %err, "failed to create instance")
        })?;

        info!(runner = %name, uid = %created.uid, "created instance");

        Ok(())
    }

    async fn process_completed(&self, event: &JobEvent) -> Result<(), LifecycleError> {
        let name = event.runner_name();
        info!(
            runner = %name,
            job_id = event.job_id,
            run_id = event.run_id,
            "processing completed action"
        );

        let host = self.allocator.lookup(&name).inspect_err(|err| {
            warn!(runner = %name, error = %err, "failed to look up host for runner")
        })?;

        let client = self.connector.connect(&host).inspect_err(|err| {
            warn!(host = %host, error = %err, "failed to construct backend client")
        })?;

        let result = self.delete_instance(client.as_ref(), &name, &host).await;
        close_client(client.as_ref(), &host).await;

        if result? {
            self.allocator.unassign(&name);
        }

        Ok(())
    }

    /// Delete the instance recorded under `name`, returning whether a
    /// deletion actually happened.
    ///
    /// Zero matches means the VM is already gone (or was never created
    /// because an earlier create failed after assignment) and is not an
    /// error. The allocator entry is deliberately left in place in that
    /// case, matching the behavior callers already depend on.
    async fn delete_instance(
        &self,
        client: &dyn BackendClient,
        name: &str,
        host: &str,
    ) -> Result<bool, LifecycleError> {
        debug!(runner = %name, host = %host, namespace = NAMESPACE, "looking up instance");

        let instances = client.list(name, NAMESPACE).await.inspect_err(|err| {
            warn!(runner = %name, host = %host, error = %err, "failed to list instances")
        })?;

        if instances.is_empty() {
            debug!(runner = %name, host = %host, "no instances found, nothing to delete");
            return Ok(false);
        }

        if instances.len() > 1 {
            // runner names are derived from job identity and should be
            // unique per execution; surface it loudly when they are not
            warn!(
                runner = %name,
                host = %host,
                count = instances.len(),
                "multiple instances match runner name, deleting the first"
            );
        }

        let uid = &instances[0].uid;
        debug!(runner = %name, uid = %uid, "deleting instance");

        client.delete(uid).await.inspect_err(|err| {
            // assignment stays intact so a redelivered webhook can retry
            warn!(runner = %name, uid = %uid, error = %err, "failed to delete instance")
        })?;

        info!(runner = %name, uid = %uid, "deleted instance");

        Ok(true)
    }
}

async fn close_client(client: &dyn BackendClient, host: &str) {
    if let Err(err) = client.close().await {
        // the response is already decided by now, so only log
        warn!(host = %host, error = %err, "failed to close connection to backend host");
    }
}
