//! Orchestrator configuration
//!
//! All values arrive via CLI flags or environment variables and are
//! validated once at startup; request handlers can assume a well-formed
//! config afterwards.

/// Runtime configuration for the orchestrator service
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend host addresses runners can be scheduled onto; at least one
    pub hosts: Vec<String>,

    /// GitHub PAT with repo scope, injected into runner bootstrap data
    pub api_token: String,

    /// SSH public key added to each runner VM; empty means no key
    pub ssh_public_key: String,

    /// Shared secret for webhook signature verification; `None` disables it
    pub webhook_secret: Option<String>,

    /// Labels a job must carry for this service to act on it; empty means
    /// every workflow job is accepted
    pub required_labels: Vec<String>,

    /// Repository owner (user or organisation) runners register against
    pub owner: String,

    /// Repository name runners register against
    pub repo: String,

    /// Address the webhook endpoint listens on
    pub bind_addr: String,
}

impl Config {
    /// Validates the configuration.
    ///
    /// Called once at startup; a failure here is fatal to the process, not
    /// to any individual webhook call.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.hosts.is_empty() {
            anyhow::bail!("at least one backend host is required");
        }

        if self.hosts.iter().any(|h| h.trim().is_empty()) {
            anyhow::bail!("backend host addresses cannot be empty");
        }

        if self.api_token.is_empty() {
            anyhow::bail!("api token cannot be empty");
        }

        if self.owner.is_empty() {
            anyhow::bail!("repository owner cannot be empty");
        }

        if self.repo.is_empty() {
            anyhow::bail!("repository name cannot be empty");
        }

        if self.bind_addr.is_empty() {
            anyhow::bail!("bind address cannot be empty");
        }

        Ok(())
    }
}
