//! Instance spec construction
//!
//! Builds the full create request for one runner VM: the default shape from
//! `ignis-core` plus the two base64-encoded cloud-init documents. The
//! user-data document embeds the setup script with the API token spliced
//! in, so nothing in this module may log its inputs or intermediate
//! documents.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;
use thiserror::Error;

use ignis_core::spec::{InstanceSpec, NAMESPACE};

const SETUP_SCRIPT: &str = include_str!("../../scripts/runner-setup.sh");

const CLOUD_CONFIG_HEADER: &str = "#cloud-config\n";
const PLATFORM: &str = "ignis";

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("marshalling bootstrap data: {0}")]
    Marshal(#[from] serde_yaml::Error),
}

/// Inputs for one runner VM's bootstrap documents
pub struct BootstrapParams<'a> {
    /// Derived runner name; becomes instance id and hostname
    pub name: &'a str,
    /// GitHub PAT used to fetch a runner registration token
    pub api_token: &'a str,
    /// SSH public key for the root user; empty configures no key
    pub ssh_public_key: &'a str,
    pub owner: &'a str,
    pub repo: &'a str,
    /// Labels the runner registers with
    pub labels: &'a [String],
}

/// Build the backend create request for a runner VM.
///
/// Deterministic for a given set of inputs. The only failure mode is YAML
/// marshalling of the cloud-init documents, which indicates a packaging
/// defect rather than a runtime condition worth retrying.
pub fn build(params: &BootstrapParams<'_>) -> Result<InstanceSpec, BootstrapError> {
    let mut spec = InstanceSpec::default_shape(params.name);

    spec.metadata
        .insert("meta-data".to_string(), metadata_document(params.name)?);
    spec.metadata
        .insert("user-data".to_string(), userdata_document(params)?);

    Ok(spec)
}

#[derive(Serialize)]
struct InstanceMetadata {
    #[serde(rename = "instance-id")]
    instance_id: String,
    #[serde(rename = "local-hostname")]
    local_hostname: String,
    platform: String,
}

fn metadata_document(name: &str) -> Result<String, BootstrapError> {
    let metadata = InstanceMetadata {
        instance_id: format!("{NAMESPACE}/{name}"),
        local_hostname: name.to_string(),
        platform: PLATFORM.to_string(),
    };

    let doc = serde_yaml::to_string(&metadata)?;
    Ok(BASE64.encode(doc))
}

#[derive(Serialize)]
struct UserData {
    hostname: String,
    users: Vec<User>,
    final_message: String,
    bootcmd: Vec<String>,
    runcmd: Vec<String>,
}

#[derive(Serialize)]
struct User {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssh_authorized_keys: Option<Vec<String>>,
}

fn userdata_document(params: &BootstrapParams<'_>) -> Result<String, BootstrapError> {
    let script = SETUP_SCRIPT
        .replacen("REPLACE_PAT", params.api_token, 1)
        .replacen("REPLACE_ID", params.name, 1)
        .replacen("REPLACE_ORG_USER", params.owner, 1)
        .replacen("REPLACE_REPO", params.repo, 1)
        .replacen("REPLACE_LABELS", &params.labels.join(","), 1);

    let ssh_authorized_keys = if params.ssh_public_key.is_empty() {
        None
    } else {
        Some(vec![params.ssh_public_key.to_string()])
    };

    let userdata = UserData {
        hostname: params.name.to_string(),
        users: vec![User {
            name: "root".to_string(),
            ssh_authorized_keys,
        }],
        final_message: "The Ignis runner VM is good to go after $UPTIME seconds".to_string(),
        bootcmd: vec![
            "ln -sf /run/systemd/resolve/stub-resolv.conf /etc/resolv.conf".to_string(),
        ],
        runcmd: vec![script],
    };

    let doc = serde_yaml::to_string(&userdata)?;
    Ok(BASE64.encode(format!("{CLOUD_CONFIG_HEADER}{doc}")))
}
