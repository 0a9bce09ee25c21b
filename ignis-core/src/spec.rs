//! MicroVM create request and instance records
//!
//! These types form the wire contract with a backend host: the orchestrator
//! POSTs an [`InstanceSpec`] to create a runner VM, and the backend answers
//! list queries with [`Instance`] records keyed by an opaque `uid` it
//! assigned at creation time. Deletion is keyed by that uid, never by name.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Namespace all runner instances are created under.
///
/// A fixed logical grouping on the backend host, not a tenancy boundary.
pub const NAMESPACE: &str = "self-hosted";

/// Default kernel image for runner VMs
pub const KERNEL_IMAGE: &str = "ghcr.io/ignis-vm/firecracker-kernel-bin-arm:5.10.77";
/// Default kernel modules image for runner VMs
pub const MODULES_IMAGE: &str = "ghcr.io/ignis-vm/firecracker-kernel-modules:5.10.77";
/// Default OS image, with the actions runner agent preinstalled
pub const OS_IMAGE: &str = "ghcr.io/ignis-vm/action-runner-arm:2.303.0";

const KERNEL_FILENAME: &str = "boot/image";
const MODULES_MOUNT: &str = "/lib/modules/5.10.77";

/// Create request for one microVM
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSpec {
    /// Runner name; the backend treats this as the instance name
    pub id: String,

    /// Logical grouping on the host, see [`NAMESPACE`]
    pub namespace: String,

    pub vcpu: u32,
    pub memory_mb: u32,

    pub kernel: Kernel,
    pub root_volume: Volume,
    pub additional_volumes: Vec<Volume>,
    pub interfaces: Vec<NetworkInterface>,

    /// Cloud-init documents, base64-encoded, keyed "meta-data"/"user-data"
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Kernel {
    pub image: String,
    pub filename: String,
    pub add_network_config: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    pub is_read_only: bool,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mount_point: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkInterface {
    pub device_id: String,
    pub kind: InterfaceKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceKind {
    Macvtap,
    Tap,
}

impl InstanceSpec {
    /// The default runner VM shape: 2 vCPU / 2 GiB with the stock kernel,
    /// modules and actions-runner OS images. The caller fills in cloud-init
    /// metadata afterwards.
    pub fn default_shape(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            namespace: NAMESPACE.to_string(),
            vcpu: 2,
            memory_mb: 2048,
            kernel: Kernel {
                image: KERNEL_IMAGE.to_string(),
                filename: KERNEL_FILENAME.to_string(),
                add_network_config: true,
            },
            root_volume: Volume {
                id: "root".to_string(),
                is_read_only: false,
                image: OS_IMAGE.to_string(),
                mount_point: None,
            },
            additional_volumes: vec![Volume {
                id: "modules".to_string(),
                is_read_only: false,
                image: MODULES_IMAGE.to_string(),
                mount_point: Some(MODULES_MOUNT.to_string()),
            }],
            interfaces: vec![NetworkInterface {
                device_id: "eth1".to_string(),
                kind: InterfaceKind::Macvtap,
            }],
            metadata: HashMap::new(),
        }
    }
}

/// An instance record as reported by a backend host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    /// Opaque identifier assigned by the backend; the only valid delete key
    pub uid: String,
    pub name: String,
    pub namespace: String,
}

/// Response to a successful create call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedInstance {
    pub uid: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shape() {
        let spec = InstanceSpec::default_shape("runner-1");

        assert_eq!(spec.id, "runner-1");
        assert_eq!(spec.namespace, NAMESPACE);
        assert_eq!(spec.vcpu, 2);
        assert_eq!(spec.memory_mb, 2048);
        assert_eq!(spec.additional_volumes.len(), 1);
        assert_eq!(
            spec.additional_volumes[0].mount_point.as_deref(),
            Some(MODULES_MOUNT)
        );
        assert!(spec.metadata.is_empty());
    }

    #[test]
    fn test_spec_serializes_without_null_mount_point() {
        let spec = InstanceSpec::default_shape("runner-1");
        let json = serde_json::to_value(&spec).unwrap();

        // root volume has no mount point and must not serialize one
        assert!(json["root_volume"].get("mount_point").is_none());
        assert_eq!(json["interfaces"][0]["kind"], "macvtap");
    }
}
