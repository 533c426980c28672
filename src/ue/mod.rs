//! UE resource builder
//!
//! Turns a [`UeId`] into everything needed to run one simulated UE:
//! - the rendered UERANSIM configuration ([`config::render`])
//! - the ConfigMap holding it (`ue<id>-config`)
//! - the Pod running `nr-ue` against the mounted file (`ueransim-ue<id>`)
//!
//! All naming lives here so the create and delete paths can never disagree.

pub mod config;
mod id;

use std::collections::BTreeMap;

pub use config::UeConfigArtifact;
pub use id::UeId;

use crate::workload::{
    ConfigMap, ConfigMapVolumeSource, Container, ObjectMeta, Pod, PodSpec, SecurityContext,
    Volume, VolumeMount, LABEL_APP, LABEL_UE_ID,
};

/// Directory the ConfigMap is mounted at inside the UE pod
pub const CONFIG_MOUNT_PATH: &str = "/etc/ueransim";
/// ConfigMap data key holding the rendered configuration
pub const CONFIG_KEY: &str = "ue.yaml";
/// Role label value for UE pods
pub const UE_APP: &str = "ueransim-ue";

const CONFIG_VOLUME: &str = "ue-config";
const UE_CONTAINER: &str = "nr-ue";
const UE_BINARY: &str = "/ueransim/nr-ue";

/// Name of the UE pod, `ueransim-ue<id>`
pub fn pod_name(id: UeId) -> String {
    format!("ueransim-ue{id}")
}

/// Name of the ConfigMap holding the UE configuration, `ue<id>-config`
pub fn config_map_name(id: UeId) -> String {
    format!("ue{id}-config")
}

/// Local file name of the persisted configuration, `ue<id>.yaml`
pub fn artifact_file_name(id: UeId) -> String {
    format!("ue{id}.yaml")
}

/// Data network name routed to this UE's dedicated UPF
pub fn dnn_name(id: UeId) -> String {
    format!("dnn-ue{id}")
}

/// Parse a persisted artifact file name back into its id
///
/// Only names of the exact form `ue<digits>.yaml` with a positive id match.
/// The digits must be canonical (no leading zero) so every listed id maps back
/// to exactly the file [`artifact_file_name`] produces.
pub fn parse_artifact_file_name(name: &str) -> Option<UeId> {
    let digits = name.strip_prefix("ue")?.strip_suffix(".yaml")?;
    if digits.is_empty()
        || digits.starts_with('0')
        || !digits.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }
    digits.parse::<u32>().ok().and_then(UeId::new)
}

/// Everything the cluster needs for one UE
#[derive(Clone, Debug, PartialEq)]
pub struct UeResources {
    /// Rendered configuration (also persisted locally)
    pub artifact: UeConfigArtifact,
    /// ConfigMap carrying the configuration
    pub config_map: ConfigMap,
    /// Pod running the UE simulator
    pub pod: Pod,
}

/// Builder for the per-UE ConfigMap and Pod
#[derive(Clone, Debug)]
pub struct UeResourceBuilder {
    namespace: String,
    image: String,
}

impl UeResourceBuilder {
    /// Create a builder targeting `namespace` with the given UERANSIM image
    pub fn new(namespace: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            image: image.into(),
        }
    }

    /// Build the configuration, ConfigMap and Pod for a UE
    pub fn build(&self, id: UeId) -> UeResources {
        let artifact = config::render(id);
        let config_map = self.config_map(&artifact);
        let pod = self.pod(id);
        UeResources {
            artifact,
            config_map,
            pod,
        }
    }

    fn labels(id: UeId) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_APP.to_string(), UE_APP.to_string()),
            (LABEL_UE_ID.to_string(), id.to_string()),
        ])
    }

    fn config_map(&self, artifact: &UeConfigArtifact) -> ConfigMap {
        let metadata = ObjectMeta::new(config_map_name(artifact.id), &self.namespace)
            .with_labels(&Self::labels(artifact.id));
        ConfigMap {
            api_version: "v1".to_string(),
            kind: "ConfigMap".to_string(),
            metadata,
            data: BTreeMap::from([(CONFIG_KEY.to_string(), artifact.content.clone())]),
        }
    }

    fn pod(&self, id: UeId) -> Pod {
        let metadata =
            ObjectMeta::new(pod_name(id), &self.namespace).with_labels(&Self::labels(id));

        let container = Container {
            name: UE_CONTAINER.to_string(),
            image: self.image.clone(),
            command: Some(vec![UE_BINARY.to_string()]),
            args: Some(vec![
                "-c".to_string(),
                format!("{CONFIG_MOUNT_PATH}/{CONFIG_KEY}"),
            ]),
            ports: vec![],
            resources: None,
            security_context: Some(SecurityContext::net_admin()),
            volume_mounts: vec![VolumeMount {
                name: CONFIG_VOLUME.to_string(),
                mount_path: CONFIG_MOUNT_PATH.to_string(),
                read_only: Some(true),
            }],
        };

        Pod {
            api_version: "v1".to_string(),
            kind: "Pod".to_string(),
            metadata,
            spec: PodSpec {
                containers: vec![container],
                volumes: vec![Volume {
                    name: CONFIG_VOLUME.to_string(),
                    config_map: Some(ConfigMapVolumeSource {
                        name: config_map_name(id),
                    }),
                }],
                restart_policy: Some("Never".to_string()),
            },
        }
    }
}
