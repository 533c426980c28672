//! UPF resource builder
//!
//! Each UE gets a dedicated user-plane function: a Deployment and a Service
//! that share the name `upf-ue<id>`. The Service selects the Deployment's pods
//! through the `{app: upf, ue-id: <id>}` labels and exposes the two fixed UDP
//! ports the SMF and the gNB talk to.

use std::collections::BTreeMap;

use crate::ue::UeId;
use crate::workload::{
    Container, ContainerPort, Deployment, DeploymentSpec, LabelSelector, ObjectMeta, PodMeta,
    PodSpec, PodTemplateSpec, ResourceQuantity, ResourceRequirements, SecurityContext, Service,
    ServicePort, ServiceSpec, LABEL_APP, LABEL_UE_ID,
};

/// GTP-U user-plane port
pub const GTPU_PORT: u16 = 2152;
/// PFCP control port (N4)
pub const PFCP_PORT: u16 = 8805;
/// Role label value for UPF workloads
pub const UPF_APP: &str = "upf";
/// Label selector matching every UPF workload
pub const UPF_SELECTOR: &str = "app=upf";

/// Name shared by the UPF Deployment and Service, `upf-ue<id>`
pub fn upf_name(id: UeId) -> String {
    format!("upf-ue{id}")
}

/// Image and scale of the per-UE UPF
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpfSpec {
    /// Container image reference
    pub image: String,
    /// Replica count; zero is passed through
    pub replicas: u32,
}

impl UpfSpec {
    /// Create a UPF spec
    pub fn new(image: impl Into<String>, replicas: u32) -> Self {
        Self {
            image: image.into(),
            replicas,
        }
    }
}

/// The Deployment/Service pair for one UE
#[derive(Clone, Debug, PartialEq)]
pub struct UpfResources {
    /// UPF Deployment
    pub deployment: Deployment,
    /// UPF Service, same name as the Deployment
    pub service: Service,
}

/// Builder for the per-UE UPF pair
#[derive(Clone, Debug)]
pub struct UpfResourceBuilder {
    namespace: String,
}

impl UpfResourceBuilder {
    /// Create a builder targeting `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
        }
    }

    /// Build the Deployment and Service for a UE
    pub fn build(&self, id: UeId, spec: &UpfSpec) -> UpfResources {
        let name = upf_name(id);
        let labels = Self::labels(id);
        UpfResources {
            deployment: self.deployment(&name, &labels, spec),
            service: self.service(&name, &labels),
        }
    }

    fn labels(id: UeId) -> BTreeMap<String, String> {
        BTreeMap::from([
            (LABEL_APP.to_string(), UPF_APP.to_string()),
            (LABEL_UE_ID.to_string(), id.to_string()),
        ])
    }

    fn deployment(
        &self,
        name: &str,
        labels: &BTreeMap<String, String>,
        spec: &UpfSpec,
    ) -> Deployment {
        let container = Container {
            name: UPF_APP.to_string(),
            image: spec.image.clone(),
            command: None,
            args: None,
            ports: vec![
                ContainerPort {
                    name: Some("gtpu".to_string()),
                    container_port: GTPU_PORT,
                    protocol: Some("UDP".to_string()),
                },
                ContainerPort {
                    name: Some("pfcp".to_string()),
                    container_port: PFCP_PORT,
                    protocol: Some("UDP".to_string()),
                },
            ],
            resources: Some(ResourceRequirements {
                requests: Some(ResourceQuantity {
                    cpu: Some("100m".to_string()),
                    memory: Some("128Mi".to_string()),
                }),
                limits: Some(ResourceQuantity {
                    cpu: Some("500m".to_string()),
                    memory: Some("512Mi".to_string()),
                }),
            }),
            security_context: Some(SecurityContext::net_admin()),
            volume_mounts: vec![],
        };

        Deployment {
            api_version: "apps/v1".to_string(),
            kind: "Deployment".to_string(),
            metadata: ObjectMeta::new(name, &self.namespace).with_labels(labels),
            spec: DeploymentSpec {
                replicas: spec.replicas,
                selector: LabelSelector {
                    match_labels: labels.clone(),
                },
                template: PodTemplateSpec {
                    metadata: PodMeta {
                        labels: labels.clone(),
                    },
                    spec: PodSpec {
                        containers: vec![container],
                        volumes: vec![],
                        restart_policy: None,
                    },
                },
            },
        }
    }

    fn service(&self, name: &str, labels: &BTreeMap<String, String>) -> Service {
        let port = |port_name: &str, port: u16| ServicePort {
            name: Some(port_name.to_string()),
            port,
            target_port: Some(port),
            protocol: Some("UDP".to_string()),
        };

        Service {
            api_version: "v1".to_string(),
            kind: "Service".to_string(),
            metadata: ObjectMeta::new(name, &self.namespace).with_labels(labels),
            spec: ServiceSpec {
                selector: labels.clone(),
                ports: vec![port("gtpu", GTPU_PORT), port("pfcp", PFCP_PORT)],
                type_: Some("ClusterIP".to_string()),
            },
        }
    }
}
