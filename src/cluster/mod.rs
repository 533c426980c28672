//! Cluster capability used by the lifecycle manager
//!
//! The lifecycle manager never talks to the API server directly. It is handed
//! a [`ClusterClient`] at construction:
//! - [`KubeClusterClient`]: real create/delete calls through kube-rs
//! - [`DemoClusterClient`]: no cluster calls at all, the UPF count mirrors the
//!   locally persisted UEs
//!
//! Picking one of the two at startup is the whole of "demo mode"; the
//! lifecycle code path is identical for both.

mod demo;
mod kube_client;

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::workload::{ConfigMap, Deployment, Pod, Service};
use crate::Error;

pub use demo::DemoClusterClient;
pub use kube_client::KubeClusterClient;

/// Trait abstracting the namespaced Kubernetes operations the provisioner needs
///
/// Delete operations report an absent object as an error for which
/// [`Error::is_not_found`] holds, so callers can treat it as success.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create a UE pod
    async fn create_pod(&self, pod: &Pod) -> Result<(), Error>;

    /// Delete a pod by name
    async fn delete_pod(&self, name: &str) -> Result<(), Error>;

    /// Create a ConfigMap
    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), Error>;

    /// Delete a ConfigMap by name
    async fn delete_config_map(&self, name: &str) -> Result<(), Error>;

    /// Create a UPF Deployment
    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error>;

    /// Delete a Deployment by name
    async fn delete_deployment(&self, name: &str) -> Result<(), Error>;

    /// Create a UPF Service
    async fn create_service(&self, service: &Service) -> Result<(), Error>;

    /// Delete a Service by name
    async fn delete_service(&self, name: &str) -> Result<(), Error>;

    /// Number of UPF workloads (Deployments labelled `app=upf`)
    async fn count_upf_workloads(&self) -> Result<usize, Error>;
}
