//! Demo-mode [`ClusterClient`] that never touches a cluster

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::ClusterClient;
use crate::store::ArtifactStore;
use crate::workload::{ConfigMap, Deployment, Pod, Service};
use crate::Error;

/// Cluster client for demo mode
///
/// Every mutation succeeds without doing anything. The UPF count is
/// approximated by the number of UEs in the artifact store, since a real run
/// creates exactly one UPF per UE.
pub struct DemoClusterClient {
    store: Arc<dyn ArtifactStore>,
}

impl DemoClusterClient {
    /// Create a demo client approximating UPF counts from `store`
    pub fn new(store: Arc<dyn ArtifactStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ClusterClient for DemoClusterClient {
    async fn create_pod(&self, pod: &Pod) -> Result<(), Error> {
        debug!(name = %pod.metadata.name, "demo mode: skipping pod creation");
        Ok(())
    }

    async fn delete_pod(&self, name: &str) -> Result<(), Error> {
        debug!(name = %name, "demo mode: skipping pod deletion");
        Ok(())
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), Error> {
        debug!(name = %config_map.metadata.name, "demo mode: skipping configmap creation");
        Ok(())
    }

    async fn delete_config_map(&self, name: &str) -> Result<(), Error> {
        debug!(name = %name, "demo mode: skipping configmap deletion");
        Ok(())
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error> {
        debug!(name = %deployment.metadata.name, "demo mode: skipping deployment creation");
        Ok(())
    }

    async fn delete_deployment(&self, name: &str) -> Result<(), Error> {
        debug!(name = %name, "demo mode: skipping deployment deletion");
        Ok(())
    }

    async fn create_service(&self, service: &Service) -> Result<(), Error> {
        debug!(name = %service.metadata.name, "demo mode: skipping service creation");
        Ok(())
    }

    async fn delete_service(&self, name: &str) -> Result<(), Error> {
        debug!(name = %name, "demo mode: skipping service deletion");
        Ok(())
    }

    async fn count_upf_workloads(&self) -> Result<usize, Error> {
        Ok(self.store.list()?.len())
    }
}
