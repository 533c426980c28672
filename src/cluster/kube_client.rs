//! kube-rs backed [`ClusterClient`]

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment as K8sDeployment;
use k8s_openapi::api::core::v1::{
    ConfigMap as K8sConfigMap, Pod as K8sPod, Service as K8sService,
};
use kube::api::{Api, DeleteParams, ListParams, PostParams};
use kube::{Client, Config, Resource};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use super::ClusterClient;
use crate::upf::UPF_SELECTOR;
use crate::workload::{to_k8s, ConfigMap, Deployment, Pod, Service};
use crate::Error;

/// Default connection timeout for the kube client
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for the kube client
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Real Kubernetes client scoped to one namespace
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
    namespace: String,
}

impl KubeClusterClient {
    /// Wrap an existing kube client
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    /// Infer cluster configuration (in-cluster or kubeconfig) and connect
    pub async fn connect(namespace: impl Into<String>) -> Result<Self, Error> {
        let mut config = Config::infer()
            .await
            .map_err(|e| Error::config(format!("failed to infer kube config: {e}")))?;
        config.connect_timeout = Some(DEFAULT_CONNECT_TIMEOUT);
        config.read_timeout = Some(DEFAULT_READ_TIMEOUT);
        let client = Client::try_from(config)?;
        Ok(Self::new(client, namespace))
    }

    /// Namespace all objects are created in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn api<K>(&self) -> Api<K>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), &self.namespace)
    }

    async fn create<S, K>(&self, resource: &S, name: &str) -> Result<(), Error>
    where
        S: Serialize + Sync,
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + Debug
            + Serialize
            + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        let object: K = to_k8s(resource)?;
        self.api::<K>()
            .create(&PostParams::default(), &object)
            .await?;
        info!(
            kind = %K::kind(&Default::default()),
            name = %name,
            namespace = %self.namespace,
            "created"
        );
        Ok(())
    }

    async fn delete<K>(&self, name: &str) -> Result<(), Error>
    where
        K: Resource<Scope = k8s_openapi::NamespaceResourceScope>
            + Clone
            + Debug
            + DeserializeOwned,
        <K as Resource>::DynamicType: Default,
    {
        let kind = K::kind(&Default::default()).to_string();
        match self.api::<K>().delete(name, &DeleteParams::default()).await {
            Ok(_) => {
                info!(kind = %kind, name = %name, namespace = %self.namespace, "deleted");
                Ok(())
            }
            Err(kube::Error::Api(ae)) if ae.code == 404 => {
                debug!(kind = %kind, name = %name, "already absent");
                Err(Error::not_found(format!("{kind} {}/{name}", self.namespace)))
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_pod(&self, pod: &Pod) -> Result<(), Error> {
        self.create::<_, K8sPod>(pod, &pod.metadata.name).await
    }

    async fn delete_pod(&self, name: &str) -> Result<(), Error> {
        self.delete::<K8sPod>(name).await
    }

    async fn create_config_map(&self, config_map: &ConfigMap) -> Result<(), Error> {
        self.create::<_, K8sConfigMap>(config_map, &config_map.metadata.name)
            .await
    }

    async fn delete_config_map(&self, name: &str) -> Result<(), Error> {
        self.delete::<K8sConfigMap>(name).await
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<(), Error> {
        self.create::<_, K8sDeployment>(deployment, &deployment.metadata.name)
            .await
    }

    async fn delete_deployment(&self, name: &str) -> Result<(), Error> {
        self.delete::<K8sDeployment>(name).await
    }

    async fn create_service(&self, service: &Service) -> Result<(), Error> {
        self.create::<_, K8sService>(service, &service.metadata.name)
            .await
    }

    async fn delete_service(&self, name: &str) -> Result<(), Error> {
        self.delete::<K8sService>(name).await
    }

    async fn count_upf_workloads(&self) -> Result<usize, Error> {
        let deployments = self
            .api::<K8sDeployment>()
            .list(&ListParams::default().labels(UPF_SELECTOR))
            .await?;
        Ok(deployments.items.len())
    }
}
