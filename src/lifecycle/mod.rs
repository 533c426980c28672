//! Ordered per-UE provisioning and teardown
//!
//! A [`LifecycleManager`] drives every step of a provision or decommission run
//! through its injected collaborators. Steps are independent: a failed step is
//! logged and recorded in the [`StepReport`] and the run moves on. Nothing a
//! collaborator returns escapes as an `Err`; only the allocator used by
//! [`LifecycleManager::provision_next`] can fail the call as a whole.

mod report;

pub use report::{BulkReport, Operation, Step, StepOutcome, StepReport, StepResult};

use std::ops::RangeInclusive;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::cluster::ClusterClient;
use crate::metrics::{Gauges, MetricsSink};
use crate::smf::{DisabledSmfNotifier, SmfMapping, SmfNotifier};
use crate::store::{next_id, ArtifactStore};
use crate::ue::{config_map_name, pod_name, UeId, UeResourceBuilder};
use crate::upf::{upf_name, UpfResourceBuilder, UpfSpec};
use crate::{Error, DEFAULT_NAMESPACE, DEFAULT_UE_IMAGE, DEFAULT_UPF_IMAGE};

/// Drives provision/decommission runs for individual UEs
pub struct LifecycleManager {
    store: Arc<dyn ArtifactStore>,
    cluster: Arc<dyn ClusterClient>,
    smf: Arc<dyn SmfNotifier>,
    metrics: Arc<dyn MetricsSink>,
    namespace: String,
    ue_builder: UeResourceBuilder,
    upf_builder: UpfResourceBuilder,
    default_upf: UpfSpec,
}

impl LifecycleManager {
    /// Create a builder around the two mandatory collaborators
    pub fn builder(
        store: Arc<dyn ArtifactStore>,
        cluster: Arc<dyn ClusterClient>,
    ) -> LifecycleManagerBuilder {
        LifecycleManagerBuilder::new(store, cluster)
    }

    /// Namespace every object is created in
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// UPF image and replica count used when the caller gives none
    pub fn default_upf(&self) -> &UpfSpec {
        &self.default_upf
    }

    /// Provision a UE and its dedicated UPF
    pub async fn provision(&self, id: UeId, upf: &UpfSpec) -> StepReport {
        let mut report = StepReport::new(id, Operation::Provision);
        let ue = self.ue_builder.build(id);
        let upf_resources = self.upf_builder.build(id, upf);

        self.run(&mut report, Step::WriteArtifact, async {
            self.store.write(&ue.artifact)
        })
        .await;
        self.run(
            &mut report,
            Step::CreateConfigMap,
            self.cluster.create_config_map(&ue.config_map),
        )
        .await;
        self.run(
            &mut report,
            Step::CreateUpfDeployment,
            self.cluster.create_deployment(&upf_resources.deployment),
        )
        .await;
        self.run(
            &mut report,
            Step::CreateUpfService,
            self.cluster.create_service(&upf_resources.service),
        )
        .await;

        let mapping = SmfMapping::for_ue(id, &self.namespace);
        self.run(&mut report, Step::NotifySmf, self.smf.notify(&mapping))
            .await;

        self.run(&mut report, Step::CreateUePod, self.cluster.create_pod(&ue.pod))
            .await;

        let outcome = self.refresh_metrics().await;
        report.record(Step::RefreshMetrics, outcome);

        self.log_completion(&report);
        report
    }

    /// Provision the next free id with the default UPF settings
    ///
    /// Fails only if the allocator cannot read the artifact store. Two
    /// concurrent calls may pick the same id.
    pub async fn provision_next(&self) -> Result<StepReport, Error> {
        let id = next_id(self.store.as_ref())?;
        debug!(ue_id = %id, "allocated UE id");
        Ok(self.provision(id, &self.default_upf).await)
    }

    /// Tear down everything belonging to a UE
    ///
    /// Objects that are already gone count as removed, so repeating the call
    /// is a successful no-op.
    pub async fn decommission(&self, id: UeId) -> StepReport {
        let mut report = StepReport::new(id, Operation::Decommission);

        let artifact = match self.store.delete(id) {
            Ok(true) => StepOutcome::Ok,
            Ok(false) => StepOutcome::NotFound,
            Err(e) => StepOutcome::Failed(e.to_string()),
        };
        self.record(&mut report, Step::DeleteArtifact, artifact);

        self.run(
            &mut report,
            Step::DeleteUePod,
            self.cluster.delete_pod(&pod_name(id)),
        )
        .await;
        self.run(
            &mut report,
            Step::DeleteConfigMap,
            self.cluster.delete_config_map(&config_map_name(id)),
        )
        .await;

        let upf = upf_name(id);
        self.run(
            &mut report,
            Step::DeleteUpfDeployment,
            self.cluster.delete_deployment(&upf),
        )
        .await;
        self.run(
            &mut report,
            Step::DeleteUpfService,
            self.cluster.delete_service(&upf),
        )
        .await;

        let outcome = self.refresh_metrics().await;
        report.record(Step::RefreshMetrics, outcome);

        self.log_completion(&report);
        report
    }

    /// Provision ids `1..=count` one after another, without rollback
    pub async fn bulk_provision(&self, count: u32) -> BulkReport {
        let mut bulk = BulkReport::default();
        for id in (1..=count).filter_map(UeId::new) {
            bulk.reports.push(self.provision(id, &self.default_upf).await);
        }
        info!(
            requested = count,
            succeeded = bulk.succeeded(),
            failed = bulk.failed(),
            "bulk provision finished"
        );
        bulk
    }

    /// Decommission every id in `range` one after another
    pub async fn bulk_decommission(&self, range: RangeInclusive<u32>) -> BulkReport {
        let mut bulk = BulkReport::default();
        for id in range.filter_map(UeId::new) {
            bulk.reports.push(self.decommission(id).await);
        }
        info!(
            succeeded = bulk.succeeded(),
            failed = bulk.failed(),
            "bulk decommission finished"
        );
        bulk
    }

    /// Ids of every UE with a persisted configuration, ascending
    pub fn active_ues(&self) -> Result<Vec<UeId>, Error> {
        Ok(self.store.list()?.into_iter().collect())
    }

    /// Recompute both gauges and push them to the metrics sink
    ///
    /// A gauge whose source cannot be read keeps its previous value.
    pub async fn refresh_metrics(&self) -> StepOutcome {
        let mut failures = Vec::new();

        match self.store.list() {
            Ok(ues) => self.metrics.set_active_ues(ues.len() as u64),
            Err(e) => failures.push(format!("active UEs: {e}")),
        }
        match self.cluster.count_upf_workloads().await {
            Ok(upfs) => self.metrics.set_active_upfs(upfs as u64),
            Err(e) => failures.push(format!("active UPFs: {e}")),
        }

        if failures.is_empty() {
            StepOutcome::Ok
        } else {
            let reason = failures.join("; ");
            warn!(error = %reason, "failed to refresh metrics");
            StepOutcome::Failed(reason)
        }
    }

    async fn run<F>(&self, report: &mut StepReport, step: Step, action: F)
    where
        F: std::future::Future<Output = Result<(), Error>>,
    {
        let outcome = StepOutcome::from_result(action.await);
        self.record(report, step, outcome);
    }

    fn record(&self, report: &mut StepReport, step: Step, outcome: StepOutcome) {
        match &outcome {
            StepOutcome::Ok => debug!(ue_id = %report.ue_id, step = %step, "step done"),
            StepOutcome::NotFound => {
                debug!(ue_id = %report.ue_id, step = %step, "already absent")
            }
            StepOutcome::Failed(reason) => {
                warn!(ue_id = %report.ue_id, step = %step, error = %reason, "step failed")
            }
        }
        report.record(step, outcome);
    }

    fn log_completion(&self, report: &StepReport) {
        let failed = report.failures().count();
        info!(
            ue_id = %report.ue_id,
            operation = ?report.operation,
            steps = report.steps.len(),
            failed,
            "UE lifecycle operation finished"
        );
    }
}

/// Builder for [`LifecycleManager`]
///
/// ```ignore
/// let manager = LifecycleManager::builder(store, cluster)
///     .namespace("nexslice")
///     .smf_notifier(Arc::new(HttpSmfNotifier::new(url)?))
///     .metrics(gauges.clone())
///     .build();
/// ```
pub struct LifecycleManagerBuilder {
    store: Arc<dyn ArtifactStore>,
    cluster: Arc<dyn ClusterClient>,
    smf: Option<Arc<dyn SmfNotifier>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    namespace: String,
    ue_image: String,
    default_upf: UpfSpec,
}

impl LifecycleManagerBuilder {
    fn new(store: Arc<dyn ArtifactStore>, cluster: Arc<dyn ClusterClient>) -> Self {
        Self {
            store,
            cluster,
            smf: None,
            metrics: None,
            namespace: DEFAULT_NAMESPACE.to_string(),
            ue_image: DEFAULT_UE_IMAGE.to_string(),
            default_upf: UpfSpec::new(DEFAULT_UPF_IMAGE, 1),
        }
    }

    /// Set the target namespace
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    /// Set the UERANSIM image for UE pods
    pub fn ue_image(mut self, image: impl Into<String>) -> Self {
        self.ue_image = image.into();
        self
    }

    /// Set the UPF settings used by bulk and next-id provisioning
    pub fn default_upf(mut self, spec: UpfSpec) -> Self {
        self.default_upf = spec;
        self
    }

    /// Set the SMF notifier (defaults to disabled)
    pub fn smf_notifier(mut self, smf: Arc<dyn SmfNotifier>) -> Self {
        self.smf = Some(smf);
        self
    }

    /// Set the metrics sink (defaults to a private gauge pair)
    pub fn metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Build the manager
    pub fn build(self) -> LifecycleManager {
        LifecycleManager {
            store: self.store,
            cluster: self.cluster,
            smf: self.smf.unwrap_or_else(|| Arc::new(DisabledSmfNotifier)),
            metrics: self.metrics.unwrap_or_else(|| Arc::new(Gauges::new())),
            ue_builder: UeResourceBuilder::new(self.namespace.clone(), self.ue_image),
            upf_builder: UpfResourceBuilder::new(self.namespace.clone()),
            namespace: self.namespace,
            default_upf: self.default_upf,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use crate::cluster::{DemoClusterClient, MockClusterClient};
    use crate::smf::MockSmfNotifier;
    use crate::store::MemoryArtifactStore;
    use crate::ue::config::render;
    use crate::workload::{ConfigMap, Deployment, Pod, Service};

    fn id(n: u32) -> UeId {
        UeId::new(n).unwrap()
    }

    fn upf() -> UpfSpec {
        UpfSpec::new("free5gc/upf:latest", 1)
    }

    fn forbidden() -> Error {
        Error::Kube(kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "deployments.apps is forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        }))
    }

    /// In-memory cluster that remembers which objects exist
    #[derive(Default)]
    struct FakeCluster {
        objects: Mutex<BTreeSet<(&'static str, String)>>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeCluster {
        fn has(&self, kind: &'static str, name: &str) -> bool {
            self.objects.lock().contains(&(kind, name.to_string()))
        }

        fn len(&self) -> usize {
            self.objects.lock().len()
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }

        fn add(&self, kind: &'static str, name: &str) -> Result<(), Error> {
            self.calls.lock().push(format!("create {kind}/{name}"));
            self.objects.lock().insert((kind, name.to_string()));
            Ok(())
        }

        fn remove(&self, kind: &'static str, name: &str) -> Result<(), Error> {
            self.calls.lock().push(format!("delete {kind}/{name}"));
            if self.objects.lock().remove(&(kind, name.to_string())) {
                Ok(())
            } else {
                Err(Error::not_found(format!("{kind} {name}")))
            }
        }
    }

    #[async_trait]
    impl ClusterClient for FakeCluster {
        async fn create_pod(&self, pod: &Pod) -> Result<(), Error> {
            self.add("Pod", &pod.metadata.name)
        }
        async fn delete_pod(&self, name: &str) -> Result<(), Error> {
            self.remove("Pod", name)
        }
        async fn create_config_map(&self, cm: &ConfigMap) -> Result<(), Error> {
            self.add("ConfigMap", &cm.metadata.name)
        }
        async fn delete_config_map(&self, name: &str) -> Result<(), Error> {
            self.remove("ConfigMap", name)
        }
        async fn create_deployment(&self, d: &Deployment) -> Result<(), Error> {
            self.add("Deployment", &d.metadata.name)
        }
        async fn delete_deployment(&self, name: &str) -> Result<(), Error> {
            self.remove("Deployment", name)
        }
        async fn create_service(&self, s: &Service) -> Result<(), Error> {
            self.add("Service", &s.metadata.name)
        }
        async fn delete_service(&self, name: &str) -> Result<(), Error> {
            self.remove("Service", name)
        }
        async fn count_upf_workloads(&self) -> Result<usize, Error> {
            Ok(self
                .objects
                .lock()
                .iter()
                .filter(|(kind, _)| *kind == "Deployment")
                .count())
        }
    }

    struct Harness {
        store: Arc<MemoryArtifactStore>,
        cluster: Arc<FakeCluster>,
        gauges: Arc<Gauges>,
        manager: LifecycleManager,
    }

    fn harness() -> Harness {
        let store = Arc::new(MemoryArtifactStore::new());
        let cluster = Arc::new(FakeCluster::default());
        let gauges = Arc::new(Gauges::new());
        let manager = LifecycleManager::builder(store.clone(), cluster.clone())
            .namespace("nexslice")
            .metrics(gauges.clone())
            .build();
        Harness {
            store,
            cluster,
            gauges,
            manager,
        }
    }

    // ==========================================================================
    // Story: a UE goes through a full provision/decommission cycle
    // ==========================================================================

    #[tokio::test]
    async fn story_full_cycle_for_first_ue() {
        let h = harness();

        let report = h.manager.provision(id(1), &upf()).await;
        assert!(report.is_success(), "{report:?}");
        assert_eq!(
            report.executed_steps(),
            vec![
                Step::WriteArtifact,
                Step::CreateConfigMap,
                Step::CreateUpfDeployment,
                Step::CreateUpfService,
                Step::NotifySmf,
                Step::CreateUePod,
                Step::RefreshMetrics,
            ]
        );

        assert!(h.store.get(id(1)).is_some());
        assert!(h.cluster.has("ConfigMap", "ue1-config"));
        assert!(h.cluster.has("Deployment", "upf-ue1"));
        assert!(h.cluster.has("Service", "upf-ue1"));
        assert!(h.cluster.has("Pod", "ueransim-ue1"));
        assert_eq!(h.cluster.len(), 4);
        assert_eq!(h.gauges.active_ues(), 1);
        assert_eq!(h.gauges.active_upfs(), 1);

        let report = h.manager.decommission(id(1)).await;
        assert!(report.is_success(), "{report:?}");
        assert_eq!(
            report.executed_steps(),
            vec![
                Step::DeleteArtifact,
                Step::DeleteUePod,
                Step::DeleteConfigMap,
                Step::DeleteUpfDeployment,
                Step::DeleteUpfService,
                Step::RefreshMetrics,
            ]
        );

        assert!(h.store.get(id(1)).is_none());
        assert_eq!(h.cluster.len(), 0);
        assert_eq!(h.gauges.active_ues(), 0);
        assert_eq!(h.gauges.active_upfs(), 0);
    }

    #[tokio::test]
    async fn config_map_is_created_before_the_pod_that_mounts_it() {
        let h = harness();
        h.manager.provision(id(3), &upf()).await;

        let calls = h.cluster.calls();
        let cm = calls.iter().position(|c| c == "create ConfigMap/ue3-config");
        let pod = calls.iter().position(|c| c == "create Pod/ueransim-ue3");
        assert!(cm.unwrap() < pod.unwrap());
    }

    // ==========================================================================
    // Story: decommission can be repeated safely
    // ==========================================================================

    #[tokio::test]
    async fn decommission_is_idempotent() {
        let h = harness();
        h.manager.provision(id(2), &upf()).await;

        let first = h.manager.decommission(id(2)).await;
        let second = h.manager.decommission(id(2)).await;

        assert!(first.is_success());
        assert!(second.is_success());
        for step in [
            Step::DeleteArtifact,
            Step::DeleteUePod,
            Step::DeleteConfigMap,
            Step::DeleteUpfDeployment,
            Step::DeleteUpfService,
        ] {
            assert_eq!(second.outcome(step), Some(&StepOutcome::NotFound));
        }
        assert_eq!(h.cluster.len(), 0);
        assert_eq!(h.gauges.active_ues(), 0);
    }

    #[tokio::test]
    async fn decommission_of_unknown_ue_succeeds() {
        let h = harness();
        let report = h.manager.decommission(id(42)).await;
        assert!(report.is_success());
        assert_eq!(
            report.outcome(Step::DeleteArtifact),
            Some(&StepOutcome::NotFound)
        );
    }

    // ==========================================================================
    // Story: one failing step does not stop the run
    // ==========================================================================

    #[tokio::test]
    async fn failing_upf_creation_still_creates_the_ue_pod() {
        let store = Arc::new(MemoryArtifactStore::new());
        let mut cluster = MockClusterClient::new();
        cluster
            .expect_create_config_map()
            .times(1)
            .returning(|_| Ok(()));
        cluster
            .expect_create_deployment()
            .times(1)
            .returning(|_| Err(forbidden()));
        cluster
            .expect_create_service()
            .withf(|s| s.metadata.name == "upf-ue5")
            .times(1)
            .returning(|_| Ok(()));
        cluster
            .expect_create_pod()
            .withf(|p| p.metadata.name == "ueransim-ue5")
            .times(1)
            .returning(|_| Ok(()));
        cluster.expect_count_upf_workloads().returning(|| Ok(0));

        let manager = LifecycleManager::builder(store.clone(), Arc::new(cluster)).build();
        let report = manager.provision(id(5), &upf()).await;

        assert!(!report.is_success());
        assert!(matches!(
            report.outcome(Step::CreateUpfDeployment),
            Some(StepOutcome::Failed(reason)) if reason.contains("forbidden")
        ));
        assert_eq!(report.outcome(Step::CreateUePod), Some(&StepOutcome::Ok));
        assert!(store.get(id(5)).is_some());
    }

    #[tokio::test]
    async fn decommission_attempts_service_even_when_deployment_delete_fails() {
        let mut cluster = MockClusterClient::new();
        cluster.expect_delete_pod().returning(|_| Ok(()));
        cluster.expect_delete_config_map().returning(|_| Ok(()));
        cluster
            .expect_delete_deployment()
            .returning(|_| Err(forbidden()));
        cluster
            .expect_delete_service()
            .withf(|name| name == "upf-ue8")
            .times(1)
            .returning(|_| Ok(()));
        cluster.expect_count_upf_workloads().returning(|| Ok(1));

        let manager =
            LifecycleManager::builder(Arc::new(MemoryArtifactStore::new()), Arc::new(cluster))
                .build();
        let report = manager.decommission(id(8)).await;

        assert_eq!(report.failures().count(), 1);
        assert_eq!(report.outcome(Step::DeleteUpfService), Some(&StepOutcome::Ok));
    }

    #[tokio::test]
    async fn smf_failure_is_recorded_but_not_fatal() {
        let store = Arc::new(MemoryArtifactStore::new());
        let cluster = Arc::new(FakeCluster::default());
        let mut smf = MockSmfNotifier::new();
        smf.expect_notify()
            .withf(|m| m.dnn == "dnn-ue4" && m.upf_fqdn == "upf-ue4.core.svc.cluster.local")
            .times(1)
            .returning(|_| Err(Error::smf("connection refused")));

        let manager = LifecycleManager::builder(store, cluster.clone())
            .namespace("core")
            .smf_notifier(Arc::new(smf))
            .build();
        let report = manager.provision(id(4), &upf()).await;

        assert!(matches!(
            report.outcome(Step::NotifySmf),
            Some(StepOutcome::Failed(_))
        ));
        assert!(cluster.has("Pod", "ueransim-ue4"));
        assert_eq!(report.failures().count(), 1);
    }

    // ==========================================================================
    // Story: demo mode never talks to a cluster
    // ==========================================================================

    #[tokio::test]
    async fn demo_mode_counts_local_artifacts() {
        let store = Arc::new(MemoryArtifactStore::new());
        store.write(&render(id(1))).unwrap();
        let gauges = Arc::new(Gauges::new());
        let manager =
            LifecycleManager::builder(store.clone(), Arc::new(DemoClusterClient::new(store.clone())))
                .metrics(gauges.clone())
                .build();

        let report = manager.provision(id(2), &upf()).await;

        assert!(report.is_success());
        assert_eq!(gauges.active_ues(), 2);
        assert_eq!(gauges.active_upfs(), 2);
        assert_eq!(manager.active_ues().unwrap(), vec![id(1), id(2)]);
    }

    // ==========================================================================
    // Allocation and bulk runs
    // ==========================================================================

    #[tokio::test]
    async fn provision_next_continues_after_highest_id() {
        let h = harness();
        for n in [1, 3, 7] {
            h.store.write(&render(id(n))).unwrap();
        }

        let report = h.manager.provision_next().await.unwrap();
        assert_eq!(report.ue_id, id(8));
        assert!(h.cluster.has("Pod", "ueransim-ue8"));
    }

    #[tokio::test]
    async fn bulk_runs_cover_the_range_in_order() {
        let h = harness();

        let created = h.manager.bulk_provision(3).await;
        assert_eq!(created.succeeded(), 3);
        assert_eq!(
            created.reports.iter().map(|r| r.ue_id).collect::<Vec<_>>(),
            vec![id(1), id(2), id(3)]
        );
        assert_eq!(h.gauges.active_ues(), 3);

        // 0 is not a valid id and is skipped
        let removed = h.manager.bulk_decommission(0..=3).await;
        assert_eq!(removed.reports.len(), 3);
        assert_eq!(removed.failed(), 0);
        assert_eq!(h.cluster.len(), 0);
        assert_eq!(h.gauges.active_ues(), 0);
    }

    #[tokio::test]
    async fn metrics_refresh_failure_keeps_previous_upf_value() {
        let mut cluster = MockClusterClient::new();
        cluster
            .expect_count_upf_workloads()
            .returning(|| Err(forbidden()));
        let gauges = Arc::new(Gauges::new());
        gauges.set_active_upfs(9);

        let manager =
            LifecycleManager::builder(Arc::new(MemoryArtifactStore::new()), Arc::new(cluster))
                .metrics(gauges.clone())
                .build();

        assert!(!manager.refresh_metrics().await.is_success());
        assert_eq!(gauges.active_upfs(), 9);
        assert_eq!(gauges.active_ues(), 0);
    }
}
