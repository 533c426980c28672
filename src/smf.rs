//! SMF notification of per-UE user-plane mappings
//!
//! When a UE is provisioned, the session-management function is told which
//! UPF serves the UE's DNN. The call is best-effort: a failure is reported to
//! the caller and logged but never retried, and it never blocks the rest of
//! provisioning.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

#[cfg(test)]
use mockall::automock;

use crate::ue::{dnn_name, UeId};
use crate::upf::{upf_name, PFCP_PORT};
use crate::Error;

/// Upper bound on one SMF call
pub const SMF_TIMEOUT: Duration = Duration::from_secs(5);

/// Number of distinct `/24` pools in `10.100.0.0` through `10.255.255.0`
///
/// Ids that differ by a multiple of this share a pool. Nothing reserves pools
/// across UEs, so the same holds as for id allocation: operators running more
/// UEs than this must partition the address space themselves.
pub const IP_POOL_COUNT: u32 = 256 * 156;

/// S-NSSAI the UE's session uses
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SliceSelector {
    /// Slice/service type
    pub sst: u8,
    /// Slice differentiator
    pub sd: u32,
}

/// DNN to UPF mapping announced to the SMF
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmfMapping {
    /// Data network name
    pub dnn: String,
    /// In-cluster FQDN of the UPF service
    pub upf_fqdn: String,
    /// PFCP port on the UPF
    pub upf_port: u16,
    /// UE address pool served by the UPF, repeating every [`IP_POOL_COUNT`] ids
    pub ip_range: String,
    /// Slice the session belongs to
    pub slice_selector: SliceSelector,
}

impl SmfMapping {
    /// Derive the mapping for a UE whose UPF lives in `namespace`
    pub fn for_ue(id: UeId, namespace: &str) -> Self {
        let n = id.get();
        let pool = n % IP_POOL_COUNT;
        Self {
            dnn: dnn_name(id),
            upf_fqdn: format!("{}.{namespace}.svc.cluster.local", upf_name(id)),
            upf_port: PFCP_PORT,
            ip_range: format!("10.{}.{}.0/24", 100 + pool / 256, pool % 256),
            slice_selector: SliceSelector {
                sst: crate::ue::config::SST,
                sd: n,
            },
        }
    }
}

/// Trait abstracting delivery of mappings to the SMF
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SmfNotifier: Send + Sync {
    /// Announce a mapping; an error means the SMF did not acknowledge it
    async fn notify(&self, mapping: &SmfMapping) -> Result<(), Error>;
}

/// Notifier that POSTs the mapping as JSON to a webhook URL
#[derive(Clone, Debug)]
pub struct HttpSmfNotifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpSmfNotifier {
    /// Create a notifier for `url` with the fixed [`SMF_TIMEOUT`]
    pub fn new(url: impl Into<String>) -> Result<Self, Error> {
        Self::with_timeout(url, SMF_TIMEOUT)
    }

    /// Create a notifier with a custom timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::smf(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
            timeout,
        })
    }

    /// Webhook URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

fn is_accepted(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::OK | StatusCode::CREATED | StatusCode::NO_CONTENT
    )
}

#[async_trait]
impl SmfNotifier for HttpSmfNotifier {
    async fn notify(&self, mapping: &SmfMapping) -> Result<(), Error> {
        let response = self
            .client
            .post(&self.url)
            .json(mapping)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::smf(format!("timed out after {:?}", self.timeout))
                } else {
                    Error::smf(e.to_string())
                }
            })?;

        let status = response.status();
        if !is_accepted(status) {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::smf(format!("SMF answered {status}: {body}")));
        }

        info!(dnn = %mapping.dnn, upf = %mapping.upf_fqdn, "SMF acknowledged UPF mapping");
        Ok(())
    }
}

/// Notifier used when no SMF webhook is configured
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledSmfNotifier;

#[async_trait]
impl SmfNotifier for DisabledSmfNotifier {
    async fn notify(&self, mapping: &SmfMapping) -> Result<(), Error> {
        debug!(dnn = %mapping.dnn, "no SMF webhook configured, skipping notification");
        Ok(())
    }
}
