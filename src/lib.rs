//! Nexslice - per-UE network slice provisioner
//!
//! Every simulated UE gets its own UERANSIM pod, its own configuration and a
//! dedicated UPF (Deployment + Service) in a shared namespace, all derived
//! from a single positive integer id.
//!
//! # Modules
//!
//! - [`ue`] - UE ids, naming and the UERANSIM configuration/Pod builder
//! - [`upf`] - Per-UE UPF Deployment/Service builder
//! - [`workload`] - Serializable Kubernetes object shapes
//! - [`store`] - Local configuration artifacts and id allocation
//! - [`cluster`] - Cluster capability (kube-rs backed or demo no-op)
//! - [`smf`] - Best-effort SMF notification of UPF mappings
//! - [`metrics`] - Active UE/UPF gauges
//! - [`lifecycle`] - Ordered provision/decommission runs
//! - [`api`] - HTTP triggers
//! - [`manifest`] - Offline YAML rendering of a UE's objects
//! - [`config`] - Command-line and environment settings
//! - [`error`] - Error types

#![deny(missing_docs)]

pub mod api;
pub mod cluster;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod metrics;
pub mod smf;
pub mod store;
pub mod ue;
pub mod upf;
pub mod workload;

pub use error::Error;

// =============================================================================
// Default Configuration Constants
// =============================================================================

/// Namespace holding every UE and UPF object
pub const DEFAULT_NAMESPACE: &str = "nexslice";

/// Default UPF image
pub const DEFAULT_UPF_IMAGE: &str = "free5gc/upf:latest";

/// Default UERANSIM UE image
pub const DEFAULT_UE_IMAGE: &str = "towards5gs/ueransim-ue:v3.2.3";

/// Default port of the HTTP trigger server
pub const DEFAULT_HTTP_PORT: u16 = 5000;
