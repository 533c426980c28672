//! Prometheus gauges for active UEs and UPFs
//!
//! The lifecycle manager pushes fresh values into a [`MetricsSink`] after
//! every provision/decommission; [`Gauges`] keeps them and renders the text
//! exposition format for the pull endpoint.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};

/// Metric name of the active-UE gauge
pub const ACTIVE_UES: &str = "nexslice_active_ues";
/// Metric name of the active-UPF gauge
pub const ACTIVE_UPFS: &str = "nexslice_active_upfs";

/// Sink receiving recomputed gauge values
pub trait MetricsSink: Send + Sync {
    /// Set the number of UEs with a persisted configuration
    fn set_active_ues(&self, count: u64);

    /// Set the number of running UPF workloads
    fn set_active_upfs(&self, count: u64);
}

/// In-process gauge pair
#[derive(Debug, Default)]
pub struct Gauges {
    active_ues: AtomicU64,
    active_upfs: AtomicU64,
}

impl Gauges {
    /// Create gauges starting at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Current active-UE value
    pub fn active_ues(&self) -> u64 {
        self.active_ues.load(Ordering::Relaxed)
    }

    /// Current active-UPF value
    pub fn active_upfs(&self) -> u64 {
        self.active_upfs.load(Ordering::Relaxed)
    }

    /// Render both gauges in the Prometheus text exposition format
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (name, help, value) in [
            (ACTIVE_UES, "Number of provisioned UEs", self.active_ues()),
            (ACTIVE_UPFS, "Number of per-UE UPF workloads", self.active_upfs()),
        ] {
            let _ = writeln!(out, "# HELP {name} {help}");
            let _ = writeln!(out, "# TYPE {name} gauge");
            let _ = writeln!(out, "{name} {value}");
        }
        out
    }
}

impl MetricsSink for Gauges {
    fn set_active_ues(&self, count: u64) {
        self.active_ues.store(count, Ordering::Relaxed);
    }

    fn set_active_upfs(&self, count: u64) {
        self.active_upfs.store(count, Ordering::Relaxed);
    }
}

/// Content type of the text exposition format
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gauges_start_at_zero() {
        let gauges = Gauges::new();
        assert_eq!(gauges.active_ues(), 0);
        assert_eq!(gauges.active_upfs(), 0);
    }

    #[test]
    fn gauges_are_overwritten_not_accumulated() {
        let gauges = Gauges::new();
        gauges.set_active_ues(5);
        gauges.set_active_ues(2);
        gauges.set_active_upfs(7);

        assert_eq!(gauges.active_ues(), 2);
        assert_eq!(gauges.active_upfs(), 7);
    }

    #[test]
    fn renders_text_exposition_format() {
        let gauges = Gauges::new();
        gauges.set_active_ues(3);
        gauges.set_active_upfs(1);

        let text = gauges.render();
        assert!(text.contains("# TYPE nexslice_active_ues gauge\nnexslice_active_ues 3\n"));
        assert!(text.contains("# TYPE nexslice_active_upfs gauge\nnexslice_active_upfs 1\n"));
        assert_eq!(text.lines().filter(|l| l.starts_with("# HELP")).count(), 2);
    }
}
