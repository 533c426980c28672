//! Runtime settings for the `serve` and `render` commands
//!
//! Every flag has an environment fallback so the service can be configured
//! from a Deployment manifest alone.

use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::Args;
use tracing::warn;

use crate::ue::UeId;
use crate::upf::UpfSpec;
use crate::{DEFAULT_HTTP_PORT, DEFAULT_NAMESPACE, DEFAULT_UE_IMAGE, DEFAULT_UPF_IMAGE};

/// Replica count used when `UPF_REPLICAS` is missing or unparseable
pub const DEFAULT_UPF_REPLICAS: u32 = 1;

/// Number of UEs touched by the bulk triggers
pub const DEFAULT_BULK_COUNT: u32 = 100;

/// `serve` command arguments
#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to
    #[arg(long, env = "BIND_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind the HTTP server to
    #[arg(long, env = "BIND_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub port: u16,

    /// Namespace for every UE and UPF object
    #[arg(long, env = "NEXSLICE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// Directory holding one `ue<N>.yaml` per provisioned UE
    #[arg(long, env = "UE_CONFIG_DIR", default_value = "./ue-configs")]
    pub config_dir: PathBuf,

    /// UPF container image
    #[arg(long, env = "UPF_IMAGE", default_value = DEFAULT_UPF_IMAGE)]
    pub upf_image: String,

    /// Replicas per UPF Deployment
    ///
    /// Kept as raw text: an unparseable value falls back to 1 instead of
    /// refusing to start.
    #[arg(long = "upf-replicas", env = "UPF_REPLICAS")]
    pub upf_replicas_raw: Option<String>,

    /// UERANSIM UE container image
    #[arg(long, env = "UE_IMAGE", default_value = DEFAULT_UE_IMAGE)]
    pub ue_image: String,

    /// Skip all cluster calls; only local configuration files are written
    #[arg(
        long,
        env = "DEMO_MODE",
        value_parser = BoolishValueParser::new(),
        default_value_t = false,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub demo_mode: bool,

    /// Webhook receiving DNN to UPF mappings; notifications are off when unset
    #[arg(long, env = "SMF_WEBHOOK_URL")]
    pub smf_webhook_url: Option<String>,

    /// How many UEs the bulk triggers provision or remove
    #[arg(long, env = "BULK_COUNT", default_value_t = DEFAULT_BULK_COUNT)]
    pub bulk_count: u32,

    /// Emit logs as JSON lines
    #[arg(
        long,
        env = "LOG_JSON",
        value_parser = BoolishValueParser::new(),
        default_value_t = false,
        num_args = 0..=1,
        default_missing_value = "true"
    )]
    pub log_json: bool,
}

impl ServeArgs {
    /// UPF replica count, falling back to 1 on a bad value
    pub fn upf_replicas(&self) -> u32 {
        upf_replicas(self.upf_replicas_raw.as_deref())
    }

    /// UPF settings applied to every provision
    pub fn upf_spec(&self) -> UpfSpec {
        UpfSpec::new(self.upf_image.clone(), self.upf_replicas())
    }

    /// `host:port` to listen on
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// SMF webhook URL, treating an empty value as unset
    pub fn smf_url(&self) -> Option<&str> {
        self.smf_webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }
}

/// `render` command arguments
///
/// Shares the object-shaping settings of [`ServeArgs`] so a rendered manifest
/// matches what the server would create.
#[derive(Args, Clone, Debug)]
pub struct RenderArgs {
    /// UE id to render
    pub id: UeId,

    /// Target namespace
    #[arg(long, env = "NEXSLICE_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    /// UERANSIM UE container image
    #[arg(long, env = "UE_IMAGE", default_value = DEFAULT_UE_IMAGE)]
    pub ue_image: String,

    /// UPF container image
    #[arg(long, env = "UPF_IMAGE", default_value = DEFAULT_UPF_IMAGE)]
    pub upf_image: String,

    /// Replicas per UPF Deployment
    #[arg(long = "upf-replicas", env = "UPF_REPLICAS")]
    pub upf_replicas_raw: Option<String>,
}

impl RenderArgs {
    /// UPF settings, with the same replica fallback as `serve`
    pub fn upf_spec(&self) -> UpfSpec {
        UpfSpec::new(
            self.upf_image.clone(),
            upf_replicas(self.upf_replicas_raw.as_deref()),
        )
    }
}

/// Parse a raw `UPF_REPLICAS` value, falling back to 1 when missing or bad
pub fn upf_replicas(raw: Option<&str>) -> u32 {
    match raw.map(str::trim) {
        None | Some("") => DEFAULT_UPF_REPLICAS,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(value = %raw, "invalid UPF_REPLICAS, using {DEFAULT_UPF_REPLICAS}");
            DEFAULT_UPF_REPLICAS
        }),
    }
}
