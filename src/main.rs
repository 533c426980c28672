//! Nexslice - per-UE network slice provisioner

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use nexslice::api::{router, ApiState};
use nexslice::cluster::{ClusterClient, DemoClusterClient, KubeClusterClient};
use nexslice::config::{RenderArgs, ServeArgs};
use nexslice::lifecycle::LifecycleManager;
use nexslice::manifest::render_manifests;
use nexslice::metrics::Gauges;
use nexslice::smf::{DisabledSmfNotifier, HttpSmfNotifier, SmfNotifier};
use nexslice::store::{ArtifactStore, FileArtifactStore};

/// Nexslice - provisions one UERANSIM UE and one dedicated UPF per subscriber
#[derive(Parser, Debug)]
#[command(name = "nexslice", version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP trigger server (default mode)
    Serve(ServeArgs),

    /// Print the Kubernetes objects for one UE as YAML and exit
    Render(RenderArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Render(args)) => run_render(args),
        Some(Commands::Serve(args)) => run_serve(args).await,
        None => run_serve(cli.serve).await,
    }
}

fn init_tracing(json: bool) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,nexslice=debug,kube=info,tower=warn,hyper=warn"));

    let json_layer = json.then(|| fmt::layer().json().with_current_span(true).with_target(true));
    let text_layer = (!json).then(fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))
}

/// Print the objects a provision run would create
fn run_render(args: RenderArgs) -> anyhow::Result<()> {
    let yaml = render_manifests(args.id, &args.namespace, &args.ue_image, &args.upf_spec())
        .map_err(|e| anyhow::anyhow!("Failed to render manifests: {}", e))?;
    print!("{yaml}");
    Ok(())
}

/// Run the HTTP trigger server until Ctrl-C/SIGTERM
async fn run_serve(args: ServeArgs) -> anyhow::Result<()> {
    init_tracing(args.log_json)?;

    let store: Arc<dyn ArtifactStore> = Arc::new(FileArtifactStore::new(&args.config_dir));

    let cluster: Arc<dyn ClusterClient> = if args.demo_mode {
        info!("Demo mode enabled, no cluster calls will be made");
        Arc::new(DemoClusterClient::new(store.clone()))
    } else {
        let client = KubeClusterClient::connect(args.namespace.clone())
            .await
            .map_err(|e| anyhow::anyhow!("Failed to connect to Kubernetes: {}", e))?;
        Arc::new(client)
    };

    let smf: Arc<dyn SmfNotifier> = match args.smf_url() {
        Some(url) => {
            info!(url = %url, "SMF notifications enabled");
            Arc::new(HttpSmfNotifier::new(url)?)
        }
        None => Arc::new(DisabledSmfNotifier),
    };

    let gauges = Arc::new(Gauges::new());
    let manager = LifecycleManager::builder(store, cluster)
        .namespace(args.namespace.clone())
        .ue_image(args.ue_image.clone())
        .default_upf(args.upf_spec())
        .smf_notifier(smf)
        .metrics(gauges.clone())
        .build();

    // Seed the gauges from whatever already exists
    manager.refresh_metrics().await;

    let state = ApiState::new(Arc::new(manager), gauges, args.bulk_count);
    let app = router(Arc::new(state));

    let addr = args.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind {}: {}", addr, e))?;
    info!(
        addr = %addr,
        namespace = %args.namespace,
        config_dir = %args.config_dir.display(),
        demo_mode = args.demo_mode,
        "Nexslice listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
