//! netallocd - private subnet allocator for container networks

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use netalloc::{
    build_info, serve, ApiServerConfig, AppState, Config, DockerRuntime, InMemoryRuntime,
    RuntimeGateway,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "netallocd")]
#[command(version, about = "Allocates private subnets for bridge and overlay networks")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Configuration file path
    #[arg(short, long, env = "NETALLOC_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, env = "NETALLOC_DEBUG")]
    debug: bool,

    /// Unix socket to serve the API on (empty disables it)
    #[arg(short, long, env = "NETALLOC_UNIX_SOCKET")]
    unix_socket: Option<String>,

    /// TCP port to serve the API on
    #[arg(short, long, env = "NETALLOC_PORT")]
    port: Option<u16>,

    /// Address to bind the TCP listener to
    #[arg(long, env = "NETALLOC_HOST")]
    host: Option<String>,

    /// Allocate against an in-memory runtime instead of Docker
    #[arg(long)]
    dry_run: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Commands::Version) = cli.command {
        println!("netallocd {}", build_info::VERSION);
        println!("commit: {}", build_info::COMMIT);
        println!("branch: {}", build_info::BRANCH);
        return Ok(());
    }

    let (mut config, path) = Config::discover(cli.config.as_deref())?;
    apply_overrides(&mut config, &cli);
    config.validate()?;

    init_logging(config.debug);
    info!(
        "Starting netallocd v{} (commit {})",
        build_info::VERSION,
        build_info::COMMIT
    );
    info!("Loaded configuration from {}", path.display());

    let scopes = config
        .network_scopes()
        .context("Invalid network scope configuration")?;
    info!(
        bridge = %scopes.bridge,
        overlay = %scopes.overlay,
        "Configured network scopes"
    );

    let runtime: Arc<dyn RuntimeGateway> = if cli.dry_run {
        warn!("Dry run: networks are created in memory only");
        Arc::new(InMemoryRuntime::new().with_cluster(true))
    } else {
        let docker = DockerRuntime::connect().context("Failed to configure Docker client")?;
        if let Err(e) = docker.ping().await {
            warn!("Docker daemon is not reachable: {}", e);
        }
        Arc::new(docker)
    };

    let state = Arc::new(AppState::with_runtime(scopes, runtime));
    serve(state, ApiServerConfig::from(&config), shutdown_signal()).await?;

    info!("netallocd stopped");
    Ok(())
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if cli.debug {
        config.debug = true;
    }
    if let Some(socket) = &cli.unix_socket {
        config.server.unix_socket = socket.clone();
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(host) = &cli.host {
        config.server.host = host.clone();
    }
}

fn init_logging(debug: bool) {
    let log_level = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!("netalloc={log_level},tower_http={log_level},warn"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
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

    info!("Shutdown signal received");
}
