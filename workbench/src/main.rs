use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::{net::TcpListener, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use workbench::{
    AppState,
    config::{load_config, workspace_from_env},
    routes::{
        self,
        sessions::{SessionRegistry, run_sweeper},
    },
    service::{LocalCorpusService, Storages},
    storage::StorageManager,
};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        error!(error = %err, "Backend crashed");
        eprintln!("Backend crashed: {err}");
    }
}

async fn run() -> Result<()> {
    init_tracing();
    if dotenv().is_ok() {
        info!("Loaded .env file");
    }

    let config = load_config()
        .await
        .context("Failed to load application configuration")?;
    let working_dir = PathBuf::from(&config.working_dir);
    let workspace = workspace_from_env();

    let storages = Arc::new(Storages::new(&working_dir, workspace.clone()));
    let mut storage_manager = StorageManager::new();
    storages.register_all(&mut storage_manager);
    storage_manager.initialize_all().await?;
    info!(
        working_dir = %working_dir.display(),
        workspace = workspace.as_deref().unwrap_or("_"),
        "Storages ready"
    );

    let service = Arc::new(LocalCorpusService::new(storages));
    let interrupted = service.importer().recover_interrupted().await?;
    if interrupted > 0 {
        info!(count = interrupted, "Recovered imports interrupted by the last shutdown");
    }

    let addr_string = format!("{}:{}", config.server.host, config.server.port);
    let addr = addr_string
        .parse::<SocketAddr>()
        .with_context(|| format!("Invalid server address: {addr_string}"))?;
    info!(host = %config.server.host, port = config.server.port, "Loaded configuration");

    let state = Arc::new(AppState {
        config: Arc::new(config),
        service,
        sessions: SessionRegistry::default(),
        storages_status: storage_manager.status(),
    });
    let sweeper_shutdown = CancellationToken::new();
    let sweeper = tokio::spawn(run_sweeper(
        state.clone(),
        state.config.sessions.idle_timeout(),
        state.config.sessions.sweep_interval(),
        sweeper_shutdown.clone(),
    ));
    let app = routes::router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind TCP listener on {addr}"))?;
    info!(%addr, "Workbench server listening");

    let server_result = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper_shutdown.cancel();
    if let Err(err) = sweeper.await {
        warn!(error = %err, "Session sweeper stopped abnormally");
    }

    if let Err(err) = storage_manager.finalize_all().await {
        warn!(error = %err, "Failed to finalize storages");
    }

    server_result.context("Server encountered a fatal error")?;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                if stream.recv().await.is_some() {
                    info!("Received SIGTERM");
                }
            }
            Err(err) => warn!(error = %err, "Failed to install SIGTERM handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received termination signal (Ctrl+C)");
        }
        _ = terminate => {
            info!("Received termination signal (SIGTERM)");
        }
    }
}
