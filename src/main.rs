use fhonk::config::Config;
use fhonk::db::CredentialsStorage;
use fhonk::router::{FhonkState, fhonk_router};
use mimalloc::MiMalloc;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Arc::new(Config::from_env()?);

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    let production = cfg.is_production();
    tracing_subscriber::registry()
        .with(env_filter)
        .with(production.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!production).then(|| {
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false)
        }))
        .init();

    info!(
        port = cfg.port,
        app_env = %cfg.app_env,
        loglevel = %cfg.loglevel,
        redirect_uri = %cfg.redirect_uri,
        frontend_url = %cfg.frontend_url.as_ref().map(|u| u.as_str()).unwrap_or("<none>"),
        "configuration loaded"
    );

    let storage = CredentialsStorage::connect(cfg.database_url()).await?;
    info!("Database connection established");

    let state = FhonkState::new(cfg.clone(), storage.clone())?;
    let app = fhonk_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    storage.close().await;
    info!("Database connection closed, server exiting");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
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
                error!(error = %e, "failed to install SIGTERM handler");
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
    info!("Shutting down server...");
}
