mod api;
mod config;

use std::sync::Arc;

use axum::routing::get;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use reeltrack_client::{CatalogCoordinator, ServiceHub, SessionManager};
use reeltrack_db::DbCatalog;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::AppState;
use crate::config::Args;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let recorder = PrometheusBuilder::new().build_recorder();
    let handle = recorder.handle();
    metrics::set_global_recorder(recorder).ok();

    let args = Args::parse();

    let store = Arc::new(DbCatalog::new(&args.database_url)?);
    let hub = ServiceHub::start(args.services.hub_config()).await;
    let sessions = Arc::new(SessionManager::new(hub.auth().clone(), hub.clock().clone()));
    let catalog = Arc::new(CatalogCoordinator::new(
        store,
        hub.counter().clone(),
        hub.calendar().clone(),
        args.sync.coordinator_config(),
    ));

    match catalog.counter_status().await {
        Ok(status) if status.in_sync => {
            tracing::info!(count = status.count, "counter matches catalog");
        }
        Ok(status) => {
            tracing::warn!(
                count = status.count,
                catalog_size = status.catalog_size,
                "counter out of step with catalog; POST /counter/resync to repair"
            );
        }
        Err(e) => tracing::warn!("could not read counter at startup: {}", e),
    }

    let state = AppState {
        sessions: sessions.clone(),
        catalog,
    };

    let app = api::router(state).route(
        "/metrics",
        get(move || {
            let rendered = handle.render();
            async move { rendered }
        }),
    );

    tracing::info!("listening on {}", args.listen);

    let server = axum::Server::bind(&args.listen)
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    if let Err(e) = server.await {
        tracing::error!("server error: {}", e);
    }

    let cleared = sessions.clear_all();
    hub.shutdown().await;
    tracing::info!(cleared, "sessions cleared, service connections closed");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {}", e);
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

    tracing::info!("signal received, starting graceful shutdown");
}
