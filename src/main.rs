use std::sync::Arc;

use pneushop_api::{
    config, db,
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);

    info!(
        environment = %cfg.environment,
        "Starting pneushop-api v{}",
        env!("CARGO_PKG_VERSION")
    );

    let db_conn = db::establish_connection_from_app_config(&cfg).await?;

    if cfg.auto_migrate {
        info!("Running database migrations");
        db::run_migrations(&db_conn).await?;
    }

    let db_conn = Arc::new(db_conn);

    // Event pipeline: services push domain events, a background task drains them.
    let (tx, rx) = mpsc::channel(cfg.event_channel_capacity);
    let event_sender = EventSender::new(tx);
    let event_task = tokio::spawn(events::process_events(rx));

    let services = AppServices::new(db_conn.clone(), Arc::new(event_sender.clone()));

    let state = AppState {
        db: db_conn.clone(),
        config: cfg.clone(),
        event_sender,
        services,
    };

    let app = pneushop_api::app(state);

    let addr = format!("{}:{}", cfg.host, cfg.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    event_task.abort();
    match Arc::try_unwrap(db_conn) {
        Ok(pool) => {
            if let Err(e) = db::close_pool(pool).await {
                error!("Error closing database pool: {}", e);
            }
        }
        Err(_) => info!("Database pool still referenced elsewhere, skipping explicit close"),
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => error!("Failed to install SIGTERM handler: {}", e),
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
