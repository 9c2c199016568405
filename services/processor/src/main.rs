use std::env;
use std::sync::Arc;

use notifier_core::HttpLongPollQueueSource;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_owned());
    tracing_subscriber::fmt().with_env_filter(EnvFilter::new(log_level)).init();

    let settings = processor::config::load_config().expect("failed to load processor config");

    info!("connecting to database...");
    let pool = notifier_core::datastore::create_pool(&settings.datastore.url, settings.datastore.max_connections)
        .await
        .expect("failed to connect to Postgres");
    notifier_core::datastore::run_migrations(&pool).await.expect("failed to run database migrations");
    info!("migrations applied");

    let queue = Arc::new(HttpLongPollQueueSource::new(settings.queue_url.clone()));
    let proc = processor::build_processor(&settings, pool, queue);

    proc.start().await.expect("fatal: processor failed to start");
    info!("processor running");

    shutdown_signal().await;

    proc.stop().await;
    info!("processor shut down gracefully");
}

/// Waits for SIGTERM or Ctrl-C (SIGINT) and returns to trigger graceful shutdown.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => { info!("received Ctrl+C, shutting down"); },
        _ = terminate => { info!("received SIGTERM, shutting down"); },
    }
}
