mod config;
mod jobs;
mod ledger;
mod notifier;
mod routes;
mod worker;

#[cfg(test)]
mod testing;

use std::net::SocketAddr;
use std::sync::Arc;

use config::AppEnv;
use ledger::{auth::ServiceAccountKey, sheets::SheetsLedger, DynLedger, RecordPool};
use notifier::{telegram::TelegramNotifier, DynNotifier};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use worker::{JobQueue, WorkerDeps};

#[derive(Clone)]
pub struct AppState {
    pub env: AppEnv,
    pub queue: JobQueue,
    pub notifier: DynNotifier,
}

#[tokio::main]
async fn main() -> config::Result<()> {
    // 1. Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // 2. Load configuration
    let cfg = config::load()?;
    info!("Starting vcard dispenser in {:?} mode", cfg.env);

    // 3. Build external clients
    let http = reqwest::Client::new();

    let key = ServiceAccountKey::from_json(&cfg.google_credentials)?;
    let ledger: DynLedger = Arc::new(SheetsLedger::new(
        http.clone(),
        key,
        &cfg.sheets_api_base,
        &cfg.sheet_id,
        &cfg.sheet_name,
    )?);

    let telegram = Arc::new(TelegramNotifier::new(
        http,
        &cfg.telegram_api_base,
        &cfg.bot_token,
    ));
    let notifier: DynNotifier = telegram.clone();

    // 4. Start the single worker
    let (queue, worker) = worker::job_queue(WorkerDeps {
        pool: RecordPool::new(ledger),
        notifier: notifier.clone(),
        delivery_delay: cfg.delivery_delay,
    });
    let shutdown = CancellationToken::new();
    let worker_handle = tokio::spawn(worker.run(shutdown.clone()));

    // 5. Build router
    let state = AppState {
        env: cfg.env,
        queue,
        notifier,
    };
    let app = routes::router(state, &cfg.webhook_path);

    // 6. Start HTTP server, then point Telegram at it
    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.http_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    if let Err(e) = telegram.set_webhook(&cfg.webhook_url()).await {
        // Telegram keeps the previous registration; keep serving.
        error!("Failed to register webhook {}: {:?}", cfg.webhook_url(), e);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // 7. Let the in-flight job finish; queued jobs are dropped.
    info!("HTTP server stopped, stopping worker");
    shutdown.cancel();
    if let Err(e) = worker_handle.await {
        warn!("Worker task ended abnormally: {:?}", e);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
