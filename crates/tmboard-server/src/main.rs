mod api;
mod middleware;
mod scheduler;

use tmboard_db::PgSnapshotStore;
use tmboard_scraper::BoardClient;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, AppState},
    scheduler::{DailyEventWindow, RefreshScheduler, SchedulerConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = tmboard_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    tracing::info!(env = %config.env, bind_addr = %config.bind_addr, "starting tmboard-server");

    let pool_config = tmboard_db::PoolConfig::from_app_config(&config);
    let pool = tmboard_db::connect_pool(&config.database_url, pool_config).await?;
    tmboard_db::run_migrations(&pool).await?;
    let store = PgSnapshotStore::new(pool);

    let client = BoardClient::new(
        config.scraper_request_timeout_secs,
        &config.scraper_user_agent,
        config.scraper_max_retries,
        config.scraper_retry_backoff_base_secs,
    )?;
    let refresher = RefreshScheduler::new(
        client,
        store.clone(),
        DailyEventWindow::new(config.event.start_utc),
        SchedulerConfig::from_app_config(&config),
    )
    .spawn();

    let app = build_app(AppState { store });
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    refresher.stop().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
