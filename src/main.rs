mod config;
mod delivery;
mod domain;
mod repository;
mod telemetry;
mod usecase;

use std::sync::Arc;

use axum::{routing::get, Router};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::repository::postgres::{create_pool, PostgresNotificationRepository, PostgresUserRepository};
use crate::usecase::contracts::{NotificationRepository, UserRepository};
use crate::usecase::notifications::NotificationsUseCase;

pub struct AppState<N = PostgresNotificationRepository, U = PostgresUserRepository>
where
    N: NotificationRepository,
    U: UserRepository,
{
    pub notifications_usecase: NotificationsUseCase<N, U>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::AppConfig::from_env()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let tracer_provider = if config.telemetry_enabled {
        let telemetry_config = telemetry::TelemetryConfig::from(&config);
        let provider = telemetry::init_telemetry_with_subscriber(&telemetry_config, env_filter)
            .map_err(|e| anyhow::anyhow!("failed to initialize telemetry: {}", e))?;
        Some(provider)
    } else {
        telemetry::init_subscriber_without_telemetry(env_filter);
        None
    };

    tracing::info!("starting the notifications service");
    tracing::info!("config loaded, telemetry_enabled={}", config.telemetry_enabled);

    let metrics_handle = PrometheusBuilder::new().install_recorder()?;
    metrics_process::Collector::default().describe();
    tracing::info!("prometheus metrics initialized");

    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    tracing::info!("database pool created");

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database migrations applied");

    let notifications_usecase = NotificationsUseCase::new(
        PostgresNotificationRepository::new(pool.clone()),
        PostgresUserRepository::new(pool),
    );
    let shared_state: Arc<AppState> = Arc::new(AppState { notifications_usecase });

    if config.events_enabled {
        match async_nats::connect(&config.nats_url).await {
            Ok(client) => {
                tracing::info!(nats_url = %config.nats_url, "connected to NATS");
                let state = shared_state.clone();
                tokio::spawn(async move {
                    if let Err(e) = delivery::events::run_consumer(client, state).await {
                        tracing::error!(error = %e, "post event consumer stopped");
                    }
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, nats_url = %config.nats_url, "failed to connect to NATS, post events will not create notifications");
            }
        }
    }

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(move || metrics(metrics_handle.clone())))
        .merge(delivery::http::v1::router(shared_state))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    tracing::info!("notifications service running on {}", config.listen_addr);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(provider) = tracer_provider {
        telemetry::shutdown_telemetry(provider);
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

async fn metrics(handle: PrometheusHandle) -> String {
    metrics_process::Collector::default().collect();
    handle.render()
}

#[tracing::instrument]
async fn healthz() -> &'static str {
    "OK"
}
