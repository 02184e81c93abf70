//! Care home website backend
//!
//! (c) Softlandia 2025

use carehome_api::api;
use carehome_api::core::outbox::{NotificationQueue, OutboxWorker};
use carehome_api::infrastructure::database::DatabaseConnection;
use carehome_api::infrastructure::settings::Settings;
use carehome_api::service_collection;

use anyhow::{Context, anyhow};
use axum::http::{HeaderValue, Method};
use di::{Ref, ServiceProvider};
use di_axum::RouterServiceProviderExtensions;
use log::{error, info, warn};
use tokio::runtime::{Builder, Runtime};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

fn main() -> anyhow::Result<()> {
    // initialize tracing
    tracing_subscriber::fmt::init();

    let runtime: Runtime = Builder::new_multi_thread().enable_all().build()?;

    runtime.block_on(run())
}

async fn run() -> anyhow::Result<()> {
    let provider = service_collection()
        .build_provider()
        .map_err(|e| anyhow!("invalid service registrations: {e:?}"))?;

    let settings = required::<Settings>(&provider)?;
    for name in settings.missing_credentials() {
        error!("{name} is not set, notifications through that channel will fail");
    }

    required::<DatabaseConnection>(&provider)?
        .migrate()
        .await
        .context("failed to apply database migrations")?;

    let worker_handle = spawn_outbox_worker(&provider)?;

    web_server_task(provider, &settings).await?;

    worker_handle.abort();
    info!("Shutting down...");
    Ok(())
}

fn required<T: ?Sized + 'static>(provider: &ServiceProvider) -> anyhow::Result<Ref<T>> {
    provider
        .get::<T>()
        .ok_or_else(|| anyhow!("{} is not registered", std::any::type_name::<T>()))
}

/// Starts the background worker that delivers notifications for stored inquiries.
fn spawn_outbox_worker(provider: &ServiceProvider) -> anyhow::Result<tokio::task::JoinHandle<()>> {
    let receiver = required::<NotificationQueue>(provider)?
        .take_receiver()
        .context("notification queue receiver already taken")?;

    let worker = required::<OutboxWorker>(provider)?;

    Ok(tokio::spawn(async move { worker.run(receiver).await }))
}

async fn web_server_task(provider: ServiceProvider, settings: &Settings) -> anyhow::Result<()> {
    let origins: Vec<HeaderValue> = settings
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(origin) => Some(origin),
            Err(_) => {
                warn!("ignoring invalid CORS origin {origin:?}");
                None
            }
        })
        .collect();

    let app = api::router()
        .layer(
            CorsLayer::new()
                .allow_headers(Any)
                .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
                .allow_origin(origins),
        )
        .layer(TraceLayer::new_for_http())
        .with_provider(provider);

    let listener = tokio::net::TcpListener::bind(&settings.bind_address)
        .await
        .with_context(|| format!("failed to bind {}", settings.bind_address))?;
    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
