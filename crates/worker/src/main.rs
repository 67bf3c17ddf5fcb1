//! Bundle Relay Worker - background replication process.
//!
//! Runs two recurring jobs until Ctrl+C or SIGTERM:
//!
//! - replication every `MIGRATE_BUNDLE_WORKER_INTERVAL_MS`
//! - vendor product sync every `SYNC_BUNDLE_WORKER_INTERVAL_MS`
//!
//! A small HTTP server exposes `/health` and `/health/ready` on
//! `RELAY_HOST:RELAY_PORT` for the platform's health checks.
//!
//! # APIs
//!
//! - Shopify Admin API on the internal store and every vendor store
//! - `PostgreSQL` for bundles, stores, products and claims

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use bundle_relay_worker::claims::{ClaimRegistry, LocalClaimRegistry, PgClaimRegistry};
use bundle_relay_worker::config::{ClaimBackend, WorkerConfig};
use bundle_relay_worker::db::{self, PgCatalog};
use bundle_relay_worker::health;
use bundle_relay_worker::replication::{ReplicationSettings, Replicator};
use bundle_relay_worker::scheduler::{ReplicationJob, run_every};
use bundle_relay_worker::shopify::AdminClient;
use bundle_relay_worker::sync::{PaginationWalker, ProductSyncJob};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &WorkerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            sample_rate: config.sentry_sample_rate,
            traces_sample_rate: config.sentry_traces_sample_rate,
            attach_stacktrace: true,
            // Requests carry store access tokens
            send_default_pii: false,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = WorkerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "bundle_relay_worker=info,tower_http=debug".into());

    // Use JSON format on Fly.io for structured log parsing, text format locally
    let is_fly = std::env::var("FLY_APP_NAME").is_ok();
    let json_layer = is_fly.then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!is_fly).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p bundle-relay-cli -- migrate

    let client = Arc::new(
        AdminClient::new(config.api_version.clone()).expect("Failed to build Shopify client"),
    );
    let catalog = Arc::new(PgCatalog::new(pool.clone()));

    let jobs = match config.claims.backend {
        ClaimBackend::Postgres => {
            let claims = Arc::new(PgClaimRegistry::new(pool.clone(), config.claims.lease));
            tokio::spawn(run_jobs(config.clone(), catalog, client, claims))
        }
        ClaimBackend::Memory => {
            tracing::warn!("Using process-local claims; run a single worker instance");
            let claims = Arc::new(LocalClaimRegistry::new());
            tokio::spawn(run_jobs(config.clone(), catalog, client, claims))
        }
    };

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");
    tracing::info!("worker health listening on http://{}", addr);

    axum::serve(listener, health::router(pool))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    jobs.abort();
    tracing::info!("Worker stopped");
}

/// Schedule both jobs. Never returns.
async fn run_jobs<K: ClaimRegistry + 'static>(
    config: WorkerConfig,
    catalog: Arc<PgCatalog>,
    client: Arc<AdminClient>,
    claims: Arc<K>,
) {
    let replicator = Replicator::new(
        Arc::clone(&catalog),
        Arc::clone(&client),
        Arc::clone(&claims),
        ReplicationSettings {
            default_location_name: config.default_location_name.clone(),
        },
    );
    let replication = ReplicationJob::new(Arc::clone(&catalog), replicator);

    let walker = PaginationWalker::from_config(claims, &config.sync);
    let product_sync = ProductSyncJob::new(catalog, client, walker);

    tokio::join!(
        run_every("replication", config.schedule.replication_interval, move || {
            let job = replication.clone();
            async move {
                job.tick().await;
            }
        }),
        run_every("product_sync", config.schedule.product_sync_interval, move || {
            let job = product_sync.clone();
            async move {
                job.tick().await;
            }
        }),
    );
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
