use axum::Router;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::AppState;
use patient_core::billing::GrpcBillingClient;
use patient_core::constants::{DEFAULT_EVENT_DELIVERY_TIMEOUT_MS, IN_MEMORY_DATABASE_PATH};
use patient_core::events::{
    ChannelEventPublisher, EventTransport, KafkaRestTransport, LogTransport,
};
use patient_core::store::{InMemoryRecordStore, RecordStore, SqliteRecordStore};
use patient_core::{PatientService, ServiceConfig, StoreKind};

/// Main entry point for the patient service.
///
/// Wires the record store, billing client and event publisher into a `PatientService`, starts
/// the event delivery worker and serves the REST API until Ctrl-C. On shutdown the worker is
/// given the chance to deliver events that are still buffered.
///
/// # Environment Variables
/// - `PATIENT_REST_ADDR`: REST server address (default: "0.0.0.0:4000")
/// - `PATIENT_STORE`: "sqlite" or "memory" (default: "sqlite")
/// - `PATIENT_DATABASE_PATH`: SQLite file, or ":memory:" (default: "patient_data/patients.db")
/// - `BILLING_SERVICE_ADDR`: billing gRPC endpoint (default: "http://localhost:9001")
/// - `BILLING_TIMEOUT_MS`: bound on one provisioning call (default: 5000)
/// - `EVENT_BROKER_URL`: Kafka REST proxy base URL; events are only logged when unset
/// - `EVENT_TOPIC`, `EVENT_BUFFER_CAPACITY`, `EVENT_HANDOFF_TIMEOUT_MS`: event publishing
///
/// # Errors
/// Returns an error if:
/// - the configuration is invalid,
/// - the database cannot be opened,
/// - the REST address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patient_run=info".parse()?)
                .add_directive("patient_core=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = ServiceConfig::from_env()?;

    let store = open_store(&cfg)?;

    tracing::info!("-- Billing service at {}", cfg.billing_addr());
    let provisioner = GrpcBillingClient::connect_lazy(cfg.billing_addr(), cfg.billing_timeout())?;

    let transport: Arc<dyn EventTransport> = match cfg.event_broker_url() {
        Some(url) => {
            tracing::info!("-- Publishing events to {} (topic {})", url, cfg.event_topic());
            Arc::new(KafkaRestTransport::new(
                url.clone(),
                Duration::from_millis(DEFAULT_EVENT_DELIVERY_TIMEOUT_MS),
            )?)
        }
        None => {
            tracing::warn!("EVENT_BROKER_URL not set, events will only be logged");
            Arc::new(LogTransport)
        }
    };
    let (publisher, worker) = ChannelEventPublisher::new(
        cfg.event_buffer_capacity(),
        cfg.event_handoff_timeout(),
        cfg.event_topic(),
        transport,
    );
    let worker = tokio::spawn(worker.run());

    let patient_service = PatientService::new(store, Arc::new(provisioner), Arc::new(publisher));

    let app: Router = api_rest::router(AppState { patient_service })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    tracing::info!("++ Starting patient REST on {}", cfg.rest_addr());
    let listener = tokio::net::TcpListener::bind(cfg.rest_addr()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router owned the last publisher handle, so the worker drains the buffer and stops.
    worker.await?;
    tracing::info!("-- Patient service stopped");

    Ok(())
}

fn open_store(cfg: &ServiceConfig) -> anyhow::Result<Arc<dyn RecordStore>> {
    match cfg.store_kind() {
        StoreKind::Memory => {
            tracing::info!("-- Using in-memory record store");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
        StoreKind::Sqlite if cfg.database_path().as_os_str() == IN_MEMORY_DATABASE_PATH => {
            tracing::info!("-- Using in-memory SQLite database");
            Ok(Arc::new(SqliteRecordStore::open_in_memory()?))
        }
        StoreKind::Sqlite => {
            let path = cfg.database_path();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            tracing::info!("-- Using SQLite database at {}", path.display());
            Ok(Arc::new(SqliteRecordStore::open(path)?))
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("-- Shutdown signal received");
}
