use tonic::transport::Server;
use tonic_reflection::server::Builder;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_shared::FILE_DESCRIPTOR_SET;
use billing_stub::{BillingStub, StubConfig};

/// Runs the billing stub until the process is stopped.
///
/// # Environment Variables
/// - `BILLING_STUB_ADDR`: gRPC listen address (default: "0.0.0.0:9001")
/// - `BILLING_STUB_ENABLE_REFLECTION`: "true" to serve gRPC reflection
/// - `BILLING_STUB_DELAY_MS`: delay before every response (default: none)
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("billing_stub=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = StubConfig::from_env()?;

    let mut stub = BillingStub::default();
    if let Some(delay) = cfg.delay {
        tracing::info!("responses delayed by {:?}", delay);
        stub = stub.with_delay(delay);
    }

    tracing::info!("-- Starting billing stub gRPC on {}", cfg.addr);
    let mut server_builder = Server::builder().add_service(stub.into_server());

    if cfg.reflection {
        let reflection_service = Builder::configure()
            .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
            .build_v1()?;
        server_builder = server_builder.add_service(reflection_service);
        tracing::info!("gRPC server reflection enabled");
    }

    server_builder.serve(cfg.addr).await?;

    Ok(())
}
