use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use ades_validator::cli::Cli;
use ades_validator::config::{GatewayConfig, SystemEnvProvider};
use ades_validator::convert::{ConverterRunner, DirConverterResolver};
use ades_validator::pipeline::ValidationPipeline;
use ades_validator::schema::SchemaStore;
use ades_validator::server;
use ades_validator::validator::SchemaValidator;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse_args();
    let mut config = GatewayConfig::load(cli.config.as_deref(), &SystemEnvProvider)
        .context("failed to load configuration")?;
    cli.apply(&mut config);
    config.validate().context("invalid configuration")?;

    let store = Arc::new(SchemaStore::new(config.schemas.directory.clone()));
    for name in ["submit", "general"] {
        if !store.is_installed(name) {
            // Soft failure: reported per-request, but worth flagging at boot.
            tracing::warn!(
                schema = name,
                directory = %config.schemas.directory.display(),
                "schema file not installed"
            );
        }
    }

    let resolver = Arc::new(DirConverterResolver::new(config.converter.directory.clone()));
    let runner = ConverterRunner::new(
        resolver,
        Duration::from_secs(config.converter.timeout_seconds),
        config.converter.max_concurrent,
    );
    let pipeline = Arc::new(ValidationPipeline::new(runner, SchemaValidator::new(store)));

    let app = server::create_app(pipeline);
    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind_addr))?;

    tracing::info!(addr = %config.server.bind_addr, "ades-validator listening");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
