use anyhow::Context;
use callbridge::application::{ActiveCallReporter, CallbackUrls};
use callbridge::config::Config;
use callbridge::domain::conference::ConferencePolicy;
use callbridge::domain::session::CallDirection;
use callbridge::infrastructure::ai::{UltravoxClient, WebhookVerifier};
use callbridge::infrastructure::backend::ErpClient;
use callbridge::infrastructure::carrier::TwilioClientFactory;
use callbridge::infrastructure::persistence::InMemoryCallRegistry;
use callbridge::interface::api::{build_router, init_metrics, AppState};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting CallBridge");

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;
    info!("Configuration loaded: {:?}", config);

    info!("Initializing Prometheus metrics exporter");
    let prometheus_handle = init_metrics().context("failed to install metrics recorder")?;

    let registry = Arc::new(InMemoryCallRegistry::new());
    let backend = Arc::new(ErpClient::new(&config.backend)?);
    let carriers = Arc::new(TwilioClientFactory::new(
        config.carrier.api_base_url.clone(),
        Duration::from_secs(config.carrier.request_timeout_secs),
    )?);
    let urls = CallbackUrls::new(config.public.base_url.clone());
    let call_ended_webhook_url = config.ai.call_ended_webhook_url.clone().or_else(|| {
        config
            .ai
            .webhook_secret
            .as_ref()
            .map(|_| urls.ai_call_ended())
    });
    let ai = Arc::new(UltravoxClient::new(
        config.ai.api_base_url.clone(),
        Duration::from_secs(config.ai.request_timeout_secs),
        call_ended_webhook_url,
    )?);

    // Active call reporting
    let direction = CallDirection::from_str(&config.telemetry.direction).unwrap_or_else(|| {
        warn!(direction = %config.telemetry.direction, "Unknown report direction, using INBOUND");
        CallDirection::Inbound
    });
    let reporter = ActiveCallReporter::new(
        registry.clone(),
        backend.clone(),
        direction,
        config.telemetry.report_interval(),
    )
    .spawn();
    info!("Active call reporter started");

    let state = AppState::new(
        registry,
        backend,
        carriers,
        ai,
        urls,
        ConferencePolicy {
            teardown_remaining_participants: config.conference.teardown_remaining_participants,
        },
    )
    .with_webhook_verifier(WebhookVerifier::new(config.ai.webhook_secret.clone()));
    let app = build_router(state, prometheus_handle);

    let listener = tokio::net::TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;
    info!("Server listening on {}", config.bind_address());
    info!("Webhook base URL: {}", config.public.base_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    reporter.abort();
    info!("Shutting down...");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
    }
}
