//! Splunk SLI provider service
//!
//! Run with: cargo run
//!
//! Environment variables:
//! - RCV_PORT / RCV_PATH: CloudEvents listener (default: 8080, /)
//! - ENV: `local` reads resources from RESOURCE_DIR, anything else from CONFIGURATION_SERVICE
//! - EVENT_BROKER_URL / KEPTN_API_TOKEN: outbound Keptn events
//! - SP_HOST, SP_PORT: Splunk management address
//! - SP_API_TOKEN, SP_USERNAME + SP_PASSWORD or SP_SESSION_KEY: Splunk credentials
//! - CRON_SCHEDULE, DISPATCH_EARLIEST_TIME, DISPATCH_LATEST_TIME, ALERT_SUPPRESS_PERIOD,
//!   ACTIONS, WEBHOOK_URL: alert rule settings
//! - POLLING_FREQUENCY_SECS: fired alert polling cadence (default: 20)
//! - RUST_LOG: Log level (default: info)

use splunk_sli_provider::api::run_server;
use splunk_sli_provider::ProviderConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "splunk_sli_provider=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ProviderConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to process env var");
            return Err(e.into());
        }
    };

    tracing::info!("splunk-sli-provider configuration:");
    tracing::info!("  Listener: 0.0.0.0:{}{}", config.port, config.path);
    tracing::info!("  Splunk: {}:{}", config.splunk.host, config.splunk.port);
    tracing::info!("  Event broker: {}", config.event_broker_url);
    if config.is_local() {
        tracing::info!("  Resources: local directory {}", config.resource_dir);
    } else {
        tracing::info!("  Resources: {}", config.configuration_service_url);
    }
    tracing::info!(
        "  Alert schedule: {} (window {} to {}, suppressed for {})",
        config.rule_defaults.cron_schedule,
        config.rule_defaults.earliest_time,
        config.rule_defaults.latest_time,
        config.rule_defaults.suppress_period
    );
    tracing::info!(
        "  Polling frequency: {} seconds",
        config.polling_frequency.as_secs()
    );

    run_server(config).await
}
