use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use super::handlers::{health_check, receive_event, AppState};
use crate::alerts::{AlertPoller, EventSender, HttpEventSender};
use crate::config::ProviderConfig;
use crate::indicators::SliRetriever;
use crate::monitoring::MonitoringConfigurator;
use crate::resources::{HttpResourceStore, LocalResourceStore, ResourceStore};
use crate::splunk::{AlertPlatform, SearchPlatform, SplunkClient};

/// Build the application router, receiving CloudEvents on `event_path`
pub fn build_router(state: Arc<AppState>, event_path: &str) -> Router {
    let event_path = if event_path.starts_with('/') {
        event_path.to_string()
    } else {
        format!("/{}", event_path)
    };

    Router::new()
        .route("/health", get(health_check))
        .route(&event_path, post(receive_event))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the collaborators described by the configuration
pub fn build_state(config: &ProviderConfig) -> Result<Arc<AppState>, Box<dyn std::error::Error>> {
    // Splunk management ports commonly serve self-signed certificates
    let client = Arc::new(SplunkClient::new(&config.splunk, true)?);
    let platform: Arc<dyn AlertPlatform> = client.clone();
    let search: Arc<dyn SearchPlatform> = client;

    let sender: Arc<dyn EventSender> = Arc::new(
        HttpEventSender::new(config.event_broker_url.clone())
            .with_api_token(config.keptn_api_token.clone()),
    );

    let resources: Arc<dyn ResourceStore> = if config.is_local() {
        tracing::info!(dir = %config.resource_dir, "Reading resources from local directory");
        Arc::new(LocalResourceStore::new(&config.resource_dir))
    } else {
        tracing::info!(url = %config.configuration_service_url, "Reading resources from Keptn");
        Arc::new(
            HttpResourceStore::new(config.configuration_service_url.clone())
                .with_api_token(config.keptn_api_token.clone()),
        )
    };

    let poller = Arc::new(AlertPoller::new(
        Arc::clone(&platform),
        Arc::clone(&sender),
        config.polling_frequency,
    ));
    let retriever = SliRetriever::new(search, Arc::clone(&resources), Arc::clone(&sender));
    let configurator = MonitoringConfigurator::new(
        Arc::clone(&platform),
        resources,
        sender,
        config.rule_defaults.clone(),
    );

    Ok(Arc::new(AppState::new(
        platform,
        configurator,
        retriever,
        poller,
    )))
}

/// Run the HTTP server
pub async fn run_server(config: ProviderConfig) -> Result<(), Box<dyn std::error::Error>> {
    let state = build_state(&config)?;
    state.resume_polling().await;

    let app = build_router(Arc::clone(&state), &config.path);

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    tracing::info!("Starting splunk-sli-provider on {}{}", addr, config.path);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.stop_poller().await;

    tracing::info!("splunk-sli-provider stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }

    tracing::info!("Shutdown signal received, stopping...");
}
