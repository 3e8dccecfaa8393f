use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::alerts::{AlertPoller, PollerHandle};
use crate::events::{
    triggered_event_type, CloudEvent, CONFIGURE_MONITORING_TASK, GET_SLI_TASK,
    LEGACY_CONFIGURE_MONITORING_TYPE,
};
use crate::indicators::{SliError, SliRetriever};
use crate::monitoring::{MonitoringConfigurator, MonitoringError};
use crate::rules::RuleName;
use crate::splunk::AlertPlatform;

/// Application state shared across handlers
pub struct AppState {
    pub platform: Arc<dyn AlertPlatform>,
    pub configurator: MonitoringConfigurator,
    pub retriever: SliRetriever,
    pub poller: Arc<AlertPoller>,
    poller_handle: Mutex<Option<PollerHandle>>,
}

impl AppState {
    pub fn new(
        platform: Arc<dyn AlertPlatform>,
        configurator: MonitoringConfigurator,
        retriever: SliRetriever,
        poller: Arc<AlertPoller>,
    ) -> Self {
        Self {
            platform,
            configurator,
            retriever,
            poller,
            poller_handle: Mutex::new(None),
        }
    }

    /// Start polling when rules created by an earlier run still exist
    pub async fn resume_polling(&self) {
        match self.platform.list_rule_names().await {
            Ok(names) if names.iter().any(|n| RuleName::is_owned(n)) => {
                tracing::info!("Existing alerts found, starting the polling system");
                self.ensure_poller_started();
            }
            Ok(_) => tracing::info!("No alerts found, polling starts after configure-monitoring"),
            Err(e) => tracing::error!(error = %e, "Failed to list existing alerts"),
        }
    }

    /// Start polling unless a poller is already running.
    ///
    /// Returns whether a new poller was started.
    pub fn ensure_poller_started(&self) -> bool {
        let mut handle = self.poller_handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            tracing::info!("Polling system has already been started");
            return false;
        }

        *handle = Some(Arc::clone(&self.poller).start());
        true
    }

    pub fn is_polling(&self) -> bool {
        self.poller_handle
            .lock()
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }

    pub async fn stop_poller(&self) {
        let handle = self.poller_handle.lock().take();
        if let Some(handle) = handle {
            handle.stop().await;
        }
    }
}

// ============================================================================
// Health Check
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============================================================================
// CloudEvents
// ============================================================================

#[derive(Debug, Serialize)]
pub struct EventResponse {
    pub event_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rules_created: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub indicator_values: Option<usize>,
    pub polling: bool,
}

pub async fn receive_event(
    State(state): State<Arc<AppState>>,
    Json(mut event): Json<CloudEvent>,
) -> Result<Json<EventResponse>, ApiError> {
    let configure_monitoring = triggered_event_type(CONFIGURE_MONITORING_TASK);
    let get_sli = triggered_event_type(GET_SLI_TASK);

    if event.event_type == LEGACY_CONFIGURE_MONITORING_TYPE {
        tracing::debug!(event_id = %event.id, "Converting legacy configure-monitoring event");
        event.event_type = configure_monitoring.clone();
    }

    tracing::info!(
        event_type = %event.event_type,
        event_id = %event.id,
        context = %event.shkeptncontext,
        "Received event"
    );

    if event.event_type == get_sli {
        let values = state.retriever.handle_get_sli(&event).await?;

        return Ok(Json(EventResponse {
            event_type: event.event_type,
            rules_created: None,
            indicator_values: Some(values.len()),
            polling: state.is_polling(),
        }));
    }

    if event.event_type != configure_monitoring {
        return Err(ApiError::BadRequest(format!(
            "Unhandled event type {}",
            event.event_type
        )));
    }

    let rules_created = state.configurator.handle_configure_monitoring(&event).await?;

    if rules_created > 0 {
        state.ensure_poller_started();
    } else {
        tracing::info!("No alerts configured, no need to start the polling system");
    }

    Ok(Json(EventResponse {
        event_type: event.event_type,
        rules_created: Some(rules_created),
        indicator_values: None,
        polling: state.is_polling(),
    }))
}

// ============================================================================
// Error Handling
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Internal(String),
}

impl From<MonitoringError> for ApiError {
    fn from(e: MonitoringError) -> Self {
        match e {
            MonitoringError::NotForSplunk(_)
            | MonitoringError::MissingCoordinates
            | MonitoringError::InvalidEvent(_) => ApiError::BadRequest(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SliError> for ApiError {
    fn from(e: SliError) -> Self {
        match e {
            SliError::NotForSplunk(_)
            | SliError::MissingCoordinates
            | SliError::InvalidEvent(_) => ApiError::BadRequest(e.to_string()),
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        tracing::warn!(status = %status, error = %message, "Request failed");

        let body = serde_json::json!({
            "error": message
        });

        (status, Json(body)).into_response()
    }
}
