//! Outbound event delivery

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::events::CloudEvent;

/// Capability to deliver an event to Keptn
#[async_trait]
pub trait EventSender: Send + Sync {
    async fn send(&self, event: &CloudEvent) -> Result<(), NotifierError>;
}

/// Posts structured CloudEvents to the Keptn event broker
pub struct HttpEventSender {
    client: reqwest::Client,
    url: String,
    api_token: Option<String>,
}

impl HttpEventSender {
    /// Create a sender for a broker endpoint
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            api_token: None,
        }
    }

    /// Authenticate against the Keptn API with `x-token`
    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.api_token = (!token.is_empty()).then_some(token);
        self
    }
}

#[async_trait]
impl EventSender for HttpEventSender {
    async fn send(&self, event: &CloudEvent) -> Result<(), NotifierError> {
        let body = serde_json::to_vec(event).map_err(|e| NotifierError::Encode(e.to_string()))?;

        let mut request = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/cloudevents+json")
            .body(body);

        if let Some(token) = &self.api_token {
            request = request.header("x-token", token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| NotifierError::Send(format!("Failed to send event: {}", e)))?;

        if !response.status().is_success() {
            return Err(NotifierError::Send(format!(
                "Event broker returned status {}",
                response.status()
            )));
        }

        tracing::debug!(
            event_type = %event.event_type,
            url = %self.url,
            "Event sent"
        );

        Ok(())
    }
}

/// Keeps sent events in memory
#[derive(Default)]
pub struct MemorySender {
    events: Mutex<Vec<CloudEvent>>,
}

impl MemorySender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events sent so far
    pub fn sent(&self) -> Vec<CloudEvent> {
        self.events.lock().clone()
    }
}

#[async_trait]
impl EventSender for MemorySender {
    async fn send(&self, event: &CloudEvent) -> Result<(), NotifierError> {
        tracing::info!(
            event_type = %event.event_type,
            context = %event.shkeptncontext,
            "Recorded event"
        );
        self.events.lock().push(event.clone());
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Send error: {0}")]
    Send(String),
}
