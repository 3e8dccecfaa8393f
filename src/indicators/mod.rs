//! Handling of `get-sli.triggered`
//!
//! Every requested indicator is looked up in the merged `splunk/sli.yaml`,
//! run as a Splunk search job over the evaluation window and reduced to a
//! single number.

use std::collections::HashMap;
use std::sync::Arc;

use crate::alerts::notifier::{EventSender, NotifierError};
use crate::events::{
    finished_event_type, started_event_type, CloudEvent, EventData, GetSliFinishedData,
    GetSliRequest, GetSliResults, GetSliTriggeredData, SliResult, GET_SLI_TASK, SERVICE_NAME,
};
use crate::resources::{load_sli_queries, ResourceError, ResourceStore, SLI_FILE};
use crate::rules::compiler::result_field_name;
use crate::rules::time_range::extract_time_range;
use crate::splunk::{PlatformError, ResultRow, SearchPlatform, SearchRequest};

/// SLI provider name this service answers to
pub const SLI_PROVIDER: &str = "splunk";

pub struct SliRetriever {
    search: Arc<dyn SearchPlatform>,
    resources: Arc<dyn ResourceStore>,
    sender: Arc<dyn EventSender>,
}

impl SliRetriever {
    pub fn new(
        search: Arc<dyn SearchPlatform>,
        resources: Arc<dyn ResourceStore>,
        sender: Arc<dyn EventSender>,
    ) -> Self {
        Self {
            search,
            resources,
            sender,
        }
    }

    /// Handle a get-sli event, returning the indicator values sent back.
    ///
    /// A failing indicator ends the run: the values gathered so far are
    /// reported in an errored finished event.
    pub async fn handle_get_sli(&self, event: &CloudEvent) -> Result<Vec<SliResult>, SliError> {
        let data: GetSliTriggeredData = event
            .data_as()
            .map_err(|e| SliError::InvalidEvent(e.to_string()))?;

        if data.get_sli.sli_provider != SLI_PROVIDER {
            tracing::info!(
                sli_provider = %data.get_sli.sli_provider,
                "Not handling get-sli event meant for another provider"
            );
            return Err(SliError::NotForSplunk(data.get_sli.sli_provider));
        }
        let coordinates = &data.event;
        if coordinates.project.is_empty()
            || coordinates.stage.is_empty()
            || coordinates.service.is_empty()
        {
            return Err(SliError::MissingCoordinates);
        }

        tracing::info!(
            event_id = %event.id,
            context = %event.shkeptncontext,
            project = %coordinates.project,
            stage = %coordinates.stage,
            service = %coordinates.service,
            "Handling get-sli.triggered event"
        );

        self.send_status(
            event,
            started_event_type(GET_SLI_TASK),
            &GetSliFinishedData {
                event: status_data(coordinates, "succeeded", "", ""),
                ..Default::default()
            },
        )
        .await?;

        let queries = match self.load_queries(coordinates).await {
            Ok(queries) => queries,
            Err(e) => {
                tracing::error!(error = %e, "Failed to fetch SLI file");
                let finished = GetSliFinishedData {
                    event: status_data(coordinates, "errored", "fail", &e.to_string()),
                    get_sli: GetSliResults {
                        start: data.get_sli.start.clone(),
                        end: data.get_sli.end.clone(),
                        indicator_values: Vec::new(),
                    },
                };
                if let Err(send_err) = self
                    .send_status(event, finished_event_type(GET_SLI_TASK), &finished)
                    .await
                {
                    tracing::error!(error = %send_err, "Failed to send finished event");
                }
                return Err(e);
            }
        };

        let mut values = Vec::with_capacity(data.get_sli.indicators.len());
        let mut failure = None;
        for indicator in &data.get_sli.indicators {
            match self
                .retrieve_indicator(indicator, &queries, &data.get_sli)
                .await
            {
                Ok(value) => values.push(value),
                Err(e) => {
                    tracing::error!(indicator = %indicator, error = %e, "Failed to retrieve SLI");
                    failure = Some(e);
                    break;
                }
            }
        }

        let status = match &failure {
            None => status_data(coordinates, "succeeded", "pass", ""),
            Some(e) => status_data(
                coordinates,
                "errored",
                "fail",
                &format!("error from the {} while getting slis: {}", SERVICE_NAME, e),
            ),
        };
        let finished = GetSliFinishedData {
            event: status,
            get_sli: GetSliResults {
                start: data.get_sli.start.clone(),
                end: data.get_sli.end.clone(),
                indicator_values: values,
            },
        };
        self.send_status(event, finished_event_type(GET_SLI_TASK), &finished)
            .await?;

        tracing::info!(
            indicators = finished.get_sli.indicator_values.len(),
            failed = failure.is_some(),
            "Get SLI finished"
        );
        Ok(finished.get_sli.indicator_values)
    }

    /// Run the query of one indicator over the requested window
    pub async fn retrieve_indicator(
        &self,
        indicator: &str,
        queries: &HashMap<String, String>,
        window: &GetSliRequest,
    ) -> Result<SliResult, SliError> {
        let query = queries
            .get(indicator)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| SliError::NoQuery(indicator.to_string()))?;

        // Inline directives of the SLI query override the evaluation window
        let range = extract_time_range(&window.start, &window.end, query);
        tracing::info!(
            indicator,
            query = %range.query,
            earliest = %range.earliest,
            latest = %range.latest,
            "Running SLI search"
        );

        let rows = self
            .search
            .run_search(&SearchRequest {
                query: range.query,
                earliest_time: range.earliest,
                latest_time: range.latest,
            })
            .await?;
        let value = metric_value(&rows, query)?;

        tracing::info!(indicator, value, "SLI value retrieved");
        Ok(SliResult {
            metric: indicator.to_string(),
            value,
            success: true,
            message: String::new(),
        })
    }

    async fn load_queries(
        &self,
        coordinates: &EventData,
    ) -> Result<HashMap<String, String>, SliError> {
        let queries = load_sli_queries(
            self.resources.as_ref(),
            &coordinates.project,
            &coordinates.stage,
            &coordinates.service,
        )
        .await?;

        if queries.is_empty() {
            return Err(SliError::MissingSliFile(format!(
                "{}/{}/{}/{}",
                coordinates.project, coordinates.stage, coordinates.service, SLI_FILE
            )));
        }
        Ok(queries)
    }

    async fn send_status(
        &self,
        trigger: &CloudEvent,
        event_type: String,
        data: &GetSliFinishedData,
    ) -> Result<(), SliError> {
        let event = CloudEvent::new(event_type, SERVICE_NAME, data)
            .map_err(|e| SliError::Encode(e.to_string()))?
            .with_context(trigger.shkeptncontext.clone())
            .with_triggered_id(trigger.id.clone());

        self.sender.send(&event).await?;
        Ok(())
    }
}

fn status_data(coordinates: &EventData, status: &str, result: &str, message: &str) -> EventData {
    EventData {
        project: coordinates.project.clone(),
        stage: coordinates.stage.clone(),
        service: coordinates.service.clone(),
        labels: coordinates.labels.clone(),
        status: status.to_string(),
        result: result.to_string(),
        message: message.to_string(),
    }
}

/// Reduce search results to one number.
///
/// Exactly one row is expected. The value is read from the query's
/// aggregation field when the row has it, otherwise from the first field
/// that is not internal to Splunk (`_time`, `_raw`, ...).
pub fn metric_value(rows: &[ResultRow], query: &str) -> Result<f64, SliError> {
    let row = match rows {
        [] => return Err(SliError::NoResult),
        [row] => row,
        _ => return Err(SliError::NotAMetric(rows.len())),
    };

    let value = result_field_name(query)
        .ok()
        .and_then(|field| row.get(field))
        .or_else(|| {
            row.iter()
                .find(|(field, _)| !field.starts_with('_'))
                .map(|(_, value)| value)
        })
        .ok_or(SliError::NoResult)?;

    let number = match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.ok_or_else(|| SliError::NotANumber(value.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum SliError {
    #[error("Event is not for splunk but for {0:?}")]
    NotForSplunk(String),

    #[error("A project, a stage and a service have to be defined")]
    MissingCoordinates,

    #[error("Invalid event data: {0}")]
    InvalidEvent(String),

    #[error("No SLI file found at {0}")]
    MissingSliFile(String),

    #[error("No query found for indicator {0}")]
    NoQuery(String),

    #[error("No result found")]
    NoResult,

    #[error("Result is not a metric: {0} rows returned")]
    NotAMetric(usize),

    #[error("Result is not a number: {0}")]
    NotANumber(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Notify(#[from] NotifierError),
}
