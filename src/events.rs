//! CloudEvents envelope and the Keptn payloads exchanged with the control plane

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Name this service reports in task lifecycle events
pub const SERVICE_NAME: &str = "splunk-sli-provider";

pub const CONFIGURE_MONITORING_TASK: &str = "configure-monitoring";
pub const GET_SLI_TASK: &str = "get-sli";
pub const REMEDIATION_TASK: &str = "remediation";

/// Event type still sent by older Keptn CLIs for configure-monitoring
pub const LEGACY_CONFIGURE_MONITORING_TYPE: &str = "sh.keptn.event.monitoring.configure";

const KEPTN_EVENT_PREFIX: &str = "sh.keptn.event.";
const SPEC_VERSION: &str = "1.0";

pub fn triggered_event_type(task: &str) -> String {
    format!("{}{}.triggered", KEPTN_EVENT_PREFIX, task)
}

pub fn started_event_type(task: &str) -> String {
    format!("{}{}.started", KEPTN_EVENT_PREFIX, task)
}

pub fn finished_event_type(task: &str) -> String {
    format!("{}{}.finished", KEPTN_EVENT_PREFIX, task)
}

/// Structured-mode CloudEvent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudEvent {
    pub specversion: String,
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datacontenttype: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
    /// Keptn context extension
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub shkeptncontext: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggeredid: Option<String>,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl CloudEvent {
    /// Create a new JSON event with a fresh id
    pub fn new(
        event_type: impl Into<String>,
        source: impl Into<String>,
        data: &impl Serialize,
    ) -> Result<Self, serde_json::Error> {
        Ok(Self {
            specversion: SPEC_VERSION.to_string(),
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            datacontenttype: Some("application/json".to_string()),
            time: Some(Utc::now()),
            shkeptncontext: String::new(),
            triggeredid: None,
            data: serde_json::to_value(data)?,
        })
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.shkeptncontext = context.into();
        self
    }

    pub fn with_triggered_id(mut self, id: impl Into<String>) -> Self {
        self.triggeredid = Some(id.into());
        self
    }

    /// Decode the data attribute
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.data)
    }
}

/// Fields common to every Keptn event payload
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventData {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub project: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub stage: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub result: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,
}

/// Problem description carried by remediation events
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProblemData {
    pub state: String,
    #[serde(rename = "problemID")]
    pub problem_id: String,
    pub problem_title: String,
    pub problem_details: serde_json::Value,
    #[serde(rename = "problemURL")]
    pub problem_url: String,
    pub impacted_entity: String,
    pub project: String,
    pub stage: String,
    pub service: String,
    pub labels: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentData {
    pub deployment_names: Vec<String>,
}

/// Payload of `<stage>.remediation.triggered`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemediationTriggeredData {
    #[serde(flatten)]
    pub event: EventData,
    pub problem: ProblemData,
    pub deployment: DeploymentData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MonitoringType {
    #[serde(rename = "type", default)]
    pub monitoring_type: String,
}

/// Payload of `configure-monitoring.triggered`, accepting the legacy shape
/// where the monitoring type sits at the top level
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureMonitoringData {
    #[serde(flatten)]
    pub event: EventData,
    #[serde(rename = "configureMonitoring", default)]
    pub configure_monitoring: MonitoringType,
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub legacy_type: String,
}

impl ConfigureMonitoringData {
    /// Monitoring provider the event is addressed to
    pub fn monitoring_type(&self) -> &str {
        if self.configure_monitoring.monitoring_type.is_empty() {
            &self.legacy_type
        } else {
            &self.configure_monitoring.monitoring_type
        }
    }
}

/// Indicators requested by `get-sli.triggered`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetSliRequest {
    pub sli_provider: String,
    pub start: String,
    pub end: String,
    pub indicators: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_filters: Vec<SliFilter>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliFilter {
    pub key: String,
    pub value: String,
}

/// Payload of `get-sli.triggered`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetSliTriggeredData {
    #[serde(flatten)]
    pub event: EventData,
    #[serde(rename = "getSLI", default)]
    pub get_sli: GetSliRequest,
}

/// Value of one indicator
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliResult {
    pub metric: String,
    pub value: f64,
    pub success: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GetSliResults {
    pub start: String,
    pub end: String,
    pub indicator_values: Vec<SliResult>,
}

/// Payload of `get-sli.finished`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetSliFinishedData {
    #[serde(flatten)]
    pub event: EventData,
    #[serde(rename = "getSLI", default)]
    pub get_sli: GetSliResults,
}
