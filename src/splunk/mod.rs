//! Splunk alerting and search platform
//!
//! Alert rules are saved searches; firings are listed under
//! `fired_alerts`, grouped per saved search. SLI values come from one-shot
//! search jobs.

pub mod client;
pub mod model;

use async_trait::async_trait;

use crate::rules::AlertRule;

pub use client::{SplunkAuth, SplunkClient};
pub use model::{AlertLinks, FiredAlert, FiredAlertContent, ResultRow};

/// Operations the service needs from the alerting platform
#[async_trait]
pub trait AlertPlatform: Send + Sync {
    /// Names of every saved search
    async fn list_rule_names(&self) -> Result<Vec<String>, PlatformError>;

    async fn create_rule(&self, rule: &AlertRule) -> Result<(), PlatformError>;

    async fn remove_rule(&self, name: &str) -> Result<(), PlatformError>;

    /// Fired alert groups, one per saved search that has fired
    async fn list_fired_alerts(&self) -> Result<Vec<FiredAlert>, PlatformError>;

    /// Instances of a fired alert group, from its `list` link
    async fn list_fired_instances(&self, link: &str) -> Result<Vec<FiredAlert>, PlatformError>;

    /// Address of the results of the search job behind a firing
    fn job_results_url(&self, job_link: &str) -> String;
}

/// A search over an explicit time range
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    /// Inclusive lower bound, empty for Splunk's default
    pub earliest_time: String,
    /// Exclusive upper bound, empty for Splunk's default
    pub latest_time: String,
}

/// Ad hoc searches
#[async_trait]
pub trait SearchPlatform: Send + Sync {
    /// Run a search job to completion and return its result rows
    async fn run_search(&self, request: &SearchRequest) -> Result<Vec<ResultRow>, PlatformError>;
}

#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("Network error while {action}: {message}")]
    Network { action: String, message: String },

    #[error("HTTP error while {action}: {status} {message}")]
    Http {
        action: String,
        status: u16,
        message: String,
    },

    #[error("Deserialization error while {action}: {message}")]
    Deserialization { action: String, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),
}
