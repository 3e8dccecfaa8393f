//! HTTP client for the Splunk management API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::de::DeserializeOwned;

use super::model::{EntryList, FiredAlert, JobCreated, JobResults, Messages, NamedEntry, ResultRow};
use super::{AlertPlatform, PlatformError, SearchPlatform, SearchRequest};
use crate::config::SplunkCredentials;
use crate::rules::AlertRule;

const SAVED_SEARCHES_PATH: &str = "services/saved/searches/";
const FIRED_ALERTS_PATH: &str = "services/alerts/fired_alerts/";
const SEARCH_JOBS_PATH: &str = "services/search/v2/jobs/";
const OUTPUT_MODE: (&str, &str) = ("output_mode", "json");
/// Job creation only answers once the search is done
const BLOCKING: (&str, &str) = ("exec_mode", "blocking");
/// Saved searches are stored without the leading search command, search
/// jobs need it
const SEARCH_PREFIX: &str = "search ";

/// Authentication method, picked from the configured credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplunkAuth {
    /// Splunk authentication token, sent as `Bearer`
    Token(String),
    /// Session key, sent as `Splunk`
    SessionKey(String),
    Basic { username: String, password: String },
}

impl SplunkAuth {
    /// Token first, then session key, then basic credentials
    pub fn from_credentials(credentials: &SplunkCredentials) -> Result<Self, PlatformError> {
        if !credentials.token.is_empty() {
            Ok(SplunkAuth::Token(credentials.token.clone()))
        } else if !credentials.session_key.is_empty() {
            Ok(SplunkAuth::SessionKey(credentials.session_key.clone()))
        } else if !credentials.username.is_empty() && !credentials.password.is_empty() {
            Ok(SplunkAuth::Basic {
                username: credentials.username.clone(),
                password: credentials.password.clone(),
            })
        } else {
            Err(PlatformError::Authentication(
                "no authentication method provided".to_string(),
            ))
        }
    }

    /// Value of the `Authorization` header
    pub fn header_value(&self) -> Result<String, PlatformError> {
        match self {
            SplunkAuth::Token(token) => {
                if token.starts_with("Splunk") {
                    Err(PlatformError::Authentication(
                        "HTTP authorization token used instead of a Splunk authentication token"
                            .to_string(),
                    ))
                } else if token.starts_with("Basic") {
                    Err(PlatformError::Authentication(
                        "basic authentication used instead of a Splunk authentication token"
                            .to_string(),
                    ))
                } else if token.starts_with("Bearer") {
                    Ok(token.clone())
                } else {
                    Ok(format!("Bearer {}", token))
                }
            }
            SplunkAuth::SessionKey(key) => {
                if key.starts_with("Bearer") {
                    Err(PlatformError::Authentication(
                        "Splunk authentication token used instead of an HTTP authorization token"
                            .to_string(),
                    ))
                } else if key.starts_with("Basic") {
                    Err(PlatformError::Authentication(
                        "basic authentication used instead of an HTTP authorization token"
                            .to_string(),
                    ))
                } else if key.starts_with("Splunk") {
                    Ok(key.clone())
                } else {
                    Ok(format!("Splunk {}", key))
                }
            }
            SplunkAuth::Basic { username, password } => Ok(format!(
                "Basic {}",
                base64::encode(format!("{}:{}", username, password))
            )),
        }
    }
}

/// Client for the Splunk management port
#[derive(Debug, Clone)]
pub struct SplunkClient {
    http_client: reqwest::Client,
    base_url: String,
    host_port: String,
    authorization: String,
}

impl SplunkClient {
    /// Hosts default to HTTPS; an explicit `http://` prefix selects plain HTTP.
    pub fn new(
        credentials: &SplunkCredentials,
        skip_tls_verify: bool,
    ) -> Result<Self, PlatformError> {
        let authorization = SplunkAuth::from_credentials(credentials)?.header_value()?;

        let (scheme, host) = match credentials.host.strip_prefix("http://") {
            Some(host) => ("http", host),
            None => (
                "https",
                credentials
                    .host
                    .strip_prefix("https://")
                    .unwrap_or(&credentials.host),
            ),
        };
        let host_port = format!("{}:{}", host, credentials.port).replace(' ', "");

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .danger_accept_invalid_certs(skip_tls_verify)
            .build()
            .map_err(|e| network("building the HTTP client", e))?;

        Ok(Self {
            http_client,
            base_url: format!("{}://{}", scheme, host_port),
            host_port,
            authorization,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/')).replace(' ', "")
    }

    async fn get_entries<T: DeserializeOwned>(
        &self,
        path: &str,
        action: &str,
    ) -> Result<Vec<T>, PlatformError> {
        let response = self
            .http_client
            .get(self.endpoint(path))
            .header(AUTHORIZATION, &self.authorization)
            .query(&[OUTPUT_MODE])
            .send()
            .await
            .map_err(|e| network(action, e))?;

        let response = ensure_success(response, action).await?;

        let list: EntryList<T> = response
            .json()
            .await
            .map_err(|e| deserialization(action, e))?;

        Ok(list.entry)
    }
}

#[async_trait]
impl AlertPlatform for SplunkClient {
    async fn list_rule_names(&self) -> Result<Vec<String>, PlatformError> {
        let entries: Vec<NamedEntry> = self
            .get_entries(SAVED_SEARCHES_PATH, "listing saved searches")
            .await?;
        Ok(entries.into_iter().map(|e| e.name).collect())
    }

    async fn create_rule(&self, rule: &AlertRule) -> Result<(), PlatformError> {
        const ACTION: &str = "creating an alert";

        let query = rule
            .query
            .strip_prefix(SEARCH_PREFIX)
            .unwrap_or(&rule.query);

        let mut form: Vec<(&str, &str)> = vec![OUTPUT_MODE];
        push_param(&mut form, "name", &rule.name);
        push_param(&mut form, "actions", &rule.actions);
        push_param(&mut form, "action.webhook.param.url", &rule.webhook_url);
        push_param(&mut form, "search", query);
        push_param(&mut form, "cron_schedule", &rule.cron_schedule);
        push_param(&mut form, "alert_condition", &rule.condition);
        push_param(&mut form, "alert.suppress", if rule.suppress { "1" } else { "" });
        push_param(&mut form, "alert.suppress.period", &rule.suppress_period);
        push_param(&mut form, "is_scheduled", "1");
        push_param(&mut form, "dispatch.earliest_time", &rule.earliest_time);
        push_param(&mut form, "dispatch.latest_time", &rule.latest_time);
        push_param(&mut form, "alert_type", "custom");
        push_param(&mut form, "alert.track", "1");

        let response = self
            .http_client
            .post(self.endpoint(SAVED_SEARCHES_PATH))
            .header(AUTHORIZATION, &self.authorization)
            .form(&form)
            .send()
            .await
            .map_err(|e| network(ACTION, e))?;

        ensure_success(response, ACTION).await?;

        tracing::debug!(rule = %rule.name, "Alert created");
        Ok(())
    }

    async fn remove_rule(&self, name: &str) -> Result<(), PlatformError> {
        const ACTION: &str = "removing an alert";

        let response = self
            .http_client
            .delete(self.endpoint(&format!("{}{}", SAVED_SEARCHES_PATH, name)))
            .header(AUTHORIZATION, &self.authorization)
            .query(&[OUTPUT_MODE])
            .send()
            .await
            .map_err(|e| network(ACTION, e))?;

        ensure_success(response, ACTION).await?;

        tracing::debug!(rule = %name, "Alert removed");
        Ok(())
    }

    async fn list_fired_alerts(&self) -> Result<Vec<FiredAlert>, PlatformError> {
        self.get_entries(FIRED_ALERTS_PATH, "listing fired alerts")
            .await
    }

    async fn list_fired_instances(&self, link: &str) -> Result<Vec<FiredAlert>, PlatformError> {
        self.get_entries(link, "listing fired alert instances")
            .await
    }

    fn job_results_url(&self, job_link: &str) -> String {
        format!("{}{}/results", self.host_port, job_link)
    }
}

#[async_trait]
impl SearchPlatform for SplunkClient {
    async fn run_search(&self, request: &SearchRequest) -> Result<Vec<ResultRow>, PlatformError> {
        const CREATE: &str = "creating a search job";
        const RESULTS: &str = "reading search results";

        let query = if request.query.starts_with(SEARCH_PREFIX) {
            request.query.clone()
        } else {
            format!("{}{}", SEARCH_PREFIX, request.query)
        };

        let mut form: Vec<(&str, &str)> = vec![OUTPUT_MODE, BLOCKING];
        push_param(&mut form, "search", &query);
        push_param(&mut form, "earliest_time", &request.earliest_time);
        push_param(&mut form, "latest_time", &request.latest_time);

        let response = self
            .http_client
            .post(self.endpoint(SEARCH_JOBS_PATH))
            .header(AUTHORIZATION, &self.authorization)
            .form(&form)
            .send()
            .await
            .map_err(|e| network(CREATE, e))?;

        let job: JobCreated = ensure_success(response, CREATE)
            .await?
            .json()
            .await
            .map_err(|e| deserialization(CREATE, e))?;
        if job.sid.is_empty() {
            return Err(PlatformError::Deserialization {
                action: CREATE.to_string(),
                message: "no sid found".to_string(),
            });
        }
        tracing::debug!(sid = %job.sid, "Search job done");

        let response = self
            .http_client
            .get(self.endpoint(&format!("{}{}/results", SEARCH_JOBS_PATH, job.sid)))
            .header(AUTHORIZATION, &self.authorization)
            .query(&[OUTPUT_MODE])
            .send()
            .await
            .map_err(|e| network(RESULTS, e))?;

        let results: JobResults = ensure_success(response, RESULTS)
            .await?
            .json()
            .await
            .map_err(|e| deserialization(RESULTS, e))?;

        Ok(results.results)
    }
}

/// Empty values are left out of the form
fn push_param<'a>(form: &mut Vec<(&'a str, &'a str)>, key: &'a str, value: &'a str) {
    if !value.is_empty() {
        form.push((key, value));
    }
}

fn network(action: &str, error: reqwest::Error) -> PlatformError {
    PlatformError::Network {
        action: action.to_string(),
        message: error.to_string(),
    }
}

fn deserialization(action: &str, error: reqwest::Error) -> PlatformError {
    PlatformError::Deserialization {
        action: action.to_string(),
        message: error.to_string(),
    }
}

/// Turn a non-2xx answer into an error carrying Splunk's own message
async fn ensure_success(
    response: reqwest::Response,
    action: &str,
) -> Result<reqwest::Response, PlatformError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = Messages::first_text(&body)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or_default().to_string());

    Err(PlatformError::Http {
        action: action.to_string(),
        status: status.as_u16(),
        message,
    })
}
