//! In-memory platform and resource fakes shared by the unit tests

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::resources::{ResourceError, ResourceScope, ResourceStore};
use crate::rules::AlertRule;
use crate::splunk::{
    AlertLinks, AlertPlatform, FiredAlert, FiredAlertContent, PlatformError, ResultRow,
    SearchPlatform, SearchRequest,
};

/// Alerting platform keeping rules, firings and search results in memory
#[derive(Default)]
pub struct FakePlatform {
    pub rules: Mutex<Vec<String>>,
    pub created: Mutex<Vec<AlertRule>>,
    pub removed: Mutex<Vec<String>>,
    pub fired: Mutex<Vec<FiredAlert>>,
    pub instances: Mutex<HashMap<String, Vec<FiredAlert>>>,
    pub failing_links: Mutex<Vec<String>>,
    pub fail_fired_listing: Mutex<bool>,
    /// Result rows per search query, after time range extraction
    pub search_results: Mutex<HashMap<String, Vec<ResultRow>>>,
    pub searches: Mutex<Vec<SearchRequest>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(self, name: &str) -> Self {
        self.rules.lock().push(name.to_string());
        self
    }

    /// Register a fired alert group and its instances
    pub fn with_fired(self, name: &str, link: &str, instances: Vec<FiredAlert>) -> Self {
        self.fire(name, link, instances);
        self
    }

    pub fn fire(&self, name: &str, link: &str, instances: Vec<FiredAlert>) {
        self.fired.lock().push(FiredAlert {
            name: name.to_string(),
            links: AlertLinks {
                list: link.to_string(),
                ..Default::default()
            },
            content: FiredAlertContent::default(),
        });
        self.instances.lock().insert(link.to_string(), instances);
    }

    pub fn with_search_result(self, query: &str, rows: serde_json::Value) -> Self {
        let rows = match rows {
            serde_json::Value::Array(rows) => rows
                .into_iter()
                .filter_map(|row| match row {
                    serde_json::Value::Object(row) => Some(row),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };
        self.search_results.lock().insert(query.to_string(), rows);
        self
    }

    pub fn with_failing_link(self, link: &str) -> Self {
        self.failing_links.lock().push(link.to_string());
        self
    }
}

/// One firing of a saved search
pub fn fired_instance(savedsearch_name: &str, sid: &str, trigger_time: i64) -> FiredAlert {
    FiredAlert {
        name: format!("{}_at_{}", sid, trigger_time),
        links: AlertLinks {
            job: format!("/services/search/jobs/{}", sid),
            ..Default::default()
        },
        content: FiredAlertContent {
            sid: sid.to_string(),
            savedsearch_name: savedsearch_name.to_string(),
            trigger_time,
        },
    }
}

#[async_trait]
impl AlertPlatform for FakePlatform {
    async fn list_rule_names(&self) -> Result<Vec<String>, PlatformError> {
        Ok(self.rules.lock().clone())
    }

    async fn create_rule(&self, rule: &AlertRule) -> Result<(), PlatformError> {
        self.rules.lock().push(rule.name.clone());
        self.created.lock().push(rule.clone());
        Ok(())
    }

    async fn remove_rule(&self, name: &str) -> Result<(), PlatformError> {
        self.rules.lock().retain(|r| r != name);
        self.removed.lock().push(name.to_string());
        Ok(())
    }

    async fn list_fired_alerts(&self) -> Result<Vec<FiredAlert>, PlatformError> {
        if *self.fail_fired_listing.lock() {
            return Err(PlatformError::Network {
                action: "listing fired alerts".to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(self.fired.lock().clone())
    }

    async fn list_fired_instances(&self, link: &str) -> Result<Vec<FiredAlert>, PlatformError> {
        if self.failing_links.lock().iter().any(|l| l == link) {
            return Err(PlatformError::Http {
                action: "listing fired alert instances".to_string(),
                status: 500,
                message: "internal error".to_string(),
            });
        }
        Ok(self
            .instances
            .lock()
            .get(link)
            .cloned()
            .unwrap_or_default())
    }

    fn job_results_url(&self, job_link: &str) -> String {
        format!("splunk.test:8089{}/results", job_link)
    }
}

#[async_trait]
impl SearchPlatform for FakePlatform {
    async fn run_search(&self, request: &SearchRequest) -> Result<Vec<ResultRow>, PlatformError> {
        self.searches.lock().push(request.clone());
        self.search_results
            .lock()
            .get(&request.query)
            .cloned()
            .ok_or_else(|| PlatformError::Http {
                action: "creating a search job".to_string(),
                status: 400,
                message: format!("Unknown search command '{}'", request.query),
            })
    }
}

/// Resource store backed by a map of `scope path/name` to content
#[derive(Default)]
pub struct FakeResources {
    files: Mutex<HashMap<String, String>>,
}

impl FakeResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, scope: &ResourceScope, name: &str, content: &str) -> Self {
        self.files
            .lock()
            .insert(format!("{}/{}", scope.path(), name), content.to_string());
        self
    }
}

#[async_trait]
impl ResourceStore for FakeResources {
    async fn get_resource(
        &self,
        scope: &ResourceScope,
        name: &str,
    ) -> Result<Option<String>, ResourceError> {
        Ok(self
            .files
            .lock()
            .get(&format!("{}/{}", scope.path(), name))
            .cloned())
    }
}
