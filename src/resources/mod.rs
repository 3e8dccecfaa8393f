//! Access to Keptn project resources
//!
//! Resources live at project, stage or service level. `sli.yaml` is merged
//! across levels, the most specific level winning per indicator.

pub mod local;
pub mod remote;

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;

use crate::slo::{ServiceLevelObjectives, Shipyard, SliConfig};

pub use local::LocalResourceStore;
pub use remote::HttpResourceStore;

pub const SHIPYARD_FILE: &str = "shipyard.yaml";
pub const SLO_FILE: &str = "slo.yaml";
pub const SLI_FILE: &str = "splunk/sli.yaml";
pub const REMEDIATION_FILE: &str = "remediation.yaml";

/// Level a resource is stored at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceScope {
    pub project: String,
    pub stage: Option<String>,
    pub service: Option<String>,
}

impl ResourceScope {
    pub fn project(project: &str) -> Self {
        Self {
            project: project.to_string(),
            stage: None,
            service: None,
        }
    }

    pub fn stage(project: &str, stage: &str) -> Self {
        Self {
            stage: Some(stage.to_string()),
            ..Self::project(project)
        }
    }

    pub fn service(project: &str, stage: &str, service: &str) -> Self {
        Self {
            service: Some(service.to_string()),
            ..Self::stage(project, stage)
        }
    }

    /// `project[/stage[/service]]`
    pub fn path(&self) -> String {
        let mut path = self.project.clone();
        if let Some(stage) = &self.stage {
            path.push('/');
            path.push_str(stage);
            if let Some(service) = &self.service {
                path.push('/');
                path.push_str(service);
            }
        }
        path
    }
}

impl fmt::Display for ResourceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

/// Read access to resources
#[async_trait]
pub trait ResourceStore: Send + Sync {
    /// Content of a resource, `None` when it does not exist
    async fn get_resource(
        &self,
        scope: &ResourceScope,
        name: &str,
    ) -> Result<Option<String>, ResourceError>;
}

/// Shipyard of a project
pub async fn load_shipyard(
    store: &dyn ResourceStore,
    project: &str,
) -> Result<Shipyard, ResourceError> {
    let scope = ResourceScope::project(project);
    let content = store
        .get_resource(&scope, SHIPYARD_FILE)
        .await?
        .ok_or_else(|| ResourceError::NotFound(format!("{}/{}", scope, SHIPYARD_FILE)))?;

    Shipyard::from_yaml(&content).map_err(|e| ResourceError::Yaml {
        resource: SHIPYARD_FILE.to_string(),
        message: e.to_string(),
    })
}

/// Objectives of a service in a stage, `None` when there is no usable `slo.yaml`
pub async fn load_slo(
    store: &dyn ResourceStore,
    project: &str,
    stage: &str,
    service: &str,
) -> Result<Option<ServiceLevelObjectives>, ResourceError> {
    let scope = ResourceScope::service(project, stage, service);
    match store.get_resource(&scope, SLO_FILE).await? {
        Some(content) if !content.trim().is_empty() => ServiceLevelObjectives::from_yaml(&content)
            .map(Some)
            .map_err(|e| ResourceError::Yaml {
                resource: format!("{}/{}", scope, SLO_FILE),
                message: e.to_string(),
            }),
        _ => Ok(None),
    }
}

/// Splunk searches per SLI, merged over project, stage and service levels
pub async fn load_sli_queries(
    store: &dyn ResourceStore,
    project: &str,
    stage: &str,
    service: &str,
) -> Result<HashMap<String, String>, ResourceError> {
    let scopes = [
        ResourceScope::project(project),
        ResourceScope::stage(project, stage),
        ResourceScope::service(project, stage, service),
    ];

    let mut queries = HashMap::new();
    for scope in &scopes {
        let Some(content) = store.get_resource(scope, SLI_FILE).await? else {
            continue;
        };
        let config = SliConfig::from_yaml(&content).map_err(|e| ResourceError::Yaml {
            resource: format!("{}/{}", scope, SLI_FILE),
            message: e.to_string(),
        })?;
        tracing::debug!(scope = %scope, count = config.indicators.len(), "Loaded SLI queries");
        queries.extend(config.indicators);
    }

    Ok(queries)
}

/// Whether a remediation is defined for the service in the stage
pub async fn has_remediation(
    store: &dyn ResourceStore,
    project: &str,
    stage: &str,
    service: &str,
) -> Result<bool, ResourceError> {
    let scope = ResourceScope::service(project, stage, service);
    Ok(store.get_resource(&scope, REMEDIATION_FILE).await?.is_some())
}

#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Resource service returned {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid YAML in {resource}: {message}")]
    Yaml { resource: String, message: String },
}
