//! Handling of `configure-monitoring.triggered`
//!
//! Replaces the Splunk alert rules of a service with one rule per absolute
//! pass criterion of its SLOs, for every stage that defines a remediation.

use std::sync::Arc;

use crate::alerts::notifier::{EventSender, NotifierError};
use crate::events::{
    finished_event_type, started_event_type, CloudEvent, ConfigureMonitoringData, EventData,
    CONFIGURE_MONITORING_TASK, SERVICE_NAME,
};
use crate::resources::{
    has_remediation, load_shipyard, load_sli_queries, load_slo, ResourceError, ResourceStore,
};
use crate::rules::{compile_criterion, AlertRule, CompileOutcome, RuleDefaults, RuleName, RuleTarget};
use crate::splunk::{AlertPlatform, PlatformError};

/// Monitoring type this service answers to
pub const MONITORING_TYPE: &str = "splunk";

pub struct MonitoringConfigurator {
    platform: Arc<dyn AlertPlatform>,
    resources: Arc<dyn ResourceStore>,
    sender: Arc<dyn EventSender>,
    rule_defaults: RuleDefaults,
}

impl MonitoringConfigurator {
    pub fn new(
        platform: Arc<dyn AlertPlatform>,
        resources: Arc<dyn ResourceStore>,
        sender: Arc<dyn EventSender>,
        rule_defaults: RuleDefaults,
    ) -> Self {
        Self {
            platform,
            resources,
            sender,
            rule_defaults,
        }
    }

    /// Handle a configure-monitoring event, returning the number of rules created
    pub async fn handle_configure_monitoring(
        &self,
        event: &CloudEvent,
    ) -> Result<usize, MonitoringError> {
        let data: ConfigureMonitoringData = event
            .data_as()
            .map_err(|e| MonitoringError::InvalidEvent(e.to_string()))?;

        if data.monitoring_type() != MONITORING_TYPE {
            tracing::info!(
                monitoring_type = data.monitoring_type(),
                "Event is not for splunk"
            );
            return Err(MonitoringError::NotForSplunk(
                data.monitoring_type().to_string(),
            ));
        }
        if data.event.project.is_empty() || data.event.service.is_empty() {
            return Err(MonitoringError::MissingCoordinates);
        }

        let project = data.event.project.as_str();
        let service = data.event.service.as_str();

        tracing::info!(
            event_id = %event.id,
            context = %event.shkeptncontext,
            project,
            service,
            "Handling configure-monitoring.triggered event"
        );

        self.send_status(
            event,
            started_event_type(CONFIGURE_MONITORING_TASK),
            EventData {
                project: project.to_string(),
                service: service.to_string(),
                status: "succeeded".to_string(),
                ..Default::default()
            },
        )
        .await?;

        let created = match self.create_rules_for_each_stage(project, service).await {
            Ok(created) => created,
            Err(e) => {
                tracing::error!(project, service, error = %e, "Failed to configure monitoring");
                let finished = EventData {
                    project: project.to_string(),
                    service: service.to_string(),
                    status: "errored".to_string(),
                    result: "fail".to_string(),
                    message: e.to_string(),
                    ..Default::default()
                };
                if let Err(send_err) = self
                    .send_status(event, finished_event_type(CONFIGURE_MONITORING_TASK), finished)
                    .await
                {
                    tracing::error!(error = %send_err, "Failed to send finished event");
                }
                return Err(e);
            }
        };

        self.send_status(
            event,
            finished_event_type(CONFIGURE_MONITORING_TASK),
            EventData {
                project: project.to_string(),
                service: service.to_string(),
                status: "succeeded".to_string(),
                result: "pass".to_string(),
                message: "Finished configuring monitoring".to_string(),
                ..Default::default()
            },
        )
        .await?;

        tracing::info!(project, service, rules = created, "Configure monitoring finished");
        Ok(created)
    }

    /// Remove owned rules of a service, then create the rules of every stage
    pub async fn create_rules_for_each_stage(
        &self,
        project: &str,
        service: &str,
    ) -> Result<usize, MonitoringError> {
        self.remove_previous_rules(project, service).await?;

        let shipyard = load_shipyard(self.resources.as_ref(), project).await?;

        let mut created = 0;
        for stage in shipyard.stage_names() {
            tracing::info!(project, stage, service, "Creating alerts for stage");
            created += self.create_rules_for_stage(project, stage, service).await?;
        }

        Ok(created)
    }

    /// Remove owned rules whose name mentions both the project and the service
    pub async fn remove_previous_rules(
        &self,
        project: &str,
        service: &str,
    ) -> Result<usize, MonitoringError> {
        tracing::info!(project, service, "Removing previous alerts");

        let names = self.platform.list_rule_names().await?;
        let mut removed = 0;
        for name in names
            .iter()
            .filter(|n| RuleName::is_owned(n) && n.contains(project) && n.contains(service))
        {
            tracing::info!(alert = %name, "Removing alert");
            self.platform.remove_rule(name).await?;
            removed += 1;
        }

        Ok(removed)
    }

    /// Create the rules of one stage. Stages without SLOs or without a
    /// remediation get none.
    pub async fn create_rules_for_stage(
        &self,
        project: &str,
        stage: &str,
        service: &str,
    ) -> Result<usize, MonitoringError> {
        let resources = self.resources.as_ref();

        let slo = match load_slo(resources, project, stage, service).await {
            Ok(Some(slo)) if !slo.objectives.is_empty() => slo,
            Ok(_) => {
                tracing::info!(stage, "No SLO objectives for stage, no alerts created");
                return Ok(0);
            }
            Err(e) => {
                tracing::warn!(stage, error = %e, "Unusable SLO file for stage, no alerts created");
                return Ok(0);
            }
        };

        if !has_remediation(resources, project, stage, service).await? {
            tracing::info!(project, stage, "No remediation defined, skipping setup of splunk alerts");
            return Ok(0);
        }

        let queries = load_sli_queries(resources, project, stage, service).await?;
        let target = RuleTarget {
            project: project.to_string(),
            stage: stage.to_string(),
            service: service.to_string(),
        };

        let mut created = 0;
        for objective in &slo.objectives {
            let Some(query) = queries.get(&objective.sli).filter(|q| !q.is_empty()) else {
                tracing::error!(sli = %objective.sli, project, "No query defined for SLI");
                continue;
            };

            for criterion in objective.pass.iter().flat_map(|group| &group.criteria) {
                let compiled = match compile_criterion(criterion, &objective.sli, query, &target) {
                    Ok(CompileOutcome::Compiled(compiled)) => compiled,
                    Ok(CompileOutcome::Unsupported) => {
                        tracing::debug!(sli = %objective.sli, criterion = %criterion, "Criterion not compiled");
                        continue;
                    }
                    Err(e) => {
                        tracing::error!(
                            sli = %objective.sli,
                            query = %query,
                            error = %e,
                            "Cannot build alert condition, skipping objective"
                        );
                        break;
                    }
                };

                let rule = AlertRule::from_compiled(&compiled, query, &self.rule_defaults);
                tracing::info!(alert = %rule.name, condition = %rule.condition, "Creating alert");
                self.platform.create_rule(&rule).await?;
                created += 1;
            }
        }

        Ok(created)
    }

    async fn send_status(
        &self,
        trigger: &CloudEvent,
        event_type: String,
        data: EventData,
    ) -> Result<(), MonitoringError> {
        let event = CloudEvent::new(event_type, SERVICE_NAME, &data)
            .map_err(|e| MonitoringError::Encode(e.to_string()))?
            .with_context(trigger.shkeptncontext.clone())
            .with_triggered_id(trigger.id.clone());

        self.sender.send(&event).await?;
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MonitoringError {
    #[error("Event is not for splunk but for {0:?}")]
    NotForSplunk(String),

    #[error("A project and a service have to be defined")]
    MissingCoordinates,

    #[error("Invalid event data: {0}")]
    InvalidEvent(String),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error(transparent)]
    Notify(#[from] NotifierError),
}
