//! Remediation events for fired alerts

use std::collections::HashMap;

use crate::events::{
    triggered_event_type, CloudEvent, DeploymentData, EventData, ProblemData,
    RemediationTriggeredData, REMEDIATION_TASK,
};
use crate::rules::RuleName;

/// Source reported on remediation events
pub const EVENT_SOURCE: &str = "splunk";

const DEPLOYMENT_TYPE: &str = "primary";

/// Payload opening a problem for the SLI of a fired rule
pub fn remediation_data(rule: &RuleName, problem_url: &str) -> RemediationTriggeredData {
    let problem = ProblemData {
        state: "OPEN".to_string(),
        problem_id: String::new(),
        problem_title: rule.sli.clone(),
        problem_details: serde_json::json!({}),
        problem_url: problem_url.to_string(),
        impacted_entity: format!("{}-{}", rule.service, DEPLOYMENT_TYPE),
        project: rule.project.clone(),
        stage: rule.stage.clone(),
        service: rule.service.clone(),
        labels: HashMap::from([("deployment".to_string(), DEPLOYMENT_TYPE.to_string())]),
    };

    RemediationTriggeredData {
        event: EventData {
            project: rule.project.clone(),
            stage: rule.stage.clone(),
            service: rule.service.clone(),
            labels: HashMap::from([("Problem URL".to_string(), problem_url.to_string())]),
            ..Default::default()
        },
        problem,
        deployment: DeploymentData {
            deployment_names: vec![DEPLOYMENT_TYPE.to_string()],
        },
    }
}

/// `<stage>.remediation.triggered` event under the given Keptn context
pub fn remediation_event(
    rule: &RuleName,
    problem_url: &str,
    context: &str,
) -> Result<CloudEvent, serde_json::Error> {
    let event_type = triggered_event_type(&format!("{}.{}", rule.stage, REMEDIATION_TASK));
    let data = remediation_data(rule, problem_url);

    Ok(CloudEvent::new(event_type, EVENT_SOURCE, &data)?.with_context(context))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remediation_event() {
        let rule = RuleName::new("fulltour2", "production", "helloservice", "number_of_logs", ">0");
        let event = remediation_event(&rule, "splunk:8089/job/results", "ctx-1").unwrap();

        assert_eq!(
            event.event_type,
            "sh.keptn.event.production.remediation.triggered"
        );
        assert_eq!(event.source, "splunk");
        assert_eq!(event.shkeptncontext, "ctx-1");

        let data: RemediationTriggeredData = event.data_as().unwrap();
        assert_eq!(data.event.project, "fulltour2");
        assert_eq!(data.event.stage, "production");
        assert_eq!(data.event.service, "helloservice");
        assert_eq!(data.problem.state, "OPEN");
        assert_eq!(data.problem.problem_title, "number_of_logs");
        assert_eq!(data.problem.impacted_entity, "helloservice-primary");
        assert_eq!(data.deployment.deployment_names, vec!["primary"]);
    }

    #[test]
    fn test_payload_field_names() {
        let rule = RuleName::new("p", "s", "svc", "sli", "");
        let json = serde_json::to_value(remediation_data(&rule, "url")).unwrap();

        assert_eq!(json["problem"]["problemURL"], "url");
        assert_eq!(json["problem"]["problemTitle"], "sli");
        assert_eq!(json["labels"]["Problem URL"], "url");
        assert_eq!(json["deployment"]["deploymentNames"][0], "primary");
    }
}
