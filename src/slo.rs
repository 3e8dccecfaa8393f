//! Keptn quality-gate documents: `slo.yaml`, `sli.yaml` and `shipyard.yaml`

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Contents of `slo.yaml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceLevelObjectives {
    #[serde(default)]
    pub spec_version: String,
    #[serde(default)]
    pub objectives: Vec<Objective>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Objective {
    pub sli: String,
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(default)]
    pub pass: Vec<CriteriaGroup>,
    #[serde(default)]
    pub warning: Vec<CriteriaGroup>,
    #[serde(default)]
    pub weight: Option<u32>,
    #[serde(default)]
    pub key_sli: bool,
}

/// Criteria that must all hold for the group to pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CriteriaGroup {
    #[serde(default)]
    pub criteria: Vec<String>,
}

/// Contents of an `sli.yaml`: SLI name to Splunk search
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SliConfig {
    #[serde(default)]
    pub spec_version: String,
    #[serde(default)]
    pub indicators: HashMap<String, String>,
}

/// Contents of `shipyard.yaml`, reduced to the stages
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Shipyard {
    #[serde(default)]
    pub spec: ShipyardSpec,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShipyardSpec {
    #[serde(default)]
    pub stages: Vec<Stage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
}

impl ServiceLevelObjectives {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

impl SliConfig {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }
}

impl Shipyard {
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    pub fn stage_names(&self) -> impl Iterator<Item = &str> {
        self.spec.stages.iter().map(|s| s.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_slo() {
        let slo = ServiceLevelObjectives::from_yaml(
            r#"
spec_version: "1.0"
comparison:
  aggregate_function: "avg"
objectives:
  - sli: "number_of_logs"
    displayName: "Number of logs"
    pass:
      - criteria:
          - "<=600"
          - "<+10%"
    warning:
      - criteria:
          - "<=800"
    weight: 1
    key_sli: true
  - sli: "error_count"
total_score:
  pass: "90%"
"#,
        )
        .unwrap();

        assert_eq!(slo.objectives.len(), 2);
        let first = &slo.objectives[0];
        assert_eq!(first.display_name, "Number of logs");
        assert_eq!(first.pass[0].criteria, vec!["<=600", "<+10%"]);
        assert!(first.key_sli);
        assert!(slo.objectives[1].pass.is_empty());
    }

    #[test]
    fn test_parse_sli() {
        let sli = SliConfig::from_yaml(
            r#"
spec_version: "1.0"
indicators:
  number_of_logs: "source=/opt/splunk/var/log/splunk/health.log | stats count"
"#,
        )
        .unwrap();

        assert_eq!(
            sli.indicators["number_of_logs"],
            "source=/opt/splunk/var/log/splunk/health.log | stats count"
        );
    }

    #[test]
    fn test_parse_shipyard() {
        let shipyard = Shipyard::from_yaml(
            r#"
apiVersion: "spec.keptn.sh/0.2.2"
kind: "Shipyard"
metadata:
  name: "shipyard-podtato"
spec:
  stages:
    - name: "qa"
      sequences:
        - name: "delivery"
    - name: "production"
"#,
        )
        .unwrap();

        assert_eq!(shipyard.stage_names().collect::<Vec<_>>(), vec!["qa", "production"]);
    }

    #[test]
    fn test_invalid_slo() {
        assert!(ServiceLevelObjectives::from_yaml("objectives: 12").is_err());
    }
}
