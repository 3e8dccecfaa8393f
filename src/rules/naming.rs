//! Alert rule naming scheme
//!
//! Rule names are the only place Splunk keeps the Keptn coordinates of an
//! alert: `project,stage,service,sli,criterion,keptn`. The trailing marker
//! tells rules created here apart from anything else in the instance.

use std::fmt;

/// Marker appended to every rule created by this service
pub const OWNER_SUFFIX: &str = "keptn";

const SEPARATOR: char = ',';
/// Fields of a name produced by [`RuleName::encode`]
const FIELD_COUNT: usize = 6;

/// Decoded alert rule name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleName {
    pub project: String,
    pub stage: String,
    pub service: String,
    pub sli: String,
    /// Inverted criterion, empty when the name only carried the coordinates
    pub criterion: String,
}

impl RuleName {
    pub fn new(
        project: impl Into<String>,
        stage: impl Into<String>,
        service: impl Into<String>,
        sli: impl Into<String>,
        criterion: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            stage: stage.into(),
            service: service.into(),
            sli: sli.into(),
            criterion: criterion.into(),
        }
    }

    /// Platform-visible name
    pub fn encode(&self) -> String {
        [
            self.project.as_str(),
            self.stage.as_str(),
            self.service.as_str(),
            self.sli.as_str(),
            self.criterion.as_str(),
            OWNER_SUFFIX,
        ]
        .join(",")
    }

    /// Recover the coordinates from a rule name.
    ///
    /// Only the first four fields are required; firings reported by older
    /// rules may not carry the criterion.
    pub fn decode(name: &str) -> Result<Self, RuleNameError> {
        let parts: Vec<&str> = name.split(SEPARATOR).collect();
        if parts.len() < 4 {
            return Err(RuleNameError::Malformed(name.to_string()));
        }
        if parts.len() > FIELD_COUNT {
            tracing::debug!(
                alert = %name,
                fields = parts.len(),
                "Rule name has more fields than expected, extra fields ignored"
            );
        }

        Ok(Self {
            project: parts[0].to_string(),
            stage: parts[1].to_string(),
            service: parts[2].to_string(),
            sli: parts[3].to_string(),
            criterion: parts
                .get(4)
                .filter(|c| **c != OWNER_SUFFIX)
                .map(|c| c.to_string())
                .unwrap_or_default(),
        })
    }

    /// Whether a rule name was created by this service
    pub fn is_owned(name: &str) -> bool {
        name.ends_with(OWNER_SUFFIX)
    }
}

impl fmt::Display for RuleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RuleNameError {
    #[error("Malformed rule name: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let name = RuleName::new("proj", "stage", "svc", "sli", ">600");
        assert_eq!(name.encode(), "proj,stage,svc,sli,>600,keptn");
        assert_eq!(name.to_string(), name.encode());
    }

    #[test]
    fn test_decode_full_name() {
        let name = RuleName::decode("fulltour2,production,helloservice,number_of_logs,<=0,keptn")
            .unwrap();
        assert_eq!(name.project, "fulltour2");
        assert_eq!(name.stage, "production");
        assert_eq!(name.service, "helloservice");
        assert_eq!(name.sli, "number_of_logs");
        assert_eq!(name.criterion, "<=0");
    }

    #[test]
    fn test_decode_coordinates_only() {
        let name = RuleName::decode("p,s,svc,sli").unwrap();
        assert_eq!(name.sli, "sli");
        assert_eq!(name.criterion, "");
    }

    #[test]
    fn test_decode_ignores_extra_fields() {
        let name = RuleName::decode("p,s,svc,sli,>1,keptn,extra,keptn").unwrap();
        assert_eq!(name, RuleName::new("p", "s", "svc", "sli", ">1"));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(
            RuleName::decode("p,s,svc"),
            Err(RuleNameError::Malformed(_))
        ));
    }

    #[test]
    fn test_ownership() {
        assert!(RuleName::is_owned("p,s,svc,sli,>=1,keptn"));
        assert!(!RuleName::is_owned("Errors in the last hour"));
    }
}
