//! Compilation of SLO objectives into Splunk alert rules
//!
//! Each absolute pass criterion of an objective becomes one saved search
//! that fires while the criterion is violated.

pub mod compiler;
pub mod naming;
pub mod time_range;

pub use compiler::{
    compile_criterion, invert_criterion, result_field_name, CompileError, CompileOutcome,
    CompiledCriterion, RuleTarget,
};
pub use naming::{RuleName, RuleNameError, OWNER_SUFFIX};
pub use time_range::{extract_time_range, QueryTimeRange};

/// Settings shared by every rule, taken from the service configuration
#[derive(Debug, Clone)]
pub struct RuleDefaults {
    pub cron_schedule: String,
    pub earliest_time: String,
    pub latest_time: String,
    pub suppress_period: String,
    pub actions: String,
    pub webhook_url: String,
}

impl Default for RuleDefaults {
    fn default() -> Self {
        Self {
            cron_schedule: "*/1 * * * *".to_string(),
            earliest_time: "-3m".to_string(),
            latest_time: "now".to_string(),
            suppress_period: "3m".to_string(),
            actions: String::new(),
            webhook_url: String::new(),
        }
    }
}

/// Alert rule definition as created on the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertRule {
    pub name: String,
    pub cron_schedule: String,
    pub query: String,
    pub earliest_time: String,
    pub latest_time: String,
    pub condition: String,
    pub suppress: bool,
    pub suppress_period: String,
    pub actions: String,
    pub webhook_url: String,
}

impl AlertRule {
    /// Build the rule for a compiled criterion.
    ///
    /// Time directives found in the query override the configured bounds
    /// and are removed from the saved search text.
    pub fn from_compiled(compiled: &CompiledCriterion, query: &str, defaults: &RuleDefaults) -> Self {
        let range = extract_time_range(&defaults.earliest_time, &defaults.latest_time, query);

        Self {
            name: compiled.name.encode(),
            cron_schedule: defaults.cron_schedule.clone(),
            query: range.query,
            earliest_time: range.earliest,
            latest_time: range.latest,
            condition: compiled.condition.clone(),
            suppress: true,
            suppress_period: defaults.suppress_period.clone(),
            actions: defaults.actions.clone(),
            webhook_url: defaults.webhook_url.clone(),
        }
    }
}
