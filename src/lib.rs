//! Splunk SLI provider: Keptn quality gates as Splunk alerts
//!
//! Turns the SLO pass criteria of a Keptn service into Splunk saved searches
//! that fire when a criterion is violated, then watches those alerts and
//! opens a Keptn remediation for every new firing.
//!
//! # Features
//!
//! - **Rule compilation**: absolute criteria (`<=600`) inverted into alert
//!   conditions on the SLI query's aggregation field
//! - **Time ranges**: inline `earliest=`/`latest=` directives become the
//!   saved search dispatch window
//! - **Polling**: fired alerts of owned rules forwarded once per firing
//! - **Correlation**: a stable Keptn context derived from the search id
//! - **SLI retrieval**: `get-sli` answered by running the SLI queries as
//!   search jobs over the evaluation window
//!
//! # Example
//!
//! ```no_run
//! use splunk_sli_provider::rules::{compile_criterion, CompileOutcome, RuleTarget};
//!
//! let target = RuleTarget {
//!     project: "fulltour".to_string(),
//!     stage: "production".to_string(),
//!     service: "helloservice".to_string(),
//! };
//! let outcome = compile_criterion("<=600", "latency", "index=main | stats avg", &target).unwrap();
//! if let CompileOutcome::Compiled(compiled) = outcome {
//!     println!("{} -> {}", compiled.name, compiled.condition);
//! }
//! ```

pub mod alerts;
pub mod api;
pub mod config;
pub mod events;
pub mod indicators;
pub mod monitoring;
pub mod resources;
pub mod rules;
pub mod slo;
pub mod splunk;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use alerts::{AlertPoller, EventSender};
pub use config::{ConfigError, ProviderConfig};
pub use indicators::{SliError, SliRetriever};
pub use monitoring::{MonitoringConfigurator, MonitoringError};
pub use rules::{AlertRule, RuleName};
pub use splunk::{AlertPlatform, SearchPlatform, SplunkClient};
