//! Forwarding of fired Splunk alerts to Keptn
//!
//! The poller watches fired alerts of owned rules and emits a remediation
//! event per new firing.

pub mod context;
pub mod notifier;
pub mod poller;
pub mod remediation;

pub use context::{context_seed, derive_context};
pub use notifier::{EventSender, HttpEventSender, MemorySender, NotifierError};
pub use poller::{in_polling_window, AlertPoller, DispatchError, PollerHandle};
pub use remediation::{remediation_event, EVENT_SOURCE};
