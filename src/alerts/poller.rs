//! Background poller for fired alerts
//!
//! Splunk keeps the firings of every saved search. Each cycle looks at the
//! firings of rules owned by this service and forwards the ones that
//! happened since the previous cycle as remediation events.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::context::{context_seed, derive_context};
use super::notifier::{EventSender, NotifierError};
use super::remediation::remediation_event;
use crate::rules::{RuleName, RuleNameError};
use crate::splunk::{AlertPlatform, FiredAlert};

/// Slack absorbing clock and cadence drift between cycles
pub const POLLING_GRACE_SECS: i64 = 2;

/// Whether a firing at `trigger_time` belongs to the cycle running at `now`
pub fn in_polling_window(trigger_time: i64, now: i64, polling_frequency_secs: i64) -> bool {
    trigger_time <= now && trigger_time > now - polling_frequency_secs - POLLING_GRACE_SECS
}

/// Background poller
pub struct AlertPoller {
    platform: Arc<dyn AlertPlatform>,
    sender: Arc<dyn EventSender>,
    polling_frequency: Duration,
}

impl AlertPoller {
    pub fn new(
        platform: Arc<dyn AlertPlatform>,
        sender: Arc<dyn EventSender>,
        polling_frequency: Duration,
    ) -> Self {
        Self {
            platform,
            sender,
            polling_frequency,
        }
    }

    /// Start polling in the background
    pub fn start(self: Arc<Self>) -> PollerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let join = tokio::spawn(async move {
            tracing::info!(
                interval = ?self.polling_frequency,
                "Start polling for triggered alerts"
            );

            loop {
                self.poll_once().await;

                tokio::select! {
                    _ = tokio::time::sleep(self.polling_frequency) => {}
                    _ = shutdown_rx.recv() => {
                        tracing::info!("Alert poller shutting down");
                        break;
                    }
                }
            }
        });

        PollerHandle { shutdown_tx, join }
    }

    /// Run one cycle now, returning the number of dispatched instances
    pub async fn poll_once(&self) -> usize {
        self.poll_at(Utc::now()).await
    }

    /// Run one cycle as if the current time were `now`
    pub async fn poll_at(&self, now: DateTime<Utc>) -> usize {
        tracing::debug!("Searching for triggered alerts");

        let fired = match self.platform.list_fired_alerts().await {
            Ok(fired) => fired,
            Err(e) => {
                tracing::error!(error = %e, "Failed to list triggered alerts");
                return 0;
            }
        };

        let frequency_secs = self.polling_frequency.as_secs() as i64;
        let mut dispatched = 0;

        for alert in fired.iter().filter(|a| RuleName::is_owned(&a.name)) {
            let instances = match self.platform.list_fired_instances(&alert.links.list).await {
                Ok(instances) => instances,
                Err(e) => {
                    tracing::error!(
                        alert = %alert.name,
                        error = %e,
                        "Failed to list instances of triggered alert"
                    );
                    continue;
                }
            };

            for instance in instances.iter().filter(|i| {
                in_polling_window(i.content.trigger_time, now.timestamp(), frequency_secs)
            }) {
                match self.dispatch(instance, now).await {
                    Ok(()) => {
                        dispatched += 1;
                        tracing::debug!(instance = %instance.name, "Event dispatched");
                    }
                    Err(e) => {
                        tracing::error!(
                            instance = %instance.name,
                            error = %e,
                            "Could not process and forward fired alert"
                        );
                    }
                }
            }
        }

        dispatched
    }

    /// Forward one fired instance as a remediation event
    pub async fn dispatch(&self, instance: &FiredAlert, now: DateTime<Utc>) -> Result<(), DispatchError> {
        tracing::info!(
            instance = %instance.name,
            rule = %instance.content.savedsearch_name,
            "New alert found in Splunk alerting system"
        );

        let rule = RuleName::decode(&instance.content.savedsearch_name)?;
        let problem_url = self.platform.job_results_url(&instance.links.job);

        let context = if instance.content.sid.is_empty() {
            tracing::debug!(instance = %instance.name, "No search id, sending without context");
            String::new()
        } else {
            derive_context(&context_seed(&instance.content.sid, now))
        };

        let event = remediation_event(&rule, &problem_url, &context)
            .map_err(|e| DispatchError::Encode(e.to_string()))?;
        self.sender.send(&event).await?;

        Ok(())
    }
}

/// Handle on a running poller
pub struct PollerHandle {
    shutdown_tx: mpsc::Sender<()>,
    join: JoinHandle<()>,
}

impl PollerHandle {
    /// Stop after the current cycle and wait for the task to end
    pub async fn stop(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Alert poller task failed");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error(transparent)]
    RuleName(#[from] RuleNameError),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error(transparent)]
    Send(#[from] NotifierError),
}
