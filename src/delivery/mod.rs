//! Downstream delivery — task sync, chat bot, ticket tracker.
//!
//! At-least-once with idempotency keys: each report carries a delivery
//! id, and per-target outcomes are recorded so failed targets can be
//! re-sent manually from the activity log. A failed target never blocks
//! marking the source item processed — the user already reviewed the
//! content.

pub mod bot;
pub mod tracker;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::DeliveryError;

/// Chat-bot collaborator contract.
#[async_trait]
pub trait BotNotifier: Send + Sync {
    /// Post a markdown message to a recipient.
    async fn post_message(&self, markdown: &str, recipient: &str) -> Result<(), DeliveryError>;
}

/// One issue to create in the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueDraft {
    pub summary: String,
    pub description: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub custom_fields: serde_json::Map<String, serde_json::Value>,
}

/// Per-issue creation outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueOutcome {
    pub issue_key: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Ticket-tracker collaborator contract.
#[async_trait]
pub trait TicketTracker: Send + Sync {
    /// Create issues, one outcome per draft, in order.
    async fn create_issues(&self, drafts: &[IssueDraft]) -> Vec<IssueOutcome>;
}

/// A downstream destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryTarget {
    TaskSync,
    Bot,
    Tracker,
}

impl std::fmt::Display for DeliveryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::TaskSync => "task_sync",
            Self::Bot => "bot",
            Self::Tracker => "tracker",
        };
        write!(f, "{s}")
    }
}

/// Outcome of one target's delivery attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetOutcome {
    pub target: DeliveryTarget,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Record of one item's fan-out, surfaced in the activity log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryReport {
    /// Idempotency key for this delivery round.
    pub delivery_id: Uuid,
    /// Mailbox identifier of the source item.
    pub source_id: String,
    pub outcomes: Vec<TargetOutcome>,
}

impl DeliveryReport {
    pub fn new(source_id: impl Into<String>) -> Self {
        Self {
            delivery_id: Uuid::new_v4(),
            source_id: source_id.into(),
            outcomes: Vec::new(),
        }
    }

    pub fn record(&mut self, target: DeliveryTarget, success: bool, detail: Option<String>) {
        if success {
            info!(%target, source = %self.source_id, "Delivery succeeded");
        } else {
            error!(
                %target,
                source = %self.source_id,
                detail = detail.as_deref().unwrap_or("unknown"),
                "Delivery failed — item stays processed, re-send manually"
            );
        }
        self.outcomes.push(TargetOutcome {
            target,
            success,
            detail,
        });
    }

    /// True when every attempted target succeeded.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    pub fn failed_targets(&self) -> Vec<DeliveryTarget> {
        self.outcomes
            .iter()
            .filter(|o| !o.success)
            .map(|o| o.target)
            .collect()
    }
}

/// How many times a failing delivery call is attempted.
pub const DELIVERY_ATTEMPTS: u32 = 3;
/// Pause between attempts.
pub const RETRY_BACKOFF: Duration = Duration::from_secs(2);

/// Run `op` up to `attempts` times with a fixed backoff between tries.
pub async fn with_retries<T, F, Fut>(
    target: &'static str,
    attempts: u32,
    mut op: F,
) -> Result<T, DeliveryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DeliveryError>>,
{
    let mut last_message = String::new();
    for attempt in 1..=attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(target, attempt, error = %e, "Delivery attempt failed");
                last_message = e.to_string();
                if attempt < attempts {
                    tokio::time::sleep(RETRY_BACKOFF).await;
                }
            }
        }
    }
    Err(DeliveryError::AttemptsExhausted {
        target,
        attempts,
        message: last_message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn report_tracks_partial_failure() {
        let mut report = DeliveryReport::new("msg-1");
        report.record(DeliveryTarget::TaskSync, true, None);
        report.record(DeliveryTarget::Bot, false, Some("timeout".into()));
        report.record(DeliveryTarget::Tracker, true, None);

        assert!(!report.all_succeeded());
        assert_eq!(report.failed_targets(), vec![DeliveryTarget::Bot]);
    }

    #[test]
    fn report_with_all_successes() {
        let mut report = DeliveryReport::new("msg-2");
        report.record(DeliveryTarget::Bot, true, None);
        assert!(report.all_succeeded());
        assert!(report.failed_targets().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success() {
        let calls = AtomicU32::new(0);
        let result = with_retries("bot", 3, || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(DeliveryError::Bot("flaky".into()))
                } else {
                    Ok(n)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_exhaust_into_error() {
        let result: Result<(), _> = with_retries("tracker", 2, || async {
            Err(DeliveryError::Tracker("down".into()))
        })
        .await;
        assert!(matches!(
            result,
            Err(DeliveryError::AttemptsExhausted {
                target: "tracker",
                attempts: 2,
                ..
            })
        ));
    }

    #[test]
    fn target_display_labels() {
        assert_eq!(DeliveryTarget::TaskSync.to_string(), "task_sync");
        assert_eq!(DeliveryTarget::Bot.to_string(), "bot");
        assert_eq!(DeliveryTarget::Tracker.to_string(), "tracker");
    }
}
