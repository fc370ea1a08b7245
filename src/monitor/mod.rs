//! The monitoring loop — turns raw mailbox contents into approved,
//! posted outcomes.
//!
//! Single cooperative task: poll → de-duplicate against the state store
//! → approval gate → classify → extract → resolve due dates → review →
//! deliver → persist. No item is processed twice, and no two completions
//! land closer together than the configured processing delay.

pub mod session;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::analysis::{AnalysisResult, Analyzer, profile_for};
use crate::approval::{Approval, Decision};
use crate::classify;
use crate::config::TriageConfig;
use crate::delivery::bot::format_summary;
use crate::delivery::tracker::drafts_from_selection;
use crate::delivery::{
    BotNotifier, DELIVERY_ATTEMPTS, DeliveryReport, DeliveryTarget, TicketTracker, with_retries,
};
use crate::duedate::resolve_due_date;
use crate::error::{DeliveryError, MonitorError};
use crate::mailbox::{CandidateEmail, Mailbox};
use crate::state::StateStore;
use crate::transcript;

pub use session::SessionPhase;

/// Category label attached to tasks created from meeting actions.
const TASK_CATEGORY: &str = "Meeting Recording";

/// Collaborators injected into the loop. Bot and tracker are optional;
/// a missing collaborator simply skips that target.
pub struct MonitorDeps {
    pub mailbox: Arc<dyn Mailbox>,
    pub analyzer: Arc<dyn Analyzer>,
    pub approval: Arc<dyn Approval>,
    pub bot: Option<Arc<dyn BotNotifier>>,
    pub tracker: Option<Arc<dyn TicketTracker>>,
}

/// What one poll cycle did.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    /// Candidates offered for approval this cycle.
    pub candidates_seen: usize,
    /// Identifiers completed (approved and delivered).
    pub processed: Vec<String>,
    /// Identifiers declined by the user.
    pub ignored: Vec<String>,
    /// Delivery reports for completed items, in order.
    pub reports: Vec<DeliveryReport>,
}

/// The monitoring loop. Exclusive owner of the [`StateStore`].
pub struct Monitor {
    config: TriageConfig,
    store: StateStore,
    deps: MonitorDeps,
    phase: SessionPhase,
    last_completion: Option<Instant>,
}

impl Monitor {
    pub fn new(config: TriageConfig, store: StateStore, deps: MonitorDeps) -> Self {
        Self {
            config,
            store,
            deps,
            phase: SessionPhase::Idle,
            last_completion: None,
        }
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    /// Consistent snapshot of the persisted state for readers.
    pub fn state_snapshot(&self) -> crate::state::MonitorState {
        self.store.snapshot()
    }

    fn set_phase(&mut self, to: SessionPhase) {
        if !self.phase.can_transition_to(to) && self.phase != to {
            warn!(from = %self.phase, %to, "Unexpected session transition");
        }
        debug!(from = %self.phase, %to, "Session transition");
        self.phase = to;
    }

    /// Switch monitoring on, establishing a poll baseline of "now" on
    /// first enable so pre-existing mailbox items are never picked up.
    pub fn enable(&mut self) -> Result<(), MonitorError> {
        self.store.update(|s| {
            if s.last_check_time.is_none() {
                s.advance_check_time(Utc::now());
            }
            s.monitoring_enabled = true;
            Ok(())
        })?;
        info!("Monitoring enabled — processing emails from now on");
        Ok(())
    }

    /// Switch monitoring off. The loop settles into `Disabled` at its
    /// next transition point, after finishing any in-flight item.
    pub fn disable(&mut self) -> Result<(), MonitorError> {
        self.store.update(|s| {
            s.monitoring_enabled = false;
            Ok(())
        })?;
        info!("Monitoring disabled");
        Ok(())
    }

    /// Run one poll cycle.
    ///
    /// Mailbox-query failures are transient: the checkpoint stays put and
    /// the next timer tick retries. Persistence failures abort the cycle
    /// with the in-memory state rolled back to the durable snapshot and
    /// the checkpoint uncommitted, so unhandled candidates come back on
    /// the next cycle.
    pub async fn poll_once(&mut self) -> Result<CycleOutcome, MonitorError> {
        let mut outcome = CycleOutcome::default();

        if !self.store.state().monitoring_enabled {
            self.set_phase(SessionPhase::Disabled);
            return Ok(outcome);
        }

        self.set_phase(SessionPhase::Polling);
        let snapshot = self.store.snapshot();

        let items = match self
            .deps
            .mailbox
            .list_items(
                &snapshot.monitored_folder,
                snapshot.last_check_time,
                &snapshot.subject_pattern,
            )
            .await
        {
            Ok(items) => items,
            Err(e) => {
                warn!(error = %e, "Mailbox query failed, will retry next tick");
                return Ok(outcome);
            }
        };

        // Newest received time in the batch. Committed as the checkpoint
        // only once the whole batch is handled — an aborted cycle leaves
        // the checkpoint behind so its unhandled items are offered again.
        let max_received = items.iter().map(|i| i.received_time).max();

        let mut candidates: Vec<CandidateEmail> = items
            .into_iter()
            .filter(|i| !self.store.state().is_handled(&i.id))
            .collect();
        // Oldest first, ids break ties for determinism.
        candidates.sort_by(|a, b| {
            a.received_time
                .cmp(&b.received_time)
                .then_with(|| a.id.cmp(&b.id))
        });

        if candidates.is_empty() {
            debug!("No new candidates");
            self.commit_checkpoint(max_received)?;
            self.set_phase(SessionPhase::Idle);
            return Ok(outcome);
        }
        info!(count = candidates.len(), "Found new candidate email(s)");

        for candidate in candidates {
            if !self.store.state().monitoring_enabled {
                self.set_phase(SessionPhase::Disabled);
                return Ok(outcome);
            }

            self.wait_cooldown().await;
            outcome.candidates_seen += 1;

            self.set_phase(SessionPhase::AwaitingApproval);
            match self.deps.approval.prompt_approval(&candidate).await {
                Decision::Decline => {
                    info!(id = %candidate.id, subject = %candidate.subject, "User declined");
                    self.store.update(|s| s.mark_ignored(&candidate.id))?;
                    outcome.ignored.push(candidate.id.clone());
                    // No cooldown after declines.
                    self.set_phase(SessionPhase::Polling);
                }
                Decision::Approve => {
                    info!(id = %candidate.id, subject = %candidate.subject, "User approved");
                    self.set_phase(SessionPhase::Processing);
                    let report = self.process_candidate(&candidate).await;

                    // Completion means delivery was attempted; failures
                    // are in the report, not a reason to re-offer.
                    self.store.update(|s| s.mark_processed(&candidate.id))?;
                    self.last_completion = Some(Instant::now());
                    outcome.processed.push(candidate.id.clone());
                    outcome.reports.push(report);
                    self.set_phase(SessionPhase::Cooldown);
                }
            }
        }

        self.commit_checkpoint(max_received)?;
        self.set_phase(SessionPhase::Idle);
        Ok(outcome)
    }

    /// Advance the poll checkpoint to the newest received time observed,
    /// not to "now", so items racing the poll window are never skipped.
    ///
    /// Must only be called once every candidate in the batch is in a
    /// ledger. Advancing earlier would orphan unhandled items: the next
    /// query would exclude them while neither ledger records them.
    fn commit_checkpoint(
        &mut self,
        max_received: Option<DateTime<Utc>>,
    ) -> Result<(), MonitorError> {
        if let Some(observed) = max_received {
            self.store.update(|s| {
                s.advance_check_time(observed);
                Ok(())
            })?;
        }
        Ok(())
    }

    /// Enforce the completion-to-start spacing before the next candidate.
    async fn wait_cooldown(&mut self) {
        let delay = Duration::from_secs(self.store.state().processing_delay_seconds);
        if let Some(previous) = self.last_completion {
            let elapsed = previous.elapsed();
            if elapsed < delay {
                let remaining = delay - elapsed;
                self.set_phase(SessionPhase::Cooldown);
                debug!(?remaining, "Cooling down before next candidate");
                tokio::time::sleep(remaining).await;
            }
        }
    }

    /// Full pipeline for one approved candidate: transcript → classify →
    /// extract → due dates → review → deliver.
    ///
    /// Infallible by design — anything that goes wrong is logged and
    /// reflected in the report, and the item still counts as processed.
    async fn process_candidate(&self, candidate: &CandidateEmail) -> DeliveryReport {
        let mut report = DeliveryReport::new(&candidate.id);

        let raw = match self
            .deps
            .mailbox
            .fetch_transcript(&candidate.transcript_ref)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                error!(id = %candidate.id, error = %e, "Transcript unavailable, skipping analysis");
                return report;
            }
        };
        let text = transcript::normalize(&raw);

        let classification = classify::classify(&candidate.subject, &text);
        info!(
            id = %candidate.id,
            category = %classification.category,
            refinement_score = classification.refinement_score,
            action_score = classification.action_score,
            markers = classification.rationale.len(),
            "Meeting classified"
        );

        let profile = profile_for(classification.category);
        let mut analysis = match self
            .deps
            .analyzer
            .analyze(&candidate.subject, &text, profile)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => {
                error!(id = %candidate.id, error = %e, "Analysis failed");
                return report;
            }
        };

        let reference = Utc::now().date_naive();
        for action in &mut analysis.actions {
            action.resolved_due_date =
                Some(resolve_due_date(action.raw_due_hint.as_deref(), reference));
            action.source_meeting_id = candidate.id.clone();
        }

        if analysis.is_empty() {
            info!(id = %candidate.id, "Nothing extracted, nothing to deliver");
            return report;
        }

        let reviewed = self.deps.approval.prompt_selection(analysis).await;
        self.deliver(candidate, &reviewed, &mut report).await;
        report
    }

    /// Fan out the reviewed selection to every enabled target.
    async fn deliver(
        &self,
        candidate: &CandidateEmail,
        reviewed: &AnalysisResult,
        report: &mut DeliveryReport,
    ) {
        let selected_actions: Vec<_> = reviewed.selected_actions().collect();
        let selected_stories: Vec<_> = reviewed.selected_stories().collect();
        if selected_actions.is_empty() && selected_stories.is_empty() {
            info!(id = %candidate.id, "User deselected everything, skipping delivery");
            return;
        }

        if self.config.delivery.create_tasks && !selected_actions.is_empty() {
            let mut created = 0usize;
            let mut last_error = None;
            for action in &selected_actions {
                let due = action
                    .resolved_due_date
                    .unwrap_or_else(|| resolve_due_date(None, Utc::now().date_naive()));
                let mailbox = &self.deps.mailbox;
                let title = action.title.as_str();
                let sync_target = self.config.task_sync_target.as_str();
                let result = with_retries("task_sync", DELIVERY_ATTEMPTS, || async move {
                    mailbox
                        .create_task(title, due, TASK_CATEGORY, sync_target)
                        .await
                        .map_err(|e| DeliveryError::TaskSync(e.to_string()))
                })
                .await;
                match result {
                    Ok(()) => created += 1,
                    Err(e) => last_error = Some(e.to_string()),
                }
            }
            report.record(
                DeliveryTarget::TaskSync,
                created == selected_actions.len(),
                Some(match last_error {
                    Some(err) => format!("{created}/{} tasks created; last error: {err}", selected_actions.len()),
                    None => format!("{created} task(s) created"),
                }),
            );
        }

        if self.config.delivery.notify_bot
            && let Some(bot) = &self.deps.bot
        {
            let markdown = format_summary(&candidate.subject, reviewed, None);
            let message = markdown.as_str();
            let recipient = self.config.bot_recipient.as_str();
            let result = with_retries("bot", DELIVERY_ATTEMPTS, || async move {
                bot.post_message(message, recipient).await
            })
            .await;
            report.record(
                DeliveryTarget::Bot,
                result.is_ok(),
                result.err().map(|e| e.to_string()),
            );
        }

        if self.config.delivery.post_tracker
            && let Some(tracker) = &self.deps.tracker
        {
            let drafts =
                drafts_from_selection(&candidate.subject, &selected_stories, &selected_actions);
            if !drafts.is_empty() {
                let outcomes = tracker.create_issues(&drafts).await;
                let failed: Vec<String> = outcomes
                    .iter()
                    .filter(|o| !o.success)
                    .filter_map(|o| o.error.clone())
                    .collect();
                report.record(
                    DeliveryTarget::Tracker,
                    failed.is_empty(),
                    if failed.is_empty() {
                        Some(format!("{} issue(s) created", outcomes.len()))
                    } else {
                        Some(failed.join("; "))
                    },
                );
            }
        }
    }
}

/// Spawn the monitoring loop on its poll timer.
///
/// Returns the task handle and a shutdown flag; setting the flag stops
/// polling at the next tick. The task also exits once the session
/// settles into `Disabled`.
pub fn spawn_monitor(mut monitor: Monitor) -> (JoinHandle<()>, Arc<AtomicBool>) {
    let shutdown = Arc::new(AtomicBool::new(false));
    let shutdown_flag = Arc::clone(&shutdown);

    let handle = tokio::spawn(async move {
        let interval_secs = monitor.store.state().polling_interval_seconds.max(1);
        info!(
            folder = %monitor.store.state().monitored_folder,
            interval_secs,
            "Monitor started"
        );

        let mut tick = tokio::time::interval(Duration::from_secs(interval_secs));
        loop {
            tick.tick().await;

            if shutdown.load(Ordering::Relaxed) {
                info!("Monitor shutting down");
                return;
            }

            match monitor.poll_once().await {
                Ok(outcome) => {
                    if !outcome.processed.is_empty() || !outcome.ignored.is_empty() {
                        info!(
                            processed = outcome.processed.len(),
                            ignored = outcome.ignored.len(),
                            "Poll cycle complete"
                        );
                    }
                }
                Err(e) => error!(error = %e, "Poll cycle failed"),
            }

            if monitor.phase().is_terminal() {
                info!("Monitoring disabled, loop exiting");
                return;
            }
        }
    });

    (handle, shutdown_flag)
}
