//! End-to-end monitoring loop tests with scripted collaborators.

use std::collections::{HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};

use meeting_triage::analysis::{
    ActionItem, AnalysisResult, Analyzer, ExtractionProfile, UserStory,
};
use meeting_triage::approval::{Approval, Decision};
use meeting_triage::config::TriageConfig;
use meeting_triage::delivery::{BotNotifier, IssueDraft, IssueOutcome, TicketTracker};
use meeting_triage::duedate::resolve_due_date;
use meeting_triage::error::{AnalysisError, DeliveryError, MailboxError};
use meeting_triage::mailbox::{CandidateEmail, Mailbox};
use meeting_triage::monitor::{Monitor, MonitorDeps, SessionPhase};
use meeting_triage::state::StateStore;

// ── Scripted collaborators ──────────────────────────────────────────

/// In-memory mailbox. By default it ignores the `since` bound so
/// exactly-once behavior has to come from the processed/ignored ledgers;
/// checkpoint tests flip `honor_since` on.
struct StubMailbox {
    items: Mutex<Vec<CandidateEmail>>,
    transcripts: HashMap<String, String>,
    fail_tasks: bool,
    honor_since: bool,
    created_tasks: Mutex<Vec<(String, NaiveDate)>>,
}

impl StubMailbox {
    fn new(items: Vec<CandidateEmail>, transcripts: HashMap<String, String>) -> Self {
        Self {
            items: Mutex::new(items),
            transcripts,
            fail_tasks: false,
            honor_since: false,
            created_tasks: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Mailbox for StubMailbox {
    async fn list_items(
        &self,
        _folder: &str,
        since: Option<DateTime<Utc>>,
        subject_contains: &str,
    ) -> Result<Vec<CandidateEmail>, MailboxError> {
        let pattern = subject_contains.to_lowercase();
        Ok(self
            .items
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.subject.to_lowercase().contains(&pattern))
            .filter(|i| !self.honor_since || since.map_or(true, |s| i.received_time > s))
            .cloned()
            .collect())
    }

    async fn fetch_transcript(&self, transcript_ref: &str) -> Result<String, MailboxError> {
        self.transcripts
            .get(transcript_ref)
            .cloned()
            .ok_or_else(|| MailboxError::TranscriptFetch {
                reference: transcript_ref.to_string(),
                message: "not found".to_string(),
            })
    }

    async fn create_task(
        &self,
        title: &str,
        due_date: NaiveDate,
        _category: &str,
        _sync_target: &str,
    ) -> Result<(), MailboxError> {
        if self.fail_tasks {
            return Err(MailboxError::TaskCreation("task API down".to_string()));
        }
        self.created_tasks
            .lock()
            .unwrap()
            .push((title.to_string(), due_date));
        Ok(())
    }
}

/// Returns a canned result and records the profile it was asked for.
struct StubAnalyzer {
    result: AnalysisResult,
    seen_profile: Mutex<Option<ExtractionProfile>>,
}

impl StubAnalyzer {
    fn returning(result: AnalysisResult) -> Self {
        Self {
            result,
            seen_profile: Mutex::new(None),
        }
    }
}

#[async_trait]
impl Analyzer for StubAnalyzer {
    async fn analyze(
        &self,
        _title: &str,
        _transcript: &str,
        profile: ExtractionProfile,
    ) -> Result<AnalysisResult, AnalysisError> {
        *self.seen_profile.lock().unwrap() = Some(profile);
        Ok(self.result.clone())
    }
}

/// Pops decisions from a script; declines once the script runs out.
/// Records when each approval prompt fired for spacing assertions.
struct ScriptedApproval {
    decisions: Mutex<VecDeque<Decision>>,
    deselect_all: bool,
    prompt_instants: Mutex<Vec<tokio::time::Instant>>,
}

impl ScriptedApproval {
    fn with(decisions: Vec<Decision>) -> Self {
        Self {
            decisions: Mutex::new(decisions.into()),
            deselect_all: false,
            prompt_instants: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Approval for ScriptedApproval {
    async fn prompt_approval(&self, _candidate: &CandidateEmail) -> Decision {
        self.prompt_instants
            .lock()
            .unwrap()
            .push(tokio::time::Instant::now());
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Decision::Decline)
    }

    async fn prompt_selection(&self, mut result: AnalysisResult) -> AnalysisResult {
        if self.deselect_all {
            for story in &mut result.stories {
                story.selected = false;
            }
            for action in &mut result.actions {
                action.selected = false;
            }
        }
        result
    }
}

struct RecordingBot {
    messages: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingBot {
    fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            fail: false,
        }
    }
}

#[async_trait]
impl BotNotifier for RecordingBot {
    async fn post_message(&self, markdown: &str, _recipient: &str) -> Result<(), DeliveryError> {
        if self.fail {
            return Err(DeliveryError::Bot("503".to_string()));
        }
        self.messages.lock().unwrap().push(markdown.to_string());
        Ok(())
    }
}

struct RecordingTracker {
    drafts: Mutex<Vec<IssueDraft>>,
}

#[async_trait]
impl TicketTracker for RecordingTracker {
    async fn create_issues(&self, drafts: &[IssueDraft]) -> Vec<IssueOutcome> {
        let mut seen = self.drafts.lock().unwrap();
        drafts
            .iter()
            .enumerate()
            .map(|(i, d)| {
                seen.push(d.clone());
                IssueOutcome {
                    issue_key: Some(format!("MT-{}", i + 1)),
                    success: true,
                    error: None,
                }
            })
            .collect()
    }
}

/// Approves everything, but wrecks the state directory during the first
/// selection review so the subsequent persist fails.
struct SabotagingApproval {
    decisions: Mutex<VecDeque<Decision>>,
    state_dir: PathBuf,
    armed: AtomicBool,
}

#[async_trait]
impl Approval for SabotagingApproval {
    async fn prompt_approval(&self, _candidate: &CandidateEmail) -> Decision {
        self.decisions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Decision::Decline)
    }

    async fn prompt_selection(&self, result: AnalysisResult) -> AnalysisResult {
        if self.armed.swap(false, Ordering::SeqCst) {
            std::fs::remove_dir_all(&self.state_dir).unwrap();
            std::fs::write(&self.state_dir, "blocked").unwrap();
        }
        result
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

const SUBJECT: &str = "Your Webex meeting content is available: Sprint sync";

fn candidate(id: &str, minutes_ago: i64) -> CandidateEmail {
    CandidateEmail {
        id: id.to_string(),
        subject: SUBJECT.to_string(),
        received_time: Utc::now() - Duration::minutes(minutes_ago),
        transcript_ref: format!("{id}.vtt"),
    }
}

fn transcript_with_actions() -> String {
    "WEBVTT\n\n1\n00:00:01.000 --> 00:00:04.000\nLet's go over the action items from last time.\n\n2\n00:00:05.000 --> 00:00:09.000\nDana will take that, we need it done by next week.\n".to_string()
}

fn one_action_result() -> AnalysisResult {
    AnalysisResult {
        stories: Vec::new(),
        actions: vec![ActionItem {
            title: "Send the revised deck".to_string(),
            description: "Include the Q3 numbers.".to_string(),
            owner: Some("Dana".to_string()),
            raw_due_hint: Some("urgent".to_string()),
            related_decision: None,
            resolved_due_date: None,
            selected: true,
            source_meeting_id: String::new(),
        }],
    }
}

fn test_config() -> TriageConfig {
    let mut config = TriageConfig::default();
    config.bot_recipient = "team@example.com".to_string();
    config
}

fn enabled_store(dir: &tempfile::TempDir) -> StateStore {
    let mut store = StateStore::load_or_default(dir.path().join("monitor.json")).unwrap();
    store
        .update(|s| {
            s.monitoring_enabled = true;
            Ok(())
        })
        .unwrap();
    store
}

struct Harness {
    mailbox: Arc<StubMailbox>,
    analyzer: Arc<StubAnalyzer>,
    approval: Arc<ScriptedApproval>,
    bot: Arc<RecordingBot>,
    tracker: Arc<RecordingTracker>,
    monitor: Monitor,
    _dir: tempfile::TempDir,
}

fn harness(
    mailbox: StubMailbox,
    analyzer: StubAnalyzer,
    approval: ScriptedApproval,
    bot: RecordingBot,
) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = enabled_store(&dir);
    let mailbox = Arc::new(mailbox);
    let analyzer = Arc::new(analyzer);
    let approval = Arc::new(approval);
    let bot = Arc::new(bot);
    let tracker = Arc::new(RecordingTracker {
        drafts: Mutex::new(Vec::new()),
    });
    let deps = MonitorDeps {
        mailbox: Arc::clone(&mailbox) as Arc<dyn Mailbox>,
        analyzer: Arc::clone(&analyzer) as Arc<dyn Analyzer>,
        approval: Arc::clone(&approval) as Arc<dyn Approval>,
        bot: Some(Arc::clone(&bot) as Arc<dyn BotNotifier>),
        tracker: Some(Arc::clone(&tracker) as Arc<dyn TicketTracker>),
    };
    let monitor = Monitor::new(test_config(), store, deps);
    Harness {
        mailbox,
        analyzer,
        approval,
        bot,
        tracker,
        monitor,
        _dir: dir,
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn approved_item_is_processed_exactly_once() {
    let mut h = harness(
        StubMailbox::new(
            vec![candidate("m1", 10)],
            HashMap::from([("m1.vtt".to_string(), transcript_with_actions())]),
        ),
        StubAnalyzer::returning(one_action_result()),
        ScriptedApproval::with(vec![Decision::Approve]),
        RecordingBot::new(),
    );

    let outcome = h.monitor.poll_once().await.unwrap();
    assert_eq!(outcome.processed, vec!["m1"]);
    assert!(outcome.ignored.is_empty());
    assert_eq!(outcome.reports.len(), 1);
    assert!(outcome.reports[0].all_succeeded());

    // Task got the inference-engine date, not the raw hint.
    let tasks = h.mailbox.created_tasks.lock().unwrap().clone();
    let expected_due = resolve_due_date(Some("urgent"), Utc::now().date_naive());
    assert_eq!(tasks, vec![("Send the revised deck".to_string(), expected_due)]);

    assert_eq!(h.bot.messages.lock().unwrap().len(), 1);
    assert_eq!(h.tracker.drafts.lock().unwrap().len(), 1);

    // The mailbox keeps returning the item, but the ledger wins.
    let second = h.monitor.poll_once().await.unwrap();
    assert!(second.processed.is_empty());
    assert_eq!(second.candidates_seen, 0);
    assert_eq!(h.bot.messages.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn declined_item_is_never_offered_again() {
    let mut h = harness(
        StubMailbox::new(
            vec![candidate("m1", 10)],
            HashMap::from([("m1.vtt".to_string(), transcript_with_actions())]),
        ),
        StubAnalyzer::returning(one_action_result()),
        ScriptedApproval::with(vec![Decision::Decline]),
        RecordingBot::new(),
    );

    let outcome = h.monitor.poll_once().await.unwrap();
    assert_eq!(outcome.ignored, vec!["m1"]);
    assert!(outcome.processed.is_empty());
    assert!(h.bot.messages.lock().unwrap().is_empty());

    let state = h.monitor.state_snapshot();
    assert!(state.ignored_ids.contains("m1"));
    assert!(!state.processed_ids.contains("m1"));

    let second = h.monitor.poll_once().await.unwrap();
    assert_eq!(second.candidates_seen, 0);
}

#[tokio::test(start_paused = true)]
async fn delivery_failure_still_marks_processed() {
    let mut mailbox = StubMailbox::new(
        vec![candidate("m1", 10)],
        HashMap::from([("m1.vtt".to_string(), transcript_with_actions())]),
    );
    mailbox.fail_tasks = true;
    let mut bot = RecordingBot::new();
    bot.fail = true;

    let mut h = harness(
        mailbox,
        StubAnalyzer::returning(one_action_result()),
        ScriptedApproval::with(vec![Decision::Approve]),
        bot,
    );

    let outcome = h.monitor.poll_once().await.unwrap();
    assert_eq!(outcome.processed, vec!["m1"]);
    let report = &outcome.reports[0];
    assert!(!report.all_succeeded());
    assert_eq!(report.failed_targets().len(), 2);

    // Not re-offered despite the failures.
    assert!(h.monitor.state_snapshot().processed_ids.contains("m1"));
    let second = h.monitor.poll_once().await.unwrap();
    assert_eq!(second.candidates_seen, 0);
}

#[tokio::test(start_paused = true)]
async fn checkpoint_advances_to_newest_received_time() {
    let newest = Utc::now() + Duration::minutes(5);
    let mut older = candidate("m1", 10);
    older.received_time = Utc::now() - Duration::minutes(10);
    let mut newer = candidate("m2", 0);
    newer.received_time = newest;

    let mut h = harness(
        StubMailbox::new(
            vec![older, newer],
            HashMap::from([
                ("m1.vtt".to_string(), transcript_with_actions()),
                ("m2.vtt".to_string(), transcript_with_actions()),
            ]),
        ),
        StubAnalyzer::returning(AnalysisResult::default()),
        ScriptedApproval::with(vec![Decision::Decline, Decision::Decline]),
        RecordingBot::new(),
    );

    h.monitor.poll_once().await.unwrap();
    assert_eq!(h.monitor.state_snapshot().last_check_time, Some(newest));
}

#[tokio::test(start_paused = true)]
async fn candidates_are_offered_oldest_first() {
    let mut h = harness(
        StubMailbox::new(
            vec![candidate("m2", 5), candidate("m1", 20)],
            HashMap::from([
                ("m1.vtt".to_string(), transcript_with_actions()),
                ("m2.vtt".to_string(), transcript_with_actions()),
            ]),
        ),
        StubAnalyzer::returning(one_action_result()),
        ScriptedApproval::with(vec![Decision::Approve, Decision::Approve]),
        RecordingBot::new(),
    );

    let outcome = h.monitor.poll_once().await.unwrap();
    assert_eq!(outcome.processed, vec!["m1", "m2"]);
}

#[tokio::test(start_paused = true)]
async fn completions_are_spaced_by_the_processing_delay() {
    let mut h = harness(
        StubMailbox::new(
            vec![candidate("m1", 20), candidate("m2", 5)],
            HashMap::from([
                ("m1.vtt".to_string(), transcript_with_actions()),
                ("m2.vtt".to_string(), transcript_with_actions()),
            ]),
        ),
        StubAnalyzer::returning(one_action_result()),
        ScriptedApproval::with(vec![Decision::Approve, Decision::Approve]),
        RecordingBot::new(),
    );

    let outcome = h.monitor.poll_once().await.unwrap();
    assert_eq!(outcome.processed, vec!["m1", "m2"]);

    // Nothing sleeps between prompt and completion under the paused
    // clock, so the first completion coincides with the first prompt.
    // The second prompt must then wait out the full processing delay.
    let delay = StdDuration::from_secs(h.monitor.state_snapshot().processing_delay_seconds);
    let prompts = h.approval.prompt_instants.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1] - prompts[0] >= delay);
}

#[tokio::test(start_paused = true)]
async fn declines_incur_no_cooldown() {
    let mut h = harness(
        StubMailbox::new(
            vec![candidate("m1", 20), candidate("m2", 5)],
            HashMap::from([
                ("m1.vtt".to_string(), transcript_with_actions()),
                ("m2.vtt".to_string(), transcript_with_actions()),
            ]),
        ),
        StubAnalyzer::returning(one_action_result()),
        ScriptedApproval::with(vec![Decision::Decline, Decision::Decline]),
        RecordingBot::new(),
    );

    let outcome = h.monitor.poll_once().await.unwrap();
    assert_eq!(outcome.ignored, vec!["m1", "m2"]);

    let prompts = h.approval.prompt_instants.lock().unwrap().clone();
    assert_eq!(prompts.len(), 2);
    assert!(prompts[1] - prompts[0] < StdDuration::from_secs(1));
}

#[tokio::test(start_paused = true)]
async fn persistence_failure_re_offers_the_item() {
    let dir = tempfile::tempdir().unwrap();
    let state_dir = dir.path().join("state");
    std::fs::create_dir_all(&state_dir).unwrap();
    let mut store = StateStore::load_or_default(state_dir.join("monitor.json")).unwrap();
    store
        .update(|s| {
            s.monitoring_enabled = true;
            Ok(())
        })
        .unwrap();

    let mut mailbox = StubMailbox::new(
        vec![candidate("m1", 10)],
        HashMap::from([("m1.vtt".to_string(), transcript_with_actions())]),
    );
    mailbox.honor_since = true;
    let mailbox = Arc::new(mailbox);
    let approval = Arc::new(SabotagingApproval {
        decisions: Mutex::new(VecDeque::from(vec![Decision::Approve, Decision::Approve])),
        state_dir: state_dir.clone(),
        armed: AtomicBool::new(true),
    });
    let deps = MonitorDeps {
        mailbox: Arc::clone(&mailbox) as Arc<dyn Mailbox>,
        analyzer: Arc::new(StubAnalyzer::returning(one_action_result())),
        approval: Arc::clone(&approval) as Arc<dyn Approval>,
        bot: None,
        tracker: None,
    };
    let mut config = test_config();
    config.delivery.notify_bot = false;
    let mut monitor = Monitor::new(config, store, deps);

    // The state directory vanishes mid-review, so marking the item
    // processed cannot persist and the cycle aborts.
    assert!(monitor.poll_once().await.is_err());
    let state = monitor.state_snapshot();
    assert!(state.processed_ids.is_empty());
    // Checkpoint uncommitted — the item is still inside the query window.
    assert!(state.last_check_time.is_none());

    // Heal the store; the item must be offered again and complete.
    std::fs::remove_file(&state_dir).unwrap();
    std::fs::create_dir_all(&state_dir).unwrap();
    let outcome = monitor.poll_once().await.unwrap();
    assert_eq!(outcome.processed, vec!["m1"]);
    assert!(monitor.state_snapshot().processed_ids.contains("m1"));
    assert!(monitor.state_snapshot().last_check_time.is_some());
}

#[tokio::test(start_paused = true)]
async fn disabled_monitor_does_not_poll() {
    let mut h = harness(
        StubMailbox::new(vec![candidate("m1", 10)], HashMap::new()),
        StubAnalyzer::returning(one_action_result()),
        ScriptedApproval::with(vec![Decision::Approve]),
        RecordingBot::new(),
    );
    h.monitor.disable().unwrap();

    let outcome = h.monitor.poll_once().await.unwrap();
    assert_eq!(outcome.candidates_seen, 0);
    assert_eq!(h.monitor.phase(), SessionPhase::Disabled);
}

#[tokio::test(start_paused = true)]
async fn refinement_meeting_requests_story_profile() {
    let transcript = "WEBVTT\n\n1\n00:00:01.000 --> 00:00:04.000\nWelcome to backlog refinement, let's look at story points.\n\n2\n00:00:05.000 --> 00:00:09.000\nAs a user I want faster exports, acceptance criteria below.\n\n3\n00:00:10.000 --> 00:00:14.000\nThe definition of ready needs estimation before sprint planning.\n".to_string();
    let story_result = AnalysisResult {
        stories: vec![UserStory {
            summary: "Faster exports".to_string(),
            description: "As a user I want faster exports.".to_string(),
            acceptance_criteria: vec!["Export finishes under 5s".to_string()],
            estimate_points: Some(3),
            assignees: Vec::new(),
            labels: Vec::new(),
            selected: true,
        }],
        actions: Vec::new(),
    };

    let mut h = harness(
        StubMailbox::new(
            vec![CandidateEmail {
                id: "m1".to_string(),
                subject: "Your Webex meeting content is available: Backlog refinement".to_string(),
                received_time: Utc::now() - Duration::minutes(10),
                transcript_ref: "m1.vtt".to_string(),
            }],
            HashMap::from([("m1.vtt".to_string(), transcript)]),
        ),
        StubAnalyzer::returning(story_result),
        ScriptedApproval::with(vec![Decision::Approve]),
        RecordingBot::new(),
    );

    let outcome = h.monitor.poll_once().await.unwrap();
    assert_eq!(outcome.processed, vec!["m1"]);

    let profile = h.analyzer.seen_profile.lock().unwrap().unwrap();
    assert!(profile.extract_user_stories);
    assert!(!profile.extract_action_items);

    // Stories reach the tracker even with no actions to sync.
    assert_eq!(h.tracker.drafts.lock().unwrap().len(), 1);
    assert!(h.mailbox.created_tasks.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn full_deselection_skips_delivery_but_completes() {
    let dir = tempfile::tempdir().unwrap();
    let store = enabled_store(&dir);
    let mailbox = Arc::new(StubMailbox::new(
        vec![candidate("m1", 10)],
        HashMap::from([("m1.vtt".to_string(), transcript_with_actions())]),
    ));
    let bot = Arc::new(RecordingBot::new());
    let mut approval = ScriptedApproval::with(vec![Decision::Approve]);
    approval.deselect_all = true;

    let deps = MonitorDeps {
        mailbox: Arc::clone(&mailbox) as Arc<dyn Mailbox>,
        analyzer: Arc::new(StubAnalyzer::returning(one_action_result())),
        approval: Arc::new(approval),
        bot: Some(Arc::clone(&bot) as Arc<dyn BotNotifier>),
        tracker: None,
    };
    let mut monitor = Monitor::new(test_config(), store, deps);

    let outcome = monitor.poll_once().await.unwrap();
    assert_eq!(outcome.processed, vec!["m1"]);
    assert!(outcome.reports[0].outcomes.is_empty());
    assert!(bot.messages.lock().unwrap().is_empty());
    assert!(mailbox.created_tasks.lock().unwrap().is_empty());
}
