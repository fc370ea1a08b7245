//! Runtime configuration, built from environment variables.

use std::path::PathBuf;

use crate::error::ConfigError;

/// Where delivery of approved results is enabled.
#[derive(Debug, Clone)]
pub struct DeliveryToggles {
    /// Create tasks in the mailbox task list for approved action items.
    pub create_tasks: bool,
    /// Send a markdown summary to the chat bot.
    pub notify_bot: bool,
    /// Post approved issues to the ticket tracker.
    pub post_tracker: bool,
}

impl Default for DeliveryToggles {
    fn default() -> Self {
        Self {
            create_tasks: true,
            notify_bot: true,
            post_tracker: true,
        }
    }
}

/// Top-level configuration for the triage service.
#[derive(Debug, Clone)]
pub struct TriageConfig {
    /// Path of the persisted monitor state document.
    pub state_path: PathBuf,
    /// Chat bot recipient for analysis summaries.
    pub bot_recipient: String,
    /// Sync target label passed to the mailbox task API.
    pub task_sync_target: String,
    /// Per-target delivery switches.
    pub delivery: DeliveryToggles,
    /// Directory for the activity log file.
    pub log_dir: PathBuf,
}

impl Default for TriageConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from("./data/monitor.json"),
            bot_recipient: String::new(),
            task_sync_target: "todo".to_string(),
            delivery: DeliveryToggles::default(),
            log_dir: PathBuf::from("./logs"),
        }
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl TriageConfig {
    /// Build configuration from `MEETING_TRIAGE_*` environment variables,
    /// falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let config = Self {
            state_path: std::env::var("MEETING_TRIAGE_STATE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.state_path),
            bot_recipient: std::env::var("MEETING_TRIAGE_BOT_RECIPIENT")
                .unwrap_or(defaults.bot_recipient),
            task_sync_target: std::env::var("MEETING_TRIAGE_TASK_SYNC_TARGET")
                .unwrap_or(defaults.task_sync_target),
            delivery: DeliveryToggles {
                create_tasks: env_bool("MEETING_TRIAGE_CREATE_TASKS", true),
                notify_bot: env_bool("MEETING_TRIAGE_NOTIFY_BOT", true),
                post_tracker: env_bool("MEETING_TRIAGE_POST_TRACKER", true),
            },
            log_dir: std::env::var("MEETING_TRIAGE_LOG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.log_dir),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.delivery.notify_bot && self.bot_recipient.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "MEETING_TRIAGE_BOT_RECIPIENT".to_string(),
                message: "bot notifications enabled but no recipient configured".to_string(),
            });
        }
        Ok(())
    }
}
