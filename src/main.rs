use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::Context;
use secrecy::SecretString;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;

use meeting_triage::analysis::http::HttpAnalyzer;
use meeting_triage::approval::ConsoleApproval;
use meeting_triage::config::TriageConfig;
use meeting_triage::delivery::bot::WebexBot;
use meeting_triage::delivery::tracker::JiraTracker;
use meeting_triage::mailbox::FsMailbox;
use meeting_triage::monitor::{Monitor, MonitorDeps, spawn_monitor};
use meeting_triage::state::StateStore;

fn env_secret(key: &str) -> Option<SecretString> {
    std::env::var(key).ok().map(SecretString::from)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = TriageConfig::from_env().context("invalid configuration")?;

    std::fs::create_dir_all(&config.log_dir)
        .with_context(|| format!("creating log dir {}", config.log_dir.display()))?;
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, "activity.log");
    let (file_writer, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("meeting_triage=info")),
        )
        .with_writer(file_writer.and(std::io::stderr))
        .with_ansi(false)
        .init();

    info!("Starting meeting triage service");

    let store = StateStore::load_or_default(&config.state_path)?;

    let mailbox = Arc::new(FsMailbox::new(
        std::env::var("MEETING_TRIAGE_MAILDIR").unwrap_or_else(|_| "./mailbox".to_string()),
    ));

    let analyzer_url = std::env::var("MEETING_TRIAGE_ANALYZER_URL")
        .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
    let analyzer_key = env_secret("MEETING_TRIAGE_ANALYZER_KEY")
        .context("MEETING_TRIAGE_ANALYZER_KEY must be set")?;
    let analyzer_model =
        std::env::var("MEETING_TRIAGE_ANALYZER_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
    let analyzer = Arc::new(HttpAnalyzer::new(analyzer_url, analyzer_key, analyzer_model));

    let bot = if config.delivery.notify_bot {
        let token =
            env_secret("MEETING_TRIAGE_BOT_TOKEN").context("MEETING_TRIAGE_BOT_TOKEN must be set when bot notifications are enabled")?;
        Some(Arc::new(WebexBot::new(token)) as Arc<dyn meeting_triage::delivery::BotNotifier>)
    } else {
        None
    };

    let tracker = match (
        std::env::var("MEETING_TRIAGE_JIRA_URL").ok(),
        std::env::var("MEETING_TRIAGE_JIRA_USER").ok(),
        env_secret("MEETING_TRIAGE_JIRA_TOKEN"),
        std::env::var("MEETING_TRIAGE_JIRA_PROJECT").ok(),
    ) {
        (Some(url), Some(user), Some(token), Some(project)) => Some(Arc::new(
            JiraTracker::new(url, user, token, project),
        )
            as Arc<dyn meeting_triage::delivery::TicketTracker>),
        _ => {
            info!("Ticket tracker not configured, issues will not be posted");
            None
        }
    };

    let deps = MonitorDeps {
        mailbox,
        analyzer,
        approval: Arc::new(ConsoleApproval),
        bot,
        tracker,
    };

    let mut monitor = Monitor::new(config, store, deps);
    monitor.enable()?;
    let (handle, shutdown) = spawn_monitor(monitor);

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    shutdown.store(true, Ordering::Relaxed);
    handle.await?;

    Ok(())
}
