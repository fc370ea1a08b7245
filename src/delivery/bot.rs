//! Webex-style chat bot notifier plus the markdown summary formatter.

use async_trait::async_trait;
use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::debug;

use crate::analysis::AnalysisResult;
use crate::delivery::BotNotifier;
use crate::error::DeliveryError;

/// Message size cap imposed by the chat service.
const MAX_MESSAGE_CHARS: usize = 7439;

/// Bot client posting markdown messages over HTTP.
pub struct WebexBot {
    api_url: String,
    token: SecretString,
    client: reqwest::Client,
}

impl WebexBot {
    pub fn new(token: SecretString) -> Self {
        Self::with_api_url("https://webexapis.com/v1", token)
    }

    pub fn with_api_url(api_url: impl Into<String>, token: SecretString) -> Self {
        Self {
            api_url: api_url.into(),
            token,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl BotNotifier for WebexBot {
    async fn post_message(&self, markdown: &str, recipient: &str) -> Result<(), DeliveryError> {
        let truncated: String = markdown.chars().take(MAX_MESSAGE_CHARS).collect();
        let response = self
            .client
            .post(format!("{}/messages", self.api_url))
            .bearer_auth(self.token.expose_secret())
            .json(&json!({
                "toPersonEmail": recipient,
                "markdown": truncated,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(DeliveryError::Bot(format!("{status}: {preview}")));
        }
        debug!(recipient, "Bot message posted");
        Ok(())
    }
}

/// Format an analysis into the bot's markdown summary.
pub fn format_summary(
    meeting_title: &str,
    result: &AnalysisResult,
    recording_url: Option<&str>,
) -> String {
    let mut message = format!("**Meeting Processed:** {meeting_title}\n\n");
    message.push_str(&format!(
        "**Analyzed:** {}\n\n",
        Utc::now().format("%Y-%m-%d %H:%M")
    ));

    let actions: Vec<_> = result.selected_actions().collect();
    if !actions.is_empty() {
        message.push_str(&format!("## Action Items ({})\n\n", actions.len()));
        for (idx, action) in actions.iter().enumerate() {
            message.push_str(&format!("**{}. {}**\n", idx + 1, action.title));
            if let Some(owner) = &action.owner {
                message.push_str(&format!("   - Owner: {owner}\n"));
            }
            if let Some(due) = action.resolved_due_date {
                message.push_str(&format!("   - Due: {due}\n"));
            } else if let Some(hint) = &action.raw_due_hint {
                message.push_str(&format!("   - Due: {hint}\n"));
            }
            if !action.description.is_empty() {
                let desc: String = action.description.chars().take(100).collect();
                let ellipsis = if action.description.chars().count() > 100 {
                    "..."
                } else {
                    ""
                };
                message.push_str(&format!("   - {desc}{ellipsis}\n"));
            }
            message.push('\n');
        }
    }

    let stories: Vec<_> = result.selected_stories().collect();
    if !stories.is_empty() {
        message.push_str(&format!("\n## User Stories ({})\n\n", stories.len()));
        for (idx, story) in stories.iter().enumerate() {
            message.push_str(&format!("**{}. {}**\n", idx + 1, story.summary));
            if let Some(points) = story.estimate_points {
                message.push_str(&format!("   - Story Points: {points}\n"));
            }
            if !story.labels.is_empty() {
                message.push_str(&format!("   - Labels: {}\n", story.labels.join(", ")));
            }
            message.push('\n');
        }
    }

    if let Some(url) = recording_url {
        message.push_str(&format!("\n[View Recording]({url})\n"));
    }

    message
}
