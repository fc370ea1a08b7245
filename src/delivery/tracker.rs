//! Jira-style ticket tracker client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::{debug, warn};

use crate::analysis::{ActionItem, UserStory};
use crate::delivery::{IssueDraft, IssueOutcome, TicketTracker};

/// REST client for a Jira Cloud-compatible tracker.
pub struct JiraTracker {
    base_url: String,
    user: String,
    api_token: SecretString,
    project_key: String,
    client: reqwest::Client,
}

impl JiraTracker {
    pub fn new(
        base_url: impl Into<String>,
        user: impl Into<String>,
        api_token: SecretString,
        project_key: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            user: user.into(),
            api_token,
            project_key: project_key.into(),
            client: reqwest::Client::new(),
        }
    }

    async fn create_one(&self, draft: &IssueDraft) -> IssueOutcome {
        let mut fields = json!({
            "project": { "key": self.project_key },
            "summary": draft.summary,
            "description": draft.description,
            "issuetype": { "name": "Task" },
            "labels": draft.labels,
        });
        if let Some(map) = fields.as_object_mut() {
            for (key, value) in &draft.custom_fields {
                map.insert(key.clone(), value.clone());
            }
        }

        let response = self
            .client
            .post(format!("{}/rest/api/2/issue", self.base_url))
            .basic_auth(&self.user, Some(self.api_token.expose_secret()))
            .json(&json!({ "fields": fields }))
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let key = resp
                    .json::<serde_json::Value>()
                    .await
                    .ok()
                    .and_then(|v| v.get("key").and_then(|k| k.as_str()).map(String::from));
                debug!(issue = key.as_deref().unwrap_or("?"), "Issue created");
                IssueOutcome {
                    issue_key: key,
                    success: true,
                    error: None,
                }
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                let preview: String = body.chars().take(200).collect();
                warn!(%status, "Issue creation rejected");
                IssueOutcome {
                    issue_key: None,
                    success: false,
                    error: Some(format!("{status}: {preview}")),
                }
            }
            Err(e) => IssueOutcome {
                issue_key: None,
                success: false,
                error: Some(e.to_string()),
            },
        }
    }
}

#[async_trait]
impl TicketTracker for JiraTracker {
    async fn create_issues(&self, drafts: &[IssueDraft]) -> Vec<IssueOutcome> {
        let mut outcomes = Vec::with_capacity(drafts.len());
        for draft in drafts {
            outcomes.push(self.create_one(draft).await);
        }
        outcomes
    }
}

/// Build issue drafts from the user's selected stories and actions.
pub fn drafts_from_selection(
    meeting_title: &str,
    stories: &[&UserStory],
    actions: &[&ActionItem],
) -> Vec<IssueDraft> {
    let mut drafts = Vec::new();

    for story in stories {
        let mut description = story.description.clone();
        if !story.acceptance_criteria.is_empty() {
            description.push_str("\n\nAcceptance criteria:\n");
            for criterion in &story.acceptance_criteria {
                description.push_str(&format!("- {criterion}\n"));
            }
        }
        description.push_str(&format!("\nFrom meeting: {meeting_title}"));
        drafts.push(IssueDraft {
            summary: story.summary.clone(),
            description,
            labels: story.labels.clone(),
            custom_fields: serde_json::Map::new(),
        });
    }

    for action in actions {
        let mut description = action.description.clone();
        if let Some(owner) = &action.owner {
            description.push_str(&format!("\nOwner: {owner}"));
        }
        if let Some(decision) = &action.related_decision {
            description.push_str(&format!("\nRelated decision: {decision}"));
        }
        if let Some(due) = action.resolved_due_date {
            description.push_str(&format!("\nDue: {due}"));
        }
        description.push_str(&format!("\nFrom meeting: {meeting_title}"));
        drafts.push(IssueDraft {
            summary: action.title.clone(),
            description,
            labels: Vec::new(),
            custom_fields: serde_json::Map::new(),
        });
    }

    drafts
}
