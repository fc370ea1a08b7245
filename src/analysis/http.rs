//! Chat-completions backed [`Analyzer`] implementation.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::analysis::prompts::{SYSTEM_PROMPT, build_user_prompt};
use crate::analysis::{AnalysisResult, Analyzer, ExtractionProfile};
use crate::error::AnalysisError;

/// Analyzer calling an OpenAI-compatible chat-completions endpoint.
pub struct HttpAnalyzer {
    base_url: String,
    api_key: SecretString,
    model: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl HttpAnalyzer {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            api_key,
            model: model.into(),
            client: reqwest::Client::new(),
        }
    }

    /// Models sometimes wrap the JSON in a markdown fence; strip it.
    fn strip_fences(content: &str) -> &str {
        let trimmed = content.trim();
        let trimmed = trimmed
            .strip_prefix("```json")
            .or_else(|| trimmed.strip_prefix("```"))
            .unwrap_or(trimmed);
        trimmed.strip_suffix("```").unwrap_or(trimmed).trim()
    }
}

#[async_trait]
impl Analyzer for HttpAnalyzer {
    async fn analyze(
        &self,
        title: &str,
        transcript: &str,
        profile: ExtractionProfile,
    ) -> Result<AnalysisResult, AnalysisError> {
        let user_prompt = build_user_prompt(profile, title, transcript);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": SYSTEM_PROMPT },
                    { "role": "user", "content": user_prompt },
                ],
                "temperature": 0.2,
            }))
            .send()
            .await
            .map_err(|e| AnalysisError::RequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let preview: String = body.chars().take(200).collect();
            return Err(AnalysisError::RequestFailed(format!("{status}: {preview}")));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AnalysisError::InvalidResponse("empty choices".to_string()))?;

        let mut result: AnalysisResult = serde_json::from_str(Self::strip_fences(content))?;

        // The model is told which fields to return, but the profile is
        // authoritative either way.
        if !profile.extract_user_stories {
            result.stories.clear();
        }
        if !profile.extract_action_items {
            result.actions.clear();
        }
        debug!(
            stories = result.stories.len(),
            actions = result.actions.len(),
            "Analysis parsed"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_json_fences() {
        let fenced = "```json\n{\"actions\": []}\n```";
        assert_eq!(HttpAnalyzer::strip_fences(fenced), "{\"actions\": []}");
    }

    #[test]
    fn strips_bare_fences() {
        let fenced = "```\n{}\n```";
        assert_eq!(HttpAnalyzer::strip_fences(fenced), "{}");
    }

    #[test]
    fn leaves_plain_json_alone() {
        let plain = "{\"stories\": []}";
        assert_eq!(HttpAnalyzer::strip_fences(plain), plain);
    }
}
