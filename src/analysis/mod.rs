//! Transcript analysis — extraction profiles, result types, and the
//! AI collaborator trait.
//!
//! The natural-language extraction itself happens behind [`Analyzer`];
//! this module only shapes what is asked for and what comes back.

pub mod http;
pub mod prompts;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::classify::MeetingCategory;
use crate::error::AnalysisError;

/// Which fields the analysis collaborator is asked to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionProfile {
    pub extract_user_stories: bool,
    pub extract_action_items: bool,
    pub extract_acceptance_criteria: bool,
}

/// Pure lookup from meeting category to extraction profile.
pub fn profile_for(category: MeetingCategory) -> ExtractionProfile {
    match category {
        MeetingCategory::Refinement => ExtractionProfile {
            extract_user_stories: true,
            extract_action_items: false,
            extract_acceptance_criteria: true,
        },
        MeetingCategory::General => ExtractionProfile {
            extract_user_stories: false,
            extract_action_items: true,
            extract_acceptance_criteria: false,
        },
        MeetingCategory::Mixed => ExtractionProfile {
            extract_user_stories: true,
            extract_action_items: true,
            extract_acceptance_criteria: true,
        },
    }
}

/// An action item extracted from a transcript.
///
/// Created by analysis, due date resolved before presentation, selection
/// mutated only by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionItem {
    /// Short imperative phrase.
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Person asked or volunteering, as named in the transcript.
    #[serde(default)]
    pub owner: Option<String>,
    /// Free-text due hint as spoken (e.g. "by Friday", "asap").
    #[serde(default, rename = "due_date_hint")]
    pub raw_due_hint: Option<String>,
    /// Decision this action arises from, if any.
    #[serde(default)]
    pub related_decision: Option<String>,
    /// Concrete date assigned by the inference engine.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_due_date: Option<NaiveDate>,
    /// Human approval flag; items start selected.
    #[serde(default = "default_selected")]
    pub selected: bool,
    /// Back-reference to the source meeting email.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub source_meeting_id: String,
}

fn default_selected() -> bool {
    true
}

/// A user story extracted from a refinement discussion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStory {
    /// Concise, tracker-ready story title.
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    /// Estimate if one was spoken, e.g. "3 points".
    #[serde(default)]
    pub estimate_points: Option<u32>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default = "default_selected")]
    pub selected: bool,
}

/// Structured output of transcript analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisResult {
    #[serde(default)]
    pub stories: Vec<UserStory>,
    #[serde(default)]
    pub actions: Vec<ActionItem>,
}

impl AnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty() && self.actions.is_empty()
    }

    /// Stories the user kept selected.
    pub fn selected_stories(&self) -> impl Iterator<Item = &UserStory> {
        self.stories.iter().filter(|s| s.selected)
    }

    /// Actions the user kept selected.
    pub fn selected_actions(&self) -> impl Iterator<Item = &ActionItem> {
        self.actions.iter().filter(|a| a.selected)
    }
}

/// AI-analysis collaborator.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze a transcript, returning only the fields the profile asks
    /// for. Implementations must leave disabled fields empty.
    async fn analyze(
        &self,
        title: &str,
        transcript: &str,
        profile: ExtractionProfile,
    ) -> Result<AnalysisResult, AnalysisError>;
}
