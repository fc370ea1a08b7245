//! Heuristic meeting classifier.
//!
//! Decides whether a transcript should be mined for user stories
//! (refinement), action items (general), or both (mixed) before any LLM
//! call is made. Pure keyword scoring — deterministic, no side effects.

pub mod keywords;

use serde::{Deserialize, Serialize};

use keywords::{ACTION_BODY_MARKERS, REFINEMENT_BODY_MARKERS, REFINEMENT_TITLE_MARKERS};

/// Title occurrences count double — the title is a stronger signal.
const TITLE_WEIGHT: f64 = 2.0;
const BODY_WEIGHT: f64 = 1.0;
/// Minimum score to confidently call a meeting refinement or general.
const CONFIDENCE_THRESHOLD: f64 = 1.5;
/// One score must exceed the other by 30% to be considered dominant.
const DOMINANCE_FACTOR: f64 = 1.3;
/// Below this on both axes there is no usable signal at all.
const SIGNAL_FLOOR: f64 = 0.1;

/// Meeting category, driving the extraction profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingCategory {
    /// Backlog refinement — extract user stories and acceptance criteria.
    Refinement,
    /// General / action-oriented — extract action items.
    General,
    /// Both kinds of signal present — extract everything.
    Mixed,
}

impl std::fmt::Display for MeetingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Refinement => "refinement",
            Self::General => "general",
            Self::Mixed => "mixed",
        };
        write!(f, "{s}")
    }
}

/// Where a marker phrase was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerSource {
    Title,
    Transcript,
}

/// A matched marker phrase, kept for audit display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerHit {
    pub phrase: String,
    pub source: MarkerSource,
}

/// Classifier output.
///
/// `category` is always derived from the score pair by [`decide`]; it is
/// never set independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub category: MeetingCategory,
    pub refinement_score: f64,
    pub action_score: f64,
    /// Every matched marker with its source, in scan order.
    pub rationale: Vec<MarkerHit>,
}

/// Count non-overlapping, case-insensitive occurrences of `phrase`.
fn count_occurrences(lower_text: &str, phrase: &str) -> usize {
    lower_text.matches(phrase).count()
}

fn score_markers(
    lower_text: &str,
    markers: &[&str],
    weight: f64,
    source: MarkerSource,
    rationale: &mut Vec<MarkerHit>,
) -> f64 {
    let mut score = 0.0;
    for phrase in markers {
        let count = count_occurrences(lower_text, phrase);
        if count > 0 {
            score += count as f64 * weight;
            rationale.push(MarkerHit {
                phrase: (*phrase).to_string(),
                source,
            });
        }
    }
    score
}

/// Derive the category from the score pair.
fn decide(refinement_score: f64, action_score: f64) -> MeetingCategory {
    if refinement_score < SIGNAL_FLOOR && action_score < SIGNAL_FLOOR {
        // No signal — treat as a general meeting and mine action items.
        return MeetingCategory::General;
    }
    if refinement_score >= CONFIDENCE_THRESHOLD
        && refinement_score >= action_score * DOMINANCE_FACTOR
    {
        MeetingCategory::Refinement
    } else if action_score >= CONFIDENCE_THRESHOLD
        && action_score >= refinement_score * DOMINANCE_FACTOR
    {
        MeetingCategory::General
    } else {
        MeetingCategory::Mixed
    }
}

/// Classify a meeting from its title and transcript.
pub fn classify(title: &str, transcript: &str) -> Classification {
    let title_lower = title.to_lowercase();
    let transcript_lower = transcript.to_lowercase();

    let mut rationale = Vec::new();

    let title_score = score_markers(
        &title_lower,
        REFINEMENT_TITLE_MARKERS,
        TITLE_WEIGHT,
        MarkerSource::Title,
        &mut rationale,
    );
    let refinement_body_score = score_markers(
        &transcript_lower,
        REFINEMENT_BODY_MARKERS,
        BODY_WEIGHT,
        MarkerSource::Transcript,
        &mut rationale,
    );
    let action_score = score_markers(
        &transcript_lower,
        ACTION_BODY_MARKERS,
        BODY_WEIGHT,
        MarkerSource::Transcript,
        &mut rationale,
    );

    let refinement_score = title_score + refinement_body_score;

    Classification {
        category: decide(refinement_score, action_score),
        refinement_score,
        action_score,
        rationale,
    }
}
