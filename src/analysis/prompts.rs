//! Prompt templates for the analysis collaborator.
//!
//! One user prompt per extraction profile shape: stories, actions, or
//! both. Implementations of [`crate::analysis::Analyzer`] that call an
//! LLM use these; scripted test analyzers ignore them.

use crate::analysis::ExtractionProfile;

/// System prompt shared by all meeting kinds.
pub const SYSTEM_PROMPT: &str = "\
You are a structured assistant that turns meeting transcripts into JSON \
for a product team.

You MUST:
- Obey the JSON schema exactly as specified.
- Never include commentary or explanations, only JSON.
- Leave fields null or empty arrays if the information is not clearly present.
- Do not invent owners, due dates, or acceptance criteria that are not implied in the transcript.";

/// Label stamped on every AI-generated story so reviewers can find them.
pub const REVIEW_LABEL: &str = "AIGen-ReviewRqd";

const STORY_INSTRUCTIONS: &str = "\
Identify the backlog items discussed that are suitable as user stories. For each, produce:
- summary: a concise, tracker-ready story title.
- description: 2-6 sentences capturing context, problem, and constraints.
- estimate_points: the integer if specific numbers were mentioned, else null.
- assignees: names clearly assigned to the story, else [].
- labels: always include \"AIGen-ReviewRqd\" first; add other mentioned tags.
Ignore generic meeting admin unless clearly part of the story.";

const CRITERIA_INSTRUCTIONS: &str = "\
- acceptance_criteria: concrete, testable conditions, as Given/When/Then or clear bullets.";

const ACTION_INSTRUCTIONS: &str = "\
Identify concrete action items: things someone agreed to do after the meeting. For each, produce:
- title: short imperative phrase.
- description: 1-3 sentences of context if needed, else \"\".
- owner: the person explicitly asked or volunteering, else null.
- due_date_hint: the explicit date or timeframe as spoken, else null.
- related_decision: the decision this action arises from, else null.
Ignore vague comments that are not clearly actions.";

/// Build the user prompt for a transcript under the given profile.
pub fn build_user_prompt(profile: ExtractionProfile, title: &str, transcript: &str) -> String {
    let mut sections = Vec::new();

    if profile.extract_user_stories {
        sections.push(STORY_INSTRUCTIONS.to_string());
        if profile.extract_acceptance_criteria {
            sections.push(CRITERIA_INSTRUCTIONS.to_string());
        }
    }
    if profile.extract_action_items {
        sections.push(ACTION_INSTRUCTIONS.to_string());
    }

    let mut shape = Vec::new();
    if profile.extract_user_stories {
        shape.push("\"stories\": [{\"summary\": \"string\", \"description\": \"string\", \"acceptance_criteria\": [\"string\"], \"estimate_points\": null, \"assignees\": [], \"labels\": []}]");
    }
    if profile.extract_action_items {
        shape.push("\"actions\": [{\"title\": \"string\", \"description\": \"string\", \"owner\": null, \"due_date_hint\": null, \"related_decision\": null}]");
    }

    format!(
        "Inputs:\n- Meeting title: \"{title}\"\n- Meeting transcript (may be partial, automatic, or messy):\n\"\"\"\n{transcript}\n\"\"\"\n\nTask:\n{task}\n\nOutput:\nReturn ONLY valid JSON in this exact shape:\n{{\n  {shape}\n}}\n\nIf nothing qualifies, return empty arrays.",
        task = sections.join("\n"),
        shape = shape.join(",\n  "),
    )
}
