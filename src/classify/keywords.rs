//! Marker phrase sets for meeting classification.
//!
//! Tuned for agile product teams; adjust per org vocabulary.

/// Refinement signals in the meeting title. Title hits weigh double.
pub const REFINEMENT_TITLE_MARKERS: &[&str] = &[
    "refinement",
    "backlog grooming",
    "grooming",
    "story workshop",
    "story refinement",
    "sprint planning",
    "planning poker",
    "estimation",
];

/// Refinement signals in the transcript body.
pub const REFINEMENT_BODY_MARKERS: &[&str] = &[
    "story point",
    "story points",
    "sp ",
    "estimate this",
    "estimate it",
    "acceptance criteria",
    "given when then",
    "given/when/then",
    "backlog item",
    "refine this",
    "split this story",
    "split the story",
    "create a story",
    "create a user story",
    "epic",
    "feature ticket",
    "technical spike",
    "sprint backlog",
    "product backlog",
    "groom the backlog",
    "definition of ready",
    "definition of done",
];

/// Action-item signals in the transcript body.
pub const ACTION_BODY_MARKERS: &[&str] = &[
    "next step",
    "next steps",
    "action item",
    "action items",
    "follow up",
    "follow-up",
    "take this away",
    "take an action",
    "can you send",
    "can you share",
    "please send",
    "please share",
    "schedule a meeting",
    "set up a meeting",
    "set up a call",
    "reach out to",
    "ping",
    "email them",
    "by when",
    "due date",
    "deadline",
    "owner",
    "who will own",
    "assign this",
    "we need to decide",
    "decision",
];
