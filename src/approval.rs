//! Human-approval collaborator — the gate before any processing or
//! delivery happens.
//!
//! The monitoring loop blocks cooperatively on these calls; timeout
//! policy belongs to the implementation (a timeout reads as a decline).

use async_trait::async_trait;
use tracing::info;

use crate::analysis::AnalysisResult;
use crate::mailbox::CandidateEmail;

/// User decision for a candidate email.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Decline,
}

/// Approval collaborator contract.
#[async_trait]
pub trait Approval: Send + Sync {
    /// Ask whether a detected recording should be processed.
    async fn prompt_approval(&self, candidate: &CandidateEmail) -> Decision;

    /// Present extracted results for review. Returns the result with
    /// selection flags (and possibly text) edited by the user.
    async fn prompt_selection(&self, result: AnalysisResult) -> AnalysisResult;
}

/// Console approval for local runs: y/N on stdin, everything selected.
#[derive(Debug, Default)]
pub struct ConsoleApproval;

#[async_trait]
impl Approval for ConsoleApproval {
    async fn prompt_approval(&self, candidate: &CandidateEmail) -> Decision {
        println!(
            "New recording detected: {} (received {})",
            candidate.subject, candidate.received_time
        );
        print!("Process this recording? [y/N] ");
        use std::io::Write;
        let _ = std::io::stdout().flush();

        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            std::io::stdin().read_line(&mut line).map(|_| line)
        })
        .await;

        match answer {
            Ok(Ok(line)) if matches!(line.trim(), "y" | "Y" | "yes") => Decision::Approve,
            _ => Decision::Decline,
        }
    }

    async fn prompt_selection(&self, result: AnalysisResult) -> AnalysisResult {
        info!(
            stories = result.stories.len(),
            actions = result.actions.len(),
            "Console review keeps all extracted items selected"
        );
        result
    }
}
