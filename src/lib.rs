//! Meeting Triage — monitoring-and-decision pipeline for meeting-recording emails.

pub mod analysis;
pub mod approval;
pub mod classify;
pub mod config;
pub mod delivery;
pub mod duedate;
pub mod error;
pub mod mailbox;
pub mod monitor;
pub mod state;
pub mod transcript;
