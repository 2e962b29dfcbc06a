//! Core domain types for the CI shepherd bot.
//!
//! This module contains all the fundamental types used throughout the application,
//! designed to encode invariants via the type system.

pub mod check;
pub mod ids;
pub mod pr;

// Re-export commonly used types at the module level
pub use check::{BUILD_CHECK, CheckName, CheckObservation, CheckState, RawState};
pub use ids::{CommentId, PrNumber, RepoId, Sha};
pub use pr::{HeadCommit, IssueComment, LabelInfo, PrState, PullRequest};
