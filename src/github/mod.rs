//! GitHub API access: repo-scoped client, error taxonomy, typed reads, and
//! the live effect interpreter.

mod client;
mod error;
pub mod fetch;
mod interpreter;

pub use client::OctocrabClient;
pub use error::{GitHubApiError, GitHubErrorKind};
pub use interpreter::{GitHubInterpreter, InterpretError};
