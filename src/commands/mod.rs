//! Command parsing for bot trigger commands.
//!
//! This module provides types and parsing for commands that users issue via
//! PR comments to trigger CI checks.
//!
//! # Supported Commands
//!
//! - `@{bot_name} run <checks>` - Triggers the named checks
//! - `@{bot_name} test <checks>` - Equivalent to `run`
//! - `@{bot_name} run <checks> env KEY=VALUE ...` - Triggers with environment
//!   overrides for the run
//!
//! Check names are comma- or whitespace-separated, and the command runs to
//! the end of its line. A mention with nothing that parses as a command
//! resolves to [`ParsedCommand::NoCommand`].
//!
//! # Example
//!
//! ```
//! use std::collections::BTreeSet;
//! use check_shepherd::commands::{parse_comment, ParsedCommand};
//! use check_shepherd::types::CheckName;
//!
//! let known: BTreeSet<CheckName> = [CheckName::new("build")].into_iter().collect();
//!
//! let comment = "Rebased onto main.\n\n@check-shepherd run build";
//! let parsed = parse_comment(comment, "check-shepherd", &known);
//! assert!(matches!(parsed, Some(ParsedCommand::Trigger { .. })));
//!
//! // Comments that never mention the bot produce nothing
//! assert_eq!(parse_comment("looks good to me", "check-shepherd", &known), None);
//! ```

mod parser;
mod types;

pub use parser::parse_comment;
pub use types::{CommentCommand, ParsedCommand};
