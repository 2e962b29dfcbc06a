//! Check Shepherd - a CI bot that reconciles pull-request check state.
//!
//! Each pass over a PR rebuilds a snapshot from the platform's commit-status
//! and comment history, runs a pure decision engine over it, and executes the
//! resulting effects (statuses, labels, comments, reactions, build triggers).

pub mod commands;
pub mod config;
pub mod effects;
pub mod engine;
pub mod github;
pub mod messages;
pub mod reconcile;
pub mod snapshot;
pub mod trigger;
pub mod types;
