//! Parser for bot trigger commands in comment text.
//!
//! A pure parser: it extracts a structured trigger request from unstructured
//! comment text and never touches the network.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::CheckName;

use super::types::ParsedCommand;

/// Parses the first bot command found in comment text.
///
/// Returns `None` when the comment never mentions the bot; such comments
/// produce no `CommentCommand` at all. A mention with nothing that parses as
/// a command yields `ParsedCommand::NoCommand`.
///
/// # Parsing Rules
///
/// - The trigger `@{bot_name}` is case-insensitive (like GitHub mentions)
/// - The trigger must sit at word boundaries on both sides: not preceded by
///   an alphanumeric, and not followed by a login character, so a mention of
///   a user whose login merely extends the bot's name is someone else's
/// - The trigger words `run` and `test` are equivalent and case-insensitive
/// - Check names follow, separated by commas and/or whitespace, read up to
///   the end of the line
/// - An optional `env KEY=VALUE ...` tail supplies environment overrides
/// - If multiple mentions are present, the first one followed by a trigger
///   word wins
pub fn parse_comment(
    text: &str,
    bot_name: &str,
    known_checks: &BTreeSet<CheckName>,
) -> Option<ParsedCommand> {
    let trigger = format!("@{}", bot_name);
    let mut mentioned = false;
    let mut search_start = 0;
    while let Some(abs_pos) = find_trigger(text, search_start, &trigger) {
        mentioned = true;
        let after_trigger = &text[abs_pos + trigger.len()..];

        if let Some(outcome) = try_parse_after_trigger(after_trigger, known_checks) {
            return Some(outcome);
        }

        // Move past this trigger and continue searching
        search_start = abs_pos + trigger.len();
    }
    mentioned.then_some(ParsedCommand::NoCommand)
}

/// Finds the next occurrence of the trigger (case-insensitive) at a valid word boundary.
/// Returns the byte position of the `@` character if found.
fn find_trigger(text: &str, start: usize, trigger: &str) -> Option<usize> {
    let mut search_pos = start;

    while search_pos < text.len() {
        let at_pos = text[search_pos..].find('@')?;
        let abs_pos = search_pos + at_pos;

        // get() returns None if the end position lands in the middle of a
        // multi-byte UTF-8 character.
        if let Some(candidate) = text.get(abs_pos..abs_pos + trigger.len()) {
            if candidate.eq_ignore_ascii_case(trigger) {
                // Left boundary: start of string or preceded by non-alphanumeric,
                // so email-like text does not count as a mention.
                let left_ok = abs_pos == 0
                    || text[..abs_pos]
                        .chars()
                        .next_back()
                        .is_none_or(|prev| !prev.is_alphanumeric());
                // Right boundary: a login character after the name means this
                // mentions a different, longer-named user.
                let right_ok = text[abs_pos + trigger.len()..]
                    .chars()
                    .next()
                    .is_none_or(|next| !is_login_char(next));
                if left_ok && right_ok {
                    return Some(abs_pos);
                }
            }
        }

        search_pos = abs_pos + 1;
    }
    None
}

/// Characters GitHub allows in a login.
fn is_login_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-'
}

/// Attempts to parse a trigger invocation from text immediately following
/// the mention. Returns `None` when the next word is not a trigger word, so
/// the scan can move on to a later mention.
fn try_parse_after_trigger(
    text: &str,
    known_checks: &BTreeSet<CheckName>,
) -> Option<ParsedCommand> {
    // Must have at least one whitespace character after the mention
    let text = text.strip_prefix(|c: char| c.is_ascii_whitespace())?;
    let text = text.trim_start_matches([' ', '\t']);

    let (trigger_word, rest) = split_first_word(text);
    if !trigger_word.eq_ignore_ascii_case("run") && !trigger_word.eq_ignore_ascii_case("test") {
        return None;
    }

    // The command runs to the end of its line.
    let line = rest.lines().next().unwrap_or("");
    Some(parse_invocation(line, known_checks))
}

/// Parses the check list and optional `env` tail after a trigger word.
fn parse_invocation(line: &str, known_checks: &BTreeSet<CheckName>) -> ParsedCommand {
    let mut tokens = line
        .split([' ', '\t', ','])
        .filter(|t| !t.is_empty())
        .peekable();

    let mut tests = Vec::new();
    while let Some(&token) = tokens.peek() {
        if token.eq_ignore_ascii_case("env") {
            break;
        }
        tokens.next();
        if !known_checks.contains(token) {
            return ParsedCommand::InvalidInput {
                reason: format!("unrecognized check '{}'", token),
            };
        }
        let name = CheckName::from(token);
        if !tests.contains(&name) {
            tests.push(name);
        }
    }

    if tests.is_empty() {
        return ParsedCommand::GenericFail {
            reason: "trigger word with no checks named".to_string(),
        };
    }

    let mut extra_env = BTreeMap::new();
    if tokens.next().is_some() {
        // consumed the `env` keyword; everything after must be KEY=VALUE
        let mut saw_pair = false;
        for pair in tokens {
            let Some((key, value)) = pair.split_once('=') else {
                return ParsedCommand::InvalidInput {
                    reason: format!("malformed environment override '{}'", pair),
                };
            };
            if key.is_empty() {
                return ParsedCommand::InvalidInput {
                    reason: format!("malformed environment override '{}'", pair),
                };
            }
            saw_pair = true;
            extra_env.insert(key.to_string(), value.to_string());
        }
        if !saw_pair {
            return ParsedCommand::GenericFail {
                reason: "env keyword with no overrides".to_string(),
            };
        }
    }

    ParsedCommand::Trigger { tests, extra_env }
}

/// Splits text at the first whitespace, returning (word, rest).
/// If no whitespace, returns (text, "").
fn split_first_word(text: &str) -> (&str, &str) {
    match text.find(|c: char| c.is_ascii_whitespace()) {
        Some(pos) => (&text[..pos], &text[pos..]),
        None => (text, ""),
    }
}
