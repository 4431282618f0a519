//! Ambiguity resolution.
//!
//! When several readings of a line complete, the one whose words were
//! typed out in full wins. Readings are compared word by word: at each
//! word, a single reading that took the word as typed is selected outright,
//! several such readings carry on to the next word, and if every reading
//! took the word as an abbreviation, the abbreviations must all stand for
//! the same token or the word is ambiguous.
//!
//! When no reading completes, the failed readings' errors are condensed
//! into one message: the errors that got furthest into the line, and among
//! those the highest priority ones.

use crate::error::CommandError;
use crate::matcher::{Branch, ErrorPriority, NameMatch, ParseError};
use sdnsh_diagnostics::codes;
use sdnsh_grammar_tables::CommandDescription;
use std::collections::BTreeSet;

/// A complete reading of the line as a particular command.
#[derive(Debug, Clone)]
pub struct Match<'g> {
    /// The command.
    pub command: &'g CommandDescription,
    /// The reading.
    pub branch: Branch<'g>,
}

/// Pick the reading to execute.
///
/// `words` is the line without any leading `no`; `errors` are the failed
/// readings, used when nothing completed.
pub fn resolve<'g>(
    mut matches: Vec<Match<'g>>,
    words: &[String],
    errors: &[ParseError],
) -> Result<Match<'g>, CommandError> {
    match matches.len() {
        0 => Err(synthesize_error(errors, words)),
        1 => Ok(matches.remove(0)),
        _ => narrow(matches, words),
    }
}

fn narrow<'g>(mut candidates: Vec<Match<'g>>, words: &[String]) -> Result<Match<'g>, CommandError> {
    for (i, word) in words.iter().enumerate() {
        let mut exact = Vec::new();
        let mut abbreviated = Vec::new();
        let mut tokens = BTreeSet::new();
        for m in std::mem::take(&mut candidates) {
            match m.branch.prefix_matches.iter().find(|p| p.word_index == i) {
                Some(p) => {
                    tokens.insert(p.token.to_lowercase());
                    abbreviated.push(m);
                }
                None => exact.push(m),
            }
        }
        match exact.len() {
            1 => return Ok(exact.remove(0)),
            0 if tokens.len() > 1 => return Err(ambiguous(word, i, tokens)),
            0 => candidates = abbreviated,
            _ => candidates = exact,
        }
    }

    // Every word tied. Copies of one reading (the same command, values and
    // actions reached along different paths) are harmless; anything else
    // means the grammar is ambiguous.
    let mut distinct: Vec<Match<'g>> = Vec::new();
    for m in candidates {
        if !distinct.iter().any(|d| same_reading(d, &m)) {
            distinct.push(m);
        }
    }
    let mut candidates = distinct;
    if candidates.len() == 1 {
        return Ok(candidates.remove(0));
    }
    let mut titles: Vec<&str> = candidates.iter().map(|m| m.command.title()).collect();
    titles.dedup();
    log::debug!("conflicting descriptions for {words:?}: {titles:?}");
    Err(CommandError::Description {
        code: codes::CONFLICTING_DESCRIPTIONS,
        message: "Multiple command description match".into(),
        command: Some(titles.join(", ")),
    })
}

fn same_reading(a: &Match<'_>, b: &Match<'_>) -> bool {
    std::ptr::eq(a.command, b.command)
        && a.branch.values == b.branch.values
        && a.branch.prefix_matches == b.branch.prefix_matches
        && a.branch.actions.len() == b.branch.actions.len()
        && a.branch
            .actions
            .iter()
            .zip(&b.branch.actions)
            .all(|(x, y)| std::ptr::eq(x.proc, y.proc))
}

/// Reject a command word that abbreviates several command names, unless
/// some command has exactly that name.
pub fn check_command_word(
    word: &str,
    named: &[(&CommandDescription, NameMatch)],
) -> Result<(), CommandError> {
    if named.iter().any(|(_, m)| *m == NameMatch::Exact) {
        return Ok(());
    }
    let titles: BTreeSet<String> = named.iter().map(|(c, _)| c.title().to_lowercase()).collect();
    if titles.len() > 1 {
        return Err(ambiguous(word, 0, titles));
    }
    Ok(())
}

fn ambiguous(word: &str, word_index: usize, tokens: BTreeSet<String>) -> CommandError {
    let tokens: Vec<String> = tokens.into_iter().collect();
    let quoted: Vec<String> = tokens.iter().map(|t| format!("\"{t}\"")).collect();
    CommandError::Ambiguous {
        message: format!(
            "Ambiguous command word \"{word}\"; matches [{}]",
            quoted.join(", ")
        ),
        word_index,
        tokens,
    }
}

/// Condense failed readings into one error.
///
/// Among the errors at the furthest word, only those of the highest
/// priority count. Their expected tokens merge into a single
/// `Unexpected argument "w"; expected one of (...)` line; other messages
/// follow on their own lines.
pub fn synthesize_error(errors: &[ParseError], words: &[String]) -> CommandError {
    let Some(furthest) = errors.iter().map(|e| e.word_index).max() else {
        return CommandError::Syntax {
            code: codes::UNEXPECTED_END,
            message: "Unexpected end of command".into(),
            word_index: None,
        };
    };
    let at_furthest = || errors.iter().filter(move |e| e.word_index == furthest);
    let top = at_furthest()
        .map(|e| e.priority)
        .max()
        .unwrap_or(ErrorPriority::UnexpectedToken);

    let mut expected = BTreeSet::new();
    let mut messages = BTreeSet::new();
    for e in at_furthest().filter(|e| e.priority == top) {
        if e.expected.is_empty() {
            messages.insert(e.message.as_str());
        } else {
            expected.extend(e.expected.iter().map(String::as_str));
        }
    }

    let mut lines = Vec::new();
    if !expected.is_empty() {
        let word = words.get(furthest).map_or("", String::as_str);
        let quoted: Vec<String> = expected.iter().map(|t| format!("\"{t}\"")).collect();
        let one_of = if quoted.len() > 1 { "one of " } else { "" };
        lines.push(format!(
            "Unexpected argument \"{word}\"; expected {one_of}({})",
            quoted.join(", ")
        ));
    }
    lines.extend(messages.into_iter().map(String::from));

    let code = match top {
        ErrorPriority::UnexpectedArguments => codes::UNEXPECTED_ARGUMENTS,
        ErrorPriority::UnexpectedToken => codes::UNEXPECTED_TOKEN,
        ErrorPriority::UnexpectedEnd => codes::UNEXPECTED_END,
        ErrorPriority::Validation => codes::INVALID_ARGUMENT,
    };
    CommandError::Syntax {
        code,
        message: lines.join("\n"),
        word_index: Some(furthest),
    }
}
