//! Command execution.
//!
//! A line is split into words, a leading `no` is noted and removed, the
//! command word selects candidate commands in the current mode, the
//! matcher reads the rest, and the resolver picks one reading. Its bound
//! actions then run in order against the session.

use crate::error::CommandError;
use crate::lexer::{self, strip_no};
use crate::matcher::{BoundAction, MatchContext, Matcher, NoObserver, match_name};
use crate::mode::eligible_commands;
use crate::registry::{ActionCall, ActionContext};
use crate::resolve::{self, Match};
use crate::session::Session;
use sdnsh_diagnostics::{Diagnostic, codes};
use sdnsh_grammar_tables::{CommandDescription, FieldValues};
use serde::Serialize;

/// The reading selected for a line.
#[derive(Debug, Clone)]
pub struct Parsed<'g> {
    /// The selected command.
    pub command: &'g CommandDescription,
    /// Collected field values.
    pub values: FieldValues,
    /// Whether the line started with `no`.
    pub is_no_command: bool,
    /// Actions to run, in order.
    pub actions: Vec<BoundAction<'g>>,
}

/// Result of running a line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExecOutcome {
    /// Concatenated action output, if any action produced some.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Non-fatal events, such as a submode left because its object was
    /// deleted.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<Diagnostic>,
}

/// Split a line into words, reporting an unterminated quote.
pub fn split(line: &str) -> Result<Vec<String>, CommandError> {
    lexer::split_words(line)
        .map(|parsed| parsed.texts())
        .map_err(|_| CommandError::Syntax {
            code: codes::UNTERMINATED_QUOTE,
            message: "Unterminated quoted string".into(),
            word_index: None,
        })
}

/// Match a line and select the reading to run.
pub fn parse<'r>(session: &Session<'r>, line: &str) -> Result<Parsed<'r>, CommandError> {
    parse_words(session, &split(line)?)
}

/// Match pre-split words and select the reading to run.
pub fn parse_words<'r>(session: &Session<'r>, words: &[String]) -> Result<Parsed<'r>, CommandError> {
    let (is_no_command, words) = strip_no(words);
    let Some(first) = words.first() else {
        return Err(CommandError::NoCommand);
    };
    let registry = session.registry;

    let mut named = Vec::new();
    for command in eligible_commands(
        registry.commands(),
        session.modes.current_mode(),
        &session.features,
        is_no_command,
    ) {
        if let Some(name) = match_name(registry, command, first)? {
            named.push((command, name));
        }
    }
    if named.is_empty() {
        return Err(CommandError::UnknownCommand {
            word: first.clone(),
        });
    }
    resolve::check_command_word(first, &named)?;

    let mut observer = NoObserver;
    let ctx = MatchContext {
        store: session.store.as_ref(),
        modes: &session.modes,
        is_no_command,
    };
    let mut matcher = Matcher::new(registry, ctx, &mut observer);
    let mut matches = Vec::new();
    for (command, name) in named {
        for branch in matcher.match_command(command, name, words)? {
            matches.push(Match { command, branch });
        }
    }
    let errors = matcher.into_errors();
    let selected = resolve::resolve(matches, words, &errors)?;
    log::debug!(
        "{:?} -> {}{} {:?}",
        words,
        if is_no_command { "no " } else { "" },
        selected.command.title(),
        selected.branch.values
    );
    Ok(Parsed {
        command: selected.command,
        values: selected.branch.values,
        is_no_command,
        actions: selected.branch.actions,
    })
}

/// Run one line against the session.
pub fn execute(session: &mut Session<'_>, line: &str) -> Result<ExecOutcome, CommandError> {
    session.completion_cache = None;
    let parsed = parse(session, line)?;
    if parsed.actions.is_empty() {
        return Err(CommandError::description(codes::MISSING_ACTION, "No action specified")
            .in_command(parsed.command.title()));
    }

    let registry = session.registry;
    let mode_object = session.modes.current_object().cloned();
    let mut output: Option<String> = None;
    for bound in &parsed.actions {
        let action = registry
            .action(bound.proc.name())
            .map_err(|e| e.in_command(parsed.command.title()))?;
        let call = ActionCall {
            command: parsed.command,
            values: &parsed.values,
            is_no_command: parsed.is_no_command,
            obj_type: bound.scope.obj_type(),
            mode_object: mode_object.as_ref(),
            params: bound.proc.params(),
            on_exit: bound.scope.on_exit(),
        };
        let mut ctx = ActionContext {
            modes: &mut session.modes,
            store: session.store.as_mut(),
            config: &session.config,
            registry,
        };
        log::debug!("running action {}", bound.proc);
        if let Some(text) = action.run(&call, &mut ctx)?.into_text() {
            output.get_or_insert_with(String::new).push_str(&text);
        }
    }

    let mut warnings = Vec::new();
    if parsed.is_no_command
        && let Some(warning) = leave_stale_submodes(session)
    {
        warnings.push(warning);
    }
    Ok(ExecOutcome { output, warnings })
}

/// Pop submodes whose object no longer exists. A store failure while
/// checking keeps the entry.
fn leave_stale_submodes(session: &mut Session<'_>) -> Option<Diagnostic> {
    let store = session.store.as_ref();
    let removed = session.modes.prune(|entry| match entry.object() {
        Some((obj_type, key)) => store.exists(obj_type, key).unwrap_or(true),
        None => true,
    });
    if removed.is_empty() {
        return None;
    }
    let left: Vec<&str> = removed.iter().map(|e| e.mode.as_str()).collect();
    log::warn!(
        "submode exited due to deleted object: left {}",
        left.join(", ")
    );
    Some(Diagnostic::from_catalogue(
        codes::SUBMODE_EXITED,
        ctx!("mode" => left.join(", ")),
        None,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ShellConfig;
    use crate::registry::{ActionOutput, Procedure, Registry};

    fn registry() -> Registry {
        let mut r = Registry::with_builtins().unwrap();
        r.load_jsonc(
            r#"{ "commands": [
                { "name": "ping", "modes": ["login"], "noSupported": false,
                  "action": { "proc": "echo", "params": { "text": "pong" } } },
                { "name": "silent", "modes": ["login"] }
            ] }"#,
        )
        .unwrap();
        r.register(
            "echo",
            Procedure::action(
                |call: &ActionCall<'_>,
                 _: &mut ActionContext<'_>|
                 -> Result<ActionOutput, CommandError> {
                    let text = call.params["text"].as_str().unwrap_or_default();
                    Ok(ActionOutput::Text(format!("{text}\n")))
                },
            ),
        );
        r
    }

    #[test]
    fn empty_lines_hold_no_command() {
        let r = registry();
        let mut s = Session::with_memory_store(&r, ShellConfig::default());
        assert_eq!(s.execute("").unwrap_err(), CommandError::NoCommand);
        assert_eq!(s.execute("  no ").unwrap_err(), CommandError::NoCommand);
    }

    #[test]
    fn runs_bound_actions() {
        let r = registry();
        let mut s = Session::with_memory_store(&r, ShellConfig::default());
        let out = s.execute("pi").unwrap();
        assert_eq!(out.output.as_deref(), Some("pong\n"));
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn commands_without_actions_fail_at_execution() {
        let r = registry();
        let mut s = Session::with_memory_store(&r, ShellConfig::default());
        let parsed = s.parse("silent").unwrap();
        assert!(parsed.actions.is_empty());
        let e = s.execute("silent").unwrap_err();
        assert_eq!(e.code(), codes::MISSING_ACTION);
        assert_eq!(e.to_string(), "No action specified");
    }

    #[test]
    fn unknown_and_unsupported_no_forms() {
        let r = registry();
        let mut s = Session::with_memory_store(&r, ShellConfig::default());
        assert_eq!(
            s.execute("frob").unwrap_err(),
            CommandError::UnknownCommand { word: "frob".into() }
        );
        assert!(matches!(
            s.execute("no ping").unwrap_err(),
            CommandError::UnknownCommand { .. }
        ));
    }

    #[test]
    fn unterminated_quotes_are_reported() {
        let r = registry();
        let mut s = Session::with_memory_store(&r, ShellConfig::default());
        assert_eq!(s.execute("ping \"x").unwrap_err().code(), codes::UNTERMINATED_QUOTE);
    }
}
