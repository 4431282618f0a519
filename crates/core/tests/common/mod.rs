//! Shared fixtures for `sdnsh_core` integration tests.

#![allow(unreachable_pub)]

use sdnsh_core::registry::{ActionCall, ActionContext, ActionOutput, Procedure};
use sdnsh_core::{CommandError, MemoryStore, Registry, Session, ShellConfig};

/// Fixture grammar: a small switch configuration shell.
pub const SHELL_GRAMMAR: &str = include_str!("shell.jsonc");

/// `echo` prints the command title and its collected values.
fn echo(call: &ActionCall<'_>, _: &mut ActionContext<'_>) -> Result<ActionOutput, CommandError> {
    let values: Vec<String> = call
        .values
        .iter()
        .map(|(k, v)| format!("{k}={}", v.as_str().unwrap_or_default()))
        .collect();
    Ok(ActionOutput::Text(format!(
        "{} {}\n",
        call.command.title(),
        values.join(" ")
    )))
}

/// Builtins, `echo`, and the fixture grammar.
pub fn registry() -> Registry {
    registry_from(SHELL_GRAMMAR, false)
}

/// Like [`registry`], optionally registering the commands in reverse order.
pub fn registry_from(grammar: &str, reversed: bool) -> Registry {
    let mut registry = Registry::with_builtins().expect("builtins load");
    registry.register("echo", Procedure::action(echo));
    let mut tables = sdnsh_core::GrammarTables::from_jsonc(grammar).expect("fixture grammar parses");
    if reversed {
        tables.commands.reverse();
    }
    registry.load_tables(tables);
    let issues = registry.check();
    assert!(issues.is_empty(), "fixture grammar has issues: {issues:?}");
    registry
}

/// A session in `mode` over `store`.
#[allow(dead_code)]
pub fn session_in<'r>(registry: &'r Registry, mode: &str, store: MemoryStore) -> Session<'r> {
    let config = ShellConfig::default().with_initial_mode(mode);
    Session::new(registry, config, Box::new(store))
}

/// Run each line, panicking on the first failure.
#[allow(dead_code)]
pub fn run_all(session: &mut Session<'_>, lines: &[&str]) {
    for line in lines {
        if let Err(e) = session.execute(line) {
            panic!("{line:?} failed: {e}");
        }
    }
}

/// A store holding switches `s1` and `s2`.
#[allow(dead_code)]
pub fn two_switches() -> MemoryStore {
    let fields = |dpid: &str| {
        serde_json::from_value(serde_json::json!({ "dpid": dpid })).expect("fixture fields")
    };
    MemoryStore::new()
        .with_object("switch", "s1", fields("00:00:00:00:00:00:00:01"))
        .with_object("switch", "s2", fields("00:00:00:00:00:00:00:02"))
}
