mod render;

use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser, Subcommand};
use sdnsh_core::lexer::split_words;
use sdnsh_core::{
    CommandError, CompletionKind, Diagnostic, MemoryStore, Registry, Session, ShellConfig,
};
use sdnsh_diagnostics as diag;

use crate::render::{Format, print_json, print_summary, render_diagnostics};

// ── Embedded grammar ────────────────────────────────────────────────────

/// Default grammar baked into the binary at compile time.
#[cfg(has_embedded_grammar)]
const DEFAULT_GRAMMAR: Option<&str> = Some(include_str!(concat!(
    env!("OUT_DIR"),
    "/default_grammar.jsonc"
)));

#[cfg(not(has_embedded_grammar))]
const DEFAULT_GRAMMAR: Option<&str> = None;

// ── CLI definition ──────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "sdnsh",
    version,
    about = "Data-driven, IOS-style command shell for SDN controllers"
)]
struct Cli {
    /// Output mode: "pretty" for coloured terminal output, "json" for
    /// machine-readable JSON. Defaults to "pretty" when stdout is a TTY,
    /// "json" otherwise.
    #[arg(long, global = true, value_parser = ["pretty", "json"])]
    output: Option<String>,

    /// Grammar file to load on top of the default grammar. Repeatable;
    /// later files override earlier typedefs of the same name.
    #[arg(long = "grammar", value_name = "PATH", global = true)]
    grammars: Vec<PathBuf>,

    /// Do not load the grammar embedded in the binary.
    #[arg(long, global = true)]
    no_default_grammar: bool,

    /// Session configuration (JSONC).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Seed the object store from a JSON snapshot
    /// (`{ "<objType>": { "<key>": { fields } } }`).
    #[arg(long, value_name = "PATH", global = true)]
    store: Option<PathBuf>,

    /// Host name shown in the prompt (overrides the configuration file).
    #[arg(long, global = true)]
    hostname: Option<String>,

    /// Mode to start in (overrides the configuration file).
    #[arg(long, global = true)]
    mode: Option<String>,

    /// Enable a feature gate. Repeatable.
    #[arg(long = "feature", value_name = "NAME", global = true)]
    features: Vec<String>,

    /// More log output (-v info, -vv debug, -vvv trace). `RUST_LOG` wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Execute command lines, from `-c` flags or else from stdin.
    ///
    /// Errors are reported and the next line still runs; the exit code is
    /// 1 if any line failed.
    Run {
        /// A command line to execute. Repeatable.
        #[arg(short = 'c', long = "command", value_name = "LINE")]
        commands: Vec<String>,
    },

    /// List completion candidates for a partial line.
    Complete {
        /// The partial line; a trailing space starts a new word.
        line: String,
        /// Print the two-column help listing (as for `?`).
        #[arg(long)]
        help_mode: bool,
    },

    /// Load a grammar and report description defects.
    Check {
        /// Grammar file to check along with the loaded ones.
        grammar: Option<PathBuf>,
    },

    /// Explain a diagnostic ID (e.g. SDN1201).
    Explain { id: String },
}

// ── Main ────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let format = Format::resolve_or_detect(cli.output.as_deref());

    let ok = match &cli.cmd {
        Cmd::Run { commands } => {
            let registry = load_registry(&cli, None, format)?;
            let mut session = open_session(&cli, &registry)?;
            cmd_run(&mut session, commands, format)?
        }
        Cmd::Complete { line, help_mode } => {
            let registry = load_registry(&cli, None, format)?;
            let mut session = open_session(&cli, &registry)?;
            cmd_complete(&mut session, line, *help_mode, format)?
        }
        Cmd::Check { grammar } => {
            let registry = load_registry(&cli, grammar.as_ref(), format)?;
            cmd_check(&registry, format)?
        }
        Cmd::Explain { id } => {
            cmd_explain(id, format)?;
            true
        }
    };

    if !ok {
        process::exit(1);
    }
    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

// ── Setup ───────────────────────────────────────────────────────────────

/// Builtins, then the default grammar, then every `--grammar` file, then
/// `extra`.
fn load_registry(cli: &Cli, extra: Option<&PathBuf>, format: Format) -> Result<Registry> {
    let mut registry = Registry::with_builtins().context("failed to load the base grammar")?;

    if !cli.no_default_grammar
        && let Some(text) = DEFAULT_GRAMMAR
    {
        load_grammar(&mut registry, "<default grammar>", text, format)?;
    }
    for path in cli.grammars.iter().chain(extra) {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read grammar '{}'", path.display()))?;
        load_grammar(&mut registry, &path.display().to_string(), &text, format)?;
    }
    log::debug!("{} command(s) loaded", registry.commands().len());
    Ok(registry)
}

fn load_grammar(registry: &mut Registry, name: &str, text: &str, format: Format) -> Result<()> {
    if let Err(e) = registry.load_jsonc(text) {
        render_diagnostics(text, name, &[e.to_diagnostic(text)], format)?;
        bail!("failed to load grammar '{name}'");
    }
    Ok(())
}

/// A session configured from `--config`, the override flags, and
/// `--store`.
fn open_session<'r>(cli: &Cli, registry: &'r Registry) -> Result<Session<'r>> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read config '{}'", path.display()))?;
            ShellConfig::from_jsonc(&text)
                .with_context(|| format!("failed to parse config '{}'", path.display()))?
        }
        None => ShellConfig::default(),
    };
    if let Some(hostname) = &cli.hostname {
        config = config.with_hostname(hostname.as_str());
    }
    if let Some(mode) = &cli.mode {
        config = config.with_initial_mode(mode.as_str());
    }
    for feature in &cli.features {
        config = config.with_feature(feature.as_str());
    }

    let store = match &cli.store {
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("failed to read store '{}'", path.display()))?;
            MemoryStore::from_jsonc(&text)
                .with_context(|| format!("failed to parse store '{}'", path.display()))?
        }
        None => MemoryStore::new(),
    };
    Ok(Session::new(registry, config, Box::new(store)))
}

// ── Commands ────────────────────────────────────────────────────────────

fn cmd_run(session: &mut Session<'_>, commands: &[String], format: Format) -> Result<bool> {
    let scripted = !commands.is_empty();
    let interactive = !scripted && format == Format::Pretty && io::stdin().is_terminal();
    let mut pending = commands.iter().cloned();
    let stdin = io::stdin();
    let mut all_ok = true;
    let mut number = 0usize;

    loop {
        let line = if scripted {
            match pending.next() {
                Some(line) => line,
                None => break,
            }
        } else {
            if interactive {
                print!("{} ", session.prompt());
                io::stdout().flush()?;
            }
            let mut buf = String::new();
            if stdin.lock().read_line(&mut buf)? == 0 {
                break;
            }
            buf
        };
        number += 1;
        let line = line.trim_end_matches(['\r', '\n']);
        // Blank lines and `!` comments, as in a saved running-config.
        if line.trim().is_empty() || line.trim_start().starts_with('!') {
            continue;
        }

        let prompt = session.prompt();
        let result = session.execute(line);
        all_ok &= result.is_ok();
        match format {
            Format::Json => {
                let mut report = serde_json::json!({
                    "line": line,
                    "prompt": prompt,
                    "ok": result.is_ok(),
                });
                match &result {
                    Ok(outcome) => {
                        report["output"] = serde_json::json!(outcome.output);
                        report["warnings"] = serde_json::to_value(&outcome.warnings)?;
                    }
                    Err(e) => {
                        let d = diagnostic_for(e, line, session.config().debug);
                        report["error"] = serde_json::to_value(&d)?;
                    }
                }
                println!("{}", serde_json::to_string(&report)?);
            }
            Format::Pretty => {
                let name = format!("line {number}");
                match result {
                    Ok(outcome) => {
                        if let Some(output) = outcome.output {
                            print!("{output}");
                        }
                        render_diagnostics(line, &name, &outcome.warnings, format)?;
                    }
                    Err(e) => {
                        let d = diagnostic_for(&e, line, session.config().debug);
                        render_diagnostics(line, &name, &[d], format)?;
                    }
                }
            }
        }
    }
    Ok(all_ok)
}

fn cmd_complete(
    session: &mut Session<'_>,
    line: &str,
    help_mode: bool,
    format: Format,
) -> Result<bool> {
    let kind = if help_mode {
        CompletionKind::Help
    } else {
        CompletionKind::Tokens
    };
    let completion = match session.complete(line, kind) {
        Ok(completion) => completion,
        Err(e) => {
            let d = diagnostic_for(&e, line, session.config().debug);
            render_diagnostics(line, "<line>", &[d], format)?;
            return Ok(false);
        }
    };

    match format {
        Format::Json => print_json(&completion)?,
        Format::Pretty => match &completion.help {
            Some(help) => println!("{help}"),
            None => {
                for token in &completion.tokens {
                    println!("{token}");
                }
            }
        },
    }
    Ok(true)
}

fn cmd_check(registry: &Registry, format: Format) -> Result<bool> {
    let issues = registry.check();
    let ok = !issues.iter().any(Diagnostic::is_error);

    match format {
        Format::Json => {
            print_json(&serde_json::json!({
                "ok": ok,
                "diagnostics": issues,
            }))?;
        }
        Format::Pretty => {
            render_diagnostics("", "<grammar>", &issues, format)?;
            print_summary(&issues);
            if ok {
                eprintln!(
                    "grammar ok: {} command(s), {} typedef(s)",
                    registry.commands().len(),
                    registry.tables().typedefs.len()
                );
            }
        }
    }
    Ok(ok)
}

fn cmd_explain(id: &str, format: Format) -> Result<()> {
    match format {
        Format::Json => {
            print_json(&serde_json::json!({
                "id": id,
                "explanation": diag::explain(id),
            }))?;
        }
        Format::Pretty => {
            if let Some(text) = diag::explain(id) {
                use ariadne::Fmt;
                if io::stdout().is_terminal() {
                    println!("{}: {}", id.fg(ariadne::Color::Cyan), text);
                } else {
                    println!("{id}: {text}");
                }
            } else {
                println!("{id}: (no explanation available)");
            }
        }
    }
    Ok(())
}

// ── Helpers ─────────────────────────────────────────────────────────────

/// Diagnostic for a failed line, pointing at the offending word. Grammar
/// defects keep their command context only with `debug` set.
fn diagnostic_for(e: &CommandError, line: &str, debug: bool) -> Diagnostic {
    let words = split_words(line).ok();
    // Error word indexes count from after a leading `no`.
    let offset = words
        .as_ref()
        .and_then(|w| w.words.first())
        .is_some_and(|w| w.text.eq_ignore_ascii_case("no"));
    let mut d = e.to_diagnostic(words.as_ref(), usize::from(offset));
    if e.is_description() && !debug {
        d.context = None;
    }
    d
}
