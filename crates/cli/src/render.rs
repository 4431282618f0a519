//! Pretty diagnostic rendering using ariadne.
//!
//! Converts the engine's [`Diagnostic`] type into ariadne [`Report`]s for
//! coloured terminal output that underlines the offending word of a
//! command line (or the offending spot of a grammar file). Falls back to
//! structured JSON when the output is piped or when the user explicitly
//! requests it.

use std::io::{self, IsTerminal};

use anyhow::Result;
use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use sdnsh_diagnostics::{Diagnostic, Severity};
use serde::Serialize;

// ── Output format ───────────────────────────────────────────────────────

/// Output format for results and diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Coloured, source-annotated output (ariadne).
    Pretty,
    /// Machine-readable JSON.
    Json,
}

impl Format {
    /// Use the explicit choice, or detect from whether stdout is a TTY.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ if io::stdout().is_terminal() => Format::Pretty,
            _ => Format::Json,
        }
    }
}

// ── Severity mapping ────────────────────────────────────────────────────

fn report_kind(severity: &Severity) -> ReportKind<'static> {
    match severity {
        Severity::Error => ReportKind::Error,
        Severity::Warn => ReportKind::Warning,
        Severity::Info => ReportKind::Advice,
        _ => ReportKind::Warning,
    }
}

fn severity_color(severity: &Severity) -> Color {
    match severity {
        Severity::Error => Color::Red,
        Severity::Warn => Color::Yellow,
        Severity::Info => Color::Blue,
        _ => Color::White,
    }
}

fn severity_word(severity: &Severity) -> &'static str {
    match severity {
        Severity::Error => "error",
        Severity::Warn => "warning",
        Severity::Info => "info",
        _ => "diagnostic",
    }
}

// ── Pretty rendering ────────────────────────────────────────────────────

/// Render diagnostics to stderr, with `source` (a command line or a
/// grammar file named `name`) as context for those carrying a span.
pub(crate) fn render_diagnostics_pretty(source: &str, name: &str, diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }

    let config = Config::default().with_compact(true);
    let mut cache = (name, Source::from(source));

    for diag in diagnostics {
        let Some(span) = &diag.span else {
            eprintln!("{}[{}]: {}", severity_word(&diag.severity), diag.id, diag.message);
            if let Some(note) = context_note(diag) {
                eprintln!("  = note: {note}");
            }
            continue;
        };

        // Clamp to the source; an empty span still needs one column.
        let start = span.start.min(source.len());
        let end = span.end.min(source.len()).max(start);

        let mut builder = Report::build(report_kind(&diag.severity), (name, start..end))
            .with_code(diag.id.as_ref())
            .with_message(first_line(&diag.message))
            .with_config(config)
            .with_label(
                Label::new((name, start..end))
                    .with_message(label_message(diag))
                    .with_color(severity_color(&diag.severity)),
            );
        if let Some(note) = context_note(diag) {
            builder = builder.with_note(note);
        }
        builder.finish().eprint(&mut cache).ok();
    }
}

fn first_line(message: &str) -> &str {
    message.lines().next().unwrap_or(message)
}

/// Label under the offending word: the rest of a multi-line message, or
/// the message itself.
fn label_message(diag: &Diagnostic) -> String {
    let mut lines = diag.message.lines();
    lines.next();
    let rest: Vec<&str> = lines.collect();
    if rest.is_empty() {
        diag.message.clone()
    } else {
        rest.join("; ")
    }
}

fn context_note(diag: &Diagnostic) -> Option<String> {
    let ctx = diag.context.as_ref().filter(|ctx| !ctx.is_empty())?;
    Some(
        ctx.iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", "),
    )
}

// ── JSON rendering ──────────────────────────────────────────────────────

/// Print a value as pretty JSON to stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Unified entry point ─────────────────────────────────────────────────

/// Render diagnostics in the given format.
///
/// - `Pretty` → coloured output to stderr (command output stays on stdout).
/// - `Json`   → JSON array to stdout.
pub(crate) fn render_diagnostics(
    source: &str,
    name: &str,
    diagnostics: &[Diagnostic],
    format: Format,
) -> Result<()> {
    match format {
        Format::Pretty => render_diagnostics_pretty(source, name, diagnostics),
        Format::Json if diagnostics.is_empty() => {}
        Format::Json => print_json(diagnostics)?,
    }
    Ok(())
}

// ── Summary line ────────────────────────────────────────────────────────

/// Print a coloured summary line showing error/warning/info counts.
///
/// Example: `2 errors, 1 warning`
pub(crate) fn print_summary(diagnostics: &[Diagnostic]) {
    use ariadne::Fmt;

    let (mut errors, mut warnings, mut infos) = (0usize, 0usize, 0usize);
    for d in diagnostics {
        match d.severity {
            Severity::Error => errors += 1,
            Severity::Info => infos += 1,
            _ => warnings += 1,
        }
    }
    if errors + warnings + infos == 0 {
        return;
    }

    let plural = |n: usize| if n == 1 { "" } else { "s" };
    let mut parts = Vec::new();
    if errors > 0 {
        parts.push(format!(
            "{}",
            format!("{errors} error{}", plural(errors)).fg(Color::Red)
        ));
    }
    if warnings > 0 {
        parts.push(format!(
            "{}",
            format!("{warnings} warning{}", plural(warnings)).fg(Color::Yellow)
        ));
    }
    if infos > 0 {
        parts.push(format!("{}", format!("{infos} info").fg(Color::Blue)));
    }
    eprintln!("{}", parts.join(", "));
}
