//! Diagnostics for the sdnsh command engine.
//!
//! Provides [`Diagnostic`], [`Severity`], [`Span`], and [`LineIndex`], the
//! types used to report command-line errors, grammar defects, and runtime
//! failures. Diagnostic codes are generated from `spec/diagnostics.jsonc`
//! into the [`codes`] module, together with default severities and message
//! templates.

#![warn(missing_docs)]

/// Diagnostic ID constants generated at build time.
pub mod codes;

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::BTreeMap;

// ── LineIndex ────────────────────────────────────────────────────────────

/// Maps between byte offsets and 0-indexed `(line, column)` positions.
///
/// Command lines are single-line, but grammar and configuration files are
/// not; the index lets `serde_json` line/column errors be turned back into
/// byte spans for rendering.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    /// Build an index over `text`.
    pub fn new(text: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Convert a 0-indexed `(line, column)` back into a byte offset,
    /// clamped to the end of the text.
    pub fn offset(&self, line: usize, col: usize) -> Option<usize> {
        let start = *self.line_starts.get(line)?;
        Some((start + col).min(self.len))
    }
}

// ── Severity / Span ──────────────────────────────────────────────────────

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum Severity {
    /// The command was not executed, or failed part way.
    Error,
    /// The command ran, but something the operator should know happened.
    Warn,
    /// Informational note.
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warn => write!(f, "warn"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// Byte span in the command line (or grammar file) being reported on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Span {
    /// Byte offset of the first character (0-based).
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

impl Span {
    /// Create a span covering `[start, end)`.
    ///
    /// Panics if `end < start`.
    pub fn new(start: usize, end: usize) -> Self {
        assert!(end >= start, "Span end ({end}) < start ({start})");
        Self { start, end }
    }

    /// Create a zero-width span at the given position.
    pub fn empty(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }
}

// ── Diagnostic ───────────────────────────────────────────────────────────

/// A diagnostic produced while loading a grammar or handling a command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Diagnostic code (e.g. `"SDN1001"`).
    pub id: Cow<'static, str>,
    /// Severity level.
    pub severity: Severity,
    /// Human-readable message, as shown to the operator.
    pub message: String,
    /// Byte span in the source this diagnostic points at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,
    /// Machine-readable context (`word`, `command`, `expected`, ...).
    ///
    /// `BTreeMap` keeps serialized key order deterministic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<BTreeMap<String, String>>,
}

impl Diagnostic {
    /// Create a diagnostic with the given fields.
    pub fn new(
        id: impl Into<Cow<'static, str>>,
        severity: Severity,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self {
            id: id.into(),
            severity,
            message: message.into(),
            span,
            context: None,
        }
    }

    /// Shorthand for an `Error` diagnostic.
    pub fn error(
        id: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
        span: Option<Span>,
    ) -> Self {
        Self::new(id, Severity::Error, message, span)
    }

    /// Build a diagnostic from the catalogue: severity and the `default`
    /// message template come from `spec/diagnostics.jsonc`, placeholders are
    /// filled from `context`.
    ///
    /// Codes without a template use the context's `detail` entry as the
    /// message, or the code itself.
    pub fn from_catalogue(
        id: &'static str,
        context: BTreeMap<String, String>,
        span: Option<Span>,
    ) -> Self {
        let severity = severity_for_code(id).unwrap_or(Severity::Error);
        let message = match message_template_for(id, "default") {
            Some(template) => render_template(template, &context),
            None => context.get("detail").cloned().unwrap_or_else(|| id.to_string()),
        };
        Self::new(id, severity, message, span).with_context(context)
    }

    /// Attach machine-readable context metadata (builder pattern).
    pub fn with_context(mut self, ctx: BTreeMap<String, String>) -> Self {
        self.context = Some(ctx);
        self
    }

    /// True for `Error` severity.
    pub fn is_error(&self) -> bool {
        matches!(self.severity, Severity::Error)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}[{}]: {}", self.severity, self.id, self.message)
    }
}

// ── Catalogue lookups ────────────────────────────────────────────────────

/// Returns the long explanation for a diagnostic code, if known.
pub fn explain(id: &str) -> Option<&'static str> {
    include!(concat!(env!("OUT_DIR"), "/generated_explain.rs"))
}

/// Default severity declared for a diagnostic code.
fn severity_for_code(id: &str) -> Option<Severity> {
    include!(concat!(env!("OUT_DIR"), "/generated_severity.rs"))
}

/// Message template for a code and variant (usually `"default"`).
pub fn message_template_for(id: &str, variant: &str) -> Option<&'static str> {
    include!(concat!(env!("OUT_DIR"), "/generated_templates.rs"))
}

/// Substitute `{key}` placeholders from `context`. Unknown keys are left
/// as written.
pub fn render_template(template: &str, context: &BTreeMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = after[..close].trim();
        match context.get(key) {
            Some(value) => out.push_str(value),
            None => out.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}
