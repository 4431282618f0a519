//! sdnsh command engine.
//!
//! Turns an operator's command line into an action invocation by matching it
//! against a declarative grammar of [`CommandDescription`]s, and offers
//! completion candidates for partial lines. The main entry points are
//! [`Registry`] for loading grammar and procedures, and [`Session`] for
//! executing and completing lines in a given mode.

#![warn(missing_docs)]

/// Shorthand for building a `BTreeMap<String, String>` context from key-value pairs.
///
/// ```ignore
/// ctx!("word" => word, "mode" => mode)
/// ```
macro_rules! ctx {
    ($($k:expr => $v:expr),+ $(,)?) => {
        std::collections::BTreeMap::from([$(($k.into(), $v.into())),+])
    };
}

/// Standard procedures and the base grammar (typedefs, command types).
pub mod builtins;
/// Completion engine.
pub mod complete;
/// Session configuration.
pub mod config;
/// Error types.
pub mod error;
/// Command execution and the `parse` entry point.
pub mod exec;
/// Command-line word splitting.
pub mod lexer;
/// Argument matcher.
pub mod matcher;
/// Mode stack and mode gating.
pub mod mode;
/// Command and procedure registry.
pub mod registry;
/// Ambiguity resolution between complete matches.
pub mod resolve;
/// Scope chain for inheritable attributes.
pub mod scope;
/// Interactive session state.
pub mod session;
/// Object store abstraction.
pub mod store;

// ── Convenience re-exports ──────────────────────────────────────────────────

// Grammar tables
pub use sdnsh_grammar_tables as tables;
pub use sdnsh_grammar_tables::{ArgumentNode, CommandDescription, FieldValues, GrammarTables};

// Diagnostics (re-exported from the diagnostics crate)
pub use sdnsh_diagnostics::{Diagnostic, Severity, Span, codes};

// Engine
pub use complete::{Candidate, Candidates, Completion, CompletionKind, HelpText};
pub use config::ShellConfig;
pub use error::{CommandError, StoreError, ValidationError};
pub use exec::{ExecOutcome, Parsed};
pub use mode::{ModeEntry, ModeStack};
pub use registry::{GrammarLoadError, ProcKind, Registry};
pub use session::Session;
pub use store::{MemoryStore, ObjectStore};
