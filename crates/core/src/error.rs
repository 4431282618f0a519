//! Typed errors raised while matching and executing commands.

use crate::lexer::Line;
use sdnsh_diagnostics::{Diagnostic, Span, codes};

/// A value was rejected by a validation procedure.
///
/// `expected` lists the tokens that would have been accepted, when the
/// validation knows them (enumerations do). Errors carrying expected tokens
/// are merged into a single "expected one of" message when several
/// alternatives fail at the same word.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Human-readable reason.
    pub message: String,
    /// Tokens that would have been accepted.
    pub expected: Vec<String>,
}

impl ValidationError {
    /// A rejection with no expected-token list.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            expected: Vec::new(),
        }
    }

    /// A rejection listing the tokens that would have been accepted.
    pub fn expecting(message: impl Into<String>, expected: Vec<String>) -> Self {
        Self {
            message: message.into(),
            expected,
        }
    }
}

/// Failure reported by an [`ObjectStore`](crate::store::ObjectStore).
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No object with this key.
    #[error("{obj_type} \"{key}\" not found")]
    NotFound {
        /// Object type.
        obj_type: String,
        /// Object key.
        key: String,
    },
    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Connection(String),
    /// The store is a replica; writes must go to `master`.
    #[error("request must be sent to the master controller at {master}")]
    RedirectToMaster {
        /// Address of the master controller.
        master: String,
    },
    /// The store refused a field value.
    #[error("{field}: {message}")]
    FieldRejected {
        /// Rejected field.
        field: String,
        /// Reason given by the store.
        message: String,
    },
}

/// Everything that can go wrong while handling a command line.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// The grammar itself is defective (unknown typedef, procedure, or
    /// command type; conflicting descriptions; missing action).
    #[error("{message}")]
    Description {
        /// Diagnostic code.
        code: &'static str,
        /// Human-readable message.
        message: String,
        /// Title of the offending command, when known.
        command: Option<String>,
    },
    /// A value was rejected during validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The words do not form a command.
    #[error("{message}")]
    Syntax {
        /// Diagnostic code.
        code: &'static str,
        /// Human-readable message (may span several lines).
        message: String,
        /// Index of the offending word in the line.
        word_index: Option<usize>,
    },
    /// An abbreviated word matches several distinct tokens.
    #[error("{message}")]
    Ambiguous {
        /// Human-readable message.
        message: String,
        /// Index of the ambiguous word.
        word_index: usize,
        /// Distinct full tokens the word abbreviates.
        tokens: Vec<String>,
    },
    /// No command in the current mode has this name.
    #[error("No such command \"{word}\"")]
    UnknownCommand {
        /// The first word of the line.
        word: String,
    },
    /// The line holds no command.
    #[error("No command specified")]
    NoCommand,
    /// An action refused to run (wrong mode, missing parameter).
    #[error("{0}")]
    Invocation(String),
    /// The command is well formed but its meaning is invalid here.
    #[error("{0}")]
    Semantic(String),
    /// The object store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// An action failed.
    #[error("{0}")]
    Failed(String),
}

impl CommandError {
    /// A grammar defect with a catalogue code.
    pub fn description(code: &'static str, message: impl Into<String>) -> Self {
        CommandError::Description {
            code,
            message: message.into(),
            command: None,
        }
    }

    /// Attach the offending command's title to a description error.
    #[must_use]
    pub fn in_command(self, title: &str) -> Self {
        match self {
            CommandError::Description {
                code,
                message,
                command: None,
            } => CommandError::Description {
                code,
                message,
                command: Some(title.to_string()),
            },
            other => other,
        }
    }

    /// Whether the error reports a grammar defect rather than bad input.
    pub fn is_description(&self) -> bool {
        matches!(self, CommandError::Description { .. })
    }

    /// Diagnostic code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::Description { code, .. } | CommandError::Syntax { code, .. } => code,
            CommandError::Validation(_) => codes::INVALID_ARGUMENT,
            CommandError::Ambiguous { .. } => codes::AMBIGUOUS_COMMAND,
            CommandError::UnknownCommand { .. } => codes::UNKNOWN_COMMAND,
            CommandError::NoCommand => codes::NO_COMMAND,
            CommandError::Invocation(_) | CommandError::Semantic(_) => codes::INVALID_USE,
            CommandError::Store(StoreError::NotFound { .. }) => codes::OBJECT_NOT_FOUND,
            CommandError::Store(StoreError::Connection(_)) => codes::STORE_CONNECTION,
            CommandError::Store(StoreError::RedirectToMaster { .. }) => codes::STORE_REDIRECT,
            CommandError::Store(StoreError::FieldRejected { .. }) => codes::FIELD_REJECTED,
            CommandError::Failed(_) => codes::COMMAND_FAILED,
        }
    }

    /// Index of the word the error points at, if any.
    pub fn word_index(&self) -> Option<usize> {
        match self {
            CommandError::Syntax { word_index, .. } => *word_index,
            CommandError::Ambiguous { word_index, .. } => Some(*word_index),
            CommandError::UnknownCommand { .. } => Some(0),
            _ => None,
        }
    }

    /// Convert to a diagnostic, pointing at the offending word of `line`.
    ///
    /// `word_offset` is added to the error's word index, for lines whose
    /// leading `no` was stripped before matching.
    pub fn to_diagnostic(&self, line: Option<&Line>, word_offset: usize) -> Diagnostic {
        let span = self.word_index().and_then(|i| {
            let word = line?.words.get(i + word_offset)?;
            Some(Span::new(word.start, word.end))
        });
        let mut diagnostic = Diagnostic::error(self.code(), self.to_string(), span);
        let context = match self {
            CommandError::Description {
                command: Some(command),
                ..
            } => Some(ctx!("command" => command.as_str())),
            CommandError::Ambiguous { tokens, .. } => {
                Some(ctx!("matches" => tokens.join(", ")))
            }
            CommandError::UnknownCommand { word } => Some(ctx!("word" => word.as_str())),
            CommandError::Validation(v) if !v.expected.is_empty() => {
                Some(ctx!("expected" => v.expected.join(", ")))
            }
            _ => None,
        };
        if let Some(context) = context {
            diagnostic = diagnostic.with_context(context);
        }
        diagnostic
    }
}
