//! Procedure kinds and the call structures they receive.
//!
//! Grammar files refer to behavior by name (`"action": "write-fields"`).
//! Each name resolves to one of four closed kinds of procedure, and each
//! kind is invoked with its own typed call structure instead of a loose
//! keyword map. Plain functions and closures implement the traits through
//! blanket impls, so builtins are registered as `fn` items.

use crate::complete::Candidates;
use crate::config::ShellConfig;
use crate::error::{CommandError, ValidationError};
use crate::mode::{ModeEntry, ModeStack};
use crate::registry::Registry;
use crate::scope::ScopeChain;
use crate::store::ObjectStore;
use sdnsh_grammar_tables::{CommandDescription, FieldValues, ProcRef, TypeDef};
use serde_json::Value;
use std::collections::BTreeMap;

/// Static parameters attached to a procedure reference.
pub type Params = BTreeMap<String, Value>;

/// The four kinds of named procedure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcKind {
    /// Checks and converts a field value.
    Validation,
    /// Runs when a command executes.
    Action,
    /// Offers completion candidates for a field.
    Completion,
    /// Stores a matched field value into the collected values.
    DataHandler,
}

impl std::fmt::Display for ProcKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ProcKind::Validation => "validation",
            ProcKind::Action => "action",
            ProcKind::Completion => "completion",
            ProcKind::DataHandler => "data-handler",
        })
    }
}

// ── Validation ──────────────────────────────────────────────────────────────

/// What a validation procedure accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Validated {
    /// The value is acceptable as typed; no canonical form is imposed.
    Accept,
    /// The value is acceptable and is stored as this JSON value.
    Value(Value),
    /// Stored value plus the full token it stands for (an enum keyword the
    /// operator abbreviated).
    Pair(Value, String),
    /// Several interpretations; each becomes its own match branch.
    List(Vec<(Value, String)>),
}

/// Arguments of a validation call.
pub struct ValidationCall<'a> {
    /// Typedef being validated against (its own constraints, not the base's).
    pub typedef: &'a TypeDef,
    /// Raw word (or default) being validated.
    pub value: &'a str,
    /// Static parameters from the procedure reference.
    pub params: &'a Params,
    /// Object type in scope, if any.
    pub obj_type: Option<&'a str>,
    /// Object store, for existence checks.
    pub store: &'a dyn ObjectStore,
    /// Registry, for compiled patterns and typedef lookups.
    pub registry: &'a Registry,
}

/// A validation procedure.
pub trait Validator {
    /// Accept (and possibly convert) `call.value`, or reject it.
    fn validate(&self, call: &ValidationCall<'_>) -> Result<Validated, ValidationError>;
}

impl<F> Validator for F
where
    F: Fn(&ValidationCall<'_>) -> Result<Validated, ValidationError>,
{
    fn validate(&self, call: &ValidationCall<'_>) -> Result<Validated, ValidationError> {
        self(call)
    }
}

// ── Action ──────────────────────────────────────────────────────────────────

/// Arguments of an action call.
#[derive(Clone, Copy)]
pub struct ActionCall<'a> {
    /// The command being executed.
    pub command: &'a CommandDescription,
    /// Field values collected by the matcher.
    pub values: &'a FieldValues,
    /// Whether the line started with `no`.
    pub is_no_command: bool,
    /// Object type resolved from the action's scope.
    pub obj_type: Option<&'a str>,
    /// Current mode entry, when it is bound to an object.
    pub mode_object: Option<&'a ModeEntry>,
    /// Static parameters from the procedure reference.
    pub params: &'a Params,
    /// Exit hook in scope, for actions that enter a submode.
    pub on_exit: Option<&'a ProcRef>,
}

/// Mutable session state an action may change.
pub struct ActionContext<'a> {
    /// Mode stack.
    pub modes: &'a mut ModeStack,
    /// Object store.
    pub store: &'a mut dyn ObjectStore,
    /// Session configuration.
    pub config: &'a ShellConfig,
    /// Registry, for running exit hooks.
    pub registry: &'a Registry,
}

impl ActionContext<'_> {
    /// Leave the current mode, running its `onExit` action if it has one.
    ///
    /// The base login mode is never popped; `None` is returned instead.
    pub fn pop_mode(&mut self, call: &ActionCall<'_>) -> Result<Option<ModeEntry>, CommandError> {
        let Some(entry) = self.modes.pop() else {
            return Ok(None);
        };
        if let Some(hook) = &entry.on_exit {
            let registry = self.registry;
            let action = registry.action(hook.name())?;
            let exit_call = ActionCall {
                obj_type: entry.obj_type.as_deref(),
                mode_object: Some(&entry),
                params: hook.params(),
                on_exit: None,
                ..*call
            };
            if let ActionOutput::Text(text) = action.run(&exit_call, self)? {
                log::debug!("exit hook {hook} for {}: {text}", entry.mode);
            }
        }
        Ok(Some(entry))
    }
}

/// Output of an action.
pub enum ActionOutput {
    /// Nothing to print.
    Nothing,
    /// Text printed as is.
    Text(String),
    /// Lines produced on demand, each printed with a trailing newline.
    Lines(Box<dyn Iterator<Item = String>>),
}

impl ActionOutput {
    /// Wrap any owned line source.
    pub fn lines<I>(lines: I) -> Self
    where
        I: IntoIterator<Item = String>,
        I::IntoIter: 'static,
    {
        ActionOutput::Lines(Box::new(lines.into_iter()))
    }

    /// Printable text, or `None` for [`ActionOutput::Nothing`].
    pub fn into_text(self) -> Option<String> {
        match self {
            ActionOutput::Nothing => None,
            ActionOutput::Text(text) => Some(text),
            ActionOutput::Lines(lines) => Some(lines.fold(String::new(), |mut text, line| {
                text.push_str(&line);
                text.push('\n');
                text
            })),
        }
    }
}

impl std::fmt::Debug for ActionOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionOutput::Nothing => f.write_str("Nothing"),
            ActionOutput::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ActionOutput::Lines(_) => f.write_str("Lines(..)"),
        }
    }
}

/// An action procedure.
pub trait Action {
    /// Run the action.
    fn run(
        &self,
        call: &ActionCall<'_>,
        ctx: &mut ActionContext<'_>,
    ) -> Result<ActionOutput, CommandError>;
}

impl<F> Action for F
where
    F: Fn(&ActionCall<'_>, &mut ActionContext<'_>) -> Result<ActionOutput, CommandError>,
{
    fn run(
        &self,
        call: &ActionCall<'_>,
        ctx: &mut ActionContext<'_>,
    ) -> Result<ActionOutput, CommandError> {
        self(call, ctx)
    }
}

// ── Completion ──────────────────────────────────────────────────────────────

/// Arguments of a completion call.
pub struct CompletionCall<'a> {
    /// Completed words of the line (after any `no`).
    pub words: &'a [String],
    /// Partial word being completed.
    pub text: &'a str,
    /// Field values collected so far.
    pub values: &'a FieldValues,
    /// Whether the line started with `no`.
    pub is_no_command: bool,
    /// Field being completed, if the position is a field.
    pub field: Option<&'a str>,
    /// Object type in scope.
    pub obj_type: Option<&'a str>,
    /// Current mode name.
    pub mode: &'a str,
    /// Static parameters from the procedure reference.
    pub params: &'a Params,
    /// Object store.
    pub store: &'a dyn ObjectStore,
}

/// A completion procedure.
pub trait Completer {
    /// Add candidates for `call.text` to `out`.
    fn complete(&self, call: &CompletionCall<'_>, out: &mut Candidates)
    -> Result<(), CommandError>;
}

impl<F> Completer for F
where
    F: Fn(&CompletionCall<'_>, &mut Candidates) -> Result<(), CommandError>,
{
    fn complete(
        &self,
        call: &CompletionCall<'_>,
        out: &mut Candidates,
    ) -> Result<(), CommandError> {
        self(call, out)
    }
}

// ── Data handler ────────────────────────────────────────────────────────────

/// Arguments of a data-handler call.
pub struct DataHandlerCall<'a> {
    /// Field the value was matched for.
    pub field: &'a str,
    /// Validated value.
    pub value: &'a Value,
    /// Whether the line started with `no`.
    pub is_no_command: bool,
    /// Object type in scope.
    pub obj_type: Option<&'a str>,
    /// Current mode entry, when it is bound to an object.
    pub mode_object: Option<&'a ModeEntry>,
    /// Static parameters from the procedure reference.
    pub params: &'a Params,
    /// Scope chain at the field.
    pub scope: &'a ScopeChain<'a>,
}

/// A data-handler procedure.
pub trait DataHandler {
    /// Store `call.value` into `values`, in whatever shape the handler
    /// chooses.
    fn handle(
        &self,
        call: &DataHandlerCall<'_>,
        values: &mut FieldValues,
    ) -> Result<(), ValidationError>;
}

impl<F> DataHandler for F
where
    F: Fn(&DataHandlerCall<'_>, &mut FieldValues) -> Result<(), ValidationError>,
{
    fn handle(
        &self,
        call: &DataHandlerCall<'_>,
        values: &mut FieldValues,
    ) -> Result<(), ValidationError> {
        self(call, values)
    }
}

// ── Registration ────────────────────────────────────────────────────────────

/// A procedure ready to be registered under a name.
pub enum Procedure {
    /// Validation procedure.
    Validation(Box<dyn Validator>),
    /// Action procedure.
    Action(Box<dyn Action>),
    /// Completion procedure.
    Completion(Box<dyn Completer>),
    /// Data-handler procedure.
    DataHandler(Box<dyn DataHandler>),
}

impl Procedure {
    /// Wrap a validation procedure.
    pub fn validation(f: impl Validator + 'static) -> Self {
        Procedure::Validation(Box::new(f))
    }

    /// Wrap an action procedure.
    pub fn action(f: impl Action + 'static) -> Self {
        Procedure::Action(Box::new(f))
    }

    /// Wrap a completion procedure.
    pub fn completion(f: impl Completer + 'static) -> Self {
        Procedure::Completion(Box::new(f))
    }

    /// Wrap a data-handler procedure.
    pub fn data_handler(f: impl DataHandler + 'static) -> Self {
        Procedure::DataHandler(Box::new(f))
    }

    /// Kind of the wrapped procedure.
    pub fn kind(&self) -> ProcKind {
        match self {
            Procedure::Validation(_) => ProcKind::Validation,
            Procedure::Action(_) => ProcKind::Action,
            Procedure::Completion(_) => ProcKind::Completion,
            Procedure::DataHandler(_) => ProcKind::DataHandler,
        }
    }
}

impl std::fmt::Debug for Procedure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Procedure::{:?}", self.kind())
    }
}
