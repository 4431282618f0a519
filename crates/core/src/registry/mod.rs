//! Command and procedure registry.
//!
//! Holds every loaded [`CommandDescription`], typedef, and command type,
//! plus the named procedures grammar files refer to. Regular expressions
//! used by command names, typedefs, and fields are compiled once, when the
//! grammar is loaded.

/// Procedure kinds and call structures.
pub mod procs;

pub use procs::{
    Action, ActionCall, ActionContext, ActionOutput, Completer, CompletionCall, DataHandler,
    DataHandlerCall, Params, ProcKind, Procedure, Validated, ValidationCall, Validator,
};

use crate::error::CommandError;
use regex::Regex;
use sdnsh_diagnostics::{Diagnostic, LineIndex, Span, codes};
use sdnsh_grammar_tables::{
    ArgumentNode, CommandDescription, CommandName, CommandType, EnumValue, FieldNode,
    GrammarTables, NodeAttrs, ProcRef, TypeDef,
};
use std::collections::{HashMap, HashSet};

/// A grammar file could not be loaded.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GrammarLoadError {
    /// The text is not valid JSONC for the grammar schema.
    #[error("grammar syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// 1-based line.
        line: usize,
        /// 1-based column.
        column: usize,
        /// Parser message.
        message: String,
    },
}

impl GrammarLoadError {
    /// Convert to a diagnostic pointing into `source`.
    pub fn to_diagnostic(&self, source: &str) -> Diagnostic {
        match self {
            GrammarLoadError::Syntax {
                line,
                column,
                message,
            } => {
                let span = LineIndex::new(source)
                    .offset(line.saturating_sub(1), column.saturating_sub(1))
                    .map(Span::empty);
                Diagnostic::from_catalogue(
                    codes::GRAMMAR_SYNTAX,
                    ctx!(
                        "line" => line.to_string(),
                        "column" => column.to_string(),
                        "detail" => message.as_str(),
                    ),
                    span,
                )
            }
        }
    }
}

/// Grammar plus named procedures.
#[derive(Default)]
pub struct Registry {
    tables: GrammarTables,
    validations: HashMap<String, Box<dyn Validator>>,
    actions: HashMap<String, Box<dyn Action>>,
    completions: HashMap<String, Box<dyn Completer>>,
    data_handlers: HashMap<String, Box<dyn DataHandler>>,
    patterns: HashMap<String, Result<Regex, String>>,
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("commands", &self.tables.commands.len())
            .field("typedefs", &self.tables.typedefs.len())
            .field("command_types", &self.tables.command_types.len())
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// An empty registry: no procedures, no grammar.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the standard procedures, typedefs, and command
    /// types.
    pub fn with_builtins() -> Result<Self, GrammarLoadError> {
        let mut registry = Self::new();
        crate::builtins::install(&mut registry)?;
        Ok(registry)
    }

    /// Register a procedure under `name`, replacing any procedure of the
    /// same kind and name.
    pub fn register(&mut self, name: impl Into<String>, procedure: Procedure) {
        let name = name.into();
        log::trace!("registering {} procedure {name}", procedure.kind());
        match procedure {
            Procedure::Validation(p) => {
                self.validations.insert(name, p);
            }
            Procedure::Action(p) => {
                self.actions.insert(name, p);
            }
            Procedure::Completion(p) => {
                self.completions.insert(name, p);
            }
            Procedure::DataHandler(p) => {
                self.data_handlers.insert(name, p);
            }
        }
    }

    /// Parse a grammar file and add its contents.
    pub fn load_jsonc(&mut self, text: &str) -> Result<(), GrammarLoadError> {
        let tables = GrammarTables::from_jsonc(text).map_err(|e| GrammarLoadError::Syntax {
            line: e.line(),
            column: e.column(),
            message: e.to_string(),
        })?;
        self.load_tables(tables);
        Ok(())
    }

    /// Add already-parsed grammar tables.
    pub fn load_tables(&mut self, tables: GrammarTables) {
        log::debug!(
            "loading {} commands, {} typedefs, {} command types",
            tables.commands.len(),
            tables.typedefs.len(),
            tables.command_types.len()
        );
        for pattern in grammar_patterns(&tables) {
            self.compile(pattern);
        }
        self.tables.extend(tables);
    }

    /// Add one command description.
    pub fn add_command(&mut self, command: CommandDescription) {
        self.load_tables(GrammarTables::new(Vec::new(), Vec::new(), vec![command]));
    }

    /// Add one typedef.
    pub fn add_typedef(&mut self, typedef: TypeDef) {
        self.load_tables(GrammarTables::new(vec![typedef], Vec::new(), Vec::new()));
    }

    /// Add one command type.
    pub fn add_command_type(&mut self, command_type: CommandType) {
        self.load_tables(GrammarTables::new(Vec::new(), vec![command_type], Vec::new()));
    }

    fn compile(&mut self, pattern: &str) {
        if !self.patterns.contains_key(pattern) {
            let compiled = Regex::new(pattern).map_err(|e| e.to_string());
            if let Err(e) = &compiled {
                log::warn!("pattern {pattern:?} does not compile: {e}");
            }
            self.patterns.insert(pattern.to_string(), compiled);
        }
    }

    // ── Lookups ─────────────────────────────────────────────────────────────

    /// Every command, in registration order.
    pub fn commands(&self) -> &[CommandDescription] {
        &self.tables.commands
    }

    /// The loaded grammar.
    pub fn tables(&self) -> &GrammarTables {
        &self.tables
    }

    /// Look up a typedef.
    pub fn typedef(&self, name: &str) -> Result<&TypeDef, CommandError> {
        self.tables.typedef(name).ok_or_else(|| {
            CommandError::description(codes::UNKNOWN_TYPE, format!("unknown type '{name}'"))
        })
    }

    /// Look up a command type.
    pub fn command_type(&self, name: &str) -> Result<&CommandType, CommandError> {
        self.tables.command_type(name).ok_or_else(|| {
            CommandError::description(
                codes::UNKNOWN_COMMAND_TYPE,
                format!("unknown command type '{name}'"),
            )
        })
    }

    /// Look up a validation procedure.
    pub fn validator(&self, name: &str) -> Result<&dyn Validator, CommandError> {
        self.validations
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown_procedure(ProcKind::Validation, name))
    }

    /// Look up an action procedure.
    pub fn action(&self, name: &str) -> Result<&dyn Action, CommandError> {
        self.actions
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown_procedure(ProcKind::Action, name))
    }

    /// Look up a completion procedure.
    pub fn completer(&self, name: &str) -> Result<&dyn Completer, CommandError> {
        self.completions
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown_procedure(ProcKind::Completion, name))
    }

    /// Look up a data-handler procedure.
    pub fn data_handler(&self, name: &str) -> Result<&dyn DataHandler, CommandError> {
        self.data_handlers
            .get(name)
            .map(Box::as_ref)
            .ok_or_else(|| unknown_procedure(ProcKind::DataHandler, name))
    }

    /// Whether a procedure of `kind` is registered under `name`.
    pub fn has_procedure(&self, kind: ProcKind, name: &str) -> bool {
        match kind {
            ProcKind::Validation => self.validations.contains_key(name),
            ProcKind::Action => self.actions.contains_key(name),
            ProcKind::Completion => self.completions.contains_key(name),
            ProcKind::DataHandler => self.data_handlers.contains_key(name),
        }
    }

    /// Compiled regular expression for a grammar pattern.
    pub fn regex(&self, pattern: &str) -> Result<Regex, CommandError> {
        let compiled = match self.patterns.get(pattern) {
            Some(compiled) => compiled.clone(),
            None => Regex::new(pattern).map_err(|e| e.to_string()),
        };
        compiled.map_err(|detail| {
            CommandError::description(
                codes::BAD_PATTERN,
                format!("pattern {pattern:?} does not compile: {detail}"),
            )
        })
    }

    /// Whether `pattern` matches all of `word`.
    pub fn full_match(&self, pattern: &str, word: &str) -> Result<bool, CommandError> {
        Ok(self
            .regex(pattern)?
            .find(word)
            .is_some_and(|m| m.start() == 0 && m.end() == word.len()))
    }

    /// `start` followed by its base types, nearest first.
    pub fn typedef_chain<'a>(&'a self, start: &'a TypeDef) -> Result<Vec<&'a TypeDef>, CommandError> {
        let mut chain = vec![start];
        let mut seen = HashSet::new();
        let mut current = start;
        while let Some(base) = &current.base_type {
            if !seen.insert(base.as_str()) {
                return Err(CommandError::description(
                    codes::TYPEDEF_CYCLE,
                    format!("typedef '{base}' inherits from itself"),
                ));
            }
            current = self.typedef(base)?;
            chain.push(current);
        }
        Ok(chain)
    }

    /// Enumerated keywords accepted by a field: its own, or the nearest
    /// typedef's in the base chain.
    pub fn enum_values<'a>(&'a self, field: &'a FieldNode) -> Result<&'a [EnumValue], CommandError> {
        if !field.constraints.values.is_empty() {
            return Ok(&field.constraints.values);
        }
        let typedef = self.typedef(&field.type_name)?;
        Ok(self
            .typedef_chain(typedef)?
            .into_iter()
            .find(|t| !t.constraints.values.is_empty())
            .map_or(&[][..], |t| &t.constraints.values))
    }

    // ── Lint ────────────────────────────────────────────────────────────────

    /// Check the loaded grammar for dangling references and malformed
    /// nodes. Every problem becomes one diagnostic; an empty list means the
    /// grammar is sound.
    pub fn check(&self) -> Vec<Diagnostic> {
        let mut issues = Vec::new();

        for typedef in &self.tables.typedefs {
            if let Err(e) = self.typedef_chain(typedef) {
                issues.push(
                    Diagnostic::error(e.code(), e.to_string(), None)
                        .with_context(ctx!("type" => typedef.name.as_str())),
                );
            }
            if let Some(proc) = &typedef.validation {
                self.check_proc(&mut issues, &typedef.name, ProcKind::Validation, proc);
            }
            for pattern in &typedef.constraints.pattern {
                self.check_pattern(&mut issues, &typedef.name, pattern);
            }
        }

        for command_type in &self.tables.command_types {
            self.check_attrs(&mut issues, &command_type.name, &command_type.attrs);
        }

        for command in &self.tables.commands {
            let title = command.title();
            if command.modes.is_empty() {
                issues.push(Diagnostic::from_catalogue(
                    codes::EMPTY_MODES,
                    ctx!("command" => title, "detail" => format!("command '{title}' lists no modes")),
                    None,
                ));
            }
            if let CommandName::Pattern(p) = &command.name {
                self.check_pattern(&mut issues, title, &p.pattern);
            }
            self.check_attrs(&mut issues, title, &command.attrs);
            for node in &command.args {
                node.walk(&mut |n| self.check_node(&mut issues, title, n));
            }
        }
        issues
    }

    fn check_node(&self, issues: &mut Vec<Diagnostic>, title: &str, node: &ArgumentNode) {
        self.check_attrs(issues, title, node.attrs());
        match node {
            ArgumentNode::Field(field) => {
                if self.tables.typedef(&field.type_name).is_none() {
                    issues.push(Diagnostic::from_catalogue(
                        codes::UNKNOWN_TYPE,
                        ctx!("command" => title, "type" => field.type_name.as_str()),
                        None,
                    ));
                }
                if let Some(proc) = &field.validation {
                    self.check_proc(issues, title, ProcKind::Validation, proc);
                }
                for pattern in &field.constraints.pattern {
                    self.check_pattern(issues, title, pattern);
                }
            }
            ArgumentNode::Choice(choice) if choice.choices.is_empty() => {
                issues.push(Diagnostic::from_catalogue(
                    codes::EMPTY_CHOICE,
                    ctx!("command" => title, "detail" => format!("empty choice in '{title}'")),
                    None,
                ));
            }
            _ => {}
        }
    }

    fn check_attrs(&self, issues: &mut Vec<Diagnostic>, title: &str, attrs: &NodeAttrs) {
        if let Some(name) = &attrs.command_type
            && self.tables.command_type(name).is_none()
        {
            issues.push(Diagnostic::from_catalogue(
                codes::UNKNOWN_COMMAND_TYPE,
                ctx!("command" => title, "commandType" => name.as_str()),
                None,
            ));
        }
        let actions = attrs.action.iter().chain(&attrs.no_action);
        for proc in actions.flat_map(|list| list.procs()).chain(&attrs.on_exit) {
            self.check_proc(issues, title, ProcKind::Action, proc);
        }
        if let Some(proc) = &attrs.completion {
            self.check_proc(issues, title, ProcKind::Completion, proc);
        }
        if let Some(proc) = &attrs.data_handler {
            self.check_proc(issues, title, ProcKind::DataHandler, proc);
        }
    }

    fn check_proc(&self, issues: &mut Vec<Diagnostic>, title: &str, kind: ProcKind, proc: &ProcRef) {
        if !self.has_procedure(kind, proc.name()) {
            issues.push(Diagnostic::from_catalogue(
                codes::UNKNOWN_PROCEDURE,
                ctx!("command" => title, "proc" => proc.name(), "kind" => kind.to_string()),
                None,
            ));
        }
    }

    fn check_pattern(&self, issues: &mut Vec<Diagnostic>, title: &str, pattern: &str) {
        if let Err(e) = self.regex(pattern) {
            issues.push(Diagnostic::from_catalogue(
                codes::BAD_PATTERN,
                ctx!("command" => title, "pattern" => pattern, "detail" => e.to_string()),
                None,
            ));
        }
    }
}

fn unknown_procedure(kind: ProcKind, name: &str) -> CommandError {
    CommandError::description(
        codes::UNKNOWN_PROCEDURE,
        format!("unknown {kind} procedure '{name}'"),
    )
}

/// Every regular expression a grammar uses.
fn grammar_patterns(tables: &GrammarTables) -> Vec<&str> {
    let mut patterns = Vec::new();
    for typedef in &tables.typedefs {
        patterns.extend(typedef.constraints.pattern.iter().map(String::as_str));
    }
    for command in &tables.commands {
        if let CommandName::Pattern(p) = &command.name {
            patterns.push(p.pattern.as_str());
        }
        for node in &command.args {
            node.walk(&mut |n| {
                if let ArgumentNode::Field(field) = n {
                    patterns.extend(field.constraints.pattern.iter().map(String::as_str));
                }
            });
        }
    }
    patterns
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(grammar: &str) -> Registry {
        let mut r = Registry::with_builtins().expect("builtins load");
        r.load_jsonc(grammar).expect("grammar loads");
        r
    }

    #[test]
    fn builtins_are_sound() {
        let r = Registry::with_builtins().unwrap();
        assert!(r.check().is_empty(), "{:?}", r.check());
        assert!(r.typedef("integer").is_ok());
        assert!(r.command_type("config-submode").is_ok());
        assert!(r.action("push-mode-stack").is_ok());
    }

    #[test]
    fn unknown_lookups_are_description_errors() {
        let r = Registry::new();
        let e = r.typedef("nope").unwrap_err();
        assert!(e.is_description());
        assert_eq!(e.code(), codes::UNKNOWN_TYPE);
        let Err(e) = r.action("frobnicate") else {
            panic!("expected unknown action");
        };
        assert_eq!(e.to_string(), "unknown action procedure 'frobnicate'");
    }

    #[test]
    fn syntax_errors_carry_positions() {
        let mut r = Registry::new();
        let source = "{\n  \"commands\": [ oops ]\n}";
        let err = r.load_jsonc(source).unwrap_err();
        let GrammarLoadError::Syntax { line, .. } = &err;
        assert_eq!(*line, 2);
        let d = err.to_diagnostic(source);
        assert_eq!(d.id, codes::GRAMMAR_SYNTAX);
        assert!(d.span.is_some());
    }

    #[test]
    fn typedef_chain_and_cycles() {
        let r = registry(
            r#"{ "typedefs": [
                { "name": "vlan", "baseType": "integer", "range": [[1, 4095]] },
                { "name": "loop-a", "baseType": "loop-b" },
                { "name": "loop-b", "baseType": "loop-a" }
            ] }"#,
        );
        let vlan = r.typedef("vlan").unwrap();
        let names: Vec<_> = r.typedef_chain(vlan).unwrap().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["vlan", "integer"]);
        let e = r.typedef_chain(r.typedef("loop-a").unwrap()).unwrap_err();
        assert_eq!(e.code(), codes::TYPEDEF_CYCLE);
    }

    #[test]
    fn patterns_compile_at_load_and_match_whole_words() {
        let r = registry(
            r#"{ "commands": [{
                "name": { "pattern": "^[0-9]+", "title": "<vlan>" },
                "modes": ["config"], "action": "write-fields"
            }] }"#,
        );
        assert!(r.full_match("^[0-9]+", "100").unwrap());
        assert!(!r.full_match("^[0-9]+", "100a").unwrap());
        assert!(r.regex("(").is_err());
    }

    #[test]
    fn check_reports_dangling_references() {
        let r = registry(
            r#"{
              "typedefs": [{ "name": "bad", "baseType": "string", "pattern": "(" }],
              "commands": [{
                "name": "frob",
                "modes": [],
                "commandType": "nonexistent",
                "action": "no-such-action",
                "args": [
                  { "kind": "field", "field": "x", "type": "missing-type" },
                  { "kind": "choice", "choices": [] },
                  { "kind": "field", "field": "y", "type": "string", "completion": "no-such-completion" }
                ]
              }]
            }"#,
        );
        let ids: HashSet<String> = r.check().iter().map(|d| d.id.to_string()).collect();
        for code in [
            codes::BAD_PATTERN,
            codes::EMPTY_MODES,
            codes::UNKNOWN_COMMAND_TYPE,
            codes::UNKNOWN_PROCEDURE,
            codes::UNKNOWN_TYPE,
            codes::EMPTY_CHOICE,
        ] {
            assert!(ids.contains(code), "missing {code} in {ids:?}");
        }
    }

    #[test]
    fn later_typedefs_shadow_builtins() {
        let r = registry(r#"{ "typedefs": [{ "name": "integer", "helpName": "number" }] }"#);
        assert_eq!(r.typedef("integer").unwrap().display_name(), "number");
    }
}
