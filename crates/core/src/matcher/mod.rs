//! Argument matcher.
//!
//! Walks a command's argument tree against the words of a line and returns
//! every way the words can be consumed. Each alternative reading is a
//! [`Branch`]: how many words it consumed, which words were abbreviations
//! of longer tokens, the collected field values, and the actions bound
//! along the way. Failed readings leave a [`ParseError`] behind; when no
//! branch completes, the resolver turns the best of them into the error
//! the operator sees.

/// Typedef validation.
pub mod validate;

use crate::error::CommandError;
use crate::lexer::is_prefix_of;
use crate::mode::ModeStack;
use crate::registry::{DataHandlerCall, Registry};
use crate::scope::ScopeChain;
use crate::store::ObjectStore;
use sdnsh_grammar_tables::{
    ArgumentNode, ChoiceNode, CommandDescription, CommandName, FieldNode, FieldValues, NodeAttrs,
    ProcRef, TokenNode,
};
use serde_json::Value;
use validate::{ValidationEnv, validate_field};

// ── Match results ───────────────────────────────────────────────────────────

/// A word that abbreviated a longer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMatch {
    /// Index of the word in the line (the command word is 0).
    pub word_index: usize,
    /// The full token the word stands for.
    pub token: String,
}

/// An action procedure together with the scope it was bound in.
#[derive(Debug, Clone)]
pub struct BoundAction<'g> {
    /// The procedure reference.
    pub proc: &'g ProcRef,
    /// Scope at the node that bound the action.
    pub scope: ScopeChain<'g>,
}

/// One way of consuming words.
#[derive(Debug, Clone)]
pub struct Branch<'g> {
    /// Words consumed, counted from where matching of the node started.
    pub consumed: usize,
    /// Abbreviated words, in line order.
    pub prefix_matches: Vec<PrefixMatch>,
    /// Scope in effect after the node.
    pub scope: ScopeChain<'g>,
    /// Collected field values.
    pub values: FieldValues,
    /// Actions to run if this branch is selected.
    pub actions: Vec<BoundAction<'g>>,
}

/// Rank of a failed reading. At the same word, a higher priority error is
/// the better explanation of what went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorPriority {
    /// Words were left over after a complete reading.
    UnexpectedArguments = 10,
    /// A word matched no keyword.
    UnexpectedToken = 20,
    /// The words ran out.
    UnexpectedEnd = 30,
    /// A value failed type validation.
    Validation = 40,
}

/// Why one reading failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    /// Word the reading failed at.
    pub word_index: usize,
    /// Rank among errors at the same word.
    pub priority: ErrorPriority,
    /// Human-readable message.
    pub message: String,
    /// Tokens that would have been accepted at `word_index`.
    pub expected: Vec<String>,
}

/// How the command word matched a command's name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch {
    /// The word is the whole name (case-insensitively).
    Exact,
    /// The word abbreviates the name, or matched a name pattern.
    Prefix,
}

/// Match the command word against a command's name.
pub fn match_name(
    registry: &Registry,
    command: &CommandDescription,
    word: &str,
) -> Result<Option<NameMatch>, CommandError> {
    Ok(match &command.name {
        CommandName::Literal(name) if name.eq_ignore_ascii_case(word) => Some(NameMatch::Exact),
        CommandName::Literal(name) if is_prefix_of(word, name) => Some(NameMatch::Prefix),
        CommandName::Literal(_) => None,
        CommandName::Pattern(p) => registry
            .full_match(&p.pattern, word)
            .map_err(|e| e.in_command(&p.title))?
            .then_some(NameMatch::Prefix),
    })
}

// ── Observation ─────────────────────────────────────────────────────────────

/// A leaf node reached with no words left.
pub struct Leaf<'a, 'g> {
    /// Command being matched.
    pub command: &'g CommandDescription,
    /// The token or field node.
    pub node: &'g ArgumentNode,
    /// Scope at the node.
    pub scope: &'a ScopeChain<'g>,
    /// Values collected so far.
    pub values: &'a FieldValues,
    /// For a tagged field: whether its tag was already typed.
    pub tag_parsed: bool,
}

/// Hook told about every leaf the matcher reaches after the words ran out.
/// The completion engine collects its candidates this way.
pub trait MatchObserver<'g> {
    /// Called once per leaf reached with no words left.
    fn words_exhausted(&mut self, leaf: Leaf<'_, 'g>) -> Result<(), CommandError>;
}

/// Observer that ignores everything.
#[derive(Debug, Default)]
pub struct NoObserver;

impl MatchObserver<'_> for NoObserver {
    fn words_exhausted(&mut self, _leaf: Leaf<'_, '_>) -> Result<(), CommandError> {
        Ok(())
    }
}

/// Session state the matcher reads.
#[derive(Clone, Copy)]
pub struct MatchContext<'a> {
    /// Object store, for validations that check existence.
    pub store: &'a dyn ObjectStore,
    /// Mode stack, for data handlers.
    pub modes: &'a ModeStack,
    /// Whether the line started with `no`.
    pub is_no_command: bool,
}

// ── Matcher ─────────────────────────────────────────────────────────────────

/// Matches words against command descriptions, collecting errors from
/// failed readings across every command it is given.
pub struct Matcher<'a, 'g> {
    registry: &'g Registry,
    ctx: MatchContext<'a>,
    observer: &'a mut dyn MatchObserver<'g>,
    errors: Vec<ParseError>,
}

impl<'a, 'g> Matcher<'a, 'g> {
    /// A matcher reporting exhausted leaves to `observer`.
    pub fn new(
        registry: &'g Registry,
        ctx: MatchContext<'a>,
        observer: &'a mut dyn MatchObserver<'g>,
    ) -> Self {
        Self {
            registry,
            ctx,
            observer,
            errors: Vec::new(),
        }
    }

    /// Errors left by failed readings so far.
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Consume the matcher, keeping its errors.
    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    /// Every complete reading of `words` (command word included) as
    /// `command`. The command word must already have matched `name`.
    pub fn match_command(
        &mut self,
        command: &'g CommandDescription,
        name: NameMatch,
        words: &[String],
    ) -> Result<Vec<Branch<'g>>, CommandError> {
        let Some(word) = words.first() else {
            return Ok(Vec::new());
        };
        let mut values = command.data.clone();
        let mut prefix_matches = Vec::new();
        match &command.name {
            CommandName::Literal(literal) => {
                if name == NameMatch::Prefix {
                    prefix_matches.push(PrefixMatch {
                        word_index: 0,
                        token: literal.to_lowercase(),
                    });
                }
            }
            CommandName::Pattern(p) => {
                prefix_matches.push(PrefixMatch {
                    word_index: 0,
                    token: p.title.clone(),
                });
                if let Some(field) = &p.field {
                    values.insert(field.clone(), Value::String(word.clone()));
                }
            }
        }

        let (scope, actions) = self
            .enter(&command.attrs, &ScopeChain::new(), &[])
            .map_err(|e| e.in_command(command.title()))?;
        let start = Branch {
            consumed: 0,
            prefix_matches,
            scope,
            values,
            actions,
        };

        let branches = self
            .match_seq(command, &command.args, words, 1, start)
            .map_err(|e| e.in_command(command.title()))?;
        let mut complete = Vec::new();
        for branch in branches {
            let end = 1 + branch.consumed;
            match words.get(end) {
                None => complete.push(branch),
                Some(extra) => self.error(
                    end,
                    ErrorPriority::UnexpectedArguments,
                    format!("Unexpected additional arguments at \"{extra}\""),
                    Vec::new(),
                ),
            }
        }
        log::trace!(
            "{}: {} complete branch(es) for {} word(s)",
            command.title(),
            complete.len(),
            words.len()
        );
        Ok(complete)
    }

    /// Push a node's attributes and rebind actions if the node sets an
    /// action or a command type.
    fn enter(
        &self,
        attrs: &'g NodeAttrs,
        scope: &ScopeChain<'g>,
        actions: &[BoundAction<'g>],
    ) -> Result<(ScopeChain<'g>, Vec<BoundAction<'g>>), CommandError> {
        let mut scope = scope.push(attrs);
        let mut rebind = attrs.action.is_some() || attrs.no_action.is_some();
        if let Some(name) = &attrs.command_type {
            scope = scope.with_defaults(&self.registry.command_type(name)?.attrs);
            rebind = true;
        }
        if !rebind {
            return Ok((scope, actions.to_vec()));
        }
        let bound = scope
            .action(self.ctx.is_no_command)
            .map(|list| {
                list.procs()
                    .iter()
                    .map(|proc| BoundAction {
                        proc,
                        scope: scope.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok((scope, bound))
    }

    fn error(
        &mut self,
        word_index: usize,
        priority: ErrorPriority,
        message: String,
        expected: Vec<String>,
    ) {
        self.errors.push(ParseError {
            word_index,
            priority,
            message,
            expected,
        });
    }

    /// Match `nodes` in order. Each element sees the scope of the
    /// sequence, not of the element before it.
    fn match_seq(
        &mut self,
        command: &'g CommandDescription,
        nodes: &'g [ArgumentNode],
        words: &[String],
        start: usize,
        arg: Branch<'g>,
    ) -> Result<Vec<Branch<'g>>, CommandError> {
        let Some((first, rest)) = nodes.split_first() else {
            return Ok(vec![arg]);
        };
        let outer_scope = arg.scope.clone();
        let mut out = Vec::new();
        for head in self.match_node(command, first, words, start, arg)? {
            let used = head.consumed;
            let tail_start = Branch {
                consumed: 0,
                scope: outer_scope.clone(),
                ..head
            };
            for tail in self.match_seq(command, rest, words, start + used, tail_start)? {
                out.push(Branch {
                    consumed: used + tail.consumed,
                    ..tail
                });
            }
        }
        Ok(out)
    }

    fn match_node(
        &mut self,
        command: &'g CommandDescription,
        node: &'g ArgumentNode,
        words: &[String],
        start: usize,
        arg: Branch<'g>,
    ) -> Result<Vec<Branch<'g>>, CommandError> {
        let (scope, actions) = self.enter(node.attrs(), &arg.scope, &arg.actions)?;
        let inner = Branch {
            consumed: 0,
            prefix_matches: arg.prefix_matches.clone(),
            scope,
            values: arg.values.clone(),
            actions,
        };
        let (mut branches, satisfied_by_empty) = match node {
            ArgumentNode::Token(token) => {
                (self.match_token(command, node, token, words, start, inner)?, false)
            }
            ArgumentNode::Field(field) => {
                (self.match_field(command, node, field, words, start, inner)?, false)
            }
            ArgumentNode::Choice(choice) => self.match_choice(command, choice, words, start, inner)?,
            ArgumentNode::Sequence(seq) => {
                (self.match_seq(command, &seq.args, words, start, inner)?, false)
            }
        };

        let optional = node.optionality().is_optional(self.ctx.is_no_command);
        // A node that already matched without consuming (a defaulted field,
        // an all-optional sequence) needs no separate skip reading.
        if (optional || satisfied_by_empty) && !branches.iter().any(|b| b.consumed == 0) {
            branches.push(arg);
        }
        Ok(branches)
    }

    fn match_token(
        &mut self,
        command: &'g CommandDescription,
        node: &'g ArgumentNode,
        token: &'g TokenNode,
        words: &[String],
        start: usize,
        mut arg: Branch<'g>,
    ) -> Result<Vec<Branch<'g>>, CommandError> {
        let Some(word) = words.get(start) else {
            self.observer.words_exhausted(Leaf {
                command,
                node,
                scope: &arg.scope,
                values: &arg.values,
                tag_parsed: false,
            })?;
            self.error(
                start,
                ErrorPriority::UnexpectedEnd,
                "Unexpected end of command".into(),
                Vec::new(),
            );
            return Ok(Vec::new());
        };
        if !is_prefix_of(word, &token.token) {
            self.error(
                start,
                ErrorPriority::UnexpectedToken,
                format!("Unexpected argument \"{word}\""),
                vec![token.token.clone()],
            );
            return Ok(Vec::new());
        }
        arg.values
            .extend(token.data.iter().map(|(k, v)| (k.clone(), v.clone())));
        if let Some(field) = &token.field {
            arg.values
                .insert(field.clone(), Value::String(token.token.clone()));
        }
        if word.len() < token.token.len() {
            arg.prefix_matches.push(PrefixMatch {
                word_index: start,
                token: token.token.to_lowercase(),
            });
        }
        arg.consumed = 1;
        Ok(vec![arg])
    }

    fn match_field(
        &mut self,
        command: &'g CommandDescription,
        node: &'g ArgumentNode,
        field: &'g FieldNode,
        words: &[String],
        start: usize,
        arg: Branch<'g>,
    ) -> Result<Vec<Branch<'g>>, CommandError> {
        let mut used = 0;
        let mut prefix_matches = arg.prefix_matches.clone();
        let mut tag_parsed = false;

        if let Some(tag) = &field.tag
            && let Some(word) = words.get(start)
        {
            if !is_prefix_of(word, tag) {
                self.error(
                    start,
                    ErrorPriority::UnexpectedToken,
                    format!("Unexpected argument \"{word}\""),
                    vec![tag.clone()],
                );
                return Ok(Vec::new());
            }
            if word.len() < tag.len() {
                prefix_matches.push(PrefixMatch {
                    word_index: start,
                    token: tag.to_lowercase(),
                });
            }
            used = 1;
            tag_parsed = true;
        }

        let word_index = start + used;
        let (input, from_words) = match words.get(word_index) {
            Some(word) => (word.as_str(), true),
            None => {
                self.observer.words_exhausted(Leaf {
                    command,
                    node,
                    scope: &arg.scope,
                    values: &arg.values,
                    tag_parsed,
                })?;
                match field.default_value(self.ctx.is_no_command) {
                    Some(default) => (default, false),
                    None => {
                        self.error(
                            word_index,
                            ErrorPriority::UnexpectedEnd,
                            "Unexpected end of command".into(),
                            Vec::new(),
                        );
                        return Ok(Vec::new());
                    }
                }
            }
        };

        let env = ValidationEnv {
            store: self.ctx.store,
            obj_type: arg.scope.obj_type(),
        };
        let found = match validate_field(self.registry, env, field, arg.scope.help_name(), input)? {
            Ok(found) => found,
            Err(e) => {
                let priority = if e.expected.is_empty() {
                    ErrorPriority::Validation
                } else {
                    ErrorPriority::UnexpectedToken
                };
                self.error(word_index, priority, e.message, e.expected);
                return Ok(Vec::new());
            }
        };
        if from_words {
            used += 1;
        }

        let handler = match arg.scope.data_handler() {
            Some(proc) => Some((proc, self.registry.data_handler(proc.name())?)),
            None => None,
        };
        let mut out = Vec::new();
        for (value, token) in found {
            let mut values = arg.values.clone();
            values.extend(field.data.iter().map(|(k, v)| (k.clone(), v.clone())));
            match handler {
                Some((proc, handler)) => {
                    let call = DataHandlerCall {
                        field: &field.field,
                        value: &value,
                        is_no_command: self.ctx.is_no_command,
                        obj_type: arg.scope.obj_type(),
                        mode_object: self.ctx.modes.current_object(),
                        params: proc.params(),
                        scope: &arg.scope,
                    };
                    if let Err(e) = handler.handle(&call, &mut values) {
                        self.error(word_index, ErrorPriority::Validation, e.message, e.expected);
                        continue;
                    }
                }
                None => {
                    values.insert(field.field.clone(), value);
                }
            }
            let mut prefix_matches = prefix_matches.clone();
            if from_words && token.len() > input.len() {
                prefix_matches.push(PrefixMatch { word_index, token });
            }
            out.push(Branch {
                consumed: used,
                prefix_matches,
                scope: arg.scope.clone(),
                values,
                actions: arg.actions.clone(),
            });
        }
        Ok(out)
    }

    /// Match each alternative. An alternative that matches without
    /// consuming or collecting anything makes the whole choice optional;
    /// its empty branches are folded into the single skip branch the
    /// caller adds.
    fn match_choice(
        &mut self,
        command: &'g CommandDescription,
        choice: &'g ChoiceNode,
        words: &[String],
        start: usize,
        arg: Branch<'g>,
    ) -> Result<(Vec<Branch<'g>>, bool), CommandError> {
        let mut out = Vec::new();
        let mut satisfied_by_empty = false;
        for alternative in &choice.choices {
            for branch in self.match_node(command, alternative, words, start, arg.clone())? {
                if branch.consumed == 0 && branch.values == arg.values {
                    satisfied_by_empty = true;
                } else {
                    out.push(branch);
                }
            }
        }
        Ok((out, satisfied_by_empty))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    const GRAMMAR: &str = r#"{
      "commands": [
        {
          "name": "interface",
          "modes": ["config*"],
          "action": "write-fields",
          "args": [
            { "kind": "field", "field": "name", "type": "string", "optional": true },
            { "kind": "field", "field": "mtu", "type": "integer", "tag": "mtu", "optional": true }
          ]
        },
        {
          "name": "speed",
          "modes": ["config*"],
          "action": "write-fields",
          "args": [{ "kind": "choice", "choices": [
            { "kind": "token", "token": "auto", "field": "speed" },
            { "kind": "field", "field": "speed", "type": "integer", "range": [[10, 100000]] },
            { "kind": "token", "token": "automatic", "field": "mode" }
          ]}]
        },
        {
          "name": "description",
          "modes": ["config*"],
          "action": "write-fields",
          "noAction": "reset-fields",
          "args": [{ "kind": "field", "field": "text", "type": "string", "optionalForNo": true }]
        },
        {
          "name": "mtu",
          "modes": ["config*"],
          "action": "write-fields",
          "args": [{ "kind": "field", "field": "mtu", "type": "integer", "default": "1500", "optional": true }]
        }
      ]
    }"#;

    fn registry() -> Registry {
        let mut r = Registry::with_builtins().unwrap();
        r.load_jsonc(GRAMMAR).unwrap();
        r
    }

    fn words(line: &str) -> Vec<String> {
        line.split_whitespace().map(String::from).collect()
    }

    fn run<'g>(
        r: &'g Registry,
        title: &str,
        line: &str,
        is_no: bool,
    ) -> (Vec<Branch<'g>>, Vec<ParseError>) {
        let store = MemoryStore::new();
        let modes = ModeStack::starting_in("config");
        let ctx = MatchContext {
            store: &store,
            modes: &modes,
            is_no_command: is_no,
        };
        let mut observer = NoObserver;
        let mut matcher = Matcher::new(r, ctx, &mut observer);
        let command = r.commands().iter().find(|c| c.title() == title).unwrap();
        let words = words(line);
        let name = match_name(r, command, &words[0]).unwrap().unwrap();
        let branches = matcher.match_command(command, name, &words).unwrap();
        (branches, matcher.into_errors())
    }

    #[test]
    fn all_optional_command_completes_with_no_arguments() {
        let r = registry();
        let (branches, _) = run(&r, "interface", "interface", false);
        assert!(!branches.is_empty());
        assert!(branches.iter().all(|b| b.consumed == 0));
    }

    #[test]
    fn tagged_field_consumes_tag_and_value() {
        let r = registry();
        let (branches, _) = run(&r, "interface", "int eth1 mt 9000", false);
        assert_eq!(branches.len(), 1);
        let b = &branches[0];
        assert_eq!(b.consumed, 3);
        assert_eq!(b.values["name"], "eth1");
        assert_eq!(b.values["mtu"], json!(9000));
        let prefixes: Vec<_> = b.prefix_matches.iter().map(|p| (p.word_index, p.token.as_str())).collect();
        assert_eq!(prefixes, [(0, "interface"), (2, "mtu")]);
    }

    #[test]
    fn one_branch_per_matching_alternative() {
        let r = registry();
        let (branches, _) = run(&r, "speed", "speed auto", false);
        assert_eq!(branches.len(), 2);
        let (branches, _) = run(&r, "speed", "speed 100", false);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].values["speed"], json!(100));
    }

    #[test]
    fn failed_alternatives_leave_errors() {
        let r = registry();
        let (branches, errors) = run(&r, "speed", "speed fast", false);
        assert!(branches.is_empty());
        let tokens: Vec<_> = errors
            .iter()
            .filter(|e| e.priority == ErrorPriority::UnexpectedToken)
            .flat_map(|e| e.expected.clone())
            .collect();
        assert_eq!(tokens, ["auto", "automatic"]);
        assert!(errors.iter().any(|e| e.priority == ErrorPriority::Validation && e.word_index == 1));
    }

    #[test]
    fn leftover_words_are_reported() {
        let r = registry();
        let (branches, errors) = run(&r, "speed", "speed 100 extra", false);
        assert!(branches.is_empty());
        assert!(errors.iter().any(|e| e.priority == ErrorPriority::UnexpectedArguments
            && e.word_index == 2
            && e.message == "Unexpected additional arguments at \"extra\""));
    }

    #[test]
    fn missing_argument_is_unexpected_end() {
        let r = registry();
        let (branches, errors) = run(&r, "description", "description", false);
        assert!(branches.is_empty());
        assert_eq!(errors[0].priority, ErrorPriority::UnexpectedEnd);
        assert_eq!(errors[0].word_index, 1);
    }

    #[test]
    fn optional_for_no_and_no_action() {
        let r = registry();
        let (branches, _) = run(&r, "description", "description", true);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].actions[0].proc.name(), "reset-fields");
    }

    #[test]
    fn defaults_fill_exhausted_fields() {
        let r = registry();
        let (branches, _) = run(&r, "mtu", "mtu", false);
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].values["mtu"], json!(1500));
    }
}
