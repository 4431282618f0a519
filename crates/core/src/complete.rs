//! Completion engine.
//!
//! Completion reuses the matcher: the completed words are matched as usual,
//! and every token or field the matcher reaches after they run out
//! contributes candidates for the partial word. Real candidates end in a
//! space so they can be inserted as typed; pseudo candidates (`<vlan>`,
//! `<cr>`) only describe what may follow and carry help text instead.

use crate::error::CommandError;
use crate::lexer::{self, is_prefix_of, strip_no};
use crate::matcher::{Leaf, MatchContext, MatchObserver, Matcher, match_name};
use crate::mode::eligible_commands;
use crate::registry::{CompletionCall, Registry};
use crate::scope::ScopeChain;
use crate::session::Session;
use crate::store::ObjectStore;
use sdnsh_grammar_tables::{ArgumentNode, CommandDescription, CommandName, FieldNode, NodeAttrs};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// What the caller wants back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionKind {
    /// Insertable tokens (tab completion).
    Tokens,
    /// A help listing of every candidate (`?`).
    Help,
}

/// Help attached to a candidate.
///
/// Specific help describes one variant of a command and replaces general
/// help for the same candidate; general help never replaces specific help.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "scope", content = "text", rename_all = "lowercase")]
pub enum HelpText {
    /// Help shared by every variant of a name.
    General(String),
    /// Help for this exact variant.
    Specific(String),
}

impl HelpText {
    /// The help text.
    pub fn text(&self) -> &str {
        match self {
            HelpText::General(text) | HelpText::Specific(text) => text,
        }
    }
}

/// One completion candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    /// Text to insert (real candidates end in a space) or to display.
    pub text: String,
    /// Help shown next to the candidate.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<HelpText>,
    /// Whether the candidate only describes the expected input.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub pseudo: bool,
}

/// Candidates collected for one partial line, deduplicated by text.
#[derive(Debug, Clone, Default)]
pub struct Candidates {
    entries: BTreeMap<String, Candidate>,
}

impl Candidates {
    /// Add an insertable candidate.
    pub fn add(&mut self, text: impl Into<String>, help: Option<HelpText>) {
        self.insert(Candidate {
            text: text.into(),
            help,
            pseudo: false,
        });
    }

    /// Add a descriptive candidate.
    pub fn add_pseudo(&mut self, text: impl Into<String>, help: Option<HelpText>) {
        self.insert(Candidate {
            text: text.into(),
            help,
            pseudo: true,
        });
    }

    fn insert(&mut self, candidate: Candidate) {
        match self.entries.get_mut(&candidate.text) {
            None => {
                self.entries.insert(candidate.text.clone(), candidate);
            }
            Some(existing) => {
                existing.help = merge_help(existing.help.take(), candidate.help);
                existing.pseudo &= candidate.pseudo;
            }
        }
    }

    /// Number of distinct candidates.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing was collected.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether a candidate with this exact text exists.
    pub fn contains(&self, text: &str) -> bool {
        self.entries.contains_key(text)
    }

    /// Candidates in display order: real candidates first, in natural
    /// order (`eth2` before `eth10`), then pseudo candidates, `<cr>` last.
    pub fn into_sorted(self) -> Vec<Candidate> {
        let mut all: Vec<Candidate> = self.entries.into_values().collect();
        all.sort_by(|a, b| {
            a.pseudo
                .cmp(&b.pseudo)
                .then_with(|| (a.text == CR).cmp(&(b.text == CR)))
                .then_with(|| natural_order(&a.text, &b.text))
        });
        all
    }
}

fn merge_help(old: Option<HelpText>, new: Option<HelpText>) -> Option<HelpText> {
    match (old, new) {
        (Some(HelpText::General(_)), Some(specific @ HelpText::Specific(_))) => Some(specific),
        (Some(old), _) => Some(old),
        (None, new) => new,
    }
}

/// Pseudo candidate offered where the line may end.
pub const CR: &str = "<cr>";

/// Compare by text, ordering a trailing number numerically.
pub fn natural_order(a: &str, b: &str) -> Ordering {
    fn split(s: &str) -> (&str, Option<u64>) {
        let s = s.trim_end();
        let stem = s.trim_end_matches(|c: char| c.is_ascii_digit());
        (stem, s[stem.len()..].parse().ok())
    }
    let (stem_a, num_a) = split(a);
    let (stem_b, num_b) = split(b);
    stem_a
        .cmp(stem_b)
        .then(num_a.cmp(&num_b))
        .then_with(|| a.cmp(b))
}

/// Result of a completion request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Completion {
    /// Insertable candidates, in display order.
    pub tokens: Vec<String>,
    /// Two-column help listing: always for [`CompletionKind::Help`], and
    /// for [`CompletionKind::Tokens`] when only pseudo candidates exist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    /// Every candidate, in display order.
    pub candidates: Vec<Candidate>,
}

/// Complete a partial line.
///
/// Results are cached per line and kind until the session next changes.
/// Only grammar defects are reported as errors; input that cannot be
/// completed just yields no candidates.
pub fn complete(
    session: &mut Session<'_>,
    line: &str,
    kind: CompletionKind,
) -> Result<Completion, CommandError> {
    if let Some((cached_line, cached_kind, cached)) = &session.completion_cache
        && cached_line == line
        && *cached_kind == kind
    {
        return Ok(cached.clone());
    }
    let (words, text) = lexer::split_for_completion(line);
    let candidates = collect(session, &words, &text)?;
    log::debug!("{line:?}: {} candidate(s)", candidates.len());
    let completion = finish(candidates, kind);
    session.completion_cache = Some((line.to_string(), kind, completion.clone()));
    Ok(completion)
}

fn collect(session: &Session<'_>, words: &[String], text: &str) -> Result<Candidates, CommandError> {
    let (is_no_command, words) = strip_no(words);
    let registry = session.registry;
    let mode = session.modes.current_mode();
    let eligible = eligible_commands(registry.commands(), mode, &session.features, is_no_command);

    let Some(first) = words.first() else {
        return Ok(command_words(&eligible, is_no_command, text));
    };

    let mut named = Vec::new();
    for command in eligible {
        if let Some(name) = match_name(registry, command, first)? {
            named.push((command, name));
        }
    }

    let mut collector = Collector {
        registry,
        store: session.store.as_ref(),
        mode,
        words,
        text,
        is_no_command,
        out: Candidates::default(),
    };
    let mut complete_commands: Vec<&CommandDescription> = Vec::new();
    {
        let ctx = MatchContext {
            store: session.store.as_ref(),
            modes: &session.modes,
            is_no_command,
        };
        let mut matcher = Matcher::new(registry, ctx, &mut collector);
        for (command, name) in named {
            if !matcher.match_command(command, name, words)?.is_empty() {
                complete_commands.push(command);
            }
        }
    }
    let mut out = collector.out;
    if text.is_empty() {
        for command in complete_commands {
            out.add_pseudo(CR, node_help(&command.attrs));
        }
    }
    Ok(out)
}

/// Candidates for the command word itself.
fn command_words(eligible: &[&CommandDescription], is_no_command: bool, text: &str) -> Candidates {
    let mut out = Candidates::default();
    if !is_no_command && is_prefix_of(text, "no") && eligible.iter().any(|c| c.no_supported) {
        out.add(
            "no ",
            Some(HelpText::General("Negate a command or set its defaults".into())),
        );
    }
    for command in eligible {
        let help = node_help(&command.attrs);
        match &command.name {
            CommandName::Literal(name) if is_prefix_of(text, name) => {
                out.add(format!("{name} "), help);
            }
            CommandName::Pattern(p) if text.is_empty() => out.add_pseudo(p.title.clone(), help),
            _ => {}
        }
    }
    out
}

fn node_help(attrs: &NodeAttrs) -> Option<HelpText> {
    attrs
        .short_help
        .clone()
        .map(HelpText::Specific)
        .or_else(|| attrs.all_help.clone().map(HelpText::General))
}

/// Help for a token, tag, or enumerated value: the nearest syntax help,
/// then general help, then one-line help.
fn scope_help(scope: &ScopeChain<'_>) -> Option<HelpText> {
    let specific = |text: &str| HelpText::Specific(text.to_string());
    scope
        .syntax_help()
        .map(specific)
        .or_else(|| scope.all_help().map(|text| HelpText::General(text.to_string())))
        .or_else(|| scope.short_help().map(specific))
}

fn finish(candidates: Candidates, kind: CompletionKind) -> Completion {
    let all = candidates.into_sorted();
    let tokens: Vec<String> = all
        .iter()
        .filter(|c| !c.pseudo)
        .map(|c| c.text.clone())
        .collect();
    let listing = (!all.is_empty()).then(|| help_listing(&all));
    let help = match kind {
        CompletionKind::Help => listing,
        CompletionKind::Tokens if tokens.is_empty() => listing,
        CompletionKind::Tokens => None,
    };
    Completion {
        tokens,
        help,
        candidates: all,
    }
}

/// Two columns: candidate, then its help.
pub fn help_listing(candidates: &[Candidate]) -> String {
    let width = candidates
        .iter()
        .map(|c| c.text.trim_end().chars().count())
        .max()
        .unwrap_or(0);
    candidates
        .iter()
        .map(|c| {
            let help = c.help.as_ref().map_or("", HelpText::text);
            format!("{:<width$}  {help}", c.text.trim_end())
                .trim_end()
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Collecting candidates from the matcher ──────────────────────────────────

struct Collector<'s, 'g> {
    registry: &'g Registry,
    store: &'s dyn ObjectStore,
    mode: &'s str,
    words: &'s [String],
    text: &'s str,
    is_no_command: bool,
    out: Candidates,
}

impl<'g> MatchObserver<'g> for Collector<'_, 'g> {
    fn words_exhausted(&mut self, leaf: Leaf<'_, 'g>) -> Result<(), CommandError> {
        match leaf.node {
            ArgumentNode::Token(token) => {
                if is_prefix_of(self.text, &token.token) {
                    self.out
                        .add(format!("{} ", token.token), scope_help(leaf.scope));
                }
                Ok(())
            }
            ArgumentNode::Field(field) => self.field(&leaf, field),
            ArgumentNode::Choice(_) | ArgumentNode::Sequence(_) => Ok(()),
        }
    }
}

impl<'g> Collector<'_, 'g> {
    fn field(&mut self, leaf: &Leaf<'_, 'g>, field: &'g FieldNode) -> Result<(), CommandError> {
        if let Some(tag) = &field.tag
            && !leaf.tag_parsed
        {
            if is_prefix_of(self.text, tag) {
                self.out.add(format!("{tag} "), scope_help(leaf.scope));
            }
            return Ok(());
        }

        let before = self.out.len();
        let help = scope_help(leaf.scope);
        for value in self.registry.enum_values(field)? {
            if is_prefix_of(self.text, value.key()) {
                self.out.add(format!("{} ", value.key()), help.clone());
            }
        }

        if let Some(proc) = leaf.scope.completion() {
            let completer = self.registry.completer(proc.name())?;
            let call = CompletionCall {
                words: self.words,
                text: self.text,
                values: leaf.values,
                is_no_command: self.is_no_command,
                field: Some(field.field.as_str()),
                obj_type: leaf.scope.obj_type(),
                mode: self.mode,
                params: proc.params(),
                store: self.store,
            };
            match completer.complete(&call, &mut self.out) {
                Ok(()) => {}
                Err(e) if e.is_description() => return Err(e),
                Err(e) => log::debug!("completion {proc} for {} failed: {e}", field.field),
            }
        }

        if self.text.is_empty() && self.out.len() == before {
            self.out
                .add_pseudo(self.pseudo_text(field), self.pseudo_help(field));
        }
        Ok(())
    }

    fn pseudo_text(&self, field: &FieldNode) -> String {
        if let Some(text) = &field.attrs.completion_text {
            return text.clone();
        }
        let name = field
            .attrs
            .help_name
            .as_deref()
            .or(field.tag.as_deref())
            .unwrap_or(&field.field);
        format!("<{name}>")
    }

    fn pseudo_help(&self, field: &FieldNode) -> Option<HelpText> {
        let attrs = &field.attrs;
        if let Some(text) = attrs.syntax_help.as_ref().or(attrs.short_help.as_ref()) {
            return Some(HelpText::Specific(text.clone()));
        }
        self.registry
            .typedef(&field.type_name)
            .ok()
            .map(|t| HelpText::General(t.display_name().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn specific_help_replaces_general_but_not_the_reverse() {
        let mut c = Candidates::default();
        c.add("show ", Some(HelpText::General("Show things".into())));
        c.add("show ", Some(HelpText::Specific("Show switches".into())));
        c.add("show ", Some(HelpText::General("Other".into())));
        let all = c.into_sorted();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].help, Some(HelpText::Specific("Show switches".into())));
    }

    #[test]
    fn real_candidate_wins_over_pseudo_with_same_text() {
        let mut c = Candidates::default();
        c.add_pseudo("x", None);
        c.add("x", None);
        assert!(!c.into_sorted()[0].pseudo);
    }

    #[test]
    fn natural_ordering_and_cr_last() {
        let mut c = Candidates::default();
        for t in ["eth10 ", "eth2 ", "alpha "] {
            c.add(t, None);
        }
        c.add_pseudo(CR, None);
        c.add_pseudo("<name>", None);
        let texts: Vec<_> = c.into_sorted().into_iter().map(|c| c.text).collect();
        assert_eq!(texts, ["alpha ", "eth2 ", "eth10 ", "<name>", "<cr>"]);
    }

    #[test]
    fn listing_aligns_help() {
        let listing = help_listing(&[
            Candidate {
                text: "show ".into(),
                help: Some(HelpText::Specific("Show things".into())),
                pseudo: false,
            },
            Candidate {
                text: CR.into(),
                help: None,
                pseudo: true,
            },
            Candidate {
                text: "interface ".into(),
                help: Some(HelpText::General("Interfaces".into())),
                pseudo: false,
            },
        ]);
        assert_eq!(listing, "show       Show things\n<cr>\ninterface  Interfaces");
    }

    #[test]
    fn tokens_kind_falls_back_to_help_when_only_pseudo() {
        let mut c = Candidates::default();
        c.add_pseudo("<vlan>", Some(HelpText::General("integer".into())));
        let done = finish(c, CompletionKind::Tokens);
        assert!(done.tokens.is_empty());
        assert_eq!(done.help.as_deref(), Some("<vlan>  integer"));

        let mut c = Candidates::default();
        c.add("switch ", None);
        let done = finish(c, CompletionKind::Tokens);
        assert_eq!(done.tokens, ["switch "]);
        assert!(done.help.is_none());
        assert!(finish(Candidates::default(), CompletionKind::Help).help.is_none());
    }
}
