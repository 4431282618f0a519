//! Declarative command grammar tables.
//!
//! Commands are not hand-coded: each one is a [`CommandDescription`] holding
//! a tree of [`ArgumentNode`]s plus references to named procedures. These
//! types are the serialization form of that grammar (camelCase JSON, with
//! JSONC comments and trailing commas accepted by [`GrammarTables::from_jsonc`])
//! and are consumed read-only by the engine in `sdnsh_core`.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

/// Current format version of the grammar file schema.
pub const TABLE_FORMAT_VERSION: &str = "0.1.0";

/// Field values collected while matching a command, keyed by field name.
pub type FieldValues = BTreeMap<String, serde_json::Value>;

fn default_format_version() -> String {
    TABLE_FORMAT_VERSION.to_string()
}

fn default_true() -> bool {
    true
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }
    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(s) => vec![s],
        OneOrMany::Many(v) => v,
    })
}

// ── Top-level container ─────────────────────────────────────────────────

/// One grammar file: typedefs, command-type bundles, and commands.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrammarTables {
    /// Schema version of the file.
    #[serde(default = "default_format_version")]
    pub format_version: String,
    /// Reusable, inheritable value types.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub typedefs: Vec<TypeDef>,
    /// Named bundles of default actions and attributes.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_types: Vec<CommandType>,
    /// Command descriptions, in registration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<CommandDescription>,

    /// Cached typedef name → index (lazily initialized).
    #[serde(skip)]
    typedef_map: OnceLock<HashMap<String, usize>>,
    /// Cached command-type name → index (lazily initialized).
    #[serde(skip)]
    command_type_map: OnceLock<HashMap<String, usize>>,
}

impl GrammarTables {
    /// Build tables from their parts.
    pub fn new(
        typedefs: Vec<TypeDef>,
        command_types: Vec<CommandType>,
        commands: Vec<CommandDescription>,
    ) -> Self {
        Self {
            typedefs,
            command_types,
            commands,
            ..Self::default()
        }
    }

    /// Parse a grammar file written as JSON or JSONC.
    pub fn from_jsonc(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&sdnsh_jsonc_strip::strip_jsonc(text))
    }

    /// Append every typedef, command type, and command of `other`.
    ///
    /// Later typedefs and command types shadow earlier ones of the same name.
    pub fn extend(&mut self, other: GrammarTables) {
        self.typedefs.extend(other.typedefs);
        self.command_types.extend(other.command_types);
        self.commands.extend(other.commands);
        self.typedef_map = OnceLock::new();
        self.command_type_map = OnceLock::new();
    }

    /// Look up a typedef by exact name.
    pub fn typedef(&self, name: &str) -> Option<&TypeDef> {
        let map = self
            .typedef_map
            .get_or_init(|| index_by_name(self.typedefs.iter().map(|t| t.name.as_str())));
        map.get(name).map(|&i| &self.typedefs[i])
    }

    /// Look up a command type by exact name.
    pub fn command_type(&self, name: &str) -> Option<&CommandType> {
        let map = self
            .command_type_map
            .get_or_init(|| index_by_name(self.command_types.iter().map(|t| t.name.as_str())));
        map.get(name).map(|&i| &self.command_types[i])
    }
}

fn index_by_name<'a>(names: impl Iterator<Item = &'a str>) -> HashMap<String, usize> {
    // Later entries win, so a grammar loaded after the builtins can refine
    // a standard typedef.
    names
        .enumerate()
        .map(|(i, name)| (name.to_string(), i))
        .collect()
}

// ── Procedure references ────────────────────────────────────────────────

/// Reference to a registered procedure, optionally with static parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcRef {
    /// Bare procedure name.
    Name(String),
    /// Procedure name plus static JSON parameters.
    Call {
        /// Registered procedure name.
        proc: String,
        /// Parameters handed to the procedure in its call structure.
        #[serde(default)]
        params: BTreeMap<String, serde_json::Value>,
    },
}

impl ProcRef {
    /// Name of the referenced procedure.
    pub fn name(&self) -> &str {
        match self {
            ProcRef::Name(name) | ProcRef::Call { proc: name, .. } => name,
        }
    }

    /// Static parameters (empty for a bare name).
    pub fn params(&self) -> &BTreeMap<String, serde_json::Value> {
        static EMPTY: BTreeMap<String, serde_json::Value> = BTreeMap::new();
        match self {
            ProcRef::Name(_) => &EMPTY,
            ProcRef::Call { params, .. } => params,
        }
    }
}

impl std::fmt::Display for ProcRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One procedure or an ordered list run in sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ProcList {
    /// A single procedure.
    One(ProcRef),
    /// Several procedures sharing the same bound scope.
    Many(Vec<ProcRef>),
}

impl ProcList {
    /// The procedures in invocation order.
    pub fn procs(&self) -> &[ProcRef] {
        match self {
            ProcList::One(p) => std::slice::from_ref(p),
            ProcList::Many(list) => list,
        }
    }
}

// ── Inheritable node attributes ─────────────────────────────────────────

/// Attributes any command, command type, or argument node may carry.
///
/// They are resolved through the scope chain, nearest node first, so a
/// nested node inherits what it does not set itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeAttrs {
    /// Command type whose defaults apply to this subtree.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_type: Option<String>,
    /// Action run when the command is executed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<ProcList>,
    /// Action run for the `no` form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub no_action: Option<ProcList>,
    /// Completion procedure offering candidates for a field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion: Option<ProcRef>,
    /// Procedure storing a matched field value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_handler: Option<ProcRef>,
    /// Object type the command operates on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub obj_type: Option<String>,
    /// One-line help.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub short_help: Option<String>,
    /// General help shared by every variant of a command name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all_help: Option<String>,
    /// Help shown next to a pseudo candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub syntax_help: Option<String>,
    /// Text of the pseudo candidate (`<name>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_text: Option<String>,
    /// Name used in help and validation errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_name: Option<String>,
    /// Action run when a submode entered by this command is exited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub on_exit: Option<ProcRef>,
}

/// Optionality flags shared by every argument node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Optionality {
    /// The node may be skipped.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
    /// Overrides `optional` for `no` commands.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_for_no: Option<bool>,
}

impl Optionality {
    /// Whether the node may be skipped in this form of the command.
    pub fn is_optional(&self, is_no_command: bool) -> bool {
        if is_no_command {
            self.optional_for_no.unwrap_or(self.optional)
        } else {
            self.optional
        }
    }
}

// ── Type constraints ────────────────────────────────────────────────────

/// Enumerated value, optionally mapped to a different stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    /// The token is stored as typed.
    Simple(String),
    /// The token is stored as `stored`.
    Mapped {
        /// Keyword the operator types.
        value: String,
        /// Value stored in the field.
        stored: serde_json::Value,
    },
}

impl EnumValue {
    /// The keyword the operator types.
    pub fn key(&self) -> &str {
        match self {
            EnumValue::Simple(v) | EnumValue::Mapped { value: v, .. } => v,
        }
    }

    /// The value stored when this keyword matches.
    pub fn stored(&self) -> serde_json::Value {
        match self {
            EnumValue::Simple(v) => serde_json::Value::String(v.clone()),
            EnumValue::Mapped { stored, .. } => stored.clone(),
        }
    }
}

/// `min` / `max` placeholder in a range bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenBound {
    /// No lower limit.
    Min,
    /// No upper limit.
    Max,
}

/// One end of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Bound {
    /// Inclusive limit.
    Value(i64),
    /// Unbounded end.
    Open(OpenBound),
}

/// An accepted integer (or length) range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeSpec {
    /// Exactly this value.
    Exact(i64),
    /// Inclusive `[low, high]`.
    Span([Bound; 2]),
}

impl RangeSpec {
    /// Whether `n` lies in the range.
    pub fn contains(&self, n: i64) -> bool {
        match self {
            RangeSpec::Exact(v) => n == *v,
            RangeSpec::Span([low, high]) => {
                let above = match low {
                    Bound::Value(v) => n >= *v,
                    Bound::Open(_) => true,
                };
                let below = match high {
                    Bound::Value(v) => n <= *v,
                    Bound::Open(_) => true,
                };
                above && below
            }
        }
    }
}

impl std::fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn bound(b: &Bound) -> String {
            match b {
                Bound::Value(v) => v.to_string(),
                Bound::Open(OpenBound::Min) => "min".into(),
                Bound::Open(OpenBound::Max) => "max".into(),
            }
        }
        match self {
            RangeSpec::Exact(v) => write!(f, "{v}"),
            RangeSpec::Span([low, high]) => write!(f, "{}..{}", bound(low), bound(high)),
        }
    }
}

/// Inline constraints a typedef (or a field refining its type) may carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeConstraints {
    /// Enumerated keywords.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<EnumValue>,
    /// Regular expressions; a value must match at least one.
    #[serde(
        default,
        skip_serializing_if = "Vec::is_empty",
        deserialize_with = "one_or_many"
    )]
    pub pattern: Vec<String>,
    /// Accepted string lengths.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub length: Vec<RangeSpec>,
    /// Accepted integer ranges.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub range: Vec<RangeSpec>,
}

impl TypeConstraints {
    /// True when no constraint is set.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
            && self.pattern.is_empty()
            && self.length.is_empty()
            && self.range.is_empty()
    }
}

// ── Type definitions ────────────────────────────────────────────────────

/// A reusable value type with an optional single base type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDef {
    /// Registered name.
    pub name: String,
    /// Parent type whose validation also applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_type: Option<String>,
    /// Validation procedure (inherited from the base chain when absent).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ProcRef>,
    /// Name shown in help and errors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help_name: Option<String>,
    /// Inline constraints.
    #[serde(flatten)]
    pub constraints: TypeConstraints,
    /// Error message template with `{typedef}`, `{value}`, `{detail}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_error_format: Option<String>,
}

impl TypeDef {
    /// An unnamed type deriving from `base`, used for fields that refine
    /// their type inline.
    pub fn derived(
        name: impl Into<String>,
        base: impl Into<String>,
        constraints: TypeConstraints,
        validation: Option<ProcRef>,
    ) -> Self {
        Self {
            name: name.into(),
            base_type: Some(base.into()),
            validation,
            constraints,
            ..Self::default()
        }
    }

    /// Name used in messages: `helpName`, falling back to `name`.
    pub fn display_name(&self) -> &str {
        self.help_name.as_deref().unwrap_or(&self.name)
    }
}

/// Named bundle of default attributes (chiefly actions) for a class of
/// commands, e.g. `config-submode`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandType {
    /// Registered name.
    pub name: String,
    /// Defaults placed at the bottom of the scope chain.
    #[serde(flatten)]
    pub attrs: NodeAttrs,
}

// ── Commands ────────────────────────────────────────────────────────────

/// Regular-expression command name with a display title.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamePattern {
    /// Regular expression matched against the whole command word.
    pub pattern: String,
    /// Title shown in help and ambiguity messages.
    pub title: String,
    /// Field receiving the matched word.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

/// Name of a command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CommandName {
    /// Keyword matched by case-insensitive prefix.
    Literal(String),
    /// Word matched by regular expression.
    Pattern(NamePattern),
}

impl CommandName {
    /// The literal name, or the pattern's title.
    pub fn title(&self) -> &str {
        match self {
            CommandName::Literal(name) => name,
            CommandName::Pattern(p) => &p.title,
        }
    }
}

impl std::fmt::Display for CommandName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// A command: its name, where it applies, and its argument grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDescription {
    /// Command word.
    pub name: CommandName,
    /// Modes in which the command is valid; `config*` covers `config` and
    /// every mode below it.
    pub modes: Vec<String>,
    /// Feature gates that must all be enabled.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub feature: Vec<String>,
    /// Whether a `no` form exists.
    #[serde(default = "default_true")]
    pub no_supported: bool,
    /// Values merged into the field values before arguments are matched.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: FieldValues,
    /// Root sequence of argument nodes following the command word.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<ArgumentNode>,
    /// Inheritable attributes.
    #[serde(flatten)]
    pub attrs: NodeAttrs,
}

impl CommandDescription {
    /// The name shown to operators.
    pub fn title(&self) -> &str {
        self.name.title()
    }
}

// ── Argument nodes ──────────────────────────────────────────────────────

/// Literal keyword argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenNode {
    /// The keyword, matched by case-insensitive prefix.
    pub token: String,
    /// Field receiving the full keyword when it matches.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Values merged into the field values when the keyword matches.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: FieldValues,
    /// Optionality flags.
    #[serde(flatten)]
    pub optionality: Optionality,
    /// Inheritable attributes.
    #[serde(flatten)]
    pub attrs: NodeAttrs,
}

/// Typed value argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    /// Field name the validated value is stored under.
    pub field: String,
    /// Typedef name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Keyword that must precede the value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Value used when the words run out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    /// Value used when the words run out in a `no` command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_for_no: Option<String>,
    /// Inline refinement of the type.
    #[serde(flatten)]
    pub constraints: TypeConstraints,
    /// Extra validation procedure for this field only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ProcRef>,
    /// Values merged into the field values when the field matches.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: FieldValues,
    /// Optionality flags.
    #[serde(flatten)]
    pub optionality: Optionality,
    /// Inheritable attributes.
    #[serde(flatten)]
    pub attrs: NodeAttrs,
}

impl FieldNode {
    /// Default for this form of the command.
    pub fn default_value(&self, is_no_command: bool) -> Option<&str> {
        if is_no_command {
            self.default_for_no.as_deref().or(self.default.as_deref())
        } else {
            self.default.as_deref()
        }
    }

    /// Whether the field refines its typedef inline.
    pub fn refines_type(&self) -> bool {
        !self.constraints.is_empty() || self.validation.is_some()
    }
}

/// Alternation: exactly one alternative must match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChoiceNode {
    /// Alternatives, in declaration order.
    pub choices: Vec<ArgumentNode>,
    /// Optionality flags.
    #[serde(flatten)]
    pub optionality: Optionality,
    /// Inheritable attributes.
    #[serde(flatten)]
    pub attrs: NodeAttrs,
}

/// Concatenation: every element must match in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SequenceNode {
    /// Elements, in order.
    pub args: Vec<ArgumentNode>,
    /// Optionality flags.
    #[serde(flatten)]
    pub optionality: Optionality,
    /// Inheritable attributes.
    #[serde(flatten)]
    pub attrs: NodeAttrs,
}

/// Node of a command's argument grammar.
///
/// In grammar files a bare string is shorthand for a required token;
/// otherwise the node is an object tagged with `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRepr", into = "TaggedNode")]
pub enum ArgumentNode {
    /// Literal keyword.
    Token(TokenNode),
    /// Typed value.
    Field(Box<FieldNode>),
    /// Alternation.
    Choice(ChoiceNode),
    /// Concatenation.
    Sequence(SequenceNode),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum TaggedNode {
    Token(TokenNode),
    Field(Box<FieldNode>),
    Choice(ChoiceNode),
    Sequence(SequenceNode),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NodeRepr {
    Literal(String),
    Tagged(TaggedNode),
}

impl From<NodeRepr> for ArgumentNode {
    fn from(repr: NodeRepr) -> Self {
        match repr {
            NodeRepr::Literal(token) => ArgumentNode::token(token),
            NodeRepr::Tagged(TaggedNode::Token(t)) => ArgumentNode::Token(t),
            NodeRepr::Tagged(TaggedNode::Field(f)) => ArgumentNode::Field(f),
            NodeRepr::Tagged(TaggedNode::Choice(c)) => ArgumentNode::Choice(c),
            NodeRepr::Tagged(TaggedNode::Sequence(s)) => ArgumentNode::Sequence(s),
        }
    }
}

impl From<ArgumentNode> for TaggedNode {
    fn from(node: ArgumentNode) -> Self {
        match node {
            ArgumentNode::Token(t) => TaggedNode::Token(t),
            ArgumentNode::Field(f) => TaggedNode::Field(f),
            ArgumentNode::Choice(c) => TaggedNode::Choice(c),
            ArgumentNode::Sequence(s) => TaggedNode::Sequence(s),
        }
    }
}

impl ArgumentNode {
    /// A required keyword with no attributes.
    pub fn token(token: impl Into<String>) -> Self {
        ArgumentNode::Token(TokenNode {
            token: token.into(),
            field: None,
            data: FieldValues::new(),
            optionality: Optionality::default(),
            attrs: NodeAttrs::default(),
        })
    }

    /// Inheritable attributes of the node.
    pub fn attrs(&self) -> &NodeAttrs {
        match self {
            ArgumentNode::Token(t) => &t.attrs,
            ArgumentNode::Field(f) => &f.attrs,
            ArgumentNode::Choice(c) => &c.attrs,
            ArgumentNode::Sequence(s) => &s.attrs,
        }
    }

    /// Optionality flags of the node.
    pub fn optionality(&self) -> Optionality {
        match self {
            ArgumentNode::Token(t) => t.optionality,
            ArgumentNode::Field(f) => f.optionality,
            ArgumentNode::Choice(c) => c.optionality,
            ArgumentNode::Sequence(s) => s.optionality,
        }
    }

    /// Lower-case kind name, as written in grammar files.
    pub fn kind(&self) -> &'static str {
        match self {
            ArgumentNode::Token(_) => "token",
            ArgumentNode::Field(_) => "field",
            ArgumentNode::Choice(_) => "choice",
            ArgumentNode::Sequence(_) => "sequence",
        }
    }

    /// Direct children (alternatives or elements).
    pub fn children(&self) -> &[ArgumentNode] {
        match self {
            ArgumentNode::Choice(c) => &c.choices,
            ArgumentNode::Sequence(s) => &s.args,
            ArgumentNode::Token(_) | ArgumentNode::Field(_) => &[],
        }
    }

    /// Visit this node and every descendant, depth first.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a ArgumentNode)) {
        visit(self);
        for child in self.children() {
            child.walk(visit);
        }
    }
}
