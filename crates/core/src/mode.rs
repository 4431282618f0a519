//! Mode stack and mode gating.
//!
//! The session starts in `login`. `enable` and `config` are entered with
//! commands; config submodes are named `config-<something>` and nest by
//! name (`config-switch-if` lives below `config-switch`). A submode entry
//! may be bound to a store object, whose deletion pops the entry.

use sdnsh_grammar_tables::{CommandDescription, ProcRef};
use serde::Serialize;
use std::collections::BTreeSet;

/// Base mode; never popped.
pub const LOGIN: &str = "login";
/// Privileged mode.
pub const ENABLE: &str = "enable";
/// Configuration mode, parent of every submode.
pub const CONFIG: &str = "config";

/// One level of the mode stack.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModeEntry {
    /// Mode name.
    pub mode: String,
    /// Type of the object the mode edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obj_type: Option<String>,
    /// Key of the object the mode edits.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub obj_id: Option<String>,
    /// Action run when the mode is exited.
    #[serde(skip)]
    pub on_exit: Option<ProcRef>,
}

impl ModeEntry {
    /// An entry not bound to an object.
    pub fn new(mode: impl Into<String>) -> Self {
        Self {
            mode: mode.into(),
            obj_type: None,
            obj_id: None,
            on_exit: None,
        }
    }

    /// An entry editing `obj_type` / `obj_id`.
    pub fn for_object(
        mode: impl Into<String>,
        obj_type: impl Into<String>,
        obj_id: impl Into<String>,
    ) -> Self {
        Self {
            obj_type: Some(obj_type.into()),
            obj_id: Some(obj_id.into()),
            ..Self::new(mode)
        }
    }

    /// Attach an exit hook.
    #[must_use]
    pub fn with_on_exit(mut self, on_exit: Option<ProcRef>) -> Self {
        self.on_exit = on_exit;
        self
    }

    /// `(obj_type, obj_id)` when the entry is bound to an object.
    pub fn object(&self) -> Option<(&str, &str)> {
        Some((self.obj_type.as_deref()?, self.obj_id.as_deref()?))
    }
}

/// Stack of modes; the bottom entry is always `login`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ModeStack {
    entries: Vec<ModeEntry>,
}

impl Default for ModeStack {
    fn default() -> Self {
        Self {
            entries: vec![ModeEntry::new(LOGIN)],
        }
    }
}

impl ModeStack {
    /// A stack holding only `login`.
    pub fn new() -> Self {
        Self::default()
    }

    /// A stack entered as far as `mode`: `enable` sits on `login`, and
    /// `config` on `enable`.
    pub fn starting_in(mode: &str) -> Self {
        let mut stack = Self::new();
        if mode == LOGIN {
            return stack;
        }
        if mode == ENABLE || mode.starts_with(CONFIG) {
            stack.push(ModeEntry::new(ENABLE));
        }
        if mode.starts_with(CONFIG) {
            stack.push(ModeEntry::new(CONFIG));
        }
        if stack.current_mode() != mode {
            stack.push(ModeEntry::new(mode));
        }
        stack
    }

    /// Enter a mode.
    pub fn push(&mut self, entry: ModeEntry) {
        log::info!("entering mode {}", entry.mode);
        self.entries.push(entry);
    }

    /// Leave the current mode. Returns `None` (and keeps the stack) in
    /// `login`.
    pub fn pop(&mut self) -> Option<ModeEntry> {
        if self.entries.len() <= 1 {
            return None;
        }
        let entry = self.entries.pop();
        if let Some(entry) = &entry {
            log::info!("leaving mode {}", entry.mode);
        }
        entry
    }

    /// The current entry.
    pub fn current(&self) -> &ModeEntry {
        // `entries` is never empty: `pop` keeps the login entry.
        &self.entries[self.entries.len() - 1]
    }

    /// The current mode name.
    pub fn current_mode(&self) -> &str {
        &self.current().mode
    }

    /// The current entry, if it is bound to an object.
    pub fn current_object(&self) -> Option<&ModeEntry> {
        let current = self.current();
        current.object().map(|_| current)
    }

    /// Every entry, bottom first.
    pub fn entries(&self) -> &[ModeEntry] {
        &self.entries
    }

    /// Number of entries, including `login`.
    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    /// Whether entering `mode` from here requires leaving the current mode
    /// first: a submode replaces a sibling submode instead of nesting in
    /// it, unless its name extends the current one.
    pub fn is_sibling_of_current(&self, mode: &str) -> bool {
        let current = self.current_mode();
        current.starts_with("config-") && !mode.starts_with(&format!("{current}-"))
    }

    /// Drop every object-bound entry `keep` rejects. Entries above a
    /// dropped one stay. Returns the removed entries, bottom first.
    pub fn prune(&mut self, mut keep: impl FnMut(&ModeEntry) -> bool) -> Vec<ModeEntry> {
        let mut removed = Vec::new();
        let mut index = 0;
        self.entries.retain(|entry| {
            let stale = index > 0 && entry.object().is_some() && !keep(entry);
            index += 1;
            if stale {
                removed.push(entry.clone());
            }
            !stale
        });
        removed
    }
}

/// Whether a command declared for `modes` is usable in `current`.
///
/// `login` commands are usable everywhere, `enable` commands everywhere
/// but `login`, and a trailing `*` matches by prefix (`config*` covers
/// `config` and every submode).
pub fn mode_matches(current: &str, modes: &[String]) -> bool {
    modes.iter().any(|m| match m.strip_suffix('*') {
        Some(prefix) => current.starts_with(prefix),
        None => m == current || m == LOGIN || (m == ENABLE && current != LOGIN),
    })
}

/// Commands usable in `mode` with `features` enabled, in registration
/// order. A `no` line only sees commands that support the `no` form.
pub fn eligible_commands<'g>(
    commands: &'g [CommandDescription],
    mode: &str,
    features: &BTreeSet<String>,
    is_no_command: bool,
) -> Vec<&'g CommandDescription> {
    commands
        .iter()
        .filter(|c| mode_matches(mode, &c.modes))
        .filter(|c| c.feature.iter().all(|f| features.contains(f)))
        .filter(|c| !is_no_command || c.no_supported)
        .collect()
}
