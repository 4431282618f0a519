//! Interactive session state.

use crate::complete::{self, Completion, CompletionKind};
use crate::config::ShellConfig;
use crate::error::CommandError;
use crate::exec::{self, ExecOutcome, Parsed};
use crate::mode::{ENABLE, LOGIN, ModeStack};
use crate::registry::Registry;
use crate::store::{MemoryStore, ObjectStore};
use std::collections::BTreeSet;

/// One operator's shell: a registry to match against, the mode stack, the
/// object store, and the enabled features.
pub struct Session<'r> {
    pub(crate) registry: &'r Registry,
    pub(crate) modes: ModeStack,
    pub(crate) store: Box<dyn ObjectStore>,
    pub(crate) config: ShellConfig,
    pub(crate) features: BTreeSet<String>,
    pub(crate) completion_cache: Option<(String, CompletionKind, Completion)>,
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("registry", self.registry)
            .field("modes", &self.modes)
            .field("config", &self.config)
            .field("features", &self.features)
            .finish_non_exhaustive()
    }
}

impl<'r> Session<'r> {
    /// A session over `store`, starting in the configured mode.
    pub fn new(registry: &'r Registry, config: ShellConfig, store: Box<dyn ObjectStore>) -> Self {
        Self {
            registry,
            modes: ModeStack::starting_in(&config.initial_mode),
            store,
            features: config.features.clone(),
            config,
            completion_cache: None,
        }
    }

    /// A session over an empty [`MemoryStore`].
    pub fn with_memory_store(registry: &'r Registry, config: ShellConfig) -> Self {
        Self::new(registry, config, Box::new(MemoryStore::new()))
    }

    /// Match and run one command line.
    pub fn execute(&mut self, line: &str) -> Result<ExecOutcome, CommandError> {
        exec::execute(self, line)
    }

    /// Match a command line without running it.
    pub fn parse(&self, line: &str) -> Result<Parsed<'r>, CommandError> {
        exec::parse(self, line)
    }

    /// Completion candidates for a partial line.
    pub fn complete(&mut self, line: &str, kind: CompletionKind) -> Result<Completion, CommandError> {
        complete::complete(self, line, kind)
    }

    /// Prompt for the current mode: `host>` in login, `host#` in enable,
    /// `host(<mode>)#` in config and its submodes.
    pub fn prompt(&self) -> String {
        let host = &self.config.hostname;
        match self.modes.current_mode() {
            LOGIN => format!("{host}>"),
            ENABLE => format!("{host}#"),
            mode => format!("{host}({mode})#"),
        }
    }

    /// The registry commands are matched against.
    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    /// The mode stack.
    pub fn modes(&self) -> &ModeStack {
        &self.modes
    }

    /// The current mode name.
    pub fn current_mode(&self) -> &str {
        self.modes.current_mode()
    }

    /// The object store.
    pub fn store(&self) -> &dyn ObjectStore {
        self.store.as_ref()
    }

    /// The object store, mutably.
    pub fn store_mut(&mut self) -> &mut dyn ObjectStore {
        self.completion_cache = None;
        self.store.as_mut()
    }

    /// Session configuration.
    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Enabled feature gates.
    pub fn features(&self) -> &BTreeSet<String> {
        &self.features
    }

    /// Enable a feature gate.
    pub fn enable_feature(&mut self, feature: impl Into<String>) {
        self.completion_cache = None;
        self.features.insert(feature.into());
    }

    /// Disable a feature gate.
    pub fn disable_feature(&mut self, feature: &str) {
        self.completion_cache = None;
        self.features.remove(feature);
    }
}
