//! Session configuration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Settings a [`Session`](crate::Session) starts with.
///
/// Read from a JSONC file by the CLI (`--config`); every field has a
/// default, so an empty object is a valid configuration.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ShellConfig {
    /// Host name shown in the prompt.
    pub hostname: String,
    /// Include debugging detail in error reports.
    pub debug: bool,
    /// Feature gates enabled at startup.
    pub features: BTreeSet<String>,
    /// Mode the session starts in (`login`, `enable`, or `config`).
    pub initial_mode: String,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            hostname: "sdnsh".into(),
            debug: false,
            features: BTreeSet::new(),
            initial_mode: crate::mode::LOGIN.into(),
        }
    }
}

impl ShellConfig {
    /// Parse a configuration written as JSON or JSONC.
    pub fn from_jsonc(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(&sdnsh_jsonc_strip::strip_jsonc(text))
    }

    /// Set the prompt host name.
    #[must_use]
    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }

    /// Enable a feature gate.
    #[must_use]
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.insert(feature.into());
        self
    }

    /// Set the starting mode.
    #[must_use]
    pub fn with_initial_mode(mut self, mode: impl Into<String>) -> Self {
        self.initial_mode = mode.into();
        self
    }

    /// Enable debugging detail.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }
}
