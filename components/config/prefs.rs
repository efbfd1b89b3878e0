/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Preferences for the process model. There is no global preference store: a
//! [`Preferences`] value belongs to the profile that is created with it.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How aggressively renderer processes are shared.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProcessMode {
    /// Every tab gets its own process, which is never reused.
    PerTab,
    /// Every site instance gets its own process, unless the process limit has been
    /// reached and an existing process of the same principal class can be reused.
    #[default]
    PerSiteInstance,
    /// All site instances of a site within one partition share one process.
    PerSite,
}

impl ProcessMode {
    pub fn from_name(name: &str) -> Option<ProcessMode> {
        match name {
            "per-tab" | "process-per-tab" => Some(ProcessMode::PerTab),
            "per-site-instance" | "process-per-site-instance" => {
                Some(ProcessMode::PerSiteInstance)
            },
            "per-site" | "process-per-site" => Some(ProcessMode::PerSite),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(default)]
pub struct Preferences {
    pub process_model: ProcessMode,
    /// Whether an existing process may be handed to a new site instance once the
    /// process limit has been reached.
    pub process_reuse_enabled: bool,
    /// Soft limit on the number of live renderer processes.
    pub max_renderer_processes: usize,
    /// How long the outgoing page gets for its before-unload and unload handlers
    /// before the transition is forced forward.
    pub unload_timeout_ms: u64,
    /// How long a renderer may stay silent before it is reported unresponsive.
    pub hang_monitor_timeout_ms: u64,
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            process_model: ProcessMode::PerSiteInstance,
            process_reuse_enabled: true,
            max_renderer_processes: 20,
            unload_timeout_ms: 1000,
            hang_monitor_timeout_ms: 30000,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PrefValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl PrefValue {
    /// Interpret a command line value: `true`/`false`, an integer, or a plain string.
    pub fn from_booleanish_str(input: &str) -> Self {
        match input {
            "false" => PrefValue::Bool(false),
            "true" => PrefValue::Bool(true),
            _ => input
                .parse::<i64>()
                .map(PrefValue::Int)
                .unwrap_or_else(|_| PrefValue::Str(input.to_owned())),
        }
    }
}

#[derive(Debug)]
pub enum PrefError {
    NoSuchPref(String),
    InvalidValue(String, PrefValue),
    JsonParseErr(serde_json::Error),
}

impl fmt::Display for PrefError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrefError::NoSuchPref(name) => write!(f, "Unknown preference: {name}"),
            PrefError::InvalidValue(name, value) => {
                write!(f, "Invalid value for preference {name}: {value:?}")
            },
            PrefError::JsonParseErr(error) => write!(f, "Could not parse preferences: {error}"),
        }
    }
}

impl std::error::Error for PrefError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PrefError::JsonParseErr(error) => Some(error),
            _ => None,
        }
    }
}

impl Preferences {
    /// Set a preference by its dotted name, as passed with `--pref name=value`.
    pub fn set(&mut self, name: &str, value: PrefValue) -> Result<(), PrefError> {
        let invalid = |value: PrefValue| PrefError::InvalidValue(name.to_owned(), value);
        match (name, value) {
            ("process.model", PrefValue::Str(mode)) => {
                self.process_model = ProcessMode::from_name(&mode)
                    .ok_or_else(|| invalid(PrefValue::Str(mode.clone())))?;
            },
            ("process.reuse.enabled", PrefValue::Bool(enabled)) => {
                self.process_reuse_enabled = enabled;
            },
            ("process.max_renderer_processes", PrefValue::Int(limit)) => {
                self.max_renderer_processes =
                    usize::try_from(limit).map_err(|_| invalid(PrefValue::Int(limit)))?;
            },
            ("navigation.unload_timeout_ms", PrefValue::Int(timeout)) => {
                self.unload_timeout_ms =
                    u64::try_from(timeout).map_err(|_| invalid(PrefValue::Int(timeout)))?;
            },
            ("hang_monitor.timeout_ms", PrefValue::Int(timeout)) => {
                self.hang_monitor_timeout_ms =
                    u64::try_from(timeout).map_err(|_| invalid(PrefValue::Int(timeout)))?;
            },
            (
                "process.model" |
                "process.reuse.enabled" |
                "process.max_renderer_processes" |
                "navigation.unload_timeout_ms" |
                "hang_monitor.timeout_ms",
                value,
            ) => return Err(invalid(value)),
            (_, _) => return Err(PrefError::NoSuchPref(name.to_owned())),
        }
        Ok(())
    }

    pub fn unload_timeout(&self) -> Duration {
        Duration::from_millis(self.unload_timeout_ms)
    }

    pub fn hang_monitor_timeout(&self) -> Duration {
        Duration::from_millis(self.hang_monitor_timeout_ms)
    }
}

/// Read preferences from a JSON document. Missing fields keep their defaults.
pub fn read_prefs_from_json(txt: &str) -> Result<Preferences, PrefError> {
    serde_json::from_str(txt).map_err(PrefError::JsonParseErr)
}
