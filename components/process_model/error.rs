/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;

use base::id::{ProcessId, RenderHostId};
use process_traits::PrincipalClass;

/// A renderer process could not be started.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LaunchError {
    pub reason: String,
}

impl LaunchError {
    pub fn new(reason: impl Into<String>) -> LaunchError {
        LaunchError {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for LaunchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "could not launch renderer process: {}", self.reason)
    }
}

impl std::error::Error for LaunchError {}

/// Everything that can go wrong in the process model. None of these are fatal: each
/// has a fallback that leaves the tab showing a consistent page.
#[derive(Clone, Debug, PartialEq)]
pub enum ProcessModelError {
    /// A process could not be created. The navigation fails and the tab keeps its
    /// current active host.
    ResourceExhausted(LaunchError),
    /// An operation targeted an object whose process already went away. Resolved by
    /// recreating the process on next use.
    StaleReference(String),
    /// A signal arrived in a state that does not expect it. Logged and ignored.
    ProtocolViolation(String),
    /// Reusing a process would have mixed principal classes. A new process is used
    /// instead.
    SecurityViolation {
        process_id: ProcessId,
        hosted: PrincipalClass,
        requested: PrincipalClass,
    },
    /// A renderer stopped answering during a transition, which is then forced
    /// forward.
    Timeout(RenderHostId),
}

impl fmt::Display for ProcessModelError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ProcessModelError::ResourceExhausted(error) => write!(f, "resource exhausted: {error}"),
            ProcessModelError::StaleReference(what) => write!(f, "stale reference: {what}"),
            ProcessModelError::ProtocolViolation(what) => write!(f, "protocol violation: {what}"),
            ProcessModelError::SecurityViolation {
                process_id,
                hosted,
                requested,
            } => write!(
                f,
                "security violation: {process_id} hosts {hosted:?} content and cannot host {requested:?} content"
            ),
            ProcessModelError::Timeout(host) => {
                write!(f, "timeout: {host} is unresponsive during a transition")
            },
        }
    }
}

impl std::error::Error for ProcessModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProcessModelError::ResourceExhausted(error) => Some(error),
            _ => None,
        }
    }
}

impl From<LaunchError> for ProcessModelError {
    fn from(error: LaunchError) -> Self {
        ProcessModelError::ResourceExhausted(error)
    }
}

/// Why [`NavigationManager::navigate`](crate::NavigationManager::navigate) failed.
#[derive(Clone, Debug, PartialEq)]
pub enum NavigateError {
    /// No renderer process could be provided for the destination.
    ResourceExhausted(LaunchError),
}

impl fmt::Display for NavigateError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NavigateError::ResourceExhausted(error) => write!(f, "navigation failed: {error}"),
        }
    }
}

impl std::error::Error for NavigateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavigateError::ResourceExhausted(error) => Some(error),
        }
    }
}

impl From<ProcessModelError> for NavigateError {
    fn from(error: ProcessModelError) -> Self {
        match error {
            ProcessModelError::ResourceExhausted(error) => NavigateError::ResourceExhausted(error),
            // Everything else is recovered from before it reaches a navigation.
            other => NavigateError::ResourceExhausted(LaunchError::new(other.to_string())),
        }
    }
}
