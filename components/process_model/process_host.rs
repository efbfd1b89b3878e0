/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This module contains the `ProcessHost` type, which is the browser's view of one
//! renderer process. Hosts live in the [`ProcessRegistry`](crate::ProcessRegistry)
//! and are only ever handed out as snapshots; every change goes through the registry.

use base::id::ProcessId;
use log::debug;
use process_traits::PrincipalClass;

use crate::error::LaunchError;

#[derive(Clone, Debug, PartialEq)]
pub struct ProcessHost {
    id: ProcessId,
    principal_class: PrincipalClass,
    live: bool,
    max_page_id: i64,
    /// Render hosts currently drawing from this process.
    listener_count: u32,
    /// Site instances currently holding this process's id.
    bound_instances: u32,
    /// Created for process-per-tab and never handed to anyone else.
    per_tab_exclusive: bool,
}

impl ProcessHost {
    pub(crate) fn new(id: ProcessId, principal_class: PrincipalClass, per_tab_exclusive: bool) -> Self {
        ProcessHost {
            id,
            principal_class,
            live: false,
            max_page_id: -1,
            listener_count: 0,
            bound_instances: 0,
            per_tab_exclusive,
        }
    }

    pub fn id(&self) -> ProcessId {
        self.id
    }

    pub fn principal_class(&self) -> PrincipalClass {
        self.principal_class
    }

    pub fn is_live(&self) -> bool {
        self.live
    }

    pub fn max_page_id(&self) -> i64 {
        self.max_page_id
    }

    pub fn listener_count(&self) -> u32 {
        self.listener_count
    }

    pub fn bound_instances(&self) -> u32 {
        self.bound_instances
    }

    pub fn is_per_tab_exclusive(&self) -> bool {
        self.per_tab_exclusive
    }

    /// Nothing refers to this host any more, so it can be destroyed.
    pub(crate) fn is_unused(&self) -> bool {
        self.listener_count == 0 && self.bound_instances == 0
    }

    /// Whether this host may be handed to a site instance that did not ask for it
    /// specifically.
    pub(crate) fn is_suitable_for_reuse(&self, principal_class: PrincipalClass) -> bool {
        self.live && !self.per_tab_exclusive && self.principal_class == principal_class
    }

    pub(crate) fn mark_live(&mut self) {
        self.live = true;
    }

    /// Returns true if the host was live until now.
    pub(crate) fn mark_exited(&mut self) -> bool {
        std::mem::replace(&mut self.live, false)
    }

    pub(crate) fn add_listener(&mut self) {
        self.listener_count += 1;
    }

    pub(crate) fn remove_listener(&mut self) {
        self.listener_count = self.listener_count.saturating_sub(1);
    }

    pub(crate) fn bind_instance(&mut self) {
        self.bound_instances += 1;
    }

    pub(crate) fn unbind_instance(&mut self) {
        self.bound_instances = self.bound_instances.saturating_sub(1);
    }

    pub(crate) fn update_max_page_id(&mut self, page_id: i64) {
        self.max_page_id = self.max_page_id.max(page_id);
    }
}

/// Starts and stops the operating system processes behind [`ProcessHost`]s.
pub trait ProcessLauncher: Send + Sync {
    fn launch(&self, id: ProcessId, principal_class: PrincipalClass) -> Result<(), LaunchError>;

    /// The host is gone; its process may exit.
    fn terminate(&self, _id: ProcessId) {}
}

/// Runs every "process" inside the browser process. Launching always succeeds.
#[derive(Debug, Default)]
pub struct InProcessLauncher;

impl ProcessLauncher for InProcessLauncher {
    fn launch(&self, id: ProcessId, principal_class: PrincipalClass) -> Result<(), LaunchError> {
        debug!("Starting in-process renderer {id} ({principal_class:?}).");
        Ok(())
    }

    fn terminate(&self, id: ProcessId) {
        debug!("Stopping in-process renderer {id}.");
    }
}
