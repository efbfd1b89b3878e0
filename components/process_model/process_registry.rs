/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The table of every renderer process of a running application.
//!
//! Tabs navigate on their own control thread, but process exits are observed
//! somewhere else (an OS process watcher, for instance). Everything in here is
//! therefore behind a single lock, and the registry is shared as an
//! `Arc<ProcessRegistry>`. Callers only ever see snapshots of a [`ProcessHost`].

use base::id::{IdSequence, ProcessId};
use crossbeam_channel::{Receiver, Sender, unbounded};
use log::{debug, info, warn};
use parking_lot::{Mutex, MutexGuard};
use process_traits::{PartitionKey, PrincipalClass};
use rustc_hash::FxHashMap;
use warden_url::Site;

use crate::error::LaunchError;
use crate::process_host::{ProcessHost, ProcessLauncher};

/// Under process-per-site, every site instance that maps to the same key shares one
/// process.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct SiteProcessKey {
    pub site: Site,
    pub partition: PartitionKey,
    pub principal_class: PrincipalClass,
}

pub(crate) struct RegistryState {
    process_ids: IdSequence<ProcessId>,
    hosts: FxHashMap<ProcessId, ProcessHost>,
    site_processes: FxHashMap<SiteProcessKey, ProcessId>,
    shut_down: bool,
}

pub struct ProcessRegistry {
    state: Mutex<RegistryState>,
    launcher: Box<dyn ProcessLauncher>,
    exit_subscribers: Mutex<Vec<Sender<ProcessId>>>,
}

impl ProcessRegistry {
    pub fn new(launcher: Box<dyn ProcessLauncher>) -> ProcessRegistry {
        ProcessRegistry {
            state: Mutex::new(RegistryState {
                process_ids: IdSequence::new(),
                hosts: FxHashMap::default(),
                site_processes: FxHashMap::default(),
                shut_down: false,
            }),
            launcher,
            exit_subscribers: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock()
    }

    /// Create and launch a new process host with no listeners.
    pub fn allocate(
        &self,
        principal_class: PrincipalClass,
        per_tab_exclusive: bool,
    ) -> Result<ProcessHost, LaunchError> {
        let mut state = self.lock();
        let id = state.allocate(&*self.launcher, principal_class, per_tab_exclusive)?;
        state
            .hosts
            .get(&id)
            .cloned()
            .ok_or_else(|| LaunchError::new(format!("{id} vanished while launching")))
    }

    pub fn find(&self, id: ProcessId) -> Option<ProcessHost> {
        self.lock().hosts.get(&id).cloned()
    }

    pub fn is_live(&self, id: ProcessId) -> bool {
        self.lock().hosts.get(&id).is_some_and(ProcessHost::is_live)
    }

    /// Register a render host as a user of `id`. Returns false if there is no live
    /// process with that id.
    pub fn add_listener(&self, id: ProcessId) -> bool {
        let mut state = self.lock();
        match state.hosts.get_mut(&id) {
            Some(host) if host.is_live() => {
                host.add_listener();
                true
            },
            _ => false,
        }
    }

    /// A render host stopped using `id`. The host is destroyed once nothing uses it.
    pub fn release(&self, id: ProcessId) {
        let mut state = self.lock();
        let Some(host) = state.hosts.get_mut(&id) else {
            debug!("Released {id}, which is already gone.");
            return;
        };
        host.remove_listener();
        state.destroy_if_unused(&*self.launcher, id);
    }

    /// A site instance now refers to `id`.
    pub fn bind_instance(&self, id: ProcessId) {
        if let Some(host) = self.lock().hosts.get_mut(&id) {
            host.bind_instance();
        }
    }

    /// A site instance no longer refers to `id`.
    pub fn unbind_instance(&self, id: ProcessId) {
        let mut state = self.lock();
        let Some(host) = state.hosts.get_mut(&id) else {
            return;
        };
        host.unbind_instance();
        state.destroy_if_unused(&*self.launcher, id);
    }

    pub fn update_max_page_id(&self, id: ProcessId, page_id: i64) {
        if let Some(host) = self.lock().hosts.get_mut(&id) {
            host.update_max_page_id(page_id);
        }
    }

    /// The process behind `id` has gone away. Safe to call from any thread, and more
    /// than once: subscribers hear about each exit exactly once.
    pub fn process_exited(&self, id: ProcessId) {
        {
            let mut state = self.lock();
            let Some(host) = state.hosts.get_mut(&id) else {
                return;
            };
            if !host.mark_exited() {
                return;
            }
            info!("Renderer {id} exited.");
            state.site_processes.retain(|_, process_id| *process_id != id);
            state.destroy_if_unused(&*self.launcher, id);
        }
        self.exit_subscribers
            .lock()
            .retain(|subscriber| subscriber.send(id).is_ok());
    }

    /// A channel that receives the id of every process that exits from now on.
    pub fn subscribe_process_exits(&self) -> Receiver<ProcessId> {
        let (sender, receiver) = unbounded();
        self.exit_subscribers.lock().push(sender);
        receiver
    }

    pub fn live_process_count(&self) -> usize {
        self.lock().live_process_count()
    }

    /// A live host of `principal_class` that may be handed to another site instance.
    /// Prefers the host with the fewest listeners.
    pub fn find_reusable(&self, principal_class: PrincipalClass) -> Option<ProcessId> {
        self.lock().find_reusable(principal_class)
    }

    pub fn site_process(&self, key: &SiteProcessKey) -> Option<ProcessId> {
        let state = self.lock();
        state
            .site_processes
            .get(key)
            .copied()
            .filter(|id| state.hosts.get(id).is_some_and(ProcessHost::is_live))
    }

    /// Tear down every process. Nothing can be allocated afterwards.
    pub fn shutdown(&self) {
        let mut state = self.lock();
        if state.shut_down {
            return;
        }
        state.shut_down = true;
        state.site_processes.clear();
        for (id, host) in state.hosts.drain() {
            if host.is_live() {
                self.launcher.terminate(id);
            }
        }
        info!("Process registry shut down.");
    }

    pub(crate) fn launcher(&self) -> &dyn ProcessLauncher {
        &*self.launcher
    }
}

impl RegistryState {
    pub(crate) fn allocate(
        &mut self,
        launcher: &dyn ProcessLauncher,
        principal_class: PrincipalClass,
        per_tab_exclusive: bool,
    ) -> Result<ProcessId, LaunchError> {
        if self.shut_down {
            return Err(LaunchError::new("the process registry has shut down"));
        }
        let id = self.process_ids.next_id();
        launcher.launch(id, principal_class)?;
        let mut host = ProcessHost::new(id, principal_class, per_tab_exclusive);
        host.mark_live();
        self.hosts.insert(id, host);
        debug!("Allocated {id} for {principal_class:?} content.");
        Ok(id)
    }

    pub(crate) fn host(&self, id: ProcessId) -> Option<&ProcessHost> {
        self.hosts.get(&id)
    }

    pub(crate) fn host_mut(&mut self, id: ProcessId) -> Option<&mut ProcessHost> {
        self.hosts.get_mut(&id)
    }

    pub(crate) fn live_process_count(&self) -> usize {
        self.hosts.values().filter(|host| host.is_live()).count()
    }

    pub(crate) fn find_reusable(&self, principal_class: PrincipalClass) -> Option<ProcessId> {
        self.hosts
            .values()
            .filter(|host| host.is_suitable_for_reuse(principal_class))
            .min_by_key(|host| (host.listener_count(), host.id()))
            .map(ProcessHost::id)
    }

    pub(crate) fn site_process(&self, key: &SiteProcessKey) -> Option<ProcessId> {
        self.site_processes.get(key).copied()
    }

    pub(crate) fn set_site_process(&mut self, key: SiteProcessKey, id: ProcessId) {
        self.site_processes.insert(key, id);
    }

    fn destroy_if_unused(&mut self, launcher: &dyn ProcessLauncher, id: ProcessId) {
        let Some(host) = self.hosts.get(&id) else {
            return;
        };
        if !host.is_unused() {
            return;
        }
        if host.is_live() {
            launcher.terminate(id);
        }
        self.hosts.remove(&id);
        self.site_processes.retain(|_, process_id| *process_id != id);
        debug!("Destroyed {id}.");
    }
}

impl Drop for ProcessRegistry {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if !state.shut_down && !state.hosts.is_empty() {
            warn!(
                "Process registry dropped with {} hosts without being shut down.",
                state.hosts.len()
            );
        }
    }
}
