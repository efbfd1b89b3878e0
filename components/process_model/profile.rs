/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use base::id::{BrowsingInstanceId, IdSequence, RenderHostId, SiteInstanceId};
use log::info;
use process_traits::PartitionKey;
use warden_config::prefs::{Preferences, ProcessMode};

use crate::browsing_instance::BrowsingInstance;
use crate::process_host::ProcessLauncher;
use crate::process_registry::ProcessRegistry;

/// The context that browsing and site instances are created in. A profile owns its
/// preferences and hands out ids; the [`ProcessRegistry`] may be shared with other
/// profiles.
pub struct Profile {
    partition_key: PartitionKey,
    prefs: Preferences,
    registry: Arc<ProcessRegistry>,
    browsing_instance_ids: IdSequence<BrowsingInstanceId>,
    site_instance_ids: IdSequence<SiteInstanceId>,
    render_host_ids: IdSequence<RenderHostId>,
}

impl Profile {
    pub fn new(
        partition_key: PartitionKey,
        prefs: Preferences,
        registry: Arc<ProcessRegistry>,
    ) -> Rc<Profile> {
        info!(
            "Creating profile in {partition_key} ({:?}).",
            prefs.process_model
        );
        Rc::new(Profile {
            partition_key,
            prefs,
            registry,
            browsing_instance_ids: IdSequence::new(),
            site_instance_ids: IdSequence::new(),
            render_host_ids: IdSequence::new(),
        })
    }

    /// A profile with its own registry, launching processes through `launcher`.
    pub fn with_launcher(
        partition_key: PartitionKey,
        prefs: Preferences,
        launcher: Box<dyn ProcessLauncher>,
    ) -> Rc<Profile> {
        Profile::new(partition_key, prefs, Arc::new(ProcessRegistry::new(launcher)))
    }

    /// A new browsing instance using the profile's configured process model.
    pub fn new_browsing_instance(self: &Rc<Self>) -> Rc<BrowsingInstance> {
        self.new_browsing_instance_with_mode(self.prefs.process_model)
    }

    pub fn new_browsing_instance_with_mode(self: &Rc<Self>, mode: ProcessMode) -> Rc<BrowsingInstance> {
        BrowsingInstance::new(self.browsing_instance_ids.next_id(), self.clone(), mode)
    }

    pub fn registry(&self) -> &Arc<ProcessRegistry> {
        &self.registry
    }

    pub fn prefs(&self) -> &Preferences {
        &self.prefs
    }

    pub fn partition_key(&self) -> PartitionKey {
        self.partition_key
    }

    pub(crate) fn next_site_instance_id(&self) -> SiteInstanceId {
        self.site_instance_ids.next_id()
    }

    pub(crate) fn next_render_host_id(&self) -> RenderHostId {
        self.render_host_ids.next_id()
    }

    /// Terminate every process in the registry.
    pub fn shutdown(&self) {
        self.registry.shutdown();
    }
}

impl fmt::Debug for Profile {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Profile")
            .field("partition_key", &self.partition_key)
            .field("prefs", &self.prefs)
            .finish_non_exhaustive()
    }
}
