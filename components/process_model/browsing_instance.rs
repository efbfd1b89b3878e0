/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A `BrowsingInstance` is the set of site instances whose pages can reach each
//! other through script: a tab, the popups it opened, and so on. Within one
//! browsing instance there is at most one site instance per site, so that
//! same-site pages that can script each other always end up in the same process.

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};

use base::id::BrowsingInstanceId;
use log::{debug, error};
use process_traits::PartitionKey;
use rustc_hash::FxHashMap;
use warden_config::prefs::ProcessMode;
use warden_url::{Site, WardenUrl, site_of};

use crate::profile::Profile;
use crate::site_instance::SiteInstance;

pub struct BrowsingInstance {
    id: BrowsingInstanceId,
    profile: Rc<Profile>,
    process_mode: ProcessMode,
    /// Site instances that have a site. Entries are weak: a site instance removes
    /// itself when the last reference to it goes away.
    site_to_instance: RefCell<FxHashMap<Site, Weak<SiteInstance>>>,
}

impl BrowsingInstance {
    pub(crate) fn new(
        id: BrowsingInstanceId,
        profile: Rc<Profile>,
        process_mode: ProcessMode,
    ) -> Rc<BrowsingInstance> {
        debug!("Creating {id} ({process_mode:?}).");
        Rc::new(BrowsingInstance {
            id,
            profile,
            process_mode,
            site_to_instance: Default::default(),
        })
    }

    pub fn id(&self) -> BrowsingInstanceId {
        self.id
    }

    pub fn profile(&self) -> &Rc<Profile> {
        &self.profile
    }

    pub fn process_mode(&self) -> ProcessMode {
        self.process_mode
    }

    pub fn partition_key(&self) -> PartitionKey {
        self.profile.partition_key()
    }

    /// The site instance for `url`'s site if one is alive, otherwise a new site
    /// instance in this browsing instance that has no site yet.
    pub fn get_or_create_site_instance(self: &Rc<Self>, url: &WardenUrl) -> Rc<SiteInstance> {
        let site = site_of(url);
        if let Some(instance) = self.live_instance_for(&site) {
            return instance;
        }
        SiteInstance::new(self.profile.next_site_instance_id(), self.clone())
    }

    pub fn has_site_instance(&self, site: &Site) -> bool {
        self.live_instance_for(site).is_some()
    }

    /// The number of live site instances that have a site.
    pub fn site_instance_count(&self) -> usize {
        self.site_to_instance
            .borrow()
            .values()
            .filter(|instance| instance.strong_count() > 0)
            .count()
    }

    fn live_instance_for(&self, site: &Site) -> Option<Rc<SiteInstance>> {
        if site.is_empty() {
            return None;
        }
        self.site_to_instance.borrow().get(site).and_then(Weak::upgrade)
    }

    /// Called once `instance` has a site. Returns false, leaving the map untouched,
    /// if another live instance already has that site.
    pub(crate) fn register(&self, instance: &Rc<SiteInstance>) -> bool {
        let Some(site) = instance.site() else {
            error!("{} has no site and cannot be registered.", instance.id());
            return false;
        };
        if site.is_empty() {
            return false;
        }
        if let Some(existing) = self.live_instance_for(&site) {
            error!(
                "{} already holds {site} in {}; not registering {}.",
                existing.id(),
                self.id,
                instance.id()
            );
            return false;
        }
        self.site_to_instance
            .borrow_mut()
            .insert(site, Rc::downgrade(instance));
        true
    }

    /// Drop entries for site instances that are gone.
    pub(crate) fn unregister(&self) {
        self.site_to_instance
            .borrow_mut()
            .retain(|_, instance| instance.strong_count() > 0);
    }
}

impl fmt::Debug for BrowsingInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("BrowsingInstance")
            .field("id", &self.id)
            .field("process_mode", &self.process_mode)
            .field("site_instances", &self.site_instance_count())
            .finish()
    }
}
