/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! A `SiteInstance` groups the pages of one site, within one browsing instance, that
//! are rendered by the same process.
//!
//! A site instance is created without a site and gets one on its first real
//! navigation. It refers to its process by id only: if that process has exited, the
//! next call to [`SiteInstance::get_process`] resolves a new one.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use base::id::{ProcessId, SiteInstanceId};
use log::{debug, error, warn};
use process_traits::PrincipalClass;
use warden_url::{Site, WardenUrl, site_of};

use crate::browsing_instance::BrowsingInstance;
use crate::error::ProcessModelError;
use crate::process_host::ProcessHost;
use crate::process_policy::{ProcessRequest, verify_principal_class};
use crate::process_registry::ProcessRegistry;

pub struct SiteInstance {
    id: SiteInstanceId,
    browsing_instance: Rc<BrowsingInstance>,
    /// Written at most once.
    site: RefCell<Option<Site>>,
    process_id: Cell<Option<ProcessId>>,
    max_page_id: Cell<i64>,
    principal_class: Cell<PrincipalClass>,
}

impl SiteInstance {
    pub(crate) fn new(id: SiteInstanceId, browsing_instance: Rc<BrowsingInstance>) -> Rc<SiteInstance> {
        debug!("Creating {id} in {}.", browsing_instance.id());
        Rc::new(SiteInstance {
            id,
            browsing_instance,
            site: RefCell::new(None),
            process_id: Cell::new(None),
            max_page_id: Cell::new(-1),
            principal_class: Cell::new(PrincipalClass::Normal),
        })
    }

    pub fn id(&self) -> SiteInstanceId {
        self.id
    }

    pub fn browsing_instance(&self) -> &Rc<BrowsingInstance> {
        &self.browsing_instance
    }

    pub fn site(&self) -> Option<Site> {
        self.site.borrow().clone()
    }

    pub fn has_site(&self) -> bool {
        self.site.borrow().is_some()
    }

    /// The process this instance is bound to, if it was ever assigned one. The process
    /// may have exited since.
    pub fn process_id(&self) -> Option<ProcessId> {
        self.process_id.get()
    }

    pub fn max_page_id(&self) -> i64 {
        self.max_page_id.get()
    }

    pub fn principal_class(&self) -> PrincipalClass {
        self.principal_class.get()
    }

    /// Change the privilege tier of the content this instance renders. If the bound
    /// process hosts a different tier, the next [`SiteInstance::get_process`] moves
    /// this instance to a new process.
    pub fn set_principal_class(&self, principal_class: PrincipalClass) {
        self.principal_class.set(principal_class);
    }

    /// Bind this instance to the site of `url`. Returns false if a site was already
    /// set, in which case nothing changes.
    pub fn set_site(self: &Rc<Self>, url: &WardenUrl) -> bool {
        if let Some(site) = &*self.site.borrow() {
            warn!(
                "{} already belongs to {site}, not rebinding to {}.",
                self.id,
                url.debug_compact()
            );
            return false;
        }

        let site = site_of(url);
        debug!("{} now belongs to {site}.", self.id);
        *self.site.borrow_mut() = Some(site.clone());

        if site.is_empty() {
            return true;
        }
        // Two instances created for the same site before either had one: the first to
        // get its site is the one the browsing instance hands out from now on.
        if self.browsing_instance.has_site_instance(&site) {
            debug!("{site} already has a site instance in {}.", self.browsing_instance.id());
        } else {
            self.browsing_instance.register(self);
        }
        true
    }

    /// The live process for this instance, assigning one if there is none.
    pub fn get_process(&self) -> Result<ProcessHost, ProcessModelError> {
        let registry = self.registry();
        if let Some(id) = self.process_id.get() {
            match registry.find(id) {
                Some(host) if host.is_live() => {
                    match verify_principal_class(&host, self.principal_class.get()) {
                        Ok(()) => return Ok(host),
                        Err(violation) => error!("{}: {violation}", self.id),
                    }
                },
                _ => debug!("{} refers to {id}, which is gone.", self.id),
            }
            self.process_id.set(None);
            registry.unbind_instance(id);
        }

        let profile = self.browsing_instance.profile();
        let request = ProcessRequest {
            mode: self.browsing_instance.process_mode(),
            site: self.site(),
            partition: self.browsing_instance.partition_key(),
            principal_class: self.principal_class.get(),
            max_page_id: self.max_page_id.get(),
        };
        let host = registry.assign_process(&request, profile.prefs())?;
        debug!("{} is rendered by {}.", self.id, host.id());
        self.process_id.set(Some(host.id()));
        Ok(host)
    }

    /// Whether the browsing instance already has a site instance for `url`'s site.
    pub fn has_related(&self, url: &WardenUrl) -> bool {
        self.browsing_instance.has_site_instance(&site_of(url))
    }

    /// The site instance in this browsing instance that should render `url`.
    pub fn get_related(self: &Rc<Self>, url: &WardenUrl) -> Rc<SiteInstance> {
        let own_site = self.site.borrow().clone();
        if own_site.is_some_and(|site| !site.is_empty() && site == site_of(url)) {
            return self.clone();
        }
        self.browsing_instance.get_or_create_site_instance(url)
    }

    pub fn is_related_to(&self, other: &SiteInstance) -> bool {
        Rc::ptr_eq(&self.browsing_instance, &other.browsing_instance)
    }

    pub fn update_max_page_id(&self, page_id: i64) {
        if page_id > self.max_page_id.get() {
            self.max_page_id.set(page_id);
        }
    }

    pub(crate) fn registry(&self) -> &ProcessRegistry {
        self.browsing_instance.profile().registry()
    }
}

impl Drop for SiteInstance {
    fn drop(&mut self) {
        debug!("Destroying {}.", self.id);
        self.browsing_instance.unregister();
        if let Some(id) = self.process_id.take() {
            self.registry().unbind_instance(id);
        }
    }
}

impl fmt::Debug for SiteInstance {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("SiteInstance")
            .field("id", &self.id)
            .field("browsing_instance", &self.browsing_instance.id())
            .field("site", &*self.site.borrow())
            .field("process_id", &self.process_id.get())
            .field("principal_class", &self.principal_class.get())
            .finish()
    }
}
