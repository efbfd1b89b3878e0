/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Which process a site instance gets.
//!
//! The decision and the binding happen under the registry lock in one step, so a
//! process that exits on another thread can never be handed out halfway through.

use base::id::ProcessId;
use log::{debug, error};
use process_traits::{PartitionKey, PrincipalClass};
use warden_config::prefs::{Preferences, ProcessMode};
use warden_url::Site;

use crate::error::ProcessModelError;
use crate::process_host::ProcessHost;
use crate::process_registry::{ProcessRegistry, RegistryState, SiteProcessKey};

/// Everything the policy needs to know about the site instance asking for a process.
#[derive(Clone, Debug)]
pub struct ProcessRequest {
    pub mode: ProcessMode,
    pub site: Option<Site>,
    pub partition: PartitionKey,
    pub principal_class: PrincipalClass,
    /// Highest page id the site instance has seen, carried over into the host.
    pub max_page_id: i64,
}

impl ProcessRequest {
    fn site_process_key(&self) -> Option<SiteProcessKey> {
        let site = self.site.as_ref().filter(|site| !site.is_empty())?;
        Some(SiteProcessKey {
            site: site.clone(),
            partition: self.partition,
            principal_class: self.principal_class,
        })
    }
}

/// A process may only ever host content of the principal class it was created for.
pub(crate) fn verify_principal_class(
    host: &ProcessHost,
    requested: PrincipalClass,
) -> Result<(), ProcessModelError> {
    if host.principal_class() == requested {
        return Ok(());
    }
    Err(ProcessModelError::SecurityViolation {
        process_id: host.id(),
        hosted: host.principal_class(),
        requested,
    })
}

impl ProcessRegistry {
    /// Pick a process for `request`, creating one if needed, and bind it to the
    /// requesting site instance.
    pub fn assign_process(
        &self,
        request: &ProcessRequest,
        prefs: &Preferences,
    ) -> Result<ProcessHost, ProcessModelError> {
        let mut state = self.lock();
        let id = match request.mode {
            ProcessMode::PerTab => state.allocate(self.launcher(), request.principal_class, true)?,
            ProcessMode::PerSiteInstance => {
                let at_limit = state.live_process_count() >= prefs.max_renderer_processes;
                let reusable = if prefs.process_reuse_enabled && at_limit {
                    state.find_reusable(request.principal_class)
                } else {
                    None
                };
                match reusable {
                    Some(id) => {
                        debug!("Process limit reached, reusing {id}.");
                        id
                    },
                    None => state.allocate(self.launcher(), request.principal_class, false)?,
                }
            },
            ProcessMode::PerSite => self.assign_site_process(&mut state, request)?,
        };

        let host = state.host_mut(id).ok_or_else(|| {
            ProcessModelError::StaleReference(format!("{id} disappeared during assignment"))
        })?;
        host.bind_instance();
        host.update_max_page_id(request.max_page_id);
        Ok(host.clone())
    }

    fn assign_site_process(
        &self,
        state: &mut RegistryState,
        request: &ProcessRequest,
    ) -> Result<ProcessId, ProcessModelError> {
        // Site instances without a site are never shared.
        let Some(key) = request.site_process_key() else {
            return Ok(state.allocate(self.launcher(), request.principal_class, false)?);
        };

        if let Some(id) = state.site_process(&key) {
            match state.host(id) {
                Some(host) if host.is_live() => match verify_principal_class(host, key.principal_class) {
                    Ok(()) => {
                        debug!("Sharing {id} for {}.", key.site);
                        return Ok(id);
                    },
                    Err(violation) => error!("{violation}"),
                },
                _ => debug!("{id} for {} is gone.", key.site),
            }
        }

        let id = state.allocate(self.launcher(), request.principal_class, false)?;
        state.set_site_process(key, id);
        Ok(id)
    }
}
