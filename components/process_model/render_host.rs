/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! This module contains the `RenderHost` type, which is the browser's view of one
//! page's renderer. A render host starts its renderer lazily, on the first command
//! that needs one. When a `RenderHost` is dropped, a `Close` message is sent to its
//! renderer and the host stops counting as a user of the process.

use std::rc::Rc;

use base::id::{ProcessId, RenderHostId, RequestId};
use crossbeam_channel::Sender;
use log::{debug, error, warn};
use process_traits::{NavigateParams, RenderHostHandle, RendererMsg, RenderingMode};
use warden_url::WardenUrl;

use crate::error::ProcessModelError;
use crate::navigation_entry::NavigationEntry;
use crate::process_policy::verify_principal_class;
use crate::process_registry::ProcessRegistry;
use crate::site_instance::SiteInstance;

pub struct RenderHost {
    id: RenderHostId,
    site_instance: Rc<SiteInstance>,
    renderer_sender: Sender<RendererMsg>,
    /// The process this host is a listener of.
    process_id: Option<ProcessId>,
    /// Whether a renderer was ever started for this host.
    has_initialized: bool,
    navigations_suspended: bool,
    /// A navigation held back while navigations are suspended.
    suspended_navigation: Option<NavigateParams>,
    /// The URL of the last committed main frame navigation.
    committed_url: Option<WardenUrl>,
    rendering_mode: RenderingMode,
    is_loading: bool,
    is_unresponsive: bool,
}

impl RenderHost {
    pub(crate) fn new(
        id: RenderHostId,
        site_instance: Rc<SiteInstance>,
        renderer_sender: Sender<RendererMsg>,
    ) -> RenderHost {
        debug!("Creating {id} for {}.", site_instance.id());
        RenderHost {
            id,
            site_instance,
            renderer_sender,
            process_id: None,
            has_initialized: false,
            navigations_suspended: false,
            suspended_navigation: None,
            committed_url: None,
            rendering_mode: RenderingMode::Normal,
            is_loading: false,
            is_unresponsive: false,
        }
    }

    pub fn id(&self) -> RenderHostId {
        self.id
    }

    pub fn site_instance(&self) -> &Rc<SiteInstance> {
        &self.site_instance
    }

    pub fn process_id(&self) -> Option<ProcessId> {
        self.process_id
    }

    pub fn handle(&self) -> RenderHostHandle {
        RenderHostHandle {
            id: self.id,
            process_id: self.process_id,
            site_instance_id: self.site_instance.id(),
        }
    }

    /// The handle to report as the previous host in a swap, if there ever was a
    /// renderer behind it.
    pub(crate) fn initialized_handle(&self) -> Option<RenderHostHandle> {
        self.has_initialized.then(|| self.handle())
    }

    /// Whether this host has a renderer whose process is still running.
    pub fn is_alive(&self) -> bool {
        self.process_id
            .is_some_and(|process_id| self.registry().is_live(process_id))
    }

    pub fn committed_url(&self) -> Option<&WardenUrl> {
        self.committed_url.as_ref()
    }

    pub fn rendering_mode(&self) -> RenderingMode {
        self.rendering_mode
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn is_unresponsive(&self) -> bool {
        self.is_unresponsive
    }

    /// Make sure there is a live renderer behind this host, starting one in the site
    /// instance's process if needed.
    pub(crate) fn init_renderer(&mut self) -> Result<ProcessId, ProcessModelError> {
        if let Some(process_id) = self.process_id {
            match self.registry().find(process_id) {
                Some(process) if process.is_live() => {
                    match verify_principal_class(&process, self.site_instance.principal_class()) {
                        Ok(()) => return Ok(process_id),
                        Err(violation) => {
                            error!("{}: {violation}", self.id);
                            // The page must not stay in a process of another tier.
                            self.send(RendererMsg::Close(self.id));
                        },
                    }
                },
                _ => {},
            }
            self.renderer_exited();
        }

        let process = self.site_instance.get_process()?;
        if !self.registry().add_listener(process.id()) {
            return Err(ProcessModelError::StaleReference(format!(
                "{} exited before {} could use it",
                process.id(),
                self.id
            )));
        }
        debug!("{} renders in {}.", self.id, process.id());
        self.process_id = Some(process.id());
        self.has_initialized = true;
        Ok(process.id())
    }

    /// Load `entry` in this host's renderer, or hold it back while navigations are
    /// suspended.
    pub(crate) fn navigate(&mut self, entry: &NavigationEntry) -> Result<(), ProcessModelError> {
        self.init_renderer()?;
        let params = NavigateParams {
            url: entry.url().clone(),
            transition_type: entry.transition_type(),
            rendering_mode: entry.rendering_mode(),
            max_page_id: self.site_instance.max_page_id(),
        };
        self.rendering_mode = entry.rendering_mode();

        if self.navigations_suspended {
            debug!("{}: holding back navigation to {}.", self.id, entry.url().debug_compact());
            self.suspended_navigation = Some(params);
            return Ok(());
        }
        self.send(RendererMsg::Navigate(self.id, params));
        Ok(())
    }

    /// While suspended, navigations are kept instead of sent. Resuming sends the held
    /// back navigation, if any.
    pub(crate) fn set_navigations_suspended(&mut self, suspended: bool) {
        self.navigations_suspended = suspended;
        if suspended {
            return;
        }
        if let Some(params) = self.suspended_navigation.take() {
            self.send(RendererMsg::Navigate(self.id, params));
        }
    }

    pub(crate) fn stop(&self) {
        if self.is_alive() {
            self.send(RendererMsg::Stop(self.id));
        }
    }

    pub(crate) fn fire_before_unload(&self) {
        self.send(RendererMsg::FirePageBeforeUnload(self.id));
    }

    pub(crate) fn close_page(&self, new_process_id: ProcessId, new_request_id: RequestId) {
        self.send(RendererMsg::ClosePage {
            host: self.id,
            new_process_id,
            new_request_id,
        });
    }

    pub(crate) fn set_loading(&mut self, is_loading: bool) {
        self.is_loading = is_loading;
    }

    pub(crate) fn set_unresponsive(&mut self, is_unresponsive: bool) {
        self.is_unresponsive = is_unresponsive;
    }

    /// The renderer committed `url` as page `page_id` in the main frame.
    pub(crate) fn did_commit(&mut self, url: WardenUrl, page_id: i64) {
        self.committed_url = Some(url);
        self.is_unresponsive = false;
        self.site_instance.update_max_page_id(page_id);
        if let Some(process_id) = self.process_id {
            self.registry().update_max_page_id(process_id, page_id);
        }
    }

    /// The process behind this host went away. The next navigation starts a new one.
    pub(crate) fn renderer_exited(&mut self) {
        self.is_unresponsive = false;
        self.is_loading = false;
        if let Some(process_id) = self.process_id.take() {
            debug!("{} lost its renderer in {process_id}.", self.id);
            self.registry().release(process_id);
        }
    }

    fn send(&self, msg: RendererMsg) {
        if let Err(error) = self.renderer_sender.send(msg) {
            warn!("{}: renderer channel closed ({error}).", self.id);
        }
    }

    fn registry(&self) -> &ProcessRegistry {
        self.site_instance.registry()
    }
}

impl Drop for RenderHost {
    fn drop(&mut self) {
        let Some(process_id) = self.process_id.take() else {
            return;
        };
        if self.registry().is_live(process_id) {
            self.send(RendererMsg::Close(self.id));
        }
        self.registry().release(process_id);
    }
}
