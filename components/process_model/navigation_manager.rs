/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! The per-tab owner of render hosts.
//!
//! A tab always has one active render host, the one the user sees. Navigating to a
//! page that needs a different site instance creates a pending render host and runs
//! a handshake with the active one before the pending host is shown:
//!
//! ```text
//!   Idle ──navigate──▶ AwaitingBeforeUnload ──proceed──▶ AwaitingCrossSiteResponse
//!    ▲                       │ refuse                          │ unload ack
//!    │                       ▼                                 ▼
//!    └───────────────────── Idle ◀──────commit─────────── ReadyToCommit
//! ```
//!
//! A commit from the pending host is accepted from `AwaitingCrossSiteResponse` as well,
//! since the network layer does not always hold the response back. Every signal that
//! arrives in a state that does not expect it is logged and ignored.

use std::mem;
use std::rc::Rc;
use std::time::Instant;

use base::id::{ProcessId, RenderHostId, RequestId};
use crossbeam_channel::Sender;
use log::{debug, info, warn};
use process_traits::{NavigationSignal, NetworkMsg, RenderHostHandle, RendererMsg};
use warden_url::{WardenUrl, is_same_site};

use crate::error::{NavigateError, ProcessModelError};
use crate::navigation_delegate::NavigationDelegate;
use crate::navigation_entry::NavigationEntry;
use crate::profile::Profile;
use crate::render_host::RenderHost;
use crate::site_instance::SiteInstance;

/// Everything a [`NavigationManager`] needs to talk to the rest of the browser.
pub struct InitialNavigationState {
    pub profile: Rc<Profile>,
    /// Commands to renderers.
    pub renderer_sender: Sender<RendererMsg>,
    /// Commands to the network layer about held back responses.
    pub network_sender: Sender<NetworkMsg>,
    pub delegate: Rc<dyn NavigationDelegate>,
    /// The site instance of the opener, for tabs opened by script. A new browsing
    /// instance is used when this is `None`.
    pub site_instance: Option<Rc<SiteInstance>>,
}

/// Where a tab is in a cross-site transition.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransitionState {
    /// Exactly one render host, nothing pending.
    Idle,
    /// The pending host exists, its navigation is held back until the active host's
    /// before-unload handler answers.
    AwaitingBeforeUnload,
    /// The pending host is loading; waiting for the network layer to report that the
    /// response is ready so the active page can unload.
    AwaitingCrossSiteResponse,
    /// The active page has unloaded and the response went to the pending host. Only
    /// the pending host's commit is left.
    ReadyToCommit,
}

struct PendingTransition {
    host: RenderHost,
    /// The response held back by the network layer for the pending host, once known.
    cross_site_request: Option<(ProcessId, RequestId)>,
    /// When the current wait on the active renderer began.
    handshake_started: Instant,
}

enum Transition {
    Idle,
    AwaitingBeforeUnload(PendingTransition),
    AwaitingCrossSiteResponse(PendingTransition),
    ReadyToCommit(PendingTransition),
}

impl Transition {
    fn state(&self) -> TransitionState {
        match self {
            Transition::Idle => TransitionState::Idle,
            Transition::AwaitingBeforeUnload(_) => TransitionState::AwaitingBeforeUnload,
            Transition::AwaitingCrossSiteResponse(_) => TransitionState::AwaitingCrossSiteResponse,
            Transition::ReadyToCommit(_) => TransitionState::ReadyToCommit,
        }
    }

    fn pending(&self) -> Option<&PendingTransition> {
        match self {
            Transition::Idle => None,
            Transition::AwaitingBeforeUnload(pending) |
            Transition::AwaitingCrossSiteResponse(pending) |
            Transition::ReadyToCommit(pending) => Some(pending),
        }
    }

    fn pending_mut(&mut self) -> Option<&mut PendingTransition> {
        match self {
            Transition::Idle => None,
            Transition::AwaitingBeforeUnload(pending) |
            Transition::AwaitingCrossSiteResponse(pending) |
            Transition::ReadyToCommit(pending) => Some(pending),
        }
    }

    fn into_pending(self) -> Option<PendingTransition> {
        match self {
            Transition::Idle => None,
            Transition::AwaitingBeforeUnload(pending) |
            Transition::AwaitingCrossSiteResponse(pending) |
            Transition::ReadyToCommit(pending) => Some(pending),
        }
    }
}

pub struct NavigationManager {
    profile: Rc<Profile>,
    renderer_sender: Sender<RendererMsg>,
    network_sender: Sender<NetworkMsg>,
    delegate: Rc<dyn NavigationDelegate>,
    active: RenderHost,
    transition: Transition,
}

impl NavigationManager {
    pub fn new(state: InitialNavigationState) -> NavigationManager {
        let site_instance = state.site_instance.unwrap_or_else(|| {
            let browsing_instance = state.profile.new_browsing_instance();
            SiteInstance::new(state.profile.next_site_instance_id(), browsing_instance)
        });
        let active = RenderHost::new(
            state.profile.next_render_host_id(),
            site_instance,
            state.renderer_sender.clone(),
        );
        NavigationManager {
            profile: state.profile,
            renderer_sender: state.renderer_sender,
            network_sender: state.network_sender,
            delegate: state.delegate,
            active,
            transition: Transition::Idle,
        }
    }

    pub fn active_render_host(&self) -> RenderHostHandle {
        self.active.handle()
    }

    pub fn pending_render_host(&self) -> Option<RenderHostHandle> {
        self.transition.pending().map(|pending| pending.host.handle())
    }

    pub fn active_site_instance(&self) -> &Rc<SiteInstance> {
        self.active.site_instance()
    }

    pub fn transition_state(&self) -> TransitionState {
        self.transition.state()
    }

    pub fn is_loading(&self) -> bool {
        self.active.is_loading()
    }

    /// When the handshake the tab is waiting on should be forced forward with
    /// [`NavigationManager::renderer_unresponsive`]. `None` when the tab is not waiting
    /// on the active renderer.
    pub fn handshake_deadline(&self) -> Option<Instant> {
        let pending = self.outstanding_handshake()?;
        Some(pending.handshake_started + self.profile.prefs().unload_timeout())
    }

    /// Start loading `entry`. Returns the render host that will show it: the active
    /// host for a navigation within the current site instance, otherwise a pending
    /// host (or a freshly promoted active host when the old one had no renderer).
    pub fn navigate(&mut self, entry: &NavigationEntry) -> Result<RenderHostHandle, NavigateError> {
        let (destination, forced_swap) = self.destination_for(entry);

        if !forced_swap && Rc::ptr_eq(&destination, self.active.site_instance()) {
            if self.transition.state() != TransitionState::Idle {
                debug!("Navigating within the active site instance, abandoning the transition.");
                self.cancel_pending();
            }
            self.bind_site_if_needed(&destination, entry.url());
            self.active.navigate(entry)?;
            return Ok(self.active.handle());
        }

        // Only one transition at a time.
        self.cancel_pending();

        self.bind_site_if_needed(&destination, entry.url());
        let mut pending = RenderHost::new(
            self.profile.next_render_host_id(),
            destination,
            self.renderer_sender.clone(),
        );
        pending.init_renderer()?;
        self.delegate.notify_pending_render_host_created(pending.handle());

        if !self.active.is_alive() {
            // Nobody to ask for permission, show the new host right away.
            debug!(
                "{} has no renderer, promoting {} directly.",
                self.active.id(),
                pending.id()
            );
            pending.navigate(entry)?;
            let handle = pending.handle();
            self.swap_in(pending);
            return Ok(handle);
        }

        self.active.stop();
        pending.set_navigations_suspended(true);
        pending.navigate(entry)?;
        self.active.fire_before_unload();

        let handle = pending.handle();
        info!(
            "Cross-site navigation to {} from {} to {}.",
            entry.url().debug_compact(),
            self.active.id(),
            handle.id
        );
        self.transition = Transition::AwaitingBeforeUnload(PendingTransition {
            host: pending,
            cross_site_request: None,
            handshake_started: Instant::now(),
        });
        Ok(handle)
    }

    /// The active page's before-unload handler answered.
    pub fn before_unload_result(&mut self, proceed: bool) {
        match mem::replace(&mut self.transition, Transition::Idle) {
            Transition::AwaitingBeforeUnload(mut pending) => {
                if !proceed {
                    debug!("Before-unload refused, staying on {}.", self.active.id());
                    self.cancel_transition(pending);
                    return;
                }
                pending.host.set_navigations_suspended(false);
                debug!("Before-unload approved, {} is loading.", pending.host.id());
                self.transition = Transition::AwaitingCrossSiteResponse(pending);
            },
            other => {
                self.transition = other;
                self.protocol_violation(format!("before-unload result ({proceed})"));
            },
        }
    }

    /// The network layer holds back a response for the pending host until the active
    /// page has unloaded.
    pub fn cross_site_response_ready(&mut self, new_process_id: ProcessId, new_request_id: RequestId) {
        let active_is_alive = self.active.is_alive();
        let Transition::AwaitingCrossSiteResponse(pending) = &mut self.transition else {
            self.protocol_violation(format!("cross-site response {new_request_id}"));
            return;
        };
        if pending.host.process_id() != Some(new_process_id) {
            let message = format!(
                "cross-site response {new_request_id} for {new_process_id}, pending host is in {:?}",
                pending.host.process_id()
            );
            self.protocol_violation(message);
            return;
        }

        pending.cross_site_request = Some((new_process_id, new_request_id));
        pending.handshake_started = Instant::now();
        if active_is_alive {
            self.active.close_page(new_process_id, new_request_id);
        } else {
            // There is no page left to unload.
            self.release_cross_site_response();
        }
    }

    /// The active page has unloaded after a `ClosePage`.
    pub fn unload_ack(&mut self, host: RenderHostId) {
        if host != self.active.id() {
            self.protocol_violation(format!("unload acknowledgement from {host}"));
            return;
        }
        self.release_cross_site_response();
    }

    /// A render host committed a main frame navigation.
    pub fn main_frame_committed(&mut self, host: RenderHostId, url: WardenUrl, page_id: i64) {
        let pending_id = self.transition.pending().map(|pending| pending.host.id());

        if pending_id == Some(host) {
            match mem::replace(&mut self.transition, Transition::Idle) {
                Transition::AwaitingBeforeUnload(pending) => {
                    self.transition = Transition::AwaitingBeforeUnload(pending);
                    self.protocol_violation(format!("commit from {host} before it could navigate"));
                },
                Transition::AwaitingCrossSiteResponse(mut pending) |
                Transition::ReadyToCommit(mut pending) => {
                    pending.host.did_commit(url, page_id);
                    self.commit(pending);
                },
                Transition::Idle => {},
            }
            return;
        }

        if host != self.active.id() {
            self.protocol_violation(format!("commit from unknown {host}"));
            return;
        }

        self.active.did_commit(url, page_id);
        if self.transition.state() != TransitionState::Idle {
            // The user navigated the old page again before the new one showed up.
            debug!("{} committed during a transition, abandoning it.", host);
            self.cancel_pending();
        }
    }

    /// The hang monitor reports that `host` stopped answering.
    pub fn renderer_unresponsive(&mut self, host: RenderHostId) {
        // Until a response is held back there is no handshake to force, and the hang
        // is reported like any other.
        if host == self.active.id() && self.outstanding_handshake().is_some() {
            warn!("{}", ProcessModelError::Timeout(host));
            self.force_transition_forward();
            return;
        }

        let Some(render_host) = self.render_host_mut(host) else {
            debug!("Ignoring unresponsive {host}, it is not part of this tab.");
            return;
        };
        render_host.set_unresponsive(true);
        let handle = render_host.handle();
        self.delegate.notify_renderer_unresponsive(handle);
    }

    pub fn renderer_responsive(&mut self, host: RenderHostId) {
        let Some(render_host) = self.render_host_mut(host) else {
            return;
        };
        if !render_host.is_unresponsive() {
            return;
        }
        render_host.set_unresponsive(false);
        let handle = render_host.handle();
        self.delegate.notify_renderer_responsive(handle);
    }

    /// Asked by the embedder when the active renderer hangs. Outside of a transition
    /// the tab should be closed. During one, the transition is forced forward instead,
    /// and the tab survives on the new page.
    pub fn should_close_tab_on_unresponsive_renderer(&mut self) -> bool {
        if self.transition.state() == TransitionState::Idle {
            return true;
        }
        warn!("{}", ProcessModelError::Timeout(self.active.id()));
        self.force_transition_forward();
        false
    }

    /// The process `process_id` went away.
    pub fn process_exited(&mut self, process_id: ProcessId) {
        self.profile.registry().process_exited(process_id);

        let pending_crashed = self
            .transition
            .pending()
            .is_some_and(|pending| pending.host.process_id() == Some(process_id));
        if pending_crashed {
            warn!("Pending renderer in {process_id} exited, abandoning the transition.");
            self.cancel_pending();
        }

        if self.active.process_id() != Some(process_id) {
            return;
        }
        self.active.renderer_exited();

        let Some(mut pending) = mem::replace(&mut self.transition, Transition::Idle).into_pending()
        else {
            debug!("Active renderer in {process_id} exited, it restarts on next navigation.");
            return;
        };
        info!("Active renderer in {process_id} exited mid-transition, committing {}.", pending.host.id());
        // Nothing is left to wait for: deliver what was being held back.
        pending.host.set_navigations_suspended(false);
        if let Some((new_process_id, new_request_id)) = pending.cross_site_request.take() {
            self.send_network(NetworkMsg::ResumeCrossSiteResponse {
                process_id: new_process_id,
                request_id: new_request_id,
            });
        }
        self.commit(pending);
    }

    pub fn stop(&mut self) {
        self.active.stop();
        if let Some(pending) = self.transition.pending() {
            pending.host.stop();
        }
    }

    pub fn set_loading(&mut self, is_loading: bool) {
        self.active.set_loading(is_loading);
        if let Some(pending) = self.transition.pending_mut() {
            pending.host.set_loading(is_loading);
        }
    }

    /// Dispatch a signal received from another thread.
    pub fn handle_signal(&mut self, signal: NavigationSignal) {
        match signal {
            NavigationSignal::BeforeUnloadResult { proceed } => self.before_unload_result(proceed),
            NavigationSignal::CrossSiteResponseReady {
                new_process_id,
                new_request_id,
            } => self.cross_site_response_ready(new_process_id, new_request_id),
            NavigationSignal::UnloadAck(host) => self.unload_ack(host),
            NavigationSignal::MainFrameCommitted { host, url, page_id } => {
                self.main_frame_committed(host, url, page_id)
            },
            NavigationSignal::RendererUnresponsive(host) => self.renderer_unresponsive(host),
            NavigationSignal::RendererResponsive(host) => self.renderer_responsive(host),
            NavigationSignal::ProcessExited(process_id) => self.process_exited(process_id),
        }
    }

    /// The site instance that should render `entry`, and whether reaching it requires
    /// a new browsing instance.
    fn destination_for(&self, entry: &NavigationEntry) -> (Rc<SiteInstance>, bool) {
        let current = self.active.site_instance();
        let url = entry.url();

        let related = if let Some(instance) = entry.site_instance() {
            // A history navigation goes back to its own instance.
            if entry.is_restored() && !instance.has_site() {
                instance.set_site(url);
            }
            instance.clone()
        } else if !current.has_site() && !current.has_related(url) {
            // A tab that has not shown a real page yet uses its current instance.
            current.clone()
        } else if self
            .active
            .committed_url()
            .is_some_and(|committed_url| is_same_site(committed_url, url))
        {
            current.clone()
        } else {
            current.get_related(url)
        };

        if !self.requires_swap(entry, &related) {
            return (related, false);
        }
        debug!(
            "Navigation to {} changes privileges, using a new browsing instance.",
            url.debug_compact()
        );
        let browsing_instance = self
            .profile
            .new_browsing_instance_with_mode(current.browsing_instance().process_mode());
        let instance = browsing_instance.get_or_create_site_instance(url);
        instance.set_principal_class(entry.principal_class());
        (instance, true)
    }

    /// A new process is needed when the privilege tier or a privileged rendering mode
    /// changes, even within one site. Site instances keep the principal class they
    /// were first used with; only the never shown instance of a fresh tab takes on
    /// the entry's.
    fn requires_swap(&self, entry: &NavigationEntry, destination: &Rc<SiteInstance>) -> bool {
        let fresh_tab = !self.active.is_alive() && !self.active.site_instance().has_site();
        if fresh_tab && Rc::ptr_eq(destination, self.active.site_instance()) {
            destination.set_principal_class(entry.principal_class());
            return false;
        }
        entry.principal_class() != self.active.site_instance().principal_class() ||
            entry.principal_class() != destination.principal_class() ||
            entry.rendering_mode() != self.active.rendering_mode()
    }

    fn bind_site_if_needed(&self, instance: &Rc<SiteInstance>, url: &WardenUrl) {
        if !instance.has_site() && !url.is_hostless() {
            instance.set_site(url);
        }
    }

    /// Hand the held back response to the pending host after the active page unloaded.
    fn release_cross_site_response(&mut self) {
        match mem::replace(&mut self.transition, Transition::Idle) {
            Transition::AwaitingCrossSiteResponse(pending) => {
                let Some((process_id, request_id)) = pending.cross_site_request else {
                    self.transition = Transition::AwaitingCrossSiteResponse(pending);
                    self.protocol_violation("unload with no held back response".into());
                    return;
                };
                self.send_network(NetworkMsg::ResumeCrossSiteResponse {
                    process_id,
                    request_id,
                });
                debug!("Released {request_id} to {}.", pending.host.id());
                self.transition = Transition::ReadyToCommit(pending);
            },
            other => {
                self.transition = other;
                self.protocol_violation("unload acknowledgement".into());
            },
        }
    }

    /// The transition whose next step is an answer from the active renderer.
    fn outstanding_handshake(&self) -> Option<&PendingTransition> {
        match &self.transition {
            Transition::AwaitingBeforeUnload(pending) => Some(pending),
            Transition::AwaitingCrossSiteResponse(pending)
                if pending.cross_site_request.is_some() =>
            {
                Some(pending)
            },
            _ => None,
        }
    }

    /// The active renderer stopped answering during a handshake: act as if it had
    /// answered.
    fn force_transition_forward(&mut self) {
        if self.outstanding_handshake().is_none() {
            debug!("Nothing to force forward in {:?}.", self.transition.state());
            return;
        }
        match self.transition.state() {
            TransitionState::AwaitingBeforeUnload => self.before_unload_result(true),
            _ => self.release_cross_site_response(),
        }
    }

    /// Make the pending host active.
    fn commit(&mut self, pending: PendingTransition) {
        self.transition = Transition::Idle;
        self.swap_in(pending.host);
    }

    fn swap_in(&mut self, new_active: RenderHost) {
        let old_active = mem::replace(&mut self.active, new_active);
        let old = old_active.initialized_handle();
        info!("{} is now active.", self.active.id());
        drop(old_active);
        self.delegate
            .notify_active_render_host_changed(old, self.active.handle());
    }

    fn cancel_pending(&mut self) {
        if let Some(pending) = mem::replace(&mut self.transition, Transition::Idle).into_pending() {
            self.cancel_transition(pending);
        }
    }

    fn cancel_transition(&mut self, pending: PendingTransition) {
        let handle = pending.host.handle();
        debug!("Canceling pending {}.", handle.id);
        if let Some((process_id, request_id)) = pending.cross_site_request {
            self.send_network(NetworkMsg::CancelCrossSiteResponse {
                process_id,
                request_id,
            });
        }
        drop(pending);
        self.delegate.notify_pending_render_host_canceled(handle);
    }

    fn render_host_mut(&mut self, id: RenderHostId) -> Option<&mut RenderHost> {
        if self.active.id() == id {
            return Some(&mut self.active);
        }
        self.transition
            .pending_mut()
            .map(|pending| &mut pending.host)
            .filter(|host| host.id() == id)
    }

    fn send_network(&self, msg: NetworkMsg) {
        if let Err(error) = self.network_sender.send(msg) {
            warn!("Network channel closed ({error}).");
        }
    }

    fn protocol_violation(&self, what: String) {
        warn!(
            "{} (in {:?}).",
            ProcessModelError::ProtocolViolation(what),
            self.transition.state()
        );
    }
}

impl Drop for NavigationManager {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
