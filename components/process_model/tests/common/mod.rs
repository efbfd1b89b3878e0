/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use base::id::ProcessId;
use crossbeam_channel::{Receiver, unbounded};
use process_model::{
    InitialNavigationState, LaunchError, NavigationDelegate, NavigationEntry, NavigationManager,
    ProcessLauncher, ProcessRegistry, Profile,
};
use process_traits::{NetworkMsg, PartitionKey, PrincipalClass, RenderHostHandle, RendererMsg};
use warden_config::prefs::{Preferences, ProcessMode};
use warden_url::WardenUrl;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn url(input: &str) -> WardenUrl {
    WardenUrl::from_str(input).expect("test URLs are valid")
}

pub fn entry(input: &str) -> NavigationEntry {
    NavigationEntry::new(url(input))
}

/// Counts launches and terminations, and fails every launch once `set_failing` is
/// called. Clones share their counters.
#[derive(Clone, Default)]
pub struct TestLauncher {
    state: Arc<LauncherState>,
}

#[derive(Default)]
struct LauncherState {
    launched: AtomicUsize,
    terminated: AtomicUsize,
    failing: AtomicBool,
}

impl TestLauncher {
    pub fn launched(&self) -> usize {
        self.state.launched.load(Ordering::SeqCst)
    }

    pub fn terminated(&self) -> usize {
        self.state.terminated.load(Ordering::SeqCst)
    }

    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }
}

impl ProcessLauncher for TestLauncher {
    fn launch(&self, id: ProcessId, _principal_class: PrincipalClass) -> Result<(), LaunchError> {
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(LaunchError::new(format!("refusing to start {id}")));
        }
        self.state.launched.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn terminate(&self, _id: ProcessId) {
        self.state.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn profile_with_mode(mode: ProcessMode) -> (Rc<Profile>, TestLauncher) {
    let prefs = Preferences {
        process_model: mode,
        ..Preferences::default()
    };
    profile_with_prefs(prefs)
}

pub fn profile_with_prefs(prefs: Preferences) -> (Rc<Profile>, TestLauncher) {
    init_logging();
    let launcher = TestLauncher::default();
    let registry = Arc::new(ProcessRegistry::new(Box::new(launcher.clone())));
    let profile = Profile::new(PartitionKey::from_name("test"), prefs, registry);
    (profile, launcher)
}

#[derive(Clone, Debug, PartialEq)]
pub enum DelegateEvent {
    ActiveChanged(Option<RenderHostHandle>, RenderHostHandle),
    PendingCreated(RenderHostHandle),
    PendingCanceled(RenderHostHandle),
    Unresponsive(RenderHostHandle),
    Responsive(RenderHostHandle),
}

#[derive(Default)]
pub struct RecordingDelegate {
    pub events: RefCell<Vec<DelegateEvent>>,
}

impl RecordingDelegate {
    pub fn active_changes(&self) -> Vec<(Option<RenderHostHandle>, RenderHostHandle)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                DelegateEvent::ActiveChanged(old, new) => Some((*old, *new)),
                _ => None,
            })
            .collect()
    }

    pub fn cancellations(&self) -> Vec<RenderHostHandle> {
        self.events
            .borrow()
            .iter()
            .filter_map(|event| match event {
                DelegateEvent::PendingCanceled(handle) => Some(*handle),
                _ => None,
            })
            .collect()
    }

    pub fn pending_created(&self) -> usize {
        self.events
            .borrow()
            .iter()
            .filter(|event| matches!(event, DelegateEvent::PendingCreated(_)))
            .count()
    }
}

impl NavigationDelegate for RecordingDelegate {
    fn notify_active_render_host_changed(&self, old: Option<RenderHostHandle>, new: RenderHostHandle) {
        self.events
            .borrow_mut()
            .push(DelegateEvent::ActiveChanged(old, new));
    }

    fn notify_pending_render_host_created(&self, pending: RenderHostHandle) {
        self.events
            .borrow_mut()
            .push(DelegateEvent::PendingCreated(pending));
    }

    fn notify_pending_render_host_canceled(&self, pending: RenderHostHandle) {
        self.events
            .borrow_mut()
            .push(DelegateEvent::PendingCanceled(pending));
    }

    fn notify_renderer_unresponsive(&self, host: RenderHostHandle) {
        self.events
            .borrow_mut()
            .push(DelegateEvent::Unresponsive(host));
    }

    fn notify_renderer_responsive(&self, host: RenderHostHandle) {
        self.events.borrow_mut().push(DelegateEvent::Responsive(host));
    }
}

/// A tab together with the far ends of its channels.
pub struct TestTab {
    pub manager: NavigationManager,
    pub delegate: Rc<RecordingDelegate>,
    pub renderer: Receiver<RendererMsg>,
    pub network: Receiver<NetworkMsg>,
}

impl TestTab {
    pub fn new(profile: &Rc<Profile>) -> TestTab {
        let (renderer_sender, renderer) = unbounded();
        let (network_sender, network) = unbounded();
        let delegate = Rc::new(RecordingDelegate::default());
        let manager = NavigationManager::new(InitialNavigationState {
            profile: profile.clone(),
            renderer_sender,
            network_sender,
            delegate: delegate.clone(),
            site_instance: None,
        });
        TestTab {
            manager,
            delegate,
            renderer,
            network,
        }
    }

    /// Everything sent to renderers since the last call.
    pub fn renderer_messages(&self) -> Vec<RendererMsg> {
        self.renderer.try_iter().collect()
    }

    pub fn network_messages(&self) -> Vec<NetworkMsg> {
        self.network.try_iter().collect()
    }

    /// Navigate and commit right away, as a renderer would for a same-site load.
    pub fn load(&mut self, input: &str, page_id: i64) -> RenderHostHandle {
        let handle = self
            .manager
            .navigate(&entry(input))
            .expect("navigation starts");
        self.manager
            .main_frame_committed(handle.id, url(input), page_id);
        handle
    }
}
