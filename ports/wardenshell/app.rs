/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! One tab driven through a list of URLs. The app plays the parts of the embedder
//! and of the network layer: it announces the held back response of every cross-site
//! navigation and commits pages once they are allowed to show.

use std::rc::Rc;
use std::thread::{self, JoinHandle};

use base::id::{IdSequence, ProcessId, RenderHostId, RequestId};
use crossbeam_channel::{Receiver, at, never, select, unbounded};
use log::{error, info, warn};
use process_model::{
    InProcessLauncher, InitialNavigationState, NavigationDelegate, NavigationEntry,
    NavigationManager, Profile, TransitionState,
};
use process_traits::{
    NavigationSignal, PartitionKey, RenderHostHandle, RenderingMode, TransitionType,
};
use warden_config::prefs::Preferences;
use warden_url::WardenUrl;

use crate::scripted_renderer::ScriptedRenderer;

/// Logs what an embedder would show.
struct ShellDelegate;

impl NavigationDelegate for ShellDelegate {
    fn notify_active_render_host_changed(&self, old: Option<RenderHostHandle>, new: RenderHostHandle) {
        match old {
            Some(old) => info!(
                "Active render host changed from {} ({:?}) to {} ({:?}).",
                old.id, old.process_id, new.id, new.process_id
            ),
            None => info!(
                "Active render host changed to {} ({:?}).",
                new.id, new.process_id
            ),
        }
    }

    fn notify_pending_render_host_created(&self, pending: RenderHostHandle) {
        info!("Pending render host {} in {:?}.", pending.id, pending.process_id);
    }

    fn notify_pending_render_host_canceled(&self, pending: RenderHostHandle) {
        info!("Pending render host {} canceled.", pending.id);
    }

    fn notify_renderer_unresponsive(&self, host: RenderHostHandle) {
        warn!("{} is not responding.", host.id);
    }

    fn notify_renderer_responsive(&self, host: RenderHostHandle) {
        info!("{} is responding again.", host.id);
    }
}

pub(crate) struct App {
    profile: Rc<Profile>,
    /// Always `Some` until the app shuts down.
    manager: Option<NavigationManager>,
    signals: Receiver<NavigationSignal>,
    process_exits: Receiver<ProcessId>,
    request_ids: IdSequence<RequestId>,
    last_page_id: i64,
    renderer_thread: Option<JoinHandle<()>>,
}

impl App {
    pub(crate) fn new(preferences: Preferences) -> App {
        let profile = Profile::with_launcher(
            PartitionKey::from_name("default"),
            preferences,
            Box::new(InProcessLauncher),
        );
        let process_exits = profile.registry().subscribe_process_exits();

        let (renderer_sender, renderer_receiver) = unbounded();
        let (network_sender, network_receiver) = unbounded();
        let (signal_sender, signals) = unbounded();
        let renderer_thread =
            match ScriptedRenderer::start(renderer_receiver, network_receiver, signal_sender) {
                Ok(handle) => Some(handle),
                Err(error) => {
                    error!("Couldn't start the renderer thread: {error}");
                    None
                },
            };

        let manager = NavigationManager::new(InitialNavigationState {
            profile: profile.clone(),
            renderer_sender,
            network_sender,
            delegate: Rc::new(ShellDelegate),
            site_instance: None,
        });

        App {
            profile,
            manager: Some(manager),
            signals,
            process_exits,
            request_ids: IdSequence::new(),
            last_page_id: 0,
            renderer_thread,
        }
    }

    pub(crate) fn run(mut self, urls: &[WardenUrl]) {
        for url in urls {
            self.load(url);
            if url.as_str() == "about:crash" {
                self.crash_active_renderer();
            }
        }
        self.shutdown();
    }

    fn load(&mut self, url: &WardenUrl) {
        let Some(manager) = self.manager.as_mut() else {
            return;
        };
        let entry = entry_for(url);
        let target = match manager.navigate(&entry) {
            Ok(handle) => handle,
            Err(error) => {
                error!("Couldn't navigate to {}: {error}", url.debug_compact());
                return;
            },
        };

        let mut response_announced = false;
        let mut committed = false;
        loop {
            let Some(manager) = self.manager.as_mut() else {
                return;
            };
            match manager.transition_state() {
                TransitionState::Idle => break,
                TransitionState::ReadyToCommit => {
                    self.commit(target.id, entry.url());
                    committed = true;
                    continue;
                },
                TransitionState::AwaitingCrossSiteResponse if !response_announced => {
                    response_announced = true;
                    if let Some(process_id) = target.process_id {
                        let request_id = self.request_ids.next_id();
                        info!("Network: holding back {request_id} for {process_id}.");
                        manager.cross_site_response_ready(process_id, request_id);
                    }
                    continue;
                },
                _ => {},
            }
            if !self.wait_for_event() {
                return;
            }
        }

        let Some(manager) = self.manager.as_ref() else {
            return;
        };
        if manager.active_render_host().id != target.id {
            info!("Navigation to {} was abandoned.", url.debug_compact());
        } else if !committed {
            self.commit(target.id, entry.url());
        }
    }

    /// Handle one signal, process exit, or handshake timeout. Returns false when the
    /// renderer thread is gone.
    fn wait_for_event(&mut self) -> bool {
        let Some(manager) = self.manager.as_mut() else {
            return false;
        };
        let deadline = manager
            .handshake_deadline()
            .map(at)
            .unwrap_or_else(never);
        select! {
            recv(self.signals) -> signal => {
                match signal {
                    Ok(signal) => manager.handle_signal(signal),
                    Err(_disconnected) => {
                        warn!("Renderer thread went away.");
                        return false;
                    },
                }
            }
            recv(self.process_exits) -> process_id => {
                if let Ok(process_id) = process_id {
                    manager.process_exited(process_id);
                }
            }
            recv(deadline) -> _ => {
                let active = manager.active_render_host().id;
                manager.renderer_unresponsive(active);
            }
        }
        true
    }

    fn commit(&mut self, host: RenderHostId, url: &WardenUrl) {
        let Some(manager) = self.manager.as_mut() else {
            return;
        };
        self.last_page_id += 1;
        manager.main_frame_committed(host, url.clone(), self.last_page_id);
    }

    /// Kill the active renderer's process from another thread, the way a process
    /// watcher would report it.
    fn crash_active_renderer(&mut self) {
        let Some(manager) = self.manager.as_mut() else {
            return;
        };
        let Some(process_id) = manager.active_render_host().process_id else {
            return;
        };
        let registry = self.profile.registry().clone();
        let watcher = thread::Builder::new()
            .name("ProcessWatcher".to_owned())
            .spawn(move || registry.process_exited(process_id));
        match watcher {
            Ok(watcher) => {
                if watcher.join().is_err() {
                    warn!("Process watcher panicked.");
                }
            },
            Err(error) => {
                warn!("Couldn't start the process watcher: {error}");
                return;
            },
        }
        for process_id in self.process_exits.try_iter() {
            manager.process_exited(process_id);
        }
    }

    fn shutdown(&mut self) {
        // Dropping the tab closes its render hosts and the channels to the renderer.
        self.manager.take();
        self.profile.shutdown();
        if let Some(renderer_thread) = self.renderer_thread.take() {
            if renderer_thread.join().is_err() {
                warn!("Renderer thread panicked.");
            }
        }
    }
}

/// `view-source:` URLs show their inner URL in view source mode.
fn entry_for(url: &WardenUrl) -> NavigationEntry {
    if url.scheme() == "view-source" {
        if let Ok(inner) = WardenUrl::parse(url.path()) {
            return NavigationEntry::new(inner)
                .with_transition_type(TransitionType::Typed)
                .with_rendering_mode(RenderingMode::ViewSource);
        }
    }
    NavigationEntry::new(url.clone()).with_transition_type(TransitionType::Typed)
}
