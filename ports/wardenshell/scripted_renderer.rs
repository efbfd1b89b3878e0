/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Stands in for every renderer process and for the network layer. Renderers answer
//! the before-unload and unload handshakes right away, except for pages that
//! navigated to `about:hang`, which never answer anything again.

use std::io;
use std::thread::{self, JoinHandle};

use base::id::RenderHostId;
use crossbeam_channel::{Receiver, Sender, select};
use log::{debug, info, warn};
use process_traits::{NavigationSignal, NetworkMsg, RendererMsg};
use rustc_hash::FxHashSet;

pub(crate) struct ScriptedRenderer {
    signals: Sender<NavigationSignal>,
    hung: FxHashSet<RenderHostId>,
}

impl ScriptedRenderer {
    pub(crate) fn start(
        renderer_receiver: Receiver<RendererMsg>,
        network_receiver: Receiver<NetworkMsg>,
        signals: Sender<NavigationSignal>,
    ) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name("ScriptedRenderer".to_owned())
            .spawn(move || {
                let mut renderer = ScriptedRenderer {
                    signals,
                    hung: FxHashSet::default(),
                };
                renderer.run(renderer_receiver, network_receiver);
            })
    }

    fn run(&mut self, renderer_receiver: Receiver<RendererMsg>, network_receiver: Receiver<NetworkMsg>) {
        loop {
            select! {
                recv(renderer_receiver) -> msg => {
                    match msg {
                        Ok(msg) => {
                            if !self.handle_renderer_msg(msg) {
                                break;
                            }
                        },
                        Err(_disconnected) => {
                            debug!("Renderer channel closed, exiting.");
                            break;
                        },
                    }
                }
                recv(network_receiver) -> msg => {
                    match msg {
                        Ok(NetworkMsg::ResumeCrossSiteResponse { process_id, request_id }) => {
                            info!("Network: delivering {request_id} to {process_id}.");
                        },
                        Ok(NetworkMsg::CancelCrossSiteResponse { process_id, request_id }) => {
                            info!("Network: dropping {request_id} for {process_id}.");
                        },
                        Err(_disconnected) => {
                            debug!("Network channel closed, exiting.");
                            break;
                        },
                    }
                }
            }
        }
    }

    /// Returns false once the tab is no longer listening.
    fn handle_renderer_msg(&mut self, msg: RendererMsg) -> bool {
        match msg {
            RendererMsg::Navigate(host, params) => {
                info!("{host}: loading {}.", params.url.debug_compact());
                if params.url.as_str() == "about:hang" {
                    warn!("{host} stops answering.");
                    self.hung.insert(host);
                }
                true
            },
            RendererMsg::Stop(host) => {
                debug!("{host}: stop.");
                true
            },
            RendererMsg::FirePageBeforeUnload(host) => {
                if self.hung.contains(&host) {
                    debug!("{host} is hung, ignoring before-unload.");
                    return true;
                }
                self.send(NavigationSignal::BeforeUnloadResult { proceed: true })
            },
            RendererMsg::ClosePage {
                host,
                new_process_id,
                new_request_id,
            } => {
                if self.hung.contains(&host) {
                    debug!("{host} is hung, ignoring close for {new_request_id}.");
                    return true;
                }
                debug!("{host}: unloading for {new_request_id} in {new_process_id}.");
                self.send(NavigationSignal::UnloadAck(host))
            },
            RendererMsg::Close(host) => {
                debug!("{host}: closed.");
                self.hung.remove(&host);
                true
            },
        }
    }

    fn send(&self, signal: NavigationSignal) -> bool {
        self.signals.send(signal).is_ok()
    }
}
