/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use process_traits::RenderHostHandle;

/// Receives the notifications a [`NavigationManager`](crate::NavigationManager) sends to
/// the embedder. Every method has an empty default, so implementations only override
/// what they care about. Methods are called synchronously on the tab's control thread.
pub trait NavigationDelegate {
    /// The render host shown to the user changed. `old` is `None` when the previous
    /// host never had a renderer. Sent exactly once per swap.
    fn notify_active_render_host_changed(
        &self,
        _old: Option<RenderHostHandle>,
        _new: RenderHostHandle,
    ) {
    }

    /// A cross-site transition started and created `pending`.
    fn notify_pending_render_host_created(&self, _pending: RenderHostHandle) {}

    /// The pending host was abandoned without ever becoming active.
    fn notify_pending_render_host_canceled(&self, _pending: RenderHostHandle) {}

    /// `host` stopped answering while no transition was waiting on it. The embedder
    /// may offer to close the tab.
    fn notify_renderer_unresponsive(&self, _host: RenderHostHandle) {}

    /// `host` answers again.
    fn notify_renderer_responsive(&self, _host: RenderHostHandle) {}
}

pub struct DefaultNavigationDelegate;
impl NavigationDelegate for DefaultNavigationDelegate {}
