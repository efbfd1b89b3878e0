/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! The vocabulary shared by the process model and the subsystems around it: the
//! renderer processes it drives, the network layer that buffers cross-site responses,
//! and the embedder that shows the active render host.

use std::fmt;

use base::id::{ProcessId, RenderHostId, RequestId, SiteInstanceId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use warden_url::WardenUrl;

/// The privilege tier of the content a process hosts. Processes never host content
/// of more than one principal class.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum PrincipalClass {
    #[default]
    Normal,
    /// Browser UI pages that have access to privileged bindings.
    ElevatedUi,
    Extension,
}

/// Rendering modes that change what a page may do, and therefore require a fresh
/// renderer when they change between two navigations.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum RenderingMode {
    #[default]
    Normal,
    ViewSource,
}

/// How a navigation was initiated.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum TransitionType {
    #[default]
    Link,
    Typed,
    AutoBookmark,
    Generated,
    StartPage,
    FormSubmit,
    Reload,
    Keyword,
}

/// Scopes process sharing under process-per-site: two site instances only share a
/// process when they belong to the same partition.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct PartitionKey(Uuid);

impl PartitionKey {
    /// A partition that is equal only to itself.
    pub fn new_unique() -> PartitionKey {
        PartitionKey(Uuid::new_v4())
    }

    /// A stable partition derived from a profile name.
    pub fn from_name(name: &str) -> PartitionKey {
        PartitionKey(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()))
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "Partition({})", self.0.simple())
    }
}

/// What collaborators hold on to for a render host: enough to address it and the
/// process it runs in, without any ownership.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct RenderHostHandle {
    pub id: RenderHostId,
    /// `None` until the host's renderer has been started, and again after it exited.
    pub process_id: Option<ProcessId>,
    pub site_instance_id: SiteInstanceId,
}

/// The parameters of a navigation command delivered to a renderer.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct NavigateParams {
    pub url: WardenUrl,
    pub transition_type: TransitionType,
    pub rendering_mode: RenderingMode,
    /// The page id the renderer should start allocating after.
    pub max_page_id: i64,
}

/// Commands to renderer processes, addressed by render host.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum RendererMsg {
    /// Load a URL in the main frame.
    Navigate(RenderHostId, NavigateParams),
    /// Stop any in-flight load.
    Stop(RenderHostId),
    /// Run the page's before-unload handler and answer with
    /// [`NavigationSignal::BeforeUnloadResult`].
    FirePageBeforeUnload(RenderHostId),
    /// Run the page's unload handler because a response for another process is
    /// waiting; answer with [`NavigationSignal::UnloadAck`].
    ClosePage {
        host: RenderHostId,
        new_process_id: ProcessId,
        new_request_id: RequestId,
    },
    /// The render host has been torn down.
    Close(RenderHostId),
}

/// Commands to the network layer about responses it holds back during a cross-site
/// transition.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum NetworkMsg {
    /// The outgoing page has unloaded; hand the buffered response to its new process.
    ResumeCrossSiteResponse {
        process_id: ProcessId,
        request_id: RequestId,
    },
    /// The transition was abandoned; drop the buffered response.
    CancelCrossSiteResponse {
        process_id: ProcessId,
        request_id: RequestId,
    },
}

/// Signals delivered to a tab's navigation manager. Each maps onto one typed
/// callback on the manager; this enum exists so that collaborators on other threads
/// can post them through a channel.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum NavigationSignal {
    BeforeUnloadResult {
        proceed: bool,
    },
    CrossSiteResponseReady {
        new_process_id: ProcessId,
        new_request_id: RequestId,
    },
    UnloadAck(RenderHostId),
    MainFrameCommitted {
        host: RenderHostId,
        url: WardenUrl,
        page_id: i64,
    },
    RendererUnresponsive(RenderHostId),
    RendererResponsive(RenderHostId),
    ProcessExited(ProcessId),
}
