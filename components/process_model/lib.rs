/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

#![deny(unsafe_code)]

//! Decides which renderer process hosts every page, and moves a tab from one
//! renderer to another when it navigates across sites.
//!
//! The pieces, leaf first:
//!
//! - [`ProcessHost`] and [`ProcessRegistry`]: the process-wide table of renderer
//!   processes. This is the only state that is shared between threads.
//! - [`SiteInstance`] and [`BrowsingInstance`]: which pages may share a process.
//! - [`RenderHost`]: one page's renderer, as seen from the browser.
//! - [`NavigationManager`]: the per-tab state machine that owns the active render
//!   host and, during a cross-site transition, the pending one.

mod browsing_instance;
mod error;
mod navigation_delegate;
mod navigation_entry;
mod navigation_manager;
mod process_host;
mod process_policy;
mod process_registry;
mod profile;
mod render_host;
mod site_instance;

pub use crate::browsing_instance::BrowsingInstance;
pub use crate::error::{LaunchError, NavigateError, ProcessModelError};
pub use crate::navigation_delegate::{DefaultNavigationDelegate, NavigationDelegate};
pub use crate::navigation_entry::NavigationEntry;
pub use crate::navigation_manager::{InitialNavigationState, NavigationManager, TransitionState};
pub use crate::process_host::{InProcessLauncher, ProcessHost, ProcessLauncher};
pub use crate::process_policy::ProcessRequest;
pub use crate::process_registry::{ProcessRegistry, SiteProcessKey};
pub use crate::profile::Profile;
pub use crate::render_host::RenderHost;
pub use crate::site_instance::SiteInstance;
