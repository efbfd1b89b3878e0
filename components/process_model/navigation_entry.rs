/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::rc::Rc;

use process_traits::{PrincipalClass, RenderingMode, TransitionType};
use warden_url::WardenUrl;

use crate::site_instance::SiteInstance;

/// One navigation, as requested by the tab's session history.
#[derive(Clone, Debug)]
pub struct NavigationEntry {
    url: WardenUrl,
    /// Set for history navigations, which must go back to the instance the page
    /// was first loaded in.
    site_instance: Option<Rc<SiteInstance>>,
    transition_type: TransitionType,
    /// The entry was restored from a previous session.
    restored: bool,
    principal_class: PrincipalClass,
    rendering_mode: RenderingMode,
}

impl NavigationEntry {
    pub fn new(url: WardenUrl) -> NavigationEntry {
        NavigationEntry {
            url,
            site_instance: None,
            transition_type: TransitionType::default(),
            restored: false,
            principal_class: PrincipalClass::default(),
            rendering_mode: RenderingMode::default(),
        }
    }

    pub fn with_site_instance(mut self, site_instance: Rc<SiteInstance>) -> Self {
        self.site_instance = Some(site_instance);
        self
    }

    pub fn with_transition_type(mut self, transition_type: TransitionType) -> Self {
        self.transition_type = transition_type;
        self
    }

    pub fn with_principal_class(mut self, principal_class: PrincipalClass) -> Self {
        self.principal_class = principal_class;
        self
    }

    pub fn with_rendering_mode(mut self, rendering_mode: RenderingMode) -> Self {
        self.rendering_mode = rendering_mode;
        self
    }

    pub fn restored(mut self) -> Self {
        self.restored = true;
        self
    }

    pub fn url(&self) -> &WardenUrl {
        &self.url
    }

    pub fn site_instance(&self) -> Option<&Rc<SiteInstance>> {
        self.site_instance.as_ref()
    }

    pub fn transition_type(&self) -> TransitionType {
        self.transition_type
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn principal_class(&self) -> PrincipalClass {
        self.principal_class
    }

    pub fn rendering_mode(&self) -> RenderingMode {
        self.rendering_mode
    }
}
