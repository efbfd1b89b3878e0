/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Site identity: the unit at which pages are isolated into renderer processes.

use std::fmt;

use serde::{Deserialize, Serialize};
use url::Host;

use crate::WardenUrl;
use crate::pub_domains::reg_host;

/// Script URLs run in whatever document they are loaded into, so they belong to
/// every site.
pub const JAVASCRIPT_SCHEME: &str = "javascript";

/// Placeholder URLs used to crash or hang a renderer on purpose. They are handled in
/// whatever process is current, so they are treated as matching any site.
pub const DIAGNOSTIC_URLS: &[&str] = &["about:crash", "about:hang", "about:shorthang", "about:kill"];

/// A scheme plus a registrable domain (or the full host when there is no registrable
/// domain). Two URLs with the same site may be rendered by the same process.
///
/// Ports never take part in site identity, pages on different ports of one host can
/// still reach each other through `document.domain`.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Site {
    scheme: String,
    host: String,
}

impl Site {
    pub fn new(scheme: impl Into<String>, registrable_domain_or_host: impl Into<String>) -> Site {
        Site {
            scheme: scheme.into(),
            host: registrable_domain_or_host.into(),
        }
    }

    /// The site of every hostless URL. It is never shared between site instances.
    pub fn empty() -> Site {
        Site::default()
    }

    pub fn is_empty(&self) -> bool {
        self.host.is_empty()
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl fmt::Display for Site {
    fn fmt(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        if self.is_empty() {
            return write!(formatter, "<empty site>");
        }
        write!(formatter, "{}://{}", self.scheme, self.host)
    }
}

/// Compute the [`Site`] of `url`.
pub fn site_of(url: &WardenUrl) -> Site {
    let registrable = match url.host() {
        None => return Site::empty(),
        Some(Host::Domain(domain)) if domain.is_empty() => return Site::empty(),
        Some(Host::Domain(domain)) => reg_host(domain).to_owned(),
        // Addresses have no registrable domain, the address itself is the site.
        Some(Host::Ipv4(address)) => address.to_string(),
        Some(Host::Ipv6(address)) => format!("[{address}]"),
    };
    Site::new(url.scheme(), registrable)
}

fn is_diagnostic_url(url: &str) -> bool {
    DIAGNOSTIC_URLS.contains(&url)
}

/// Whether two URLs belong to the same site.
///
/// Script URLs match everything, as does a diagnostic placeholder URL. Otherwise the
/// schemes must agree and the registrable domains (or hosts) must agree.
pub fn is_same_site(a: &WardenUrl, b: &WardenUrl) -> bool {
    if a.scheme() == JAVASCRIPT_SCHEME || b.scheme() == JAVASCRIPT_SCHEME {
        return true;
    }
    if is_diagnostic_url(a.as_str()) || is_diagnostic_url(b.as_str()) {
        return true;
    }
    if a.scheme() != b.scheme() {
        return false;
    }
    site_of(a) == site_of(b)
}

/// [`is_same_site`] for unparsed input. An input that is not a valid URL is never the
/// same site as anything, unless the other side is a script URL.
pub fn is_same_site_str(a: &str, b: &str) -> bool {
    let is_script = |input: &str| {
        input
            .trim_start()
            .get(..JAVASCRIPT_SCHEME.len() + 1)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("javascript:"))
    };
    if is_script(a) || is_script(b) {
        return true;
    }
    match (WardenUrl::parse(a), WardenUrl::parse(b)) {
        (Ok(a), Ok(b)) => is_same_site(&a, &b),
        _ => false,
    }
}
