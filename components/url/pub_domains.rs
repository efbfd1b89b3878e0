/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Implementation of public domain matching.
//!
//! The list is the public suffix list from <https://publicsuffix.org/list/>, kept in
//! `resources/public_domains.txt` and compiled into the binary. It is parsed once on
//! first need. Matching follows the list's algorithm: normal, wildcard (`*.`) and
//! exception (`!`) rules, the longest matching rule wins, exception rules beat
//! everything, and an unlisted top-level label is itself a public suffix.
//!
//! The registrable domain ("eTLD+1") of a host is the public suffix plus one more
//! label. Site identity is computed from it so that `a.example.co.uk` and
//! `b.example.co.uk` share a site while `example.co.uk` and `other.co.uk` do not.
//!
//! Hosts reach this module in their ASCII form, so internationalized rules are
//! converted to punycode while the list is parsed.

use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use url::Host;

const PUBLIC_SUFFIX_LIST: &str = include_str!("resources/public_domains.txt");

struct PubDomainRules {
    rules: HashSet<Cow<'static, str>>,
    wildcards: HashSet<Cow<'static, str>>,
    exceptions: HashSet<Cow<'static, str>>,
}

/// The ASCII form of a rule's domain, or `None` if it is not a valid domain.
fn ascii_rule(rule: &'static str) -> Option<Cow<'static, str>> {
    if rule.is_ascii() {
        return Some(Cow::Borrowed(rule));
    }
    match Host::parse(rule) {
        Ok(Host::Domain(domain)) => Some(Cow::Owned(domain)),
        _ => None,
    }
}

impl PubDomainRules {
    fn parse(content: &'static str) -> PubDomainRules {
        let mut rules = PubDomainRules {
            rules: HashSet::new(),
            wildcards: HashSet::new(),
            exceptions: HashSet::new(),
        };
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            if let Some(exception) = line.strip_prefix('!') {
                rules.exceptions.extend(ascii_rule(exception));
            } else if let Some(wildcard) = line.strip_prefix("*.") {
                rules.wildcards.extend(ascii_rule(wildcard));
            } else {
                rules.rules.extend(ascii_rule(line));
            }
        }
        rules
    }

    /// Byte offset of the public suffix within `domain`.
    fn suffix_start(&self, domain: &str) -> usize {
        let label_starts: Vec<usize> = std::iter::once(0)
            .chain(domain.match_indices('.').map(|(index, _)| index + 1))
            .collect();

        // Candidates run from the whole domain down to its last label, so the first
        // rule that matches is the longest one.
        for (position, &start) in label_starts.iter().enumerate() {
            let candidate = &domain[start..];
            let next_start = label_starts.get(position + 1).copied();

            if self.exceptions.contains(candidate) {
                // An exception rule's suffix is the rule minus its leftmost label.
                return next_start.unwrap_or(domain.len());
            }
            if self.rules.contains(candidate) {
                return start;
            }
            if let Some(next_start) = next_start {
                if self.wildcards.contains(&domain[next_start..]) {
                    return start;
                }
            }
        }

        // The implicit `*` rule.
        label_starts.last().copied().unwrap_or(0)
    }
}

static PUB_DOMAINS: LazyLock<PubDomainRules> =
    LazyLock::new(|| PubDomainRules::parse(PUBLIC_SUFFIX_LIST));

fn normalize(domain: &str) -> &str {
    domain.trim_end_matches('.')
}

/// The public suffix of `domain`, e.g. `co.uk` for `www.example.co.uk`.
pub fn pub_suffix(domain: &str) -> &str {
    let domain = normalize(domain);
    &domain[PUB_DOMAINS.suffix_start(domain)..]
}

/// Whether `domain` is itself a public suffix, i.e. nothing can be registered
/// directly as `domain`.
pub fn is_pub_domain(domain: &str) -> bool {
    let domain = normalize(domain);
    !domain.is_empty() && pub_suffix(domain) == domain
}

/// The registrable domain of `domain`: its public suffix plus one label. Returns
/// `None` when `domain` is empty or is itself a public suffix.
pub fn reg_suffix(domain: &str) -> Option<&str> {
    let domain = normalize(domain);
    if domain.is_empty() {
        return None;
    }
    let suffix_start = PUB_DOMAINS.suffix_start(domain);
    if suffix_start == 0 {
        return None;
    }
    // `suffix_start - 1` is the dot in front of the suffix.
    let owner = &domain[..suffix_start - 1];
    let registrable_start = owner.rfind('.').map_or(0, |dot| dot + 1);
    if registrable_start == suffix_start - 1 {
        // An empty label, as in `.com`.
        return None;
    }
    Some(&domain[registrable_start..])
}

/// The registrable domain of `host`, falling back to the full host when it has none
/// (single-label hosts such as `localhost`, or hosts that are public suffixes).
pub fn reg_host(host: &str) -> &str {
    reg_suffix(host).unwrap_or_else(|| normalize(host))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn longest_rule_wins() {
        assert_eq!(pub_suffix("www.example.co.uk"), "co.uk");
        assert_eq!(pub_suffix("example.com"), "com");
        assert_eq!(pub_suffix("foo.github.io"), "github.io");
    }

    #[test]
    fn wildcard_and_exception_rules() {
        assert_eq!(pub_suffix("www.foo.kawasaki.jp"), "foo.kawasaki.jp");
        assert_eq!(pub_suffix("city.kawasaki.jp"), "kawasaki.jp");
        assert_eq!(reg_suffix("city.kawasaki.jp"), Some("city.kawasaki.jp"));
        assert_eq!(reg_suffix("www.ck"), Some("www.ck"));
        assert_eq!(reg_suffix("shop.foo.ck"), Some("shop.foo.ck"));
    }

    #[test]
    fn second_level_and_private_suffixes() {
        assert_eq!(pub_suffix("a.gov.in"), "gov.in");
        assert_eq!(reg_suffix("www.a.gov.in"), Some("a.gov.in"));
        assert_eq!(reg_suffix("alice.netlify.app"), Some("alice.netlify.app"));
        assert!(is_pub_domain("netlify.app"));
    }

    #[test]
    fn internationalized_rules_match_ascii_hosts() {
        assert_eq!(pub_suffix("shop.example.xn--55qx5d.cn"), "xn--55qx5d.cn");
        assert_eq!(reg_suffix("www.example.xn--fiqs8s"), Some("example.xn--fiqs8s"));
    }

    #[test]
    fn unlisted_top_level_label_is_a_suffix() {
        assert_eq!(pub_suffix("a.example"), "example");
        assert_eq!(reg_suffix("deep.a.example"), Some("a.example"));
    }

    #[test]
    fn hosts_without_registrable_domain_fall_back() {
        assert_eq!(reg_suffix("localhost"), None);
        assert_eq!(reg_host("localhost"), "localhost");
        assert!(is_pub_domain("co.uk"));
        assert_eq!(reg_host("co.uk"), "co.uk");
        assert_eq!(reg_host("example.com."), "example.com");
    }
}
