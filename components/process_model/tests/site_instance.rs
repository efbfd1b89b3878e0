/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use std::rc::Rc;

use common::{profile_with_mode, url};
use process_traits::PrincipalClass;
use warden_config::prefs::ProcessMode;
use warden_url::Site;

#[test]
fn test_instances_for_one_site_collapse_once_a_site_is_set() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSiteInstance);
    let browsing_instance = profile.new_browsing_instance();
    let page = url("http://a.example/index.html");

    let instances: Vec<_> = (0..8)
        .map(|_| browsing_instance.get_or_create_site_instance(&page))
        .collect();
    assert_eq!(browsing_instance.site_instance_count(), 0);

    assert!(instances[0].set_site(&page));
    for other in &instances[1..] {
        let found = browsing_instance.get_or_create_site_instance(&url("http://a.example:81/other"));
        assert!(Rc::ptr_eq(&found, &instances[0]));
        assert!(other.set_site(&page));
    }

    assert_eq!(browsing_instance.site_instance_count(), 1);
    let found = browsing_instance.get_or_create_site_instance(&page);
    assert_eq!(found.id(), instances[0].id());
}

#[test]
fn test_set_site_is_write_once() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSiteInstance);
    let instance = profile
        .new_browsing_instance()
        .get_or_create_site_instance(&url("http://a.example/"));

    assert!(!instance.has_site());
    assert!(instance.set_site(&url("http://a.example/")));
    assert!(!instance.set_site(&url("http://b.example/")));
    assert_eq!(instance.site(), Some(Site::new("http", "a.example")));
}

#[test]
fn test_dropped_instance_leaves_its_browsing_instance() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSiteInstance);
    let browsing_instance = profile.new_browsing_instance();
    let page = url("http://a.example/");

    let instance = browsing_instance.get_or_create_site_instance(&page);
    instance.set_site(&page);
    let first_id = instance.id();
    assert!(browsing_instance.has_site_instance(&Site::new("http", "a.example")));

    drop(instance);
    assert_eq!(browsing_instance.site_instance_count(), 0);
    assert!(!browsing_instance.has_site_instance(&Site::new("http", "a.example")));
    assert_ne!(browsing_instance.get_or_create_site_instance(&page).id(), first_id);
}

#[test]
fn test_hostless_urls_never_share_an_instance() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSiteInstance);
    let browsing_instance = profile.new_browsing_instance();
    let blank = url("about:blank");

    let first = browsing_instance.get_or_create_site_instance(&blank);
    assert!(first.set_site(&blank));
    assert_eq!(first.site(), Some(Site::empty()));

    let second = browsing_instance.get_or_create_site_instance(&blank);
    assert!(!Rc::ptr_eq(&first, &second));
    assert_eq!(browsing_instance.site_instance_count(), 0);
}

#[test]
fn test_related_instances() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSiteInstance);
    let browsing_instance = profile.new_browsing_instance();
    let a = browsing_instance.get_or_create_site_instance(&url("http://a.example/"));
    a.set_site(&url("http://a.example/"));

    let same = a.get_related(&url("http://www.a.example:8080/2"));
    assert!(Rc::ptr_eq(&same, &a));

    assert!(!a.has_related(&url("https://b.example/")));
    let b = a.get_related(&url("https://b.example/"));
    assert!(!Rc::ptr_eq(&b, &a));
    assert!(b.is_related_to(&a));
    assert!(!b.has_site());

    b.set_site(&url("https://b.example/"));
    assert!(a.has_related(&url("https://b.example/x")));
    assert!(Rc::ptr_eq(&a.get_related(&url("https://b.example/x")), &b));

    let unrelated = profile
        .new_browsing_instance()
        .get_or_create_site_instance(&url("http://a.example/"));
    assert!(!unrelated.is_related_to(&a));
}

#[test]
fn test_get_process_is_stable_and_carries_max_page_id() {
    let (profile, launcher) = profile_with_mode(ProcessMode::PerSiteInstance);
    let instance = profile
        .new_browsing_instance()
        .get_or_create_site_instance(&url("http://a.example/"));
    instance.update_max_page_id(7);
    instance.update_max_page_id(3);
    assert_eq!(instance.max_page_id(), 7);

    let process = instance.get_process().expect("process starts");
    assert_eq!(process.max_page_id(), 7);
    assert_eq!(process.bound_instances(), 1);
    assert_eq!(instance.get_process().expect("process is live").id(), process.id());
    assert_eq!(launcher.launched(), 1);
}

#[test]
fn test_get_process_replaces_an_exited_process() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSiteInstance);
    let registry = profile.registry().clone();
    let instance = profile
        .new_browsing_instance()
        .get_or_create_site_instance(&url("http://a.example/"));

    let first = instance.get_process().expect("process starts").id();
    registry.process_exited(first);
    assert!(!registry.is_live(first));

    let second = instance.get_process().expect("process restarts").id();
    assert_ne!(first, second);
    assert!(registry.is_live(second));
    // Nothing refers to the exited process any more.
    assert!(registry.find(first).is_none());
}

#[test]
fn test_principal_class_change_forces_a_new_process() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSiteInstance);
    let registry = profile.registry().clone();
    let instance = profile
        .new_browsing_instance()
        .get_or_create_site_instance(&url("http://a.example/"));

    let normal = instance.get_process().expect("process starts");
    assert_eq!(normal.principal_class(), PrincipalClass::Normal);

    instance.set_principal_class(PrincipalClass::ElevatedUi);
    let elevated = instance.get_process().expect("process starts");
    assert_ne!(normal.id(), elevated.id());
    assert_eq!(elevated.principal_class(), PrincipalClass::ElevatedUi);
    assert_eq!(instance.process_id(), Some(elevated.id()));
    // The normal process lost its only user.
    assert!(registry.find(normal.id()).is_none());
}

#[test]
fn test_dropping_the_last_instance_destroys_its_process() {
    let (profile, launcher) = profile_with_mode(ProcessMode::PerSiteInstance);
    let registry = profile.registry().clone();
    let instance = profile
        .new_browsing_instance()
        .get_or_create_site_instance(&url("http://a.example/"));
    let process_id = instance.get_process().expect("process starts").id();

    drop(instance);
    assert!(registry.find(process_id).is_none());
    assert_eq!(launcher.terminated(), 1);
    assert_eq!(registry.live_process_count(), 0);
}
