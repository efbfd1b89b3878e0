/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

mod common;

use std::rc::Rc;
use std::sync::Arc;
use std::thread;

use common::{TestLauncher, profile_with_mode, profile_with_prefs, url};
use process_model::{ProcessModelError, ProcessRegistry, ProcessRequest, Profile, SiteInstance};
use process_traits::{PartitionKey, PrincipalClass};
use warden_config::prefs::{Preferences, ProcessMode};
use warden_url::Site;

fn instance_for(profile: &Rc<Profile>, input: &str) -> Rc<SiteInstance> {
    let instance = profile
        .new_browsing_instance()
        .get_or_create_site_instance(&url(input));
    instance.set_site(&url(input));
    instance
}

#[test]
fn test_process_per_site_shares_across_browsing_instances() {
    let (profile, launcher) = profile_with_mode(ProcessMode::PerSite);
    let first = instance_for(&profile, "http://shared.example/");
    let second = instance_for(&profile, "http://shared.example:8000/other");
    assert!(!first.is_related_to(&second));

    let first_process = first.get_process().expect("process starts");
    let second_process = second.get_process().expect("process is shared");
    assert_eq!(first_process.id(), second_process.id());
    assert_eq!(second_process.bound_instances(), 2);
    assert_eq!(launcher.launched(), 1);
}

#[test]
fn test_process_per_site_instance_does_not_share_below_the_limit() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSiteInstance);
    let first = instance_for(&profile, "http://shared.example/");
    let second = instance_for(&profile, "http://shared.example/");

    let first_process = first.get_process().expect("process starts").id();
    let second_process = second.get_process().expect("process starts").id();
    assert_ne!(first_process, second_process);
}

#[test]
fn test_process_per_site_respects_partitions() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSite);
    let other_profile = Profile::new(
        PartitionKey::from_name("other"),
        profile.prefs().clone(),
        profile.registry().clone(),
    );

    let first = instance_for(&profile, "http://shared.example/");
    let second = instance_for(&other_profile, "http://shared.example/");
    assert_ne!(
        first.get_process().expect("process starts").id(),
        second.get_process().expect("process starts").id()
    );
}

#[test]
fn test_process_per_site_never_mixes_principal_classes() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSite);
    let normal = instance_for(&profile, "http://shared.example/");
    let elevated = instance_for(&profile, "http://shared.example/");
    elevated.set_principal_class(PrincipalClass::ElevatedUi);

    let normal_process = normal.get_process().expect("process starts");
    let elevated_process = elevated.get_process().expect("process starts");
    assert_ne!(normal_process.id(), elevated_process.id());
    assert_eq!(elevated_process.principal_class(), PrincipalClass::ElevatedUi);
}

#[test]
fn test_process_per_site_forgets_an_exited_process() {
    let (profile, _) = profile_with_mode(ProcessMode::PerSite);
    let registry = profile.registry().clone();
    let first = instance_for(&profile, "http://shared.example/");
    let exited = first.get_process().expect("process starts").id();
    registry.process_exited(exited);

    let second = instance_for(&profile, "http://shared.example/");
    let replacement = second.get_process().expect("process starts").id();
    assert_ne!(exited, replacement);
    assert_eq!(
        first.get_process().expect("process is shared again").id(),
        replacement
    );
}

#[test]
fn test_reuse_at_the_process_limit() {
    let prefs = Preferences {
        process_model: ProcessMode::PerSiteInstance,
        max_renderer_processes: 1,
        ..Preferences::default()
    };
    let (profile, launcher) = profile_with_prefs(prefs);
    let a = instance_for(&profile, "http://a.example/");
    let b = instance_for(&profile, "http://b.example/");
    let ui = instance_for(&profile, "http://c.example/");
    ui.set_principal_class(PrincipalClass::Extension);

    let a_process = a.get_process().expect("process starts").id();
    assert_eq!(b.get_process().expect("process is reused").id(), a_process);
    // Reuse never crosses principal classes, even over the limit.
    assert_ne!(ui.get_process().expect("process starts").id(), a_process);
    assert_eq!(launcher.launched(), 2);
}

#[test]
fn test_reuse_can_be_disabled() {
    let prefs = Preferences {
        max_renderer_processes: 1,
        process_reuse_enabled: false,
        ..Preferences::default()
    };
    let (profile, _) = profile_with_prefs(prefs);
    let a = instance_for(&profile, "http://a.example/");
    let b = instance_for(&profile, "http://b.example/");
    assert_ne!(
        a.get_process().expect("process starts").id(),
        b.get_process().expect("process starts").id()
    );
}

#[test]
fn test_process_per_tab_is_never_reused() {
    let prefs = Preferences {
        process_model: ProcessMode::PerTab,
        max_renderer_processes: 1,
        ..Preferences::default()
    };
    let (profile, _) = profile_with_prefs(prefs);
    let registry = profile.registry().clone();
    let a = instance_for(&profile, "http://a.example/");
    let b = instance_for(&profile, "http://a.example/");

    let a_process = a.get_process().expect("process starts");
    assert!(a_process.is_per_tab_exclusive());
    assert_ne!(b.get_process().expect("process starts").id(), a_process.id());
    assert_eq!(registry.find_reusable(PrincipalClass::Normal), None);
}

#[test]
fn test_release_destroys_an_unused_process() {
    let launcher = TestLauncher::default();
    let registry = ProcessRegistry::new(Box::new(launcher.clone()));
    let host = registry
        .allocate(PrincipalClass::Normal, false)
        .expect("process starts");
    assert!(host.is_live());
    assert_eq!(host.listener_count(), 0);

    assert!(registry.add_listener(host.id()));
    assert!(registry.add_listener(host.id()));
    registry.release(host.id());
    assert_eq!(
        registry.find(host.id()).map(|host| host.listener_count()),
        Some(1)
    );

    registry.release(host.id());
    assert!(registry.find(host.id()).is_none());
    assert_eq!(launcher.terminated(), 1);

    // Releasing twice is harmless.
    registry.release(host.id());
}

#[test]
fn test_process_exits_are_reported_once_from_any_thread() {
    let registry = Arc::new(ProcessRegistry::new(Box::new(TestLauncher::default())));
    let exits = registry.subscribe_process_exits();
    let host = registry
        .allocate(PrincipalClass::Normal, false)
        .expect("process starts");
    assert!(registry.add_listener(host.id()));

    let watchers: Vec<_> = (0..4)
        .map(|_| {
            let registry = registry.clone();
            let id = host.id();
            thread::spawn(move || registry.process_exited(id))
        })
        .collect();
    for watcher in watchers {
        watcher.join().expect("watcher thread finishes");
    }

    assert_eq!(exits.try_iter().collect::<Vec<_>>(), vec![host.id()]);
    assert!(!registry.is_live(host.id()));
    assert!(!registry.add_listener(host.id()));
    assert_eq!(registry.live_process_count(), 0);
}

#[test]
fn test_launch_failure_is_resource_exhaustion() {
    let (profile, launcher) = profile_with_mode(ProcessMode::PerSiteInstance);
    launcher.set_failing(true);
    let request = ProcessRequest {
        mode: ProcessMode::PerSite,
        site: Some(Site::new("http", "a.example")),
        partition: profile.partition_key(),
        principal_class: PrincipalClass::Normal,
        max_page_id: -1,
    };
    let result = profile.registry().assign_process(&request, profile.prefs());
    assert!(matches!(result, Err(ProcessModelError::ResourceExhausted(_))));
    assert_eq!(profile.registry().live_process_count(), 0);
}

#[test]
fn test_shutdown_terminates_everything() {
    let (profile, launcher) = profile_with_mode(ProcessMode::PerSiteInstance);
    let a = instance_for(&profile, "http://a.example/");
    let b = instance_for(&profile, "http://b.example/");
    a.get_process().expect("process starts");
    b.get_process().expect("process starts");

    profile.shutdown();
    assert_eq!(launcher.terminated(), 2);
    assert_eq!(profile.registry().live_process_count(), 0);
    assert!(
        profile
            .registry()
            .allocate(PrincipalClass::Normal, false)
            .is_err()
    );
    // Site instances outliving the registry's processes drop cleanly.
    drop(a);
    drop(b);
    assert_eq!(launcher.terminated(), 2);
}
