/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

use std::path::Path;

use warden_config::opts::{
    ArgumentParsingResult, from_cmdline_args, parse_pref_from_command_line, parse_url_or_filename,
};
use warden_config::prefs::{PrefValue, ProcessMode};

#[cfg(not(target_os = "windows"))]
const FAKE_CWD: &str = "/fake/cwd";

#[cfg(target_os = "windows")]
const FAKE_CWD: &str = "C:/fake/cwd";

fn args(list: &[&str]) -> Vec<String> {
    std::iter::once("wardenshell")
        .chain(list.iter().copied())
        .map(String::from)
        .collect()
}

#[test]
fn test_argument_parsing() {
    let fake_cwd = Path::new(FAKE_CWD);
    assert!(parse_url_or_filename(fake_cwd, "http://example.net:invalid").is_err());

    let url = parse_url_or_filename(fake_cwd, "http://example.net").unwrap();
    assert_eq!(url.scheme(), "http");

    let url = parse_url_or_filename(fake_cwd, "file:///foo/bar.html").unwrap();
    assert_eq!(url.scheme(), "file");
}

#[test]
#[cfg(not(target_os = "windows"))]
fn test_file_path_parsing() {
    let fake_cwd = Path::new(FAKE_CWD);

    let url = parse_url_or_filename(fake_cwd, "bar.html").unwrap();
    assert_eq!(url.scheme(), "file");
    assert_eq!(url.path(), "/fake/cwd/bar.html");
}

#[test]
fn test_parse_pref_from_command_line() {
    assert_eq!(
        parse_pref_from_command_line("process.reuse.enabled=false"),
        ("process.reuse.enabled", PrefValue::Bool(false))
    );
    assert_eq!(
        parse_pref_from_command_line("process.max_renderer_processes=4"),
        ("process.max_renderer_processes", PrefValue::Int(4))
    );
    assert_eq!(
        parse_pref_from_command_line("process.reuse.enabled"),
        ("process.reuse.enabled", PrefValue::Bool(true))
    );
}

#[test]
fn test_process_model_flags_and_urls() {
    let result = from_cmdline_args(
        Path::new(FAKE_CWD),
        &args(&[
            "--process-per-site",
            "--renderer-process-limit",
            "3",
            "--pref",
            "process.reuse.enabled=false",
            "http://a.example/",
            "https://b.example/",
        ]),
    )
    .unwrap();
    let ArgumentParsingResult::Run(opts, prefs) = result else {
        panic!("expected a run configuration");
    };
    assert_eq!(prefs.process_model, ProcessMode::PerSite);
    assert_eq!(prefs.max_renderer_processes, 3);
    assert!(!prefs.process_reuse_enabled);
    assert_eq!(opts.urls.len(), 2);
    assert_eq!(opts.urls[1].as_str(), "https://b.example/");
}

#[test]
fn test_help_returns_usage() {
    let result = from_cmdline_args(Path::new(FAKE_CWD), &args(&["-h"])).unwrap();
    let ArgumentParsingResult::Usage(usage) = result else {
        panic!("expected usage text");
    };
    assert!(usage.contains("--process-per-tab"));
}

#[test]
fn test_bad_arguments_are_errors() {
    assert!(from_cmdline_args(Path::new(FAKE_CWD), &args(&["--renderer-process-limit", "many"])).is_err());
    assert!(from_cmdline_args(Path::new(FAKE_CWD), &args(&["--pref", "no.such.pref=1"])).is_err());
    assert!(from_cmdline_args(Path::new(FAKE_CWD), &args(&["--no-such-flag"])).is_err());
}
