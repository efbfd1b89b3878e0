/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Configuration options for a single run of the shell. Created from command line
//! arguments.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use getopts::Options;
use log::warn;
use warden_url::WardenUrl;

use crate::prefs::{PrefError, PrefValue, Preferences, ProcessMode, read_prefs_from_json};

/// Options for a single run, currently set on the command line.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    /// The URLs to navigate through, in order.
    pub urls: Vec<WardenUrl>,

    /// A JSON file that preferences were loaded from (`--prefs`).
    pub prefs_file: Option<PathBuf>,

    /// Print the version and exit (`-v`).
    pub is_printing_version: bool,
}

#[derive(Debug)]
pub enum ArgumentError {
    Getopts(getopts::Fail),
    InvalidValue { option: &'static str, value: String },
    Prefs(PrefError),
    ReadPrefsFile(PathBuf, std::io::Error),
}

impl fmt::Display for ArgumentError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ArgumentError::Getopts(fail) => write!(f, "{fail}"),
            ArgumentError::InvalidValue { option, value } => {
                write!(f, "Error parsing option: --{option} ({value})")
            },
            ArgumentError::Prefs(error) => write!(f, "{error}"),
            ArgumentError::ReadPrefsFile(path, error) => {
                write!(f, "Couldn't read {}: {error}", path.display())
            },
        }
    }
}

impl std::error::Error for ArgumentError {}

impl From<PrefError> for ArgumentError {
    fn from(error: PrefError) -> Self {
        ArgumentError::Prefs(error)
    }
}

pub enum ArgumentParsingResult {
    Run(Opts, Preferences),
    Usage(String),
}

fn usage(app: &str, opts: &Options) -> String {
    let message = format!("Usage: {app} [ options ... ] [URL ...]\n\twhere options include");
    opts.usage(&message)
}

/// Parse `args` (including the program name) into run options and the preferences
/// the profile will be created with. Later options override earlier sources: the
/// preferences file is applied first, then process model flags, then `--pref`.
pub fn from_cmdline_args(cwd: &Path, args: &[String]) -> Result<ArgumentParsingResult, ArgumentError> {
    let (app_name, args) = match args.split_first() {
        Some((app_name, args)) => (app_name.as_str(), args),
        None => ("wardenshell", args),
    };

    let mut opts = Options::new();
    opts.optflag("h", "help", "Print this message");
    opts.optflag("v", "version", "Display version information");
    opts.optflag("", "process-per-tab", "Give every tab its own, never shared, process");
    opts.optflag(
        "",
        "process-per-site",
        "Share one process between all instances of a site",
    );
    opts.optopt(
        "",
        "renderer-process-limit",
        "Soft limit on live renderer processes",
        "20",
    );
    opts.optopt("", "prefs", "Load preferences from a JSON file", "prefs.json");
    opts.optmulti(
        "",
        "pref",
        "Set a preference, e.g. process.reuse.enabled=false",
        "NAME=VALUE",
    );

    let opt_match = opts.parse(args).map_err(ArgumentError::Getopts)?;

    if opt_match.opt_present("h") {
        return Ok(ArgumentParsingResult::Usage(usage(app_name, &opts)));
    }

    let prefs_file = opt_match.opt_str("prefs").map(PathBuf::from);
    let mut preferences = match &prefs_file {
        Some(path) => {
            let contents = fs::read_to_string(path)
                .map_err(|error| ArgumentError::ReadPrefsFile(path.clone(), error))?;
            read_prefs_from_json(&contents)?
        },
        None => Preferences::default(),
    };

    if opt_match.opt_present("process-per-tab") {
        preferences.process_model = ProcessMode::PerTab;
    } else if opt_match.opt_present("process-per-site") {
        preferences.process_model = ProcessMode::PerSite;
    }

    if let Some(limit) = opt_match.opt_str("renderer-process-limit") {
        preferences.max_renderer_processes =
            limit.parse().map_err(|_| ArgumentError::InvalidValue {
                option: "renderer-process-limit",
                value: limit.clone(),
            })?;
    }

    for pref in opt_match.opt_strs("pref") {
        let (name, value) = parse_pref_from_command_line(&pref);
        preferences.set(name, value)?;
    }

    let urls = opt_match
        .free
        .iter()
        .filter_map(|input| match parse_url_or_filename(cwd, input) {
            Ok(url) => Some(url),
            Err(()) => {
                warn!("URL parsing failed ({input}).");
                None
            },
        })
        .collect();

    Ok(ArgumentParsingResult::Run(
        Opts {
            urls,
            prefs_file,
            is_printing_version: opt_match.opt_present("v"),
        },
        preferences,
    ))
}

/// Split `name=value` (a bare `name` means `name=true`).
pub fn parse_pref_from_command_line(pref: &str) -> (&str, PrefValue) {
    match pref.split_once('=') {
        Some((name, value)) => (name, PrefValue::from_booleanish_str(value)),
        None => (pref, PrefValue::Bool(true)),
    }
}

pub fn parse_url_or_filename(cwd: &Path, input: &str) -> Result<WardenUrl, ()> {
    match WardenUrl::parse(input) {
        Ok(url) => Ok(url),
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            url::Url::from_file_path(&*cwd.join(input)).map(WardenUrl::from_url)
        },
        Err(_) => Err(()),
    }
}
