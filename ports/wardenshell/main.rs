/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! `wardenshell URL...` opens one tab and navigates it through every URL in turn,
//! answering the renderer side of each handshake from a scripted renderer thread.

#![deny(unsafe_code)]

use std::io::Write;
use std::{env, panic, process, thread};

use log::{error, warn};
use warden_config::opts::{self, ArgumentParsingResult};
use warden_config::warden_version;

use crate::app::App;

mod app;
mod scripted_renderer;

fn main() {
    let args: Vec<String> = env::args().collect();
    let cwd = match env::current_dir() {
        Ok(cwd) => cwd,
        Err(error) => {
            eprintln!("Couldn't determine the current directory: {error}");
            process::exit(1);
        },
    };

    let (opts, preferences) = match opts::from_cmdline_args(&cwd, &args) {
        Ok(ArgumentParsingResult::Run(opts, preferences)) => (opts, preferences),
        Ok(ArgumentParsingResult::Usage(usage)) => {
            println!("{usage}");
            process::exit(0);
        },
        Err(error) => {
            eprintln!("{error}");
            process::exit(1);
        },
    };

    if opts.is_printing_version {
        println!("{}", warden_version());
        process::exit(0);
    }

    setup_logging();
    install_panic_hook();

    if opts.urls.is_empty() {
        warn!("No URLs given, nothing to navigate to.");
    }
    App::new(preferences).run(&opts.urls);
}

fn setup_logging() {
    let env = env_logger::Env::default();
    env_logger::Builder::from_env(env).init();
}

fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        warn!("Panic hook called.");
        let msg = match info.payload().downcast_ref::<&'static str>() {
            Some(s) => *s,
            None => match info.payload().downcast_ref::<String>() {
                Some(s) => &**s,
                None => "Box<Any>",
            },
        };
        let current_thread = thread::current();
        let name = current_thread.name().unwrap_or("<unnamed>");
        let stderr = std::io::stderr();
        let mut stderr = stderr.lock();
        if let Some(location) = info.location() {
            let _ = writeln!(
                &mut stderr,
                "{} (thread {}, at {}:{})",
                msg,
                name,
                location.file(),
                location.line()
            );
        } else {
            let _ = writeln!(&mut stderr, "{} (thread {})", msg, name);
        }
        drop(stderr);

        error!("{}", msg);
    }));
}
