// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Logging initialisation: tracing subscribers wired to the sinks the
//! command line asked for.

use std::fs::File;
use std::sync::Mutex;

use args::{CmdArgs, LogSink};
use tracing::warn;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::paths;

fn level_filter(level: &str) -> LevelFilter {
    match level {
        "debug" => LevelFilter::DEBUG,
        "warn" => LevelFilter::WARN,
        // no separate critical level; both land on error
        "error" | "critical" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    }
}

/// Install the global subscriber. Returns an error only when the log
/// file cannot be created.
pub fn init(cmd_args: &CmdArgs) -> std::io::Result<()> {
    let sinks = cmd_args.log_sinks();

    if sinks.contains(&LogSink::Syslog) {
        // the sink list still selects file logging below
        warn!("syslog output is not wired up; logging to a file instead");
    }

    let file: Option<Mutex<File>> =
        if sinks.iter().any(|s| matches!(s, LogSink::File | LogSink::Syslog)) {
            Some(Mutex::new(paths::open_log_file(&cmd_args.instance_name())?))
        } else {
            None
        };
    let file_layer = file.map(|writer| {
        tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_target(true)
    });

    let stdout_layer = sinks
        .contains(&LogSink::Stdout)
        .then(|| tracing_subscriber::fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(level_filter(&cmd_args.logging_level))
        .with(file_layer)
        .with(stdout_layer)
        .init();
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn critical_aliases_error() {
        assert_eq!(level_filter("critical"), LevelFilter::ERROR);
        assert_eq!(level_filter("error"), LevelFilter::ERROR);
        assert_eq!(level_filter("debug"), LevelFilter::DEBUG);
        assert_eq!(level_filter("info"), LevelFilter::INFO);
    }
}
