// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Runtime file locations: `$TREMA_HOME/tmp/{pid,log}`, defaulting to
//! `/tmp` when the variable is unset.

use std::fs;
use std::io;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;

pub fn home() -> PathBuf {
    std::env::var_os("TREMA_HOME").map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
}

pub fn tmp_dir() -> PathBuf {
    home().join("tmp")
}

pub fn pid_dir() -> PathBuf {
    tmp_dir().join("pid")
}

pub fn log_dir() -> PathBuf {
    tmp_dir().join("log")
}

/// Write `<pid_dir>/<name>.pid` and open its permissions so a
/// non-privileged cleanup can delete it.
pub fn write_pid_file(name: &str) -> io::Result<PathBuf> {
    let dir = pid_dir();
    fs::create_dir_all(&dir)?;
    let path = dir.join(format!("{name}.pid"));
    fs::write(&path, format!("{}\n", std::process::id()))?;
    fs::set_permissions(&path, fs::Permissions::from_mode(0o666))?;
    Ok(path)
}

/// Open (creating directories as needed) the instance's log file.
pub fn open_log_file(name: &str) -> io::Result<fs::File> {
    let dir = log_dir();
    fs::create_dir_all(&dir)?;
    fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join(format!("{name}.log")))
}
