// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Signal plumbing.
//!
//! `SIGINT`/`SIGTERM` unlink the pid file and exit from the handler
//! (both calls are async-signal-safe). `SIGUSR1`/`SIGUSR2` only raise a
//! flag; the datapath worker runs the table dumps at its next loop
//! iteration, which keeps the handlers trivial. `SIGPIPE` stays blocked
//! so a dropped controller connection surfaces as a write error.

use std::ffi::CString;
use std::path::Path;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};

use nix::libc;
use nix::sys::signal::{SaFlags, SigAction, SigHandler, SigSet, SigmaskHow, Signal, sigaction};

static PID_FILE: OnceLock<CString> = OnceLock::new();
static DUMP_FLOW_TABLES: AtomicBool = AtomicBool::new(false);
static DUMP_GROUP_TABLE: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_exit(signum: libc::c_int) {
    if let Some(path) = PID_FILE.get() {
        unsafe {
            libc::unlink(path.as_ptr());
        }
    }
    unsafe {
        libc::_exit(signum);
    }
}

extern "C" fn handle_dump_flows(_signum: libc::c_int) {
    DUMP_FLOW_TABLES.store(true, Ordering::Relaxed);
}

extern "C" fn handle_dump_groups(_signum: libc::c_int) {
    DUMP_GROUP_TABLE.store(true, Ordering::Relaxed);
}

/// Process-wide setup, run before the workers start: exit handlers for
/// INT/TERM and a mask blocking PIPE/USR1/USR2 everywhere.
pub fn init(pid_file: &Path) -> nix::Result<()> {
    let c_path =
        CString::new(pid_file.as_os_str().as_encoded_bytes()).unwrap_or_default();
    let _ = PID_FILE.set(c_path);

    let exit_action =
        SigAction::new(SigHandler::Handler(handle_exit), SaFlags::empty(), SigSet::empty());
    unsafe {
        sigaction(Signal::SIGINT, &exit_action)?;
        sigaction(Signal::SIGTERM, &exit_action)?;
    }

    let mut blocked = SigSet::empty();
    blocked.add(Signal::SIGPIPE);
    blocked.add(Signal::SIGUSR1);
    blocked.add(Signal::SIGUSR2);
    nix::sys::signal::sigprocmask(SigmaskHow::SIG_BLOCK, Some(&blocked), None)?;
    Ok(())
}

/// Datapath-thread setup: unblock the dump signals there, so they are
/// delivered to (and only to) that worker.
pub fn init_datapath_thread() -> nix::Result<()> {
    let dump_flows = SigAction::new(
        SigHandler::Handler(handle_dump_flows),
        SaFlags::empty(),
        SigSet::empty(),
    );
    let dump_groups = SigAction::new(
        SigHandler::Handler(handle_dump_groups),
        SaFlags::empty(),
        SigSet::empty(),
    );
    unsafe {
        sigaction(Signal::SIGUSR1, &dump_flows)?;
        sigaction(Signal::SIGUSR2, &dump_groups)?;
    }

    let mut unblocked = SigSet::empty();
    unblocked.add(Signal::SIGUSR1);
    unblocked.add(Signal::SIGUSR2);
    nix::sys::signal::pthread_sigmask(SigmaskHow::SIG_UNBLOCK, Some(&unblocked), None)?;
    Ok(())
}

/// Poll-and-clear the SIGUSR1 flag.
pub fn take_dump_flow_tables() -> bool {
    DUMP_FLOW_TABLES.swap(false, Ordering::Relaxed)
}

/// Poll-and-clear the SIGUSR2 flag.
pub fn take_dump_group_table() -> bool {
    DUMP_GROUP_TABLE.swap(false, Ordering::Relaxed)
}
