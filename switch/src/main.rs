// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! softflow-switch: an OpenFlow 1.3 soft switch.
//!
//! Two worker threads share the process: the protocol worker speaks the
//! OpenFlow channel to the controller, the datapath worker hosts the
//! flow engine. They meet only at a pair of bounded queues with
//! event-fd wakeups.

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod datapath_worker;
mod logging;
mod paths;
mod protocol;
mod signals;
mod transport;

use std::io;
use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;

use args::{CmdArgs, Parser};
use ofdp::{Datapath, PendingExecution};
use tracing::{error, info};

use crate::datapath_worker::{DatapathMessage, DatapathWorker};
use crate::protocol::ProtocolWorker;

/// Upcall queue depth; sized so packet-in drops stay rare.
const UPCALL_QUEUE_CAPACITY: usize = 1024;
/// Packet executions queued toward the datapath.
const REQUEST_QUEUE_CAPACITY: usize = 256;

fn run(cmd_args: &CmdArgs) -> io::Result<()> {
    openflow::xid::init(std::process::id());

    let pid_file = paths::write_pid_file(&cmd_args.instance_name())?;
    signals::init(&pid_file).map_err(io::Error::from)?;

    if cmd_args.daemonize {
        nix::unistd::daemon(false, false).map_err(io::Error::from)?;
    }

    let datapath = Arc::new(Datapath::new(
        cmd_args.datapath_id,
        usize::from(cmd_args.max_flow_entries),
    ));

    let (upcall_tx, upcall_rx) =
        transport::channel::<DatapathMessage>(UPCALL_QUEUE_CAPACITY).map_err(io::Error::from)?;
    let (request_tx, request_rx) =
        transport::channel::<PendingExecution>(REQUEST_QUEUE_CAPACITY).map_err(io::Error::from)?;

    let server_addr = SocketAddr::from((cmd_args.server_ip, cmd_args.server_port));
    let protocol = ProtocolWorker::new(
        Arc::clone(&datapath),
        upcall_rx,
        request_tx,
        server_addr,
        cmd_args.instance_name(),
    );
    let datapath_worker = DatapathWorker::new(datapath, request_rx, upcall_tx);

    info!(
        "starting softflow-switch ( datapath_id = {:#x}, controller = {server_addr} )",
        cmd_args.datapath_id
    );

    let switch_ports = cmd_args.switch_ports.clone();
    let datapath_thread = thread::Builder::new()
        .name("datapath".to_owned())
        .spawn(move || datapath_worker.run(&switch_ports))?;
    let protocol_thread = thread::Builder::new()
        .name("protocol".to_owned())
        .spawn(move || protocol.run())?;

    for handle in [protocol_thread, datapath_thread] {
        match handle.join() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => return Err(err),
            Err(_) => return Err(io::Error::other("a worker thread panicked")),
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    let cmd_args = CmdArgs::parse();
    if let Err(err) = logging::init(&cmd_args) {
        eprintln!("failed to initialize logging: {err}");
        return ExitCode::FAILURE;
    }

    match run(&cmd_args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("switch failed: {err}");
            ExitCode::FAILURE
        }
    }
}
