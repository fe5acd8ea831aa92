// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! The datapath worker: hosts the engine, runs queued packet
//! executions, ticks flow expiry, forwards upcalls to the protocol
//! worker and serves the signal-scheduled table dumps.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use ofdp::{AsyncEvent, Datapath, PendingExecution};
use openflow::consts::port_no::OFPP_MAX;
use tracing::{error, info, warn};

use args::SwitchPortArg;

use crate::signals;
use crate::transport::{Receiver, Sender};

/// Messages travelling datapath -> protocol.
#[derive(Debug)]
pub enum DatapathMessage {
    /// Engine initialisation finished; the protocol worker may open the
    /// controller channel.
    Ready,
    /// An engine upcall to turn into an outbound OpenFlow message.
    Event(AsyncEvent),
}

const WAKEUP: Token = Token(0);
const EXPIRY_TICK: Duration = Duration::from_secs(1);

pub struct DatapathWorker {
    datapath: Arc<Datapath>,
    requests: Receiver<PendingExecution>,
    upcalls: Sender<DatapathMessage>,
}

impl DatapathWorker {
    pub fn new(
        datapath: Arc<Datapath>,
        requests: Receiver<PendingExecution>,
        upcalls: Sender<DatapathMessage>,
    ) -> DatapathWorker {
        DatapathWorker { datapath, requests, upcalls }
    }

    /// Thread entry point.
    pub fn run(self, switch_ports: &[SwitchPortArg]) -> io::Result<()> {
        signals::init_datapath_thread().map_err(io::Error::from)?;

        for spec in switch_ports {
            let port_no = spec.port_no.unwrap_or(0);
            if port_no > OFPP_MAX {
                error!("invalid port number ( port_no = {port_no} )");
                return Err(io::Error::other("invalid switch port number"));
            }
            self.datapath
                .add_port(port_no, &spec.device)
                .map_err(|err| io::Error::other(format!("failed to attach port: {err}")))?;
        }
        // the attach notifications predate any controller connection
        let _ = self.datapath.take_events();

        let mut poll = Poll::new()?;
        let request_fd = self.requests.raw_fd();
        poll.registry()
            .register(&mut SourceFd(&request_fd), WAKEUP, Interest::READABLE)?;

        self.upcalls
            .enqueue(DatapathMessage::Ready)
            .map_err(|err| io::Error::other(err.to_string()))?;
        self.upcalls.flush_wakeup();
        info!("datapath is running");

        let mut events = Events::with_capacity(64);
        let mut last_expiry = Instant::now();
        loop {
            if let Err(err) = poll.poll(&mut events, Some(EXPIRY_TICK)) {
                if err.kind() == io::ErrorKind::Interrupted {
                    // a dump signal landed here; fall through to run it
                    events.clear();
                } else {
                    return Err(err);
                }
            }

            for event in &events {
                if event.token() == WAKEUP {
                    for execution in self.requests.drain_wakeup() {
                        self.datapath.run_execution(&execution);
                    }
                }
            }

            if last_expiry.elapsed() >= EXPIRY_TICK {
                self.datapath.expire_flow_entries();
                last_expiry = Instant::now();
            }

            if signals::take_dump_flow_tables() {
                self.datapath.dump_flow_tables();
            }
            if signals::take_dump_group_table() {
                self.datapath.dump_group_table();
            }

            self.forward_upcalls();
            self.upcalls.flush_wakeup();
        }
    }

    fn forward_upcalls(&self) {
        for event in self.datapath.take_events() {
            let is_packet_in = matches!(event, AsyncEvent::PacketIn(_));
            if let Err(err) = self.upcalls.enqueue(DatapathMessage::Event(event)) {
                // packet-ins are droppable under backpressure
                if is_packet_in {
                    warn!("dropping a packet-in: {err}");
                } else {
                    warn!("dropping a datapath event: {err}");
                }
            }
        }
    }
}
