// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! The protocol worker: owns the channel to the controller, validates
//! and dispatches inbound messages, and turns engine upcalls into
//! PacketIn / FlowRemoved / PortStatus messages.

mod handlers;
mod stats;

use std::io::{self, Read, Write};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use mio::net::TcpStream;
use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, info, warn};

use ofdp::{AsyncEvent, Datapath, PendingExecution};
use openflow::consts::error_code::{OFPBRC_BAD_TYPE, OFPBRC_MULTIPART_BUFFER_OVERFLOW};
use openflow::consts::error_type::OFPET_BAD_REQUEST;
use openflow::consts::{Capabilities, OFPMPF_REQ_MORE, msg_type};
use openflow::error::error_type_and_code;
use openflow::msg::create_error;
use openflow::validate::validate_openflow_message;
use openflow::{Buffer, OFP_HEADER_LEN};

use crate::datapath_worker::DatapathMessage;
use crate::transport::{Receiver, Sender};

const WAKEUP: Token = Token(0);
const CONTROLLER: Token = Token(1);
const POLL_TICK: Duration = Duration::from_millis(200);

/// Outstanding multipart requests are capped at sixteen; the next one
/// is refused with `OFPBRC_MULTIPART_BUFFER_OVERFLOW`.
pub const MAX_OUTSTANDING_REQUESTS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutstandingRequest {
    pub transaction_id: u32,
    pub mp_type: u16,
    pub flags: u16,
}

/// Controller-session state shared by the handlers.
pub struct ProtocolCtrl {
    pub controller_connected: bool,
    pub capabilities: Capabilities,
    outstanding: Vec<OutstandingRequest>,
}

impl ProtocolCtrl {
    fn new() -> ProtocolCtrl {
        ProtocolCtrl {
            controller_connected: false,
            capabilities: Capabilities::empty(),
            outstanding: Vec::with_capacity(MAX_OUTSTANDING_REQUESTS),
        }
    }

    /// Track a multipart request; `Err` means the table is full.
    pub fn save_outstanding_request(
        &mut self,
        transaction_id: u32,
        mp_type: u16,
        flags: u16,
    ) -> Result<(), ()> {
        if let Some(at) = self
            .outstanding
            .iter()
            .position(|r| r.transaction_id == transaction_id && r.mp_type == mp_type)
        {
            // a follow-up without the more flag completes the request
            if flags & OFPMPF_REQ_MORE == 0 {
                self.outstanding.remove(at);
            }
            return Ok(());
        }
        if self.outstanding.len() >= MAX_OUTSTANDING_REQUESTS {
            return Err(());
        }
        if flags & OFPMPF_REQ_MORE != 0 {
            self.outstanding.push(OutstandingRequest { transaction_id, mp_type, flags });
        }
        Ok(())
    }

    #[cfg(test)]
    fn outstanding_len(&self) -> usize {
        self.outstanding.len()
    }
}

struct Connection {
    stream: TcpStream,
    read_buf: Vec<u8>,
    write_buf: Vec<u8>,
    writable_interest: bool,
}

pub struct ProtocolWorker {
    datapath: Arc<Datapath>,
    upcalls: Receiver<DatapathMessage>,
    requests: Sender<PendingExecution>,
    server_addr: SocketAddr,
    progname: String,
    pub(crate) ctrl: ProtocolCtrl,
    connection: Option<Connection>,
}

impl ProtocolWorker {
    pub fn new(
        datapath: Arc<Datapath>,
        upcalls: Receiver<DatapathMessage>,
        requests: Sender<PendingExecution>,
        server_addr: SocketAddr,
        progname: String,
    ) -> ProtocolWorker {
        ProtocolWorker {
            datapath,
            upcalls,
            requests,
            server_addr,
            progname,
            ctrl: ProtocolCtrl::new(),
            connection: None,
        }
    }

    /// Thread entry point.
    pub fn run(mut self) -> io::Result<()> {
        let mut poll = Poll::new()?;
        let wakeup_fd = self.upcalls.raw_fd();
        poll.registry()
            .register(&mut SourceFd(&wakeup_fd), WAKEUP, Interest::READABLE)?;

        let mut events = Events::with_capacity(64);
        loop {
            if let Err(err) = poll.poll(&mut events, Some(POLL_TICK)) {
                if err.kind() == io::ErrorKind::Interrupted {
                    events.clear();
                } else {
                    return Err(err);
                }
            }

            for event in &events {
                match event.token() {
                    WAKEUP => self.handle_datapath_wakeup(&mut poll)?,
                    CONTROLLER => {
                        if event.is_readable() {
                            self.handle_controller_readable();
                        }
                    }
                    _ => {}
                }
            }

            self.flush_writes(&mut poll)?;
            self.requests.flush_wakeup();
        }
    }

    fn handle_datapath_wakeup(&mut self, poll: &mut Poll) -> io::Result<()> {
        for message in self.upcalls.drain_wakeup() {
            match message {
                DatapathMessage::Ready => self.open_controller_channel(poll)?,
                DatapathMessage::Event(event) => {
                    // not yet connected: discard, packet-ins first of all
                    if self.ctrl.controller_connected {
                        self.handle_datapath_event(event);
                    }
                }
            }
        }
        Ok(())
    }

    fn open_controller_channel(&mut self, poll: &mut Poll) -> io::Result<()> {
        if self.connection.is_some() {
            return Ok(());
        }
        info!("datapath is ready; connecting to {}", self.server_addr);
        let mut stream = TcpStream::connect(self.server_addr)?;
        poll.registry()
            .register(&mut stream, CONTROLLER, Interest::READABLE | Interest::WRITABLE)?;
        self.connection = Some(Connection {
            stream,
            read_buf: Vec::new(),
            write_buf: Vec::new(),
            writable_interest: true,
        });
        Ok(())
    }

    fn handle_datapath_event(&mut self, event: AsyncEvent) {
        match event {
            AsyncEvent::PacketIn(notice) => handlers::send_packet_in(self, &notice),
            AsyncEvent::FlowRemoved(notice) => handlers::send_flow_removed(self, &notice),
            AsyncEvent::PortStatus { reason, desc } => {
                handlers::send_port_status(self, reason, &desc);
            }
        }
    }

    fn handle_controller_readable(&mut self) {
        let mut chunk = [0u8; 4096];
        loop {
            let Some(connection) = self.connection.as_mut() else { return };
            match connection.stream.read(&mut chunk) {
                Ok(0) => {
                    warn!("controller closed the channel");
                    self.drop_connection();
                    return;
                }
                Ok(n) => connection.read_buf.extend_from_slice(&chunk[..n]),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!("controller channel read failed: {err}");
                    self.drop_connection();
                    return;
                }
            }
        }

        // peel complete frames off the front of the buffer
        loop {
            let Some(connection) = self.connection.as_mut() else { return };
            if connection.read_buf.len() < OFP_HEADER_LEN {
                return;
            }
            let declared = usize::from(u16::from_be_bytes([
                connection.read_buf[2],
                connection.read_buf[3],
            ]))
            .max(OFP_HEADER_LEN);
            if connection.read_buf.len() < declared {
                return;
            }
            let frame: Vec<u8> = connection.read_buf.drain(..declared).collect();
            self.handle_frame(&frame);
        }
    }

    fn drop_connection(&mut self) {
        self.connection = None;
        self.ctrl.controller_connected = false;
    }

    /// Validate one inbound message and dispatch it.
    fn handle_frame(&mut self, frame: &[u8]) {
        let msg_type = frame[1];
        let transaction_id = u32::from_be_bytes([frame[4], frame[5], frame[6], frame[7]]);

        if let Err(kind) = validate_openflow_message(frame) {
            debug!("rejecting message ( type = {msg_type:#x}, kind = {kind} )");
            let (error_type, error_code) = error_type_and_code(msg_type, kind)
                .unwrap_or((OFPET_BAD_REQUEST, OFPBRC_BAD_TYPE));
            self.send_error_message(transaction_id, error_type, error_code);
            return;
        }

        match msg_type {
            msg_type::OFPT_HELLO => handlers::handle_hello(self, transaction_id),
            msg_type::OFPT_ECHO_REQUEST => {
                handlers::handle_echo_request(self, transaction_id, &frame[OFP_HEADER_LEN..]);
            }
            msg_type::OFPT_FEATURES_REQUEST => {
                handlers::handle_features_request(self, transaction_id);
            }
            msg_type::OFPT_GET_CONFIG_REQUEST => {
                handlers::handle_get_config_request(self, transaction_id);
            }
            msg_type::OFPT_SET_CONFIG => handlers::handle_set_config(self, transaction_id, frame),
            msg_type::OFPT_PACKET_OUT => handlers::handle_packet_out(self, transaction_id, frame),
            msg_type::OFPT_FLOW_MOD => handlers::handle_flow_mod(self, transaction_id, frame),
            msg_type::OFPT_GROUP_MOD => handlers::handle_group_mod(self, transaction_id, frame),
            msg_type::OFPT_PORT_MOD => handlers::handle_port_mod(self, transaction_id, frame),
            msg_type::OFPT_TABLE_MOD => handlers::handle_table_mod(self, transaction_id, frame),
            msg_type::OFPT_MULTIPART_REQUEST => {
                self.handle_multipart_request(transaction_id, frame);
            }
            msg_type::OFPT_BARRIER_REQUEST => {
                handlers::handle_barrier_request(self, transaction_id);
            }
            msg_type::OFPT_METER_MOD => handlers::handle_meter_mod(self, transaction_id, frame),
            msg_type::OFPT_ROLE_REQUEST => handlers::handle_role_request(self, transaction_id, frame),
            msg_type::OFPT_GET_ASYNC_REQUEST => {
                handlers::handle_get_async_request(self, transaction_id);
            }
            msg_type::OFPT_SET_ASYNC => handlers::handle_set_async(self, transaction_id),
            msg_type::OFPT_QUEUE_GET_CONFIG_REQUEST => {
                handlers::handle_queue_get_config_request(self, transaction_id, frame);
            }
            msg_type::OFPT_EXPERIMENTER => {
                self.send_error_message(
                    transaction_id,
                    OFPET_BAD_REQUEST,
                    openflow::consts::error_code::OFPBRC_BAD_EXPERIMENTER,
                );
            }
            msg_type::OFPT_ECHO_REPLY | msg_type::OFPT_ERROR => {
                debug!("ignoring message type {msg_type:#x} from the controller");
            }
            other => {
                // a controller should never send switch-bound messages
                warn!("unexpected message type {other:#x} from the controller");
                self.send_error_message(transaction_id, OFPET_BAD_REQUEST, OFPBRC_BAD_TYPE);
            }
        }
    }

    fn handle_multipart_request(&mut self, transaction_id: u32, frame: &[u8]) {
        let mp_type = u16::from_be_bytes([frame[8], frame[9]]);
        let flags = u16::from_be_bytes([frame[10], frame[11]]);
        if self
            .ctrl
            .save_outstanding_request(transaction_id, mp_type, flags)
            .is_err()
        {
            self.send_error_message(
                transaction_id,
                OFPET_BAD_REQUEST,
                OFPBRC_MULTIPART_BUFFER_OVERFLOW,
            );
            return;
        }
        stats::handle_multipart_request(self, transaction_id, mp_type, frame);
    }

    /// Queue an owned message for the controller.
    pub(crate) fn send_message(&mut self, message: Buffer) -> bool {
        let Some(connection) = self.connection.as_mut() else {
            debug!("no controller channel; dropping an outbound message");
            return false;
        };
        connection.write_buf.extend_from_slice(message.as_slice());
        true
    }

    pub(crate) fn send_error_message(
        &mut self,
        transaction_id: u32,
        error_type: u16,
        error_code: u16,
    ) {
        let message = create_error(transaction_id, error_type, error_code, None);
        self.send_message(message);
    }

    /// Post a packet execution to the datapath and wake it.
    pub(crate) fn wakeup_datapath(&mut self, execution: PendingExecution) {
        if let Err(err) = self.requests.enqueue(execution) {
            warn!("failed to post a packet execution: {err}");
        }
    }

    pub(crate) fn datapath(&self) -> &Datapath {
        &self.datapath
    }

    pub(crate) fn progname(&self) -> &str {
        &self.progname
    }

    fn flush_writes(&mut self, poll: &mut Poll) -> io::Result<()> {
        let Some(connection) = self.connection.as_mut() else {
            return Ok(());
        };

        while !connection.write_buf.is_empty() {
            match connection.stream.write(&connection.write_buf) {
                Ok(0) => break,
                Ok(n) => {
                    connection.write_buf.drain(..n);
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => break,
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    warn!("controller channel write failed: {err}");
                    self.drop_connection();
                    return Ok(());
                }
            }
        }

        // only ask for writable events while bytes are pending
        let want_writable = !connection.write_buf.is_empty();
        if want_writable != connection.writable_interest {
            let interest = if want_writable {
                Interest::READABLE | Interest::WRITABLE
            } else {
                Interest::READABLE
            };
            poll.registry().reregister(&mut connection.stream, CONTROLLER, interest)?;
            connection.writable_interest = want_writable;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use openflow::consts::multipart_type::{OFPMP_FLOW, OFPMP_PORT_STATS};

    #[test]
    fn outstanding_requests_cap_at_sixteen() {
        let mut ctrl = ProtocolCtrl::new();
        for xid in 0..16u32 {
            assert!(ctrl
                .save_outstanding_request(xid, OFPMP_FLOW, OFPMPF_REQ_MORE)
                .is_ok());
        }
        assert_eq!(ctrl.outstanding_len(), MAX_OUTSTANDING_REQUESTS);
        // the seventeenth distinct request overflows
        assert!(ctrl
            .save_outstanding_request(16, OFPMP_FLOW, OFPMPF_REQ_MORE)
            .is_err());

        // completing the first sixteen frees the table again
        for xid in 0..16u32 {
            assert!(ctrl.save_outstanding_request(xid, OFPMP_FLOW, 0).is_ok());
        }
        assert_eq!(ctrl.outstanding_len(), 0);
        assert!(ctrl
            .save_outstanding_request(16, OFPMP_FLOW, OFPMPF_REQ_MORE)
            .is_ok());
    }

    #[test]
    fn request_without_more_flag_is_not_tracked() {
        let mut ctrl = ProtocolCtrl::new();
        assert!(ctrl.save_outstanding_request(1, OFPMP_PORT_STATS, 0).is_ok());
        assert_eq!(ctrl.outstanding_len(), 0);
    }

    #[test]
    fn same_request_key_does_not_double_count() {
        let mut ctrl = ProtocolCtrl::new();
        ctrl.save_outstanding_request(5, OFPMP_FLOW, OFPMPF_REQ_MORE).unwrap();
        ctrl.save_outstanding_request(5, OFPMP_FLOW, OFPMPF_REQ_MORE).unwrap();
        assert_eq!(ctrl.outstanding_len(), 1);
        ctrl.save_outstanding_request(5, OFPMP_FLOW, 0).unwrap();
        assert_eq!(ctrl.outstanding_len(), 0);
    }
}
