// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! The in-memory flow engine behind the datapath worker.
//!
//! [`Datapath`] owns the flow tables, group table, meter table, logical
//! ports, the packet-in buffer pool and the pending packet-execution
//! queue. All tables sit behind one internal lock, so table-modifying
//! calls may arrive from the protocol thread; packet execution and
//! asynchronous event draining belong to the datapath thread.

#![deny(clippy::all)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod datapath;
mod error;
mod flow_table;
mod group_table;
mod match_builder;
mod meter_table;
mod port;

pub use datapath::{
    AsyncEvent, Datapath, FlowRemovedNotice, PacketInNotice, PendingExecution, SwitchConfig,
    SwitchFeatures,
};
pub use error::Ofdpe;
pub use match_builder::{MaskFields, match_from_packet};
pub use flow_table::{FlowEntry, FlowModOptions};
pub use group_table::GroupEntry;
pub use meter_table::MeterEntry;
pub use port::SwitchPort;
