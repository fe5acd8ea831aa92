// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Dense engine error codes and their OpenFlow error-pair mapping.

use openflow::consts::error_code::*;
use openflow::consts::error_type::*;

/// Engine operation failures. The protocol worker resolves these to
/// `(OFPET_*, code)` pairs via [`Ofdpe::ofp_error`] before emitting an
/// `OFPT_ERROR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Ofdpe {
    #[error("engine operation failed")]
    Failed,
    #[error("flow table is full")]
    TableFull,
    #[error("invalid table id")]
    InvalidTableId,
    #[error("overlapping flow entry")]
    Overlap,
    #[error("bad flow entry timeout")]
    BadTimeout,
    #[error("group already exists")]
    GroupExists,
    #[error("invalid group id")]
    InvalidGroup,
    #[error("unknown group")]
    UnknownGroup,
    #[error("group table is full")]
    OutOfGroups,
    #[error("group still referenced by a flow entry")]
    ChainedGroup,
    #[error("meter already exists")]
    MeterExists,
    #[error("invalid meter id")]
    InvalidMeter,
    #[error("unknown meter")]
    UnknownMeter,
    #[error("meter table is full")]
    OutOfMeters,
    #[error("unknown port")]
    PortNotFound,
    #[error("port already exists")]
    PortExists,
    #[error("unknown packet buffer")]
    BufferUnknown,
    #[error("packet buffer already consumed")]
    BufferEmpty,
    #[error("invalid switch config")]
    InvalidSwitchConfig,
}

impl Ofdpe {
    /// Map the engine code to the OpenFlow error pair.
    #[must_use]
    pub fn ofp_error(self) -> (u16, u16) {
        match self {
            Ofdpe::Failed => (OFPET_BAD_REQUEST, OFPBRC_EPERM),
            Ofdpe::TableFull => (OFPET_FLOW_MOD_FAILED, OFPFMFC_TABLE_FULL),
            Ofdpe::InvalidTableId => (OFPET_FLOW_MOD_FAILED, OFPFMFC_BAD_TABLE_ID),
            Ofdpe::Overlap => (OFPET_FLOW_MOD_FAILED, OFPFMFC_OVERLAP),
            Ofdpe::BadTimeout => (OFPET_FLOW_MOD_FAILED, OFPFMFC_BAD_TIMEOUT),
            Ofdpe::GroupExists => (OFPET_GROUP_MOD_FAILED, OFPGMFC_GROUP_EXISTS),
            Ofdpe::InvalidGroup => (OFPET_GROUP_MOD_FAILED, OFPGMFC_INVALID_GROUP),
            Ofdpe::UnknownGroup => (OFPET_GROUP_MOD_FAILED, OFPGMFC_UNKNOWN_GROUP),
            Ofdpe::OutOfGroups => (OFPET_GROUP_MOD_FAILED, OFPGMFC_OUT_OF_GROUPS),
            Ofdpe::ChainedGroup => (OFPET_GROUP_MOD_FAILED, OFPGMFC_CHAINED_GROUP),
            Ofdpe::MeterExists => (OFPET_METER_MOD_FAILED, OFPMMFC_METER_EXISTS),
            Ofdpe::InvalidMeter => (OFPET_METER_MOD_FAILED, OFPMMFC_INVALID_METER),
            Ofdpe::UnknownMeter => (OFPET_METER_MOD_FAILED, OFPMMFC_UNKNOWN_METER),
            Ofdpe::OutOfMeters => (OFPET_METER_MOD_FAILED, OFPMMFC_OUT_OF_METERS),
            Ofdpe::PortNotFound => (OFPET_PORT_MOD_FAILED, OFPPMFC_BAD_PORT),
            Ofdpe::PortExists => (OFPET_PORT_MOD_FAILED, OFPPMFC_BAD_PORT),
            Ofdpe::BufferUnknown => (OFPET_BAD_REQUEST, OFPBRC_BUFFER_UNKNOWN),
            Ofdpe::BufferEmpty => (OFPET_BAD_REQUEST, OFPBRC_BUFFER_EMPTY),
            Ofdpe::InvalidSwitchConfig => (OFPET_SWITCH_CONFIG_FAILED, OFPSCFC_BAD_FLAGS),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn table_full_maps_to_flow_mod_failed() {
        assert_eq!(
            Ofdpe::TableFull.ofp_error(),
            (OFPET_FLOW_MOD_FAILED, OFPFMFC_TABLE_FULL)
        );
    }

    #[test]
    fn buffer_errors_map_to_bad_request() {
        assert_eq!(
            Ofdpe::BufferUnknown.ofp_error(),
            (OFPET_BAD_REQUEST, OFPBRC_BUFFER_UNKNOWN)
        );
        assert_eq!(
            Ofdpe::BufferEmpty.ofp_error(),
            (OFPET_BAD_REQUEST, OFPBRC_BUFFER_EMPTY)
        );
    }
}
