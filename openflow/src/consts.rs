// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! OpenFlow 1.3 wire constants.
//!
//! Numbering follows the OpenFlow Switch Specification 1.3.4. Closed sets
//! that the switch masks against (capabilities, port config, flow-mod
//! flags, ...) are modelled with `bitflags`; plain enumerations stay bare
//! `u8`/`u16`/`u32` constants because they travel the wire as such.

use bitflags::bitflags;

/// Message types (`OFPT_*`).
pub mod msg_type {
    pub const OFPT_HELLO: u8 = 0;
    pub const OFPT_ERROR: u8 = 1;
    pub const OFPT_ECHO_REQUEST: u8 = 2;
    pub const OFPT_ECHO_REPLY: u8 = 3;
    pub const OFPT_EXPERIMENTER: u8 = 4;
    pub const OFPT_FEATURES_REQUEST: u8 = 5;
    pub const OFPT_FEATURES_REPLY: u8 = 6;
    pub const OFPT_GET_CONFIG_REQUEST: u8 = 7;
    pub const OFPT_GET_CONFIG_REPLY: u8 = 8;
    pub const OFPT_SET_CONFIG: u8 = 9;
    pub const OFPT_PACKET_IN: u8 = 10;
    pub const OFPT_FLOW_REMOVED: u8 = 11;
    pub const OFPT_PORT_STATUS: u8 = 12;
    pub const OFPT_PACKET_OUT: u8 = 13;
    pub const OFPT_FLOW_MOD: u8 = 14;
    pub const OFPT_GROUP_MOD: u8 = 15;
    pub const OFPT_PORT_MOD: u8 = 16;
    pub const OFPT_TABLE_MOD: u8 = 17;
    pub const OFPT_MULTIPART_REQUEST: u8 = 18;
    pub const OFPT_MULTIPART_REPLY: u8 = 19;
    pub const OFPT_BARRIER_REQUEST: u8 = 20;
    pub const OFPT_BARRIER_REPLY: u8 = 21;
    pub const OFPT_QUEUE_GET_CONFIG_REQUEST: u8 = 22;
    pub const OFPT_QUEUE_GET_CONFIG_REPLY: u8 = 23;
    pub const OFPT_ROLE_REQUEST: u8 = 24;
    pub const OFPT_ROLE_REPLY: u8 = 25;
    pub const OFPT_GET_ASYNC_REQUEST: u8 = 26;
    pub const OFPT_GET_ASYNC_REPLY: u8 = 27;
    pub const OFPT_SET_ASYNC: u8 = 28;
    pub const OFPT_METER_MOD: u8 = 29;

    /// Highest defined message type; anything above is undefined.
    pub const OFPT_MAX: u8 = OFPT_METER_MOD;
}

/// Reserved port numbers (`OFPP_*`).
pub mod port_no {
    pub const OFPP_MAX: u32 = 0xffff_ff00;
    pub const OFPP_IN_PORT: u32 = 0xffff_fff8;
    pub const OFPP_TABLE: u32 = 0xffff_fff9;
    pub const OFPP_NORMAL: u32 = 0xffff_fffa;
    pub const OFPP_FLOOD: u32 = 0xffff_fffb;
    pub const OFPP_ALL: u32 = 0xffff_fffc;
    pub const OFPP_CONTROLLER: u32 = 0xffff_fffd;
    pub const OFPP_LOCAL: u32 = 0xffff_fffe;
    pub const OFPP_ANY: u32 = 0xffff_ffff;
}

/// Group numbering space (`OFPG_*`).
pub mod group_no {
    pub const OFPG_MAX: u32 = 0xffff_ff00;
    pub const OFPG_ALL: u32 = 0xffff_fffc;
    pub const OFPG_ANY: u32 = 0xffff_ffff;
}

/// Meter numbering space (`OFPM_*`).
pub mod meter_no {
    pub const OFPM_MAX: u32 = 0xffff_0000;
    pub const OFPM_SLOWPATH: u32 = 0xffff_fffd;
    pub const OFPM_CONTROLLER: u32 = 0xffff_fffe;
    pub const OFPM_ALL: u32 = 0xffff_ffff;
}

/// Flow table numbering (`OFPTT_*`).
pub const OFPTT_MAX: u8 = 0xfe;
pub const OFPTT_ALL: u8 = 0xff;

/// `buffer_id` value meaning "no buffered packet".
pub const OFP_NO_BUFFER: u32 = 0xffff_ffff;

/// `miss_send_len` bounds (`OFPCML_*`).
pub const OFPCML_MAX: u16 = 0xffe5;
pub const OFPCML_NO_BUFFER: u16 = 0xffff;

/// Switch config fragment-handling flags (`OFPC_FRAG_*`).
pub const OFPC_FRAG_NORMAL: u16 = 0;
pub const OFPC_FRAG_DROP: u16 = 1;
pub const OFPC_FRAG_REASM: u16 = 2;
pub const OFPC_FRAG_MASK: u16 = 3;

bitflags! {
    /// Switch capabilities (`OFPC_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u32 {
        const FLOW_STATS = 1 << 0;
        const TABLE_STATS = 1 << 1;
        const PORT_STATS = 1 << 2;
        const GROUP_STATS = 1 << 3;
        const IP_REASM = 1 << 5;
        const QUEUE_STATS = 1 << 6;
        const PORT_BLOCKED = 1 << 8;
    }
}

bitflags! {
    /// Port administrative configuration (`OFPPC_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PortConfig: u32 {
        const PORT_DOWN = 1 << 0;
        const NO_RECV = 1 << 2;
        const NO_FWD = 1 << 5;
        const NO_PACKET_IN = 1 << 6;
    }
}

bitflags! {
    /// Port link state (`OFPPS_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PortState: u32 {
        const LINK_DOWN = 1 << 0;
        const BLOCKED = 1 << 1;
        const LIVE = 1 << 2;
    }
}

bitflags! {
    /// Port feature bits (`OFPPF_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PortFeatures: u32 {
        const SPEED_10MB_HD = 1 << 0;
        const SPEED_10MB_FD = 1 << 1;
        const SPEED_100MB_HD = 1 << 2;
        const SPEED_100MB_FD = 1 << 3;
        const SPEED_1GB_HD = 1 << 4;
        const SPEED_1GB_FD = 1 << 5;
        const SPEED_10GB_FD = 1 << 6;
        const SPEED_40GB_FD = 1 << 7;
        const SPEED_100GB_FD = 1 << 8;
        const SPEED_1TB_FD = 1 << 9;
        const OTHER = 1 << 10;
        const COPPER = 1 << 11;
        const FIBER = 1 << 12;
        const AUTONEG = 1 << 13;
        const PAUSE = 1 << 14;
        const PAUSE_ASYM = 1 << 15;
    }
}

bitflags! {
    /// Flow-mod flags (`OFPFF_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FlowModFlags: u16 {
        const SEND_FLOW_REM = 1 << 0;
        const CHECK_OVERLAP = 1 << 1;
        const RESET_COUNTS = 1 << 2;
        const NO_PKT_COUNTS = 1 << 3;
        const NO_BYT_COUNTS = 1 << 4;
    }
}

bitflags! {
    /// Meter configuration flags (`OFPMF_*`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MeterFlags: u16 {
        const KBPS = 1 << 0;
        const PKTPS = 1 << 1;
        const BURST = 1 << 2;
        const STATS = 1 << 3;
    }
}

/// Flow-mod commands (`OFPFC_*`).
pub const OFPFC_ADD: u8 = 0;
pub const OFPFC_MODIFY: u8 = 1;
pub const OFPFC_MODIFY_STRICT: u8 = 2;
pub const OFPFC_DELETE: u8 = 3;
pub const OFPFC_DELETE_STRICT: u8 = 4;

/// Group-mod commands (`OFPGC_*`).
pub const OFPGC_ADD: u16 = 0;
pub const OFPGC_MODIFY: u16 = 1;
pub const OFPGC_DELETE: u16 = 2;
pub const GROUP_COMMAND_MAX: u16 = OFPGC_DELETE;

/// Group types (`OFPGT_*`).
pub const OFPGT_ALL: u8 = 0;
pub const OFPGT_SELECT: u8 = 1;
pub const OFPGT_INDIRECT: u8 = 2;
pub const OFPGT_FF: u8 = 3;
pub const GROUP_TYPE_MAX: u8 = OFPGT_FF;

/// All defined group types as a one-hot set, for `group_features.types`.
pub const GROUP_TYPE_BITS: u32 =
    (1 << OFPGT_ALL) | (1 << OFPGT_SELECT) | (1 << OFPGT_INDIRECT) | (1 << OFPGT_FF);

/// Meter-mod commands (`OFPMC_*`).
pub const OFPMC_ADD: u16 = 0;
pub const OFPMC_MODIFY: u16 = 1;
pub const OFPMC_DELETE: u16 = 2;
pub const METER_COMMAND_MAX: u16 = OFPMC_DELETE;

/// Meter band types (`OFPMBT_*`).
pub const OFPMBT_DROP: u16 = 1;
pub const OFPMBT_DSCP_REMARK: u16 = 2;
pub const OFPMBT_EXPERIMENTER: u16 = 0xffff;
pub const METER_BAND_MAX: u16 = OFPMBT_DSCP_REMARK;

/// Packet-in reasons (`OFPR_*`).
pub const OFPR_NO_MATCH: u8 = 0;
pub const OFPR_ACTION: u8 = 1;
pub const OFPR_INVALID_TTL: u8 = 2;
pub const PACKET_IN_REASON_MAX: u8 = OFPR_INVALID_TTL;

/// Flow-removed reasons (`OFPRR_*`).
pub const OFPRR_IDLE_TIMEOUT: u8 = 0;
pub const OFPRR_HARD_TIMEOUT: u8 = 1;
pub const OFPRR_DELETE: u8 = 2;
pub const OFPRR_GROUP_DELETE: u8 = 3;
pub const FLOW_REMOVED_REASON_MAX: u8 = OFPRR_GROUP_DELETE;

/// Port-status reasons (`OFPPR_*`).
pub const OFPPR_ADD: u8 = 0;
pub const OFPPR_DELETE: u8 = 1;
pub const OFPPR_MODIFY: u8 = 2;
pub const PORT_STATUS_REASON_MAX: u8 = OFPPR_MODIFY;

/// Async-config mask bits, one-hot over the reason enums above.
pub const PACKET_IN_MASK_BITS: u32 =
    (1 << OFPR_NO_MATCH) | (1 << OFPR_ACTION) | (1 << OFPR_INVALID_TTL);
pub const PORT_STATUS_MASK_BITS: u32 =
    (1 << OFPPR_ADD) | (1 << OFPPR_DELETE) | (1 << OFPPR_MODIFY);
pub const FLOW_REMOVED_MASK_BITS: u32 = (1 << OFPRR_IDLE_TIMEOUT)
    | (1 << OFPRR_HARD_TIMEOUT)
    | (1 << OFPRR_DELETE)
    | (1 << OFPRR_GROUP_DELETE);

/// Controller roles (`OFPCR_ROLE_*`).
pub const OFPCR_ROLE_NOCHANGE: u32 = 0;
pub const OFPCR_ROLE_EQUAL: u32 = 1;
pub const OFPCR_ROLE_MASTER: u32 = 2;
pub const OFPCR_ROLE_SLAVE: u32 = 3;
pub const CONTROLLER_ROLE_MAX: u32 = OFPCR_ROLE_SLAVE;

/// Action types (`OFPAT_*`).
pub mod action_type {
    pub const OFPAT_OUTPUT: u16 = 0;
    pub const OFPAT_COPY_TTL_OUT: u16 = 11;
    pub const OFPAT_COPY_TTL_IN: u16 = 12;
    pub const OFPAT_SET_MPLS_TTL: u16 = 15;
    pub const OFPAT_DEC_MPLS_TTL: u16 = 16;
    pub const OFPAT_PUSH_VLAN: u16 = 17;
    pub const OFPAT_POP_VLAN: u16 = 18;
    pub const OFPAT_PUSH_MPLS: u16 = 19;
    pub const OFPAT_POP_MPLS: u16 = 20;
    pub const OFPAT_SET_QUEUE: u16 = 21;
    pub const OFPAT_GROUP: u16 = 22;
    pub const OFPAT_SET_NW_TTL: u16 = 23;
    pub const OFPAT_DEC_NW_TTL: u16 = 24;
    pub const OFPAT_SET_FIELD: u16 = 25;
    pub const OFPAT_PUSH_PBB: u16 = 26;
    pub const OFPAT_POP_PBB: u16 = 27;
    pub const OFPAT_EXPERIMENTER: u16 = 0xffff;
}

/// Instruction types (`OFPIT_*`).
pub mod instruction_type {
    pub const OFPIT_GOTO_TABLE: u16 = 1;
    pub const OFPIT_WRITE_METADATA: u16 = 2;
    pub const OFPIT_WRITE_ACTIONS: u16 = 3;
    pub const OFPIT_APPLY_ACTIONS: u16 = 4;
    pub const OFPIT_CLEAR_ACTIONS: u16 = 5;
    pub const OFPIT_METER: u16 = 6;
    pub const OFPIT_EXPERIMENTER: u16 = 0xffff;
}

/// Multipart (stats) sub-types (`OFPMP_*`).
pub mod multipart_type {
    pub const OFPMP_DESC: u16 = 0;
    pub const OFPMP_FLOW: u16 = 1;
    pub const OFPMP_AGGREGATE: u16 = 2;
    pub const OFPMP_TABLE: u16 = 3;
    pub const OFPMP_PORT_STATS: u16 = 4;
    pub const OFPMP_QUEUE: u16 = 5;
    pub const OFPMP_GROUP: u16 = 6;
    pub const OFPMP_GROUP_DESC: u16 = 7;
    pub const OFPMP_GROUP_FEATURES: u16 = 8;
    pub const OFPMP_METER: u16 = 9;
    pub const OFPMP_METER_CONFIG: u16 = 10;
    pub const OFPMP_METER_FEATURES: u16 = 11;
    pub const OFPMP_TABLE_FEATURES: u16 = 12;
    pub const OFPMP_PORT_DESC: u16 = 13;
    pub const OFPMP_EXPERIMENTER: u16 = 0xffff;
}

/// Multipart request/reply flags.
pub const OFPMPF_REQ_MORE: u16 = 1 << 0;
pub const OFPMPF_REPLY_MORE: u16 = 1 << 0;

/// Hello element types (`OFPHET_*`).
pub const OFPHET_VERSIONBITMAP: u16 = 1;

/// Queue property types (`OFPQT_*`).
pub const OFPQT_MIN_RATE: u16 = 1;
pub const OFPQT_MAX_RATE: u16 = 2;
pub const OFPQT_EXPERIMENTER: u16 = 0xffff;
pub const OFPQ_ALL: u32 = 0xffff_ffff;

/// Error types (`OFPET_*`).
pub mod error_type {
    pub const OFPET_HELLO_FAILED: u16 = 0;
    pub const OFPET_BAD_REQUEST: u16 = 1;
    pub const OFPET_BAD_ACTION: u16 = 2;
    pub const OFPET_BAD_INSTRUCTION: u16 = 3;
    pub const OFPET_BAD_MATCH: u16 = 4;
    pub const OFPET_FLOW_MOD_FAILED: u16 = 5;
    pub const OFPET_GROUP_MOD_FAILED: u16 = 6;
    pub const OFPET_PORT_MOD_FAILED: u16 = 7;
    pub const OFPET_TABLE_MOD_FAILED: u16 = 8;
    pub const OFPET_QUEUE_OP_FAILED: u16 = 9;
    pub const OFPET_SWITCH_CONFIG_FAILED: u16 = 10;
    pub const OFPET_ROLE_REQUEST_FAILED: u16 = 11;
    pub const OFPET_METER_MOD_FAILED: u16 = 12;
    pub const OFPET_TABLE_FEATURES_FAILED: u16 = 13;
    pub const OFPET_EXPERIMENTER: u16 = 0xffff;
}

/// Error codes, per error type.
pub mod error_code {
    // OFPET_HELLO_FAILED
    pub const OFPHFC_INCOMPATIBLE: u16 = 0;
    pub const OFPHFC_EPERM: u16 = 1;

    // OFPET_BAD_REQUEST
    pub const OFPBRC_BAD_VERSION: u16 = 0;
    pub const OFPBRC_BAD_TYPE: u16 = 1;
    pub const OFPBRC_BAD_MULTIPART: u16 = 2;
    pub const OFPBRC_BAD_EXPERIMENTER: u16 = 3;
    pub const OFPBRC_BAD_EXP_TYPE: u16 = 4;
    pub const OFPBRC_EPERM: u16 = 5;
    pub const OFPBRC_BAD_LEN: u16 = 6;
    pub const OFPBRC_BUFFER_EMPTY: u16 = 7;
    pub const OFPBRC_BUFFER_UNKNOWN: u16 = 8;
    pub const OFPBRC_BAD_TABLE_ID: u16 = 9;
    pub const OFPBRC_IS_SLAVE: u16 = 10;
    pub const OFPBRC_BAD_PORT: u16 = 11;
    pub const OFPBRC_BAD_PACKET: u16 = 12;
    pub const OFPBRC_MULTIPART_BUFFER_OVERFLOW: u16 = 13;

    // OFPET_BAD_ACTION
    pub const OFPBAC_BAD_TYPE: u16 = 0;
    pub const OFPBAC_BAD_LEN: u16 = 1;
    pub const OFPBAC_BAD_EXPERIMENTER: u16 = 2;
    pub const OFPBAC_BAD_EXP_TYPE: u16 = 3;
    pub const OFPBAC_BAD_OUT_PORT: u16 = 4;
    pub const OFPBAC_BAD_ARGUMENT: u16 = 5;
    pub const OFPBAC_EPERM: u16 = 6;
    pub const OFPBAC_TOO_MANY: u16 = 7;
    pub const OFPBAC_BAD_QUEUE: u16 = 8;
    pub const OFPBAC_BAD_OUT_GROUP: u16 = 9;
    pub const OFPBAC_MATCH_INCONSISTENT: u16 = 10;
    pub const OFPBAC_UNSUPPORTED_ORDER: u16 = 11;
    pub const OFPBAC_BAD_TAG: u16 = 12;
    pub const OFPBAC_BAD_SET_TYPE: u16 = 13;
    pub const OFPBAC_BAD_SET_LEN: u16 = 14;
    pub const OFPBAC_BAD_SET_ARGUMENT: u16 = 15;

    // OFPET_BAD_INSTRUCTION
    pub const OFPBIC_UNKNOWN_INST: u16 = 0;
    pub const OFPBIC_UNSUP_INST: u16 = 1;
    pub const OFPBIC_BAD_TABLE_ID: u16 = 2;
    pub const OFPBIC_UNSUP_METADATA: u16 = 3;
    pub const OFPBIC_UNSUP_METADATA_MASK: u16 = 4;
    pub const OFPBIC_BAD_EXPERIMENTER: u16 = 5;
    pub const OFPBIC_BAD_EXP_TYPE: u16 = 6;
    pub const OFPBIC_BAD_LEN: u16 = 7;
    pub const OFPBIC_EPERM: u16 = 8;

    // OFPET_BAD_MATCH
    pub const OFPBMC_BAD_TYPE: u16 = 0;
    pub const OFPBMC_BAD_LEN: u16 = 1;
    pub const OFPBMC_BAD_TAG: u16 = 2;
    pub const OFPBMC_BAD_DL_ADDR_MASK: u16 = 3;
    pub const OFPBMC_BAD_NW_ADDR_MASK: u16 = 4;
    pub const OFPBMC_BAD_WILDCARDS: u16 = 5;
    pub const OFPBMC_BAD_FIELD: u16 = 6;
    pub const OFPBMC_BAD_VALUE: u16 = 7;
    pub const OFPBMC_BAD_MASK: u16 = 8;
    pub const OFPBMC_BAD_PREREQ: u16 = 9;
    pub const OFPBMC_DUP_FIELD: u16 = 10;
    pub const OFPBMC_EPERM: u16 = 11;

    // OFPET_FLOW_MOD_FAILED
    pub const OFPFMFC_UNKNOWN: u16 = 0;
    pub const OFPFMFC_TABLE_FULL: u16 = 1;
    pub const OFPFMFC_BAD_TABLE_ID: u16 = 2;
    pub const OFPFMFC_OVERLAP: u16 = 3;
    pub const OFPFMFC_EPERM: u16 = 4;
    pub const OFPFMFC_BAD_TIMEOUT: u16 = 5;
    pub const OFPFMFC_BAD_COMMAND: u16 = 6;
    pub const OFPFMFC_BAD_FLAGS: u16 = 7;

    // OFPET_GROUP_MOD_FAILED
    pub const OFPGMFC_GROUP_EXISTS: u16 = 0;
    pub const OFPGMFC_INVALID_GROUP: u16 = 1;
    pub const OFPGMFC_WEIGHT_UNSUPPORTED: u16 = 2;
    pub const OFPGMFC_OUT_OF_GROUPS: u16 = 3;
    pub const OFPGMFC_OUT_OF_BUCKETS: u16 = 4;
    pub const OFPGMFC_CHAINING_UNSUPPORTED: u16 = 5;
    pub const OFPGMFC_WATCH_UNSUPPORTED: u16 = 6;
    pub const OFPGMFC_LOOP: u16 = 7;
    pub const OFPGMFC_UNKNOWN_GROUP: u16 = 8;
    pub const OFPGMFC_CHAINED_GROUP: u16 = 9;
    pub const OFPGMFC_BAD_TYPE: u16 = 10;
    pub const OFPGMFC_BAD_COMMAND: u16 = 11;
    pub const OFPGMFC_BAD_BUCKET: u16 = 12;
    pub const OFPGMFC_BAD_WATCH: u16 = 13;
    pub const OFPGMFC_EPERM: u16 = 14;

    // OFPET_PORT_MOD_FAILED
    pub const OFPPMFC_BAD_PORT: u16 = 0;
    pub const OFPPMFC_BAD_HW_ADDR: u16 = 1;
    pub const OFPPMFC_BAD_CONFIG: u16 = 2;
    pub const OFPPMFC_BAD_ADVERTISE: u16 = 3;
    pub const OFPPMFC_EPERM: u16 = 4;

    // OFPET_TABLE_MOD_FAILED
    pub const OFPTMFC_BAD_TABLE: u16 = 0;
    pub const OFPTMFC_BAD_CONFIG: u16 = 1;
    pub const OFPTMFC_EPERM: u16 = 2;

    // OFPET_QUEUE_OP_FAILED
    pub const OFPQOFC_BAD_PORT: u16 = 0;
    pub const OFPQOFC_BAD_QUEUE: u16 = 1;
    pub const OFPQOFC_EPERM: u16 = 2;

    // OFPET_SWITCH_CONFIG_FAILED
    pub const OFPSCFC_BAD_FLAGS: u16 = 0;
    pub const OFPSCFC_BAD_LEN: u16 = 1;
    pub const OFPSCFC_EPERM: u16 = 2;

    // OFPET_ROLE_REQUEST_FAILED
    pub const OFPRRFC_STALE: u16 = 0;
    pub const OFPRRFC_UNSUP: u16 = 1;
    pub const OFPRRFC_BAD_ROLE: u16 = 2;

    // OFPET_METER_MOD_FAILED
    pub const OFPMMFC_UNKNOWN: u16 = 0;
    pub const OFPMMFC_METER_EXISTS: u16 = 1;
    pub const OFPMMFC_INVALID_METER: u16 = 2;
    pub const OFPMMFC_UNKNOWN_METER: u16 = 3;
    pub const OFPMMFC_BAD_COMMAND: u16 = 4;
    pub const OFPMMFC_BAD_FLAGS: u16 = 5;
    pub const OFPMMFC_BAD_RATE: u16 = 6;
    pub const OFPMMFC_BAD_BURST: u16 = 7;
    pub const OFPMMFC_BAD_BAND: u16 = 8;
    pub const OFPMMFC_BAD_BAND_VALUE: u16 = 9;
    pub const OFPMMFC_OUT_OF_METERS: u16 = 10;
    pub const OFPMMFC_OUT_OF_BANDS: u16 = 11;
}

/// VLAN `vid` special values on the wire.
pub const OFPVID_PRESENT: u16 = 0x1000;
pub const OFPVID_NONE: u16 = 0x0000;

/// Value-range masks for OXM fields carrying fewer bits than their
/// carrier integer. Violations are clamped on append and rejected on
/// validation.
pub const VLAN_VID_MASK: u16 = 0x1fff; // 12 bits + OFPVID_PRESENT
pub const VLAN_PCP_MASK: u8 = 0x07;
pub const IP_DSCP_MASK: u8 = 0x3f;
pub const IP_ECN_MASK: u8 = 0x03;
pub const IPV6_FLABEL_MASK: u32 = 0x000f_ffff;
pub const MPLS_LABEL_MASK: u32 = 0x000f_ffff;
pub const MPLS_TC_MASK: u8 = 0x07;
pub const MPLS_BOS_MASK: u8 = 0x01;
pub const PBB_ISID_MASK: u32 = 0x00ff_ffff;
pub const IPV6_EXTHDR_MASK: u16 = 0x01ff;

/// Table config bits are deprecated in 1.3; only these two may appear.
pub const OFPTC_DEPRECATED_MASK: u32 = 3;

/// Lengths of the `ofp_desc` string fields.
pub const DESC_STR_LEN: usize = 256;
pub const SERIAL_NUM_LEN: usize = 32;

/// Length of `ofp_port.name`.
pub const OFP_MAX_PORT_NAME_LEN: usize = 16;

/// Ethernet framing limits used by the packet-out contract.
pub const ETH_ADDRLEN: usize = 6;
pub const ETH_FCS_LENGTH: usize = 4;
pub const ETH_MINIMUM_LENGTH: usize = 64;
