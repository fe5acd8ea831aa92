// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Connection-control messages: hello (with version-bitmap elements),
//! error, echo, experimenter, barrier.

use tracing::debug;

use crate::buffer::Buffer;
use crate::consts::OFPHET_VERSIONBITMAP;
use crate::consts::msg_type::*;
use crate::msg::create_header;
use crate::{OFP_HEADER_LEN, pad_to_64};

/// Build one `OFPHET_VERSIONBITMAP` hello element advertising the given
/// protocol versions, padded out to a 64-bit boundary.
#[must_use]
pub fn create_hello_elem_versionbitmap(versions: &[u8]) -> Buffer {
    let max_version = versions.iter().copied().max().unwrap_or(0);
    let n_bitmaps = usize::from(max_version) / 32 + 1;

    let element_length = 4 + n_bitmaps * 4;
    let mut buf = Buffer::with_capacity(element_length + pad_to_64(element_length));
    buf.put_u16(OFPHET_VERSIONBITMAP);
    buf.put_u16(element_length as u16);

    let mut bitmaps = vec![0u32; n_bitmaps];
    for version in versions {
        bitmaps[usize::from(*version) / 32] |= 1 << (u32::from(*version) % 32);
    }
    for bitmap in bitmaps {
        buf.put_u32(bitmap);
    }
    buf.put_zeros(pad_to_64(element_length));
    buf
}

/// Build a hello carrying pre-packed elements.
#[must_use]
pub fn create_hello(transaction_id: u32, elements: Option<&Buffer>) -> Buffer {
    let elements_length = elements.map_or(0, Buffer::len);
    debug!("creating a hello ( xid = {transaction_id:#x}, data length = {elements_length} )");

    let length = OFP_HEADER_LEN + elements_length;
    let mut buf = create_header(transaction_id, OFPT_HELLO, length as u16);
    if let Some(elements) = elements {
        buf.put_bytes(elements.as_slice());
    }
    buf
}

/// Build an error whose data echoes (a prefix of) the offending message.
#[must_use]
pub fn create_error(
    transaction_id: u32,
    error_type: u16,
    error_code: u16,
    data: Option<&[u8]>,
) -> Buffer {
    let data_len = data.map_or(0, <[u8]>::len);
    debug!(
        "creating an error ( xid = {transaction_id:#x}, type = {error_type:#x}, code = {error_code:#x}, data length = {data_len} )"
    );

    let length = OFP_HEADER_LEN + 4 + data_len;
    let mut buf = create_header(transaction_id, OFPT_ERROR, length as u16);
    buf.put_u16(error_type);
    buf.put_u16(error_code);
    if let Some(data) = data {
        buf.put_bytes(data);
    }
    buf
}

/// Build an experimenter error.
#[must_use]
pub fn create_error_experimenter(
    transaction_id: u32,
    exp_type: u16,
    experimenter: u32,
    data: Option<&[u8]>,
) -> Buffer {
    use crate::consts::error_type::OFPET_EXPERIMENTER;

    let data_len = data.map_or(0, <[u8]>::len);
    let length = OFP_HEADER_LEN + 8 + data_len;
    let mut buf = create_header(transaction_id, OFPT_ERROR, length as u16);
    buf.put_u16(OFPET_EXPERIMENTER);
    buf.put_u16(exp_type);
    buf.put_u32(experimenter);
    if let Some(data) = data {
        buf.put_bytes(data);
    }
    buf
}

fn create_echo(transaction_id: u32, msg_type: u8, body: Option<&[u8]>) -> Buffer {
    let body_len = body.map_or(0, <[u8]>::len);
    let length = OFP_HEADER_LEN + body_len;
    let mut buf = create_header(transaction_id, msg_type, length as u16);
    if let Some(body) = body {
        buf.put_bytes(body);
    }
    buf
}

#[must_use]
pub fn create_echo_request(transaction_id: u32, body: Option<&[u8]>) -> Buffer {
    create_echo(transaction_id, OFPT_ECHO_REQUEST, body)
}

/// The reply must carry the request body byte for byte.
#[must_use]
pub fn create_echo_reply(transaction_id: u32, body: Option<&[u8]>) -> Buffer {
    create_echo(transaction_id, OFPT_ECHO_REPLY, body)
}

#[must_use]
pub fn create_experimenter(
    transaction_id: u32,
    experimenter: u32,
    exp_type: u32,
    data: Option<&[u8]>,
) -> Buffer {
    let data_len = data.map_or(0, <[u8]>::len);
    let length = OFP_HEADER_LEN + 8 + data_len;
    let mut buf = create_header(transaction_id, OFPT_EXPERIMENTER, length as u16);
    buf.put_u32(experimenter);
    buf.put_u32(exp_type);
    if let Some(data) = data {
        buf.put_bytes(data);
    }
    buf
}

#[must_use]
pub fn create_barrier_request(transaction_id: u32) -> Buffer {
    create_header(transaction_id, OFPT_BARRIER_REQUEST, OFP_HEADER_LEN as u16)
}

#[must_use]
pub fn create_barrier_reply(transaction_id: u32) -> Buffer {
    create_header(transaction_id, OFPT_BARRIER_REPLY, OFP_HEADER_LEN as u16)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn versionbitmap_for_of13() {
        let element = create_hello_elem_versionbitmap(&[0x04]);
        // type, length = 8, one bitmap with bit 4 set, no pad needed
        assert_eq!(element.as_slice(), &[0x00, 0x01, 0x00, 0x08, 0x00, 0x00, 0x00, 0x10]);
    }

    #[test]
    fn versionbitmap_spanning_two_words() {
        let element = create_hello_elem_versionbitmap(&[0x01, 0x04, 0x21]);
        assert_eq!(element.u16_at(2), 12); // 4 + two bitmaps
        assert_eq!(element.u32_at(4), (1 << 1) | (1 << 4));
        assert_eq!(element.u32_at(8), 1 << 1); // version 0x21 -> word 1, bit 1
        assert_eq!(element.len(), 16); // padded to 64 bits
    }

    #[test]
    fn hello_wraps_the_element() {
        let element = create_hello_elem_versionbitmap(&[0x04]);
        let hello = create_hello(0x55, Some(&element));
        assert_eq!(hello.len(), 16);
        assert_eq!(hello.u16_at(2), 16);
        assert_eq!(hello.u8_at(1), OFPT_HELLO);
        assert_eq!(&hello.as_slice()[8..], element.as_slice());
    }

    #[test]
    fn echo_reply_echoes_the_body() {
        let reply = create_echo_reply(9, Some(b"ping"));
        assert_eq!(reply.len(), 12);
        assert_eq!(&reply.as_slice()[8..], b"ping");
    }

    #[test]
    fn error_carries_type_code_and_data() {
        let err = create_error(1, 4, 9, Some(&[0xde, 0xad]));
        assert_eq!(err.u16_at(8), 4);
        assert_eq!(err.u16_at(10), 9);
        assert_eq!(&err.as_slice()[12..], &[0xde, 0xad]);
    }
}
