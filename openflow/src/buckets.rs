// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Group buckets: weight, watch port/group, and an embedded action list.

use crate::actions::{ActionList, LengthOverflow, validate_actions};
use crate::buffer::Buffer;
use crate::error::ErrorKind;

/// `sizeof(struct ofp_bucket)`: len, weight, watch_port, watch_group, pad.
pub const BUCKET_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub weight: u16,
    pub watch_port: u32,
    pub watch_group: u32,
    pub actions: ActionList,
}

impl Bucket {
    #[must_use]
    pub fn new(weight: u16, watch_port: u32, watch_group: u32, actions: ActionList) -> Bucket {
        Bucket { weight, watch_port, watch_group, actions }
    }

    /// `bucket.len`: header plus the packed action list.
    pub fn wire_len(&self) -> Result<usize, LengthOverflow> {
        Ok(BUCKET_HEADER_LEN + self.actions.length()? as usize)
    }

    pub fn pack(&self, buf: &mut Buffer) -> Result<(), LengthOverflow> {
        let len = self.wire_len()?;
        buf.put_u16(len as u16);
        buf.put_u16(self.weight);
        buf.put_u32(self.watch_port);
        buf.put_u32(self.watch_group);
        buf.put_zeros(4);
        self.actions.pack(buf);
        Ok(())
    }

    /// Decode one bucket from validated bytes.
    pub fn unpack(raw: &[u8]) -> Result<(Bucket, usize), ErrorKind> {
        if raw.len() < BUCKET_HEADER_LEN {
            return Err(ErrorKind::InvalidLength);
        }
        let len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
        if len < BUCKET_HEADER_LEN || raw.len() < len {
            return Err(ErrorKind::InvalidLength);
        }
        let bucket = Bucket {
            weight: u16::from_be_bytes([raw[2], raw[3]]),
            watch_port: u32::from_be_bytes([raw[4], raw[5], raw[6], raw[7]]),
            watch_group: u32::from_be_bytes([raw[8], raw[9], raw[10], raw[11]]),
            actions: ActionList::unpack(&raw[BUCKET_HEADER_LEN..len])?,
        };
        Ok((bucket, len))
    }
}

/// An ordered bucket list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BucketList {
    buckets: Vec<Bucket>,
}

impl BucketList {
    #[must_use]
    pub fn new() -> BucketList {
        BucketList::default()
    }

    #[must_use]
    pub fn n_buckets(&self) -> usize {
        self.buckets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Bucket> {
        self.buckets.iter()
    }

    pub fn append(&mut self, bucket: Bucket) {
        self.buckets.push(bucket);
    }

    /// Total wire length of all buckets; errors where the C code aborts.
    pub fn length(&self) -> Result<u16, LengthOverflow> {
        let mut total = 0usize;
        for bucket in &self.buckets {
            total += bucket.wire_len()?;
        }
        u16::try_from(total).map_err(|_| LengthOverflow(total))
    }

    pub fn pack(&self, buf: &mut Buffer) -> Result<(), LengthOverflow> {
        for bucket in &self.buckets {
            bucket.pack(buf)?;
        }
        Ok(())
    }

    pub fn unpack(mut raw: &[u8]) -> Result<BucketList, ErrorKind> {
        let mut list = BucketList::new();
        while !raw.is_empty() {
            let (bucket, consumed) = Bucket::unpack(raw)?;
            list.append(bucket);
            raw = &raw[consumed..];
        }
        Ok(list)
    }
}

impl FromIterator<Bucket> for BucketList {
    fn from_iter<I: IntoIterator<Item = Bucket>>(iter: I) -> BucketList {
        BucketList {
            buckets: iter.into_iter().collect(),
        }
    }
}

/// Validate one packed bucket; returns its declared length.
pub fn validate_bucket(raw: &[u8]) -> Result<usize, ErrorKind> {
    if raw.len() < BUCKET_HEADER_LEN {
        return Err(ErrorKind::InvalidLength);
    }
    let len = u16::from_be_bytes([raw[0], raw[1]]) as usize;
    if len < BUCKET_HEADER_LEN || raw.len() < len {
        return Err(ErrorKind::InvalidLength);
    }
    validate_actions(&raw[BUCKET_HEADER_LEN..len])?;
    Ok(len)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::actions::Action;
    use pretty_assertions::assert_eq;

    #[test]
    fn bucket_layout_and_round_trip() {
        let actions: ActionList =
            [Action::Output { port: 3, max_len: 0xffff }].into_iter().collect();
        let bucket = Bucket::new(100, 3, 0xffff_ffff, actions);
        assert_eq!(bucket.wire_len().unwrap(), 32);

        let mut buf = Buffer::new();
        bucket.pack(&mut buf).unwrap();
        assert_eq!(buf.u16_at(0), 32);
        assert_eq!(buf.u16_at(2), 100);
        assert_eq!(buf.u32_at(4), 3);
        assert_eq!(buf.u32_at(8), 0xffff_ffff);

        let (back, consumed) = Bucket::unpack(buf.as_slice()).unwrap();
        assert_eq!(consumed, 32);
        assert_eq!(back, bucket);
    }

    #[test]
    fn empty_action_list_gives_a_bare_bucket() {
        let bucket = Bucket::new(0, 0xffff_ffff, 0xffff_ffff, ActionList::new());
        let mut buf = Buffer::new();
        bucket.pack(&mut buf).unwrap();
        assert_eq!(buf.len(), BUCKET_HEADER_LEN);
        assert!(validate_bucket(buf.as_slice()).is_ok());
    }
}
