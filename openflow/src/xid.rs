// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Process-wide transaction-id and cookie generators.
//!
//! Both counters are stamped with the process id in their upper bits at
//! initialisation; only the lower partition increments, and it wraps
//! within the pid partition so two switch processes never collide on a
//! transaction id or cookie.

use parking_lot::Mutex;
use tracing::debug;

static TRANSACTION_ID: Mutex<u32> = Mutex::new(0);
static COOKIE: Mutex<u64> = Mutex::new(0);

const XID_COUNTER_MASK: u32 = 0x0000_ffff;
const COOKIE_COUNTER_MASK: u64 = 0x0000_ffff_ffff_ffff;

/// Seed both generators from the process id. Call once at startup.
pub fn init(pid: u32) {
    let mut xid = TRANSACTION_ID.lock();
    *xid = pid << 16;
    let mut cookie = COOKIE.lock();
    *cookie = u64::from(pid) << 48;
    debug!(
        "transaction_id and cookie initialized ( transaction_id = {:#x}, cookie = {:#x} )",
        *xid, *cookie
    );
}

/// Return the next transaction id.
///
/// The low 16 bits wrap to zero when exhausted; the pid-stamped upper
/// half never changes.
pub fn next_transaction_id() -> u32 {
    let mut xid = TRANSACTION_ID.lock();
    if *xid & XID_COUNTER_MASK == XID_COUNTER_MASK {
        *xid &= !XID_COUNTER_MASK;
    } else {
        *xid += 1;
    }
    *xid
}

/// Return the next cookie. Same scheme as [`next_transaction_id`] over a
/// 48-bit counter with a 16-bit pid tag.
pub fn next_cookie() -> u64 {
    let mut cookie = COOKIE.lock();
    if *cookie & COOKIE_COUNTER_MASK == COOKIE_COUNTER_MASK {
        *cookie &= !COOKIE_COUNTER_MASK;
    } else {
        *cookie += 1;
    }
    *cookie
}

/// Force the counters to explicit raw values. Test hook.
pub fn set_raw(xid: u32, cookie: u64) {
    *TRANSACTION_ID.lock() = xid;
    *COOKIE.lock() = cookie;
}

#[cfg(test)]
mod test {
    use super::{next_cookie, next_transaction_id, set_raw};

    // One test body: the generators are process-wide, so concurrent test
    // threads would trample each other's seeds.
    #[test]
    fn counters_wrap_within_pid_partition() {
        let pid = 0x1234u32;
        set_raw((pid << 16) | 0xfffd, (0x00abu64 << 48) | 0x0000_ffff_ffff_fffe);

        assert_eq!(next_transaction_id(), (pid << 16) | 0xfffe);
        assert_eq!(next_transaction_id(), (pid << 16) | 0xffff);
        assert_eq!(next_transaction_id(), pid << 16);
        assert_eq!(next_transaction_id(), (pid << 16) | 1);

        assert_eq!(next_cookie(), (0x00abu64 << 48) | 0x0000_ffff_ffff_ffff);
        assert_eq!(next_cookie(), 0x00abu64 << 48);
    }
}
