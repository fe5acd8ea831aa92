// SPDX-License-Identifier: Apache-2.0
// Copyright SoftFlow Authors

//! Cross-worker transport: a bounded FIFO paired with an event-fd.
//!
//! The producer enqueues and bumps a local wake counter; its loop calls
//! [`Sender::flush_wakeup`] once per iteration, which writes the
//! accumulated count to the peer's event-fd in one syscall (batched
//! wakeup). The consumer reads the `u64` count and dequeues exactly
//! that many messages. FIFO order holds per direction; nothing is
//! promised across directions.

use std::collections::VecDeque;
use std::os::fd::{AsFd, AsRawFd, RawFd};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use nix::sys::eventfd::{EfdFlags, EventFd as OsEventFd};
use parking_lot::Mutex;
use tracing::error;

/// A non-blocking event-fd carrying a wake counter.
pub struct EventFd {
    fd: OsEventFd,
}

impl EventFd {
    pub fn new() -> nix::Result<EventFd> {
        Ok(EventFd {
            fd: OsEventFd::from_value_and_flags(0, EfdFlags::EFD_NONBLOCK)?,
        })
    }

    /// Add `count` to the counter. `EAGAIN`/`EINTR` report as `Err` and
    /// the caller retries on its next loop iteration.
    pub fn write(&self, count: u64) -> nix::Result<()> {
        nix::unistd::write(self.fd.as_fd(), &count.to_ne_bytes()).map(|_| ())
    }

    /// Read and clear the counter; 0 when nothing is pending.
    pub fn read(&self) -> u64 {
        let mut raw = [0u8; 8];
        match nix::unistd::read(self.fd.as_fd(), &mut raw) {
            Ok(8) => u64::from_ne_bytes(raw),
            Ok(_) => 0,
            Err(nix::errno::Errno::EAGAIN | nix::errno::Errno::EINTR) => 0,
            Err(err) => {
                error!("failed to read the wakeup counter: {err}");
                0
            }
        }
    }

    pub fn raw_fd(&self) -> RawFd {
        self.fd.as_fd().as_raw_fd()
    }
}

struct Shared<T> {
    queue: Mutex<VecDeque<T>>,
    capacity: usize,
    efd: EventFd,
}

/// Producer half. Owned by exactly one worker thread.
pub struct Sender<T> {
    shared: Arc<Shared<T>>,
    /// Wakes accumulated since the last successful event-fd write.
    send_count: AtomicU64,
}

/// Consumer half. Owned by exactly one worker thread.
pub struct Receiver<T> {
    shared: Arc<Shared<T>>,
}

/// The queue rejected a message because it is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("cross-worker queue full ( capacity = {0} )")]
pub struct QueueFull(pub usize);

/// Create one direction of the transport.
pub fn channel<T>(capacity: usize) -> nix::Result<(Sender<T>, Receiver<T>)> {
    let shared = Arc::new(Shared {
        queue: Mutex::new(VecDeque::with_capacity(capacity)),
        capacity,
        efd: EventFd::new()?,
    });
    Ok((
        Sender { shared: Arc::clone(&shared), send_count: AtomicU64::new(0) },
        Receiver { shared },
    ))
}

impl<T> Sender<T> {
    /// Enqueue a message and schedule a wakeup for it.
    pub fn enqueue(&self, message: T) -> Result<(), QueueFull> {
        {
            let mut queue = self.shared.queue.lock();
            if queue.len() >= self.shared.capacity {
                return Err(QueueFull(self.shared.capacity));
            }
            queue.push_back(message);
        }
        self.send_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Write the accumulated wake count to the peer's event-fd. Called
    /// once per producer loop iteration; on a transient failure the
    /// count is kept for the next iteration.
    pub fn flush_wakeup(&self) {
        let pending = self.send_count.swap(0, Ordering::Relaxed);
        if pending == 0 {
            return;
        }
        if let Err(err) = self.shared.efd.write(pending) {
            self.send_count.fetch_add(pending, Ordering::Relaxed);
            if !matches!(err, nix::errno::Errno::EAGAIN | nix::errno::Errno::EINTR) {
                error!("failed to notify the peer worker ( count = {pending} ): {err}");
            }
        }
    }

    /// Whether a flush is still owed.
    pub fn wakeup_pending(&self) -> bool {
        self.send_count.load(Ordering::Relaxed) != 0
    }
}

impl<T> Receiver<T> {
    /// Consume the event-fd counter and dequeue exactly that many
    /// messages.
    pub fn drain_wakeup(&self) -> Vec<T> {
        let count = self.shared.efd.read();
        let mut queue = self.shared.queue.lock();
        let take = (count as usize).min(queue.len());
        queue.drain(..take).collect()
    }

    pub fn raw_fd(&self) -> RawFd {
        self.shared.efd.raw_fd()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fifo_order_and_batched_wakeup() {
        let (tx, rx) = channel::<u32>(8).unwrap();
        tx.enqueue(1).unwrap();
        tx.enqueue(2).unwrap();
        tx.enqueue(3).unwrap();
        assert!(tx.wakeup_pending());
        tx.flush_wakeup();
        assert!(!tx.wakeup_pending());

        assert_eq!(rx.drain_wakeup(), vec![1, 2, 3]);
        // a second read sees a cleared counter
        assert!(rx.drain_wakeup().is_empty());
    }

    #[test]
    fn full_queue_rejects_the_producer() {
        let (tx, rx) = channel::<u32>(2).unwrap();
        tx.enqueue(1).unwrap();
        tx.enqueue(2).unwrap();
        assert_eq!(tx.enqueue(3), Err(QueueFull(2)));
        tx.flush_wakeup();
        assert_eq!(rx.drain_wakeup(), vec![1, 2]);
    }

    #[test]
    fn wakeups_accumulate_across_flushes() {
        let (tx, rx) = channel::<u32>(8).unwrap();
        tx.enqueue(1).unwrap();
        tx.flush_wakeup();
        tx.enqueue(2).unwrap();
        tx.flush_wakeup();
        // the consumer sees one combined counter
        assert_eq!(rx.drain_wakeup(), vec![1, 2]);
    }

    #[test]
    fn cross_thread_delivery() {
        let (tx, rx) = channel::<u32>(1024).unwrap();
        let producer = std::thread::spawn(move || {
            for i in 0..1000 {
                tx.enqueue(i).unwrap();
                if i % 64 == 0 {
                    tx.flush_wakeup();
                }
            }
            tx.flush_wakeup();
        });

        let mut seen = Vec::new();
        while seen.len() < 1000 {
            seen.extend(rx.drain_wakeup());
        }
        producer.join().unwrap();
        assert_eq!(seen, (0..1000).collect::<Vec<_>>());
    }
}
