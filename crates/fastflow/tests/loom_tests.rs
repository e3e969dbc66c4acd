//! Loom-based concurrency tests for the offer/drain protocol.
//!
//! Run with: `cargo test --features loom --test loom_tests --release`
//!
//! Loom exhaustively explores thread interleavings. The protocol is modelled
//! here with loom's atomics and `UnsafeCell` (which reports unsynchronized slot
//! access) using the same orderings as `FastFlowBuffer`, on a two-slot buffer
//! to keep the state space small.

#![cfg(feature = "loom")]

use loom::cell::UnsafeCell;
use loom::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use loom::sync::Arc;
use loom::thread;

const CAPACITY: u64 = 2;
const MASK: u64 = CAPACITY - 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failed,
    Full,
}

struct LoomBuffer {
    read_cache: AtomicU64,
    read_counter: AtomicU64,
    write_counter: AtomicU64,
    values: [UnsafeCell<u64>; 2],
    published: [AtomicBool; 2],
}

unsafe impl Send for LoomBuffer {}
unsafe impl Sync for LoomBuffer {}

impl LoomBuffer {
    fn new() -> Self {
        Self {
            read_cache: AtomicU64::new(0),
            read_counter: AtomicU64::new(0),
            write_counter: AtomicU64::new(0),
            values: [UnsafeCell::new(0), UnsafeCell::new(0)],
            published: [AtomicBool::new(false), AtomicBool::new(false)],
        }
    }

    fn offer(&self, value: u64) -> Outcome {
        let mut head = self.read_cache.load(Ordering::Acquire);
        let tail = self.write_counter.load(Ordering::Relaxed);

        if tail.saturating_sub(head) >= CAPACITY {
            head = self.read_counter.load(Ordering::Acquire);
            if tail.saturating_sub(head) >= CAPACITY {
                return Outcome::Full;
            }
            self.read_cache.store(head, Ordering::Release);
        }

        if self
            .write_counter
            .compare_exchange(tail, tail + 1, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Outcome::Failed;
        }

        let idx = (tail & MASK) as usize;
        // SAFETY: the CAS above reserved this slot
        self.values[idx].with_mut(|ptr| unsafe { *ptr = value });
        self.published[idx].store(true, Ordering::Release);
        Outcome::Success
    }

    fn offer_retrying(&self, value: u64) -> Outcome {
        loop {
            match self.offer(value) {
                Outcome::Failed => thread::yield_now(),
                outcome => return outcome,
            }
        }
    }

    /// Single consumer only.
    fn drain(&self, out: &mut Vec<u64>) {
        let mut head = self.read_counter.load(Ordering::Relaxed);
        let tail = self.write_counter.load(Ordering::Relaxed);

        while head != tail {
            let idx = (head & MASK) as usize;
            if !self.published[idx].load(Ordering::Acquire) {
                break;
            }
            // SAFETY: the Acquire load above pairs with the publishing store
            out.push(self.values[idx].with(|ptr| unsafe { *ptr }));
            self.published[idx].store(false, Ordering::Release);
            head += 1;
        }
        self.read_counter.store(head, Ordering::Release);
    }
}

/// Two producers racing for slots: each value is delivered exactly once.
#[test]
fn loom_two_producers_no_double_reservation() {
    loom::model(|| {
        let buffer = Arc::new(LoomBuffer::new());

        let producers: Vec<_> = [10, 20]
            .into_iter()
            .map(|value| {
                let buf = Arc::clone(&buffer);
                thread::spawn(move || buf.offer_retrying(value))
            })
            .collect();

        for p in producers {
            assert_eq!(p.join().unwrap(), Outcome::Success);
        }

        let mut out = Vec::new();
        buffer.drain(&mut out);
        out.sort_unstable();
        assert_eq!(out, vec![10, 20]);
        assert_eq!(buffer.write_counter.load(Ordering::SeqCst), 2);
    });
}

/// A drain racing a producer sees a prefix of its offers, in order.
#[test]
fn loom_drain_concurrent_with_producer_preserves_order() {
    loom::model(|| {
        let buffer = Arc::new(LoomBuffer::new());
        let buf = Arc::clone(&buffer);

        let producer = thread::spawn(move || {
            assert_eq!(buf.offer(1), Outcome::Success);
            assert_eq!(buf.offer(2), Outcome::Success);
        });

        let mut out = Vec::new();
        buffer.drain(&mut out);
        assert!(out.is_empty() || out == [1] || out == [1, 2], "got {:?}", out);

        producer.join().unwrap();
        buffer.drain(&mut out);
        assert_eq!(out, vec![1, 2]);
    });
}

/// A producer reusing a slot never races the consumer's read of the old value.
#[test]
fn loom_slot_reuse_after_drain() {
    loom::model(|| {
        let buffer = Arc::new(LoomBuffer::new());
        assert_eq!(buffer.offer(1), Outcome::Success);
        assert_eq!(buffer.offer(2), Outcome::Success);
        assert_eq!(buffer.offer(3), Outcome::Full);

        let buf = Arc::clone(&buffer);
        let consumer = thread::spawn(move || {
            let mut out = Vec::new();
            buf.drain(&mut out);
            out
        });

        // Either still full, or the drain finished and slot 0 is reused.
        let outcome = buffer.offer(3);
        assert_ne!(outcome, Outcome::Failed);

        let mut out = consumer.join().unwrap();
        assert_eq!(out, vec![1, 2]);

        if outcome == Outcome::Full {
            assert_eq!(buffer.offer(3), Outcome::Success);
        }
        buffer.drain(&mut out);
        assert_eq!(out, vec![1, 2, 3]);
    });
}

/// Stale read cache: a refresh never lets the cache run ahead of the counter.
#[test]
fn loom_read_cache_never_ahead() {
    loom::model(|| {
        let buffer = Arc::new(LoomBuffer::new());
        assert_eq!(buffer.offer(1), Outcome::Success);
        assert_eq!(buffer.offer(2), Outcome::Success);

        let buf = Arc::clone(&buffer);
        let consumer = thread::spawn(move || {
            let mut out = Vec::new();
            buf.drain(&mut out);
        });

        let buf = Arc::clone(&buffer);
        let producer = thread::spawn(move || {
            let _ = buf.offer(3);
            let cache = buf.read_cache.load(Ordering::Acquire);
            let reads = buf.read_counter.load(Ordering::Acquire);
            assert!(cache <= reads, "cache {} ahead of reads {}", cache, reads);
        });

        consumer.join().unwrap();
        producer.join().unwrap();
    });
}
