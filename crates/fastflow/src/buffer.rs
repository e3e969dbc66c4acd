use crate::invariants::{
    debug_assert_bounded_count, debug_assert_cache_behind, debug_assert_head_not_past_tail,
    debug_assert_monotonic,
};
use crate::reservation::{Rejected, Reservation};
use crate::metrics::Metrics;
use crate::{Backoff, Config, ConfigError, MetricsSnapshot, Offer};
use crossbeam_utils::CachePadded;
use std::cell::UnsafeCell;
use std::fmt;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

// =============================================================================
// MEMORY ORDERING & SYNCHRONIZATION STRATEGY
// =============================================================================
//
// Counters are unbounded u64 sequence numbers; a slot index is `counter & mask`.
//
// **Producer (offer):**
// 1. Load `read_cache` with Acquire and `write_counter` with Relaxed. A stale
//    `write_counter` only makes the CAS below fail.
// 2. If the cache says the buffer may be full, load `read_counter` with Acquire.
//    Still full: report Full. Otherwise store it into `read_cache` with Release.
// 3. CAS `write_counter` from tail to tail + 1. Losing reports Failed.
// 4. Write the element, then store the slot's `published` flag with Release.
//
// **Consumer (drain):**
// 1. Load `read_counter` with Relaxed (sole writer) and `write_counter` with
//    Relaxed.
// 2. For each counter in [head, tail): load `published` with Acquire. Unset
//    means the slot is reserved but not yet written: stop, never skip ahead.
// 3. Move the element out, clear `published` with Release, hand it over.
// 4. Store the new head into `read_counter` with Release.
//
// A producer only reuses a slot after observing a read counter past the slot's
// previous occupant, either directly (Acquire on `read_counter`) or through a
// cache value published with Release by a producer that did. Both chains order
// the consumer's move-out before the producer's write.
//
// The cache is written by any producer and never CASed: racing refreshes may
// store an older value after a newer one, which is still <= read_counter and
// so only ever makes the full check more conservative.
//
// =============================================================================

/// One element holder.
struct Slot<E> {
    value: UnsafeCell<MaybeUninit<E>>,
    /// Set by the reserving producer after the write, cleared by the consumer.
    published: AtomicBool,
}

impl<E> Slot<E> {
    fn empty() -> Self {
        Self {
            value: UnsafeCell::new(MaybeUninit::uninit()),
            published: AtomicBool::new(false),
        }
    }
}

/// Bounded lock-free multi-producer single-consumer buffer.
///
/// Producers record elements with [`offer`](Self::offer), which never blocks and
/// may report the buffer [`Full`](Offer::Full) or that it lost a race
/// ([`Failed`](Offer::Failed)). One consumer at a time empties it in FIFO
/// reservation order with [`drain_to`](Self::drain_to).
///
/// Producers estimate free space from a shared cache of the read counter
/// (the FastFlow technique), so the consumer's counter line is only pulled
/// across cores when the cache suggests the buffer is full.
pub struct FastFlowBuffer<E> {
    // === PRODUCER SHARED === refreshed by any producer on the slow path
    read_cache: CachePadded<AtomicU64>,

    // === CONSUMER HOT === written only by the draining thread
    read_counter: CachePadded<AtomicU64>,

    // === PRODUCER HOT === advanced by CAS
    write_counter: CachePadded<AtomicU64>,

    // === COLD STATE ===
    /// Held for the duration of a guarded drain.
    draining: CachePadded<AtomicBool>,
    metrics: Metrics,
    config: Config,

    /// Fixed at construction, never resized.
    slots: Box<[Slot<E>]>,
}

// Safety: slots are handed between threads under the protocol above; an element
// is only ever accessed by one thread at a time, so E: Send is sufficient.
unsafe impl<E: Send> Send for FastFlowBuffer<E> {}
unsafe impl<E: Send> Sync for FastFlowBuffer<E> {}

impl<E> FastFlowBuffer<E> {
    /// Creates an empty buffer with `config.capacity()` slots.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::from_valid(config))
    }

    /// Creates an empty buffer with `capacity` slots; `capacity` must be a power of two.
    pub fn with_capacity(capacity: usize) -> Result<Self, ConfigError> {
        Config::for_capacity(capacity).map(Self::from_valid)
    }

    fn from_valid(config: Config) -> Self {
        let capacity = config.capacity();
        let slots = (0..capacity)
            .map(|_| Slot::empty())
            .collect::<Vec<_>>()
            .into_boxed_slice();

        tracing::debug!(
            capacity,
            metrics = config.enable_metrics,
            "created fastflow buffer"
        );

        Self {
            read_cache: CachePadded::new(AtomicU64::new(0)),
            read_counter: CachePadded::new(AtomicU64::new(0)),
            write_counter: CachePadded::new(AtomicU64::new(0)),
            draining: CachePadded::new(AtomicBool::new(false)),
            metrics: Metrics::new(),
            config,
            slots,
        }
    }

    // ---------------------------------------------------------------------
    // CONSTANTS & STATUS
    // ---------------------------------------------------------------------

    /// Returns the number of slots.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    #[inline]
    fn mask(&self) -> usize {
        self.config.mask()
    }

    /// Number of elements the consumer has drained so far.
    ///
    /// Not synchronized with [`writes`](Self::writes); use for diagnostics.
    #[inline]
    pub fn reads(&self) -> u64 {
        self.read_counter.load(Ordering::Relaxed)
    }

    /// Number of slot reservations producers have won so far.
    #[inline]
    pub fn writes(&self) -> u64 {
        self.write_counter.load(Ordering::Relaxed)
    }

    /// Advisory count of reserved but undrained slots.
    #[inline]
    pub fn len(&self) -> usize {
        let reads = self.reads();
        let writes = self.writes();
        (writes.saturating_sub(reads) as usize).min(self.capacity())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ---------------------------------------------------------------------
    // PRODUCER API
    // ---------------------------------------------------------------------

    /// Attempts to enqueue one element without blocking.
    ///
    /// On [`Failed`](Offer::Failed) or [`Full`](Offer::Full) the element is
    /// returned untouched and no slot was claimed.
    #[inline]
    pub fn offer(&self, element: E) -> Offer<E> {
        match self.reserve() {
            Ok(reservation) => {
                reservation.publish(element);
                if self.config.enable_metrics {
                    self.metrics.record_success();
                }
                Offer::Success
            }
            Err(Rejected::Failed) => {
                if self.config.enable_metrics {
                    self.metrics.record_failed();
                }
                Offer::Failed(element)
            }
            Err(Rejected::Full) => {
                if self.config.enable_metrics {
                    self.metrics.record_full();
                }
                Offer::Full(element)
            }
        }
    }

    /// Offers, retrying with a short spin whenever another producer wins the slot.
    ///
    /// Returns `Full` as soon as it is observed and `Failed` only once the spin
    /// budget is spent. Never yields or parks the thread.
    pub fn offer_with_backoff(&self, element: E) -> Offer<E> {
        retry_on_failed(element, |e| self.offer(e))
    }

    /// Claims the slot for the current write counter (offer steps 1 to 3).
    pub(crate) fn reserve(&self) -> Result<Reservation<'_, E>, Rejected> {
        let capacity = self.capacity() as u64;

        // Fast path: trust the shared cache of consumer progress.
        let mut head = self.read_cache.load(Ordering::Acquire);
        let tail = self.write_counter.load(Ordering::Relaxed);

        if tail.saturating_sub(head) >= capacity {
            // Slow path: the cache may be stale, ask the consumer's counter.
            head = self.read_counter.load(Ordering::Acquire);
            if tail.saturating_sub(head) >= capacity {
                return Err(Rejected::Full);
            }
            self.read_cache.store(head, Ordering::Release);
            debug_assert_cache_behind!(head, self.read_counter.load(Ordering::Relaxed));
            if self.config.enable_metrics {
                self.metrics.record_cache_refresh();
            }
        }

        if self
            .write_counter
            .compare_exchange(tail, tail + 1, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(Rejected::Failed);
        }

        // INV-CNT-01: Bounded Count
        debug_assert_bounded_count!(
            (tail + 1).saturating_sub(self.read_counter.load(Ordering::Relaxed)),
            capacity
        );

        Ok(Reservation::new(self, tail))
    }

    /// Writes `element` into the slot reserved for `counter` and publishes it (offer step 4).
    ///
    /// # Safety
    ///
    /// `counter` must come from a successful write-counter CAS and must not have
    /// been published before.
    #[inline]
    pub(crate) unsafe fn write_reserved(&self, counter: u64, element: E) {
        let slot = &self.slots[(counter as usize) & self.mask()];
        debug_assert!(
            !slot.published.load(Ordering::Relaxed),
            "slot for counter {} still holds an undrained element",
            counter
        );
        // SAFETY: the reservation gives exclusive access to this slot, and the
        // consumer's move-out of the previous occupant happens-before the CAS
        // that produced `counter` (see the ordering notes above).
        unsafe { (*slot.value.get()).write(element) };
        slot.published.store(true, Ordering::Release);
    }

    // ---------------------------------------------------------------------
    // CONSUMER API
    // ---------------------------------------------------------------------

    /// Hands every contiguous published element to `handler`, oldest first.
    ///
    /// Stops at the first slot that is reserved but not yet published, even if
    /// later slots are ready. Returns how many elements were delivered.
    ///
    /// Only one drain runs at a time: a call made while another thread is
    /// draining returns 0 immediately and leaves everything as it was.
    pub fn drain_to<F>(&self, handler: F) -> usize
    where
        F: FnMut(E),
    {
        if self
            .draining
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            if self.config.enable_metrics {
                self.metrics.record_contended_drain();
            }
            tracing::trace!("drain skipped: another drain is in progress");
            return 0;
        }
        let _lock = DrainLock(&self.draining);

        // SAFETY: the drain flag is held until `_lock` drops, so this is the
        // only guarded drain running.
        unsafe { self.drain_to_unchecked(handler) }
    }

    /// [`drain_to`](Self::drain_to) without the single-drainer flag.
    ///
    /// # Safety
    ///
    /// No other thread may drain this buffer (through either method) while the
    /// call runs. Callers typically guarantee this with their own lock.
    pub unsafe fn drain_to_unchecked<F>(&self, mut handler: F) -> usize
    where
        F: FnMut(E),
    {
        let head = self.read_counter.load(Ordering::Relaxed);
        let tail = self.write_counter.load(Ordering::Relaxed);
        if tail == head {
            if self.config.enable_metrics {
                self.metrics.record_drain(0, false);
            }
            return 0;
        }

        let mask = self.mask();
        let mut cursor = ReadCursor {
            read_counter: &self.read_counter,
            start: head,
            head,
        };
        let mut stalled = false;

        while cursor.head != tail {
            debug_assert_head_not_past_tail!(cursor.head, tail);

            let slot = &self.slots[(cursor.head as usize) & mask];
            if !slot.published.load(Ordering::Acquire) {
                // Reserved but not yet written.
                stalled = true;
                break;
            }

            // SAFETY: the Acquire load above synchronizes with the producer's
            // Release store after its write, and only the single drainer reads
            // published slots. Clearing the flag marks the value as moved out.
            let element = unsafe { (*slot.value.get()).assume_init_read() };
            slot.published.store(false, Ordering::Release);
            cursor.head += 1;

            handler(element);
        }

        let drained = cursor.head - head;
        drop(cursor);

        if stalled {
            tracing::trace!(
                drained,
                gap = head + drained,
                "drain stopped at an unpublished slot"
            );
        }
        if self.config.enable_metrics {
            self.metrics.record_drain(drained, stalled);
        }

        drained as usize
    }

    // ---------------------------------------------------------------------
    // DIAGNOSTICS
    // ---------------------------------------------------------------------

    /// Returns a snapshot of the usage counters (all zero unless metrics are enabled).
    pub fn metrics(&self) -> MetricsSnapshot {
        if self.config.enable_metrics {
            self.metrics.snapshot()
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl<E> Default for FastFlowBuffer<E> {
    fn default() -> Self {
        Self::from_valid(Config::default())
    }
}

impl<E> fmt::Debug for FastFlowBuffer<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastFlowBuffer")
            .field("capacity", &self.capacity())
            .field("reads", &self.reads())
            .field("writes", &self.writes())
            .finish_non_exhaustive()
    }
}

impl<E> Drop for FastFlowBuffer<E> {
    fn drop(&mut self) {
        // Drop every published element the consumer never took.
        for slot in self.slots.iter_mut() {
            if *slot.published.get_mut() {
                // SAFETY: a set flag means the slot holds an initialized value
                // that has not been moved out.
                unsafe { slot.value.get_mut().assume_init_drop() };
            }
        }
    }
}

/// Repeats `attempt` while it reports `Failed`, spinning between tries, until
/// the spin budget is spent. Any other outcome is returned as is.
fn retry_on_failed<E, F>(mut element: E, mut attempt: F) -> Offer<E>
where
    F: FnMut(E) -> Offer<E>,
{
    let mut backoff = Backoff::new();
    loop {
        match attempt(element) {
            Offer::Failed(e) if !backoff.is_completed() => {
                element = e;
                backoff.spin();
            }
            outcome => return outcome,
        }
    }
}

/// Releases the drain flag, including when a handler panics.
struct DrainLock<'a>(&'a AtomicBool);

impl Drop for DrainLock<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Publishes drain progress on drop so an unwinding handler cannot leave the
/// read counter behind slots that were already emptied.
struct ReadCursor<'a> {
    read_counter: &'a AtomicU64,
    start: u64,
    head: u64,
}

impl Drop for ReadCursor<'_> {
    fn drop(&mut self) {
        if self.head != self.start {
            // INV-CNT-02: Monotonic Progress
            debug_assert_monotonic!("read_counter", self.start, self.head);
            self.read_counter.store(self.head, Ordering::Release);
        }
    }
}
