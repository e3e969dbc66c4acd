use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing how a buffer is being used.
///
/// All updates are `Relaxed`: the numbers are diagnostics and carry no
/// synchronization. They are only touched when `Config::enable_metrics` is set.
#[derive(Debug, Default)]
pub(crate) struct Metrics {
    offers_succeeded: AtomicU64,
    offers_failed: AtomicU64,
    offers_full: AtomicU64,
    drains: AtomicU64,
    drained: AtomicU64,
    gap_stalls: AtomicU64,
    contended_drains: AtomicU64,
    cache_refreshes: AtomicU64,
}

/// Point-in-time copy of a buffer's usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Offers that won a slot.
    pub offers_succeeded: u64,
    /// Offers that lost the write-counter race.
    pub offers_failed: u64,
    /// Offers rejected because the buffer was full.
    pub offers_full: u64,
    /// Drain passes that ran, empty ones included and contended ones excluded.
    pub drains: u64,
    /// Elements handed to drain handlers.
    pub drained: u64,
    /// Drains that stopped at a reserved but unpublished slot.
    pub gap_stalls: u64,
    /// Drains skipped because another drain was in progress.
    pub contended_drains: u64,
    /// Times a producer refreshed the read cache from the read counter.
    pub cache_refreshes: u64,
}

impl Metrics {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub(crate) fn record_success(&self) {
        self.offers_succeeded.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_failed(&self) {
        self.offers_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_full(&self) {
        self.offers_full.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_drain(&self, drained: u64, stalled: bool) {
        self.drains.fetch_add(1, Ordering::Relaxed);
        self.drained.fetch_add(drained, Ordering::Relaxed);
        if stalled {
            self.gap_stalls.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub(crate) fn record_contended_drain(&self) {
        self.contended_drains.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn record_cache_refresh(&self) {
        self.cache_refreshes.fetch_add(1, Ordering::Relaxed);
    }

    /// Copies every counter.
    pub(crate) fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            offers_succeeded: self.offers_succeeded.load(Ordering::Relaxed),
            offers_failed: self.offers_failed.load(Ordering::Relaxed),
            offers_full: self.offers_full.load(Ordering::Relaxed),
            drains: self.drains.load(Ordering::Relaxed),
            drained: self.drained.load(Ordering::Relaxed),
            gap_stalls: self.gap_stalls.load(Ordering::Relaxed),
            contended_drains: self.contended_drains.load(Ordering::Relaxed),
            cache_refreshes: self.cache_refreshes.load(Ordering::Relaxed),
        }
    }
}
