//! Debug assertion macros for the buffer's counter invariants.
//!
//! Only active in debug builds (`debug_assert!`), so release builds pay nothing.

// =============================================================================
// INV-CNT-01: Bounded Count
// =============================================================================

/// Assert that in-flight reservations never exceed capacity.
///
/// **Invariant**: `0 ≤ (writes - reads) ≤ capacity`
///
/// Used in: `reserve()` after winning the write-counter CAS
macro_rules! debug_assert_bounded_count {
    ($count:expr, $capacity:expr) => {
        debug_assert!(
            $count <= $capacity,
            "INV-CNT-01 violated: {} reservations in flight exceed capacity {}",
            $count,
            $capacity
        )
    };
}

// =============================================================================
// INV-CNT-02: Monotonic Progress
// =============================================================================

/// Assert that a counter only moves forward.
///
/// **Invariant**: `new_value ≥ old_value`
///
/// Used in: drain for the read counter
macro_rules! debug_assert_monotonic {
    ($name:literal, $old:expr, $new:expr) => {
        debug_assert!(
            $new >= $old,
            "INV-CNT-02 violated: {} decreased from {} to {}",
            $name,
            $old,
            $new
        )
    };
}

// =============================================================================
// INV-CNT-03: Conservative Read Cache
// =============================================================================

/// Assert that the producer-side read cache never runs ahead of the read counter.
///
/// **Invariant**: `read_cache ≤ read_counter`
///
/// Used in: `reserve()` when refreshing the cache
macro_rules! debug_assert_cache_behind {
    ($cache:expr, $reads:expr) => {
        debug_assert!(
            $cache <= $reads,
            "INV-CNT-03 violated: read cache {} ahead of read counter {}",
            $cache,
            $reads
        )
    };
}

// =============================================================================
// INV-DRN-01: Drain stays below the write counter
// =============================================================================

/// Assert the consumer never walks past the reservations it observed.
///
/// **Invariant**: `head ≤ tail` while draining
///
/// Used in: drain loop
macro_rules! debug_assert_head_not_past_tail {
    ($head:expr, $tail:expr) => {
        debug_assert!(
            $head <= $tail,
            "INV-DRN-01 violated: drain head {} beyond observed tail {}",
            $head,
            $tail
        )
    };
}

pub(crate) use debug_assert_bounded_count;
pub(crate) use debug_assert_cache_behind;
pub(crate) use debug_assert_head_not_past_tail;
pub(crate) use debug_assert_monotonic;
