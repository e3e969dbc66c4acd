use crate::FastFlowBuffer;

/// Why a slot could not be reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rejected {
    /// Lost the write-counter CAS to another producer.
    Failed,
    /// Every slot is reserved and not yet drained.
    Full,
}

/// Exclusive claim on the slot for one write-counter value.
///
/// Obtained by winning the write-counter CAS; the slot stays empty until
/// [`publish`](Self::publish) stores the element. The consumer stops at an
/// empty reserved slot, so every reservation must be published.
#[must_use = "an unpublished reservation stalls the consumer at this slot"]
pub(crate) struct Reservation<'a, E> {
    buffer: &'a FastFlowBuffer<E>,
    counter: u64,
}

impl<'a, E> Reservation<'a, E> {
    pub(crate) fn new(buffer: &'a FastFlowBuffer<E>, counter: u64) -> Self {
        Self { buffer, counter }
    }

    /// The write-counter value this reservation won.
    #[cfg(test)]
    pub(crate) fn counter(&self) -> u64 {
        self.counter
    }

    /// Stores the element and makes it visible to the consumer.
    #[inline]
    pub(crate) fn publish(self, element: E) {
        // SAFETY: `counter` came from a successful CAS on the write counter, so
        // no other producer holds this slot, and the reservation is consumed here
        // so it is written exactly once.
        unsafe { self.buffer.write_reserved(self.counter, element) };
    }
}
