use crate::{FastFlowBuffer, Offer};

/// A bounded buffer of read events that many threads record into and one
/// thread drains.
///
/// This is the seam an owning cache programs against: it records an access
/// with [`offer`](Self::offer) on the hot path and later replays the batch
/// against its eviction policy with [`drain_to`](Self::drain_to).
pub trait ReadBuffer<E> {
    /// Records an element; never blocks.
    fn offer(&self, element: E) -> Offer<E>;

    /// Delivers the contiguous published elements in order and returns how many.
    fn drain_to(&self, consumer: &mut dyn FnMut(E)) -> usize;

    /// Elements drained so far.
    fn reads(&self) -> u64;

    /// Slots reserved so far.
    fn writes(&self) -> u64;

    /// Advisory number of pending elements.
    fn size(&self) -> u64 {
        self.writes().saturating_sub(self.reads())
    }
}

impl<E> ReadBuffer<E> for FastFlowBuffer<E> {
    #[inline]
    fn offer(&self, element: E) -> Offer<E> {
        FastFlowBuffer::offer(self, element)
    }

    fn drain_to(&self, consumer: &mut dyn FnMut(E)) -> usize {
        FastFlowBuffer::drain_to(self, consumer)
    }

    #[inline]
    fn reads(&self) -> u64 {
        FastFlowBuffer::reads(self)
    }

    #[inline]
    fn writes(&self) -> u64 {
        FastFlowBuffer::writes(self)
    }
}
