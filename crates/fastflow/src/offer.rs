/// Outcome of [`FastFlowBuffer::offer`](crate::FastFlowBuffer::offer).
///
/// Both non-success outcomes are routine and hand the element back, so the
/// caller keeps ownership and decides whether to retry, drop or escalate.
#[must_use = "a rejected element is returned inside `Failed`/`Full`"]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Offer<E> {
    /// The element was published into a slot.
    Success,
    /// Another producer won the race for the same slot. Retrying immediately is safe.
    Failed(E),
    /// No free slot at the moment of the authoritative check.
    Full(E),
}

/// Element-free view of an [`Offer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OfferStatus {
    Success,
    Failed,
    Full,
}

impl<E> Offer<E> {
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }

    #[inline]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        matches!(self, Self::Full(_))
    }

    #[inline]
    pub fn status(&self) -> OfferStatus {
        match self {
            Self::Success => OfferStatus::Success,
            Self::Failed(_) => OfferStatus::Failed,
            Self::Full(_) => OfferStatus::Full,
        }
    }

    /// Takes back the element of a rejected offer.
    #[inline]
    pub fn into_rejected(self) -> Option<E> {
        match self {
            Self::Success => None,
            Self::Failed(e) | Self::Full(e) => Some(e),
        }
    }
}
