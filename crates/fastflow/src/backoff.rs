use std::hint;

/// Exponential spin backoff (Crossbeam-style, spin phase only).
///
/// Used between retries of an offer that lost the write-counter race. It never
/// yields to the OS: the buffer is built for call-and-return hot paths.
#[derive(Debug)]
pub struct Backoff {
    step: u32,
}

impl Backoff {
    pub(crate) const SPIN_LIMIT: u32 = 6; // 2^6 = 64 spins max per step

    /// Creates a new backoff instance.
    #[inline]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    /// Spin with PAUSE hints, doubling the count each call up to the limit.
    #[inline]
    pub fn spin(&mut self) {
        let spins = 1 << self.step.min(Self::SPIN_LIMIT);
        for _ in 0..spins {
            hint::spin_loop();
        }
        if self.step <= Self::SPIN_LIMIT {
            self.step += 1;
        }
    }

    /// Check if we've exhausted patience.
    #[inline]
    pub fn is_completed(&self) -> bool {
        self.step > Self::SPIN_LIMIT
    }

    /// Reset for next wait cycle.
    #[inline]
    pub fn reset(&mut self) {
        self.step = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_progression() {
        let mut b = Backoff::new();
        assert_eq!(b.step, 0);

        b.spin();
        assert_eq!(b.step, 1);

        let mut rounds = 1;
        while !b.is_completed() {
            b.spin();
            rounds += 1;
        }
        assert_eq!(rounds, Backoff::SPIN_LIMIT + 1);

        b.reset();
        assert_eq!(b.step, 0);
        assert!(!b.is_completed());
    }
}
