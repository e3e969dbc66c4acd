use thiserror::Error;

/// Largest supported `buffer_bits` (2^30 slots).
pub const MAX_BUFFER_BITS: u8 = 30;

/// Largest supported buffer capacity.
pub const MAX_CAPACITY: usize = 1 << MAX_BUFFER_BITS;

/// Error returned when a buffer configuration cannot be honoured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Capacity must be a positive power of two so that `counter & mask` indexes a slot.
    #[error("capacity {capacity} is not a positive power of two")]
    NotPowerOfTwo {
        /// The rejected capacity.
        capacity: usize,
    },
    /// Capacity exceeds [`MAX_CAPACITY`].
    #[error("capacity of 2^{requested} slots exceeds the maximum of 2^{max}")]
    TooLarge {
        /// Requested `buffer_bits`.
        requested: u8,
        /// Maximum accepted `buffer_bits`.
        max: u8,
    },
}

/// Configuration for a [`FastFlowBuffer`](crate::FastFlowBuffer).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Buffer size as power of 2 (default: 4 = 16 slots)
    pub buffer_bits: u8,
    /// Enable metrics collection (slight overhead)
    pub enable_metrics: bool,
}

impl Config {
    /// Creates a new configuration with custom settings.
    pub const fn new(buffer_bits: u8, enable_metrics: bool) -> Self {
        Self {
            buffer_bits,
            enable_metrics,
        }
    }

    /// Builds a configuration from a slot count instead of a power-of-two exponent.
    pub fn for_capacity(capacity: usize) -> Result<Self, ConfigError> {
        if !capacity.is_power_of_two() {
            return Err(ConfigError::NotPowerOfTwo { capacity });
        }
        let config = Self::new(capacity.trailing_zeros() as u8, false);
        config.validate()?;
        Ok(config)
    }

    /// Returns a copy with metrics switched on or off.
    pub const fn with_metrics(mut self, enable_metrics: bool) -> Self {
        self.enable_metrics = enable_metrics;
        self
    }

    /// Checks that the capacity is representable.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_bits > MAX_BUFFER_BITS {
            return Err(ConfigError::TooLarge {
                requested: self.buffer_bits,
                max: MAX_BUFFER_BITS,
            });
        }
        Ok(())
    }

    /// Returns the number of slots.
    ///
    /// # Panics
    ///
    /// Panics if `buffer_bits` exceeds [`MAX_BUFFER_BITS`]; check with
    /// [`validate`](Self::validate) first when the value is untrusted.
    #[inline]
    pub const fn capacity(&self) -> usize {
        assert!(
            self.buffer_bits <= MAX_BUFFER_BITS,
            "buffer_bits exceeds MAX_BUFFER_BITS"
        );
        1 << self.buffer_bits
    }

    /// Returns the mask for index wrapping.
    #[inline]
    pub const fn mask(&self) -> usize {
        self.capacity() - 1
    }
}

impl Default for Config {
    fn default() -> Self {
        READ_BUFFER_CONFIG
    }
}

/// Per-stripe read buffer of a concurrent cache (16 slots).
pub const READ_BUFFER_CONFIG: Config = Config::new(4, false);

/// Larger buffer for hosts where many cores record into one buffer (128 slots).
pub const HIGH_CONTENTION_CONFIG: Config = Config::new(7, false);
