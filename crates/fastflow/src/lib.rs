//! FastFlow - Lock-Free Multi-Producer Single-Consumer Read Buffer
//!
//! A fixed-capacity ring buffer that many threads record short-lived events
//! into (for example "this entry was read") and one thread drains in bulk.
//! It keeps the hot path (recording) off the cold path (applying the events).
//!
//! # Key Features
//!
//! - CAS-reserved slots with a single publish store per element
//! - Producer-shared cache of the consumer's read counter (FastFlow), so the
//!   consumer's cache line is only touched when the buffer looks full
//! - Cache-line isolation of the read cache, read counter and write counter
//! - Strict FIFO drain that stops at the first reserved-but-unpublished slot
//! - Non-blocking: `offer` returns `Success`, `Failed` or `Full`
//!
//! # Example
//!
//! ```
//! use fastflow_rs::{Config, FastFlowBuffer, Offer};
//!
//! let buffer = FastFlowBuffer::<u64>::new(Config::default()).unwrap();
//!
//! // Hot path: record reads, dropping them when the buffer is full
//! for key in [3, 1, 4] {
//!     match buffer.offer(key) {
//!         Offer::Success => {}
//!         Offer::Failed(_) | Offer::Full(_) => { /* drop the sample */ }
//!     }
//! }
//!
//! // Cold path: one thread replays them in order
//! let mut replayed = Vec::new();
//! buffer.drain_to(|key| replayed.push(key));
//! assert_eq!(replayed, vec![3, 1, 4]);
//! ```

mod backoff;
mod buffer;
mod config;
mod invariants;
mod metrics;
mod offer;
mod read_buffer;
mod reservation;

pub use backoff::Backoff;
pub use buffer::FastFlowBuffer;
pub use config::{
    Config, ConfigError, HIGH_CONTENTION_CONFIG, MAX_BUFFER_BITS, MAX_CAPACITY,
    READ_BUFFER_CONFIG,
};
pub use metrics::MetricsSnapshot;
pub use offer::{Offer, OfferStatus};
pub use read_buffer::ReadBuffer;
