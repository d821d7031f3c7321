//! # OxiLZMA Core
//!
//! Core components shared by the OxiLZMA codec crates:
//!
//! - [`error`]: Error type and `Result` alias
//! - [`ringbuffer`]: Fixed-capacity circular byte store behind the sliding window
//! - [`sink`]: Output sinks with remaining-capacity accounting
//!
//! ## Example
//!
//! ```rust
//! use oxilzma_core::ringbuffer::RingBuffer;
//! use oxilzma_core::sink::{ByteSink, LimitedSink};
//!
//! let mut ring = RingBuffer::new(16);
//! ring.write(b"abc");
//! assert_eq!(ring.buffered(), 3);
//!
//! let mut sink = LimitedSink::new(Vec::new(), 2);
//! sink.write_byte(0x5d).unwrap();
//! assert_eq!(sink.remaining(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod ringbuffer;
pub mod sink;

// Re-exports for convenience
pub use error::{LzmaError, Result};
pub use ringbuffer::{RingBuffer, SpaceStatus};
pub use sink::{ByteSink, LimitedSink};
