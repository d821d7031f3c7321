//! # OxiLZMA
//!
//! Streaming LZMA encoder producing raw LZMA streams that are bit-compatible
//! with standard LZMA decoders.
//!
//! ## Architecture
//!
//! - [`dict`]: sliding-window dictionary over a ring buffer
//! - [`hash`]: rolling hash fingerprints of the look-ahead
//! - [`hash_index`]: hash tables and hash chains from fingerprints to positions
//! - [`match_finder`]: hash-chain match finders (hc2, hc3, hc4)
//! - [`operation`]: literals and matches
//! - [`range_coder`] and [`model`]: adaptive range coding with the LZMA context model
//! - [`encoder`]: the driver turning written bytes into a compressed stream
//! - [`config`]: encoder configuration and presets 0 to 9
//! - [`decoder`]: reference decoder for raw streams
//!
//! The encoder writes to any [`ByteSink`]. A [`LimitedSink`] bounds the
//! output; when it runs out of room the encoder stops cleanly and keeps the
//! remaining input for a follow-up stream on a new sink.
//!
//! ## Usage
//!
//! ```rust
//! use oxilzma::{EncoderConfig, compress, decompress_raw};
//!
//! let config = EncoderConfig::default().with_eos_marker(true);
//! let data = b"hello hello hello hello";
//! let stream = compress(data, &config)?;
//! let out = decompress_raw(&stream, config.properties, config.dict_cap as u32, None)?;
//! assert_eq!(out, data);
//! # Ok::<(), oxilzma::LzmaError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod decoder;
pub mod dict;
pub mod encoder;
pub mod hash;
pub mod hash_index;
pub mod match_finder;
pub mod model;
pub mod operation;
pub mod range_coder;

// Re-exports
pub use config::{EncoderConfig, Mode, Preset};
pub use decoder::{LzmaDecoder, decompress_raw};
pub use dict::{Dictionary, Segment};
pub use encoder::{EncodeStatus, Encoder, EncoderState};
pub use match_finder::{MatchFinder, MatchFinderKind};
pub use model::{LzmaProperties, State};
pub use operation::Operation;
pub use oxilzma_core::error::{LzmaError, Result};
pub use oxilzma_core::sink::{ByteSink, LimitedSink};
pub use range_coder::{RangeDecoder, RangeEncoder};

/// Compress `data` into a raw LZMA stream.
///
/// The stream carries an end-of-stream marker only if the configuration
/// asks for one.
pub fn compress(data: &[u8], config: &EncoderConfig) -> Result<Vec<u8>> {
    let mut encoder = Encoder::new(Vec::with_capacity(data.len() / 2 + 16), config)?;
    encoder.write(data)?;
    encoder.close()?;
    Ok(encoder.into_sink())
}

/// Compress `data` with a preset into a raw LZMA stream terminated by an
/// end-of-stream marker.
pub fn compress_preset(data: &[u8], preset: Preset) -> Result<Vec<u8>> {
    compress(data, &preset.config().with_eos_marker(true))
}
