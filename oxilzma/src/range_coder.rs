//! Range coder for the LZMA bitstream.
//!
//! The range coder is an adaptive binary arithmetic coder:
//! - 32-bit range tracking
//! - Normalization when range drops below 2^24
//! - 11-bit probability model (1024 = 50%)
//!
//! The encoder writes through a [`ByteSink`] and reports how many bytes an
//! operation may still use before the stream could no longer be closed.

use oxilzma_core::error::{LzmaError, Result};
use oxilzma_core::sink::ByteSink;
use std::io::Read;

/// Number of bits in probability model.
pub const PROB_BITS: u32 = 11;

/// Initial probability (50%).
pub const PROB_INIT: u16 = 1 << (PROB_BITS - 1);

/// Upper bound of the probability range.
pub const PROB_MAX: u16 = 1 << PROB_BITS;

/// Number of bits to shift for probability update.
pub const MOVE_BITS: u32 = 5;

/// Top value for range normalization.
const TOP_VALUE: u32 = 1 << 24;

/// Bytes written by [`RangeEncoder::close`] on top of the pending cache.
const FLUSH_BYTES: u64 = 4;

/// Range encoder writing to a byte sink.
#[derive(Debug)]
pub struct RangeEncoder<S: ByteSink> {
    sink: S,
    range: u32,
    /// Low value; bit 32 holds the carry.
    low: u64,
    /// Byte held back for carry propagation.
    cache: u8,
    /// Pending bytes: the cache byte followed by `cache_size - 1` 0xFF bytes.
    cache_size: u64,
}

impl<S: ByteSink> RangeEncoder<S> {
    /// Create a new range encoder.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            range: 0xFFFF_FFFF,
            low: 0,
            cache: 0,
            cache_size: 1,
        }
    }

    /// The sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Consume the encoder and return the sink.
    ///
    /// Pending bytes are lost unless [`close`](Self::close) was called.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Bytes that may still be emitted without losing the ability to
    /// close the stream. Negative if even closing would overflow the sink.
    pub fn available(&self) -> i64 {
        let remaining = i64::try_from(self.sink.remaining()).unwrap_or(i64::MAX);
        remaining - (self.cache_size + FLUSH_BYTES) as i64
    }

    /// Shift low and write bytes whose value is settled.
    fn shift_low(&mut self) -> Result<()> {
        // low < 0xFF000000: no carry can reach the cache any more
        // low > 0xFFFFFFFF: the carry is known
        if self.low < 0xFF00_0000 || self.low > 0xFFFF_FFFF {
            let carry = (self.low >> 32) as u8;
            let mut tmp = self.cache;
            loop {
                self.sink.write_byte(tmp.wrapping_add(carry))?;
                tmp = 0xFF;
                self.cache_size -= 1;
                if self.cache_size == 0 {
                    break;
                }
            }
            self.cache = (self.low >> 24) as u8;
        }
        self.cache_size += 1;
        self.low = (self.low << 8) & 0xFFFF_FFFF;
        Ok(())
    }

    #[inline]
    fn normalize(&mut self) -> Result<()> {
        while self.range < TOP_VALUE {
            self.range <<= 8;
            self.shift_low()?;
        }
        Ok(())
    }

    /// Encode a single bit with the given probability.
    pub fn encode_bit(&mut self, prob: &mut u16, bit: u32) -> Result<()> {
        let bound = (self.range >> PROB_BITS) * (*prob as u32);
        if bit == 0 {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
        } else {
            self.low += bound as u64;
            self.range -= bound;
            *prob -= *prob >> MOVE_BITS;
        }
        self.normalize()
    }

    /// Encode `count` bits of `value` with fixed 50% probability, most
    /// significant first.
    pub fn encode_direct_bits(&mut self, value: u32, count: u32) -> Result<()> {
        for i in (0..count).rev() {
            self.range >>= 1;
            if (value >> i) & 1 != 0 {
                self.low += self.range as u64;
            }
            self.normalize()?;
        }
        Ok(())
    }

    /// Encode `value` through a bit tree, most significant bit first.
    pub fn encode_bit_tree(&mut self, probs: &mut [u16], num_bits: u32, value: u32) -> Result<()> {
        let mut index = 1usize;
        for i in (0..num_bits).rev() {
            let bit = (value >> i) & 1;
            self.encode_bit(&mut probs[index], bit)?;
            index = (index << 1) | bit as usize;
        }
        Ok(())
    }

    /// Encode `value` through a bit tree, least significant bit first.
    pub fn encode_bit_tree_reverse(
        &mut self,
        probs: &mut [u16],
        num_bits: u32,
        value: u32,
    ) -> Result<()> {
        let mut index = 1usize;
        for i in 0..num_bits {
            let bit = (value >> i) & 1;
            self.encode_bit(&mut probs[index], bit)?;
            index = (index << 1) | bit as usize;
        }
        Ok(())
    }

    /// Flush all pending bytes. The encoder must not be used afterwards.
    pub fn close(&mut self) -> Result<()> {
        for _ in 0..5 {
            self.shift_low()?;
        }
        Ok(())
    }
}

/// Range decoder reading the LZMA bitstream.
#[derive(Debug)]
pub struct RangeDecoder<R: Read> {
    reader: R,
    range: u32,
    code: u32,
}

impl<R: Read> RangeDecoder<R> {
    /// Create a new range decoder, consuming the five initial bytes.
    pub fn new(mut reader: R) -> Result<Self> {
        let mut init = [0u8; 5];
        reader.read_exact(&mut init)?;
        if init[0] != 0x00 {
            return Err(LzmaError::invalid_header("Invalid LZMA stream start byte"));
        }
        let code = u32::from_be_bytes([init[1], init[2], init[3], init[4]]);
        Ok(Self {
            reader,
            range: 0xFFFF_FFFF,
            code,
        })
    }

    fn normalize(&mut self) -> Result<()> {
        if self.range < TOP_VALUE {
            let mut buf = [0u8; 1];
            self.reader.read_exact(&mut buf)?;
            self.range <<= 8;
            self.code = (self.code << 8) | buf[0] as u32;
        }
        Ok(())
    }

    /// Decode a single bit with the given probability.
    pub fn decode_bit(&mut self, prob: &mut u16) -> Result<u32> {
        self.normalize()?;
        let bound = (self.range >> PROB_BITS) * (*prob as u32);
        if self.code < bound {
            self.range = bound;
            *prob += (PROB_MAX - *prob) >> MOVE_BITS;
            Ok(0)
        } else {
            self.range -= bound;
            self.code -= bound;
            *prob -= *prob >> MOVE_BITS;
            Ok(1)
        }
    }

    /// Decode `count` bits with fixed probability.
    pub fn decode_direct_bits(&mut self, count: u32) -> Result<u32> {
        let mut result = 0u32;
        for _ in 0..count {
            self.normalize()?;
            self.range >>= 1;
            self.code = self.code.wrapping_sub(self.range);
            let bit = if (self.code as i32) < 0 {
                self.code = self.code.wrapping_add(self.range);
                0
            } else {
                1
            };
            result = (result << 1) | bit;
        }
        Ok(result)
    }

    /// Decode a bit tree, most significant bit first.
    pub fn decode_bit_tree(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut index = 1usize;
        for _ in 0..num_bits {
            let bit = self.decode_bit(&mut probs[index])?;
            index = (index << 1) | bit as usize;
        }
        Ok((index as u32) - (1 << num_bits))
    }

    /// Decode a bit tree, least significant bit first.
    pub fn decode_bit_tree_reverse(&mut self, probs: &mut [u16], num_bits: u32) -> Result<u32> {
        let mut result = 0u32;
        let mut index = 1usize;
        for i in 0..num_bits {
            let bit = self.decode_bit(&mut probs[index])?;
            index = (index << 1) | bit as usize;
            result |= bit << i;
        }
        Ok(result)
    }
}
