//! Output sinks for compressed bytes.
//!
//! The range encoder emits its output one byte at a time and needs to know
//! how much room is left before it starts an operation it could not finish.
//! [`ByteSink`] captures exactly that: byte and slice writes plus a
//! remaining-capacity query.

use crate::error::{LzmaError, Result};
use std::io::Write;

/// A destination for compressed bytes with capacity accounting.
pub trait ByteSink {
    /// Write a single byte.
    ///
    /// Returns [`LzmaError::Limit`] if the sink is full.
    fn write_byte(&mut self, byte: u8) -> Result<()>;

    /// Number of bytes that can still be written.
    fn remaining(&self) -> u64;

    /// Write all of `bytes`.
    ///
    /// If the sink fills up, the prefix that fits is written and
    /// [`LzmaError::Limit`] is returned.
    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            self.write_byte(byte)?;
        }
        Ok(())
    }
}

impl ByteSink for Vec<u8> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        self.push(byte);
        Ok(())
    }

    fn remaining(&self) -> u64 {
        u64::MAX
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.extend_from_slice(bytes);
        Ok(())
    }
}

impl<S: ByteSink + ?Sized> ByteSink for &mut S {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        (**self).write_byte(byte)
    }

    fn remaining(&self) -> u64 {
        (**self).remaining()
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).write_all(bytes)
    }
}

/// A sink that forwards to a writer and stops after `limit` bytes.
///
/// This is how callers cap the size of a compressed stream: once the
/// encoder sees that the remaining room is below its per-operation margin it
/// stops and closes the stream cleanly.
#[derive(Debug)]
pub struct LimitedSink<W: Write> {
    /// Underlying writer.
    inner: W,
    /// Maximum number of bytes.
    limit: u64,
    /// Bytes written so far.
    written: u64,
}

impl<W: Write> LimitedSink<W> {
    /// Create a sink accepting at most `limit` bytes.
    pub fn new(inner: W, limit: u64) -> Self {
        Self {
            inner,
            limit,
            written: 0,
        }
    }

    /// Create a sink without a practical limit.
    pub fn unlimited(inner: W) -> Self {
        Self::new(inner, u64::MAX)
    }

    /// Bytes written so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    /// The configured limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// Get a reference to the underlying writer.
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Consume the sink and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: Write> ByteSink for LimitedSink<W> {
    fn write_byte(&mut self, byte: u8) -> Result<()> {
        if self.written >= self.limit {
            return Err(LzmaError::Limit);
        }
        self.inner.write_all(&[byte])?;
        self.written += 1;
        Ok(())
    }

    fn remaining(&self) -> u64 {
        self.limit - self.written
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        let room = usize::try_from(self.remaining()).unwrap_or(usize::MAX);
        let n = bytes.len().min(room);
        self.inner.write_all(&bytes[..n])?;
        self.written += n as u64;
        if n < bytes.len() {
            return Err(LzmaError::Limit);
        }
        Ok(())
    }
}
