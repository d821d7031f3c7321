//! Ring buffer backing the encoder's sliding window.
//!
//! The buffer is a fixed byte array with two cursors:
//! - `front`: index where the next written byte is stored
//! - `rear`: index of the next byte to be read (the *head* of the window)
//!
//! Bytes between `rear` and `front` are buffered look-ahead. Bytes before
//! `rear` are not cleared when read; they stay addressable by backward
//! distance until a later write reuses their slot. Keeping that history
//! intact is the job of the owner (the encoder dictionary), which limits
//! writes accordingly.

/// Outcome of a bounded write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpaceStatus {
    /// All requested bytes were processed.
    Complete,
    /// Only a prefix was processed because space ran out.
    NoSpace,
}

impl SpaceStatus {
    /// Returns true if the operation was cut short.
    pub fn is_no_space(self) -> bool {
        self == Self::NoSpace
    }
}

/// A fixed-capacity circular byte store.
///
/// One slot of the backing array is kept free to tell a full buffer from
/// an empty one, so a buffer created with `new(n)` holds up to `n` bytes in
/// an array of `n + 1` bytes.
#[derive(Debug, Clone)]
pub struct RingBuffer {
    /// The backing array.
    data: Vec<u8>,
    /// Next write index.
    front: usize,
    /// Next read index.
    rear: usize,
}

impl RingBuffer {
    /// Create a new ring buffer that can buffer `capacity` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Capacity must be greater than 0");

        Self {
            data: vec![0; capacity + 1],
            front: 0,
            rear: 0,
        }
    }

    /// Maximum number of bytes the buffer can hold.
    pub fn capacity(&self) -> usize {
        self.data.len() - 1
    }

    /// Length of the backing array.
    pub fn backing_len(&self) -> usize {
        self.data.len()
    }

    /// The backing array, for distance addressed access.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Next write index.
    pub fn front(&self) -> usize {
        self.front
    }

    /// Next read index.
    pub fn rear(&self) -> usize {
        self.rear
    }

    /// Number of bytes written but not yet read.
    pub fn buffered(&self) -> usize {
        if self.front >= self.rear {
            self.front - self.rear
        } else {
            self.data.len() - self.rear + self.front
        }
    }

    /// Number of bytes that can be written.
    pub fn available(&self) -> usize {
        self.capacity() - self.buffered()
    }

    /// Check if nothing is buffered.
    pub fn is_empty(&self) -> bool {
        self.front == self.rear
    }

    /// Advance an index by `n` positions.
    #[inline]
    fn add_index(&self, i: usize, n: usize) -> usize {
        let m = self.data.len();
        let i = i + n;
        if i >= m { i - m } else { i }
    }

    /// Write as much of `p` as fits. Returns the number of bytes written.
    pub fn write(&mut self, p: &[u8]) -> usize {
        let n = p.len().min(self.available());
        let m = self.data.len();
        let first = n.min(m - self.front);
        self.data[self.front..self.front + first].copy_from_slice(&p[..first]);
        self.data[..n - first].copy_from_slice(&p[first..n]);
        self.front = self.add_index(self.front, n);
        n
    }

    /// Write a single byte. Returns false if the buffer is full.
    pub fn write_byte(&mut self, byte: u8) -> bool {
        if self.available() == 0 {
            return false;
        }
        self.data[self.front] = byte;
        self.front = self.add_index(self.front, 1);
        true
    }

    /// Copy buffered bytes into `p` without consuming them.
    ///
    /// Returns the number of bytes copied, which is less than `p.len()` if
    /// fewer bytes are buffered.
    pub fn peek(&self, p: &mut [u8]) -> usize {
        let n = p.len().min(self.buffered());
        let m = self.data.len();
        let first = n.min(m - self.rear);
        p[..first].copy_from_slice(&self.data[self.rear..self.rear + first]);
        p[first..n].copy_from_slice(&self.data[..n - first]);
        n
    }

    /// Skip up to `n` buffered bytes. Returns the number skipped.
    pub fn discard(&mut self, n: usize) -> usize {
        let n = n.min(self.buffered());
        self.rear = self.add_index(self.rear, n);
        n
    }

    /// Read buffered bytes into `p`. Returns the number of bytes read.
    pub fn read(&mut self, p: &mut [u8]) -> usize {
        let n = self.peek(p);
        self.rear = self.add_index(self.rear, n);
        n
    }

    /// Read a single byte.
    pub fn read_byte(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.data[self.rear];
        self.rear = self.add_index(self.rear, 1);
        Some(byte)
    }

    /// Drop all buffered bytes and forget the history.
    pub fn reset(&mut self) {
        self.front = 0;
        self.rear = 0;
        self.data.fill(0);
    }
}
