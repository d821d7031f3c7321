//! Encoder dictionary (sliding window).
//!
//! The dictionary wraps a [`RingBuffer`] that holds two regions:
//!
//! ```text
//!            history (dict_len)        look-ahead (buffered)
//!   ... [ o o o o o o o o o o o ] [ x x x x x x x ] ...
//!                                 ^ head / rear     ^ front
//! ```
//!
//! Bytes are written into the look-ahead region and move into the history
//! when the encoder discards them. Positions are addressed by backward
//! distance from the head: distance 1 is the last history byte, distance 0
//! the head byte and negative distances reach into the look-ahead.

use oxilzma_core::error::{LzmaError, Result};
use oxilzma_core::ringbuffer::{RingBuffer, SpaceStatus};
use oxilzma_core::sink::ByteSink;

/// Maximum dictionary capacity supported by the format.
pub const MAX_DICT_CAP: usize = u32::MAX as usize;

/// Snapshot of the window position used by the hash index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Absolute stream position of the head.
    pub head: u64,
    /// Number of addressable history bytes.
    pub dict_len: usize,
}

/// The encoder dictionary.
#[derive(Debug, Clone)]
pub struct Dictionary {
    /// History plus look-ahead.
    buf: RingBuffer,
    /// Absolute position of the head (bytes moved into history so far).
    head: u64,
    /// Maximum backward distance.
    capacity: usize,
}

impl Dictionary {
    /// Create a dictionary with `dict_cap` bytes of history and `buf_size`
    /// bytes of look-ahead.
    pub fn new(dict_cap: usize, buf_size: usize) -> Result<Self> {
        if !(1..=MAX_DICT_CAP).contains(&dict_cap) {
            return Err(LzmaError::invalid_config(
                "dictionary capacity out of range",
            ));
        }
        if buf_size < 1 {
            return Err(LzmaError::invalid_config(
                "buffer size must be larger than zero",
            ));
        }

        Ok(Self {
            buf: RingBuffer::new(dict_cap + buf_size),
            head: 0,
            capacity: dict_cap,
        })
    }

    /// Maximum backward distance.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Absolute stream position of the head.
    pub fn pos(&self) -> u64 {
        self.head
    }

    /// Length of the backing ring buffer array.
    pub fn backing_len(&self) -> usize {
        self.buf.backing_len()
    }

    /// Number of history bytes addressable by distance.
    pub fn dict_len(&self) -> usize {
        if self.head < self.capacity as u64 {
            self.head as usize
        } else {
            self.capacity
        }
    }

    /// Number of history bytes still physically present in the buffer.
    ///
    /// This can exceed [`dict_len`](Self::dict_len) while the look-ahead is
    /// not full; it bounds [`copy_n`](Self::copy_n).
    pub fn history_len(&self) -> usize {
        let n = self.buf.available();
        if n as u64 > self.head {
            self.head as usize
        } else {
            n
        }
    }

    /// Number of bytes a following [`write`](Self::write) can accept.
    pub fn available(&self) -> usize {
        self.buf.available() - self.dict_len()
    }

    /// Number of look-ahead bytes.
    pub fn buffered(&self) -> usize {
        self.buf.buffered()
    }

    /// Current window position.
    pub fn window(&self) -> Window {
        Window {
            head: self.head,
            dict_len: self.dict_len(),
        }
    }

    /// Append look-ahead bytes without moving the head.
    ///
    /// Writes the prefix of `p` that fits and reports
    /// [`SpaceStatus::NoSpace`] if it could not take everything.
    pub fn write(&mut self, p: &[u8]) -> (usize, SpaceStatus) {
        let m = self.available();
        let (p, status) = if p.len() > m {
            (&p[..m], SpaceStatus::NoSpace)
        } else {
            (p, SpaceStatus::Complete)
        };
        let n = self.buf.write(p);
        (n, status)
    }

    /// The byte at the head. Only meaningful if look-ahead is buffered.
    pub fn head_byte(&self) -> u8 {
        self.buf.data()[self.buf.rear()]
    }

    /// Backing array index for a distance from the head.
    #[inline]
    fn index(&self, distance: isize) -> usize {
        let m = self.buf.backing_len() as isize;
        let i = self.buf.rear() as isize - distance;
        if i < 0 {
            (i + m) as usize
        } else if i >= m {
            (i - m) as usize
        } else {
            i as usize
        }
    }

    /// History byte at `distance`.
    ///
    /// Returns 0 for any distance outside `[1, dict_len]`.
    pub fn byte_at(&self, distance: isize) -> u8 {
        if !(1..=self.dict_len() as isize).contains(&distance) {
            return 0;
        }
        self.buf.data()[self.index(distance)]
    }

    /// Byte at `distance`, which may reach into the look-ahead.
    ///
    /// Valid distances are `(-buffered, dict_len]`; distance 0 is the head.
    pub fn window_byte(&self, distance: isize) -> Option<u8> {
        if !(-(self.buffered() as isize) < distance && distance <= self.dict_len() as isize) {
            return None;
        }
        Some(self.buf.data()[self.index(distance)])
    }

    /// Backing array index of the absolute stream offset `off`, if the
    /// offset is inside the history or the look-ahead.
    pub fn index_of(&self, off: u64) -> Option<usize> {
        let distance = self.head as i128 - off as i128;
        if !(-(self.buffered() as i128) < distance && distance <= self.dict_len() as i128) {
            return None;
        }
        Some(self.index(distance as isize))
    }

    /// View of up to `n` bytes starting at `distance`.
    ///
    /// The view is clipped to the buffered data and may be split in two
    /// parts where the ring wraps.
    ///
    /// # Panics
    ///
    /// Panics if `distance` is outside `[-buffered, dict_len]`.
    pub fn segment(&self, distance: isize, n: usize) -> Segment<'_> {
        let u = self.buffered() as isize;
        assert!(
            -u <= distance && distance <= self.dict_len() as isize,
            "dictionary segment distance {} out of range",
            distance
        );
        let n = n.min((distance + u) as usize);
        self.raw_segment(distance, n)
    }

    /// Two part view of `n` bytes at `distance` without range checks.
    fn raw_segment(&self, distance: isize, n: usize) -> Segment<'_> {
        let data = self.buf.data();
        let m = data.len();
        let i = self.index(distance);
        if i + n <= m {
            Segment([&data[i..i + n], &[]])
        } else {
            Segment([&data[i..], &data[..i + n - m]])
        }
    }

    /// Length of the common prefix of `needle` and the bytes at `distance`.
    ///
    /// The compared bytes may overlap the head, as a match copy would.
    ///
    /// # Panics
    ///
    /// Panics if `distance` is outside `[-buffered, dict_len]`.
    pub fn match_len(&self, distance: isize, needle: &[u8]) -> usize {
        let s = self.segment(distance, needle.len());
        prefix_len_segments(s, Segment([needle, &[]]))
    }

    /// Copy look-ahead bytes into `p` without consuming them.
    pub fn peek(&self, p: &mut [u8]) -> usize {
        self.buf.peek(p)
    }

    /// Move up to `n` look-ahead bytes into the history.
    ///
    /// Returns the number of bytes actually discarded.
    pub fn discard(&mut self, n: usize) -> usize {
        let discarded = self.buf.discard(n);
        self.head += discarded as u64;
        discarded
    }

    /// Read look-ahead bytes into `p`, moving them into the history.
    pub fn read(&mut self, p: &mut [u8]) -> usize {
        let n = self.buf.read(p);
        self.head += n as u64;
        n
    }

    /// Copy the last `n` history bytes to `sink`.
    ///
    /// If fewer than `n` bytes of history are present, copies what is there
    /// and reports [`SpaceStatus::NoSpace`].
    pub fn copy_n<S: ByteSink>(&self, sink: &mut S, n: usize) -> Result<(usize, SpaceStatus)> {
        if n == 0 {
            return Ok((0, SpaceStatus::Complete));
        }
        let m = self.history_len();
        let (n, status) = if n > m {
            (m, SpaceStatus::NoSpace)
        } else {
            (n, SpaceStatus::Complete)
        };
        let s = self.raw_segment(n as isize, n);
        sink.write_all(s.0[0])?;
        sink.write_all(s.0[1])?;
        Ok((n, status))
    }
}

/// Data viewed as a sequence of two byte slices.
#[derive(Debug, Clone, Copy, Default)]
pub struct Segment<'a>(pub [&'a [u8]; 2]);

impl<'a> Segment<'a> {
    /// Total length of both parts.
    pub fn len(&self) -> usize {
        self.0[0].len() + self.0[1].len()
    }

    /// Check if both parts are empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The two parts.
    pub fn parts(&self) -> (&'a [u8], &'a [u8]) {
        (self.0[0], self.0[1])
    }

    /// Copy the segment into `p`. Returns the number of bytes copied.
    pub fn peek(&self, p: &mut [u8]) -> usize {
        let (a, b) = self.parts();
        let n = a.len().min(p.len());
        p[..n].copy_from_slice(&a[..n]);
        let k = b.len().min(p.len() - n);
        p[n..n + k].copy_from_slice(&b[..k]);
        n + k
    }
}

/// Length of the common prefix of `a` and `b`.
pub fn prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Length of the common prefix of two segments.
pub fn prefix_len_segments(a: Segment<'_>, b: Segment<'_>) -> usize {
    let (a, b) = if a.0[0].len() > b.0[0].len() {
        (b, a)
    } else {
        (a, b)
    };
    let [a0, a1] = a.0;
    let [b0, b1] = b.0;

    let i = prefix_len(a0, b0);
    if i < a0.len() {
        return i;
    }
    if i == b0.len() {
        return i + prefix_len(a1, b1);
    }
    let bb = &b0[i..];
    let j = prefix_len(a1, bb);
    if j < bb.len() {
        return i + j;
    }
    i + j + prefix_len(&a1[j..], b1)
}
