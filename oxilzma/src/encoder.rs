//! LZMA encoder.
//!
//! The [`Encoder`] buffers written bytes in the dictionary of its match
//! finder, chooses an [`Operation`] for the head of the look-ahead and codes
//! it through the [`EncoderState`] into a [`RangeEncoder`]. Compression stops
//! early when the sink has no room left for another operation; the remaining
//! input stays buffered and can be compressed into a new sink after
//! [`Encoder::reopen`].

use crate::config::{EncoderConfig, Mode};
use crate::dict::Dictionary;
use crate::match_finder::MatchFinder;
use crate::model::{LzmaModel, LzmaProperties, State};
use crate::operation::{MAX_MATCH_LEN, MIN_DISTANCE, MIN_MATCH_LEN, Operation};
use crate::range_coder::RangeEncoder;
use log::debug;
use oxilzma_core::error::{LzmaError, Result};
use oxilzma_core::sink::ByteSink;
use std::io;

/// Upper limit of the bytes a single operation can add to the stream.
///
/// A coded bit costs at most about 6 bits of output at the lowest adapted
/// probability; a match with a full 32-bit distance codes 22 modelled bits
/// and 26 direct bits.
pub const OP_LEN_MARGIN: i64 = 24;

/// Upper limit of the bytes of the end-of-stream marker.
pub const EOS_MARGIN: i64 = 16;

/// Two-byte matches beyond this distance are coded as literals in
/// [`Mode::Normal`].
const FAR_PAIR_DISTANCE: u32 = 0x80;

/// One-based distance of the end-of-stream marker.
pub const EOS_DISTANCE: u64 = 1 << 32;

/// Returns true for a two-byte match beyond [`FAR_PAIR_DISTANCE`].
fn is_far_pair(op: Operation) -> bool {
    match op {
        Operation::Match { distance, len } => {
            len as usize == MIN_MATCH_LEN && distance > FAR_PAIR_DISTANCE
        }
        Operation::Literal(_) => false,
    }
}

/// Outcome of a write or close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodeStatus {
    /// All buffered input that was due has been compressed.
    Complete,
    /// The sink has no room for another operation. Input may remain in the
    /// dictionary.
    LimitReached,
}

impl EncodeStatus {
    /// Returns true if the output limit stopped the encoder.
    pub fn is_limit(self) -> bool {
        self == Self::LimitReached
    }
}

/// Adaptive probability model, state machine and repeat distances.
///
/// The state survives [`Encoder::reopen`], so a new stream continues with
/// the context of the previous one.
#[derive(Debug, Clone)]
pub struct EncoderState {
    model: LzmaModel,
    state: State,
    /// Zero based repeat distances, most recent first.
    rep: [u32; 4],
}

/// Convert a zero based repeat distance to a dictionary distance.
#[inline]
fn rep_distance(rep: u32) -> isize {
    isize::try_from(rep as u64 + 1).unwrap_or(isize::MAX)
}

impl EncoderState {
    /// Create the initial state for the given properties.
    pub fn new(props: LzmaProperties) -> Self {
        Self {
            model: LzmaModel::new(props),
            state: State::new(),
            rep: [0; 4],
        }
    }

    /// The literal and position bits.
    pub fn props(&self) -> LzmaProperties {
        self.model.props
    }

    /// Current state machine state.
    pub fn state(&self) -> State {
        self.state
    }

    /// Zero based repeat distances, most recent first.
    pub fn rep(&self) -> [u32; 4] {
        self.rep
    }

    /// Encode the literal `c` at the head of `dict`.
    pub fn write_literal<S: ByteSink>(
        &mut self,
        rc: &mut RangeEncoder<S>,
        dict: &Dictionary,
        c: u8,
    ) -> Result<()> {
        let pos = dict.pos();
        let pos_state = self.model.props.pos_state(pos);
        let state = self.state;

        rc.encode_bit(&mut self.model.is_match[state.value()][pos_state], 0)?;
        let lit_state = self.model.lit_state(pos, dict.byte_at(1));
        let match_byte = if state.is_literal() {
            None
        } else {
            Some(dict.byte_at(rep_distance(self.rep[0])))
        };
        self.model.literal.encode(rc, lit_state, c, match_byte)?;
        self.state.update_literal();
        Ok(())
    }

    /// Encode a match of `n` bytes at the one-based `distance` for the
    /// position `pos`.
    ///
    /// A length of 1 is only valid for the distance `rep[0] + 1` and codes a
    /// short rep.
    ///
    /// # Panics
    ///
    /// Panics if the distance or length is out of range.
    pub fn write_match<S: ByteSink>(
        &mut self,
        rc: &mut RangeEncoder<S>,
        pos: u64,
        distance: u64,
        n: usize,
    ) -> Result<()> {
        assert!(
            MIN_DISTANCE as u64 <= distance && distance <= EOS_DISTANCE,
            "match distance {} out of range",
            distance
        );
        let dist = (distance - 1) as u32;
        assert!(
            (MIN_MATCH_LEN..=MAX_MATCH_LEN).contains(&n) || (dist == self.rep[0] && n == 1),
            "match length {} out of range; dist {} rep[0] {}",
            n,
            dist,
            self.rep[0]
        );

        let state = self.state.value();
        let pos_state = self.model.props.pos_state(pos);
        rc.encode_bit(&mut self.model.is_match[state][pos_state], 1)?;

        let len = (n as u32).saturating_sub(MIN_MATCH_LEN as u32);
        let Some(g) = self.rep.iter().position(|&r| r == dist) else {
            rc.encode_bit(&mut self.model.is_rep[state], 0)?;
            self.rep = [dist, self.rep[0], self.rep[1], self.rep[2]];
            self.state.update_match();
            self.model.match_len.encode(rc, len, pos_state)?;
            return self.model.distance.encode(rc, dist, len);
        };

        rc.encode_bit(&mut self.model.is_rep[state], 1)?;
        if g == 0 {
            rc.encode_bit(&mut self.model.is_rep_g0[state], 0)?;
            let long = u32::from(n != 1);
            rc.encode_bit(&mut self.model.is_rep0_long[state][pos_state], long)?;
            if long == 0 {
                self.state.update_short_rep();
                return Ok(());
            }
        } else {
            rc.encode_bit(&mut self.model.is_rep_g0[state], 1)?;
            rc.encode_bit(&mut self.model.is_rep_g1[state], u32::from(g != 1))?;
            if g != 1 {
                rc.encode_bit(&mut self.model.is_rep_g2[state], u32::from(g != 2))?;
                if g == 3 {
                    self.rep[3] = self.rep[2];
                }
                self.rep[2] = self.rep[1];
            }
            self.rep[1] = self.rep[0];
            self.rep[0] = dist;
        }
        self.state.update_long_rep();
        self.model.rep_len.encode(rc, len, pos_state)
    }

    /// Encode the end-of-stream marker for the position `pos`.
    pub fn write_eos<S: ByteSink>(&mut self, rc: &mut RangeEncoder<S>, pos: u64) -> Result<()> {
        self.write_match(rc, pos, EOS_DISTANCE, MIN_MATCH_LEN)
    }
}

/// Streaming LZMA encoder writing a raw LZMA stream to a [`ByteSink`].
pub struct Encoder<S: ByteSink> {
    finder: Box<dyn MatchFinder + Send>,
    state: EncoderState,
    rc: RangeEncoder<S>,
    /// Dictionary position at the start of the current stream.
    start: u64,
    eos_marker: bool,
    mode: Mode,
    /// Room an operation needs before it is written.
    margin: i64,
    limit: bool,
    closed: bool,
    matches: Vec<Operation>,
    /// Look-ahead copy for extending matches.
    data: Vec<u8>,
}

impl<S: ByteSink> Encoder<S> {
    /// Create an encoder writing to `sink`.
    pub fn new(sink: S, config: &EncoderConfig) -> Result<Self> {
        config.verify()?;
        let kind = config.match_finder;
        let finder = kind.new_finder(
            config.dict_cap,
            config.buf_size,
            config.nice_len,
            config.depth,
        )?;
        debug!(
            "lzma encoder open: dict_cap={} mf={} mode={} nice_len={} depth={} eos={}",
            config.dict_cap,
            config.match_finder,
            config.mode,
            config.nice_len,
            config.depth,
            config.eos_marker
        );

        let margin = if config.eos_marker {
            OP_LEN_MARGIN + EOS_MARGIN
        } else {
            OP_LEN_MARGIN
        };
        Ok(Self {
            matches: Vec::with_capacity(finder.depth()),
            finder,
            state: EncoderState::new(config.properties),
            rc: RangeEncoder::new(sink),
            start: 0,
            eos_marker: config.eos_marker,
            mode: config.mode,
            margin,
            limit: false,
            closed: false,
            data: vec![0; MAX_MATCH_LEN],
        })
    }

    /// The dictionary.
    pub fn dict(&self) -> &Dictionary {
        self.finder.dict()
    }

    /// The probability model and repeat distances.
    pub fn state(&self) -> &EncoderState {
        &self.state
    }

    /// The sink of the current stream.
    pub fn sink(&self) -> &S {
        self.rc.sink()
    }

    /// Absolute position of the dictionary head.
    pub fn pos(&self) -> u64 {
        self.finder.dict().pos()
    }

    /// Input bytes compressed into the current stream.
    pub fn compressed(&self) -> u64 {
        self.pos() - self.start
    }

    /// Input bytes buffered but not yet compressed.
    pub fn buffered(&self) -> usize {
        self.finder.dict().buffered()
    }

    /// Returns true if the output limit has been reached.
    pub fn is_limit_reached(&self) -> bool {
        self.limit
    }

    /// Returns true if the current stream has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Buffer `p`, compressing buffered data whenever the dictionary is
    /// full.
    ///
    /// Returns the number of bytes taken. Fewer than `p.len()` bytes are
    /// taken only together with [`EncodeStatus::LimitReached`].
    pub fn write(&mut self, p: &[u8]) -> Result<(usize, EncodeStatus)> {
        if self.closed {
            return Err(LzmaError::Closed);
        }
        let mut n = 0;
        loop {
            let (k, space) = self.finder.dict_mut().write(&p[n..]);
            n += k;
            if !space.is_no_space() {
                return Ok((n, EncodeStatus::Complete));
            }
            if self.compress(false)?.is_limit() {
                return Ok((n, EncodeStatus::LimitReached));
            }
        }
    }

    /// Start a new stream on `sink`, keeping dictionary, model and the
    /// buffered input. Returns the previous sink.
    pub fn reopen(&mut self, sink: S) -> S {
        let old = std::mem::replace(&mut self.rc, RangeEncoder::new(sink));
        self.start = self.pos();
        self.limit = false;
        self.closed = false;
        debug!(
            "lzma encoder reopen at {} with {} bytes buffered",
            self.start,
            self.buffered()
        );
        old.into_sink()
    }

    /// Consume the encoder and return the sink.
    pub fn into_sink(self) -> S {
        self.rc.into_sink()
    }

    /// The operation for the head of the look-ahead.
    fn next_op(&mut self) -> Operation {
        self.finder.find_matches(&mut self.matches);
        let dict = self.finder.dict();
        let k = dict.peek(&mut self.data);
        let data = &self.data[..k];

        let mut best = match self.matches.last() {
            None => Operation::literal(dict.head_byte()),
            Some(&Operation::Match { distance, len }) if (len as usize) < k => {
                let n = dict.match_len(distance as isize, data);
                Operation::new_match(distance, n.max(len as usize))
            }
            Some(&m) => m,
        };

        if self.mode == Mode::Normal {
            // A far two-byte match costs more than two literals.
            if is_far_pair(best) {
                best = Operation::literal(dict.head_byte());
            }
            if let Some((g, rep)) = self.best_rep_match(data) {
                let rep_len = rep.len();
                let best_len = if best.is_match() { best.len() } else { 0 };
                if rep_len >= best_len || (g == 0 && rep_len >= 3 && rep_len + 2 >= best_len) {
                    best = rep;
                }
            }
        }
        best
    }

    /// Longest match at one of the repeat distances, with the index of the
    /// repeat distance.
    fn best_rep_match(&self, data: &[u8]) -> Option<(usize, Operation)> {
        let dict = self.finder.dict();
        let dict_len = dict.dict_len() as u64;
        let mut best: Option<(usize, Operation)> = None;
        for (g, &rep) in self.state.rep.iter().enumerate() {
            let distance = rep as u64 + 1;
            if distance > dict_len {
                continue;
            }
            let n = dict.match_len(distance as isize, data);
            if n >= MIN_MATCH_LEN && best.is_none_or(|(_, b)| n > b.len()) {
                best = Some((g, Operation::new_match(distance as u32, n)));
            }
        }
        best
    }

    /// Code `op` for the head of the dictionary.
    fn write_op(&mut self, op: Operation) -> Result<()> {
        if let Err(msg) = op.verify() {
            panic!("invalid operation {}: {}", op, msg);
        }
        let dict = self.finder.dict();
        match op {
            Operation::Literal(c) => {
                let rep0 = rep_distance(self.state.rep[0]);
                if self.mode == Mode::Normal
                    && !self.state.state.is_literal()
                    && rep0 <= dict.dict_len() as isize
                    && dict.byte_at(rep0) == c
                {
                    let pos = dict.pos();
                    return self.state.write_match(&mut self.rc, pos, rep0 as u64, 1);
                }
                self.state.write_literal(&mut self.rc, dict, c)
            }
            Operation::Match { distance, len } => {
                self.state
                    .write_match(&mut self.rc, dict.pos(), distance as u64, len as usize)
            }
        }
    }

    /// Compress buffered data.
    ///
    /// Unless `all` is set, a full match length of look-ahead stays buffered
    /// so the match finder sees complete candidates.
    fn compress(&mut self, all: bool) -> Result<EncodeStatus> {
        let keep = if all { 0 } else { MAX_MATCH_LEN - 1 };
        while self.finder.dict().buffered() > keep {
            if self.rc.available() < self.margin {
                if !self.limit {
                    debug!(
                        "lzma encoder limit reached at {} with {} bytes buffered",
                        self.pos(),
                        self.buffered()
                    );
                }
                self.limit = true;
                return Ok(EncodeStatus::LimitReached);
            }
            let op = self.next_op();
            self.write_op(op)?;
            self.finder.skip(op.len());
        }
        Ok(EncodeStatus::Complete)
    }

    /// Compress all buffered input, write the end-of-stream marker if
    /// configured and flush the range coder.
    ///
    /// If the output limit stops compression early, the stream is still
    /// closed properly and [`EncodeStatus::LimitReached`] is returned; the
    /// remaining input stays buffered for [`reopen`](Self::reopen). If not
    /// even the closing bytes fit, [`LzmaError::Limit`] is returned and
    /// nothing more is written.
    pub fn close(&mut self) -> Result<EncodeStatus> {
        if self.closed {
            return Err(LzmaError::Closed);
        }
        let status = self.compress(true)?;
        if self.eos_marker {
            if self.rc.available() < EOS_MARGIN {
                return Err(LzmaError::Limit);
            }
            let pos = self.pos();
            self.state.write_eos(&mut self.rc, pos)?;
        }
        if self.rc.available() < 0 {
            return Err(LzmaError::Limit);
        }
        self.rc.close()?;
        self.closed = true;
        debug!(
            "lzma encoder close: {} bytes compressed, {} buffered, status {:?}",
            self.compressed(),
            self.buffered(),
            status
        );
        Ok(status)
    }
}

impl<S: ByteSink> io::Write for Encoder<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match Encoder::write(self, buf) {
            Ok((0, EncodeStatus::LimitReached)) if !buf.is_empty() => Err(io::Error::new(
                io::ErrorKind::WriteZero,
                "lzma output limit reached",
            )),
            Ok((n, _)) => Ok(n),
            Err(LzmaError::Io(e)) => Err(e),
            Err(e) => Err(io::Error::other(e)),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::decompress_raw;
    use oxilzma_core::sink::LimitedSink;

    fn small_config() -> EncoderConfig {
        EncoderConfig::default()
            .with_dict_cap(64)
            .with_depth(4)
            .with_eos_marker(true)
    }

    fn roundtrip(data: &[u8], config: &EncoderConfig) -> Vec<u8> {
        let mut enc = Encoder::new(Vec::new(), config).unwrap();
        let (n, status) = enc.write(data).unwrap();
        assert_eq!((n, status), (data.len(), EncodeStatus::Complete));
        assert_eq!(enc.close().unwrap(), EncodeStatus::Complete);
        let stream = enc.into_sink();
        let out = decompress_raw(&stream, config.properties, config.dict_cap as u32, None).unwrap();
        assert_eq!(out, data);
        stream
    }

    #[test]
    fn test_balla() {
        roundtrip(b"balla", &small_config());
        roundtrip(b"balla", &small_config().with_mode(Mode::Fast));
    }

    #[test]
    fn test_empty_input() {
        let stream = roundtrip(b"", &small_config());
        assert!(stream.len() >= 5);
    }

    #[test]
    fn test_state_after_match() {
        let mut enc = Encoder::new(Vec::new(), &small_config().with_mode(Mode::Fast)).unwrap();
        enc.write(b"abcdabcd").unwrap();
        enc.close().unwrap();
        assert_eq!(enc.state().rep()[0], 3);
        assert!(!enc.state().state().is_literal());
        assert_eq!(enc.compressed(), 8);
    }

    #[test]
    fn test_short_rep_and_rep_cache() {
        let config = small_config();
        let mut enc = Encoder::new(Vec::new(), &config).unwrap();
        let mut stream = Vec::new();
        {
            let mut rc = RangeEncoder::new(&mut stream);
            let mut dict = Dictionary::new(64, 64).unwrap();
            dict.write(b"abab");
            let st = &mut enc.state;
            st.write_literal(&mut rc, &dict, b'a').unwrap();
            dict.discard(1);
            st.write_literal(&mut rc, &dict, b'b').unwrap();
            dict.discard(1);
            st.write_match(&mut rc, dict.pos(), 2, 2).unwrap();
            dict.discard(2);
            assert_eq!(st.rep(), [1, 0, 0, 0]);
            st.write_match(&mut rc, dict.pos(), 2, 1).unwrap();
            assert_eq!(st.state().value(), 11);
            rc.close().unwrap();
        }
        assert!(!stream.is_empty());
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_write_match_bad_length_panics() {
        let mut st = EncoderState::new(LzmaProperties::default());
        let mut rc = RangeEncoder::new(Vec::new());
        st.write_match(&mut rc, 0, 5, 1).unwrap();
    }

    #[test]
    fn test_limit_on_tiny_sink() {
        let mut enc = Encoder::new(LimitedSink::new(Vec::new(), 4), &small_config()).unwrap();
        enc.write(b"abc").unwrap();
        let err = enc.close().unwrap_err();
        assert!(err.is_limit());
        assert_eq!(enc.sink().written(), 0);
    }

    #[test]
    fn test_write_after_close() {
        let mut enc = Encoder::new(Vec::new(), &small_config()).unwrap();
        enc.close().unwrap();
        assert!(matches!(enc.write(b"x"), Err(LzmaError::Closed)));
        assert!(matches!(enc.close(), Err(LzmaError::Closed)));
    }

    #[test]
    fn test_io_write() {
        use std::io::Write;

        let config = small_config();
        let mut enc = Encoder::new(Vec::new(), &config).unwrap();
        enc.write_all(b"hello hello hello").unwrap();
        enc.flush().unwrap();
        enc.close().unwrap();
        let stream = enc.into_sink();
        let out = decompress_raw(&stream, config.properties, 64, None).unwrap();
        assert_eq!(out, b"hello hello hello");
    }
}
