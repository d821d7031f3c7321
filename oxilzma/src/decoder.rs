//! LZMA decompression of raw streams.
//!
//! The decoder mirrors the encoder's sessions: the dictionary, model and
//! repeat distances survive between calls to [`LzmaDecoder::decode`], so a
//! sequence of streams produced by [`Encoder::reopen`](crate::Encoder::reopen)
//! decodes back into the original data.

use crate::model::{LzmaModel, LzmaProperties, State};
use crate::operation::MIN_MATCH_LEN;
use crate::range_coder::RangeDecoder;
use oxilzma_core::error::{LzmaError, Result};
use std::io::Read;

/// Smallest dictionary the decoder allocates for.
const DICT_SIZE_MIN: usize = 4096;

/// Zero based distance of the end-of-stream marker.
const EOS_DIST: u32 = 0xFFFF_FFFF;

/// LZMA decoder.
pub struct LzmaDecoder {
    /// LZMA model.
    model: LzmaModel,
    /// Current state.
    state: State,
    /// Rep distances.
    rep: [u32; 4],
    /// History ring. Grows up to `dict_size` before wrapping.
    dict: Vec<u8>,
    /// Next write index in `dict`.
    dict_pos: usize,
    dict_size: usize,
    /// Bytes decoded over all sessions.
    pos: u64,
}

impl LzmaDecoder {
    /// Create a decoder for streams with the given properties and
    /// dictionary size.
    pub fn new(props: LzmaProperties, dict_size: u32) -> Result<Self> {
        props.verify()?;
        let dict_size = (dict_size as usize).max(DICT_SIZE_MIN);
        Ok(Self {
            model: LzmaModel::new(props),
            state: State::new(),
            rep: [0; 4],
            dict: Vec::new(),
            dict_pos: 0,
            dict_size,
            pos: 0,
        })
    }

    /// Bytes decoded over all sessions.
    pub fn pos(&self) -> u64 {
        self.pos
    }

    /// Get byte from dictionary at the zero based distance `dist`.
    fn get_byte(&self, dist: u32) -> Result<u8> {
        let dist = dist as usize;
        if dist >= self.dict.len() {
            return Err(LzmaError::corrupted(
                self.pos,
                "match distance beyond history",
            ));
        }
        let idx = if self.dict_pos > dist {
            self.dict_pos - dist - 1
        } else {
            self.dict.len() - (dist - self.dict_pos) - 1
        };
        Ok(self.dict[idx])
    }

    fn put_byte(&mut self, byte: u8, output: &mut Vec<u8>) {
        if self.dict.len() < self.dict_size {
            self.dict.push(byte);
            self.dict_pos = self.dict.len() % self.dict_size;
        } else {
            self.dict[self.dict_pos] = byte;
            self.dict_pos = (self.dict_pos + 1) % self.dict_size;
        }
        output.push(byte);
        self.pos += 1;
    }

    fn copy_match(&mut self, dist: u32, len: usize, output: &mut Vec<u8>) -> Result<()> {
        for _ in 0..len {
            let byte = self.get_byte(dist)?;
            self.put_byte(byte, output);
        }
        Ok(())
    }

    /// Decode one stream from `reader`, appending to `output`.
    ///
    /// With a known `size`, decoding stops after that many bytes. Otherwise
    /// the stream must end with an end-of-stream marker. Returns the number
    /// of bytes decoded.
    pub fn decode<R: Read>(
        &mut self,
        reader: R,
        size: Option<u64>,
        output: &mut Vec<u8>,
    ) -> Result<u64> {
        let mut rd = RangeDecoder::new(reader)?;
        let start = self.pos;

        loop {
            let decoded = self.pos - start;
            match size {
                Some(size) if decoded > size => {
                    return Err(LzmaError::corrupted(self.pos, "match exceeds stream size"));
                }
                Some(size) if decoded == size => break,
                _ => {}
            }

            let pos_state = self.model.props.pos_state(self.pos);
            let state = self.state.value();

            if rd.decode_bit(&mut self.model.is_match[state][pos_state])? == 0 {
                let prev_byte = if self.pos == 0 { 0 } else { self.get_byte(0)? };
                let match_byte = if self.state.is_literal() {
                    None
                } else {
                    Some(self.get_byte(self.rep[0])?)
                };
                let lit_state = self.model.lit_state(self.pos, prev_byte);
                let byte = self.model.literal.decode(&mut rd, lit_state, match_byte)?;
                self.put_byte(byte, output);
                self.state.update_literal();
                continue;
            }

            let len = if rd.decode_bit(&mut self.model.is_rep[state])? == 0 {
                let len = self.model.match_len.decode(&mut rd, pos_state)?;
                let dist = self.model.distance.decode(&mut rd, len)?;
                if dist == EOS_DIST {
                    if size.is_some() {
                        return Err(LzmaError::corrupted(self.pos, "unexpected end marker"));
                    }
                    break;
                }
                self.rep = [dist, self.rep[0], self.rep[1], self.rep[2]];
                self.state.update_match();
                len
            } else if rd.decode_bit(&mut self.model.is_rep_g0[state])? == 0 {
                if rd.decode_bit(&mut self.model.is_rep0_long[state][pos_state])? == 0 {
                    let byte = self.get_byte(self.rep[0])?;
                    self.put_byte(byte, output);
                    self.state.update_short_rep();
                    continue;
                }
                self.state.update_long_rep();
                self.model.rep_len.decode(&mut rd, pos_state)?
            } else {
                let dist = if rd.decode_bit(&mut self.model.is_rep_g1[state])? == 0 {
                    self.rep[1]
                } else if rd.decode_bit(&mut self.model.is_rep_g2[state])? == 0 {
                    let d = self.rep[2];
                    self.rep[2] = self.rep[1];
                    d
                } else {
                    let d = self.rep[3];
                    self.rep[3] = self.rep[2];
                    self.rep[2] = self.rep[1];
                    d
                };
                self.rep[1] = self.rep[0];
                self.rep[0] = dist;
                self.state.update_long_rep();
                self.model.rep_len.decode(&mut rd, pos_state)?
            };

            self.copy_match(self.rep[0], len as usize + MIN_MATCH_LEN, output)?;
        }

        Ok(self.pos - start)
    }
}

/// Decompress a raw LZMA stream without header.
///
/// `size` is the uncompressed size if known; without it the stream must
/// carry an end-of-stream marker.
pub fn decompress_raw(
    data: &[u8],
    props: LzmaProperties,
    dict_size: u32,
    size: Option<u64>,
) -> Result<Vec<u8>> {
    let mut decoder = LzmaDecoder::new(props, dict_size)?;
    // The declared size is untrusted; bound the reservation by the input.
    let limit = data.len() as u64 * 8;
    let capacity = size.map_or(limit, |size| size.min(limit));
    let mut output = Vec::with_capacity(capacity as usize);
    decoder.decode(data, size, &mut output)?;
    Ok(output)
}
