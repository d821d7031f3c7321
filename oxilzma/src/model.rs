//! LZMA probability models.
//!
//! LZMA uses context-dependent probability models for:
//! - Literal coding (context = previous byte + position)
//! - Match length coding
//! - Distance coding
//! - State machine transitions
//!
//! Each sub-model can encode its symbol into a [`RangeEncoder`] and decode
//! it from a [`RangeDecoder`] using the same probabilities, so the two
//! directions stay in lock step.

use crate::range_coder::{PROB_INIT, RangeDecoder, RangeEncoder};
use oxilzma_core::error::{LzmaError, Result};
use oxilzma_core::sink::ByteSink;
use std::io::Read;

/// Default number of literal context bits.
pub const LC_DEFAULT: u32 = 3;

/// Default number of literal position bits.
pub const LP_DEFAULT: u32 = 0;

/// Default number of position bits.
pub const PB_DEFAULT: u32 = 2;

/// Maximum number of position states.
pub const POS_STATES_MAX: usize = 1 << 4;

/// Number of states in the LZMA state machine.
pub const NUM_STATES: usize = 12;

/// Number of bits for low length coding.
pub const LEN_LOW_BITS: u32 = 3;
/// Number of bits for mid length coding.
pub const LEN_MID_BITS: u32 = 3;
/// Number of bits for high length coding.
pub const LEN_HIGH_BITS: u32 = 8;

/// Number of low length symbols.
pub const LEN_LOW_SYMBOLS: usize = 1 << LEN_LOW_BITS;
/// Number of mid length symbols.
pub const LEN_MID_SYMBOLS: usize = 1 << LEN_MID_BITS;
/// Number of high length symbols.
pub const LEN_HIGH_SYMBOLS: usize = 1 << LEN_HIGH_BITS;

/// Number of length states selecting the distance slot coder.
pub const LEN_STATES: usize = 4;

/// Number of bits of a distance slot.
pub const DIST_SLOT_BITS: u32 = 6;

/// Number of distance slots.
pub const DIST_SLOTS: usize = 1 << DIST_SLOT_BITS;

/// Number of alignment bits for distance coding.
pub const DIST_ALIGN_BITS: u32 = 4;
/// Size of alignment table.
pub const DIST_ALIGN_SIZE: usize = 1 << DIST_ALIGN_BITS;

/// First distance slot coded with direct bits.
pub const END_POS_MODEL_INDEX: u32 = 14;

/// Number of distances below the first direct bits slot.
pub const FULL_DISTANCES: usize = 1 << (END_POS_MODEL_INDEX / 2);

/// Number of probabilities per literal context.
const LITERAL_CODER_SIZE: usize = 0x300;

/// LZMA state machine state.
///
/// States 0 to 6 follow a literal, 7 to 11 follow a match or repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct State(u8);

impl State {
    /// Initial state.
    pub const fn new() -> Self {
        Self(0)
    }

    /// Get state value.
    pub fn value(self) -> usize {
        self.0 as usize
    }

    /// Check if the last operation was a literal.
    pub fn is_literal(self) -> bool {
        self.0 < 7
    }

    /// Update state after literal.
    pub fn update_literal(&mut self) {
        self.0 = match self.0 {
            0..=3 => 0,
            4..=9 => self.0 - 3,
            _ => self.0 - 6,
        };
    }

    /// Update state after match.
    pub fn update_match(&mut self) {
        self.0 = if self.0 < 7 { 7 } else { 10 };
    }

    /// Update state after short rep.
    pub fn update_short_rep(&mut self) {
        self.0 = if self.0 < 7 { 9 } else { 11 };
    }

    /// Update state after long rep.
    pub fn update_long_rep(&mut self) {
        self.0 = if self.0 < 7 { 8 } else { 11 };
    }
}

/// LZMA properties (lc, lp, pb).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LzmaProperties {
    /// Literal context bits.
    pub lc: u32,
    /// Literal position bits.
    pub lp: u32,
    /// Position bits.
    pub pb: u32,
}

impl LzmaProperties {
    /// Create new properties.
    pub fn new(lc: u32, lp: u32, pb: u32) -> Self {
        Self { lc, lp, pb }
    }

    /// Check the properties against the format limits.
    pub fn verify(&self) -> Result<()> {
        if self.lc > 8 {
            return Err(LzmaError::invalid_config("lc out of range"));
        }
        if self.lp > 4 {
            return Err(LzmaError::invalid_config("lp out of range"));
        }
        if self.pb > 4 {
            return Err(LzmaError::invalid_config("pb out of range"));
        }
        if self.lc + self.lp > 4 {
            return Err(LzmaError::invalid_config("lc + lp must not exceed 4"));
        }
        Ok(())
    }

    /// Parse from property byte.
    pub fn from_byte(byte: u8) -> Option<Self> {
        if byte >= 9 * 5 * 5 {
            return None;
        }
        let b = byte as u32;
        Some(Self {
            lc: b % 9,
            lp: (b / 9) % 5,
            pb: b / 45,
        })
    }

    /// Encode to property byte.
    pub fn to_byte(&self) -> u8 {
        ((self.pb * 45) + (self.lp * 9) + self.lc) as u8
    }

    /// Get number of literal contexts.
    pub fn num_lit_states(&self) -> usize {
        1 << (self.lc + self.lp)
    }

    /// Get number of position states.
    pub fn num_pos_states(&self) -> usize {
        1 << self.pb
    }

    /// Position state of the absolute position `pos`.
    pub fn pos_state(&self, pos: u64) -> usize {
        (pos & ((1 << self.pb) - 1)) as usize
    }
}

impl Default for LzmaProperties {
    fn default() -> Self {
        Self {
            lc: LC_DEFAULT,
            lp: LP_DEFAULT,
            pb: PB_DEFAULT,
        }
    }
}

/// Length coder model.
///
/// Lengths are coded as `len - 2` in three ranges: 8 low and 8 mid symbols
/// per position state and 256 shared high symbols.
#[derive(Debug, Clone)]
pub struct LengthModel {
    /// Choice bit (low vs mid+high).
    pub choice: u16,
    /// Choice2 bit (mid vs high).
    pub choice2: u16,
    /// Low length probabilities (per position state).
    pub low: Vec<[u16; LEN_LOW_SYMBOLS]>,
    /// Mid length probabilities (per position state).
    pub mid: Vec<[u16; LEN_MID_SYMBOLS]>,
    /// High length probabilities (shared).
    pub high: [u16; LEN_HIGH_SYMBOLS],
}

impl LengthModel {
    /// Create a new length model.
    pub fn new(num_pos_states: usize) -> Self {
        Self {
            choice: PROB_INIT,
            choice2: PROB_INIT,
            low: vec![[PROB_INIT; LEN_LOW_SYMBOLS]; num_pos_states],
            mid: vec![[PROB_INIT; LEN_MID_SYMBOLS]; num_pos_states],
            high: [PROB_INIT; LEN_HIGH_SYMBOLS],
        }
    }

    /// Encode `len`, a match length minus 2.
    pub fn encode<S: ByteSink>(
        &mut self,
        rc: &mut RangeEncoder<S>,
        len: u32,
        pos_state: usize,
    ) -> Result<()> {
        const MID_START: u32 = LEN_LOW_SYMBOLS as u32;
        const HIGH_START: u32 = MID_START + LEN_MID_SYMBOLS as u32;

        if len < MID_START {
            rc.encode_bit(&mut self.choice, 0)?;
            rc.encode_bit_tree(&mut self.low[pos_state], LEN_LOW_BITS, len)
        } else if len < HIGH_START {
            rc.encode_bit(&mut self.choice, 1)?;
            rc.encode_bit(&mut self.choice2, 0)?;
            rc.encode_bit_tree(&mut self.mid[pos_state], LEN_MID_BITS, len - MID_START)
        } else {
            rc.encode_bit(&mut self.choice, 1)?;
            rc.encode_bit(&mut self.choice2, 1)?;
            rc.encode_bit_tree(&mut self.high, LEN_HIGH_BITS, len - HIGH_START)
        }
    }

    /// Decode a match length minus 2.
    pub fn decode<R: Read>(&mut self, rd: &mut RangeDecoder<R>, pos_state: usize) -> Result<u32> {
        if rd.decode_bit(&mut self.choice)? == 0 {
            return rd.decode_bit_tree(&mut self.low[pos_state], LEN_LOW_BITS);
        }
        if rd.decode_bit(&mut self.choice2)? == 0 {
            let len = rd.decode_bit_tree(&mut self.mid[pos_state], LEN_MID_BITS)?;
            return Ok(len + LEN_LOW_SYMBOLS as u32);
        }
        let len = rd.decode_bit_tree(&mut self.high, LEN_HIGH_BITS)?;
        Ok(len + (LEN_LOW_SYMBOLS + LEN_MID_SYMBOLS) as u32)
    }
}

/// Literal coder model.
#[derive(Debug, Clone)]
pub struct LiteralModel {
    /// Probability table for each literal context.
    pub probs: Vec<[u16; LITERAL_CODER_SIZE]>,
}

impl LiteralModel {
    /// Create a new literal model.
    pub fn new(num_lit_states: usize) -> Self {
        Self {
            probs: vec![[PROB_INIT; LITERAL_CODER_SIZE]; num_lit_states],
        }
    }

    /// Get the literal context index.
    pub fn get_state(&self, pos: u64, prev_byte: u8, lc: u32, lp: u32) -> usize {
        let lit_pos = (pos & ((1 << lp) - 1)) as usize;
        let prev_bits = (prev_byte as usize) >> (8 - lc as usize);
        (lit_pos << lc as usize) + prev_bits
    }

    /// Encode `byte` in the literal context `lit_state`.
    ///
    /// With a match byte, the bits of the byte are coded in the context of
    /// the match byte bits until the first difference.
    pub fn encode<S: ByteSink>(
        &mut self,
        rc: &mut RangeEncoder<S>,
        lit_state: usize,
        byte: u8,
        match_byte: Option<u8>,
    ) -> Result<()> {
        let probs = &mut self.probs[lit_state];
        let mut context = 1usize;
        let mut i = 8;

        if let Some(match_byte) = match_byte {
            while i > 0 {
                i -= 1;
                let match_bit = ((match_byte >> i) & 1) as usize;
                let bit = ((byte >> i) & 1) as usize;
                rc.encode_bit(&mut probs[0x100 + (match_bit << 8) + context], bit as u32)?;
                context = (context << 1) | bit;
                if bit != match_bit {
                    break;
                }
            }
        }
        while i > 0 {
            i -= 1;
            let bit = ((byte >> i) & 1) as usize;
            rc.encode_bit(&mut probs[context], bit as u32)?;
            context = (context << 1) | bit;
        }
        Ok(())
    }

    /// Decode a byte in the literal context `lit_state`.
    pub fn decode<R: Read>(
        &mut self,
        rd: &mut RangeDecoder<R>,
        lit_state: usize,
        match_byte: Option<u8>,
    ) -> Result<u8> {
        let probs = &mut self.probs[lit_state];
        let mut context = 1usize;
        let mut i = 8;

        if let Some(match_byte) = match_byte {
            while i > 0 {
                i -= 1;
                let match_bit = ((match_byte >> i) & 1) as usize;
                let bit = rd.decode_bit(&mut probs[0x100 + (match_bit << 8) + context])? as usize;
                context = (context << 1) | bit;
                if bit != match_bit {
                    break;
                }
            }
        }
        while i > 0 {
            i -= 1;
            let bit = rd.decode_bit(&mut probs[context])? as usize;
            context = (context << 1) | bit;
        }
        Ok((context & 0xFF) as u8)
    }
}

/// Get the distance slot of a zero based distance.
pub fn get_dist_slot(dist: u32) -> u32 {
    if dist < 4 {
        return dist;
    }
    let bits = 32 - dist.leading_zeros();
    ((bits - 1) << 1) | ((dist >> (bits - 2)) & 1)
}

/// Length state selecting the slot coder for a match length minus 2.
pub fn len_state(len: u32) -> usize {
    (len as usize).min(LEN_STATES - 1)
}

/// Distance coder model.
#[derive(Debug, Clone)]
pub struct DistanceModel {
    /// Distance slot probabilities (per length state).
    pub slot: [[u16; DIST_SLOTS]; LEN_STATES],
    /// Reverse bit tree probabilities for slots 4 to 13.
    ///
    /// The tree of slot `s` with base `b` uses the entries starting at
    /// `b - s - 1`, indexed from 1, so the trees never overlap.
    pub special: [u16; FULL_DISTANCES - END_POS_MODEL_INDEX as usize],
    /// Alignment probabilities.
    pub align: [u16; DIST_ALIGN_SIZE],
}

impl DistanceModel {
    /// Create a new distance model.
    pub fn new() -> Self {
        Self {
            slot: [[PROB_INIT; DIST_SLOTS]; LEN_STATES],
            special: [PROB_INIT; FULL_DISTANCES - END_POS_MODEL_INDEX as usize],
            align: [PROB_INIT; DIST_ALIGN_SIZE],
        }
    }

    /// Encode the zero based distance `dist` of a match of `len + 2` bytes.
    pub fn encode<S: ByteSink>(
        &mut self,
        rc: &mut RangeEncoder<S>,
        dist: u32,
        len: u32,
    ) -> Result<()> {
        let slot = get_dist_slot(dist);
        rc.encode_bit_tree(&mut self.slot[len_state(len)], DIST_SLOT_BITS, slot)?;
        if slot < 4 {
            return Ok(());
        }

        let footer_bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << footer_bits;
        let reduced = dist - base;

        if slot < END_POS_MODEL_INDEX {
            let offset = (base - slot) as usize;
            let mut m = 1usize;
            for i in 0..footer_bits {
                let bit = (reduced >> i) & 1;
                rc.encode_bit(&mut self.special[offset + m - 1], bit)?;
                m = (m << 1) | bit as usize;
            }
            Ok(())
        } else {
            rc.encode_direct_bits(reduced >> DIST_ALIGN_BITS, footer_bits - DIST_ALIGN_BITS)?;
            rc.encode_bit_tree_reverse(
                &mut self.align,
                DIST_ALIGN_BITS,
                reduced & (DIST_ALIGN_SIZE as u32 - 1),
            )
        }
    }

    /// Decode a zero based distance for a match of `len + 2` bytes.
    pub fn decode<R: Read>(&mut self, rd: &mut RangeDecoder<R>, len: u32) -> Result<u32> {
        let slot = rd.decode_bit_tree(&mut self.slot[len_state(len)], DIST_SLOT_BITS)?;
        if slot < 4 {
            return Ok(slot);
        }

        let footer_bits = (slot >> 1) - 1;
        let base = (2 | (slot & 1)) << footer_bits;

        if slot < END_POS_MODEL_INDEX {
            let offset = (base - slot) as usize;
            let mut m = 1usize;
            let mut reduced = 0u32;
            for i in 0..footer_bits {
                let bit = rd.decode_bit(&mut self.special[offset + m - 1])?;
                m = (m << 1) | bit as usize;
                reduced |= bit << i;
            }
            Ok(base + reduced)
        } else {
            let direct = rd.decode_direct_bits(footer_bits - DIST_ALIGN_BITS)?;
            let align = rd.decode_bit_tree_reverse(&mut self.align, DIST_ALIGN_BITS)?;
            Ok(base
                .wrapping_add(direct << DIST_ALIGN_BITS)
                .wrapping_add(align))
        }
    }
}

impl Default for DistanceModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Complete LZMA model containing all probability tables.
#[derive(Debug, Clone)]
pub struct LzmaModel {
    /// LZMA properties.
    pub props: LzmaProperties,

    /// Is-match probabilities.
    pub is_match: [[u16; POS_STATES_MAX]; NUM_STATES],
    /// Is-rep probabilities.
    pub is_rep: [u16; NUM_STATES],
    /// Is-rep-g0 probabilities.
    pub is_rep_g0: [u16; NUM_STATES],
    /// Is-rep-g1 probabilities.
    pub is_rep_g1: [u16; NUM_STATES],
    /// Is-rep-g2 probabilities.
    pub is_rep_g2: [u16; NUM_STATES],
    /// Is-rep0-long probabilities.
    pub is_rep0_long: [[u16; POS_STATES_MAX]; NUM_STATES],

    /// Match length model.
    pub match_len: LengthModel,
    /// Rep match length model.
    pub rep_len: LengthModel,

    /// Literal model.
    pub literal: LiteralModel,

    /// Distance model.
    pub distance: DistanceModel,
}

impl LzmaModel {
    /// Create a new LZMA model with the given properties.
    pub fn new(props: LzmaProperties) -> Self {
        let num_pos_states = props.num_pos_states();

        Self {
            props,
            is_match: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            is_rep: [PROB_INIT; NUM_STATES],
            is_rep_g0: [PROB_INIT; NUM_STATES],
            is_rep_g1: [PROB_INIT; NUM_STATES],
            is_rep_g2: [PROB_INIT; NUM_STATES],
            is_rep0_long: [[PROB_INIT; POS_STATES_MAX]; NUM_STATES],
            match_len: LengthModel::new(num_pos_states),
            rep_len: LengthModel::new(num_pos_states),
            literal: LiteralModel::new(props.num_lit_states()),
            distance: DistanceModel::new(),
        }
    }

    /// Literal context for the byte at `pos` following `prev_byte`.
    pub fn lit_state(&self, pos: u64, prev_byte: u8) -> usize {
        self.literal
            .get_state(pos, prev_byte, self.props.lc, self.props.lp)
    }
}
