//! Encoder configuration and presets.

use crate::dict::MAX_DICT_CAP;
use crate::match_finder::MatchFinderKind;
use crate::model::LzmaProperties;
use crate::operation::{MAX_MATCH_LEN, MIN_MATCH_LEN};
use oxilzma_core::error::{LzmaError, Result};
use std::fmt;
use std::str::FromStr;

/// Default look-ahead buffer size.
pub const DEFAULT_BUF_SIZE: usize = 4096;

/// Dictionary capacity exponents of the presets 0 to 9.
pub const DICT_CAP_EXPS: [u32; 10] = [18, 20, 21, 22, 22, 23, 23, 24, 25, 26];

/// Operation selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Mode {
    /// Take the longest match the match finder reports.
    Fast,
    /// Also weigh repeat-distance matches and short repeats.
    #[default]
    Normal,
}

impl Mode {
    /// Textual name of the mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Normal => "normal",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = LzmaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "normal" => Ok(Self::Normal),
            _ => Err(LzmaError::invalid_config(format!("unknown mode {:?}", s))),
        }
    }
}

/// Configuration of an encoder session.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct EncoderConfig {
    /// Dictionary capacity in bytes.
    pub dict_cap: usize,
    /// Look-ahead buffer size in bytes.
    pub buf_size: usize,
    /// Literal context, literal position and position bits.
    pub properties: LzmaProperties,
    /// Match finder variant.
    pub match_finder: MatchFinderKind,
    /// Operation selection strategy.
    pub mode: Mode,
    /// Match length at which the search stops.
    pub nice_len: usize,
    /// Maximum number of candidates examined per position.
    pub depth: usize,
    /// Write an end-of-stream marker when closing.
    pub eos_marker: bool,
}

impl EncoderConfig {
    /// Configuration of a preset.
    pub fn from_preset(preset: Preset) -> Self {
        preset.config()
    }

    /// Set the dictionary capacity.
    pub fn with_dict_cap(mut self, dict_cap: usize) -> Self {
        self.dict_cap = dict_cap;
        self
    }

    /// Set the match finder.
    pub fn with_match_finder(mut self, match_finder: MatchFinderKind) -> Self {
        self.match_finder = match_finder;
        self
    }

    /// Set the search depth.
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Set the nice length.
    pub fn with_nice_len(mut self, nice_len: usize) -> Self {
        self.nice_len = nice_len;
        self
    }

    /// Set the mode.
    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the literal and position bits.
    pub fn with_properties(mut self, properties: LzmaProperties) -> Self {
        self.properties = properties;
        self
    }

    /// Request an end-of-stream marker.
    pub fn with_eos_marker(mut self, eos_marker: bool) -> Self {
        self.eos_marker = eos_marker;
        self
    }

    /// Check the configuration. Nothing is clamped.
    pub fn verify(&self) -> Result<()> {
        if !(1..=MAX_DICT_CAP).contains(&self.dict_cap) {
            return Err(LzmaError::invalid_config(format!(
                "dictionary capacity must be in [1, {}]",
                MAX_DICT_CAP
            )));
        }
        if self.buf_size < MAX_MATCH_LEN {
            return Err(LzmaError::invalid_config(format!(
                "buffer size must be at least {}",
                MAX_MATCH_LEN
            )));
        }
        self.properties.verify()?;
        if !(MIN_MATCH_LEN..=MAX_MATCH_LEN).contains(&self.nice_len) {
            return Err(LzmaError::invalid_config(format!(
                "nice length must be in [{}, {}]",
                MIN_MATCH_LEN, MAX_MATCH_LEN
            )));
        }
        if self.depth < 1 {
            return Err(LzmaError::invalid_config("depth must be at least 1"));
        }
        Ok(())
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Preset::DEFAULT.config()
    }
}

/// Compression preset (0 to 9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "u8", into = "u8"))]
pub struct Preset(u8);

impl Preset {
    /// Fastest preset (0).
    pub const FAST: Self = Self(0);
    /// Default preset (6).
    pub const DEFAULT: Self = Self(6);
    /// Best preset (9).
    pub const BEST: Self = Self(9);

    /// Highest preset level.
    pub const MAX_LEVEL: u8 = 9;

    /// Create a preset. Levels above 9 are rejected.
    pub fn new(level: u8) -> Result<Self> {
        if level > Self::MAX_LEVEL {
            return Err(LzmaError::invalid_config(format!(
                "preset level {} exceeds 9",
                level
            )));
        }
        Ok(Self(level))
    }

    /// Get the level value.
    pub fn level(&self) -> u8 {
        self.0
    }

    /// Dictionary capacity of the preset.
    pub fn dict_cap(&self) -> usize {
        1 << DICT_CAP_EXPS[self.0 as usize]
    }

    /// Match finder of the preset.
    ///
    /// Presets 4 to 9 use a deeper hash chain search in place of a binary
    /// tree finder.
    pub fn match_finder(&self) -> MatchFinderKind {
        match self.0 {
            0 => MatchFinderKind::Hc3,
            _ => MatchFinderKind::Hc4,
        }
    }

    /// Operation selection mode of the preset.
    pub fn mode(&self) -> Mode {
        if self.0 <= 3 {
            Mode::Fast
        } else {
            Mode::Normal
        }
    }

    /// Nice length of the preset.
    pub fn nice_len(&self) -> usize {
        match self.0 {
            0 | 1 => 128,
            2 | 3 => 273,
            4 => 16,
            5 => 32,
            _ => 64,
        }
    }

    /// Search depth of the preset.
    pub fn depth(&self) -> usize {
        match self.0 {
            0 => 4,
            1 => 8,
            2 => 24,
            3 => 48,
            _ => 16 + self.nice_len() / 2,
        }
    }

    /// The complete configuration of the preset.
    pub fn config(&self) -> EncoderConfig {
        EncoderConfig {
            dict_cap: self.dict_cap(),
            buf_size: DEFAULT_BUF_SIZE,
            properties: LzmaProperties::default(),
            match_finder: self.match_finder(),
            mode: self.mode(),
            nice_len: self.nice_len(),
            depth: self.depth(),
            eos_marker: false,
        }
    }
}

impl Default for Preset {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u8> for Preset {
    type Error = LzmaError;

    fn try_from(level: u8) -> Result<Self> {
        Self::new(level)
    }
}

impl From<Preset> for u8 {
    fn from(preset: Preset) -> Self {
        preset.0
    }
}
