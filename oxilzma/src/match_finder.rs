//! Match finders.
//!
//! A match finder owns the encoder dictionary and indexes its content. The
//! encoder asks it for the matches at the head of the look-ahead and then
//! tells it how many bytes the chosen operation consumed.

use crate::dict::{Dictionary, MAX_DICT_CAP};
use crate::hash::RollingHash;
use crate::hash_index::{HashChain, HashTable};
use crate::operation::{MAX_MATCH_LEN, MIN_MATCH_LEN, Operation};
use oxilzma_core::error::{LzmaError, Result};
use std::fmt;
use std::str::FromStr;

/// Finds matches in the dictionary it owns.
///
/// Every call to [`find_matches`](MatchFinder::find_matches) must be
/// followed by a [`skip`](MatchFinder::skip) covering the bytes consumed by
/// the operation written for that position.
pub trait MatchFinder {
    /// The dictionary.
    fn dict(&self) -> &Dictionary;

    /// Mutable access to the dictionary, for appending look-ahead.
    fn dict_mut(&mut self) -> &mut Dictionary;

    /// Replace the content of `matches` with the matches at the head.
    ///
    /// The matches have strictly increasing lengths and there are at most
    /// [`depth`](MatchFinder::depth) of them.
    ///
    /// # Panics
    ///
    /// Panics if no look-ahead is buffered.
    fn find_matches(&mut self, matches: &mut Vec<Operation>);

    /// Move the head `n` bytes forward, indexing the skipped positions.
    ///
    /// # Panics
    ///
    /// Panics if fewer than `n` bytes are buffered.
    fn skip(&mut self, n: usize);

    /// Maximum number of candidates examined per search.
    fn depth(&self) -> usize;
}

/// Hash chain match finder variants, by maximum hashed word length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum MatchFinderKind {
    /// Hash chain over two byte words.
    Hc2,
    /// Hash chain over three byte words.
    Hc3,
    /// Hash chain over four byte words.
    #[default]
    Hc4,
}

impl MatchFinderKind {
    /// Word length hashed by the chain.
    pub fn word_len(self) -> usize {
        match self {
            Self::Hc2 => 2,
            Self::Hc3 => 3,
            Self::Hc4 => 4,
        }
    }

    /// Variant for a word length.
    pub fn from_word_len(n: usize) -> Result<Self> {
        match n {
            2 => Ok(Self::Hc2),
            3 => Ok(Self::Hc3),
            4 => Ok(Self::Hc4),
            _ => Err(LzmaError::unsupported_match_finder(format!("hc{}", n))),
        }
    }

    /// Textual code of the variant.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hc2 => "hc2",
            Self::Hc3 => "hc3",
            Self::Hc4 => "hc4",
        }
    }

    /// Create a finder with its own dictionary.
    pub fn new_finder(
        self,
        dict_cap: usize,
        buf_size: usize,
        nice_len: usize,
        depth: usize,
    ) -> Result<Box<dyn MatchFinder + Send>> {
        let finder = HcFinder::new(self.word_len(), dict_cap, buf_size, nice_len, depth)?;
        Ok(Box::new(finder))
    }
}

impl fmt::Display for MatchFinderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchFinderKind {
    type Err = LzmaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hc2" => Ok(Self::Hc2),
            "hc3" => Ok(Self::Hc3),
            "hc4" => Ok(Self::Hc4),
            _ => Err(LzmaError::unsupported_match_finder(s)),
        }
    }
}

/// Maximum table sizes for the single entry tables by word length.
fn table_size(word_len: usize) -> usize {
    match word_len {
        2 => 1 << 16,
        3 => 1 << 24,
        _ => 1 << 26,
    }
}

/// Maximum size of the chain head table.
const CHAIN_SIZE: usize = 1 << 27;

/// Hash chain match finder.
///
/// Words of the maximum length `n` are indexed in a [`HashChain`]; shorter
/// words down to two bytes use one [`HashTable`] each.
#[derive(Debug)]
pub struct HcFinder {
    dict: Dictionary,
    hash: RollingHash,
    /// Fingerprints of the words at the head, word length 2 first.
    hashes: Vec<u32>,
    /// Valid entries in `hashes`.
    hash_count: usize,
    /// Number of positions in front of the head that are already indexed.
    ahead: usize,
    /// Tables for word lengths `2..n`.
    tables: Vec<HashTable>,
    chain: HashChain,
    n: usize,
    /// Candidate distances; the length is the depth.
    distances: Vec<usize>,
    /// Look-ahead copy of up to `nice_len` bytes.
    data: Vec<u8>,
    data_len: usize,
    nice_len: usize,
}

impl HcFinder {
    /// Create a finder for word length `n` with a new dictionary.
    pub fn new(
        n: usize,
        dict_cap: usize,
        buf_size: usize,
        nice_len: usize,
        depth: usize,
    ) -> Result<Self> {
        if !(2..=4).contains(&n) {
            return Err(LzmaError::unsupported_match_finder(format!("hc{}", n)));
        }
        if !(MIN_MATCH_LEN..=MAX_MATCH_LEN).contains(&nice_len) {
            return Err(LzmaError::invalid_config(format!(
                "nice length must be in [{}, {}]",
                MIN_MATCH_LEN, MAX_MATCH_LEN
            )));
        }
        if depth < 1 {
            return Err(LzmaError::invalid_config("depth must be at least 1"));
        }
        if dict_cap > MAX_DICT_CAP {
            return Err(LzmaError::invalid_config(
                "dictionary capacity out of range",
            ));
        }
        let dict = Dictionary::new(dict_cap, buf_size)?;

        let tables = (2..n)
            .map(|wl| HashTable::new(table_size(wl), dict_cap))
            .collect();
        let chain = HashChain::new(CHAIN_SIZE, &dict);

        Ok(Self {
            hash: RollingHash::new(n),
            hashes: vec![0; n - 1],
            hash_count: 0,
            ahead: 0,
            tables,
            chain,
            n,
            distances: vec![0; depth],
            data: vec![0; nice_len.max(n)],
            data_len: 0,
            nice_len,
            dict,
        })
    }

    /// Word length of the chain.
    pub fn word_len(&self) -> usize {
        self.n
    }

    fn must_discard(&mut self, n: usize) {
        let discarded = self.dict.discard(n);
        assert_eq!(discarded, n, "discarded {} of {} bytes", discarded, n);
    }

    /// Enter the fingerprints of the words at the head.
    fn enter_hashes(&mut self) {
        let off = self.dict.pos();
        for (i, &h) in self.hashes[..self.hash_count].iter().enumerate() {
            if i < self.n - 2 {
                self.tables[i].put(h, off, self.dict.window());
            } else {
                self.chain.put(h, off, &self.dict);
            }
        }
    }

    /// A match at `dist` longer than `max_len`, if there is one.
    fn better_match(&self, dist: usize, max_len: usize) -> Option<Operation> {
        debug_assert!(max_len < self.data_len);
        if !(1..=self.dict.dict_len()).contains(&dist) {
            return None;
        }
        let dist_i = dist as isize;
        if self.dict.window_byte(dist_i - max_len as isize) != Some(self.data[max_len]) {
            return None;
        }
        let n = self.dict.match_len(dist_i, &self.data[..self.data_len]);
        if n <= max_len || !(MIN_MATCH_LEN..=MAX_MATCH_LEN).contains(&n) {
            return None;
        }
        Some(Operation::new_match(dist as u32, n))
    }

    /// Search the tables without extending them.
    fn only_find_matches(&mut self, matches: &mut Vec<Operation>) {
        let depth = self.distances.len();
        let mut max_len = 0;
        let mut hi = self.hash_count;

        if hi + 1 == self.n {
            let key = self.hashes[hi - 1];
            let k = self.chain.get(key, &self.dict, &mut self.distances);
            hi -= 1;
            for j in 0..k {
                let Some(m) = self.better_match(self.distances[j], max_len) else {
                    continue;
                };
                max_len = m.len();
                matches.push(m);
                if matches.len() == depth || max_len == self.data_len {
                    return;
                }
            }
        }

        let pos = self.dict.pos();
        while hi > 0 {
            hi -= 1;
            let Some(off) = self.tables[hi].get(self.hashes[hi]) else {
                continue;
            };
            let dist = usize::try_from(pos - off).unwrap_or(usize::MAX);
            let Some(m) = self.better_match(dist, max_len) else {
                continue;
            };
            max_len = m.len();
            matches.push(m);
            if matches.len() == depth || max_len == self.data_len {
                return;
            }
        }
    }
}

impl MatchFinder for HcFinder {
    fn dict(&self) -> &Dictionary {
        &self.dict
    }

    fn dict_mut(&mut self) -> &mut Dictionary {
        &mut self.dict
    }

    fn find_matches(&mut self, matches: &mut Vec<Operation>) {
        matches.clear();
        assert!(self.dict.buffered() > 0, "no data buffered");
        self.data_len = self.dict.peek(&mut self.data[..self.nice_len]);
        self.hash_count = self
            .hash
            .compute(&self.data[..self.data_len], &mut self.hashes);
        self.only_find_matches(matches);
        if self.ahead == 0 {
            self.enter_hashes();
            self.ahead = 1;
        }
    }

    fn skip(&mut self, n: usize) {
        assert!(
            n <= self.dict.buffered(),
            "skip request of {} exceeds buffered size {}",
            n,
            self.dict.buffered()
        );
        if n <= self.ahead {
            self.must_discard(n);
            self.ahead -= n;
            return;
        }
        let ahead = std::mem::take(&mut self.ahead);
        self.must_discard(ahead);
        for _ in ahead..n {
            let k = self.dict.peek(&mut self.data[..self.n]);
            self.hash_count = self.hash.compute(&self.data[..k], &mut self.hashes);
            self.enter_hashes();
            self.must_discard(1);
        }
    }

    fn depth(&self) -> usize {
        self.distances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_bytes(len: usize, alphabet: u8, mut seed: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
                b'a' + ((seed >> 33) % alphabet as u64) as u8
            })
            .collect()
    }

    fn finder(n: usize, dict_cap: usize, depth: usize, data: &[u8]) -> HcFinder {
        let mut f = HcFinder::new(n, dict_cap, 4096, MAX_MATCH_LEN, depth).unwrap();
        let (k, _) = f.dict_mut().write(data);
        assert_eq!(k, data.len());
        f
    }

    #[test]
    fn test_kind_from_str() {
        let kind: MatchFinderKind = "hc4".parse().unwrap();
        assert_eq!(kind, MatchFinderKind::Hc4);
        let kind: MatchFinderKind = "HC3".parse().unwrap();
        assert_eq!(kind, MatchFinderKind::Hc3);
        let err = "bt4".parse::<MatchFinderKind>().unwrap_err();
        assert!(matches!(err, LzmaError::UnsupportedMatchFinder { .. }));
        assert_eq!(MatchFinderKind::Hc2.to_string(), "hc2");
        assert_eq!(
            MatchFinderKind::from_word_len(3).unwrap(),
            MatchFinderKind::Hc3
        );
        assert!(MatchFinderKind::from_word_len(5).is_err());
    }

    #[test]
    fn test_new_rejects_bad_config() {
        assert!(HcFinder::new(1, 64, 64, 32, 4).is_err());
        assert!(HcFinder::new(4, 64, 64, 1, 4).is_err());
        assert!(HcFinder::new(4, 64, 64, MAX_MATCH_LEN + 1, 4).is_err());
        assert!(HcFinder::new(4, 64, 64, 32, 0).is_err());
        assert!(HcFinder::new(4, 0, 64, 32, 4).is_err());
    }

    #[test]
    fn test_finds_repeat() {
        let mut f = finder(4, 64, 4, b"abcdabcd");
        let mut matches = Vec::new();
        for _ in 0..4 {
            f.find_matches(&mut matches);
            assert!(matches.is_empty());
            f.skip(1);
        }
        f.find_matches(&mut matches);
        assert_eq!(matches, vec![Operation::new_match(4, 4)]);
        f.skip(4);
        assert_eq!(f.dict().buffered(), 0);
    }

    #[test]
    fn test_requery_same_position() {
        let mut f = finder(3, 64, 8, b"xyzxyzxyz");
        let mut first = Vec::new();
        let mut second = Vec::new();
        f.skip(3);
        f.find_matches(&mut first);
        f.find_matches(&mut second);
        assert_eq!(first, second);
        assert_eq!(first.last(), Some(&Operation::new_match(3, 6)));
    }

    #[test]
    fn test_match_validity() {
        let data = lcg_bytes(4000, 4, 7);
        for n in 2..=4 {
            let mut f = finder(n, 256, 6, &data);
            let mut matches = Vec::new();
            while f.dict().buffered() > 0 {
                f.find_matches(&mut matches);
                assert!(matches.len() <= f.depth());
                let dict_len = f.dict().dict_len();
                let mut prev = 0;
                for m in &matches {
                    let Operation::Match { distance, len } = *m else {
                        panic!("literal returned as match");
                    };
                    let (distance, len) = (distance as usize, len as usize);
                    assert!((MIN_MATCH_LEN..=MAX_MATCH_LEN).contains(&len));
                    assert!(1 <= distance && distance <= dict_len);
                    assert!(len > prev, "lengths must increase");
                    prev = len;
                    let pos = f.dict().pos() as usize;
                    let start = pos - distance;
                    assert_eq!(data[pos..pos + len], data[start..start + len]);
                }
                let step = matches.last().map_or(1, |m| m.len());
                f.skip(step);
            }
        }
    }

    #[test]
    fn test_depth_limits_matches() {
        let data = lcg_bytes(3000, 2, 11);
        let mut f = finder(4, 1024, 1, &data);
        let mut matches = Vec::new();
        f.skip(2000);
        f.find_matches(&mut matches);
        assert!(matches.len() <= 1);
        assert_eq!(f.depth(), 1);
    }

    #[test]
    #[should_panic(expected = "no data buffered")]
    fn test_find_matches_empty_panics() {
        let mut f = finder(4, 64, 4, b"");
        let mut matches = Vec::new();
        f.find_matches(&mut matches);
    }

    #[test]
    #[should_panic(expected = "exceeds buffered size")]
    fn test_skip_beyond_buffered_panics() {
        let mut f = finder(4, 64, 4, b"abc");
        f.skip(4);
    }
}
