//! Hash index over dictionary positions.
//!
//! Two structures map rolling hash fingerprints to absolute stream offsets:
//!
//! - [`HashTable`] keeps the most recent offset per bucket. Older entries
//!   are overwritten.
//! - [`HashChain`] keeps the most recent offset per bucket in a table and
//!   links every inserted position to the previous position with the same
//!   key, so all earlier occurrences inside the window can be walked.
//!
//! Offsets are stored truncated to 32 bits relative to a base; the value 0
//! marks an empty slot. When an offset no longer fits, all entries are
//! rebased and those that fall behind the new base are dropped.

use crate::dict::{Dictionary, Window};
use log::trace;

/// Smallest table length.
const MIN_TABLE_LEN: usize = 256;

/// Largest history range kept across a rebase.
const REBASE_WINDOW: u64 = 3 << 30;

/// Range of a truncated offset.
const TRUNCATED_RANGE: i64 = 1 << 32;

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    key: u32,
    /// Truncated offset; 0 means empty.
    short: u32,
}

/// Hash table with a single entry per bucket.
#[derive(Debug, Clone)]
pub struct HashTable {
    slots: Vec<Slot>,
    mask: usize,
    /// Occupied slots.
    used: usize,
    /// Length the table may grow to.
    max_len: usize,
    /// Offset base; a truncated offset `u` stands for `base + u`.
    base: i64,
}

impl HashTable {
    /// Create a table that can grow to `size` slots, limited by the
    /// dictionary capacity.
    pub fn new(size: usize, dict_cap: usize) -> Self {
        let max_len = size.min(dict_cap).max(1).next_power_of_two();
        let len = max_len.min(MIN_TABLE_LEN);
        Self {
            slots: vec![Slot::default(); len],
            mask: len - 1,
            used: 0,
            max_len,
            // Base -1 maps truncated offset 1 to offset 0.
            base: -1,
        }
    }

    /// Current number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Check if no entry is stored.
    pub fn is_empty(&self) -> bool {
        self.used == 0
    }

    /// Number of occupied slots.
    pub fn used(&self) -> usize {
        self.used
    }

    /// Current offset base.
    pub fn base(&self) -> i64 {
        self.base
    }

    #[inline]
    fn full_offset(&self, short: u32) -> u64 {
        (self.base + short as i64) as u64
    }

    #[inline]
    fn short_offset(&self, off: u64) -> u32 {
        let n = off as i64 - self.base;
        assert!(
            0 < n && n < TRUNCATED_RANGE,
            "offset {} out of range for base {}",
            off,
            self.base
        );
        n as u32
    }

    /// Insert `off` for `key`, replacing the bucket's previous entry.
    pub fn put(&mut self, key: u32, off: u64, w: Window) {
        if off as i64 >= self.base + TRUNCATED_RANGE {
            self.rebase(w);
        }
        let short = self.short_offset(off);
        let slot = &mut self.slots[key as usize & self.mask];
        if slot.short == 0 {
            self.used += 1;
        }
        *slot = Slot { key, short };

        if self.used * 4 > self.slots.len() * 3 && self.slots.len() < self.max_len {
            self.grow();
        }
    }

    /// Most recent offset stored for `key`.
    pub fn get(&self, key: u32) -> Option<u64> {
        let slot = self.slots[key as usize & self.mask];
        if slot.short == 0 || slot.key != key {
            return None;
        }
        Some(self.full_offset(slot.short))
    }

    /// Double the table and rehash the entries.
    fn grow(&mut self) {
        let len = self.slots.len() * 2;
        trace!(
            "hash table grows from {} to {} slots",
            self.slots.len(),
            len
        );
        let old = std::mem::replace(&mut self.slots, vec![Slot::default(); len]);
        self.mask = len - 1;
        self.used = 0;
        for slot in old.into_iter().filter(|s| s.short != 0) {
            let target = &mut self.slots[slot.key as usize & self.mask];
            if target.short == 0 {
                self.used += 1;
            }
            *target = slot;
        }
    }

    /// Move the base behind the still addressable history.
    fn rebase(&mut self, w: Window) {
        let c = (w.dict_len as u64).min(REBASE_WINDOW) as i64;
        self.rebase_to(w.head as i64 - c - 1);
    }

    /// Move the base to `new_base`, dropping entries behind it.
    ///
    /// # Panics
    ///
    /// Panics if the base would decrease or move by 2^32 or more.
    pub(crate) fn rebase_to(&mut self, new_base: i64) {
        let delta = new_base - self.base;
        assert!(delta >= 0, "decreasing hash table base");
        assert!(delta < TRUNCATED_RANGE, "hash table base delta too large");
        if delta == 0 {
            return;
        }
        trace!("hash table rebase from {} to {}", self.base, new_base);
        let delta = delta as u32;
        self.base = new_base;
        for slot in self.slots.iter_mut().filter(|s| s.short != 0) {
            if slot.short <= delta {
                slot.short = 0;
                self.used -= 1;
            } else {
                slot.short -= delta;
            }
        }
    }
}

/// Hash table with chaining through all positions of the window.
#[derive(Debug, Clone)]
pub struct HashChain {
    heads: HashTable,
    /// Key of the position stored in each dictionary backing array slot.
    keys: Vec<u32>,
    /// Distance to the previous position with the same key; 0 ends the
    /// chain.
    deltas: Vec<u32>,
    dict_cap: usize,
}

impl HashChain {
    /// Create a chain for `dict`. The head table may grow to `size` slots.
    pub fn new(size: usize, dict: &Dictionary) -> Self {
        Self {
            heads: HashTable::new(size, dict.capacity()),
            keys: vec![0; dict.backing_len()],
            deltas: vec![0; dict.backing_len()],
            dict_cap: dict.capacity(),
        }
    }

    /// Insert the position `off` of the dictionary for `key`.
    ///
    /// # Panics
    ///
    /// Panics if `off` is not inside the dictionary.
    pub fn put(&mut self, key: u32, off: u64, dict: &Dictionary) {
        let i = match dict.index_of(off) {
            Some(i) => i,
            None => panic!("offset {} not inside dictionary", off),
        };
        let prev = self.heads.get(key);
        self.heads.put(key, off, dict.window());

        let delta = match prev {
            Some(p) => {
                assert!(p <= off, "hash chain offsets must increase");
                let delta = off - p;
                if delta < self.dict_cap as u64 {
                    delta as u32
                } else {
                    0
                }
            }
            None => 0,
        };
        self.keys[i] = key;
        self.deltas[i] = delta;
    }

    /// Walk the chain for `key` and store the distances of the positions
    /// found, most recent first.
    ///
    /// Only distances in `[1, dict_len]` are reported. Returns the number of
    /// distances written, at most `distances.len()`.
    pub fn get(&mut self, key: u32, dict: &Dictionary, distances: &mut [usize]) -> usize {
        if distances.is_empty() {
            return 0;
        }
        let Some(off) = self.heads.get(key) else {
            return 0;
        };
        let Some(mut i) = dict.index_of(off) else {
            return 0;
        };
        let w = dict.window();
        if off > w.head || w.head - off > w.dict_len as u64 {
            return 0;
        }
        let mut dist = (w.head - off) as usize;
        let m = self.keys.len();

        let mut n = 0;
        loop {
            if self.keys[i] != key {
                return n;
            }
            if dist > 0 {
                distances[n] = dist;
                n += 1;
                if n >= distances.len() {
                    return n;
                }
            }
            let delta = self.deltas[i] as usize;
            if delta == 0 {
                return n;
            }
            dist += delta;
            if dist > w.dict_len {
                self.deltas[i] = 0;
                return n;
            }
            let d = delta % m;
            i = if i >= d { i - d } else { i + m - d };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(head: u64, dict_len: usize) -> Window {
        Window { head, dict_len }
    }

    /// Dictionary with `history` bytes moved into the history and
    /// `ahead` bytes of look-ahead.
    fn dict(cap: usize, history: usize, ahead: usize) -> Dictionary {
        let mut dict = Dictionary::new(cap, 64).unwrap();
        let data: Vec<u8> = (0..history + ahead).map(|i| i as u8).collect();
        let (n, _) = dict.write(&data);
        assert_eq!(n, data.len());
        dict.discard(history);
        dict
    }

    /// Empty dictionary whose head sits `before` bytes below 2^32.
    fn dict_below_4g(before: u64) -> Dictionary {
        let mut dict = Dictionary::new(64, 1 << 20).unwrap();
        let chunk = vec![0u8; 1 << 20];
        let target = (1u64 << 32) - before;
        while dict.pos() < target {
            let want = (target - dict.pos()).min(chunk.len() as u64) as usize;
            let (n, _) = dict.write(&chunk[..want]);
            dict.discard(n);
        }
        dict
    }

    #[test]
    fn test_table_put_get() {
        let mut t = HashTable::new(1 << 16, 1 << 20);
        assert!(t.is_empty());
        t.put(42, 0, window(0, 0));
        assert_eq!(t.get(42), Some(0));
        t.put(42, 7, window(7, 7));
        assert_eq!(t.get(42), Some(7));
        assert_eq!(t.used(), 1);
    }

    #[test]
    fn test_table_missing_key() {
        let mut t = HashTable::new(1 << 16, 1 << 20);
        assert_eq!(t.get(1), None);
        // Same bucket, other key.
        let other = 1 + t.len() as u32;
        t.put(other, 3, window(3, 3));
        assert_eq!(t.get(1), None);
        assert_eq!(t.get(other), Some(3));
    }

    #[test]
    fn test_table_grows() {
        let mut t = HashTable::new(1 << 16, 1 << 20);
        assert_eq!(t.len(), MIN_TABLE_LEN);
        for key in 0..1000u32 {
            t.put(key, key as u64, window(key as u64, key as usize));
        }
        assert_eq!(t.len(), 2048);
        for key in 0..1000u32 {
            assert_eq!(t.get(key), Some(key as u64));
        }
    }

    #[test]
    fn test_table_size_limited_by_dict_cap() {
        let mut t = HashTable::new(1 << 16, 100);
        for key in 0..1000u32 {
            t.put(key, key as u64, window(key as u64, 100));
        }
        assert_eq!(t.len(), 128);
    }

    #[test]
    fn test_table_rebase_to() {
        let mut t = HashTable::new(1 << 16, 1 << 20);
        t.put(1, 10, window(10, 10));
        t.put(2, 100, window(100, 100));

        t.rebase_to(49);
        assert_eq!(t.get(1), None);
        assert_eq!(t.get(2), Some(100));
        assert_eq!(t.used(), 1);
        assert_eq!(t.base(), 49);
    }

    #[test]
    fn test_table_rebase_on_overflow() {
        let mut t = HashTable::new(1 << 16, 1 << 20);
        let high = 1u64 << 32;
        t.put(1, 5, window(5, 5));
        t.put(3, high - 20, window(high - 20, 64));
        t.put(2, high + 10, window(high + 10, 64));

        assert_eq!(t.base(), (high + 10) as i64 - 65);
        assert_eq!(t.get(1), None);
        assert_eq!(t.get(3), Some(high - 20));
        assert_eq!(t.get(2), Some(high + 10));
    }

    #[test]
    #[should_panic(expected = "decreasing")]
    fn test_table_rebase_backwards_panics() {
        let mut t = HashTable::new(1 << 16, 1 << 20);
        t.rebase_to(-2);
    }

    #[test]
    fn test_chain_most_recent_first() {
        let d = dict(64, 10, 10);
        let mut c = HashChain::new(1 << 16, &d);
        for off in [2, 5, 9] {
            c.put(7, off, &d);
        }
        c.put(8, 7, &d);

        let mut distances = [0usize; 8];
        let n = c.get(7, &d, &mut distances);
        assert_eq!(&distances[..n], &[1, 5, 8]);

        let n = c.get(8, &d, &mut distances);
        assert_eq!(&distances[..n], &[3]);

        assert_eq!(c.get(9, &d, &mut distances), 0);
    }

    #[test]
    fn test_chain_depth_limit() {
        let d = dict(64, 10, 10);
        let mut c = HashChain::new(1 << 16, &d);
        for off in 0..10 {
            c.put(3, off, &d);
        }
        let mut distances = [0usize; 2];
        assert_eq!(c.get(3, &d, &mut distances), 2);
        assert_eq!(distances, [1, 2]);
    }

    #[test]
    fn test_chain_skips_head_position() {
        let d = dict(64, 10, 10);
        let mut c = HashChain::new(1 << 16, &d);
        c.put(4, 6, &d);
        c.put(4, 10, &d);
        let mut distances = [0usize; 4];
        let n = c.get(4, &d, &mut distances);
        assert_eq!(&distances[..n], &[4]);
    }

    #[test]
    fn test_chain_stops_at_window_end() {
        // Positions 0..4 fall out of the 8 byte window.
        let mut d = dict(8, 0, 20);
        let mut c = HashChain::new(1 << 16, &d);
        for off in 0..12u64 {
            d.discard((off - d.pos()) as usize);
            c.put(5, off, &d);
        }
        d.discard(1);
        assert_eq!(d.pos(), 12);
        let mut distances = [0usize; 16];
        let n = c.get(5, &d, &mut distances);
        assert_eq!(&distances[..n], &[1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_chain_across_4g_rebase() {
        let mut d = dict_below_4g(40);
        assert_eq!(d.pos(), (1u64 << 32) - 40);
        let (n, _) = d.write(&[0u8; 128]);
        assert_eq!(n, 128);

        let mut c = HashChain::new(1 << 16, &d);
        let mut distances = [0usize; 16];
        for i in 0..100usize {
            c.put(7, d.pos(), &d);
            d.discard(1);
            let n = c.get(7, &d, &mut distances);
            let want: Vec<usize> = (1..=(i + 1).min(16)).collect();
            assert_eq!(distances[..n], want[..], "at {}", d.pos());
        }
        assert_eq!(d.pos(), (1u64 << 32) + 60);
        // The head table moved its base past the old 32-bit range.
        assert!(c.heads.base() > 0);
    }
}
