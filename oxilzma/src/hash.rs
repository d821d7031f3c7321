//! Buzhash rolling hash.
//!
//! A fingerprint of the word `p[0..k]` is defined by
//!
//! ```text
//! h(1) = T[p0]
//! h(k) = rotl(h(k-1), 1) ^ T[p(k-1)]
//! ```
//!
//! so a single pass over the first `n` bytes yields the fingerprints of all
//! prefixes. The same definition lets a window of fixed length roll over a
//! byte slice in constant time per step.

/// Random table of 256 words driving the hash.
///
/// Generated once with a splitmix64 sequence; the values only need to be
/// well mixed and fixed.
#[rustfmt::skip]
pub static TABLE: [u32; 256] = [
    0x8ab04c94, 0xa496fb63, 0x510fc2e1, 0x7f5a4e5f, 0x421fb932, 0x300f1a59,
    0x6654886d, 0xf28ed5f2, 0x0807651e, 0x910c0f1d, 0xc036534d, 0x445a7f0f,
    0x1377c906, 0x036ffc22, 0x2846adc9, 0x7d05e895, 0xacc6f1a1, 0x8a073707,
    0xacd2efa7, 0x08dd86d5, 0x769228c7, 0x7879560c, 0xe6d0a6c5, 0xfe194768,
    0x9a9f3993, 0x3e93e76b, 0xcbe3c2e4, 0xbadd698b, 0xc237f8fd, 0x375146e1,
    0xb3dcc178, 0x87ff21b5, 0xce6b489b, 0xd0920b83, 0xb87d637e, 0xdadfe261,
    0xadff7dc8, 0xfbb019f2, 0x8ab7d2c8, 0xd1ca836d, 0x4004800b, 0x48f52620,
    0x2d2748ad, 0x45146a5c, 0xf1c95e2d, 0x7808ed55, 0x0819d482, 0xf1e7e9a3,
    0x42904c31, 0x70400ca9, 0xe19299e8, 0xd89d6e00, 0xb4a61dd6, 0x1367b0db,
    0x301add52, 0xb9b9d15c, 0xcac5321d, 0x47d219a7, 0x5df070ec, 0x8999865f,
    0xac985c71, 0x44a0a6b0, 0x193d0901, 0x75e34961, 0xfd980928, 0x2f453aec,
    0x08aeba14, 0xfbefdfa4, 0x4e785150, 0xdbbaf004, 0x45ab525a, 0x6ab12497,
    0x3865266e, 0x8aa6db57, 0x97b00e58, 0xde6150f7, 0xb917574d, 0x5f1e45cc,
    0x2fba4069, 0x0b0601e1, 0x4528584e, 0x0f14e561, 0x554b9ced, 0x190bf3ad,
    0x158ec56a, 0x51b8202e, 0xe572372a, 0xb61d2644, 0xb31d7607, 0x02c187c7,
    0xdeee698d, 0x303e3d8c, 0x26c8dfa3, 0x05526596, 0x5110e017, 0x0a102bde,
    0xb52dad73, 0x8adf1a68, 0xb29bbd27, 0x9967b16b, 0xd1ff5147, 0x035ef8d9,
    0x9e9087ed, 0x911fcce1, 0xa158e4b1, 0x2f5247bc, 0x4df8ade6, 0x9ee8e9cd,
    0x53418207, 0xfbb55d24, 0x1c7717f5, 0x767cafd4, 0xb55d8128, 0x1fbfcdb0,
    0x18434b94, 0x1ce4d73d, 0x76b640a5, 0x0af57af7, 0xa53c86d7, 0x6e8fc9bf,
    0x89a6339c, 0x366536b2, 0xc9578f7e, 0x7bbd3f6d, 0xac025d43, 0x1b93c22c,
    0x6f4f9f6b, 0x0e1f98cf, 0x10c3f9a5, 0x03848900, 0xb76343d1, 0x4752942c,
    0x0d7f5ddf, 0xbb4c4d98, 0x02ea975f, 0xae35a3bf, 0x1bd10fd7, 0x554b2194,
    0x74aba806, 0xe18c2efe, 0xcf927a23, 0x80a66e5e, 0x29ef5e4c, 0x49872783,
    0xd97735c9, 0x74a0f03a, 0x37e236fc, 0x39d90d14, 0x3996f0b5, 0xca40247d,
    0x9fc026cb, 0x1522f677, 0x8d655494, 0x1be66f58, 0x3094f6e7, 0x5ca88d3e,
    0xb3fa2d90, 0x2182f611, 0x0a672a18, 0x91f68da6, 0x0f3ace03, 0x3b8c67e4,
    0x6ccf0e59, 0x534abe17, 0x77c414ba, 0xeaaf77b9, 0xb5757f27, 0xf11a2afd,
    0x02af4df2, 0xa91597fb, 0xb9ab78de, 0x1a91c177, 0x0abd23b0, 0xb5de59a3,
    0x0afdeb4a, 0xc37bcbb2, 0xa4485cca, 0xc7bc9485, 0xc7045e33, 0x623ebf5d,
    0x3f05964d, 0x68e788d2, 0xbe76f389, 0x4e1495d5, 0xf5a88113, 0x5b99fa6d,
    0xa89b6ef5, 0xeffae4db, 0xc7676822, 0xa9bf73a2, 0xed48aada, 0xfd1f8110,
    0xd6809007, 0x6afe8af2, 0x145977ac, 0xb4f15876, 0xd301f94f, 0x1c24cd8a,
    0x7ea7c390, 0x5ce9e724, 0x638df064, 0x616b4d38, 0x14e2b38e, 0x8cad2021,
    0x52a8520d, 0xf0707ed2, 0x89ebeec7, 0x4eff6a10, 0xdd7832dc, 0x01ceb64e,
    0xf820aa5b, 0x9d46c3b6, 0x19dac7db, 0xa8eda064, 0x1c52da59, 0x2ac8c3c4,
    0x9d890586, 0xbc2abc61, 0x6aebb42d, 0x67077495, 0x7ea4fa12, 0xfe3ff64e,
    0xb22fa7b2, 0xe5a7690c, 0x86c61877, 0x5666181d, 0x6ca11aac, 0x841eb6d4,
    0x31a90940, 0x4a99cb51, 0xa3eb3951, 0x6de515c8, 0x41af8e7b, 0x5b949a16,
    0x6c8a55e6, 0xb8dd811d, 0xc67c38e9, 0x6493781e, 0x08480580, 0x1694f6b7,
    0x321b2267, 0x936f4423, 0xeecec910, 0x2faf6b95, 0x8d453e96, 0x6e019181,
    0xa62cc5a1, 0x087dda71, 0x38d649f1, 0x742df78f, 0xb278e6b7, 0x14bd2f65,
    0x24d5cd58, 0x76e5a74c, 0x4948e82d, 0x1492734c,
];

/// Hash a single byte.
#[inline]
fn byte_hash(b: u8) -> u32 {
    TABLE[b as usize]
}

/// Rolling hash for word lengths `2..=n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingHash {
    n: usize,
}

impl RollingHash {
    /// Create a hash for words of up to `n` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `n` is not in `2..=32`.
    pub fn new(n: usize) -> Self {
        assert!(
            (2..=32).contains(&n),
            "rolling hash word length {} out of range",
            n
        );
        Self { n }
    }

    /// Maximum word length.
    pub fn word_len(&self) -> usize {
        self.n
    }

    /// Compute the fingerprints of the prefixes of `p` with lengths
    /// `2..=min(p.len(), n)`.
    ///
    /// `hashes[i]` receives the fingerprint of the word of length `i + 2`.
    /// Returns the number of fingerprints written, which is zero for inputs
    /// shorter than two bytes.
    ///
    /// # Panics
    ///
    /// Panics if `hashes` cannot hold the fingerprints.
    pub fn compute(&self, p: &[u8], hashes: &mut [u32]) -> usize {
        let k = p.len().min(self.n);
        if k < 2 {
            return 0;
        }
        let mut h = byte_hash(p[0]);
        for (i, &b) in p[1..k].iter().enumerate() {
            h = h.rotate_left(1) ^ byte_hash(b);
            hashes[i] = h;
        }
        k - 1
    }

    /// Fingerprint of the full word `p`, which must be exactly `n` bytes.
    pub fn hash_word(&self, p: &[u8]) -> u32 {
        assert_eq!(p.len(), self.n, "word has wrong length");
        p[1..]
            .iter()
            .fold(byte_hash(p[0]), |h, &b| h.rotate_left(1) ^ byte_hash(b))
    }

    /// Iterate over the fingerprints of every `n` byte window of `data`.
    pub fn windows<'a>(&self, data: &'a [u8]) -> Windows<'a> {
        Windows {
            data,
            n: self.n,
            pos: 0,
            h: None,
        }
    }
}

/// Iterator over rolling window fingerprints.
#[derive(Debug, Clone)]
pub struct Windows<'a> {
    data: &'a [u8],
    n: usize,
    /// Start of the next window.
    pos: usize,
    /// Fingerprint of the previous window.
    h: Option<u32>,
}

impl Iterator for Windows<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        if self.pos + self.n > self.data.len() {
            return None;
        }
        let h = match self.h {
            None => {
                let w = &self.data[..self.n];
                w[1..]
                    .iter()
                    .fold(byte_hash(w[0]), |h, &b| h.rotate_left(1) ^ byte_hash(b))
            }
            Some(h) => {
                let out = byte_hash(self.data[self.pos - 1]).rotate_left(self.n as u32);
                h.rotate_left(1) ^ out ^ byte_hash(self.data[self.pos + self.n - 1])
            }
        };
        self.h = Some(h);
        self.pos += 1;
        Some(h)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = (self.data.len() + 1).saturating_sub(self.pos + self.n);
        (n, Some(n))
    }
}

impl ExactSizeIterator for Windows<'_> {}
