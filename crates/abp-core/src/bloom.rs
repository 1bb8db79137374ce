//! Bloom index over rule fingerprints
//!
//! A fixed-size bit array probed with double hashing. Besides whole-key
//! lookups it answers "does any fixed-width window of this text belong to
//! the set", which is how a URL is tested against every fingerprint at once.
//!
//! The index never reports a false negative. False positives are expected and
//! are resolved by the full rule scan that follows a positive answer.

use crate::hash::hash_pair;

/// Default number of keys the index is sized for.
pub const DEFAULT_EXPECTED_ITEMS: usize = 50_000;

/// Default bits reserved per expected key.
pub const DEFAULT_BITS_PER_ITEM: usize = 10;

#[derive(Debug, Clone)]
pub struct BloomIndex {
    words: Vec<u64>,
    bit_count: u64,
    hash_count: u32,
    len: usize,
}

impl Default for BloomIndex {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_EXPECTED_ITEMS, DEFAULT_BITS_PER_ITEM)
    }
}

impl BloomIndex {
    /// Create an index sized for `expected_items` keys at `bits_per_item`.
    /// The probe count is the false-positive optimum `bits_per_item * ln 2`.
    pub fn with_capacity(expected_items: usize, bits_per_item: usize) -> Self {
        let bits = expected_items.max(1).saturating_mul(bits_per_item.max(1));
        let word_count = bits.div_ceil(64);
        let hash_count = ((bits_per_item.max(1) as f64) * std::f64::consts::LN_2).round().max(1.0) as u32;
        Self {
            words: vec![0; word_count],
            bit_count: (word_count * 64) as u64,
            hash_count,
            len: 0,
        }
    }

    /// Number of `add` calls so far (duplicates included).
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn hash_count(&self) -> u32 {
        self.hash_count
    }

    pub fn bit_count(&self) -> u64 {
        self.bit_count
    }

    #[inline]
    fn bit_index(&self, h1: u32, h2: u32, i: u32) -> usize {
        let combined = (h1 as u64).wrapping_add((i as u64).wrapping_mul(h2 as u64));
        (combined % self.bit_count) as usize
    }

    pub fn add(&mut self, key: &str) {
        self.add_bytes(key.as_bytes());
    }

    pub fn add_bytes(&mut self, key: &[u8]) {
        let (h1, h2) = hash_pair(key);
        for i in 0..self.hash_count {
            let idx = self.bit_index(h1, h2, i);
            self.words[idx / 64] |= 1u64 << (idx % 64);
        }
        self.len += 1;
    }

    pub fn contains(&self, key: &str) -> bool {
        self.contains_bytes(key.as_bytes())
    }

    pub fn contains_bytes(&self, key: &[u8]) -> bool {
        let (h1, h2) = hash_pair(key);
        (0..self.hash_count).all(|i| {
            let idx = self.bit_index(h1, h2, i);
            self.words[idx / 64] & (1u64 << (idx % 64)) != 0
        })
    }

    /// Whether any `window_len`-byte window of `text` may be in the set.
    pub fn contains_any_substring(&self, text: &[u8], window_len: usize) -> bool {
        self.matching_substrings(text, window_len).next().is_some()
    }

    /// Every `window_len`-byte window of `text` the index reports present.
    pub fn matching_substrings<'t>(
        &'t self,
        text: &'t [u8],
        window_len: usize,
    ) -> impl Iterator<Item = &'t [u8]> + 't {
        let windows = if window_len == 0 || self.is_empty() {
            // Skip the scan when no key can possibly be present.
            text[..0].windows(1)
        } else {
            text.windows(window_len)
        };
        windows.filter(move |w| self.contains_bytes(w))
    }
}
