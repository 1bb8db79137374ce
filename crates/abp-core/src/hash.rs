//! Hash functions for the fingerprint Bloom index
//!
//! Uses Murmur3 32-bit with two different seeds. The pair drives the
//! double-hashing scheme `h1 + i * h2` that produces every Bloom probe from
//! a single pass over the key.

// Default seeds for the two hash functions
const SEED_PRIMARY: u32 = 0x9e3779b9; // Golden ratio
const SEED_SECONDARY: u32 = 0x85ebca6b; // Murmur3 constant

/// Murmur3 32-bit hash implementation.
/// Optimized for short keys (fingerprints are 8 bytes).
#[inline]
pub fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    let len = data.len();
    let mut h = seed;

    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);

        let k = k.wrapping_mul(0xcc9e2d51);
        let k = k.rotate_left(15);
        let k = k.wrapping_mul(0x1b873593);

        h ^= k;
        h = h.rotate_left(13);
        h = h.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    // Process remaining bytes
    let tail = chunks.remainder();
    let mut k: u32 = 0;
    if tail.len() >= 3 {
        k ^= (tail[2] as u32) << 16;
    }
    if tail.len() >= 2 {
        k ^= (tail[1] as u32) << 8;
    }
    if !tail.is_empty() {
        k ^= tail[0] as u32;
        let k = k.wrapping_mul(0xcc9e2d51);
        let k = k.rotate_left(15);
        let k = k.wrapping_mul(0x1b873593);
        h ^= k;
    }

    // Finalization
    h ^= len as u32;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85ebca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2ae35);
    h ^= h >> 16;

    h
}

/// Compute the two base hashes for double hashing.
/// The second hash is forced odd so successive probes never collapse onto
/// the same bit for power-of-two table sizes.
#[inline]
pub fn hash_pair(data: &[u8]) -> (u32, u32) {
    let h1 = murmur3_32(data, SEED_PRIMARY);
    let h2 = murmur3_32(data, SEED_SECONDARY) | 1;
    (h1, h2)
}
