//! Streaming 32-bit content hash used to fingerprint tile geometry, so regeneration can early-out
//! when voxelized content hasn't actually changed since the last build.
//!
//! This is the MurmurHash3 x86_32 finalization/mixing scheme, fed incrementally rather than over a
//! single buffer, matching the original `HashComputer`'s `Add(...)` call pattern from the
//! generator pipeline (vertices, triangle indices and walkability flags are each hashed as they're
//! produced instead of being buffered up front).

const C1: u32 = 0xcc9e2d51;
const C2: u32 = 0x1b873593;
const SEED: u32 = 0x7a7a_7a7a;

/// Incremental MurmurHash3-32 accumulator.
#[derive(Clone, Debug)]
pub struct HashComputer {
    hash: u32,
    len: u32,
    // Up to 3 pending bytes carried over between `add` calls, so callers can feed arbitrary-sized
    // chunks (u16s, u32s, single bytes) without forcing 4-byte alignment on every call.
    carry: [u8; 4],
    carry_len: u8,
}

impl Default for HashComputer {
    fn default() -> Self {
        Self::new()
    }
}

impl HashComputer {
    pub fn new() -> HashComputer {
        HashComputer { hash: SEED, len: 0, carry: [0; 4], carry_len: 0 }
    }

    fn consume_block(&mut self, mut k1: u32) {
        k1 = k1.wrapping_mul(C1);
        k1 = k1.rotate_left(15);
        k1 = k1.wrapping_mul(C2);

        self.hash ^= k1;
        self.hash = self.hash.rotate_left(13);
        self.hash = self.hash.wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    /// Feed raw bytes into the hash. Order matters: this is a streaming hash, not a set hash.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.len = self.len.wrapping_add(bytes.len() as u32);
        let mut iter = bytes.iter();

        if self.carry_len > 0 {
            while (self.carry_len as usize) < 4 {
                match iter.next() {
                    Some(&b) => {
                        self.carry[self.carry_len as usize] = b;
                        self.carry_len += 1;
                    }
                    None => return,
                }
            }
            let k1 = u32::from_le_bytes(self.carry);
            self.consume_block(k1);
            self.carry_len = 0;
        }

        let rest: &[u8] = iter.as_slice();
        let mut chunks = rest.chunks_exact(4);
        for chunk in &mut chunks {
            let k1 = u32::from_le_bytes(chunk.try_into().unwrap());
            self.consume_block(k1);
        }
        let remainder = chunks.remainder();
        self.carry[..remainder.len()].copy_from_slice(remainder);
        self.carry_len = remainder.len() as u8;
    }

    pub fn add_u32(&mut self, value: u32) {
        self.add_bytes(&value.to_le_bytes());
    }

    pub fn add_u16(&mut self, value: u16) {
        self.add_bytes(&value.to_le_bytes());
    }

    pub fn add_f32(&mut self, value: f32) {
        self.add_bytes(&value.to_le_bytes());
    }

    pub fn add_bool(&mut self, value: bool) {
        self.add_bytes(&[value as u8]);
    }

    /// Finalize and return the 32-bit digest. Does not consume `self` so a caller can snapshot a
    /// running hash mid-stream (used when the generator wants to early-out partway through
    /// voxelisation once it knows the prefix already differs).
    pub fn finish(&self) -> u32 {
        let mut h1 = self.hash;

        if self.carry_len > 0 {
            let mut k1 = 0u32;
            for i in (0..self.carry_len as usize).rev() {
                k1 <<= 8;
                k1 |= self.carry[i] as u32;
            }
            k1 = k1.wrapping_mul(C1);
            k1 = k1.rotate_left(15);
            k1 = k1.wrapping_mul(C2);
            h1 ^= k1;
        }

        h1 ^= self.len;
        h1 ^= h1 >> 16;
        h1 = h1.wrapping_mul(0x85ebca6b);
        h1 ^= h1 >> 13;
        h1 = h1.wrapping_mul(0xc2b2ae35);
        h1 ^= h1 >> 16;
        h1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_hash_is_deterministic() {
        let a = HashComputer::new().finish();
        let b = HashComputer::new().finish();
        assert_eq!(a, b);
    }

    #[test]
    fn order_changes_hash() {
        let mut a = HashComputer::new();
        a.add_u32(1);
        a.add_u32(2);

        let mut b = HashComputer::new();
        b.add_u32(2);
        b.add_u32(1);

        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn chunked_feed_matches_single_feed() {
        let mut a = HashComputer::new();
        a.add_bytes(&[1, 2, 3, 4, 5, 6, 7, 8, 9]);

        let mut b = HashComputer::new();
        b.add_bytes(&[1, 2]);
        b.add_bytes(&[3]);
        b.add_bytes(&[4, 5, 6, 7]);
        b.add_bytes(&[8, 9]);

        assert_eq!(a.finish(), b.finish());
    }

    #[test]
    fn same_content_same_hash() {
        let mut a = HashComputer::new();
        a.add_u16(42);
        a.add_bool(true);
        a.add_f32(1.5);

        let mut b = HashComputer::new();
        b.add_u16(42);
        b.add_bool(true);
        b.add_f32(1.5);

        assert_eq!(a.finish(), b.finish());
    }
}
