//! SHA-1 chained byte generator used to derive Warden keys

use sha1::{Digest, Sha1};

/// Size of a SHA-1 digest
pub const SHA1_LEN: usize = 20;

fn sha1(parts: &[&[u8]]) -> [u8; SHA1_LEN] {
    let mut hasher = Sha1::new();
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; SHA1_LEN];
    out.copy_from_slice(&hasher.finalize());
    out
}

/// Deterministic byte stream built by chaining SHA-1
///
/// The seed is split in two halves whose digests stay fixed for the life
/// of the generator; the output window is rehashed between them every 20
/// bytes.
#[derive(Clone)]
pub struct HashChainPrng {
    current: [u8; SHA1_LEN],
    left: [u8; SHA1_LEN],
    right: [u8; SHA1_LEN],
    position: usize,
}

impl HashChainPrng {
    /// Seed the generator
    pub fn new(seed: &[u8]) -> Self {
        let (first, second) = seed.split_at(seed.len() / 2);

        let mut prng = HashChainPrng {
            current: [0u8; SHA1_LEN],
            left: sha1(&[first]),
            right: sha1(&[second]),
            position: 0,
        };
        // The first window hashes over the still-zeroed output buffer
        prng.update();
        prng
    }

    fn update(&mut self) {
        self.current = sha1(&[&self.left[..], &self.current[..], &self.right[..]]);
    }

    /// Next byte of the stream
    pub fn next_byte(&mut self) -> u8 {
        let value = self.current[self.position];
        self.position += 1;
        if self.position == SHA1_LEN {
            self.position = 0;
            self.update();
        }
        value
    }

    /// Fill `out` with the next bytes of the stream
    pub fn fill(&mut self, out: &mut [u8]) {
        for byte in out.iter_mut() {
            *byte = self.next_byte();
        }
    }

    /// Next `n` bytes of the stream
    pub fn next_bytes(&mut self, n: usize) -> Vec<u8> {
        let mut out = vec![0u8; n];
        self.fill(&mut out);
        out
    }
}

impl std::fmt::Debug for HashChainPrng {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HashChainPrng")
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}
