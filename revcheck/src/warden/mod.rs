//! Warden channel encryption
//!
//! Both directions of the Warden channel use their own [`CipherState`],
//! keyed from the first 32 bytes of a [`HashChainPrng`] seeded with the
//! session's 32-bit seed.
//!
//! An [`EncryptionContext`] belongs to a single connection. The keystream
//! position advances with every byte, so callers must serialise the calls
//! for each direction themselves (one send path, one receive path); the
//! context does no locking of its own.

mod cipher;
mod random;

pub use cipher::{CipherState, STATE_LEN, WARDEN_KEY_LEN};
pub use random::{HashChainPrng, SHA1_LEN};

use crate::{Error, Result};

/// Send and receive ciphers of one Warden session
#[derive(Debug, Clone)]
pub struct EncryptionContext {
    prng: Option<HashChainPrng>,
    send: CipherState,
    recv: CipherState,
}

fn draw_key(prng: &mut HashChainPrng) -> [u8; WARDEN_KEY_LEN] {
    let mut key = [0u8; WARDEN_KEY_LEN];
    prng.fill(&mut key);
    key
}

impl EncryptionContext {
    /// Client-side context: the first key encrypts, the second decrypts
    pub fn new(seed: u32) -> Self {
        let mut prng = HashChainPrng::new(&seed.to_le_bytes());
        let send = draw_key(&mut prng);
        let recv = draw_key(&mut prng);
        log::debug!("Derived Warden keys from seed {:#010x}", seed);

        EncryptionContext {
            prng: Some(prng),
            send: CipherState::new(&send),
            recv: CipherState::new(&recv),
        }
    }

    /// Peer-side context for the same seed, with the two keys swapped
    pub fn new_mirrored(seed: u32) -> Self {
        let EncryptionContext { prng, send, recv } = Self::new(seed);
        EncryptionContext {
            prng,
            send: recv,
            recv: send,
        }
    }

    /// Context from explicit keys
    pub fn with_keys(send: &[u8; WARDEN_KEY_LEN], recv: &[u8; WARDEN_KEY_LEN]) -> Self {
        EncryptionContext {
            prng: None,
            send: CipherState::new(send),
            recv: CipherState::new(recv),
        }
    }

    /// The generator the keys were drawn from, positioned after both keys
    ///
    /// `None` for contexts built from explicit keys.
    pub fn prng(&mut self) -> Option<&mut HashChainPrng> {
        self.prng.as_mut()
    }

    /// Encrypt outgoing data
    pub fn encrypt(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.send.crypt(&mut out);
        out
    }

    /// Decrypt incoming data
    pub fn decrypt(&mut self, data: &[u8]) -> Vec<u8> {
        let mut out = data.to_vec();
        self.recv.crypt(&mut out);
        out
    }

    /// Encrypt `length` bytes of `data` starting at `start`
    pub fn encrypt_range(&mut self, data: &[u8], start: usize, length: usize) -> Result<Vec<u8>> {
        let range = checked_range(data, start, length)?;
        Ok(self.encrypt(range))
    }

    /// Decrypt `length` bytes of `data` starting at `start`
    pub fn decrypt_range(&mut self, data: &[u8], start: usize, length: usize) -> Result<Vec<u8>> {
        let range = checked_range(data, start, length)?;
        Ok(self.decrypt(range))
    }

    /// Encrypt outgoing data in place
    pub fn encrypt_in_place(&mut self, data: &mut [u8]) {
        self.send.crypt(data);
    }

    /// Decrypt incoming data in place
    pub fn decrypt_in_place(&mut self, data: &mut [u8]) {
        self.recv.crypt(data);
    }
}

fn checked_range(data: &[u8], start: usize, length: usize) -> Result<&[u8]> {
    start
        .checked_add(length)
        .and_then(|end| data.get(start..end))
        .ok_or_else(|| {
            Error::range(format!(
                "range {}+{} exceeds buffer of {} bytes",
                start,
                length,
                data.len()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_keys_have_no_generator() {
        let mut ctx = EncryptionContext::with_keys(&[1; WARDEN_KEY_LEN], &[2; WARDEN_KEY_LEN]);
        assert!(ctx.prng().is_none());

        let mut seeded = EncryptionContext::new_mirrored(9);
        assert!(seeded.prng().is_some());
    }

    const GOLDEN_ZERO_SEED: [u8; 16] = [
        0x30, 0x22, 0x00, 0x30, 0x3c, 0xf9, 0x14, 0x98, 0xd1, 0x35, 0x40, 0xc5, 0x9d, 0x29, 0xf8,
        0xac,
    ];

    #[test]
    fn test_zero_seed_golden() {
        let mut ctx = EncryptionContext::new(0);
        assert_eq!(ctx.encrypt(&[0u8; 16]), GOLDEN_ZERO_SEED);
    }

    #[test]
    fn test_mirrored_context_decrypts() {
        let mut peer = EncryptionContext::new_mirrored(0);
        assert_eq!(peer.decrypt(&GOLDEN_ZERO_SEED), vec![0u8; 16]);
    }

    #[test]
    fn test_range_variants() {
        let buffer = [0u8; 32];
        let mut ctx = EncryptionContext::new(0);
        assert_eq!(ctx.encrypt_range(&buffer, 8, 16).unwrap(), GOLDEN_ZERO_SEED);
        assert!(ctx.encrypt_range(&buffer, 0, 32).is_ok());
        assert!(ctx.encrypt_range(&buffer, 32, 0).unwrap().is_empty());
    }

    #[test]
    fn test_range_errors_do_not_advance_keystream() {
        let buffer = [0u8; 16];
        let mut ctx = EncryptionContext::new(0);
        assert!(matches!(
            ctx.encrypt_range(&buffer, 10, 7),
            Err(Error::Range(_))
        ));
        assert!(matches!(
            ctx.decrypt_range(&buffer, usize::MAX, 2),
            Err(Error::Range(_))
        ));
        assert!(ctx.encrypt_range(&buffer, 17, 0).is_err());
        assert_eq!(ctx.encrypt(&buffer), GOLDEN_ZERO_SEED);
    }

    #[test]
    fn test_directions_are_independent() {
        let mut ctx = EncryptionContext::new(0x1234_5678);
        let sent = ctx.encrypt(b"ping");
        let mut other = EncryptionContext::new(0x1234_5678);
        other.decrypt(b"noise that advances only the receive side");
        assert_eq!(other.encrypt(b"ping"), sent);
    }

    #[test]
    fn test_explicit_keys() {
        let key_a = [1u8; WARDEN_KEY_LEN];
        let key_b = [2u8; WARDEN_KEY_LEN];
        let mut client = EncryptionContext::with_keys(&key_a, &key_b);
        let mut server = EncryptionContext::with_keys(&key_b, &key_a);

        let request = client.encrypt(b"module request");
        assert_eq!(server.decrypt(&request), b"module request");

        let reply = server.encrypt(b"module ok");
        assert_eq!(client.decrypt(&reply), b"module ok");
    }
}
