//! Warden stream cipher
//!
//! The state is a 258-byte table: a permutation of all byte values followed
//! by the two running cursors. Keystream bytes are XORed into the data and
//! the state keeps advancing across calls, so one instance per direction
//! must live for the whole session.

/// Length of a Warden cipher key
pub const WARDEN_KEY_LEN: usize = 16;

/// Size of the cipher state table (permutation plus two cursors)
pub const STATE_LEN: usize = 0x102;

const CURSOR_I: usize = 0x100;
const CURSOR_J: usize = 0x101;

/// Keyed Warden cipher state
#[derive(Clone)]
pub struct CipherState {
    table: [u8; STATE_LEN],
}

impl CipherState {
    /// Run the key schedule over `key`
    ///
    /// 64 rounds each swap four consecutive entries against the position
    /// picked by a running 16-bit sum of table and key bytes.
    pub fn new(key: &[u8; WARDEN_KEY_LEN]) -> Self {
        Self::from_key_bytes(key)
    }

    /// Key schedule over a key of any non-zero length
    ///
    /// An empty key leaves the identity permutation in place.
    pub fn from_key_bytes(key: &[u8]) -> Self {
        let mut table = [0u8; STATE_LEN];
        for (i, entry) in table.iter_mut().take(0x100).enumerate() {
            *entry = i as u8;
        }

        if key.is_empty() {
            return CipherState { table };
        }

        let mut val: u16 = 0;
        let mut position = 0usize;

        for round in 1..=0x40usize {
            for offset in (1..=4).rev() {
                let index = round * 4 - offset;
                val = val
                    .wrapping_add(table[index] as u16)
                    .wrapping_add(key[position % key.len()] as u16);
                position += 1;
                table.swap(index, (val & 0xFF) as usize);
            }
        }

        CipherState { table }
    }

    /// Produce the next keystream byte
    #[inline]
    pub fn keystream_byte(&mut self) -> u8 {
        let i = self.table[CURSOR_I].wrapping_add(1);
        let j = self.table[CURSOR_J].wrapping_add(self.table[i as usize]);
        self.table[CURSOR_I] = i;
        self.table[CURSOR_J] = j;
        self.table.swap(i as usize, j as usize);

        let k = self.table[j as usize].wrapping_add(self.table[i as usize]);
        self.table[k as usize]
    }

    /// Encrypt or decrypt `data` in place, continuing the keystream
    pub fn crypt(&mut self, data: &mut [u8]) {
        for byte in data.iter_mut() {
            *byte ^= self.keystream_byte();
        }
    }

    /// The raw 258-byte state
    pub fn as_bytes(&self) -> &[u8; STATE_LEN] {
        &self.table
    }
}

impl std::fmt::Debug for CipherState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material stays out of logs
        f.debug_struct("CipherState")
            .field("i", &self.table[CURSOR_I])
            .field("j", &self.table[CURSOR_J])
            .finish_non_exhaustive()
    }
}
