use byteorder::{ByteOrder, LE};
use md5::{Digest, Md5};

/// Xorshift keystream cipher keyed by a save category string.
///
/// XOR with the keystream is its own inverse, so the same call both decrypts
/// and encrypts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Cipher {
    seed: u32,
}

impl Cipher {
    /// Seed the keystream with the first four bytes of `MD5(key)`
    pub fn new(key: &str) -> Self {
        let digest = Md5::digest(key.as_bytes());
        Self {
            seed: LE::read_u32(&digest[..4]),
        }
    }

    pub fn for_category(category: super::Category) -> Self {
        Self::new(category.key())
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn apply(&self, bytes: &mut [u8]) {
        let mut state = self.seed;
        let mut blocks = bytes.chunks_exact_mut(4);
        for block in &mut blocks {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 5;
            let word = LE::read_u32(block) ^ state;
            LE::write_u32(block, word);
        }

        let tail = blocks.into_remainder();
        if !tail.is_empty() {
            // the trailing partial word skips the final shift
            state ^= state << 13;
            state ^= state >> 7;
            for (i, byte) in tail.iter_mut().enumerate() {
                *byte ^= (state >> (8 * i)) as u8;
            }
        }
    }
}

/// Decrypt or encrypt `bytes` in place with the keystream for `key`
pub fn transform(key: &str, bytes: &mut [u8]) {
    Cipher::new(key).apply(bytes)
}
