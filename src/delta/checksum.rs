/*!
 * Rolling checksum and block hashing for delta detection
 *
 * Adler-32 finds candidate blocks cheaply; a BLAKE3 hash confirms them.
 */

use super::types::BlockSignature;

const ADLER_MOD: u32 = 65521;

/// Rolling checksum using the Adler-32 algorithm
///
/// A weak but fast checksum for quick block comparisons. The rolling
/// property allows sliding the window one byte at a time.
#[derive(Debug, Clone)]
pub struct RollingChecksum {
    a: u32,
    b: u32,
    window_size: usize,
}

impl RollingChecksum {
    /// Create an empty rolling checksum
    pub fn new(window_size: usize) -> Self {
        Self {
            a: 1,
            b: 0,
            window_size,
        }
    }

    /// Initialize the checksum from a block of data
    pub fn from_data(data: &[u8]) -> Self {
        let mut checksum = Self::new(data.len());
        checksum.reset(data);
        checksum
    }

    /// Reset the checksum with new data
    pub fn reset(&mut self, data: &[u8]) {
        self.a = 1;
        self.b = 0;

        for &byte in data {
            self.a = (self.a + byte as u32) % ADLER_MOD;
            self.b = (self.b + self.a) % ADLER_MOD;
        }

        self.window_size = data.len();
    }

    /// Slide the window: drop `old_byte`, append `new_byte`
    pub fn roll(&mut self, old_byte: u8, new_byte: u8) {
        self.a = (self.a + ADLER_MOD - old_byte as u32) % ADLER_MOD;
        // The outgoing byte counted once per window position, plus the
        // leading +1 of every partial sum.
        let outgoing = (self.window_size as u32 % ADLER_MOD) * old_byte as u32 % ADLER_MOD;
        self.b = (self.b + 2 * ADLER_MOD - 1 - outgoing) % ADLER_MOD;

        self.a = (self.a + new_byte as u32) % ADLER_MOD;
        self.b = (self.b + self.a) % ADLER_MOD;
    }

    /// Current checksum value
    pub fn checksum(&self) -> u32 {
        (self.b << 16) | self.a
    }
}

/// BLAKE3 hash of a block
pub fn calculate_strong_hash(data: &[u8]) -> [u8; 32] {
    *blake3::hash(data).as_bytes()
}

/// Split `data` into `block_size` blocks and sign each one
pub fn generate_signatures(data: &[u8], block_size: usize) -> Vec<BlockSignature> {
    if block_size == 0 {
        return Vec::new();
    }

    data.chunks(block_size)
        .enumerate()
        .map(|(index, block)| BlockSignature {
            index: index as u64,
            offset: (index * block_size) as u64,
            length: block.len(),
            weak_hash: RollingChecksum::from_data(block).checksum(),
            strong_hash: calculate_strong_hash(block),
        })
        .collect()
}
