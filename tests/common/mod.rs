// Mon Oct 19 2026 - Alex

#![allow(dead_code)]

use jit_pattern_scanner::{Pattern, SkipTable};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn exact(bytes: &[u8]) -> Pattern {
    Pattern::new(bytes.to_vec(), vec![0xFF; bytes.len()], bytes.len()).unwrap()
}

/// Trimmed size: everything up to the last non-wildcard byte.
pub fn masked(bytes: &[u8], masks: &[u8]) -> Pattern {
    let trimmed = masks.iter().rposition(|&m| m != 0).map_or(0, |i| i + 1);
    Pattern::new(bytes.to_vec(), masks.to_vec(), trimmed).unwrap()
}

/// Horspool table probing the last compared byte, which must be exact.
pub fn with_horspool(pattern: Pattern) -> Pattern {
    let n = pattern.trimmed_size();
    let mut entries = [n; 256];

    for i in 0..n - 1 {
        let (byte, mask) = (pattern.bytes()[i], pattern.masks()[i]);
        for c in 0..=255u8 {
            if c & mask == byte {
                entries[c as usize] = n - 1 - i;
            }
        }
    }

    pattern.with_skip_table(SkipTable::new(entries), n - 1).unwrap()
}

pub fn naive_find(pattern: &Pattern, data: &[u8]) -> Option<usize> {
    if data.len() < pattern.full_size() {
        return None;
    }
    (0..=data.len() - pattern.full_size()).find(|&i| pattern.matches(&data[i..]))
}

/// Small xorshift so buffers are reproducible without extra crates.
pub struct Bytes(u64);

impl Bytes {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u8(&mut self) -> u8 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        (self.0 >> 24) as u8
    }

    /// Bytes drawn from a small alphabet so partial matches are common.
    pub fn buffer(&mut self, len: usize, alphabet: &[u8]) -> Vec<u8> {
        (0..len)
            .map(|_| alphabet[self.next_u8() as usize % alphabet.len()])
            .collect()
    }
}
