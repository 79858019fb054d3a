//! Reversible character shift applied to unreadable resources.
//!
//! This is obfuscation, not encryption. Anyone with the crate can reverse it;
//! it only keeps casual readers from editing a file by hand.
//!
//! The key is the sum of the passphrase's code points. Outbound adds the key to
//! every character, inbound subtracts it. Arithmetic happens in the Unicode
//! scalar space with the surrogate gap removed, so every shifted character is
//! still a valid `char` and the file stays UTF-8. For characters below
//! `U+D800 - key` this is exactly `code point + key`.

/// Passphrase every loader derives its key from.
pub const PASSPHRASE: &str = "config loader";

const SURROGATE_START: u32 = 0xD800;
const SURROGATE_LEN: u32 = 0x800;
const SCALAR_SPACE: u32 = 0x11_0000 - SURROGATE_LEN;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scrambler {
    key: u32,
}

impl Scrambler {
    pub fn new(passphrase: &str) -> Self {
        let key = passphrase
            .chars()
            .fold(0u32, |acc, c| acc.wrapping_add(c as u32));
        Self {
            key: key % SCALAR_SPACE,
        }
    }

    pub fn key(&self) -> u32 {
        self.key
    }

    /// Encode text before it is written to disk.
    pub fn outbound(&self, plain: &str) -> String {
        plain
            .chars()
            .map(|c| from_index((to_index(c) + self.key) % SCALAR_SPACE))
            .collect()
    }

    /// Decode text read from disk.
    pub fn inbound(&self, encoded: &str) -> String {
        encoded
            .chars()
            .map(|c| from_index((to_index(c) + SCALAR_SPACE - self.key) % SCALAR_SPACE))
            .collect()
    }
}

impl Default for Scrambler {
    fn default() -> Self {
        Self::new(PASSPHRASE)
    }
}

fn to_index(c: char) -> u32 {
    let v = c as u32;
    if v >= SURROGATE_START {
        v - SURROGATE_LEN
    } else {
        v
    }
}

fn from_index(i: u32) -> char {
    let v = if i >= SURROGATE_START {
        i + SURROGATE_LEN
    } else {
        i
    };
    // `i < SCALAR_SPACE` keeps `v` outside the surrogate range and below 0x110000.
    char::from_u32(v).unwrap_or(char::REPLACEMENT_CHARACTER)
}
