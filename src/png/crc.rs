//! CRC-32 as used by PNG chunk trailers (reflected polynomial `0xEDB88320`).
//!
//! The lookup table is built once, on first use, and is read-only after that.

use std::sync::LazyLock;

static CRC_TABLE: LazyLock<[u32; 256]> = LazyLock::new(|| {
    let mut table = [0u32; 256];
    for (n, entry) in table.iter_mut().enumerate() {
        let mut c = n as u32;
        for _ in 0..8 {
            c = if (c & 1) != 0 {
                0xEDB8_8320 ^ (c >> 1)
            } else {
                c >> 1
            };
        }
        *entry = c;
    }
    table
});

/// Running CRC over several slices, e.g. a chunk's type followed by its data.
#[derive(Debug, Clone, Copy)]
pub struct Crc32 {
    crc: u32,
}

impl Crc32 {
    pub fn new() -> Self {
        Self { crc: u32::MAX }
    }

    #[inline]
    pub fn update(&mut self, bytes: &[u8]) {
        let table = &*CRC_TABLE;
        for &byte in bytes {
            let i = ((self.crc ^ u32::from(byte)) & 0xFF) as usize;
            self.crc = table[i] ^ (self.crc >> 8);
        }
    }

    pub fn finalize(self) -> u32 {
        self.crc ^ u32::MAX
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-32 of `bytes`.
pub fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = Crc32::new();
    crc.update(bytes);
    crc.finalize()
}
