use std::cmp::min;

const DIVISOR: u32 = 65521;
/// Largest n such that 255n(n+1)/2 + (n+1)(DIVISOR-1) fits in a u32.
const MAX_CHUNK_LEN: usize = 5552;

pub const ADLER32_INIT: u32 = 1;

#[inline]
fn adler32_chunk(s1: &mut u32, s2: &mut u32, mut p: &[u8]) {
    let mut s1_local = *s1;
    let mut s2_local = *s2;

    let mut chunks = p.chunks_exact(8);
    for chunk in chunks.by_ref() {
        let b0 = chunk[0] as u32;
        let b1 = chunk[1] as u32;
        let b2 = chunk[2] as u32;
        let b3 = chunk[3] as u32;
        let b4 = chunk[4] as u32;
        let b5 = chunk[5] as u32;
        let b6 = chunk[6] as u32;
        let b7 = chunk[7] as u32;

        s2_local += (s1_local << 3)
            + (b0 * 8)
            + (b1 * 7)
            + (b2 * 6)
            + (b3 * 5)
            + (b4 * 4)
            + (b5 * 3)
            + (b6 * 2)
            + b7;
        s1_local += b0 + b1 + b2 + b3 + b4 + b5 + b6 + b7;
    }
    p = chunks.remainder();

    for &b in p {
        s1_local += b as u32;
        s2_local += s1_local;
    }

    *s1 = s1_local % DIVISOR;
    *s2 = s2_local % DIVISOR;
}

/// Continues an Adler-32 checksum over `buffer`. Start from [`ADLER32_INIT`].
pub fn adler32(adler: u32, mut buffer: &[u8]) -> u32 {
    let mut s1 = adler & 0xFFFF;
    let mut s2 = adler >> 16;

    while !buffer.is_empty() {
        let n = min(buffer.len(), MAX_CHUNK_LEN);
        let (chunk, rest) = buffer.split_at(n);
        buffer = rest;
        adler32_chunk(&mut s1, &mut s2, chunk);
    }

    (s2 << 16) | s1
}

/// Folds `buffer[offset..offset + length]` into `acc`.
pub fn update(acc: u32, buffer: &[u8], offset: usize, length: usize) -> u32 {
    adler32(acc, &buffer[offset..offset + length])
}

/// Incremental Adler-32 accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adler32 {
    value: u32,
}

impl Default for Adler32 {
    fn default() -> Self {
        Self::new()
    }
}

impl Adler32 {
    pub fn new() -> Self {
        Self {
            value: ADLER32_INIT,
        }
    }

    pub fn from_checksum(value: u32) -> Self {
        Self { value }
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.value = adler32(self.value, bytes);
    }

    pub fn finish(&self) -> u32 {
        self.value
    }

    pub fn reset(&mut self) {
        self.value = ADLER32_INIT;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(data: &[u8]) -> u32 {
        let (mut a, mut b) = (1u32, 0u32);
        for &byte in data {
            a = (a + byte as u32) % DIVISOR;
            b = (b + a) % DIVISOR;
        }
        (b << 16) | a
    }

    #[test]
    fn known_vectors() {
        assert_eq!(adler32(ADLER32_INIT, &[]), 1);
        assert_eq!(adler32(ADLER32_INIT, b"a"), 0x0062_0062);
        assert_eq!(adler32(ADLER32_INIT, b"abc"), 0x024d_0127);
        assert_eq!(adler32(ADLER32_INIT, b"Wikipedia"), 0x11E6_0398);
    }

    #[test]
    fn chunked_matches_whole() {
        let data: Vec<u8> = (0..20_000u32).map(|i| (i * 7 + i / 13) as u8).collect();
        let whole = adler32(ADLER32_INIT, &data);
        assert_eq!(whole, reference(&data));

        for split in [1usize, 3, 7, 5552, 5553, 11_000] {
            let mut acc = Adler32::new();
            for chunk in data.chunks(split) {
                acc.write(chunk);
            }
            assert_eq!(acc.finish(), whole, "split {}", split);
        }
    }

    #[test]
    fn update_with_offset() {
        let data = b"xxHello, World!yy";
        assert_eq!(update(ADLER32_INIT, data, 2, 13), adler32(1, b"Hello, World!"));
        assert_eq!(update(ADLER32_INIT, data, 0, 0), 1);
    }

    #[test]
    fn all_ones_does_not_overflow() {
        let data = vec![0xFF; 100_000];
        assert_eq!(adler32(ADLER32_INIT, &data), reference(&data));
    }
}
