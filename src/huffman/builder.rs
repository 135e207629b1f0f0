use super::gen_codewords;
use crate::common::*;

const MAX_SYMS: usize = DEFLATE_NUM_LITLEN_SYMS;
const HEAP_SIZE: usize = 2 * MAX_SYMS + 1;

/// Scratch state for building length-limited Huffman codes.
///
/// Leaves are symbols `0..n`; internal nodes are numbered from `n` upward. The
/// heap is 1-based; merged nodes are parked at its top end so that after the
/// merge loop `heap[heap_max..]` lists all nodes from the root downward.
pub struct HuffmanBuilder {
    freq: [u32; HEAP_SIZE],
    dad: [u16; HEAP_SIZE],
    len: [u8; HEAP_SIZE],
    depth: [u8; HEAP_SIZE],
    heap: [u16; HEAP_SIZE],
    heap_len: usize,
    heap_max: usize,
    bl_count: [u32; DEFLATE_MAX_CODEWORD_LEN + 1],
}

impl Default for HuffmanBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HuffmanBuilder {
    pub fn new() -> Self {
        Self {
            freq: [0; HEAP_SIZE],
            dad: [0; HEAP_SIZE],
            len: [0; HEAP_SIZE],
            depth: [0; HEAP_SIZE],
            heap: [0; HEAP_SIZE],
            heap_len: 0,
            heap_max: HEAP_SIZE,
            bl_count: [0; DEFLATE_MAX_CODEWORD_LEN + 1],
        }
    }

    /// Builds an optimal code for `freqs` with no codeword longer than
    /// `max_bits`, writing lengths and bit-reversed canonical codewords.
    ///
    /// At least two symbols always receive a code, so that the result is a
    /// complete prefix code even for zero or one used symbols. Returns the
    /// largest symbol with a non-zero length.
    pub fn build(
        &mut self,
        freqs: &[u32],
        max_bits: usize,
        lens: &mut [u8],
        codewords: &mut [u16],
    ) -> usize {
        let elems = freqs.len();
        debug_assert!(elems <= MAX_SYMS && max_bits <= DEFLATE_MAX_CODEWORD_LEN);

        self.heap_len = 0;
        self.heap_max = 2 * elems + 1;
        let mut max_code: isize = -1;

        for (sym, &f) in freqs.iter().enumerate() {
            self.freq[sym] = f;
            self.depth[sym] = 0;
            self.len[sym] = 0;
            if f != 0 {
                self.heap_len += 1;
                self.heap[self.heap_len] = sym as u16;
                max_code = sym as isize;
            }
        }

        while self.heap_len < 2 {
            let node = if max_code < 2 {
                max_code += 1;
                max_code as usize
            } else {
                0
            };
            self.heap_len += 1;
            self.heap[self.heap_len] = node as u16;
            self.freq[node] = 1;
            self.depth[node] = 0;
        }
        let max_code = max_code as usize;

        for k in (1..=self.heap_len / 2).rev() {
            self.pqdownheap(k);
        }

        let mut node = elems;
        loop {
            let n = self.pqremove();
            let m = self.heap[1] as usize;

            self.heap_max -= 1;
            self.heap[self.heap_max] = n as u16;
            self.heap_max -= 1;
            self.heap[self.heap_max] = m as u16;

            self.freq[node] = self.freq[n] + self.freq[m];
            self.depth[node] = self.depth[n].max(self.depth[m]) + 1;
            self.dad[n] = node as u16;
            self.dad[m] = node as u16;

            self.heap[1] = node as u16;
            node += 1;
            self.pqdownheap(1);

            if self.heap_len < 2 {
                break;
            }
        }
        self.heap_max -= 1;
        self.heap[self.heap_max] = self.heap[1];

        self.gen_bitlen(elems, max_code, max_bits);

        lens[..elems].copy_from_slice(&self.len[..elems]);
        gen_codewords(&lens[..elems], codewords);
        max_code
    }

    #[inline]
    fn smaller(&self, n: usize, m: usize) -> bool {
        self.freq[n] < self.freq[m] || (self.freq[n] == self.freq[m] && self.depth[n] <= self.depth[m])
    }

    fn pqdownheap(&mut self, mut k: usize) {
        let v = self.heap[k] as usize;
        let mut j = k << 1;
        while j <= self.heap_len {
            if j < self.heap_len && self.smaller(self.heap[j + 1] as usize, self.heap[j] as usize) {
                j += 1;
            }
            if self.smaller(v, self.heap[j] as usize) {
                break;
            }
            self.heap[k] = self.heap[j];
            k = j;
            j <<= 1;
        }
        self.heap[k] = v as u16;
    }

    fn pqremove(&mut self) -> usize {
        let top = self.heap[1] as usize;
        self.heap[1] = self.heap[self.heap_len];
        self.heap_len -= 1;
        self.pqdownheap(1);
        top
    }

    /// Derives leaf depths from the parent links, clamping to `max_bits` and
    /// then repairing the per-length counts so that the code stays complete.
    fn gen_bitlen(&mut self, elems: usize, max_code: usize, max_bits: usize) {
        let heap_size = 2 * elems + 1;
        self.bl_count = [0; DEFLATE_MAX_CODEWORD_LEN + 1];

        let root = self.heap[self.heap_max] as usize;
        self.len[root] = 0;

        let mut overflow = 0i32;
        for h in self.heap_max + 1..heap_size {
            let n = self.heap[h] as usize;
            let mut bits = self.len[self.dad[n] as usize] as usize + 1;
            if bits > max_bits {
                bits = max_bits;
                overflow += 1;
            }
            self.len[n] = bits as u8;
            if n > max_code {
                continue;
            }
            self.bl_count[bits] += 1;
        }
        if overflow == 0 {
            return;
        }

        // Move one leaf from the deepest non-empty level above the limit down a
        // level; its new sibling is a leaf taken from the overflowing level.
        while overflow > 0 {
            let mut bits = max_bits - 1;
            while self.bl_count[bits] == 0 {
                bits -= 1;
            }
            self.bl_count[bits] -= 1;
            self.bl_count[bits + 1] += 2;
            self.bl_count[max_bits] -= 1;
            overflow -= 2;
        }

        // Hand out the corrected lengths, longest first, to leaves in order of
        // increasing frequency.
        let mut h = heap_size;
        for bits in (1..=max_bits).rev() {
            let mut n = self.bl_count[bits];
            while n != 0 {
                h -= 1;
                let m = self.heap[h] as usize;
                if m > max_code {
                    continue;
                }
                self.len[m] = bits as u8;
                n -= 1;
            }
        }
    }
}

/// One-shot convenience over a fresh [`HuffmanBuilder`].
pub fn make_huffman_code(
    max_codeword_len: usize,
    freqs: &[u32],
    lens: &mut [u8],
    codewords: &mut [u16],
) -> usize {
    let mut builder = HuffmanBuilder::new();
    builder.build(freqs, max_codeword_len, lens, codewords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kraft_sum(lens: &[u8], max_bits: usize) -> u64 {
        lens.iter()
            .filter(|&&l| l != 0)
            .map(|&l| 1u64 << (max_bits - l as usize))
            .sum()
    }

    #[test]
    fn two_symbols() {
        let freqs = [5u32, 0, 9];
        let mut lens = [0u8; 3];
        let mut codes = [0u16; 3];
        let max_code = make_huffman_code(15, &freqs, &mut lens, &mut codes);
        assert_eq!(max_code, 2);
        assert_eq!(lens, [1, 0, 1]);
        assert_ne!(codes[0], codes[2]);
    }

    #[test]
    fn single_symbol_is_padded() {
        let mut freqs = [0u32; 30];
        freqs[7] = 42;
        let mut lens = [0u8; 30];
        let mut codes = [0u16; 30];
        make_huffman_code(15, &freqs, &mut lens, &mut codes);
        assert_eq!(lens[7], 1);
        assert_eq!(lens[0], 1);
        assert_eq!(lens.iter().filter(|&&l| l != 0).count(), 2);

        let freqs = [0u32; 30];
        make_huffman_code(15, &freqs, &mut lens, &mut codes);
        assert_eq!(&lens[..2], &[1, 1]);
    }

    #[test]
    fn lengths_are_limited_and_complete() {
        // Fibonacci frequencies produce the deepest possible unrestricted tree.
        let mut freqs = [0u32; 19];
        let (mut a, mut b) = (1u32, 1u32);
        for f in freqs.iter_mut() {
            *f = a;
            let next = a + b;
            a = b;
            b = next;
        }
        let mut lens = [0u8; 19];
        let mut codes = [0u16; 19];
        make_huffman_code(DEFLATE_MAX_PRE_CODEWORD_LEN, &freqs, &mut lens, &mut codes);
        assert!(lens.iter().all(|&l| l >= 1 && l as usize <= DEFLATE_MAX_PRE_CODEWORD_LEN));
        assert_eq!(kraft_sum(&lens, 7), 1 << 7);
    }

    #[test]
    fn frequent_symbols_get_shorter_codes() {
        let mut freqs = [1u32; DEFLATE_NUM_LITLEN_CODES];
        freqs[b'e' as usize] = 10_000;
        freqs[b't' as usize] = 5_000;
        let mut lens = [0u8; DEFLATE_NUM_LITLEN_CODES];
        let mut codes = [0u16; DEFLATE_NUM_LITLEN_CODES];
        make_huffman_code(15, &freqs, &mut lens, &mut codes);
        assert!(lens[b'e' as usize] <= lens[b't' as usize]);
        assert!(lens[b't' as usize] < lens[b'a' as usize]);
        assert_eq!(kraft_sum(&lens, 15), 1 << 15);
    }
}
