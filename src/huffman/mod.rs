//! Canonical Huffman codes shared by the encoder and the decoder.
//!
//! The encoder derives bit lengths from symbol frequencies ([`builder`]); both
//! sides then agree on codewords purely from those lengths: shorter codes sort
//! first, ties break by symbol value. Codewords are stored bit-reversed because
//! DEFLATE packs Huffman codes starting from their most significant bit into
//! an LSB-first bitstream.

pub mod builder;
pub mod table;

pub use self::builder::{make_huffman_code, HuffmanBuilder};
pub use self::table::{build_table, Code, TableError, TableKind};

use crate::common::DEFLATE_MAX_CODEWORD_LEN;

#[inline]
pub fn reverse_codeword(codeword: u32, len: u8) -> u32 {
    debug_assert!(len as usize <= 16 && len > 0);
    (codeword as u16).reverse_bits() as u32 >> (16 - len)
}

/// Per-length symbol counts of a bit-length array.
pub fn length_counts(lens: &[u8]) -> [u32; DEFLATE_MAX_CODEWORD_LEN + 1] {
    let mut counts = [0u32; DEFLATE_MAX_CODEWORD_LEN + 1];
    for &len in lens {
        counts[len as usize] += 1;
    }
    counts[0] = 0;
    counts
}

/// Assigns canonical, bit-reversed codewords to every symbol with a non-zero length.
pub fn gen_codewords(lens: &[u8], codewords: &mut [u16]) {
    let len_counts = length_counts(lens);
    let mut next_code = [0u32; DEFLATE_MAX_CODEWORD_LEN + 1];
    let mut code = 0u32;
    for len in 1..=DEFLATE_MAX_CODEWORD_LEN {
        code = (code + len_counts[len - 1]) << 1;
        next_code[len] = code;
    }
    for (sym, &len) in lens.iter().enumerate() {
        if len == 0 {
            continue;
        }
        let c = next_code[len as usize];
        next_code[len as usize] += 1;
        codewords[sym] = reverse_codeword(c, len) as u16;
    }
}
