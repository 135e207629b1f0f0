pub const DEFLATE_BLOCKTYPE_UNCOMPRESSED: u8 = 0;
pub const DEFLATE_BLOCKTYPE_STATIC_HUFFMAN: u8 = 1;
pub const DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN: u8 = 2;

pub const DEFLATE_MIN_MATCH_LEN: usize = 3;
pub const DEFLATE_MAX_MATCH_LEN: usize = 258;

pub const DEFLATE_MAX_MATCH_OFFSET: usize = 32768;

/// Bytes of look-ahead the matcher keeps so a full-length match never runs
/// past the filled part of the window.
pub const MIN_LOOKAHEAD: usize = DEFLATE_MAX_MATCH_LEN + DEFLATE_MIN_MATCH_LEN + 1;

pub const DEFLATE_NUM_LITERALS: usize = 256;
pub const DEFLATE_END_OF_BLOCK: usize = 256;
pub const DEFLATE_FIRST_LEN_SYM: usize = 257;

/// Length codes, not counting the two reserved symbols 286/287.
pub const DEFLATE_NUM_LENGTH_CODES: usize = 29;
/// Literal/length symbols that may carry a non-zero frequency.
pub const DEFLATE_NUM_LITLEN_CODES: usize =
    DEFLATE_NUM_LITERALS + 1 + DEFLATE_NUM_LENGTH_CODES;
/// Full fixed-code alphabet, including the two reserved symbols.
pub const DEFLATE_NUM_LITLEN_SYMS: usize = 288;
pub const DEFLATE_NUM_OFFSET_CODES: usize = 30;
pub const DEFLATE_NUM_OFFSET_SYMS: usize = 32;
pub const DEFLATE_NUM_PRECODE_SYMS: usize = 19;

pub const DEFLATE_MAX_PRE_CODEWORD_LEN: usize = 7;
pub const DEFLATE_MAX_LITLEN_CODEWORD_LEN: usize = 15;
pub const DEFLATE_MAX_OFFSET_CODEWORD_LEN: usize = 15;
pub const DEFLATE_MAX_CODEWORD_LEN: usize = 15;

pub const DEFLATE_MAX_STORED_LEN: usize = 0xFFFF;

pub const PRECODE_REP_3_6: usize = 16;
pub const PRECODE_REPZ_3_10: usize = 17;
pub const PRECODE_REPZ_11_138: usize = 18;

pub const DEFLATE_PRECODE_LENS_PERMUTATION: [usize; DEFLATE_NUM_PRECODE_SYMS] = [
    16, 17, 18, 0, 8, 7, 9, 6, 10, 5, 11, 4, 12, 3, 13, 2, 14, 1, 15,
];

pub const ZLIB_MIN_HEADER_SIZE: usize = 2;
pub const ZLIB_DICTID_SIZE: usize = 4;
pub const ZLIB_FOOTER_SIZE: usize = 4;
pub const ZLIB_MIN_OVERHEAD: usize = ZLIB_MIN_HEADER_SIZE + ZLIB_FOOTER_SIZE;

pub const ZLIB_CM_DEFLATE: u8 = 8;
pub const ZLIB_FDICT: u8 = 0x20;

pub const ZLIB_FASTEST_COMPRESSION: u8 = 0;
pub const ZLIB_SLOWEST_COMPRESSION: u8 = 3;

/// Bytes of a sync/full flush marker: the LEN/NLEN of an empty stored block.
pub const SYNC_MARKER: [u8; 4] = [0x00, 0x00, 0xFF, 0xFF];

pub const LENGTH_BASE: [u16; DEFLATE_NUM_LENGTH_CODES] = [
    3, 4, 5, 6, 7, 8, 9, 10, 11, 13, 15, 17, 19, 23, 27, 31, 35, 43, 51, 59, 67, 83, 99, 115, 131,
    163, 195, 227, 258,
];

pub const LENGTH_EXTRA_BITS: [u8; DEFLATE_NUM_LENGTH_CODES] = [
    0, 0, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 2, 2, 2, 2, 3, 3, 3, 3, 4, 4, 4, 4, 5, 5, 5, 5, 0,
];

pub const OFFSET_BASE: [u16; DEFLATE_NUM_OFFSET_CODES] = [
    1, 2, 3, 4, 5, 7, 9, 13, 17, 25, 33, 49, 65, 97, 129, 193, 257, 385, 513, 769, 1025, 1537,
    2049, 3073, 4097, 6145, 8193, 12289, 16385, 24577,
];

pub const OFFSET_EXTRA_BITS: [u8; DEFLATE_NUM_OFFSET_CODES] = [
    0, 0, 0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 12, 12, 13,
    13,
];

pub const PRECODE_EXTRA_BITS: [u8; DEFLATE_NUM_PRECODE_SYMS] =
    [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 2, 3, 7];

#[inline(always)]
pub fn bsr32(v: u32) -> u32 {
    31 - v.leading_zeros()
}

/// Length slot (0..29) for a match length in 3..=258.
#[inline]
pub fn length_slot(len: usize) -> usize {
    debug_assert!((DEFLATE_MIN_MATCH_LEN..=DEFLATE_MAX_MATCH_LEN).contains(&len));
    if len == DEFLATE_MAX_MATCH_LEN {
        return DEFLATE_NUM_LENGTH_CODES - 1;
    }
    let l = len - 3;
    if l < 8 {
        l
    } else {
        let b = bsr32(l as u32) as usize;
        ((b - 1) << 2) | ((l >> (b - 2)) & 3)
    }
}

/// Offset slot (0..30) for a match distance in 1..=32768.
#[inline]
pub fn offset_slot(offset: usize) -> usize {
    debug_assert!((1..=DEFLATE_MAX_MATCH_OFFSET).contains(&offset));
    let d = offset - 1;
    if d < 4 {
        d
    } else {
        let b = bsr32(d as u32) as usize;
        (b << 1) | ((d >> (b - 1)) & 1)
    }
}
