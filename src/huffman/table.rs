//! Two-level lookup tables for decoding canonical Huffman codes.
//!
//! A table starts with `1 << root_bits` entries indexed by the next
//! `root_bits` input bits (LSB first). Codes longer than the root are reached
//! through a link entry pointing at a sub-table further along the same vector.

use crate::common::*;

pub const OP_LITERAL: u8 = 0;
/// `OP_BASE | extra_bits`: `val` is a length or distance base.
pub const OP_BASE: u8 = 16;
pub const OP_END_OF_BLOCK: u8 = 32;
pub const OP_INVALID: u8 = 64;

/// One decoding table entry.
///
/// `op` is one of the `OP_*` values, or `1..=15` for a sub-table link whose
/// size is `1 << op` entries starting at index `val`. `bits` is the number of
/// input bits consumed by this entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Code {
    pub op: u8,
    pub bits: u8,
    pub val: u16,
}

impl Code {
    #[inline(always)]
    pub fn is_link(self) -> bool {
        self.op != 0 && self.op & 0xF0 == 0
    }
}

const INVALID_ENTRY: Code = Code {
    op: OP_INVALID,
    bits: 0,
    val: 0,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableKind {
    /// The 19-symbol code-length alphabet; every symbol decodes as a literal.
    Codes,
    Lens,
    Dists,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    OverSubscribed,
    Incomplete,
}

const LENS_EXTRA: [u8; 31] = {
    let mut t = [OP_INVALID; 31];
    let mut i = 0;
    while i < DEFLATE_NUM_LENGTH_CODES {
        t[i] = OP_BASE | LENGTH_EXTRA_BITS[i];
        i += 1;
    }
    t
};

const LENS_BASE: [u16; 31] = {
    let mut t = [0u16; 31];
    let mut i = 0;
    while i < DEFLATE_NUM_LENGTH_CODES {
        t[i] = LENGTH_BASE[i];
        i += 1;
    }
    t
};

const DISTS_EXTRA: [u8; DEFLATE_NUM_OFFSET_SYMS] = {
    let mut t = [OP_INVALID; DEFLATE_NUM_OFFSET_SYMS];
    let mut i = 0;
    while i < DEFLATE_NUM_OFFSET_CODES {
        t[i] = OP_BASE | OFFSET_EXTRA_BITS[i];
        i += 1;
    }
    t
};

const DISTS_BASE: [u16; DEFLATE_NUM_OFFSET_SYMS] = {
    let mut t = [0u16; DEFLATE_NUM_OFFSET_SYMS];
    let mut i = 0;
    while i < DEFLATE_NUM_OFFSET_CODES {
        t[i] = OFFSET_BASE[i];
        i += 1;
    }
    t
};

fn entry_for(kind: TableKind, sym: usize, bits: u8) -> Code {
    let (op, val) = match kind {
        TableKind::Codes => (OP_LITERAL, sym as u16),
        TableKind::Lens if sym < DEFLATE_END_OF_BLOCK => (OP_LITERAL, sym as u16),
        TableKind::Lens if sym == DEFLATE_END_OF_BLOCK => (OP_END_OF_BLOCK, 0),
        TableKind::Lens => {
            let i = sym - DEFLATE_FIRST_LEN_SYM;
            (LENS_EXTRA[i], LENS_BASE[i])
        }
        TableKind::Dists => (DISTS_EXTRA[sym], DISTS_BASE[sym]),
    };
    Code { op, bits, val }
}

/// Builds the decoding table for `lens` into `table` and returns the root
/// index width actually used.
///
/// Over-subscribed length sets are rejected. Incomplete sets are rejected too,
/// except for a single one-bit code in a length or distance table; the
/// unused codeword then decodes as invalid. An all-zero length set yields a
/// table in which every entry is invalid.
pub fn build_table(
    kind: TableKind,
    lens: &[u8],
    root_bits: usize,
    table: &mut Vec<Code>,
) -> Result<usize, TableError> {
    let mut count = [0u16; DEFLATE_MAX_CODEWORD_LEN + 1];
    for &len in lens {
        count[len as usize] += 1;
    }

    let mut max = DEFLATE_MAX_CODEWORD_LEN;
    while max >= 1 && count[max] == 0 {
        max -= 1;
    }
    let mut root = root_bits.min(max);

    table.clear();
    if max == 0 {
        let here = Code {
            op: OP_INVALID,
            bits: 1,
            val: 0,
        };
        table.push(here);
        table.push(here);
        return Ok(1);
    }

    let mut min = 1;
    while min < max && count[min] == 0 {
        min += 1;
    }
    root = root.max(min);

    let mut left: i32 = 1;
    for &c in &count[1..] {
        left <<= 1;
        left -= c as i32;
        if left < 0 {
            return Err(TableError::OverSubscribed);
        }
    }
    if left > 0 && (kind == TableKind::Codes || max != 1) {
        return Err(TableError::Incomplete);
    }

    // Symbols sorted by code length, then by value.
    let mut offs = [0u16; DEFLATE_MAX_CODEWORD_LEN + 2];
    for len in 1..=DEFLATE_MAX_CODEWORD_LEN {
        offs[len + 1] = offs[len] + count[len];
    }
    let mut work = vec![0u16; lens.len()];
    for (sym, &len) in lens.iter().enumerate() {
        if len != 0 {
            work[offs[len as usize] as usize] = sym as u16;
            offs[len as usize] += 1;
        }
    }

    let mut huff: usize = 0;
    let mut sym = 0usize;
    let mut len = min;
    let mut next = 0usize;
    let mut curr = root;
    let mut drop = 0usize;
    let mut low = usize::MAX;
    let mask = (1usize << root) - 1;

    table.resize(1 << root, INVALID_ENTRY);

    loop {
        let here = entry_for(kind, work[sym] as usize, (len - drop) as u8);

        // Replicate across every index whose low bits match this codeword.
        let incr = 1usize << (len - drop);
        let mut fill = 1usize << curr;
        let sub_size = fill;
        loop {
            fill -= incr;
            table[next + (huff >> drop) + fill] = here;
            if fill == 0 {
                break;
            }
        }

        // Bit-reversed increment of the codeword.
        let mut incr = 1usize << (len - 1);
        while huff & incr != 0 {
            incr >>= 1;
        }
        if incr != 0 {
            huff &= incr - 1;
            huff += incr;
        } else {
            huff = 0;
        }

        sym += 1;
        count[len] -= 1;
        if count[len] == 0 {
            if len == max {
                break;
            }
            len = lens[work[sym] as usize] as usize;
        }

        if len > root && (huff & mask) != low {
            if drop == 0 {
                drop = root;
            }
            next += sub_size;

            // Size the sub-table to hold every code sharing this root prefix.
            curr = len - drop;
            let mut left: i32 = 1 << curr;
            while curr + drop < max {
                left -= count[curr + drop] as i32;
                if left <= 0 {
                    break;
                }
                curr += 1;
                left <<= 1;
            }

            table.resize(next + (1 << curr), INVALID_ENTRY);
            low = huff & mask;
            table[low] = Code {
                op: curr as u8,
                bits: root as u8,
                val: next as u16,
            };
        }
    }

    if huff != 0 {
        table[next + huff] = Code {
            op: OP_INVALID,
            bits: (len - drop) as u8,
            val: 0,
        };
    }

    Ok(root)
}
