use super::bitstream::Bitstream;
use crate::common::*;
use crate::huffman::{gen_codewords, HuffmanBuilder};
use std::sync::OnceLock;
use tracing::debug;

/// Literal histogram class of the first block, as a hint to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    Binary,
    Text,
    #[default]
    Unknown,
}

struct StaticCodes {
    lit_lens: [u8; DEFLATE_NUM_LITLEN_SYMS],
    lit_codes: [u16; DEFLATE_NUM_LITLEN_SYMS],
    dist_lens: [u8; DEFLATE_NUM_OFFSET_CODES],
    dist_codes: [u16; DEFLATE_NUM_OFFSET_CODES],
}

fn static_codes() -> &'static StaticCodes {
    static CODES: OnceLock<StaticCodes> = OnceLock::new();
    CODES.get_or_init(|| {
        let mut c = StaticCodes {
            lit_lens: [0; DEFLATE_NUM_LITLEN_SYMS],
            lit_codes: [0; DEFLATE_NUM_LITLEN_SYMS],
            dist_lens: [5; DEFLATE_NUM_OFFSET_CODES],
            dist_codes: [0; DEFLATE_NUM_OFFSET_CODES],
        };
        c.lit_lens[..144].fill(8);
        c.lit_lens[144..256].fill(9);
        c.lit_lens[256..280].fill(7);
        c.lit_lens[280..].fill(8);
        gen_codewords(&c.lit_lens, &mut c.lit_codes);
        gen_codewords(&c.dist_lens, &mut c.dist_codes);
        c
    })
}

#[inline]
fn lit_extra_bits(sym: usize) -> u32 {
    if sym >= DEFLATE_FIRST_LEN_SYM {
        LENGTH_EXTRA_BITS[sym - DEFLATE_FIRST_LEN_SYM] as u32
    } else {
        0
    }
}

/// Symbol buffer, frequency statistics and tree emission for one block.
pub struct BlockEncoder {
    lit_freq: [u32; DEFLATE_NUM_LITLEN_CODES],
    dist_freq: [u32; DEFLATE_NUM_OFFSET_CODES],
    bl_freq: [u32; DEFLATE_NUM_PRECODE_SYMS],

    lit_lens: [u8; DEFLATE_NUM_LITLEN_CODES],
    lit_codes: [u16; DEFLATE_NUM_LITLEN_CODES],
    dist_lens: [u8; DEFLATE_NUM_OFFSET_CODES],
    dist_codes: [u16; DEFLATE_NUM_OFFSET_CODES],
    bl_lens: [u8; DEFLATE_NUM_PRECODE_SYMS],
    bl_codes: [u16; DEFLATE_NUM_PRECODE_SYMS],

    builder: HuffmanBuilder,

    /// Match distance, or 0 for a literal.
    sym_dist: Vec<u16>,
    /// Literal byte, or match length minus 3.
    sym_lc: Vec<u8>,
    lit_bufsize: usize,
    last_lit: usize,
    matches: usize,

    /// Bit length of the last end-of-block code sent, for partial flushes.
    last_eob_len: u32,
    data_type: DataType,
}

impl BlockEncoder {
    pub fn new(lit_bufsize: usize) -> crate::error::Result<Self> {
        let mut enc = Self {
            lit_freq: [0; DEFLATE_NUM_LITLEN_CODES],
            dist_freq: [0; DEFLATE_NUM_OFFSET_CODES],
            bl_freq: [0; DEFLATE_NUM_PRECODE_SYMS],
            lit_lens: [0; DEFLATE_NUM_LITLEN_CODES],
            lit_codes: [0; DEFLATE_NUM_LITLEN_CODES],
            dist_lens: [0; DEFLATE_NUM_OFFSET_CODES],
            dist_codes: [0; DEFLATE_NUM_OFFSET_CODES],
            bl_lens: [0; DEFLATE_NUM_PRECODE_SYMS],
            bl_codes: [0; DEFLATE_NUM_PRECODE_SYMS],
            builder: HuffmanBuilder::new(),
            sym_dist: super::alloc_zeroed(lit_bufsize)?,
            sym_lc: super::alloc_zeroed(lit_bufsize)?,
            lit_bufsize,
            last_lit: 0,
            matches: 0,
            last_eob_len: 8,
            data_type: DataType::Unknown,
        };
        enc.init_block();
        Ok(enc)
    }

    pub fn reset(&mut self) {
        self.last_eob_len = 8;
        self.data_type = DataType::Unknown;
        self.init_block();
    }

    fn init_block(&mut self) {
        self.lit_freq.fill(0);
        self.dist_freq.fill(0);
        self.bl_freq.fill(0);
        self.lit_freq[DEFLATE_END_OF_BLOCK] = 1;
        self.last_lit = 0;
        self.matches = 0;
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }

    #[inline(always)]
    pub fn tally_literal(&mut self, c: u8) {
        self.sym_dist[self.last_lit] = 0;
        self.sym_lc[self.last_lit] = c;
        self.last_lit += 1;
        self.lit_freq[c as usize] += 1;
    }

    #[inline(always)]
    pub fn tally_match(&mut self, dist: usize, len: usize) {
        debug_assert!((1..=DEFLATE_MAX_MATCH_OFFSET).contains(&dist));
        debug_assert!((DEFLATE_MIN_MATCH_LEN..=DEFLATE_MAX_MATCH_LEN).contains(&len));
        self.sym_dist[self.last_lit] = dist as u16;
        self.sym_lc[self.last_lit] = (len - DEFLATE_MIN_MATCH_LEN) as u8;
        self.last_lit += 1;
        self.matches += 1;
        self.lit_freq[DEFLATE_FIRST_LEN_SYM + length_slot(len)] += 1;
        self.dist_freq[offset_slot(dist)] += 1;
    }

    /// Whether the current block should be emitted now.
    ///
    /// Always true once the symbol buffer is full. With `estimate` set, every
    /// 8192 symbols the block is also cut short when matches are scarce and
    /// the estimated output is already under half of `in_length` bytes.
    pub fn block_full(&self, estimate: bool, in_length: usize) -> bool {
        if estimate && self.last_lit & 0x1FFF == 0 {
            let mut out_length = self.last_lit as u64 * 8;
            for (code, &f) in self.dist_freq.iter().enumerate() {
                out_length += f as u64 * (5 + OFFSET_EXTRA_BITS[code] as u64);
            }
            out_length >>= 3;
            if self.matches < self.last_lit / 2 && out_length < in_length as u64 / 2 {
                return true;
            }
        }
        self.last_lit == self.lit_bufsize - 1
    }

    fn detect_data_type(&mut self) {
        let bin: u32 = self.lit_freq[..7].iter().sum::<u32>() + self.lit_freq[128..256].iter().sum::<u32>();
        let ascii: u32 = self.lit_freq[7..128].iter().sum();
        self.data_type = if bin > ascii >> 2 {
            DataType::Binary
        } else {
            DataType::Text
        };
    }

    fn tree_cost(freqs: &[u32], lens: &[u8], extra: impl Fn(usize) -> u32) -> u64 {
        freqs
            .iter()
            .zip(lens)
            .enumerate()
            .map(|(n, (&f, &l))| f as u64 * (l as u32 + extra(n)) as u64)
            .sum()
    }

    /// Collects bit-length alphabet frequencies for one tree's run-length
    /// encoding.
    fn scan_tree(bl_freq: &mut [u32; DEFLATE_NUM_PRECODE_SYMS], lens: &[u8], max_code: usize) {
        walk_tree(lens, max_code, |op| match op {
            TreeOp::Lens(len, count) => bl_freq[len as usize] += count as u32,
            TreeOp::Repeat(_) => bl_freq[PRECODE_REP_3_6] += 1,
            TreeOp::ZerosShort(_) => bl_freq[PRECODE_REPZ_3_10] += 1,
            TreeOp::ZerosLong(_) => bl_freq[PRECODE_REPZ_11_138] += 1,
        });
    }

    fn send_tree(&self, out: &mut Bitstream, lens: &[u8], max_code: usize) {
        let send = |out: &mut Bitstream, sym: usize| {
            out.write_bits(self.bl_codes[sym] as u32, self.bl_lens[sym] as u32)
        };
        walk_tree(lens, max_code, |op| match op {
            TreeOp::Lens(len, count) => {
                for _ in 0..count {
                    send(out, len as usize);
                }
            }
            TreeOp::Repeat(count) => {
                send(out, PRECODE_REP_3_6);
                out.write_bits(count - 3, 2);
            }
            TreeOp::ZerosShort(count) => {
                send(out, PRECODE_REPZ_3_10);
                out.write_bits(count - 3, 3);
            }
            TreeOp::ZerosLong(count) => {
                send(out, PRECODE_REPZ_11_138);
                out.write_bits(count - 11, 7);
            }
        });
    }

    /// Builds the bit-length tree and returns the index, in transmission
    /// order, of the last bit-length code to send.
    fn build_bl_tree(&mut self, lit_max: usize, dist_max: usize) -> usize {
        Self::scan_tree(&mut self.bl_freq, &self.lit_lens, lit_max);
        Self::scan_tree(&mut self.bl_freq, &self.dist_lens, dist_max);
        self.builder.build(
            &self.bl_freq,
            DEFLATE_MAX_PRE_CODEWORD_LEN,
            &mut self.bl_lens,
            &mut self.bl_codes,
        );
        let mut max_blindex = DEFLATE_NUM_PRECODE_SYMS - 1;
        while max_blindex >= 3 && self.bl_lens[DEFLATE_PRECODE_LENS_PERMUTATION[max_blindex]] == 0 {
            max_blindex -= 1;
        }
        max_blindex
    }

    fn send_all_trees(&self, out: &mut Bitstream, lcodes: usize, dcodes: usize, blcodes: usize) {
        out.write_bits((lcodes - DEFLATE_FIRST_LEN_SYM) as u32, 5);
        out.write_bits((dcodes - 1) as u32, 5);
        out.write_bits((blcodes - 4) as u32, 4);
        for &sym in &DEFLATE_PRECODE_LENS_PERMUTATION[..blcodes] {
            out.write_bits(self.bl_lens[sym] as u32, 3);
        }
        self.send_tree(out, &self.lit_lens, lcodes - 1);
        self.send_tree(out, &self.dist_lens, dcodes - 1);
    }

    fn compress_block(
        &mut self,
        out: &mut Bitstream,
        lit_lens: &[u8],
        lit_codes: &[u16],
        dist_lens: &[u8],
        dist_codes: &[u16],
    ) {
        for i in 0..self.last_lit {
            let dist = self.sym_dist[i] as usize;
            let lc = self.sym_lc[i] as usize;
            if dist == 0 {
                out.write_bits(lit_codes[lc] as u32, lit_lens[lc] as u32);
                continue;
            }
            let len = lc + DEFLATE_MIN_MATCH_LEN;
            let slot = length_slot(len);
            let sym = DEFLATE_FIRST_LEN_SYM + slot;
            out.write_bits(lit_codes[sym] as u32, lit_lens[sym] as u32);
            let extra = LENGTH_EXTRA_BITS[slot] as u32;
            if extra != 0 {
                out.write_bits((len - LENGTH_BASE[slot] as usize) as u32, extra);
            }

            let slot = offset_slot(dist);
            out.write_bits(dist_codes[slot] as u32, dist_lens[slot] as u32);
            let extra = OFFSET_EXTRA_BITS[slot] as u32;
            if extra != 0 {
                out.write_bits((dist - OFFSET_BASE[slot] as usize) as u32, extra);
            }
        }
        out.write_bits(
            lit_codes[DEFLATE_END_OF_BLOCK] as u32,
            lit_lens[DEFLATE_END_OF_BLOCK] as u32,
        );
        self.last_eob_len = lit_lens[DEFLATE_END_OF_BLOCK] as u32;
    }

    /// Emits a stored block holding `data`.
    pub fn stored_block(&mut self, out: &mut Bitstream, data: &[u8], last: bool) {
        debug_assert!(data.len() <= DEFLATE_MAX_STORED_LEN);
        out.write_bits(((DEFLATE_BLOCKTYPE_UNCOMPRESSED as u32) << 1) | last as u32, 3);
        out.windup();
        self.last_eob_len = 8;
        let len = data.len() as u16;
        out.put_u16_le(len);
        out.put_u16_le(!len);
        out.put_bytes(data);
    }

    /// Sends an empty static block so the decoder can see everything up to
    /// here, repeating it if the decoder might still lack look-ahead bits.
    pub fn align(&mut self, out: &mut Bitstream) {
        let codes = static_codes();
        let empty_static = |out: &mut Bitstream| {
            out.write_bits((DEFLATE_BLOCKTYPE_STATIC_HUFFMAN as u32) << 1, 3);
            out.write_bits(
                codes.lit_codes[DEFLATE_END_OF_BLOCK] as u32,
                codes.lit_lens[DEFLATE_END_OF_BLOCK] as u32,
            );
            out.flush_bits();
        };
        empty_static(out);
        if 1 + self.last_eob_len + 10 < 9 + out.bits_pending() {
            empty_static(out);
        }
        self.last_eob_len = codes.lit_lens[DEFLATE_END_OF_BLOCK] as u32;
    }

    /// Emits the buffered symbols as the cheapest of a stored, static or
    /// dynamic block, then starts a new block.
    ///
    /// `window_data` is the uncompressed block if it is still in the window;
    /// `stored_len` is its length either way. Level 0 always stores when it can.
    pub fn flush_block(
        &mut self,
        out: &mut Bitstream,
        window_data: Option<&[u8]>,
        stored_len: usize,
        last: bool,
        level: u8,
    ) {
        let statics = static_codes();
        let mut max_blindex = 0;
        let mut lit_max = 0;
        let mut dist_max = 0;
        let opt_lenb;
        let static_lenb;

        if level > 0 {
            if self.data_type == DataType::Unknown {
                self.detect_data_type();
            }

            lit_max = self.builder.build(
                &self.lit_freq,
                DEFLATE_MAX_LITLEN_CODEWORD_LEN,
                &mut self.lit_lens,
                &mut self.lit_codes,
            );
            dist_max = self.builder.build(
                &self.dist_freq,
                DEFLATE_MAX_OFFSET_CODEWORD_LEN,
                &mut self.dist_lens,
                &mut self.dist_codes,
            );
            max_blindex = self.build_bl_tree(lit_max, dist_max);

            let opt_len = Self::tree_cost(&self.lit_freq, &self.lit_lens, lit_extra_bits)
                + Self::tree_cost(&self.dist_freq, &self.dist_lens, |n| OFFSET_EXTRA_BITS[n] as u32)
                + Self::tree_cost(&self.bl_freq, &self.bl_lens, |n| PRECODE_EXTRA_BITS[n] as u32)
                + 3 * (max_blindex as u64 + 1)
                + 5
                + 5
                + 4;
            let static_len = Self::tree_cost(&self.lit_freq, &statics.lit_lens, lit_extra_bits)
                + Self::tree_cost(&self.dist_freq, &statics.dist_lens, |n| OFFSET_EXTRA_BITS[n] as u32);

            static_lenb = ((static_len + 3 + 7) >> 3) as usize;
            opt_lenb = (((opt_len + 3 + 7) >> 3) as usize).min(static_lenb);

            debug!(
                symbols = self.last_lit,
                stored_len,
                static_bytes = static_lenb,
                dynamic_bytes = (opt_len + 3 + 7) >> 3,
                "block costs"
            );
        } else {
            static_lenb = stored_len + 5;
            opt_lenb = static_lenb;
        }

        match window_data {
            Some(data) if stored_len + 4 <= opt_lenb => {
                debug!(len = stored_len, last, "stored block");
                self.stored_block(out, data, last);
            }
            _ if static_lenb == opt_lenb => {
                debug!(last, "static block");
                out.write_bits(((DEFLATE_BLOCKTYPE_STATIC_HUFFMAN as u32) << 1) | last as u32, 3);
                self.compress_block(
                    out,
                    &statics.lit_lens,
                    &statics.lit_codes,
                    &statics.dist_lens,
                    &statics.dist_codes,
                );
            }
            _ => {
                debug!(last, "dynamic block");
                out.write_bits(((DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN as u32) << 1) | last as u32, 3);
                self.send_all_trees(out, lit_max + 1, dist_max + 1, max_blindex + 1);
                let (ll, lc, dl, dc) = (self.lit_lens, self.lit_codes, self.dist_lens, self.dist_codes);
                self.compress_block(out, &ll, &lc, &dl, &dc);
            }
        }

        self.init_block();
        if last {
            out.windup();
        }
    }
}

enum TreeOp {
    /// `count` copies of a literal code length.
    Lens(u8, u32),
    /// Previous length repeated 3..=6 times.
    Repeat(u32),
    /// 3..=10 zeros.
    ZerosShort(u32),
    /// 11..=138 zeros.
    ZerosLong(u32),
}

/// Run-length encodes `lens[..=max_code]` into bit-length alphabet operations.
fn walk_tree(lens: &[u8], max_code: usize, mut emit: impl FnMut(TreeOp)) {
    const GUARD: i32 = -1;
    let len_at = |n: usize| if n <= max_code { lens[n] as i32 } else { GUARD };

    let mut prevlen: i32 = -1;
    let mut nextlen = len_at(0);
    let mut count = 0u32;
    let (mut max_count, mut min_count) = if nextlen == 0 { (138, 3) } else { (7, 4) };

    for n in 0..=max_code {
        let curlen = nextlen;
        nextlen = len_at(n + 1);
        count += 1;
        if count < max_count && curlen == nextlen {
            continue;
        } else if count < min_count {
            emit(TreeOp::Lens(curlen as u8, count));
        } else if curlen != 0 {
            if curlen != prevlen {
                emit(TreeOp::Lens(curlen as u8, 1));
                count -= 1;
            }
            emit(TreeOp::Repeat(count));
        } else if count <= 10 {
            emit(TreeOp::ZerosShort(count));
        } else {
            emit(TreeOp::ZerosLong(count));
        }

        count = 0;
        prevlen = curlen;
        (max_count, min_count) = if nextlen == 0 {
            (138, 3)
        } else if curlen == nextlen {
            (6, 3)
        } else {
            (7, 4)
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(lens: &[u8]) -> Vec<String> {
        let mut v = Vec::new();
        walk_tree(lens, lens.len() - 1, |op| {
            v.push(match op {
                TreeOp::Lens(l, c) => format!("L{}x{}", l, c),
                TreeOp::Repeat(c) => format!("R{}", c),
                TreeOp::ZerosShort(c) => format!("Z{}", c),
                TreeOp::ZerosLong(c) => format!("ZZ{}", c),
            })
        });
        v
    }

    #[test]
    fn run_length_encoding_of_code_lengths() {
        assert_eq!(ops(&[8, 8, 8, 8, 8, 8, 8, 8]), vec!["L8x1", "R6", "L8x1"]);
        assert_eq!(ops(&[0; 12]), vec!["ZZ12"]);
        assert_eq!(ops(&[5, 0, 0, 0, 5, 5]), vec!["L5x1", "Z3", "L5x2"]);
        assert_eq!(ops(&[0; 140]), vec!["ZZ138", "L0x2"]);
    }

    #[test]
    fn static_tables_match_rfc1951() {
        let s = static_codes();
        assert_eq!(s.lit_lens[0], 8);
        assert_eq!(s.lit_lens[255], 9);
        assert_eq!(s.lit_lens[256], 7);
        assert_eq!(s.lit_lens[287], 8);
        // End of block is the all-zero 7-bit code; literal 0 is 00110000.
        assert_eq!(s.lit_codes[256], 0);
        assert_eq!(s.lit_codes[0] as u32, crate::huffman::reverse_codeword(0b0011_0000, 8));
    }

    #[test]
    fn detects_text_and_binary() {
        let mut enc = BlockEncoder::new(1 << 14).unwrap();
        for &b in b"plain ascii text" {
            enc.tally_literal(b);
        }
        enc.detect_data_type();
        assert_eq!(enc.data_type(), DataType::Text);

        enc.reset();
        for b in 0..=255u8 {
            enc.tally_literal(b);
        }
        enc.detect_data_type();
        assert_eq!(enc.data_type(), DataType::Binary);
    }

    #[test]
    fn stored_block_framing() {
        let mut enc = BlockEncoder::new(1 << 7).unwrap();
        let mut out = Bitstream::new(64);
        enc.flush_block(&mut out, Some(b"abc"), 3, true, 0);
        let mut buf = vec![0u8; out.pending_len()];
        out.drain_into(&mut buf);
        assert_eq!(buf, vec![0x01, 0x03, 0x00, 0xFC, 0xFF, b'a', b'b', b'c']);
    }

    #[test]
    fn block_full_when_buffer_fills() {
        let mut enc = BlockEncoder::new(1 << 7).unwrap();
        for _ in 0..126 {
            enc.tally_literal(b'a');
        }
        assert!(!enc.block_full(false, 126));
        enc.tally_literal(b'a');
        assert!(enc.block_full(false, 127));
    }
}
