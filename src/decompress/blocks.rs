//! Block framing: block headers, stored blocks and dynamic code tables.

use super::bits::BitBuf;
use super::codes::{Codes, CodesProgress};
use super::tables::{fixed_tables, CodeTables, DIST_ROOT_BITS, LITLEN_ROOT_BITS, PRECODE_ROOT_BITS};
use super::window::Window;
use crate::common::*;
use crate::error::{Error, Result};
use crate::huffman::{build_table, Code, TableError, TableKind};
use crate::stream::Io;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BlockState {
    /// Expecting a 3-bit block header.
    Type,
    /// Expecting a stored block's LEN and NLEN.
    Lens,
    Stored { left: usize },
    /// Expecting HLIT, HDIST and HCLEN.
    Table,
    /// Reading the code-length code lengths.
    BitTree,
    /// Reading literal/length and distance code lengths.
    DistTree,
    Codes,
    /// Last block decoded; draining the window.
    Dry,
    Done,
    Bad,
}

pub(crate) enum BlocksProgress {
    Pending,
    /// The final block is decoded and all output delivered.
    Finished,
}

pub(crate) struct Blocks {
    state: BlockState,
    last: bool,
    fixed: bool,

    /// Raw 14-bit HLIT/HDIST/HCLEN field of the current dynamic block.
    header: u32,
    index: usize,
    lens: [u8; DEFLATE_NUM_LITLEN_CODES + DEFLATE_NUM_OFFSET_CODES],
    precode_lens: [u8; DEFLATE_NUM_PRECODE_SYMS],

    precode: Vec<Code>,
    precode_bits: u32,
    lit: Vec<Code>,
    lit_bits: u32,
    dist: Vec<Code>,
    dist_bits: u32,

    codes: Codes,
}

fn num_lit(header: u32) -> usize {
    257 + (header & 0x1F) as usize
}

fn num_dist(header: u32) -> usize {
    1 + ((header >> 5) & 0x1F) as usize
}

fn num_precode(header: u32) -> usize {
    4 + (header >> 10) as usize
}

impl Blocks {
    pub fn new() -> Self {
        Self {
            state: BlockState::Type,
            last: false,
            fixed: false,
            header: 0,
            index: 0,
            lens: [0; DEFLATE_NUM_LITLEN_CODES + DEFLATE_NUM_OFFSET_CODES],
            precode_lens: [0; DEFLATE_NUM_PRECODE_SYMS],
            precode: Vec::new(),
            precode_bits: 0,
            lit: Vec::new(),
            lit_bits: 0,
            dist: Vec::new(),
            dist_bits: 0,
            codes: Codes::new(),
        }
    }

    pub fn reset(&mut self) {
        self.state = BlockState::Type;
        self.last = false;
        self.codes = Codes::new();
    }

    pub fn state(&self) -> BlockState {
        self.state
    }

    fn fail(&mut self, msg: &'static str) -> Error {
        self.state = BlockState::Bad;
        Error::Data(msg)
    }

    fn after_block(&self) -> BlockState {
        if self.last {
            BlockState::Dry
        } else {
            BlockState::Type
        }
    }

    /// Decodes as far as the buffers allow, then drains the window into the
    /// caller's output.
    pub fn run(
        &mut self,
        bits: &mut BitBuf,
        io: &mut Io<'_>,
        win: &mut Window,
        check: bool,
    ) -> Result<BlocksProgress> {
        let r = self.step(bits, io, win, check);
        win.flush(io, check);
        r
    }

    fn step(
        &mut self,
        bits: &mut BitBuf,
        io: &mut Io<'_>,
        win: &mut Window,
        check: bool,
    ) -> Result<BlocksProgress> {
        loop {
            match self.state {
                BlockState::Type => {
                    if !bits.need(io, 3) {
                        return Ok(BlocksProgress::Pending);
                    }
                    self.last = bits.take(1) == 1;
                    let btype = bits.take(2) as u8;
                    match btype {
                        DEFLATE_BLOCKTYPE_UNCOMPRESSED => {
                            bits.align();
                            self.state = BlockState::Lens;
                        }
                        DEFLATE_BLOCKTYPE_STATIC_HUFFMAN => {
                            self.fixed = true;
                            self.codes = Codes::new();
                            self.state = BlockState::Codes;
                        }
                        DEFLATE_BLOCKTYPE_DYNAMIC_HUFFMAN => {
                            self.state = BlockState::Table;
                        }
                        _ => return Err(self.fail("invalid block type")),
                    }
                    debug!(btype, last = self.last, "block header");
                }
                BlockState::Lens => {
                    if !bits.need(io, 32) {
                        return Ok(BlocksProgress::Pending);
                    }
                    let len = bits.take(16);
                    let nlen = bits.take(16);
                    if len != !nlen & 0xFFFF {
                        return Err(self.fail("invalid stored block lengths"));
                    }
                    self.state = if len == 0 {
                        self.after_block()
                    } else {
                        BlockState::Stored { left: len as usize }
                    };
                }
                BlockState::Stored { mut left } => {
                    // Whole bytes may still sit in the bit buffer after a resync.
                    while left > 0 && bits.count() >= 8 {
                        if !win.make_room(io, check) {
                            self.state = BlockState::Stored { left };
                            return Ok(BlocksProgress::Pending);
                        }
                        win.put(bits.take(8) as u8);
                        left -= 1;
                    }
                    while left > 0 {
                        if io.avail_in() == 0 || !win.make_room(io, check) {
                            self.state = BlockState::Stored { left };
                            return Ok(BlocksProgress::Pending);
                        }
                        left -= win.put_input(io, left);
                    }
                    self.state = self.after_block();
                }
                BlockState::Table => {
                    if !bits.need(io, 14) {
                        return Ok(BlocksProgress::Pending);
                    }
                    let header = bits.peek(14);
                    if (header & 0x1F) > 29 || ((header >> 5) & 0x1F) > 29 {
                        return Err(self.fail("too many length or distance symbols"));
                    }
                    bits.consume(14);
                    self.header = header;
                    self.index = 0;
                    self.state = BlockState::BitTree;
                }
                BlockState::BitTree => {
                    while self.index < num_precode(self.header) {
                        if !bits.need(io, 3) {
                            return Ok(BlocksProgress::Pending);
                        }
                        self.precode_lens[DEFLATE_PRECODE_LENS_PERMUTATION[self.index]] =
                            bits.take(3) as u8;
                        self.index += 1;
                    }
                    for &sym in &DEFLATE_PRECODE_LENS_PERMUTATION[self.index..] {
                        self.precode_lens[sym] = 0;
                    }
                    match build_table(
                        TableKind::Codes,
                        &self.precode_lens,
                        PRECODE_ROOT_BITS,
                        &mut self.precode,
                    ) {
                        Ok(root) => self.precode_bits = root as u32,
                        Err(TableError::OverSubscribed) => {
                            return Err(self.fail("oversubscribed dynamic bit lengths tree"))
                        }
                        Err(TableError::Incomplete) => {
                            return Err(self.fail("incomplete dynamic bit lengths tree"))
                        }
                    }
                    self.index = 0;
                    self.state = BlockState::DistTree;
                }
                BlockState::DistTree => {
                    if !self.read_code_lengths(bits, io)? {
                        return Ok(BlocksProgress::Pending);
                    }
                    self.build_dynamic_tables()?;
                    self.fixed = false;
                    self.codes = Codes::new();
                    self.state = BlockState::Codes;
                }
                BlockState::Codes => {
                    let tables = if self.fixed {
                        fixed_tables().tables()
                    } else {
                        CodeTables {
                            lit: &self.lit,
                            lit_bits: self.lit_bits,
                            dist: &self.dist,
                            dist_bits: self.dist_bits,
                        }
                    };
                    match self.codes.run(bits, io, win, tables, check) {
                        Ok(CodesProgress::Pending) => return Ok(BlocksProgress::Pending),
                        Ok(CodesProgress::End) => self.state = self.after_block(),
                        Err(e) => {
                            self.state = BlockState::Bad;
                            return Err(e);
                        }
                    }
                }
                BlockState::Dry => {
                    win.flush(io, check);
                    if !win.is_drained() {
                        return Ok(BlocksProgress::Pending);
                    }
                    self.state = BlockState::Done;
                }
                BlockState::Done => return Ok(BlocksProgress::Finished),
                BlockState::Bad => return Err(Error::Data("invalid compressed data")),
            }
        }
    }

    /// Reads the run-length coded literal/length and distance code lengths.
    /// Returns `false` when input ran out first.
    fn read_code_lengths(&mut self, bits: &mut BitBuf, io: &mut Io<'_>) -> Result<bool> {
        let total = num_lit(self.header) + num_dist(self.header);
        while self.index < total {
            let mut here;
            loop {
                here = self.precode[bits.peek(self.precode_bits) as usize];
                if here.bits as u32 <= bits.count() {
                    break;
                }
                if !bits.pull(io) {
                    return Ok(false);
                }
            }

            let sym = here.val as usize;
            if sym < PRECODE_REP_3_6 {
                bits.consume(here.bits as u32);
                self.lens[self.index] = sym as u8;
                self.index += 1;
                continue;
            }

            let extra = PRECODE_EXTRA_BITS[sym] as u32;
            if !bits.need(io, here.bits as u32 + extra) {
                return Ok(false);
            }
            bits.consume(here.bits as u32);
            let (fill, run) = match sym {
                PRECODE_REP_3_6 => {
                    if self.index == 0 {
                        return Err(self.fail("invalid bit length repeat"));
                    }
                    (self.lens[self.index - 1], 3 + bits.take(extra) as usize)
                }
                PRECODE_REPZ_3_10 => (0, 3 + bits.take(extra) as usize),
                _ => (0, 11 + bits.take(extra) as usize),
            };
            if self.index + run > total {
                return Err(self.fail("invalid bit length repeat"));
            }
            self.lens[self.index..self.index + run].fill(fill);
            self.index += run;
        }
        Ok(true)
    }

    fn build_dynamic_tables(&mut self) -> Result<()> {
        let nlit = num_lit(self.header);
        let ndist = num_dist(self.header);

        if self.lens[DEFLATE_END_OF_BLOCK] == 0 {
            return Err(self.fail("invalid code -- missing end-of-block"));
        }
        match build_table(TableKind::Lens, &self.lens[..nlit], LITLEN_ROOT_BITS, &mut self.lit) {
            Ok(root) => self.lit_bits = root as u32,
            Err(TableError::OverSubscribed) => {
                return Err(self.fail("oversubscribed literal/length tree"))
            }
            Err(TableError::Incomplete) => {
                return Err(self.fail("incomplete literal/length tree"))
            }
        }
        match build_table(
            TableKind::Dists,
            &self.lens[nlit..nlit + ndist],
            DIST_ROOT_BITS,
            &mut self.dist,
        ) {
            Ok(root) => self.dist_bits = root as u32,
            Err(TableError::OverSubscribed) => {
                return Err(self.fail("oversubscribed distance tree"))
            }
            Err(TableError::Incomplete) => return Err(self.fail("incomplete distance tree")),
        }
        debug!(nlit, ndist, "dynamic tables built");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adler32::ADLER32_INIT;

    fn decode(data: &[u8]) -> Result<Vec<u8>> {
        let mut blocks = Blocks::new();
        let mut bits = BitBuf::default();
        let mut win = Window::new(15)?;
        let mut out = vec![0u8; 1024];
        let mut io = Io::new(data, &mut out, ADLER32_INIT, 0);
        let r = blocks.run(&mut bits, &mut io, &mut win, false)?;
        assert!(matches!(r, BlocksProgress::Finished));
        let n = io.produced();
        out.truncate(n);
        Ok(out)
    }

    #[test]
    fn stored_blocks() {
        // A non-final stored "ab" followed by a final stored "c".
        let data = [0x00, 0x02, 0x00, 0xFD, 0xFF, b'a', b'b', 0x01, 0x01, 0x00, 0xFE, 0xFF, b'c'];
        assert_eq!(decode(&data).unwrap(), b"abc");
    }

    #[test]
    fn stored_length_mismatch() {
        let data = [0x01, 0x02, 0x00, 0xFC, 0xFF, b'a', b'b'];
        assert_eq!(decode(&data).unwrap_err(), Error::Data("invalid stored block lengths"));
    }

    #[test]
    fn reserved_block_type() {
        assert_eq!(decode(&[0x07]).unwrap_err(), Error::Data("invalid block type"));
    }

    #[test]
    fn empty_fixed_block() {
        assert_eq!(decode(&[0x03, 0x00]).unwrap(), b"");
    }

    #[test]
    fn too_many_symbols() {
        // Final dynamic block with HLIT = 30.
        let data = [0x05 | (30 << 3), 0x00, 0x00];
        assert_eq!(
            decode(&data).unwrap_err(),
            Error::Data("too many length or distance symbols")
        );
    }

    #[test]
    fn oversubscribed_precode() {
        // HCLEN = 4 with four one-bit code lengths.
        let data = [0x05, 0x00, 0x92, 0x04];
        assert_eq!(
            decode(&data).unwrap_err(),
            Error::Data("oversubscribed dynamic bit lengths tree")
        );
    }
}
