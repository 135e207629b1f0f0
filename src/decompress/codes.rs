//! Literal/length and distance symbol decoding for one Huffman block.

use super::bits::BitBuf;
use super::tables::CodeTables;
use super::window::Window;
use crate::common::DEFLATE_MAX_MATCH_LEN;
use crate::error::{Error, Result};
use crate::huffman::table::{OP_BASE, OP_END_OF_BLOCK, OP_LITERAL};
use crate::huffman::Code;
use crate::stream::Io;

/// Input bytes that guarantee the fast loop can decode one full symbol
/// (15 + 5 + 15 + 13 bits) without checking for the end of input.
const FAST_MIN_INPUT: usize = 10;

/// Decoding state inside a Huffman block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CodeState {
    /// Expecting a literal/length symbol.
    Len,
    LenExt { extra: u32 },
    Dist,
    DistExt { extra: u32 },
    /// Copying `len` bytes from `dist` back.
    Copy,
    Lit(u8),
    /// End of block seen; draining the window.
    Wash,
    End,
    Bad,
}

pub(crate) enum CodesProgress {
    /// Input or output ran out.
    Pending,
    /// End of block reached and every decoded byte delivered.
    End,
}

enum FastExit {
    Limits,
    EndOfBlock,
}

pub(crate) struct Codes {
    state: CodeState,
    len: usize,
    dist: usize,
}

/// Looks up the next symbol, pulling input bytes one at a time until the
/// entry found is fully covered by buffered bits. Consumes nothing when
/// input runs out first.
#[inline]
fn decode_symbol(bits: &mut BitBuf, io: &mut Io<'_>, table: &[Code], root: u32) -> Option<Code> {
    let mut here;
    loop {
        here = table[bits.peek(root) as usize];
        if here.bits as u32 <= bits.count() {
            break;
        }
        if !bits.pull(io) {
            return None;
        }
    }
    if here.is_link() {
        let last = here;
        loop {
            let sub = bits.peek(last.bits as u32 + last.op as u32) >> last.bits;
            here = table[last.val as usize + sub as usize];
            if last.bits as u32 + here.bits as u32 <= bits.count() {
                break;
            }
            if !bits.pull(io) {
                return None;
            }
        }
        bits.consume(last.bits as u32);
    }
    bits.consume(here.bits as u32);
    Some(here)
}

impl Codes {
    pub fn new() -> Self {
        Self {
            state: CodeState::Len,
            len: 0,
            dist: 0,
        }
    }

    fn fail(&mut self, msg: &'static str) -> Error {
        self.state = CodeState::Bad;
        Error::Data(msg)
    }

    /// Runs the block's symbol loop until it ends, input or output runs out,
    /// or the data turns out to be invalid.
    pub fn run(
        &mut self,
        bits: &mut BitBuf,
        io: &mut Io<'_>,
        win: &mut Window,
        t: CodeTables<'_>,
        check: bool,
    ) -> Result<CodesProgress> {
        loop {
            match self.state {
                CodeState::Len => {
                    if io.avail_in() >= FAST_MIN_INPUT && win.free() >= DEFLATE_MAX_MATCH_LEN {
                        if let FastExit::EndOfBlock = self.run_fast(bits, io, win, t)? {
                            self.state = CodeState::Wash;
                            continue;
                        }
                    }
                    let Some(here) = decode_symbol(bits, io, t.lit, t.lit_bits) else {
                        return Ok(CodesProgress::Pending);
                    };
                    if here.op == OP_LITERAL {
                        self.state = CodeState::Lit(here.val as u8);
                    } else if here.op & OP_BASE != 0 {
                        self.len = here.val as usize;
                        self.state = CodeState::LenExt {
                            extra: (here.op & 15) as u32,
                        };
                    } else if here.op & OP_END_OF_BLOCK != 0 {
                        self.state = CodeState::Wash;
                    } else {
                        return Err(self.fail("invalid literal/length code"));
                    }
                }
                CodeState::LenExt { extra } => {
                    if !bits.need(io, extra) {
                        return Ok(CodesProgress::Pending);
                    }
                    self.len += bits.take(extra) as usize;
                    self.state = CodeState::Dist;
                }
                CodeState::Dist => {
                    let Some(here) = decode_symbol(bits, io, t.dist, t.dist_bits) else {
                        return Ok(CodesProgress::Pending);
                    };
                    if here.op & OP_BASE == 0 {
                        return Err(self.fail("invalid distance code"));
                    }
                    self.dist = here.val as usize;
                    self.state = CodeState::DistExt {
                        extra: (here.op & 15) as u32,
                    };
                }
                CodeState::DistExt { extra } => {
                    if !bits.need(io, extra) {
                        return Ok(CodesProgress::Pending);
                    }
                    self.dist += bits.take(extra) as usize;
                    if self.dist > win.have() {
                        return Err(self.fail("invalid distance too far back"));
                    }
                    self.state = CodeState::Copy;
                }
                CodeState::Copy => {
                    while self.len > 0 {
                        if !win.make_room(io, check) {
                            return Ok(CodesProgress::Pending);
                        }
                        let n = self.len.min(win.free());
                        win.copy_match(self.dist, n);
                        self.len -= n;
                    }
                    self.state = CodeState::Len;
                }
                CodeState::Lit(b) => {
                    if !win.make_room(io, check) {
                        return Ok(CodesProgress::Pending);
                    }
                    win.put(b);
                    self.state = CodeState::Len;
                }
                CodeState::Wash => {
                    win.flush(io, check);
                    if !win.is_drained() {
                        return Ok(CodesProgress::Pending);
                    }
                    self.state = CodeState::End;
                }
                CodeState::End => return Ok(CodesProgress::End),
                CodeState::Bad => return Err(Error::Data("invalid compressed data")),
            }
        }
    }

    /// Decodes whole symbols while at least `FAST_MIN_INPUT` input bytes and a
    /// maximal match worth of contiguous window space are available.
    fn run_fast(
        &mut self,
        bits: &mut BitBuf,
        io: &mut Io<'_>,
        win: &mut Window,
        t: CodeTables<'_>,
    ) -> Result<FastExit> {
        let r = loop {
            if io.avail_in() < FAST_MIN_INPUT || win.free() < DEFLATE_MAX_MATCH_LEN {
                break Ok(FastExit::Limits);
            }
            bits.need(io, 48);

            let mut here = t.lit[bits.peek(t.lit_bits) as usize];
            if here.is_link() {
                bits.consume(here.bits as u32);
                here = t.lit[here.val as usize + bits.peek(here.op as u32) as usize];
            }
            bits.consume(here.bits as u32);

            if here.op == OP_LITERAL {
                win.put(here.val as u8);
                continue;
            }
            if here.op & OP_BASE == 0 {
                if here.op & OP_END_OF_BLOCK != 0 {
                    break Ok(FastExit::EndOfBlock);
                }
                break Err(self.fail("invalid literal/length code"));
            }
            let len = here.val as usize + bits.take((here.op & 15) as u32) as usize;

            let mut here = t.dist[bits.peek(t.dist_bits) as usize];
            if here.is_link() {
                bits.consume(here.bits as u32);
                here = t.dist[here.val as usize + bits.peek(here.op as u32) as usize];
            }
            bits.consume(here.bits as u32);
            if here.op & OP_BASE == 0 {
                break Err(self.fail("invalid distance code"));
            }
            let dist = here.val as usize + bits.take((here.op & 15) as u32) as usize;
            if dist > win.have() {
                break Err(self.fail("invalid distance too far back"));
            }
            win.copy_match(dist, len);
        };
        bits.return_unused(io);
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adler32::ADLER32_INIT;
    use crate::decompress::tables::fixed_tables;

    /// Packs `(value, bit count)` pairs LSB-first.
    fn pack(fields: &[(u32, u32)]) -> Vec<u8> {
        let mut out = Vec::new();
        let (mut acc, mut n) = (0u64, 0u32);
        for &(v, len) in fields {
            acc |= (v as u64) << n;
            n += len;
            while n >= 8 {
                out.push(acc as u8);
                acc >>= 8;
                n -= 8;
            }
        }
        if n > 0 {
            out.push(acc as u8);
        }
        out
    }

    /// Fixed-code codeword for a literal below 144, as written to the stream.
    fn lit(b: u8) -> (u32, u32) {
        (crate::huffman::reverse_codeword(0x30 + b as u32, 8), 8)
    }

    fn decode_all(data: &[u8], chunk: usize) -> Result<Vec<u8>> {
        let mut codes = Codes::new();
        let mut bits = BitBuf::default();
        let mut win = Window::new(15)?;
        let mut out = Vec::new();
        let mut buf = [0u8; 3];
        let mut pos = 0;
        loop {
            let end = (pos + chunk).min(data.len());
            let mut io = Io::new(&data[pos..end], &mut buf, ADLER32_INIT, 0);
            let r = codes.run(&mut bits, &mut io, &mut win, fixed_tables().tables(), false)?;
            pos += io.consumed();
            let n = io.produced();
            out.extend_from_slice(&buf[..n]);
            if let CodesProgress::End = r {
                return Ok(out);
            }
            assert!(pos < data.len() || n > 0, "decoder stalled");
        }
    }

    fn abc_repeat_stream() -> Vec<u8> {
        // "abc", then length 9 (symbol 263, code 0000111) at distance 3
        // (distance symbol 2, code 00010), then end of block.
        pack(&[
            lit(b'a'),
            lit(b'b'),
            lit(b'c'),
            (crate::huffman::reverse_codeword(7, 7), 7),
            (crate::huffman::reverse_codeword(2, 5), 5),
            (0, 7),
        ])
    }

    #[test]
    fn decodes_literals_and_overlapping_match() {
        let data = abc_repeat_stream();
        assert_eq!(decode_all(&data, data.len()).unwrap(), b"abcabcabcabc");
        assert_eq!(decode_all(&data, 1).unwrap(), b"abcabcabcabc");
    }

    #[test]
    fn fast_path_matches_slow_path() {
        let mut fields = Vec::new();
        for i in 0..40u8 {
            fields.push(lit(b'a' + i % 26));
        }
        // Length 3 (symbol 257, code 0000001), distance 1 (code 00000).
        fields.push((crate::huffman::reverse_codeword(1, 7), 7));
        fields.push((0, 5));
        fields.push((0, 7));
        let data = pack(&fields);
        let whole = decode_all(&data, data.len()).unwrap();
        assert_eq!(whole.len(), 43);
        assert_eq!(&whole[40..], b"nnn");
        assert_eq!(decode_all(&data, 1).unwrap(), whole);
    }

    #[test]
    fn rejects_distance_before_start() {
        // Length 3 at distance 1 with an empty window.
        let data = pack(&[
            (crate::huffman::reverse_codeword(1, 7), 7),
            (0, 5),
            (0, 7),
            (0, 32),
        ]);
        assert_eq!(
            decode_all(&data, data.len()).unwrap_err(),
            Error::Data("invalid distance too far back")
        );
    }

    #[test]
    fn rejects_reserved_symbols() {
        // Literal/length symbol 286: 8-bit code 11000110.
        let data = pack(&[(crate::huffman::reverse_codeword(0xC6, 8), 8), (0, 32)]);
        assert_eq!(
            decode_all(&data, data.len()).unwrap_err(),
            Error::Data("invalid literal/length code")
        );
    }
}
