use crate::adler32::adler32;
use crate::compress::alloc_zeroed;
use crate::error::Result;
use crate::stream::Io;

/// Circular output window of the decoder.
///
/// `buf[read..write]` (wrapping) holds decoded bytes not yet copied to the
/// caller. The write cursor never catches up with the read cursor from
/// behind, so `read == write` always means "nothing pending". Everything
/// behind `write`, up to `have` bytes, is history for back-references.
pub(crate) struct Window {
    buf: Vec<u8>,
    read: usize,
    write: usize,
    have: usize,
}

impl Window {
    pub fn new(bits: u8) -> Result<Self> {
        Ok(Self {
            buf: alloc_zeroed(1usize << bits)?,
            read: 0,
            write: 0,
            have: 0,
        })
    }

    pub fn reset(&mut self) {
        self.read = 0;
        self.write = 0;
        self.have = 0;
    }

    #[inline(always)]
    pub fn size(&self) -> usize {
        self.buf.len()
    }

    /// Bytes of history available to back-references.
    #[inline(always)]
    pub fn have(&self) -> usize {
        self.have
    }

    pub fn is_drained(&self) -> bool {
        self.read == self.write
    }

    /// Contiguous space in front of the write cursor.
    #[inline(always)]
    pub fn free(&self) -> usize {
        if self.write < self.read {
            self.read - self.write - 1
        } else {
            self.size() - self.write
        }
    }

    fn wrap(&mut self) {
        if self.write == self.size() && self.read != 0 {
            self.write = 0;
        }
    }

    /// Ensures at least one byte of free space, draining to the caller's
    /// output if needed. Returns `false` when the output is full.
    #[inline]
    pub fn make_room(&mut self, io: &mut Io<'_>, check: bool) -> bool {
        if self.free() == 0 {
            self.wrap();
            if self.free() == 0 {
                self.flush(io, check);
                self.wrap();
                if self.free() == 0 {
                    return false;
                }
            }
        }
        true
    }

    #[inline(always)]
    fn advance(&mut self, n: usize) {
        self.write += n;
        self.have = (self.have + n).min(self.size());
    }

    #[inline(always)]
    pub fn put(&mut self, b: u8) {
        self.buf[self.write] = b;
        self.advance(1);
    }

    /// Copies input bytes in, up to the contiguous free space.
    pub fn put_input(&mut self, io: &mut Io<'_>, max: usize) -> usize {
        let n = max.min(self.free());
        let w = self.write;
        let n = io.read_into(&mut self.buf[w..w + n]);
        self.advance(n);
        n
    }

    /// Appends `len` bytes copied from `dist` bytes behind the write cursor.
    /// The caller guarantees `len <= free()` and `dist <= have()`.
    #[inline]
    pub fn copy_match(&mut self, dist: usize, len: usize) {
        debug_assert!(len <= self.free());
        debug_assert!(dist >= 1 && dist <= self.have);
        let size = self.size();
        let w = self.write;
        let mut src = (w + size - dist) % size;

        let src_end = src + len;
        if src_end <= size && (src_end <= w || src >= w + len) {
            self.buf.copy_within(src..src_end, w);
        } else {
            // Overlapping or wrapping source: byte by byte, so freshly
            // written bytes are re-read as the pattern repeats.
            for i in 0..len {
                self.buf[w + i] = self.buf[src];
                src += 1;
                if src == size {
                    src = 0;
                }
            }
        }
        self.advance(len);
    }

    /// Copies pending bytes to the caller's output, updating the Adler-32
    /// when `check` is set.
    pub fn flush(&mut self, io: &mut Io<'_>, check: bool) {
        let size = self.size();
        let mut q = self.read;

        let end = if q <= self.write { self.write } else { size };
        q += self.emit(io, q, end, check);

        if q == size {
            q = 0;
            if self.write == size {
                self.write = 0;
            }
            q += self.emit(io, 0, self.write, check);
        }
        self.read = q;
    }

    fn emit(&self, io: &mut Io<'_>, from: usize, to: usize, check: bool) -> usize {
        let n = io.write(&self.buf[from..to]);
        if check {
            io.adler = adler32(io.adler, &self.buf[from..from + n]);
        }
        n
    }

    /// Loads a preset dictionary as history; at most `size - 1` trailing
    /// bytes are kept.
    pub fn set_dictionary(&mut self, dict: &[u8]) {
        let n = dict.len().min(self.size() - 1);
        self.buf[..n].copy_from_slice(&dict[dict.len() - n..]);
        self.read = n;
        self.write = n;
        self.have = n;
    }
}
