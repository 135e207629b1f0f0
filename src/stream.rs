//! The caller-facing stream context.
//!
//! A [`Stream`] owns exactly one engine plus the bookkeeping that outlives a
//! single call: cumulative byte counts, the running Adler-32 and the message
//! of the last error. Input and output are lent per call and the returned
//! [`Step`] says how much of each was used; unconsumed input is the caller's
//! to supply again.

use crate::adler32::ADLER32_INIT;
use crate::compress::{Compressor, DataType};
use crate::config::{DeflateConfig, InflateConfig, Level, Strategy};
use crate::decompress::Decompressor;
use crate::error::{Error, Result, Status};
use tracing::debug;

/// How much pending data a `deflate` call must push out.
///
/// Ordered by strength: a repeated call without new input makes progress only
/// with a stronger mode than the previous call used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Flush {
    /// Accumulate; emit only when internal buffers fill.
    NoFlush,
    /// Emit everything buffered, followed by an empty static block.
    PartialFlush,
    /// Emit everything buffered and byte-align with an empty stored block.
    SyncFlush,
    /// As `SyncFlush`, and forget history so decoding can restart here.
    FullFlush,
    /// Emit the final block and the trailer.
    Finish,
}

/// The buffers lent to an engine for one call.
pub(crate) struct Io<'a> {
    input: &'a [u8],
    output: &'a mut [u8],
    in_pos: usize,
    out_pos: usize,
    base_total_in: u64,
    pub adler: u32,
}

impl<'a> Io<'a> {
    pub fn new(input: &'a [u8], output: &'a mut [u8], adler: u32, total_in: u64) -> Self {
        Self {
            input,
            output,
            in_pos: 0,
            out_pos: 0,
            base_total_in: total_in,
            adler,
        }
    }

    #[inline(always)]
    pub fn avail_in(&self) -> usize {
        self.input.len() - self.in_pos
    }

    #[inline(always)]
    pub fn avail_out(&self) -> usize {
        self.output.len() - self.out_pos
    }

    /// Stream-wide input count, including what this call consumed so far.
    pub fn total_in(&self) -> u64 {
        self.base_total_in + self.in_pos as u64
    }

    pub fn consumed(&self) -> usize {
        self.in_pos
    }

    pub fn produced(&self) -> usize {
        self.out_pos
    }

    /// Unconsumed input.
    pub fn input(&self) -> &[u8] {
        &self.input[self.in_pos..]
    }

    /// Gives back the last `n` consumed bytes.
    pub fn unconsume(&mut self, n: usize) {
        debug_assert!(n <= self.in_pos);
        self.in_pos -= n;
    }

    #[inline(always)]
    pub fn next_byte(&mut self) -> Option<u8> {
        let b = self.input.get(self.in_pos).copied()?;
        self.in_pos += 1;
        Some(b)
    }

    /// Copies input into `dst`, returning the number of bytes moved.
    pub fn read_into(&mut self, dst: &mut [u8]) -> usize {
        let n = dst.len().min(self.avail_in());
        dst[..n].copy_from_slice(&self.input[self.in_pos..self.in_pos + n]);
        self.in_pos += n;
        n
    }

    /// Free output space; call [`Io::produce`] after filling a prefix of it.
    pub fn output(&mut self) -> &mut [u8] {
        &mut self.output[self.out_pos..]
    }

    pub fn produce(&mut self, n: usize) {
        debug_assert!(n <= self.avail_out());
        self.out_pos += n;
    }

    /// Copies as much of `src` as fits into the output.
    pub fn write(&mut self, src: &[u8]) -> usize {
        let n = src.len().min(self.avail_out());
        self.output[self.out_pos..self.out_pos + n].copy_from_slice(&src[..n]);
        self.out_pos += n;
        n
    }
}

/// Result of one step call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub status: Status,
    /// Input bytes used; the rest must be passed again.
    pub consumed: usize,
    /// Output bytes written.
    pub produced: usize,
}

/// Stream context wrapping a single engine.
pub struct Stream<E> {
    engine: Option<Box<E>>,
    total_in: u64,
    total_out: u64,
    adler: u32,
    msg: Option<&'static str>,
}

pub type DeflateStream = Stream<Compressor>;
pub type InflateStream = Stream<Decompressor>;

impl<E> Stream<E> {
    fn with_engine(engine: E) -> Self {
        Self {
            engine: Some(Box::new(engine)),
            total_in: 0,
            total_out: 0,
            adler: ADLER32_INIT,
            msg: None,
        }
    }

    pub fn total_in(&self) -> u64 {
        self.total_in
    }

    pub fn total_out(&self) -> u64 {
        self.total_out
    }

    /// Adler-32 of the data seen so far. While a decoder waits for a
    /// dictionary this is the dictionary id from the header.
    pub fn adler(&self) -> u32 {
        self.adler
    }

    /// Message of the last error, if any.
    pub fn msg(&self) -> Option<&'static str> {
        self.msg
    }

    /// Releases the engine and its buffers. Every later call on this
    /// context fails with a stream error.
    pub fn end(&mut self) -> Result<()> {
        match self.engine.take() {
            Some(_) => Ok(()),
            None => Err(Error::Stream("stream already ended")),
        }
    }

    fn engine(&self) -> Result<&E> {
        self.engine
            .as_deref()
            .ok_or(Error::Stream("stream already ended"))
    }

    fn engine_mut(&mut self) -> Result<&mut E> {
        self.engine
            .as_deref_mut()
            .ok_or(Error::Stream("stream already ended"))
    }

    fn record<T>(&mut self, r: Result<T>) -> Result<T> {
        if let Err(e) = &r {
            self.msg = Some(e.message());
        }
        r
    }

    /// Lends the buffers to the engine and folds the outcome into the totals.
    fn step(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        f: impl FnOnce(&mut E, &mut Io<'_>) -> Result<Status>,
    ) -> Result<Step> {
        let Some(engine) = self.engine.as_deref_mut() else {
            return Err(Error::Stream("stream already ended"));
        };
        let mut io = Io::new(input, output, self.adler, self.total_in);
        let r = f(engine, &mut io);

        let (consumed, produced) = (io.consumed(), io.produced());
        self.adler = io.adler;
        self.total_in += consumed as u64;
        self.total_out += produced as u64;
        let status = self.record(r)?;
        Ok(Step {
            status,
            consumed,
            produced,
        })
    }

    fn clear_counters(&mut self) {
        self.total_in = 0;
        self.total_out = 0;
        self.adler = ADLER32_INIT;
        self.msg = None;
    }
}

impl Stream<Compressor> {
    pub fn new(config: &DeflateConfig) -> Result<Self> {
        Ok(Self::with_engine(Compressor::new(config)?))
    }

    /// Compresses from `input` into `output`.
    ///
    /// `Status::StreamEnd` means a `Finish` call has written everything,
    /// trailer included. `Status::BufError` means no progress was possible and
    /// is not fatal.
    pub fn deflate(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Step> {
        self.step(input, output, |c, io| c.deflate(io, flush))
    }

    /// Presets the compression dictionary; only before the first `deflate`.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        let mut adler = self.adler;
        let r = self
            .engine_mut()
            .and_then(|c| c.set_dictionary(&mut adler, dictionary));
        self.adler = adler;
        self.record(r)
    }

    /// Switches level and strategy. May flush buffered data into `output`
    /// when the level change selects a different algorithm.
    pub fn params(&mut self, level: Level, strategy: Strategy, output: &mut [u8]) -> Result<Step> {
        self.step(&[], output, |c, io| c.params(io, level, strategy))
    }

    /// Worst-case output size for compressing `source_len` bytes in one call.
    pub fn bound(&self, source_len: usize) -> Result<usize> {
        Ok(self.engine()?.bound(source_len))
    }

    pub fn data_type(&self) -> Result<DataType> {
        Ok(self.engine()?.data_type())
    }

    /// Bytes of compressed output still buffered inside the engine.
    pub fn pending(&self) -> Result<usize> {
        Ok(self.engine()?.pending())
    }

    /// Starts a new stream with the same parameters, keeping the buffers.
    pub fn reset(&mut self) -> Result<()> {
        self.engine_mut()?.reset();
        self.clear_counters();
        debug!("deflate stream reset");
        Ok(())
    }
}

impl Stream<Decompressor> {
    pub fn new(config: &InflateConfig) -> Result<Self> {
        Ok(Self::with_engine(Decompressor::new(config)?))
    }

    /// Decompresses from `input` into `output`.
    ///
    /// `flush` is accepted for symmetry with `deflate`; the decoder always
    /// produces as much as it can. After an error `total_in` still counts the
    /// input the decoder consumed, which is where `sync` should resume.
    pub fn inflate(&mut self, input: &[u8], output: &mut [u8], flush: Flush) -> Result<Step> {
        self.step(input, output, |d, io| d.inflate(io, flush))
    }

    /// Supplies the dictionary after `inflate` returned `NeedDictionary`.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> Result<()> {
        let mut adler = self.adler;
        let r = self
            .engine_mut()
            .and_then(|d| d.set_dictionary(&mut adler, dictionary));
        self.adler = adler;
        self.record(r)
    }

    /// Skips input up to and including the next `00 00 FF FF` flush marker,
    /// then resumes block decoding there.
    pub fn sync(&mut self, input: &[u8]) -> Result<Step> {
        self.step(input, &mut [], |d, io| d.sync(io))
    }

    /// Whether the decoder sits exactly at the length field of a stored block
    /// with nothing left in its bit buffer.
    pub fn sync_point(&self) -> Result<bool> {
        Ok(self.engine()?.sync_point())
    }

    /// Starts decoding a new stream, keeping the window buffer.
    pub fn reset(&mut self) -> Result<()> {
        self.engine_mut()?.reset();
        self.clear_counters();
        debug!("inflate stream reset");
        Ok(())
    }
}
