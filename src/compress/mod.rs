pub mod bitstream;
pub mod block;
mod lz77;
pub mod matchfinder;

pub use self::block::DataType;

use self::bitstream::Bitstream;
use self::block::BlockEncoder;
use self::matchfinder::{HashChains, SearchParams};
use crate::adler32::{adler32, ADLER32_INIT};
use crate::common::*;
use crate::config::{DeflateConfig, Level, LevelConfig, Strategy, Wrapper};
use crate::error::{Error, Result, Status};
use crate::stream::{Flush, Io};
use tracing::debug;

pub(crate) fn alloc_zeroed<T: Clone + Default>(len: usize) -> Result<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(len).map_err(|_| Error::Mem {
        requested_bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    v.resize(len, T::default());
    Ok(v)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    Busy,
    Finish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BlockState {
    NeedMore,
    BlockDone,
    FinishStarted,
    FinishDone,
}

/// Resumable DEFLATE encoder.
pub struct Compressor {
    level: Level,
    strategy: Strategy,
    wrapper: Wrapper,
    w_bits: u8,
    tuning: LevelConfig,

    state: State,
    /// Strongest flush already carried out; `None` while a call that filled
    /// the output left work behind.
    last_flush: Option<Flush>,
    trailer_written: bool,

    out: Bitstream,
    block: BlockEncoder,
    chains: HashChains,
    pending_buf_size: usize,

    window: Vec<u8>,
    w_size: usize,
    strstart: usize,
    /// Window offset where the current block starts; negative once the
    /// block's first bytes have slid out of the window.
    block_start: isize,
    lookahead: usize,

    match_start: usize,
    match_length: usize,
    prev_match: usize,
    prev_length: usize,
    match_available: bool,
}

impl Compressor {
    pub fn new(config: &DeflateConfig) -> Result<Self> {
        config.validate()?;

        let w_size = 1usize << config.window_bits;
        let hash_bits = config.mem_level + 7;
        let lit_bufsize = 1usize << (config.mem_level + 6);
        let pending_buf_size = lit_bufsize * 4;

        let mut c = Self {
            level: config.level,
            strategy: config.strategy,
            wrapper: config.wrapper,
            w_bits: config.window_bits,
            tuning: *LevelConfig::for_level(config.level),
            state: State::Init,
            last_flush: Some(Flush::NoFlush),
            trailer_written: false,
            out: Bitstream::new(pending_buf_size),
            block: BlockEncoder::new(lit_bufsize)?,
            chains: HashChains::new(config.window_bits, hash_bits)?,
            pending_buf_size,
            window: alloc_zeroed(2 * w_size)?,
            w_size,
            strstart: 0,
            block_start: 0,
            lookahead: 0,
            match_start: 0,
            match_length: 0,
            prev_match: 0,
            prev_length: 0,
            match_available: false,
        };
        c.reset();
        debug!(
            level = config.level.get(),
            window_bits = config.window_bits,
            mem_level = config.mem_level,
            strategy = ?config.strategy,
            "compressor initialized"
        );
        Ok(c)
    }

    pub fn reset(&mut self) {
        self.state = State::Init;
        self.last_flush = Some(Flush::NoFlush);
        self.trailer_written = false;
        self.out.reset();
        self.block.reset();
        self.chains.clear();
        self.strstart = 0;
        self.block_start = 0;
        self.lookahead = 0;
        self.match_start = 0;
        self.match_length = DEFLATE_MIN_MATCH_LEN - 1;
        self.prev_match = 0;
        self.prev_length = DEFLATE_MIN_MATCH_LEN - 1;
        self.match_available = false;
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn data_type(&self) -> DataType {
        self.block.data_type()
    }

    pub fn pending(&self) -> usize {
        self.out.pending_len()
    }

    #[inline]
    fn max_dist(&self) -> usize {
        self.w_size - MIN_LOOKAHEAD
    }

    pub fn bound(&self, source_len: usize) -> usize {
        let dict = if self.state == State::Init && self.strstart != 0 {
            ZLIB_DICTID_SIZE
        } else {
            0
        };
        compress_bound(source_len, self.wrapper) + dict
    }

    /// Only legal before the first `deflate` call.
    pub fn set_dictionary(&mut self, adler: &mut u32, dictionary: &[u8]) -> Result<()> {
        if self.state != State::Init {
            return Err(Error::Stream("dictionary must be set before compression starts"));
        }
        *adler = adler32(*adler, dictionary);
        if dictionary.len() < DEFLATE_MIN_MATCH_LEN {
            return Ok(());
        }

        let len = dictionary.len().min(self.max_dist());
        let dict = &dictionary[dictionary.len() - len..];
        self.window[..len].copy_from_slice(dict);
        self.strstart = len;
        self.block_start = len as isize;

        self.chains.seed(&self.window, 0);
        for n in 0..=len - DEFLATE_MIN_MATCH_LEN {
            self.chains.insert(&self.window, n);
        }
        debug!(len, adler = *adler, "compression dictionary loaded");
        Ok(())
    }

    /// Changes level and strategy mid-stream. When the level switches to a
    /// different algorithm family after input has been consumed, the data so
    /// far is first emitted with a partial flush into `io`. If that flush
    /// cannot complete, nothing changes and `BufError` asks for more output.
    pub(crate) fn params(&mut self, io: &mut Io<'_>, level: Level, strategy: Strategy) -> Result<Status> {
        let tuning = *LevelConfig::for_level(level);
        let mut status = Status::Ok;
        if tuning.family != self.tuning.family && io.total_in() != 0 {
            status = self.deflate(io, Flush::PartialFlush)?;
            if self.lookahead != 0 || self.match_available || self.block_has_data() {
                return Ok(Status::BufError);
            }
        }
        if self.level != level {
            self.level = level;
            self.tuning = tuning;
        }
        self.strategy = strategy;
        debug!(level = level.get(), ?strategy, "compression parameters changed");
        Ok(status)
    }

    fn write_header(&mut self, adler: u32) {
        let mut header = ((ZLIB_CM_DEFLATE as u16) | (((self.w_bits - 8) as u16) << 4)) << 8;
        header |= (self.level.header_hint() as u16) << 6;
        let preset = self.strstart != 0;
        if preset {
            header |= ZLIB_FDICT as u16;
        }
        header += 31 - header % 31;
        self.out.put_u16_be(header);
        if preset {
            self.out.put_u16_be((adler >> 16) as u16);
            self.out.put_u16_be(adler as u16);
        }
    }

    fn flush_pending(&mut self, io: &mut Io<'_>) {
        let n = self.out.drain_into(io.output());
        io.produce(n);
    }

    pub(crate) fn deflate(&mut self, io: &mut Io<'_>, flush: Flush) -> Result<Status> {
        if self.state == State::Finish && flush != Flush::Finish {
            return Err(Error::Stream("stream is finishing; only Finish may follow"));
        }
        if io.avail_out() == 0 {
            return Ok(Status::BufError);
        }

        let old_flush = self.last_flush;
        self.last_flush = Some(flush);

        if self.state == State::Init {
            if self.wrapper == Wrapper::Zlib {
                self.write_header(io.adler);
                io.adler = ADLER32_INIT;
            }
            self.state = State::Busy;
        }

        if self.out.has_pending() {
            self.flush_pending(io);
            if io.avail_out() == 0 {
                self.last_flush = old_flush;
                return Ok(Status::Ok);
            }
        }
        if io.avail_in() == 0 && old_flush.is_some_and(|old| flush <= old) && flush != Flush::Finish {
            return Ok(if io.produced() > 0 {
                Status::Ok
            } else {
                Status::BufError
            });
        }

        if self.state == State::Finish && io.avail_in() != 0 {
            return Ok(Status::BufError);
        }

        if io.avail_in() != 0
            || self.lookahead != 0
            || (flush != Flush::NoFlush && self.state != State::Finish)
        {
            let bstate = match self.tuning.family {
                crate::config::Family::Stored => self.deflate_stored(io, flush),
                crate::config::Family::Fast => self.deflate_fast(io, flush),
                crate::config::Family::Slow => self.deflate_slow(io, flush),
            };

            if matches!(bstate, BlockState::FinishStarted | BlockState::FinishDone) {
                self.state = State::Finish;
            }
            match bstate {
                BlockState::NeedMore | BlockState::FinishStarted => {
                    if io.avail_out() == 0 {
                        self.last_flush = None;
                    }
                    return Ok(Status::Ok);
                }
                BlockState::BlockDone => {
                    if flush == Flush::PartialFlush {
                        self.block.align(&mut self.out);
                    } else {
                        self.block.stored_block(&mut self.out, &[], false);
                        if flush == Flush::FullFlush {
                            self.chains.clear();
                        }
                    }
                    debug!(?flush, "flush point");
                    self.flush_pending(io);
                    if io.avail_out() == 0 {
                        return Ok(Status::Ok);
                    }
                }
                BlockState::FinishDone => {}
            }
        }

        if flush != Flush::Finish {
            return Ok(Status::Ok);
        }
        if self.wrapper == Wrapper::Zlib && !self.trailer_written {
            let adler = io.adler;
            self.out.put_u16_be((adler >> 16) as u16);
            self.out.put_u16_be(adler as u16);
            self.trailer_written = true;
            self.flush_pending(io);
        }
        Ok(if self.out.has_pending() {
            Status::Ok
        } else {
            Status::StreamEnd
        })
    }

    fn search_params(&self) -> SearchParams {
        SearchParams {
            good_length: self.tuning.good_length as usize,
            nice_length: self.tuning.nice_length as usize,
            max_chain: self.tuning.max_chain as usize,
            max_dist: self.max_dist(),
        }
    }
}

/// Worst-case compressed size of `source_len` bytes, wrapper included.
pub fn compress_bound(source_len: usize, wrapper: Wrapper) -> usize {
    let wrap = match wrapper {
        Wrapper::Zlib => ZLIB_MIN_OVERHEAD,
        Wrapper::Raw => 0,
    };
    source_len + ((source_len + 7) >> 3) + ((source_len + 63) >> 6) + 5 + wrap
}
