//! Resumable zlib / raw DEFLATE decoder.

mod bits;
mod blocks;
mod codes;
mod tables;
mod window;

use self::bits::BitBuf;
use self::blocks::{BlockState, Blocks, BlocksProgress};
use self::window::Window;
use crate::adler32::{adler32, ADLER32_INIT};
use crate::common::*;
use crate::config::{InflateConfig, Wrapper};
use crate::error::{Error, Result, Status};
use crate::stream::{Flush, Io};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Method,
    Flag { cmf: u8 },
    DictId { remaining: u8 },
    NeedDict,
    Blocks,
    Check { remaining: u8 },
    Done,
    /// Decoding failed; `marker` counts flush-marker bytes matched by `sync`.
    Bad { marker: u8 },
}

fn sync_step(marker: u8, b: u8) -> u8 {
    if b == SYNC_MARKER[marker as usize] {
        marker + 1
    } else if b != 0 {
        0
    } else {
        // A zero after a partial match still counts toward a new marker.
        4 - marker
    }
}

/// Resumable DEFLATE decoder over a `2^window_bits` circular window.
pub struct Decompressor {
    wrapper: Wrapper,
    w_bits: u8,
    mode: Mode,
    bits: BitBuf,
    blocks: Blocks,
    window: Window,
    /// Dictionary id or trailer being assembled.
    need: u32,
    reason: &'static str,
}

impl Decompressor {
    pub fn new(config: &InflateConfig) -> Result<Self> {
        config.validate()?;
        let mut d = Self {
            wrapper: config.wrapper,
            w_bits: config.window_bits,
            mode: Mode::Method,
            bits: BitBuf::default(),
            blocks: Blocks::new(),
            window: Window::new(config.window_bits)?,
            need: 0,
            reason: "",
        };
        d.reset();
        debug!(
            window_bits = config.window_bits,
            wrapper = ?config.wrapper,
            "decompressor initialized"
        );
        Ok(d)
    }

    pub fn reset(&mut self) {
        self.mode = match self.wrapper {
            Wrapper::Zlib => Mode::Method,
            Wrapper::Raw => Mode::Blocks,
        };
        self.bits.clear();
        self.blocks.reset();
        self.window.reset();
        self.need = 0;
        self.reason = "";
    }

    pub fn is_done(&self) -> bool {
        self.mode == Mode::Done
    }

    fn fail(&mut self, err: Error) -> Error {
        self.mode = Mode::Bad { marker: 0 };
        self.reason = err.message();
        warn!(reason = self.reason, "inflate failed");
        err
    }

    /// The flush mode does not change decoding.
    pub(crate) fn inflate(&mut self, io: &mut Io<'_>, _flush: Flush) -> Result<Status> {
        match self.decode(io)? {
            Status::Ok if io.consumed() == 0 && io.produced() == 0 => Ok(Status::BufError),
            status => Ok(status),
        }
    }

    fn decode(&mut self, io: &mut Io<'_>) -> Result<Status> {
        let check = self.wrapper == Wrapper::Zlib;
        loop {
            match self.mode {
                Mode::Method => {
                    if !self.bits.need(io, 8) {
                        return Ok(Status::Ok);
                    }
                    let cmf = self.bits.take(8) as u8;
                    if cmf & 0x0F != ZLIB_CM_DEFLATE {
                        return Err(self.fail(Error::Data("unknown compression method")));
                    }
                    if (cmf >> 4) + 8 > self.w_bits {
                        return Err(self.fail(Error::Data("invalid window size")));
                    }
                    self.mode = Mode::Flag { cmf };
                }
                Mode::Flag { cmf } => {
                    if !self.bits.need(io, 8) {
                        return Ok(Status::Ok);
                    }
                    let flg = self.bits.take(8) as u8;
                    if (((cmf as u16) << 8) | flg as u16) % 31 != 0 {
                        return Err(self.fail(Error::Data("incorrect header check")));
                    }
                    debug!(cmf, flg, "zlib header");
                    self.mode = if flg & ZLIB_FDICT != 0 {
                        self.need = 0;
                        Mode::DictId { remaining: 4 }
                    } else {
                        Mode::Blocks
                    };
                }
                Mode::DictId { remaining } => {
                    if !self.bits.need(io, 8) {
                        return Ok(Status::Ok);
                    }
                    self.need = (self.need << 8) | self.bits.take(8);
                    if remaining > 1 {
                        self.mode = Mode::DictId {
                            remaining: remaining - 1,
                        };
                    } else {
                        io.adler = self.need;
                        self.mode = Mode::NeedDict;
                        debug!(dict_id = self.need, "stream needs a dictionary");
                        return Ok(Status::NeedDictionary);
                    }
                }
                Mode::NeedDict => return Ok(Status::NeedDictionary),
                Mode::Blocks => {
                    match self.blocks.run(&mut self.bits, io, &mut self.window, check) {
                        Ok(BlocksProgress::Pending) => return Ok(Status::Ok),
                        Ok(BlocksProgress::Finished) => {
                            if check {
                                self.bits.align();
                                self.need = 0;
                                self.mode = Mode::Check { remaining: 4 };
                            } else {
                                self.mode = Mode::Done;
                            }
                        }
                        Err(e) => return Err(self.fail(e)),
                    }
                }
                Mode::Check { remaining } => {
                    if !self.bits.need(io, 8) {
                        return Ok(Status::Ok);
                    }
                    self.need = (self.need << 8) | self.bits.take(8);
                    if remaining > 1 {
                        self.mode = Mode::Check {
                            remaining: remaining - 1,
                        };
                    } else {
                        if self.need != io.adler {
                            return Err(self.fail(Error::Data("incorrect data check")));
                        }
                        debug!(adler = self.need, "stream end");
                        self.mode = Mode::Done;
                    }
                }
                Mode::Done => return Ok(Status::StreamEnd),
                Mode::Bad { .. } => return Err(Error::Data(self.reason)),
            }
        }
    }

    /// Loads the preset dictionary announced by the header. `adler` holds the
    /// header's dictionary id on entry and is reset for the data checksum.
    ///
    /// Raw streams accept a dictionary before any data has been decoded.
    pub fn set_dictionary(&mut self, adler: &mut u32, dictionary: &[u8]) -> Result<()> {
        match self.mode {
            Mode::NeedDict => {
                if adler32(ADLER32_INIT, dictionary) != *adler {
                    return Err(Error::Data("dictionary does not match"));
                }
                *adler = ADLER32_INIT;
            }
            Mode::Blocks
                if self.wrapper == Wrapper::Raw
                    && self.window.have() == 0
                    && self.blocks.state() == BlockState::Type
                    && self.bits.count() == 0 => {}
            _ => return Err(Error::Stream("dictionary not expected")),
        }
        self.window.set_dictionary(dictionary);
        self.mode = Mode::Blocks;
        debug!(len = dictionary.len(), "decompression dictionary loaded");
        Ok(())
    }

    /// Partial marker matches are remembered across calls.
    pub(crate) fn sync(&mut self, io: &mut Io<'_>) -> Result<Status> {
        let mut marker = match self.mode {
            Mode::Bad { marker } => marker,
            _ => {
                self.reason = "stream is being resynchronized";
                0
            }
        };

        // Bytes already pulled into the bit buffer come first.
        self.bits.align();
        while marker < 4 {
            let Some(b) = self.bits.take_byte() else {
                break;
            };
            marker = sync_step(marker, b);
        }
        if marker < 4 {
            if io.avail_in() == 0 {
                self.mode = Mode::Bad { marker };
                return Ok(Status::BufError);
            }
            while marker < 4 {
                let Some(b) = io.next_byte() else {
                    break;
                };
                marker = sync_step(marker, b);
            }
        }
        if marker < 4 {
            self.mode = Mode::Bad { marker };
            return Err(Error::Data("no flush point found"));
        }

        self.blocks.reset();
        self.window.reset();
        io.adler = ADLER32_INIT;
        self.mode = Mode::Blocks;
        debug!(total_in = io.total_in(), "resynchronized at flush point");
        Ok(Status::Ok)
    }

    /// Whether decoding stopped exactly at a stored block's length field with
    /// an empty bit buffer.
    pub fn sync_point(&self) -> bool {
        self.mode == Mode::Blocks
            && self.blocks.state() == BlockState::Lens
            && self.bits.count() == 0
    }
}
