//! Window management and the three block loops: stored, greedy and lazy.

use super::matchfinder::NIL;
use super::{BlockState, Compressor};
use crate::adler32::adler32;
use crate::common::*;
use crate::config::{Strategy, Wrapper};
use crate::stream::{Flush, Io};
use tracing::trace;

/// Matches of minimum length this far back usually cost more than literals.
const TOO_FAR: usize = 4096;

/// Emits the current block and returns from the block loop if output is full.
macro_rules! flush_block {
    ($s:expr, $io:expr, $last:expr) => {{
        $s.flush_block_only($io, $last);
        if $io.avail_out() == 0 {
            return if $last {
                BlockState::FinishStarted
            } else {
                BlockState::NeedMore
            };
        }
    }};
}

impl Compressor {
    /// Slides the window when the cursor nears its end, then reads input
    /// until at least `MIN_LOOKAHEAD` bytes are buffered or input runs out.
    pub(super) fn fill_window(&mut self, io: &mut Io<'_>) {
        let w = self.w_size;
        loop {
            let mut more = self.window.len() - self.lookahead - self.strstart;

            if self.strstart >= w + self.max_dist() {
                self.window.copy_within(w..2 * w, 0);
                self.match_start = self.match_start.saturating_sub(w);
                self.strstart -= w;
                self.block_start -= w as isize;
                self.chains.slide(w);
                more += w;
                trace!(strstart = self.strstart, "window slid");
            }

            if io.avail_in() == 0 {
                return;
            }
            debug_assert!(more >= 2);

            let start = self.strstart + self.lookahead;
            let n = io.read_into(&mut self.window[start..start + more]);
            if self.wrapper == Wrapper::Zlib {
                io.adler = adler32(io.adler, &self.window[start..start + n]);
            }
            self.lookahead += n;

            if self.lookahead >= DEFLATE_MIN_MATCH_LEN {
                self.chains.seed(&self.window, self.strstart);
            }

            if self.lookahead >= MIN_LOOKAHEAD || io.avail_in() == 0 {
                return;
            }
        }
    }

    pub(super) fn flush_block_only(&mut self, io: &mut Io<'_>, last: bool) {
        let stored_len = (self.strstart as isize - self.block_start) as usize;
        let window_data = if self.block_start >= 0 {
            Some(&self.window[self.block_start as usize..self.strstart])
        } else {
            None
        };
        self.block
            .flush_block(&mut self.out, window_data, stored_len, last, self.level.get());
        self.block_start = self.strstart as isize;
        self.flush_pending(io);
    }

    /// Input has been consumed since the last emitted block.
    pub(super) fn block_has_data(&self) -> bool {
        self.strstart as isize != self.block_start
    }

    fn block_full(&self) -> bool {
        let in_length = (self.strstart as isize - self.block_start) as usize;
        self.block.block_full(self.level.get() > 2, in_length)
    }

    fn tally_literal(&mut self, c: u8) -> bool {
        self.block.tally_literal(c);
        self.block_full()
    }

    fn tally_match(&mut self, dist: usize, len: usize) -> bool {
        self.block.tally_match(dist, len);
        self.block_full()
    }

    fn finish_state(flush: Flush) -> BlockState {
        if flush == Flush::Finish {
            BlockState::FinishDone
        } else {
            BlockState::BlockDone
        }
    }

    /// Level 0: copies input into stored blocks as large as the pending
    /// buffer and the window allow.
    pub(super) fn deflate_stored(&mut self, io: &mut Io<'_>, flush: Flush) -> BlockState {
        let max_block_size = DEFLATE_MAX_STORED_LEN.min(self.pending_buf_size - 5);

        loop {
            if self.lookahead <= 1 {
                self.fill_window(io);
                if self.lookahead == 0 {
                    if flush == Flush::NoFlush {
                        return BlockState::NeedMore;
                    }
                    break;
                }
            }

            self.strstart += self.lookahead;
            self.lookahead = 0;

            let max_start = self.block_start + max_block_size as isize;
            if self.strstart as isize >= max_start {
                self.lookahead = (self.strstart as isize - max_start) as usize;
                self.strstart = max_start as usize;
                flush_block!(self, io, false);
            }
            // Emit before the block's start slides out of the window.
            if self.strstart as isize - self.block_start >= self.max_dist() as isize {
                flush_block!(self, io, false);
            }
        }

        let last = flush == Flush::Finish;
        if last || self.block_has_data() {
            flush_block!(self, io, last);
        }
        Self::finish_state(flush)
    }

    /// Levels 1–3: takes the first acceptable match without lazy evaluation,
    /// and skips hash insertion inside long matches.
    pub(super) fn deflate_fast(&mut self, io: &mut Io<'_>, flush: Flush) -> BlockState {
        loop {
            if self.lookahead < MIN_LOOKAHEAD {
                self.fill_window(io);
                if self.lookahead < MIN_LOOKAHEAD && flush == Flush::NoFlush {
                    return BlockState::NeedMore;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = NIL as usize;
            if self.lookahead >= DEFLATE_MIN_MATCH_LEN {
                hash_head = self.chains.insert(&self.window, self.strstart) as usize;
            }

            if hash_head != NIL as usize
                && self.strstart - hash_head <= self.max_dist()
                && self.strategy != Strategy::HuffmanOnly
            {
                let params = self.search_params();
                let (len, start) = self.chains.longest_match(
                    &self.window,
                    self.strstart,
                    self.lookahead,
                    hash_head,
                    DEFLATE_MIN_MATCH_LEN - 1,
                    &params,
                );
                self.match_length = len;
                if let Some(start) = start {
                    self.match_start = start;
                }
            }

            let bflush;
            if self.match_length >= DEFLATE_MIN_MATCH_LEN {
                bflush = self.tally_match(self.strstart - self.match_start, self.match_length);
                self.lookahead -= self.match_length;

                if self.match_length <= self.tuning.max_lazy as usize
                    && self.lookahead >= DEFLATE_MIN_MATCH_LEN
                {
                    // Index every position the match covers.
                    for _ in 1..self.match_length {
                        self.strstart += 1;
                        self.chains.insert(&self.window, self.strstart);
                    }
                    self.strstart += 1;
                } else {
                    self.strstart += self.match_length;
                    self.chains.seed(&self.window, self.strstart);
                }
                self.match_length = 0;
            } else {
                bflush = self.tally_literal(self.window[self.strstart]);
                self.lookahead -= 1;
                self.strstart += 1;
            }

            if bflush {
                flush_block!(self, io, false);
            }
        }

        let last = flush == Flush::Finish;
        if last || self.block_has_data() {
            flush_block!(self, io, last);
        }
        Self::finish_state(flush)
    }

    /// Levels 4–9: evaluates each match against the one starting at the next
    /// byte and keeps whichever is longer.
    pub(super) fn deflate_slow(&mut self, io: &mut Io<'_>, flush: Flush) -> BlockState {
        loop {
            if self.lookahead < MIN_LOOKAHEAD {
                self.fill_window(io);
                if self.lookahead < MIN_LOOKAHEAD && flush == Flush::NoFlush {
                    return BlockState::NeedMore;
                }
                if self.lookahead == 0 {
                    break;
                }
            }

            let mut hash_head = NIL as usize;
            if self.lookahead >= DEFLATE_MIN_MATCH_LEN {
                hash_head = self.chains.insert(&self.window, self.strstart) as usize;
            }

            self.prev_length = self.match_length;
            self.prev_match = self.match_start;
            self.match_length = DEFLATE_MIN_MATCH_LEN - 1;

            if hash_head != NIL as usize
                && self.prev_length < self.tuning.max_lazy as usize
                && self.strstart - hash_head <= self.max_dist()
            {
                if self.strategy != Strategy::HuffmanOnly {
                    let params = self.search_params();
                    let (len, start) = self.chains.longest_match(
                        &self.window,
                        self.strstart,
                        self.lookahead,
                        hash_head,
                        self.prev_length,
                        &params,
                    );
                    self.match_length = len;
                    if let Some(start) = start {
                        self.match_start = start;
                    }
                }

                if self.match_length <= 5
                    && (self.strategy == Strategy::Filtered
                        || (self.match_length == DEFLATE_MIN_MATCH_LEN
                            && self.strstart - self.match_start > TOO_FAR))
                {
                    self.match_length = DEFLATE_MIN_MATCH_LEN - 1;
                }
            }

            if self.prev_length >= DEFLATE_MIN_MATCH_LEN && self.match_length <= self.prev_length {
                // The previous match wins; emit it and index the bytes it covers.
                let max_insert = self.strstart + self.lookahead - DEFLATE_MIN_MATCH_LEN;
                let bflush =
                    self.tally_match(self.strstart - 1 - self.prev_match, self.prev_length);

                self.lookahead -= self.prev_length - 1;
                for _ in 0..self.prev_length - 2 {
                    self.strstart += 1;
                    if self.strstart <= max_insert {
                        self.chains.insert(&self.window, self.strstart);
                    }
                }
                self.prev_length = 0;
                self.match_available = false;
                self.match_length = DEFLATE_MIN_MATCH_LEN - 1;
                self.strstart += 1;

                if bflush {
                    flush_block!(self, io, false);
                }
            } else if self.match_available {
                // The current match is longer; the previous byte goes out as a literal.
                let bflush = self.tally_literal(self.window[self.strstart - 1]);
                if bflush {
                    self.flush_block_only(io, false);
                }
                self.strstart += 1;
                self.lookahead -= 1;
                if io.avail_out() == 0 {
                    return BlockState::NeedMore;
                }
            } else {
                self.match_available = true;
                self.strstart += 1;
                self.lookahead -= 1;
            }
        }

        debug_assert!(flush != Flush::NoFlush);
        if self.match_available {
            self.tally_literal(self.window[self.strstart - 1]);
            self.match_available = false;
        }

        let last = flush == Flush::Finish;
        if last || self.block_has_data() {
            flush_block!(self, io, last);
        }
        Self::finish_state(flush)
    }
}
