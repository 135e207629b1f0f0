use crate::common::*;
use crate::error::Result;
use std::cmp::min;

/// Empty chain link. Window position 0 is never a match candidate.
pub const NIL: u16 = 0;

/// Longest common prefix of `a` and `b`, at most `max_len` bytes.
#[inline(always)]
pub fn match_len(a: &[u8], b: &[u8], max_len: usize) -> usize {
    let a = &a[..max_len];
    let b = &b[..max_len];
    let mut len = 0;

    let mut ca = a.chunks_exact(8);
    let mut cb = b.chunks_exact(8);
    for (x, y) in ca.by_ref().zip(cb.by_ref()) {
        let xv = u64::from_le_bytes([x[0], x[1], x[2], x[3], x[4], x[5], x[6], x[7]]);
        let yv = u64::from_le_bytes([y[0], y[1], y[2], y[3], y[4], y[5], y[6], y[7]]);
        if xv != yv {
            return len + ((xv ^ yv).trailing_zeros() / 8) as usize;
        }
        len += 8;
    }

    for (x, y) in ca.remainder().iter().zip(cb.remainder()) {
        if x != y {
            break;
        }
        len += 1;
    }
    len
}

/// Search limits for one `longest_match` call.
#[derive(Debug, Clone, Copy)]
pub struct SearchParams {
    pub good_length: usize,
    pub nice_length: usize,
    pub max_chain: usize,
    /// Farthest distance a match may reach back.
    pub max_dist: usize,
}

/// Hash-chain index over the sliding window.
///
/// `head[h]` holds the most recent window position whose three-byte prefix
/// hashes to `h`; `prev[pos & w_mask]` links each position to the previous one
/// with the same hash. Positions are window indices, so they fit in a `u16`
/// for windows up to 2 × 32K.
pub struct HashChains {
    head: Vec<u16>,
    prev: Vec<u16>,
    ins_h: usize,
    hash_mask: usize,
    hash_shift: u32,
    w_mask: usize,
}

impl HashChains {
    pub fn new(w_bits: u8, hash_bits: u8) -> Result<Self> {
        let w_size = 1usize << w_bits;
        let hash_size = 1usize << hash_bits;
        Ok(Self {
            head: crate::compress::alloc_zeroed(hash_size)?,
            prev: crate::compress::alloc_zeroed(w_size)?,
            ins_h: 0,
            hash_mask: hash_size - 1,
            hash_shift: (hash_bits as u32 + DEFLATE_MIN_MATCH_LEN as u32 - 1) / DEFLATE_MIN_MATCH_LEN as u32,
            w_mask: w_size - 1,
        })
    }

    /// Forgets every position; matches can no longer reach earlier data.
    pub fn clear(&mut self) {
        self.head.fill(NIL);
        self.ins_h = 0;
    }

    #[inline(always)]
    fn update_hash(&self, h: usize, c: u8) -> usize {
        ((h << self.hash_shift) ^ c as usize) & self.hash_mask
    }

    /// Primes the rolling hash with the two bytes at `window[pos..]`.
    #[inline]
    pub fn seed(&mut self, window: &[u8], pos: usize) {
        self.ins_h = self.update_hash(window[pos] as usize, window[pos + 1]);
    }

    /// Rolls in `window[pos + 2]`, links `pos` at the head of its chain and
    /// returns the previous head.
    #[inline(always)]
    pub fn insert(&mut self, window: &[u8], pos: usize) -> u16 {
        self.ins_h = self.update_hash(self.ins_h, window[pos + DEFLATE_MIN_MATCH_LEN - 1]);
        let head = self.head[self.ins_h];
        self.prev[pos & self.w_mask] = head;
        self.head[self.ins_h] = pos as u16;
        head
    }

    /// Rebases every link after the window slid down by `w_size` bytes.
    /// Links that fall off the bottom become `NIL`.
    pub fn slide(&mut self, w_size: usize) {
        let rebase = |m: &mut u16| {
            *m = if *m as usize >= w_size {
                (*m as usize - w_size) as u16
            } else {
                NIL
            };
        };
        self.head.iter_mut().for_each(rebase);
        self.prev.iter_mut().for_each(rebase);
    }

    /// Walks the chain from `cur_match` looking for a match longer than
    /// `prev_length` at `strstart`. Returns the best length, clamped to
    /// `lookahead`, and the start of the match if one beat `prev_length`.
    pub fn longest_match(
        &self,
        window: &[u8],
        strstart: usize,
        lookahead: usize,
        mut cur_match: usize,
        prev_length: usize,
        params: &SearchParams,
    ) -> (usize, Option<usize>) {
        let mut chain_length = params.max_chain;
        let mut best_len = prev_length;
        let mut match_start = None;
        let nice_match = min(params.nice_length, lookahead);
        let limit = strstart.saturating_sub(params.max_dist);
        let max_len = min(DEFLATE_MAX_MATCH_LEN, lookahead);

        if prev_length >= params.good_length {
            chain_length >>= 2;
        }

        if best_len >= max_len {
            return (min(best_len, lookahead), None);
        }

        let scan = &window[strstart..];
        loop {
            let cand = &window[cur_match..];
            // Cheap rejection on the byte that would extend the best match.
            if cand[best_len] == scan[best_len]
                && cand[best_len.saturating_sub(1)] == scan[best_len.saturating_sub(1)]
                && cand[0] == scan[0]
                && cand[1] == scan[1]
            {
                let len = match_len(scan, cand, max_len);
                if len > best_len {
                    match_start = Some(cur_match);
                    best_len = len;
                    if len >= nice_match || len >= max_len {
                        break;
                    }
                }
            }

            cur_match = self.prev[cur_match & self.w_mask] as usize;
            if cur_match <= limit {
                break;
            }
            chain_length -= 1;
            if chain_length == 0 {
                break;
            }
        }

        (min(best_len, lookahead), match_start)
    }
}
