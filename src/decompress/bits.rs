use crate::stream::Io;

/// LSB-first bit accumulator fed one input byte at a time.
///
/// Bits above `count` are always zero, so a table lookup on a partially
/// filled buffer sees zeros for the missing input.
#[derive(Debug, Default, Clone)]
pub(crate) struct BitBuf {
    hold: u64,
    count: u32,
}

impl BitBuf {
    pub fn clear(&mut self) {
        self.hold = 0;
        self.count = 0;
    }

    #[inline(always)]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Pulls one byte from the input. Returns `false` when input is exhausted.
    #[inline(always)]
    pub fn pull(&mut self, io: &mut Io<'_>) -> bool {
        match io.next_byte() {
            Some(b) => {
                self.hold |= (b as u64) << self.count;
                self.count += 8;
                true
            }
            None => false,
        }
    }

    /// Makes sure at least `n` bits are buffered.
    #[inline(always)]
    pub fn need(&mut self, io: &mut Io<'_>, n: u32) -> bool {
        while self.count < n {
            if !self.pull(io) {
                return false;
            }
        }
        true
    }

    #[inline(always)]
    pub fn peek(&self, n: u32) -> u32 {
        (self.hold & ((1u64 << n) - 1)) as u32
    }

    #[inline(always)]
    pub fn consume(&mut self, n: u32) {
        debug_assert!(n <= self.count);
        self.hold >>= n;
        self.count -= n;
    }

    #[inline(always)]
    pub fn take(&mut self, n: u32) -> u32 {
        let v = self.peek(n);
        self.consume(n);
        v
    }

    /// Drops the bits up to the next byte boundary.
    pub fn align(&mut self) {
        self.consume(self.count & 7);
    }

    /// Removes one whole byte from the buffer, if there is one.
    pub fn take_byte(&mut self) -> Option<u8> {
        if self.count < 8 {
            return None;
        }
        Some(self.take(8) as u8)
    }

    /// Hands whole buffered bytes that came from this call's input back to it.
    pub fn return_unused(&mut self, io: &mut Io<'_>) {
        let n = ((self.count >> 3) as usize).min(io.consumed());
        io.unconsume(n);
        self.count -= (n as u32) * 8;
        self.hold &= (1u64 << self.count) - 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adler32::ADLER32_INIT;

    #[test]
    fn reads_lsb_first_and_gives_back_bytes() {
        let input = [0b1010_1100u8, 0xFF, 0x12, 0x34];
        let mut out = [0u8; 0];
        let mut io = Io::new(&input, &mut out, ADLER32_INIT, 0);
        let mut bits = BitBuf::default();

        assert!(bits.need(&mut io, 3));
        assert_eq!(bits.take(3), 0b100);
        assert!(bits.need(&mut io, 29));
        assert!(!bits.need(&mut io, 30));
        assert_eq!(io.consumed(), 4);
        bits.align();
        assert_eq!(bits.count(), 24);
        assert_eq!(bits.take_byte(), Some(0xFF));

        bits.return_unused(&mut io);
        assert_eq!(bits.count(), 0);
        assert_eq!(io.input(), &[0x12, 0x34]);
        assert!(!bits.need(&mut io, 24));
        assert_eq!(bits.count(), 16);
    }
}
