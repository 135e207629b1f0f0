/// LSB-first bit packer in front of the pending output buffer.
///
/// Bits accumulate in `bitbuf` and move to `pending` four bytes at a time;
/// `flush_bits` and `windup` settle the accumulator on byte boundaries.
/// `pending[pending_out..]` is the part not yet copied to caller output.
pub struct Bitstream {
    pending: Vec<u8>,
    pending_out: usize,
    bitbuf: u64,
    bitcount: u32,
}

impl Bitstream {
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            pending_out: 0,
            bitbuf: 0,
            bitcount: 0,
        }
    }

    pub fn reset(&mut self) {
        self.pending.clear();
        self.pending_out = 0;
        self.bitbuf = 0;
        self.bitcount = 0;
    }

    /// Appends the low `count` bits of `bits`. `count` may be up to 32.
    #[inline(always)]
    pub fn write_bits(&mut self, bits: u32, count: u32) {
        debug_assert!(count <= 32);
        debug_assert!(count == 32 || bits >> count == 0);
        self.bitbuf |= (bits as u64) << self.bitcount;
        self.bitcount += count;
        if self.bitcount >= 32 {
            self.pending
                .extend_from_slice(&(self.bitbuf as u32).to_le_bytes());
            self.bitbuf >>= 32;
            self.bitcount -= 32;
        }
    }

    /// Moves whole bytes out of the accumulator, leaving fewer than 8 bits.
    pub fn flush_bits(&mut self) {
        while self.bitcount >= 8 {
            self.pending.push(self.bitbuf as u8);
            self.bitbuf >>= 8;
            self.bitcount -= 8;
        }
    }

    /// Flushes everything, padding the last partial byte with zero bits.
    pub fn windup(&mut self) {
        self.flush_bits();
        if self.bitcount > 0 {
            self.pending.push(self.bitbuf as u8);
        }
        self.bitbuf = 0;
        self.bitcount = 0;
    }

    /// Bits still held in the accumulator.
    pub fn bits_pending(&self) -> u32 {
        self.bitcount
    }

    /// Writes raw bytes; the stream must be byte aligned.
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        debug_assert_eq!(self.bitcount, 0);
        self.pending.extend_from_slice(bytes);
    }

    pub fn put_u16_le(&mut self, v: u16) {
        self.put_bytes(&v.to_le_bytes());
    }

    pub fn put_u16_be(&mut self, v: u16) {
        self.put_bytes(&v.to_be_bytes());
    }

    pub fn has_pending(&self) -> bool {
        self.pending_out < self.pending.len()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len() - self.pending_out
    }

    /// Copies as much pending output as fits into `out`, returning the count.
    pub fn drain_into(&mut self, out: &mut [u8]) -> usize {
        let n = self.pending_len().min(out.len());
        out[..n].copy_from_slice(&self.pending[self.pending_out..self.pending_out + n]);
        self.pending_out += n;
        if self.pending_out == self.pending.len() {
            self.pending.clear();
            self.pending_out = 0;
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(bs: &mut Bitstream) -> Vec<u8> {
        let mut out = vec![0u8; bs.pending_len()];
        let n = bs.drain_into(&mut out);
        out.truncate(n);
        out
    }

    #[test]
    fn packs_lsb_first() {
        let mut bs = Bitstream::new(16);
        bs.write_bits(0b1, 1);
        bs.write_bits(0b01, 2);
        bs.write_bits(0b11111, 5);
        bs.write_bits(0x1234, 16);
        bs.windup();
        assert_eq!(drain(&mut bs), vec![0b1111_1011, 0x34, 0x12]);
    }

    #[test]
    fn crosses_accumulator_boundary() {
        let mut bs = Bitstream::new(16);
        for _ in 0..5 {
            bs.write_bits(0x7FFF, 15);
        }
        bs.write_bits(0x1F, 5);
        bs.windup();
        assert_eq!(drain(&mut bs), vec![0xFF; 10]);
        assert!(!bs.has_pending());
    }

    #[test]
    fn flush_bits_keeps_partial_byte() {
        let mut bs = Bitstream::new(16);
        bs.write_bits(0x3FF, 10);
        bs.flush_bits();
        assert_eq!(bs.bits_pending(), 2);
        assert_eq!(bs.pending_len(), 1);
    }

    #[test]
    fn partial_drain() {
        let mut bs = Bitstream::new(16);
        bs.put_bytes(&[1, 2, 3, 4, 5]);
        let mut out = [0u8; 2];
        assert_eq!(bs.drain_into(&mut out), 2);
        assert_eq!(out, [1, 2]);
        assert_eq!(bs.pending_len(), 3);
        assert_eq!(drain(&mut bs), vec![3, 4, 5]);
    }
}
