//! Compression and decompression parameters.

use crate::error::{Error, Result};

pub const MIN_WINDOW_BITS: u8 = 9;
pub const MAX_WINDOW_BITS: u8 = 15;
/// The decoder accepts the 256-byte window some old encoders announce.
pub const MIN_INFLATE_WINDOW_BITS: u8 = 8;
pub const MIN_MEM_LEVEL: u8 = 1;
pub const MAX_MEM_LEVEL: u8 = 9;
pub const DEF_MEM_LEVEL: u8 = 8;

/// Compression level 0 (store) through 9 (best).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    pub const NONE: Level = Level(0);
    pub const FASTEST: Level = Level(1);
    pub const DEFAULT: Level = Level(6);
    pub const BEST: Level = Level(9);

    pub fn new(level: u8) -> Result<Self> {
        if level > 9 {
            return Err(Error::Stream("compression level must be between 0 and 9"));
        }
        Ok(Level(level))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// The 2-bit FLEVEL hint written into the zlib header.
    pub fn header_hint(self) -> u8 {
        if self.0 == 0 {
            return crate::common::ZLIB_FASTEST_COMPRESSION;
        }
        ((self.0 - 1) >> 1).min(crate::common::ZLIB_SLOWEST_COMPRESSION)
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::DEFAULT
    }
}

/// Match-selection strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    #[default]
    Default,
    /// Favors literals over short matches; suits filtered numeric data.
    Filtered,
    /// Huffman coding only, no string matching.
    HuffmanOnly,
}

/// Framing around the DEFLATE block stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wrapper {
    /// RFC 1950 header and Adler-32 trailer.
    #[default]
    Zlib,
    /// Bare RFC 1951 blocks.
    Raw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Stored,
    Fast,
    Slow,
}

/// Per-level matcher tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelConfig {
    /// Quarter the chain walk once the previous match is at least this long.
    pub good_length: u16,
    /// Lazy path: skip the lazy search above this length.
    /// Fast path: insert every covered position only up to this length.
    pub max_lazy: u16,
    /// Stop searching once a match this long is found.
    pub nice_length: u16,
    pub max_chain: u16,
    pub family: Family,
}

const fn row(good: u16, lazy: u16, nice: u16, chain: u16, family: Family) -> LevelConfig {
    LevelConfig {
        good_length: good,
        max_lazy: lazy,
        nice_length: nice,
        max_chain: chain,
        family,
    }
}

pub const LEVEL_TABLE: [LevelConfig; 10] = [
    row(0, 0, 0, 0, Family::Stored),
    row(4, 4, 8, 4, Family::Fast),
    row(4, 5, 16, 8, Family::Fast),
    row(4, 6, 32, 32, Family::Fast),
    row(4, 4, 16, 16, Family::Slow),
    row(8, 16, 32, 32, Family::Slow),
    row(8, 16, 128, 128, Family::Slow),
    row(8, 32, 128, 256, Family::Slow),
    row(32, 128, 258, 1024, Family::Slow),
    row(32, 258, 258, 4096, Family::Slow),
];

impl LevelConfig {
    pub fn for_level(level: Level) -> &'static LevelConfig {
        &LEVEL_TABLE[level.0 as usize]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeflateConfig {
    pub level: Level,
    pub window_bits: u8,
    pub mem_level: u8,
    pub strategy: Strategy,
    pub wrapper: Wrapper,
}

impl Default for DeflateConfig {
    fn default() -> Self {
        Self {
            level: Level::DEFAULT,
            window_bits: MAX_WINDOW_BITS,
            mem_level: DEF_MEM_LEVEL,
            strategy: Strategy::Default,
            wrapper: Wrapper::Zlib,
        }
    }
}

impl DeflateConfig {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_window_bits(mut self, bits: u8) -> Self {
        self.window_bits = bits;
        self
    }

    pub fn with_mem_level(mut self, mem_level: u8) -> Self {
        self.mem_level = mem_level;
        self
    }

    pub fn with_strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.wrapper = wrapper;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&self.window_bits) {
            return Err(Error::Stream("window bits must be between 9 and 15"));
        }
        if !(MIN_MEM_LEVEL..=MAX_MEM_LEVEL).contains(&self.mem_level) {
            return Err(Error::Stream("memory level must be between 1 and 9"));
        }
        Level::new(self.level.0).map(|_| ())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InflateConfig {
    pub window_bits: u8,
    pub wrapper: Wrapper,
}

impl Default for InflateConfig {
    fn default() -> Self {
        Self {
            window_bits: MAX_WINDOW_BITS,
            wrapper: Wrapper::Zlib,
        }
    }
}

impl InflateConfig {
    pub fn with_window_bits(mut self, bits: u8) -> Self {
        self.window_bits = bits;
        self
    }

    pub fn with_wrapper(mut self, wrapper: Wrapper) -> Self {
        self.wrapper = wrapper;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(MIN_INFLATE_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&self.window_bits) {
            return Err(Error::Stream("window bits must be between 8 and 15"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!(Level::new(10).is_err());
        assert!(DeflateConfig::default().with_window_bits(8).validate().is_err());
        assert!(DeflateConfig::default().with_window_bits(16).validate().is_err());
        assert!(DeflateConfig::default().with_mem_level(0).validate().is_err());
        assert!(DeflateConfig::default().with_mem_level(10).validate().is_err());
        assert!(InflateConfig::default().with_window_bits(7).validate().is_err());
        assert!(DeflateConfig::default().validate().is_ok());
    }

    #[test]
    fn header_hint_follows_level() {
        let hints: Vec<u8> = (0..=9)
            .map(|l| Level::new(l).unwrap().header_hint())
            .collect();
        assert_eq!(hints, vec![0, 0, 0, 1, 1, 2, 2, 3, 3, 3]);
    }

    #[test]
    fn level_families() {
        assert_eq!(LevelConfig::for_level(Level::NONE).family, Family::Stored);
        assert_eq!(LevelConfig::for_level(Level::FASTEST).family, Family::Fast);
        assert_eq!(LevelConfig::for_level(Level::DEFAULT).family, Family::Slow);
        assert_eq!(LevelConfig::for_level(Level::BEST).nice_length, 258);
    }
}
