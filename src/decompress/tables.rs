use crate::common::*;
use crate::huffman::{build_table, Code, TableKind};
use std::sync::OnceLock;

pub(crate) const LITLEN_ROOT_BITS: usize = 9;
pub(crate) const DIST_ROOT_BITS: usize = 6;
pub(crate) const PRECODE_ROOT_BITS: usize = 7;

/// A literal/length and a distance table ready for decoding.
#[derive(Clone, Copy)]
pub(crate) struct CodeTables<'a> {
    pub lit: &'a [Code],
    pub lit_bits: u32,
    pub dist: &'a [Code],
    pub dist_bits: u32,
}

pub(crate) struct FixedTables {
    lit: Vec<Code>,
    lit_bits: u32,
    dist: Vec<Code>,
    dist_bits: u32,
}

impl FixedTables {
    pub fn tables(&self) -> CodeTables<'_> {
        CodeTables {
            lit: &self.lit,
            lit_bits: self.lit_bits,
            dist: &self.dist,
            dist_bits: self.dist_bits,
        }
    }
}

static FIXED_TABLES: OnceLock<FixedTables> = OnceLock::new();

/// Tables for fixed-Huffman blocks, built on first use and shared.
pub(crate) fn fixed_tables() -> &'static FixedTables {
    FIXED_TABLES.get_or_init(|| {
        let mut lens = [0u8; DEFLATE_NUM_LITLEN_SYMS];
        lens[..144].fill(8);
        lens[144..256].fill(9);
        lens[256..280].fill(7);
        lens[280..].fill(8);

        let mut lit = Vec::new();
        let mut dist = Vec::new();
        let lit_bits = match build_table(TableKind::Lens, &lens, LITLEN_ROOT_BITS, &mut lit) {
            Ok(bits) => bits,
            Err(e) => unreachable!("fixed literal/length code is complete: {:?}", e),
        };
        let dist_bits = match build_table(
            TableKind::Dists,
            &[5u8; DEFLATE_NUM_OFFSET_SYMS],
            5,
            &mut dist,
        ) {
            Ok(bits) => bits,
            Err(e) => unreachable!("fixed distance code is complete: {:?}", e),
        };

        FixedTables {
            lit,
            lit_bits: lit_bits as u32,
            dist,
            dist_bits: dist_bits as u32,
        }
    })
}
